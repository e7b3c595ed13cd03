//! Sparse format records.
//!
//! Every format is a struct whose fields are all `Option<T>`: an absent key
//! means "not specified here", which is different from any concrete value.
//! The `format_record!` macro generates the record, a key enum, and the
//! merge / compare helpers shared by the merge engine and the format-state
//! reducer.

macro_rules! format_record {
    (
        $(#[$meta:meta])*
        pub struct $name:ident / $key:ident {
            $(
                $(#[$field_meta:meta])*
                $field:ident : $ty:ty => $variant:ident
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Default, PartialEq)]
        pub struct $name {
            $(
                $(#[$field_meta])*
                pub $field: Option<$ty>,
            )*
        }

        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum $key {
            $($variant,)*
        }

        impl $name {
            pub const KEYS: &'static [$key] = &[$($key::$variant,)*];

            /// Copies every key set on `other` into `self`. Keys of `other`
            /// win; keys only present on `self` are kept.
            pub fn merge_from(&mut self, other: &Self) {
                $(
                    if other.$field.is_some() {
                        self.$field = other.$field.clone();
                    }
                )*
            }

            /// Returns `self` overlaid with `other`.
            pub fn merged(&self, other: &Self) -> Self {
                let mut result = self.clone();
                result.merge_from(other);
                result
            }

            pub fn has(&self, key: $key) -> bool {
                match key {
                    $($key::$variant => self.$field.is_some(),)*
                }
            }

            pub fn remove(&mut self, key: $key) {
                match key {
                    $($key::$variant => self.$field = None,)*
                }
            }

            /// Copies a single key from `other`, including absence.
            pub fn copy_key(&mut self, other: &Self, key: $key) {
                match key {
                    $($key::$variant => self.$field = other.$field.clone(),)*
                }
            }

            pub fn key_equals(&self, other: &Self, key: $key) -> bool {
                match key {
                    $($key::$variant => self.$field == other.$field,)*
                }
            }

            /// Per-key equality over `keys` only.
            pub fn equals_under(&self, other: &Self, keys: &[$key]) -> bool {
                keys.iter().all(|key| self.key_equals(other, *key))
            }

            /// True when every key set on `other` has the same value here.
            pub fn contains(&self, other: &Self) -> bool {
                Self::KEYS
                    .iter()
                    .filter(|key| other.has(**key))
                    .all(|key| self.key_equals(other, *key))
            }

            pub fn keys(&self) -> Vec<$key> {
                Self::KEYS.iter().copied().filter(|key| self.has(*key)).collect()
            }

            /// Keeps only the keys listed in `keys`.
            pub fn retain(&mut self, keys: &[$key]) {
                for key in Self::KEYS {
                    if !keys.contains(key) {
                        self.remove(*key);
                    }
                }
            }

            pub fn is_empty(&self) -> bool {
                true $(&& self.$field.is_none())*
            }
        }
    };
}

format_record! {
    /// Character level formatting carried by segments, markers, links and
    /// paragraph ambient formats.
    pub struct SegmentFormat / SegmentFormatKey {
        font_family: String => FontFamily,
        font_size: String => FontSize,
        font_weight: String => FontWeight,
        italic: bool => Italic,
        underline: bool => Underline,
        strikethrough: bool => Strikethrough,
        /// `"super"`, `"sub"` or a space separated sequence of both.
        super_or_sub_script_sequence: String => SuperOrSubScriptSequence,
        text_color: String => TextColor,
        background_color: String => BackgroundColor,
        letter_spacing: String => LetterSpacing,
        line_height: String => LineHeight,
    }
}

format_record! {
    /// Paragraph, container and row formatting.
    pub struct BlockFormat / BlockFormatKey {
        background_color: String => BackgroundColor,
        direction: String => Direction,
        text_align: String => TextAlign,
        white_space: String => WhiteSpace,
        line_height: String => LineHeight,
        text_indent: String => TextIndent,
        margin_top: String => MarginTop,
        margin_right: String => MarginRight,
        margin_bottom: String => MarginBottom,
        margin_left: String => MarginLeft,
        padding_top: String => PaddingTop,
        padding_right: String => PaddingRight,
        padding_bottom: String => PaddingBottom,
        padding_left: String => PaddingLeft,
        border_top: String => BorderTop,
        border_right: String => BorderRight,
        border_bottom: String => BorderBottom,
        border_left: String => BorderLeft,
    }
}

format_record! {
    pub struct TableFormat / TableFormatKey {
        background_color: String => BackgroundColor,
        border_collapse: bool => BorderCollapse,
        use_border_box: bool => UseBorderBox,
        width: String => Width,
        table_layout: String => TableLayout,
        direction: String => Direction,
        text_align: String => TextAlign,
        margin_top: String => MarginTop,
        margin_bottom: String => MarginBottom,
        border_top: String => BorderTop,
        border_right: String => BorderRight,
        border_bottom: String => BorderBottom,
        border_left: String => BorderLeft,
    }
}

format_record! {
    pub struct TableCellFormat / TableCellFormatKey {
        background_color: String => BackgroundColor,
        text_color: String => TextColor,
        text_align: String => TextAlign,
        vertical_align: String => VerticalAlign,
        direction: String => Direction,
        width: String => Width,
        height: String => Height,
        use_border_box: bool => UseBorderBox,
        padding_top: String => PaddingTop,
        padding_right: String => PaddingRight,
        padding_bottom: String => PaddingBottom,
        padding_left: String => PaddingLeft,
        border_top: String => BorderTop,
        border_right: String => BorderRight,
        border_bottom: String => BorderBottom,
        border_left: String => BorderLeft,
    }
}

format_record! {
    pub struct ListLevelFormat / ListLevelFormatKey {
        list_style_type: String => ListStyleType,
        start_number: u32 => StartNumber,
        direction: String => Direction,
        text_align: String => TextAlign,
        margin_left: String => MarginLeft,
        padding_left: String => PaddingLeft,
    }
}

format_record! {
    /// Box formatting specific to images. Character formatting of an image
    /// lives on its segment.
    pub struct ImageFormat / ImageFormatKey {
        width: String => Width,
        height: String => Height,
        max_width: String => MaxWidth,
        border_top: String => BorderTop,
        border_right: String => BorderRight,
        border_bottom: String => BorderBottom,
        border_left: String => BorderLeft,
        border_radius: String => BorderRadius,
        box_shadow: String => BoxShadow,
        vertical_align: String => VerticalAlign,
    }
}

impl SegmentFormat {
    pub fn bold() -> Self {
        Self {
            font_weight: Some("bold".to_string()),
            ..Self::default()
        }
    }

    /// `font-weight: bold` or any numeric weight of 600 and above.
    pub fn is_bold(&self) -> bool {
        self.font_weight.as_deref().is_some_and(is_bold_weight)
    }
}

pub fn is_bold_weight(weight: &str) -> bool {
    match weight {
        "bold" | "bolder" => true,
        other => other.parse::<u32>().is_ok_and(|value| value >= 600),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_from_prefers_incoming_keys() {
        let mut target = SegmentFormat {
            font_family: Some("Arial".to_string()),
            text_color: Some("red".to_string()),
            ..SegmentFormat::default()
        };
        let source = SegmentFormat {
            text_color: Some("blue".to_string()),
            italic: Some(true),
            ..SegmentFormat::default()
        };

        target.merge_from(&source);

        assert_eq!(target.font_family.as_deref(), Some("Arial"));
        assert_eq!(target.text_color.as_deref(), Some("blue"));
        assert_eq!(target.italic, Some(true));
    }

    #[test]
    fn equals_under_ignores_keys_outside_the_subset() {
        let a = SegmentFormat {
            font_size: Some("12pt".to_string()),
            text_color: Some("red".to_string()),
            ..SegmentFormat::default()
        };
        let b = SegmentFormat {
            font_size: Some("12pt".to_string()),
            text_color: Some("green".to_string()),
            ..SegmentFormat::default()
        };

        assert!(a.equals_under(&b, &[SegmentFormatKey::FontSize]));
        assert!(!a.equals_under(&b, &[SegmentFormatKey::FontSize, SegmentFormatKey::TextColor]));
    }

    #[test]
    fn contains_checks_only_keys_present_on_the_other_side() {
        let full = SegmentFormat {
            font_weight: Some("bold".to_string()),
            underline: Some(true),
            ..SegmentFormat::default()
        };

        assert!(full.contains(&SegmentFormat::bold()));
        assert!(full.contains(&SegmentFormat::default()));
        assert!(!SegmentFormat::bold().contains(&full));
    }

    #[test]
    fn retain_and_keys() {
        let mut format = SegmentFormat {
            font_weight: Some("700".to_string()),
            italic: Some(true),
            background_color: Some("yellow".to_string()),
            ..SegmentFormat::default()
        };

        format.retain(&[SegmentFormatKey::FontWeight, SegmentFormatKey::Italic]);

        assert_eq!(
            format.keys(),
            vec![SegmentFormatKey::FontWeight, SegmentFormatKey::Italic]
        );
        assert!(format.is_bold());
        format.remove(SegmentFormatKey::FontWeight);
        format.remove(SegmentFormatKey::Italic);
        assert!(format.is_empty());
    }
}

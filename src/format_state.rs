//! Reduces the formats of everything selected into one [`FormatState`], the
//! snapshot a toolbar shows ("bold", "12pt", "in a table", ...).

use crate::metadata::{TableMetadataFormat, table_metadata};
use crate::model::{
    Block, BlockGroup, BlockGroupType, ImageFormat, ListType, Paragraph, Segment, SegmentFormat, SegmentKind,
};
use crate::selection::{
    IterateSelectionsOptions, ListFormatHolderPolicy, TableSelectionContext, get_closest_ancestor_block_group_index,
    iterate_selections,
};

/// Value reported for string fields under [`ConflictSolution::ReturnMultiple`].
pub const MULTIPLE: &str = "Multiple";

/// What to do when selected units disagree on a field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConflictSolution {
    /// Leave the field absent.
    #[default]
    Remove,
    /// Keep the value of the first unit.
    KeepFirst,
    /// Report [`MULTIPLE`] for string fields; other fields are removed.
    ReturnMultiple,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FormatState {
    pub is_bold: Option<bool>,
    pub is_italic: Option<bool>,
    pub is_underline: Option<bool>,
    pub is_strikethrough: Option<bool>,
    pub is_superscript: Option<bool>,
    pub is_subscript: Option<bool>,
    pub is_code_inline: Option<bool>,
    pub font_name: Option<String>,
    /// Always in points, e.g. `"12pt"`.
    pub font_size: Option<String>,
    pub font_weight: Option<String>,
    pub text_color: Option<String>,
    pub background_color: Option<String>,
    pub letter_spacing: Option<String>,
    pub line_height: Option<String>,

    pub is_bullet: Option<bool>,
    pub is_numbering: Option<bool>,
    pub is_block_quote: Option<bool>,
    pub is_code_block: Option<bool>,
    pub heading_level: Option<u8>,
    pub text_align: Option<String>,
    pub direction: Option<String>,
    pub margin_top: Option<String>,
    pub margin_bottom: Option<String>,

    pub is_in_table: Option<bool>,
    pub table_has_header: Option<bool>,
    pub table_format: Option<TableMetadataFormat>,
    pub can_merge_table_cell: Option<bool>,

    pub is_multiline_selection: Option<bool>,
    pub can_unlink: Option<bool>,
    pub can_add_image_alt_text: Option<bool>,
    pub image_format: Option<ImageFormatState>,
}

/// Border and shadow of a single selected image.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImageFormatState {
    pub border_color: Option<String>,
    pub border_width: Option<String>,
    pub border_style: Option<String>,
    pub border_radius: Option<String>,
    pub box_shadow: Option<String>,
}

/// Computes the format state of the selection in `model`. A pending format
/// overlays every selected segment, so a caret with pending bold reports
/// bold.
pub fn retrieve_model_format_state(
    model: &BlockGroup,
    pending_format: Option<&SegmentFormat>,
    conflict: ConflictSolution,
) -> FormatState {
    let mut state = FormatState::default();
    let mut reducer = Reducer {
        conflict,
        is_first_unit: true,
        is_first_paragraph: true,
        is_first_segment: true,
        is_first_image: true,
        spans_paragraphs: false,
        first_block: false,
        first_table: None,
    };
    let options = IterateSelectionsOptions::default().with_list_format_holder(ListFormatHolderPolicy::Never);

    iterate_selections(model, &options, |selection| {
        if reducer.is_first_unit {
            retrieve_structure_format(&mut state, &selection.path);
            if let Some(context) = &selection.table_context {
                retrieve_table_format(&mut state, model, context);
            }
            reducer.is_first_unit = false;
        }

        if selection.block.is_some() {
            if reducer.first_block {
                state.is_multiline_selection = Some(true);
            } else {
                reducer.first_block = true;
            }
        }

        if let Some(Block::Paragraph(paragraph)) = selection.block.map(|block| block.block) {
            if !reducer.is_first_paragraph {
                reducer.spans_paragraphs = true;
                state.image_format = None;
                state.can_add_image_alt_text = None;
            }
            reducer.paragraph(&mut state, paragraph);
            for selected in selection.segments.iter().flatten() {
                reducer.segment(&mut state, paragraph, selected.segment, pending_format);
            }
            reducer.is_first_paragraph = false;
        }

        if let Some(context) = &selection.table_context {
            reducer.table(&mut state, context);
        }
        false
    });

    if reducer.first_block && state.is_multiline_selection.is_none() {
        state.is_multiline_selection = Some(false);
    }
    state
}

struct Reducer {
    conflict: ConflictSolution,
    is_first_unit: bool,
    is_first_paragraph: bool,
    is_first_segment: bool,
    is_first_image: bool,
    /// Image fields only describe selections within one paragraph.
    spans_paragraphs: bool,
    first_block: bool,
    first_table: Option<TableSelectionContext>,
}

impl Reducer {
    fn paragraph(&self, state: &mut FormatState, paragraph: &Paragraph) {
        let first = self.is_first_paragraph;
        let conflict = self.conflict;
        merge_string(&mut state.margin_top, paragraph.format.margin_top.clone(), first, conflict);
        merge_string(&mut state.margin_bottom, paragraph.format.margin_bottom.clone(), first, conflict);
        merge_value(&mut state.heading_level, paragraph.heading_level(), first, conflict);
        merge_string(&mut state.text_align, paragraph.format.text_align.clone(), first, conflict);
        merge_string(&mut state.direction, paragraph.format.direction.clone(), first, conflict);
    }

    fn segment(
        &mut self,
        state: &mut FormatState,
        paragraph: &Paragraph,
        segment: &Segment,
        pending_format: Option<&SegmentFormat>,
    ) {
        // A marker only speaks for the selection when nothing precedes it.
        if self.is_first_segment || !segment.is_marker() {
            let format = effective_format(paragraph, segment, pending_format);
            retrieve_segment_format(state, &format, self.is_first_segment, self.conflict);
            merge_value(
                &mut state.is_code_inline,
                Some(segment.code.is_some()),
                self.is_first_segment,
                self.conflict,
            );
        }

        if !self.spans_paragraphs {
            if let SegmentKind::Image(image) = &segment.kind {
                if self.is_first_image {
                    state.image_format = Some(image_format_state(&image.format));
                    self.is_first_image = false;
                } else {
                    state.image_format = None;
                }
            }
            let is_image = segment.as_image().is_some();
            state.can_add_image_alt_text = Some(state.can_add_image_alt_text.unwrap_or(false) || is_image);
        }

        self.is_first_segment = false;
        state.can_unlink = Some(state.can_unlink.unwrap_or(false) || segment.link.is_some());
    }

    fn table(&mut self, state: &mut FormatState, context: &TableSelectionContext) {
        let Some(first) = &self.first_table else {
            self.first_table = Some(context.clone());
            return;
        };
        if first.table == context.table && (first.row_index != context.row_index || first.col_index != context.col_index) {
            state.can_merge_table_cell = Some(true);
            state.is_multiline_selection = Some(true);
        }
    }
}

/// Table state of the first selected unit, when it lies in a table.
fn retrieve_table_format(state: &mut FormatState, model: &BlockGroup, context: &TableSelectionContext) {
    let table = model.table_at(&context.table);
    state.is_in_table = Some(true);
    state.table_has_header = Some(table.is_some_and(|table| {
        table
            .rows
            .iter()
            .flat_map(|row| &row.cells)
            .any(|cell| cell.as_table_cell().is_some_and(|props| props.is_header))
    }));
    state.table_format = table.and_then(table_metadata);
}

/// Every carrier of character format at `segment`, innermost last.
fn effective_format(paragraph: &Paragraph, segment: &Segment, pending_format: Option<&SegmentFormat>) -> SegmentFormat {
    let mut format = SegmentFormat {
        line_height: paragraph.format.line_height.clone(),
        ..SegmentFormat::default()
    };
    if let Some(decorator) = &paragraph.decorator {
        format.merge_from(&decorator.format);
    }
    if let Some(ambient) = &paragraph.segment_format {
        format.merge_from(ambient);
    }
    if let Some(code) = &segment.code {
        format.merge_from(&code.format);
    }
    if let Some(link) = &segment.link {
        format.merge_from(&link.format);
    }
    format.merge_from(&segment.format);
    if let Some(pending) = pending_format {
        format.merge_from(pending);
    }
    format
}

fn retrieve_segment_format(state: &mut FormatState, format: &SegmentFormat, first: bool, conflict: ConflictSolution) {
    let script = format
        .super_or_sub_script_sequence
        .as_deref()
        .and_then(|sequence| sequence.split_whitespace().last());

    merge_value(&mut state.is_bold, Some(format.is_bold()), first, conflict);
    merge_value(&mut state.is_italic, format.italic, first, conflict);
    merge_value(&mut state.is_underline, format.underline, first, conflict);
    merge_value(&mut state.is_strikethrough, format.strikethrough, first, conflict);
    merge_value(&mut state.is_superscript, Some(script == Some("super")), first, conflict);
    merge_value(&mut state.is_subscript, Some(script == Some("sub")), first, conflict);
    merge_string(&mut state.letter_spacing, format.letter_spacing.clone(), first, conflict);
    merge_string(&mut state.font_name, format.font_family.clone(), first, conflict);
    merge_string(
        &mut state.font_size,
        format.font_size.as_deref().map(normalize_font_size),
        first,
        conflict,
    );
    merge_string(&mut state.background_color, format.background_color.clone(), first, conflict);
    merge_string(&mut state.text_color, format.text_color.clone(), first, conflict);
    merge_string(&mut state.font_weight, format.font_weight.clone(), first, conflict);
    merge_string(&mut state.line_height, format.line_height.clone(), first, conflict);
}

/// List and container state of the first selected unit.
fn retrieve_structure_format(state: &mut FormatState, path: &[&BlockGroup]) {
    if let Some(index) = get_closest_ancestor_block_group_index(path, &[BlockGroupType::ListItem], &[]) {
        let list_type = path[index]
            .as_list_item()
            .and_then(|props| props.levels.last())
            .map(|level| level.list_type);
        state.is_bullet = Some(list_type == Some(ListType::Unordered));
        state.is_numbering = Some(list_type == Some(ListType::Ordered));
    }

    let container = get_closest_ancestor_block_group_index(path, &[BlockGroupType::FormatContainer], &[])
        .and_then(|index| path[index].format_container_tag())
        .map(str::to_ascii_lowercase);
    state.is_block_quote = Some(container.as_deref() == Some("blockquote"));
    state.is_code_block = Some(matches!(container.as_deref(), Some("pre" | "code")));
}

fn image_format_state(format: &ImageFormat) -> ImageFormatState {
    let (border_width, border_style, border_color) = format
        .border_top
        .as_deref()
        .map(parse_border)
        .unwrap_or_default();
    ImageFormatState {
        border_color,
        border_width,
        border_style,
        border_radius: format.border_radius.clone(),
        box_shadow: format.box_shadow.clone(),
    }
}

const BORDER_STYLES: &[&str] = &[
    "none", "hidden", "dotted", "dashed", "solid", "double", "groove", "ridge", "inset", "outset",
];

/// Splits a CSS border shorthand into width, style and color.
pub fn parse_border(border: &str) -> (Option<String>, Option<String>, Option<String>) {
    let mut width = None;
    let mut style = None;
    let mut color = None;
    for token in border.split_whitespace() {
        if token.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
            width = Some(token.to_string());
        } else if BORDER_STYLES.contains(&token) {
            style = Some(token.to_string());
        } else {
            color = Some(token.to_string());
        }
    }
    (width, style, color)
}

/// Converts a CSS font size to points. Pixel sizes use
/// `round(px * 75 + 0.05) / 100`; the `0.05` absorbs the float error
/// browsers leave in computed pixel sizes.
pub fn font_size_in_pt(size: &str) -> Option<f64> {
    let size = size.trim();
    let split = size
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-'))
        .unwrap_or(size.len());
    let (number, unit) = size.split_at(split);
    let value: f64 = number.parse().ok()?;
    let points = match unit.trim().to_ascii_lowercase().as_str() {
        "px" | "" => return Some((value * 75.0 + 0.05).round() / 100.0),
        "pt" => value,
        "pc" => value * 12.0,
        "in" => value * 72.0,
        "cm" => value * 72.0 / 2.54,
        "mm" => value * 72.0 / 25.4,
        _ => return None,
    };
    Some((points * 100.0).round() / 100.0)
}

/// `"16px"` becomes `"12pt"`. Relative sizes (`em`, `%`) and anything that
/// cannot be parsed are kept as is.
pub fn normalize_font_size(size: &str) -> String {
    match font_size_in_pt(size) {
        Some(points) => format!("{points}pt"),
        None => size.to_string(),
    }
}

fn merge_value<T: PartialEq>(field: &mut Option<T>, value: Option<T>, first: bool, conflict: ConflictSolution) {
    if first {
        if value.is_some() {
            *field = value;
        }
        return;
    }
    if *field != value && conflict != ConflictSolution::KeepFirst {
        *field = None;
    }
}

fn merge_string(field: &mut Option<String>, value: Option<String>, first: bool, conflict: ConflictSolution) {
    if first || *field == value {
        merge_value(field, value, first, conflict);
        return;
    }
    match conflict {
        ConflictSolution::Remove => *field = None,
        ConflictSolution::KeepFirst => {}
        ConflictSolution::ReturnMultiple => {
            if field.is_some() {
                *field = Some(MULTIPLE.to_string());
            }
        }
    }
}

#[cfg(test)]
#[path = "format_state_tests.rs"]
mod format_state_tests;

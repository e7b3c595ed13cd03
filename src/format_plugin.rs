//! Keeps typed text in the editor's default format and applies pending
//! formats once the text they were waiting for arrives.

use tracing::{debug, warn};

use crate::editor::{Editor, EditorPlugin, FormatContentModelOptions, Key, KeyboardEvent, PluginEvent};
use crate::model::{BlockAddress, Paragraph, Segment, SegmentFormat, SegmentFormatKey};
use crate::pending_format::{apply_default_format, apply_pending_format, collapsed_caret};

/// Segment keys the default format is enforced for.
const DEFAULT_FORMAT_KEYS: [SegmentFormatKey; 4] = [
    SegmentFormatKey::FontFamily,
    SegmentFormatKey::FontSize,
    SegmentFormatKey::TextColor,
    SegmentFormatKey::BackgroundColor,
];

/// Forces the default format for a caret paragraph regardless of what its
/// content already carries.
pub type DefaultFormatPredicate = Box<dyn Fn(&Paragraph) -> bool>;

#[derive(Default)]
pub struct FormatPluginOptions {
    pub should_apply_default_format: Option<DefaultFormatPredicate>,
}

impl FormatPluginOptions {
    pub fn with_predicate(mut self, predicate: impl Fn(&Paragraph) -> bool + 'static) -> Self {
        self.should_apply_default_format = Some(Box::new(predicate));
        self
    }
}

pub struct FormatPlugin {
    default_format: SegmentFormat,
    default_keys: Vec<SegmentFormatKey>,
    /// Caret paragraph already checked for the default format.
    last_checked: Option<BlockAddress>,
    predicate: Option<DefaultFormatPredicate>,
}

impl FormatPlugin {
    pub fn new(default_format: SegmentFormat, options: FormatPluginOptions) -> Self {
        let default_keys = DEFAULT_FORMAT_KEYS
            .into_iter()
            .filter(|key| default_format.has(*key))
            .collect();
        Self {
            default_format,
            default_keys,
            last_checked: None,
            predicate: options.should_apply_default_format,
        }
    }

    fn on_key_down(&mut self, editor: &mut Editor, event: &KeyboardEvent) {
        if event.key.is_cursor_moving() {
            editor.clear_pending_format();
            self.last_checked = None;
            return;
        }

        let produces_text = event.is_character_value()
            || event.key == Key::Process
            || (editor.environment().is_android && event.key == Key::Unidentified);
        if self.default_keys.is_empty() || !produces_text || !self.should_apply_default_format(editor) {
            return;
        }

        let default_format = self.default_format.clone();
        let pending = editor.pending_format().cloned();
        let result = editor.format_content_model(
            |model, context| apply_default_format(model, context, &default_format, pending.as_ref()),
            FormatContentModelOptions::new("applyDefaultFormat"),
        );
        if let Err(error) = result {
            warn!(%error, "default format not applied");
        }
    }

    /// Checks each caret paragraph once until the caret is moved away or
    /// the content changes.
    fn should_apply_default_format(&mut self, editor: &Editor) -> bool {
        let model = editor.model();
        let Some(point) = collapsed_caret(model) else {
            return false;
        };
        if self.last_checked.as_ref() == Some(&point.paragraph) {
            return false;
        }
        self.last_checked = Some(point.paragraph.clone());

        let (Some(paragraph), Some(marker)) = (point.paragraph(model), point.marker(model)) else {
            return false;
        };
        if let Some(predicate) = &self.predicate
            && predicate(paragraph)
        {
            return true;
        }
        !self.default_keys.iter().all(|key| ambient_has(paragraph, marker, *key))
    }

    fn check_and_apply_pending_format(&self, editor: &mut Editor, data: Option<&str>) {
        let (Some(data), Some(format)) = (data.filter(|data| !data.is_empty()), editor.pending_format().cloned())
        else {
            return;
        };
        let result = editor.format_content_model(
            |model, context| apply_pending_format(model, context, data, &format),
            FormatContentModelOptions::new("applyPendingFormat"),
        );
        match result {
            Ok(applied) => debug!(applied, "pending format checked against input"),
            Err(error) => warn!(%error, "pending format not applied"),
        }
        editor.clear_pending_format();
    }
}

/// Whether `key` is set anywhere the caret inherits formatting from.
fn ambient_has(paragraph: &Paragraph, marker: &Segment, key: SegmentFormatKey) -> bool {
    marker.format.has(key)
        || marker.link.as_ref().is_some_and(|link| link.format.has(key))
        || marker.code.as_ref().is_some_and(|code| code.format.has(key))
        || paragraph.segment_format.as_ref().is_some_and(|format| format.has(key))
}

impl EditorPlugin for FormatPlugin {
    fn name(&self) -> &str {
        "Format"
    }

    fn on_plugin_event(&mut self, editor: &mut Editor, event: &PluginEvent) {
        match event {
            PluginEvent::KeyDown(key) => self.on_key_down(editor, key),
            PluginEvent::Input { data } => self.check_and_apply_pending_format(editor, data.as_deref()),
            PluginEvent::CompositionEnd { data } => self.check_and_apply_pending_format(editor, Some(data.as_str())),
            PluginEvent::MouseUp | PluginEvent::ContentChanged(_) => {
                self.last_checked = None;
                editor.retain_pending_format();
            }
            PluginEvent::EditorReady
            | PluginEvent::BeforeDispose
            | PluginEvent::SelectionChanged(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::EditorOptions;
    use crate::model::{BlockGroup, GroupPath};
    use crate::selection::DomPosition;

    fn arial() -> SegmentFormat {
        SegmentFormat {
            font_family: Some("Arial".to_string()),
            ..SegmentFormat::default()
        }
    }

    fn plain_doc() -> BlockGroup {
        BlockGroup::document().with_block(
            Paragraph::new().with_segments(vec![Segment::text("ab"), Segment::marker(SegmentFormat::default())]),
        )
    }

    #[test]
    fn only_set_default_keys_are_enforced() {
        let plugin = FormatPlugin::new(
            SegmentFormat {
                font_weight: Some("bold".to_string()),
                ..arial()
            },
            FormatPluginOptions::default(),
        );

        assert_eq!(plugin.default_keys, vec![SegmentFormatKey::FontFamily]);
    }

    #[test]
    fn typing_without_ambient_font_captures_default() {
        let mut editor = Editor::new(EditorOptions::default().with_default_format(arial()).with_model(plain_doc()));

        let mut plugin = FormatPlugin::new(arial(), FormatPluginOptions::default());
        plugin.on_key_down(&mut editor, &KeyboardEvent::character('x'));

        assert_eq!(editor.pending_format(), Some(&arial()));
        let position = editor.pending_format_state().position().cloned();
        assert_eq!(position, Some(DomPosition::new(BlockAddress::new(GroupPath::root(), 0), 2)));
    }

    #[test]
    fn paragraph_is_checked_once() {
        let mut editor = Editor::new(EditorOptions::default().with_model(plain_doc()));
        let mut plugin = FormatPlugin::new(arial(), FormatPluginOptions::default());

        assert!(plugin.should_apply_default_format(&editor));
        assert!(!plugin.should_apply_default_format(&editor));

        plugin.on_key_down(&mut editor, &KeyboardEvent::new(Key::ArrowLeft));
        assert!(plugin.should_apply_default_format(&editor));
    }

    #[test]
    fn ambient_format_satisfies_defaults() {
        let model = BlockGroup::document().with_block(
            Paragraph::new()
                .with_segment(Segment::marker(SegmentFormat::default()))
                .with_segment_format(arial()),
        );
        let editor = Editor::new(EditorOptions::default().with_model(model));
        let mut plugin = FormatPlugin::new(arial(), FormatPluginOptions::default());

        assert!(!plugin.should_apply_default_format(&editor));
    }

    #[test]
    fn predicate_forces_default_format() {
        let model = BlockGroup::document().with_block(
            Paragraph::new()
                .with_segment(Segment::marker(arial()))
                .with_decorator("h1", SegmentFormat::default()),
        );
        let editor = Editor::new(EditorOptions::default().with_model(model));
        let mut plugin = FormatPlugin::new(
            arial(),
            FormatPluginOptions::default().with_predicate(|paragraph| paragraph.heading_level().is_some()),
        );

        assert!(plugin.should_apply_default_format(&editor));
    }

    #[test]
    fn control_chords_do_not_capture() {
        let mut editor = Editor::new(EditorOptions::default().with_model(plain_doc()));
        let mut plugin = FormatPlugin::new(arial(), FormatPluginOptions::default());

        plugin.on_key_down(&mut editor, &KeyboardEvent::character('b').with_ctrl());

        assert_eq!(editor.pending_format(), None);
    }
}

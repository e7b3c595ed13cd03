//! Formatting commands a toolbar or key binding calls on an [`Editor`].
//!
//! Segment commands format every selected segment. On a collapsed caret
//! there is nothing to format yet, so they leave the resulting format
//! pending instead.

use crate::editing::{MergeFormat, MergeModelOptions, apply_table_format, merge_model, normalize_content_model, normalize_table};
use crate::editor::{Editor, FormatContentModelOptions};
use crate::error::EditorError;
use crate::model::{BlockAddress, BlockGroup, Divider, SegmentFormat, SegmentLocation, Table};
use crate::selection::{DomPosition, clear_selection, get_selected_segments, set_caret};

pub fn toggle_bold(editor: &mut Editor) -> Result<bool, EditorError> {
    format_segments(editor, "toggleBold", SegmentFormat::is_bold, |format, on| {
        format.font_weight = Some(if on { "bold" } else { "normal" }.to_string());
    })
}

pub fn toggle_italic(editor: &mut Editor) -> Result<bool, EditorError> {
    format_segments(
        editor,
        "toggleItalic",
        |format| format.italic == Some(true),
        |format, on| format.italic = Some(on),
    )
}

pub fn toggle_underline(editor: &mut Editor) -> Result<bool, EditorError> {
    format_segments(
        editor,
        "toggleUnderline",
        |format| format.underline == Some(true),
        |format, on| format.underline = Some(on),
    )
}

pub fn toggle_strikethrough(editor: &mut Editor) -> Result<bool, EditorError> {
    format_segments(
        editor,
        "toggleStrikethrough",
        |format| format.strikethrough == Some(true),
        |format, on| format.strikethrough = Some(on),
    )
}

pub fn set_font_name(editor: &mut Editor, font_name: &str) -> Result<bool, EditorError> {
    format_segments(
        editor,
        "setFontName",
        |_| false,
        |format, _| format.font_family = Some(font_name.to_string()),
    )
}

pub fn set_font_size(editor: &mut Editor, font_size: &str) -> Result<bool, EditorError> {
    format_segments(
        editor,
        "setFontSize",
        |_| false,
        |format, _| format.font_size = Some(font_size.to_string()),
    )
}

pub fn set_text_color(editor: &mut Editor, color: &str) -> Result<bool, EditorError> {
    format_segments(
        editor,
        "setTextColor",
        |_| false,
        |format, _| format.text_color = Some(color.to_string()),
    )
}

/// Applies `apply` to every selected segment, turning the style on unless
/// every segment already `has_style`.
fn format_segments<H, A>(editor: &mut Editor, api_name: &str, has_style: H, apply: A) -> Result<bool, EditorError>
where
    H: Fn(&SegmentFormat) -> bool,
    A: Fn(&mut SegmentFormat, bool),
{
    let pending = editor.pending_format().cloned();
    editor.format_content_model(
        |model, context| {
            let locations: Vec<SegmentLocation> = get_selected_segments(model, true)
                .into_iter()
                .map(|selected| selected.location)
                .collect();

            let in_paragraphs: Vec<&SegmentLocation> = locations
                .iter()
                .filter(|location| location.paragraph().is_some())
                .collect();
            let caret = match in_paragraphs.as_slice() {
                [only] => model.segment_at(only).filter(|segment| segment.is_marker()),
                _ => None,
            };
            if let Some(marker) = caret {
                let mut format = marker.format.clone();
                if let Some(pending) = &pending {
                    format.merge_from(pending);
                }
                let turning_on = !has_style(&format);
                apply(&mut format, turning_on);
                context.new_pending_format = Some(format);
                return false;
            }

            let turning_on = !locations
                .iter()
                .filter_map(|location| model.segment_at(location))
                .all(|segment| has_style(&segment.format));
            for location in &locations {
                if let Some(segment) = model.segment_at_mut(location) {
                    apply(&mut segment.format, turning_on);
                }
            }
            normalize_content_model(model);
            !locations.is_empty()
        },
        FormatContentModelOptions::new(api_name),
    )
}

/// Inserts an empty `rows` x `columns` table at the caret and moves the
/// caret into its first cell.
pub fn insert_table(editor: &mut Editor, rows: usize, columns: usize) -> Result<bool, EditorError> {
    if rows == 0 || columns == 0 {
        return Ok(false);
    }
    let mut table = Table::with_size(rows, columns);
    normalize_table(&mut table, Some(editor.default_format()));
    apply_table_format(&mut table, None, false);

    editor.format_content_model(
        |model, context| {
            let source = BlockGroup::document().with_block(table);
            let options = MergeModelOptions::default().with_merge_format(MergeFormat::MergeAll);
            let Some(point) = merge_model(model, source, Some(context), &options) else {
                return false;
            };

            if let Some(index) = point.paragraph.index.checked_sub(1) {
                let table = BlockAddress::new(point.paragraph.group.clone(), index);
                if model.table_at(&table).is_some() {
                    let first_cell = BlockAddress::new(table.cell_path(0, 0), 0);
                    clear_selection(model);
                    set_caret(model, &DomPosition::new(first_cell, 0));
                }
            }
            true
        },
        FormatContentModelOptions::new("insertTable"),
    )
}

pub fn insert_divider(editor: &mut Editor) -> Result<bool, EditorError> {
    editor.format_content_model(
        |model, context| {
            let source = BlockGroup::document().with_block(Divider::hr());
            merge_model(model, source, Some(context), &MergeModelOptions::default()).is_some()
        },
        FormatContentModelOptions::new("insertDivider"),
    )
}

/// Pastes `source` at the selection, replacing what is selected.
pub fn paste_model(editor: &mut Editor, source: BlockGroup, merge_format: MergeFormat) -> Result<bool, EditorError> {
    if editor.dom_selection()?.is_none() {
        return Err(EditorError::NoSelection);
    }
    editor.format_content_model(
        |model, context| {
            let options = MergeModelOptions::default()
                .with_merge_format(merge_format)
                .with_merge_table(true);
            merge_model(model, source, Some(context), &options).is_some()
        },
        FormatContentModelOptions::new("paste").with_change_source("Paste"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::EditorOptions;
    use crate::model::{Block, GroupPath, Paragraph, Segment};
    use crate::selection::DomSelection;

    fn root(index: usize) -> BlockAddress {
        BlockAddress::new(GroupPath::root(), index)
    }

    fn editor_with(text: &str) -> Editor {
        let model = BlockGroup::document().with_block(Paragraph::new().with_segment(Segment::text(text)));
        let mut editor = Editor::new(EditorOptions::default().with_model(model));
        editor
            .set_dom_selection(Some(DomSelection::collapsed(DomPosition::new(root(0), 0))))
            .expect("alive");
        editor
    }

    #[test]
    fn bold_on_caret_becomes_pending() {
        let mut editor = editor_with("abc");

        assert_eq!(toggle_bold(&mut editor), Ok(false));

        assert!(editor.pending_format().is_some_and(SegmentFormat::is_bold));
        let paragraph = editor.model().paragraph_at(&root(0)).expect("paragraph");
        assert!(paragraph.segments.iter().all(|segment| !segment.format.is_bold()));

        toggle_bold(&mut editor).expect("alive");
        assert!(editor.pending_format().is_some_and(|format| !format.is_bold()));
    }

    #[test]
    fn bold_toggles_over_a_range() {
        let mut editor = editor_with("abc");
        editor
            .set_dom_selection(Some(DomSelection::Range {
                start: DomPosition::new(root(0), 0),
                end: DomPosition::new(root(0), 2),
            }))
            .expect("alive");

        assert_eq!(toggle_bold(&mut editor), Ok(true));
        let paragraph = editor.model().paragraph_at(&root(0)).expect("paragraph");
        assert_eq!(paragraph.segments[0].as_text(), Some("ab"));
        assert!(paragraph.segments[0].format.is_bold());

        assert_eq!(toggle_bold(&mut editor), Ok(true));
        let paragraph = editor.model().paragraph_at(&root(0)).expect("paragraph");
        assert_eq!(paragraph.segments[0].format.font_weight.as_deref(), Some("normal"));
    }

    #[test]
    fn font_size_applies_to_selection() {
        let mut editor = editor_with("abc");
        editor
            .set_dom_selection(Some(DomSelection::Range {
                start: DomPosition::new(root(0), 1),
                end: DomPosition::new(root(0), 3),
            }))
            .expect("alive");

        assert_eq!(set_font_size(&mut editor, "20pt"), Ok(true));

        let state = editor.format_state(Default::default()).expect("alive");
        assert_eq!(state.font_size.as_deref(), Some("20pt"));
    }

    #[test]
    fn table_is_inserted_with_caret_in_first_cell() {
        let mut editor = editor_with("abc");

        assert_eq!(insert_table(&mut editor, 2, 3), Ok(true));

        let table = editor
            .model()
            .blocks
            .iter()
            .find_map(Block::as_table)
            .expect("table inserted");
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.column_count(), 3);

        let state = editor.format_state(Default::default()).expect("alive");
        assert_eq!(state.is_in_table, Some(true));
    }

    #[test]
    fn divider_lands_between_split_halves() {
        let mut editor = editor_with("abcd");
        editor
            .set_dom_selection(Some(DomSelection::collapsed(DomPosition::new(root(0), 2))))
            .expect("alive");

        assert_eq!(insert_divider(&mut editor), Ok(true));

        let blocks = &editor.model().blocks;
        assert_eq!(blocks.len(), 3);
        assert!(matches!(blocks[1], Block::Divider(_)));
    }

    #[test]
    fn paste_needs_a_selection() {
        let model = BlockGroup::document().with_block(Paragraph::new().with_segment(Segment::text("abc")));
        let mut editor = Editor::new(EditorOptions::default().with_model(model));

        let source = BlockGroup::document().with_block(Paragraph::new().with_segment(Segment::text("x")));
        assert_eq!(paste_model(&mut editor, source, MergeFormat::None), Err(EditorError::NoSelection));
    }

    #[test]
    fn paste_merges_inline() {
        let mut editor = editor_with("abc");
        let source = BlockGroup::document().with_block(Paragraph::new().with_segment(Segment::text("xy")));

        assert_eq!(paste_model(&mut editor, source, MergeFormat::None), Ok(true));

        let paragraph = editor.model().paragraph_at(&root(0)).expect("paragraph");
        assert_eq!(paragraph.text(), "xyabc");
    }
}

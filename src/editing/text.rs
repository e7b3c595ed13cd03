//! Keyboard level text editing at the caret.
//!
//! These stand in for what a browser does natively between key events:
//! the editor runs them before dispatching the matching plugin event.

use tracing::trace;

use super::{
    DeleteResult, InsertPoint, delete_selection, normalize_content_model, normalize_paragraph, split_paragraph,
};
use crate::model::{Block, BlockGroup, Segment, SegmentKind};

/// Types `text` at the caret, replacing an expanded selection. The new text
/// takes the format and link of the caret.
pub fn insert_text_at_marker(model: &mut BlockGroup, text: &str) -> bool {
    let result = delete_selection(model, None);
    let Some(point) = result.insert_point else {
        return false;
    };
    let Some(paragraph) = model.paragraph_at_mut(&point.paragraph) else {
        return false;
    };
    let Some(marker) = paragraph.segments.get(point.marker_index) else {
        return false;
    };

    let mut segment = Segment::text(text).with_format(marker.format.clone());
    segment.link = marker.link.clone();
    segment.code = marker.code.clone();
    paragraph.segments.insert(point.marker_index, segment);
    paragraph.is_implicit = false;
    normalize_paragraph(paragraph);
    if result.delete_result == DeleteResult::Range {
        normalize_content_model(model);
    }
    trace!(chars = text.chars().count(), "inserted text");
    true
}

/// Backspace. Removes the selection, or the character before the caret, or
/// joins the paragraph with the one before it.
pub fn delete_backward(model: &mut BlockGroup) -> bool {
    let result = delete_selection(model, None);
    let Some(point) = result.insert_point else {
        return false;
    };
    if result.delete_result == DeleteResult::Range {
        normalize_content_model(model);
        return true;
    }

    let Some(paragraph) = model.paragraph_at_mut(&point.paragraph) else {
        return false;
    };
    normalize_paragraph(paragraph);
    let Some(marker_index) = paragraph.marker_index() else {
        return false;
    };
    if let Some(index) = marker_index.checked_sub(1) {
        let remove = match &mut paragraph.segments[index].kind {
            SegmentKind::Text(text) => {
                text.pop();
                text.is_empty()
            }
            _ => true,
        };
        if remove {
            paragraph.segments.remove(index);
        }
        normalize_paragraph(paragraph);
        return true;
    }

    if point.paragraph.index == 0 {
        return false;
    }
    let previous = point.paragraph.index - 1;
    join_paragraphs(model, &point, previous)
}

/// Delete. Removes the selection, or the character after the caret, or
/// pulls the next paragraph up into this one.
pub fn delete_forward(model: &mut BlockGroup) -> bool {
    let result = delete_selection(model, None);
    let Some(point) = result.insert_point else {
        return false;
    };
    if result.delete_result == DeleteResult::Range {
        normalize_content_model(model);
        return true;
    }

    let Some(paragraph) = model.paragraph_at_mut(&point.paragraph) else {
        return false;
    };
    normalize_paragraph(paragraph);
    let Some(marker_index) = paragraph.marker_index() else {
        return false;
    };
    let next = marker_index + 1;
    let at_end = match paragraph.segments.get(next) {
        None => true,
        Some(segment) => segment.is_br() && next + 1 == paragraph.segments.len(),
    };
    if !at_end {
        let remove = match &mut paragraph.segments[next].kind {
            SegmentKind::Text(text) => {
                if !text.is_empty() {
                    text.remove(0);
                }
                text.is_empty()
            }
            _ => true,
        };
        if remove {
            paragraph.segments.remove(next);
        }
        normalize_paragraph(paragraph);
        return true;
    }

    let following = point.paragraph.index + 1;
    let mut next_point = point.clone();
    next_point.paragraph.index = following;
    join_paragraphs(model, &next_point, point.paragraph.index)
}

/// Enter. Splits the paragraph (and list item) at the caret.
pub fn insert_paragraph_break(model: &mut BlockGroup) -> bool {
    let Some(mut point) = delete_selection(model, None).insert_point else {
        return false;
    };
    let original = point.paragraph.clone();
    if split_paragraph(model, &mut point, None).is_none() {
        return false;
    }

    if let Some(paragraph) = model.paragraph_at_mut(&original) {
        normalize_paragraph(paragraph);
        if paragraph.segments.is_empty() {
            paragraph.segments.push(Segment::br());
        }
    }
    normalize_content_model(model);
    true
}

/// Moves the segments of the paragraph at `from` to the end of the
/// paragraph at `into_index` in the same group, then drops `from`.
fn join_paragraphs(model: &mut BlockGroup, from: &InsertPoint, into_index: usize) -> bool {
    let Some(group) = model.group_at_mut(&from.paragraph.group) else {
        return false;
    };
    let (Some(Block::Paragraph(_)), Some(Block::Paragraph(_))) =
        (group.blocks.get(into_index), group.blocks.get(from.paragraph.index))
    else {
        return false;
    };

    let Block::Paragraph(moved) = group.blocks.remove(from.paragraph.index) else {
        return false;
    };
    let Some(Block::Paragraph(target)) = group.blocks.get_mut(into_index) else {
        return false;
    };
    if target.segments.last().is_some_and(Segment::is_br) {
        target.segments.pop();
    }
    target.segments.extend(moved.segments);
    target.is_implicit = false;
    normalize_paragraph(target);
    trace!(into = into_index, "joined paragraphs");
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BlockAddress, GroupPath, Paragraph, SegmentFormat};
    use crate::selection::{DomPosition, select_range};

    fn root(index: usize) -> BlockAddress {
        BlockAddress::new(GroupPath::root(), index)
    }

    fn caret(before: &str, after: &str) -> Paragraph {
        Paragraph::new().with_segments(vec![
            Segment::text(before),
            Segment::marker(SegmentFormat::default()),
            Segment::text(after),
        ])
    }

    fn texts(model: &BlockGroup) -> Vec<String> {
        model
            .blocks
            .iter()
            .filter_map(Block::as_paragraph)
            .map(Paragraph::text)
            .collect()
    }

    #[test]
    fn typed_text_takes_marker_format() {
        let bold = SegmentFormat::bold();
        let mut doc = BlockGroup::document().with_block(Paragraph::new().with_segments(vec![
            Segment::text("a"),
            Segment::marker(bold.clone()),
        ]));

        assert!(insert_text_at_marker(&mut doc, "b"));

        let paragraph = doc.paragraph_at(&root(0)).unwrap_or_else(|| panic!("paragraph gone"));
        assert_eq!(paragraph.text(), "ab");
        assert_eq!(paragraph.segments[1].format, bold);
        assert!(paragraph.segments[2].is_marker());
    }

    #[test]
    fn typing_replaces_selection() {
        let mut doc = BlockGroup::document().with_block(Paragraph::new().with_segment(Segment::text("hello")));
        select_range(&mut doc, &DomPosition::new(root(0), 1), &DomPosition::new(root(0), 4));

        assert!(insert_text_at_marker(&mut doc, "ipp"));

        assert_eq!(texts(&doc), vec!["hippo"]);
    }

    #[test]
    fn backspace_removes_previous_character() {
        let mut doc = BlockGroup::document().with_block(caret("abc", "d"));

        assert!(delete_backward(&mut doc));

        assert_eq!(texts(&doc), vec!["abd"]);
    }

    #[test]
    fn backspace_at_start_joins_paragraphs() {
        let mut doc = BlockGroup::document()
            .with_block(Paragraph::new().with_segments(vec![Segment::text("one"), Segment::br()]))
            .with_block(caret("", "two"));

        assert!(delete_backward(&mut doc));

        assert_eq!(texts(&doc), vec!["onetwo"]);
        assert!(InsertPoint::locate(&doc).is_some());
    }

    #[test]
    fn backspace_at_document_start_does_nothing() {
        let mut doc = BlockGroup::document().with_block(caret("", "x"));

        assert!(!delete_backward(&mut doc));
        assert_eq!(texts(&doc), vec!["x"]);
    }

    #[test]
    fn delete_removes_next_character_or_joins() {
        let mut doc = BlockGroup::document()
            .with_block(caret("a", "b"))
            .with_block(Paragraph::new().with_segment(Segment::text("next")));

        assert!(delete_forward(&mut doc));
        assert_eq!(texts(&doc), vec!["a", "next"]);

        assert!(delete_forward(&mut doc));
        assert_eq!(texts(&doc), vec!["anext"]);
    }

    #[test]
    fn enter_splits_paragraph() {
        let mut doc = BlockGroup::document().with_block(caret("ab", "cd"));

        assert!(insert_paragraph_break(&mut doc));

        assert_eq!(texts(&doc), vec!["ab", "cd"]);
        let point = InsertPoint::locate(&doc).unwrap_or_else(|| panic!("caret lost"));
        assert_eq!(point.paragraph, root(1));
        assert_eq!(point.marker_index, 0);
    }

    #[test]
    fn enter_at_paragraph_start_keeps_empty_line() {
        let mut doc = BlockGroup::document().with_block(caret("", "text"));

        assert!(insert_paragraph_break(&mut doc));

        assert_eq!(doc.blocks.len(), 2);
        assert_eq!(texts(&doc), vec!["\n", "text"]);
    }
}

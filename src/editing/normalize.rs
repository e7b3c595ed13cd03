use crate::model::{Block, BlockGroup, BlockGroupKind, Paragraph, Segment, SegmentKind};

/// Repairs a model after editing: empty text runs and empty blocks are
/// removed, adjacent identical text runs are joined and trailing line
/// breaks are fixed up. Running it twice changes nothing.
pub fn normalize_content_model(group: &mut BlockGroup) {
    for index in (0..group.blocks.len()).rev() {
        match &mut group.blocks[index] {
            Block::BlockGroup(inner) => normalize_content_model(inner),
            Block::Paragraph(paragraph) => normalize_paragraph(paragraph),
            Block::Table(table) => {
                for row in &mut table.rows {
                    for cell in &mut row.cells {
                        normalize_content_model(cell);
                    }
                }
            }
            Block::Divider(_) | Block::Entity(_) => {}
        }
        if is_block_empty(&group.blocks[index]) {
            group.blocks.remove(index);
        }
    }
}

pub fn normalize_paragraph(paragraph: &mut Paragraph) {
    for segment in &mut paragraph.segments {
        if let SegmentKind::General(inner) = &mut segment.kind {
            normalize_content_model(inner);
        }
    }

    paragraph
        .segments
        .retain(|segment| !matches!(&segment.kind, SegmentKind::Text(text) if text.is_empty()));
    merge_adjacent_text(&mut paragraph.segments);

    if !paragraph.is_implicit {
        fix_trailing_break(paragraph);
    }
}

/// A caret at the end of a line needs a `Br` after it to stay visible, and
/// a `Br` ending a line with other content is redundant.
fn fix_trailing_break(paragraph: &mut Paragraph) {
    let segments = &mut paragraph.segments;
    let Some(last) = segments.last() else {
        return;
    };

    if last.is_marker() {
        let before = segments.len().checked_sub(2).map(|index| &segments[index]);
        if before.is_none_or(Segment::is_br) {
            segments.push(Segment::br());
        }
    } else if last.is_br() {
        let content: Vec<&Segment> = segments.iter().filter(|segment| !segment.is_marker()).collect();
        if content.len() > 1 && !content[content.len() - 2].is_br() {
            segments.pop();
        }
    }
}

fn merge_adjacent_text(segments: &mut Vec<Segment>) {
    let mut index = 1;
    while index < segments.len() {
        let mergeable = {
            let (previous, current) = (&segments[index - 1], &segments[index]);
            matches!(
                (&previous.kind, &current.kind),
                (SegmentKind::Text(_), SegmentKind::Text(_))
            ) && previous.format == current.format
                && previous.is_selected == current.is_selected
                && previous.link == current.link
                && previous.code == current.code
        };
        if !mergeable {
            index += 1;
            continue;
        }
        let current = segments.remove(index);
        if let (SegmentKind::Text(previous), SegmentKind::Text(text)) = (&mut segments[index - 1].kind, current.kind) {
            previous.push_str(&text);
        }
    }
}

pub(crate) fn is_block_empty(block: &Block) -> bool {
    match block {
        Block::Paragraph(paragraph) => paragraph.segments.is_empty(),
        Block::Table(table) => table.rows.iter().all(|row| row.cells.is_empty()),
        Block::BlockGroup(group) => match group.kind {
            BlockGroupKind::FormatContainer(_) | BlockGroupKind::ListItem(_) => group.blocks.is_empty(),
            BlockGroupKind::General(_) | BlockGroupKind::TableCell(_) | BlockGroupKind::Document(_) => false,
        },
        Block::Divider(_) | Block::Entity(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ListLevel, ListType, SegmentFormat, Table};

    fn marker() -> Segment {
        Segment::marker(SegmentFormat::default())
    }

    fn messy_document() -> BlockGroup {
        let mut empty_list = BlockGroup::list_item(vec![ListLevel::new(ListType::Unordered)], SegmentFormat::default());
        empty_list.blocks.push(Paragraph::new().into());

        BlockGroup::document()
            .with_block(Paragraph::new().with_segments(vec![Segment::text("a"), Segment::text(""), Segment::text("b")]))
            .with_block(Paragraph::new())
            .with_block(Paragraph::new().with_segments(vec![marker()]))
            .with_block(Paragraph::new().with_segments(vec![Segment::text("x"), Segment::br()]))
            .with_block(Paragraph::new().with_segments(vec![Segment::text("y"), marker(), Segment::br()]))
            .with_block(empty_list)
            .with_block(Table::new())
    }

    #[test]
    fn removes_empty_blocks_and_text() {
        let mut doc = messy_document();

        normalize_content_model(&mut doc);

        assert_eq!(doc.blocks.len(), 4);
        let first = doc.blocks[0].as_paragraph().map(Paragraph::text);
        assert_eq!(first.as_deref(), Some("ab"));
    }

    #[test]
    fn fixes_trailing_breaks() {
        let mut doc = messy_document();

        normalize_content_model(&mut doc);

        let caret_only = doc.blocks[1].as_paragraph().map(|p| p.segments.len());
        assert_eq!(caret_only, Some(2));
        assert!(doc.blocks[1].as_paragraph().is_some_and(|p| p.segments[1].is_br()));

        let text_then_break = doc.blocks[2].as_paragraph().map(|p| p.segments.len());
        assert_eq!(text_then_break, Some(1));

        let caret_before_break = doc.blocks[3].as_paragraph().map(|p| p.segments.len());
        assert_eq!(caret_before_break, Some(2));
    }

    #[test]
    fn normalization_is_idempotent() {
        let mut once = messy_document();
        normalize_content_model(&mut once);
        let mut twice = once.clone();
        normalize_content_model(&mut twice);

        assert_eq!(once, twice);
    }

    #[test]
    fn implicit_paragraphs_keep_their_breaks() {
        let mut paragraph = Paragraph::implicit().with_segments(vec![Segment::text("x"), Segment::br()]);

        normalize_paragraph(&mut paragraph);

        assert_eq!(paragraph.segments.len(), 2);
    }

    #[test]
    fn keeps_double_break_lines() {
        let mut paragraph = Paragraph::new().with_segments(vec![Segment::text("x"), Segment::br(), marker()]);

        normalize_paragraph(&mut paragraph);
        let after_first = paragraph.clone();
        normalize_paragraph(&mut paragraph);

        assert_eq!(after_first.segments.len(), 4);
        assert_eq!(paragraph, after_first);
    }
}

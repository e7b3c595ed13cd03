use super::*;
use crate::model::{Divider, Entity, SegmentFormat, Table};
use crate::selection::{DomPosition, select_range, select_table_cells};

fn root(index: usize) -> BlockAddress {
    BlockAddress::new(GroupPath::root(), index)
}

fn paragraph(text: &str) -> Paragraph {
    Paragraph::new().with_segment(Segment::text(text))
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
fn nothing_selected_is_reported() {
    let mut doc = BlockGroup::document().with_block(paragraph("plain"));

    let result = delete_selection(&mut doc, None);

    assert_eq!(result.delete_result, DeleteResult::NothingToDelete);
    assert!(result.insert_point.is_none());
}

#[test]
fn collapsed_caret_is_returned_untouched() {
    let mut doc = BlockGroup::document().with_block(
        Paragraph::new().with_segments(vec![Segment::text("ab"), Segment::marker(SegmentFormat::default())]),
    );
    let before = doc.clone();

    let result = delete_selection(&mut doc, None);

    assert_eq!(result.delete_result, DeleteResult::NotDeleted);
    assert_eq!(result.insert_point.map(|point| point.marker_index), Some(1));
    assert_eq!(doc, before);
}

#[test]
fn range_across_paragraphs_is_joined() {
    let mut doc = BlockGroup::document()
        .with_block(paragraph("hello"))
        .with_block(paragraph("middle"))
        .with_block(paragraph("world"));
    select_range(&mut doc, &DomPosition::new(root(0), 2), &DomPosition::new(root(2), 3));

    let result = delete_selection(&mut doc, None);

    assert_eq!(result.delete_result, DeleteResult::Range);
    let point = result.insert_point.unwrap_or_else(|| panic!("no insert point"));
    assert_eq!(point.paragraph, root(0));
    assert_eq!(point.marker_index, 1);
    assert_eq!(texts(&doc), vec!["held", "", ""]);
    let first = doc.paragraph_at(&root(0)).map(|p| p.segments.len());
    assert_eq!(first, Some(3));
}

#[test]
fn whole_blocks_are_removed_and_entities_reported() {
    let mut divider = Divider::hr();
    divider.is_selected = true;
    let mut entity = Entity::new("widget", "w1");
    entity.is_selected = true;
    let mut doc = BlockGroup::document()
        .with_block(Paragraph::new().with_segment(Segment::text("start").selected()))
        .with_block(divider)
        .with_block(entity)
        .with_block(Paragraph::new().with_segments(vec![Segment::text("end").selected(), Segment::text("!")]));
    let mut context = FormatContext::default();

    let result = delete_selection(&mut doc, Some(&mut context));

    assert_eq!(doc.blocks.len(), 2);
    assert_eq!(context.deleted_entities.len(), 1);
    assert_eq!(context.deleted_entities[0].id, "w1");
    let point = result.insert_point.unwrap_or_else(|| panic!("no insert point"));
    assert_eq!(point.paragraph, root(0));
    // The tail of the last paragraph moved behind the caret.
    assert_eq!(texts(&doc)[0], "!");
}

#[test]
fn selected_cells_are_cleared() {
    let mut table = Table::with_size(1, 3);
    for row in &mut table.rows {
        for cell in &mut row.cells {
            cell.blocks.push(paragraph("content").into());
        }
    }
    let mut doc = BlockGroup::document().with_block(table);
    select_table_cells(&mut doc, &root(0), (0, 0), (0, 1));

    let result = delete_selection(&mut doc, None);

    let point = result.insert_point.unwrap_or_else(|| panic!("no insert point"));
    assert_eq!(point.table_context.map(|context| context.col_index), Some(0));
    let table = doc.table_at(&root(0)).unwrap_or_else(|| panic!("table gone"));
    let cell_text = |col: usize| {
        table.rows[0].cells[col].blocks[0]
            .as_paragraph()
            .map(|p| p.segments.len())
    };
    assert_eq!(cell_text(0), Some(2));
    assert_eq!(cell_text(1), Some(1));
    assert_eq!(
        table.rows[0].cells[2].blocks[0].as_paragraph().map(Paragraph::text),
        Some("content".to_string())
    );
}

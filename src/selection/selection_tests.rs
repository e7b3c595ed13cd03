use super::*;
use crate::model::{
    BlockGroupType, Divider, ListLevel, ListType, Paragraph, SegmentFormat, Table,
};

fn text_paragraph(text: &str, selected: bool) -> Paragraph {
    let mut segment = Segment::text(text);
    segment.is_selected = selected;
    Paragraph::new().with_segment(segment)
}

fn list_item(paragraphs: Vec<Paragraph>) -> BlockGroup {
    let mut item = BlockGroup::list_item(vec![ListLevel::new(ListType::Ordered)], SegmentFormat::default());
    item.blocks = paragraphs.into_iter().map(Block::Paragraph).collect();
    item
}

fn texts(selection: &SelectionInfo<'_>) -> Vec<String> {
    selection
        .segments
        .iter()
        .flatten()
        .filter_map(|selected| selected.segment.as_text().map(str::to_string))
        .collect()
}

#[test]
fn yields_paragraphs_in_document_order() {
    let doc = BlockGroup::document()
        .with_block(text_paragraph("one", true))
        .with_block(text_paragraph("skipped", false))
        .with_block(text_paragraph("two", true));

    let selections = collect_selections(&doc, &IterateSelectionsOptions::default());

    assert_eq!(selections.len(), 2);
    assert_eq!(texts(&selections[0]), vec!["one"]);
    assert_eq!(texts(&selections[1]), vec!["two"]);
    assert_eq!(selections[0].block.map(|block| block.index), Some(0));
    assert_eq!(selections[1].block.map(|block| block.index), Some(2));
}

#[test]
fn path_ends_with_document() {
    let doc = BlockGroup::document().with_block(list_item(vec![text_paragraph("item", true)]));

    let selections = collect_selections(
        &doc,
        &IterateSelectionsOptions::default().with_list_format_holder(ListFormatHolderPolicy::Never),
    );

    assert_eq!(selections.len(), 1);
    let path = &selections[0].path;
    assert_eq!(path.len(), 2);
    assert_eq!(path[0].group_type(), BlockGroupType::ListItem);
    assert_eq!(path[1].group_type(), BlockGroupType::Document);
    assert_eq!(selections[0].location, GroupPath::from_steps(vec![PathStep::Group(0)]));
}

#[test]
fn callback_can_stop_early() {
    let doc = BlockGroup::document()
        .with_block(text_paragraph("a", true))
        .with_block(text_paragraph("b", true))
        .with_block(text_paragraph("c", true));

    let mut seen = 0;
    iterate_selections(&doc, &IterateSelectionsOptions::default(), |_| {
        seen += 1;
        seen == 2
    });

    assert_eq!(seen, 2);
}

#[test]
fn format_holder_follows_policy() {
    let full = BlockGroup::document().with_block(list_item(vec![text_paragraph("all", true)]));
    let partial = BlockGroup::document().with_block(list_item(vec![
        text_paragraph("in", true),
        text_paragraph("out", false),
    ]));

    let holder_count = |doc: &BlockGroup, policy| {
        collect_selections(doc, &IterateSelectionsOptions::default().with_list_format_holder(policy))
            .iter()
            .filter(|selection| {
                selection
                    .segments
                    .iter()
                    .flatten()
                    .any(|selected| matches!(selected.location, SegmentLocation::FormatHolder { .. }))
            })
            .count()
    };

    assert_eq!(holder_count(&full, ListFormatHolderPolicy::AllSegments), 1);
    assert_eq!(holder_count(&full, ListFormatHolderPolicy::Never), 0);
    assert_eq!(holder_count(&partial, ListFormatHolderPolicy::AllSegments), 0);
    assert_eq!(holder_count(&partial, ListFormatHolderPolicy::AnySegment), 1);
}

fn selected_table() -> BlockGroup {
    let mut table = Table::with_size(1, 2);
    for row in &mut table.rows {
        for cell in &mut row.cells {
            cell.set_selected(true);
            cell.blocks.push(text_paragraph("x", false).into());
        }
    }
    BlockGroup::document().with_block(table)
}

#[test]
fn whole_table_reported_once_when_ignored() {
    let doc = selected_table();

    let selections = collect_selections(
        &doc,
        &IterateSelectionsOptions::default().with_table_cell_content(TableCellContentPolicy::IgnoreForTable),
    );

    assert_eq!(selections.len(), 1);
    assert!(selections[0].block.is_some_and(|block| block.block.as_table().is_some()));
    assert!(selections[0].table_context.is_none());
}

#[test]
fn selected_cells_report_context_and_content() {
    let doc = selected_table();

    let selections = collect_selections(&doc, &IterateSelectionsOptions::default());

    // Each cell is reported, then its paragraph.
    assert_eq!(selections.len(), 4);
    let cell = &selections[0];
    assert!(cell.block.is_none() && cell.segments.is_none());
    let context = cell.table_context.clone().unwrap_or_else(|| panic!("missing table context"));
    assert!(context.is_whole_table_selected);
    assert_eq!((context.row_index, context.col_index), (0, 0));
    assert_eq!(texts(&selections[1]), vec!["x"]);

    let opaque = collect_selections(
        &doc,
        &IterateSelectionsOptions {
            content_under_selected_table_cell: TableCellContentPolicy::IgnoreForTableOrCell,
            ..IterateSelectionsOptions::default()
        },
    );
    assert_eq!(opaque.len(), 1);
}

#[test]
fn trims_caret_at_paragraph_edges() {
    let doc = BlockGroup::document()
        .with_block(Paragraph::new().with_segments(vec![Segment::text("before"), Segment::marker(SegmentFormat::default())]))
        .with_block(text_paragraph("middle", true))
        .with_block(Paragraph::new().with_segments(vec![Segment::marker(SegmentFormat::default()), Segment::text("after")]));

    let paragraphs = get_selected_paragraphs(&doc);

    assert_eq!(paragraphs.len(), 1);
    assert_eq!(paragraphs[0].1.text(), "middle");
}

#[test]
fn lone_caret_is_kept() {
    let doc = BlockGroup::document().with_block(
        Paragraph::new().with_segments(vec![Segment::text("text"), Segment::marker(SegmentFormat::default())]),
    );

    let segments = get_selected_segments(&doc, false);

    assert_eq!(segments.len(), 1);
    assert!(segments[0].segment.is_marker());
}

#[test]
fn operational_blocks_deduplicate_list_items() {
    let doc = BlockGroup::document()
        .with_block(list_item(vec![text_paragraph("a", true), text_paragraph("b", true)]))
        .with_block(text_paragraph("plain", true));

    let blocks = get_operational_blocks(&doc, &[BlockGroupType::ListItem], &[], false);

    assert_eq!(blocks.len(), 2);
    assert!(blocks[0].group().is_some_and(|group| group.as_list_item().is_some()));
    assert!(matches!(blocks[1], OperationalBlock::Block { .. }));
}

#[test]
fn deep_first_prefers_earlier_type_at_any_depth() {
    let mut quote = BlockGroup::format_container("blockquote");
    quote.blocks.push(text_paragraph("quoted", true).into());
    let doc = BlockGroup::document().with_block(list_item(vec![]).with_block(quote));
    let types = [BlockGroupType::ListItem, BlockGroupType::FormatContainer];

    let nearest = get_operational_blocks(&doc, &types, &[], false);
    let deep = get_operational_blocks(&doc, &types, &[], true);

    assert_eq!(
        nearest[0].group().map(BlockGroup::group_type),
        Some(BlockGroupType::FormatContainer)
    );
    assert_eq!(deep[0].group().map(BlockGroup::group_type), Some(BlockGroupType::ListItem));
}

#[test]
fn stop_types_block_the_ancestor_search() {
    let mut table = Table::with_size(1, 1);
    if let Some(cell) = table.cell_mut(0, 0) {
        cell.blocks.push(text_paragraph("cell", true).into());
    }
    let doc = BlockGroup::document().with_block(list_item(vec![]).with_block(table));

    assert!(get_first_selected_list_item(&doc).is_none());
    let (address, found) = get_first_selected_table(&doc).unwrap_or_else(|| panic!("no table"));
    assert_eq!(address.group, GroupPath::from_steps(vec![PathStep::Group(0)]));
    assert_eq!(found.rows.len(), 1);
}

#[test]
fn dividers_are_reported_as_blocks() {
    let mut divider = Divider::hr();
    divider.is_selected = true;
    let doc = BlockGroup::document().with_block(divider);

    let selections = collect_selections(&doc, &IterateSelectionsOptions::default());

    assert_eq!(selections.len(), 1);
    assert!(matches!(selections[0].block.map(|block| block.block), Some(Block::Divider(_))));
}

// ============================================================================
// Selection placement
// ============================================================================

fn two_paragraphs() -> BlockGroup {
    BlockGroup::document()
        .with_block(Paragraph::new().with_segment(Segment::text("hello")))
        .with_block(Paragraph::new().with_segment(Segment::text("world")))
}

fn root_paragraph(index: usize) -> BlockAddress {
    BlockAddress::new(GroupPath::root(), index)
}

#[test]
fn set_caret_splits_text_and_reports_position() {
    let mut doc = two_paragraphs();
    let position = DomPosition::new(root_paragraph(0), 2);

    assert!(set_caret(&mut doc, &position));

    let paragraph = doc.paragraph_at(&root_paragraph(0)).unwrap_or_else(|| panic!("missing"));
    assert_eq!(paragraph.segments.len(), 3);
    assert_eq!(paragraph.segments[0].as_text(), Some("he"));
    assert!(paragraph.segments[1].is_marker());
    assert_eq!(paragraph.segments[2].as_text(), Some("llo"));
    assert_eq!(dom_selection_of(&doc), Some(DomSelection::collapsed(position)));
}

#[test]
fn select_range_spans_paragraphs() {
    let mut doc = two_paragraphs();
    let start = DomPosition::new(root_paragraph(0), 3);
    let end = DomPosition::new(root_paragraph(1), 2);

    assert!(select_range(&mut doc, &end, &start));

    let selected: Vec<String> = get_selected_segments(&doc, false)
        .iter()
        .filter_map(|selected| selected.segment.as_text().map(str::to_string))
        .collect();
    assert_eq!(selected, vec!["lo", "wo"]);
    assert_eq!(dom_selection_of(&doc), Some(DomSelection::Range { start, end }));
}

#[test]
fn moving_the_caret_leaves_a_single_marker() {
    let mut doc = two_paragraphs();
    set_caret(&mut doc, &DomPosition::new(root_paragraph(0), 1));
    set_caret(&mut doc, &DomPosition::new(root_paragraph(1), 5));

    let markers = collect_selections(&doc, &IterateSelectionsOptions::default())
        .iter()
        .flat_map(|selection| selection.segments.clone().unwrap_or_default())
        .filter(|selected| selected.segment.is_marker())
        .count();
    assert_eq!(markers, 1);
}

#[test]
fn table_cell_selection_round_trips() {
    let mut doc = BlockGroup::document().with_block(Table::with_size(3, 3));
    let table = root_paragraph(0);

    assert!(select_table_cells(&mut doc, &table, (2, 1), (1, 2)));

    assert_eq!(
        dom_selection_of(&doc),
        Some(DomSelection::Table {
            table,
            first_row: 1,
            first_column: 1,
            last_row: 2,
            last_column: 2,
        })
    );
}

#[test]
fn image_selection_is_reported_as_image() {
    let mut doc = BlockGroup::document().with_block(
        Paragraph::new().with_segments(vec![Segment::text("pic "), Segment::image("cat.png")]),
    );
    let location = SegmentLocation::InParagraph {
        paragraph: root_paragraph(0),
        index: 1,
    };

    assert!(select_image(&mut doc, &location));

    assert_eq!(dom_selection_of(&doc), Some(DomSelection::Image { image: location }));
}

use super::*;
use crate::model::{BlockAddress, GroupPath, ListLevel, SegmentLocation, Table};
use crate::selection::{select_image, select_table_cells};

fn colored(text: &str, color: &str) -> Segment {
    Segment::text(text)
        .with_format(SegmentFormat {
            text_color: Some(color.to_string()),
            ..SegmentFormat::default()
        })
        .selected()
}

fn sized(text: &str, size: &str) -> Segment {
    Segment::text(text)
        .with_format(SegmentFormat {
            font_size: Some(size.to_string()),
            ..SegmentFormat::default()
        })
        .selected()
}

fn doc_with(segments: Vec<Segment>) -> BlockGroup {
    BlockGroup::document().with_block(Paragraph::new().with_segments(segments))
}

fn root(index: usize) -> BlockAddress {
    BlockAddress::new(GroupPath::root(), index)
}

#[test]
fn conflicting_colors_are_resolved_per_policy() {
    let doc = doc_with(vec![colored("a", "red"), colored("b", "blue")]);

    let removed = retrieve_model_format_state(&doc, None, ConflictSolution::Remove);
    let kept = retrieve_model_format_state(&doc, None, ConflictSolution::KeepFirst);
    let multiple = retrieve_model_format_state(&doc, None, ConflictSolution::ReturnMultiple);

    assert_eq!(removed.text_color, None);
    assert_eq!(kept.text_color.as_deref(), Some("red"));
    assert_eq!(multiple.text_color.as_deref(), Some(MULTIPLE));
}

#[test]
fn agreeing_segments_keep_their_value() {
    let doc = doc_with(vec![colored("a", "red"), colored("b", "red")]);

    let state = retrieve_model_format_state(&doc, None, ConflictSolution::Remove);

    assert_eq!(state.text_color.as_deref(), Some("red"));
    assert_eq!(state.is_bold, Some(false));
    assert_eq!(state.can_unlink, Some(false));
}

#[test]
fn font_sizes_compare_in_points() {
    let same = doc_with(vec![sized("a", "16px"), sized("b", "12pt")]);
    let state = retrieve_model_format_state(&same, None, ConflictSolution::Remove);
    assert_eq!(state.font_size.as_deref(), Some("12pt"));

    let small = doc_with(vec![sized("a", "10px")]);
    let state = retrieve_model_format_state(&small, None, ConflictSolution::Remove);
    assert_eq!(state.font_size.as_deref(), Some("7.5pt"));
}

#[test]
fn px_to_pt_conversion() {
    assert_eq!(font_size_in_pt("16px"), Some(12.0));
    assert_eq!(font_size_in_pt("13px"), Some(9.75));
    assert_eq!(font_size_in_pt("12pt"), Some(12.0));
    assert_eq!(font_size_in_pt("1in"), Some(72.0));
    assert_eq!(font_size_in_pt("2em"), None);
    assert_eq!(normalize_font_size("2em"), "2em");
    assert_eq!(normalize_font_size("150%"), "150%");
    assert_eq!(font_size_in_pt("large"), None);
    assert_eq!(normalize_font_size("large"), "large");
}

#[test]
fn pending_format_overlays_caret() {
    let doc = doc_with(vec![Segment::text("a"), Segment::marker(SegmentFormat::default())]);

    let state = retrieve_model_format_state(&doc, Some(&SegmentFormat::bold()), ConflictSolution::Remove);

    assert_eq!(state.is_bold, Some(true));
    assert_eq!(state.is_multiline_selection, Some(false));
}

#[test]
fn trailing_marker_does_not_vote() {
    let doc = doc_with(vec![
        Segment::text("bold").with_format(SegmentFormat::bold()).selected(),
        Segment::marker(SegmentFormat::default()),
    ]);

    let state = retrieve_model_format_state(&doc, None, ConflictSolution::Remove);

    assert_eq!(state.is_bold, Some(true));
}

#[test]
fn structure_comes_from_enclosing_groups() {
    let mut item = BlockGroup::list_item(vec![ListLevel::new(ListType::Unordered)], SegmentFormat::default());
    item.blocks
        .push(Paragraph::new().with_segment(Segment::marker(SegmentFormat::default())).into());
    let quote = BlockGroup::format_container("blockquote").with_block(item);
    let doc = BlockGroup::document().with_block(quote);

    let state = retrieve_model_format_state(&doc, None, ConflictSolution::Remove);

    assert_eq!(state.is_bullet, Some(true));
    assert_eq!(state.is_numbering, Some(false));
    assert_eq!(state.is_block_quote, Some(true));
    assert_eq!(state.is_code_block, Some(false));
    assert_eq!(state.is_in_table, None);
}

#[test]
fn headings_conflict_across_paragraphs() {
    let heading = Paragraph::new()
        .with_segment(Segment::text("Title").selected())
        .with_decorator("h2", SegmentFormat::default());
    let single = BlockGroup::document().with_block(heading.clone());
    let state = retrieve_model_format_state(&single, None, ConflictSolution::Remove);
    assert_eq!(state.heading_level, Some(2));

    let mixed = single.with_block(Paragraph::new().with_segment(Segment::text("body").selected()));
    let state = retrieve_model_format_state(&mixed, None, ConflictSolution::Remove);
    assert_eq!(state.heading_level, None);
    assert_eq!(state.is_multiline_selection, Some(true));
}

#[test]
fn selected_cells_of_one_table_can_merge() {
    let mut doc = BlockGroup::document().with_block(Table::with_size(1, 3));
    select_table_cells(&mut doc, &root(0), (0, 0), (0, 1));

    let state = retrieve_model_format_state(&doc, None, ConflictSolution::Remove);

    assert_eq!(state.is_in_table, Some(true));
    assert_eq!(state.table_has_header, Some(false));
    assert_eq!(state.table_format, None);
    assert_eq!(state.can_merge_table_cell, Some(true));
    assert_eq!(state.is_multiline_selection, Some(true));
}

#[test]
fn single_image_reports_its_border() {
    let mut image = Segment::image("cat.png");
    if let SegmentKind::Image(inner) = &mut image.kind {
        inner.format.border_top = Some("2px dashed red".to_string());
        inner.format.border_radius = Some("4px".to_string());
    }
    let mut doc = doc_with(vec![Segment::text("x"), image]);
    select_image(
        &mut doc,
        &SegmentLocation::InParagraph {
            paragraph: root(0),
            index: 1,
        },
    );

    let state = retrieve_model_format_state(&doc, None, ConflictSolution::Remove);

    let format = state.image_format.unwrap_or_else(|| panic!("no image format"));
    assert_eq!(format.border_width.as_deref(), Some("2px"));
    assert_eq!(format.border_style.as_deref(), Some("dashed"));
    assert_eq!(format.border_color.as_deref(), Some("red"));
    assert_eq!(format.border_radius.as_deref(), Some("4px"));
    assert_eq!(state.can_add_image_alt_text, Some(true));
}

#[test]
fn several_images_have_no_single_format() {
    let doc = doc_with(vec![
        Segment::image("a.png").selected(),
        Segment::image("b.png").selected(),
    ]);

    let state = retrieve_model_format_state(&doc, None, ConflictSolution::Remove);

    assert_eq!(state.image_format, None);
    assert_eq!(state.can_add_image_alt_text, Some(true));
}

#[test]
fn image_format_is_dropped_when_selection_spans_paragraphs() {
    let mut image = Segment::image("cat.png").selected();
    if let SegmentKind::Image(inner) = &mut image.kind {
        inner.format.border_top = Some("1px solid red".to_string());
    }
    let doc = BlockGroup::document()
        .with_block(Paragraph::new().with_segment(image))
        .with_block(Paragraph::new().with_segment(Segment::text("t").selected()));

    let state = retrieve_model_format_state(&doc, None, ConflictSolution::Remove);

    assert_eq!(state.image_format, None);
    assert_eq!(state.can_add_image_alt_text, None);
    assert_eq!(state.is_multiline_selection, Some(true));
}

#[test]
fn table_state_follows_where_the_selection_starts() {
    let mut table = Table::with_size(1, 1);
    if let Some(cell) = table.cell_mut(0, 0) {
        cell.set_selected(true);
    }
    let doc = BlockGroup::document()
        .with_block(Paragraph::new().with_segment(Segment::text("out").selected()))
        .with_block(table);

    let state = retrieve_model_format_state(&doc, None, ConflictSolution::Remove);

    assert_eq!(state.is_in_table, None);
    assert_eq!(state.table_has_header, None);
    assert_eq!(state.table_format, None);
}

#[test]
fn links_can_be_removed() {
    let doc = doc_with(vec![Segment::text("site").with_link("https://example.com").selected()]);

    let state = retrieve_model_format_state(&doc, None, ConflictSolution::Remove);

    assert_eq!(state.can_unlink, Some(true));
}

#[test]
fn nothing_selected_gives_empty_state() {
    let doc = doc_with(vec![Segment::text("plain")]);

    assert_eq!(
        retrieve_model_format_state(&doc, None, ConflictSolution::Remove),
        FormatState::default()
    );
}

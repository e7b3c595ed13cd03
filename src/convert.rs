//! Conversion between FTML documents and content models.
//!
//! FTML has no tables, dividers, images or entities. Table cells are
//! flattened into their paragraphs on the way out; the rest is dropped.
//! Nested lists become flat list items with deeper level stacks, and
//! checklists become bullet levels carrying a `checked` dataset entry.

use tdoc::{ChecklistItem, Document, InlineStyle, Paragraph as DocParagraph, ParagraphType, Span as DocSpan};
use tracing::trace;

use crate::editing::normalize_content_model;
use crate::model::{
    Block, BlockGroup, Code, ListLevel, ListType, Paragraph, Segment, SegmentFormat, SegmentKind,
};

/// Dataset key marking a list level as a checklist.
pub const CHECKED_KEY: &str = "checked";

const HIGHLIGHT_COLOR: &str = "yellow";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ListKind {
    Ordered,
    Unordered,
    Checklist,
}

// ============================================================================
// FTML to model
// ============================================================================

pub fn model_from_document(document: &Document) -> BlockGroup {
    let mut model = BlockGroup::document();
    model.blocks = read_paragraphs(&document.paragraphs);
    if model.blocks.is_empty() {
        model.blocks.push(Paragraph::new().with_segment(Segment::br()).into());
    }
    normalize_content_model(&mut model);
    model
}

fn read_paragraphs(paragraphs: &[DocParagraph]) -> Vec<Block> {
    let mut blocks = Vec::new();
    for paragraph in paragraphs {
        read_paragraph(paragraph, &[], &mut blocks);
    }
    blocks
}

fn read_paragraph(paragraph: &DocParagraph, levels: &[ListLevel], blocks: &mut Vec<Block>) {
    match paragraph.paragraph_type() {
        ParagraphType::Header1 => blocks.push(text_paragraph(paragraph.content(), Some("h1")).into()),
        ParagraphType::Header2 => blocks.push(text_paragraph(paragraph.content(), Some("h2")).into()),
        ParagraphType::Header3 => blocks.push(text_paragraph(paragraph.content(), Some("h3")).into()),
        ParagraphType::CodeBlock => {
            let mut code = text_paragraph(paragraph.content(), None);
            for segment in &mut code.segments {
                if matches!(segment.kind, SegmentKind::Text(_)) {
                    segment.code = Some(Code::default());
                }
            }
            blocks.push(BlockGroup::format_container("pre").with_block(code).into());
        }
        ParagraphType::Quote => {
            let quote = BlockGroup::format_container("blockquote").with_blocks(read_paragraphs(paragraph.children()));
            blocks.push(quote.into());
        }
        ParagraphType::UnorderedList | ParagraphType::OrderedList => {
            let list_type = if paragraph.paragraph_type() == ParagraphType::OrderedList {
                ListType::Ordered
            } else {
                ListType::Unordered
            };
            let mut item_levels = levels.to_vec();
            item_levels.push(ListLevel::new(list_type));
            for entry in paragraph.entries() {
                read_entry(entry, &item_levels, blocks);
            }
        }
        ParagraphType::Checklist => {
            for item in paragraph.checklist_items() {
                read_checklist_item(item, levels, blocks);
            }
        }
        _ => blocks.push(text_paragraph(paragraph.content(), None).into()),
    }
}

/// One list entry becomes one list item; lists nested in the entry follow
/// it as deeper items.
fn read_entry(entry: &[DocParagraph], levels: &[ListLevel], blocks: &mut Vec<Block>) {
    let mut item = BlockGroup::list_item(levels.to_vec(), SegmentFormat::default());
    let mut nested = Vec::new();
    for paragraph in entry {
        if is_list(paragraph) {
            read_paragraph(paragraph, levels, &mut nested);
        } else {
            read_paragraph(paragraph, &[], &mut item.blocks);
        }
    }
    if item.blocks.is_empty() {
        item.blocks.push(Paragraph::new().with_segment(Segment::br()).into());
    }
    blocks.push(item.into());
    blocks.extend(nested);
}

fn read_checklist_item(item: &ChecklistItem, levels: &[ListLevel], blocks: &mut Vec<Block>) {
    let mut level = ListLevel::new(ListType::Unordered);
    level.dataset.insert(CHECKED_KEY.to_string(), item.checked.to_string());
    let mut item_levels = levels.to_vec();
    item_levels.push(level);

    let group = BlockGroup::list_item(item_levels.clone(), SegmentFormat::default())
        .with_block(text_paragraph(&item.content, None));
    blocks.push(group.into());
    for child in &item.children {
        read_checklist_item(child, &item_levels, blocks);
    }
}

fn is_list(paragraph: &DocParagraph) -> bool {
    matches!(
        paragraph.paragraph_type(),
        ParagraphType::UnorderedList | ParagraphType::OrderedList | ParagraphType::Checklist
    )
}

fn text_paragraph(spans: &[DocSpan], heading: Option<&str>) -> Paragraph {
    let mut segments = Vec::new();
    read_spans(spans, &SegmentFormat::default(), None, false, &mut segments);
    let mut paragraph = Paragraph::new().with_segments(segments);
    if let Some(tag) = heading {
        paragraph = paragraph.with_decorator(tag, SegmentFormat::bold());
    }
    if paragraph.segments.is_empty() {
        paragraph.segments.push(Segment::br());
    }
    paragraph
}

fn read_spans(spans: &[DocSpan], format: &SegmentFormat, link: Option<&str>, code: bool, out: &mut Vec<Segment>) {
    for span in spans {
        let mut format = format.clone();
        let mut link = link.map(str::to_string);
        let mut code = code;
        match span.style {
            InlineStyle::Bold => format.font_weight = Some("bold".to_string()),
            InlineStyle::Italic => format.italic = Some(true),
            InlineStyle::Underline => format.underline = Some(true),
            InlineStyle::Strike => format.strikethrough = Some(true),
            InlineStyle::Highlight => format.background_color = Some(HIGHLIGHT_COLOR.to_string()),
            InlineStyle::Code => code = true,
            InlineStyle::Link => link = span.link_target.clone().or(link),
            _ => {}
        }

        for (index, line) in span.text.split('\n').enumerate() {
            if index > 0 {
                out.push(Segment::br());
            }
            if line.is_empty() {
                continue;
            }
            let mut segment = Segment::text(line).with_format(format.clone());
            if let Some(href) = &link {
                segment = segment.with_link(href.clone());
            }
            if code {
                segment.code = Some(Code::default());
            }
            out.push(segment);
        }
        read_spans(&span.children, &format, link.as_deref(), code, out);
    }
}

// ============================================================================
// Model to FTML
// ============================================================================

pub fn document_from_model(model: &BlockGroup) -> Document {
    Document::new().with_paragraphs(write_blocks(&model.blocks))
}

fn write_blocks(blocks: &[Block]) -> Vec<DocParagraph> {
    let mut output = Vec::new();
    let mut index = 0;
    while index < blocks.len() {
        if list_depth(&blocks[index]) == 0 {
            write_block(&blocks[index], &mut output);
            index += 1;
            continue;
        }
        let start = index;
        while index < blocks.len() && list_depth(&blocks[index]) > 0 {
            index += 1;
        }
        let items: Vec<&BlockGroup> = blocks[start..index].iter().filter_map(Block::as_group).collect();
        output.extend(write_list_run(&items, 0));
    }
    output
}

fn write_block(block: &Block, output: &mut Vec<DocParagraph>) {
    match block {
        Block::Paragraph(paragraph) => output.push(write_paragraph(paragraph)),
        Block::BlockGroup(group) => match group.format_container_tag() {
            Some("blockquote") => output.push(DocParagraph::new_quote().with_children(write_blocks(&group.blocks))),
            Some("pre") => {
                let code = group
                    .blocks
                    .iter()
                    .filter_map(Block::as_paragraph)
                    .map(|paragraph| paragraph.text().trim_end_matches('\n').to_string())
                    .collect::<Vec<_>>()
                    .join("\n");
                output.push(DocParagraph::new(ParagraphType::CodeBlock).with_content(vec![DocSpan::new_text(code)]));
            }
            _ => output.extend(write_blocks(&group.blocks)),
        },
        Block::Table(table) => {
            for row in &table.rows {
                for cell in &row.cells {
                    output.extend(write_blocks(&cell.blocks));
                }
            }
        }
        Block::Divider(_) | Block::Entity(_) => trace!("block has no FTML counterpart"),
    }
}

fn write_paragraph(paragraph: &Paragraph) -> DocParagraph {
    let paragraph_type = match paragraph.heading_level() {
        Some(1) => ParagraphType::Header1,
        Some(2) => ParagraphType::Header2,
        Some(_) => ParagraphType::Header3,
        None => ParagraphType::Text,
    };
    DocParagraph::new(paragraph_type).with_content(write_segments(paragraph))
}

fn write_segments(paragraph: &Paragraph) -> Vec<DocSpan> {
    let last_content = paragraph.segments.iter().rposition(|segment| !segment.is_marker());
    paragraph
        .segments
        .iter()
        .enumerate()
        .filter(|(index, segment)| !(segment.is_br() && Some(*index) == last_content))
        .filter_map(|(_, segment)| write_segment(segment))
        .collect()
}

/// One span per segment, with one nested span per inline style.
fn write_segment(segment: &Segment) -> Option<DocSpan> {
    let text = match &segment.kind {
        SegmentKind::Text(text) => text.clone(),
        SegmentKind::Br => "\n".to_string(),
        _ => return None,
    };

    let format = &segment.format;
    let mut styles: Vec<(InlineStyle, Option<String>)> = Vec::new();
    if let Some(link) = &segment.link {
        styles.push((InlineStyle::Link, Some(link.href.clone())));
    }
    if format.is_bold() {
        styles.push((InlineStyle::Bold, None));
    }
    if format.italic == Some(true) {
        styles.push((InlineStyle::Italic, None));
    }
    if format.underline == Some(true) {
        styles.push((InlineStyle::Underline, None));
    }
    if format.strikethrough == Some(true) {
        styles.push((InlineStyle::Strike, None));
    }
    if format.background_color.is_some() {
        styles.push((InlineStyle::Highlight, None));
    }
    if segment.code.is_some() {
        styles.push((InlineStyle::Code, None));
    }

    let mut styles = styles.into_iter().rev();
    let mut span = DocSpan::new_text(text);
    if let Some((style, target)) = styles.next() {
        span.style = style;
        span.link_target = target;
    }
    for (style, target) in styles {
        let mut outer = DocSpan::new_text("");
        outer.style = style;
        outer.link_target = target;
        outer.children = vec![span];
        span = outer;
    }
    Some(span)
}

fn list_depth(block: &Block) -> usize {
    block
        .as_group()
        .and_then(BlockGroup::as_list_item)
        .map_or(0, |props| props.levels.len())
}

fn depth_of(item: &BlockGroup) -> usize {
    item.as_list_item().map_or(0, |props| props.levels.len())
}

fn level_at(item: &BlockGroup, depth: usize) -> Option<&ListLevel> {
    let levels = &item.as_list_item()?.levels;
    levels.get(depth).or(levels.last())
}

fn list_kind(item: &BlockGroup, depth: usize) -> ListKind {
    match level_at(item, depth) {
        Some(level) if level.dataset.contains_key(CHECKED_KEY) => ListKind::Checklist,
        Some(level) if level.list_type == ListType::Ordered => ListKind::Ordered,
        _ => ListKind::Unordered,
    }
}

fn is_checked(item: &BlockGroup, depth: usize) -> bool {
    level_at(item, depth)
        .and_then(|level| level.dataset.get(CHECKED_KEY))
        .is_some_and(|checked| checked == "true")
}

/// Writes consecutive list items that share a level at `depth` as lists.
/// Deeper items stay with the entry they follow.
fn write_list_run(items: &[&BlockGroup], depth: usize) -> Vec<DocParagraph> {
    let mut output = Vec::new();
    let mut index = 0;
    while index < items.len() {
        let kind = list_kind(items[index], depth);
        let start = index;
        index += 1;
        while index < items.len() && (depth_of(items[index]) > depth + 1 || list_kind(items[index], depth) == kind) {
            index += 1;
        }
        let run = &items[start..index];
        output.push(match kind {
            ListKind::Checklist => DocParagraph::new_checklist().with_checklist_items(write_checklist(run, depth)),
            ListKind::Ordered => DocParagraph::new_ordered_list().with_entries(write_entries(run, depth)),
            ListKind::Unordered => DocParagraph::new_unordered_list().with_entries(write_entries(run, depth)),
        });
    }
    output
}

/// Splits `run` into items at `depth`, each followed by its deeper items.
fn split_entries<'a, 'b>(run: &'b [&'a BlockGroup], depth: usize) -> Vec<(&'a BlockGroup, &'b [&'a BlockGroup])> {
    let mut entries = Vec::new();
    let mut index = 0;
    while index < run.len() {
        let item = run[index];
        index += 1;
        let start = index;
        while index < run.len() && depth_of(run[index]) > depth + 1 {
            index += 1;
        }
        entries.push((item, &run[start..index]));
    }
    entries
}

fn write_entries(run: &[&BlockGroup], depth: usize) -> Vec<Vec<DocParagraph>> {
    split_entries(run, depth)
        .into_iter()
        .map(|(item, deeper)| {
            let mut entry = write_blocks(&item.blocks);
            entry.extend(write_list_run(deeper, depth + 1));
            entry
        })
        .collect()
}

fn write_checklist(run: &[&BlockGroup], depth: usize) -> Vec<ChecklistItem> {
    split_entries(run, depth)
        .into_iter()
        .map(|(item, deeper)| {
            let content = item
                .blocks
                .iter()
                .find_map(Block::as_paragraph)
                .map(write_segments)
                .unwrap_or_default();
            let mut entry = ChecklistItem::new(is_checked(item, depth)).with_content(content);
            entry.children = write_checklist(deeper, depth + 1);
            entry
        })
        .collect()
}

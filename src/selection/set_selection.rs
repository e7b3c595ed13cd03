//! Placing and reading the selection.
//!
//! The model stands in for the live document, so a "DOM" position is a
//! paragraph address plus a caret offset counted with
//! [`Segment::char_len`](crate::model::Segment::char_len).

use crate::model::{Block, BlockAddress, BlockGroup, Paragraph, Segment, SegmentFormat, SegmentKind, SegmentLocation};

use super::{IterateSelectionsOptions, ListFormatHolderPolicy, collect_selections};

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct DomPosition {
    pub paragraph: BlockAddress,
    pub offset: usize,
}

impl DomPosition {
    pub fn new(paragraph: BlockAddress, offset: usize) -> Self {
        Self { paragraph, offset }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DomSelection {
    Range { start: DomPosition, end: DomPosition },
    Image { image: SegmentLocation },
    Table {
        table: BlockAddress,
        first_row: usize,
        first_column: usize,
        last_row: usize,
        last_column: usize,
    },
}

impl DomSelection {
    pub fn collapsed(position: DomPosition) -> Self {
        DomSelection::Range {
            start: position.clone(),
            end: position,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        matches!(self, DomSelection::Range { start, end } if start == end)
    }

    /// Caret position of a collapsed range.
    pub fn caret(&self) -> Option<&DomPosition> {
        match self {
            DomSelection::Range { start, end } if start == end => Some(start),
            _ => None,
        }
    }
}

/// Removes every selection marker and clears every selection flag.
pub fn clear_selection(group: &mut BlockGroup) {
    group.set_selected(false);
    for block in &mut group.blocks {
        match block {
            Block::Paragraph(paragraph) => {
                paragraph.segments.retain(|segment| !segment.is_marker());
                for segment in &mut paragraph.segments {
                    segment.is_selected = false;
                    match &mut segment.kind {
                        SegmentKind::Image(image) => image.is_selected_as_image_selection = false,
                        SegmentKind::General(inner) => clear_selection(inner),
                        _ => {}
                    }
                }
            }
            Block::Table(table) => {
                for row in &mut table.rows {
                    for cell in &mut row.cells {
                        clear_selection(cell);
                    }
                }
            }
            Block::BlockGroup(inner) => clear_selection(inner),
            Block::Divider(divider) => divider.is_selected = false,
            Block::Entity(entity) => entity.is_selected = false,
        }
    }
}

/// Places a collapsed caret at `position`. Returns `false` when the
/// position does not address a paragraph.
pub fn set_caret(root: &mut BlockGroup, position: &DomPosition) -> bool {
    if root.paragraph_at(&position.paragraph).is_none() {
        return false;
    }
    clear_selection(root);
    let Some(paragraph) = root.paragraph_at_mut(&position.paragraph) else {
        return false;
    };
    let index = split_at_offset(paragraph, position.offset);
    let format = caret_format(paragraph, index);
    paragraph.segments.insert(index, Segment::marker(format));
    true
}

/// Selects everything between `start` and `end`, in either order. Equal
/// positions place a caret.
pub fn select_range(root: &mut BlockGroup, start: &DomPosition, end: &DomPosition) -> bool {
    if start == end {
        return set_caret(root, start);
    }
    let addresses = root.paragraph_addresses();
    let order = |position: &DomPosition| {
        addresses
            .iter()
            .position(|address| *address == position.paragraph)
            .map(|index| (index, position.offset))
    };
    let (Some(a), Some(b)) = (order(start), order(end)) else {
        return false;
    };
    let (first, last) = if a <= b { (a, b) } else { (b, a) };

    clear_selection(root);
    for (index, address) in addresses.iter().enumerate().take(last.0 + 1).skip(first.0) {
        let Some(paragraph) = root.paragraph_at_mut(address) else {
            continue;
        };
        let from = if index == first.0 {
            split_at_offset(paragraph, first.1)
        } else {
            0
        };
        let to = if index == last.0 {
            split_at_offset(paragraph, last.1)
        } else {
            paragraph.segments.len()
        };
        for segment in paragraph.segments.iter_mut().take(to).skip(from) {
            segment.is_selected = true;
        }
    }
    true
}

/// Selects the rectangle of cells between the two corners.
pub fn select_table_cells(
    root: &mut BlockGroup,
    table: &BlockAddress,
    (row_a, col_a): (usize, usize),
    (row_b, col_b): (usize, usize),
) -> bool {
    if root.table_at(table).is_none() {
        return false;
    }
    clear_selection(root);
    let Some(table) = root.table_at_mut(table) else {
        return false;
    };
    let rows = row_a.min(row_b)..=row_a.max(row_b);
    let cols = col_a.min(col_b)..=col_a.max(col_b);
    for (row_index, row) in table.rows.iter_mut().enumerate() {
        for (col_index, cell) in row.cells.iter_mut().enumerate() {
            cell.set_selected(rows.contains(&row_index) && cols.contains(&col_index));
        }
    }
    true
}

/// Selects a single image as an object.
pub fn select_image(root: &mut BlockGroup, location: &SegmentLocation) -> bool {
    if root.segment_at(location).and_then(Segment::as_image).is_none() {
        return false;
    }
    clear_selection(root);
    let Some(segment) = root.segment_at_mut(location) else {
        return false;
    };
    segment.is_selected = true;
    if let SegmentKind::Image(image) = &mut segment.kind {
        image.is_selected_as_image_selection = true;
    }
    true
}

/// Derives the selection the host would see from the model's selection
/// state.
pub fn dom_selection_of(root: &BlockGroup) -> Option<DomSelection> {
    let selections = collect_selections(
        root,
        &IterateSelectionsOptions::default().with_list_format_holder(ListFormatHolderPolicy::Never),
    );

    if let Some(first_cell) = selections
        .iter()
        .find(|selection| selection.block.is_none() && selection.segments.is_none())
        .and_then(|selection| selection.table_context.clone())
    {
        let cells: Vec<(usize, usize)> = selections
            .iter()
            .filter(|selection| selection.block.is_none() && selection.segments.is_none())
            .filter_map(|selection| selection.table_context.as_ref())
            .filter(|context| context.table == first_cell.table)
            .map(|context| (context.row_index, context.col_index))
            .collect();
        return Some(DomSelection::Table {
            table: first_cell.table,
            first_row: cells.iter().map(|cell| cell.0).min().unwrap_or(0),
            first_column: cells.iter().map(|cell| cell.1).min().unwrap_or(0),
            last_row: cells.iter().map(|cell| cell.0).max().unwrap_or(0),
            last_column: cells.iter().map(|cell| cell.1).max().unwrap_or(0),
        });
    }

    let segments: Vec<_> = selections
        .iter()
        .filter_map(|selection| selection.segments.as_ref())
        .flatten()
        .collect();

    if let Some(marker) = segments.iter().find(|selected| selected.segment.is_marker()) {
        let SegmentLocation::InParagraph { paragraph, index } = &marker.location else {
            return None;
        };
        let offset = offset_before(root.paragraph_at(paragraph)?, *index);
        return Some(DomSelection::collapsed(DomPosition::new(paragraph.clone(), offset)));
    }

    if let [only] = segments.as_slice()
        && only.segment.as_image().is_some_and(|image| image.is_selected_as_image_selection)
    {
        return Some(DomSelection::Image {
            image: only.location.clone(),
        });
    }

    let (first, last) = (segments.first()?, segments.last()?);
    let (
        SegmentLocation::InParagraph {
            paragraph: start_paragraph,
            index: start_index,
        },
        SegmentLocation::InParagraph {
            paragraph: end_paragraph,
            index: end_index,
        },
    ) = (&first.location, &last.location)
    else {
        return None;
    };
    let start = offset_before(root.paragraph_at(start_paragraph)?, *start_index);
    let end = offset_before(root.paragraph_at(end_paragraph)?, *end_index + 1);
    Some(DomSelection::Range {
        start: DomPosition::new(start_paragraph.clone(), start),
        end: DomPosition::new(end_paragraph.clone(), end),
    })
}

/// Caret offset in front of segment `index`.
pub fn offset_before(paragraph: &Paragraph, index: usize) -> usize {
    paragraph.segments.iter().take(index).map(Segment::char_len).sum()
}

/// Splits the text segment containing `offset` if needed and returns the
/// segment index a unit inserted at `offset` would take.
pub(crate) fn split_at_offset(paragraph: &mut Paragraph, offset: usize) -> usize {
    let mut consumed = 0;
    for index in 0..paragraph.segments.len() {
        if offset <= consumed {
            return index;
        }
        let segment = &mut paragraph.segments[index];
        let len = segment.char_len();
        if offset < consumed + len {
            let SegmentKind::Text(text) = &mut segment.kind else {
                return index + 1;
            };
            let split = byte_index(text, offset - consumed);
            let tail = text.split_off(split);
            let mut right = segment.clone();
            right.kind = SegmentKind::Text(tail);
            paragraph.segments.insert(index + 1, right);
            return index + 1;
        }
        consumed += len;
    }
    paragraph.segments.len()
}

/// The format a caret at segment `index` picks up: the text before it, or
/// the text after it at the start of a paragraph.
fn caret_format(paragraph: &Paragraph, index: usize) -> SegmentFormat {
    let before = index
        .checked_sub(1)
        .and_then(|previous| paragraph.segments.get(previous))
        .filter(|segment| !segment.is_br());
    before
        .or_else(|| paragraph.segments.get(index))
        .map(|segment| segment.format.clone())
        .unwrap_or_default()
}

pub(crate) fn byte_index(text: &str, char_offset: usize) -> usize {
    text.char_indices()
        .nth(char_offset)
        .map(|(index, _)| index)
        .unwrap_or(text.len())
}

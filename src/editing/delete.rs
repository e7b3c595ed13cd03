use std::mem;

use tracing::trace;

use super::{FormatContext, InsertPoint};
use crate::model::{Block, BlockAddress, BlockGroup, Entity, GroupPath, Paragraph, Segment, SegmentKind};
use crate::selection::{
    IterateSelectionsOptions, ListFormatHolderPolicy, TableCellContentPolicy, TableSelectionContext,
    collect_selections,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteResult {
    /// The selection was collapsed; nothing was removed.
    NotDeleted,
    /// An expanded selection was removed.
    Range,
    /// There was no selection at all.
    NothingToDelete,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DeleteSelectionResult {
    pub delete_result: DeleteResult,
    pub insert_point: Option<InsertPoint>,
}

/// What one selection entry covers, as addresses only.
enum Unit {
    Segments { paragraph: BlockAddress, indices: Vec<usize> },
    Block(BlockAddress),
    Cell(GroupPath),
}

struct Entry {
    unit: Unit,
    table_context: Option<TableSelectionContext>,
}

fn snapshot(model: &BlockGroup) -> Vec<Entry> {
    let options = IterateSelectionsOptions::default()
        .with_list_format_holder(ListFormatHolderPolicy::Never)
        .with_table_cell_content(TableCellContentPolicy::IgnoreForTableOrCell);

    collect_selections(model, &options)
        .into_iter()
        .filter_map(|selection| {
            let unit = match (&selection.block, &selection.segments) {
                (Some(block), Some(segments)) => Unit::Segments {
                    paragraph: BlockAddress::new(selection.location.clone(), block.index),
                    indices: segments
                        .iter()
                        .filter_map(|selected| selected.location.index())
                        .collect(),
                },
                (Some(block), None) => Unit::Block(BlockAddress::new(selection.location.clone(), block.index)),
                (None, None) if selection.table_context.is_some() => Unit::Cell(selection.location.clone()),
                _ => return None,
            };
            Some(Entry {
                unit,
                table_context: selection.table_context,
            })
        })
        .collect()
}

/// Removes the expanded selection of `model`, leaving a collapsed caret
/// where it started. A collapsed selection is left alone and reported as
/// the insert point.
pub fn delete_selection(model: &mut BlockGroup, mut context: Option<&mut FormatContext>) -> DeleteSelectionResult {
    let entries = snapshot(model);
    if entries.is_empty() {
        return DeleteSelectionResult {
            delete_result: DeleteResult::NothingToDelete,
            insert_point: None,
        };
    }

    if let [entry] = entries.as_slice()
        && let Unit::Segments { paragraph, indices } = &entry.unit
        && let [index] = indices.as_slice()
        && model
            .paragraph_at(paragraph)
            .and_then(|p| p.segments.get(*index))
            .is_some_and(Segment::is_marker)
    {
        return DeleteSelectionResult {
            delete_result: DeleteResult::NotDeleted,
            insert_point: Some(InsertPoint {
                paragraph: paragraph.clone(),
                marker_index: *index,
                table_context: entry.table_context.clone(),
            }),
        };
    }

    let default_format = model.document_format().cloned().unwrap_or_default();
    let mut insert_point = None;
    let mut last_paragraph: Option<(BlockAddress, Option<TableSelectionContext>)> = None;

    // Back to front, so addresses of earlier entries stay valid.
    for (position, entry) in entries.iter().enumerate().rev() {
        let is_first = position == 0;
        let touched = match &entry.unit {
            Unit::Segments { paragraph, indices } => {
                delete_segments(model, paragraph, indices, is_first, context.as_deref_mut())
                    .map(|marker_index| (paragraph.clone(), marker_index))
            }
            Unit::Block(address) => {
                let Some(group) = model.group_at_mut(&address.group) else {
                    continue;
                };
                if address.index >= group.blocks.len() {
                    continue;
                }
                if let (Block::Entity(entity), Some(ctx)) = (&group.blocks[address.index], context.as_deref_mut()) {
                    ctx.deleted_entities.push(entity.clone());
                }
                if is_first {
                    let paragraph = Paragraph::new()
                        .with_segments(vec![Segment::marker(default_format.clone())])
                        .with_segment_format(default_format.clone());
                    group.blocks[address.index] = paragraph.into();
                    Some((address.clone(), Some(0)))
                } else {
                    group.blocks.remove(address.index);
                    if let Some((last, _)) = last_paragraph.as_mut() {
                        last.shift_for_removal(&address.group, address.index);
                    }
                    None
                }
            }
            Unit::Cell(cell_path) => {
                let Some(cell) = model.group_at_mut(cell_path) else {
                    continue;
                };
                let mut segments = Vec::new();
                if is_first {
                    segments.push(Segment::marker(default_format.clone()));
                }
                segments.push(Segment::br());
                let paragraph = Paragraph::new().with_segments(segments);
                let removed = mem::replace(&mut cell.blocks, vec![paragraph.into()]);
                cell.set_selected(false);
                if let Some(ctx) = context.as_deref_mut() {
                    collect_entities(&removed, &mut ctx.deleted_entities);
                }
                Some((BlockAddress::new(cell_path.clone(), 0), is_first.then_some(0)))
            }
        };

        let Some((paragraph, marker_index)) = touched else {
            continue;
        };
        if position + 1 == entries.len() {
            last_paragraph = Some((paragraph.clone(), entry.table_context.clone()));
        }
        if let (true, Some(marker_index)) = (is_first, marker_index) {
            insert_point = Some(InsertPoint {
                paragraph,
                marker_index,
                table_context: entry.table_context.clone(),
            });
        }
    }

    if let (Some(point), Some((last, last_table))) = (&insert_point, &last_paragraph)
        && *last != point.paragraph
        && *last_table == point.table_context
    {
        let tail = model
            .paragraph_at_mut(last)
            .map(|paragraph| mem::take(&mut paragraph.segments))
            .unwrap_or_default();
        if let Some(target) = model.paragraph_at_mut(&point.paragraph) {
            target.segments.extend(tail);
        }
    }

    trace!(entries = entries.len(), "deleted expanded selection");
    DeleteSelectionResult {
        delete_result: DeleteResult::Range,
        insert_point,
    }
}

/// Removes the selected segments of one paragraph. For the first selection
/// entry a marker is left where the first removed segment was, and its
/// index is returned.
fn delete_segments(
    model: &mut BlockGroup,
    address: &BlockAddress,
    indices: &[usize],
    is_first: bool,
    context: Option<&mut FormatContext>,
) -> Option<Option<usize>> {
    let paragraph = model.paragraph_at_mut(address)?;
    let first = *indices.first()?;
    let marker_format = paragraph
        .segments
        .get(first)
        .map(|segment| segment.format.clone())
        .unwrap_or_default();

    let mut removed = Vec::new();
    for &index in indices.iter().rev() {
        if index < paragraph.segments.len() {
            removed.push(paragraph.segments.remove(index));
        }
    }
    if let Some(ctx) = context {
        for segment in &removed {
            if let SegmentKind::Entity(entity) = &segment.kind {
                ctx.deleted_entities.push(entity.clone());
            }
        }
    }

    paragraph.is_implicit = false;
    if !is_first {
        return Some(None);
    }
    let marker_index = first.min(paragraph.segments.len());
    paragraph
        .segments
        .insert(marker_index, Segment::marker(marker_format));
    Some(Some(marker_index))
}

fn collect_entities(blocks: &[Block], into: &mut Vec<Entity>) {
    for block in blocks {
        match block {
            Block::Entity(entity) => into.push(entity.clone()),
            Block::BlockGroup(group) => collect_entities(&group.blocks, into),
            Block::Paragraph(paragraph) => {
                for segment in &paragraph.segments {
                    if let SegmentKind::Entity(entity) = &segment.kind {
                        into.push(entity.clone());
                    }
                }
            }
            Block::Table(table) => {
                for row in &table.rows {
                    for cell in &row.cells {
                        collect_entities(&cell.blocks, into);
                    }
                }
            }
            Block::Divider(_) => {}
        }
    }
}

#[cfg(test)]
#[path = "delete_tests.rs"]
mod delete_tests;

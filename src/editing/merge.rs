use std::mem;

use tracing::debug;

use super::table::{apply_table_format, normalize_table};
use super::{FormatContext, InsertPoint, delete_selection, normalize_content_model};
use crate::model::{
    Block, BlockAddress, BlockFormat, BlockGroup, BlockGroupKind, BlockGroupType, GroupPath, Paragraph, PathStep,
    Segment, SegmentFormat, SegmentFormatKey, SegmentKind, Table, TableCellFormat,
};
use crate::selection::{clear_selection, get_closest_ancestor_block_group_index};

/// How the target's format flows into merged content.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MergeFormat {
    /// Merged content keeps its own format.
    #[default]
    None,
    /// Merged segments get the target format, their own keys winning.
    MergeAll,
    /// Merged segments get the target format plus the emphasis keys of
    /// their own format.
    KeepSourceEmphasisFormat,
}

/// Keys [`MergeFormat::KeepSourceEmphasisFormat`] keeps from the source.
#[derive(Clone, Debug, PartialEq)]
pub struct EmphasisPolicy {
    pub keys: Vec<SegmentFormatKey>,
    pub strip_block_background: bool,
}

impl Default for EmphasisPolicy {
    fn default() -> Self {
        Self {
            keys: vec![
                SegmentFormatKey::FontWeight,
                SegmentFormatKey::Italic,
                SegmentFormatKey::Underline,
            ],
            strip_block_background: true,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MergeModelOptions {
    /// Overlay a single source table onto the table around the caret.
    pub merge_table: bool,
    pub merge_format: MergeFormat,
    /// Merge here instead of at the current selection.
    pub insert_position: Option<InsertPoint>,
    /// Leave the caret in a new paragraph after the merged content.
    pub add_paragraph_after_merged_content: bool,
    pub emphasis_policy: EmphasisPolicy,
}

impl MergeModelOptions {
    pub fn with_merge_format(mut self, merge_format: MergeFormat) -> Self {
        self.merge_format = merge_format;
        self
    }

    pub fn with_merge_table(mut self, merge_table: bool) -> Self {
        self.merge_table = merge_table;
        self
    }

    pub fn with_insert_position(mut self, point: InsertPoint) -> Self {
        self.insert_position = Some(point);
        self
    }
}

/// Splices the blocks of `source` into `target` at the selection (deleting
/// an expanded selection first) or at `options.insert_position`.
///
/// Returns the caret after the merged content, or `None` when `target` has
/// no place to insert.
pub fn merge_model(
    target: &mut BlockGroup,
    mut source: BlockGroup,
    mut context: Option<&mut FormatContext>,
    options: &MergeModelOptions,
) -> Option<InsertPoint> {
    let insert_point = match &options.insert_position {
        Some(point) => Some(point.clone()),
        None => delete_selection(target, context.as_deref_mut()).insert_point,
    };
    let Some(mut point) = insert_point else {
        normalize_content_model(target);
        return None;
    };
    debug!(
        blocks = source.blocks.len(),
        merge_format = ?options.merge_format,
        "merging model"
    );

    clear_selection(&mut source);
    if options.merge_format != MergeFormat::None {
        let mut target_format = target.document_format().cloned().unwrap_or_default();
        if let Some(marker) = point.marker(target) {
            target_format.merge_from(&marker.format);
        }
        apply_default_format(&mut source, &target_format, options);
    }

    let single_table = source.blocks.len() == 1 && matches!(source.blocks[0], Block::Table(_));
    for (index, block) in mem::take(&mut source.blocks).into_iter().enumerate() {
        match block {
            Block::Paragraph(paragraph) => merge_paragraph(
                target,
                &mut point,
                paragraph,
                index == 0,
                context.as_deref_mut(),
                options.merge_format,
            ),
            Block::Entity(entity) => {
                if let Some(ctx) = context.as_deref_mut() {
                    ctx.new_entities.push(entity.clone());
                }
                insert_block(target, &mut point, Block::Entity(entity));
            }
            Block::Table(table) if single_table && options.merge_table && point.table_context.is_some() => {
                merge_table(target, &mut point, table);
            }
            Block::BlockGroup(group) if group.group_type() == BlockGroupType::ListItem => {
                merge_list(target, &mut point, group);
            }
            other => insert_block(target, &mut point, other),
        }
    }

    if options.add_paragraph_after_merged_content {
        split_paragraph(target, &mut point, None);
    }

    normalize_content_model(target);
    let result = InsertPoint::locate(target);
    debug!(found = result.is_some(), "merge finished");
    result
}

/// Splits the paragraph at the caret. The caret and everything after it
/// move into a new paragraph right after the old one; inside a list item
/// the blocks after the paragraph move into a new list item as well.
///
/// `point` is updated to the new paragraph, whose address is returned.
pub fn split_paragraph(
    target: &mut BlockGroup,
    point: &mut InsertPoint,
    format: Option<&BlockFormat>,
) -> Option<BlockAddress> {
    let group_path = point.paragraph.group.clone();
    let paragraph_index = point.paragraph.index;

    let paragraph = target.paragraph_at_mut(&point.paragraph)?;
    let split_at = point.marker_index.min(paragraph.segments.len());
    let new_paragraph = Paragraph {
        segments: paragraph.segments.split_off(split_at),
        format: match format {
            Some(format) => paragraph.format.merged(format),
            None => paragraph.format.clone(),
        },
        segment_format: paragraph.segment_format.clone(),
        decorator: None,
        is_implicit: false,
    };
    paragraph.is_implicit = false;

    let group = target.group_at_mut(&group_path)?;
    group.blocks.insert(paragraph_index + 1, new_paragraph.into());
    point.paragraph.index = paragraph_index + 1;
    point.marker_index = 0;

    let Some(item_depth) = enclosing_list_item_depth(target, &group_path) else {
        return Some(point.paragraph.clone());
    };
    let item_path = group_path.truncated(item_depth);
    let (Some(parent_path), Some(PathStep::Group(item_index))) = (item_path.parent(), item_path.last().copied()) else {
        return Some(point.paragraph.clone());
    };
    let mut new_item = {
        let props = target.group_at(&item_path)?.as_list_item()?;
        let mut item = BlockGroup::list_item(props.levels.clone(), props.format_holder.format.clone());
        if let Some(new_props) = item.as_list_item_mut() {
            new_props.format = props.format.clone();
        }
        item
    };

    // Carry the tail out of every container between the paragraph and the
    // list item, re-wrapping it in a copy of each container.
    let mut tail = target.group_at_mut(&group_path)?.blocks.split_off(paragraph_index + 1);
    for depth in (item_depth..group_path.len()).rev() {
        let Some(PathStep::Group(child_index)) = group_path.steps().get(depth).copied() else {
            continue;
        };
        let parent = target.group_at_mut(&group_path.truncated(depth))?;
        let kind = match parent.blocks.get(child_index) {
            Some(Block::BlockGroup(child)) => child.kind.clone(),
            _ => continue,
        };
        let wrapper = BlockGroup { kind, blocks: tail };
        tail = vec![wrapper.into()];
        tail.extend(parent.blocks.split_off(child_index + 1));
    }
    new_item.blocks = tail;

    let parent = target.group_at_mut(&parent_path)?;
    parent.blocks.insert(item_index + 1, new_item.into());
    let mut new_path = parent_path.child(PathStep::Group(item_index + 1));
    for _ in item_depth..group_path.len() {
        new_path.push(PathStep::Group(0));
    }
    point.paragraph = BlockAddress::new(new_path, 0);

    Some(point.paragraph.clone())
}

/// Depth of the list item holding `path`, looking through format
/// containers only.
fn enclosing_list_item_depth(target: &BlockGroup, path: &GroupPath) -> Option<usize> {
    for depth in (1..=path.len()).rev() {
        let group = target.group_at(&path.truncated(depth))?;
        if group.as_list_item().is_some() {
            return Some(depth);
        }
        let is_container = group.group_type() == BlockGroupType::FormatContainer
            && matches!(path.steps().get(depth - 1), Some(PathStep::Group(_)));
        if !is_container {
            return None;
        }
    }
    None
}

fn merge_paragraph(
    target: &mut BlockGroup,
    point: &mut InsertPoint,
    source: Paragraph,
    merge_to_current: bool,
    context: Option<&mut FormatContext>,
    merge_format: MergeFormat,
) {
    if !merge_to_current && split_paragraph(target, point, None).is_none() {
        return;
    }
    let Some(paragraph) = target.paragraph_at_mut(&point.paragraph) else {
        return;
    };

    if merge_format == MergeFormat::None
        && merge_to_current
        && let Some(ambient) = paragraph.segment_format.take()
    {
        for segment in &mut paragraph.segments {
            segment.format = ambient.merged(&segment.format);
        }
    }

    let Paragraph {
        segments,
        format,
        decorator,
        ..
    } = source;

    if let Some(ctx) = context {
        for segment in &segments {
            match &segment.kind {
                SegmentKind::Entity(entity) => ctx.new_entities.push(entity.clone()),
                SegmentKind::Image(image) => ctx.new_images.push(image.clone()),
                _ => {}
            }
        }
    }

    let at = point.marker_index.min(paragraph.segments.len());
    let count = segments.len();
    paragraph.segments.splice(at..at, segments);
    point.marker_index = at + count;

    if merge_to_current {
        paragraph.format.merge_from(&format);
    } else {
        paragraph.format = format;
    }

    if let Some(decorator) = decorator {
        if let Some(ambient) = paragraph.segment_format.as_mut() {
            for key in decorator.format.keys() {
                ambient.remove(key);
            }
        }
        paragraph.decorator = Some(decorator);
    }

    if count > 0 || !merge_to_current {
        paragraph.is_implicit = false;
    }
}

fn insert_block(target: &mut BlockGroup, point: &mut InsertPoint, block: Block) {
    let Some(new_paragraph) = split_paragraph(target, point, None) else {
        return;
    };
    let Some(group) = target.group_at_mut(&new_paragraph.group) else {
        return;
    };
    group.blocks.insert(new_paragraph.index, block);
    point.paragraph.index += 1;
}

/// Inserts a list item before the caret's list item (or paragraph). The
/// inserted item takes over the list levels of the list it lands in.
fn merge_list(target: &mut BlockGroup, point: &mut InsertPoint, mut list: BlockGroup) {
    let list_format = list.as_list_item().map(|props| props.format.clone());
    if split_paragraph(target, point, list_format.as_ref()).is_none() {
        return;
    }

    let existing = target.ancestors(&point.paragraph.group).and_then(|ancestors| {
        let index = get_closest_ancestor_block_group_index(&ancestors, &[BlockGroupType::ListItem], &[])?;
        let levels = ancestors[index].as_list_item()?.levels.clone();
        Some((index, levels))
    });

    let Some((depth, levels)) = existing else {
        if let Some(group) = target.group_at_mut(&point.paragraph.group) {
            group.blocks.insert(point.paragraph.index, list.into());
            point.paragraph.index += 1;
        }
        return;
    };

    if let Some(props) = list.as_list_item_mut() {
        for (index, level) in levels.into_iter().enumerate() {
            match props.levels.get_mut(index) {
                Some(slot) => *slot = level,
                None => props.levels.push(level),
            }
        }
    }

    let item_path = point
        .paragraph
        .group
        .truncated(point.paragraph.group.len().saturating_sub(depth));
    let (Some(parent_path), Some(PathStep::Group(item_index))) = (item_path.parent(), item_path.last().copied()) else {
        return;
    };
    let Some(parent) = target.group_at_mut(&parent_path) else {
        return;
    };
    parent.blocks.insert(item_index, list.into());
    point.paragraph.shift_for_insertion(&parent_path, item_index);
}

/// Overlays `new_table` onto the table around the caret, starting at the
/// caret's cell and growing the table where needed.
fn merge_table(target: &mut BlockGroup, point: &mut InsertPoint, new_table: Table) {
    let Some(context) = point.table_context.clone() else {
        return;
    };
    let marker_format = point
        .marker(target)
        .map(|marker| marker.format.clone())
        .unwrap_or_default();
    let Some(table) = target.table_at_mut(&context.table) else {
        return;
    };
    let (row_index, col_index) = (context.row_index, context.col_index);
    let mut caret = None;

    for (i, new_row) in new_table.rows.into_iter().enumerate() {
        for (j, new_cell) in new_row.cells.into_iter().enumerate() {
            let (row, col) = (row_index + i, col_index + j);

            if i == 0 && col >= table.rows.first().map_or(0, |first| first.cells.len()) {
                for existing in &mut table.rows {
                    let left = col.checked_sub(1).and_then(|index| existing.cells.get(index));
                    let (is_header, format) = neighbor(left);
                    put_cell(&mut existing.cells, col, BlockGroup::table_cell(false, false, is_header, format));
                }
            }
            if j == 0 && row >= table.rows.len() {
                let width = table.rows.get(row_index).map_or(0, |origin| origin.cells.len());
                let above = row.checked_sub(1).and_then(|index| table.rows.get(index));
                let cells = (0..width)
                    .map(|k| {
                        let (_, format) = neighbor(above.and_then(|above| above.cells.get(k)));
                        BlockGroup::table_cell(false, false, false, format)
                    })
                    .collect();
                while table.rows.len() < row {
                    table.rows.push(Default::default());
                }
                table.rows.push(crate::model::TableRow {
                    cells,
                    ..Default::default()
                });
            }

            let Some(target_row) = table.rows.get_mut(row) else {
                continue;
            };
            let mut new_cell = new_cell;
            if i == 0 && j == 0 {
                caret = Some(add_marker(&mut new_cell, marker_format.clone()));
            }
            put_cell(&mut target_row.cells, col, new_cell);
        }
    }

    normalize_table(table, Some(&marker_format));
    apply_table_format(table, None, true);

    if let Some((paragraph_index, marker_index)) = caret {
        point.paragraph = BlockAddress::new(context.cell_path(), paragraph_index);
        point.marker_index = marker_index;
    }
}

fn neighbor(cell: Option<&BlockGroup>) -> (bool, TableCellFormat) {
    cell.and_then(BlockGroup::as_table_cell)
        .map(|props| (props.is_header, props.format.clone()))
        .unwrap_or_default()
}

fn put_cell(cells: &mut Vec<BlockGroup>, index: usize, cell: BlockGroup) {
    while cells.len() < index {
        cells.push(BlockGroup::table_cell(false, false, false, TableCellFormat::default()));
    }
    if index < cells.len() {
        cells[index] = cell;
    } else {
        cells.push(cell);
    }
}

/// Appends a marker to the last paragraph of `group`, adding a paragraph
/// if the group does not end with one. Returns the block and segment index
/// of the marker.
fn add_marker(group: &mut BlockGroup, format: SegmentFormat) -> (usize, usize) {
    if !matches!(group.blocks.last(), Some(Block::Paragraph(_))) {
        group.blocks.push(Paragraph::implicit().into());
    }
    let block_index = group.blocks.len() - 1;
    let Some(Block::Paragraph(paragraph)) = group.blocks.last_mut() else {
        return (block_index, 0);
    };
    paragraph.segments.push(Segment::marker(format));
    (block_index, paragraph.segments.len() - 1)
}

// ============================================================================
// Default format propagation
// ============================================================================

fn apply_default_format(group: &mut BlockGroup, target_format: &SegmentFormat, options: &MergeModelOptions) {
    let keep_emphasis = options.merge_format == MergeFormat::KeepSourceEmphasisFormat;
    let strip_background = keep_emphasis && options.emphasis_policy.strip_block_background;

    for block in &mut group.blocks {
        match block {
            Block::Paragraph(paragraph) => {
                let decorator_format = paragraph.decorator.as_ref().map(|decorator| decorator.format.clone());
                for segment in &mut paragraph.segments {
                    let own = match &decorator_format {
                        Some(decorator) => decorator.merged(&segment.format),
                        None => segment.format.clone(),
                    };
                    segment.format = merge_segment_format(target_format, &own, options);
                    if let SegmentKind::General(inner) = &mut segment.kind {
                        apply_default_format(inner, target_format, options);
                    }
                }
                if keep_emphasis {
                    paragraph.decorator = None;
                }
                if strip_background {
                    paragraph.format.background_color = None;
                }
            }
            Block::BlockGroup(inner) => {
                if let Some(props) = inner.as_list_item_mut() {
                    props.format_holder.format = merge_segment_format(target_format, &props.format_holder.format, options);
                }
                if strip_background {
                    match &mut inner.kind {
                        BlockGroupKind::FormatContainer(props) => props.format.background_color = None,
                        BlockGroupKind::General(props) => props.format.background_color = None,
                        BlockGroupKind::ListItem(props) => props.format.background_color = None,
                        BlockGroupKind::TableCell(_) | BlockGroupKind::Document(_) => {}
                    }
                }
                apply_default_format(inner, target_format, options);
            }
            Block::Table(table) => {
                if strip_background {
                    table.format.background_color = None;
                }
                for row in &mut table.rows {
                    if strip_background {
                        row.format.background_color = None;
                    }
                    for cell in &mut row.cells {
                        if strip_background && let Some(props) = cell.as_table_cell_mut() {
                            props.format.background_color = None;
                        }
                        apply_default_format(cell, target_format, options);
                    }
                }
            }
            Block::Divider(divider) => {
                if strip_background {
                    divider.format.background_color = None;
                }
            }
            Block::Entity(_) => {}
        }
    }
}

fn merge_segment_format(target: &SegmentFormat, source: &SegmentFormat, options: &MergeModelOptions) -> SegmentFormat {
    match options.merge_format {
        MergeFormat::None => source.clone(),
        MergeFormat::MergeAll => target.merged(source),
        MergeFormat::KeepSourceEmphasisFormat => {
            let mut emphasis = source.clone();
            emphasis.retain(&options.emphasis_policy.keys);
            if emphasis.font_weight.as_deref() == Some("normal") {
                emphasis.font_weight = None;
            }
            if emphasis.italic == Some(false) {
                emphasis.italic = None;
            }
            if emphasis.underline == Some(false) {
                emphasis.underline = None;
            }
            target.merged(&emphasis)
        }
    }
}

#[cfg(test)]
#[path = "merge_tests.rs"]
mod merge_tests;

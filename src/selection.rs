//! Selection traversal over a content model.
//!
//! [`iterate_selections`] walks the tree depth first and reports every
//! selected leaf unit in document order together with its ancestor chain.
//! Everything that needs to know "what is selected" is built on top of it.

use crate::model::{
    Block, BlockAddress, BlockGroup, BlockGroupKind, GroupPath, PathStep, Segment, SegmentKind,
    SegmentLocation,
};

pub mod collect;
pub mod navigate;
pub mod set_selection;

pub use collect::{
    OperationalBlock, get_closest_ancestor_block_group_index, get_first_selected_list_item,
    get_first_selected_table, get_operational_blocks, get_selected_paragraphs,
    get_selected_segments,
};
pub use navigate::{CaretMove, move_caret};
pub use set_selection::{
    DomPosition, DomSelection, clear_selection, dom_selection_of, select_image, select_range,
    select_table_cells, set_caret,
};

/// When to surface a list item's format holder as a selected segment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ListFormatHolderPolicy {
    Never,
    /// Only when every segment directly inside the list item is selected.
    #[default]
    AllSegments,
    /// As soon as any segment directly inside the list item is selected.
    AnySegment,
}

/// How content under a selected table or table cell is reported.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TableCellContentPolicy {
    /// Report selected cells and keep descending into their content.
    #[default]
    Include,
    /// A wholly selected table is reported once, as a block.
    IgnoreForTable,
    /// Like [`TableCellContentPolicy::IgnoreForTable`], and selected cells
    /// are reported without their content.
    IgnoreForTableOrCell,
}

/// How content under a selected general element is reported.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GeneralElementContentPolicy {
    #[default]
    ContentOnly,
    GeneralElementOnly,
    Both,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IterateSelectionsOptions {
    pub include_list_format_holder: ListFormatHolderPolicy,
    pub content_under_selected_table_cell: TableCellContentPolicy,
    pub content_under_selected_general_element: GeneralElementContentPolicy,
}

impl IterateSelectionsOptions {
    pub fn with_list_format_holder(mut self, policy: ListFormatHolderPolicy) -> Self {
        self.include_list_format_holder = policy;
        self
    }

    pub fn with_table_cell_content(mut self, policy: TableCellContentPolicy) -> Self {
        self.content_under_selected_table_cell = policy;
        self
    }

    pub fn with_general_element_content(mut self, policy: GeneralElementContentPolicy) -> Self {
        self.content_under_selected_general_element = policy;
        self
    }
}

/// Where a selection unit sits relative to the innermost table around it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableSelectionContext {
    pub table: BlockAddress,
    pub row_index: usize,
    pub col_index: usize,
    pub is_whole_table_selected: bool,
}

impl TableSelectionContext {
    pub fn cell_path(&self) -> GroupPath {
        self.table.cell_path(self.row_index, self.col_index)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SelectedBlock<'a> {
    pub index: usize,
    pub block: &'a Block,
}

#[derive(Clone, Debug)]
pub struct SelectedSegment<'a> {
    pub location: SegmentLocation,
    pub segment: &'a Segment,
}

/// One selected unit.
#[derive(Clone, Debug)]
pub struct SelectionInfo<'a> {
    /// Ancestor chain, innermost group first, the document last.
    pub path: Vec<&'a BlockGroup>,
    /// Index path of `path[0]`.
    pub location: GroupPath,
    pub table_context: Option<TableSelectionContext>,
    pub block: Option<SelectedBlock<'a>>,
    pub segments: Option<Vec<SelectedSegment<'a>>>,
}

impl<'a> SelectionInfo<'a> {
    pub fn block_address(&self) -> Option<BlockAddress> {
        self.block
            .map(|block| BlockAddress::new(self.location.clone(), block.index))
    }

    /// True when the only selected unit is a marker at the start (`at_end`
    /// false) or the end of its paragraph.
    pub(crate) fn is_only_marker_at(&self, at_end: bool) -> bool {
        let Some(Block::Paragraph(paragraph)) = self.block.map(|block| block.block) else {
            return false;
        };
        let Some([selected]) = self.segments.as_deref() else {
            return false;
        };
        if !selected.segment.is_marker() {
            return false;
        }
        let boundary = if at_end {
            paragraph.segments.len().checked_sub(1)
        } else {
            Some(0)
        };
        selected.location.index().is_some() && selected.location.index() == boundary
    }
}

/// Walks the selected units of `root` in document order. The callback
/// returns `true` to stop the traversal.
pub fn iterate_selections<'a, F>(root: &'a BlockGroup, options: &IterateSelectionsOptions, mut callback: F)
where
    F: FnMut(SelectionInfo<'a>) -> bool,
{
    let mut path = vec![root];
    let mut location = GroupPath::root();
    walk_group(&mut path, &mut location, None, false, options, &mut callback);
}

/// Collects every selected unit of `root`.
pub fn collect_selections<'a>(root: &'a BlockGroup, options: &IterateSelectionsOptions) -> Vec<SelectionInfo<'a>> {
    let mut result = Vec::new();
    iterate_selections(root, options, |info| {
        result.push(info);
        false
    });
    result
}

fn emit<'a, F>(
    path: &[&'a BlockGroup],
    location: &GroupPath,
    table: Option<&TableSelectionContext>,
    block: Option<SelectedBlock<'a>>,
    segments: Option<Vec<SelectedSegment<'a>>>,
    callback: &mut F,
) -> bool
where
    F: FnMut(SelectionInfo<'a>) -> bool,
{
    callback(SelectionInfo {
        path: path.iter().rev().copied().collect(),
        location: location.clone(),
        table_context: table.cloned(),
        block,
        segments,
    })
}

/// `path` holds the ancestors root first; its last entry is the group being
/// walked and `location` is that group's index path.
fn walk_group<'a, F>(
    path: &mut Vec<&'a BlockGroup>,
    location: &mut GroupPath,
    table: Option<&TableSelectionContext>,
    treat_all_as_selected: bool,
    options: &IterateSelectionsOptions,
    callback: &mut F,
) -> bool
where
    F: FnMut(SelectionInfo<'a>) -> bool,
{
    let Some(&group) = path.last() else {
        return false;
    };
    let mut has_selected_segment = false;
    let mut has_unselected_segment = false;

    for (index, block) in group.blocks.iter().enumerate() {
        match block {
            Block::BlockGroup(inner) => {
                let selected = treat_all_as_selected || inner.is_selected();
                let policy = options.content_under_selected_general_element;
                let is_general = matches!(inner.kind, BlockGroupKind::General(_));

                if is_general
                    && selected
                    && policy != GeneralElementContentPolicy::ContentOnly
                    && emit(path, location, table, Some(SelectedBlock { index, block }), None, callback)
                {
                    return true;
                }
                if is_general && selected && policy == GeneralElementContentPolicy::GeneralElementOnly {
                    continue;
                }

                path.push(inner);
                location.push(PathStep::Group(index));
                let stop = walk_group(path, location, table, selected, options, callback);
                location.pop();
                path.pop();
                if stop {
                    return true;
                }
            }
            Block::Table(table_block) => {
                let table_address = BlockAddress::new(location.clone(), index);
                let is_whole_table_selected = !table_block.rows.is_empty()
                    && table_block
                        .rows
                        .iter()
                        .all(|row| row.cells.iter().all(BlockGroup::is_selected));
                let policy = options.content_under_selected_table_cell;

                if is_whole_table_selected && policy != TableCellContentPolicy::Include {
                    if emit(path, location, table, Some(SelectedBlock { index, block }), None, callback) {
                        return true;
                    }
                    continue;
                }

                for (row_index, row) in table_block.rows.iter().enumerate() {
                    for (col_index, cell) in row.cells.iter().enumerate() {
                        let cell_context = TableSelectionContext {
                            table: table_address.clone(),
                            row_index,
                            col_index,
                            is_whole_table_selected,
                        };
                        path.push(cell);
                        location.push(PathStep::Cell {
                            block: index,
                            row: row_index,
                            col: col_index,
                        });

                        let mut stop = cell.is_selected()
                            && emit(path, location, Some(&cell_context), None, None, callback);
                        if !stop
                            && (!cell.is_selected() || policy != TableCellContentPolicy::IgnoreForTableOrCell)
                        {
                            let selected = treat_all_as_selected || cell.is_selected();
                            stop = walk_group(path, location, Some(&cell_context), selected, options, callback);
                        }

                        location.pop();
                        path.pop();
                        if stop {
                            return true;
                        }
                    }
                }
            }
            Block::Paragraph(paragraph) => {
                let mut selected: Vec<SelectedSegment<'a>> = Vec::new();
                for (segment_index, segment) in paragraph.segments.iter().enumerate() {
                    let is_selected = treat_all_as_selected || segment.is_selected;
                    let selected_segment = || SelectedSegment {
                        location: SegmentLocation::InParagraph {
                            paragraph: BlockAddress::new(location.clone(), index),
                            index: segment_index,
                        },
                        segment,
                    };

                    let SegmentKind::General(inner) = &segment.kind else {
                        if is_selected {
                            selected.push(selected_segment());
                        }
                        continue;
                    };

                    let policy = options.content_under_selected_general_element;
                    if is_selected && policy != GeneralElementContentPolicy::ContentOnly {
                        selected.push(selected_segment());
                    }
                    if !is_selected || policy != GeneralElementContentPolicy::GeneralElementOnly {
                        path.push(inner);
                        location.push(PathStep::GeneralSegment {
                            block: index,
                            segment: segment_index,
                        });
                        let stop = walk_group(path, location, table, is_selected, options, callback);
                        location.pop();
                        path.pop();
                        if stop {
                            return true;
                        }
                    }
                }

                if selected.is_empty() {
                    has_unselected_segment = has_unselected_segment || !paragraph.segments.is_empty();
                } else {
                    has_selected_segment = true;
                    if selected.len() < paragraph.segments.len() {
                        has_unselected_segment = true;
                    }
                    if emit(path, location, table, Some(SelectedBlock { index, block }), Some(selected), callback) {
                        return true;
                    }
                }
            }
            Block::Divider(_) | Block::Entity(_) => {
                if (treat_all_as_selected || block.is_selected())
                    && emit(path, location, table, Some(SelectedBlock { index, block }), None, callback)
                {
                    return true;
                }
            }
        }
    }

    if let BlockGroupKind::ListItem(list_item) = &group.kind {
        let surfaced = match options.include_list_format_holder {
            ListFormatHolderPolicy::Never => false,
            ListFormatHolderPolicy::AllSegments => has_selected_segment && !has_unselected_segment,
            ListFormatHolderPolicy::AnySegment => has_selected_segment,
        };
        if surfaced {
            let holder = SelectedSegment {
                location: SegmentLocation::FormatHolder {
                    list_item: location.clone(),
                },
                segment: &list_item.format_holder,
            };
            if emit(path, location, table, None, Some(vec![holder]), callback) {
                return true;
            }
        }
    }

    false
}

#[cfg(test)]
#[path = "selection/selection_tests.rs"]
mod selection_tests;

use crate::model::{Block, BlockAddress, BlockGroup, BlockGroupType, GroupPath, Paragraph, Table};

use super::{
    IterateSelectionsOptions, ListFormatHolderPolicy, SelectedSegment, SelectionInfo,
    TableCellContentPolicy, collect_selections,
};

/// Drops a caret that only touches the edge of the selection: the last
/// entry when it is a lone marker at the start of its paragraph, the first
/// entry when it is a lone marker at the end of its paragraph.
pub(crate) fn remove_unmeaningful_selections(selections: &mut Vec<SelectionInfo<'_>>) {
    if selections.len() > 1 && selections.last().is_some_and(|last| last.is_only_marker_at(false)) {
        selections.pop();
    }
    if selections.len() > 1 && selections.first().is_some_and(|first| first.is_only_marker_at(true)) {
        selections.remove(0);
    }
}

/// Selected segments in document order. With `including_format_holder`, a
/// list item whose whole content is selected also reports its format
/// holder.
pub fn get_selected_segments(root: &BlockGroup, including_format_holder: bool) -> Vec<SelectedSegment<'_>> {
    let policy = if including_format_holder {
        ListFormatHolderPolicy::AllSegments
    } else {
        ListFormatHolderPolicy::Never
    };
    let mut selections = collect_selections(
        root,
        &IterateSelectionsOptions::default().with_list_format_holder(policy),
    );
    remove_unmeaningful_selections(&mut selections);

    let mut result = Vec::new();
    for selection in selections {
        let Some(segments) = selection.segments else {
            continue;
        };
        let is_paragraph = selection
            .block
            .is_some_and(|block| matches!(block.block, Block::Paragraph(_)));
        if is_paragraph || (including_format_holder && selection.block.is_none()) {
            result.extend(segments);
        }
    }
    result
}

/// Paragraphs touched by the selection, in document order.
pub fn get_selected_paragraphs(root: &BlockGroup) -> Vec<(BlockAddress, &Paragraph)> {
    let mut selections = collect_selections(
        root,
        &IterateSelectionsOptions::default().with_list_format_holder(ListFormatHolderPolicy::Never),
    );
    remove_unmeaningful_selections(&mut selections);

    selections
        .iter()
        .filter_map(|selection| {
            let block = selection.block?;
            let paragraph = block.block.as_paragraph()?;
            Some((BlockAddress::new(selection.location.clone(), block.index), paragraph))
        })
        .collect()
}

/// The unit a block level command acts on for one part of the selection.
#[derive(Clone, Debug)]
pub enum OperationalBlock<'a> {
    /// An ancestor group matching the requested types.
    Group {
        group: &'a BlockGroup,
        parent: &'a BlockGroup,
        location: GroupPath,
    },
    /// A selected block without a matching ancestor.
    Block { block: &'a Block, address: BlockAddress },
}

impl<'a> OperationalBlock<'a> {
    pub fn group(&self) -> Option<&'a BlockGroup> {
        match self {
            OperationalBlock::Group { group, .. } => Some(group),
            OperationalBlock::Block { .. } => None,
        }
    }
}

/// Index into `path` (innermost first) of the closest group of one of
/// `types`, not looking past any group of `stop_types`.
pub fn get_closest_ancestor_block_group_index(
    path: &[&BlockGroup],
    types: &[BlockGroupType],
    stop_types: &[BlockGroupType],
) -> Option<usize> {
    for (index, group) in path.iter().enumerate() {
        let group_type = group.group_type();
        if types.contains(&group_type) {
            return Some(index);
        }
        if stop_types.contains(&group_type) {
            return None;
        }
    }
    None
}

/// Resolves the operational block of every selected unit, deduplicated.
///
/// With `deep_first` each type in `types` is searched across the whole
/// ancestor chain before the next type is tried. Otherwise the nearest
/// ancestor matching any of the types wins.
pub fn get_operational_blocks<'a>(
    root: &'a BlockGroup,
    types: &[BlockGroupType],
    stop_types: &[BlockGroupType],
    deep_first: bool,
) -> Vec<OperationalBlock<'a>> {
    let sequence: Vec<&[BlockGroupType]> = if deep_first {
        types.iter().map(std::slice::from_ref).collect()
    } else {
        vec![types]
    };
    let mut selections = collect_selections(
        root,
        &IterateSelectionsOptions::default()
            .with_list_format_holder(ListFormatHolderPolicy::Never)
            .with_table_cell_content(TableCellContentPolicy::IgnoreForTable),
    );
    remove_unmeaningful_selections(&mut selections);

    let mut result: Vec<OperationalBlock<'a>> = Vec::new();
    for selection in &selections {
        for (attempt, candidate_types) in sequence.iter().enumerate() {
            if let Some(group_index) =
                get_closest_ancestor_block_group_index(&selection.path, candidate_types, stop_types)
            {
                let location = selection
                    .location
                    .truncated(selection.location.len().saturating_sub(group_index));
                let already_listed = result.iter().any(|entry| {
                    matches!(entry, OperationalBlock::Group { location: existing, .. } if *existing == location)
                });
                if !already_listed
                    && let (Some(&group), Some(&parent)) =
                        (selection.path.get(group_index), selection.path.get(group_index + 1))
                {
                    result.push(OperationalBlock::Group {
                        group,
                        parent,
                        location,
                    });
                }
                break;
            }

            if attempt + 1 == sequence.len() {
                if let (Some(block), Some(address)) = (selection.block, selection.block_address()) {
                    let already_listed = result.iter().any(|entry| {
                        matches!(entry, OperationalBlock::Block { address: existing, .. } if *existing == address)
                    });
                    if !already_listed {
                        result.push(OperationalBlock::Block {
                            block: block.block,
                            address,
                        });
                    }
                }
            }
        }
    }
    result
}

/// The first table touched by the selection, either through one of its
/// cells or as a wholly selected block.
pub fn get_first_selected_table(root: &BlockGroup) -> Option<(BlockAddress, &Table)> {
    let mut selections = collect_selections(
        root,
        &IterateSelectionsOptions::default().with_list_format_holder(ListFormatHolderPolicy::Never),
    );
    remove_unmeaningful_selections(&mut selections);

    selections.iter().find_map(|selection| {
        if let Some(context) = &selection.table_context {
            let table = root.table_at(&context.table)?;
            return Some((context.table.clone(), table));
        }
        let block = selection.block?;
        let table = block.block.as_table()?;
        Some((BlockAddress::new(selection.location.clone(), block.index), table))
    })
}

/// The first list item the selection acts on, never looking outside the
/// table cell the selection is in.
pub fn get_first_selected_list_item(root: &BlockGroup) -> Option<(GroupPath, &BlockGroup)> {
    get_operational_blocks(root, &[BlockGroupType::ListItem], &[BlockGroupType::TableCell], false)
        .into_iter()
        .find_map(|entry| match entry {
            OperationalBlock::Group { group, location, .. }
                if group.group_type() == BlockGroupType::ListItem =>
            {
                Some((location, group))
            }
            _ => None,
        })
}

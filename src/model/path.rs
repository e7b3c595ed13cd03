//! Index paths into a content model.
//!
//! A [`GroupPath`] walks from the document root down to a block group. The
//! addresses are plain indices, so they stay cheap to clone and are only
//! valid until the next structural mutation of the groups they pass
//! through.

use super::{Block, BlockGroup, Paragraph, Segment, SegmentKind, Table};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PathStep {
    /// Block group at this index of the parent's blocks.
    Group(usize),
    /// Cell of the table at `block` in the parent's blocks.
    Cell { block: usize, row: usize, col: usize },
    /// General segment `segment` inside paragraph `block`.
    GeneralSegment { block: usize, segment: usize },
}

impl PathStep {
    /// Index of the parent block this step descends through.
    pub fn block_index(&self) -> usize {
        match *self {
            PathStep::Group(index) => index,
            PathStep::Cell { block, .. } => block,
            PathStep::GeneralSegment { block, .. } => block,
        }
    }

    fn set_block_index(&mut self, index: usize) {
        match self {
            PathStep::Group(block) => *block = index,
            PathStep::Cell { block, .. } => *block = index,
            PathStep::GeneralSegment { block, .. } => *block = index,
        }
    }

    fn resolve<'a>(&self, group: &'a BlockGroup) -> Option<&'a BlockGroup> {
        match *self {
            PathStep::Group(index) => group.blocks.get(index)?.as_group(),
            PathStep::Cell { block, row, col } => group.blocks.get(block)?.as_table()?.cell(row, col),
            PathStep::GeneralSegment { block, segment } => {
                let paragraph = group.blocks.get(block)?.as_paragraph()?;
                match &paragraph.segments.get(segment)?.kind {
                    SegmentKind::General(inner) => Some(&**inner),
                    _ => None,
                }
            }
        }
    }

    fn resolve_mut<'a>(&self, group: &'a mut BlockGroup) -> Option<&'a mut BlockGroup> {
        match *self {
            PathStep::Group(index) => group.blocks.get_mut(index)?.as_group_mut(),
            PathStep::Cell { block, row, col } => group
                .blocks
                .get_mut(block)?
                .as_table_mut()?
                .cell_mut(row, col),
            PathStep::GeneralSegment { block, segment } => {
                let paragraph = group.blocks.get_mut(block)?.as_paragraph_mut()?;
                match &mut paragraph.segments.get_mut(segment)?.kind {
                    SegmentKind::General(inner) => Some(&mut **inner),
                    _ => None,
                }
            }
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct GroupPath {
    steps: Vec<PathStep>,
}

impl GroupPath {
    pub fn root() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn from_steps(steps: Vec<PathStep>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn push(&mut self, step: PathStep) {
        self.steps.push(step);
    }

    pub fn pop(&mut self) -> Option<PathStep> {
        self.steps.pop()
    }

    pub fn child(&self, step: PathStep) -> Self {
        let mut steps = self.steps.clone();
        steps.push(step);
        Self { steps }
    }

    pub fn parent(&self) -> Option<Self> {
        let (_, head) = self.steps.split_last()?;
        Some(Self {
            steps: head.to_vec(),
        })
    }

    pub fn last(&self) -> Option<&PathStep> {
        self.steps.last()
    }

    /// The first `len` steps of this path.
    pub fn truncated(&self, len: usize) -> Self {
        Self {
            steps: self.steps[..len.min(self.steps.len())].to_vec(),
        }
    }

    pub fn starts_with(&self, prefix: &GroupPath) -> bool {
        self.steps.starts_with(&prefix.steps)
    }

    /// Table address and cell coordinates of the innermost table cell this
    /// path passes through.
    pub fn innermost_cell(&self) -> Option<(BlockAddress, usize, usize)> {
        let (position, step) = self
            .steps
            .iter()
            .enumerate()
            .rev()
            .find(|(_, step)| matches!(step, PathStep::Cell { .. }))?;
        let PathStep::Cell { block, row, col } = *step else {
            return None;
        };
        let table = BlockAddress::new(self.truncated(position), block);
        Some((table, row, col))
    }

    /// Adjusts the path after the block at `index` of `group` was removed.
    pub fn shift_for_removal(&mut self, group: &GroupPath, index: usize) {
        if let Some(step) = self.step_below_mut(group) {
            let current = step.block_index();
            if current > index {
                step.set_block_index(current - 1);
            }
        }
    }

    /// Adjusts the path after a block was inserted at `index` of `group`.
    pub fn shift_for_insertion(&mut self, group: &GroupPath, index: usize) {
        if let Some(step) = self.step_below_mut(group) {
            let current = step.block_index();
            if current >= index {
                step.set_block_index(current + 1);
            }
        }
    }

    fn step_below_mut(&mut self, group: &GroupPath) -> Option<&mut PathStep> {
        if self.steps.len() <= group.steps.len() || !self.starts_with(group) {
            return None;
        }
        self.steps.get_mut(group.steps.len())
    }
}

/// A block inside a group.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct BlockAddress {
    pub group: GroupPath,
    pub index: usize,
}

impl BlockAddress {
    pub fn new(group: GroupPath, index: usize) -> Self {
        Self { group, index }
    }

    pub fn shift_for_removal(&mut self, group: &GroupPath, index: usize) {
        if &self.group == group {
            if self.index > index {
                self.index -= 1;
            }
        } else {
            self.group.shift_for_removal(group, index);
        }
    }

    pub fn shift_for_insertion(&mut self, group: &GroupPath, index: usize) {
        if &self.group == group {
            if self.index >= index {
                self.index += 1;
            }
        } else {
            self.group.shift_for_insertion(group, index);
        }
    }

    pub fn cell_path(&self, row: usize, col: usize) -> GroupPath {
        self.group.child(PathStep::Cell {
            block: self.index,
            row,
            col,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SegmentLocation {
    InParagraph { paragraph: BlockAddress, index: usize },
    /// The format holder of the list item at this path.
    FormatHolder { list_item: GroupPath },
}

impl SegmentLocation {
    pub fn paragraph(&self) -> Option<&BlockAddress> {
        match self {
            SegmentLocation::InParagraph { paragraph, .. } => Some(paragraph),
            SegmentLocation::FormatHolder { .. } => None,
        }
    }

    pub fn index(&self) -> Option<usize> {
        match self {
            SegmentLocation::InParagraph { index, .. } => Some(*index),
            SegmentLocation::FormatHolder { .. } => None,
        }
    }
}

// ============================================================================
// Resolution
// ============================================================================

impl BlockGroup {
    pub fn group_at(&self, path: &GroupPath) -> Option<&BlockGroup> {
        let mut group = self;
        for step in path.steps() {
            group = step.resolve(group)?;
        }
        Some(group)
    }

    pub fn group_at_mut(&mut self, path: &GroupPath) -> Option<&mut BlockGroup> {
        let mut group = self;
        for step in path.steps() {
            group = step.resolve_mut(group)?;
        }
        Some(group)
    }

    /// Ancestor chain of the group at `path`, innermost first and the root
    /// last.
    pub fn ancestors(&self, path: &GroupPath) -> Option<Vec<&BlockGroup>> {
        let mut chain = Vec::with_capacity(path.len() + 1);
        let mut group = self;
        chain.push(group);
        for step in path.steps() {
            group = step.resolve(group)?;
            chain.push(group);
        }
        chain.reverse();
        Some(chain)
    }

    pub fn block_at(&self, address: &BlockAddress) -> Option<&Block> {
        self.group_at(&address.group)?.blocks.get(address.index)
    }

    pub fn block_at_mut(&mut self, address: &BlockAddress) -> Option<&mut Block> {
        self.group_at_mut(&address.group)?.blocks.get_mut(address.index)
    }

    pub fn paragraph_at(&self, address: &BlockAddress) -> Option<&Paragraph> {
        self.block_at(address)?.as_paragraph()
    }

    pub fn paragraph_at_mut(&mut self, address: &BlockAddress) -> Option<&mut Paragraph> {
        self.block_at_mut(address)?.as_paragraph_mut()
    }

    pub fn table_at(&self, address: &BlockAddress) -> Option<&Table> {
        self.block_at(address)?.as_table()
    }

    pub fn table_at_mut(&mut self, address: &BlockAddress) -> Option<&mut Table> {
        self.block_at_mut(address)?.as_table_mut()
    }

    pub fn segment_at(&self, location: &SegmentLocation) -> Option<&Segment> {
        match location {
            SegmentLocation::InParagraph { paragraph, index } => {
                self.paragraph_at(paragraph)?.segments.get(*index)
            }
            SegmentLocation::FormatHolder { list_item } => {
                Some(&self.group_at(list_item)?.as_list_item()?.format_holder)
            }
        }
    }

    pub fn segment_at_mut(&mut self, location: &SegmentLocation) -> Option<&mut Segment> {
        match location {
            SegmentLocation::InParagraph { paragraph, index } => {
                self.paragraph_at_mut(paragraph)?.segments.get_mut(*index)
            }
            SegmentLocation::FormatHolder { list_item } => Some(
                &mut self
                    .group_at_mut(list_item)?
                    .as_list_item_mut()?
                    .format_holder,
            ),
        }
    }

    /// Addresses of every paragraph in document order, including paragraphs
    /// inside tables, lists and general segments.
    pub fn paragraph_addresses(&self) -> Vec<BlockAddress> {
        let mut result = Vec::new();
        let mut location = GroupPath::root();
        collect_paragraphs(self, &mut location, &mut result);
        result
    }
}

fn collect_paragraphs(group: &BlockGroup, location: &mut GroupPath, result: &mut Vec<BlockAddress>) {
    for (index, block) in group.blocks.iter().enumerate() {
        match block {
            Block::Paragraph(paragraph) => {
                result.push(BlockAddress::new(location.clone(), index));
                for (segment_index, segment) in paragraph.segments.iter().enumerate() {
                    if let SegmentKind::General(inner) = &segment.kind {
                        location.push(PathStep::GeneralSegment {
                            block: index,
                            segment: segment_index,
                        });
                        collect_paragraphs(inner, location, result);
                        location.pop();
                    }
                }
            }
            Block::BlockGroup(inner) => {
                location.push(PathStep::Group(index));
                collect_paragraphs(inner, location, result);
                location.pop();
            }
            Block::Table(table) => {
                for (row, cells) in table.rows.iter().enumerate() {
                    for (col, cell) in cells.cells.iter().enumerate() {
                        location.push(PathStep::Cell {
                            block: index,
                            row,
                            col,
                        });
                        collect_paragraphs(cell, location, result);
                        location.pop();
                    }
                }
            }
            Block::Divider(_) | Block::Entity(_) => {}
        }
    }
}

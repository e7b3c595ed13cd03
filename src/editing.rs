//! In-place editing of a content model: deletion, merging and
//! normalization.

use crate::model::{BlockAddress, BlockGroup, Entity, Image, Paragraph, Segment, SegmentFormat};
use crate::selection::{IterateSelectionsOptions, ListFormatHolderPolicy, TableSelectionContext, iterate_selections};

pub mod delete;
pub mod merge;
pub mod normalize;
pub mod table;
pub mod text;

pub use delete::{DeleteResult, DeleteSelectionResult, delete_selection};
pub use merge::{EmphasisPolicy, MergeFormat, MergeModelOptions, merge_model, split_paragraph};
pub use normalize::{normalize_content_model, normalize_paragraph};
pub use table::{apply_table_format, normalize_table};
pub use text::{delete_backward, delete_forward, insert_paragraph_break, insert_text_at_marker};

/// Side channel of one formatting pass. The editing functions append to the
/// entity and image lists; the host reads them once the pass is committed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FormatContext {
    pub new_entities: Vec<Entity>,
    pub deleted_entities: Vec<Entity>,
    pub new_images: Vec<Image>,
    pub skip_undo_snapshot: bool,
    /// Format to keep pending at the caret once the pass completes.
    pub new_pending_format: Option<SegmentFormat>,
}

/// A collapsed caret: the marker segment and the paragraph holding it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InsertPoint {
    pub paragraph: BlockAddress,
    pub marker_index: usize,
    pub table_context: Option<TableSelectionContext>,
}

impl InsertPoint {
    /// Finds the first selection marker of `root`.
    pub fn locate(root: &BlockGroup) -> Option<Self> {
        let mut result = None;
        iterate_selections(
            root,
            &IterateSelectionsOptions::default().with_list_format_holder(ListFormatHolderPolicy::Never),
            |selection| {
                let (Some(block), Some(segments)) = (selection.block, &selection.segments) else {
                    return false;
                };
                let Some(marker) = segments.iter().find(|selected| selected.segment.is_marker()) else {
                    return false;
                };
                let Some(marker_index) = marker.location.index() else {
                    return false;
                };
                result = Some(InsertPoint {
                    paragraph: BlockAddress::new(selection.location.clone(), block.index),
                    marker_index,
                    table_context: selection.table_context.clone(),
                });
                true
            },
        );
        result
    }

    pub fn marker<'a>(&self, root: &'a BlockGroup) -> Option<&'a Segment> {
        self.paragraph(root)?
            .segments
            .get(self.marker_index)
            .filter(|segment| segment.is_marker())
    }

    pub fn paragraph<'a>(&self, root: &'a BlockGroup) -> Option<&'a Paragraph> {
        root.paragraph_at(&self.paragraph)
    }

    /// Ancestor chain of the paragraph, innermost group first.
    pub fn path<'a>(&self, root: &'a BlockGroup) -> Option<Vec<&'a BlockGroup>> {
        root.ancestors(&self.paragraph.group)
    }
}

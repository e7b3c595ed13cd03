//! Formatting intent at a collapsed caret.
//!
//! Applying a format to an empty caret has no visible effect, so commands
//! park the format here and it is applied to whatever gets typed next. The
//! state machine has two states and four transitions: `capture`, `consume`,
//! `discard`, and `retain_at` (discard unless the caret is where it was).

use std::mem;

use tracing::debug;

use crate::editing::{FormatContext, InsertPoint, normalize_content_model};
use crate::model::{BlockGroup, Segment, SegmentFormat, SegmentKind};
use crate::selection::{DomPosition, DomSelection, dom_selection_of};

const NO_BREAK_SPACE: char = '\u{A0}';

#[derive(Clone, Debug, PartialEq)]
pub struct PendingFormat {
    pub format: SegmentFormat,
    /// Caret position the format was captured at.
    pub position: DomPosition,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum PendingFormatState {
    #[default]
    NoPendingFormat,
    PendingFormat(PendingFormat),
}

impl PendingFormatState {
    pub fn is_pending(&self) -> bool {
        matches!(self, PendingFormatState::PendingFormat(_))
    }

    pub fn format(&self) -> Option<&SegmentFormat> {
        match self {
            PendingFormatState::PendingFormat(pending) => Some(&pending.format),
            PendingFormatState::NoPendingFormat => None,
        }
    }

    pub fn position(&self) -> Option<&DomPosition> {
        match self {
            PendingFormatState::PendingFormat(pending) => Some(&pending.position),
            PendingFormatState::NoPendingFormat => None,
        }
    }

    pub fn capture(&mut self, format: SegmentFormat, position: DomPosition) {
        debug!(offset = position.offset, ?format, "pending format captured");
        *self = PendingFormatState::PendingFormat(PendingFormat { format, position });
    }

    /// Takes the pending format out, leaving no pending format behind.
    pub fn consume(&mut self) -> Option<PendingFormat> {
        match mem::take(self) {
            PendingFormatState::PendingFormat(pending) => {
                debug!("pending format consumed");
                Some(pending)
            }
            PendingFormatState::NoPendingFormat => None,
        }
    }

    pub fn discard(&mut self) {
        if self.is_pending() {
            debug!("pending format discarded");
        }
        *self = PendingFormatState::NoPendingFormat;
    }

    /// Keeps the pending format only while the caret stays exactly where the
    /// format was captured.
    pub fn retain_at(&mut self, caret: Option<&DomPosition>) {
        let moved = match self {
            PendingFormatState::PendingFormat(pending) => caret != Some(&pending.position),
            PendingFormatState::NoPendingFormat => false,
        };
        if moved {
            self.discard();
        }
    }
}

/// The marker of a collapsed selection, if that is what the model holds.
pub fn collapsed_caret(model: &BlockGroup) -> Option<InsertPoint> {
    dom_selection_of(model).filter(DomSelection::is_collapsed)?;
    InsertPoint::locate(model)
}

/// Stashes `default ⊕ pending ⊕ caret format` as the next pending format.
/// Never touches the model, so it always returns `false`.
pub fn apply_default_format(
    model: &mut BlockGroup,
    context: &mut FormatContext,
    default_format: &SegmentFormat,
    pending_format: Option<&SegmentFormat>,
) -> bool {
    let Some(marker) = collapsed_caret(model).and_then(|point| point.marker(model).cloned()) else {
        return false;
    };
    let mut format = default_format.clone();
    if let Some(pending) = pending_format {
        format.merge_from(pending);
    }
    format.merge_from(&marker.format);
    context.new_pending_format = Some(format);
    false
}

/// Re-formats `data`, which was just typed in front of the caret, with the
/// pending `format`. Nothing changes when the text before the caret does
/// not end with `data`.
pub fn apply_pending_format(
    model: &mut BlockGroup,
    context: &mut FormatContext,
    data: &str,
    format: &SegmentFormat,
) -> bool {
    let Some(point) = collapsed_caret(model) else {
        return false;
    };
    let Some(previous_index) = point.marker_index.checked_sub(1) else {
        return false;
    };
    let Some(paragraph) = model.paragraph_at_mut(&point.paragraph) else {
        return false;
    };
    let Some(previous) = paragraph.segments.get_mut(previous_index) else {
        return false;
    };
    let SegmentKind::Text(text) = &mut previous.kind else {
        return false;
    };
    let Some(split) = echo_start(text, data) else {
        debug!(data, "typed text does not match, pending format dropped");
        return false;
    };

    let typed = text.split_off(split);
    let mut segment = Segment::text(typed).with_format(previous.format.merged(format));
    segment.link = previous.link.clone();
    segment.code = previous.code.clone();
    paragraph.segments.insert(point.marker_index, segment);
    if let Some(marker) = paragraph.segments.get_mut(point.marker_index + 1) {
        marker.format.merge_from(format);
    }
    paragraph.is_implicit = false;

    normalize_content_model(model);
    context.skip_undo_snapshot = true;
    true
}

/// Byte index where `data` starts at the end of `text`. A typed ASCII space
/// also matches a trailing no-break space.
fn echo_start(text: &str, data: &str) -> Option<usize> {
    if data.is_empty() {
        return None;
    }
    if let Some(prefix) = text.strip_suffix(data) {
        return Some(prefix.len());
    }
    if data == " " {
        return text.strip_suffix(NO_BREAK_SPACE).map(str::len);
    }
    None
}

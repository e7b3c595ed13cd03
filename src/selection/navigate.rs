//! Keyboard caret movement over the paragraphs of a model.

use crate::model::{BlockGroup, Paragraph};

use super::set_selection::{DomPosition, DomSelection, dom_selection_of, select_range, set_caret};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaretMove {
    Left,
    Right,
    WordLeft,
    WordRight,
    LineStart,
    LineEnd,
    Up,
    Down,
    DocumentStart,
    DocumentEnd,
}

/// Moves the caret (or, with `extend`, the focus end of the range).
/// Returns `false` when there is no caret or it cannot move further.
pub fn move_caret(root: &mut BlockGroup, movement: CaretMove, extend: bool) -> bool {
    let Some(DomSelection::Range { start, end }) = dom_selection_of(root) else {
        return false;
    };

    let target = if !extend && start != end && matches!(movement, CaretMove::Left | CaretMove::Right) {
        if movement == CaretMove::Left { start.clone() } else { end.clone() }
    } else {
        let Some(target) = step(root, &end, movement) else {
            return false;
        };
        target
    };

    if extend {
        select_range(root, &start, &target)
    } else {
        set_caret(root, &target)
    }
}

fn step(root: &BlockGroup, from: &DomPosition, movement: CaretMove) -> Option<DomPosition> {
    let addresses = root.paragraph_addresses();
    let current = addresses.iter().position(|address| *address == from.paragraph)?;
    let paragraph = root.paragraph_at(&from.paragraph)?;
    let end = line_end(paragraph);
    let at = |offset: usize| Some(DomPosition::new(from.paragraph.clone(), offset));

    let previous = || {
        let address = addresses.get(current.checked_sub(1)?)?;
        Some((address, root.paragraph_at(address)?))
    };
    let next = || {
        let address = addresses.get(current + 1)?;
        Some((address, root.paragraph_at(address)?))
    };

    match movement {
        CaretMove::Left | CaretMove::WordLeft if from.offset > 0 => {
            let offset = if movement == CaretMove::Left {
                from.offset - 1
            } else {
                previous_word_boundary(&paragraph.text(), from.offset)
            };
            at(offset)
        }
        CaretMove::Left | CaretMove::WordLeft => {
            let (address, paragraph) = previous()?;
            Some(DomPosition::new(address.clone(), line_end(paragraph)))
        }
        CaretMove::Right | CaretMove::WordRight if from.offset < end => {
            let offset = if movement == CaretMove::Right {
                from.offset + 1
            } else {
                next_word_boundary(&paragraph.text(), from.offset).min(end)
            };
            at(offset)
        }
        CaretMove::Right | CaretMove::WordRight => {
            let (address, _) = next()?;
            Some(DomPosition::new(address.clone(), 0))
        }
        CaretMove::LineStart => at(0),
        CaretMove::LineEnd => at(end),
        CaretMove::Up => {
            let (address, paragraph) = previous()?;
            Some(DomPosition::new(address.clone(), from.offset.min(line_end(paragraph))))
        }
        CaretMove::Down => {
            let (address, paragraph) = next()?;
            Some(DomPosition::new(address.clone(), from.offset.min(line_end(paragraph))))
        }
        CaretMove::DocumentStart => Some(DomPosition::new(addresses.first()?.clone(), 0)),
        CaretMove::DocumentEnd => {
            let address = addresses.last()?;
            Some(DomPosition::new(address.clone(), line_end(root.paragraph_at(address)?)))
        }
    }
}

/// Last caret offset of a paragraph, in front of a trailing line break.
fn line_end(paragraph: &Paragraph) -> usize {
    let len = paragraph.char_len();
    let trailing_break = paragraph
        .segments
        .iter()
        .rev()
        .find(|segment| !segment.is_marker())
        .is_some_and(|segment| segment.is_br());
    if trailing_break { len.saturating_sub(1) } else { len }
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

pub fn previous_word_boundary(text: &str, offset: usize) -> usize {
    let chars: Vec<char> = text.chars().collect();
    let mut idx = offset.min(chars.len());

    while idx > 0 && chars[idx - 1].is_whitespace() {
        idx -= 1;
    }
    if idx > 0 && is_word_char(chars[idx - 1]) {
        while idx > 0 && is_word_char(chars[idx - 1]) {
            idx -= 1;
        }
    } else {
        while idx > 0 && !is_word_char(chars[idx - 1]) && !chars[idx - 1].is_whitespace() {
            idx -= 1;
        }
    }
    idx
}

pub fn next_word_boundary(text: &str, offset: usize) -> usize {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let mut idx = offset.min(len);

    if idx < len && is_word_char(chars[idx]) {
        while idx < len && is_word_char(chars[idx]) {
            idx += 1;
        }
    } else {
        while idx < len && !chars[idx].is_whitespace() && !is_word_char(chars[idx]) {
            idx += 1;
        }
    }
    while idx < len && chars[idx].is_whitespace() {
        idx += 1;
    }
    idx
}

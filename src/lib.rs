//! Editing core of a rich-text editor built on a typed content model.
//!
//! The [`model`] is a tree of blocks and segments with the selection stored
//! inline. [`editing`] transforms it, [`format_state`] summarizes the
//! selection for a toolbar, and [`editor::Editor`] ties both to plugins and a
//! caret-level pending format.

pub mod commands;
pub mod convert;
pub mod editing;
pub mod editor;
pub mod error;
pub mod format_plugin;
pub mod format_state;
pub mod metadata;
pub mod model;
pub mod pending_format;
pub mod selection;

pub use editor::{Editor, EditorOptions};
pub use error::EditorError;
pub use format_state::{ConflictSolution, FormatState, retrieve_model_format_state};

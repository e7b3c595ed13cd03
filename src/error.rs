use thiserror::Error;

/// Contract violations of the editor façade. Expected no-ops (nothing
/// selected, stale pending format) are not errors and surface as `false` or
/// `None` instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditorError {
    #[error("the editor has been disposed")]
    Disposed,

    #[error("the operation needs a caret but the model has no selection")]
    NoSelection,
}

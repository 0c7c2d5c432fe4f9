use buletin_post_core::{CommandError, FormatError};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("editing session is closed")]
    Closed,
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Command(#[from] CommandError),
}

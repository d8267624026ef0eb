//! Error types for the editor

use crate::changes::ChangeError;
use crate::remote::RemoteError;
use sitemap_model::ModelError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Another operation is still in flight")]
    Busy,

    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Change error: {0}")]
    Change(#[from] ChangeError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),
}

impl EditorError {
    /// True for errors reported by the remote authority
    pub fn is_remote(&self) -> bool {
        matches!(self, EditorError::Remote(_))
    }
}

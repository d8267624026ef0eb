//! Error types for the sitemap model

use crate::EntryId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("Entry not found: {0}")]
    IdNotFound(EntryId),

    #[error("Children of {0} are not loaded")]
    NotLoaded(String),

    #[error("Entry is not a container: {0}")]
    NotAContainer(String),

    #[error("Position {position} out of range for {path} ({len} children)")]
    PositionOutOfRange {
        path: String,
        position: usize,
        len: usize,
    },

    #[error("Moving {source_path} below {target_path} would create a cycle")]
    WouldCreateCycle {
        source_path: String,
        target_path: String,
    },

    #[error("The root entry cannot be moved or removed")]
    RootImmutable,
}

pub type ModelResult<T> = Result<T, ModelError>;

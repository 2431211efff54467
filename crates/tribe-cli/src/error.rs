use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] tribe_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Name cannot be empty")]
    EmptyName,
    #[error("ID cannot be empty")]
    EmptyId,
    #[error("Resolution cannot be empty")]
    EmptyResolution,
    #[error("List not found for id/prefix: {0}")]
    ListNotFound(String),
    #[error("Item not found for id/prefix: {0}")]
    ItemNotFound(String),
    #[error("{0}")]
    AmbiguousId(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

//! Error types for the voxel editing core

use thiserror::Error;

use crate::voxel::Rejection;
use crate::voxel::edit::EditError;

/// Main error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Placement rejected: {0}")]
    Rejected(#[from] Rejection),

    #[error("Edit error: {0}")]
    Edit(#[from] EditError),
}

//! Command and history failures.

use thiserror::Error;

use crate::core::types::IVec3;
use crate::voxel::resolution::Resolution;
use crate::voxel::store::Rejection;

#[derive(Clone, Debug, PartialEq, Error)]
pub enum EditError {
    /// The store refused a write
    #[error("write rejected at {position} ({resolution}): {reason}")]
    Rejected {
        position: IVec3,
        resolution: Resolution,
        reason: Rejection,
    },

    #[error("command has not been executed")]
    NotExecuted,

    #[error("command has already been executed")]
    AlreadyExecuted,

    /// Command was built against a different store
    #[error("command belongs to a different store")]
    ForeignStore,

    #[error("fill region covers {cells} cells, limit is {limit}")]
    RegionTooLarge { cells: u64, limit: usize },

    #[error("compression failed: {0}")]
    Compression(String),

    #[error("a transaction is already active")]
    TransactionActive,

    #[error("no transaction is active")]
    NoTransaction,

    #[error("no snapshot available")]
    NoSnapshot,
}

impl EditError {
    pub(crate) fn rejected(position: IVec3, resolution: Resolution, reason: Rejection) -> Self {
        EditError::Rejected {
            position,
            resolution,
            reason,
        }
    }
}

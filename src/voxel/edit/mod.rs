//! Undoable voxel edits.
//!
//! Commands record the cells they change so they can be undone, redone and
//! replayed. `HistoryManager` owns executed commands, and `EditSession` ties
//! one store to one history.

pub mod error;
pub mod change;
pub mod voxel_edit;
pub mod bulk;
pub mod fill;
pub mod transfer;
pub mod system;
pub mod composite;
pub mod command;
pub mod snapshot;
pub mod history;
pub mod session;

pub use error::EditError;
pub use change::{Direction, VoxelChange};
pub use voxel_edit::VoxelEditCommand;
pub use bulk::BulkVoxelEditCommand;
pub use fill::VoxelFillCommand;
pub use transfer::{VoxelCopyCommand, VoxelMoveCommand};
pub use system::{ResolutionChangeCommand, WorkspaceResizeCommand};
pub use composite::CompositeCommand;
pub use command::{Command, CommandKind};
pub use snapshot::StateSnapshot;
pub use history::{HistoryEvent, HistoryListener, HistoryManager};
pub use session::EditSession;

//! Closed set of undoable commands.

use crate::voxel::edit::bulk::BulkVoxelEditCommand;
use crate::voxel::edit::change::Direction;
use crate::voxel::edit::composite::CompositeCommand;
use crate::voxel::edit::error::EditError;
use crate::voxel::edit::fill::VoxelFillCommand;
use crate::voxel::edit::system::{ResolutionChangeCommand, WorkspaceResizeCommand};
use crate::voxel::edit::transfer::{VoxelCopyCommand, VoxelMoveCommand};
use crate::voxel::edit::voxel_edit::VoxelEditCommand;
use crate::voxel::store::{StoreId, VoxelDataStore};

/// Type tag of a command
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandKind {
    VoxelEdit,
    BulkEdit,
    Fill,
    Copy,
    Move,
    ResolutionChange,
    WorkspaceResize,
    Group,
}

impl CommandKind {
    /// Short label for the kind
    pub fn name(self) -> &'static str {
        match self {
            CommandKind::VoxelEdit => "voxel edit",
            CommandKind::BulkEdit => "bulk voxel edit",
            CommandKind::Fill => "fill",
            CommandKind::Copy => "copy",
            CommandKind::Move => "move",
            CommandKind::ResolutionChange => "resolution change",
            CommandKind::WorkspaceResize => "workspace resize",
            CommandKind::Group => "group",
        }
    }
}

/// An undoable mutation of a `VoxelDataStore`
#[derive(Clone, Debug)]
pub enum Command {
    Edit(VoxelEditCommand),
    Bulk(BulkVoxelEditCommand),
    Fill(VoxelFillCommand),
    Copy(VoxelCopyCommand),
    Move(VoxelMoveCommand),
    Resolution(ResolutionChangeCommand),
    Workspace(WorkspaceResizeCommand),
    Group(CompositeCommand),
}

impl Command {
    /// Display name shown in history listings
    pub fn name(&self) -> &str {
        match self {
            Command::Edit(c) => c.name(),
            Command::Bulk(c) => c.name(),
            Command::Fill(c) => c.name(),
            Command::Copy(c) => c.name(),
            Command::Move(c) => c.name(),
            Command::Resolution(c) => c.name(),
            Command::Workspace(c) => c.name(),
            Command::Group(c) => c.name(),
        }
    }

    /// Type tag
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Edit(_) => CommandKind::VoxelEdit,
            Command::Bulk(_) => CommandKind::BulkEdit,
            Command::Fill(_) => CommandKind::Fill,
            Command::Copy(_) => CommandKind::Copy,
            Command::Move(_) => CommandKind::Move,
            Command::Resolution(_) => CommandKind::ResolutionChange,
            Command::Workspace(_) => CommandKind::WorkspaceResize,
            Command::Group(_) => CommandKind::Group,
        }
    }

    /// Store the command was built for
    pub fn store_id(&self) -> StoreId {
        match self {
            Command::Edit(c) => c.store_id(),
            Command::Bulk(c) => c.store_id(),
            Command::Fill(c) => c.store_id(),
            Command::Copy(c) => c.store_id(),
            Command::Move(c) => c.store_id(),
            Command::Resolution(c) => c.store_id(),
            Command::Workspace(c) => c.store_id(),
            Command::Group(c) => c.store_id(),
        }
    }

    /// True if the command is currently applied
    pub fn is_executed(&self) -> bool {
        match self {
            Command::Edit(c) => c.is_executed(),
            Command::Bulk(c) => c.is_executed(),
            Command::Fill(c) => c.is_executed(),
            Command::Copy(c) => c.is_executed(),
            Command::Move(c) => c.is_executed(),
            Command::Resolution(c) => c.is_executed(),
            Command::Workspace(c) => c.is_executed(),
            Command::Group(c) => c.is_executed(),
        }
    }

    /// Execute against the store it was built for
    pub fn execute(&mut self, store: &mut VoxelDataStore) -> Result<(), EditError> {
        match self {
            Command::Edit(c) => c.execute(store),
            Command::Bulk(c) => c.execute(store),
            Command::Fill(c) => c.execute(store),
            Command::Copy(c) => c.execute(store),
            Command::Move(c) => c.execute(store),
            Command::Resolution(c) => c.execute(store),
            Command::Workspace(c) => c.execute(store),
            Command::Group(c) => c.execute(store),
        }
    }

    /// Revert a previous execute
    pub fn undo(&mut self, store: &mut VoxelDataStore) -> Result<(), EditError> {
        match self {
            Command::Edit(c) => c.undo(store),
            Command::Bulk(c) => c.undo(store),
            Command::Fill(c) => c.undo(store),
            Command::Copy(c) => c.undo(store),
            Command::Move(c) => c.undo(store),
            Command::Resolution(c) => c.undo(store),
            Command::Workspace(c) => c.undo(store),
            Command::Group(c) => c.undo(store),
        }
    }

    /// Re-apply recorded changes without validation or touching the
    /// executed flag.
    pub fn replay(&mut self, store: &mut VoxelDataStore, direction: Direction) -> Result<(), EditError> {
        match self {
            Command::Edit(c) => c.replay(store, direction),
            Command::Bulk(c) => c.replay(store, direction),
            Command::Fill(c) => c.replay(store, direction),
            Command::Copy(c) => c.replay(store, direction),
            Command::Move(c) => c.replay(store, direction),
            Command::Resolution(c) => c.replay(store, direction),
            Command::Workspace(c) => c.replay(store, direction),
            Command::Group(c) => c.replay(store, direction),
        }
    }

    /// Only single-voxel edits of the same cell merge.
    pub fn can_merge_with(&self, other: &Command) -> bool {
        match (self, other) {
            (Command::Edit(a), Command::Edit(b)) => a.can_merge_with(b),
            _ => false,
        }
    }

    /// Absorb `other` into `self`, handing it back if the two cannot merge.
    pub fn merge(&mut self, other: Command) -> Result<(), Command> {
        if !self.can_merge_with(&other) {
            return Err(other);
        }
        match (self, other) {
            (Command::Edit(a), Command::Edit(b)) => {
                a.merge(b);
                Ok(())
            }
            (_, other) => Err(other),
        }
    }

    /// Approximate memory usage in bytes
    pub fn memory_usage(&self) -> usize {
        match self {
            Command::Edit(c) => c.memory_usage(),
            Command::Bulk(c) => c.memory_usage(),
            Command::Fill(c) => c.memory_usage(),
            Command::Copy(c) => c.memory_usage(),
            Command::Move(c) => c.memory_usage(),
            Command::Resolution(c) => c.memory_usage(),
            Command::Workspace(c) => c.memory_usage(),
            Command::Group(c) => c.memory_usage(),
        }
    }

    /// Compress recorded data where the variant supports it
    pub fn compress(&mut self) -> Result<(), EditError> {
        match self {
            Command::Bulk(c) => c.compress(),
            Command::Group(c) => c.compress(),
            Command::Edit(_)
            | Command::Fill(_)
            | Command::Copy(_)
            | Command::Move(_)
            | Command::Resolution(_)
            | Command::Workspace(_) => Ok(()),
        }
    }

    /// Undo `compress`
    pub fn decompress(&mut self) -> Result<(), EditError> {
        match self {
            Command::Bulk(c) => c.decompress(),
            Command::Group(c) => c.decompress(),
            Command::Edit(_)
            | Command::Fill(_)
            | Command::Copy(_)
            | Command::Move(_)
            | Command::Resolution(_)
            | Command::Workspace(_) => Ok(()),
        }
    }
}

impl From<VoxelEditCommand> for Command {
    fn from(c: VoxelEditCommand) -> Self {
        Command::Edit(c)
    }
}

impl From<BulkVoxelEditCommand> for Command {
    fn from(c: BulkVoxelEditCommand) -> Self {
        Command::Bulk(c)
    }
}

impl From<VoxelFillCommand> for Command {
    fn from(c: VoxelFillCommand) -> Self {
        Command::Fill(c)
    }
}

impl From<VoxelCopyCommand> for Command {
    fn from(c: VoxelCopyCommand) -> Self {
        Command::Copy(c)
    }
}

impl From<VoxelMoveCommand> for Command {
    fn from(c: VoxelMoveCommand) -> Self {
        Command::Move(c)
    }
}

impl From<ResolutionChangeCommand> for Command {
    fn from(c: ResolutionChangeCommand) -> Self {
        Command::Resolution(c)
    }
}

impl From<WorkspaceResizeCommand> for Command {
    fn from(c: WorkspaceResizeCommand) -> Self {
        Command::Workspace(c)
    }
}

impl From<CompositeCommand> for Command {
    fn from(c: CompositeCommand) -> Self {
        Command::Group(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::IVec3;
    use crate::voxel::resolution::Resolution;
    use proptest::prelude::*;

    #[test]
    fn test_kinds_and_names() {
        let store = VoxelDataStore::new();
        let edit: Command = VoxelEditCommand::new(&store, IVec3::ZERO, Resolution::Cm1, true).into();
        let bulk: Command = BulkVoxelEditCommand::new(&store, "Paste").into();
        let fill: Command = VoxelFillCommand::new(&store, IVec3::ZERO, IVec3::ONE, Resolution::Cm1, true).into();
        let group: Command = CompositeCommand::new(&store, "Group").into();

        assert_eq!(edit.kind(), CommandKind::VoxelEdit);
        assert_eq!(bulk.name(), "Paste");
        assert_eq!(fill.kind().name(), "fill");
        assert_eq!(group.kind(), CommandKind::Group);
        assert!(!edit.can_merge_with(&bulk));
        assert_eq!(edit.store_id(), store.id());
    }

    #[test]
    fn test_merge_hands_back_incompatible() {
        let store = VoxelDataStore::new();
        let mut a: Command = VoxelEditCommand::new(&store, IVec3::ZERO, Resolution::Cm1, true).into();
        let b: Command = VoxelEditCommand::new(&store, IVec3::new(1, 0, 0), Resolution::Cm1, true).into();
        let back = a.merge(b).unwrap_err();
        assert_eq!(back.kind(), CommandKind::VoxelEdit);

        let c: Command = VoxelEditCommand::new(&store, IVec3::ZERO, Resolution::Cm1, false).into();
        assert!(a.merge(c).is_ok());
    }

    fn occupancy(store: &VoxelDataStore) -> Vec<(crate::math::coords::CellCoord, Resolution)> {
        let mut v: Vec<_> = store.all_voxels(None).map(|p| (p.cell, p.resolution)).collect();
        v.sort();
        v
    }

    proptest! {
        #[test]
        fn prop_undo_restores_and_redo_reapplies(
            seed in proptest::collection::vec((0i32..32, 0i32..32, 0i32..32, 0usize..4), 0..20),
            edits in proptest::collection::vec((0i32..32, 0i32..32, 0i32..32, 0usize..4, any::<bool>()), 1..20),
        ) {
            let mut store = VoxelDataStore::new();
            for (x, y, z, r) in seed {
                store.set_voxel(IVec3::new(x, y, z), Resolution::ALL[r], true);
            }
            let before = occupancy(&store);

            let mut bulk = BulkVoxelEditCommand::new(&store, "Random");
            for (x, y, z, r, v) in edits {
                bulk.add_change(IVec3::new(x, y, z), Resolution::ALL[r], !v, v);
            }
            let mut cmd: Command = bulk.into();

            if cmd.execute(&mut store).is_ok() {
                let after = occupancy(&store);
                cmd.undo(&mut store).unwrap();
                prop_assert_eq!(occupancy(&store), before);
                cmd.execute(&mut store).unwrap();
                prop_assert_eq!(occupancy(&store), after);
            } else {
                prop_assert_eq!(occupancy(&store), before);
            }
        }
    }
}

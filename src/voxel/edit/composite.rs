//! Ordered group of commands undone as one entry.

use crate::voxel::edit::change::Direction;
use crate::voxel::edit::command::Command;
use crate::voxel::edit::error::EditError;
use crate::voxel::store::{StoreId, VoxelDataStore};

/// Children run in order and undo in reverse. A failure part way through
/// rolls back the children already processed.
#[derive(Clone, Debug)]
pub struct CompositeCommand {
    store: StoreId,
    name: String,
    children: Vec<Command>,
    executed: bool,
}

impl CompositeCommand {
    /// Empty group named `name`
    pub fn new(store: &VoxelDataStore, name: impl Into<String>) -> Self {
        Self {
            store: store.id(),
            name: name.into(),
            children: Vec::new(),
            executed: false,
        }
    }

    /// Wrap children that have already been executed, e.g. by a transaction.
    pub(crate) fn from_executed(store: StoreId, name: impl Into<String>, children: Vec<Command>) -> Self {
        Self {
            store,
            name: name.into(),
            children,
            executed: true,
        }
    }

    /// Append a child. Ignored once executed.
    pub fn push(&mut self, command: Command) {
        if self.executed {
            log::warn!("Ignoring command added to executed group '{}'", self.name);
            return;
        }
        self.children.push(command);
    }

    /// Store the group was built for
    pub fn store_id(&self) -> StoreId {
        self.store
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True while the group is applied
    pub fn is_executed(&self) -> bool {
        self.executed
    }

    /// Child commands in execution order
    pub fn children(&self) -> &[Command] {
        &self.children
    }

    /// Number of children
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// True if the group has no children
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Execute children in order, rolling back on the first failure
    pub fn execute(&mut self, store: &mut VoxelDataStore) -> Result<(), EditError> {
        if store.id() != self.store {
            return Err(EditError::ForeignStore);
        }
        if self.executed {
            return Err(EditError::AlreadyExecuted);
        }

        for i in 0..self.children.len() {
            if let Err(e) = self.children[i].execute(store) {
                log::error!("Group '{}' failed at step {}: {}, rolling back", self.name, i + 1, e);
                for child in self.children[..i].iter_mut().rev() {
                    if let Err(undo_err) = child.undo(store) {
                        log::error!("Rollback of '{}' failed: {}", child.name(), undo_err);
                    }
                }
                return Err(e);
            }
        }

        self.executed = true;
        Ok(())
    }

    /// Undo children in reverse order, re-executing them on failure
    pub fn undo(&mut self, store: &mut VoxelDataStore) -> Result<(), EditError> {
        if store.id() != self.store {
            return Err(EditError::ForeignStore);
        }
        if !self.executed {
            return Err(EditError::NotExecuted);
        }

        let n = self.children.len();
        for i in (0..n).rev() {
            if let Err(e) = self.children[i].undo(store) {
                log::error!("Undo of group '{}' failed at step {}: {}, rolling back", self.name, i + 1, e);
                for child in self.children[i + 1..].iter_mut() {
                    if let Err(redo_err) = child.execute(store) {
                        log::error!("Rollback of '{}' failed: {}", child.name(), redo_err);
                    }
                }
                return Err(e);
            }
        }

        self.executed = false;
        Ok(())
    }

    /// Replay children in the order `direction` requires
    pub fn replay(&mut self, store: &mut VoxelDataStore, direction: Direction) -> Result<(), EditError> {
        match direction {
            Direction::Forward => {
                for child in self.children.iter_mut() {
                    child.replay(store, direction)?;
                }
            }
            Direction::Backward => {
                for child in self.children.iter_mut().rev() {
                    child.replay(store, direction)?;
                }
            }
        }
        Ok(())
    }

    /// Compress every child that supports it
    pub fn compress(&mut self) -> Result<(), EditError> {
        self.children.iter_mut().try_for_each(Command::compress)
    }

    /// Decompress every child
    pub fn decompress(&mut self) -> Result<(), EditError> {
        self.children.iter_mut().try_for_each(Command::decompress)
    }

    /// Sum of the children plus the group itself
    pub fn memory_usage(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.name.capacity()
            + self.children.iter().map(Command::memory_usage).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::IVec3;
    use crate::voxel::edit::voxel_edit::VoxelEditCommand;
    use crate::voxel::resolution::Resolution;

    fn place(store: &VoxelDataStore, x: i32, res: Resolution) -> Command {
        Command::Edit(VoxelEditCommand::new(store, IVec3::new(x, 0, 0), res, true))
    }

    #[test]
    fn test_execute_and_undo_in_order() {
        let mut store = VoxelDataStore::new();
        let mut group = CompositeCommand::new(&store, "Three");
        for x in 0..3 {
            group.push(place(&store, x, Resolution::Cm1));
        }
        // Remove the first again so order matters
        group.push(Command::Edit(VoxelEditCommand::new(&store, IVec3::ZERO, Resolution::Cm1, false)));

        group.execute(&mut store).unwrap();
        assert_eq!(store.total_voxel_count(), 2);
        assert!(!store.get_voxel(IVec3::ZERO, Resolution::Cm1));

        group.undo(&mut store).unwrap();
        assert_eq!(store.total_voxel_count(), 0);
    }

    #[test]
    fn test_failure_rolls_back_earlier_children() {
        let mut store = VoxelDataStore::new();
        let mut group = CompositeCommand::new(&store, "Clash");
        group.push(place(&store, 0, Resolution::Cm1));
        group.push(place(&store, 4, Resolution::Cm1));
        group.push(place(&store, 0, Resolution::Cm4));

        assert!(group.execute(&mut store).is_err());
        assert!(!group.is_executed());
        assert_eq!(store.total_voxel_count(), 0);
        assert!(group.children().iter().all(|c| !c.is_executed()));
    }
}

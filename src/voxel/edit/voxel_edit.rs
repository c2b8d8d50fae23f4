//! Single-voxel edit command.

use crate::core::types::IVec3;
use crate::math::coords::CellCoord;
use crate::voxel::edit::change::{Direction, VoxelChange};
use crate::voxel::edit::error::EditError;
use crate::voxel::resolution::Resolution;
use crate::voxel::store::{StoreId, VoxelDataStore};

/// Sets or clears one voxel.
///
/// The previous value is read when the command executes, not when it is built.
#[derive(Clone, Debug)]
pub struct VoxelEditCommand {
    store: StoreId,
    position: IVec3,
    resolution: Resolution,
    new_value: bool,
    old_value: Option<bool>,
    executed: bool,
}

impl VoxelEditCommand {
    /// Edit of the cell containing `position`
    pub fn new(store: &VoxelDataStore, position: IVec3, resolution: Resolution, value: bool) -> Self {
        Self {
            store: store.id(),
            position: CellCoord::from_increment(position, resolution).origin(resolution),
            resolution,
            new_value: value,
            old_value: None,
            executed: false,
        }
    }

    pub fn store_id(&self) -> StoreId {
        self.store
    }

    /// Origin of the edited cell
    pub fn position(&self) -> IVec3 {
        self.position
    }

    /// Resolution of the edited cell
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Value written by execute
    pub fn new_value(&self) -> bool {
        self.new_value
    }

    /// Value captured at the last execution
    pub fn old_value(&self) -> Option<bool> {
        self.old_value
    }

    pub fn is_executed(&self) -> bool {
        self.executed
    }

    /// "Place Voxel" or "Remove Voxel"
    pub fn name(&self) -> &'static str {
        if self.new_value {
            "Place Voxel"
        } else {
            "Remove Voxel"
        }
    }

    fn check_store(&self, store: &VoxelDataStore) -> Result<(), EditError> {
        if store.id() != self.store {
            return Err(EditError::ForeignStore);
        }
        Ok(())
    }

    /// Write the new value, capturing the old one
    pub fn execute(&mut self, store: &mut VoxelDataStore) -> Result<(), EditError> {
        self.check_store(store)?;
        if self.executed {
            return Err(EditError::AlreadyExecuted);
        }

        let old = store
            .write_voxel(self.position, self.resolution, self.new_value)
            .map_err(|reason| EditError::rejected(self.position, self.resolution, reason))?;

        self.old_value = Some(old);
        self.executed = true;
        Ok(())
    }

    /// Write the captured old value back
    pub fn undo(&mut self, store: &mut VoxelDataStore) -> Result<(), EditError> {
        self.check_store(store)?;
        let Some(old) = self.old_value.filter(|_| self.executed) else {
            return Err(EditError::NotExecuted);
        };

        store
            .restore_voxel(self.position, self.resolution, old)
            .map_err(|reason| EditError::rejected(self.position, self.resolution, reason))?;

        self.executed = false;
        Ok(())
    }

    /// Same store, same cell, same resolution.
    pub fn can_merge_with(&self, other: &VoxelEditCommand) -> bool {
        self.store == other.store && self.position == other.position && self.resolution == other.resolution
    }

    /// Absorb a newer edit of the same cell: keep our old value, take its new one.
    pub fn merge(&mut self, other: VoxelEditCommand) {
        self.new_value = other.new_value;
        if self.old_value.is_none() {
            self.old_value = other.old_value;
        }
        self.executed = self.executed || other.executed;
    }

    /// Recorded change, once executed at least once
    pub fn change(&self) -> Option<VoxelChange> {
        self.old_value
            .map(|old| VoxelChange::new(self.position, self.resolution, old, self.new_value))
    }

    /// Apply the recorded change without validation
    pub fn replay(&self, store: &mut VoxelDataStore, direction: Direction) -> Result<(), EditError> {
        self.check_store(store)?;
        let change = self.change().ok_or(EditError::NotExecuted)?;
        let cell = change.cell();
        store.apply_cell(cell, change.resolution, change.target(direction));
        Ok(())
    }

    /// Approximate memory usage in bytes
    pub fn memory_usage(&self) -> usize {
        std::mem::size_of::<Self>()
    }
}

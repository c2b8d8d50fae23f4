//! Undoable changes to store settings rather than voxel occupancy.

use crate::core::types::Vec3;
use crate::voxel::edit::change::Direction;
use crate::voxel::edit::error::EditError;
use crate::voxel::resolution::Resolution;
use crate::voxel::store::{StoreId, VoxelDataStore};

fn check_store(id: StoreId, store: &VoxelDataStore) -> Result<(), EditError> {
    if store.id() != id {
        return Err(EditError::ForeignStore);
    }
    Ok(())
}

/// Switches the active resolution.
///
/// The previous resolution is read when the command executes.
#[derive(Clone, Debug)]
pub struct ResolutionChangeCommand {
    store: StoreId,
    new_resolution: Resolution,
    old_resolution: Option<Resolution>,
    executed: bool,
}

impl ResolutionChangeCommand {
    /// Command switching to `resolution`
    pub fn new(store: &VoxelDataStore, resolution: Resolution) -> Self {
        Self {
            store: store.id(),
            new_resolution: resolution,
            old_resolution: None,
            executed: false,
        }
    }

    pub fn store_id(&self) -> StoreId {
        self.store
    }

    pub fn name(&self) -> &'static str {
        "Change Resolution"
    }

    pub fn is_executed(&self) -> bool {
        self.executed
    }

    pub fn new_resolution(&self) -> Resolution {
        self.new_resolution
    }

    /// Resolution captured at the last execution
    pub fn old_resolution(&self) -> Option<Resolution> {
        self.old_resolution
    }

    /// Record the current resolution and switch
    pub fn execute(&mut self, store: &mut VoxelDataStore) -> Result<(), EditError> {
        check_store(self.store, store)?;
        if self.executed {
            return Err(EditError::AlreadyExecuted);
        }
        self.old_resolution = Some(store.active_resolution());
        store.set_active_resolution(self.new_resolution);
        self.executed = true;
        Ok(())
    }

    /// Switch back to the recorded resolution
    pub fn undo(&mut self, store: &mut VoxelDataStore) -> Result<(), EditError> {
        check_store(self.store, store)?;
        let Some(old) = self.old_resolution.filter(|_| self.executed) else {
            return Err(EditError::NotExecuted);
        };
        store.set_active_resolution(old);
        self.executed = false;
        Ok(())
    }

    /// Set the resolution for `direction` without touching the executed flag
    pub fn replay(&self, store: &mut VoxelDataStore, direction: Direction) -> Result<(), EditError> {
        check_store(self.store, store)?;
        let old = self.old_resolution.ok_or(EditError::NotExecuted)?;
        store.set_active_resolution(match direction {
            Direction::Forward => self.new_resolution,
            Direction::Backward => old,
        });
        Ok(())
    }

    /// Fixed size, nothing is heap allocated
    pub fn memory_usage(&self) -> usize {
        std::mem::size_of::<Self>()
    }
}

/// Resizes the workspace.
///
/// The store clamps the requested size. Voxels are never deleted by a
/// resize in either direction.
#[derive(Clone, Debug)]
pub struct WorkspaceResizeCommand {
    store: StoreId,
    new_size: Vec3,
    old_size: Option<Vec3>,
    executed: bool,
}

impl WorkspaceResizeCommand {
    /// Command resizing to `size` (meters)
    pub fn new(store: &VoxelDataStore, size: Vec3) -> Self {
        Self {
            store: store.id(),
            new_size: size,
            old_size: None,
            executed: false,
        }
    }

    pub fn store_id(&self) -> StoreId {
        self.store
    }

    pub fn name(&self) -> &'static str {
        "Resize Workspace"
    }

    pub fn is_executed(&self) -> bool {
        self.executed
    }

    /// Requested size, before clamping
    pub fn new_size(&self) -> Vec3 {
        self.new_size
    }

    /// Size captured at the last execution
    pub fn old_size(&self) -> Option<Vec3> {
        self.old_size
    }

    /// Record the current size and resize
    pub fn execute(&mut self, store: &mut VoxelDataStore) -> Result<(), EditError> {
        check_store(self.store, store)?;
        if self.executed {
            return Err(EditError::AlreadyExecuted);
        }
        self.old_size = Some(store.workspace_size());
        store.resize_workspace(self.new_size);
        self.executed = true;
        Ok(())
    }

    /// Resize back to the recorded size
    pub fn undo(&mut self, store: &mut VoxelDataStore) -> Result<(), EditError> {
        check_store(self.store, store)?;
        let Some(old) = self.old_size.filter(|_| self.executed) else {
            return Err(EditError::NotExecuted);
        };
        store.resize_workspace(old);
        self.executed = false;
        Ok(())
    }

    /// Set the size for `direction` without touching the executed flag
    pub fn replay(&self, store: &mut VoxelDataStore, direction: Direction) -> Result<(), EditError> {
        check_store(self.store, store)?;
        let old = self.old_size.ok_or(EditError::NotExecuted)?;
        store.resize_workspace(match direction {
            Direction::Forward => self.new_size,
            Direction::Backward => old,
        });
        Ok(())
    }

    /// Fixed size, nothing is heap allocated
    pub fn memory_usage(&self) -> usize {
        std::mem::size_of::<Self>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::IVec3;

    #[test]
    fn test_resolution_change_undo_redo() {
        let mut store = VoxelDataStore::new();
        store.set_active_resolution(Resolution::Cm8);

        let mut cmd = ResolutionChangeCommand::new(&store, Resolution::Cm64);
        assert_eq!(cmd.undo(&mut store), Err(EditError::NotExecuted));

        cmd.execute(&mut store).unwrap();
        assert_eq!(store.active_resolution(), Resolution::Cm64);
        assert_eq!(cmd.old_resolution(), Some(Resolution::Cm8));
        assert_eq!(cmd.execute(&mut store), Err(EditError::AlreadyExecuted));

        cmd.undo(&mut store).unwrap();
        assert_eq!(store.active_resolution(), Resolution::Cm8);

        cmd.execute(&mut store).unwrap();
        assert_eq!(store.active_resolution(), Resolution::Cm64);

        cmd.replay(&mut store, Direction::Backward).unwrap();
        assert_eq!(store.active_resolution(), Resolution::Cm8);
    }

    #[test]
    fn test_workspace_resize_undo_redo() {
        let mut store = VoxelDataStore::new();
        let original = store.workspace_size();

        let mut cmd = WorkspaceResizeCommand::new(&store, Vec3::new(3.0, 20.0, 4.0));
        cmd.execute(&mut store).unwrap();
        assert_eq!(store.workspace_size(), Vec3::new(3.0, 8.0, 4.0));
        assert_eq!(cmd.old_size(), Some(original));

        cmd.undo(&mut store).unwrap();
        assert_eq!(store.workspace_size(), original);

        cmd.execute(&mut store).unwrap();
        assert_eq!(store.workspace_size(), Vec3::new(3.0, 8.0, 4.0));
    }

    #[test]
    fn test_shrink_keeps_voxels_and_undo_restores_bounds() {
        let mut store = VoxelDataStore::new();
        store.set_voxel(IVec3::new(200, 0, 0), Resolution::Cm4, true);

        let mut cmd = WorkspaceResizeCommand::new(&store, Vec3::splat(2.0));
        cmd.execute(&mut store).unwrap();
        assert_eq!(store.voxels_outside_workspace(), 1);
        assert!(!store.set_voxel(IVec3::new(200, 0, 4), Resolution::Cm4, true));

        cmd.undo(&mut store).unwrap();
        assert_eq!(store.voxels_outside_workspace(), 0);
        assert!(store.set_voxel(IVec3::new(200, 0, 4), Resolution::Cm4, true));
    }

    #[test]
    fn test_foreign_store() {
        let a = VoxelDataStore::new();
        let mut b = VoxelDataStore::new();
        let mut cmd = ResolutionChangeCommand::new(&a, Resolution::Cm2);
        assert_eq!(cmd.execute(&mut b), Err(EditError::ForeignStore));
        let mut cmd = WorkspaceResizeCommand::new(&a, Vec3::splat(4.0));
        assert_eq!(cmd.execute(&mut b), Err(EditError::ForeignStore));
    }
}

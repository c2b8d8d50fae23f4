//! Edit session: owns one store and its history.
//!
//! Commands only carry a `StoreId`, so the session is what keeps the store
//! alive for as long as its history can reach it. Both halves sit behind
//! locks so a session can be shared with auxiliary threads. Locks are always
//! taken history first, then store.

use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::core::config::{EditorConfig, PlacementConfig};
use crate::core::types::{IVec3, Result, Vec3};
use crate::voxel::edit::command::Command;
use crate::voxel::edit::error::EditError;
use crate::voxel::edit::fill::VoxelFillCommand;
use crate::voxel::edit::history::HistoryManager;
use crate::voxel::edit::system::{ResolutionChangeCommand, WorkspaceResizeCommand};
use crate::voxel::edit::transfer::{VoxelCopyCommand, VoxelMoveCommand};
use crate::voxel::edit::voxel_edit::VoxelEditCommand;
use crate::voxel::placement::{PlacementRequest, PlacementValidator};
use crate::voxel::resolution::Resolution;
use crate::voxel::store::VoxelDataStore;

pub struct EditSession {
    history: Mutex<HistoryManager>,
    store: RwLock<VoxelDataStore>,
    placement: PlacementConfig,
}

impl Default for EditSession {
    fn default() -> Self {
        Self::new(&EditorConfig::default())
    }
}

impl EditSession {
    /// Session with an empty store built from `config`
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            history: Mutex::new(HistoryManager::new(&config.history)),
            store: RwLock::new(VoxelDataStore::from_config(config)),
            placement: config.placement.clone(),
        }
    }

    /// Wrap an existing store with a fresh history.
    pub fn with_store(store: VoxelDataStore, config: &EditorConfig) -> Self {
        Self {
            history: Mutex::new(HistoryManager::new(&config.history)),
            store: RwLock::new(store),
            placement: config.placement.clone(),
        }
    }

    /// Read access to the store
    pub fn store(&self) -> RwLockReadGuard<'_, VoxelDataStore> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write access to the store, bypassing history
    pub fn store_mut(&self) -> RwLockWriteGuard<'_, VoxelDataStore> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock the history
    pub fn history(&self) -> MutexGuard<'_, HistoryManager> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_both<T>(&self, f: impl FnOnce(&mut HistoryManager, &mut VoxelDataStore) -> T) -> T {
        let mut history = self.history();
        let mut store = self.store_mut();
        f(&mut history, &mut store)
    }

    /// Execute and record any command.
    pub fn execute(&self, command: impl Into<Command>) -> std::result::Result<(), EditError> {
        let command = command.into();
        self.with_both(|history, store| history.execute_command(command, store))
    }

    /// Place one voxel through history.
    pub fn place(&self, position: IVec3, resolution: Resolution) -> std::result::Result<(), EditError> {
        self.with_both(|history, store| {
            let command = VoxelEditCommand::new(store, position, resolution, true);
            history.execute_command(command, store)
        })
    }

    /// Remove one voxel through history. Fails with `NotPresent` if absent.
    pub fn remove(&self, position: IVec3, resolution: Resolution) -> std::result::Result<(), EditError> {
        self.with_both(|history, store| {
            store
                .validate_removal(position, resolution)
                .map_err(|reason| EditError::rejected(position, resolution, reason))?;
            let command = VoxelEditCommand::new(store, position, resolution, false);
            history.execute_command(command, store)
        })
    }

    /// Validate a raw hit, then place at the snapped position.
    pub fn place_at(&self, request: &PlacementRequest) -> Result<IVec3> {
        self.with_both(|history, store| {
            let position = PlacementValidator::validate(store, request)?;
            let command = VoxelEditCommand::new(store, position, request.resolution, true);
            history.execute_command(command, store)?;
            Ok(position)
        })
    }

    /// Fill or clear the cells touched by an inclusive increment region.
    pub fn fill(&self, a: IVec3, b: IVec3, resolution: Resolution, value: bool) -> std::result::Result<(), EditError> {
        let max_cells = self.placement.max_fill_cells;
        self.with_both(|history, store| {
            let command = VoxelFillCommand::new(store, a, b, resolution, value).with_max_cells(max_cells);
            history.execute_command(command, store)
        })
    }

    /// Copy the voxels at `sources` by `offset` through history.
    pub fn copy_voxels(&self, sources: Vec<IVec3>, offset: IVec3, resolution: Resolution) -> std::result::Result<(), EditError> {
        self.with_both(|history, store| {
            let command = VoxelCopyCommand::new(store, sources, offset, resolution);
            history.execute_command(command, store)
        })
    }

    /// Move the voxels at `sources` by `offset` through history.
    pub fn move_voxels(&self, sources: Vec<IVec3>, offset: IVec3, resolution: Resolution) -> std::result::Result<(), EditError> {
        self.with_both(|history, store| {
            let command = VoxelMoveCommand::new(store, sources, offset, resolution);
            history.execute_command(command, store)
        })
    }

    /// Switch the active resolution as an undoable step.
    pub fn change_resolution(&self, resolution: Resolution) -> std::result::Result<(), EditError> {
        self.with_both(|history, store| {
            let command = ResolutionChangeCommand::new(store, resolution);
            history.execute_command(command, store)
        })
    }

    /// Resize the workspace as an undoable step.
    pub fn change_workspace_size(&self, size: Vec3) -> std::result::Result<(), EditError> {
        self.with_both(|history, store| {
            let command = WorkspaceResizeCommand::new(store, size);
            history.execute_command(command, store)
        })
    }

    /// Undo the most recent entry. `Ok(false)` when there is nothing to undo.
    pub fn undo(&self) -> std::result::Result<bool, EditError> {
        self.with_both(|history, store| history.undo(store))
    }

    /// Redo the most recently undone entry. `Ok(false)` when there is none.
    pub fn redo(&self) -> std::result::Result<bool, EditError> {
        self.with_both(|history, store| history.redo(store))
    }

    /// True if an entry can be undone
    pub fn can_undo(&self) -> bool {
        self.history().can_undo()
    }

    /// True if an entry can be redone
    pub fn can_redo(&self) -> bool {
        self.history().can_redo()
    }

    /// Start grouping commands into one entry
    pub fn begin_transaction(&self, name: impl Into<String>) -> std::result::Result<(), EditError> {
        self.history().begin_transaction(name)
    }

    /// Commit the open transaction. `Ok(false)` when it was empty.
    pub fn end_transaction(&self) -> std::result::Result<bool, EditError> {
        self.with_both(|history, store| history.end_transaction(store))
    }

    /// Undo and discard the open transaction
    pub fn cancel_transaction(&self) -> std::result::Result<(), EditError> {
        self.with_both(|history, store| history.cancel_transaction(store))
    }

    /// Reconstruct the store at the current history position.
    pub fn rebuild(&self) -> std::result::Result<(), EditError> {
        self.with_both(|history, store| history.rebuild(store))
    }

    /// Resize the workspace directly, bypassing history. Returns the applied size.
    pub fn resize_workspace(&self, size: Vec3) -> Vec3 {
        self.store_mut().resize_workspace(size)
    }

    /// Set the active resolution directly, bypassing history.
    pub fn set_active_resolution(&self, resolution: Resolution) {
        self.store_mut().set_active_resolution(resolution);
    }
}

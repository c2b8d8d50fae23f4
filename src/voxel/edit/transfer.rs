//! Copy and move of voxel sets by an increment offset.
//!
//! Both commands look at their source positions when they execute, so only
//! voxels that exist at that moment are transferred. The resulting change
//! list goes through the same all-or-nothing path as bulk edits.

use std::collections::HashSet;

use crate::core::types::IVec3;
use crate::math::coords::{is_representable, CellCoord};
use crate::voxel::edit::change::{self, Direction, VoxelChange};
use crate::voxel::edit::error::EditError;
use crate::voxel::resolution::Resolution;
use crate::voxel::store::{Rejection, StoreId, VoxelDataStore};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Copy,
    Move,
}

/// State shared by copy and move
#[derive(Clone, Debug)]
struct Transfer {
    store: StoreId,
    sources: Vec<IVec3>,
    offset: IVec3,
    resolution: Resolution,
    changes: Vec<VoxelChange>,
    executed: bool,
}

impl Transfer {
    fn new(store: &VoxelDataStore, sources: Vec<IVec3>, offset: IVec3, resolution: Resolution) -> Self {
        Self {
            store: store.id(),
            sources,
            offset,
            resolution,
            changes: Vec::new(),
            executed: false,
        }
    }

    fn check_store(&self, store: &VoxelDataStore) -> Result<(), EditError> {
        if store.id() != self.store {
            return Err(EditError::ForeignStore);
        }
        Ok(())
    }

    /// Origins of the occupied source cells, each once, in source order
    fn occupied_sources(&self, store: &VoxelDataStore) -> Vec<IVec3> {
        let res = self.resolution;
        let mut seen = HashSet::new();
        self.sources
            .iter()
            .filter(|pos| is_representable(**pos))
            .map(|pos| CellCoord::from_increment(*pos, res))
            .filter(|cell| store.is_cell_occupied(*cell, res) && seen.insert(*cell))
            .map(|cell| cell.origin(res))
            .collect()
    }

    /// Removals (move only) followed by destination writes.
    fn plan(&self, store: &VoxelDataStore, mode: Mode) -> Result<Vec<VoxelChange>, EditError> {
        let res = self.resolution;
        if !is_representable(self.offset) {
            return Err(EditError::rejected(self.offset, res, Rejection::InvalidPosition));
        }

        let origins = self.occupied_sources(store);
        let mut planned = Vec::with_capacity(origins.len() * 2);

        if mode == Mode::Move {
            planned.extend(origins.iter().map(|o| VoxelChange::new(*o, res, true, false)));
        }

        for origin in &origins {
            let dest = *origin + self.offset;
            store
                .validate_position(dest, res)
                .map_err(|reason| EditError::rejected(dest, res, reason))?;
            planned.push(VoxelChange::new(dest, res, false, true));
        }
        Ok(planned)
    }

    fn execute(&mut self, store: &mut VoxelDataStore, mode: Mode) -> Result<(), EditError> {
        self.check_store(store)?;
        if self.executed {
            return Err(EditError::AlreadyExecuted);
        }

        let mut planned = self.plan(store, mode)?;
        change::apply_all(store, &mut planned, Direction::Forward)?;

        log::debug!("{:?} of {} voxels by {} at {}", mode, self.transferred(&planned, mode), self.offset, self.resolution);
        self.changes = planned;
        self.executed = true;
        Ok(())
    }

    fn transferred(&self, planned: &[VoxelChange], mode: Mode) -> usize {
        match mode {
            Mode::Copy => planned.len(),
            Mode::Move => planned.len() / 2,
        }
    }

    fn undo(&mut self, store: &mut VoxelDataStore) -> Result<(), EditError> {
        self.check_store(store)?;
        if !self.executed {
            return Err(EditError::NotExecuted);
        }
        change::apply_all(store, &mut self.changes, Direction::Backward)?;
        self.executed = false;
        Ok(())
    }

    fn replay(&self, store: &mut VoxelDataStore, direction: Direction) -> Result<(), EditError> {
        self.check_store(store)?;
        change::replay_all(store, &self.changes, direction);
        Ok(())
    }

    fn memory_usage(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.sources.capacity() * std::mem::size_of::<IVec3>()
            + self.changes.capacity() * std::mem::size_of::<VoxelChange>()
    }
}

/// Duplicates the voxels at `sources` into the cells displaced by `offset`.
///
/// Empty source positions are skipped. Destinations that are already
/// occupied at the same resolution are left as they are.
#[derive(Clone, Debug)]
pub struct VoxelCopyCommand {
    inner: Transfer,
}

impl VoxelCopyCommand {
    /// Copy of `sources` displaced by `offset`
    pub fn new(store: &VoxelDataStore, sources: Vec<IVec3>, offset: IVec3, resolution: Resolution) -> Self {
        Self {
            inner: Transfer::new(store, sources, offset, resolution),
        }
    }

    pub fn store_id(&self) -> StoreId {
        self.inner.store
    }

    pub fn name(&self) -> &'static str {
        "Copy Voxels"
    }

    pub fn is_executed(&self) -> bool {
        self.inner.executed
    }

    /// Requested source positions
    pub fn sources(&self) -> &[IVec3] {
        &self.inner.sources
    }

    pub fn offset(&self) -> IVec3 {
        self.inner.offset
    }

    pub fn resolution(&self) -> Resolution {
        self.inner.resolution
    }

    /// Destination writes of the last execution
    pub fn changes(&self) -> &[VoxelChange] {
        &self.inner.changes
    }

    /// Write every destination or none
    pub fn execute(&mut self, store: &mut VoxelDataStore) -> Result<(), EditError> {
        self.inner.execute(store, Mode::Copy)
    }

    /// Restore destinations to their previous values
    pub fn undo(&mut self, store: &mut VoxelDataStore) -> Result<(), EditError> {
        self.inner.undo(store)
    }

    /// Apply the recorded changes without validation
    pub fn replay(&self, store: &mut VoxelDataStore, direction: Direction) -> Result<(), EditError> {
        self.inner.replay(store, direction)
    }

    /// Approximate memory usage in bytes
    pub fn memory_usage(&self) -> usize {
        self.inner.memory_usage()
    }
}

/// Moves the voxels at `sources` by `offset`.
///
/// Sources are cleared before destinations are written, so a set may move
/// onto cells it currently occupies.
#[derive(Clone, Debug)]
pub struct VoxelMoveCommand {
    inner: Transfer,
}

impl VoxelMoveCommand {
    /// Move of `sources` displaced by `offset`
    pub fn new(store: &VoxelDataStore, sources: Vec<IVec3>, offset: IVec3, resolution: Resolution) -> Self {
        Self {
            inner: Transfer::new(store, sources, offset, resolution),
        }
    }

    pub fn store_id(&self) -> StoreId {
        self.inner.store
    }

    pub fn name(&self) -> &'static str {
        "Move Voxels"
    }

    pub fn is_executed(&self) -> bool {
        self.inner.executed
    }

    /// Requested source positions
    pub fn sources(&self) -> &[IVec3] {
        &self.inner.sources
    }

    pub fn offset(&self) -> IVec3 {
        self.inner.offset
    }

    pub fn resolution(&self) -> Resolution {
        self.inner.resolution
    }

    /// Source removals followed by destination writes
    pub fn changes(&self) -> &[VoxelChange] {
        &self.inner.changes
    }

    /// Clear sources and write destinations, all or nothing
    pub fn execute(&mut self, store: &mut VoxelDataStore) -> Result<(), EditError> {
        self.inner.execute(store, Mode::Move)
    }

    /// Restore destinations, then sources
    pub fn undo(&mut self, store: &mut VoxelDataStore) -> Result<(), EditError> {
        self.inner.undo(store)
    }

    /// Apply the recorded changes without validation
    pub fn replay(&self, store: &mut VoxelDataStore, direction: Direction) -> Result<(), EditError> {
        self.inner.replay(store, direction)
    }

    /// Approximate memory usage in bytes
    pub fn memory_usage(&self) -> usize {
        self.inner.memory_usage()
    }
}

//! Region fill and clear.

use crate::core::config::PlacementConfig;
use glam::I64Vec3;

use crate::core::types::IVec3;
use crate::math::coords::{is_representable, CellCoord};
use crate::math::ibox::IBox;
use crate::voxel::edit::change::{self, Direction, VoxelChange};
use crate::voxel::edit::error::EditError;
use crate::voxel::resolution::Resolution;
use crate::voxel::store::{Rejection, StoreId, VoxelDataStore};

/// Sets or clears every cell of one resolution touched by an inclusive
/// increment region.
///
/// Execution plans every cell against the current store first and aborts
/// without changing anything if any cell is rejected.
#[derive(Clone, Debug)]
pub struct VoxelFillCommand {
    store: StoreId,
    region: IBox,
    resolution: Resolution,
    value: bool,
    max_cells: usize,
    changes: Vec<VoxelChange>,
    executed: bool,
}

impl VoxelFillCommand {
    /// `a` and `b` are opposite corners of the region, both inclusive.
    pub fn new(store: &VoxelDataStore, a: IVec3, b: IVec3, resolution: Resolution, value: bool) -> Self {
        Self {
            store: store.id(),
            region: IBox::from_inclusive(a, b),
            resolution,
            value,
            max_cells: PlacementConfig::default().max_fill_cells,
            changes: Vec::new(),
            executed: false,
        }
    }

    /// Override the cell limit
    pub fn with_max_cells(mut self, max_cells: usize) -> Self {
        self.max_cells = max_cells;
        self
    }

    /// Store the fill was built for
    pub fn store_id(&self) -> StoreId {
        self.store
    }

    /// "Fill Region" or "Clear Region"
    pub fn name(&self) -> &'static str {
        if self.value {
            "Fill Region"
        } else {
            "Clear Region"
        }
    }

    /// True while the fill is applied
    pub fn is_executed(&self) -> bool {
        self.executed
    }

    /// Increment region, half-open
    pub fn region(&self) -> IBox {
        self.region
    }

    /// Resolution of the written cells
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Cells changed by the last execution
    pub fn changes(&self) -> &[VoxelChange] {
        &self.changes
    }

    /// Inclusive cell range touched by the region
    fn cell_range(&self) -> (CellCoord, CellCoord) {
        let lo = CellCoord::from_increment(self.region.min, self.resolution);
        let hi = CellCoord::from_increment(self.region.max - IVec3::ONE, self.resolution);
        (lo, hi)
    }

    /// Number of cells the region touches at this resolution
    pub fn cell_count(&self) -> u64 {
        let (lo, hi) = self.cell_range();
        let span = hi.as_ivec3().as_i64vec3() - lo.as_ivec3().as_i64vec3() + I64Vec3::ONE;
        (span.x * span.y * span.z) as u64
    }

    fn check_store(&self, store: &VoxelDataStore) -> Result<(), EditError> {
        if store.id() != self.store {
            return Err(EditError::ForeignStore);
        }
        Ok(())
    }

    /// Collect the cells that actually change, rejecting the whole fill on
    /// the first invalid cell.
    fn plan(&self, store: &VoxelDataStore) -> Result<Vec<VoxelChange>, EditError> {
        for corner in [self.region.min, self.region.max - IVec3::ONE] {
            if !is_representable(corner) {
                return Err(EditError::rejected(corner, self.resolution, Rejection::InvalidPosition));
            }
        }

        let cells = self.cell_count();
        if cells > self.max_cells as u64 {
            return Err(EditError::RegionTooLarge {
                cells,
                limit: self.max_cells,
            });
        }

        let res = self.resolution;
        let (lo, hi) = self.cell_range();
        let mut planned = Vec::new();

        for x in lo.x..=hi.x {
            for y in lo.y..=hi.y {
                for z in lo.z..=hi.z {
                    let cell = CellCoord::new(x, y, z);
                    let origin = cell.origin(res);
                    if store.is_cell_occupied(cell, res) == self.value {
                        continue;
                    }

                    if self.value {
                        // Cells of one resolution never overlap each other, so
                        // checking against the pre-fill store is exact
                        store
                            .validate_position(origin, res)
                            .map_err(|reason| EditError::rejected(origin, res, reason))?;
                        if store.cell_overlaps_other(cell, res) {
                            return Err(EditError::rejected(origin, res, Rejection::WouldOverlap));
                        }
                    }

                    planned.push(VoxelChange::new(origin, res, !self.value, self.value));
                }
            }
        }
        Ok(planned)
    }

    /// Plan and validate every cell, then write them all
    pub fn execute(&mut self, store: &mut VoxelDataStore) -> Result<(), EditError> {
        self.check_store(store)?;
        if self.executed {
            return Err(EditError::AlreadyExecuted);
        }

        let planned = match self.plan(store) {
            Ok(planned) => planned,
            Err(e) => {
                log::debug!("{} aborted before applying: {}", self.name(), e);
                return Err(e);
            }
        };

        for change in &planned {
            store.apply_cell(change.cell(), change.resolution, change.new_value);
        }

        log::debug!("{} changed {} cells at {}", self.name(), planned.len(), self.resolution);
        self.changes = planned;
        self.executed = true;
        Ok(())
    }

    /// Restore every changed cell
    pub fn undo(&mut self, store: &mut VoxelDataStore) -> Result<(), EditError> {
        self.check_store(store)?;
        if !self.executed {
            return Err(EditError::NotExecuted);
        }

        change::apply_all(store, &mut self.changes, Direction::Backward)?;
        self.executed = false;
        Ok(())
    }

    /// Apply the recorded changes without validation
    pub fn replay(&self, store: &mut VoxelDataStore, direction: Direction) -> Result<(), EditError> {
        self.check_store(store)?;
        change::replay_all(store, &self.changes, direction);
        Ok(())
    }

    /// Approximate memory usage in bytes
    pub fn memory_usage(&self) -> usize {
        std::mem::size_of::<Self>() + self.changes.capacity() * std::mem::size_of::<VoxelChange>()
    }
}

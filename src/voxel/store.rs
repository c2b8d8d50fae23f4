//! Voxel data store: the single mutation surface for voxel occupancy.
//!
//! Owns one `VoxelGrid` per resolution, the coverage index used for
//! cross-resolution overlap checks, the workspace bounds and the active
//! resolution. Every committed change is published to the optional event sink.

use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

use crate::core::config::EditorConfig;
use crate::core::types::{IVec3, Vec3};
use crate::math::coords::{is_representable, CellCoord};
use crate::voxel::coverage::CoverageIndex;
use crate::voxel::events::{EventSink, StoreEvent};
use crate::voxel::grid::VoxelGrid;
use crate::voxel::resolution::{Resolution, RESOLUTION_COUNT};
use crate::voxel::workspace::Workspace;

static NEXT_STORE_ID: AtomicU64 = AtomicU64::new(1);

/// Handle identifying one store instance.
///
/// Commands carry this instead of a reference back to the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StoreId(u64);

impl StoreId {
    fn next() -> Self {
        Self(NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw id value, unique per process
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Why a position cannot be written
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
pub enum Rejection {
    #[error("position is not a valid increment position")]
    InvalidPosition,
    #[error("position is below the ground plane")]
    BelowGroundPlane,
    #[error("position is outside the workspace")]
    OutOfBounds,
    #[error("voxel would overlap an existing voxel")]
    WouldOverlap,
    #[error("a voxel already exists at this position")]
    AlreadyExists,
    #[error("no voxel at this position")]
    NotPresent,
}

/// An occupied cell together with its resolution
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VoxelPosition {
    pub cell: CellCoord,
    pub resolution: Resolution,
}

impl VoxelPosition {
    /// Minimum corner in increments
    pub fn origin(&self) -> IVec3 {
        self.cell.origin(self.resolution)
    }
}

pub struct VoxelDataStore {
    id: StoreId,
    grids: [VoxelGrid; RESOLUTION_COUNT],
    coverage: CoverageIndex,
    active_resolution: Resolution,
    workspace: Workspace,
    sink: Option<Box<dyn EventSink>>,
}

impl Default for VoxelDataStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for VoxelDataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoxelDataStore")
            .field("id", &self.id)
            .field("voxels", &self.total_voxel_count())
            .field("active_resolution", &self.active_resolution)
            .field("workspace", &self.workspace.size())
            .finish()
    }
}

impl VoxelDataStore {
    /// Empty store with the default workspace.
    pub fn new() -> Self {
        Self::with_workspace(Workspace::default())
    }

    /// Empty store with the given workspace
    pub fn with_workspace(workspace: Workspace) -> Self {
        Self {
            id: StoreId::next(),
            grids: std::array::from_fn(|i| VoxelGrid::new(Resolution::ALL[i])),
            coverage: CoverageIndex::new(),
            active_resolution: Resolution::Cm1,
            workspace,
            sink: None,
        }
    }

    /// Empty store using the configured workspace and active resolution
    pub fn from_config(config: &EditorConfig) -> Self {
        let mut store = Self::with_workspace(Workspace::new(config.workspace.size));
        store.active_resolution = config.active_resolution;
        store
    }

    /// Handle commands use to check they run against this store
    pub fn id(&self) -> StoreId {
        self.id
    }

    /// Install the sink that receives every store event.
    pub fn set_event_sink(&mut self, sink: Box<dyn EventSink>) {
        self.sink = Some(sink);
    }

    /// Detach the event sink, returning it
    pub fn take_event_sink(&mut self) -> Option<Box<dyn EventSink>> {
        self.sink.take()
    }

    fn publish(&self, event: StoreEvent) {
        if let Some(sink) = &self.sink {
            sink.publish(&event);
        }
    }

    // -----------------------------------------------------------------------
    // Active resolution and workspace
    // -----------------------------------------------------------------------

    /// Resolution new placements use by default
    pub fn active_resolution(&self) -> Resolution {
        self.active_resolution
    }

    /// Change the active resolution, publishing `ResolutionChanged` when it differs
    pub fn set_active_resolution(&mut self, resolution: Resolution) {
        let old = std::mem::replace(&mut self.active_resolution, resolution);
        if old != resolution {
            self.publish(StoreEvent::ResolutionChanged { old, new: resolution });
        }
    }

    /// Current workspace
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Workspace size in meters
    pub fn workspace_size(&self) -> Vec3 {
        self.workspace.size()
    }

    /// Resize the workspace, clamping into the allowed range.
    ///
    /// Existing voxels are kept even if they end up outside; only new
    /// placements are gated by the bounds. Returns the applied size.
    pub fn resize_workspace(&mut self, size: Vec3) -> Vec3 {
        let old = self.workspace.resize(size);
        let new = self.workspace.size();
        if old == new {
            return new;
        }

        self.publish(StoreEvent::WorkspaceResized { old, new });

        let outside = self.voxels_outside_workspace();
        if outside > 0 {
            log::warn!(
                "Workspace resized to {:?}: {} voxels now lie outside the bounds",
                new,
                outside
            );
        }
        new
    }

    /// Number of voxels whose box is not fully inside the workspace
    pub fn voxels_outside_workspace(&self) -> usize {
        self.all_voxels(None)
            .filter(|v| !self.workspace.fits(&v.cell.bounds(v.resolution)))
            .count()
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Occupancy grid of one resolution
    pub fn grid(&self, resolution: Resolution) -> &VoxelGrid {
        &self.grids[resolution.index()]
    }

    /// Check if the cell containing `pos` is occupied at `resolution`
    pub fn get_voxel(&self, pos: IVec3, resolution: Resolution) -> bool {
        self.is_cell_occupied(CellCoord::from_increment(pos, resolution), resolution)
    }

    /// Alias of `get_voxel`.
    pub fn has_voxel(&self, pos: IVec3, resolution: Resolution) -> bool {
        self.get_voxel(pos, resolution)
    }

    /// Check if a cell is occupied at `resolution`
    pub fn is_cell_occupied(&self, cell: CellCoord, resolution: Resolution) -> bool {
        self.grids[resolution.index()].is_occupied(cell)
    }

    /// True if a voxel at `pos` would intersect any occupied voxel, including
    /// one already in the same cell.
    pub fn would_overlap(&self, pos: IVec3, resolution: Resolution) -> bool {
        let cell = CellCoord::from_increment(pos, resolution);
        self.is_cell_occupied(cell, resolution) || self.cell_overlaps_other(cell, resolution)
    }

    /// Like `would_overlap` but ignores the candidate's own cell.
    pub fn would_overlap_other(&self, pos: IVec3, resolution: Resolution) -> bool {
        self.cell_overlaps_other(CellCoord::from_increment(pos, resolution), resolution)
    }

    pub(crate) fn cell_overlaps_other(&self, cell: CellCoord, resolution: Resolution) -> bool {
        if self.coverage.finer_count(cell, resolution) > 0 {
            return true;
        }

        Resolution::ALL[resolution.index() + 1..]
            .iter()
            .any(|coarse| self.grids[coarse.index()].is_occupied(cell.to_coarser(resolution, *coarse)))
    }

    /// Check representability, ground plane and workspace containment.
    pub fn validate_position(&self, pos: IVec3, resolution: Resolution) -> Result<(), Rejection> {
        if !is_representable(pos) {
            return Err(Rejection::InvalidPosition);
        }
        if pos.y < 0 {
            return Err(Rejection::BelowGroundPlane);
        }

        let bounds = CellCoord::from_increment(pos, resolution).bounds(resolution);
        if !self.workspace.fits(&bounds) {
            return Err(Rejection::OutOfBounds);
        }
        Ok(())
    }

    /// Check that a voxel can be removed: position is representable and the voxel exists.
    pub fn validate_removal(&self, pos: IVec3, resolution: Resolution) -> Result<(), Rejection> {
        if !is_representable(pos) {
            return Err(Rejection::InvalidPosition);
        }
        if !self.get_voxel(pos, resolution) {
            return Err(Rejection::NotPresent);
        }
        Ok(())
    }

    /// Lazily enumerate occupied voxels, optionally restricted to one resolution.
    pub fn all_voxels(&self, resolution: Option<Resolution>) -> impl Iterator<Item = VoxelPosition> + '_ {
        let range = match resolution {
            Some(r) => r.index()..r.index() + 1,
            None => 0..RESOLUTION_COUNT,
        };

        self.grids[range].iter().flat_map(|grid| {
            let resolution = grid.resolution();
            grid.iter().map(move |cell| VoxelPosition { cell, resolution })
        })
    }

    /// Number of voxels at one resolution
    pub fn voxel_count(&self, resolution: Resolution) -> usize {
        self.grids[resolution.index()].count_occupied()
    }

    /// Voxels at the active resolution
    pub fn active_voxel_count(&self) -> usize {
        self.voxel_count(self.active_resolution)
    }

    /// Number of voxels across all resolutions
    pub fn total_voxel_count(&self) -> usize {
        self.grids.iter().map(VoxelGrid::count_occupied).sum()
    }

    /// Approximate memory usage in bytes
    pub fn memory_usage(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.grids.iter().map(VoxelGrid::memory_usage).sum::<usize>()
            + self.coverage.memory_usage()
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Write one voxel, returning its previous value.
    ///
    /// Clearing always succeeds. Setting requires a valid position and no
    /// overlap with any other voxel. Writing the current value is a no-op.
    pub fn write_voxel(&mut self, pos: IVec3, resolution: Resolution, value: bool) -> Result<bool, Rejection> {
        let cell = CellCoord::from_increment(pos, resolution);
        let old = self.is_cell_occupied(cell, resolution);
        if old == value {
            return Ok(old);
        }

        if value {
            self.validate_position(pos, resolution)?;
            if self.cell_overlaps_other(cell, resolution) {
                return Err(Rejection::WouldOverlap);
            }
        }

        self.apply_cell(cell, resolution, value);
        Ok(old)
    }

    /// Write used when reverting history.
    ///
    /// Skips the ground and workspace checks so voxels left outside a shrunken
    /// workspace can be restored, but still refuses overlaps.
    pub fn restore_voxel(&mut self, pos: IVec3, resolution: Resolution, value: bool) -> Result<bool, Rejection> {
        if !is_representable(pos) {
            return Err(Rejection::InvalidPosition);
        }

        let cell = CellCoord::from_increment(pos, resolution);
        let old = self.is_cell_occupied(cell, resolution);
        if old == value {
            return Ok(old);
        }
        if value && self.cell_overlaps_other(cell, resolution) {
            return Err(Rejection::WouldOverlap);
        }

        self.apply_cell(cell, resolution, value);
        Ok(old)
    }

    /// Boolean form of `write_voxel`.
    pub fn set_voxel(&mut self, pos: IVec3, resolution: Resolution, value: bool) -> bool {
        self.write_voxel(pos, resolution, value).is_ok()
    }

    /// Unchecked cell write that keeps the coverage index in sync and
    /// publishes the change. Returns the previous value.
    pub(crate) fn apply_cell(&mut self, cell: CellCoord, resolution: Resolution, value: bool) -> bool {
        let old = self.grids[resolution.index()].set_occupied(cell, value);
        if old == value {
            return old;
        }

        if value {
            self.coverage.insert(cell, resolution);
        } else {
            self.coverage.remove(cell, resolution);
        }

        self.publish(StoreEvent::VoxelChanged {
            position: cell.origin(resolution),
            resolution,
            old_value: old,
            new_value: value,
        });
        old
    }

    /// Remove every voxel at one resolution, returning how many were removed.
    pub fn clear_resolution(&mut self, resolution: Resolution) -> usize {
        let cells: Vec<CellCoord> = self.grids[resolution.index()].iter().collect();
        for cell in &cells {
            self.apply_cell(*cell, resolution, false);
        }
        cells.len()
    }

    /// Remove every voxel, returning how many were removed.
    pub fn clear_all(&mut self) -> usize {
        Resolution::ALL.iter().map(|r| self.clear_resolution(*r)).sum()
    }
}

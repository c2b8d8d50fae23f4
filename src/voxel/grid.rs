//! Sparse occupancy grid for a single resolution.

use std::collections::HashSet;

use crate::math::coords::CellCoord;
use crate::voxel::resolution::Resolution;

/// Set of occupied cells at one resolution.
///
/// Only occupied cells are stored, so empty space costs nothing.
#[derive(Clone, Debug)]
pub struct VoxelGrid {
    resolution: Resolution,
    occupied: HashSet<CellCoord>,
}

impl VoxelGrid {
    /// Empty grid for one resolution
    pub fn new(resolution: Resolution) -> Self {
        Self {
            resolution,
            occupied: HashSet::new(),
        }
    }

    /// Resolution this grid stores
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Set occupancy, returning the previous value.
    pub fn set_occupied(&mut self, cell: CellCoord, occupied: bool) -> bool {
        if occupied {
            !self.occupied.insert(cell)
        } else {
            self.occupied.remove(&cell)
        }
    }

    /// Check if a cell is occupied
    pub fn is_occupied(&self, cell: CellCoord) -> bool {
        self.occupied.contains(&cell)
    }

    /// Alias of `is_occupied`.
    pub fn contains(&self, cell: CellCoord) -> bool {
        self.is_occupied(cell)
    }

    /// Number of occupied cells
    pub fn count_occupied(&self) -> usize {
        self.occupied.len()
    }

    /// True if no cell is occupied
    pub fn is_empty(&self) -> bool {
        self.occupied.is_empty()
    }

    /// Occupied cells in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = CellCoord> + '_ {
        self.occupied.iter().copied()
    }

    /// Remove every cell
    pub fn clear(&mut self) {
        self.occupied.clear();
    }

    /// Approximate heap usage in bytes.
    pub fn memory_usage(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.occupied.capacity() * (std::mem::size_of::<CellCoord>() + std::mem::size_of::<u64>())
    }
}

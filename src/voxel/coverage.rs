//! Cross-resolution coverage counts.
//!
//! For every level `L` this keeps, per `L`-cell, how many occupied voxels of
//! strictly finer levels lie inside it. Since sizes nest exactly, each finer
//! cell lies in one cell of every coarser level, so a write touches at most
//! nine counters and a "is anything finer in here" query is one lookup.

use std::collections::HashMap;

use crate::math::coords::CellCoord;
use crate::voxel::resolution::{Resolution, RESOLUTION_COUNT};

#[derive(Clone, Debug, Default)]
pub struct CoverageIndex {
    finer: [HashMap<CellCoord, u32>; RESOLUTION_COUNT],
}

impl CoverageIndex {
    /// Empty index for every resolution
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly occupied voxel.
    pub fn insert(&mut self, cell: CellCoord, resolution: Resolution) {
        for coarse in &Resolution::ALL[resolution.index() + 1..] {
            let key = cell.to_coarser(resolution, *coarse);
            *self.finer[coarse.index()].entry(key).or_insert(0) += 1;
        }
    }

    /// Forget a voxel that was just cleared.
    pub fn remove(&mut self, cell: CellCoord, resolution: Resolution) {
        for coarse in &Resolution::ALL[resolution.index() + 1..] {
            let key = cell.to_coarser(resolution, *coarse);
            let map = &mut self.finer[coarse.index()];
            if let Some(count) = map.get_mut(&key) {
                *count -= 1;
                if *count == 0 {
                    map.remove(&key);
                }
            }
        }
    }

    /// Number of finer voxels inside `cell` at `resolution`.
    pub fn finer_count(&self, cell: CellCoord, resolution: Resolution) -> u32 {
        self.finer[resolution.index()].get(&cell).copied().unwrap_or(0)
    }

    /// Drop all counts
    pub fn clear(&mut self) {
        for map in &mut self.finer {
            map.clear();
        }
    }

    /// Drop every count contributed by voxels of one resolution.
    pub fn clear_resolution<I>(&mut self, cells: I, resolution: Resolution)
    where
        I: IntoIterator<Item = CellCoord>,
    {
        for cell in cells {
            self.remove(cell, resolution);
        }
    }

    /// Approximate memory usage in bytes
    pub fn memory_usage(&self) -> usize {
        self.finer
            .iter()
            .map(|m| m.capacity() * (std::mem::size_of::<CellCoord>() + std::mem::size_of::<u32>() + 8))
            .sum()
    }
}

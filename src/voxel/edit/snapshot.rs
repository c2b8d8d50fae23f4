//! Compressed full-occupancy snapshots used to bound history recovery.

use std::collections::HashSet;

use crate::core::types::Vec3;
use crate::math::coords::CellCoord;
use crate::voxel::edit::error::EditError;
use crate::voxel::resolution::{Resolution, RESOLUTION_COUNT};
use crate::voxel::store::VoxelDataStore;

const HEADER_BYTES: usize = RESOLUTION_COUNT * std::mem::size_of::<u32>();
const CELL_BYTES: usize = std::mem::size_of::<CellCoord>();

/// Occupancy of every grid at one moment, LZ4-compressed.
///
/// Layout before compression: one `u32` cell count per resolution, followed
/// by the `CellCoord`s of each resolution in order.
#[derive(Clone, Debug)]
pub struct StateSnapshot {
    workspace_size: Vec3,
    active_resolution: Resolution,
    voxel_count: usize,
    data: Vec<u8>,
}

impl StateSnapshot {
    /// Snapshot the store as it is now
    pub fn capture(store: &VoxelDataStore) -> Self {
        let mut counts = [0u32; RESOLUTION_COUNT];
        let mut cells: Vec<CellCoord> = Vec::with_capacity(store.total_voxel_count());

        for res in Resolution::ALL {
            let start = cells.len();
            cells.extend(store.grid(res).iter());
            // Sorted cells compress noticeably better
            cells[start..].sort_unstable();
            counts[res.index()] = (cells.len() - start) as u32;
        }

        let mut raw = Vec::with_capacity(HEADER_BYTES + cells.len() * CELL_BYTES);
        raw.extend_from_slice(bytemuck::cast_slice(&counts));
        raw.extend_from_slice(bytemuck::cast_slice(&cells));

        Self {
            workspace_size: store.workspace_size(),
            active_resolution: store.active_resolution(),
            voxel_count: cells.len(),
            data: lz4_flex::compress_prepend_size(&raw),
        }
    }

    /// Workspace size at capture time
    pub fn workspace_size(&self) -> Vec3 {
        self.workspace_size
    }

    /// Active resolution at capture time
    pub fn active_resolution(&self) -> Resolution {
        self.active_resolution
    }

    /// Voxels across all resolutions at capture time
    pub fn voxel_count(&self) -> usize {
        self.voxel_count
    }

    /// Compressed size in bytes
    pub fn memory_usage(&self) -> usize {
        std::mem::size_of::<Self>() + self.data.capacity()
    }

    fn decode(&self) -> Result<[HashSet<CellCoord>; RESOLUTION_COUNT], EditError> {
        let raw = lz4_flex::decompress_size_prepended(&self.data)
            .map_err(|e| EditError::Compression(format!("LZ4 decompression failed: {}", e)))?;

        if raw.len() < HEADER_BYTES {
            return Err(EditError::Compression("snapshot header truncated".into()));
        }

        let (header, body) = raw.split_at(HEADER_BYTES);
        let counts: Vec<usize> = header
            .chunks_exact(4)
            .map(|b| bytemuck::pod_read_unaligned::<u32>(b) as usize)
            .collect();

        let total: usize = counts.iter().sum();
        if body.len() != total * CELL_BYTES {
            return Err(EditError::Compression(format!(
                "snapshot body is {} bytes, expected {}",
                body.len(),
                total * CELL_BYTES
            )));
        }

        let mut sets: [HashSet<CellCoord>; RESOLUTION_COUNT] = Default::default();
        let mut cells = body.chunks_exact(CELL_BYTES).map(bytemuck::pod_read_unaligned::<CellCoord>);
        for (set, count) in sets.iter_mut().zip(counts) {
            set.extend(cells.by_ref().take(count));
        }
        Ok(sets)
    }

    /// Bring the store back to this snapshot: workspace size, active
    /// resolution and occupancy. Only cells that differ are written.
    /// Returns the number of cells written.
    pub fn restore(&self, store: &mut VoxelDataStore) -> Result<usize, EditError> {
        let target = self.decode()?;
        let mut written = 0;

        if store.workspace_size() != self.workspace_size {
            store.resize_workspace(self.workspace_size);
        }
        store.set_active_resolution(self.active_resolution);

        // Removals first so additions never see stale overlaps
        for res in Resolution::ALL {
            let stale: Vec<CellCoord> = store
                .grid(res)
                .iter()
                .filter(|c| !target[res.index()].contains(c))
                .collect();
            for cell in stale {
                store.apply_cell(cell, res, false);
                written += 1;
            }
        }

        for res in Resolution::ALL {
            for cell in &target[res.index()] {
                if !store.is_cell_occupied(*cell, res) {
                    store.apply_cell(*cell, res, true);
                    written += 1;
                }
            }
        }

        log::debug!("Restored snapshot of {} voxels ({} cells written)", self.voxel_count, written);
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::IVec3;

    fn occupancy(store: &VoxelDataStore) -> Vec<(CellCoord, Resolution)> {
        let mut v: Vec<_> = store.all_voxels(None).map(|p| (p.cell, p.resolution)).collect();
        v.sort();
        v
    }

    #[test]
    fn test_capture_restore() {
        let mut store = VoxelDataStore::new();
        for x in 0..20 {
            store.set_voxel(IVec3::new(x, 0, 0), Resolution::Cm1, true);
        }
        store.set_voxel(IVec3::new(0, 0, 32), Resolution::Cm16, true);
        store.set_active_resolution(Resolution::Cm16);

        let snapshot = StateSnapshot::capture(&store);
        let expected = occupancy(&store);
        assert_eq!(snapshot.voxel_count(), 21);
        assert_eq!(snapshot.active_resolution(), Resolution::Cm16);
        assert_eq!(snapshot.workspace_size(), store.workspace_size());

        store.clear_all();
        store.set_active_resolution(Resolution::Cm1);
        store.resize_workspace(Vec3::splat(3.0));
        store.set_voxel(IVec3::new(100, 0, 0), Resolution::Cm8, true);
        store.set_voxel(IVec3::new(0, 0, 0), Resolution::Cm1, true);

        let written = snapshot.restore(&mut store).unwrap();
        assert_eq!(occupancy(&store), expected);
        // One stale removal plus 20 additions; the 1cm voxel at the origin was already there
        assert_eq!(written, 21);
        assert!(!store.would_overlap(IVec3::new(100, 0, 0), Resolution::Cm8));
        assert_eq!(store.active_resolution(), Resolution::Cm16);
        assert_eq!(store.workspace_size(), snapshot.workspace_size());
    }

    #[test]
    fn test_restore_empty_snapshot_clears() {
        let mut store = VoxelDataStore::new();
        let snapshot = StateSnapshot::capture(&store);
        store.set_voxel(IVec3::ZERO, Resolution::Cm64, true);

        snapshot.restore(&mut store).unwrap();
        assert_eq!(store.total_voxel_count(), 0);
    }

    #[test]
    fn test_snapshot_is_compact() {
        let mut store = VoxelDataStore::new();
        for x in 0..50 {
            for z in 0..50 {
                store.set_voxel(IVec3::new(x, 0, z), Resolution::Cm1, true);
            }
        }
        let snapshot = StateSnapshot::capture(&store);
        assert!(snapshot.memory_usage() < 2500 * CELL_BYTES);
    }
}

//! Recorded voxel changes and their compact packed form.

use bytemuck::{Pod, Zeroable};

use crate::core::types::IVec3;
use crate::math::coords::CellCoord;
use crate::voxel::edit::error::EditError;
use crate::voxel::resolution::Resolution;
use crate::voxel::store::VoxelDataStore;

/// Which way to apply recorded changes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Old values to new values
    Forward,
    /// New values back to old values
    Backward,
}

/// One cell changing occupancy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VoxelChange {
    /// Any increment inside the cell; normalised to the cell origin on construction
    pub position: IVec3,
    pub resolution: Resolution,
    pub old_value: bool,
    pub new_value: bool,
}

impl VoxelChange {
    /// Change of the cell containing `position`
    pub fn new(position: IVec3, resolution: Resolution, old_value: bool, new_value: bool) -> Self {
        Self {
            position: CellCoord::from_increment(position, resolution).origin(resolution),
            resolution,
            old_value,
            new_value,
        }
    }

    /// Cell this change writes
    pub fn cell(&self) -> CellCoord {
        CellCoord::from_increment(self.position, self.resolution)
    }

    /// Value this change writes when applied in `direction`
    pub fn target(&self, direction: Direction) -> bool {
        match direction {
            Direction::Forward => self.new_value,
            Direction::Backward => self.old_value,
        }
    }

    /// True if old and new values match
    pub fn is_noop(&self) -> bool {
        self.old_value == self.new_value
    }
}

/// Apply changes through the validating write path, all or nothing.
///
/// Forward applies in order through `write_voxel` and records each cell's
/// actual previous value as `old_value`. Backward applies in reverse through
/// `restore_voxel`. If any write is rejected, every
/// write already made by this call is reverted before the error is returned.
pub(crate) fn apply_all(
    store: &mut VoxelDataStore,
    changes: &mut [VoxelChange],
    direction: Direction,
) -> Result<(), EditError> {
    let mut applied: Vec<(CellCoord, Resolution, bool)> = Vec::with_capacity(changes.len());

    let order: Box<dyn Iterator<Item = usize>> = match direction {
        Direction::Forward => Box::new(0..changes.len()),
        Direction::Backward => Box::new((0..changes.len()).rev()),
    };

    for i in order {
        let change = changes[i];
        let target = change.target(direction);
        let written = match direction {
            Direction::Forward => store.write_voxel(change.position, change.resolution, target),
            Direction::Backward => store.restore_voxel(change.position, change.resolution, target),
        };
        match written {
            Ok(previous) => {
                applied.push((change.cell(), change.resolution, previous));
                if direction == Direction::Forward {
                    changes[i].old_value = previous;
                }
            }
            Err(reason) => {
                log::error!(
                    "Write {} of {} rejected ({}), rolling back {} applied changes",
                    applied.len() + 1,
                    changes.len(),
                    reason,
                    applied.len()
                );
                for (cell, resolution, previous) in applied.into_iter().rev() {
                    store.apply_cell(cell, resolution, previous);
                }
                return Err(EditError::rejected(change.position, change.resolution, reason));
            }
        }
    }
    Ok(())
}

/// Apply recorded changes without validation.
pub(crate) fn replay_all(store: &mut VoxelDataStore, changes: &[VoxelChange], direction: Direction) {
    match direction {
        Direction::Forward => {
            for change in changes {
                store.apply_cell(change.cell(), change.resolution, change.new_value);
            }
        }
        Direction::Backward => {
            for change in changes.iter().rev() {
                store.apply_cell(change.cell(), change.resolution, change.old_value);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Packed form
// ---------------------------------------------------------------------------

const FLAG_OLD: u8 = 0b01;
const FLAG_NEW: u8 = 0b10;

/// Fixed-size POD record used for compression
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
struct PackedChange {
    position: [i32; 3],
    resolution: u8,
    flags: u8,
    _pad: [u8; 2],
}

impl From<&VoxelChange> for PackedChange {
    fn from(c: &VoxelChange) -> Self {
        let mut flags = 0;
        if c.old_value {
            flags |= FLAG_OLD;
        }
        if c.new_value {
            flags |= FLAG_NEW;
        }
        Self {
            position: c.position.to_array(),
            resolution: c.resolution.index() as u8,
            flags,
            _pad: [0; 2],
        }
    }
}

impl PackedChange {
    fn unpack(&self) -> Option<VoxelChange> {
        let resolution = Resolution::from_index(self.resolution as usize)?;
        Some(VoxelChange {
            position: IVec3::from_array(self.position),
            resolution,
            old_value: self.flags & FLAG_OLD != 0,
            new_value: self.flags & FLAG_NEW != 0,
        })
    }
}

/// Pack and LZ4-compress a change list.
pub fn compress_changes(changes: &[VoxelChange]) -> Vec<u8> {
    let packed: Vec<PackedChange> = changes.iter().map(PackedChange::from).collect();
    lz4_flex::compress_prepend_size(bytemuck::cast_slice(&packed))
}

/// Inverse of `compress_changes`.
pub fn decompress_changes(data: &[u8]) -> Result<Vec<VoxelChange>, EditError> {
    let bytes = lz4_flex::decompress_size_prepended(data)
        .map_err(|e| EditError::Compression(format!("LZ4 decompression failed: {}", e)))?;

    let record = std::mem::size_of::<PackedChange>();
    if bytes.len() % record != 0 {
        return Err(EditError::Compression(format!(
            "payload of {} bytes is not a whole number of records",
            bytes.len()
        )));
    }

    bytes
        .chunks_exact(record)
        .map(|chunk| {
            let p: PackedChange = bytemuck::pod_read_unaligned(chunk);
            p.unpack()
                .ok_or_else(|| EditError::Compression(format!("invalid resolution index {}", p.resolution)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voxel::store::Rejection;

    #[test]
    fn test_change_normalises_position() {
        let c = VoxelChange::new(IVec3::new(5, 3, -1), Resolution::Cm4, false, true);
        assert_eq!(c.position, IVec3::new(4, 0, -4));
        assert_eq!(c.cell(), CellCoord::new(1, 0, -1));
        assert!(!c.is_noop());
        assert!(c.target(Direction::Forward));
        assert!(!c.target(Direction::Backward));
    }

    #[test]
    fn test_compressed_changes_restore_exactly() {
        let changes: Vec<_> = (0..500)
            .map(|i| VoxelChange::new(IVec3::new(i % 40, i / 40, -i), Resolution::ALL[(i % 10) as usize], i % 3 == 0, i % 2 == 0))
            .collect();

        let data = compress_changes(&changes);
        assert_eq!(decompress_changes(&data).unwrap(), changes);
    }

    #[test]
    fn test_flat_patch_compresses() {
        let changes: Vec<_> = (0..400)
            .map(|i| VoxelChange::new(IVec3::new(i % 20, 0, i / 20), Resolution::Cm1, false, true))
            .collect();

        let data = compress_changes(&changes);
        assert!(data.len() < changes.len() * std::mem::size_of::<PackedChange>() / 2);
    }

    #[test]
    fn test_decompress_garbage_fails() {
        let err = decompress_changes(&[1, 2, 3]).unwrap_err();
        assert!(matches!(err, EditError::Compression(_)));
    }

    #[test]
    fn test_apply_all_rolls_back_on_rejection() {
        let mut store = VoxelDataStore::new();
        store.set_voxel(IVec3::new(64, 0, 0), Resolution::Cm8, true);

        let mut changes = vec![
            VoxelChange::new(IVec3::new(0, 0, 0), Resolution::Cm4, false, true),
            VoxelChange::new(IVec3::new(4, 0, 0), Resolution::Cm4, false, true),
            // Overlaps the 8cm voxel
            VoxelChange::new(IVec3::new(64, 0, 0), Resolution::Cm2, false, true),
        ];

        let err = apply_all(&mut store, &mut changes, Direction::Forward).unwrap_err();
        assert_eq!(
            err,
            EditError::Rejected {
                position: IVec3::new(64, 0, 0),
                resolution: Resolution::Cm2,
                reason: Rejection::WouldOverlap,
            }
        );
        assert_eq!(store.voxel_count(Resolution::Cm4), 0);
        assert_eq!(store.total_voxel_count(), 1);
    }

    #[test]
    fn test_apply_and_replay_directions() {
        let mut store = VoxelDataStore::new();
        let mut changes = vec![
            VoxelChange::new(IVec3::new(0, 0, 0), Resolution::Cm1, false, true),
            VoxelChange::new(IVec3::new(0, 0, 0), Resolution::Cm1, true, false),
            VoxelChange::new(IVec3::new(0, 0, 0), Resolution::Cm2, false, true),
        ];

        apply_all(&mut store, &mut changes, Direction::Forward).unwrap();
        assert!(store.get_voxel(IVec3::ZERO, Resolution::Cm2));
        assert!(!store.get_voxel(IVec3::ZERO, Resolution::Cm1));

        apply_all(&mut store, &mut changes, Direction::Backward).unwrap();
        assert_eq!(store.total_voxel_count(), 0);

        replay_all(&mut store, &changes, Direction::Forward);
        assert!(store.get_voxel(IVec3::ZERO, Resolution::Cm2));
        replay_all(&mut store, &changes, Direction::Backward);
        assert_eq!(store.total_voxel_count(), 0);
    }
}

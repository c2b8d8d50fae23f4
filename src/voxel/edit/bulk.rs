//! Many voxel changes applied as one undoable unit.

use crate::core::types::IVec3;
use crate::voxel::edit::change::{self, Direction, VoxelChange};
use crate::voxel::edit::error::EditError;
use crate::voxel::resolution::Resolution;
use crate::voxel::store::{StoreId, VoxelDataStore};

/// Ordered list of `(position, resolution, old, new)` changes.
///
/// Execute and undo are all-or-nothing. While compressed the change list is
/// held as an LZ4 blob; execute and undo decompress it first.
#[derive(Clone, Debug)]
pub struct BulkVoxelEditCommand {
    store: StoreId,
    name: String,
    changes: Vec<VoxelChange>,
    packed: Option<Vec<u8>>,
    len: usize,
    executed: bool,
}

impl BulkVoxelEditCommand {
    /// Empty batch named `name`
    pub fn new(store: &VoxelDataStore, name: impl Into<String>) -> Self {
        Self {
            store: store.id(),
            name: name.into(),
            changes: Vec::new(),
            packed: None,
            len: 0,
            executed: false,
        }
    }

    /// Batch with an initial change list
    pub fn with_changes(store: &VoxelDataStore, name: impl Into<String>, changes: Vec<VoxelChange>) -> Self {
        let mut cmd = Self::new(store, name);
        cmd.len = changes.len();
        cmd.changes = changes;
        cmd
    }

    /// Store this batch was built for
    pub fn store_id(&self) -> StoreId {
        self.store
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True after a successful execute and until undo
    pub fn is_executed(&self) -> bool {
        self.executed
    }

    /// Number of queued changes, compressed or not
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if no change is queued
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True while changes are held as an LZ4 blob
    pub fn is_compressed(&self) -> bool {
        self.packed.is_some()
    }

    /// Queue a change. Ignored once executed.
    pub fn add_change(&mut self, position: IVec3, resolution: Resolution, old_value: bool, new_value: bool) {
        if self.executed {
            log::warn!("Ignoring change added to executed bulk command '{}'", self.name);
            return;
        }
        if let Err(e) = self.decompress() {
            log::error!("Dropping change added to bulk command '{}': {}", self.name, e);
            return;
        }
        self.changes.push(VoxelChange::new(position, resolution, old_value, new_value));
        self.len += 1;
    }

    /// Queue several changes
    pub fn add_changes<I>(&mut self, changes: I)
    where
        I: IntoIterator<Item = VoxelChange>,
    {
        for c in changes {
            self.add_change(c.position, c.resolution, c.old_value, c.new_value);
        }
    }

    /// Recorded changes (empty while compressed)
    pub fn changes(&self) -> &[VoxelChange] {
        &self.changes
    }

    fn check_store(&self, store: &VoxelDataStore) -> Result<(), EditError> {
        if store.id() != self.store {
            return Err(EditError::ForeignStore);
        }
        Ok(())
    }

    /// Apply every change or none of them
    pub fn execute(&mut self, store: &mut VoxelDataStore) -> Result<(), EditError> {
        self.check_store(store)?;
        if self.executed {
            return Err(EditError::AlreadyExecuted);
        }
        self.decompress()?;

        // Cheap rejections first so obviously bad batches never touch the store
        for c in self.changes.iter().filter(|c| c.new_value) {
            if let Err(reason) = store.validate_position(c.position, c.resolution) {
                log::debug!("Bulk edit '{}' rejected before applying: {}", self.name, reason);
                return Err(EditError::rejected(c.position, c.resolution, reason));
            }
        }

        change::apply_all(store, &mut self.changes, Direction::Forward)?;
        self.executed = true;
        Ok(())
    }

    /// Restore old values in reverse order, all or nothing
    pub fn undo(&mut self, store: &mut VoxelDataStore) -> Result<(), EditError> {
        self.check_store(store)?;
        if !self.executed {
            return Err(EditError::NotExecuted);
        }
        self.decompress()?;

        change::apply_all(store, &mut self.changes, Direction::Backward)?;
        self.executed = false;
        Ok(())
    }

    /// Apply recorded changes without validation
    pub fn replay(&mut self, store: &mut VoxelDataStore, direction: Direction) -> Result<(), EditError> {
        self.check_store(store)?;
        self.decompress()?;
        change::replay_all(store, &self.changes, direction);
        Ok(())
    }

    /// Pack the change list into an LZ4 blob.
    pub fn compress(&mut self) -> Result<(), EditError> {
        if self.packed.is_some() || self.changes.is_empty() {
            return Ok(());
        }
        self.packed = Some(change::compress_changes(&self.changes));
        self.changes = Vec::new();
        Ok(())
    }

    /// Unpack the change list if it is compressed
    pub fn decompress(&mut self) -> Result<(), EditError> {
        if let Some(packed) = self.packed.take() {
            match change::decompress_changes(&packed) {
                Ok(changes) => self.changes = changes,
                Err(e) => {
                    self.packed = Some(packed);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Approximate memory usage in bytes, blob included
    pub fn memory_usage(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.name.capacity()
            + self.changes.capacity() * std::mem::size_of::<VoxelChange>()
            + self.packed.as_ref().map_or(0, Vec::capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voxel::store::Rejection;

    fn row(store: &VoxelDataStore, n: i32) -> BulkVoxelEditCommand {
        let mut cmd = BulkVoxelEditCommand::new(store, "Row");
        for x in 0..n {
            cmd.add_change(IVec3::new(x * 2, 0, 0), Resolution::Cm2, false, true);
        }
        cmd
    }

    #[test]
    fn test_execute_undo_redo() {
        let mut store = VoxelDataStore::new();
        let mut cmd = row(&store, 10);
        assert_eq!(cmd.len(), 10);

        cmd.execute(&mut store).unwrap();
        assert_eq!(store.voxel_count(Resolution::Cm2), 10);

        cmd.undo(&mut store).unwrap();
        assert_eq!(store.total_voxel_count(), 0);

        cmd.execute(&mut store).unwrap();
        assert_eq!(store.voxel_count(Resolution::Cm2), 10);
    }

    #[test]
    fn test_all_or_nothing() {
        let mut store = VoxelDataStore::new();
        store.set_voxel(IVec3::new(8, 0, 0), Resolution::Cm4, true);

        let mut cmd = row(&store, 8);
        let err = cmd.execute(&mut store).unwrap_err();
        assert!(matches!(
            err,
            EditError::Rejected {
                reason: Rejection::WouldOverlap,
                ..
            }
        ));
        assert!(!cmd.is_executed());
        assert_eq!(store.voxel_count(Resolution::Cm2), 0);
    }

    #[test]
    fn test_prevalidation_rejects_out_of_bounds() {
        let mut store = VoxelDataStore::new();
        let mut cmd = BulkVoxelEditCommand::new(&store, "Bad");
        cmd.add_change(IVec3::ZERO, Resolution::Cm1, false, true);
        cmd.add_change(IVec3::new(0, -5, 0), Resolution::Cm1, false, true);

        let err = cmd.execute(&mut store).unwrap_err();
        assert!(matches!(
            err,
            EditError::Rejected {
                reason: Rejection::BelowGroundPlane,
                ..
            }
        ));
        assert_eq!(store.total_voxel_count(), 0);
    }

    #[test]
    fn test_compress_then_undo_redo() {
        let mut store = VoxelDataStore::new();
        let mut cmd = row(&store, 50);
        cmd.execute(&mut store).unwrap();
        let before: Vec<_> = {
            let mut v: Vec<_> = store.all_voxels(None).collect();
            v.sort_by_key(|p| (p.cell, p.resolution));
            v
        };

        let uncompressed = cmd.memory_usage();
        cmd.compress().unwrap();
        assert!(cmd.is_compressed());
        assert!(cmd.memory_usage() < uncompressed);

        cmd.undo(&mut store).unwrap();
        assert_eq!(store.total_voxel_count(), 0);

        cmd.compress().unwrap();
        cmd.execute(&mut store).unwrap();
        let mut after: Vec<_> = store.all_voxels(None).collect();
        after.sort_by_key(|p| (p.cell, p.resolution));
        assert_eq!(before, after);
    }

    #[test]
    fn test_records_actual_old_values() {
        let mut store = VoxelDataStore::new();
        store.set_voxel(IVec3::ZERO, Resolution::Cm1, true);

        let mut cmd = BulkVoxelEditCommand::new(&store, "Stale");
        cmd.add_change(IVec3::ZERO, Resolution::Cm1, false, true);
        cmd.execute(&mut store).unwrap();
        assert!(cmd.changes()[0].old_value);

        cmd.undo(&mut store).unwrap();
        assert!(store.get_voxel(IVec3::ZERO, Resolution::Cm1));
    }

    #[test]
    fn test_add_change_to_corrupt_blob_is_dropped() {
        crate::core::logging::init_test();
        let store = VoxelDataStore::new();
        let mut cmd = row(&store, 2);
        cmd.packed = Some(lz4_flex::compress_prepend_size(&[1, 2, 3]));
        cmd.changes.clear();

        cmd.add_change(IVec3::new(20, 0, 0), Resolution::Cm2, false, true);
        assert_eq!(cmd.len(), 2);
        assert!(cmd.is_compressed());
        assert!(matches!(cmd.decompress(), Err(EditError::Compression(_))));
    }
}

//! Store change notifications.
//!
//! The store publishes to a single injected sink. Presentation layers use
//! these to refresh meshes and selections; the core never subscribes itself.

use std::sync::mpsc::Sender;

use crate::core::types::{IVec3, Vec3};
use crate::voxel::resolution::Resolution;

/// Something observable changed in a `VoxelDataStore`
#[derive(Clone, Debug, PartialEq)]
pub enum StoreEvent {
    /// A cell changed occupancy. `position` is the cell's minimum corner.
    VoxelChanged {
        position: IVec3,
        resolution: Resolution,
        old_value: bool,
        new_value: bool,
    },
    ResolutionChanged {
        old: Resolution,
        new: Resolution,
    },
    WorkspaceResized {
        old: Vec3,
        new: Vec3,
    },
}

/// Receiver of store events
pub trait EventSink: Send + Sync {
    fn publish(&self, event: &StoreEvent);
}

impl EventSink for Sender<StoreEvent> {
    fn publish(&self, event: &StoreEvent) {
        // A dropped receiver just means nobody is listening any more
        let _ = self.send(event.clone());
    }
}

//! Multi-resolution sparse voxel storage and placement
//!
//! `VoxelDataStore` owns one sparse grid per resolution plus a coverage
//! index that keeps cross-resolution overlap checks constant-time.

pub mod resolution;
pub mod grid;
pub mod coverage;
pub mod workspace;
pub mod events;
pub mod store;
pub mod placement;
pub mod edit;

pub use resolution::{Resolution, RESOLUTION_COUNT};
pub use grid::VoxelGrid;
pub use coverage::CoverageIndex;
pub use workspace::{Workspace, DEFAULT_WORKSPACE_SIZE, MAX_WORKSPACE_SIZE, MIN_WORKSPACE_SIZE};
pub use events::{EventSink, StoreEvent};
pub use store::{Rejection, StoreId, VoxelDataStore, VoxelPosition};
pub use placement::{FaceDirection, PlacementRequest, PlacementValidator, SurfaceContact};

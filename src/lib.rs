//! Voxedit - multi-resolution sparse voxel store with undoable edits
//!
//! Voxels live on ten nested grids (1cm to 512cm). The store guarantees that
//! no two occupied voxels overlap in space, and every mutation can be wrapped
//! in a command that the history manager can undo and redo.

pub mod core;
pub mod math;
pub mod voxel;

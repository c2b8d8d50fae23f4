//! Coordinate conversions and integer boxes

pub mod coords;
pub mod ibox;

pub use coords::{
    cell_box, cell_origin, increment_to_cell, increment_to_world, world_to_increment, CellCoord,
    MAX_ABS_INCREMENT,
};
pub use ibox::IBox;

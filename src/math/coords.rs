//! Conversions between world meters, 1cm increments and grid cells.
//!
//! Increments are signed integers centred on the world origin. A cell at
//! resolution `r` covers `[cell << shift, (cell + 1) << shift)` on each axis,
//! so converting an increment to a cell is an arithmetic right shift, which
//! floors toward negative infinity.

use bytemuck::{Pod, Zeroable};

use crate::core::types::{IVec3, Vec3};
use crate::math::ibox::IBox;
use crate::voxel::resolution::Resolution;

/// Increments per meter
pub const INCREMENTS_PER_METER: f32 = 100.0;

/// Positions with any component beyond this magnitude are rejected
pub const MAX_ABS_INCREMENT: i32 = 1_000_000;

/// Round a world position (meters) to the nearest 1cm increment.
pub fn world_to_increment(world: Vec3) -> IVec3 {
    (world * INCREMENTS_PER_METER).round().as_ivec3()
}

/// Convert an increment position back to meters.
pub fn increment_to_world(pos: IVec3) -> Vec3 {
    pos.as_vec3() / INCREMENTS_PER_METER
}

/// True when every component is within `MAX_ABS_INCREMENT`.
pub fn is_representable(pos: IVec3) -> bool {
    pos.cmpge(IVec3::splat(-MAX_ABS_INCREMENT)).all() && pos.cmple(IVec3::splat(MAX_ABS_INCREMENT)).all()
}

/// Cell containing an increment position at the given resolution.
pub fn increment_to_cell(pos: IVec3, resolution: Resolution) -> CellCoord {
    CellCoord::from_increment(pos, resolution)
}

/// Minimum corner of a cell, in increments.
pub fn cell_origin(cell: CellCoord, resolution: Resolution) -> IVec3 {
    cell.origin(resolution)
}

/// Half-open box occupied by the cell that contains `pos`.
pub fn cell_box(pos: IVec3, resolution: Resolution) -> IBox {
    increment_to_cell(pos, resolution).bounds(resolution)
}

/// Integer cell index on one resolution grid
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Pod, Zeroable)]
pub struct CellCoord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl CellCoord {
    /// Cell from raw grid indices
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Cell containing an increment position at the given resolution
    pub fn from_increment(pos: IVec3, resolution: Resolution) -> Self {
        let s = resolution.shift();
        Self {
            x: pos.x >> s,
            y: pos.y >> s,
            z: pos.z >> s,
        }
    }

    /// Cell containing a world position at the given resolution
    pub fn from_world(world: Vec3, resolution: Resolution) -> Self {
        Self::from_increment(world_to_increment(world), resolution)
    }

    /// Minimum corner of this cell in increments
    pub fn origin(&self, resolution: Resolution) -> IVec3 {
        let s = resolution.shift();
        IVec3::new(self.x << s, self.y << s, self.z << s)
    }

    /// Half-open increment box covered by this cell
    pub fn bounds(&self, resolution: Resolution) -> IBox {
        let min = self.origin(resolution);
        IBox::new(min, min + IVec3::splat(resolution.size_cm()))
    }

    /// Cell of a coarser (or equal) grid that contains this one.
    ///
    /// `from` must not be coarser than `to`.
    pub fn to_coarser(&self, from: Resolution, to: Resolution) -> Self {
        debug_assert!(from <= to);
        let d = to.shift() - from.shift();
        Self {
            x: self.x >> d,
            y: self.y >> d,
            z: self.z >> d,
        }
    }

    /// Grid indices as a vector
    pub fn as_ivec3(&self) -> IVec3 {
        IVec3::new(self.x, self.y, self.z)
    }
}

impl From<IVec3> for CellCoord {
    fn from(v: IVec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_world_to_increment_rounds() {
        assert_eq!(world_to_increment(Vec3::new(0.014, -0.016, 1.0)), IVec3::new(1, -2, 100));
        assert_eq!(increment_to_world(IVec3::new(250, 0, -50)), Vec3::new(2.5, 0.0, -0.5));
    }

    #[test]
    fn test_negative_cells_floor() {
        let cell = CellCoord::from_increment(IVec3::new(-1, -4, -5), Resolution::Cm4);
        assert_eq!(cell, CellCoord::new(-1, -1, -2));
        assert_eq!(cell.origin(Resolution::Cm4), IVec3::new(-4, -4, -8));
    }

    #[test]
    fn test_cell_box_of_increment() {
        let b = cell_box(IVec3::new(5, 0, -3), Resolution::Cm4);
        assert_eq!(b.min, IVec3::new(4, 0, -4));
        assert_eq!(b.size(), IVec3::splat(4));
        assert_eq!(cell_origin(increment_to_cell(IVec3::new(5, 0, -3), Resolution::Cm4), Resolution::Cm4), b.min);
    }

    #[test]
    fn test_bounds() {
        let cell = CellCoord::new(1, 0, -1);
        let b = cell.bounds(Resolution::Cm8);
        assert_eq!(b.min, IVec3::new(8, 0, -8));
        assert_eq!(b.max, IVec3::new(16, 8, 0));
    }

    #[test]
    fn test_to_coarser() {
        let fine = CellCoord::new(5, -3, 0);
        assert_eq!(fine.to_coarser(Resolution::Cm1, Resolution::Cm4), CellCoord::new(1, -1, 0));
        assert_eq!(fine.to_coarser(Resolution::Cm2, Resolution::Cm2), fine);
    }

    #[test]
    fn test_representable() {
        assert!(is_representable(IVec3::new(MAX_ABS_INCREMENT, 0, -MAX_ABS_INCREMENT)));
        assert!(!is_representable(IVec3::new(0, MAX_ABS_INCREMENT + 1, 0)));
    }

    proptest! {
        #[test]
        fn prop_increment_world_round_trip(
            x in -100_000i32..100_000,
            y in -100_000i32..100_000,
            z in -100_000i32..100_000,
        ) {
            let pos = IVec3::new(x, y, z);
            prop_assert_eq!(world_to_increment(increment_to_world(pos)), pos);
        }

        #[test]
        fn prop_cell_contains_its_increment(
            x in -50_000i32..50_000,
            y in -50_000i32..50_000,
            z in -50_000i32..50_000,
            r in 0usize..10,
        ) {
            let res = Resolution::ALL[r];
            let pos = IVec3::new(x, y, z);
            let cell = CellCoord::from_increment(pos, res);
            prop_assert!(cell.bounds(res).contains_point(pos));
        }

        #[test]
        fn prop_coarser_cell_contains_finer(
            x in -5_000i32..5_000,
            y in -5_000i32..5_000,
            z in -5_000i32..5_000,
            a in 0usize..10,
            b in 0usize..10,
        ) {
            let (fine, coarse) = (Resolution::ALL[a.min(b)], Resolution::ALL[a.max(b)]);
            let cell = CellCoord::new(x, y, z);
            let parent = cell.to_coarser(fine, coarse);
            prop_assert!(parent.bounds(coarse).contains_box(&cell.bounds(fine)));
        }
    }
}

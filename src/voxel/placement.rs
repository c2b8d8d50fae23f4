//! Placement validation pipeline.
//!
//! Turns a raw world-space hit point (from external raycasting) into the
//! exact increment position to write, or a typed `Rejection`. Placement never
//! relocates on failure; the caller re-issues with a corrected hit.

use serde::{Deserialize, Serialize};

use crate::core::types::{IVec3, Vec3};
use crate::math::coords::{is_representable, world_to_increment, CellCoord};
use crate::voxel::resolution::Resolution;
use crate::voxel::store::{Rejection, VoxelDataStore};

/// Face of an existing voxel that a placement is made against
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FaceDirection {
    PosX,
    NegX,
    PosY,
    NegY,
    PosZ,
    NegZ,
}

impl FaceDirection {
    pub const ALL: [FaceDirection; 6] = [
        FaceDirection::PosX,
        FaceDirection::NegX,
        FaceDirection::PosY,
        FaceDirection::NegY,
        FaceDirection::PosZ,
        FaceDirection::NegZ,
    ];

    /// Outward unit normal
    pub fn normal(self) -> IVec3 {
        match self {
            FaceDirection::PosX => IVec3::X,
            FaceDirection::NegX => IVec3::NEG_X,
            FaceDirection::PosY => IVec3::Y,
            FaceDirection::NegY => IVec3::NEG_Y,
            FaceDirection::PosZ => IVec3::Z,
            FaceDirection::NegZ => IVec3::NEG_Z,
        }
    }

    /// Axis index (0 = x, 1 = y, 2 = z)
    pub fn axis(self) -> usize {
        match self {
            FaceDirection::PosX | FaceDirection::NegX => 0,
            FaceDirection::PosY | FaceDirection::NegY => 1,
            FaceDirection::PosZ | FaceDirection::NegZ => 2,
        }
    }

    /// True for faces pointing along a positive axis
    pub fn is_positive(self) -> bool {
        matches!(self, FaceDirection::PosX | FaceDirection::PosY | FaceDirection::PosZ)
    }
}

/// Existing voxel face the hit landed on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SurfaceContact {
    pub position: IVec3,
    pub resolution: Resolution,
    pub face: FaceDirection,
}

/// Everything the validator needs for one placement attempt
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacementRequest {
    /// World-space hit point (meters)
    pub hit_point: Vec3,
    pub resolution: Resolution,
    /// Snap to the 1cm grid instead of the resolution grid
    pub precise: bool,
    /// Adjacent voxel when placing against a face rather than the ground
    pub surface: Option<SurfaceContact>,
}

impl PlacementRequest {
    /// Placement on the ground plane or in open space
    pub fn new(hit_point: Vec3, resolution: Resolution) -> Self {
        Self {
            hit_point,
            resolution,
            precise: false,
            surface: None,
        }
    }

    /// Snap to 1cm instead of the placement grid
    pub fn precise(mut self, precise: bool) -> Self {
        self.precise = precise;
        self
    }

    /// Place flush against an existing voxel face
    pub fn against(mut self, contact: SurfaceContact) -> Self {
        self.surface = Some(contact);
        self
    }
}

/// Stateless placement validator
pub struct PlacementValidator;

impl PlacementValidator {
    /// Snap a free hit point.
    ///
    /// The hit is first rounded to the nearest increment. Precise placement
    /// stops there; otherwise it is floored onto the resolution grid.
    pub fn snap_to_grid(hit: Vec3, resolution: Resolution, precise: bool) -> IVec3 {
        let inc = world_to_increment(hit);
        if precise {
            inc
        } else {
            floor_to_grid(inc, resolution)
        }
    }

    /// Snap a hit that landed on a face of an existing voxel.
    ///
    /// On the face's axis the new voxel sits flush against the face, moved
    /// outward to the next placement cell when the two grids do not line up.
    /// The other two axes follow the hit: aligned with the neighbour when both
    /// sizes match, otherwise snapped to the placement grid (or 1cm if precise).
    pub fn snap_to_surface(
        hit: Vec3,
        resolution: Resolution,
        precise: bool,
        contact: &SurfaceContact,
    ) -> Result<IVec3, Rejection> {
        if !is_representable(contact.position) {
            return Err(Rejection::InvalidPosition);
        }

        let origin = CellCoord::from_increment(contact.position, contact.resolution).origin(contact.resolution);
        let adj_size = contact.resolution.size_cm();
        let place_size = resolution.size_cm();
        let hit_inc = world_to_increment(hit);
        let axis = contact.face.axis();

        let mut out = IVec3::ZERO;
        for t in 0..3 {
            if t == axis {
                continue;
            }
            if hit_inc[t] < origin[t] || hit_inc[t] > origin[t] + adj_size {
                return Err(Rejection::OutOfBounds);
            }
            out[t] = if resolution == contact.resolution && !precise {
                origin[t]
            } else if precise {
                hit_inc[t]
            } else {
                hit_inc[t].div_euclid(place_size) * place_size
            };
        }

        out[axis] = if contact.face.is_positive() {
            let face = origin[axis] + adj_size;
            ceil_div(face, place_size) * place_size
        } else {
            (origin[axis].div_euclid(place_size) - 1) * place_size
        };
        Ok(out)
    }

    /// Run the full pipeline, returning the position to write on success.
    pub fn validate(store: &VoxelDataStore, request: &PlacementRequest) -> Result<IVec3, Rejection> {
        let result = Self::run(store, request);
        if let Err(reason) = &result {
            log::debug!(
                "Placement rejected at {:?} ({}): {}",
                request.hit_point,
                request.resolution,
                reason
            );
        }
        result
    }

    fn run(store: &VoxelDataStore, request: &PlacementRequest) -> Result<IVec3, Rejection> {
        if !request.hit_point.is_finite() {
            return Err(Rejection::InvalidPosition);
        }

        let res = request.resolution;
        let pos = match &request.surface {
            Some(contact) => Self::snap_to_surface(request.hit_point, res, request.precise, contact)?,
            None => Self::snap_to_grid(request.hit_point, res, request.precise),
        };

        store.validate_position(pos, res)?;

        let cell = CellCoord::from_increment(pos, res);
        if store.is_cell_occupied(cell, res) {
            return Err(Rejection::AlreadyExists);
        }
        if store.cell_overlaps_other(cell, res) {
            return Err(Rejection::WouldOverlap);
        }
        Ok(pos)
    }

    /// Check that a voxel exists to be removed.
    pub fn validate_removal_at(store: &VoxelDataStore, position: IVec3, resolution: Resolution) -> Result<(), Rejection> {
        store.validate_removal(position, resolution)
    }
}

fn floor_to_grid(pos: IVec3, resolution: Resolution) -> IVec3 {
    CellCoord::from_increment(pos, resolution).origin(resolution)
}

fn ceil_div(a: i32, b: i32) -> i32 {
    -((-a).div_euclid(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(position: IVec3, resolution: Resolution, face: FaceDirection) -> SurfaceContact {
        SurfaceContact {
            position,
            resolution,
            face,
        }
    }

    #[test]
    fn test_snap_to_grid() {
        let hit = Vec3::new(0.057, 0.0, -0.013);
        assert_eq!(PlacementValidator::snap_to_grid(hit, Resolution::Cm4, true), IVec3::new(6, 0, -1));
        assert_eq!(PlacementValidator::snap_to_grid(hit, Resolution::Cm4, false), IVec3::new(4, 0, -4));
    }

    #[test]
    fn test_face_normals() {
        for face in FaceDirection::ALL {
            let n = face.normal();
            assert_eq!(n.abs().max_element(), 1);
            assert_eq!(n[face.axis()] > 0, face.is_positive());
        }
    }

    #[test]
    fn test_snap_to_surface_same_size() {
        let c = contact(IVec3::new(8, 0, 8), Resolution::Cm8, FaceDirection::PosX);
        let hit = Vec3::new(0.16, 0.03, 0.14);
        let pos = PlacementValidator::snap_to_surface(hit, Resolution::Cm8, false, &c).unwrap();
        assert_eq!(pos, IVec3::new(16, 0, 8));

        let c = contact(IVec3::new(8, 8, 8), Resolution::Cm8, FaceDirection::NegY);
        let hit = Vec3::new(0.10, 0.08, 0.10);
        let pos = PlacementValidator::snap_to_surface(hit, Resolution::Cm8, false, &c).unwrap();
        assert_eq!(pos, IVec3::new(8, 0, 8));
    }

    #[test]
    fn test_snap_to_surface_smaller_voxel() {
        let c = contact(IVec3::new(0, 0, 0), Resolution::Cm16, FaceDirection::PosY);
        let hit = Vec3::new(0.07, 0.16, 0.13);
        let pos = PlacementValidator::snap_to_surface(hit, Resolution::Cm4, false, &c).unwrap();
        assert_eq!(pos, IVec3::new(4, 16, 12));

        let precise = PlacementValidator::snap_to_surface(hit, Resolution::Cm4, true, &c).unwrap();
        assert_eq!(precise, IVec3::new(7, 16, 13));
    }

    #[test]
    fn test_snap_to_surface_larger_voxel_moves_outward() {
        let c = contact(IVec3::new(4, 0, 0), Resolution::Cm4, FaceDirection::PosX);
        let hit = Vec3::new(0.08, 0.01, 0.01);
        let pos = PlacementValidator::snap_to_surface(hit, Resolution::Cm16, false, &c).unwrap();
        assert_eq!(pos, IVec3::new(16, 0, 0));

        let c = contact(IVec3::new(4, 0, 0), Resolution::Cm4, FaceDirection::NegX);
        let pos = PlacementValidator::snap_to_surface(hit, Resolution::Cm16, false, &c).unwrap();
        assert_eq!(pos, IVec3::new(-16, 0, 0));
    }

    #[test]
    fn test_snap_to_surface_hit_outside_face() {
        let c = contact(IVec3::ZERO, Resolution::Cm4, FaceDirection::PosY);
        let hit = Vec3::new(0.5, 0.04, 0.0);
        assert_eq!(
            PlacementValidator::snap_to_surface(hit, Resolution::Cm4, false, &c),
            Err(Rejection::OutOfBounds)
        );
    }

    #[test]
    fn test_pipeline_rejections() {
        let mut store = VoxelDataStore::new();

        let nan = PlacementRequest::new(Vec3::new(f32::NAN, 0.0, 0.0), Resolution::Cm1);
        assert_eq!(PlacementValidator::validate(&store, &nan), Err(Rejection::InvalidPosition));

        let huge = PlacementRequest::new(Vec3::new(1.0e9, 0.0, 0.0), Resolution::Cm1);
        assert_eq!(PlacementValidator::validate(&store, &huge), Err(Rejection::InvalidPosition));

        let below = PlacementRequest::new(Vec3::new(0.0, -0.02, 0.0), Resolution::Cm1);
        assert_eq!(PlacementValidator::validate(&store, &below), Err(Rejection::BelowGroundPlane));

        let far = PlacementRequest::new(Vec3::new(3.0, 0.0, 0.0), Resolution::Cm4);
        assert_eq!(PlacementValidator::validate(&store, &far), Err(Rejection::OutOfBounds));

        let ok = PlacementRequest::new(Vec3::new(0.01, 0.0, 0.01), Resolution::Cm4);
        let pos = PlacementValidator::validate(&store, &ok).unwrap();
        assert_eq!(pos, IVec3::ZERO);
        store.set_voxel(pos, Resolution::Cm4, true);

        assert_eq!(PlacementValidator::validate(&store, &ok), Err(Rejection::AlreadyExists));

        let bigger = PlacementRequest::new(Vec3::new(0.01, 0.0, 0.01), Resolution::Cm8);
        assert_eq!(PlacementValidator::validate(&store, &bigger), Err(Rejection::WouldOverlap));
    }

    #[test]
    fn test_pipeline_against_surface() {
        let mut store = VoxelDataStore::new();
        store.set_voxel(IVec3::ZERO, Resolution::Cm8, true);

        let c = contact(IVec3::ZERO, Resolution::Cm8, FaceDirection::PosY);
        let req = PlacementRequest::new(Vec3::new(0.02, 0.08, 0.02), Resolution::Cm8).against(c);
        assert_eq!(PlacementValidator::validate(&store, &req), Ok(IVec3::new(0, 8, 0)));

        let under = contact(IVec3::ZERO, Resolution::Cm8, FaceDirection::NegY);
        let req = PlacementRequest::new(Vec3::new(0.02, 0.0, 0.02), Resolution::Cm8).against(under);
        assert_eq!(PlacementValidator::validate(&store, &req), Err(Rejection::BelowGroundPlane));
    }

    #[test]
    fn test_validate_removal_at() {
        let mut store = VoxelDataStore::new();
        assert_eq!(
            PlacementValidator::validate_removal_at(&store, IVec3::ZERO, Resolution::Cm2),
            Err(Rejection::NotPresent)
        );
        store.set_voxel(IVec3::ZERO, Resolution::Cm2, true);
        assert!(PlacementValidator::validate_removal_at(&store, IVec3::ZERO, Resolution::Cm2).is_ok());
    }
}

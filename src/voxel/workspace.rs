//! Editable workspace bounds.
//!
//! X and Z extend symmetrically around the origin; Y starts at the ground
//! plane and extends up to the configured height.

use crate::core::types::{IVec3, Vec3};
use crate::math::coords::INCREMENTS_PER_METER;
use crate::math::ibox::IBox;

/// Smallest workspace edge (meters)
pub const MIN_WORKSPACE_SIZE: f32 = 2.0;
/// Largest workspace edge (meters)
pub const MAX_WORKSPACE_SIZE: f32 = 8.0;
/// Edge used when nothing else is configured (meters)
pub const DEFAULT_WORKSPACE_SIZE: f32 = 5.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Workspace {
    size: Vec3,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new(Vec3::splat(DEFAULT_WORKSPACE_SIZE))
    }
}

impl Workspace {
    /// Create a workspace, clamping each axis into the allowed range.
    pub fn new(size: Vec3) -> Self {
        Self {
            size: Self::clamp_size(size),
        }
    }

    /// Clamp each axis into `[MIN_WORKSPACE_SIZE, MAX_WORKSPACE_SIZE]`.
    /// Non-finite components fall back to the default size.
    pub fn clamp_size(size: Vec3) -> Vec3 {
        let fix = |v: f32| {
            if v.is_finite() {
                v.clamp(MIN_WORKSPACE_SIZE, MAX_WORKSPACE_SIZE)
            } else {
                DEFAULT_WORKSPACE_SIZE
            }
        };
        Vec3::new(fix(size.x), fix(size.y), fix(size.z))
    }

    /// Current size in meters, already clamped
    pub fn size(&self) -> Vec3 {
        self.size
    }

    /// Resize, returning the previous size.
    pub fn resize(&mut self, size: Vec3) -> Vec3 {
        std::mem::replace(&mut self.size, Self::clamp_size(size))
    }

    /// Editable volume in increments. The max corner is exclusive, so a voxel
    /// whose far face lies exactly on the boundary still fits.
    pub fn bounds(&self) -> IBox {
        let half_x = (self.size.x * INCREMENTS_PER_METER * 0.5).round() as i32;
        let half_z = (self.size.z * INCREMENTS_PER_METER * 0.5).round() as i32;
        let height = (self.size.y * INCREMENTS_PER_METER).round() as i32;
        IBox::new(IVec3::new(-half_x, 0, -half_z), IVec3::new(half_x, height, half_z))
    }

    /// True if the whole box lies inside the workspace.
    pub fn fits(&self, b: &IBox) -> bool {
        self.bounds().contains_box(b)
    }
}

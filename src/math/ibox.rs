//! Integer axis-aligned box in 1cm increments

use crate::core::types::IVec3;

/// Half-open integer box: `min` is inclusive, `max` is exclusive
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct IBox {
    pub min: IVec3,
    pub max: IVec3,
}

impl IBox {
    /// Create box from min (inclusive) and max (exclusive) corners
    pub fn new(min: IVec3, max: IVec3) -> Self {
        Self { min, max }
    }

    /// Box covering the inclusive corner range `a..=b` in any order.
    ///
    /// The exclusive max saturates at `i32::MAX`.
    pub fn from_inclusive(a: IVec3, b: IVec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b).saturating_add(IVec3::ONE),
        }
    }

    /// Get size (max - min)
    pub fn size(&self) -> IVec3 {
        self.max - self.min
    }

    /// True if the box covers no increments
    pub fn is_empty(&self) -> bool {
        self.max.cmple(self.min).any()
    }

    /// Number of increments covered
    pub fn volume(&self) -> i64 {
        if self.is_empty() {
            return 0;
        }
        let s = self.max.as_i64vec3() - self.min.as_i64vec3();
        s.x * s.y * s.z
    }

    /// Check if an increment lies inside the box
    pub fn contains_point(&self, p: IVec3) -> bool {
        p.cmpge(self.min).all() && p.cmplt(self.max).all()
    }

    /// Check if `other` lies entirely inside this box
    pub fn contains_box(&self, other: &IBox) -> bool {
        other.min.cmpge(self.min).all() && other.max.cmple(self.max).all()
    }

    /// Check if two boxes share at least one increment
    pub fn intersects(&self, other: &IBox) -> bool {
        self.min.cmplt(other.max).all() && other.min.cmplt(self.max).all()
    }

    /// Return merged box containing both
    pub fn merged(&self, other: &IBox) -> IBox {
        IBox {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

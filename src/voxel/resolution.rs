//! The ten fixed voxel sizes.
//!
//! Each size is exactly double the previous one, from 1cm to 512cm. Because
//! every size is a power of two in 1cm increments, every smaller cell nests
//! exactly inside one cell of every larger size.

use serde::{Deserialize, Serialize};

/// Number of supported resolutions
pub const RESOLUTION_COUNT: usize = 10;

/// Voxel edge length
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Resolution {
    #[default]
    Cm1 = 0,
    Cm2 = 1,
    Cm4 = 2,
    Cm8 = 3,
    Cm16 = 4,
    Cm32 = 5,
    Cm64 = 6,
    Cm128 = 7,
    Cm256 = 8,
    Cm512 = 9,
}

impl Resolution {
    /// All resolutions, finest first
    pub const ALL: [Resolution; RESOLUTION_COUNT] = [
        Resolution::Cm1,
        Resolution::Cm2,
        Resolution::Cm4,
        Resolution::Cm8,
        Resolution::Cm16,
        Resolution::Cm32,
        Resolution::Cm64,
        Resolution::Cm128,
        Resolution::Cm256,
        Resolution::Cm512,
    ];

    /// Index into per-resolution tables (0 = 1cm)
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Resolution for a table index
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// log2 of the edge length in increments
    pub const fn shift(self) -> u32 {
        self as u32
    }

    /// Edge length in 1cm increments
    pub const fn size_cm(self) -> i32 {
        1 << self.shift()
    }

    /// Edge length in meters
    pub fn size_meters(self) -> f32 {
        self.size_cm() as f32 * 0.01
    }

    /// Human readable name, e.g. "4cm"
    pub fn name(self) -> &'static str {
        match self {
            Resolution::Cm1 => "1cm",
            Resolution::Cm2 => "2cm",
            Resolution::Cm4 => "4cm",
            Resolution::Cm8 => "8cm",
            Resolution::Cm16 => "16cm",
            Resolution::Cm32 => "32cm",
            Resolution::Cm64 => "64cm",
            Resolution::Cm128 => "128cm",
            Resolution::Cm256 => "256cm",
            Resolution::Cm512 => "512cm",
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

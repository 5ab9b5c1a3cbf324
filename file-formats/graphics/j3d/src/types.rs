//! Small value types shared by several sections

use binrw::BinRead;
use glam::{Vec3, Vec4};

/// Index value meaning "unused" in u16 tables
pub const UNUSED_INDEX: u16 = 0xFFFF;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, BinRead)]
#[br(big)]
pub struct BoundingBox {
    #[br(map = |v: [f32; 3]| Vec3::from_array(v))]
    pub min: Vec3,
    #[br(map = |v: [f32; 3]| Vec3::from_array(v))]
    pub max: Vec3,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self {
            min: Vec3::ZERO,
            max: Vec3::ZERO,
        }
    }
}

impl BoundingBox {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Smallest box containing both boxes
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Smallest box containing every point, or `None` for no points
    pub fn from_points(points: &[Vec3]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        Some(rest.iter().fold(Self::new(*first, *first), |acc, p| Self {
            min: acc.min.min(*p),
            max: acc.max.max(*p),
        }))
    }
}

/// An 8-bit RGBA color as stored in material tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, BinRead)]
#[br(big)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Self = Self::new(0xFF, 0xFF, 0xFF, 0xFF);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Normalised `[0, 1]` components
    pub fn to_vec4(self) -> Vec4 {
        Vec4::new(
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        )
    }
}

/// Convert an optional u16 table entry, mapping the unused sentinel to `None`
pub fn optional_index(value: u16) -> Option<u16> {
    (value != UNUSED_INDEX).then_some(value)
}

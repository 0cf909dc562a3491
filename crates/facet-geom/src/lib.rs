//! Minimal geometry types shared by the meshing crates.
#![forbid(unsafe_code)]

use core::ops::{Add, Mul, Neg, Sub};

/// Edge length of one section, in blocks.
pub const SECTION_EDGE: i32 = 16;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Decodes three IEEE-754 bit patterns, as stored in packed vertex words.
    #[inline]
    pub fn from_bits(x: u32, y: u32, z: u32) -> Self {
        Self::new(f32::from_bits(x), f32::from_bits(y), f32::from_bits(z))
    }

    #[inline]
    pub fn dot(self, rhs: Vec3) -> f32 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    #[inline]
    pub fn cross(self, rhs: Vec3) -> Vec3 {
        Vec3 {
            x: self.y * rhs.z - self.z * rhs.y,
            y: self.z * rhs.x - self.x * rhs.z,
            z: self.x * rhs.y - self.y * rhs.x,
        }
    }

    #[inline]
    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    #[inline]
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    #[inline]
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Neg for Vec3 {
    type Output = Vec3;
    #[inline]
    fn neg(self) -> Vec3 {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;
    #[inline]
    fn mul(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// Integer coordinate of one 16x16x16 world section.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SectionCoord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl SectionCoord {
    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Section containing the given block position.
    #[inline]
    pub fn from_block(bx: i32, by: i32, bz: i32) -> Self {
        Self {
            x: bx.div_euclid(SECTION_EDGE),
            y: by.div_euclid(SECTION_EDGE),
            z: bz.div_euclid(SECTION_EDGE),
        }
    }

    /// Block position of the section's minimum corner.
    #[inline]
    pub fn origin_block(self) -> (i32, i32, i32) {
        (
            self.x * SECTION_EDGE,
            self.y * SECTION_EDGE,
            self.z * SECTION_EDGE,
        )
    }

    /// Block-space centre of the section.
    #[inline]
    pub fn center(self) -> Vec3 {
        let half = (SECTION_EDGE / 2) as f32;
        let (bx, by, bz) = self.origin_block();
        Vec3::new(bx as f32 + half, by as f32 + half, bz as f32 + half)
    }

    #[inline]
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            z: self.z + dz,
        }
    }

    #[inline]
    pub fn distance_sq(self, other: SectionCoord) -> i64 {
        // Squares of full-range differences exceed i64; far apart saturates.
        let dx = i64::from(self.x) - i64::from(other.x);
        let dy = i64::from(self.y) - i64::from(other.y);
        let dz = i64::from(self.z) - i64::from(other.z);
        dx.saturating_mul(dx)
            .saturating_add(dy.saturating_mul(dy))
            .saturating_add(dz.saturating_mul(dz))
    }
}

impl From<(i32, i32, i32)> for SectionCoord {
    fn from(value: (i32, i32, i32)) -> Self {
        Self::new(value.0, value.1, value.2)
    }
}

impl From<[i32; 3]> for SectionCoord {
    fn from(value: [i32; 3]) -> Self {
        Self::new(value[0], value[1], value[2])
    }
}

impl From<SectionCoord> for (i32, i32, i32) {
    fn from(value: SectionCoord) -> Self {
        (value.x, value.y, value.z)
    }
}

use facet_geom::Vec3;

/// Face-normal bucket of a polygon. The discriminant is what gets stored in
/// the polygon's trailing classification word.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum PolygonNormal {
    None = 0,
    PosX = 1,
    NegX = 2,
    PosY = 3,
    NegY = 4,
    PosZ = 5,
    NegZ = 6,
}

/// Canonical bucket order of a finished primary-pass buffer. The two vertical
/// directions bracket the list; draw-range merging relies on this order.
pub const NORMAL_ORDER: [PolygonNormal; PolygonNormal::COUNT] = [
    PolygonNormal::None,
    PolygonNormal::PosY,
    PolygonNormal::PosX,
    PolygonNormal::PosZ,
    PolygonNormal::NegX,
    PolygonNormal::NegZ,
    PolygonNormal::NegY,
];

impl PolygonNormal {
    pub const COUNT: usize = 7;

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Converts a stored classification word back into a bucket.
    /// Unknown values fall back to `None`.
    #[inline]
    pub fn from_index(i: u32) -> PolygonNormal {
        match i {
            1 => PolygonNormal::PosX,
            2 => PolygonNormal::NegX,
            3 => PolygonNormal::PosY,
            4 => PolygonNormal::NegY,
            5 => PolygonNormal::PosZ,
            6 => PolygonNormal::NegZ,
            _ => PolygonNormal::None,
        }
    }

    /// Position of this bucket inside [`NORMAL_ORDER`].
    #[inline]
    pub fn order_slot(self) -> usize {
        match self {
            PolygonNormal::None => 0,
            PolygonNormal::PosY => 1,
            PolygonNormal::PosX => 2,
            PolygonNormal::PosZ => 3,
            PolygonNormal::NegX => 4,
            PolygonNormal::NegZ => 5,
            PolygonNormal::NegY => 6,
        }
    }

    /// Classifies a (not necessarily unit) face normal. Only exact axis
    /// alignment yields a directional bucket.
    pub fn from_vector(n: Vec3) -> PolygonNormal {
        match (n.x == 0.0, n.y == 0.0, n.z == 0.0) {
            (false, true, true) if n.x > 0.0 => PolygonNormal::PosX,
            (false, true, true) if n.x < 0.0 => PolygonNormal::NegX,
            (true, false, true) if n.y > 0.0 => PolygonNormal::PosY,
            (true, false, true) if n.y < 0.0 => PolygonNormal::NegY,
            (true, true, false) if n.z > 0.0 => PolygonNormal::PosZ,
            (true, true, false) if n.z < 0.0 => PolygonNormal::NegZ,
            _ => PolygonNormal::None,
        }
    }

    #[inline]
    pub fn is_axis_aligned(self) -> bool {
        self != PolygonNormal::None
    }
}

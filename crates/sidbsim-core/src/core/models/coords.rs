use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Lattice constants of the H-Si(100)-2x1 surface, in nanometres.
///
/// A dangling bond sits on a dimer row; `a` is the spacing between neighbouring
/// dimer columns, `b` the spacing between dimer rows and `c` the offset of the
/// second atom of a dimer pair within its row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatticeConstants {
    /// Column pitch along x.
    pub a: f64,
    /// Row pitch along y.
    pub b: f64,
    /// Intra-dimer offset along y, applied for the `z = 1` tier.
    pub c: f64,
}

impl LatticeConstants {
    pub const SI_100_2X1: Self = Self {
        a: 0.384,
        b: 0.768,
        c: 0.225,
    };
}

impl Default for LatticeConstants {
    fn default() -> Self {
        Self::SI_100_2X1
    }
}

/// A site position in SiQAD coordinates.
///
/// `x` indexes the dimer column, `y` the dimer row and `z` selects the upper
/// (`0`) or lower (`1`) atom of the dimer pair.
///
/// Coordinates are ordered row-major: first by `y`, then by `z`, then by `x`.
/// Within a BDL pair the smaller coordinate is therefore the "upper" dot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SiqadCoord {
    pub x: i32,
    pub y: i32,
    pub z: u8,
}

impl SiqadCoord {
    pub const fn new(x: i32, y: i32, z: u8) -> Self {
        Self { x, y, z }
    }

    /// Returns the physical position of this site in nanometres.
    pub fn position_nm(&self, lattice: &LatticeConstants) -> Point2<f64> {
        Point2::new(
            self.x as f64 * lattice.a,
            self.y as f64 * lattice.b + self.z as f64 * lattice.c,
        )
    }

    /// Euclidean distance to `other` in nanometres.
    pub fn distance_nm(&self, other: &SiqadCoord, lattice: &LatticeConstants) -> f64 {
        nalgebra::distance(&self.position_nm(lattice), &other.position_nm(lattice))
    }

    pub fn to_offset(&self) -> OffsetCoord {
        OffsetCoord::new(self.x, self.y * 2 + self.z as i32)
    }
}

impl Ord for SiqadCoord {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.y, self.z, self.x).cmp(&(other.y, other.z, other.x))
    }
}

impl PartialOrd for SiqadCoord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SiqadCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// A site position in offset coordinates, where every atom row of the lattice
/// gets its own `y` index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OffsetCoord {
    pub x: i32,
    pub y: i32,
}

impl OffsetCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Common capabilities of the coordinate systems a layout can be built from.
///
/// Every coordinate system converts losslessly into SiQAD coordinates, which
/// are the canonical representation used by the simulation core.
pub trait LatticeCoordinate: Copy {
    fn to_siqad(&self) -> SiqadCoord;

    fn position_nm(&self, lattice: &LatticeConstants) -> Point2<f64> {
        self.to_siqad().position_nm(lattice)
    }
}

impl LatticeCoordinate for SiqadCoord {
    fn to_siqad(&self) -> SiqadCoord {
        *self
    }
}

impl LatticeCoordinate for OffsetCoord {
    fn to_siqad(&self) -> SiqadCoord {
        SiqadCoord::new(self.x, self.y.div_euclid(2), self.y.rem_euclid(2) as u8)
    }
}

impl From<OffsetCoord> for SiqadCoord {
    fn from(coord: OffsetCoord) -> Self {
        coord.to_siqad()
    }
}

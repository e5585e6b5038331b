use super::ids::AtomId;
use std::fmt;
use std::ops::{Add, Neg, Sub};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum BondOrder {
    #[default]
    Single,
    Double,
    Triple,
    Aromatic,
}

impl BondOrder {
    /// The CCDC bond type code used in `_geom_bond` loops.
    pub fn cif_code(&self) -> &'static str {
        match self {
            Self::Single => "S",
            Self::Double => "D",
            Self::Triple => "T",
            Self::Aromatic => "A",
        }
    }
}

#[derive(Debug, Error)]
#[error("Invalid bond order string")]
pub struct ParseBondOrderError;

impl FromStr for BondOrder {
    type Err = ParseBondOrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1" | "s" | "sing" | "single" => Ok(Self::Single),
            "2" | "d" | "doub" | "double" => Ok(Self::Double),
            "3" | "t" | "trip" | "triple" => Ok(Self::Triple),
            "a" | "ar" | "arom" | "aromatic" => Ok(Self::Aromatic),
            _ => Err(ParseBondOrderError),
        }
    }
}

impl fmt::Display for BondOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Single => "Single",
                Self::Double => "Double",
                Self::Triple => "Triple",
                Self::Aromatic => "Aromatic",
            }
        )
    }
}

/// Integer unit-cell translation of a bond's end atom relative to the cell of
/// its begin atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct ImageVector(pub [i32; 3]);

impl ImageVector {
    pub const ZERO: ImageVector = ImageVector([0, 0, 0]);

    pub fn new(a: i32, b: i32, c: i32) -> Self {
        Self([a, b, c])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0, 0, 0]
    }

    pub fn negated(&self) -> Self {
        -*self
    }

    /// The translation expressed as a fractional vector.
    pub fn to_fractional(&self) -> nalgebra::Vector3<f64> {
        nalgebra::Vector3::new(self.0[0] as f64, self.0[1] as f64, self.0[2] as f64)
    }
}

impl Add for ImageVector {
    type Output = ImageVector;
    fn add(self, rhs: ImageVector) -> ImageVector {
        ImageVector([
            self.0[0] + rhs.0[0],
            self.0[1] + rhs.0[1],
            self.0[2] + rhs.0[2],
        ])
    }
}

impl Sub for ImageVector {
    type Output = ImageVector;
    fn sub(self, rhs: ImageVector) -> ImageVector {
        self + (-rhs)
    }
}

impl Neg for ImageVector {
    type Output = ImageVector;
    fn neg(self) -> ImageVector {
        ImageVector([-self.0[0], -self.0[1], -self.0[2]])
    }
}

impl fmt::Display for ImageVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.0[0], self.0[1], self.0[2])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bond {
    pub begin: AtomId,       // Atom whose cell is the reference
    pub end: AtomId,         // Atom translated by `image`
    pub order: BondOrder,    // Bond order, never inferred
    pub image: ImageVector, // Translation of `end` relative to `begin`
}

impl Bond {
    pub fn new(begin: AtomId, end: AtomId, order: BondOrder, image: ImageVector) -> Self {
        Self {
            begin,
            end,
            order,
            image,
        }
    }

    pub fn contains(&self, atom_id: AtomId) -> bool {
        self.begin == atom_id || self.end == atom_id
    }

    /// Returns the atom on the opposite side of `atom_id`, or `None` if the
    /// bond is not incident to it.
    pub fn other(&self, atom_id: AtomId) -> Option<AtomId> {
        if self.begin == atom_id {
            Some(self.end)
        } else if self.end == atom_id {
            Some(self.begin)
        } else {
            None
        }
    }
}

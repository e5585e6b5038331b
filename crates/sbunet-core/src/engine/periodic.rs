//! Orientation of periodic image vectors.
//!
//! A bond stores the cell translation of its `end` atom relative to its
//! `begin` atom. Walking the bond from `end` back to `begin` therefore sees the
//! negated vector. Every rewrite that follows a bond goes through these helpers
//! instead of flipping signs locally.

use crate::core::models::ids::AtomId;
use crate::core::models::structure::Structure;
use crate::core::models::topology::{Bond, ImageVector};
use nalgebra::{Point3, Vector3};

/// Image of the atom across `bond` as seen from `from`.
///
/// Returns `None` if `from` is not an endpoint of the bond.
pub fn oriented_image(bond: &Bond, from: AtomId) -> Option<ImageVector> {
    if from == bond.begin {
        Some(bond.image)
    } else if from == bond.end {
        Some(-bond.image)
    } else {
        None
    }
}

/// Cell offset of the atom across `bond`, given the offset of `from`.
pub fn propagate(offset: ImageVector, bond: &Bond, from: AtomId) -> Option<ImageVector> {
    oriented_image(bond, from).map(|image| offset + image)
}

/// Image of `to` relative to `from` through the bond joining them, if any.
pub fn image_between(structure: &Structure, from: AtomId, to: AtomId) -> Option<ImageVector> {
    let bond = structure.bond(structure.bond_between(from, to)?)?;
    oriented_image(bond, from)
}

/// Cartesian position of an atom translated by `image`. Non-periodic
/// structures ignore the image.
pub fn periodic_position(
    structure: &Structure,
    id: AtomId,
    image: ImageVector,
) -> Option<Point3<f64>> {
    let atom = structure.atom(id)?;
    Some(match structure.lattice() {
        Some(lattice) => atom.position + lattice.translation(&image),
        None => atom.position,
    })
}

/// Cartesian vector from `from` to the bonded image of `to`.
pub fn bond_vector(structure: &Structure, from: AtomId, to: AtomId) -> Option<Vector3<f64>> {
    let image = image_between(structure, from, to)?;
    let origin = structure.atom(from)?.position;
    Some(periodic_position(structure, to, image)? - origin)
}

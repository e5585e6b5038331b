use super::error::EngineError;
use super::periodic::propagate;
use crate::core::chemistry::elements::atomic_mass;
use crate::core::models::ids::AtomId;
use crate::core::models::structure::Structure;
use crate::core::models::topology::ImageVector;
use nalgebra::{Point3, Vector3};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::warn;

/// Centroid of a fragment, wrapped into the unit cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Centroid {
    /// Wrapped Cartesian position.
    pub position: Point3<f64>,
    /// Cell translation removed by wrapping, relative to the cell of the
    /// traversal's start atom. Always zero for non-periodic structures.
    pub shift: ImageVector,
}

/// Assigns each atom of a connected subset the cell offset that makes the
/// subset contiguous, relative to the first atom.
///
/// The traversal is breadth-first from `atoms[0]`, following only bonds that
/// stay inside the subset. An atom keeps the offset of its first discovery.
///
/// # Errors
///
/// Returns [`EngineError::EmptyFragment`] for an empty subset,
/// [`EngineError::MissingAtom`] if an id is not in the structure, and
/// [`EngineError::DisconnectedFragment`] if the subset is not connected.
pub fn unwrap_atoms(
    structure: &Structure,
    atoms: &[AtomId],
) -> Result<HashMap<AtomId, ImageVector>, EngineError> {
    let &start = atoms.first().ok_or(EngineError::EmptyFragment)?;
    if let Some(&missing) = atoms.iter().find(|&&id| structure.atom(id).is_none()) {
        return Err(EngineError::MissingAtom(missing));
    }
    let members: HashSet<AtomId> = atoms.iter().copied().collect();

    let mut offsets = HashMap::with_capacity(atoms.len());
    offsets.insert(start, ImageVector::ZERO);
    let mut queue = VecDeque::from([start]);

    while let Some(current) = queue.pop_front() {
        let offset = offsets[&current];
        for neighbor in structure.neighbors(current).unwrap_or_default() {
            if !members.contains(&neighbor.atom) || offsets.contains_key(&neighbor.atom) {
                continue;
            }
            let Some(next) = structure
                .bond(neighbor.bond)
                .and_then(|bond| propagate(offset, bond, current))
            else {
                continue;
            };
            offsets.insert(neighbor.atom, next);
            queue.push_back(neighbor.atom);
        }
    }

    if offsets.len() != members.len() {
        return Err(EngineError::DisconnectedFragment {
            visited: offsets.len(),
            total: members.len(),
        });
    }
    Ok(offsets)
}

/// Unwraps every atom of a fragment structure. See [`unwrap_atoms`].
pub fn unwrap_fragment(fragment: &Structure) -> Result<HashMap<AtomId, ImageVector>, EngineError> {
    unwrap_atoms(fragment, &fragment.atom_ids())
}

/// Computes the centroid of a connected fragment, optionally weighted by
/// atomic mass.
///
/// Periodic fragments are unwrapped before averaging so that a building unit
/// straddling a cell boundary is averaged as one piece; the result is then
/// wrapped back into the cell. Non-periodic fragments are averaged directly.
///
/// # Errors
///
/// Returns [`EngineError::EmptyFragment`] for a fragment without atoms and
/// [`EngineError::DisconnectedFragment`] if a periodic fragment is not a
/// single connected component.
pub fn try_centroid(fragment: &Structure, weighted: bool) -> Result<Centroid, EngineError> {
    let atoms = fragment.atom_ids();
    if atoms.is_empty() {
        return Err(EngineError::EmptyFragment);
    }
    let offsets = if fragment.is_periodic() {
        unwrap_atoms(fragment, &atoms)?
    } else {
        HashMap::new()
    };
    Ok(centroid_of(fragment, &atoms, &offsets, weighted))
}

/// Like [`try_centroid`], but logs a warning and falls back to the origin
/// when the centroid is undefined.
pub fn centroid(fragment: &Structure, weighted: bool) -> Point3<f64> {
    match try_centroid(fragment, weighted) {
        Ok(centroid) => centroid.position,
        Err(e) => {
            warn!(error = %e, "Centroid is undefined for this fragment; using the origin");
            Point3::origin()
        }
    }
}

/// Averages the positions of `atoms`, each translated by its offset (missing
/// offsets count as zero), and wraps the result when the structure is
/// periodic.
pub(crate) fn centroid_of(
    structure: &Structure,
    atoms: &[AtomId],
    offsets: &HashMap<AtomId, ImageVector>,
    weighted: bool,
) -> Centroid {
    let lattice = structure.lattice();
    let mut sum = Vector3::zeros();
    let mut total_weight = 0.0;

    for &id in atoms {
        let Some(atom) = structure.atom(id) else {
            continue;
        };
        let weight = if weighted {
            atomic_mass(atom.atomic_number)
        } else {
            1.0
        };
        let mut position = atom.position.coords;
        if let (Some(lattice), Some(offset)) = (lattice, offsets.get(&id)) {
            position += lattice.translation(offset);
        }
        sum += weight * position;
        total_weight += weight;
    }

    if total_weight <= 0.0 {
        return Centroid {
            position: Point3::origin(),
            shift: ImageVector::ZERO,
        };
    }

    let unwrapped = Point3::from(sum / total_weight);
    match lattice {
        Some(lattice) => {
            let (position, shift) = lattice.wrap_with_shift(&unwrapped);
            Centroid { position, shift }
        }
        None => Centroid {
            position: unwrapped,
            shift: ImageVector::ZERO,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::lattice::Lattice;
    use crate::core::models::topology::BondOrder;

    const EPS: f64 = 1.0e-9;

    fn cubic_structure(edge: f64) -> Structure {
        Structure::with_lattice(
            Lattice::from_parameters(edge, edge, edge, 90.0, 90.0, 90.0).unwrap(),
        )
    }

    mod unwrapping {
        use super::*;

        #[test]
        fn offsets_follow_bond_images_in_both_directions() {
            let mut structure = cubic_structure(10.0);
            let a = structure.add_atom(Atom::new(6, Point3::new(0.5, 5.0, 5.0)));
            let b = structure.add_atom(Atom::new(6, Point3::new(9.5, 5.0, 5.0)));
            let c = structure.add_atom(Atom::new(6, Point3::new(9.5, 6.4, 5.0)));
            structure.add_bond(a, b, BondOrder::Single, ImageVector::new(-1, 0, 0));
            // Stored from c to b, so the walk b -> c reverses it.
            structure.add_bond(c, b, BondOrder::Single, ImageVector::ZERO);

            let offsets = unwrap_fragment(&structure).unwrap();
            assert_eq!(offsets[&a], ImageVector::ZERO);
            assert_eq!(offsets[&b], ImageVector::new(-1, 0, 0));
            assert_eq!(offsets[&c], ImageVector::new(-1, 0, 0));
        }

        #[test]
        fn subset_traversal_ignores_bonds_leaving_the_subset() {
            let mut structure = cubic_structure(10.0);
            let a = structure.add_atom(Atom::new(6, Point3::new(1.0, 1.0, 1.0)));
            let b = structure.add_atom(Atom::new(6, Point3::new(2.4, 1.0, 1.0)));
            let outside = structure.add_atom(Atom::new(30, Point3::new(9.0, 1.0, 1.0)));
            structure.add_bond(a, b, BondOrder::Single, ImageVector::ZERO);
            structure.add_bond(a, outside, BondOrder::Single, ImageVector::new(-1, 0, 0));

            let offsets = unwrap_atoms(&structure, &[a, b]).unwrap();
            assert_eq!(offsets.len(), 2);
            assert!(!offsets.contains_key(&outside));
        }

        #[test]
        fn disconnected_subsets_are_reported() {
            let mut structure = cubic_structure(10.0);
            let a = structure.add_atom(Atom::new(6, Point3::new(1.0, 1.0, 1.0)));
            let b = structure.add_atom(Atom::new(6, Point3::new(5.0, 5.0, 5.0)));

            assert!(matches!(
                unwrap_atoms(&structure, &[a, b]),
                Err(EngineError::DisconnectedFragment {
                    visited: 1,
                    total: 2
                })
            ));
        }

        #[test]
        fn empty_subsets_are_rejected() {
            let structure = cubic_structure(10.0);
            assert!(matches!(
                unwrap_atoms(&structure, &[]),
                Err(EngineError::EmptyFragment)
            ));
        }
    }

    mod averaging {
        use super::*;

        #[test]
        fn single_atom_centroid_is_its_position_regardless_of_weighting() {
            let mut structure = cubic_structure(10.0);
            structure.add_atom(Atom::new(30, Point3::new(2.0, 3.0, 4.0)));

            for weighted in [false, true] {
                let result = try_centroid(&structure, weighted).unwrap();
                assert!((result.position - Point3::new(2.0, 3.0, 4.0)).norm() < EPS);
                assert!(result.shift.is_zero());
            }
        }

        #[test]
        fn non_periodic_centroid_is_the_plain_average() {
            let mut structure = Structure::new();
            structure.add_atom(Atom::new(6, Point3::new(0.0, 0.0, 0.0)));
            structure.add_atom(Atom::new(6, Point3::new(4.0, 2.0, 0.0)));

            let position = centroid(&structure, false);
            assert!((position - Point3::new(2.0, 1.0, 0.0)).norm() < EPS);
        }

        #[test]
        fn mass_weighting_pulls_toward_heavy_atoms() {
            let mut structure = Structure::new();
            let h = structure.add_atom(Atom::new(1, Point3::new(0.0, 0.0, 0.0)));
            let zn = structure.add_atom(Atom::new(30, Point3::new(2.0, 0.0, 0.0)));
            structure.add_bond(h, zn, BondOrder::Single, ImageVector::ZERO);

            let plain = centroid(&structure, false);
            let weighted = centroid(&structure, true);
            assert!((plain.x - 1.0).abs() < EPS);
            assert!(weighted.x > 1.9);
        }

        #[test]
        fn fragment_straddling_the_boundary_is_averaged_as_one_piece() {
            let mut structure = cubic_structure(10.0);
            let a = structure.add_atom(Atom::new(6, Point3::new(0.5, 5.0, 5.0)));
            let b = structure.add_atom(Atom::new(6, Point3::new(9.5, 5.0, 5.0)));
            structure.add_bond(a, b, BondOrder::Single, ImageVector::new(-1, 0, 0));

            let result = try_centroid(&structure, false).unwrap();
            // Unwrapped average is at x = 0.0, which wraps to itself.
            assert!((result.position - Point3::new(0.0, 5.0, 5.0)).norm() < EPS);
            assert!(result.shift.is_zero());
        }

        #[test]
        fn wrapped_centroid_reports_its_shift() {
            let mut structure = cubic_structure(10.0);
            let a = structure.add_atom(Atom::new(6, Point3::new(0.2, 5.0, 5.0)));
            let b = structure.add_atom(Atom::new(6, Point3::new(9.0, 5.0, 5.0)));
            structure.add_bond(a, b, BondOrder::Single, ImageVector::new(-1, 0, 0));

            let result = try_centroid(&structure, false).unwrap();
            // Unwrapped average is at x = -0.4.
            assert!((result.position - Point3::new(9.6, 5.0, 5.0)).norm() < 1.0e-9);
            assert_eq!(result.shift, ImageVector::new(-1, 0, 0));
        }

        #[test]
        fn ring_wrapping_the_cell_differs_from_the_naive_average() {
            let mut structure = cubic_structure(10.0);
            let a = structure.add_atom(Atom::new(6, Point3::new(1.0, 5.0, 5.0)));
            let b = structure.add_atom(Atom::new(6, Point3::new(4.0, 5.0, 5.0)));
            let c = structure.add_atom(Atom::new(6, Point3::new(7.0, 5.0, 5.0)));
            structure.add_bond(a, b, BondOrder::Single, ImageVector::ZERO);
            structure.add_bond(b, c, BondOrder::Single, ImageVector::ZERO);
            structure.add_bond(c, a, BondOrder::Single, ImageVector::new(1, 0, 0));

            let offsets = unwrap_fragment(&structure).unwrap();
            assert_eq!(offsets[&c], ImageVector::new(-1, 0, 0));

            let atoms = structure.atom_ids();
            let naive = centroid_of(&structure, &atoms, &HashMap::new(), false);
            let unwrapped = centroid_of(&structure, &atoms, &offsets, false);

            // One lattice vector spread over three atoms, before wrapping.
            let unwrapped_x = unwrapped.position.x + 10.0 * unwrapped.shift.0[0] as f64;
            assert!((naive.position.x - 4.0).abs() < EPS);
            assert!((naive.position.x - unwrapped_x - 10.0 / 3.0).abs() < 1.0e-9);
        }

        #[test]
        fn disconnected_periodic_fragment_falls_back_to_the_origin() {
            let mut structure = cubic_structure(10.0);
            structure.add_atom(Atom::new(6, Point3::new(1.0, 1.0, 1.0)));
            structure.add_atom(Atom::new(6, Point3::new(5.0, 5.0, 5.0)));

            assert!(matches!(
                try_centroid(&structure, false),
                Err(EngineError::DisconnectedFragment { .. })
            ));
            assert_eq!(centroid(&structure, false), Point3::origin());
        }

        #[test]
        fn empty_fragment_has_no_centroid() {
            assert!(matches!(
                try_centroid(&Structure::new(), true),
                Err(EngineError::EmptyFragment)
            ));
        }
    }
}

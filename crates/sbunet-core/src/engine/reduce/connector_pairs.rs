use crate::core::models::atom::Atom;
use crate::core::models::ids::AtomId;
use crate::core::models::structure::Structure;
use crate::core::models::topology::{BondOrder, ImageVector};
use crate::engine::periodic::image_between;
use std::collections::{HashSet, VecDeque};
use tracing::debug;

/// Merges pairs of bonded connector atoms of species `element` into one
/// connector at their periodic midpoint.
///
/// The merged atom is bonded to the union of both atoms' other neighbours;
/// a neighbour shared by both keeps a single bond, through the first atom's
/// image. Merged atoms are queued again so that chains of connectors reduce
/// completely.
///
/// # Return
///
/// The number of merges performed.
pub fn merge_connector_pairs(net: &mut Structure, element: u8) -> usize {
    net.modify(|net| {
        let mut queue: VecDeque<AtomId> = net
            .atoms_iter()
            .filter(|(_, atom)| atom.atomic_number == element)
            .map(|(id, _)| id)
            .collect();
        let mut merges = 0;

        while let Some(first) = queue.pop_front() {
            let view: &Structure = net;
            if !is_connector(view, first, element) {
                continue;
            }
            let Some(second) = view
                .neighbor_ids(first)
                .into_iter()
                .find(|&n| is_connector(view, n, element))
            else {
                continue;
            };
            let Some(merged) = merge_pair(net, first, second, element) else {
                continue;
            };
            merges += 1;
            queue.push_back(merged);
        }

        if merges > 0 {
            debug!(merges, "Merged bonded connector pairs");
        }
        merges
    })
}

fn is_connector(net: &Structure, id: AtomId, element: u8) -> bool {
    net.atom(id).is_some_and(|atom| atom.atomic_number == element)
}

fn merge_pair(net: &mut Structure, first: AtomId, second: AtomId, element: u8) -> Option<AtomId> {
    let to_second = image_between(net, first, second)?;
    let first_position = net.atom(first)?.position;
    let second_position = net.atom(second)?.position;

    // Everything below is expressed relative to the cell of `first`.
    let (midpoint, shift) = match net.lattice() {
        Some(lattice) => {
            let unwrapped = first_position
                + (second_position.coords + lattice.translation(&to_second)
                    - first_position.coords)
                    / 2.0;
            lattice.wrap_with_shift(&unwrapped)
        }
        None => (
            nalgebra::center(&first_position, &second_position),
            ImageVector::ZERO,
        ),
    };

    let mut rewired: Vec<(AtomId, ImageVector)> = Vec::new();
    let mut seen: HashSet<AtomId> = HashSet::from([first, second]);
    for neighbor in net.neighbor_ids(first) {
        if seen.insert(neighbor) {
            rewired.push((neighbor, image_between(net, first, neighbor)?));
        }
    }
    for neighbor in net.neighbor_ids(second) {
        if seen.insert(neighbor) {
            rewired.push((neighbor, to_second + image_between(net, second, neighbor)?));
        }
    }

    let merged = net.add_atom(Atom::pseudo(element, midpoint));
    for (neighbor, image) in rewired {
        net.add_bond(merged, neighbor, BondOrder::Single, image - shift);
    }
    net.remove_atom(first);
    net.remove_atom(second);
    Some(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::lattice::Lattice;
    use crate::engine::periodic::bond_vector;
    use nalgebra::{Point3, Vector3};

    const X: u8 = 52;
    const EPS: f64 = 1.0e-9;

    fn cubic_net() -> Structure {
        Structure::with_lattice(
            Lattice::from_parameters(10.0, 10.0, 10.0, 90.0, 90.0, 90.0).unwrap(),
        )
    }

    fn connectors(net: &Structure) -> Vec<AtomId> {
        net.atoms_iter()
            .filter(|(_, a)| a.atomic_number == X)
            .map(|(id, _)| id)
            .collect()
    }

    #[test]
    fn merged_atom_takes_the_union_of_neighbours() {
        let mut net = cubic_net();
        let a = net.add_atom(Atom::pseudo(X, Point3::new(4.0, 5.0, 5.0)));
        let b = net.add_atom(Atom::pseudo(X, Point3::new(6.0, 5.0, 5.0)));
        let p = net.add_atom(Atom::pseudo(40, Point3::new(3.0, 3.0, 5.0)));
        let q = net.add_atom(Atom::pseudo(8, Point3::new(5.0, 7.0, 5.0)));
        let r = net.add_atom(Atom::pseudo(30, Point3::new(7.0, 3.0, 5.0)));
        net.add_bond(a, b, BondOrder::Single, ImageVector::ZERO);
        net.add_bond(a, p, BondOrder::Single, ImageVector::ZERO);
        net.add_bond(a, q, BondOrder::Single, ImageVector::ZERO);
        net.add_bond(b, q, BondOrder::Single, ImageVector::ZERO);
        net.add_bond(b, r, BondOrder::Single, ImageVector::ZERO);

        assert_eq!(merge_connector_pairs(&mut net, X), 1);

        let merged = connectors(&net);
        assert_eq!(merged.len(), 1);
        let mut neighbors = net.neighbor_ids(merged[0]);
        neighbors.sort();
        let mut expected = vec![p, q, r];
        expected.sort();
        assert_eq!(neighbors, expected);
        assert_eq!(net.degree(q), 1);
        assert!(
            (net.atom(merged[0]).unwrap().position - Point3::new(5.0, 5.0, 5.0)).norm() < EPS
        );
    }

    #[test]
    fn midpoint_is_taken_across_the_cell_boundary() {
        let mut net = cubic_net();
        let a = net.add_atom(Atom::pseudo(X, Point3::new(9.0, 5.0, 5.0)));
        let b = net.add_atom(Atom::pseudo(X, Point3::new(0.6, 5.0, 5.0)));
        let p = net.add_atom(Atom::pseudo(40, Point3::new(7.0, 5.0, 5.0)));
        let r = net.add_atom(Atom::pseudo(30, Point3::new(2.0, 5.0, 5.0)));
        // Stored from b, so a sees b through +x.
        net.add_bond(b, a, BondOrder::Single, ImageVector::new(-1, 0, 0));
        net.add_bond(a, p, BondOrder::Single, ImageVector::ZERO);
        net.add_bond(b, r, BondOrder::Single, ImageVector::ZERO);

        merge_connector_pairs(&mut net, X);

        let merged = connectors(&net)[0];
        // Unwrapped midpoint of 9.0 and 10.6 is 9.8.
        assert!((net.atom(merged).unwrap().position.x - 9.8).abs() < EPS);
        let to_p = bond_vector(&net, merged, p).unwrap();
        let to_r = bond_vector(&net, merged, r).unwrap();
        assert!((to_p - Vector3::new(-2.8, 0.0, 0.0)).norm() < EPS);
        assert!((to_r - Vector3::new(2.2, 0.0, 0.0)).norm() < EPS);
    }

    #[test]
    fn wrapped_midpoint_shifts_the_neighbour_images() {
        let mut net = cubic_net();
        let a = net.add_atom(Atom::pseudo(X, Point3::new(9.6, 5.0, 5.0)));
        let b = net.add_atom(Atom::pseudo(X, Point3::new(0.8, 5.0, 5.0)));
        let p = net.add_atom(Atom::pseudo(40, Point3::new(8.0, 5.0, 5.0)));
        net.add_bond(a, b, BondOrder::Single, ImageVector::new(1, 0, 0));
        net.add_bond(a, p, BondOrder::Single, ImageVector::ZERO);

        merge_connector_pairs(&mut net, X);

        let merged = connectors(&net)[0];
        assert!((net.atom(merged).unwrap().position.x - 0.2).abs() < 1.0e-9);
        assert_eq!(
            image_between(&net, merged, p),
            Some(ImageVector::new(-1, 0, 0))
        );
    }

    #[test]
    fn chains_of_connectors_reduce_to_one() {
        let mut net = Structure::new();
        let x1 = net.add_atom(Atom::pseudo(X, Point3::new(0.0, 0.0, 0.0)));
        let x2 = net.add_atom(Atom::pseudo(X, Point3::new(1.0, 0.0, 0.0)));
        let x3 = net.add_atom(Atom::pseudo(X, Point3::new(2.0, 0.0, 0.0)));
        let end = net.add_atom(Atom::pseudo(40, Point3::new(3.0, 0.0, 0.0)));
        net.add_bond(x1, x2, BondOrder::Single, ImageVector::ZERO);
        net.add_bond(x2, x3, BondOrder::Single, ImageVector::ZERO);
        net.add_bond(x3, end, BondOrder::Single, ImageVector::ZERO);

        assert_eq!(merge_connector_pairs(&mut net, X), 2);
        let remaining = connectors(&net);
        assert_eq!(remaining.len(), 1);
        assert_eq!(net.neighbor_ids(remaining[0]), vec![end]);
    }

    #[test]
    fn isolated_connectors_are_left_alone() {
        let mut net = Structure::new();
        let x = net.add_atom(Atom::pseudo(X, Point3::origin()));
        let m = net.add_atom(Atom::pseudo(40, Point3::new(1.0, 0.0, 0.0)));
        net.add_bond(x, m, BondOrder::Single, ImageVector::ZERO);

        assert_eq!(merge_connector_pairs(&mut net, X), 0);
        assert_eq!(net.atom_count(), 2);
    }
}

use crate::core::models::ids::AtomId;
use crate::core::models::structure::Structure;
use crate::core::models::topology::BondOrder;
use crate::engine::periodic::image_between;
use tracing::debug;

/// Replaces every two-connected atom not of species `keep_element` by a
/// direct bond between its two neighbours.
///
/// Degrees are read from the live graph: bonds created earlier in the pass
/// count, and candidates are only deleted once the pass is over. Of two
/// adjacent pass-through atoms, only the first is therefore removed per pass.
/// A one-connected atom that gains the bridging bond becomes two-connected
/// and is removed in the same pass, once its turn comes.
///
/// # Return
///
/// The number of atoms removed.
pub fn collapse_two_connected(net: &mut Structure, keep_element: u8) -> usize {
    net.modify(|net| {
        let mut doomed: Vec<AtomId> = Vec::new();

        for id in net.atom_ids() {
            let keep = net
                .atom(id)
                .is_none_or(|atom| atom.atomic_number == keep_element);
            if keep || net.degree(id) != 2 {
                continue;
            }
            let neighbors = net.neighbor_ids(id);
            let (first, second) = (neighbors[0], neighbors[1]);
            let (Some(to_first), Some(to_second)) =
                (image_between(net, id, first), image_between(net, id, second))
            else {
                continue;
            };

            net.add_bond(first, second, BondOrder::Single, to_second - to_first);
            doomed.push(id);
        }

        for &id in &doomed {
            net.remove_atom(id);
        }
        if !doomed.is_empty() {
            debug!(removed = doomed.len(), "Removed two-connected atoms");
        }
        doomed.len()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::lattice::Lattice;
    use crate::core::models::topology::ImageVector;
    use crate::engine::periodic::bond_vector;
    use nalgebra::{Point3, Vector3};

    fn cubic_net() -> Structure {
        Structure::with_lattice(
            Lattice::from_parameters(10.0, 10.0, 10.0, 90.0, 90.0, 90.0).unwrap(),
        )
    }

    #[test]
    fn pass_through_atom_becomes_an_edge() {
        let mut net = cubic_net();
        let a = net.add_atom(Atom::pseudo(52, Point3::new(1.0, 5.0, 5.0)));
        let l = net.add_atom(Atom::pseudo(8, Point3::new(5.0, 5.0, 5.0)));
        let b = net.add_atom(Atom::pseudo(52, Point3::new(9.0, 5.0, 5.0)));
        net.add_bond(a, l, BondOrder::Single, ImageVector::ZERO);
        net.add_bond(l, b, BondOrder::Single, ImageVector::ZERO);

        assert_eq!(collapse_two_connected(&mut net, 52), 1);
        assert_eq!(net.atom_count(), 2);
        assert!(net.bond_between(a, b).is_some());
    }

    #[test]
    fn new_edge_carries_the_combined_image() {
        let mut net = cubic_net();
        let n0 = net.add_atom(Atom::pseudo(52, Point3::new(8.0, 5.0, 5.0)));
        let mid = net.add_atom(Atom::pseudo(8, Point3::new(0.5, 5.0, 5.0)));
        let n1 = net.add_atom(Atom::pseudo(52, Point3::new(3.0, 5.0, 5.0)));
        // n0 is reached from mid through the -x image; n1 is stored toward mid.
        net.add_bond(mid, n0, BondOrder::Single, ImageVector::new(-1, 0, 0));
        net.add_bond(n1, mid, BondOrder::Single, ImageVector::ZERO);

        collapse_two_connected(&mut net, 52);

        let edge = bond_vector(&net, n0, n1).unwrap();
        assert!((edge - Vector3::new(5.0, 0.0, 0.0)).norm() < 1.0e-9);
    }

    #[test]
    fn end_atoms_gaining_the_bridge_are_removed_in_the_same_pass() {
        let mut net = cubic_net();
        let a = net.add_atom(Atom::pseudo(40, Point3::new(1.0, 5.0, 5.0)));
        let l = net.add_atom(Atom::pseudo(8, Point3::new(5.0, 5.0, 5.0)));
        let b = net.add_atom(Atom::pseudo(40, Point3::new(9.0, 5.0, 5.0)));
        net.add_bond(a, l, BondOrder::Single, ImageVector::ZERO);
        net.add_bond(l, b, BondOrder::Single, ImageVector::ZERO);

        // a is visited while still one-connected; b has gained the a-b bond
        // by the time it is visited.
        assert_eq!(collapse_two_connected(&mut net, 52), 2);
        assert!(net.atom(l).is_none());
        assert!(net.atom(b).is_none());
        assert_eq!(net.atom_count(), 1);
        assert_eq!(net.degree(a), 0);
    }

    #[test]
    fn keep_species_and_other_degrees_survive() {
        let mut net = cubic_net();
        let hub = net.add_atom(Atom::pseudo(40, Point3::new(5.0, 5.0, 5.0)));
        let x = net.add_atom(Atom::pseudo(52, Point3::new(6.0, 5.0, 5.0)));
        let tip = net.add_atom(Atom::pseudo(8, Point3::new(7.0, 5.0, 5.0)));
        let spoke = net.add_atom(Atom::pseudo(30, Point3::new(5.0, 7.0, 5.0)));
        let other = net.add_atom(Atom::pseudo(30, Point3::new(5.0, 3.0, 5.0)));
        net.add_bond(hub, x, BondOrder::Single, ImageVector::ZERO);
        net.add_bond(x, tip, BondOrder::Single, ImageVector::ZERO);
        net.add_bond(hub, spoke, BondOrder::Single, ImageVector::ZERO);
        net.add_bond(hub, other, BondOrder::Single, ImageVector::ZERO);

        assert_eq!(collapse_two_connected(&mut net, 52), 0);
        assert_eq!(net.atom_count(), 5);
    }

    #[test]
    fn adjacent_pass_through_atoms_take_one_pass_each() {
        let mut net = cubic_net();
        let a = net.add_atom(Atom::pseudo(40, Point3::new(1.0, 5.0, 5.0)));
        let p = net.add_atom(Atom::pseudo(8, Point3::new(3.0, 5.0, 5.0)));
        let q = net.add_atom(Atom::pseudo(8, Point3::new(5.0, 5.0, 5.0)));
        let b = net.add_atom(Atom::pseudo(40, Point3::new(7.0, 5.0, 5.0)));
        // A kept connector and a periodic edge keep a and b three-connected.
        let c = net.add_atom(Atom::pseudo(52, Point3::new(4.0, 8.0, 5.0)));
        for (u, v) in [(a, p), (p, q), (q, b), (a, c), (b, c)] {
            net.add_bond(u, v, BondOrder::Single, ImageVector::ZERO);
        }
        net.add_bond(a, b, BondOrder::Single, ImageVector::new(-1, 0, 0));

        assert_eq!(collapse_two_connected(&mut net, 52), 1);
        assert!(net.atom(p).is_none());
        assert!(net.atom(q).is_some());
        assert_eq!(collapse_two_connected(&mut net, 52), 1);
        assert!(net.atom(q).is_none());
    }

    #[test]
    fn fixed_point_is_idempotent() {
        let mut net = cubic_net();
        let a = net.add_atom(Atom::pseudo(40, Point3::new(1.0, 5.0, 5.0)));
        let b = net.add_atom(Atom::pseudo(40, Point3::new(5.0, 5.0, 5.0)));
        let l1 = net.add_atom(Atom::pseudo(8, Point3::new(3.0, 5.0, 5.0)));
        let l2 = net.add_atom(Atom::pseudo(8, Point3::new(7.5, 5.0, 5.0)));
        net.add_bond(a, l1, BondOrder::Single, ImageVector::ZERO);
        net.add_bond(l1, b, BondOrder::Single, ImageVector::ZERO);
        net.add_bond(b, l2, BondOrder::Single, ImageVector::ZERO);
        net.add_bond(l2, a, BondOrder::Single, ImageVector::new(1, 0, 0));

        while collapse_two_connected(&mut net, 52) > 0 {}
        let atoms = net.atom_count();
        let bonds = net.bond_count();

        assert_eq!(collapse_two_connected(&mut net, 52), 0);
        assert_eq!(net.atom_count(), atoms);
        assert_eq!(net.bond_count(), bonds);
    }
}

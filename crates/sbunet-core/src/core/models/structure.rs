use super::atom::Atom;
use super::ids::{AtomId, BondId};
use super::lattice::Lattice;
use super::site_index::SiteIndex;
use super::topology::{Bond, BondOrder, ImageVector};
use slotmap::{SecondaryMap, SlotMap};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, warn};

/// One entry of an atom's adjacency list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Neighbor {
    pub atom: AtomId,
    pub bond: BondId,
}

/// Outcome of [`Structure::add_bond`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BondInsertion {
    /// A new bond was created.
    Created(BondId),
    /// The atoms were already bonded; nothing changed.
    Existing(BondId),
}

impl BondInsertion {
    pub fn id(&self) -> BondId {
        match self {
            Self::Created(id) | Self::Existing(id) => *id,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// A periodic atomic graph.
///
/// Atoms and bonds live in slot maps so that identifiers stay valid while the
/// graph is rewritten. Every bond is mirrored in the adjacency list of both of
/// its atoms. A structure may hold several disconnected fragments.
///
/// Derived data (the correspondence [`SiteIndex`]) is refreshed when the
/// outermost modification transaction closes. Edits made outside a
/// transaction refresh it immediately.
#[derive(Debug, Clone, Default)]
pub struct Structure {
    title: String,
    atoms: SlotMap<AtomId, Atom>,
    bonds: SlotMap<BondId, Bond>,
    adjacency: SecondaryMap<AtomId, Vec<Neighbor>>,
    lattice: Option<Lattice>,
    modify_depth: usize,
    site_index: SiteIndex,
    index_stale: bool,
}

impl Structure {
    /// Creates a new, empty, non-periodic structure.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new, empty structure with the given unit cell.
    pub fn with_lattice(lattice: Lattice) -> Self {
        Self {
            lattice: Some(lattice),
            ..Self::default()
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn lattice(&self) -> Option<&Lattice> {
        self.lattice.as_ref()
    }

    pub fn set_lattice(&mut self, lattice: Option<Lattice>) {
        self.lattice = lattice;
    }

    pub fn is_periodic(&self) -> bool {
        self.lattice.is_some()
    }

    /// Retrieves an immutable reference to an atom by its ID.
    ///
    /// # Arguments
    ///
    /// * `id` - The atom ID to look up.
    ///
    /// # Return
    ///
    /// Returns `Some(&Atom)` if the atom exists, otherwise `None`.
    pub fn atom(&self, id: AtomId) -> Option<&Atom> {
        self.atoms.get(id)
    }

    /// Retrieves a mutable reference to an atom by its ID.
    ///
    /// The correspondence index is marked stale, since the caller may move the
    /// atom or change its species. Lookups fall back to a linear scan until
    /// the next refresh.
    pub fn atom_mut(&mut self, id: AtomId) -> Option<&mut Atom> {
        let atom = self.atoms.get_mut(id)?;
        self.index_stale = true;
        Some(atom)
    }

    /// Returns an iterator over all atoms in insertion order.
    pub fn atoms_iter(&self) -> impl Iterator<Item = (AtomId, &Atom)> {
        self.atoms.iter()
    }

    /// Returns a mutable iterator over all atoms. Marks the correspondence
    /// index stale.
    pub fn atoms_iter_mut(&mut self) -> impl Iterator<Item = (AtomId, &mut Atom)> {
        self.index_stale = true;
        self.atoms.iter_mut()
    }

    pub fn atom_ids(&self) -> Vec<AtomId> {
        self.atoms.keys().collect()
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn bond(&self, id: BondId) -> Option<&Bond> {
        self.bonds.get(id)
    }

    pub fn bonds_iter(&self) -> impl Iterator<Item = (BondId, &Bond)> {
        self.bonds.iter()
    }

    pub fn bond_count(&self) -> usize {
        self.bonds.len()
    }

    /// Finds the bond joining two atoms, in either orientation.
    pub fn bond_between(&self, a: AtomId, b: AtomId) -> Option<BondId> {
        self.adjacency
            .get(a)?
            .iter()
            .find(|n| n.atom == b)
            .map(|n| n.bond)
    }

    /// Retrieves the adjacency list of an atom.
    ///
    /// # Return
    ///
    /// Returns `Some(&[Neighbor])` if the atom exists, otherwise `None`.
    pub fn neighbors(&self, id: AtomId) -> Option<&[Neighbor]> {
        self.adjacency.get(id).map(|v| v.as_slice())
    }

    pub fn neighbor_ids(&self, id: AtomId) -> Vec<AtomId> {
        self.neighbors(id)
            .map(|ns| ns.iter().map(|n| n.atom).collect())
            .unwrap_or_default()
    }

    /// Number of bonds incident to the atom; zero for unknown atoms.
    pub fn degree(&self, id: AtomId) -> usize {
        self.adjacency.get(id).map_or(0, |v| v.len())
    }

    /// Adds an atom and returns its new ID.
    pub fn add_atom(&mut self, atom: Atom) -> AtomId {
        let id = self.atoms.insert(atom);
        self.adjacency.insert(id, Vec::new());
        self.invalidate();
        id
    }

    /// Removes an atom together with every bond incident to it.
    ///
    /// # Return
    ///
    /// Returns `Some(Atom)` if the atom existed and was removed, otherwise `None`.
    pub fn remove_atom(&mut self, id: AtomId) -> Option<Atom> {
        let atom = self.atoms.remove(id)?;

        let neighbors = self.adjacency.remove(id).unwrap_or_default();
        for neighbor in neighbors {
            self.bonds.remove(neighbor.bond);
            if let Some(list) = self.adjacency.get_mut(neighbor.atom) {
                list.retain(|n| n.bond != neighbor.bond);
            }
        }

        self.invalidate();
        Some(atom)
    }

    /// Creates a bond between two atoms unless they are already bonded.
    ///
    /// The bond is recorded in the adjacency lists of both atoms. `image` is
    /// the cell translation of `end` relative to `begin`.
    ///
    /// # Return
    ///
    /// Returns `Some(BondInsertion::Created)` for a new bond,
    /// `Some(BondInsertion::Existing)` if the pair was already bonded, and
    /// `None` if either atom does not exist or `begin == end`.
    pub fn add_bond(
        &mut self,
        begin: AtomId,
        end: AtomId,
        order: BondOrder,
        image: ImageVector,
    ) -> Option<BondInsertion> {
        if !self.atoms.contains_key(begin) || !self.atoms.contains_key(end) {
            return None;
        }
        if begin == end {
            warn!(atom = ?begin, %image, "Refusing to bond an atom to itself");
            return None;
        }

        if let Some(existing) = self.bond_between(begin, end) {
            debug!(?begin, ?end, "Bond already exists, skipping");
            return Some(BondInsertion::Existing(existing));
        }

        let bond_id = self.bonds.insert(Bond::new(begin, end, order, image));
        self.adjacency[begin].push(Neighbor {
            atom: end,
            bond: bond_id,
        });
        self.adjacency[end].push(Neighbor {
            atom: begin,
            bond: bond_id,
        });
        Some(BondInsertion::Created(bond_id))
    }

    /// Removes a bond from the structure and from both adjacency lists.
    pub fn remove_bond(&mut self, id: BondId) -> Option<Bond> {
        let bond = self.bonds.remove(id)?;
        for atom in [bond.begin, bond.end] {
            if let Some(list) = self.adjacency.get_mut(atom) {
                list.retain(|n| n.bond != id);
            }
        }
        Some(bond)
    }

    /// Opens a modification transaction. Transactions nest.
    pub fn begin_modify(&mut self) {
        self.modify_depth += 1;
    }

    /// Closes a modification transaction, refreshing derived data when the
    /// outermost transaction closes.
    pub fn end_modify(&mut self) {
        if self.modify_depth == 0 {
            warn!("end_modify called without a matching begin_modify");
            return;
        }
        self.modify_depth -= 1;
        if self.modify_depth == 0 && self.index_stale {
            self.refresh();
        }
    }

    /// Runs `edit` inside a modification transaction.
    pub fn modify<R>(&mut self, edit: impl FnOnce(&mut Self) -> R) -> R {
        self.begin_modify();
        let result = edit(self);
        self.end_modify();
        result
    }

    pub fn in_transaction(&self) -> bool {
        self.modify_depth > 0
    }

    /// Returns the atoms that may correspond to `query`.
    ///
    /// With a fresh index this is the set of atoms in neighbouring buckets;
    /// otherwise every atom is a candidate.
    pub fn site_candidates(&self, query: &Atom) -> Vec<AtomId> {
        if self.index_stale {
            self.atoms.keys().collect()
        } else {
            self.site_index.candidates(query)
        }
    }

    /// Rebuilds derived data if an edit left it stale.
    pub fn refresh(&mut self) {
        if !self.index_stale {
            return;
        }
        self.site_index = SiteIndex::build(self.atoms.iter());
        self.index_stale = false;
    }

    fn invalidate(&mut self) {
        self.index_stale = true;
        if self.modify_depth == 0 {
            self.refresh();
        }
    }

    /// Clears charge, spin and hybridization annotations on every atom.
    pub fn reset_annotations(&mut self) {
        for atom in self.atoms.values_mut() {
            atom.reset_annotations();
        }
    }

    /// Groups atoms into connected components. Components are ordered by
    /// their first atom in insertion order; atoms inside a component are in
    /// breadth-first discovery order.
    pub fn connected_components(&self) -> Vec<Vec<AtomId>> {
        let mut seen: SecondaryMap<AtomId, ()> = SecondaryMap::new();
        let mut components = Vec::new();

        for start in self.atoms.keys() {
            if seen.contains_key(start) {
                continue;
            }
            let mut component = Vec::new();
            let mut queue = VecDeque::from([start]);
            seen.insert(start, ());
            while let Some(current) = queue.pop_front() {
                component.push(current);
                for neighbor in &self.adjacency[current] {
                    if seen.insert(neighbor.atom, ()).is_none() {
                        queue.push_back(neighbor.atom);
                    }
                }
            }
            components.push(component);
        }

        components
    }

    /// Copies a subset of atoms, and the bonds among them, into a new
    /// structure sharing this structure's lattice. Bond orientation and image
    /// vectors are preserved.
    pub fn extract(&self, ids: &[AtomId]) -> Structure {
        let mut fragment = Structure {
            title: self.title.clone(),
            lattice: self.lattice.clone(),
            ..Structure::default()
        };

        fragment.modify(|fragment| {
            let mut mapping: HashMap<AtomId, AtomId> = HashMap::with_capacity(ids.len());
            for &id in ids {
                if let Some(atom) = self.atoms.get(id) {
                    mapping.insert(id, fragment.add_atom(atom.clone()));
                }
            }
            for bond in self.bonds.values() {
                if let (Some(&begin), Some(&end)) = (mapping.get(&bond.begin), mapping.get(&bond.end))
                {
                    fragment.add_bond(begin, end, bond.order, bond.image);
                }
            }
        });

        fragment
    }

    /// Splits the structure into one independent structure per connected
    /// component.
    pub fn separate(&self) -> Vec<Structure> {
        self.connected_components()
            .iter()
            .map(|component| self.extract(component))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    mod bookkeeping {
        use super::*;

        struct ChainRefs {
            zn: AtomId,
            o: AtomId,
            c: AtomId,
        }

        fn create_chain() -> (Structure, ChainRefs) {
            let mut structure = Structure::new();
            let zn = structure.add_atom(Atom::new(30, Point3::new(0.0, 0.0, 0.0)));
            let o = structure.add_atom(Atom::new(8, Point3::new(2.0, 0.0, 0.0)));
            let c = structure.add_atom(Atom::new(6, Point3::new(3.2, 0.0, 0.0)));
            structure
                .add_bond(zn, o, BondOrder::Single, ImageVector::ZERO)
                .unwrap();
            structure
                .add_bond(o, c, BondOrder::Single, ImageVector::ZERO)
                .unwrap();
            (structure, ChainRefs { zn, o, c })
        }

        #[test]
        fn add_bond_updates_both_adjacency_lists() {
            let (structure, refs) = create_chain();

            assert_eq!(structure.bond_count(), 2);
            assert_eq!(structure.neighbor_ids(refs.zn), vec![refs.o]);
            assert_eq!(structure.neighbor_ids(refs.o), vec![refs.zn, refs.c]);
            assert_eq!(structure.neighbor_ids(refs.c), vec![refs.o]);
            assert_eq!(structure.degree(refs.o), 2);
        }

        #[test]
        fn idempotent_add_bond_does_not_create_duplicates() {
            let (mut structure, refs) = create_chain();
            let first = structure.bond_between(refs.zn, refs.o).unwrap();

            let again = structure
                .add_bond(refs.o, refs.zn, BondOrder::Double, ImageVector::new(1, 0, 0))
                .unwrap();

            assert_eq!(again, BondInsertion::Existing(first));
            assert!(!again.is_new());
            assert_eq!(structure.bond_count(), 2);
            assert_eq!(structure.degree(refs.zn), 1);
            assert_eq!(structure.bond(first).unwrap().order, BondOrder::Single);
        }

        #[test]
        fn self_bonds_and_unknown_atoms_are_rejected() {
            let (mut structure, refs) = create_chain();
            assert!(
                structure
                    .add_bond(refs.c, refs.c, BondOrder::Single, ImageVector::new(1, 0, 0))
                    .is_none()
            );

            let removed = refs.zn;
            structure.remove_atom(removed);
            assert!(
                structure
                    .add_bond(removed, refs.c, BondOrder::Single, ImageVector::ZERO)
                    .is_none()
            );
        }

        #[test]
        fn remove_atom_removes_incident_bonds_on_both_sides() {
            let (mut structure, refs) = create_chain();

            let removed = structure.remove_atom(refs.o).unwrap();

            assert_eq!(removed.atomic_number, 8);
            assert_eq!(structure.atom_count(), 2);
            assert_eq!(structure.bond_count(), 0);
            assert!(structure.neighbors(refs.o).is_none());
            assert_eq!(structure.degree(refs.zn), 0);
            assert_eq!(structure.degree(refs.c), 0);
        }

        #[test]
        fn remove_bond_detaches_both_atoms() {
            let (mut structure, refs) = create_chain();
            let bond = structure.bond_between(refs.c, refs.o).unwrap();

            let removed = structure.remove_bond(bond).unwrap();

            assert_eq!(removed.begin, refs.o);
            assert!(structure.bond_between(refs.o, refs.c).is_none());
            assert_eq!(structure.neighbor_ids(refs.o), vec![refs.zn]);
            assert!(structure.neighbor_ids(refs.c).is_empty());
        }
    }

    mod transactions {
        use super::*;

        #[test]
        fn edits_outside_a_transaction_refresh_immediately() {
            let mut structure = Structure::new();
            let id = structure.add_atom(Atom::new(6, Point3::new(5.0, 5.0, 5.0)));
            structure.add_atom(Atom::new(6, Point3::new(9.0, 9.0, 9.0)));

            let query = Atom::new(6, Point3::new(5.0, 5.0, 5.0));
            assert_eq!(structure.site_candidates(&query), vec![id]);
        }

        #[test]
        fn index_is_rebuilt_when_outermost_transaction_closes() {
            let mut structure = Structure::new();
            let query = Atom::new(8, Point3::new(1.0, 1.0, 1.0));

            structure.begin_modify();
            let id = structure.add_atom(query.clone());
            structure.add_atom(Atom::new(8, Point3::new(4.0, 4.0, 4.0)));
            structure.begin_modify();
            structure.end_modify();
            assert!(structure.in_transaction());
            // Stale index: every atom is a candidate.
            assert_eq!(structure.site_candidates(&query).len(), 2);
            structure.end_modify();

            assert!(!structure.in_transaction());
            assert_eq!(structure.site_candidates(&query), vec![id]);
        }

        #[test]
        fn modify_closure_returns_its_value() {
            let mut structure = Structure::new();
            let count = structure.modify(|s| {
                s.add_atom(Atom::new(1, Point3::origin()));
                s.add_atom(Atom::new(1, Point3::new(0.7, 0.0, 0.0)));
                s.atom_count()
            });
            assert_eq!(count, 2);
            assert!(!structure.in_transaction());
        }

        #[test]
        fn unbalanced_end_modify_is_ignored() {
            let mut structure = Structure::new();
            structure.end_modify();
            assert!(!structure.in_transaction());
        }

        #[test]
        fn atom_mut_falls_back_to_linear_scan() {
            let mut structure = Structure::new();
            let id = structure.add_atom(Atom::new(6, Point3::origin()));
            structure.atom_mut(id).unwrap().position = Point3::new(3.0, 0.0, 0.0);

            let query = Atom::new(6, Point3::new(3.0, 0.0, 0.0));
            assert_eq!(structure.site_candidates(&query), vec![id]);

            structure.refresh();
            assert_eq!(structure.site_candidates(&query), vec![id]);
        }
    }

    mod components {
        use super::*;
        use crate::core::models::lattice::Lattice;

        fn two_fragments() -> Structure {
            let lattice = Lattice::from_parameters(10.0, 10.0, 10.0, 90.0, 90.0, 90.0).unwrap();
            let mut structure = Structure::with_lattice(lattice);
            let a = structure.add_atom(Atom::new(6, Point3::new(0.5, 0.0, 0.0)));
            let b = structure.add_atom(Atom::new(6, Point3::new(9.5, 0.0, 0.0)));
            structure.add_atom(Atom::new(30, Point3::new(5.0, 5.0, 5.0)));
            structure
                .add_bond(a, b, BondOrder::Single, ImageVector::new(-1, 0, 0))
                .unwrap();
            structure
        }

        #[test]
        fn connected_components_groups_bonded_atoms() {
            let structure = two_fragments();
            let components = structure.connected_components();
            assert_eq!(components.len(), 2);
            assert_eq!(components[0].len(), 2);
            assert_eq!(components[1].len(), 1);
        }

        #[test]
        fn separate_preserves_images_and_lattice() {
            let structure = two_fragments();
            let parts = structure.separate();

            assert_eq!(parts.len(), 2);
            assert!(parts.iter().all(|p| p.is_periodic()));
            let (_, bond) = parts[0].bonds_iter().next().unwrap();
            assert_eq!(bond.image, ImageVector::new(-1, 0, 0));
            assert_eq!(parts[0].atom(bond.begin).unwrap().position.x, 0.5);
            assert_eq!(parts[1].bond_count(), 0);
        }

        #[test]
        fn extract_ignores_bonds_leaving_the_subset() {
            let mut structure = Structure::new();
            let a = structure.add_atom(Atom::new(6, Point3::origin()));
            let b = structure.add_atom(Atom::new(6, Point3::new(1.5, 0.0, 0.0)));
            let c = structure.add_atom(Atom::new(6, Point3::new(3.0, 0.0, 0.0)));
            structure.add_bond(a, b, BondOrder::Single, ImageVector::ZERO);
            structure.add_bond(b, c, BondOrder::Single, ImageVector::ZERO);

            let part = structure.extract(&[a, b]);
            assert_eq!(part.atom_count(), 2);
            assert_eq!(part.bond_count(), 1);
        }
    }
}

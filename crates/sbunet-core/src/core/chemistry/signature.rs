//! Canonical SMILES-like signatures for building units.
//!
//! The signature identifies a fragment by connectivity and species only. Bond
//! orders, charges and other annotations never enter it, so two copies of the
//! same building unit with different residual annotations produce the same
//! string.

use super::elements::{HYDROGEN, symbol};
use crate::core::models::ids::AtomId;
use crate::core::models::structure::Structure;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::Write;

/// Default valences of the SMILES organic subset.
fn default_valence(atomic_number: u8) -> Option<usize> {
    match atomic_number {
        5 => Some(3),
        6 => Some(4),
        7 | 15 => Some(3),
        8 | 16 => Some(2),
        9 | 17 | 35 | 53 => Some(1),
        _ => None,
    }
}

/// Heavy-atom graph with hydrogens folded into counts.
struct FoldedGraph {
    species: Vec<(u8, u16)>,
    hydrogens: Vec<usize>,
    adjacency: Vec<Vec<usize>>,
}

impl FoldedGraph {
    fn from_structure(structure: &Structure) -> Self {
        let is_folded = |id: AtomId| -> bool {
            let Some(atom) = structure.atom(id) else {
                return false;
            };
            if atom.atomic_number != HYDROGEN || atom.isotope != 0 {
                return false;
            }
            match structure.neighbors(id) {
                Some([only]) => structure
                    .atom(only.atom)
                    .is_some_and(|n| n.atomic_number != HYDROGEN),
                _ => false,
            }
        };

        let mut local: HashMap<AtomId, usize> = HashMap::new();
        let mut species = Vec::new();
        for (id, atom) in structure.atoms_iter() {
            if !is_folded(id) {
                local.insert(id, species.len());
                species.push((atom.atomic_number, atom.isotope));
            }
        }

        let mut hydrogens = vec![0; species.len()];
        let mut adjacency = vec![Vec::new(); species.len()];
        for (id, _) in structure.atoms_iter() {
            let Some(&i) = local.get(&id) else {
                continue;
            };
            for neighbor in structure.neighbors(id).unwrap_or_default() {
                match local.get(&neighbor.atom) {
                    Some(&j) => adjacency[i].push(j),
                    None => hydrogens[i] += 1,
                }
            }
        }

        Self {
            species,
            hydrogens,
            adjacency,
        }
    }

    fn len(&self) -> usize {
        self.species.len()
    }
}

fn dense_ranks<K: Ord + Clone>(keys: &[K]) -> Vec<usize> {
    let ordered: BTreeMap<K, usize> = {
        let mut unique: Vec<K> = keys.to_vec();
        unique.sort();
        unique.dedup();
        unique.into_iter().enumerate().map(|(i, k)| (k, i)).collect()
    };
    keys.iter().map(|k| ordered[k]).collect()
}

fn class_count(ranks: &[usize]) -> usize {
    ranks.iter().collect::<HashSet<_>>().len()
}

/// Morgan-style refinement followed by tie breaking until every atom holds a
/// distinct rank.
fn canonical_ranks(graph: &FoldedGraph) -> Vec<usize> {
    let initial: Vec<(u8, u16, usize, usize)> = (0..graph.len())
        .map(|i| {
            let (z, iso) = graph.species[i];
            (z, iso, graph.adjacency[i].len(), graph.hydrogens[i])
        })
        .collect();
    let mut ranks = dense_ranks(&initial);

    loop {
        refine(&mut ranks, &graph.adjacency);
        if class_count(&ranks) == ranks.len() {
            return ranks;
        }

        let tied = (0..ranks.len())
            .filter(|&i| ranks.iter().filter(|&&r| r == ranks[i]).count() > 1)
            .map(|i| ranks[i])
            .min()
            .unwrap_or_default();
        let chosen = ranks.iter().position(|&r| r == tied).unwrap_or_default();
        for (i, rank) in ranks.iter_mut().enumerate() {
            let bump = usize::from(*rank == tied && i != chosen);
            *rank = *rank * 2 + bump;
        }
    }
}

fn refine(ranks: &mut Vec<usize>, adjacency: &[Vec<usize>]) {
    loop {
        let keys: Vec<(usize, Vec<usize>)> = (0..ranks.len())
            .map(|i| {
                let mut around: Vec<usize> = adjacency[i].iter().map(|&j| ranks[j]).collect();
                around.sort_unstable();
                (ranks[i], around)
            })
            .collect();
        let next = dense_ranks(&keys);
        let done = class_count(&next) == class_count(ranks);
        *ranks = next;
        if done {
            return;
        }
    }
}

fn atom_token(graph: &FoldedGraph, i: usize) -> String {
    let (z, isotope) = graph.species[i];
    let hydrogens = graph.hydrogens[i];
    let heavy_degree = graph.adjacency[i].len();

    if isotope == 0 {
        if let Some(valence) = default_valence(z) {
            if valence >= heavy_degree && valence - heavy_degree == hydrogens {
                return symbol(z).to_string();
            }
        }
    }

    let mut token = String::from("[");
    if isotope != 0 {
        let _ = write!(token, "{isotope}");
    }
    token.push_str(if z == 0 { "*" } else { symbol(z) });
    match hydrogens {
        0 => {}
        1 => token.push('H'),
        n => {
            let _ = write!(token, "H{n}");
        }
    }
    token.push(']');
    token
}

fn ring_label(digit: usize) -> String {
    if digit < 10 {
        digit.to_string()
    } else {
        format!("%{digit}")
    }
}

enum Emit {
    Atom(usize),
    Text(&'static str),
}

/// Writes one connected component starting from its lowest-ranked atom.
fn write_component(graph: &FoldedGraph, ranks: &[usize], start: usize, seen: &mut [bool]) -> String {
    let mut sorted_neighbors: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut neighbors_of = |u: usize| -> Vec<usize> {
        sorted_neighbors
            .entry(u)
            .or_insert_with(|| {
                let mut ns = graph.adjacency[u].clone();
                ns.sort_by_key(|&v| ranks[v]);
                ns
            })
            .clone()
    };

    // Pass 1: spanning tree in rank order, remaining edges become ring closures.
    let mut parent: HashMap<usize, usize> = HashMap::new();
    let mut children: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut closures: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut closed: HashSet<(usize, usize)> = HashSet::new();
    let mut preorder: HashMap<usize, usize> = HashMap::new();

    seen[start] = true;
    preorder.insert(start, 0);
    let mut stack = vec![(start, 0usize)];
    while let Some((u, cursor)) = stack.last().copied() {
        let ns = neighbors_of(u);
        if cursor >= ns.len() {
            stack.pop();
            continue;
        }
        if let Some(top) = stack.last_mut() {
            top.1 += 1;
        }
        let v = ns[cursor];
        if !seen[v] {
            seen[v] = true;
            preorder.insert(v, preorder.len());
            parent.insert(v, u);
            children.entry(u).or_default().push(v);
            stack.push((v, 0));
        } else {
            let tree_edge = parent.get(&u) == Some(&v) || parent.get(&v) == Some(&u);
            let key = (u.min(v), u.max(v));
            if !tree_edge && closed.insert(key) {
                closures.entry(u).or_default().push(v);
                closures.entry(v).or_default().push(u);
            }
        }
    }

    // Pass 2: emit atoms in preorder with branches and ring digits.
    let mut out = String::new();
    let mut open_digits: HashMap<(usize, usize), usize> = HashMap::new();
    let mut free_digits: Vec<usize> = Vec::new();
    let mut next_digit = 1;
    let mut written: HashSet<usize> = HashSet::new();
    let mut tasks = vec![Emit::Atom(start)];

    while let Some(task) = tasks.pop() {
        let u = match task {
            Emit::Text(text) => {
                out.push_str(text);
                continue;
            }
            Emit::Atom(u) => u,
        };

        out.push_str(&atom_token(graph, u));
        written.insert(u);

        let mut partners = closures.get(&u).cloned().unwrap_or_default();
        partners.sort_by_key(|v| preorder.get(v).copied().unwrap_or(usize::MAX));
        for v in partners {
            let key = (u.min(v), u.max(v));
            if written.contains(&v) {
                if let Some(digit) = open_digits.remove(&key) {
                    out.push_str(&ring_label(digit));
                    free_digits.push(digit);
                    free_digits.sort_unstable_by(|a, b| b.cmp(a));
                }
            } else {
                let digit = free_digits.pop().unwrap_or_else(|| {
                    next_digit += 1;
                    next_digit - 1
                });
                open_digits.insert(key, digit);
                out.push_str(&ring_label(digit));
            }
        }

        if let Some(kids) = children.get(&u) {
            if let Some((&last, rest)) = kids.split_last() {
                tasks.push(Emit::Atom(last));
                for &child in rest.iter().rev() {
                    tasks.push(Emit::Text(")"));
                    tasks.push(Emit::Atom(child));
                    tasks.push(Emit::Text("("));
                }
            }
        }
    }

    out
}

/// Produces the canonical signature of a fragment.
///
/// The fragment is copied and its charge, spin and hybridization annotations
/// are reset before the signature is computed. Hydrogens bonded to exactly
/// one non-hydrogen atom are folded into hydrogen counts. Disconnected parts
/// are written separately, sorted, and joined with `.`.
///
/// Water is written as `O`, a hydroxyl as `[OH]`, and a chain of three
/// oxygens as `[O]O[O]`.
pub fn canonical_signature(fragment: &Structure) -> String {
    let mut private = fragment.clone();
    private.reset_annotations();

    let graph = FoldedGraph::from_structure(&private);
    if graph.len() == 0 {
        return String::new();
    }
    let ranks = canonical_ranks(&graph);

    let mut by_rank: Vec<usize> = (0..graph.len()).collect();
    by_rank.sort_by_key(|&i| ranks[i]);

    let mut seen = vec![false; graph.len()];
    let mut parts = Vec::new();
    for start in by_rank {
        if !seen[start] {
            parts.push(write_component(&graph, &ranks, start, &mut seen));
        }
    }
    parts.sort();
    parts.join(".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::topology::{BondOrder, ImageVector};
    use nalgebra::Point3;

    fn build(atoms: &[(u8, [f64; 3])], bonds: &[(usize, usize)]) -> Structure {
        let mut structure = Structure::new();
        let ids: Vec<AtomId> = atoms
            .iter()
            .map(|&(z, [x, y, zc])| structure.add_atom(Atom::new(z, Point3::new(x, y, zc))))
            .collect();
        for &(a, b) in bonds {
            structure.add_bond(ids[a], ids[b], BondOrder::Single, ImageVector::ZERO);
        }
        structure
    }

    mod solvents {
        use super::*;

        #[test]
        fn water_is_bare_oxygen() {
            let water = build(
                &[(8, [0.0, 0.0, 0.0]), (1, [0.96, 0.0, 0.0]), (1, [-0.24, 0.93, 0.0])],
                &[(0, 1), (0, 2)],
            );
            assert_eq!(canonical_signature(&water), "O");
        }

        #[test]
        fn hydroxyl_is_bracketed() {
            let hydroxyl = build(&[(1, [0.96, 0.0, 0.0]), (8, [0.0, 0.0, 0.0])], &[(0, 1)]);
            assert_eq!(canonical_signature(&hydroxyl), "[OH]");
        }

        #[test]
        fn oxygen_triple_starts_at_terminal_atom() {
            let cluster = build(
                &[(8, [0.0, 0.0, 0.0]), (8, [1.4, 0.0, 0.0]), (8, [2.8, 0.0, 0.0])],
                &[(1, 0), (1, 2)],
            );
            assert_eq!(canonical_signature(&cluster), "[O]O[O]");
        }

        #[test]
        fn lone_oxide_has_no_hydrogens() {
            let oxide = build(&[(8, [0.0, 0.0, 0.0])], &[]);
            assert_eq!(canonical_signature(&oxide), "[O]");
        }
    }

    mod canonical_form {
        use super::*;

        fn formate(order: &[usize]) -> Structure {
            // HC(O)O with atoms listed in a caller-chosen order.
            let atoms = [
                (6u8, [0.0, 0.0, 0.0]),
                (8u8, [1.2, 0.0, 0.0]),
                (8u8, [-0.6, 1.1, 0.0]),
                (1u8, [-0.5, -0.9, 0.0]),
            ];
            let bonds = [(0usize, 1usize), (0, 2), (0, 3)];
            let listed: Vec<(u8, [f64; 3])> = order.iter().map(|&i| atoms[i]).collect();
            let position = |i: usize| order.iter().position(|&o| o == i).unwrap();
            let remapped: Vec<(usize, usize)> =
                bonds.iter().map(|&(a, b)| (position(a), position(b))).collect();
            build(&listed, &remapped)
        }

        #[test]
        fn signature_is_independent_of_atom_order() {
            let a = canonical_signature(&formate(&[0, 1, 2, 3]));
            let b = canonical_signature(&formate(&[3, 2, 1, 0]));
            let c = canonical_signature(&formate(&[1, 3, 0, 2]));
            assert_eq!(a, b);
            assert_eq!(a, c);
            assert_eq!(a, "[CH]([O])[O]");
        }

        #[test]
        fn annotations_do_not_change_the_signature() {
            let plain = formate(&[0, 1, 2, 3]);
            let mut charged = plain.clone();
            for (_, atom) in charged.atoms_iter_mut() {
                atom.formal_charge = -1;
                atom.hybridization = 2;
            }
            assert_eq!(canonical_signature(&plain), canonical_signature(&charged));
        }

        #[test]
        fn rings_use_closure_digits() {
            let ring: Vec<(u8, [f64; 3])> = (0..6)
                .map(|i| {
                    let angle = i as f64 * std::f64::consts::PI / 3.0;
                    (6u8, [1.4 * angle.cos(), 1.4 * angle.sin(), 0.0])
                })
                .collect();
            let bonds: Vec<(usize, usize)> = (0..6).map(|i| (i, (i + 1) % 6)).collect();
            assert_eq!(
                canonical_signature(&build(&ring, &bonds)),
                "[C]1[C][C][C][C][C]1"
            );
        }

        #[test]
        fn disconnected_parts_are_sorted_and_joined() {
            let mixed = build(
                &[
                    (30, [5.0, 5.0, 5.0]),
                    (8, [0.0, 0.0, 0.0]),
                    (1, [0.96, 0.0, 0.0]),
                    (1, [-0.24, 0.93, 0.0]),
                ],
                &[(1, 2), (1, 3)],
            );
            assert_eq!(canonical_signature(&mixed), "O.[Zn]");
        }

        #[test]
        fn pseudo_atoms_are_written_by_symbol() {
            let pair = build(&[(52, [0.0, 0.0, 0.0]), (118, [1.0, 0.0, 0.0])], &[(0, 1)]);
            assert_eq!(canonical_signature(&pair), "[Te][Og]");
        }
    }
}

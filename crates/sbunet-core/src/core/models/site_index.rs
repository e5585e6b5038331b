use super::atom::Atom;
use super::ids::AtomId;
use kiddo::SquaredEuclidean;
use kiddo::immutable::float::kdtree::ImmutableKdTree;
use nalgebra::Point3;
use std::fmt;
use std::sync::Arc;

/// Radius, in Angstroms, of a correspondence lookup. Must exceed the
/// correspondence tolerance.
const SEARCH_RADIUS: f64 = 1.0e-3;

/// Static k-d tree over 3D points; item `i` is the `i`-th point it was built from.
pub type PositionTree = ImmutableKdTree<f64, u64, 3, 32>;

/// Builds a [`PositionTree`], or `None` when there are no points.
pub fn build_tree(points: &[[f64; 3]]) -> Option<PositionTree> {
    if points.is_empty() {
        None
    } else {
        Some(ImmutableKdTree::new_from_slice(points))
    }
}

/// Indices of every point of `tree` within `radius` of `query`, in build order.
pub fn points_within(tree: &PositionTree, query: &[f64; 3], radius: f64) -> Vec<usize> {
    let mut found: Vec<usize> = tree
        .within_unsorted::<SquaredEuclidean>(query, radius * radius)
        .into_iter()
        .map(|neighbour| neighbour.item as usize)
        .collect();
    found.sort_unstable();
    found
}

fn coords(position: &Point3<f64>) -> [f64; 3] {
    [position.x, position.y, position.z]
}

/// Spatial index from atom positions to atoms, used to match atoms across
/// independently edited copies of a structure.
///
/// A lookup returns every atom of the query's species and isotope within
/// [`SEARCH_RADIUS`] of the query. The caller still has to confirm the match
/// with [`Atom::corresponds_to`].
#[derive(Clone, Default)]
pub struct SiteIndex {
    tree: Option<Arc<PositionTree>>,
    sites: Vec<(AtomId, u8, u16)>,
}

impl SiteIndex {
    pub fn build<'a>(atoms: impl Iterator<Item = (AtomId, &'a Atom)>) -> Self {
        let mut sites = Vec::new();
        let mut points = Vec::new();
        for (id, atom) in atoms {
            sites.push((id, atom.atomic_number, atom.isotope));
            points.push(coords(&atom.position));
        }
        Self {
            tree: build_tree(&points).map(Arc::new),
            sites,
        }
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Returns every indexed atom of the query's species and isotope near the
    /// query position, in insertion order.
    pub fn candidates(&self, query: &Atom) -> Vec<AtomId> {
        let Some(tree) = &self.tree else {
            return Vec::new();
        };
        points_within(tree, &coords(&query.position), SEARCH_RADIUS)
            .into_iter()
            .filter_map(|i| {
                let (id, atomic_number, isotope) = self.sites[i];
                (atomic_number == query.atomic_number && isotope == query.isotope).then_some(id)
            })
            .collect()
    }
}

impl fmt::Debug for SiteIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SiteIndex")
            .field("sites", &self.sites.len())
            .finish()
    }
}

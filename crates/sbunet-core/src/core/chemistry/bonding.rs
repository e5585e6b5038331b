use super::elements::covalent_radius;
use crate::core::models::ids::AtomId;
use crate::core::models::site_index::{build_tree, points_within};
use crate::core::models::structure::Structure;
use crate::core::models::topology::{BondOrder, ImageVector};
use nalgebra::{Point3, Vector3};
use std::collections::BTreeMap;
use tracing::debug;

/// Slack added to the sum of covalent radii.
pub const BOND_TOLERANCE: f64 = 0.45;
/// Pairs closer than this are treated as overlapping sites, not bonds.
pub const MIN_BOND_DISTANCE: f64 = 0.4;

/// Connects atoms whose distance lies between [`MIN_BOND_DISTANCE`] and the sum
/// of their covalent radii plus [`BOND_TOLERANCE`].
///
/// Candidate pairs come from a k-d tree radius query. For periodic structures
/// the tree holds every wrapped atom in the home cell and its 26 neighbouring
/// images, and each pair is bonded through its closest image. Existing bonds
/// are left as they are. Bond orders are never inferred; every perceived bond
/// is single.
///
/// # Return
///
/// The number of bonds created.
pub fn perceive_bonds(structure: &mut Structure) -> usize {
    let sites: Vec<(AtomId, u8, Point3<f64>)> = structure
        .atoms_iter()
        .filter(|(_, atom)| atom.atomic_number != 0)
        .map(|(id, atom)| (id, atom.atomic_number, atom.position))
        .collect();
    let max_radius = sites
        .iter()
        .map(|&(_, z, _)| covalent_radius(z))
        .fold(0.0, f64::max);
    let search_radius = 2.0 * max_radius + BOND_TOLERANCE;

    let images = ImageShell::build(structure, &sites);
    let mut pending = Vec::new();
    if let Some(tree) = build_tree(&images.points) {
        for (i, &(id_i, z_i, _)) in sites.iter().enumerate() {
            let home = images.home_point(i);
            let mut closest: BTreeMap<usize, (f64, ImageVector)> = BTreeMap::new();
            for hit in points_within(&tree, &home, search_radius) {
                let (j, image) = images.pair_image(i, hit);
                if j <= i {
                    continue;
                }
                let distance = euclidean(&home, &images.points[hit]);
                closest
                    .entry(j)
                    .and_modify(|best| {
                        if distance < best.0 {
                            *best = (distance, image);
                        }
                    })
                    .or_insert((distance, image));
            }
            for (j, (distance, image)) in closest {
                let (id_j, z_j, _) = sites[j];
                let cutoff = covalent_radius(z_i) + covalent_radius(z_j) + BOND_TOLERANCE;
                if distance > MIN_BOND_DISTANCE && distance < cutoff {
                    pending.push((id_i, id_j, image));
                }
            }
        }
    }

    let created = structure.modify(|s| {
        pending
            .into_iter()
            .filter(|&(a, b, image)| {
                s.add_bond(a, b, BondOrder::Single, image)
                    .is_some_and(|insertion| insertion.is_new())
            })
            .count()
    });
    debug!(created, "Perceived bonds from covalent radii");
    created
}

fn euclidean(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    Vector3::from(*a).metric_distance(&Vector3::from(*b))
}

/// Cartesian points searched during perception.
///
/// Point `k * n + i` is site `i` translated by the `k`-th offset of
/// [`SHELL`], where `n` is the number of sites. Non-periodic structures only
/// carry the zero offset.
struct ImageShell {
    points: Vec<[f64; 3]>,
    /// Integer shift that wrapped each site into the home cell.
    wrap_shifts: Vec<ImageVector>,
    offsets: Vec<ImageVector>,
    sites: usize,
}

const SHELL: [i32; 3] = [-1, 0, 1];

impl ImageShell {
    fn build(structure: &Structure, sites: &[(AtomId, u8, Point3<f64>)]) -> Self {
        let positions = sites.iter().map(|&(_, _, position)| position);

        let Some(lattice) = structure.lattice() else {
            let points: Vec<[f64; 3]> = positions.map(|p| [p.x, p.y, p.z]).collect();
            return Self {
                wrap_shifts: vec![ImageVector::ZERO; points.len()],
                sites: points.len(),
                points,
                offsets: vec![ImageVector::ZERO],
            };
        };

        let (wrapped, wrap_shifts): (Vec<Point3<f64>>, Vec<ImageVector>) =
            positions.map(|p| lattice.wrap_with_shift(&p)).unzip();
        // The home cell comes first so that point `i` is site `i` itself.
        let mut offsets = vec![ImageVector::ZERO];
        for da in SHELL {
            for db in SHELL {
                for dc in SHELL {
                    let offset = ImageVector::new(da, db, dc);
                    if !offset.is_zero() {
                        offsets.push(offset);
                    }
                }
            }
        }

        let mut points = Vec::with_capacity(wrapped.len() * offsets.len());
        for offset in &offsets {
            let translation = lattice.translation(offset);
            for p in &wrapped {
                let shifted = p + translation;
                points.push([shifted.x, shifted.y, shifted.z]);
            }
        }

        Self {
            points,
            wrap_shifts,
            offsets,
            sites: wrapped.len(),
        }
    }

    fn home_point(&self, site: usize) -> [f64; 3] {
        self.points[site]
    }

    /// Resolves a tree hit to its site and the image of that site relative to
    /// `from`, expressed against the unwrapped input coordinates.
    fn pair_image(&self, from: usize, hit: usize) -> (usize, ImageVector) {
        let site = hit % self.sites;
        let offset = self.offsets[hit / self.sites];
        let image = offset - self.wrap_shifts[site] + self.wrap_shifts[from];
        (site, image)
    }
}

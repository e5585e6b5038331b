use super::centroid::{centroid_of, unwrap_atoms};
use super::error::EngineError;
use super::matcher::match_fragment;
use super::periodic::oriented_image;
use crate::core::models::atom::Atom;
use crate::core::models::ids::AtomId;
use crate::core::models::structure::Structure;
use crate::core::models::topology::{BondOrder, ImageVector};
use nalgebra::Point3;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// How external neighbours are re-attached to a collapsed building unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Bond each external neighbour straight to the pseudo-atom.
    Direct,
    /// Insert a connector atom of `element` at the internal atom that carried
    /// each connection, between the pseudo-atom and the external neighbour.
    Connector { element: u8 },
}

/// A bond that left the fragment.
#[derive(Debug, Clone, Copy)]
struct Connection {
    external: AtomId,
    internal: AtomId,
    /// Image of `external` as seen from `internal`.
    image: ImageVector,
}

/// Replaces a building unit contained in `target` by a single pseudo-atom of
/// species `element` placed at the fragment's unweighted centroid.
///
/// Each distinct external atom bonded to the fragment keeps exactly one
/// connection, anchored on the first internal atom found bonded to it. The
/// image vectors of the new bonds are rebuilt from the fragment's unwrapped
/// cell offsets, so the net stays consistent across cell boundaries. The
/// fragment's atoms are removed afterwards.
///
/// # Return
///
/// The number of external connections preserved.
///
/// # Errors
///
/// Returns [`EngineError::Correspondence`] without touching `target` if a
/// fragment atom has no correspondent in it.
pub fn collapse_fragment(
    target: &mut Structure,
    fragment: &Structure,
    element: u8,
    mode: ConnectionMode,
) -> Result<usize, EngineError> {
    let internal: Vec<AtomId> = match_fragment(fragment, target)?
        .into_iter()
        .map(|(_, id)| id)
        .collect();
    if internal.is_empty() {
        return Err(EngineError::EmptyFragment);
    }
    let members: HashSet<AtomId> = internal.iter().copied().collect();

    let (offsets, position, shift) = if target.is_periodic() {
        match unwrap_atoms(target, &internal) {
            Ok(offsets) => {
                let centroid = centroid_of(target, &internal, &offsets, false);
                (offsets, centroid.position, centroid.shift)
            }
            Err(e) => {
                warn!(error = %e, "Cannot unwrap fragment; placing its pseudo-atom at the origin");
                (HashMap::new(), Point3::origin(), ImageVector::ZERO)
            }
        }
    } else {
        let centroid = centroid_of(target, &internal, &HashMap::new(), false);
        (HashMap::new(), centroid.position, ImageVector::ZERO)
    };

    let connections = external_connections(target, &internal, &members);

    target.modify(|target| {
        let pseudo = target.add_atom(Atom::pseudo(element, position));

        for connection in &connections {
            let anchor_offset = offsets
                .get(&connection.internal)
                .copied()
                .unwrap_or_default();
            match mode {
                ConnectionMode::Direct => {
                    target.add_bond(
                        pseudo,
                        connection.external,
                        BondOrder::Single,
                        anchor_offset + connection.image - shift,
                    );
                }
                ConnectionMode::Connector { element } => {
                    let Some(anchor) = target.atom(connection.internal).map(|a| a.position)
                    else {
                        continue;
                    };
                    let connector = target.add_atom(Atom::pseudo(element, anchor));
                    target.add_bond(
                        connector,
                        pseudo,
                        BondOrder::Single,
                        shift - anchor_offset,
                    );
                    target.add_bond(
                        connector,
                        connection.external,
                        BondOrder::Single,
                        connection.image,
                    );
                }
            }
        }

        for &id in &internal {
            target.remove_atom(id);
        }
    });

    debug!(
        element,
        atoms = internal.len(),
        connections = connections.len(),
        "Collapsed building unit"
    );
    Ok(connections.len())
}

fn external_connections(
    target: &Structure,
    internal: &[AtomId],
    members: &HashSet<AtomId>,
) -> Vec<Connection> {
    let mut seen = HashSet::new();
    let mut connections = Vec::new();
    for &id in internal {
        for neighbor in target.neighbors(id).unwrap_or_default() {
            if members.contains(&neighbor.atom) || !seen.insert(neighbor.atom) {
                continue;
            }
            let Some(image) = target
                .bond(neighbor.bond)
                .and_then(|bond| oriented_image(bond, id))
            else {
                continue;
            };
            connections.push(Connection {
                external: neighbor.atom,
                internal: id,
                image,
            });
        }
    }
    connections
}

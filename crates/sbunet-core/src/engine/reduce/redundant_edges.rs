use crate::core::models::ids::AtomId;
use crate::core::models::structure::Structure;
use crate::engine::periodic::bond_vector;
use std::collections::HashSet;
use tracing::debug;

/// Deletes connectors that duplicate another connection between the same
/// linker and the same far-side atom.
///
/// For every atom whose species is in `linker_labels`, its connector
/// neighbours (species `connector`) are compared pairwise in adjacency order.
/// Two connectors are redundant when both lead to the same first non-linker
/// neighbour and the angle between them at the linker, measured with periodic
/// images, is below `tolerance_degrees`. The earlier connector is kept. A
/// connector scheduled for deletion takes no further part in the pass.
///
/// # Return
///
/// The number of connectors deleted.
pub fn prune_redundant_connectors(
    net: &mut Structure,
    linker_labels: &[u8],
    connector: u8,
    tolerance_degrees: f64,
) -> usize {
    let doomed = find_redundant(net, linker_labels, connector, tolerance_degrees);
    net.modify(|net| {
        for &id in &doomed {
            net.remove_atom(id);
        }
    });
    doomed.len()
}

fn find_redundant(
    net: &Structure,
    linker_labels: &[u8],
    connector: u8,
    tolerance_degrees: f64,
) -> Vec<AtomId> {
    let species = |id: AtomId| net.atom(id).map(|atom| atom.atomic_number);
    let mut doomed: Vec<AtomId> = Vec::new();
    let mut scheduled: HashSet<AtomId> = HashSet::new();

    for (linker, atom) in net.atoms_iter() {
        if !linker_labels.contains(&atom.atomic_number) {
            continue;
        }

        // (connector, far-side atom)
        let arms: Vec<(AtomId, AtomId)> = net
            .neighbor_ids(linker)
            .into_iter()
            .filter(|&x| species(x) == Some(connector))
            .filter_map(|x| {
                let far = net.neighbor_ids(x).into_iter().find(|&n| {
                    n != linker && species(n).is_some_and(|z| !linker_labels.contains(&z))
                })?;
                Some((x, far))
            })
            .collect();

        for (i, &(keep, far)) in arms.iter().enumerate() {
            if scheduled.contains(&keep) {
                continue;
            }
            let Some(kept_arm) = bond_vector(net, linker, keep) else {
                continue;
            };
            for &(other, other_far) in &arms[i + 1..] {
                if other_far != far || scheduled.contains(&other) {
                    continue;
                }
                let Some(other_arm) = bond_vector(net, linker, other) else {
                    continue;
                };
                let angle = kept_arm.angle(&other_arm).to_degrees();
                if angle < tolerance_degrees {
                    debug!(angle, "Redundant linker connection");
                    scheduled.insert(other);
                    doomed.push(other);
                }
            }
        }
    }

    doomed
}

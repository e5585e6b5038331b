//! Simplification rules that turn a condensed structure into its net.
//!
//! Each rule is a function over a [`Structure`] returning the number of
//! changes it made; [`reduce_to_fixed_point`] runs them in rounds until a full
//! round changes nothing.

mod connector_pairs;
mod redundant_edges;
mod two_connected;

pub use connector_pairs::merge_connector_pairs;
pub use redundant_edges::prune_redundant_connectors;
pub use two_connected::collapse_two_connected;

use crate::core::models::structure::Structure;
use tracing::info;

/// Connector-specific rules, active only when building units were collapsed
/// with connector atoms.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectorRules {
    pub element: u8,
    /// Species labels assigned to linker pseudo-atoms.
    pub linker_labels: Vec<u8>,
    pub angle_tolerance_degrees: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReductionRules {
    /// Species never removed by two-connected elimination.
    pub keep_element: u8,
    pub connector: Option<ConnectorRules>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReductionSummary {
    /// Rounds run, including the final round that changed nothing.
    pub rounds: usize,
    pub two_connected: usize,
    pub redundant_edges: usize,
    pub connector_pairs: usize,
}

impl ReductionSummary {
    pub fn total(&self) -> usize {
        self.two_connected + self.redundant_edges + self.connector_pairs
    }
}

/// Applies two-connected elimination, then (with connector rules) redundant
/// connector pruning and connector-pair merging, until a round makes no
/// change.
pub fn reduce_to_fixed_point(net: &mut Structure, rules: &ReductionRules) -> ReductionSummary {
    let mut summary = ReductionSummary::default();
    loop {
        summary.rounds += 1;
        let mut changes = collapse_two_connected(net, rules.keep_element);
        summary.two_connected += changes;

        if let Some(connector) = &rules.connector {
            let pruned = prune_redundant_connectors(
                net,
                &connector.linker_labels,
                connector.element,
                connector.angle_tolerance_degrees,
            );
            let merged = merge_connector_pairs(net, connector.element);
            summary.redundant_edges += pruned;
            summary.connector_pairs += merged;
            changes += pruned + merged;
        }

        if changes == 0 {
            break;
        }
    }

    info!(
        rounds = summary.rounds,
        two_connected = summary.two_connected,
        redundant_edges = summary.redundant_edges,
        connector_pairs = summary.connector_pairs,
        atoms = net.atom_count(),
        bonds = net.bond_count(),
        "Net reduction reached a fixed point"
    );
    summary
}

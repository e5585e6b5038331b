use crate::core::chemistry::signature::canonical_signature;
use crate::core::models::structure::Structure;
use crate::engine::classify::{classify_fragments, unique_signatures};
use crate::engine::collapse::{ConnectionMode, collapse_fragment};
use crate::engine::config::DecomposeConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::reduce::{ConnectorRules, ReductionRules, ReductionSummary, reduce_to_fixed_point};
use crate::engine::registry::{KeyRegistry, LabelPool};
use crate::engine::subtract::subtract_fragment;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

/// Every structure produced while decomposing a framework.
#[derive(Debug, Clone)]
pub struct Decomposition {
    /// The input with its site labels stripped.
    pub original: Structure,
    /// The input minus all linker material.
    pub nodes: Structure,
    /// The input minus all node material.
    pub linkers: Structure,
    /// The input with every linker collapsed to a pseudo-atom.
    pub partial_net: Structure,
    /// `partial_net` with every node collapsed as well.
    pub condensed_net: Structure,
    /// `condensed_net` reduced to a fixed point.
    pub net: Structure,
    pub node_keys: BTreeMap<String, u8>,
    pub linker_keys: BTreeMap<String, u8>,
    /// Signatures of the fragments left after cutting metal bonds.
    pub fragment_signatures: Vec<String>,
    /// Signatures of the connected components of `nodes`.
    pub node_signatures: Vec<String>,
    /// Signatures of the connected components of `linkers`.
    pub linker_signatures: Vec<String>,
    pub reduction: ReductionSummary,
    /// Fragments that could not be matched back onto a working copy.
    pub skipped_fragments: usize,
}

/// Decomposes a framework into nodes and linkers and reduces it to its net.
///
/// Fragments are obtained by cutting every metal bond. Single atoms and the
/// fixed solvent signatures are node material; everything else is a linker,
/// collapsed into the net under a label from the linker pool. The node copy
/// is then split into its components, each collapsed under a label from the
/// node pool, and the resulting condensed structure is reduced.
///
/// Fragments that cannot be matched onto a working copy are skipped with a
/// warning and counted in [`Decomposition::skipped_fragments`].
///
/// # Errors
///
/// Returns [`EngineError::EmptyFragment`] if the input has no atoms.
#[instrument(skip_all, name = "decompose_workflow")]
pub fn run(
    input: &Structure,
    config: &DecomposeConfig,
    reporter: &ProgressReporter,
) -> Result<Decomposition, EngineError> {
    if input.is_empty() {
        return Err(EngineError::EmptyFragment);
    }

    let mut original = input.clone();
    for (_, atom) in original.atoms_iter_mut() {
        atom.label = None;
    }
    original.refresh();

    let mut nodes = original.clone();
    let mut linkers = original.clone();
    let mut net = original.clone();
    let mut skipped_fragments = 0;

    let linker_mode = if config.reduction.connector_mode {
        ConnectionMode::Connector {
            element: config.reduction.connector_element,
        }
    } else {
        ConnectionMode::Direct
    };

    // === Phase 1: Classify fragments and collapse linkers ===
    reporter.report(Progress::PhaseStart {
        name: "Classification",
    });
    let fragments = classify_fragments(&original);
    let fragment_signatures = unique_signatures(fragments.iter().map(|f| &f.structure));
    info!(
        fragments = fragments.len(),
        unique = fragment_signatures.len(),
        "Partitioned framework at metal bonds"
    );

    let mut linker_registry =
        KeyRegistry::new(LabelPool::new(config.labels.linker_label_pool.iter().copied()));
    reporter.report(Progress::TaskStart {
        total_steps: fragments.len() as u64,
    });
    for fragment in &fragments {
        let outcome = if fragment.class.is_node_material() {
            debug!(
                kind = fragment.class.description(),
                signature = %fragment.signature,
                "Found node material"
            );
            subtract_fragment(&mut linkers, &fragment.structure).map(|_| ())
        } else {
            debug!(signature = %fragment.signature, "Deleting linker");
            subtract_fragment(&mut nodes, &fragment.structure).and_then(|_| {
                let label = linker_registry.key(&fragment.signature);
                collapse_fragment(&mut net, &fragment.structure, label, linker_mode).map(|_| ())
            })
        };
        if let Err(e) = outcome {
            warn!(signature = %fragment.signature, error = %e, "Skipping fragment");
            skipped_fragments += 1;
        }
        reporter.report(Progress::TaskIncrement);
    }
    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);

    let partial_net = net.clone();

    // === Phase 2: Collapse nodes ===
    reporter.report(Progress::PhaseStart {
        name: "Node collapse",
    });
    let mut node_registry =
        KeyRegistry::new(LabelPool::new(config.labels.node_label_pool.iter().copied()));
    let node_parts = nodes.separate();
    reporter.report(Progress::TaskStart {
        total_steps: node_parts.len() as u64,
    });
    for part in &node_parts {
        let signature = canonical_signature(part);
        let label = node_registry.key(&signature);
        // Connection points are only placed on linkers.
        if let Err(e) = collapse_fragment(&mut net, part, label, ConnectionMode::Direct) {
            warn!(%signature, error = %e, "Skipping node");
            skipped_fragments += 1;
        }
        reporter.report(Progress::TaskIncrement);
    }
    reporter.report(Progress::TaskFinish);

    let node_signatures = unique_signatures(&node_parts);
    let linker_signatures = unique_signatures(&linkers.separate());
    info!(
        nodes = node_signatures.len(),
        linkers = linker_signatures.len(),
        "Identified unique building units"
    );
    reporter.report(Progress::PhaseFinish);

    let condensed_net = net.clone();

    // === Phase 3: Reduce to the net ===
    let rules = ReductionRules {
        keep_element: config.reduction.connector_element,
        connector: config.reduction.connector_mode.then(|| ConnectorRules {
            element: config.reduction.connector_element,
            linker_labels: linker_registry.used_labels(),
            angle_tolerance_degrees: config.reduction.angle_tolerance_degrees,
        }),
    };
    let reduction = reporter.phase("Net reduction", || {
        reduce_to_fixed_point(&mut net, &rules)
    });

    if skipped_fragments > 0 {
        warn!(skipped_fragments, "Some fragments could not be placed");
        reporter.message(format!("{skipped_fragments} fragment(s) skipped"));
    }

    Ok(Decomposition {
        original,
        nodes,
        linkers,
        partial_net,
        condensed_net,
        net,
        node_keys: node_registry.into_mapping(),
        linker_keys: linker_registry.into_mapping(),
        fragment_signatures,
        node_signatures,
        linker_signatures,
        reduction,
        skipped_fragments,
    })
}

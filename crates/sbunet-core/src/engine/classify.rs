use crate::core::chemistry::elements::is_metal;
use crate::core::chemistry::signature::canonical_signature;
use crate::core::models::ids::BondId;
use crate::core::models::structure::Structure;
use phf::phf_map;
use tracing::debug;

/// Role of a fragment obtained by cutting every metal bond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentClass {
    /// A lone atom, typically a metal or a bridging oxide.
    SolitaryAtom,
    Hydroxyl,
    BoundWater,
    /// A central oxygen with coordinated solvent.
    OxoSolvent,
    /// Everything else: organic material connecting the nodes.
    Linker,
}

impl FragmentClass {
    /// Node material stays with the metal clusters; the rest are linkers.
    pub fn is_node_material(&self) -> bool {
        !matches!(self, Self::Linker)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::SolitaryAtom => "solitary atom",
            Self::Hydroxyl => "hydroxyl group",
            Self::BoundWater => "bound water molecule",
            Self::OxoSolvent => "central oxygen with coordinated solvent",
            Self::Linker => "linker",
        }
    }
}

// Matched by exact string comparison only.
static NODE_SIGNATURES: phf::Map<&'static str, FragmentClass> = phf_map! {
    "[OH]" => FragmentClass::Hydroxyl,
    "O" => FragmentClass::BoundWater,
    "[O]O[O]" => FragmentClass::OxoSolvent,
};

/// A fragment together with its signature and role.
#[derive(Debug, Clone)]
pub struct ClassifiedFragment {
    pub structure: Structure,
    pub signature: String,
    pub class: FragmentClass,
}

/// Removes every bond with at least one metal endpoint.
///
/// # Return
///
/// The number of bonds removed.
pub fn delete_metal_bonds(structure: &mut Structure) -> usize {
    let doomed: Vec<BondId> = structure
        .bonds_iter()
        .filter(|(_, bond)| {
            [bond.begin, bond.end].into_iter().any(|id| {
                structure
                    .atom(id)
                    .is_some_and(|atom| is_metal(atom.atomic_number))
            })
        })
        .map(|(id, _)| id)
        .collect();

    structure.modify(|s| {
        doomed
            .into_iter()
            .filter(|&id| s.remove_bond(id).is_some())
            .count()
    })
}

/// Splits a copy of `structure` into the fragments left after cutting all
/// metal bonds. The input is not modified.
pub fn partition_fragments(structure: &Structure) -> Vec<Structure> {
    let mut cut = structure.clone();
    let removed = delete_metal_bonds(&mut cut);
    let fragments = cut.separate();
    debug!(
        removed_bonds = removed,
        fragments = fragments.len(),
        "Partitioned structure at metal bonds"
    );
    fragments
}

/// Assigns a role to one fragment. Single atoms are node material whatever
/// their species; otherwise only the fixed solvent signatures are.
pub fn classify_fragment(fragment: Structure) -> ClassifiedFragment {
    let signature = canonical_signature(&fragment);
    let class = if fragment.atom_count() == 1 {
        FragmentClass::SolitaryAtom
    } else {
        NODE_SIGNATURES
            .get(signature.as_str())
            .copied()
            .unwrap_or(FragmentClass::Linker)
    };
    ClassifiedFragment {
        structure: fragment,
        signature,
        class,
    }
}

/// Partitions `structure` at its metal bonds and classifies every fragment,
/// in component order.
pub fn classify_fragments(structure: &Structure) -> Vec<ClassifiedFragment> {
    partition_fragments(structure)
        .into_iter()
        .map(classify_fragment)
        .collect()
}

/// Signatures of `fragments`, each listed once, in order of first appearance.
pub fn unique_signatures<'a>(fragments: impl IntoIterator<Item = &'a Structure>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::new();
    for fragment in fragments {
        let signature = canonical_signature(fragment);
        if !unique.contains(&signature) {
            unique.push(signature);
        }
    }
    unique
}

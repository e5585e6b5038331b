use super::error::EngineError;
use crate::core::models::atom::Atom;
use crate::core::models::ids::AtomId;
use crate::core::models::structure::Structure;

/// Finds the atom of `target` occupying the same site as `atom`.
///
/// Fragments are independent copies of their parent, so identity is
/// re-established by value: same species, same isotope and a position within
/// [`POSITION_TOLERANCE`](crate::core::models::atom::POSITION_TOLERANCE).
pub fn find_correspondent(atom: &Atom, target: &Structure) -> Option<AtomId> {
    target
        .site_candidates(atom)
        .into_iter()
        .find(|&id| target.atom(id).is_some_and(|other| atom.corresponds_to(other)))
}

/// Maps every atom of `fragment` onto its correspondent in `target`.
///
/// # Return
///
/// Pairs of `(fragment atom, target atom)` in the fragment's atom order.
///
/// # Errors
///
/// Returns [`EngineError::Correspondence`] for the first fragment atom that
/// has no correspondent.
pub fn match_fragment(
    fragment: &Structure,
    target: &Structure,
) -> Result<Vec<(AtomId, AtomId)>, EngineError> {
    fragment
        .atoms_iter()
        .map(|(id, atom)| {
            find_correspondent(atom, target)
                .map(|found| (id, found))
                .ok_or_else(|| EngineError::Correspondence {
                    atomic_number: atom.atomic_number,
                    position: [atom.position.x, atom.position.y, atom.position.z],
                })
        })
        .collect()
}

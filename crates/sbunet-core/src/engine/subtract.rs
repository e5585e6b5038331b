use super::error::EngineError;
use super::matcher::match_fragment;
use crate::core::models::structure::Structure;
use tracing::debug;

/// Removes from `target` every atom corresponding to an atom of `fragment`,
/// together with the bonds incident to them.
///
/// The operation is all-or-nothing: every correspondent is located before
/// anything is removed, so a failed match leaves `target` untouched.
///
/// # Return
///
/// The number of atoms removed, which equals the fragment's atom count.
///
/// # Errors
///
/// Returns [`EngineError::Correspondence`] if a fragment atom has no
/// correspondent in `target`.
pub fn subtract_fragment(target: &mut Structure, fragment: &Structure) -> Result<usize, EngineError> {
    let pairs = match_fragment(fragment, target)?;

    let removed = target.modify(|target| {
        pairs
            .iter()
            .filter(|&&(_, id)| target.remove_atom(id).is_some())
            .count()
    });
    debug!(removed, remaining = target.atom_count(), "Subtracted fragment");
    Ok(removed)
}

use thiserror::Error;

use super::config::ConfigError;
use crate::core::models::ids::AtomId;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(
        "No corresponding atom in the target for atomic number {atomic_number} at ({:.4}, {:.4}, {:.4})",
        position[0],
        position[1],
        position[2]
    )]
    Correspondence {
        atomic_number: u8,
        position: [f64; 3],
    },

    #[error("Fragment is not connected: visited {visited} of {total} atoms")]
    DisconnectedFragment { visited: usize, total: usize },

    #[error("Fragment contains no atoms")]
    EmptyFragment,

    #[error("Atom {0:?} does not exist in the structure")]
    MissingAtom(AtomId),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

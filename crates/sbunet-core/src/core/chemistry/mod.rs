//! Chemistry support: element data, bond perception and canonical signatures.

pub mod bonding;
pub mod elements;
pub mod signature;

//! # Workflows Module
//!
//! High-level entry points that run a complete procedure on a structure and
//! return every intermediate result.
//!
//! - **Decomposition** ([`decompose`]) - Classifies fragments, collapses
//!   linkers and nodes into pseudo-atoms, and reduces the condensed structure
//!   to its topological net.

pub mod decompose;

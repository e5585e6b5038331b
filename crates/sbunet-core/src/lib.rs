//! # sbunet Core Library
//!
//! Decomposes a metal-organic framework into its secondary building units
//! (metal-containing nodes and organic linkers) and reduces the result to the
//! underlying topological net, ready for Systre.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture:
//!
//! - **[`core`]: The Foundation.** The periodic structure model (`Structure`,
//!   `Lattice`, image-carrying bonds), element data, canonical fragment
//!   signatures and file I/O (CIF, CGD).
//!
//! - **[`engine`]: The Logic Core.** Graph rewriting on periodic structures:
//!   fragment correspondence and subtraction, collapse of fragments into
//!   pseudo-atoms, fragment classification, key registries and the
//!   simplification rules that reduce a condensed structure to its net.
//!
//! - **[`workflows`]: The Public API.** Ties `engine` and `core` together to run
//!   a complete decomposition and hand back every intermediate structure.

pub mod core;
pub mod engine;
pub mod workflows;

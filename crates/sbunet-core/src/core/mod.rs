//! # Core Module
//!
//! This module provides the fundamental building blocks for decomposing
//! metal-organic frameworks: the periodic structure model, element data and
//! chemistry helpers, and file I/O.
//!
//! ## Architecture
//!
//! - **Structure Representation** ([`models`]) - Atoms, bonds with periodic images, lattices and structures
//! - **Chemistry** ([`chemistry`]) - Element tables, bond perception and canonical fragment signatures
//! - **File I/O** ([`io`]) - CIF reading and writing, Systre export and fragment key reports
//!
//! Everything in this layer is stateless with respect to a decomposition run;
//! the rewriting algorithms live in [`crate::engine`].

pub mod chemistry;
pub mod io;
pub mod models;

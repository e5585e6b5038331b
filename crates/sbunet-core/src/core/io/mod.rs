//! Provides input/output functionality for crystal structure and net formats.
//!
//! Structures are read from and written to CIF through [`cif::CifFile`]; nets
//! are exported for Systre through [`cgd::CgdFile`]. Both implement the
//! trait-based interface in [`traits`]. The fragment key legend written next to
//! a condensed structure lives in [`keys`].

pub mod cgd;
pub mod cif;
pub mod keys;
pub mod traits;

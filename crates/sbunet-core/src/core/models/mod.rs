//! # Core Models Module
//!
//! Data structures describing a periodic atomic graph: atoms, bonds carrying
//! periodic image vectors, the crystal lattice, and the [`structure::Structure`]
//! container that ties them together.
//!
//! ## Key Components
//!
//! - [`atom`] - Atom species, isotope, position and resettable annotations
//! - [`topology`] - Bonds, bond orders and periodic image vectors
//! - [`lattice`] - Unit cell parameters and fractional/Cartesian transforms
//! - [`structure`] - The periodic structure with bond bookkeeping and transactions
//! - [`site_index`] - Correspondence index used to match atoms across copies
//! - [`ids`] - Unique identifier types for atoms and bonds
//!
//! ## Usage
//!
//! ```ignore
//! use sbunet::core::models::{atom::Atom, structure::Structure, topology::{BondOrder, ImageVector}};
//!
//! let mut structure = Structure::with_lattice(lattice);
//! let zn = structure.add_atom(Atom::new(30, Point3::new(0.0, 0.0, 0.0)));
//! let o = structure.add_atom(Atom::new(8, Point3::new(1.9, 0.0, 0.0)));
//! structure.add_bond(zn, o, BondOrder::Single, ImageVector::ZERO);
//! ```

pub mod atom;
pub mod ids;
pub mod lattice;
pub mod site_index;
pub mod structure;
pub mod topology;

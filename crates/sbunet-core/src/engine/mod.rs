//! # Engine Module
//!
//! This module implements the graph rewriting that turns a periodic atomic
//! structure into building units and, finally, into a topological net.
//!
//! ## Overview
//!
//! Fragments handed around by the engine are independent copies of their
//! parent structure. Operations that relate a fragment to a target therefore
//! re-establish atom identity by value ([`matcher`]) and fail without touching
//! the target when an atom cannot be matched. Bonds carry integer image
//! vectors; every rewrite recomputes them through [`periodic`] so the result
//! stays consistent across cell boundaries.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Label pools, connector settings and validation
//! - **Error Handling** ([`error`]) - Engine-specific error types
//! - **Progress Monitoring** ([`progress`]) - Phase reporting for front ends
//! - **Image Orientation** ([`periodic`]) - Direction-aware image vector arithmetic
//! - **Correspondence** ([`matcher`], [`subtract`]) - Cross-copy matching and fragment removal
//! - **Centroids** ([`centroid`]) - Unwrapped, optionally mass-weighted centroids
//! - **Collapsing** ([`collapse`]) - Building unit to pseudo-atom, with optional connectors
//! - **Classification** ([`classify`], [`registry`]) - Fragment roles and synthetic labels
//! - **Net Reduction** ([`reduce`]) - Fixed-point simplification rules

pub mod centroid;
pub mod classify;
pub mod collapse;
pub mod config;
pub mod error;
pub mod matcher;
pub mod periodic;
pub mod progress;
pub mod reduce;
pub mod registry;
pub mod subtract;

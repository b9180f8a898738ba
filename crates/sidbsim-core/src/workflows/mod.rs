//! # Workflows Module
//!
//! Gate-level procedures built on top of the ground-state engines.
//!
//! ## Overview
//!
//! A workflow drives one or more engine invocations and interprets their results in
//! terms of logic: whether a layout implements a truth table under a given set of
//! physical parameters, and over which region of the parameter space it does so.
//!
//! ## Architecture
//!
//! - **Operability check** ([`operational`]) - Applies every input pattern to a BDL
//!   gate, simulates it and compares the ground state's outputs with the truth table.
//! - **Operational domain** ([`operational_domain`]) - Sweeps two physical parameters
//!   over a grid and classifies every point, either exhaustively, by random sampling,
//!   or by flood fill from operational seed points.

pub mod operational;
pub mod operational_domain;

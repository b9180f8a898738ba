//! # SiDB Simulation Core Library
//!
//! Ground-state search and operational-domain analysis for silicon dangling bond
//! (SiDB) layouts on the H-Si(100)-2x1 surface.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture that separates data and physics
//! from search algorithms and from the high-level procedures built on top of them.
//!
//! - **[`core`]: The Foundation.** Layout and coordinate models, the screened Coulomb
//!   interaction, charge distribution surfaces with cached electrostatics, the
//!   charge-index codec, physical validity checks and BDL logic abstractions.
//!
//! - **[`engine`]: The Search Layer.** Exhaustive and heuristic ground-state engines
//!   (`ExGS`, `QuickExact`, `QuickSim`, `ClusterComplete`) behind a common
//!   [`engine::search::ChargeSearch`] interface, together with their configuration,
//!   results and progress reporting.
//!
//! - **[`workflows`]: The Public API.** Gate operability checks and the operational
//!   domain explorer, which sweep physical parameters and classify each point by
//!   running an engine on every input pattern.

pub mod core;
pub mod engine;
pub mod workflows;

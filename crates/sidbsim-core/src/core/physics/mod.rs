//! # Physics Module
//!
//! Physical constants, per-run simulation parameters and the screened Coulomb
//! interaction between dangling bonds.
//!
//! - [`constants`] - Natural constants and the population-stability tolerance
//! - [`params`] - [`params::SimulationParameters`] with TOML loading and validation
//! - [`potential`] - Pair potential and the distance/potential matrices

pub mod constants;
pub mod params;
pub mod potential;

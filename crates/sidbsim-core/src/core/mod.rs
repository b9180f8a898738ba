//! # Core Module
//!
//! Stateless models and physics of SiDB layouts, plus the stateful charge
//! distribution surface that every search engine operates on.
//!
//! ## Architecture
//!
//! - **Layout Representation** ([`models`]) - Lattice coordinates, sites and layouts
//! - **Electrostatics** ([`physics`]) - Physical parameters and the screened pair potential
//! - **Charge Configurations** ([`charge`]) - Charge distribution surfaces, validity checks
//!   and the charge-index codec
//! - **Gate Abstractions** ([`logic`]) - Truth tables, BDL pairs and wires, input patterns

pub mod charge;
pub mod logic;
pub mod models;
pub mod physics;

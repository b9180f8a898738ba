//! # Charge Module
//!
//! Charge assignments over a layout and everything needed to judge them.
//!
//! ## Architecture
//!
//! - [`surface`] - The [`surface::ChargeDistributionSurface`], a layout plus a mutable
//!   charge assignment with cached local potentials and system energy
//! - [`validity`] - Population and configuration stability checks
//! - [`index`] - The mixed-radix charge-index codec that totally orders the search space
//!
//! Validity checks are written against the [`ChargeLayout`] trait rather than the
//! concrete surface type, so they only depend on the capabilities they use.

pub mod index;
pub mod surface;
pub mod validity;

use crate::core::models::coords::SiqadCoord;
use crate::core::models::sidb::ChargeState;

/// Site-container capabilities shared by charge-carrying layouts.
pub trait ChargeLayout {
    fn num_sites(&self) -> usize;

    fn site_coord(&self, index: usize) -> Option<SiqadCoord>;

    fn charge_state(&self, index: usize) -> Option<ChargeState>;

    /// Local electrostatic potential at a site in V, `None` if there is no such site.
    fn local_potential(&self, index: usize) -> Option<f64>;

    /// Potential that a unit charge at `j` induces at `i`.
    fn pair_potential(&self, i: usize, j: usize) -> f64;
}

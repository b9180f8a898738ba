use super::ChargeLayout;
use super::surface::SurfaceGeometry;
use crate::core::models::layout::SidbLayout;
use crate::core::models::sidb::ChargeState;
use crate::core::physics::constants::POP_STABILITY_ERR;
use crate::core::physics::params::{ParameterError, SimulationParameters};

/// Extra slack for interval bounds, whose sums are accumulated in a different
/// order than the exact local potentials they bound.
const BOUND_SLACK: f64 = 1e-9;

/// Judges whether charge assignments are physically valid.
///
/// A configuration is valid if it is *population stable* (every site's charge
/// agrees with its local potential and the charge transition levels) and
/// *configuration stable* (no single electron hop lowers the energy).
/// All comparisons are softened by the checker's tolerance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidityChecker {
    tolerance: f64,
}

impl Default for ValidityChecker {
    fn default() -> Self {
        Self::new(POP_STABILITY_ERR)
    }
}

impl ValidityChecker {
    pub const fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    #[inline]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Whether a site holding `state` is stable under the local potential `v`.
    #[inline]
    pub fn is_state_stable(&self, state: ChargeState, v: f64, params: &SimulationParameters) -> bool {
        let err = self.tolerance;
        match state {
            ChargeState::Negative => -v + params.mu_minus < err,
            ChargeState::Neutral => -v + params.mu_minus > -err && -v + params.mu_plus() < err,
            ChargeState::Positive => -v + params.mu_plus() > -err,
        }
    }

    /// Whether some local potential in `[v_min, v_max]` keeps `state` stable.
    #[inline]
    pub fn may_be_stable(
        &self,
        state: ChargeState,
        v_min: f64,
        v_max: f64,
        params: &SimulationParameters,
    ) -> bool {
        let err = self.tolerance + BOUND_SLACK;
        match state {
            ChargeState::Negative => -v_max + params.mu_minus < err,
            ChargeState::Neutral => {
                -v_min + params.mu_minus > -err && -v_max + params.mu_plus() < err
            }
            ChargeState::Positive => -v_min + params.mu_plus() > -err,
        }
    }

    /// States of a `base`-state search space that are stable under `v`.
    pub fn admissible_states(
        &self,
        v: f64,
        params: &SimulationParameters,
        base: u8,
    ) -> impl Iterator<Item = ChargeState> {
        let checker = *self;
        let params = *params;
        ChargeState::states_for_base(base)
            .iter()
            .copied()
            .filter(move |&s| checker.is_state_stable(s, v, &params))
    }

    /// The state a single site relaxes to when its local potential is `v`.
    pub fn relaxed_state(&self, v: f64, params: &SimulationParameters, base: u8) -> ChargeState {
        if -v + params.mu_minus < 0.0 {
            ChargeState::Negative
        } else if base >= 3 && -v + params.mu_plus() > 0.0 {
            ChargeState::Positive
        } else {
            ChargeState::Neutral
        }
    }

    /// Scans all sites and stops at the first one whose charge is unstable.
    pub fn is_population_stable<L>(&self, layout: &L, params: &SimulationParameters) -> bool
    where
        L: ChargeLayout + ?Sized,
    {
        (0..layout.num_sites()).all(|i| {
            match (layout.charge_state(i), layout.local_potential(i)) {
                (Some(state), Some(v)) => self.is_state_stable(state, v, params),
                _ => false,
            }
        })
    }

    /// Checks that no electron hop from a site to a more positive site lowers the energy.
    pub fn is_configuration_stable<L>(&self, layout: &L) -> bool
    where
        L: ChargeLayout + ?Sized,
    {
        let n = layout.num_sites();
        for i in 0..n {
            let (Some(state_i), Some(v_i)) = (layout.charge_state(i), layout.local_potential(i))
            else {
                return false;
            };
            if state_i == ChargeState::Positive {
                continue;
            }
            let dn = if state_i == ChargeState::Negative { 1.0 } else { -1.0 };
            for j in 0..n {
                let (Some(state_j), Some(v_j)) =
                    (layout.charge_state(j), layout.local_potential(j))
                else {
                    return false;
                };
                if state_j.sign() <= state_i.sign() {
                    continue;
                }
                let e_del = v_i * dn - v_j * dn - layout.pair_potential(i, j);
                if e_del < -self.tolerance {
                    return false;
                }
            }
        }
        true
    }

    pub fn is_physically_valid<L>(&self, layout: &L, params: &SimulationParameters) -> bool
    where
        L: ChargeLayout + ?Sized,
    {
        self.is_population_stable(layout, params) && self.is_configuration_stable(layout)
    }

    /// Whether any site could hold a positive charge in some configuration.
    ///
    /// With every site negative, each local potential is at its minimum; if even
    /// then no site reaches the `0/+` level, positive charges cannot occur.
    pub fn can_positive_charges_occur(&self, geometry: &SurfaceGeometry) -> bool {
        let mu_plus = geometry.params().mu_plus();
        geometry
            .all_negative_potentials()
            .into_iter()
            .any(|v| -v + mu_plus > -self.tolerance)
    }

    /// Indices of sites that are negative in every population-stable configuration.
    pub fn detect_negative_sites(&self, geometry: &SurfaceGeometry) -> Vec<usize> {
        let mu_minus = geometry.params().mu_minus;
        geometry
            .all_negative_potentials()
            .into_iter()
            .enumerate()
            .filter(|&(_, v)| -v + mu_minus < -self.tolerance)
            .map(|(i, _)| i)
            .collect()
    }
}

/// Convenience wrapper of [`ValidityChecker::can_positive_charges_occur`] for a bare layout.
pub fn can_positive_charges_occur(
    layout: &SidbLayout,
    params: &SimulationParameters,
) -> Result<bool, ParameterError> {
    let geometry = SurfaceGeometry::new(layout, params)?;
    Ok(ValidityChecker::default().can_positive_charges_occur(&geometry))
}

use crate::core::charge::surface::{ChargeDistributionSurface, SurfaceError, SurfaceGeometry};
use crate::core::charge::validity::ValidityChecker;
use crate::core::models::layout::SidbLayout;
use crate::core::models::sidb::ChargeState;
use crate::core::physics::params::SimulationParameters;
use crate::engine::config::QuickSimConfig;
use crate::engine::error::EngineError;
use crate::engine::result::{SearchStatus, SimulationResult};
use crate::engine::search::{ChargeSearch, SimulationEngine};
use crate::engine::utils::deadline::Deadline;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, trace, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Share of the sites used as starting points of one restart.
const START_SITE_FRACTION: f64 = 0.6;

/// Randomized adjacent-search heuristic.
///
/// Each restart grows a set of negative sites from a start site, picking new
/// negatives at random among the neutral sites that are far from the existing
/// ones, and relaxes unstable sites after every step. Every configuration that
/// passes the validity check is kept. Results are sound but not complete.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuickSim {
    config: QuickSimConfig,
}

struct RestartOutcome {
    found: Vec<ChargeDistributionSurface>,
    timed_out: bool,
}

impl QuickSim {
    pub fn new(config: QuickSimConfig) -> Self {
        Self { config }
    }
}

impl ChargeSearch for QuickSim {
    fn engine(&self) -> SimulationEngine {
        SimulationEngine::QuickSim
    }

    #[instrument(skip_all, name = "quicksim", fields(sites = layout.len()))]
    fn search(
        &self,
        layout: &SidbLayout,
        params: &SimulationParameters,
    ) -> Result<SimulationResult, EngineError> {
        let deadline = Deadline::new(self.config.timeout);
        params.validate()?;

        if layout.is_empty() {
            return Ok(SimulationResult::new(
                SimulationEngine::QuickSim,
                Vec::new(),
                SearchStatus::Complete,
                deadline.elapsed(),
                *params,
            ));
        }

        let template = ChargeDistributionSurface::from_geometry(Arc::new(SurfaceGeometry::new(
            layout, params,
        )?));
        let mut found: BTreeMap<Vec<ChargeState>, ChargeDistributionSurface> = BTreeMap::new();

        for state in [ChargeState::Neutral, ChargeState::Negative] {
            let mut cds = template.clone();
            cds.assign_all_charge_states(state);
            cds.update_after_charge_change();
            if cds.is_physically_valid()? {
                found.insert(cds.charge_states().to_vec(), cds);
            }
        }

        let seed = self.config.seed.unwrap_or_else(rand::random);
        debug!(
            iterations = self.config.iterations,
            alpha = self.config.alpha,
            seed,
            "Starting restarts."
        );

        let restarts: Vec<u64> = (0..self.config.iterations as u64).collect();

        #[cfg(not(feature = "parallel"))]
        let iterator = restarts.iter();

        #[cfg(feature = "parallel")]
        let iterator = restarts.par_iter();

        let outcomes: Vec<Result<RestartOutcome, SurfaceError>> = iterator
            .map(|&r| run_restart(&template, seed.wrapping_add(r), self.config.alpha, &deadline))
            .collect();

        let mut timed_out = false;
        for outcome in outcomes {
            let outcome = outcome?;
            timed_out |= outcome.timed_out;
            for cds in outcome.found {
                found.entry(cds.charge_states().to_vec()).or_insert(cds);
            }
        }

        let status = if timed_out {
            warn!("QuickSim hit its time limit, returning what was found so far.");
            SearchStatus::TimedOut
        } else {
            SearchStatus::Complete
        };
        if found.is_empty() {
            warn!("QuickSim found no physically valid configuration.");
        }

        let result = SimulationResult::new(
            SimulationEngine::QuickSim,
            found.into_values().collect(),
            status,
            deadline.elapsed(),
            *params,
        )
        .with_additional("iterations", self.config.iterations)
        .with_additional("alpha", self.config.alpha)
        .with_additional("seed", seed);

        info!(
            valid = result.len(),
            runtime_ms = result.runtime.as_millis() as u64,
            "QuickSim finished."
        );
        Ok(result)
    }
}

fn run_restart(
    template: &ChargeDistributionSurface,
    seed: u64,
    alpha: f64,
    deadline: &Deadline,
) -> Result<RestartOutcome, SurfaceError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut cds = template.clone();
    let checker = ValidityChecker::default();
    let params = *cds.params();
    let n = cds.num_sites();
    let start_sites = ((START_SITE_FRACTION * n as f64).round() as usize).clamp(1, n);
    let steps = ((n as f64 / 1.5) as usize).max(1);
    let mut found = Vec::new();

    for start in 0..start_sites {
        if deadline.is_expired() {
            return Ok(RestartOutcome {
                found,
                timed_out: true,
            });
        }
        cds.assign_all_charge_states(ChargeState::Neutral);
        cds.update_after_charge_change();
        cds.set_charge_state(start, ChargeState::Negative)?;

        for _ in 0..steps {
            if !adjacent_search(&mut cds, alpha, &mut rng)? {
                break;
            }
            relax_unstable_sites(&mut cds, &checker, &params)?;

            let mut candidate = cds.clone();
            candidate.update_after_charge_change();
            if candidate.is_physically_valid()? {
                trace!(start, seed, "Found valid configuration.");
                found.push(candidate);
            }
        }
    }
    Ok(RestartOutcome {
        found,
        timed_out: false,
    })
}

/// Turns one neutral site negative, chosen at random among those whose distance
/// to the nearest negative site is at least `alpha` times the largest such distance.
///
/// Returns `false` if no neutral site is left.
fn adjacent_search(
    cds: &mut ChargeDistributionSurface,
    alpha: f64,
    rng: &mut impl Rng,
) -> Result<bool, SurfaceError> {
    let candidates = {
        let geometry = cds.geometry();
        let states = cds.charge_states();
        let negatives: Vec<usize> = (0..states.len())
            .filter(|&i| states[i] == ChargeState::Negative)
            .collect();

        let gaps: Vec<(usize, f64)> = (0..states.len())
            .filter(|&i| states[i] == ChargeState::Neutral)
            .map(|i| {
                let gap = negatives
                    .iter()
                    .map(|&j| geometry.distance(i, j))
                    .fold(f64::INFINITY, f64::min);
                (i, gap)
            })
            .collect();

        let widest = gaps.iter().map(|&(_, g)| g).fold(0.0, f64::max);
        gaps.into_iter()
            .filter(|&(_, g)| g >= alpha * widest)
            .map(|(i, _)| i)
            .collect::<Vec<_>>()
    };

    if candidates.is_empty() {
        return Ok(false);
    }
    let pick = candidates[rng.gen_range(0..candidates.len())];
    cds.set_charge_state(pick, ChargeState::Negative)?;
    Ok(true)
}

/// Moves population-unstable sites to the state their local potential favours.
///
/// Each such move lowers the site's grand potential. Passes repeat until nothing
/// changes, at most once per site.
fn relax_unstable_sites(
    cds: &mut ChargeDistributionSurface,
    checker: &ValidityChecker,
    params: &SimulationParameters,
) -> Result<(), SurfaceError> {
    let n = cds.num_sites();
    for _ in 0..n {
        let mut changed = false;
        for i in 0..n {
            let (Some(state), Some(v)) = (cds.charge_state(i), cds.local_potential(i)) else {
                continue;
            };
            if checker.is_state_stable(state, v, params) {
                continue;
            }
            let relaxed = checker.relaxed_state(v, params, params.base);
            if relaxed != state {
                cds.set_charge_state(i, relaxed)?;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    Ok(())
}

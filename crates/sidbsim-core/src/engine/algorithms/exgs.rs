use crate::core::charge::index::ChargeIndexCodec;
use crate::core::charge::surface::ChargeDistributionSurface;
use crate::core::models::layout::SidbLayout;
use crate::core::physics::params::SimulationParameters;
use crate::engine::config::ExgsConfig;
use crate::engine::error::EngineError;
use crate::engine::result::{SearchStatus, SimulationResult};
use crate::engine::search::{ChargeSearch, SimulationEngine};
use crate::engine::utils::deadline::Deadline;
use tracing::{debug, info, instrument, warn};

/// Number of enumeration steps between two deadline checks.
const DEADLINE_POLL_INTERVAL: u64 = 1024;

/// Exhaustive ground-state search.
///
/// Walks every charge index from `0` (all negative) to the maximum index, keeping
/// the surface's caches clean with incremental updates. Exponential in the number
/// of sites; serves as the reference for the other engines.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExhaustiveSearch {
    config: ExgsConfig,
}

impl ExhaustiveSearch {
    pub fn new(config: ExgsConfig) -> Self {
        Self { config }
    }
}

impl ChargeSearch for ExhaustiveSearch {
    fn engine(&self) -> SimulationEngine {
        SimulationEngine::ExGs
    }

    #[instrument(skip_all, name = "exgs", fields(sites = layout.len()))]
    fn search(
        &self,
        layout: &SidbLayout,
        params: &SimulationParameters,
    ) -> Result<SimulationResult, EngineError> {
        let deadline = Deadline::new(self.config.timeout);
        params.validate()?;

        if layout.is_empty() {
            debug!("Empty layout, nothing to enumerate.");
            return Ok(SimulationResult::new(
                SimulationEngine::ExGs,
                Vec::new(),
                SearchStatus::Complete,
                deadline.elapsed(),
                *params,
            ));
        }

        let codec = ChargeIndexCodec::uniform(layout.len(), params.base)?;
        let total = codec.num_configurations()?;
        debug!(configurations = total, base = params.base, "Enumerating charge indices.");

        let mut cds = ChargeDistributionSurface::new(layout, params)?;
        let mut valid = Vec::new();
        let mut status = SearchStatus::Complete;
        let mut steps = 0u64;

        loop {
            if cds.is_physically_valid()? {
                let mut found = cds.clone();
                found.update_after_charge_change();
                valid.push(found);
            }
            if !cds.increment_charge_index(&codec)? {
                break;
            }
            steps += 1;
            if steps % DEADLINE_POLL_INTERVAL == 0 && deadline.is_expired() {
                warn!(
                    visited = steps,
                    total, "ExGS hit its time limit, returning a partial result."
                );
                status = SearchStatus::TimedOut;
                break;
            }
        }

        let result = SimulationResult::new(
            SimulationEngine::ExGs,
            valid,
            status,
            deadline.elapsed(),
            *params,
        )
        .with_additional("visited_configurations", steps + 1);

        info!(
            valid = result.len(),
            runtime_ms = result.runtime.as_millis() as u64,
            "ExGS finished."
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::coords::SiqadCoord;
    use crate::core::models::sidb::ChargeState::{Negative as N, Neutral as Z};
    use std::time::Duration;

    fn run(coords: &[(i32, i32, u8)], params: &SimulationParameters) -> SimulationResult {
        let layout =
            SidbLayout::from_normal_sites(coords.iter().map(|&(x, y, z)| SiqadCoord::new(x, y, z)));
        ExhaustiveSearch::default().search(&layout, params).unwrap()
    }

    #[test]
    fn bdl_wire_has_a_single_valid_configuration() {
        let wire = [(0, 0, 0), (5, 0, 0), (7, 0, 0), (11, 0, 0), (13, 0, 0), (17, 0, 0), (19, 0, 0)];
        let result = run(&wire, &SimulationParameters::default().with_base(2));
        assert_eq!(result.len(), 1);
        assert_eq!(result.configurations[0].charge_states(), &[N, Z, N, Z, N, Z, N]);
        assert!((result.minimum_energy().unwrap() - 0.246_049_321_435_194).abs() < 1e-9);
        assert_eq!(
            result.additional.get("visited_configurations").map(String::as_str),
            Some("128")
        );
    }

    #[test]
    fn three_site_chain_in_base_three() {
        let result = run(&[(0, 0, 0), (3, 0, 0), (5, 0, 0)], &SimulationParameters::default());
        assert_eq!(result.len(), 1);
        assert_eq!(result.configurations[0].charge_states(), &[N, Z, N]);
        assert!((result.minimum_energy().unwrap() - 0.091_220_713_129_110_5).abs() < 1e-9);
    }

    #[test]
    fn or_gate_layout_at_lower_mu() {
        let or_gate = [(6, 2, 0), (8, 3, 0), (12, 3, 0), (14, 2, 0), (10, 5, 0), (10, 6, 1), (10, 8, 1), (16, 1, 0)];
        let params = SimulationParameters::new(5.6, 5.0, -0.28).with_base(2);
        let result = run(&or_gate, &params);
        assert_eq!(result.len(), 1);
        assert!((result.minimum_energy().unwrap() - 0.466_258_208_7).abs() < 1e-6);
    }

    #[test]
    fn every_returned_configuration_is_clean_and_valid() {
        let result = run(&[(0, 0, 0), (0, 0, 1), (1, 0, 0)], &SimulationParameters::default());
        assert!(!result.is_empty());
        for cds in &result.configurations {
            assert!(cds.is_physically_valid().unwrap());
        }
    }

    #[test]
    fn zero_budget_yields_a_timed_out_partial_result() {
        let layout = SidbLayout::from_normal_sites((0..9).map(|i| SiqadCoord::new(4 * i, 0, 0)));
        let engine = ExhaustiveSearch::new(ExgsConfig {
            timeout: Some(Duration::ZERO),
        });
        let result = engine.search(&layout, &SimulationParameters::default()).unwrap();
        assert_eq!(result.status, SearchStatus::TimedOut);
        assert!(!result.is_complete());
    }
}

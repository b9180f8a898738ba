use crate::core::charge::surface::{ChargeDistributionSurface, SurfaceError, SurfaceGeometry};
use crate::core::charge::validity::ValidityChecker;
use crate::core::models::layout::SidbLayout;
use crate::core::models::sidb::ChargeState;
use crate::core::physics::params::SimulationParameters;
use crate::engine::config::{BaseDetection, QuickExactConfig};
use crate::engine::error::EngineError;
use crate::engine::result::{SearchStatus, SimulationResult};
use crate::engine::search::{ChargeSearch, SimulationEngine};
use crate::engine::utils::deadline::Deadline;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

const DEADLINE_POLL_INTERVAL: u64 = 1024;

/// Exact ground-state search with bound pruning.
///
/// Sites that are negative in every stable configuration are fixed up front.
/// The remaining sites are assigned depth-first; after each assignment the
/// potential of every assigned site is bounded by the extreme contributions of
/// the unassigned ones, and branches in which some assigned site can no longer
/// be stable are cut. The last free site is the dependent cell, whose state is
/// derived from the potential of all others at the leaves.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuickExact {
    config: QuickExactConfig,
}

impl QuickExact {
    pub fn new(config: QuickExactConfig) -> Self {
        Self { config }
    }

    fn effective_base(
        &self,
        checker: &ValidityChecker,
        geometry: &SurfaceGeometry,
        params: &SimulationParameters,
    ) -> u8 {
        match self.config.base_detection {
            BaseDetection::Auto
                if params.base == 3 && !checker.can_positive_charges_occur(geometry) =>
            {
                2
            }
            _ => params.base,
        }
    }
}

impl ChargeSearch for QuickExact {
    fn engine(&self) -> SimulationEngine {
        SimulationEngine::QuickExact
    }

    #[instrument(skip_all, name = "quickexact", fields(sites = layout.len()))]
    fn search(
        &self,
        layout: &SidbLayout,
        params: &SimulationParameters,
    ) -> Result<SimulationResult, EngineError> {
        let deadline = Deadline::new(self.config.timeout);
        params.validate()?;

        if layout.is_empty() {
            return Ok(SimulationResult::new(
                SimulationEngine::QuickExact,
                Vec::new(),
                SearchStatus::Complete,
                deadline.elapsed(),
                *params,
            ));
        }

        let geometry = Arc::new(SurfaceGeometry::new(layout, params)?);
        let checker = ValidityChecker::default();
        let base = self.effective_base(&checker, &geometry, params);
        let fixed = checker.detect_negative_sites(&geometry);
        debug!(
            base_number = base,
            fixed_negative = fixed.len(),
            "Prepared pruned search."
        );

        let mut search = PrunedSearch::new(Arc::clone(&geometry), base, &fixed, checker, deadline)?;
        search.run()?;

        let status = if search.timed_out {
            warn!(
                visited_nodes = search.nodes,
                "QuickExact hit its time limit, returning a partial result."
            );
            SearchStatus::TimedOut
        } else {
            SearchStatus::Complete
        };

        let result = SimulationResult::new(
            SimulationEngine::QuickExact,
            search.found,
            status,
            deadline.elapsed(),
            *params,
        )
        .with_additional("base_number", base)
        .with_additional("fixed_negative_sites", fixed.len())
        .with_additional("visited_nodes", search.nodes);

        info!(
            valid = result.len(),
            runtime_ms = result.runtime.as_millis() as u64,
            "QuickExact finished."
        );
        Ok(result)
    }
}

struct PrunedSearch {
    geometry: Arc<SurfaceGeometry>,
    params: SimulationParameters,
    checker: ValidityChecker,
    base: u8,
    order: Vec<usize>,
    assigned: Vec<usize>,
    charges: Vec<ChargeState>,
    /// Potential induced by assigned sites.
    partial: Vec<f64>,
    /// `unassigned[k][i]`: sum of `P[i][u]` over sites `u` still free at depth `k`.
    unassigned: Vec<Vec<f64>>,
    cds: ChargeDistributionSurface,
    found: Vec<ChargeDistributionSurface>,
    deadline: Deadline,
    nodes: u64,
    timed_out: bool,
}

impl PrunedSearch {
    fn new(
        geometry: Arc<SurfaceGeometry>,
        base: u8,
        fixed: &[usize],
        checker: ValidityChecker,
        deadline: Deadline,
    ) -> Result<Self, SurfaceError> {
        let n = geometry.len();
        let params = *geometry.params();

        let mut is_fixed = vec![false; n];
        for &f in fixed {
            is_fixed[f] = true;
        }
        let mut order: Vec<usize> = (0..n).filter(|&i| !is_fixed[i]).collect();
        let dependent = order.pop();

        let mut partial = vec![0.0; n];
        for &f in fixed {
            for (i, v) in partial.iter_mut().enumerate() {
                *v -= geometry.potential(i, f);
            }
        }

        let mut unassigned = vec![vec![0.0; n]; order.len() + 1];
        if let Some(dep) = dependent {
            for (i, v) in unassigned[order.len()].iter_mut().enumerate() {
                *v = geometry.potential(i, dep);
            }
        }
        for k in (0..order.len()).rev() {
            let site = order[k];
            for i in 0..n {
                unassigned[k][i] = unassigned[k + 1][i] + geometry.potential(i, site);
            }
        }

        let mut cds = ChargeDistributionSurface::from_geometry(Arc::clone(&geometry));
        if let Some(dep) = dependent {
            cds.set_dependent_cell(dep)?;
        }
        Ok(Self {
            geometry,
            params,
            checker,
            base,
            order,
            assigned: fixed.to_vec(),
            charges: vec![ChargeState::Negative; n],
            partial,
            unassigned,
            cds,
            found: Vec::new(),
            deadline,
            nodes: 0,
            timed_out: false,
        })
    }

    fn run(&mut self) -> Result<(), SurfaceError> {
        if self.deadline.is_expired() {
            self.timed_out = true;
            return Ok(());
        }
        if self.consistent(0) {
            self.descend(0)?;
        }
        Ok(())
    }

    /// Whether every assigned site may still be stable at depth `depth`.
    fn consistent(&self, depth: usize) -> bool {
        let positive_reach = if self.base == 3 { 1.0 } else { 0.0 };
        let rest = &self.unassigned[depth];
        self.assigned.iter().all(|&a| {
            let v_min = self.partial[a] - rest[a];
            let v_max = self.partial[a] + positive_reach * rest[a];
            self.checker
                .may_be_stable(self.charges[a], v_min, v_max, &self.params)
        })
    }

    fn descend(&mut self, depth: usize) -> Result<(), SurfaceError> {
        self.nodes += 1;
        if self.nodes % DEADLINE_POLL_INTERVAL == 0 && self.deadline.is_expired() {
            self.timed_out = true;
        }
        if self.timed_out {
            return Ok(());
        }
        if depth == self.order.len() {
            return self.resolve_leaf();
        }

        let site = self.order[depth];
        for &state in ChargeState::states_for_base(self.base) {
            let sign = state.sign_f64();
            self.charges[site] = state;
            self.shift_partial(site, sign);
            self.assigned.push(site);

            let result = if self.consistent(depth + 1) {
                self.descend(depth + 1)
            } else {
                Ok(())
            };

            self.assigned.pop();
            self.shift_partial(site, -sign);
            result?;
        }
        self.charges[site] = ChargeState::Negative;
        Ok(())
    }

    #[inline]
    fn shift_partial(&mut self, site: usize, sign: f64) {
        if sign == 0.0 {
            return;
        }
        for (i, v) in self.partial.iter_mut().enumerate() {
            *v += sign * self.geometry.potential(i, site);
        }
    }

    /// Loads the assignment into the surface and tries every state the dependent
    /// cell may take under it.
    fn resolve_leaf(&mut self) -> Result<(), SurfaceError> {
        self.cds.assign_charge_states(&self.charges)?;
        self.cds.update_after_charge_change();
        let Some(dependent) = self.cds.dependent_cell() else {
            return self.keep_if_valid();
        };
        for state in self.cds.dependent_cell_states(self.base)? {
            self.cds.set_charge_state(dependent, state)?;
            self.keep_if_valid()?;
        }
        Ok(())
    }

    fn keep_if_valid(&mut self) -> Result<(), SurfaceError> {
        if self.cds.is_physically_valid()? {
            self.found.push(self.cds.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::coords::SiqadCoord;
    use std::time::Duration;

    fn layout(coords: &[(i32, i32, u8)]) -> SidbLayout {
        SidbLayout::from_normal_sites(coords.iter().map(|&(x, y, z)| SiqadCoord::new(x, y, z)))
    }

    fn additional<'a>(result: &'a SimulationResult, key: &str) -> Option<&'a str> {
        result.additional.get(key).map(String::as_str)
    }

    #[test]
    fn sparse_layout_falls_back_to_base_two() {
        let wire = layout(&[(0, 0, 0), (5, 0, 0), (7, 0, 0), (11, 0, 0), (13, 0, 0), (17, 0, 0), (19, 0, 0)]);
        let result = QuickExact::default()
            .search(&wire, &SimulationParameters::default())
            .unwrap();
        assert_eq!(additional(&result, "base_number"), Some("2"));
        assert_eq!(result.len(), 1);
        assert!((result.minimum_energy().unwrap() - 0.246_049_321_435_194).abs() < 1e-9);
    }

    #[test]
    fn close_sites_keep_base_three() {
        let trio = layout(&[(0, 0, 0), (0, 0, 1), (1, 0, 0)]);
        let result = QuickExact::default()
            .search(&trio, &SimulationParameters::default())
            .unwrap();
        assert_eq!(additional(&result, "base_number"), Some("3"));
        assert!(!result.is_empty());
    }

    #[test]
    fn detection_off_keeps_requested_base() {
        let wire = layout(&[(0, 0, 0), (5, 0, 0), (7, 0, 0)]);
        let engine = QuickExact::new(QuickExactConfig {
            base_detection: BaseDetection::Off,
            timeout: None,
        });
        let result = engine.search(&wire, &SimulationParameters::default()).unwrap();
        assert_eq!(additional(&result, "base_number"), Some("3"));
    }

    #[test]
    fn isolated_site_is_fixed_negative() {
        let sites = layout(&[(0, 0, 0), (30, 0, 0), (31, 0, 0)]);
        let result = QuickExact::default()
            .search(&sites, &SimulationParameters::default())
            .unwrap();
        assert_eq!(additional(&result, "fixed_negative_sites"), Some("1"));
        for cds in &result.configurations {
            assert_eq!(cds.charge_state(0), Some(ChargeState::Negative));
        }
    }

    #[test]
    fn dependent_cell_is_resolved_by_the_surface() {
        use crate::engine::algorithms::exgs::ExhaustiveSearch;

        let trio = layout(&[(0, 0, 0), (0, 0, 1), (1, 0, 0)]);
        let params = SimulationParameters::default();
        let engine = QuickExact::new(QuickExactConfig {
            base_detection: BaseDetection::Off,
            timeout: None,
        });
        let result = engine.search(&trio, &params).unwrap();
        let exhaustive = ExhaustiveSearch::default().search(&trio, &params).unwrap();

        let states = |r: &SimulationResult| -> Vec<Vec<ChargeState>> {
            r.configurations.iter().map(|c| c.charge_states().to_vec()).collect()
        };
        assert!(!result.is_empty());
        assert_eq!(states(&result), states(&exhaustive));

        let all_fixed = additional(&result, "fixed_negative_sites") == Some("3");
        for cds in &result.configurations {
            assert_eq!(cds.dependent_cell().is_some(), !all_fixed);
            assert!(cds.is_physically_valid().unwrap());
        }
    }

    #[test]
    fn zero_budget_reports_timeout() {
        let sites = layout(&(0..12).map(|i| (3 * i, 0, 0)).collect::<Vec<_>>());
        let engine = QuickExact::new(QuickExactConfig {
            base_detection: BaseDetection::Off,
            timeout: Some(Duration::ZERO),
        });
        let result = engine.search(&sites, &SimulationParameters::default()).unwrap();
        assert_eq!(result.status, SearchStatus::TimedOut);
        assert!(result.is_empty());
    }
}

use super::search::SimulationEngine;
use crate::core::charge::surface::ChargeDistributionSurface;
use crate::core::physics::constants::POP_STABILITY_ERR;
use crate::core::physics::params::SimulationParameters;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Energies closer than this are reported as one level.
const ENERGY_RESOLUTION: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStatus {
    /// The engine finished its search.
    Complete,
    /// The time budget ran out; the configurations found so far are returned.
    TimedOut,
}

/// Output of one engine invocation.
///
/// `configurations` holds clean surfaces sorted by charge index. For exact
/// engines with status [`SearchStatus::Complete`] this is the full set of
/// physically valid configurations.
#[derive(Debug, Clone)]
pub struct SimulationResult {
    pub engine: SimulationEngine,
    pub configurations: Vec<ChargeDistributionSurface>,
    pub status: SearchStatus,
    pub runtime: Duration,
    pub parameters: SimulationParameters,
    /// Engine-specific details, e.g. the base number QuickExact settled on.
    pub additional: BTreeMap<String, String>,
}

impl SimulationResult {
    pub fn new(
        engine: SimulationEngine,
        mut configurations: Vec<ChargeDistributionSurface>,
        status: SearchStatus,
        runtime: Duration,
        parameters: SimulationParameters,
    ) -> Self {
        configurations.sort_by(|a, b| a.charge_states().cmp(b.charge_states()));
        Self {
            engine,
            configurations,
            status,
            runtime,
            parameters,
            additional: BTreeMap::new(),
        }
    }

    pub fn with_additional(mut self, key: &str, value: impl ToString) -> Self {
        self.additional.insert(key.to_string(), value.to_string());
        self
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.status == SearchStatus::Complete
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.configurations.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.configurations.is_empty()
    }

    pub fn minimum_energy(&self) -> Option<f64> {
        self.configurations
            .iter()
            .map(|c| c.cached_energy())
            .min_by(|a, b| a.total_cmp(b))
    }

    /// The lowest-energy configuration. Ties go to the smallest charge index.
    pub fn ground_state(&self) -> Option<&ChargeDistributionSurface> {
        self.configurations
            .iter()
            .min_by(|a, b| a.cached_energy().total_cmp(&b.cached_energy()))
    }

    /// All configurations within the stability tolerance of the minimum energy.
    pub fn ground_states(&self) -> Vec<&ChargeDistributionSurface> {
        let Some(min) = self.minimum_energy() else {
            return Vec::new();
        };
        self.configurations
            .iter()
            .filter(|c| c.cached_energy() - min < POP_STABILITY_ERR)
            .collect()
    }

    /// Energy levels in ascending order with the number of configurations at each.
    pub fn energy_distribution(&self) -> Vec<(f64, usize)> {
        let mut levels: BTreeMap<i64, usize> = BTreeMap::new();
        for c in &self.configurations {
            let key = (c.cached_energy() / ENERGY_RESOLUTION).round() as i64;
            *levels.entry(key).or_default() += 1;
        }
        levels
            .into_iter()
            .map(|(key, count)| (key as f64 * ENERGY_RESOLUTION, count))
            .collect()
    }

    pub fn report(&self) -> SimulationReport {
        SimulationReport {
            engine: self.engine,
            status: self.status,
            runtime: self.runtime,
            num_configurations: self.configurations.len(),
            minimum_energy: self.minimum_energy(),
            energy_distribution: self.energy_distribution(),
            additional: self.additional.clone(),
        }
    }
}

/// Summary of a [`SimulationResult`] for logs and command-line output.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationReport {
    pub engine: SimulationEngine,
    pub status: SearchStatus,
    pub runtime: Duration,
    pub num_configurations: usize,
    pub minimum_energy: Option<f64>,
    pub energy_distribution: Vec<(f64, usize)>,
    pub additional: BTreeMap<String, String>,
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Engine:             {}", self.engine)?;
        let status = match self.status {
            SearchStatus::Complete => "complete",
            SearchStatus::TimedOut => "timed out (partial result)",
        };
        writeln!(f, "Status:             {status}")?;
        writeln!(f, "Runtime:            {:.3} s", self.runtime.as_secs_f64())?;
        writeln!(f, "Valid layouts:      {}", self.num_configurations)?;
        match self.minimum_energy {
            Some(e) => writeln!(f, "Minimum energy:     {e:.6} eV")?,
            None => writeln!(f, "Minimum energy:     n/a")?,
        }
        for (key, value) in &self.additional {
            writeln!(f, "{:<20}{value}", format!("{key}:"))?;
        }
        if !self.energy_distribution.is_empty() {
            writeln!(f, "Energy distribution:")?;
            for (energy, count) in &self.energy_distribution {
                writeln!(f, "  {energy:>12.6} eV  x{count}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::coords::SiqadCoord;
    use crate::core::models::layout::SidbLayout;
    use crate::core::models::sidb::ChargeState::{Negative as N, Neutral as Z};

    fn configs() -> Vec<ChargeDistributionSurface> {
        let layout = SidbLayout::from_normal_sites([0, 3, 5].map(|x| SiqadCoord::new(x, 0, 0)));
        let params = SimulationParameters::default().with_base(2);
        let base = ChargeDistributionSurface::new(&layout, &params).unwrap();
        [[N, Z, N], [N, N, Z], [Z, Z, N]]
            .iter()
            .map(|states| {
                let mut cds = base.clone();
                cds.assign_charge_states(states).unwrap();
                cds.update_after_charge_change();
                cds
            })
            .collect()
    }

    fn result() -> SimulationResult {
        SimulationResult::new(
            SimulationEngine::ExGs,
            configs(),
            SearchStatus::Complete,
            Duration::from_millis(5),
            SimulationParameters::default(),
        )
    }

    #[test]
    fn configurations_are_sorted_by_charge_index() {
        let r = result();
        assert_eq!(r.configurations[0].charge_states(), &[N, N, Z]);
        assert_eq!(r.configurations[1].charge_states(), &[N, Z, N]);
        assert_eq!(r.configurations[2].charge_states(), &[Z, Z, N]);
    }

    #[test]
    fn ground_state_has_minimum_energy() {
        let r = result();
        assert_eq!(r.ground_state().unwrap().charge_states(), &[Z, Z, N]);
        assert!(r.minimum_energy().unwrap().abs() < 1e-12);
        assert_eq!(r.ground_states().len(), 1);
    }

    #[test]
    fn empty_result_has_no_ground_state() {
        let r = SimulationResult::new(
            SimulationEngine::QuickSim,
            Vec::new(),
            SearchStatus::Complete,
            Duration::ZERO,
            SimulationParameters::default(),
        );
        assert!(r.ground_state().is_none());
        assert!(r.ground_states().is_empty());
        assert!(r.energy_distribution().is_empty());
        assert!(r.report().to_string().contains("n/a"));
    }

    #[test]
    fn distribution_counts_levels_and_report_lists_them() {
        let r = result().with_additional("base_number", 2);
        let distribution = r.energy_distribution();
        assert_eq!(distribution.iter().map(|(_, n)| n).sum::<usize>(), 3);
        assert_eq!(distribution.len(), 3);
        assert!(distribution[0].0.abs() < 1e-9);
        assert!((distribution[1].0 - 0.091_221).abs() < 1e-6);
        let text = r.report().to_string();
        assert!(text.contains("ExGS"));
        assert!(text.contains("base_number:"));
        assert!(text.contains("Valid layouts:      3"));
    }
}

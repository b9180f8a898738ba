use super::algorithms::cluster_complete::ClusterComplete;
use super::algorithms::exgs::ExhaustiveSearch;
use super::algorithms::quickexact::QuickExact;
use super::algorithms::quicksim::QuickSim;
use super::config::EngineSelection;
use super::error::EngineError;
use super::result::SimulationResult;
use crate::core::models::layout::SidbLayout;
use crate::core::physics::params::SimulationParameters;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tag of a ground-state search engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SimulationEngine {
    ExGs,
    QuickExact,
    QuickSim,
    ClusterComplete,
}

impl SimulationEngine {
    pub const ALL: [SimulationEngine; 4] = [
        SimulationEngine::ExGs,
        SimulationEngine::QuickExact,
        SimulationEngine::QuickSim,
        SimulationEngine::ClusterComplete,
    ];

    /// Whether the engine returns every valid configuration when it completes.
    pub const fn is_exact(self) -> bool {
        !matches!(self, SimulationEngine::QuickSim)
    }
}

impl fmt::Display for SimulationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SimulationEngine::ExGs => "ExGS",
            SimulationEngine::QuickExact => "QuickExact",
            SimulationEngine::QuickSim => "QuickSim",
            SimulationEngine::ClusterComplete => "ClusterComplete",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseSimulationEngineError;

impl fmt::Display for ParseSimulationEngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("unknown simulation engine, expected one of exgs, quickexact, quicksim, clustercomplete")
    }
}

impl std::error::Error for ParseSimulationEngineError {}

impl FromStr for SimulationEngine {
    type Err = ParseSimulationEngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exgs" => Ok(SimulationEngine::ExGs),
            "quickexact" => Ok(SimulationEngine::QuickExact),
            "quicksim" => Ok(SimulationEngine::QuickSim),
            "clustercomplete" => Ok(SimulationEngine::ClusterComplete),
            _ => Err(ParseSimulationEngineError),
        }
    }
}

/// Common contract of all ground-state search engines.
///
/// An engine validates `params`, searches the charge configurations of
/// `layout` and returns the physically valid ones it found. An empty layout
/// yields an empty, complete result.
pub trait ChargeSearch {
    fn engine(&self) -> SimulationEngine;

    fn search(
        &self,
        layout: &SidbLayout,
        params: &SimulationParameters,
    ) -> Result<SimulationResult, EngineError>;
}

/// Runs the selected engine on `layout`.
pub fn simulate(
    layout: &SidbLayout,
    params: &SimulationParameters,
    selection: &EngineSelection,
) -> Result<SimulationResult, EngineError> {
    match *selection {
        EngineSelection::ExGs(config) => ExhaustiveSearch::new(config).search(layout, params),
        EngineSelection::QuickExact(config) => QuickExact::new(config).search(layout, params),
        EngineSelection::QuickSim(config) => QuickSim::new(config).search(layout, params),
        EngineSelection::ClusterComplete(config) => {
            ClusterComplete::new(config).search(layout, params)
        }
    }
}

use super::search::SimulationEngine;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExgsConfig {
    pub timeout: Option<Duration>,
}

/// Whether QuickExact may drop the positive charge state when it cannot occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BaseDetection {
    #[default]
    Auto,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QuickExactConfig {
    pub base_detection: BaseDetection,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuickSimConfig {
    /// Number of independent restarts.
    pub iterations: usize,
    /// Fraction of the largest gap a newly charged site must keep to existing negatives.
    pub alpha: f64,
    /// Seed of the first restart. Restart `r` uses `seed + r`.
    pub seed: Option<u64>,
    pub timeout: Option<Duration>,
}

impl Default for QuickSimConfig {
    fn default() -> Self {
        Self {
            iterations: 80,
            alpha: 0.7,
            seed: None,
            timeout: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterCompleteConfig {
    /// Sites closer than this (nm) are candidates for the same cluster.
    pub cluster_radius_nm: f64,
    /// Upper bound on the number of sites per cluster.
    pub max_cluster_size: usize,
    pub timeout: Option<Duration>,
}

impl Default for ClusterCompleteConfig {
    fn default() -> Self {
        Self {
            cluster_radius_nm: 2.0,
            max_cluster_size: 8,
            timeout: None,
        }
    }
}

#[derive(Default)]
pub struct QuickSimConfigBuilder {
    iterations: Option<usize>,
    alpha: Option<f64>,
    seed: Option<u64>,
    timeout: Option<Duration>,
}

impl QuickSimConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iterations(mut self, iterations: usize) -> Self {
        self.iterations = Some(iterations);
        self
    }
    pub fn alpha(mut self, alpha: f64) -> Self {
        self.alpha = Some(alpha);
        self
    }
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<QuickSimConfig, ConfigError> {
        let defaults = QuickSimConfig::default();
        let iterations = self.iterations.unwrap_or(defaults.iterations);
        if iterations == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "iterations",
                reason: "at least one restart is required".to_string(),
            });
        }
        let alpha = self.alpha.unwrap_or(defaults.alpha);
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(ConfigError::InvalidParameter {
                name: "alpha",
                reason: format!("{alpha} is not in (0, 1]"),
            });
        }
        Ok(QuickSimConfig {
            iterations,
            alpha,
            seed: self.seed,
            timeout: self.timeout,
        })
    }
}

#[derive(Default)]
pub struct ClusterCompleteConfigBuilder {
    cluster_radius_nm: Option<f64>,
    max_cluster_size: Option<usize>,
    timeout: Option<Duration>,
}

impl ClusterCompleteConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cluster_radius_nm(mut self, radius: f64) -> Self {
        self.cluster_radius_nm = Some(radius);
        self
    }
    pub fn max_cluster_size(mut self, size: usize) -> Self {
        self.max_cluster_size = Some(size);
        self
    }
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<ClusterCompleteConfig, ConfigError> {
        let defaults = ClusterCompleteConfig::default();
        let cluster_radius_nm = self.cluster_radius_nm.unwrap_or(defaults.cluster_radius_nm);
        if !(cluster_radius_nm.is_finite() && cluster_radius_nm >= 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "cluster_radius_nm",
                reason: format!("{cluster_radius_nm} is not a finite non-negative distance"),
            });
        }
        let max_cluster_size = self.max_cluster_size.unwrap_or(defaults.max_cluster_size);
        if !(1..=12).contains(&max_cluster_size) {
            return Err(ConfigError::InvalidParameter {
                name: "max_cluster_size",
                reason: format!("{max_cluster_size} is not in 1..=12"),
            });
        }
        Ok(ClusterCompleteConfig {
            cluster_radius_nm,
            max_cluster_size,
            timeout: self.timeout,
        })
    }
}

/// An engine together with its engine-specific parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineSelection {
    ExGs(ExgsConfig),
    QuickExact(QuickExactConfig),
    QuickSim(QuickSimConfig),
    ClusterComplete(ClusterCompleteConfig),
}

impl EngineSelection {
    pub fn engine(&self) -> SimulationEngine {
        match self {
            Self::ExGs(_) => SimulationEngine::ExGs,
            Self::QuickExact(_) => SimulationEngine::QuickExact,
            Self::QuickSim(_) => SimulationEngine::QuickSim,
            Self::ClusterComplete(_) => SimulationEngine::ClusterComplete,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        match self {
            Self::ExGs(c) => c.timeout,
            Self::QuickExact(c) => c.timeout,
            Self::QuickSim(c) => c.timeout,
            Self::ClusterComplete(c) => c.timeout,
        }
    }
}

impl Default for EngineSelection {
    fn default() -> Self {
        Self::QuickExact(QuickExactConfig::default())
    }
}

impl From<SimulationEngine> for EngineSelection {
    fn from(engine: SimulationEngine) -> Self {
        match engine {
            SimulationEngine::ExGs => Self::ExGs(ExgsConfig::default()),
            SimulationEngine::QuickExact => Self::QuickExact(QuickExactConfig::default()),
            SimulationEngine::QuickSim => Self::QuickSim(QuickSimConfig::default()),
            SimulationEngine::ClusterComplete => {
                Self::ClusterComplete(ClusterCompleteConfig::default())
            }
        }
    }
}

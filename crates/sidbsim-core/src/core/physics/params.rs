use super::constants::MU_PLUS_OFFSET;
use crate::core::models::coords::LatticeConstants;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Physical parameters of a simulation run.
///
/// A parameter set is immutable for the duration of one engine invocation and
/// shared read-only by all sites (and all worker threads).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParameters {
    /// Relative permittivity of the substrate.
    pub epsilon_r: f64,
    /// Thomas-Fermi (Debye) screening length in nm.
    pub lambda_tf: f64,
    /// Energy of the `-/0` charge transition level in eV.
    pub mu_minus: f64,
    /// Number of charge states per site: `2` (negative, neutral) or `3` (including positive).
    pub base: u8,
    /// Lattice the site coordinates refer to.
    pub lattice: LatticeConstants,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            epsilon_r: 5.6,
            lambda_tf: 5.0,
            mu_minus: -0.32,
            base: 3,
            lattice: LatticeConstants::default(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParameterError {
    #[error("Parameter '{name}' must be positive and finite, got {value}")]
    NotPositive { name: &'static str, value: f64 },
    #[error("Parameter '{name}' must be finite, got {value}")]
    NotFinite { name: &'static str, value: f64 },
    #[error("Base number must be 2 or 3, got {0}")]
    InvalidBase(u8),
}

#[derive(Debug, Error)]
pub enum ParamLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Invalid parameters in '{path}': {source}")]
    Invalid {
        path: String,
        source: ParameterError,
    },
}

impl SimulationParameters {
    pub fn new(epsilon_r: f64, lambda_tf: f64, mu_minus: f64) -> Self {
        Self {
            epsilon_r,
            lambda_tf,
            mu_minus,
            ..Self::default()
        }
    }

    pub fn with_base(mut self, base: u8) -> Self {
        self.base = base;
        self
    }

    /// Energy of the `0/+` charge transition level in eV.
    #[inline]
    pub fn mu_plus(&self) -> f64 {
        self.mu_minus - MU_PLUS_OFFSET
    }

    pub fn validate(&self) -> Result<(), ParameterError> {
        for (name, value) in [("epsilon_r", self.epsilon_r), ("lambda_tf", self.lambda_tf)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ParameterError::NotPositive { name, value });
            }
        }
        if !self.mu_minus.is_finite() {
            return Err(ParameterError::NotFinite {
                name: "mu_minus",
                value: self.mu_minus,
            });
        }
        if !(self.base == 2 || self.base == 3) {
            return Err(ParameterError::InvalidBase(self.base));
        }
        Ok(())
    }

    /// Loads a parameter set from a TOML file. Missing keys take their default values.
    pub fn load(path: &Path) -> Result<Self, ParamLoadError> {
        let path_str = path.to_string_lossy().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| ParamLoadError::Io {
            path: path_str.clone(),
            source: e,
        })?;
        let params: Self = toml::from_str(&content).map_err(|e| ParamLoadError::Toml {
            path: path_str.clone(),
            source: e,
        })?;
        params.validate().map_err(|e| ParamLoadError::Invalid {
            path: path_str,
            source: e,
        })?;
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn defaults_match_si_100_surface() {
        let params = SimulationParameters::default();
        assert_eq!(params.epsilon_r, 5.6);
        assert_eq!(params.lambda_tf, 5.0);
        assert_eq!(params.base, 3);
        assert!((params.mu_plus() - (-0.91)).abs() < 1e-12);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_values() {
        assert_eq!(
            SimulationParameters::default().with_base(4).validate(),
            Err(ParameterError::InvalidBase(4))
        );
        assert!(matches!(
            SimulationParameters::new(0.0, 5.0, -0.32).validate(),
            Err(ParameterError::NotPositive { name: "epsilon_r", .. })
        ));
        assert!(matches!(
            SimulationParameters::new(5.6, f64::NAN, -0.32).validate(),
            Err(ParameterError::NotPositive { name: "lambda_tf", .. })
        ));
        assert!(matches!(
            SimulationParameters::new(5.6, 5.0, f64::INFINITY).validate(),
            Err(ParameterError::NotFinite { name: "mu_minus", .. })
        ));
    }

    #[test]
    fn load_fills_missing_keys_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("params.toml");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "mu_minus = -0.28\nbase = 2").unwrap();

        let params = SimulationParameters::load(&path).unwrap();
        assert_eq!(params.mu_minus, -0.28);
        assert_eq!(params.base, 2);
        assert_eq!(params.epsilon_r, 5.6);
        assert_eq!(params.lattice, LatticeConstants::SI_100_2X1);
    }

    #[test]
    fn load_reports_invalid_base() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("params.toml");
        std::fs::write(&path, "base = 5\n").unwrap();

        let err = SimulationParameters::load(&path).unwrap_err();
        assert!(matches!(
            err,
            ParamLoadError::Invalid {
                source: ParameterError::InvalidBase(5),
                ..
            }
        ));
    }

    #[test]
    fn load_reports_missing_file_and_bad_toml() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            SimulationParameters::load(&missing),
            Err(ParamLoadError::Io { .. })
        ));

        let broken = dir.path().join("broken.toml");
        std::fs::write(&broken, "epsilon_r = [").unwrap();
        assert!(matches!(
            SimulationParameters::load(&broken),
            Err(ParamLoadError::Toml { .. })
        ));
    }
}

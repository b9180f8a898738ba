use thiserror::Error;

use super::config::ConfigError;
use super::search::SimulationEngine;
use crate::core::charge::index::CodecError;
use crate::core::charge::surface::SurfaceError;
use crate::core::logic::truth_table::LogicError;
use crate::core::physics::params::ParameterError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Charge distribution error: {source}")]
    Surface {
        #[from]
        source: SurfaceError,
    },

    #[error("Charge index error: {source}")]
    Codec {
        #[from]
        source: CodecError,
    },

    #[error("Invalid simulation parameters: {source}")]
    Parameters {
        #[from]
        source: ParameterError,
    },

    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Invalid logic specification: {source}")]
    Logic {
        #[from]
        source: LogicError,
    },

    #[error("{engine} stopped at its time limit, so its result is not exhaustive")]
    IncompleteSimulation { engine: SimulationEngine },
}

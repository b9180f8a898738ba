use crate::core::charge::surface::{ChargeDistributionSurface, SurfaceGeometry};
use crate::core::charge::validity::ValidityChecker;
use crate::core::logic::bdl::{
    BdlInputPatterns, BdlPair, BdlParams, BdlWire, WireSelection, detect_bdl_pairs,
    detect_bdl_wires, port_of,
};
use crate::core::logic::truth_table::{LogicError, TruthTable, common_arity};
use crate::core::models::layout::SidbLayout;
use crate::core::models::sidb::SiteKind;
use crate::core::physics::params::SimulationParameters;
use crate::engine::config::{BaseDetection, EngineSelection, QuickExactConfig};
use crate::engine::error::EngineError;
use crate::engine::result::SearchStatus;
use crate::engine::search::simulate;
use tracing::{debug, instrument, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationalStatus {
    Operational,
    NonOperational,
}

/// How strictly intermediate wire pairs are judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperationalCondition {
    /// Only the output pairs must carry the expected value.
    #[default]
    TolerateKinks,
    /// Every pair on an input or output wire must carry that wire's signal.
    RejectKinks,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OperationalParams {
    /// Physical parameters of every simulation. The base number is forced to 2.
    pub simulation: SimulationParameters,
    /// Engine used for each input pattern. It must be exact for a meaningful verdict.
    pub engine: EngineSelection,
    pub condition: OperationalCondition,
    pub bdl: BdlParams,
}

impl Default for OperationalParams {
    fn default() -> Self {
        Self {
            simulation: SimulationParameters::default().with_base(2),
            engine: EngineSelection::QuickExact(QuickExactConfig {
                base_detection: BaseDetection::Off,
                timeout: None,
            }),
            condition: OperationalCondition::default(),
            bdl: BdlParams::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationalAssessment {
    pub status: OperationalStatus,
    /// Number of engine runs performed before the verdict was reached.
    pub simulator_invocations: usize,
}

impl OperationalAssessment {
    #[inline]
    pub fn is_operational(&self) -> bool {
        self.status == OperationalStatus::Operational
    }
}

/// Checks whether `layout` implements `spec` under `params`.
///
/// Every input pattern is applied in turn; the first pattern whose ground states do
/// not encode the expected outputs ends the check. One truth table is expected per
/// output BDL pair, in the pairs' coordinate order.
#[instrument(skip_all, name = "is_operational", fields(sites = layout.len()))]
pub fn is_operational(
    layout: &SidbLayout,
    spec: &[TruthTable],
    params: &OperationalParams,
) -> Result<OperationalAssessment, EngineError> {
    let gate = GateSpecification::new(layout, spec, &params.bdl)?;
    let simulation = params.simulation.with_base(2);
    let checker = ValidityChecker::default();
    let mut invocations = 0;

    let verdict = |status, invocations| OperationalAssessment {
        status,
        simulator_invocations: invocations,
    };

    for (pattern, instance) in gate.patterns.iter() {
        let geometry = SurfaceGeometry::new(&instance, &simulation)?;
        if checker.can_positive_charges_occur(&geometry) {
            debug!(pattern, "Positive charges can occur.");
            return Ok(verdict(OperationalStatus::NonOperational, invocations));
        }

        let result = simulate(&instance, &simulation, &params.engine)?;
        invocations += 1;
        if result.status == SearchStatus::TimedOut {
            return Err(EngineError::IncompleteSimulation {
                engine: result.engine,
            });
        }

        let ground_states = result.ground_states();
        if ground_states.is_empty() {
            debug!(pattern, "No physically valid configuration.");
            return Ok(verdict(OperationalStatus::NonOperational, invocations));
        }

        for ground_state in ground_states {
            if !gate.outputs_match(ground_state, pattern) {
                debug!(pattern, "Output mismatch.");
                return Ok(verdict(OperationalStatus::NonOperational, invocations));
            }
            if params.condition == OperationalCondition::RejectKinks
                && gate.has_kinks(ground_state, pattern)
            {
                debug!(pattern, "Kink on a wire.");
                return Ok(verdict(OperationalStatus::NonOperational, invocations));
            }
        }
        trace!(pattern, "Pattern matches.");
    }

    Ok(verdict(OperationalStatus::Operational, invocations))
}

/// BDL structure of a gate, checked against its truth tables.
struct GateSpecification<'a> {
    spec: &'a [TruthTable],
    patterns: BdlInputPatterns<'a>,
    output_pairs: Vec<BdlPair>,
    input_wires: Vec<BdlWire>,
    output_wires: Vec<BdlWire>,
}

impl<'a> GateSpecification<'a> {
    fn new(layout: &'a SidbLayout, spec: &'a [TruthTable], bdl: &BdlParams) -> Result<Self, LogicError> {
        let arity = common_arity(spec)?;
        let patterns = BdlInputPatterns::new(layout, bdl);
        if arity as usize != patterns.num_inputs() {
            return Err(LogicError::InputCountMismatch {
                arity,
                input_pairs: patterns.num_inputs(),
            });
        }

        let output_pairs = detect_bdl_pairs(layout, SiteKind::Output, bdl);
        if output_pairs.is_empty() {
            return Err(LogicError::NoOutputPairs);
        }
        if output_pairs.len() != spec.len() {
            return Err(LogicError::OutputCountMismatch {
                tables: spec.len(),
                output_pairs: output_pairs.len(),
            });
        }

        Ok(Self {
            spec,
            patterns,
            output_pairs,
            input_wires: detect_bdl_wires(layout, bdl, WireSelection::Input),
            output_wires: detect_bdl_wires(layout, bdl, WireSelection::Output),
        })
    }

    fn outputs_match(&self, cds: &ChargeDistributionSurface, pattern: u64) -> bool {
        self.output_pairs.iter().zip(self.spec).all(|(pair, table)| {
            let upper = cds.charge_state_at(&pair.upper);
            if upper == cds.charge_state_at(&pair.lower) {
                return false;
            }
            pair.encodes_bit(cds, port_of(&self.output_wires, pair), table.get_bit(pattern))
        })
    }

    fn has_kinks(&self, cds: &ChargeDistributionSurface, pattern: u64) -> bool {
        let input_kink = (0..self.patterns.num_inputs()).any(|bit| {
            let Some((pair, _)) = self.patterns.pair_for_bit(bit) else {
                return false;
            };
            let value = pattern & (1u64 << bit) != 0;
            self.input_wires
                .iter()
                .filter(|w| w.contains(pair))
                .any(|w| wire_disagrees(w, cds, value, |p| p.kind != SiteKind::Input))
        });

        input_kink
            || self.output_pairs.iter().zip(self.spec).any(|(pair, table)| {
                let value = table.get_bit(pattern);
                self.output_wires
                    .iter()
                    .filter(|w| w.contains(pair))
                    .any(|w| wire_disagrees(w, cds, value, |_| true))
            })
    }
}

fn wire_disagrees(
    wire: &BdlWire,
    cds: &ChargeDistributionSurface,
    value: bool,
    considered: impl Fn(&BdlPair) -> bool,
) -> bool {
    wire.pairs
        .iter()
        .filter(|p| considered(p))
        .any(|p| !p.encodes_bit(cds, wire.port, value))
}

use super::operational::{OperationalAssessment, OperationalParams, OperationalStatus, is_operational};
use crate::core::logic::truth_table::TruthTable;
use crate::core::models::layout::SidbLayout;
use crate::core::physics::params::SimulationParameters;
use crate::engine::config::ConfigError;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Axis values closer than this to the maximum still belong to the sweep.
const AXIS_TOLERANCE: f64 = 1e-9;

/// A physical parameter that can be swept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SweepParameter {
    EpsilonR,
    LambdaTf,
    MuMinus,
}

impl SweepParameter {
    pub fn apply(self, params: &mut SimulationParameters, value: f64) {
        match self {
            SweepParameter::EpsilonR => params.epsilon_r = value,
            SweepParameter::LambdaTf => params.lambda_tf = value,
            SweepParameter::MuMinus => params.mu_minus = value,
        }
    }
}

impl fmt::Display for SweepParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SweepParameter::EpsilonR => "epsilon_r",
            SweepParameter::LambdaTf => "lambda_tf",
            SweepParameter::MuMinus => "mu_minus",
        };
        f.write_str(name)
    }
}

/// Inclusive range `min..=max` sampled every `step`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepAxis {
    pub parameter: SweepParameter,
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl SweepAxis {
    pub fn new(parameter: SweepParameter, min: f64, max: f64, step: f64) -> Self {
        Self {
            parameter,
            min,
            max,
            step,
        }
    }

    pub fn num_values(&self) -> usize {
        ((self.max - self.min) / self.step + AXIS_TOLERANCE).floor() as usize + 1
    }

    #[inline]
    pub fn value(&self, index: usize) -> f64 {
        self.min + index as f64 * self.step
    }

    pub fn values(&self) -> Vec<f64> {
        (0..self.num_values()).map(|i| self.value(i)).collect()
    }

    fn validate(&self, name: &'static str) -> Result<(), ConfigError> {
        let finite = self.min.is_finite() && self.max.is_finite() && self.step.is_finite();
        if !finite || self.step <= 0.0 || self.min > self.max {
            return Err(ConfigError::InvalidParameter {
                name,
                reason: format!(
                    "{} sweep {}..={} step {} is not a non-empty range with positive step",
                    self.parameter, self.min, self.max, self.step
                ),
            });
        }
        Ok(())
    }
}

/// Position of a point in the sweep grid: `x` indexes the first axis, `y` the second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridIndex {
    pub x: usize,
    pub y: usize,
}

impl GridIndex {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    fn neighbours(self, dims: (usize, usize)) -> impl Iterator<Item = GridIndex> {
        let GridIndex { x, y } = self;
        [
            x.checked_sub(1).map(|x| GridIndex::new(x, y)),
            (x + 1 < dims.0).then(|| GridIndex::new(x + 1, y)),
            y.checked_sub(1).map(|y| GridIndex::new(x, y)),
            (y + 1 < dims.1).then(|| GridIndex::new(x, y + 1)),
        ]
        .into_iter()
        .flatten()
    }
}

/// Parameter values of a grid point along both axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DomainConfig {
    /// Parameters of every point apart from the two swept ones.
    pub base: SimulationParameters,
    pub x_axis: SweepAxis,
    pub y_axis: SweepAxis,
}

impl DomainConfig {
    pub fn dimensions(&self) -> (usize, usize) {
        (self.x_axis.num_values(), self.y_axis.num_values())
    }

    pub fn num_points(&self) -> usize {
        self.x_axis.num_values() * self.y_axis.num_values()
    }

    pub fn point(&self, index: GridIndex) -> ParameterPoint {
        ParameterPoint {
            x: self.x_axis.value(index.x),
            y: self.y_axis.value(index.y),
        }
    }

    pub fn parameters_at(&self, index: GridIndex) -> SimulationParameters {
        let point = self.point(index);
        let mut params = self.base;
        self.x_axis.parameter.apply(&mut params, point.x);
        self.y_axis.parameter.apply(&mut params, point.y);
        params
    }

    fn contains(&self, index: GridIndex) -> bool {
        let (nx, ny) = self.dimensions();
        index.x < nx && index.y < ny
    }

    fn all_indices(&self) -> impl Iterator<Item = GridIndex> + '_ {
        let (nx, ny) = self.dimensions();
        (0..nx).flat_map(move |x| (0..ny).map(move |y| GridIndex::new(x, y)))
    }
}

#[derive(Debug, Default)]
pub struct DomainConfigBuilder {
    base: Option<SimulationParameters>,
    x_axis: Option<SweepAxis>,
    y_axis: Option<SweepAxis>,
}

impl DomainConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_parameters(mut self, params: SimulationParameters) -> Self {
        self.base = Some(params);
        self
    }

    pub fn x_axis(mut self, axis: SweepAxis) -> Self {
        self.x_axis = Some(axis);
        self
    }

    pub fn y_axis(mut self, axis: SweepAxis) -> Self {
        self.y_axis = Some(axis);
        self
    }

    pub fn build(self) -> Result<DomainConfig, ConfigError> {
        let x_axis = self.x_axis.ok_or(ConfigError::MissingParameter("x_axis"))?;
        let y_axis = self.y_axis.ok_or(ConfigError::MissingParameter("y_axis"))?;
        x_axis.validate("x_axis")?;
        y_axis.validate("y_axis")?;
        if x_axis.parameter == y_axis.parameter {
            return Err(ConfigError::InvalidParameter {
                name: "y_axis",
                reason: format!("both axes sweep {}", x_axis.parameter),
            });
        }
        Ok(DomainConfig {
            base: self.base.unwrap_or_default(),
            x_axis,
            y_axis,
        })
    }
}

/// Classifies a single parameter point.
pub trait PointEvaluator: Sync {
    fn evaluate(&self, params: &SimulationParameters) -> Result<OperationalAssessment, EngineError>;
}

/// Evaluates points by checking a gate layout against its truth tables.
#[derive(Debug, Clone)]
pub struct GateEvaluator<'a> {
    layout: &'a SidbLayout,
    spec: &'a [TruthTable],
    params: OperationalParams,
}

impl<'a> GateEvaluator<'a> {
    pub fn new(layout: &'a SidbLayout, spec: &'a [TruthTable], params: OperationalParams) -> Self {
        Self {
            layout,
            spec,
            params,
        }
    }
}

impl PointEvaluator for GateEvaluator<'_> {
    fn evaluate(&self, params: &SimulationParameters) -> Result<OperationalAssessment, EngineError> {
        let point_params = OperationalParams {
            simulation: *params,
            ..self.params
        };
        is_operational(self.layout, self.spec, &point_params)
    }
}

/// Classification of sweep points. Points absent from the map were not classified.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationalDomain {
    pub config: DomainConfig,
    statuses: BTreeMap<GridIndex, OperationalStatus>,
}

impl OperationalDomain {
    fn new(config: DomainConfig) -> Self {
        Self {
            config,
            statuses: BTreeMap::new(),
        }
    }

    pub fn status(&self, index: GridIndex) -> Option<OperationalStatus> {
        self.statuses.get(&index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (GridIndex, ParameterPoint, OperationalStatus)> + '_ {
        self.statuses
            .iter()
            .map(|(&index, &status)| (index, self.config.point(index), status))
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    pub fn num_operational(&self) -> usize {
        self.statuses
            .values()
            .filter(|&&s| s == OperationalStatus::Operational)
            .count()
    }

    pub fn operational_points(&self) -> Vec<ParameterPoint> {
        self.iter()
            .filter(|(_, _, s)| *s == OperationalStatus::Operational)
            .map(|(_, p, _)| p)
            .collect()
    }

    /// Records `status` unless the point is already classified. Returns whether it was new.
    fn record(&mut self, index: GridIndex, status: OperationalStatus) -> bool {
        match self.statuses.entry(index) {
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(status);
                true
            }
            std::collections::btree_map::Entry::Occupied(_) => false,
        }
    }
}

/// One row per `x` value, one column per `y` value: `#` operational,
/// `.` non-operational, `?` not classified.
impl fmt::Display for OperationalDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (nx, ny) = self.config.dimensions();
        for x in 0..nx {
            for y in 0..ny {
                let symbol = match self.status(GridIndex::new(x, y)) {
                    Some(OperationalStatus::Operational) => '#',
                    Some(OperationalStatus::NonOperational) => '.',
                    None => '?',
                };
                write!(f, "{symbol}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DomainStats {
    pub simulator_invocations: usize,
    /// Points classified by running the evaluator.
    pub evaluated_points: usize,
    pub operational_points: usize,
    pub non_operational_points: usize,
    /// Points the sweep left without a classification.
    pub unclassified_points: usize,
    pub total_points: usize,
    pub runtime: Duration,
}

impl DomainStats {
    pub fn operational_ratio(&self) -> f64 {
        if self.total_points == 0 {
            0.0
        } else {
            self.operational_points as f64 / self.total_points as f64
        }
    }
}

impl fmt::Display for DomainStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total points:       {}", self.total_points)?;
        writeln!(f, "Evaluated:          {}", self.evaluated_points)?;
        writeln!(f, "Unclassified:       {}", self.unclassified_points)?;
        writeln!(f, "Operational:        {}", self.operational_points)?;
        writeln!(f, "Non-operational:    {}", self.non_operational_points)?;
        writeln!(f, "Operational ratio:  {:.4}", self.operational_ratio())?;
        writeln!(f, "Simulator calls:    {}", self.simulator_invocations)?;
        writeln!(f, "Runtime:            {:.3} s", self.runtime.as_secs_f64())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DomainSweep {
    pub domain: OperationalDomain,
    pub stats: DomainStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FloodFillParams {
    /// Number of random starting points in addition to `seeds`.
    pub random_seeds: usize,
    /// Explicit starting points.
    pub seeds: Vec<GridIndex>,
    /// Seed of the random number generator. Drawn at random when absent.
    pub rng_seed: Option<u64>,
}

/// Shared state of one sweep.
struct Sweep<'a, E: PointEvaluator> {
    evaluator: &'a E,
    config: &'a DomainConfig,
    reporter: &'a ProgressReporter<'a>,
    domain: OperationalDomain,
    stats: DomainStats,
    start: Instant,
}

impl<'a, E: PointEvaluator> Sweep<'a, E> {
    fn new(evaluator: &'a E, config: &'a DomainConfig, reporter: &'a ProgressReporter<'a>) -> Self {
        Self {
            evaluator,
            config,
            reporter,
            domain: OperationalDomain::new(*config),
            stats: DomainStats {
                total_points: config.num_points(),
                ..DomainStats::default()
            },
            start: Instant::now(),
        }
    }

    /// Evaluates every point of `batch` that is not yet classified and returns the
    /// ones found operational.
    fn evaluate(&mut self, batch: &BTreeSet<GridIndex>) -> Result<Vec<GridIndex>, EngineError> {
        let pending: Vec<GridIndex> = batch
            .iter()
            .copied()
            .filter(|&i| self.domain.status(i).is_none())
            .collect();
        self.reporter.report(Progress::TaskStart {
            total_steps: pending.len() as u64,
        });

        let evaluator = self.evaluator;
        let config = self.config;
        let reporter = self.reporter;

        #[cfg(not(feature = "parallel"))]
        let iterator = pending.iter();

        #[cfg(feature = "parallel")]
        let iterator = pending.par_iter();

        let outcomes: Vec<(GridIndex, OperationalAssessment)> = iterator
            .map(|&index| -> Result<(GridIndex, OperationalAssessment), EngineError> {
                let assessment = evaluator.evaluate(&config.parameters_at(index))?;
                reporter.report(Progress::TaskIncrement);
                Ok((index, assessment))
            })
            .collect::<Result<_, EngineError>>()?;

        self.reporter.report(Progress::TaskFinish);

        let mut operational = Vec::new();
        for (index, assessment) in outcomes {
            if !self.domain.record(index, assessment.status) {
                continue;
            }
            self.stats.evaluated_points += 1;
            self.stats.simulator_invocations += assessment.simulator_invocations;
            if assessment.is_operational() {
                operational.push(index);
            }
        }
        Ok(operational)
    }

    fn finish(mut self) -> DomainSweep {
        self.stats.operational_points = self.domain.num_operational();
        self.stats.non_operational_points = self.domain.len() - self.stats.operational_points;
        self.stats.unclassified_points = self.stats.total_points - self.domain.len();
        self.stats.runtime = self.start.elapsed();
        info!(
            evaluated = self.stats.evaluated_points,
            operational = self.stats.operational_points,
            unclassified = self.stats.unclassified_points,
            runtime_ms = self.stats.runtime.as_millis() as u64,
            "Operational domain sweep finished."
        );
        DomainSweep {
            domain: self.domain,
            stats: self.stats,
        }
    }
}

fn random_indices(config: &DomainConfig, count: usize, rng_seed: Option<u64>) -> BTreeSet<GridIndex> {
    let (nx, ny) = config.dimensions();
    let mut rng = StdRng::seed_from_u64(rng_seed.unwrap_or_else(rand::random));
    (0..count)
        .map(|_| GridIndex::new(rng.gen_range(0..nx), rng.gen_range(0..ny)))
        .collect()
}

/// Evaluates every point of the grid.
#[instrument(skip_all, name = "operational_domain_grid_search")]
pub fn grid_search<E: PointEvaluator>(
    evaluator: &E,
    config: &DomainConfig,
    reporter: &ProgressReporter,
) -> Result<DomainSweep, EngineError> {
    let mut sweep = Sweep::new(evaluator, config, reporter);
    reporter.report(Progress::PhaseStart {
        name: "Grid Search",
    });
    sweep.evaluate(&config.all_indices().collect())?;
    reporter.report(Progress::PhaseFinish);
    Ok(sweep.finish())
}

/// Evaluates `samples` points drawn uniformly from the grid; duplicates are evaluated once.
#[instrument(skip_all, name = "operational_domain_random_sampling")]
pub fn random_sampling<E: PointEvaluator>(
    evaluator: &E,
    config: &DomainConfig,
    samples: usize,
    rng_seed: Option<u64>,
    reporter: &ProgressReporter,
) -> Result<DomainSweep, EngineError> {
    let mut sweep = Sweep::new(evaluator, config, reporter);
    reporter.report(Progress::PhaseStart {
        name: "Random Sampling",
    });
    sweep.evaluate(&random_indices(config, samples, rng_seed))?;
    reporter.report(Progress::PhaseFinish);
    Ok(sweep.finish())
}

/// Classifies the grid by expanding from operational seed points.
///
/// Seeds are evaluated first. Each following wave evaluates the unclassified
/// 4-neighbours of the points the previous wave found operational. Points never
/// reached stay unclassified: an operational region without a seed is missing
/// from the result, while every classified point agrees with a grid search.
///
/// At least one explicit or random seed is required.
#[instrument(skip_all, name = "operational_domain_flood_fill")]
pub fn flood_fill<E: PointEvaluator>(
    evaluator: &E,
    config: &DomainConfig,
    params: &FloodFillParams,
    reporter: &ProgressReporter,
) -> Result<DomainSweep, EngineError> {
    if let Some(outside) = params.seeds.iter().find(|&&s| !config.contains(s)) {
        return Err(ConfigError::InvalidParameter {
            name: "seeds",
            reason: format!("({}, {}) lies outside the sweep grid", outside.x, outside.y),
        }
        .into());
    }
    if params.seeds.is_empty() && params.random_seeds == 0 {
        return Err(ConfigError::InvalidParameter {
            name: "seeds",
            reason: "flood fill needs explicit seeds or random seed samples".to_string(),
        }
        .into());
    }

    let mut sweep = Sweep::new(evaluator, config, reporter);
    let dims = config.dimensions();

    reporter.report(Progress::PhaseStart { name: "Seeding" });
    let mut seeds = random_indices(config, params.random_seeds, params.rng_seed);
    seeds.extend(params.seeds.iter().copied());
    let mut frontier = sweep.evaluate(&seeds)?;
    reporter.message(|| {
        format!(
            "{} of {} seed points are operational",
            frontier.len(),
            seeds.len()
        )
    });
    reporter.report(Progress::PhaseFinish);
    debug!(
        seeds = seeds.len(),
        operational = frontier.len(),
        "Seed points evaluated."
    );

    reporter.report(Progress::PhaseStart { name: "Expansion" });
    let mut waves = 0usize;
    while !frontier.is_empty() {
        let wave: BTreeSet<GridIndex> = frontier
            .iter()
            .flat_map(|index| index.neighbours(dims))
            .filter(|&n| sweep.domain.status(n).is_none())
            .collect();
        if wave.is_empty() {
            break;
        }
        waves += 1;
        frontier = sweep.evaluate(&wave)?;
    }
    let unreached = config.num_points() - sweep.domain.len();
    reporter.message(|| format!("{waves} waves, {unreached} points not reached"));
    reporter.report(Progress::PhaseFinish);
    debug!(waves, unreached, "Expansion finished.");

    Ok(sweep.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::operational::tests::identity_wire;
    use crate::workflows::operational::OperationalCondition;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Operational inside disks of `radius` around `centres` in the
    /// (epsilon_r, mu_minus) plane, counting its calls.
    struct Disks {
        centres: Vec<(f64, f64)>,
        radius: f64,
        calls: AtomicUsize,
    }

    impl PointEvaluator for Disks {
        fn evaluate(&self, params: &SimulationParameters) -> Result<OperationalAssessment, EngineError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            let inside = self.centres.iter().any(|&(cx, cy)| {
                let (dx, dy) = (params.epsilon_r - cx, params.mu_minus - cy);
                dx * dx + dy * dy <= self.radius * self.radius
            });
            let status = if inside {
                OperationalStatus::Operational
            } else {
                OperationalStatus::NonOperational
            };
            Ok(OperationalAssessment {
                status,
                simulator_invocations: 1,
            })
        }
    }

    fn disk() -> Disks {
        Disks {
            centres: vec![(5.0, -0.3)],
            radius: 0.5,
            calls: AtomicUsize::new(0),
        }
    }

    /// Two operational islands, around grid points (10, 4) and (30, 10) of `disk_config`.
    fn islands() -> Disks {
        Disks {
            centres: vec![(4.0, -0.6), (6.0, 0.0)],
            radius: 0.3,
            calls: AtomicUsize::new(0),
        }
    }

    struct AlwaysOperational;

    impl PointEvaluator for AlwaysOperational {
        fn evaluate(&self, _: &SimulationParameters) -> Result<OperationalAssessment, EngineError> {
            Ok(OperationalAssessment {
                status: OperationalStatus::Operational,
                simulator_invocations: 1,
            })
        }
    }

    /// Every point `flood` classified carries the status `grid` gives it.
    fn agrees_with_grid(flood: &DomainSweep, grid: &DomainSweep) {
        for (index, _, status) in flood.domain.iter() {
            assert_eq!(grid.domain.status(index), Some(status), "{index:?}");
        }
    }

    fn disk_config() -> DomainConfig {
        DomainConfigBuilder::new()
            .x_axis(SweepAxis::new(SweepParameter::EpsilonR, 3.0, 7.0, 0.1))
            .y_axis(SweepAxis::new(SweepParameter::MuMinus, -1.0, 0.4, 0.1))
            .build()
            .unwrap()
    }

    fn gate_config() -> DomainConfig {
        DomainConfigBuilder::new()
            .x_axis(SweepAxis::new(SweepParameter::EpsilonR, 4.0, 5.0, 0.25))
            .y_axis(SweepAxis::new(SweepParameter::LambdaTf, 3.0, 6.0, 0.5))
            .build()
            .unwrap()
    }

    const GATE_MAP: &str = "##.....\n###....\n####...\n######.\n#######\n";
    /// `GATE_MAP` as reached by a flood fill from the lower-left corner.
    const GATE_FLOOD_MAP: &str = "##.????\n###.???\n####..?\n######.\n#######\n";

    #[test]
    fn axis_includes_its_maximum() {
        let axis = SweepAxis::new(SweepParameter::EpsilonR, 4.0, 5.0, 0.25);
        assert_eq!(axis.num_values(), 5);
        assert!((axis.values()[4] - 5.0).abs() < 1e-12);
        let coarse = SweepAxis::new(SweepParameter::LambdaTf, 1.0, 2.0, 0.3);
        assert_eq!(coarse.num_values(), 4);
        let mu = SweepAxis::new(SweepParameter::MuMinus, -0.5, -0.1, 0.1);
        assert_eq!(mu.num_values(), 5);
    }

    #[test]
    fn builder_requires_both_axes_and_distinct_parameters() {
        let axis = SweepAxis::new(SweepParameter::EpsilonR, 1.0, 2.0, 0.5);
        assert_eq!(
            DomainConfigBuilder::new().y_axis(axis).build(),
            Err(ConfigError::MissingParameter("x_axis"))
        );
        assert_eq!(
            DomainConfigBuilder::new().x_axis(axis).build(),
            Err(ConfigError::MissingParameter("y_axis"))
        );
        assert!(matches!(
            DomainConfigBuilder::new().x_axis(axis).y_axis(axis).build(),
            Err(ConfigError::InvalidParameter { name: "y_axis", .. })
        ));
        let backwards = SweepAxis::new(SweepParameter::MuMinus, 0.0, -1.0, 0.1);
        assert!(matches!(
            DomainConfigBuilder::new().x_axis(axis).y_axis(backwards).build(),
            Err(ConfigError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn parameters_at_applies_both_axes() {
        let config = gate_config();
        let params = config.parameters_at(GridIndex::new(2, 3));
        assert!((params.epsilon_r - 4.5).abs() < 1e-12);
        assert!((params.lambda_tf - 4.5).abs() < 1e-12);
        assert_eq!(params.mu_minus, SimulationParameters::default().mu_minus);
    }

    #[test]
    fn flood_fill_matches_grid_search_on_a_disk() {
        let config = disk_config();
        let reporter = ProgressReporter::new();

        let grid_disk = disk();
        let grid = grid_search(&grid_disk, &config, &reporter).unwrap();
        assert_eq!(grid.stats.evaluated_points, config.num_points());

        let flood_disk = disk();
        let params = FloodFillParams {
            random_seeds: 3,
            seeds: vec![GridIndex::new(20, 7)],
            rng_seed: Some(11),
        };
        let flood = flood_fill(&flood_disk, &config, &params, &reporter).unwrap();

        agrees_with_grid(&flood, &grid);
        assert_eq!(flood.stats.operational_points, grid.stats.operational_points);
        assert_eq!(flood.domain.len(), flood.stats.evaluated_points);
        assert!(flood.stats.unclassified_points > 0);
        assert_eq!(
            flood.stats.evaluated_points + flood.stats.unclassified_points,
            config.num_points()
        );
        assert_eq!(flood_disk.calls.load(Ordering::Relaxed), flood.stats.evaluated_points);
        assert!(flood.stats.evaluated_points < grid.stats.evaluated_points);
    }

    #[test]
    fn flood_fill_matches_grid_search_on_a_bdl_wire() {
        let layout = identity_wire();
        let spec = vec![TruthTable::identity()];
        let evaluator = GateEvaluator::new(
            &layout,
            &spec,
            OperationalParams {
                condition: OperationalCondition::RejectKinks,
                ..OperationalParams::default()
            },
        );
        let config = gate_config();
        let reporter = ProgressReporter::new();

        let grid = grid_search(&evaluator, &config, &reporter).unwrap();
        assert_eq!(grid.domain.to_string(), GATE_MAP);
        assert_eq!(grid.stats.operational_points, 22);
        assert!((grid.stats.operational_ratio() - 22.0 / 35.0).abs() < 1e-12);

        let params = FloodFillParams {
            seeds: vec![GridIndex::new(0, 0)],
            ..FloodFillParams::default()
        };
        let flood = flood_fill(&evaluator, &config, &params, &reporter).unwrap();
        assert_eq!(flood.domain.to_string(), GATE_FLOOD_MAP);
        assert_eq!(flood.stats.operational_points, 22);
        agrees_with_grid(&flood, &grid);
        assert!(flood.stats.simulator_invocations <= grid.stats.simulator_invocations);
    }

    #[test]
    fn flood_fill_without_operational_seeds_classifies_only_the_seeds() {
        let config = disk_config();
        let evaluator = disk();
        let params = FloodFillParams {
            seeds: vec![GridIndex::new(0, 0)],
            ..FloodFillParams::default()
        };
        let sweep = flood_fill(&evaluator, &config, &params, &ProgressReporter::new()).unwrap();
        assert_eq!(sweep.stats.evaluated_points, 1);
        assert_eq!(sweep.stats.operational_points, 0);
        assert_eq!(sweep.stats.unclassified_points, config.num_points() - 1);
        assert_eq!(sweep.domain.len(), 1);
        assert_eq!(
            sweep.domain.status(GridIndex::new(0, 0)),
            Some(OperationalStatus::NonOperational)
        );
        assert_eq!(sweep.domain.status(GridIndex::new(20, 7)), None);
    }

    #[test]
    fn operational_island_without_a_seed_stays_unclassified() {
        let config = disk_config();
        let reporter = ProgressReporter::new();
        let grid = grid_search(&islands(), &config, &reporter).unwrap();
        let seeded_island = GridIndex::new(10, 4);
        let other_island = GridIndex::new(30, 10);
        assert_eq!(grid.domain.status(seeded_island), Some(OperationalStatus::Operational));
        assert_eq!(grid.domain.status(other_island), Some(OperationalStatus::Operational));

        let params = FloodFillParams {
            seeds: vec![seeded_island],
            ..FloodFillParams::default()
        };
        let flood = flood_fill(&islands(), &config, &params, &reporter).unwrap();
        agrees_with_grid(&flood, &grid);
        assert_eq!(flood.domain.status(seeded_island), Some(OperationalStatus::Operational));
        assert_eq!(flood.domain.status(other_island), None);
        assert!(flood.stats.operational_points > 0);
        assert!(flood.stats.operational_points < grid.stats.operational_points);
        assert!(flood.domain.to_string().contains('?'));
    }

    #[test]
    fn flood_fill_covers_a_fully_operational_grid() {
        let config = gate_config();
        let reporter = ProgressReporter::new();
        let grid = grid_search(&AlwaysOperational, &config, &reporter).unwrap();
        let params = FloodFillParams {
            seeds: vec![GridIndex::new(2, 3)],
            ..FloodFillParams::default()
        };
        let flood = flood_fill(&AlwaysOperational, &config, &params, &reporter).unwrap();
        assert_eq!(flood.domain, grid.domain);
        assert_eq!(flood.stats.operational_points, 35);
        assert_eq!(flood.stats.evaluated_points, 35);
        assert_eq!(flood.stats.unclassified_points, 0);
    }

    #[test]
    fn flood_fill_requires_a_seed() {
        assert!(matches!(
            flood_fill(
                &AlwaysOperational,
                &gate_config(),
                &FloodFillParams::default(),
                &ProgressReporter::new()
            ),
            Err(EngineError::Config {
                source: ConfigError::InvalidParameter { name: "seeds", .. }
            })
        ));
        let random_only = FloodFillParams {
            random_seeds: 1,
            rng_seed: Some(8),
            ..FloodFillParams::default()
        };
        let sweep = flood_fill(&AlwaysOperational, &gate_config(), &random_only, &ProgressReporter::new())
            .unwrap();
        assert_eq!(sweep.stats.operational_points, 35);
    }

    #[test]
    fn seeds_outside_the_grid_are_rejected() {
        let params = FloodFillParams {
            seeds: vec![GridIndex::new(999, 0)],
            ..FloodFillParams::default()
        };
        assert!(matches!(
            flood_fill(&disk(), &disk_config(), &params, &ProgressReporter::new()),
            Err(EngineError::Config {
                source: ConfigError::InvalidParameter { name: "seeds", .. }
            })
        ));
    }

    #[test]
    fn random_sampling_is_reproducible_and_partial() {
        let config = disk_config();
        let reporter = ProgressReporter::new();
        let a = random_sampling(&disk(), &config, 30, Some(4), &reporter).unwrap();
        let b = random_sampling(&disk(), &config, 30, Some(4), &reporter).unwrap();
        assert_eq!(a.domain, b.domain);
        assert!(a.domain.len() <= 30);
        assert!(a.stats.evaluated_points == a.domain.len());
        assert!(a.domain.to_string().contains('?'));
    }

    #[test]
    fn progress_reports_one_increment_per_evaluated_point() {
        let events = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            events.lock().unwrap().push(event);
        }));
        let config = disk_config();
        let params = FloodFillParams {
            random_seeds: 0,
            seeds: vec![GridIndex::new(20, 7)],
            rng_seed: Some(2),
        };
        let sweep = flood_fill(&disk(), &config, &params, &reporter).unwrap();
        drop(reporter);

        let events = events.into_inner().unwrap();
        let increments = events
            .iter()
            .filter(|e| matches!(e, Progress::TaskIncrement))
            .count();
        assert_eq!(increments, sweep.stats.evaluated_points);
        assert!(events
            .iter()
            .any(|e| matches!(e, Progress::Message(m) if m == "1 of 1 seed points are operational")));
        assert!(matches!(events.first(), Some(Progress::PhaseStart { name: "Seeding" })));
        assert!(matches!(events.last(), Some(Progress::PhaseFinish)));
    }
}

use super::ChargeLayout;
use super::index::{ChargeIndexCodec, CodecError};
use super::validity::ValidityChecker;
use crate::core::models::coords::SiqadCoord;
use crate::core::models::layout::SidbLayout;
use crate::core::models::sidb::{ChargeState, Sidb};
use crate::core::physics::params::{ParameterError, SimulationParameters};
use crate::core::physics::potential::{distance_matrix, potential_matrix};
use nalgebra::DMatrix;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SurfaceError {
    #[error("Cached potentials are stale; call update_after_charge_change() before '{operation}'")]
    StaleCache { operation: &'static str },
    #[error("No dangling bond at {0}")]
    UnknownSite(SiqadCoord),
    #[error("Site index {index} is out of range for a surface with {len} sites")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("Invalid physical parameters: {0}")]
    Parameters(#[from] ParameterError),
    #[error("Charge index error: {0}")]
    Codec(#[from] CodecError),
}

/// Immutable per-layout data derived from site positions and physical parameters.
///
/// Computed once and shared read-only by every surface (and every thread) that
/// works on the same layout.
#[derive(Debug)]
pub struct SurfaceGeometry {
    sites: Vec<Sidb>,
    params: SimulationParameters,
    distances: DMatrix<f64>,
    potentials: DMatrix<f64>,
}

impl SurfaceGeometry {
    pub fn new(layout: &SidbLayout, params: &SimulationParameters) -> Result<Self, ParameterError> {
        params.validate()?;
        let coords: Vec<SiqadCoord> = layout.iter().map(|s| s.coord).collect();
        let distances = distance_matrix(&coords, &params.lattice);
        let potentials = potential_matrix(&distances, params);
        Ok(Self {
            sites: layout.sites().to_vec(),
            params: *params,
            distances,
            potentials,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn sites(&self) -> &[Sidb] {
        &self.sites
    }

    pub fn params(&self) -> &SimulationParameters {
        &self.params
    }

    #[inline]
    pub fn distance(&self, i: usize, j: usize) -> f64 {
        self.distances[(i, j)]
    }

    #[inline]
    pub fn potential(&self, i: usize, j: usize) -> f64 {
        self.potentials[(i, j)]
    }

    pub fn potentials(&self) -> &DMatrix<f64> {
        &self.potentials
    }

    pub fn index_of(&self, coord: &SiqadCoord) -> Option<usize> {
        self.sites.iter().position(|s| s.coord == *coord)
    }

    /// Local potentials of all sites when every site is negatively charged.
    pub fn all_negative_potentials(&self) -> Vec<f64> {
        (0..self.len())
            .map(|i| -self.potentials.row(i).sum())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// Local potentials and system energy match the charge assignment.
    Clean,
    /// A raw charge mutation happened since the last refresh.
    Stale,
}

/// Whether the dependent cell keeps its assigned charge or is re-derived on refresh.
///
/// Exact searches keep the default [`Fixed`](Self::Fixed) mode and enumerate
/// [`ChargeDistributionSurface::dependent_cell_states`] themselves.
/// [`Variable`](Self::Variable) lets callers that assign all other sites get the
/// relaxed state of the dependent cell for free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DependentCellMode {
    #[default]
    Fixed,
    Variable,
}

/// A layout together with a mutable charge assignment and its cached electrostatics.
///
/// Raw mutations ([`assign_charge_state`](Self::assign_charge_state) and friends)
/// only mark the caches stale. Reading the energy or asking for validity on a stale
/// surface is an error until [`update_after_charge_change`](Self::update_after_charge_change)
/// is called. [`set_charge_state`](Self::set_charge_state) instead keeps a clean
/// surface clean by updating the caches incrementally.
///
/// Cloning copies the charge assignment and caches; the geometry is shared.
#[derive(Debug, Clone)]
pub struct ChargeDistributionSurface {
    geometry: Arc<SurfaceGeometry>,
    charges: Vec<ChargeState>,
    local_potentials: Vec<f64>,
    system_energy: f64,
    cache: CacheState,
    dependent_cell: Option<usize>,
    dependent_mode: DependentCellMode,
    checker: ValidityChecker,
}

impl ChargeDistributionSurface {
    /// Creates a surface with every site negatively charged and clean caches.
    pub fn new(layout: &SidbLayout, params: &SimulationParameters) -> Result<Self, SurfaceError> {
        let geometry = SurfaceGeometry::new(layout, params)?;
        Ok(Self::from_geometry(Arc::new(geometry)))
    }

    pub fn from_geometry(geometry: Arc<SurfaceGeometry>) -> Self {
        let n = geometry.len();
        let mut surface = Self {
            geometry,
            charges: vec![ChargeState::Negative; n],
            local_potentials: vec![0.0; n],
            system_energy: 0.0,
            cache: CacheState::Stale,
            dependent_cell: None,
            dependent_mode: DependentCellMode::Fixed,
            checker: ValidityChecker::default(),
        };
        surface.update_after_charge_change();
        surface
    }

    pub fn with_checker(mut self, checker: ValidityChecker) -> Self {
        self.checker = checker;
        self
    }

    pub fn geometry(&self) -> &Arc<SurfaceGeometry> {
        &self.geometry
    }

    pub fn params(&self) -> &SimulationParameters {
        self.geometry.params()
    }

    #[inline]
    pub fn num_sites(&self) -> usize {
        self.charges.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.charges.is_empty()
    }

    pub fn sites(&self) -> &[Sidb] {
        self.geometry.sites()
    }

    #[inline]
    pub fn cache_state(&self) -> CacheState {
        self.cache
    }

    #[inline]
    pub fn is_clean(&self) -> bool {
        self.cache == CacheState::Clean
    }

    #[inline]
    pub fn charge_state(&self, index: usize) -> Option<ChargeState> {
        self.charges.get(index).copied()
    }

    /// Charge at `coord`, `None` if the coordinate hosts no dangling bond.
    pub fn charge_state_at(&self, coord: &SiqadCoord) -> Option<ChargeState> {
        self.geometry
            .index_of(coord)
            .map(|i| self.charges[i])
    }

    pub fn charge_states(&self) -> &[ChargeState] {
        &self.charges
    }

    /// Local potential as of the last refresh, `None` if there is no such site.
    #[inline]
    pub fn local_potential(&self, index: usize) -> Option<f64> {
        self.local_potentials.get(index).copied()
    }

    pub fn local_potential_at(&self, coord: &SiqadCoord) -> Option<f64> {
        self.geometry
            .index_of(coord)
            .map(|i| self.local_potentials[i])
    }

    pub fn local_potentials(&self) -> &[f64] {
        &self.local_potentials
    }

    /// Total electrostatic energy in eV.
    pub fn system_energy(&self) -> Result<f64, SurfaceError> {
        self.ensure_clean("system_energy")?;
        Ok(self.system_energy)
    }

    pub(crate) fn cached_energy(&self) -> f64 {
        self.system_energy
    }

    pub fn num_with_state(&self, state: ChargeState) -> usize {
        self.charges.iter().filter(|&&s| s == state).count()
    }

    /// Raw O(1) charge mutation. Marks the caches stale.
    pub fn assign_charge_state(&mut self, index: usize, state: ChargeState) -> Result<(), SurfaceError> {
        let len = self.charges.len();
        let slot = self
            .charges
            .get_mut(index)
            .ok_or(SurfaceError::IndexOutOfRange { index, len })?;
        *slot = state;
        self.cache = CacheState::Stale;
        Ok(())
    }

    pub fn assign_charge_state_at(
        &mut self,
        coord: &SiqadCoord,
        state: ChargeState,
    ) -> Result<(), SurfaceError> {
        let index = self
            .geometry
            .index_of(coord)
            .ok_or(SurfaceError::UnknownSite(*coord))?;
        self.assign_charge_state(index, state)
    }

    pub fn assign_charge_states(&mut self, states: &[ChargeState]) -> Result<(), SurfaceError> {
        if states.len() != self.charges.len() {
            return Err(CodecError::LengthMismatch {
                expected: self.charges.len(),
                actual: states.len(),
            }
            .into());
        }
        self.charges.copy_from_slice(states);
        self.cache = CacheState::Stale;
        Ok(())
    }

    pub fn assign_all_charge_states(&mut self, state: ChargeState) {
        self.charges.fill(state);
        self.cache = CacheState::Stale;
    }

    /// Changes one charge and keeps a clean surface clean.
    ///
    /// On a clean surface the local potentials are updated in O(n) and the
    /// energy in O(1). On a stale surface this is a raw assignment.
    pub fn set_charge_state(&mut self, index: usize, state: ChargeState) -> Result<(), SurfaceError> {
        let old = self.charge_state(index).ok_or(SurfaceError::IndexOutOfRange {
            index,
            len: self.charges.len(),
        })?;
        if old == state {
            return Ok(());
        }
        if self.cache == CacheState::Stale {
            self.charges[index] = state;
            return Ok(());
        }
        self.apply_delta(index, state);
        Ok(())
    }

    #[inline]
    fn apply_delta(&mut self, index: usize, state: ChargeState) {
        let delta = (state.sign() - self.charges[index].sign()) as f64;
        self.system_energy += delta * self.local_potentials[index];
        let column = self.geometry.potentials.column(index);
        for (v, p) in self.local_potentials.iter_mut().zip(column.iter()) {
            *v += p * delta;
        }
        self.charges[index] = state;
    }

    /// Recomputes local potentials and the system energy from scratch.
    ///
    /// In [`DependentCellMode::Variable`] the dependent cell's charge is first
    /// re-derived from the potential the other sites induce on it.
    pub fn update_after_charge_change(&mut self) {
        self.recompute_caches();
        if self.dependent_mode == DependentCellMode::Variable {
            if let Some(dependent) = self.dependent_cell {
                let params = *self.geometry.params();
                let state =
                    self.checker
                        .relaxed_state(self.local_potentials[dependent], &params, params.base);
                if state != self.charges[dependent] {
                    self.apply_delta(dependent, state);
                }
            }
        }
    }

    fn recompute_caches(&mut self) {
        let signs: Vec<f64> = self.charges.iter().map(|s| s.sign_f64()).collect();
        let mut energy = 0.0;
        for (i, v) in self.local_potentials.iter_mut().enumerate() {
            *v = self
                .geometry
                .potentials
                .row(i)
                .iter()
                .zip(&signs)
                .map(|(p, s)| p * s)
                .sum();
            energy += *v * signs[i];
        }
        self.system_energy = 0.5 * energy;
        self.cache = CacheState::Clean;
    }

    pub fn is_physically_valid(&self) -> Result<bool, SurfaceError> {
        self.ensure_clean("is_physically_valid")?;
        Ok(self.checker.is_physically_valid(self, self.geometry.params()))
    }

    pub fn is_population_stable(&self) -> Result<bool, SurfaceError> {
        self.ensure_clean("is_population_stable")?;
        Ok(self.checker.is_population_stable(self, self.geometry.params()))
    }

    pub fn charge_index(&self, codec: &ChargeIndexCodec) -> Result<u64, CodecError> {
        codec.encode(&self.charges)
    }

    /// Replaces the assignment with the decoding of `index` and refreshes the caches.
    pub fn assign_charge_index(
        &mut self,
        index: u64,
        codec: &ChargeIndexCodec,
    ) -> Result<(), SurfaceError> {
        codec.decode_into(index, &mut self.charges)?;
        self.cache = CacheState::Stale;
        self.update_after_charge_change();
        Ok(())
    }

    /// Steps to the next configuration in charge-index order.
    ///
    /// Caches are maintained incrementally if the surface is clean. Returns
    /// `false` once the assignment wraps around past the maximum index.
    pub fn increment_charge_index(&mut self, codec: &ChargeIndexCodec) -> Result<bool, SurfaceError> {
        let raised = codec.carry(&self.charges)?;
        let wrapped_from = raised.map_or(0, |(site, _)| site + 1);
        for site in wrapped_from..self.charges.len() {
            self.set_charge_state(site, ChargeState::Negative)?;
        }
        if let Some((site, state)) = raised {
            self.set_charge_state(site, state)?;
        }
        Ok(raised.is_some())
    }

    pub fn set_dependent_cell(&mut self, index: usize) -> Result<(), SurfaceError> {
        if index >= self.charges.len() {
            return Err(SurfaceError::IndexOutOfRange {
                index,
                len: self.charges.len(),
            });
        }
        self.dependent_cell = Some(index);
        Ok(())
    }

    pub fn dependent_cell(&self) -> Option<usize> {
        self.dependent_cell
    }

    /// States of a `base`-state search space in which the dependent cell is stable,
    /// given the potential all other sites induce on it. Empty without a dependent cell.
    pub fn dependent_cell_states(&self, base: u8) -> Result<Vec<ChargeState>, SurfaceError> {
        self.ensure_clean("dependent_cell_states")?;
        let Some(dependent) = self.dependent_cell else {
            return Ok(Vec::new());
        };
        let params = self.geometry.params();
        Ok(self
            .checker
            .admissible_states(self.local_potentials[dependent], params, base)
            .collect())
    }

    pub fn set_dependent_mode(&mut self, mode: DependentCellMode) {
        self.dependent_mode = mode;
    }

    pub fn dependent_mode(&self) -> DependentCellMode {
        self.dependent_mode
    }

    fn ensure_clean(&self, operation: &'static str) -> Result<(), SurfaceError> {
        match self.cache {
            CacheState::Clean => Ok(()),
            CacheState::Stale => Err(SurfaceError::StaleCache { operation }),
        }
    }
}

impl ChargeLayout for ChargeDistributionSurface {
    fn num_sites(&self) -> usize {
        self.charges.len()
    }

    fn site_coord(&self, index: usize) -> Option<SiqadCoord> {
        self.geometry.sites.get(index).map(|s| s.coord)
    }

    fn charge_state(&self, index: usize) -> Option<ChargeState> {
        self.charges.get(index).copied()
    }

    fn local_potential(&self, index: usize) -> Option<f64> {
        self.local_potentials.get(index).copied()
    }

    fn pair_potential(&self, i: usize, j: usize) -> f64 {
        self.geometry.potential(i, j)
    }
}

use crate::core::charge::surface::{ChargeDistributionSurface, SurfaceError, SurfaceGeometry};
use crate::core::charge::validity::ValidityChecker;
use crate::core::models::layout::SidbLayout;
use crate::core::models::sidb::ChargeState;
use crate::core::physics::params::SimulationParameters;
use crate::engine::config::ClusterCompleteConfig;
use crate::engine::error::EngineError;
use crate::engine::result::{SearchStatus, SimulationResult};
use crate::engine::search::{ChargeSearch, SimulationEngine};
use crate::engine::utils::deadline::Deadline;
use itertools::Itertools;
use kiddo::{KdTree, SquaredEuclidean};
use std::sync::Arc;
use tracing::{debug, info, instrument, trace, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

const DEADLINE_POLL_INTERVAL: u64 = 256;

/// Exact search over spatial clusters of sites.
///
/// Sites within the configured radius are merged into clusters (single
/// linkage, nearest pairs first, capped at the maximum cluster size). Each
/// cluster enumerates its local charge assignments; assignments that cannot be
/// stable under any combination of the other clusters' surviving assignments
/// are discarded until nothing changes. The survivors are composed depth-first
/// across clusters with the same bound test, and complete assignments are
/// checked for physical validity.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClusterComplete {
    config: ClusterCompleteConfig,
}

impl ClusterComplete {
    pub fn new(config: ClusterCompleteConfig) -> Self {
        Self { config }
    }
}

impl ChargeSearch for ClusterComplete {
    fn engine(&self) -> SimulationEngine {
        SimulationEngine::ClusterComplete
    }

    #[instrument(skip_all, name = "cluster_complete", fields(sites = layout.len()))]
    fn search(
        &self,
        layout: &SidbLayout,
        params: &SimulationParameters,
    ) -> Result<SimulationResult, EngineError> {
        let deadline = Deadline::new(self.config.timeout);
        params.validate()?;

        if layout.is_empty() {
            return Ok(SimulationResult::new(
                SimulationEngine::ClusterComplete,
                Vec::new(),
                SearchStatus::Complete,
                deadline.elapsed(),
                *params,
            ));
        }

        let geometry = Arc::new(SurfaceGeometry::new(layout, params)?);
        let checker = ValidityChecker::default();
        let partition = partition_sites(
            &geometry,
            self.config.cluster_radius_nm,
            self.config.max_cluster_size,
        );
        let largest = partition.iter().map(Vec::len).max().unwrap_or(0);
        debug!(
            clusters = partition.len(),
            largest_cluster = largest,
            "Partitioned sites."
        );

        let mut clusters: Vec<Cluster> = partition
            .into_iter()
            .map(|sites| Cluster::enumerate(sites, params.base))
            .collect();

        let mut timed_out = !prune_to_fixpoint(&mut clusters, &geometry, &checker, &deadline);
        let mut found = Vec::new();

        if !timed_out && clusters.iter().all(|c| !c.candidates.is_empty()) {
            let composer = Composer::new(&clusters, Arc::clone(&geometry), checker, deadline);
            let (configs, expired) = composer.run()?;
            found = configs;
            timed_out = expired;
        }

        let status = if timed_out {
            warn!("ClusterComplete hit its time limit, returning a partial result.");
            SearchStatus::TimedOut
        } else {
            SearchStatus::Complete
        };

        let result = SimulationResult::new(
            SimulationEngine::ClusterComplete,
            found,
            status,
            deadline.elapsed(),
            *params,
        )
        .with_additional("num_clusters", clusters.len())
        .with_additional("largest_cluster", largest);

        info!(
            valid = result.len(),
            runtime_ms = result.runtime.as_millis() as u64,
            "ClusterComplete finished."
        );
        Ok(result)
    }
}

/// Groups site indices into clusters of at most `max_size` sites.
///
/// Pairs closer than `radius_nm` are merged in order of increasing distance;
/// a merge that would exceed `max_size` is skipped. Clusters are returned in
/// order of their smallest site index, each with ascending indices.
fn partition_sites(geometry: &SurfaceGeometry, radius_nm: f64, max_size: usize) -> Vec<Vec<usize>> {
    let n = geometry.len();
    let lattice = geometry.params().lattice;
    let points: Vec<[f64; 2]> = geometry
        .sites()
        .iter()
        .map(|s| {
            let p = s.coord.position_nm(&lattice);
            [p.x, p.y]
        })
        .collect();
    let tree: KdTree<f64, 2> = (&points).into();

    let mut edges: Vec<(f64, usize, usize)> = Vec::new();
    for (i, p) in points.iter().enumerate() {
        for neighbour in tree.within_unsorted::<SquaredEuclidean>(p, radius_nm * radius_nm) {
            let j = neighbour.item as usize;
            if i < j {
                edges.push((geometry.distance(i, j), i, j));
            }
        }
    }
    edges.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));

    let mut sets = DisjointSets::new(n);
    for (_, i, j) in edges {
        sets.union_capped(i, j, max_size);
    }

    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut slot_of_root = vec![usize::MAX; n];
    for i in 0..n {
        let root = sets.find(i);
        if slot_of_root[root] == usize::MAX {
            slot_of_root[root] = groups.len();
            groups.push(Vec::new());
        }
        groups[slot_of_root[root]].push(i);
    }
    groups
}

struct DisjointSets {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl DisjointSets {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            size: vec![1; n],
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union_capped(&mut self, a: usize, b: usize, cap: usize) -> bool {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb || self.size[ra] + self.size[rb] > cap {
            return false;
        }
        let (big, small) = if self.size[ra] >= self.size[rb] { (ra, rb) } else { (rb, ra) };
        self.parent[small] = big;
        self.size[big] += self.size[small];
        true
    }
}

#[derive(Debug, Clone)]
struct Cluster {
    sites: Vec<usize>,
    /// Surviving local assignments, in charge-index order.
    candidates: Vec<Vec<ChargeState>>,
}

impl Cluster {
    fn enumerate(sites: Vec<usize>, base: u8) -> Self {
        let states = ChargeState::states_for_base(base);
        let candidates = sites
            .iter()
            .map(|_| states.iter().copied())
            .multi_cartesian_product()
            .collect();
        Self { sites, candidates }
    }

    /// Potential at `site` induced by this cluster under `candidate`.
    #[inline]
    fn contribution(&self, geometry: &SurfaceGeometry, candidate: &[ChargeState], site: usize) -> f64 {
        self.sites
            .iter()
            .zip(candidate)
            .map(|(&k, state)| geometry.potential(site, k) * state.sign_f64())
            .sum()
    }

    /// Smallest and largest contribution of this cluster to every site's potential.
    fn contribution_bounds(&self, geometry: &SurfaceGeometry) -> Vec<(f64, f64)> {
        (0..geometry.len())
            .map(|site| {
                self.candidates
                    .iter()
                    .map(|c| self.contribution(geometry, c, site))
                    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                        (lo.min(v), hi.max(v))
                    })
            })
            .collect()
    }
}

/// Filters cluster candidates until no further candidate can be excluded.
///
/// Returns `false` if the deadline expired first.
fn prune_to_fixpoint(
    clusters: &mut [Cluster],
    geometry: &SurfaceGeometry,
    checker: &ValidityChecker,
    deadline: &Deadline,
) -> bool {
    let params = *geometry.params();
    let n = geometry.len();
    let mut cluster_of = vec![0; n];
    for (c, cluster) in clusters.iter().enumerate() {
        for &s in &cluster.sites {
            cluster_of[s] = c;
        }
    }

    let mut round = 0usize;
    loop {
        if deadline.is_expired() {
            return false;
        }
        round += 1;

        #[cfg(not(feature = "parallel"))]
        let iterator = clusters.iter();

        #[cfg(feature = "parallel")]
        let iterator = clusters.par_iter();

        let bounds: Vec<Vec<(f64, f64)>> = iterator.map(|c| c.contribution_bounds(geometry)).collect();

        let external: Vec<(f64, f64)> = (0..n)
            .map(|site| {
                bounds
                    .iter()
                    .enumerate()
                    .filter(|&(c, _)| c != cluster_of[site])
                    .fold((0.0, 0.0), |(lo, hi), (_, b)| (lo + b[site].0, hi + b[site].1))
            })
            .collect();

        #[cfg(not(feature = "parallel"))]
        let iterator = clusters.iter_mut();

        #[cfg(feature = "parallel")]
        let iterator = clusters.par_iter_mut();

        let removed: usize = iterator
            .map(|cluster| {
                let before = cluster.candidates.len();
                let keep: Vec<Vec<ChargeState>> = cluster
                    .candidates
                    .iter()
                    .filter(|candidate| {
                        cluster.sites.iter().zip(candidate.iter()).all(|(&site, &state)| {
                            let own = cluster.contribution(geometry, candidate, site);
                            let (lo, hi) = external[site];
                            checker.may_be_stable(state, own + lo, own + hi, &params)
                        })
                    })
                    .cloned()
                    .collect();
                cluster.candidates = keep;
                before - cluster.candidates.len()
            })
            .sum();

        trace!(round, removed, "Pruning round.");
        if removed == 0 || clusters.iter().any(|c| c.candidates.is_empty()) {
            debug!(
                rounds = round,
                candidates = clusters.iter().map(|c| c.candidates.len()).sum::<usize>(),
                "Cluster candidates settled."
            );
            return true;
        }
    }
}

/// Depth-first composition of cluster candidates into full configurations.
struct Composer<'a> {
    clusters: &'a [Cluster],
    geometry: Arc<SurfaceGeometry>,
    checker: ValidityChecker,
    deadline: Deadline,
    /// `remaining[k][i]`: bounds on the potential at site `i` induced by clusters `k..`.
    remaining: Vec<Vec<(f64, f64)>>,
}

struct Branch {
    charges: Vec<ChargeState>,
    partial: Vec<f64>,
    assigned: Vec<usize>,
    cds: ChargeDistributionSurface,
    found: Vec<ChargeDistributionSurface>,
    nodes: u64,
    timed_out: bool,
}

impl<'a> Composer<'a> {
    fn new(
        clusters: &'a [Cluster],
        geometry: Arc<SurfaceGeometry>,
        checker: ValidityChecker,
        deadline: Deadline,
    ) -> Self {
        let n = geometry.len();
        let mut remaining = vec![vec![(0.0, 0.0); n]; clusters.len() + 1];
        for k in (0..clusters.len()).rev() {
            let bounds = clusters[k].contribution_bounds(&geometry);
            for i in 0..n {
                remaining[k][i] = (
                    remaining[k + 1][i].0 + bounds[i].0,
                    remaining[k + 1][i].1 + bounds[i].1,
                );
            }
        }
        Self {
            clusters,
            geometry,
            checker,
            deadline,
            remaining,
        }
    }

    fn run(&self) -> Result<(Vec<ChargeDistributionSurface>, bool), SurfaceError> {
        let first = &self.clusters[0].candidates;

        #[cfg(not(feature = "parallel"))]
        let iterator = first.iter();

        #[cfg(feature = "parallel")]
        let iterator = first.par_iter();

        let branches: Vec<Result<Branch, SurfaceError>> = iterator
            .map(|candidate| -> Result<Branch, SurfaceError> {
                let mut branch = self.branch();
                if self.place(&mut branch, 0, candidate) {
                    self.descend(&mut branch, 1)?;
                }
                Ok(branch)
            })
            .collect();

        let mut found = Vec::new();
        let mut timed_out = false;
        for branch in branches {
            let branch = branch?;
            timed_out |= branch.timed_out;
            found.extend(branch.found);
        }
        Ok((found, timed_out))
    }

    fn branch(&self) -> Branch {
        let n = self.geometry.len();
        Branch {
            charges: vec![ChargeState::Negative; n],
            partial: vec![0.0; n],
            assigned: Vec::with_capacity(n),
            cds: ChargeDistributionSurface::from_geometry(Arc::clone(&self.geometry)),
            found: Vec::new(),
            nodes: 0,
            timed_out: false,
        }
    }

    /// Applies `candidate` of cluster `k` and reports whether the branch stays feasible.
    fn place(&self, branch: &mut Branch, k: usize, candidate: &[ChargeState]) -> bool {
        let cluster = &self.clusters[k];
        for (&site, &state) in cluster.sites.iter().zip(candidate) {
            branch.charges[site] = state;
            branch.assigned.push(site);
            let sign = state.sign_f64();
            if sign != 0.0 {
                for (i, v) in branch.partial.iter_mut().enumerate() {
                    *v += sign * self.geometry.potential(i, site);
                }
            }
        }

        let params = self.geometry.params();
        let rest = &self.remaining[k + 1];
        branch.assigned.iter().all(|&a| {
            self.checker.may_be_stable(
                branch.charges[a],
                branch.partial[a] + rest[a].0,
                branch.partial[a] + rest[a].1,
                params,
            )
        })
    }

    fn unplace(&self, branch: &mut Branch, k: usize, candidate: &[ChargeState]) {
        let cluster = &self.clusters[k];
        for (&site, &state) in cluster.sites.iter().zip(candidate) {
            let sign = state.sign_f64();
            if sign != 0.0 {
                for (i, v) in branch.partial.iter_mut().enumerate() {
                    *v -= sign * self.geometry.potential(i, site);
                }
            }
            branch.charges[site] = ChargeState::Negative;
        }
        let keep = branch.assigned.len() - cluster.sites.len();
        branch.assigned.truncate(keep);
    }

    fn descend(&self, branch: &mut Branch, k: usize) -> Result<(), SurfaceError> {
        branch.nodes += 1;
        if branch.nodes % DEADLINE_POLL_INTERVAL == 0 && self.deadline.is_expired() {
            branch.timed_out = true;
        }
        if branch.timed_out {
            return Ok(());
        }
        if k == self.clusters.len() {
            branch.cds.assign_charge_states(&branch.charges)?;
            branch.cds.update_after_charge_change();
            if branch.cds.is_physically_valid()? {
                branch.found.push(branch.cds.clone());
            }
            return Ok(());
        }

        for candidate in &self.clusters[k].candidates {
            let feasible = self.place(branch, k, candidate);
            let result = if feasible {
                self.descend(branch, k + 1)
            } else {
                Ok(())
            };
            self.unplace(branch, k, candidate);
            result?;
        }
        Ok(())
    }
}

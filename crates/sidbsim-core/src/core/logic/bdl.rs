use crate::core::charge::surface::ChargeDistributionSurface;
use crate::core::models::coords::{LatticeConstants, SiqadCoord};
use crate::core::models::layout::SidbLayout;
use crate::core::models::sidb::{ChargeState, SiteKind};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BdlParams {
    /// Maximum distance in nm between the two dots of a pair.
    pub pair_threshold_nm: f64,
    /// Maximum distance in nm between facing dots of consecutive pairs in a wire.
    pub wire_interdistance_nm: f64,
    pub lattice: LatticeConstants,
}

impl Default for BdlParams {
    fn default() -> Self {
        Self {
            pair_threshold_nm: 2.0,
            wire_interdistance_nm: 2.0,
            lattice: LatticeConstants::default(),
        }
    }
}

/// Two closely spaced dots of one site kind, `upper < lower` in coordinate order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BdlPair {
    pub upper: SiqadCoord,
    pub lower: SiqadCoord,
    pub kind: SiteKind,
}

impl BdlPair {
    pub fn new(kind: SiteKind, a: SiqadCoord, b: SiqadCoord) -> Self {
        let (upper, lower) = if a <= b { (a, b) } else { (b, a) };
        Self { upper, lower, kind }
    }

    #[inline]
    pub fn same_position(&self, other: &BdlPair) -> bool {
        self.upper == other.upper && self.lower == other.lower
    }

    #[inline]
    fn has_same_y(&self, other: &BdlPair) -> bool {
        self.upper.y == other.upper.y && self.lower.y == other.lower.y
    }

    /// Whether the pair's charges encode `bit` when read along a wire with `port`.
    ///
    /// For SOUTH, EAST and undetermined ports bit one is a neutral upper dot over a
    /// negative lower dot and bit zero the reverse. NORTH and WEST swap the roles.
    pub fn encodes_bit(&self, cds: &ChargeDistributionSurface, port: PortDirection, bit: bool) -> bool {
        let (Some(upper), Some(lower)) = (
            cds.charge_state_at(&self.upper),
            cds.charge_state_at(&self.lower),
        ) else {
            return false;
        };
        let lower_carries_one = matches!(
            port,
            PortDirection::South | PortDirection::East | PortDirection::None
        );
        let (negative, neutral) = if bit == lower_carries_one {
            (lower, upper)
        } else {
            (upper, lower)
        };
        negative == ChargeState::Negative && neutral == ChargeState::Neutral
    }
}

impl fmt::Display for BdlPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} BDL [{} | {}]", self.kind, self.upper, self.lower)
    }
}

/// Pairs up the dots of `kind` greedily by ascending distance.
///
/// Each dot joins at most one pair and pairs farther apart than the threshold are
/// never formed. The result is sorted by coordinates.
pub fn detect_bdl_pairs(layout: &SidbLayout, kind: SiteKind, params: &BdlParams) -> Vec<BdlPair> {
    let dots = layout.coords_of_kind(kind);
    let mut candidates = Vec::with_capacity(dots.len() * dots.len().saturating_sub(1) / 2);
    for (i, a) in dots.iter().enumerate() {
        for b in &dots[i + 1..] {
            candidates.push((a.distance_nm(b, &params.lattice), *a, *b));
        }
    }
    candidates.sort_by(|x, y| x.0.total_cmp(&y.0));

    let mut paired = BTreeSet::new();
    let mut pairs = Vec::new();
    for (distance, a, b) in candidates {
        if distance > params.pair_threshold_nm {
            break;
        }
        if paired.contains(&a) || paired.contains(&b) {
            continue;
        }
        paired.insert(a);
        paired.insert(b);
        pairs.push(BdlPair::new(kind, a, b));
    }
    pairs.sort();
    pairs
}

/// Reading direction of a BDL wire, from its input end towards its output end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PortDirection {
    North,
    East,
    South,
    West,
    #[default]
    None,
}

/// Which wires [`detect_bdl_wires`] returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireSelection {
    All,
    /// Wires holding an input pair, with any output pairs removed.
    Input,
    /// Wires holding an output pair, with any input pairs removed.
    Output,
}

/// A chain of BDL pairs that carries one signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BdlWire {
    pub pairs: Vec<BdlPair>,
    pub port: PortDirection,
}

impl BdlWire {
    /// Builds a wire from its pairs; distances for the port are measured on `lattice`.
    pub fn from_pairs(mut pairs: Vec<BdlPair>, lattice: &LatticeConstants) -> Self {
        pairs.sort();
        let port = determine_port(&pairs, lattice);
        Self { pairs, port }
    }

    pub fn contains(&self, pair: &BdlPair) -> bool {
        self.pairs.iter().any(|p| p.same_position(pair))
    }

    pub fn first_of_kind(&self, kind: SiteKind) -> Option<&BdlPair> {
        self.pairs.iter().find(|p| p.kind == kind)
    }

    fn has_kind(&self, kind: SiteKind) -> bool {
        self.pairs.iter().any(|p| p.kind == kind)
    }
}

fn farthest_by_lower<'a>(
    pairs: &'a [BdlPair],
    anchor: &SiqadCoord,
    lattice: &LatticeConstants,
) -> Option<&'a BdlPair> {
    let mut best = None;
    let mut max_distance = 0.0;
    for pair in pairs {
        let distance = pair.lower.distance_nm(anchor, lattice);
        if distance > max_distance {
            max_distance = distance;
            best = Some(pair);
        }
    }
    best
}

fn determine_port(pairs: &[BdlPair], lattice: &LatticeConstants) -> PortDirection {
    if pairs.len() < 2 || pairs.iter().all(|p| p.kind == SiteKind::Normal) {
        return PortDirection::None;
    }
    let input = pairs.iter().find(|p| p.kind == SiteKind::Input);
    let output = pairs.iter().find(|p| p.kind == SiteKind::Output);

    match (input, output) {
        (Some(first), Some(last)) => {
            if first < last {
                if first.lower.y == last.lower.y || first.upper.y == last.upper.y {
                    PortDirection::East
                } else {
                    PortDirection::South
                }
            } else if first.same_position(last) {
                PortDirection::None
            } else if first.has_same_y(last) {
                PortDirection::West
            } else {
                PortDirection::North
            }
        }
        (Some(first), None) => {
            let Some(last) = farthest_by_lower(pairs, &first.lower, lattice) else {
                return PortDirection::None;
            };
            if first.lower.x < last.lower.x && first.has_same_y(last) {
                PortDirection::East
            } else if first.lower.y > last.lower.y {
                PortDirection::North
            } else if first.lower.x > last.lower.x && first.has_same_y(last) {
                PortDirection::West
            } else {
                PortDirection::South
            }
        }
        (None, Some(last)) => {
            let Some(first) = farthest_by_lower(pairs, &last.upper, lattice) else {
                return PortDirection::None;
            };
            if last.lower.x < first.lower.x && last.has_same_y(first) {
                PortDirection::West
            } else if last.lower.y > first.lower.y {
                PortDirection::South
            } else if last.lower.x > first.lower.x && last.has_same_y(first) {
                PortDirection::East
            } else {
                PortDirection::North
            }
        }
        (None, None) => PortDirection::None,
    }
}

fn find_neighbor(
    current: &BdlPair,
    remaining: &BTreeSet<BdlPair>,
    params: &BdlParams,
    below: bool,
) -> Option<BdlPair> {
    let threshold = params.wire_interdistance_nm;
    remaining
        .iter()
        .find(|candidate| {
            let facing_down = current.lower.distance_nm(&candidate.upper, &params.lattice) < threshold;
            let facing_up = current.upper.distance_nm(&candidate.lower, &params.lattice) < threshold
                && !current.same_position(candidate)
                && (if below { *current < **candidate } else { *current > **candidate });
            facing_down || facing_up
        })
        .copied()
}

/// Chains the input, output and normal BDL pairs of `layout` into wires.
pub fn detect_bdl_wires(layout: &SidbLayout, params: &BdlParams, selection: WireSelection) -> Vec<BdlWire> {
    let mut remaining: BTreeSet<BdlPair> = [SiteKind::Input, SiteKind::Output, SiteKind::Normal]
        .into_iter()
        .flat_map(|kind| detect_bdl_pairs(layout, kind, params))
        .collect();

    let mut wires = Vec::new();
    while let Some(start) = remaining.pop_first() {
        let mut chain = vec![start];
        let mut current = start;
        while let Some(next) = find_neighbor(&current, &remaining, params, true)
            .or_else(|| find_neighbor(&current, &remaining, params, false))
        {
            remaining.remove(&next);
            chain.push(next);
            current = next;
        }
        wires.push(BdlWire::from_pairs(chain, &params.lattice));
    }

    let (keep, drop) = match selection {
        WireSelection::All => return wires,
        WireSelection::Input => (SiteKind::Input, SiteKind::Output),
        WireSelection::Output => (SiteKind::Output, SiteKind::Input),
    };
    wires
        .into_iter()
        .filter(|w| w.has_kind(keep))
        .map(|mut w| {
            w.pairs.retain(|p| p.kind != drop);
            w
        })
        .collect()
}

/// Port of the wire holding `pair`, [`PortDirection::None`] if no wire holds it.
pub fn port_of(wires: &[BdlWire], pair: &BdlPair) -> PortDirection {
    wires
        .iter()
        .find(|w| w.contains(pair))
        .map_or(PortDirection::None, |w| w.port)
}

/// Enumerates the layouts that apply every input pattern to a gate.
///
/// For pattern `p`, bit `i` drives `input_pairs[k - 1 - i]` where `k` is the
/// number of input pairs. A set bit keeps the dot that encodes one along the
/// pair's wire and removes the other.
#[derive(Debug, Clone)]
pub struct BdlInputPatterns<'a> {
    layout: &'a SidbLayout,
    input_pairs: Vec<BdlPair>,
    ports: Vec<PortDirection>,
}

impl<'a> BdlInputPatterns<'a> {
    pub fn new(layout: &'a SidbLayout, params: &BdlParams) -> Self {
        let input_pairs = detect_bdl_pairs(layout, SiteKind::Input, params);
        let input_wires = detect_bdl_wires(layout, params, WireSelection::Input);
        let ports = input_pairs.iter().map(|p| port_of(&input_wires, p)).collect();
        Self {
            layout,
            input_pairs,
            ports,
        }
    }

    pub fn input_pairs(&self) -> &[BdlPair] {
        &self.input_pairs
    }

    #[inline]
    pub fn num_inputs(&self) -> usize {
        self.input_pairs.len()
    }

    pub fn num_patterns(&self) -> u64 {
        1u64 << self.input_pairs.len().min(63)
    }

    /// Input pair driven by bit `bit` together with its port.
    pub fn pair_for_bit(&self, bit: usize) -> Option<(&BdlPair, PortDirection)> {
        let k = self.input_pairs.len();
        let index = k.checked_sub(bit + 1)?;
        Some((&self.input_pairs[index], self.ports[index]))
    }

    pub fn pattern(&self, pattern: u64) -> SidbLayout {
        let mut layout = self.layout.clone();
        for bit in 0..self.num_inputs() {
            let Some((pair, port)) = self.pair_for_bit(bit) else {
                continue;
            };
            let one = bit < 64 && pattern & (1u64 << bit) != 0;
            let lower_carries_one = matches!(
                port,
                PortDirection::South | PortDirection::East | PortDirection::None
            );
            let (kept, removed) = if one == lower_carries_one {
                (pair.lower, pair.upper)
            } else {
                (pair.upper, pair.lower)
            };
            layout.assign_kind(removed, SiteKind::Empty);
            layout.assign_kind(kept, SiteKind::Input);
        }
        layout
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, SidbLayout)> + '_ {
        (0..self.num_patterns()).map(move |p| (p, self.pattern(p)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(x: i32, y: i32, z: u8) -> SiqadCoord {
        SiqadCoord::new(x, y, z)
    }

    fn horizontal_wire() -> SidbLayout {
        SidbLayout::from_sites([
            (c(0, 0, 0), SiteKind::Input),
            (c(3, 0, 0), SiteKind::Input),
            (c(6, 0, 0), SiteKind::Normal),
            (c(8, 0, 0), SiteKind::Normal),
            (c(12, 0, 0), SiteKind::Normal),
            (c(14, 0, 0), SiteKind::Normal),
            (c(18, 0, 0), SiteKind::Output),
            (c(20, 0, 0), SiteKind::Output),
            (c(24, 0, 0), SiteKind::Normal),
        ])
    }

    #[test]
    fn pairs_are_formed_within_threshold_only() {
        let layout = horizontal_wire();
        let params = BdlParams::default();
        let normal = detect_bdl_pairs(&layout, SiteKind::Normal, &params);
        assert_eq!(
            normal,
            vec![
                BdlPair::new(SiteKind::Normal, c(6, 0, 0), c(8, 0, 0)),
                BdlPair::new(SiteKind::Normal, c(12, 0, 0), c(14, 0, 0)),
            ]
        );
        let input = detect_bdl_pairs(&layout, SiteKind::Input, &params);
        assert_eq!(input[0].upper, c(0, 0, 0));
        assert_eq!(input[0].lower, c(3, 0, 0));
    }

    #[test]
    fn closest_dots_are_paired_first() {
        let layout = SidbLayout::from_sites([
            (c(0, 0, 0), SiteKind::Input),
            (c(2, 0, 0), SiteKind::Input),
            (c(3, 0, 0), SiteKind::Input),
        ]);
        let pairs = detect_bdl_pairs(&layout, SiteKind::Input, &BdlParams::default());
        assert_eq!(pairs, vec![BdlPair::new(SiteKind::Input, c(2, 0, 0), c(3, 0, 0))]);
    }

    #[test]
    fn horizontal_wire_reads_east() {
        let wires = detect_bdl_wires(&horizontal_wire(), &BdlParams::default(), WireSelection::All);
        assert_eq!(wires.len(), 1);
        assert_eq!(wires[0].pairs.len(), 4);
        assert_eq!(wires[0].port, PortDirection::East);
    }

    #[test]
    fn selection_strips_opposite_io_pairs_but_keeps_port() {
        let params = BdlParams::default();
        let layout = horizontal_wire();
        let input = detect_bdl_wires(&layout, &params, WireSelection::Input);
        assert_eq!(input.len(), 1);
        assert!(input[0].first_of_kind(SiteKind::Output).is_none());
        assert_eq!(input[0].pairs.len(), 3);
        assert_eq!(input[0].port, PortDirection::East);

        let output = detect_bdl_wires(&layout, &params, WireSelection::Output);
        assert!(output[0].first_of_kind(SiteKind::Input).is_none());
        assert!(output[0].first_of_kind(SiteKind::Output).is_some());
    }

    #[test]
    fn vertical_wire_reads_south() {
        let layout = SidbLayout::from_sites([
            (c(0, 0, 0), SiteKind::Input),
            (c(0, 1, 0), SiteKind::Input),
            (c(0, 2, 0), SiteKind::Normal),
            (c(0, 3, 0), SiteKind::Normal),
            (c(0, 4, 0), SiteKind::Output),
            (c(0, 5, 0), SiteKind::Output),
        ]);
        let wires = detect_bdl_wires(&layout, &BdlParams::default(), WireSelection::All);
        assert_eq!(wires.len(), 1);
        assert_eq!(wires[0].port, PortDirection::South);
    }

    #[test]
    fn input_only_wire_pointing_left_reads_west() {
        let layout = SidbLayout::from_sites([
            (c(14, 0, 0), SiteKind::Normal),
            (c(16, 0, 0), SiteKind::Normal),
            (c(20, 0, 0), SiteKind::Input),
            (c(22, 0, 0), SiteKind::Input),
        ]);
        let wires = detect_bdl_wires(&layout, &BdlParams::default(), WireSelection::Input);
        assert_eq!(wires.len(), 1);
        assert_eq!(wires[0].port, PortDirection::West);
    }

    #[test]
    fn port_of_input_only_wire_uses_the_given_lattice() {
        let pairs = vec![
            BdlPair::new(SiteKind::Input, c(0, 0, 0), c(2, 0, 0)),
            BdlPair::new(SiteKind::Normal, c(10, 0, 0), c(12, 0, 0)),
            BdlPair::new(SiteKind::Normal, c(0, 4, 0), c(2, 4, 0)),
        ];
        let silicon = BdlWire::from_pairs(pairs.clone(), &LatticeConstants::default());
        assert_eq!(silicon.port, PortDirection::East);

        let narrow_columns = LatticeConstants {
            a: 0.1,
            ..LatticeConstants::default()
        };
        let narrow = BdlWire::from_pairs(pairs, &narrow_columns);
        assert_eq!(narrow.port, PortDirection::South);
    }

    #[test]
    fn input_patterns_keep_the_dot_encoding_the_bit() {
        let layout = horizontal_wire();
        let patterns = BdlInputPatterns::new(&layout, &BdlParams::default());
        assert_eq!(patterns.num_inputs(), 1);
        assert_eq!(patterns.num_patterns(), 2);

        let zero = patterns.pattern(0);
        assert_eq!(zero.kind_at(&c(0, 0, 0)), SiteKind::Input);
        assert_eq!(zero.kind_at(&c(3, 0, 0)), SiteKind::Empty);
        assert_eq!(zero.len(), layout.len() - 1);

        let one = patterns.pattern(1);
        assert_eq!(one.kind_at(&c(0, 0, 0)), SiteKind::Empty);
        assert_eq!(one.kind_at(&c(3, 0, 0)), SiteKind::Input);
    }

    #[test]
    fn bit_encoding_depends_on_port() {
        use crate::core::models::sidb::ChargeState::{Negative as N, Neutral as Z};
        use crate::core::physics::params::SimulationParameters;

        let layout = SidbLayout::from_normal_sites([c(0, 0, 0), c(2, 0, 0)]);
        let pair = BdlPair::new(SiteKind::Normal, c(0, 0, 0), c(2, 0, 0));
        let mut cds =
            ChargeDistributionSurface::new(&layout, &SimulationParameters::default()).unwrap();
        cds.assign_charge_states(&[Z, N]).unwrap();
        assert!(pair.encodes_bit(&cds, PortDirection::East, true));
        assert!(!pair.encodes_bit(&cds, PortDirection::East, false));
        assert!(pair.encodes_bit(&cds, PortDirection::West, false));
        assert!(pair.encodes_bit(&cds, PortDirection::North, false));

        cds.assign_charge_states(&[N, N]).unwrap();
        assert!(!pair.encodes_bit(&cds, PortDirection::South, true));
        assert!(!pair.encodes_bit(&cds, PortDirection::South, false));
    }
}

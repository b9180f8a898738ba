use super::coords::SiqadCoord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of a dangling bond within a layout.
///
/// The role is only relevant for logic-level operations such as BDL pair
/// detection and input pattern generation. The physical simulation treats all
/// occupied sites alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SiteKind {
    /// No dangling bond at this location. Assigning this kind removes a site.
    Empty,
    /// An ordinary dangling bond.
    Normal,
    /// A dangling bond belonging to an input BDL pair.
    Input,
    /// A dangling bond belonging to an output BDL pair.
    Output,
}

impl fmt::Display for SiteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SiteKind::Empty => "empty",
            SiteKind::Normal => "normal",
            SiteKind::Input => "input",
            SiteKind::Output => "output",
        };
        f.write_str(s)
    }
}

/// A single dangling bond: an immutable position plus its role tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sidb {
    pub coord: SiqadCoord,
    pub kind: SiteKind,
}

impl Sidb {
    pub const fn new(coord: SiqadCoord, kind: SiteKind) -> Self {
        Self { coord, kind }
    }
}

/// Charge held by a dangling bond.
///
/// The derived ordering (`Negative < Neutral < Positive`) matches the digit
/// order of the charge index, so sorting charge vectors lexicographically
/// sorts configurations by charge index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChargeState {
    /// One extra electron (sign `-1`).
    Negative,
    /// Charge-neutral (sign `0`).
    Neutral,
    /// One missing electron (sign `+1`).
    Positive,
}

impl ChargeState {
    pub const ALL: [ChargeState; 3] = [
        ChargeState::Negative,
        ChargeState::Neutral,
        ChargeState::Positive,
    ];

    #[inline]
    pub const fn sign(self) -> i8 {
        match self {
            ChargeState::Negative => -1,
            ChargeState::Neutral => 0,
            ChargeState::Positive => 1,
        }
    }

    #[inline]
    pub const fn sign_f64(self) -> f64 {
        self.sign() as f64
    }

    pub const fn from_sign(sign: i8) -> Option<Self> {
        match sign {
            -1 => Some(ChargeState::Negative),
            0 => Some(ChargeState::Neutral),
            1 => Some(ChargeState::Positive),
            _ => None,
        }
    }

    /// Digit of this state in the mixed-radix charge index.
    #[inline]
    pub const fn digit(self) -> u8 {
        (self.sign() + 1) as u8
    }

    pub const fn from_digit(digit: u8) -> Option<Self> {
        match digit {
            0 => Some(ChargeState::Negative),
            1 => Some(ChargeState::Neutral),
            2 => Some(ChargeState::Positive),
            _ => None,
        }
    }

    /// States that exist in a search space of the given base number.
    pub fn states_for_base(base: u8) -> &'static [ChargeState] {
        const BASE_TWO: [ChargeState; 2] = [ChargeState::Negative, ChargeState::Neutral];
        if base >= 3 {
            &Self::ALL
        } else {
            &BASE_TWO
        }
    }
}

impl fmt::Display for ChargeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            ChargeState::Negative => '-',
            ChargeState::Neutral => '0',
            ChargeState::Positive => '+',
        };
        write!(f, "{c}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseChargeStateError;

impl FromStr for ChargeState {
    type Err = ParseChargeStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "-" | "-1" => Ok(ChargeState::Negative),
            "0" => Ok(ChargeState::Neutral),
            "+" | "1" | "+1" => Ok(ChargeState::Positive),
            _ => Err(ParseChargeStateError),
        }
    }
}

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LogicError {
    #[error("Invalid truth table '{0}': expected a non-empty binary string whose length is a power of two")]
    InvalidTruthTable(String),
    #[error("At least one truth table is required")]
    EmptySpecification,
    #[error("Truth tables have different arities ({first} and {other})")]
    ArityMismatch { first: u32, other: u32 },
    #[error("Truth tables have {arity} inputs but the layout has {input_pairs} input BDL pairs")]
    InputCountMismatch { arity: u32, input_pairs: usize },
    #[error("Got {tables} truth tables for {output_pairs} output BDL pairs")]
    OutputCountMismatch { tables: usize, output_pairs: usize },
    #[error("The layout has no output BDL pair")]
    NoOutputPairs,
}

/// A single-output Boolean function given by its full table of values.
///
/// Row `r` holds the output for the input assignment whose bit `i` is the
/// value of input `i`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TruthTable {
    num_vars: u32,
    bits: Vec<bool>,
}

impl TruthTable {
    /// Parses a binary string whose first character is the highest row.
    ///
    /// `"1000"` is the two-input AND, `"10"` is the identity.
    pub fn from_binary_str(s: &str) -> Result<Self, LogicError> {
        let len = s.len();
        if len == 0 || !len.is_power_of_two() || len > 1 << 16 {
            return Err(LogicError::InvalidTruthTable(s.to_string()));
        }
        let bits = s
            .chars()
            .rev()
            .map(|c| match c {
                '0' => Ok(false),
                '1' => Ok(true),
                _ => Err(LogicError::InvalidTruthTable(s.to_string())),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            num_vars: len.trailing_zeros(),
            bits,
        })
    }

    pub fn identity() -> Self {
        Self {
            num_vars: 1,
            bits: vec![false, true],
        }
    }

    #[inline]
    pub fn num_vars(&self) -> u32 {
        self.num_vars
    }

    #[inline]
    pub fn num_bits(&self) -> u64 {
        self.bits.len() as u64
    }

    /// Output for input row `row`. Rows beyond the table read as `false`.
    #[inline]
    pub fn get_bit(&self, row: u64) -> bool {
        usize::try_from(row)
            .ok()
            .and_then(|r| self.bits.get(r).copied())
            .unwrap_or(false)
    }
}

impl FromStr for TruthTable {
    type Err = LogicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_binary_str(s)
    }
}

impl fmt::Display for TruthTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &bit in self.bits.iter().rev() {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

/// Checks that `tables` is non-empty and all tables share one arity, which is returned.
pub fn common_arity(tables: &[TruthTable]) -> Result<u32, LogicError> {
    let first = tables.first().ok_or(LogicError::EmptySpecification)?;
    if let Some(other) = tables.iter().find(|t| t.num_vars != first.num_vars) {
        return Err(LogicError::ArityMismatch {
            first: first.num_vars,
            other: other.num_vars,
        });
    }
    Ok(first.num_vars)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_character_is_highest_row() {
        let and = TruthTable::from_binary_str("1000").unwrap();
        assert_eq!(and.num_vars(), 2);
        assert!(and.get_bit(3));
        assert!(!and.get_bit(0));
        assert!(!and.get_bit(2));
        assert_eq!(and.to_string(), "1000");
    }

    #[test]
    fn identity_parses_from_string() {
        assert_eq!("10".parse::<TruthTable>().unwrap(), TruthTable::identity());
    }

    #[test]
    fn rejects_malformed_strings() {
        for s in ["", "101", "10a0"] {
            assert!(matches!(
                TruthTable::from_binary_str(s),
                Err(LogicError::InvalidTruthTable(_))
            ));
        }
    }

    #[test]
    fn common_arity_requires_agreement() {
        let or: TruthTable = "1110".parse().unwrap();
        let and: TruthTable = "1000".parse().unwrap();
        assert_eq!(common_arity(&[or.clone(), and]), Ok(2));
        assert_eq!(common_arity(&[]), Err(LogicError::EmptySpecification));
        assert_eq!(
            common_arity(&[or, TruthTable::identity()]),
            Err(LogicError::ArityMismatch { first: 2, other: 1 })
        );
    }
}

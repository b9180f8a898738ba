use crate::core::models::sidb::ChargeState;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Expected {expected} charge states, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("Charge state '{state}' at site {site} is not representable in base {radix}")]
    UnsupportedState {
        site: usize,
        state: ChargeState,
        radix: u8,
    },
    #[error("Charge index {index} is out of range for {sites} sites")]
    OutOfRange { index: u64, sites: usize },
    #[error("Charge index space of {sites} sites does not fit into 64 bits")]
    Overflow { sites: usize },
    #[error("Invalid radix {radix} at site {site}, expected 2 or 3")]
    InvalidRadix { site: usize, radix: u8 },
}

/// Mixed-radix bijection between charge assignments and charge indices.
///
/// Site `0` is the most significant digit. The digit of a site is
/// `sign + 1`, so index `0` is the all-negative assignment and the natural
/// order of indices is the lexicographic order of the charge vectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeIndexCodec {
    radices: Vec<u8>,
}

impl ChargeIndexCodec {
    pub fn new(radices: Vec<u8>) -> Result<Self, CodecError> {
        if let Some((site, &radix)) = radices
            .iter()
            .enumerate()
            .find(|&(_, &r)| !(r == 2 || r == 3))
        {
            return Err(CodecError::InvalidRadix { site, radix });
        }
        Ok(Self { radices })
    }

    pub fn uniform(num_sites: usize, base: u8) -> Result<Self, CodecError> {
        Self::new(vec![base; num_sites])
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.radices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.radices.is_empty()
    }

    pub fn radices(&self) -> &[u8] {
        &self.radices
    }

    /// Size of the search space, i.e. the product of all radices.
    pub fn num_configurations(&self) -> Result<u64, CodecError> {
        self.radices
            .iter()
            .try_fold(1u64, |acc, &r| acc.checked_mul(r as u64))
            .ok_or(CodecError::Overflow {
                sites: self.radices.len(),
            })
    }

    pub fn max_index(&self) -> Result<u64, CodecError> {
        Ok(self.num_configurations()? - 1)
    }

    pub fn encode(&self, states: &[ChargeState]) -> Result<u64, CodecError> {
        self.check_len(states.len())?;
        let mut index = 0u64;
        for (site, (&state, &radix)) in states.iter().zip(&self.radices).enumerate() {
            let digit = state.digit();
            if digit >= radix {
                return Err(CodecError::UnsupportedState { site, state, radix });
            }
            index = index
                .checked_mul(radix as u64)
                .and_then(|i| i.checked_add(digit as u64))
                .ok_or(CodecError::Overflow {
                    sites: self.radices.len(),
                })?;
        }
        Ok(index)
    }

    pub fn decode(&self, index: u64) -> Result<Vec<ChargeState>, CodecError> {
        let mut states = vec![ChargeState::Negative; self.radices.len()];
        self.decode_into(index, &mut states)?;
        Ok(states)
    }

    pub fn decode_into(&self, index: u64, states: &mut [ChargeState]) -> Result<(), CodecError> {
        self.check_len(states.len())?;
        let mut rest = index;
        for (state, &radix) in states.iter_mut().zip(&self.radices).rev() {
            let digit = (rest % radix as u64) as u8;
            rest /= radix as u64;
            *state = ChargeState::from_digit(digit).unwrap_or(ChargeState::Negative);
        }
        if rest != 0 {
            return Err(CodecError::OutOfRange {
                index,
                sites: self.radices.len(),
            });
        }
        Ok(())
    }

    /// The digit an increment of `states` raises, together with its new state.
    ///
    /// Every digit after it wraps around to [`ChargeState::Negative`]. `None`
    /// means all digits wrap, i.e. `states` encodes the maximum index.
    pub fn carry(&self, states: &[ChargeState]) -> Result<Option<(usize, ChargeState)>, CodecError> {
        self.check_len(states.len())?;
        Ok((0..states.len()).rev().find_map(|site| {
            let next = states[site].digit() + 1;
            if next < self.radices[site] {
                ChargeState::from_digit(next).map(|state| (site, state))
            } else {
                None
            }
        }))
    }

    /// Advances `states` to the next charge index in place.
    ///
    /// Returns `false` if the assignment wrapped around past the maximum index.
    pub fn increment(&self, states: &mut [ChargeState]) -> Result<bool, CodecError> {
        let raised = self.carry(states)?;
        let wrapped_from = raised.map_or(0, |(site, _)| site + 1);
        states[wrapped_from..].fill(ChargeState::Negative);
        if let Some((site, state)) = raised {
            states[site] = state;
        }
        Ok(raised.is_some())
    }

    fn check_len(&self, actual: usize) -> Result<(), CodecError> {
        if actual != self.radices.len() {
            return Err(CodecError::LengthMismatch {
                expected: self.radices.len(),
                actual,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::sidb::ChargeState::{Negative as N, Neutral as Z, Positive as P};

    #[test]
    fn index_zero_decodes_to_all_negative() {
        let codec = ChargeIndexCodec::uniform(4, 3).unwrap();
        assert_eq!(codec.decode(0).unwrap(), vec![N; 4]);
    }

    #[test]
    fn first_site_is_most_significant_digit() {
        let codec = ChargeIndexCodec::uniform(3, 3).unwrap();
        assert_eq!(codec.encode(&[Z, N, N]).unwrap(), 9);
        assert_eq!(codec.encode(&[N, N, P]).unwrap(), 2);
        assert_eq!(codec.decode(26).unwrap(), vec![P, P, P]);
    }

    #[test]
    fn mixed_radix_round_trips_every_index() {
        let codec = ChargeIndexCodec::new(vec![2, 3, 2]).unwrap();
        assert_eq!(codec.max_index().unwrap(), 11);
        for index in 0..=codec.max_index().unwrap() {
            let states = codec.decode(index).unwrap();
            assert_eq!(codec.encode(&states).unwrap(), index);
        }
    }

    #[test]
    fn increment_walks_indices_in_order_and_reports_wrap() {
        let codec = ChargeIndexCodec::new(vec![3, 2]).unwrap();
        let mut states = vec![N, N];
        let mut seen = vec![codec.encode(&states).unwrap()];
        while codec.increment(&mut states).unwrap() {
            seen.push(codec.encode(&states).unwrap());
        }
        assert_eq!(seen, (0..6).collect::<Vec<_>>());
        assert_eq!(states, vec![N, N]);
    }

    #[test]
    fn carry_raises_the_last_digit_below_its_radix() {
        let codec = ChargeIndexCodec::new(vec![3, 2, 2]).unwrap();
        assert_eq!(codec.carry(&[N, N, N]).unwrap(), Some((2, Z)));
        assert_eq!(codec.carry(&[N, Z, Z]).unwrap(), Some((0, Z)));
        assert_eq!(codec.carry(&[Z, Z, Z]).unwrap(), Some((0, P)));
        assert_eq!(codec.carry(&[P, Z, Z]).unwrap(), None);
        assert!(matches!(
            codec.carry(&[N]),
            Err(CodecError::LengthMismatch { expected: 3, actual: 1 })
        ));
    }

    #[test]
    fn rejects_unrepresentable_and_out_of_range_values() {
        let codec = ChargeIndexCodec::uniform(2, 2).unwrap();
        assert_eq!(
            codec.encode(&[N, P]),
            Err(CodecError::UnsupportedState {
                site: 1,
                state: P,
                radix: 2
            })
        );
        assert!(matches!(codec.decode(4), Err(CodecError::OutOfRange { .. })));
        assert!(matches!(
            codec.encode(&[N]),
            Err(CodecError::LengthMismatch { expected: 2, actual: 1 })
        ));
        assert_eq!(
            ChargeIndexCodec::new(vec![2, 4]),
            Err(CodecError::InvalidRadix { site: 1, radix: 4 })
        );
    }

    #[test]
    fn detects_overflow_of_large_search_spaces() {
        let codec = ChargeIndexCodec::uniform(41, 3).unwrap();
        assert_eq!(codec.max_index(), Err(CodecError::Overflow { sites: 41 }));
        assert!(ChargeIndexCodec::uniform(40, 3).unwrap().max_index().is_ok());
    }

    #[test]
    fn empty_codec_has_a_single_configuration() {
        let codec = ChargeIndexCodec::uniform(0, 3).unwrap();
        assert_eq!(codec.num_configurations().unwrap(), 1);
        assert_eq!(codec.encode(&[]).unwrap(), 0);
    }
}

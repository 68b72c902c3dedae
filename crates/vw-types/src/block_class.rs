use serde::{Deserialize, Serialize};

/// How far a monitored validator got on a given height, ordered by "how far
/// the validator got". The final classification of a finalized block is the
/// maximum value observed before the block finalizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(i8)]
pub enum BlockClass {
    Missed = 0,
    PrevoteOnly = 1,
    PrecommitOnly = 2,
    Signed = 3,
    Proposed = 4,
}

impl BlockClass {
    /// Encodes as the small integer used by the persisted ring buffer, where
    /// `-1` means "unknown" (no `BlockClass` yet).
    pub fn to_i8(self) -> i8 {
        self as i8
    }

    pub fn from_i8(v: i8) -> Option<Self> {
        match v {
            0 => Some(Self::Missed),
            1 => Some(Self::PrevoteOnly),
            2 => Some(Self::PrecommitOnly),
            3 => Some(Self::Signed),
            4 => Some(Self::Proposed),
            _ => None,
        }
    }

    /// True for the two classes that count as "the validator got a vote in,
    /// but it didn't make the finalized block".
    pub fn is_partial_miss(self) -> bool {
        matches!(self, Self::PrevoteOnly | Self::PrecommitOnly)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn ordering_matches_how_far_the_validator_got() {
        assert!(BlockClass::Missed < BlockClass::PrevoteOnly);
        assert!(BlockClass::PrevoteOnly < BlockClass::PrecommitOnly);
        assert!(BlockClass::PrecommitOnly < BlockClass::Signed);
        assert!(BlockClass::Signed < BlockClass::Proposed);
    }

    proptest! {
        #[test]
        fn to_i8_from_i8_round_trips(v in 0i8..=4) {
            let class = BlockClass::from_i8(v).expect("0..=4 is always a valid class");
            prop_assert_eq!(class.to_i8(), v);
        }

        #[test]
        fn from_i8_rejects_anything_outside_the_valid_range(v in any::<i8>()) {
            if !(0..=4).contains(&v) {
                prop_assert_eq!(BlockClass::from_i8(v), None);
            }
        }
    }
}

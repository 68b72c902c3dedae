use serde::{Deserialize, Serialize};

/// Staking/slashing state for the monitored validator, refreshed on a slow
/// timer by the Validator State Fetcher.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidatorInfo {
    pub moniker: String,
    pub bonded: bool,
    pub jailed: bool,
    pub tombstoned: bool,
    /// Authoritative slashing-window missed-block counter, from chain.
    pub missed: i64,
    pub window: i64,
    pub consensus_pubkey_bytes: Vec<u8>,
    pub consensus_address_bech32: String,
}

impl ValidatorInfo {
    /// Percentage of the slashing window currently missed.
    pub fn percent_missed(&self) -> f64 {
        if self.window <= 0 {
            return 0.0;
        }
        100.0 * self.missed as f64 / self.window as f64
    }

    /// True on the tick where "validator went inactive" should fire:
    /// monikers equal (same validator), was bonded, now is not.
    pub fn became_inactive(&self, previous: &ValidatorInfo) -> bool {
        self.moniker == previous.moniker && previous.bonded && !self.bonded
    }

    /// True on the tick where the inactive alarm should resolve.
    pub fn became_active(&self, previous: &ValidatorInfo) -> bool {
        self.moniker == previous.moniker && !previous.bonded && self.bonded
    }
}

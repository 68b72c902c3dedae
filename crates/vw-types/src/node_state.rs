use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// State of one configured RPC endpoint, owned exclusively by the RPC Pool
/// of its chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeState {
    pub url: String,
    pub alert_if_down: bool,
    pub down: bool,
    pub was_down: bool,
    pub syncing: bool,
    /// `None` iff `down == false`. Set the instant `down` transitions
    /// false->true; cleared the instant it transitions back.
    pub down_since: Option<DateTime<Utc>>,
    pub last_message: String,
}

impl NodeState {
    pub fn new(url: String, alert_if_down: bool) -> Self {
        Self {
            url,
            alert_if_down,
            down: false,
            was_down: false,
            syncing: false,
            down_since: None,
            last_message: String::new(),
        }
    }

    /// Records a successful probe: clears `down`/`syncing`, remembers that
    /// the node had been down (for the node-down resolve transition), and
    /// resets `down_since`.
    pub fn mark_up(&mut self) {
        if self.down {
            self.was_down = true;
        }
        self.down = false;
        self.syncing = false;
        self.down_since = None;
        self.last_message.clear();
    }

    /// Records a failed probe (unreachable, wrong-chain, or syncing).
    /// `down_since` is preserved across repeated failures.
    pub fn mark_down(&mut self, now: DateTime<Utc>, message: impl Into<String>, syncing: bool) {
        if !self.down {
            self.down_since = Some(now);
        }
        self.down = true;
        self.syncing = syncing;
        self.last_message = message.into();
    }

    /// Seconds the node has been continuously down, or zero if it is up.
    pub fn down_seconds(&self, now: DateTime<Utc>) -> f64 {
        match self.down_since {
            Some(since) if self.down => (now - since).num_milliseconds() as f64 / 1000.0,
            _ => 0.0,
        }
    }

    /// True on the tick where a node-down alarm should resolve: the node is
    /// back up and had previously fired a down alarm.
    pub fn just_recovered(&self) -> bool {
        !self.down && self.was_down
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn down_since_set_only_on_transition() {
        let mut n = NodeState::new("http://a".into(), true);
        let t0 = Utc::now();
        n.mark_down(t0, "unreachable", false);
        assert_eq!(n.down_since, Some(t0));
        let t1 = t0 + chrono::Duration::seconds(30);
        n.mark_down(t1, "unreachable", false);
        assert_eq!(n.down_since, Some(t0), "down_since must not move on repeat failures");
    }

    #[test]
    fn mark_up_clears_down_since() {
        let mut n = NodeState::new("http://a".into(), true);
        n.mark_down(Utc::now(), "unreachable", false);
        n.mark_up();
        assert!(!n.down);
        assert!(n.down_since.is_none());
        assert!(n.was_down);
    }
}

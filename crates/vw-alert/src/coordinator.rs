use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, RwLock};
use tracing::{info, warn};
use vw_types::alert::{format_message, SinkKind};
use vw_types::{AlertCondition, AlertSink};

use crate::AlarmCache;

/// Consumes `AlertCondition`s from a single in-process queue and fans each
/// one out to every sink it names, deduplicating and flap-suppressing per
/// spec.md §4.F. Dispatch for a given condition is sequential across sinks
/// is not required by the spec; sink calls run independently so a slow
/// sink never blocks the others.
pub struct AlertCoordinator {
    cache: Arc<RwLock<AlarmCache>>,
    sinks: HashMap<SinkKind, Arc<dyn AlertSink>>,
}

impl AlertCoordinator {
    pub fn new(cache: Arc<RwLock<AlarmCache>>, sinks: HashMap<SinkKind, Arc<dyn AlertSink>>) -> Self {
        Self { cache, sinks }
    }

    /// Spawns the dispatcher task. Returns the sender half; dropping every
    /// clone of it ends the dispatcher loop.
    pub fn spawn(self: Arc<Self>) -> mpsc::Sender<AlertCondition> {
        let (tx, mut rx) = mpsc::channel::<AlertCondition>(1024);
        tokio::spawn(async move {
            while let Some(condition) = rx.recv().await {
                self.dispatch(condition).await;
            }
        });
        tx
    }

    async fn dispatch(&self, condition: AlertCondition) {
        {
            let mut cache = self.cache.write().await;
            if condition.resolved {
                cache.clear_active(&condition.chain, &condition.message);
            } else {
                cache.mark_active(&condition.chain, &condition.message, Utc::now());
            }
        }

        for sink_kind in &condition.enabled_sinks {
            let Some(sink) = self.sinks.get(sink_kind) else {
                continue;
            };
            let decision = self.sink_decision(*sink_kind, &condition).await;
            let Some(outgoing) = decision else { continue };
            let sink = sink.clone();
            let cache = self.cache.clone();
            let message = outgoing.message.clone();
            let chain = condition.chain.clone();
            let resolved = outgoing.resolved;
            let kind = *sink_kind;
            tokio::spawn(async move {
                if let Err(e) = sink.send(&outgoing).await {
                    warn!(chain = %chain, sink = %kind, error = %e, "sink send failed");
                    return;
                }
                let mut cache = cache.write().await;
                if resolved {
                    cache.clear_sink_entry(kind, &message);
                } else {
                    cache.record_sink_sent(kind, &message, Utc::now());
                }
            });
        }
    }

    /// Applies the per-sink dedup/flap rule from spec.md §4.F and returns
    /// the condition to actually send, or `None` to suppress. The cache
    /// entry itself is only mutated by the caller once the send succeeds
    /// (§7: a failed sink send must leave the alarm recorded locally so a
    /// later resolve still fires); this only decides and, for the PagerDuty
    /// flap window, records the trigger timestamp up front since the flap
    /// window is measured from attempt time, not delivery time.
    async fn sink_decision(&self, sink: SinkKind, condition: &AlertCondition) -> Option<AlertCondition> {
        let now = Utc::now();
        let mut cache = self.cache.write().await;
        let present = cache.sink_entry(sink, &condition.message).is_some();

        match (present, condition.resolved) {
            (true, false) => None,
            (true, true) => Some(with_prefixed_message(condition)),
            (false, true) => {
                info!(chain = %condition.chain, message = %condition.message, sink = %sink, "no corresponding alert, skipping resolve");
                None
            }
            (false, false) => {
                if sink == SinkKind::PagerDuty && cache.is_flapping(&condition.chain, &condition.message, now) {
                    return None;
                }
                if sink == SinkKind::PagerDuty {
                    cache.record_flap(&condition.chain, &condition.message, now);
                }
                Some(with_prefixed_message(condition))
            }
        }
    }
}

fn with_prefixed_message(condition: &AlertCondition) -> AlertCondition {
    let mut out = condition.clone();
    out.message = format_message(&condition.message, condition.resolved);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;
    use vw_types::alert::{PerSinkRouting, Severity};

    struct RecordingSink {
        kind: SinkKind,
        sent: Mutex<Vec<AlertCondition>>,
        fail_next: AtomicUsize,
    }

    impl RecordingSink {
        fn new(kind: SinkKind) -> Self {
            Self { kind, sent: Mutex::new(Vec::new()), fail_next: AtomicUsize::new(0) }
        }

        fn fail_next_n(self: &Arc<Self>, n: usize) {
            self.fail_next.store(n, Ordering::SeqCst);
        }

        async fn sent_count(&self) -> usize {
            self.sent.lock().await.len()
        }
    }

    #[async_trait::async_trait]
    impl AlertSink for RecordingSink {
        fn kind(&self) -> SinkKind {
            self.kind
        }

        async fn send(&self, condition: &AlertCondition) -> anyhow::Result<()> {
            let remaining = self.fail_next.load(Ordering::SeqCst);
            if remaining > 0 {
                self.fail_next.store(remaining - 1, Ordering::SeqCst);
                anyhow::bail!("simulated sink failure");
            }
            self.sent.lock().await.push(condition.clone());
            Ok(())
        }
    }

    fn condition(chain: &str, message: &str, resolved: bool, sinks: &[SinkKind]) -> AlertCondition {
        AlertCondition {
            chain: chain.to_string(),
            message: message.to_string(),
            severity: Severity::Critical,
            resolved,
            unique_id: format!("{chain}{message}"),
            enabled_sinks: sinks.to_vec(),
            per_sink_routing: PerSinkRouting::default(),
        }
    }

    async fn settle() {
        // let spawned per-sink send tasks run to completion.
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    #[tokio::test]
    async fn repeated_trigger_sends_once_until_resolved() {
        let cache = Arc::new(RwLock::new(AlarmCache::new()));
        let discord = Arc::new(RecordingSink::new(SinkKind::Discord));
        let mut sinks: HashMap<SinkKind, Arc<dyn AlertSink>> = HashMap::new();
        sinks.insert(SinkKind::Discord, discord.clone());
        let coordinator = Arc::new(AlertCoordinator::new(cache, sinks));

        coordinator.dispatch(condition("chain-1", "m", false, &[SinkKind::Discord])).await;
        settle().await;
        coordinator.dispatch(condition("chain-1", "m", false, &[SinkKind::Discord])).await;
        settle().await;

        assert_eq!(discord.sent_count().await, 1);
    }

    #[tokio::test]
    async fn resolve_after_trigger_sends_once_and_clears() {
        let cache = Arc::new(RwLock::new(AlarmCache::new()));
        let discord = Arc::new(RecordingSink::new(SinkKind::Discord));
        let mut sinks: HashMap<SinkKind, Arc<dyn AlertSink>> = HashMap::new();
        sinks.insert(SinkKind::Discord, discord.clone());
        let coordinator = Arc::new(AlertCoordinator::new(cache, sinks));

        coordinator.dispatch(condition("chain-1", "m", false, &[SinkKind::Discord])).await;
        settle().await;
        coordinator.dispatch(condition("chain-1", "m", true, &[SinkKind::Discord])).await;
        settle().await;
        // a second resolve has no corresponding alert and must not send.
        coordinator.dispatch(condition("chain-1", "m", true, &[SinkKind::Discord])).await;
        settle().await;

        assert_eq!(discord.sent_count().await, 2);
    }

    #[tokio::test]
    async fn failed_resolve_send_keeps_alarm_recorded_for_retry() {
        let cache = Arc::new(RwLock::new(AlarmCache::new()));
        let discord = Arc::new(RecordingSink::new(SinkKind::Discord));
        let mut sinks: HashMap<SinkKind, Arc<dyn AlertSink>> = HashMap::new();
        sinks.insert(SinkKind::Discord, discord.clone());
        let coordinator = Arc::new(AlertCoordinator::new(cache, sinks));

        coordinator.dispatch(condition("chain-1", "m", false, &[SinkKind::Discord])).await;
        settle().await;

        discord.fail_next_n(1);
        coordinator.dispatch(condition("chain-1", "m", true, &[SinkKind::Discord])).await;
        settle().await;
        // the failed resolve must not have cleared the per-sink entry, so a
        // retriggered condition is suppressed rather than sent as a fresh
        // trigger (spec.md §8 invariant 2).
        coordinator.dispatch(condition("chain-1", "m", false, &[SinkKind::Discord])).await;
        settle().await;

        assert_eq!(discord.sent_count().await, 1);

        coordinator.dispatch(condition("chain-1", "m", true, &[SinkKind::Discord])).await;
        settle().await;
        assert_eq!(discord.sent_count().await, 2);
    }

    #[tokio::test]
    async fn pagerduty_flap_window_suppresses_retrigger_within_five_minutes() {
        let cache = Arc::new(RwLock::new(AlarmCache::new()));
        let pagerduty = Arc::new(RecordingSink::new(SinkKind::PagerDuty));
        let mut sinks: HashMap<SinkKind, Arc<dyn AlertSink>> = HashMap::new();
        sinks.insert(SinkKind::PagerDuty, pagerduty.clone());
        let coordinator = Arc::new(AlertCoordinator::new(cache, sinks));

        coordinator.dispatch(condition("chain-1", "m", false, &[SinkKind::PagerDuty])).await;
        settle().await;
        coordinator.dispatch(condition("chain-1", "m", true, &[SinkKind::PagerDuty])).await;
        settle().await;
        assert_eq!(pagerduty.sent_count().await, 2);

        // Re-trigger immediately: flap window (5 min) has not elapsed.
        coordinator.dispatch(condition("chain-1", "m", false, &[SinkKind::PagerDuty])).await;
        settle().await;
        assert_eq!(pagerduty.sent_count().await, 2);
    }

    #[tokio::test]
    async fn non_pagerduty_sinks_are_not_flap_suppressed() {
        let cache = Arc::new(RwLock::new(AlarmCache::new()));
        let slack = Arc::new(RecordingSink::new(SinkKind::Slack));
        let mut sinks: HashMap<SinkKind, Arc<dyn AlertSink>> = HashMap::new();
        sinks.insert(SinkKind::Slack, slack.clone());
        let coordinator = Arc::new(AlertCoordinator::new(cache, sinks));

        coordinator.dispatch(condition("chain-1", "m", false, &[SinkKind::Slack])).await;
        settle().await;
        coordinator.dispatch(condition("chain-1", "m", true, &[SinkKind::Slack])).await;
        settle().await;
        coordinator.dispatch(condition("chain-1", "m", false, &[SinkKind::Slack])).await;
        settle().await;

        assert_eq!(slack.sent_count().await, 3);
    }

    #[tokio::test]
    async fn active_map_tracks_trigger_and_resolve() {
        let cache = Arc::new(RwLock::new(AlarmCache::new()));
        let discord = Arc::new(RecordingSink::new(SinkKind::Discord));
        let mut sinks: HashMap<SinkKind, Arc<dyn AlertSink>> = HashMap::new();
        sinks.insert(SinkKind::Discord, discord.clone());
        let cache_handle = Arc::new(RwLock::new(AlarmCache::new()));
        let coordinator = Arc::new(AlertCoordinator::new(cache_handle.clone(), sinks));
        let _ = cache;

        coordinator.dispatch(condition("chain-1", "m", false, &[SinkKind::Discord])).await;
        settle().await;
        assert_eq!(cache_handle.read().await.active_count("chain-1"), 1);

        coordinator.dispatch(condition("chain-1", "m", true, &[SinkKind::Discord])).await;
        settle().await;
        assert_eq!(cache_handle.read().await.active_count("chain-1"), 0);
    }
}

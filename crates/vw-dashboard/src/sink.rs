use tokio::sync::mpsc::UnboundedSender;
use vw_types::{ChainSnapshot, DashboardSink};

use crate::types::LogMessage;

pub(crate) enum Event {
    Snapshot(ChainSnapshot),
    Log(LogMessage),
}

/// `DashboardSink` handed to every `ChainMonitor`. `publish_snapshot` and
/// `publish_log` are synchronous per the trait, so this just enqueues onto an
/// unbounded channel; the `DashboardServer` task drains it and maintains the
/// cached JSON the HTTP handlers serve.
pub struct ChannelDashboardSink {
    tx: UnboundedSender<Event>,
}

impl ChannelDashboardSink {
    pub(crate) fn new(tx: UnboundedSender<Event>) -> Self {
        ChannelDashboardSink { tx }
    }
}

impl DashboardSink for ChannelDashboardSink {
    fn publish_snapshot(&self, snapshot: ChainSnapshot) {
        // A full receiver only happens if the server task died; drop rather
        // than block or panic the caller.
        let _ = self.tx.send(Event::Snapshot(snapshot));
    }

    fn publish_log(&self, chain: &str, line: String) {
        let _ = self.tx.send(Event::Log(LogMessage::new(chain, line)));
    }
}

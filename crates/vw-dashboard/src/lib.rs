//! Minimal JSON + websocket `DashboardSink` adapter. No browser UI is served
//! here — spec.md §1 scopes that out; this crate only emits the data a UI
//! would consume, grounded on `original_source/td2/dashboard/{types,server}.go`.

mod server;
mod sink;
mod types;

pub use server::spawn;
pub use sink::ChannelDashboardSink;
pub use types::{ChainStatus, LogMessage};

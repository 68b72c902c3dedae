//! Shared data model, config schema, and typed errors used across the
//! validator-watch workspace.

pub mod alarm_cache;
pub mod alert;
pub mod block_class;
pub mod chain_spec;
pub mod chain_state;
pub mod dashboard;
pub mod error;
pub mod node_state;
pub mod persisted_state;
pub mod status_update;
pub mod traits;
pub mod validator_info;

pub use alarm_cache::AlarmCache;
pub use alert::{AlertCondition, PerSinkRouting, Severity, SinkKind};
pub use block_class::BlockClass;
pub use chain_spec::{AlertConfig, ChainSpec, NodeConfig};
pub use chain_state::ChainState;
pub use dashboard::{BlockMetricSample, ChainSnapshot};
pub use node_state::NodeState;
pub use persisted_state::PersistedState;
pub use status_update::StatusUpdate;
pub use traits::{AlertSink, DashboardSink, MetricsRecorder, NopSink};
pub use validator_info::ValidatorInfo;

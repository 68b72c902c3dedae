//! Concrete `AlertSink` adapters for the four notification sinks named in
//! spec.md §6. Each adapter owns its own HTTP client and reads per-chain
//! credentials from the `AlertCondition` it is handed, so one process can
//! route different chains to different PagerDuty services, Discord
//! channels, etc.

pub mod discord;
pub mod pagerduty;
pub mod slack;
pub mod telegram;

pub use discord::DiscordSink;
pub use pagerduty::PagerDutySink;
pub use slack::SlackSink;
pub use telegram::TelegramSink;

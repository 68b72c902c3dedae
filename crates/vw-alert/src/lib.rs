//! Deduplicating, flap-suppressing alert dispatcher (the Alert Coordinator
//! of spec.md §4.F) and the shared `AlarmCache` it mutates.

pub mod coordinator;

pub use coordinator::AlertCoordinator;
pub use vw_types::AlarmCache;

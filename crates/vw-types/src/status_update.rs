use serde::{Deserialize, Serialize};

use crate::block_class::BlockClass;

/// One observation emitted by the Websocket Listener. `final_` mirrors the
/// spec's `final` field (renamed to dodge the Rust keyword).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub height: i64,
    pub class: BlockClass,
    pub final_: bool,
}

impl StatusUpdate {
    pub fn vote(height: i64, class: BlockClass) -> Self {
        debug_assert!(class.is_partial_miss());
        Self {
            height,
            class,
            final_: false,
        }
    }

    pub fn block(height: i64, class: BlockClass) -> Self {
        Self {
            height,
            class,
            final_: true,
        }
    }
}

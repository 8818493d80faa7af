//! Reference-data synchronization
//!
//! Live battle messages never carry types, base stats or move power; those
//! arrive as answers to `/data` lookups, in any order and sometimes not at
//! all. The [`Synchronizer`] tracks which names were asked for and which were
//! answered, stores answers in the [`ReferenceRegistry`], and re-asks for
//! missing names when progress stalls.

mod registry;
mod synchronizer;

use std::time::Duration;

use serde::{Deserialize, Deserializer};

pub use registry::ReferenceRegistry;
pub use synchronizer::{LookupKind, Resolved, Synchronizer, is_team_synchronized};

/// Polling, stall and timeout settings for the convergence wait
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SyncPolicy {
    /// Delay between convergence checks
    #[serde(rename = "poll_interval_ms", deserialize_with = "millis")]
    pub poll_interval: Duration,

    /// Consecutive polls without progress that count as a stall
    pub stall_polls: u32,

    /// Give up waiting after this long
    #[serde(rename = "timeout_ms", deserialize_with = "millis")]
    pub timeout: Duration,

    /// Resend rounds allowed per wait
    pub max_resends: u32,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            stall_polls: 2,
            timeout: Duration::from_secs(60),
            max_resends: 5,
        }
    }
}

fn millis<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_millis)
}

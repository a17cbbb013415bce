//! Advisory cleanup of expired tokens and sessions.
//!
//! Validation already checks `expiry_utc`, so this task only keeps storage
//! from accumulating dead rows.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::services::{SessionManager, TokenLedger};

pub fn spawn_sweeper(
    tokens: TokenLedger,
    sessions: SessionManager,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(every);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tick.tick().await;
            match tokens.purge_expired().await {
                Ok(purged) if purged > 0 => tracing::debug!(purged, "purged expired tokens"),
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "token sweep failed"),
            }
            match sessions.purge_expired().await {
                Ok(purged) if purged > 0 => tracing::debug!(purged, "purged expired sessions"),
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "session sweep failed"),
            }
        }
    })
}

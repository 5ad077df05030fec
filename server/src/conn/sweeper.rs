//! Idle-connection eviction.
//!
//! A single task ticks on a fixed period and disconnects every connection
//! whose last inbound activity is older than the TTL. Running the pass on
//! one task keeps ticks from overlapping; a tick missed while a pass is
//! still running is skipped rather than queued.

use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};

use crate::conn::ServerHandle;

/// Default window after the last inbound read before a connection is
/// evicted.
pub const IDLE_TTL: Duration = Duration::from_secs(600);

/// Default period of the eviction tick.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Run the eviction timer until the process exits.
pub async fn run(handle: ServerHandle, ttl: Duration, period: Duration) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        sweep(&handle, ttl);
    }
}

/// One eviction pass. Returns the number of connections removed.
pub fn sweep(handle: &ServerHandle, ttl: Duration) -> usize {
    let idle = handle.idle_ids(ttl);
    for &id in &idle {
        tracing::info!(conn_id = %id, "evicting idle connection");
        handle.disconnect(id);
    }
    idle.len()
}

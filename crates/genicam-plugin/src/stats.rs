//! Statistics stream
//!
//! GenICam devices expose no statistics through the enumeration interface, so
//! each sample is empty. The stream still ticks on the requested interval and
//! closes on cancellation like the fingerprint stream.

use genicam_core::StatsEvent;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub const STATS_CHANNEL_CAPACITY: usize = 1;

/// Emit a stats sample every `period` until cancelled or the receiver is dropped
pub async fn run_stats(period: Duration, cancel: CancellationToken, events: mpsc::Sender<StatsEvent>) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(period = ?period, "Stats stream started");

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            sent = events.send(StatsEvent::empty()) => {
                if sent.is_err() {
                    debug!("Stats receiver dropped");
                    break;
                }
            }
        }
    }

    info!("Stats stream stopped");
}

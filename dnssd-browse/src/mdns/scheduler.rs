use std::time::Duration;
use rand::Rng;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use crate::mdns::interfaces::NetworkInterface;

/// Upper bound for the delay between continuous queries.
pub const MAX_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Range of the random delay before the first query, in milliseconds.
pub const JITTER_MS: std::ops::RangeInclusive<u64> = 20..=120;

/// Request to send one browse query on one interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTrigger {
    pub iface: NetworkInterface,
    /// Zero-based tick this trigger belongs to
    pub tick: u32,
}

/// Delay preceding tick `tick`: 2^(tick-1) seconds, capped at one hour.
/// Tick 0 follows only the initial jitter.
pub fn backoff_delay(tick: u32) -> Duration {
    if tick == 0 {
        return Duration::ZERO;
    }
    1u64.checked_shl(tick - 1)
        .map(Duration::from_secs)
        .map_or(MAX_INTERVAL, |delay| delay.min(MAX_INTERVAL))
}

pub struct QueryScheduler {
    continuous: bool,
    interfaces: Vec<NetworkInterface>,
}

impl QueryScheduler {
    pub fn new(continuous: bool, interfaces: Vec<NetworkInterface>) -> Self {
        Self { continuous, interfaces }
    }

    /// Emit one trigger per interface per tick until done or cancelled.
    /// Every wait, including a full channel, observes `cancel`.
    pub async fn run(self, tx: mpsc::Sender<QueryTrigger>, cancel: CancellationToken) {
        let jitter = Duration::from_millis(rand::thread_rng().gen_range(JITTER_MS));
        if !sleep_or_cancel(jitter, &cancel).await {
            return;
        }

        let mut tick: u32 = 0;
        loop {
            tracing::debug!("Query tick {} on {} interface(s)", tick, self.interfaces.len());
            for iface in &self.interfaces {
                let trigger = QueryTrigger { iface: iface.clone(), tick };
                tokio::select! {
                    sent = tx.send(trigger) => {
                        if sent.is_err() {
                            return;
                        }
                    }
                    _ = cancel.cancelled() => return,
                }
            }

            if !self.continuous {
                return;
            }

            tick = tick.saturating_add(1);
            if !sleep_or_cancel(backoff_delay(tick), &cancel).await {
                return;
            }
        }
    }
}

/// Returns false if cancelled before `delay` elapsed.
async fn sleep_or_cancel(delay: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(delay) => true,
        _ = cancel.cancelled() => false,
    }
}

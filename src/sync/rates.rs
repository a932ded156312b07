//! Network throughput derivation

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::snapshot::NetworkInfo;
use crate::util::bytes_per_sec_to_mib;

/// Instantaneous throughput in MiB/s
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkRates {
    pub download: f64,
    pub upload: f64,
}

#[derive(Debug, Clone, Copy)]
struct Counters {
    at: Instant,
    bytes_recv: u64,
    bytes_sent: u64,
}

/// Remembers the previous cycle's byte counters
///
/// Rates reported by the backend (`current_recv` / `current_sent`) win. Without
/// them the rate is the counter delta over the elapsed time; the first
/// observation and counter resets yield 0.
#[derive(Debug, Clone, Default)]
pub struct RateTracker {
    previous: Option<Counters>,
}

impl RateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, network: &NetworkInfo, now: Instant) -> NetworkRates {
        let previous = self.previous.replace(Counters {
            at: now,
            bytes_recv: network.bytes_recv,
            bytes_sent: network.bytes_sent,
        });

        let derive = |current: u64, earlier: fn(&Counters) -> u64| -> f64 {
            let Some(previous) = previous else {
                return 0.0;
            };
            let secs = now.saturating_duration_since(previous.at).as_secs_f64();
            let before = earlier(&previous);

            if secs <= 0.0 || current < before {
                0.0
            } else {
                (current - before) as f64 / secs
            }
        };

        let recv = network
            .current_recv
            .unwrap_or_else(|| derive(network.bytes_recv, |c| c.bytes_recv));
        let sent = network
            .current_sent
            .unwrap_or_else(|| derive(network.bytes_sent, |c| c.bytes_sent));

        NetworkRates {
            download: bytes_per_sec_to_mib(recv),
            upload: bytes_per_sec_to_mib(sent),
        }
    }
}

//! Bounded chart history
//!
//! Every tracked metric owns an independent fixed-capacity FIFO. Appending past
//! the capacity evicts from the front, so a series always holds the last `C`
//! samples in arrival order.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Capacity of the line-chart series
pub const CHART_CAPACITY: usize = 20;

/// Capacity of the CPU sparkline
pub const SPARKLINE_CAPACITY: usize = 30;

pub const CPU_USAGE: &str = "cpu_usage";
pub const MEMORY_PERCENT: &str = "memory_percent";
pub const NETWORK_DOWNLOAD: &str = "network_download";
pub const NETWORK_UPLOAD: &str = "network_upload";
pub const CPU_SPARKLINE: &str = "cpu_sparkline";

/// One chart point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Fixed-capacity FIFO of samples
#[derive(Debug, Clone)]
pub struct TimeSeries {
    capacity: usize,
    samples: VecDeque<Sample>,
}

impl TimeSeries {
    /// Create an empty series. A capacity of 0 is raised to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, timestamp: DateTime<Utc>, value: f64) {
        self.samples.push_back(Sample { timestamp, value });

        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Values oldest to newest
    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.value).collect()
    }

    pub fn samples(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    /// Largest value currently buffered
    pub fn max(&self) -> Option<f64> {
        self.samples.iter().map(|s| s.value).reduce(f64::max)
    }
}

/// All chart series of the dashboard, keyed by series id
#[derive(Debug, Clone)]
pub struct HistoryBuffers {
    series: HashMap<String, TimeSeries>,
    default_capacity: usize,
}

impl HistoryBuffers {
    /// Buffers with the dashboard's chart series pre-registered
    pub fn new() -> Self {
        let mut buffers = Self::empty(CHART_CAPACITY);
        for id in [CPU_USAGE, MEMORY_PERCENT, NETWORK_DOWNLOAD, NETWORK_UPLOAD] {
            buffers.register(id, CHART_CAPACITY);
        }
        buffers.register(CPU_SPARKLINE, SPARKLINE_CAPACITY);
        buffers
    }

    /// Buffers without any registered series
    pub fn empty(default_capacity: usize) -> Self {
        Self {
            series: HashMap::new(),
            default_capacity,
        }
    }

    /// Register a series with its own capacity
    ///
    /// Re-registering an existing id keeps its samples but applies the new
    /// capacity, trimming the oldest entries if needed.
    pub fn register(&mut self, id: &str, capacity: usize) {
        let mut fresh = TimeSeries::new(capacity);
        if let Some(existing) = self.series.remove(id) {
            for sample in existing.samples {
                fresh.push(sample.timestamp, sample.value);
            }
        }
        self.series.insert(id.to_string(), fresh);
    }

    /// Append a sample; unknown ids are created with the default capacity
    pub fn append(&mut self, id: &str, timestamp: DateTime<Utc>, value: f64) {
        let default_capacity = self.default_capacity;
        let series = self
            .series
            .entry(id.to_string())
            .or_insert_with(|| TimeSeries::new(default_capacity));

        series.push(timestamp, value);
        trace!("{id}: appended {value} ({}/{})", series.len(), series.capacity());
    }

    /// Values of a series, oldest first. Unknown ids yield an empty list.
    pub fn snapshot(&self, id: &str) -> Vec<f64> {
        self.series.get(id).map(TimeSeries::values).unwrap_or_default()
    }

    pub fn get(&self, id: &str) -> Option<&TimeSeries> {
        self.series.get(id)
    }

    /// Relative bar heights of the CPU sparkline, scaled to its current maximum
    ///
    /// Returns nothing until at least two samples exist. An all-zero history
    /// renders as flat zero bars.
    pub fn sparkline_heights(&self, max_height: f64) -> Vec<f64> {
        let Some(series) = self.series.get(CPU_SPARKLINE) else {
            return Vec::new();
        };

        if series.len() < 2 {
            return Vec::new();
        }

        let max = series.max().unwrap_or_default();
        series
            .samples()
            .map(|s| {
                if max > 0.0 {
                    s.value / max * max_height
                } else {
                    0.0
                }
            })
            .collect()
    }
}

impl Default for HistoryBuffers {
    fn default() -> Self {
        Self::new()
    }
}

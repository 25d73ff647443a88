//! Timing utilities
//!
//! The pipeline reports wall-clock processing time, which makes reports
//! differ run to run. `ProcessingClock` lets callers substitute a fixed
//! reading when they need byte-identical output.

use std::collections::HashMap;
use std::fmt::Debug;
use std::time::Instant;

/// Source of the `processingTimeMs` figure
pub trait ProcessingClock: Send + Sync + Debug {
    fn elapsed_ms(&self, started: Instant) -> u64;
}

/// Real elapsed time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl ProcessingClock for SystemClock {
    fn elapsed_ms(&self, started: Instant) -> u64 {
        u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Always reports the same value
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedClock(pub u64);

impl ProcessingClock for FixedClock {
    fn elapsed_ms(&self, _started: Instant) -> u64 {
        self.0
    }
}

/// Per-stage timings for one conversion, logged at debug level
#[derive(Debug, Default)]
pub struct StageTimings {
    measurements: HashMap<&'static str, Vec<f32>>,
    order: Vec<&'static str>,
}

impl StageTimings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_measurement(&mut self, stage: &'static str, duration_ms: f32) {
        if !self.measurements.contains_key(stage) {
            self.order.push(stage);
        }
        self.measurements.entry(stage).or_default().push(duration_ms);
    }

    /// Run `f` and record how long it took under `stage`
    pub fn time<T>(&mut self, stage: &'static str, f: impl FnOnce() -> T) -> T {
        let started = Instant::now();
        let value = f();
        self.record_measurement(stage, started.elapsed().as_secs_f32() * 1000.0);
        value
    }

    pub fn get_average_time(&self, stage: &str) -> Option<f32> {
        self.measurements.get(stage).map(|times| {
            if times.is_empty() {
                0.0
            } else {
                times.iter().sum::<f32>() / times.len() as f32
            }
        })
    }

    /// "normalize=1.20ms validate=0.40ms"
    pub fn summary(&self) -> String {
        self.order
            .iter()
            .filter_map(|stage| self.get_average_time(stage).map(|ms| format!("{}={:.2}ms", stage, ms)))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

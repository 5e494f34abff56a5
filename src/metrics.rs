//! Operational counters for an engine instance.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Point-in-time copy of the engine counters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EngineMetrics {
    pub decisions: u64,
    /// Embeddings written to the index, by callers and by the engine itself.
    pub registrations: u64,
    pub violations: u64,
    /// Mean wall time of a decision, in microseconds. Zero before the first decision.
    pub average_latency_micros: f64,
}

#[derive(Debug, Default)]
pub(crate) struct MetricsRecorder {
    decisions: AtomicU64,
    registrations: AtomicU64,
    violations: AtomicU64,
    latency_nanos: AtomicU64,
}

impl MetricsRecorder {
    pub(crate) fn record_decision(&self, elapsed: Duration, violations: usize) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.latency_nanos.fetch_add(nanos, Ordering::Relaxed);
        self.violations.fetch_add(violations as u64, Ordering::Relaxed);
        self.decisions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_registration(&self) {
        self.registrations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> EngineMetrics {
        let decisions = self.decisions.load(Ordering::Relaxed);
        let latency_nanos = self.latency_nanos.load(Ordering::Relaxed);
        let average_latency_micros = if decisions == 0 {
            0.0
        } else {
            latency_nanos as f64 / decisions as f64 / 1_000.0
        };
        EngineMetrics {
            decisions,
            registrations: self.registrations.load(Ordering::Relaxed),
            violations: self.violations.load(Ordering::Relaxed),
            average_latency_micros,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_recorder_reports_zero_latency() {
        assert_eq!(MetricsRecorder::default().snapshot(), EngineMetrics::default());
    }

    #[test]
    fn average_latency_is_per_decision() {
        let m = MetricsRecorder::default();
        m.record_decision(Duration::from_micros(100), 2);
        m.record_decision(Duration::from_micros(300), 0);
        m.record_registration();

        let snap = m.snapshot();
        assert_eq!(snap.decisions, 2);
        assert_eq!(snap.violations, 2);
        assert_eq!(snap.registrations, 1);
        assert!((snap.average_latency_micros - 200.0).abs() < 1e-9);
    }
}

//! Hierarchical counters and timers for pipeline stages.
//!
//! Every stage records into an [`EtlMetrics`] scope handed to it on `open`. Scopes form a tree:
//! a child created with [`EtlMetrics::create_child_metrics`] rolls everything it recorded up into
//! its parent when it is closed. [`GlobalMetrics`] is a root that forwards what reaches it to the
//! `metrics` facade, so any installed recorder (Prometheus exporter, test recorder, ...) sees
//! the totals.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, Once};
use std::time::Instant;

use metrics::{Unit, counter, describe_counter, describe_histogram, histogram};
use tracing::warn;

static REGISTER_METRICS: Once = Once::new();

pub const RECORDS_EXTRACTED: &str = "records.extracted";
pub const RECORDS_CONSUMED: &str = "records.consumed";
pub const RECORDS_TRANSFORMED: &str = "records.transformed";
pub const WORK_FAILED: &str = "executor.work.failed";
pub const WORK_PANICKED: &str = "executor.work.panicked";
pub const PIPELINE_RUN: &str = "pipeline.run";
pub const MILLIS_PER_SEC: f64 = 1_000.0;

/// Registers descriptions for the metrics emitted by this crate. It is safe to call this method
/// multiple times, the metrics are only described once.
pub(crate) fn register_metrics() {
    REGISTER_METRICS.call_once(|| {
        describe_counter!(
            facade_name(RECORDS_EXTRACTED),
            Unit::Count,
            "Total number of records produced by extractors"
        );

        describe_counter!(
            facade_name(RECORDS_CONSUMED),
            Unit::Count,
            "Total number of records accepted by consumers"
        );

        describe_counter!(
            facade_name(RECORDS_TRANSFORMED),
            Unit::Count,
            "Total number of records produced by transformers"
        );

        describe_counter!(
            facade_name(WORK_FAILED),
            Unit::Count,
            "Total number of executor work units that returned an error"
        );

        describe_counter!(
            facade_name(WORK_PANICKED),
            Unit::Count,
            "Total number of executor work units that panicked"
        );

        describe_histogram!(
            format!("{}_duration_seconds", facade_name(PIPELINE_RUN)),
            Unit::Seconds,
            "Time taken in seconds to run a pipeline to completion"
        );
    });
}

/// Converts a dotted metrics key into a facade metric name, e.g. `records.extracted` becomes
/// `etl_records_extracted`.
fn facade_name(key: &str) -> String {
    format!("etl_{}", key.replace('.', "_"))
}

/// A scope that records counts and times.
///
/// Aggregation is up to the implementation. Closing a scope that was created as a child of
/// another rolls its data up into the parent; closing it again has no effect.
pub trait EtlMetrics: fmt::Debug + Send + Sync {
    /// Creates a scope linked to this one.
    fn create_child_metrics(&self) -> Arc<dyn EtlMetrics>;

    fn add_count(&self, key: &str, value: f64);

    /// Adds a duration in milliseconds.
    fn add_time(&self, key: &str, millis: f64);

    fn close(&self);
}

/// Everything a scope recorded. `closed` lives under the same lock so that no value can be
/// added after the roll-up snapshot was taken.
#[derive(Debug, Default)]
struct Recorded {
    counts: BTreeMap<String, f64>,
    times: BTreeMap<String, f64>,
    closed: bool,
}

#[derive(Debug)]
struct Inner {
    parent: Option<Arc<dyn EtlMetrics>>,
    recorded: Mutex<Recorded>,
}

/// In-memory [`EtlMetrics`] that sums counts and times per key.
///
/// Cloning yields another handle to the same scope.
#[derive(Debug, Clone)]
pub struct RecordingMetrics {
    inner: Arc<Inner>,
}

impl RecordingMetrics {
    /// Creates a root scope.
    pub fn new() -> RecordingMetrics {
        RecordingMetrics::with_parent(None)
    }

    /// Creates a scope that rolls up into `parent` when closed.
    pub fn child_of(parent: Arc<dyn EtlMetrics>) -> RecordingMetrics {
        RecordingMetrics::with_parent(Some(parent))
    }

    fn with_parent(parent: Option<Arc<dyn EtlMetrics>>) -> RecordingMetrics {
        RecordingMetrics {
            inner: Arc::new(Inner {
                parent,
                recorded: Mutex::new(Recorded::default()),
            }),
        }
    }

    /// Returns the sum of all counts recorded under `key`, `0.0` if there are none.
    pub fn count(&self, key: &str) -> f64 {
        self.read(|recorded| recorded.counts.get(key).copied().unwrap_or_default())
    }

    /// Returns the sum of all times recorded under `key` in milliseconds.
    pub fn time(&self, key: &str) -> f64 {
        self.read(|recorded| recorded.times.get(key).copied().unwrap_or_default())
    }

    /// Returns a snapshot of all counts.
    pub fn counts(&self) -> BTreeMap<String, f64> {
        self.read(|recorded| recorded.counts.clone())
    }

    /// Returns a snapshot of all times.
    pub fn times(&self) -> BTreeMap<String, f64> {
        self.read(|recorded| recorded.times.clone())
    }

    pub fn is_closed(&self) -> bool {
        self.read(|recorded| recorded.closed)
    }

    fn read<R>(&self, f: impl FnOnce(&Recorded) -> R) -> R {
        match self.inner.recorded.lock() {
            Ok(recorded) => f(&recorded),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }

    fn write<R>(&self, f: impl FnOnce(&mut Recorded) -> R) -> R {
        match self.inner.recorded.lock() {
            Ok(mut recorded) => f(&mut recorded),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}

impl Default for RecordingMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl EtlMetrics for RecordingMetrics {
    fn create_child_metrics(&self) -> Arc<dyn EtlMetrics> {
        Arc::new(RecordingMetrics::child_of(Arc::new(self.clone())))
    }

    fn add_count(&self, key: &str, value: f64) {
        self.write(|recorded| {
            if recorded.closed {
                warn!(key, "count added to a closed metrics scope, ignoring it");
                return;
            }

            *recorded.counts.entry(key.to_string()).or_default() += value;
        });
    }

    fn add_time(&self, key: &str, millis: f64) {
        self.write(|recorded| {
            if recorded.closed {
                warn!(key, "time added to a closed metrics scope, ignoring it");
                return;
            }

            *recorded.times.entry(key.to_string()).or_default() += millis;
        });
    }

    fn close(&self) {
        let snapshot = self.write(|recorded| {
            if recorded.closed {
                return None;
            }
            recorded.closed = true;

            Some((recorded.counts.clone(), recorded.times.clone()))
        });

        let (Some(parent), Some((counts, times))) = (&self.inner.parent, snapshot) else {
            return;
        };

        for (key, value) in counts {
            parent.add_count(&key, value);
        }
        for (key, millis) in times {
            parent.add_time(&key, millis);
        }
    }
}

/// Root scope that forwards everything rolled up into it to the `metrics` facade.
///
/// Counts become counters and times become histograms in seconds, both named after the dotted
/// key with an `etl_` prefix.
#[derive(Debug, Clone, Default)]
pub struct GlobalMetrics;

impl GlobalMetrics {
    pub fn new() -> GlobalMetrics {
        register_metrics();

        GlobalMetrics
    }
}

impl EtlMetrics for GlobalMetrics {
    fn create_child_metrics(&self) -> Arc<dyn EtlMetrics> {
        Arc::new(RecordingMetrics::child_of(Arc::new(self.clone())))
    }

    fn add_count(&self, key: &str, value: f64) {
        if value < 0.0 {
            warn!(key, value, "negative count cannot be forwarded to a counter");
            return;
        }

        counter!(facade_name(key)).increment(value.round() as u64);
    }

    fn add_time(&self, key: &str, millis: f64) {
        histogram!(format!("{}_duration_seconds", facade_name(key))).record(millis / MILLIS_PER_SEC);
    }

    fn close(&self) {}
}

/// Times a block of work in its own child scope.
///
/// On drop the elapsed time is recorded under the scope's key and the child is closed, which
/// rolls everything recorded inside the block up into the parent.
#[derive(Debug)]
pub struct ProfilingScope {
    metrics: Arc<dyn EtlMetrics>,
    key: &'static str,
    started_at: Instant,
}

impl ProfilingScope {
    pub fn new(parent: &dyn EtlMetrics, key: &'static str) -> ProfilingScope {
        ProfilingScope {
            metrics: parent.create_child_metrics(),
            key,
            started_at: Instant::now(),
        }
    }

    /// The child scope to record into while the block runs.
    pub fn metrics(&self) -> &Arc<dyn EtlMetrics> {
        &self.metrics
    }
}

impl Drop for ProfilingScope {
    fn drop(&mut self) {
        let elapsed = self.started_at.elapsed().as_secs_f64() * MILLIS_PER_SEC;
        self.metrics.add_time(self.key, elapsed);
        self.metrics.close();
    }
}

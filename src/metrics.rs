//! Telemetry samples emitted by a session and the sink they are handed to

use std::{
    collections::BTreeMap,
    fmt,
    sync::Arc,
    time::{Duration, Instant, SystemTime},
};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Metric tag set, keyed by tag name
pub type Tags = BTreeMap<String, String>;

pub const TAG_URL: &str = "url";
pub const TAG_STATUS: &str = "status";
pub const TAG_IP: &str = "ip";

/// Identity of a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    /// Time from sending the request to having response headers, in milliseconds
    ConnectionDuration,
    /// One per finished session
    RequestCount,
    /// Connection time repeated in the end-of-session set, in milliseconds
    SendDuration,
    /// Whole session lifetime, in milliseconds
    TotalDuration,
    /// One per decoded event handed to the handlers
    EventReceived,
}

impl Metric {
    pub const fn name(self) -> &'static str {
        match self {
            Metric::ConnectionDuration => "sse_connecting",
            Metric::RequestCount => "http_reqs",
            Metric::SendDuration => "http_req_sending",
            Metric::TotalDuration => "http_req_duration",
            Metric::EventReceived => "sse_event",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub metric: Metric,
    pub tags: Tags,
    pub time: SystemTime,
    pub value: f64,
}

/// Samples that belong together and are emitted in one call
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSet {
    pub samples: Vec<Sample>,
    pub tags: Tags,
    pub time: SystemTime,
}

impl SampleSet {
    fn new(tags: &Tags, time: SystemTime, values: &[(Metric, f64)]) -> Self {
        let samples = values
            .iter()
            .map(|&(metric, value)| Sample {
                metric,
                tags: tags.clone(),
                time,
                value,
            })
            .collect();
        Self {
            samples,
            tags: tags.clone(),
            time,
        }
    }
}

/// Receiver of emitted samples.
///
/// `emit` is called from the session's control loop and must not block. Closures of type
/// `Fn(SampleSet)` implement this trait.
pub trait MetricsSink: Send + Sync {
    fn emit(&self, samples: SampleSet);
}

impl<F> MetricsSink for F
where
    F: Fn(SampleSet) + Send + Sync,
{
    fn emit(&self, samples: SampleSet) {
        self(samples)
    }
}

/// Sink that throws everything away
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

impl MetricsSink for Discard {
    fn emit(&self, _samples: SampleSet) {}
}

/// Bounded channel sink. When the receiver falls behind, sample sets are dropped with a warning
/// instead of stalling the session.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<SampleSet>,
}

impl ChannelSink {
    /// # Panics
    ///
    /// Panics if `capacity` is 0, like [mpsc::channel].
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<SampleSet>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

impl MetricsSink for ChannelSink {
    fn emit(&self, samples: SampleSet) {
        match self.tx.try_send(samples) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(set)) => {
                warn!(samples = set.samples.len(), "metrics channel full, dropping samples");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("metrics receiver dropped");
            }
        }
    }
}

/// When a request was sent and how long it took to get a response
#[derive(Debug, Clone, Copy)]
pub struct RequestTiming {
    pub started_at: SystemTime,
    pub start: Instant,
    pub connect: Duration,
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

/// Emits the samples of one session.
///
/// Nothing is emitted once `parent` is cancelled: the context owning the session is gone and the
/// sink may be too.
#[derive(Clone)]
pub struct Reporter {
    sink: Arc<dyn MetricsSink>,
    parent: CancellationToken,
    tags: Tags,
}

impl fmt::Debug for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reporter")
            .field("tags", &self.tags)
            .field("parent_cancelled", &self.parent.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl Reporter {
    pub fn new(sink: Arc<dyn MetricsSink>, parent: CancellationToken, tags: Tags) -> Self {
        Self { sink, parent, tags }
    }

    /// Adds or replaces a tag on every later sample
    pub fn tag(&mut self, key: &str, value: impl Into<String>) {
        self.tags.insert(key.to_string(), value.into());
    }

    fn push(&self, samples: SampleSet) {
        if self.parent.is_cancelled() {
            debug!("context done, skipping {} samples", samples.samples.len());
            return;
        }
        self.sink.emit(samples);
    }

    /// Connection-establishment sample, stamped with the request start time
    pub fn connection_sample(&self, timing: &RequestTiming) {
        self.push(SampleSet::new(
            &self.tags,
            timing.started_at,
            &[(Metric::ConnectionDuration, millis(timing.connect))],
        ));
    }

    pub fn event_received(&self) {
        self.push(SampleSet::new(
            &self.tags,
            SystemTime::now(),
            &[(Metric::EventReceived, 1.0)],
        ));
    }

    /// End-of-session set: request count, send duration and total duration
    pub fn request_finished(&self, timing: &RequestTiming) {
        self.push(SampleSet::new(
            &self.tags,
            SystemTime::now(),
            &[
                (Metric::RequestCount, 1.0),
                (Metric::SendDuration, millis(timing.connect)),
                (Metric::TotalDuration, millis(timing.start.elapsed())),
            ],
        ));
    }

    /// Emits [Reporter::request_finished] when the returned guard drops, whichever way the
    /// session ends
    pub fn finish_on_drop(self, timing: RequestTiming) -> RequestSamples {
        RequestSamples {
            reporter: self,
            timing,
        }
    }
}

/// See [Reporter::finish_on_drop]
#[derive(Debug)]
pub struct RequestSamples {
    reporter: Reporter,
    timing: RequestTiming,
}

impl RequestSamples {
    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }
}

impl Drop for RequestSamples {
    fn drop(&mut self) {
        self.reporter.request_finished(&self.timing);
    }
}

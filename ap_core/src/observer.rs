use serde::Deserialize;
use std::io::Write;
use std::time::Duration;

use crate::progress::{PercentageValue, ProgressSample};

/// A fetch unit as described by the cache engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OperationItem {
    pub uri: String,
    pub short_desc: String,
}

impl OperationItem {
    pub fn new(uri: impl Into<String>, short_desc: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            short_desc: short_desc.into(),
        }
    }
}

/// Callbacks a cache engine invokes while acquiring index files.
///
/// Calls arrive synchronously on the thread driving the refresh. Boolean
/// returns are continuation signals: `false` asks the engine to abort.
pub trait AcquireProgress {
    fn start(&mut self);
    fn pulse(&mut self, sample: ProgressSample) -> bool;
    fn stop(&mut self);
    fn fail(&mut self, item: &OperationItem);
    fn fetch(&mut self, item: &OperationItem);
    fn cache_hit(&mut self, item: &OperationItem);
    fn done(&mut self, item: &OperationItem);
    fn media_change(&mut self, medium: &str, drive: &str) -> bool;
}

/// Destination for progress updates. Delivery is best effort.
pub trait ProgressSink {
    fn notify(&self, percentage: PercentageValue);

    /// Tell the subscriber the refresh finished.
    fn notify_succeeded(&self);

    /// Tell the subscriber the refresh aborted.
    fn notify_failed(&self);

    /// Per-item status line (fetch, hit, done, failure).
    fn notify_status(&self, _message: &str) {}

    /// Transfer rate derived from consecutive pulses.
    fn notify_speed(&self, _bytes_per_sec: u64) {}

    /// Notifications that could not be delivered so far.
    fn dropped(&self) -> u64 {
        0
    }
}

impl<T: ProgressSink + ?Sized> ProgressSink for &T {
    fn notify(&self, percentage: PercentageValue) {
        (**self).notify(percentage)
    }

    fn notify_succeeded(&self) {
        (**self).notify_succeeded()
    }

    fn notify_failed(&self) {
        (**self).notify_failed()
    }

    fn notify_status(&self, message: &str) {
        (**self).notify_status(message)
    }

    fn notify_speed(&self, bytes_per_sec: u64) {
        (**self).notify_speed(bytes_per_sec)
    }

    fn dropped(&self) -> u64 {
        (**self).dropped()
    }
}

/// Asks the operator to insert a medium. Returns `true` once it is provided.
pub trait MediaPrompt {
    fn prompt_for_medium(&mut self) -> bool;
}

impl<T: MediaPrompt + ?Sized> MediaPrompt for &mut T {
    fn prompt_for_medium(&mut self) -> bool {
        (**self).prompt_for_medium()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverState {
    Idle,
    Running,
    Completed,
}

/// Lifecycle state machine bridging engine callbacks to a [`ProgressSink`].
///
/// Operator-facing notices go to `out`; percentages, item status and
/// transfer speed go to the sink.
pub struct UpdateProgressObserver<S, P, W> {
    sink: S,
    prompt: P,
    out: W,
    state: ObserverState,
    sample: ProgressSample,
    last_pulse_bytes: u64,
    pulse_interval: Duration,
}

impl<S, P, W> UpdateProgressObserver<S, P, W>
where
    S: ProgressSink,
    P: MediaPrompt,
    W: Write,
{
    pub fn new(sink: S, prompt: P, out: W) -> Self {
        Self {
            sink,
            prompt,
            out,
            state: ObserverState::Idle,
            sample: ProgressSample::default(),
            last_pulse_bytes: 0,
            pulse_interval: Duration::ZERO,
        }
    }

    /// Expected time between pulses, used to turn byte deltas into a rate.
    /// Zero reports the raw delta per pulse.
    pub fn with_pulse_interval(mut self, pulse_interval: Duration) -> Self {
        self.pulse_interval = pulse_interval;
        self
    }

    pub fn state(&self) -> ObserverState {
        self.state
    }

    pub fn sample(&self) -> ProgressSample {
        self.sample
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    fn say(&mut self, line: &str) {
        if let Err(e) = writeln!(self.out, "{line}") {
            tracing::warn!(error = %e, "failed to write operator notice");
        }
    }

    fn report_item(&mut self, label: &str, item: &OperationItem) {
        let line = format!("{label}: {} {}", item.uri, item.short_desc);
        self.say(&line);
        self.sink.notify_status(&line);
    }

    fn bytes_per_sec(&self, current_bytes: u64) -> u64 {
        let delta = current_bytes.saturating_sub(self.last_pulse_bytes);
        if self.pulse_interval.is_zero() {
            return delta;
        }
        (delta as f64 / self.pulse_interval.as_secs_f64()).round() as u64
    }
}

impl<S, P, W> AcquireProgress for UpdateProgressObserver<S, P, W>
where
    S: ProgressSink,
    P: MediaPrompt,
    W: Write,
{
    fn start(&mut self) {
        if self.state == ObserverState::Running {
            tracing::warn!("start received while already running; ignored");
            return;
        }
        self.sample = ProgressSample::default();
        self.last_pulse_bytes = 0;
        self.state = ObserverState::Running;
        self.say("Starting APT cache update.");
    }

    fn pulse(&mut self, sample: ProgressSample) -> bool {
        if self.state != ObserverState::Running {
            tracing::warn!(state = ?self.state, "pulse outside of a running update; ignored");
            return true;
        }
        let percentage = sample.percentage();
        let speed = self.bytes_per_sec(sample.current_bytes);
        self.sample = sample;
        self.last_pulse_bytes = sample.current_bytes;
        tracing::trace!(
            current = sample.current_bytes,
            total = sample.total_bytes,
            %percentage,
            speed,
            "pulse"
        );
        self.sink.notify(percentage);
        self.sink.notify_speed(speed);
        true
    }

    fn stop(&mut self) {
        if self.state != ObserverState::Running {
            tracing::warn!(state = ?self.state, "stop without a running update; ignored");
            return;
        }
        self.state = ObserverState::Completed;
        self.say("APT cache update complete.");
    }

    fn fail(&mut self, item: &OperationItem) {
        self.report_item("Failure at", item);
    }

    fn fetch(&mut self, item: &OperationItem) {
        self.report_item("Fetch", item);
    }

    fn cache_hit(&mut self, item: &OperationItem) {
        self.report_item("Hit", item);
    }

    fn done(&mut self, item: &OperationItem) {
        self.report_item("Done", item);
    }

    fn media_change(&mut self, medium: &str, drive: &str) -> bool {
        self.say(&format!("Please insert medium {medium} in drive {drive}"));
        self.prompt.prompt_for_medium()
    }
}

use std::io::Write;
use std::time::Duration;

use crate::engine::{CacheEngine, UpgradablePackage, upgradable_packages};
use crate::observer::{MediaPrompt, ObserverState, ProgressSink, UpdateProgressObserver};
use crate::Error;

/// Outcome of a successful refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshReport {
    pub upgradable: Vec<UpgradablePackage>,
    pub dropped_notifications: u64,
}

/// Runs a cache refresh with progress reporting, then lists upgrades.
pub struct UpdateOrchestrator<E> {
    engine: E,
    pulse_interval: Duration,
}

impl<E: CacheEngine> UpdateOrchestrator<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            pulse_interval: Duration::ZERO,
        }
    }

    /// Pulse interval the engine was configured with, for speed reporting.
    pub fn with_pulse_interval(mut self, pulse_interval: Duration) -> Self {
        self.pulse_interval = pulse_interval;
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Refresh the cache, reload the index and collect upgradable packages.
    ///
    /// The sink receives exactly one terminal notice: success once the engine
    /// returns, or failure before an aborting error is returned. A failed
    /// reload is returned as is; the index is never enumerated without one.
    pub fn run_refresh<S, P, W>(
        &mut self,
        sink: S,
        prompt: P,
        out: &mut W,
    ) -> Result<RefreshReport, Error>
    where
        S: ProgressSink,
        P: MediaPrompt,
        W: Write,
    {
        let mut observer = UpdateProgressObserver::new(sink, prompt, &mut *out)
            .with_pulse_interval(self.pulse_interval);
        let result = self.engine.update(&mut observer);
        let state = observer.state();
        let sink = observer.into_sink();

        if let Err(err) = result {
            tracing::warn!(error = %err, "cache refresh aborted");
            sink.notify_failed();
            return Err(err);
        }
        if state != ObserverState::Completed {
            tracing::warn!(?state, "engine finished without signalling stop");
        }
        sink.notify_succeeded();

        self.engine.reload()?;
        let upgradable = upgradable_packages(&self.engine.packages());
        tracing::debug!(count = upgradable.len(), "upgradable packages collected");

        Ok(RefreshReport {
            upgradable,
            dropped_notifications: sink.dropped(),
        })
    }
}

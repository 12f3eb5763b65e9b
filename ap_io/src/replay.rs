//! A cache engine that replays recorded lifecycle events.
//!
//! Stands in for a real package-cache binding: the script describes the
//! callbacks a refresh would fire and the index visible after reload.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use ap_core::{AcquireProgress, CacheEngine, Error, OperationItem, PackageInfo, ProgressSample};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScriptEvent {
    Start,
    Pulse { current: u64, total: u64 },
    Stop,
    Fail(OperationItem),
    Fetch(OperationItem),
    Hit(OperationItem),
    Done(OperationItem),
    MediaChange { medium: String, drive: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EngineScript {
    #[serde(default)]
    pub events: Vec<ScriptEvent>,
    /// Fail the refresh with this message after the events are replayed.
    #[serde(default)]
    pub fail_with: Option<String>,
    #[serde(default)]
    pub reload_fail_with: Option<String>,
    #[serde(default)]
    pub packages: Vec<PackageInfo>,
}

#[derive(Debug)]
pub struct ReplayEngine {
    script: EngineScript,
    index: Vec<PackageInfo>,
    pulse_interval: Duration,
}

impl ReplayEngine {
    pub fn new(script: EngineScript) -> Self {
        Self {
            script,
            index: Vec::new(),
            pulse_interval: Duration::ZERO,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, Error> {
        let script = serde_json::from_str(json).map_err(|e| Error::InvalidScript {
            message: e.to_string(),
        })?;
        Ok(Self::new(script))
    }

    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::io(format!("reading {}", path.display()), e))?;
        Self::from_json(&json)
    }

    /// Sleep this long after each pulse.
    pub fn with_pulse_interval(mut self, pulse_interval: Duration) -> Self {
        self.pulse_interval = pulse_interval;
        self
    }
}

impl CacheEngine for ReplayEngine {
    fn update(&mut self, progress: &mut dyn AcquireProgress) -> Result<(), Error> {
        for event in &self.script.events {
            match event {
                ScriptEvent::Start => progress.start(),
                ScriptEvent::Pulse { current, total } => {
                    if !progress.pulse(ProgressSample::new(*current, *total)) {
                        return Err(Error::RefreshFailed {
                            message: "cancelled by progress observer".to_string(),
                        });
                    }
                    if !self.pulse_interval.is_zero() {
                        std::thread::sleep(self.pulse_interval);
                    }
                }
                ScriptEvent::Stop => progress.stop(),
                ScriptEvent::Fail(item) => progress.fail(item),
                ScriptEvent::Fetch(item) => progress.fetch(item),
                ScriptEvent::Hit(item) => progress.cache_hit(item),
                ScriptEvent::Done(item) => progress.done(item),
                ScriptEvent::MediaChange { medium, drive } => {
                    if !progress.media_change(medium, drive) {
                        return Err(Error::MediaDeclined {
                            medium: medium.clone(),
                            drive: drive.clone(),
                        });
                    }
                }
            }
        }

        match &self.script.fail_with {
            Some(message) => Err(Error::RefreshFailed {
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }

    fn reload(&mut self) -> Result<(), Error> {
        if let Some(message) = &self.script.reload_fail_with {
            return Err(Error::ReloadFailed {
                message: message.clone(),
            });
        }
        self.index = self.script.packages.clone();
        Ok(())
    }

    fn packages(&self) -> Vec<PackageInfo> {
        self.index.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IpcNotifier;
    use ap_core::{
        FAILED_SENTINEL, MediaPrompt, ProgressSink, SUCCEEDED_SENTINEL, UpdateOrchestrator,
    };
    use std::io::Read;
    use std::os::unix::net::UnixListener;
    use std::thread;
    use tempfile::TempDir;

    struct Answer(bool);

    impl MediaPrompt for Answer {
        fn prompt_for_medium(&mut self) -> bool {
            self.0
        }
    }

    const SCRIPT: &str = r#"{
        "events": [
            {"type": "start"},
            {"type": "fetch", "uri": "http://deb.example/stable/InRelease",
             "short_desc": "InRelease"},
            {"type": "pulse", "current": 10, "total": 100},
            {"type": "hit", "uri": "http://deb.example/updates/InRelease",
             "short_desc": "InRelease"},
            {"type": "pulse", "current": 55, "total": 100},
            {"type": "done", "uri": "http://deb.example/stable/InRelease",
             "short_desc": "InRelease"},
            {"type": "pulse", "current": 100, "total": 100},
            {"type": "stop"}
        ],
        "packages": [
            {"name": "A", "arch": "amd64", "installed": "1.0", "candidate": "1.0",
             "upgradable": false},
            {"name": "B", "arch": "amd64", "installed": "1.0", "candidate": "2.0",
             "upgradable": true}
        ]
    }"#;

    fn collect(listener: UnixListener, count: usize) -> thread::JoinHandle<Vec<String>> {
        thread::spawn(move || {
            let mut payloads = Vec::new();
            for _ in 0..count {
                let (mut stream, _) = listener.accept().unwrap();
                let mut payload = String::new();
                stream.read_to_string(&mut payload).unwrap();
                payloads.push(payload);
            }
            payloads
        })
    }

    fn orchestrator(script: &str) -> UpdateOrchestrator<ReplayEngine> {
        UpdateOrchestrator::new(ReplayEngine::from_json(script).unwrap())
    }

    #[test]
    fn parses_script() {
        let engine = ReplayEngine::from_json(SCRIPT).unwrap();
        assert_eq!(engine.script.events.len(), 8);
        assert_eq!(
            engine.script.events[2],
            ScriptEvent::Pulse {
                current: 10,
                total: 100
            }
        );
        assert_eq!(engine.script.packages.len(), 2);
    }

    #[test]
    fn rejects_unknown_event() {
        let err = ReplayEngine::from_json(r#"{"events":[{"type":"explode"}]}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidScript { .. }));
    }

    #[test]
    fn index_is_empty_until_reload() {
        let mut engine = ReplayEngine::from_json(SCRIPT).unwrap();
        assert!(engine.packages().is_empty());
        engine.reload().unwrap();
        assert_eq!(engine.packages().len(), 2);
    }

    #[test]
    fn full_refresh_end_to_end() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("pulse.sock");
        let subscriber = collect(UnixListener::bind(&path).unwrap(), 4);

        let mut orchestrator = orchestrator(SCRIPT);
        let mut out = Vec::new();
        let report = orchestrator
            .run_refresh(IpcNotifier::new(&path), Answer(true), &mut out)
            .unwrap();

        assert_eq!(
            subscriber.join().unwrap(),
            vec!["10.0", "55.0", "100.0", SUCCEEDED_SENTINEL]
        );
        let lines: Vec<String> = report.upgradable.iter().map(ToString::to_string).collect();
        assert_eq!(lines, vec!["B (1.0 -> 2.0)"]);
        assert_eq!(report.dropped_notifications, 0);

        let log = String::from_utf8(out).unwrap();
        assert!(log.starts_with("Starting APT cache update.\n"));
        assert!(log.ends_with("APT cache update complete.\n"));
    }

    #[test]
    fn status_endpoint_sees_item_lines() {
        let tmp = TempDir::new().unwrap();
        let status_path = tmp.path().join("status.sock");
        let status = collect(UnixListener::bind(&status_path).unwrap(), 4);
        let notifier =
            IpcNotifier::new(tmp.path().join("none.sock")).with_status_socket(&status_path);

        let mut orchestrator = orchestrator(SCRIPT);
        let mut out = Vec::new();
        orchestrator
            .run_refresh(&notifier, Answer(true), &mut out)
            .unwrap();

        assert_eq!(
            status.join().unwrap(),
            vec![
                "Fetch: http://deb.example/stable/InRelease InRelease",
                "Hit: http://deb.example/updates/InRelease InRelease",
                "Done: http://deb.example/stable/InRelease InRelease",
                SUCCEEDED_SENTINEL,
            ]
        );
    }

    #[test]
    fn refresh_without_subscriber_still_reports() {
        let tmp = TempDir::new().unwrap();
        let notifier = IpcNotifier::new(tmp.path().join("none.sock"));
        let mut orchestrator = orchestrator(SCRIPT);
        let mut out = Vec::new();

        let report = orchestrator
            .run_refresh(&notifier, Answer(true), &mut out)
            .unwrap();

        // Three percentages and the success sentinel.
        assert_eq!(report.dropped_notifications, 4);
        assert_eq!(report.upgradable.len(), 1);
    }

    #[test]
    fn hard_failure_sends_sentinel() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("pulse.sock");
        let subscriber = collect(UnixListener::bind(&path).unwrap(), 1);

        let script = r#"{
            "events": [{"type": "start"}],
            "fail_with": "Temporary failure resolving 'deb.example'"
        }"#;
        let mut orchestrator = orchestrator(script);
        let mut out = Vec::new();

        let err = orchestrator
            .run_refresh(IpcNotifier::new(&path), Answer(true), &mut out)
            .unwrap_err();

        assert!(err.is_abort());
        assert_eq!(subscriber.join().unwrap(), vec![FAILED_SENTINEL]);
    }

    #[test]
    fn declined_medium_stops_replay() {
        let tmp = TempDir::new().unwrap();
        let script = r#"{
            "events": [
                {"type": "start"},
                {"type": "media_change", "medium": "Debian 12 DVD 2", "drive": "/media/cdrom"},
                {"type": "pulse", "current": 1, "total": 2},
                {"type": "stop"}
            ]
        }"#;
        let notifier = IpcNotifier::new(tmp.path().join("none.sock"));
        let mut orchestrator = orchestrator(script);
        let mut out = Vec::new();

        let err = orchestrator
            .run_refresh(&notifier, Answer(false), &mut out)
            .unwrap_err();

        assert_eq!(
            err,
            Error::MediaDeclined {
                medium: "Debian 12 DVD 2".into(),
                drive: "/media/cdrom".into()
            }
        );
        // Only the failure sentinel was attempted.
        assert_eq!(notifier.dropped(), 1);
    }

    #[test]
    fn reload_failure_is_fatal() {
        let script = r#"{
            "events": [{"type": "start"}, {"type": "stop"}],
            "reload_fail_with": "could not open lists"
        }"#;
        let tmp = TempDir::new().unwrap();
        let mut orchestrator = orchestrator(script);
        let mut out = Vec::new();

        let err = orchestrator
            .run_refresh(IpcNotifier::new(tmp.path().join("none.sock")), Answer(true), &mut out)
            .unwrap_err();

        assert!(matches!(
            err,
            Error::ReloadFailed { ref message } if message == "could not open lists"
        ));
    }
}

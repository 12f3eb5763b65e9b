use indicatif::HumanBytes;
use std::io::Write;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use ap_core::{Error, FAILED_SENTINEL, PercentageValue, ProgressSink, SUCCEEDED_SENTINEL};

use crate::Config;

/// Sends each notification over a fresh Unix socket connection.
///
/// Nothing is read back. A missing or unresponsive subscriber only bumps the
/// dropped counter; connect and write use the OS default timeouts. Status
/// lines and speeds go to their own endpoints and are skipped when those are
/// not configured.
#[derive(Debug)]
pub struct IpcNotifier {
    socket_path: PathBuf,
    status_socket_path: Option<PathBuf>,
    speed_socket_path: Option<PathBuf>,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl IpcNotifier {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            status_socket_path: None,
            speed_socket_path: None,
            delivered: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            status_socket_path: config.status_socket_path.clone(),
            speed_socket_path: config.speed_socket_path.clone(),
            ..Self::new(config.socket_path.clone())
        }
    }

    pub fn with_status_socket(mut self, socket_path: impl Into<PathBuf>) -> Self {
        self.status_socket_path = Some(socket_path.into());
        self
    }

    pub fn with_speed_socket(mut self, socket_path: impl Into<PathBuf>) -> Self {
        self.speed_socket_path = Some(socket_path.into());
        self
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Connect, write `payload`, close. The stream is closed on every path.
    pub fn send(&self, payload: &str) -> Result<(), Error> {
        send_to(&self.socket_path, payload)
    }

    fn deliver(&self, socket_path: &Path, payload: &str) {
        match send_to(socket_path, payload) {
            Ok(()) => {
                self.delivered.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(%payload, "notification delivered");
            }
            Err(e) => {
                let previous = self.dropped.fetch_add(1, Ordering::Relaxed);
                if previous == 0 {
                    tracing::warn!(error = %e, "subscriber unreachable; dropping notifications");
                } else {
                    tracing::debug!(error = %e, %payload, "notification dropped");
                }
            }
        }
    }

    // Sentinels go to the percentage endpoint and, when set, the status one.
    fn deliver_terminal(&self, payload: &str) {
        self.deliver(&self.socket_path, payload);
        if let Some(status) = &self.status_socket_path {
            self.deliver(status, payload);
        }
    }
}

fn send_to(socket_path: &Path, payload: &str) -> Result<(), Error> {
    let mut stream = UnixStream::connect(socket_path)
        .map_err(|e| Error::io(format!("connecting to {}", socket_path.display()), e))?;
    stream
        .write_all(payload.as_bytes())
        .map_err(|e| Error::io(format!("writing to {}", socket_path.display()), e))?;
    Ok(())
}

/// Speed payload, e.g. `1.20 MiB/s`.
pub fn format_speed(bytes_per_sec: u64) -> String {
    format!("{}/s", HumanBytes(bytes_per_sec))
}

impl ProgressSink for IpcNotifier {
    fn notify(&self, percentage: PercentageValue) {
        self.deliver(&self.socket_path, &percentage.to_string());
    }

    fn notify_succeeded(&self) {
        self.deliver_terminal(SUCCEEDED_SENTINEL);
    }

    fn notify_failed(&self) {
        self.deliver_terminal(FAILED_SENTINEL);
    }

    fn notify_status(&self, message: &str) {
        if let Some(status) = &self.status_socket_path {
            self.deliver(status, message);
        }
    }

    fn notify_speed(&self, bytes_per_sec: u64) {
        if let Some(speed) = &self.speed_socket_path {
            self.deliver(speed, &format_speed(bytes_per_sec));
        }
    }

    fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

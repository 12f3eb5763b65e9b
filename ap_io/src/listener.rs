use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ap_core::{Error, FAILED_SENTINEL, SUCCEEDED_SENTINEL};
use tokio::io::AsyncReadExt;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc::UnboundedSender;

// Payloads are short decimal strings; anything longer is truncated.
const MAX_PAYLOAD: u64 = 1024;
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(2);

/// A message received from a notifier.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Percent(f64),
    Succeeded,
    Failed,
    Other(String),
}

impl Notification {
    pub fn parse(payload: &str) -> Self {
        let payload = payload.trim();
        match payload {
            SUCCEEDED_SENTINEL => return Notification::Succeeded,
            FAILED_SENTINEL => return Notification::Failed,
            _ => {}
        }
        match payload.parse::<f64>() {
            Ok(value) if (0.0..=100.0).contains(&value) => Notification::Percent(value),
            _ => Notification::Other(payload.to_string()),
        }
    }

    /// True once no further progress is expected. `100.0` alone is not
    /// terminal: a pulse sent before totals are known also reads `100.0`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Notification::Succeeded | Notification::Failed)
    }
}

/// Subscriber side of the endpoint.
pub struct SubscriberListener {
    listener: UnixListener,
    socket_path: PathBuf,
    read_timeout: Duration,
}

impl SubscriberListener {
    /// Bind the endpoint, replacing a stale socket. Any other file at the
    /// path is left alone and reported as an error.
    pub fn bind(socket_path: impl AsRef<Path>) -> Result<Self, Error> {
        let socket_path = socket_path.as_ref().to_path_buf();
        if let Ok(meta) = std::fs::symlink_metadata(&socket_path) {
            if !meta.file_type().is_socket() {
                return Err(Error::Io {
                    context: format!("binding {}", socket_path.display()),
                    message: "path exists and is not a socket".to_string(),
                });
            }
            std::fs::remove_file(&socket_path).map_err(|e| {
                Error::io(format!("removing stale socket {}", socket_path.display()), e)
            })?;
        }
        let listener = UnixListener::bind(&socket_path)
            .map_err(|e| Error::io(format!("binding {}", socket_path.display()), e))?;
        tracing::info!(path = %socket_path.display(), "listening for progress");
        Ok(Self {
            listener,
            socket_path,
            read_timeout: DEFAULT_READ_TIMEOUT,
        })
    }

    /// Longest wait for a connected client to finish its payload.
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Forward one notification per connection until the receiver goes away.
    ///
    /// Connections are read one at a time, in accept order, so notifications
    /// arrive in the order they were sent.
    pub async fn serve(self, tx: UnboundedSender<Notification>) {
        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, _)) => {
                        if let Some(notification) =
                            read_notification(stream, self.read_timeout).await
                            && tx.send(notification).is_err()
                        {
                            break;
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "connection failed"),
                },
                _ = tx.closed() => break,
            }
        }
    }
}

impl Drop for SubscriberListener {
    fn drop(&mut self) {
        let is_socket = std::fs::symlink_metadata(&self.socket_path)
            .map(|meta| meta.file_type().is_socket())
            .unwrap_or(false);
        if is_socket {
            let _ = std::fs::remove_file(&self.socket_path);
        }
    }
}

async fn read_notification(stream: UnixStream, read_timeout: Duration) -> Option<Notification> {
    let mut buf = Vec::new();
    let mut limited = stream.take(MAX_PAYLOAD);
    let result = tokio::time::timeout(read_timeout, limited.read_to_end(&mut buf)).await;
    match result {
        Ok(Ok(_)) => Some(Notification::parse(&String::from_utf8_lossy(&buf))),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "failed to read from stream");
            None
        }
        Err(_) => {
            tracing::warn!(?read_timeout, "client did not finish its payload; dropped");
            None
        }
    }
}

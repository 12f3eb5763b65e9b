use std::path::PathBuf;
use std::time::Duration;

use ap_core::Error;

/// Endpoint used when nothing else is configured.
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/apt_pulse_update.sock";
pub const SOCKET_ENV: &str = "APT_PULSE_SOCKET";
pub const STATUS_SOCKET_ENV: &str = "APT_PULSE_STATUS_SOCKET";
pub const SPEED_SOCKET_ENV: &str = "APT_PULSE_SPEED_SOCKET";
pub const PULSE_INTERVAL_ENV: &str = "APT_PULSE_INTERVAL_MS";

const DEFAULT_PULSE_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Unix socket receiving percentages and the terminal sentinels.
    pub socket_path: PathBuf,
    /// Optional socket receiving per-item status lines.
    pub status_socket_path: Option<PathBuf>,
    /// Optional socket receiving the transfer speed.
    pub speed_socket_path: Option<PathBuf>,
    /// Delay between engine pulses, also used to derive the speed.
    pub pulse_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            status_socket_path: None,
            speed_socket_path: None,
            pulse_interval: DEFAULT_PULSE_INTERVAL,
        }
    }
}

impl Config {
    /// Defaults overridden by the `APT_PULSE_*` environment variables.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let path = |key: &str| lookup(key).filter(|p| !p.is_empty()).map(PathBuf::from);
        let mut config = Self::default();

        if let Some(socket_path) = path(SOCKET_ENV) {
            config.socket_path = socket_path;
        }
        config.status_socket_path = path(STATUS_SOCKET_ENV);
        config.speed_socket_path = path(SPEED_SOCKET_ENV);

        if let Some(raw) = lookup(PULSE_INTERVAL_ENV) {
            let millis: u64 = raw.trim().parse().map_err(|_| Error::Config {
                message: format!(
                    "{PULSE_INTERVAL_ENV} must be a whole number of milliseconds, got '{raw}'"
                ),
            })?;
            config.pulse_interval = Duration::from_millis(millis);
        }

        Ok(config)
    }

    pub fn with_socket_path(mut self, socket_path: impl Into<PathBuf>) -> Self {
        self.socket_path = socket_path.into();
        self
    }

    pub fn with_status_socket_path(mut self, socket_path: impl Into<PathBuf>) -> Self {
        self.status_socket_path = Some(socket_path.into());
        self
    }

    pub fn with_speed_socket_path(mut self, socket_path: impl Into<PathBuf>) -> Self {
        self.speed_socket_path = Some(socket_path.into());
        self
    }
}

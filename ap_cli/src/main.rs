mod commands;

use clap::{Parser, Subcommand};
use console::style;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use ap_core::Error;
use ap_io::Config;

#[derive(Parser)]
#[command(name = "apt-pulse")]
#[command(about = "Refresh the package index and stream progress to a local socket")]
#[command(version)]
struct Cli {
    /// Unix socket the progress subscriber listens on
    #[arg(long, global = true, env = "APT_PULSE_SOCKET")]
    socket: Option<PathBuf>,

    /// Unix socket receiving per-item status lines
    #[arg(long, global = true, env = "APT_PULSE_STATUS_SOCKET")]
    status_socket: Option<PathBuf>,

    /// Unix socket receiving the transfer speed
    #[arg(long, global = true, env = "APT_PULSE_SPEED_SOCKET")]
    speed_socket: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh the cache from an engine script and report upgradable packages
    Refresh {
        /// JSON script of engine events and the resulting package index
        #[arg(long)]
        script: PathBuf,

        /// Print the upgradable packages as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Listen for progress notifications and display them
    Listen,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", style("error:").red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Error> {
    let mut config = Config::from_env()?;
    if let Some(socket) = cli.socket {
        config = config.with_socket_path(socket);
    }
    if let Some(socket) = cli.status_socket {
        config = config.with_status_socket_path(socket);
    }
    if let Some(socket) = cli.speed_socket {
        config = config.with_speed_socket_path(socket);
    }

    match cli.command {
        Commands::Refresh { script, json } => {
            let refresh = move || commands::refresh::execute(&config, &script, json);
            tokio::task::spawn_blocking(refresh)
                .await
                .map_err(|e| Error::RefreshFailed {
                    message: e.to_string(),
                })?
        }
        Commands::Listen => commands::listen::execute(&config).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_refresh() {
        let cli = Cli::try_parse_from([
            "apt-pulse",
            "refresh",
            "--script",
            "events.json",
            "--json",
            "--socket",
            "/tmp/test.sock",
        ])
        .unwrap();

        assert_eq!(cli.socket, Some(PathBuf::from("/tmp/test.sock")));
        assert!(matches!(
            cli.command,
            Commands::Refresh { ref script, json: true } if script == &PathBuf::from("events.json")
        ));
    }

    #[test]
    fn parses_side_endpoints() {
        let cli = Cli::try_parse_from([
            "apt-pulse",
            "refresh",
            "--script",
            "events.json",
            "--status-socket",
            "/tmp/status.sock",
            "--speed-socket",
            "/tmp/speed.sock",
        ])
        .unwrap();

        assert_eq!(cli.status_socket, Some(PathBuf::from("/tmp/status.sock")));
        assert_eq!(cli.speed_socket, Some(PathBuf::from("/tmp/speed.sock")));
    }

    #[test]
    fn refresh_requires_script() {
        assert!(Cli::try_parse_from(["apt-pulse", "refresh"]).is_err());
    }

    #[test]
    fn parses_listen() {
        let cli = Cli::try_parse_from(["apt-pulse", "listen"]).unwrap();
        assert!(matches!(cli.command, Commands::Listen));
    }
}

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;

use ap_core::Error;
use ap_io::{Config, Notification, SubscriberListener};

pub async fn execute(config: &Config) -> Result<(), Error> {
    let listener = SubscriberListener::bind(&config.socket_path)?;
    println!(
        "{} Listening on {}",
        style("==>").cyan().bold(),
        style(listener.socket_path().display()).bold()
    );

    let (tx, mut rx) = mpsc::unbounded_channel();
    let server = tokio::spawn(listener.serve(tx));

    let bar = ProgressBar::new(1000);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("    {bar:25.cyan/dim} {msg}")
            .expect("progress template must parse")
            .progress_chars("━━╸"),
    );

    let mut result = Ok(());
    while let Some(notification) = rx.recv().await {
        if let Some(outcome) = show(&bar, notification) {
            result = outcome;
            break;
        }
    }

    drop(rx);
    if let Err(e) = server.await {
        tracing::warn!(error = %e, "listener task failed");
    }
    result
}

/// Render one notification. Returns the outcome once a sentinel arrives.
fn show(bar: &ProgressBar, notification: Notification) -> Option<Result<(), Error>> {
    match notification {
        Notification::Percent(value) => {
            bar.set_position((value * 10.0).round() as u64);
            bar.set_message(format!("{value:.1}%"));
            None
        }
        Notification::Succeeded => {
            bar.set_position(1000);
            bar.finish_with_message(format!("{} update complete", style("✓").green()));
            Some(Ok(()))
        }
        Notification::Failed => {
            bar.abandon_with_message(format!("{} update failed", style("✗").red()));
            Some(Err(Error::RefreshFailed {
                message: "the notifier reported an aborted refresh".to_string(),
            }))
        }
        Notification::Other(message) => {
            bar.println(format!("    {}", style(message).dim()));
            None
        }
    }
}

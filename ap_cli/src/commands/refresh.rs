use console::style;
use std::io::Write;
use std::path::Path;

use ap_core::{Error, ProgressSink, RefreshReport, UpdateOrchestrator};
use ap_io::{Config, IpcNotifier, LinePrompt, ReplayEngine};

pub fn execute(config: &Config, script: &Path, json: bool) -> Result<(), Error> {
    let engine = ReplayEngine::from_path(script)?.with_pulse_interval(config.pulse_interval);
    let notifier = IpcNotifier::from_config(config);
    let mut orchestrator =
        UpdateOrchestrator::new(engine).with_pulse_interval(config.pulse_interval);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let report = orchestrator.run_refresh(&notifier, LinePrompt::stdin(), &mut out)?;

    if json {
        write_json(&mut out, &report)?;
    } else {
        write_text(&mut out, &report)?;
    }

    if notifier.dropped() > 0 {
        eprintln!(
            "{} {} of {} progress notifications were not delivered to {}",
            style("warning:").yellow().bold(),
            notifier.dropped(),
            notifier.dropped() + notifier.delivered(),
            notifier.socket_path().display()
        );
    }

    Ok(())
}

fn write_text(out: &mut impl Write, report: &RefreshReport) -> Result<(), Error> {
    let write_err = |e| Error::io("writing report", e);

    if report.upgradable.is_empty() {
        writeln!(out, "{} All packages are up to date.", style("==>").cyan().bold())
            .map_err(write_err)?;
        return Ok(());
    }

    writeln!(
        out,
        "{} {} upgradable packages:",
        style("==>").cyan().bold(),
        style(report.upgradable.len()).green().bold()
    )
    .map_err(write_err)?;
    for pkg in &report.upgradable {
        writeln!(out, "{pkg}").map_err(write_err)?;
    }
    Ok(())
}

fn write_json(out: &mut impl Write, report: &RefreshReport) -> Result<(), Error> {
    for pkg in &report.upgradable {
        let line = serde_json::to_string(pkg).map_err(|e| Error::Io {
            context: "encoding report".to_string(),
            message: e.to_string(),
        })?;
        writeln!(out, "{line}").map_err(|e| Error::io("writing report", e))?;
    }
    Ok(())
}

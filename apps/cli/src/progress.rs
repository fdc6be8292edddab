use std::time::{Duration, Instant};

use anyhow::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use konspekt_core::{KnowledgeLevel, Phase, PhaseOutcome, StudyClient, Transition};
use tokio::sync::mpsc;

pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.0}m {:.0}s", (secs / 60.0).floor(), secs % 60.0)
    }
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn render(spinner: &ProgressBar, phase: Phase, transition: &Transition) {
    if let Transition::Progress { text, percent, .. } = transition {
        spinner.set_message(format!(
            "{} {} {}",
            phase.title(),
            style(format!("[{percent:>3}%]")).dim(),
            text
        ));
    }
}

/// Run one phase, redrawing a spinner from the session updates as they arrive.
pub async fn run_with_spinner(
    client: &mut StudyClient,
    updates: &mut mpsc::UnboundedReceiver<Transition>,
    phase: Phase,
    url: &str,
    level: KnowledgeLevel,
) -> Result<PhaseOutcome> {
    let step_start = Instant::now();
    let spinner = create_spinner(&format!("{}...", phase.title()));

    let outcome = {
        let run = async {
            if phase == Phase::KeyConcepts {
                client.submit_url(url, level).await
            } else {
                client.run_phase(phase).await
            }
        };
        tokio::pin!(run);

        loop {
            tokio::select! {
                outcome = &mut run => break outcome,
                Some(t) = updates.recv() => render(&spinner, phase, &t),
            }
        }
    };
    while let Ok(t) = updates.try_recv() {
        render(&spinner, phase, &t);
    }

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e.into());
        }
    };

    let elapsed = style(format!("[{}]", format_duration(step_start.elapsed()))).dim();
    match &outcome {
        PhaseOutcome::Completed(_) => spinner.finish_with_message(format!(
            "{} {} {}",
            style("✓").green().bold(),
            phase.title(),
            elapsed
        )),
        _ => spinner.finish_with_message(format!(
            "{} {} {}",
            style("✘").red().bold(),
            phase.title(),
            elapsed
        )),
    }
    Ok(outcome)
}

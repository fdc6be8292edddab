use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use console::style;
use konspekt_core::{
    ClientConfig, KnowledgeLevel, Phase, PhaseOutcome, StudyClient, check_health,
    find_cached_notes, format_notes_readable, get_notes_dir, get_notes_path, save_notes,
};
use tokio::sync::mpsc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::{
    interrupt::spawn_ctrl_c_handler,
    progress::{format_duration, run_with_spinner},
};

mod interrupt;
mod progress;
mod quiz;

/// CLI wrapper for KnowledgeLevel (needed for clap ValueEnum)
#[derive(Clone, Default, ValueEnum)]
enum CliKnowledgeLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl From<CliKnowledgeLevel> for KnowledgeLevel {
    fn from(cli: CliKnowledgeLevel) -> Self {
        match cli {
            CliKnowledgeLevel::Beginner => KnowledgeLevel::Beginner,
            CliKnowledgeLevel::Intermediate => KnowledgeLevel::Intermediate,
            CliKnowledgeLevel::Advanced => KnowledgeLevel::Advanced,
        }
    }
}

#[derive(Parser)]
#[command(name = "konspekt")]
#[command(about = "Turn a YouTube video into phased study notes and a quiz")]
struct Cli {
    /// Video URL
    #[arg(required_unless_present = "check_backend")]
    url: Option<String>,

    /// How much background you already have
    #[arg(short, long, default_value = "beginner")]
    level: CliKnowledgeLevel,

    /// Backend base URL
    #[arg(short, long, env = "KONSPEKT_BACKEND", default_value = "http://localhost:8000")]
    backend: String,

    /// Last phase to run (1 = key concepts ... 5 = quiz)
    #[arg(short, long, default_value_t = 5, value_parser = clap::value_parser!(u8).range(1..=5))]
    through: u8,

    /// Seconds to wait for a phase result before giving up
    #[arg(long, default_value_t = 300)]
    timeout: u64,

    /// Take the quiz interactively once it is generated
    #[arg(short, long)]
    quiz: bool,

    /// Don't write notes to the cache directory
    #[arg(long)]
    no_save: bool,

    /// Re-run every phase even if notes for this video are cached
    #[arg(short, long)]
    force: bool,

    /// Only check that the backend is reachable and healthy
    #[arg(long)]
    check_backend: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::new(&cli.backend)
        .with_context(|| format!("invalid backend URL {}", cli.backend))?
        .with_phase_timeout(Duration::from_secs(cli.timeout));

    if cli.check_backend {
        return report_health(&config).await;
    }
    let Some(url) = cli.url else {
        bail!("a video URL is required");
    };
    let level: KnowledgeLevel = cli.level.into();
    let last = Phase::from_number(cli.through).unwrap_or(Phase::Quiz);

    println!(
        "\n{}  {}\n",
        style("konspekt").cyan().bold(),
        style("Study Notes").dim()
    );
    println!(
        "{} {} {}",
        style("Backend:").dim(),
        style(config.backend_url.as_str()).cyan(),
        style(format!("({})", level.name())).dim()
    );
    println!("{}", style("─".repeat(60)).dim());

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut client = StudyClient::new(config).with_updates(tx);

    spawn_ctrl_c_handler(client.cancel_handle());

    if !cli.force {
        match find_cached_notes(&get_notes_dir(), &url, level).await {
            Ok(Some(notes)) => client.resume(notes).await?,
            Ok(None) => {}
            Err(e) => warn!(error = %e, "ignoring unreadable cached notes"),
        }
    }

    let total_start = Instant::now();
    for phase in Phase::ALL.into_iter().take_while(|p| *p <= last) {
        if client.session().has_result(phase) {
            println!(
                "{} {} {}",
                style("✓").green().bold(),
                phase.title(),
                style("(cached)").dim()
            );
            continue;
        }
        let outcome = run_with_spinner(&mut client, &mut rx, phase, &url, level).await?;
        match outcome {
            PhaseOutcome::Completed(_) => {}
            PhaseOutcome::Failed { message, .. } => {
                eprintln!("{} {}", style("Error:").red().bold(), message);
                break;
            }
            PhaseOutcome::Closed(phase) => {
                eprintln!(
                    "{} {} ended without a result",
                    style("!").yellow().bold(),
                    phase
                );
                break;
            }
            PhaseOutcome::Cancelled(_) => {
                eprintln!("{}", style("Cancelled").yellow());
                break;
            }
        }
    }

    println!(
        "\n{} {}\n",
        style("Total time:").dim(),
        style(format_duration(total_start.elapsed())).cyan().bold()
    );

    if cli.quiz && client.session().quiz.is_some() {
        quiz::take_quiz(&mut client)?;
    }

    let notes = client.session().notes();
    if notes.key_concepts.is_none() {
        std::process::exit(1);
    }

    if !cli.no_save {
        let notes_path = get_notes_path(&get_notes_dir(), &notes.video_id, level);
        save_notes(&notes, &notes_path).await?;
        println!(
            "{} {}\n",
            style("Saved:").dim(),
            style(notes_path.display()).cyan()
        );
    }
    println!("{}", style("─".repeat(60)).dim());

    // Human-readable output
    println!("{}", format_notes_readable(&notes));

    Ok(())
}

async fn report_health(config: &ClientConfig) -> Result<()> {
    match check_health(config).await {
        Ok(true) => {
            println!("{} Backend is healthy", style("✓").green().bold());
            Ok(())
        }
        Ok(false) => {
            eprintln!("{} Backend answered but is not healthy", style("✘").red().bold());
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            std::process::exit(1);
        }
    }
}

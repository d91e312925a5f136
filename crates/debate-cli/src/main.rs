//! Debate CLI — runs one discussion end-to-end from the command line.

mod client;
mod config;
mod render;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use discussion::{transcript, DiscussionEngine, Turn};

use client::HttpResponder;
use config::DebateConfig;

/// Turn-based debate between two language-model speakers.
#[derive(Debug, Parser)]
#[command(name = "debate", version, about)]
struct Cli {
    /// Path to the configuration file (created with defaults when missing).
    #[arg(long, default_value = "debate.toml")]
    config: PathBuf,

    /// Discussion topic (overrides the configuration file).
    #[arg(long)]
    topic: Option<String>,

    /// Rationality level 1-10 (overrides the configuration file).
    #[arg(long)]
    rationality: Option<u8>,

    /// Maximum number of rounds (overrides the configuration file).
    #[arg(long)]
    max_rounds: Option<u32>,

    /// Where to write the transcript (defaults to a timestamped file).
    #[arg(long)]
    transcript: Option<PathBuf>,

    /// Skip writing a transcript file.
    #[arg(long)]
    no_transcript: bool,
}

fn print_new_turns(turns: &[Turn], printed: &mut u32) {
    for turn in turns.iter() {
        if turn.round > *printed {
            render::print_turn(turn);
            *printed = turn.round;
        }
    }
}

fn default_transcript_path(dir: &Path) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    dir.join(format!("debate_{stamp}.txt"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let mut file = DebateConfig::load(&cli.config)?;
    if let Some(topic) = cli.topic {
        file.session.topic = topic;
    }
    if let Some(rationality) = cli.rationality {
        file.session.rationality = rationality;
    }
    if let Some(max_rounds) = cli.max_rounds {
        file.session.max_rounds = max_rounds;
    }

    let responder = HttpResponder::new(&file.api)?;
    info!(
        endpoint = %file.api.base_url,
        model = %file.api.model,
        topic = %file.session.topic,
        "debate starting"
    );

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_cancel.cancel();
        }
    });

    let mut engine = DiscussionEngine::with_conditions(
        file.discussion_config(),
        file.end_conditions(),
        responder,
    );
    engine.start().await?;

    let mut printed = 0u32;
    print_new_turns(engine.state().turns(), &mut printed);

    while !engine.is_ended() {
        if cancel.is_cancelled() {
            warn!("interrupt received, ending discussion");
            engine.cancel();
            break;
        }
        engine.advance().await;
        print_new_turns(engine.state().turns(), &mut printed);
    }

    let summary = engine
        .summary()
        .context("discussion did not reach a terminal state")?;
    render::print_summary(&summary);
    info!("{}", summary.summary_line());

    if file.output.save_transcript && !cli.no_transcript {
        let rendered = transcript::render(engine.config(), engine.state(), &summary);
        let path = cli
            .transcript
            .unwrap_or_else(|| default_transcript_path(&file.output.transcript_dir));
        std::fs::write(&path, rendered)
            .with_context(|| format!("writing transcript to {}", path.display()))?;
        info!(path = %path.display(), "transcript saved");
    }

    Ok(())
}

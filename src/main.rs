mod config;
mod handshake;
mod pos;
mod runner;
mod wallet;

use clap::Parser;
use handshake::SaleSignal;
use runner::{RunnerError, RunnerReport};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinError;

/// A Rust CLI helper that exercises a real-time-audit payment flow end-to-end:
/// launch the wallet and POS clients, relay their console output, and
/// synchronize their interleaved prompts via one shared signal.
#[derive(Parser, Debug)]
#[command(name = "rta-runner", version, about)]
pub struct Cli {
    /// Path to the client wallet to spend money from
    #[arg(long)]
    wallet_path: String,

    /// POS (merchant) wallet address to receive money
    #[arg(long)]
    pos_wallet: String,

    /// Config file path
    #[arg(short, long, default_value = "rta-runner.toml")]
    config: PathBuf,

    /// Extra logging (handshake transitions, child lifecycle)
    #[arg(short, long)]
    verbose: bool,
}

type RunnerOutcome = Result<Result<RunnerReport, RunnerError>, JoinError>;

/// Run the full payment flow: both runners started concurrently, sharing one
/// signal that starts held, then joined in order.
async fn run_flow(
    config: config::RunnerConfig,
    wallet_path: String,
    pos_wallet: String,
) -> (RunnerOutcome, RunnerOutcome) {
    let config::RunnerConfig {
        wallet: wallet_config,
        pos: pos_config,
        handshake,
    } = config;
    let handshake_timeout = handshake.timeout();

    let signal = Arc::new(SaleSignal::new());

    // Both runners must be started before either is joined
    let wallet_task = {
        let signal = Arc::clone(&signal);
        tokio::spawn(async move {
            wallet::run_wallet(&wallet_config, &wallet_path, &signal, handshake_timeout).await
        })
    };
    tracing::info!("wallet runner started");

    let pos_task = {
        let signal = Arc::clone(&signal);
        tokio::spawn(async move { pos::run_pos(&pos_config, &pos_wallet, &signal).await })
    };
    tracing::info!("POS runner started");

    (wallet_task.await, pos_task.await)
}

fn report_outcome(label: &str, outcome: RunnerOutcome) {
    match outcome {
        Ok(Ok(report)) => tracing::info!(
            label,
            exit_code = ?report.exit_code,
            lines = report.lines_relayed,
            duration_secs = report.duration.as_secs(),
            "runner completed"
        ),
        Ok(Err(e)) => tracing::error!(label, error = %e, "runner failed"),
        Err(e) => tracing::error!(label, error = %e, "runner task panicked"),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .with_thread_ids(false)
        .init();

    tracing::info!("rta-runner starting");
    tracing::debug!(?cli, "parsed CLI arguments");

    let config = match config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "failed to load config");
            std::process::exit(1);
        }
    };

    let (wallet_outcome, pos_outcome) = run_flow(config, cli.wallet_path, cli.pos_wallet).await;
    report_outcome("WALLET", wallet_outcome);
    report_outcome("POS", pos_outcome);
}

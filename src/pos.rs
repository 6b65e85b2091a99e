/// POS runner: launch the merchant client, relay its output, and release the
/// shared signal once the sale has been initiated (QR code created).
use crate::config::PosConfig;
use crate::handshake::SaleSignal;
use crate::runner::{build_args, spawn_relayed, RunnerError, RunnerReport};
use std::time::Instant;

/// Line the POS client prints once the sale is created and the wallet may
/// proceed. Exact contract with the external binary.
pub const SALE_INITIATED: &str = "Sale initiated";

const LABEL: &str = "POS";

/// Drive one POS client to completion.
///
/// Relays every stdout line as `POS: <line>`. On the sale marker, releases
/// the shared signal (saturating, so a chatty client cannot mint extra
/// permits). A nonzero exit is reported but is not an error for the runner.
pub async fn run_pos(
    config: &PosConfig,
    wallet_address: &str,
    signal: &SaleSignal,
) -> Result<RunnerReport, RunnerError> {
    let args = build_args(&config.args, "{wallet-address}", wallet_address);
    let start = Instant::now();
    let mut relayed = spawn_relayed(LABEL, &config.command, &args)?;

    let mut lines_relayed = 0u64;
    while let Some(line) = relayed
        .stdout
        .next_line()
        .await
        .map_err(|e| RunnerError::Io { source: e })?
    {
        println!("{}: {}", LABEL, line);
        lines_relayed += 1;

        if line.contains(SALE_INITIATED) {
            tracing::debug!("sale initiated, releasing the wallet");
            signal.release();
        }
    }

    let exit_code = relayed.finish().await?;
    if let Some(code) = exit_code {
        if code != 0 {
            println!("POS finished with error: {}", code);
        }
    }

    Ok(RunnerReport {
        exit_code,
        lines_relayed,
        duration: start.elapsed(),
    })
}

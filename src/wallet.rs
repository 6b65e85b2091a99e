/// Wallet runner: launch the wallet client, relay its output, and hold the
/// continuation prompt until the POS runner signals that the sale started.
use crate::config::WalletConfig;
use crate::handshake::SaleSignal;
use crate::runner::{build_args, spawn_relayed, RunnerError, RunnerReport};
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;

/// Prompt the wallet client prints once it is synchronized and ready to pay.
/// Exact contract with the external binary; changing it changes behavior.
pub const CONTINUE_PROMPT: &str = "Press <Return> to continue..";

const LABEL: &str = "WALLET";

/// Drive one wallet client to completion.
///
/// Relays every stdout line as `WALLET: <line>`. On the continuation prompt,
/// blocks on the shared signal until the POS runner has initiated the sale,
/// then answers the prompt with a newline. A nonzero exit is reported but is
/// not an error for the runner itself.
pub async fn run_wallet(
    config: &WalletConfig,
    wallet_path: &str,
    signal: &SaleSignal,
    handshake_timeout: Option<Duration>,
) -> Result<RunnerReport, RunnerError> {
    let args = build_args(&config.args, "{wallet-path}", wallet_path);
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

        if line.contains(CONTINUE_PROMPT) {
            // Wait for POS to start and initiate the sale
            tracing::debug!("wallet prompt reached, waiting for sale initiation");
            signal
                .wait(handshake_timeout)
                .await
                .map_err(|e| RunnerError::HandshakeTimeout { waited: e.waited })?;

            relayed
                .stdin
                .write_all(b"\n")
                .await
                .map_err(|e| RunnerError::Io { source: e })?;
            relayed
                .stdin
                .flush()
                .await
                .map_err(|e| RunnerError::Io { source: e })?;
            tracing::debug!("continuation newline written to wallet");
        }
    }

    let exit_code = relayed.finish().await?;
    if let Some(code) = exit_code {
        if code != 0 {
            println!("Wallet finished with error: {}", code);
        }
    }

    Ok(RunnerReport {
        exit_code,
        lines_relayed,
        duration: start.elapsed(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn sh_wallet(script: String) -> WalletConfig {
        WalletConfig {
            command: "sh".to_string(),
            args: vec!["-c".to_string(), script],
        }
    }

    #[tokio::test]
    async fn test_wallet_blocks_at_prompt_until_sale_initiated() {
        let dir = tempfile::tempdir().unwrap();
        let unblocked = dir.path().join("unblocked");
        let config = sh_wallet(format!(
            "echo 'Press <Return> to continue..'; read _reply; touch {}",
            unblocked.display()
        ));

        let signal = Arc::new(SaleSignal::new());
        let task = {
            let signal = Arc::clone(&signal);
            let config = config.clone();
            tokio::spawn(async move { run_wallet(&config, "unused", &signal, None).await })
        };

        // Give the wallet time to reach its prompt; it must stay blocked
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!task.is_finished());
        assert!(!unblocked.exists());

        signal.release();
        let report = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("wallet should finish once the sale is initiated")
            .unwrap()
            .unwrap();

        assert_eq!(report.exit_code, Some(0));
        assert!(unblocked.exists());
    }

    #[tokio::test]
    async fn test_wallet_proceeds_without_blocking_when_sale_already_initiated() {
        let config = sh_wallet(
            "echo 'Press <Return> to continue..'; read _reply; echo done".to_string(),
        );

        let signal = SaleSignal::new();
        signal.release();

        let report = tokio::time::timeout(
            Duration::from_secs(5),
            run_wallet(&config, "unused", &signal, None),
        )
        .await
        .expect("signal was already available")
        .unwrap();

        assert_eq!(report.exit_code, Some(0));
        // Prompt line + "done"
        assert_eq!(report.lines_relayed, 2);
    }

    #[tokio::test]
    async fn test_wallet_without_prompt_never_touches_the_signal() {
        let config = sh_wallet("echo synchronizing; echo refreshed".to_string());
        let signal = SaleSignal::new();

        let report = run_wallet(&config, "unused", &signal, None).await.unwrap();
        assert_eq!(report.exit_code, Some(0));
        assert_eq!(report.lines_relayed, 2);

        // Still held: nothing consumed a permit that was never released
        assert!(signal.wait(Some(Duration::from_millis(50))).await.is_err());
    }

    #[tokio::test]
    async fn test_wallet_nonzero_exit_is_reported_not_fatal() {
        let config = sh_wallet("echo failing; exit 1".to_string());
        let signal = SaleSignal::new();

        let report = run_wallet(&config, "unused", &signal, None).await.unwrap();
        assert_eq!(report.exit_code, Some(1));
    }

    #[tokio::test]
    async fn test_wallet_spawn_failure() {
        let config = WalletConfig {
            command: "nonexistent-binary-xyz".to_string(),
            args: vec![],
        };
        let signal = SaleSignal::new();

        let err = run_wallet(&config, "unused", &signal, None)
            .await
            .unwrap_err();
        assert!(matches!(err, RunnerError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_wallet_hangs_forever_when_sale_never_initiated() {
        let config = sh_wallet(
            "echo 'Press <Return> to continue..'; read _reply".to_string(),
        );
        let signal = SaleSignal::new();

        // Unbounded handshake wait and no release: the runner blocks
        // indefinitely. Reproduced under a bounded test timeout.
        let hung = tokio::time::timeout(
            Duration::from_millis(500),
            run_wallet(&config, "unused", &signal, None),
        )
        .await;
        assert!(hung.is_err());
    }

    #[tokio::test]
    async fn test_wallet_handshake_timeout_surfaces_as_error() {
        let config = sh_wallet(
            "echo 'Press <Return> to continue..'; read _reply".to_string(),
        );
        let signal = SaleSignal::new();

        let err = run_wallet(
            &config,
            "unused",
            &signal,
            Some(Duration::from_millis(100)),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RunnerError::HandshakeTimeout { .. }));
    }

    #[tokio::test]
    async fn test_wallet_path_placeholder_reaches_the_child() {
        // The child echoes its own argv back; `sh -c 'echo "$0"' arg` sets $0
        let config = WalletConfig {
            command: "sh".to_string(),
            args: vec![
                "-c".to_string(),
                "echo \"wallet=$0\"".to_string(),
                "{wallet-path}".to_string(),
            ],
        };
        let signal = SaleSignal::new();

        let report = run_wallet(&config, "/tmp/test-wallet", &signal, None)
            .await
            .unwrap();
        assert_eq!(report.exit_code, Some(0));
        assert_eq!(report.lines_relayed, 1);
    }
}

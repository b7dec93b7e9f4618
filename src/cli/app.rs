use std::sync::Arc;

use action_flow::{
    FlowSequencer, SequencerConfig, SessionOrchestrator, SessionOutcome, TerminalBell,
};
use anyhow::{Context, Result};
use cdp_adapter::{CdpConfig, ChromiumBrowser};
use clap::Parser;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::contexts::ChromiumContexts;
use super::env::CliArgs;
use super::participants::{load_participants, select_source};
use super::runtime::{init_logging, load_env, load_profile};

pub async fn run() -> Result<()> {
    let cli = CliArgs::parse();
    let _log_guard = init_logging(&cli.log_level, cli.debug, &cli.log)?;

    info!("Starting SlotWatch v{}", env!("CARGO_PKG_VERSION"));

    load_env(cli.env.as_deref())?;
    let profile = load_profile(cli.profile.as_deref())?;

    let source = select_source(cli.csv.as_deref(), cli.env_only, cli.ignore_env);
    let participants = load_participants(source.as_ref());
    info!(
        source = source.name(),
        count = participants.len(),
        "participants loaded"
    );

    let mut cdp = CdpConfig::default();
    cdp.headless = cli.headless() || (cdp.headless && !cli.headed);
    let browser = Arc::new(
        ChromiumBrowser::launch(cdp)
            .await
            .context("Failed to launch Chromium")?,
    );

    let sequencer = FlowSequencer::new(profile, SequencerConfig::default(), Arc::new(TerminalBell));
    let orchestrator = SessionOrchestrator::new(
        sequencer,
        Arc::new(ChromiumContexts::new(Arc::clone(&browser))),
    );

    let cancel = CancellationToken::new();
    let interrupt = cancel_on_interrupt(cancel.clone());
    let outcomes = orchestrator.run_all(&participants, &cancel).await;
    interrupt.abort();
    drop(orchestrator);

    for line in summary_lines(&outcomes) {
        println!("{line}");
    }

    match Arc::try_unwrap(browser) {
        Ok(browser) => {
            if let Err(err) = browser.close().await {
                error!("Browser close failed: {}", err);
            }
        }
        Err(_) => warn!("browser still shared at shutdown; dropping it"),
    }

    Ok(())
}

fn cancel_on_interrupt(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; stopping");
            cancel.cancel();
        }
    })
}

/// One `email: SUCCESS|FAILED` line per participant, in run order.
pub fn summary_lines(outcomes: &[SessionOutcome]) -> Vec<String> {
    outcomes
        .iter()
        .map(|outcome| {
            let verdict = if outcome.succeeded() {
                "SUCCESS"
            } else {
                "FAILED"
            };
            format!("{}: {}", outcome.participant, verdict)
        })
        .collect()
}

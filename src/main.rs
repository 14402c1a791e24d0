use std::sync::Arc;

use chrono::Utc;
use piggybank::{DappConfig, JsonRpcClient, PiggybankSession, SubmissionGate};

/// Console inspector: `piggybank [CONTRACT_INDEX] [--watch]`
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logger (set RUST_LOG=debug for verbose output, RUST_LOG=info for normal)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = DappConfig::from_env();

    let mut watch = false;
    let mut input = None;
    for arg in std::env::args().skip(1) {
        if arg == "--watch" {
            watch = true;
        } else {
            input = Some(arg);
        }
    }
    let input = input.unwrap_or_else(|| config.default_contract_index.to_string());

    let client = Arc::new(JsonRpcClient::with_timeout(
        config.rpc_url.clone(),
        config.rpc_timeout,
    )?);
    let gate = SubmissionGate::new(config.max_contract_execution_energy)
        .with_explorer_url(config.explorer_url.clone());
    let mut session = PiggybankSession::new(client, gate);

    session.select_and_refresh(&input, Utc::now()).await?;
    let healthy = report(&session);
    if !watch {
        if !healthy {
            anyhow::bail!("contract {} could not be read", input);
        }
        return Ok(());
    }

    log::info!("Refreshing every {:?}, press Ctrl+C to stop", config.ping_interval);
    let mut ticker = tokio::time::interval(config.ping_interval);
    ticker.tick().await;
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                session.refresh(Utc::now()).await;
                report(&session);
            }
            _ = &mut shutdown => break,
        }
    }

    Ok(())
}

/// Print what the session currently shows; `false` if it shows an error
fn report(session: &PiggybankSession<JsonRpcClient>) -> bool {
    if let Some(e) = session.resolution_error() {
        println!("{}", e);
        return false;
    }
    match session.state() {
        Some(Ok(state)) => {
            println!("{}", state);
            true
        }
        Some(Err(e)) => {
            println!("{}", e);
            false
        }
        None => false,
    }
}

/// Handle graceful shutdown signals (Ctrl+C, SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            log::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            log::info!("Received SIGTERM signal");
        },
    }
}

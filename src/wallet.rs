//! Wallet connection capability
//!
//! Browser-extension and remote-pairing wallets both sit behind
//! [`WalletConnection`]; the application picks one at runtime and only ever
//! holds an `Arc<dyn WalletConnection>`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::transaction::UpdateContractPayload;

/// Error codes wallets use when the user declines a request
///
/// 4001 is the browser-provider convention, 5000-5003 the pairing protocol's
/// `USER_REJECTED*` family.
pub const USER_REJECTED_CODES: [i64; 5] = [4001, 5000, 5001, 5002, 5003];

#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum WalletError {
    #[error("request was rejected by the user")]
    UserRejected,

    #[error("wallet returned error {code}: {message}")]
    Rejected { code: i64, message: String },

    #[error("wallet transport error: {0}")]
    Transport(String),

    #[error("wallet is not connected")]
    NotConnected,
}

impl WalletError {
    pub fn is_user_rejection(&self) -> bool {
        match self {
            Self::UserRejected => true,
            Self::Rejected { code, .. } => USER_REJECTED_CODES.contains(code),
            _ => false,
        }
    }
}

/// A connected (or connectable) wallet
#[async_trait]
pub trait WalletConnection: Send + Sync {
    /// Human-readable connector name for logs
    fn name(&self) -> &str;

    /// Currently selected account, if any
    fn account(&self) -> Option<String>;

    fn is_connected(&self) -> bool {
        self.account().is_some()
    }

    /// Ask the wallet for an account; resolves to the connected address
    async fn connect(&self) -> Result<String, WalletError>;

    /// Sign `payload` with `account` and submit it; resolves to the transaction hash
    async fn sign_and_send_transaction(
        &self,
        account: &str,
        payload: &UpdateContractPayload,
    ) -> Result<String, WalletError>;

    /// Liveness probe
    async fn ping(&self) -> Result<(), WalletError>;
}

/// Periodic liveness check against an active connection
///
/// Pings are awaited one at a time, so a slow ping delays the next tick rather
/// than overlapping it. The latest failure (or `None` after a successful ping)
/// is published on a watch channel.
pub struct PingLoop {
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
    last_error: watch::Receiver<Option<WalletError>>,
}

impl PingLoop {
    /// Start pinging every `interval`; `None` when the connection is not active
    pub fn spawn(connection: Arc<dyn WalletConnection>, interval: Duration) -> Option<Self> {
        if !connection.is_connected() {
            log::debug!("Not starting ping loop: {} is not connected", connection.name());
            return None;
        }

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let (error_tx, error_rx) = watch::channel(None);

        log::info!(
            "🔁 Setting up ping loop for {} every {:?}",
            connection.name(),
            interval
        );
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {}
                }
                if !connection.is_connected() {
                    log::info!("{} disconnected, stopping ping loop", connection.name());
                    break;
                }

                let result = tokio::select! {
                    _ = &mut shutdown_rx => break,
                    result = connection.ping() => result,
                };
                match result {
                    Ok(()) => {
                        error_tx.send_replace(None);
                    }
                    Err(e) => {
                        log::error!("❌ Ping failed: {}", e);
                        error_tx.send_replace(Some(e));
                    }
                }
            }
            log::debug!("Tearing down ping loop");
        });

        Some(Self {
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
            last_error: error_rx,
        })
    }

    /// Most recent ping failure, cleared by the next successful ping
    pub fn last_error(&self) -> Option<WalletError> {
        self.last_error.borrow().clone()
    }

    /// Receiver that observes every change of [`last_error`](Self::last_error)
    pub fn subscribe(&self) -> watch::Receiver<Option<WalletError>> {
        self.last_error.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Stop the loop and wait until its task has exited
    pub async fn shutdown(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    log::warn!("⚠️  Ping loop task ended abnormally: {}", e);
                }
            }
        }
    }
}

impl Drop for PingLoop {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

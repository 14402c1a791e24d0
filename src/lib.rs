//! Piggybank: client core for the piggy bank dApp
//!
//! Lets an application connect a wallet and work with an on-chain piggy bank
//! contract: anyone can deposit, only the owner can smash it.
//!
//! # Architecture
//!
//! - **Contract Resolver** ([`contract`]): contract index → validated [`ContractMetadata`]
//! - **State Decoder** ([`state`]): `view` invocation → [`PiggybankState`]
//! - **Submission Gate** ([`transaction`]): validated deposit/smash dispatch through a wallet
//! - **Session** ([`session`]): owns the selection and displayed state, drops stale refreshes
//!
//! The node and the wallet are external collaborators reached through the
//! [`ContractQueryClient`] and [`WalletConnection`] traits.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use piggybank::{DappConfig, JsonRpcClient, PiggybankSession, SubmissionGate};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DappConfig::from_env();
//! let client = Arc::new(JsonRpcClient::new(&config.rpc_url));
//! let mut session = PiggybankSession::new(
//!     client,
//!     SubmissionGate::new(config.max_contract_execution_energy),
//! );
//!
//! session.select_and_refresh("81", chrono::Utc::now()).await?;
//! if let Some(Ok(state)) = session.state() {
//!     println!("{}", state);
//! }
//! # Ok(())
//! # }
//! ```

// Public modules
pub mod amount;
pub mod client;
pub mod config;
pub mod contract;
pub mod error;
pub mod rpc;
pub mod session;
pub mod state;
pub mod transaction;
pub mod wallet;

// Re-exports for convenience
pub use amount::{AmountParseError, CcdAmount};
pub use client::{ContractAddress, ContractQueryClient, InstanceInfo, InvokeResult};
pub use config::DappConfig;
pub use contract::{
    parse_contract_index, resolve, resolve_index, ContractMetadata, ContractName, ReceiveName,
};
pub use error::{ClientError, DecodeError, PiggybankError, ResolutionError, SubmissionError};
pub use rpc::JsonRpcClient;
pub use session::{fetch, PiggybankSession, RefreshOutcome, RefreshTicket};
pub use state::{decode_state, refresh_piggybank_state, PiggybankState};
pub use transaction::{
    can_deposit, can_smash, Energy, PendingSubmission, SubmissionGate, SubmissionTracker,
    TransactionHash, TransactionHashError, TransactionKind, UpdateContractPayload, Violations,
};
pub use wallet::{PingLoop, WalletConnection, WalletError};

// Common result type
pub type Result<T> = std::result::Result<T, PiggybankError>;

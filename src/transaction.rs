//! Transaction submission gate
//!
//! Deposits and smashes both go through [`SubmissionGate`]. All preconditions
//! are checked before the wallet is touched, so an incomplete request never
//! reaches it.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::amount::CcdAmount;
use crate::client::ContractAddress;
use crate::contract::{ContractMetadata, ReceiveName};
use crate::error::SubmissionError;
use crate::wallet::{WalletConnection, WalletError};

/// Upper bound on execution cost of a contract update
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Energy(u64);

impl Energy {
    pub const fn new(energy: u64) -> Self {
        Self(energy)
    }

    pub const fn value(&self) -> u64 {
        self.0
    }
}

/// User actions that end up as a contract update
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    Deposit,
    Smash,
}

impl TransactionKind {
    pub fn entrypoint(&self) -> &'static str {
        match self {
            Self::Deposit => "insert",
            Self::Smash => "smash",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deposit => f.write_str("deposit"),
            Self::Smash => f.write_str("smash"),
        }
    }
}

/// Update-contract payload handed to the wallet for signing
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContractPayload {
    pub amount: CcdAmount,
    pub address: ContractAddress,
    pub receive_name: ReceiveName,
    pub max_contract_execution_energy: Energy,
}

impl UpdateContractPayload {
    pub fn new(
        amount: CcdAmount,
        contract: &ContractMetadata,
        kind: TransactionKind,
        max_contract_execution_energy: Energy,
    ) -> Self {
        Self {
            amount,
            address: contract.address(),
            receive_name: contract.name.receive_name(kind.entrypoint()),
            max_contract_execution_energy,
        }
    }

    /// JSON form for wallets that take a serialized payload
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Hash of a submitted transaction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TransactionHash([u8; 32]);

impl TransactionHash {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for TransactionHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

#[derive(Error, Clone, Debug, PartialEq)]
pub enum TransactionHashError {
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("expected 32 bytes, got {0}")]
    InvalidLength(usize),
}

impl FromStr for TransactionHash {
    type Err = TransactionHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim())?;
        let hash: [u8; 32] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| TransactionHashError::InvalidLength(b.len()))?;
        Ok(Self(hash))
    }
}

/// Whether depositing is possible for `account`
pub fn can_deposit(account: Option<&str>) -> bool {
    account.is_some()
}

/// Whether `account` may smash `contract` (UI gate only, the contract enforces it too)
pub fn can_smash(account: Option<&str>, contract: Option<&ContractMetadata>) -> bool {
    match (account, contract) {
        (Some(account), Some(contract)) => account == contract.owner,
        _ => false,
    }
}

/// Request that passed every precondition
pub struct ValidatedSubmission<'a> {
    pub connection: &'a dyn WalletConnection,
    pub account: &'a str,
    pub payload: UpdateContractPayload,
}

/// Failed preconditions of one request, in check order; never empty
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violations {
    first: SubmissionError,
    rest: Vec<SubmissionError>,
}

impl Violations {
    fn new(first: SubmissionError) -> Self {
        Self {
            first,
            rest: Vec::new(),
        }
    }

    /// The violation `submit` reports
    pub fn first(&self) -> &SubmissionError {
        &self.first
    }

    pub fn into_first(self) -> SubmissionError {
        self.first
    }

    pub fn iter(&self) -> impl Iterator<Item = &SubmissionError> {
        std::iter::once(&self.first).chain(self.rest.iter())
    }

    pub fn into_vec(self) -> Vec<SubmissionError> {
        let mut all = Vec::with_capacity(1 + self.rest.len());
        all.push(self.first);
        all.extend(self.rest);
        all
    }
}

impl Extend<SubmissionError> for Violations {
    fn extend<I: IntoIterator<Item = SubmissionError>>(&mut self, iter: I) {
        self.rest.extend(iter);
    }
}

/// Validates and dispatches deposit/smash transactions
#[derive(Clone, Debug)]
pub struct SubmissionGate {
    max_contract_execution_energy: Energy,
    /// Explorer base URL, only used to log a link to submitted transactions
    explorer_url: Option<String>,
}

impl SubmissionGate {
    pub fn new(max_contract_execution_energy: Energy) -> Self {
        Self {
            max_contract_execution_energy,
            explorer_url: None,
        }
    }

    pub fn with_explorer_url(mut self, explorer_url: impl Into<String>) -> Self {
        self.explorer_url = Some(explorer_url.into());
        self
    }

    pub fn max_contract_execution_energy(&self) -> Energy {
        self.max_contract_execution_energy
    }

    /// Check every precondition and collect all violations
    ///
    /// Order: connection, account, contract, then the kind-specific check
    /// (amount for deposits, ownership for smashes).
    pub fn validate<'a>(
        &self,
        connection: Option<&'a dyn WalletConnection>,
        account: Option<&'a str>,
        contract: Option<&ContractMetadata>,
        kind: TransactionKind,
        amount: Option<CcdAmount>,
    ) -> Result<ValidatedSubmission<'a>, Violations> {
        let connection = connection.filter(|c| c.is_connected());
        let checked_amount = check_kind(account, contract, kind, amount);

        let (first, missing) = match (connection, account, contract) {
            (Some(connection), Some(account), Some(contract)) => {
                return match checked_amount {
                    Ok(amount) => Ok(ValidatedSubmission {
                        connection,
                        account,
                        payload: UpdateContractPayload::new(
                            amount,
                            contract,
                            kind,
                            self.max_contract_execution_energy,
                        ),
                    }),
                    Err(violation) => Err(Violations::new(violation)),
                };
            }
            (None, account, contract) => (
                SubmissionError::NotConnected,
                [
                    account.is_none().then_some(SubmissionError::NoAccount),
                    contract.is_none().then_some(SubmissionError::NoContract),
                ],
            ),
            (Some(_), None, contract) => (
                SubmissionError::NoAccount,
                [
                    None,
                    contract.is_none().then_some(SubmissionError::NoContract),
                ],
            ),
            (Some(_), Some(_), None) => (SubmissionError::NoContract, [None, None]),
        };

        let mut violations = Violations::new(first);
        violations.extend(missing.into_iter().flatten());
        violations.extend(checked_amount.err());
        Err(violations)
    }

    /// Validate, then sign and send through the wallet
    pub async fn submit(
        &self,
        connection: Option<&dyn WalletConnection>,
        account: Option<&str>,
        contract: Option<&ContractMetadata>,
        kind: TransactionKind,
        amount: Option<CcdAmount>,
    ) -> Result<TransactionHash, SubmissionError> {
        let validated = self
            .validate(connection, account, contract, kind, amount)
            .map_err(|violations| {
                log::debug!("Rejected {} submission: {:?}", kind, violations);
                violations.into_first()
            })?;

        log::info!(
            "📤 Submitting {} to {} via {} ({} μCCD)",
            kind,
            validated.payload.receive_name,
            validated.connection.name(),
            validated.payload.amount.micro_ccd()
        );
        log::debug!("   Payload: {:?}", validated.payload);

        let tx_hash = validated
            .connection
            .sign_and_send_transaction(validated.account, &validated.payload)
            .await
            .map_err(|e| {
                log::error!("❌ Cannot submit {} transaction: {}", kind, e);
                normalize_wallet_error(e)
            })?;

        let tx_hash = tx_hash.parse::<TransactionHash>().map_err(|e| {
            log::error!("❌ Wallet returned malformed transaction hash: {}", e);
            SubmissionError::transport(format!("malformed transaction hash: {}", e))
        })?;
        log::info!("✅ {} transaction submitted: {}", kind, tx_hash);
        if let Some(explorer_url) = &self.explorer_url {
            log::debug!(
                "   {}",
                crate::config::transaction_url(explorer_url, &tx_hash.to_string())
            );
        }

        Ok(tx_hash)
    }

    pub async fn submit_deposit(
        &self,
        connection: Option<&dyn WalletConnection>,
        account: Option<&str>,
        contract: Option<&ContractMetadata>,
        amount: CcdAmount,
    ) -> Result<TransactionHash, SubmissionError> {
        self.submit(
            connection,
            account,
            contract,
            TransactionKind::Deposit,
            Some(amount),
        )
        .await
    }

    pub async fn submit_smash(
        &self,
        connection: Option<&dyn WalletConnection>,
        account: Option<&str>,
        contract: Option<&ContractMetadata>,
    ) -> Result<TransactionHash, SubmissionError> {
        self.submit(connection, account, contract, TransactionKind::Smash, None)
            .await
    }
}

/// Amount to attach, or the kind-specific violation
///
/// Ownership is only checked once both account and contract are known.
fn check_kind(
    account: Option<&str>,
    contract: Option<&ContractMetadata>,
    kind: TransactionKind,
    amount: Option<CcdAmount>,
) -> Result<CcdAmount, SubmissionError> {
    match kind {
        TransactionKind::Deposit => match amount {
            Some(amount) if !amount.is_zero() => Ok(amount),
            Some(_) => Err(SubmissionError::InvalidAmount(
                "deposit must be greater than zero".to_string(),
            )),
            None => Err(SubmissionError::InvalidAmount(
                "no deposit amount given".to_string(),
            )),
        },
        TransactionKind::Smash => match (account, contract) {
            (Some(account), Some(contract)) if account != contract.owner => {
                Err(SubmissionError::NotOwner {
                    account: account.to_string(),
                    owner: contract.owner.clone(),
                })
            }
            _ => Ok(CcdAmount::ZERO),
        },
    }
}

fn normalize_wallet_error(err: WalletError) -> SubmissionError {
    if err.is_user_rejection() {
        return SubmissionError::UserRejected;
    }
    match err {
        WalletError::NotConnected => SubmissionError::NotConnected,
        other => SubmissionError::transport(other.to_string()),
    }
}

/// At most one submission in flight
///
/// Clones share the same flag; [`PendingSubmission`] clears it on drop.
#[derive(Clone, Debug, Default)]
pub struct SubmissionTracker {
    pending: Arc<AtomicBool>,
}

impl SubmissionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Claim the slot, or `None` when another submission holds it
    pub fn try_begin(&self) -> Option<PendingSubmission> {
        self.pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| PendingSubmission {
                pending: Arc::clone(&self.pending),
            })
    }
}

#[must_use = "the submission slot is released when this guard is dropped"]
#[derive(Debug)]
pub struct PendingSubmission {
    pending: Arc<AtomicBool>,
}

impl Drop for PendingSubmission {
    fn drop(&mut self) {
        self.pending.store(false, Ordering::Release);
    }
}

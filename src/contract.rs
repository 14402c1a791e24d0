//! Contract resolution
//!
//! Turns a user-supplied contract index into validated [`ContractMetadata`].
//! Each call is a single, independent lookup: no retries and no caching.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::amount::CcdAmount;
use crate::client::{ContractAddress, ContractQueryClient};
use crate::error::ResolutionError;

/// Prefix every init function name carries on chain
pub const INIT_PREFIX: &str = "init_";

/// Entrypoints a contract must expose to be treated as a piggy bank
pub const PIGGYBANK_ENTRYPOINTS: [&str; 3] = ["insert", "smash", "view"];

/// Contract name with the `init_` prefix stripped, e.g. `PiggyBank`
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContractName(String);

impl ContractName {
    /// Strip [`INIT_PREFIX`] from an on-chain init name
    pub fn from_init_name(init_name: &str) -> Result<Self, ResolutionError> {
        init_name
            .strip_prefix(INIT_PREFIX)
            .map(|name| Self(name.to_string()))
            .ok_or_else(|| ResolutionError::UnexpectedNamingConvention(init_name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Receive name addressing `entrypoint` on this contract
    pub fn receive_name(&self, entrypoint: &str) -> ReceiveName {
        ReceiveName(format!("{}.{}", self.0, entrypoint))
    }
}

impl fmt::Display for ContractName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fully qualified entrypoint name, `<contract>.<entrypoint>`
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReceiveName(String);

impl ReceiveName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReceiveName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A resolved contract instance
///
/// Immutable snapshot of what the node reported at resolution time. Selecting a
/// different contract or refreshing produces a new value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractMetadata {
    /// Contract runtime version
    pub version: u32,
    /// Instance index (subindex is always 0)
    pub index: u64,
    /// Contract name, used for all entrypoint addressing
    pub name: ContractName,
    /// Balance held by the instance, in micro-CCD
    pub balance: CcdAmount,
    /// Owner account address
    pub owner: String,
    /// Fully qualified receive names the instance exposes
    pub methods: BTreeSet<String>,
}

impl ContractMetadata {
    pub fn address(&self) -> ContractAddress {
        ContractAddress::new(self.index)
    }

    /// Receive names from [`PIGGYBANK_ENTRYPOINTS`] that this contract lacks
    pub fn missing_piggybank_methods(&self) -> Vec<String> {
        PIGGYBANK_ENTRYPOINTS
            .iter()
            .map(|entrypoint| self.name.receive_name(entrypoint).0)
            .filter(|method| !self.methods.contains(method))
            .collect()
    }

    pub fn is_piggybank(&self) -> bool {
        self.missing_piggybank_methods().is_empty()
    }
}

/// Parse user input into a contract index
pub fn parse_contract_index(input: &str) -> Result<u64, ResolutionError> {
    let trimmed = input.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ResolutionError::InvalidIndex(input.to_string()));
    }
    trimmed
        .parse()
        .map_err(|_| ResolutionError::InvalidIndex(input.to_string()))
}

/// Resolve user input (a contract index) into validated contract metadata
pub async fn resolve<C>(client: &C, input: &str) -> Result<ContractMetadata, ResolutionError>
where
    C: ContractQueryClient + ?Sized,
{
    let index = parse_contract_index(input)?;
    resolve_index(client, index).await
}

/// Resolve the contract at `(index, 0)`
pub async fn resolve_index<C>(client: &C, index: u64) -> Result<ContractMetadata, ResolutionError>
where
    C: ContractQueryClient + ?Sized,
{
    log::debug!("Refreshing info for contract {}", index);
    let address = ContractAddress::new(index);

    let info = client
        .get_instance_info(address)
        .await
        .map_err(|e| {
            log::error!("❌ Instance lookup for {} failed: {}", address, e);
            e
        })?
        .ok_or_else(|| {
            log::debug!("   No instance at {}", address);
            ResolutionError::NotFound(address)
        })?;

    let name = ContractName::from_init_name(&info.name)?;
    log::info!(
        "📄 Resolved contract {} as \"{}\" (v{}, {} methods)",
        index,
        name,
        info.version,
        info.methods.len()
    );

    Ok(ContractMetadata {
        version: info.version,
        index,
        name,
        balance: info.amount,
        owner: info.owner,
        methods: info.methods.into_iter().collect(),
    })
}

//! Blockchain query capability
//!
//! The resolver and decoder only ever see a [`ContractQueryClient`]. The client
//! is passed in by whoever composes the application, so there is no shared
//! module-level instance.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::amount::CcdAmount;
use crate::contract::ReceiveName;
use crate::error::ClientError;

/// Address of a contract instance
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContractAddress {
    pub index: u64,
    pub subindex: u64,
}

impl ContractAddress {
    /// Address at `(index, 0)`, the only subindex this application uses
    pub const fn new(index: u64) -> Self {
        Self { index, subindex: 0 }
    }
}

impl fmt::Display for ContractAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{},{}>", self.index, self.subindex)
    }
}

/// Instance info as reported by the node, before any validation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstanceInfo {
    /// Contract runtime version
    pub version: u32,
    /// Init name, e.g. `init_PiggyBank`
    pub name: String,
    /// Owner account address
    pub owner: String,
    /// Balance held by the instance
    pub amount: CcdAmount,
    /// Fully qualified receive names, e.g. `PiggyBank.insert`
    pub methods: Vec<String>,
}

/// Outcome of invoking an entrypoint without committing a transaction
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvokeResult {
    Success {
        return_value: Option<Vec<u8>>,
        used_energy: u64,
    },
    Failure {
        reason: String,
        used_energy: u64,
    },
}

/// Read-only access to a blockchain node
#[async_trait]
pub trait ContractQueryClient: Send + Sync {
    /// Look up a contract instance; `Ok(None)` when no instance exists at `address`
    async fn get_instance_info(
        &self,
        address: ContractAddress,
    ) -> Result<Option<InstanceInfo>, ClientError>;

    /// Invoke `method` on the instance at `address`
    async fn invoke_contract(
        &self,
        address: ContractAddress,
        method: &ReceiveName,
    ) -> Result<InvokeResult, ClientError>;
}

#[async_trait]
impl<C: ContractQueryClient + ?Sized> ContractQueryClient for std::sync::Arc<C> {
    async fn get_instance_info(
        &self,
        address: ContractAddress,
    ) -> Result<Option<InstanceInfo>, ClientError> {
        (**self).get_instance_info(address).await
    }

    async fn invoke_contract(
        &self,
        address: ContractAddress,
        method: &ReceiveName,
    ) -> Result<InvokeResult, ClientError> {
        (**self).invoke_contract(address, method).await
    }
}

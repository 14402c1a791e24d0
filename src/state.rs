//! Piggybank state decoding
//!
//! The `view` entrypoint returns a single status byte: `0` for an intact piggy
//! bank, anything else once it has been smashed. Some deployed versions append
//! a little-endian u64 after the status byte; it is not decoded, the displayed
//! amount always comes from the instance balance.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::client::{ContractQueryClient, InvokeResult};
use crate::contract::ContractMetadata;
use crate::error::DecodeError;

/// Decoded state of one piggybank instance at one point in time
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PiggybankState {
    /// Metadata snapshot the state was decoded against
    pub contract: ContractMetadata,
    pub is_smashed: bool,
    /// Balance in CCD with 6 decimals
    pub amount: String,
    pub owner_address: String,
    pub query_time: DateTime<Utc>,
}

impl fmt::Display for PiggybankState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Piggybank instance {} owned by {}. As of {} it contains {} CCD and is {}",
            self.contract.index,
            abbreviate_address(&self.owner_address),
            self.query_time.format("%H:%M:%S"),
            self.amount,
            if self.is_smashed {
                "smashed"
            } else {
                "not smashed"
            }
        )
    }
}

/// `4f9A...k3Xz` style shortening for display
pub fn abbreviate_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 8 {
        return address.to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Decode the result of a `view` invocation into [`PiggybankState`]
///
/// The required entrypoints are checked again here since `contract` may be a
/// stale snapshot handed in by the caller.
pub fn decode_state(
    contract: &ContractMetadata,
    view_result: InvokeResult,
    query_time: DateTime<Utc>,
) -> Result<PiggybankState, DecodeError> {
    ensure_piggybank(contract)?;

    let buffer = match view_result {
        InvokeResult::Failure { reason, .. } => {
            return Err(DecodeError::InvocationFailed { reason });
        }
        InvokeResult::Success { return_value, .. } => return_value.unwrap_or_default(),
    };
    let status = *buffer.first().ok_or(DecodeError::NoReturnValue)?;

    Ok(PiggybankState {
        contract: contract.clone(),
        is_smashed: status != 0,
        amount: contract.balance.to_string(),
        owner_address: contract.owner.clone(),
        query_time,
    })
}

/// Invoke `view` on `contract` and decode the result
pub async fn refresh_piggybank_state<C>(
    client: &C,
    contract: &ContractMetadata,
    query_time: DateTime<Utc>,
) -> Result<PiggybankState, DecodeError>
where
    C: ContractQueryClient + ?Sized,
{
    log::debug!(
        "Refreshing piggybank state for contract {}",
        contract.index
    );
    ensure_piggybank(contract)?;

    let method = contract.name.receive_name("view");
    let result = client
        .invoke_contract(contract.address(), &method)
        .await
        .map_err(|e| {
            log::error!(
                "❌ Invocation of \"{}\" on contract {} failed: {}",
                method,
                contract.index,
                e
            );
            e
        })?;
    log::debug!("   View result: {:?}", result);

    if let InvokeResult::Failure { reason, .. } = &result {
        log::warn!(
            "⚠️  Invocation of \"{}\" on v{} contract {} failed: {}",
            method,
            contract.version,
            contract.index,
            reason
        );
    }

    decode_state(contract, result, query_time)
}

fn ensure_piggybank(contract: &ContractMetadata) -> Result<(), DecodeError> {
    let missing_methods = contract.missing_piggybank_methods();
    if missing_methods.is_empty() {
        Ok(())
    } else {
        Err(DecodeError::NotAPiggybank {
            contract: contract.name.to_string(),
            missing_methods,
        })
    }
}

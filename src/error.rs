//! Error types for piggybank operations
//!
//! Every failure the UI can act on has its own variant so it can render a
//! specific message. Transport problems share the generic [`ClientError`].

use thiserror::Error;

use crate::amount::AmountParseError;
use crate::client::ContractAddress;

/// Transport-level failure talking to the blockchain query endpoint
///
/// Not actionable by the user; surfaced with a generic message and never retried.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum ClientError {
    /// Node could not be reached
    #[error("Failed to connect to node: {0}")]
    ConnectionFailed(String),

    /// Node answered with a non-success HTTP status
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Node answered with a body we could not interpret
    #[error("Invalid response from node: {0}")]
    InvalidResponse(String),

    /// Node returned a JSON-RPC error object
    #[error("Node rejected request (code {code}): {message}")]
    Rpc { code: i64, message: String },
}

/// Failure turning a contract identifier into [`ContractMetadata`](crate::ContractMetadata)
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("invalid contract index \"{0}\"")]
    InvalidIndex(String),

    #[error("contract {0} not found")]
    NotFound(ContractAddress),

    #[error("name \"{0}\" doesn't start with \"init_\"")]
    UnexpectedNamingConvention(String),

    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Failure decoding the result of a `view` invocation
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum DecodeError {
    #[error(
        "contract \"{contract}\" is not a piggy bank as it lacks the expected methods ({})",
        missing_methods.join(", ")
    )]
    NotAPiggybank {
        contract: String,
        missing_methods: Vec<String>,
    },

    #[error("invocation of view method failed: {reason}")]
    InvocationFailed { reason: String },

    #[error("invocation of view method returned no value")]
    NoReturnValue,

    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Failure submitting a deposit or smash transaction
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("no wallet connection initialized")]
    NotConnected,

    #[error("no account connected")]
    NoAccount,

    #[error("no contract selected")]
    NoContract,

    #[error("invalid deposit amount: {0}")]
    InvalidAmount(String),

    #[error("account {account} is not the owner ({owner}) of the piggy bank")]
    NotOwner { account: String, owner: String },

    #[error("transaction was rejected in the wallet")]
    UserRejected,

    #[error("cannot submit transaction: {message}")]
    TransportError { message: String },

    #[error("a transaction is already being submitted")]
    AlreadyPending,
}

impl From<AmountParseError> for SubmissionError {
    fn from(err: AmountParseError) -> Self {
        Self::InvalidAmount(err.to_string())
    }
}

/// Umbrella error for callers that drive the whole flow
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum PiggybankError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error(transparent)]
    Client(#[from] ClientError),
}

// Helper functions for common error scenarios
impl ClientError {
    /// Create a connection failed error
    pub fn connection_failed(msg: impl Into<String>) -> Self {
        Self::ConnectionFailed(msg.into())
    }

    /// Create an invalid response error
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }
}

impl SubmissionError {
    /// Create a transport error from any displayable cause
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::TransportError {
            message: msg.into(),
        }
    }

    /// Whether the error was raised by local validation, before any wallet call
    pub fn is_validation(&self) -> bool {
        !matches!(
            self,
            Self::UserRejected | Self::TransportError { .. } | Self::AlreadyPending
        )
    }
}

//! Error types for the deployment pipeline.

use alloy_core::primitives::Address;

use crate::{ContractRole, backend::BackendError};

/// Errors surfaced by a deployment run.
///
/// Every variant is terminal: the run stops at the first error and no partial result is
/// returned. The backend may still hold the transactions applied before the failure.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("Execution backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("Step {step} ({label}) failed for {role}: {source}")]
    BackendCallFailed {
        step: usize,
        label: String,
        role: ContractRole,
        #[source]
        source: BackendError,
    },
    #[error("{role} deployed at {actual} but its address was predicted as {predicted}")]
    AddressMismatch {
        role: ContractRole,
        predicted: Address,
        actual: Address,
    },
    #[error("Failed to register authorization for {address}: {reason}")]
    AuthorizationRegistrationFailed { address: Address, reason: String },
    #[error("Step {step} ({label}) returned an unexpected result")]
    UnexpectedResult { step: usize, label: String },
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid deployment plan: {0}")]
    InvalidPlan(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

//! Execution backend abstraction.
//!
//! The orchestrator only needs a synchronous request/response surface: read a nonce, create a
//! contract, call a contract, read committed state and commit. How transactions are encoded
//! and executed is the backend's business.

mod simulated;

pub use simulated::{Block, DEFAULT_GAS_PRICE, GenesisAlloc, SimulatedBackend, Transaction};

use alloy_core::{dyn_abi::DynSolValue, primitives::Address};

use crate::{ContractArtifact, TransactOpts};

/// Errors reported by an execution backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("transaction signed for chain {got} but the backend runs chain {expected}")]
    ChainIdMismatch { expected: u64, got: u64 },
    #[error("no contract deployed at {0}")]
    UnknownContract(Address),
    #[error("{contract} has no function {signature}")]
    UnknownFunction {
        contract: &'static str,
        signature: String,
    },
    #[error("arguments do not match {signature}: {reason}")]
    InvalidArguments { signature: String, reason: String },
    #[error("execution reverted: {0}")]
    Reverted(String),
    #[error("transaction needs {required} gas but its limit is {limit}")]
    OutOfGas { required: u64, limit: u64 },
    #[error("transaction needs {required} gas but only {available} is left in the block")]
    BlockGasLimitExceeded { required: u64, available: u64 },
    #[error("insufficient funds for {address}")]
    InsufficientFunds { address: Address },
    #[error("account {0} has exhausted its nonce space")]
    NonceOverflow(Address),
}

/// Synchronous surface of an execution backend.
pub trait ExecutionBackend {
    /// Chain id transactions must be signed for.
    fn chain_id(&self) -> Result<u64, BackendError>;

    /// Number of transactions `account` has sent, including pending ones.
    fn pending_nonce(&self, account: Address) -> Result<u64, BackendError>;

    /// Send a contract-creation transaction and return the address assigned to the contract.
    fn deploy_contract(
        &mut self,
        opts: &TransactOpts,
        artifact: &'static ContractArtifact,
        args: &[DynSolValue],
    ) -> Result<Address, BackendError>;

    /// Send a state-changing call and return the function's return value.
    fn call_contract(
        &mut self,
        opts: &TransactOpts,
        to: Address,
        signature: &str,
        args: &[DynSolValue],
    ) -> Result<DynSolValue, BackendError>;

    /// Execute a read-only call against committed state.
    fn view(
        &self,
        to: Address,
        signature: &str,
        args: &[DynSolValue],
    ) -> Result<DynSolValue, BackendError>;

    /// Seal pending transactions so later reads observe them.
    fn commit(&mut self) -> Result<(), BackendError>;
}

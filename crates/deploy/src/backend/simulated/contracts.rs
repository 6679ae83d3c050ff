//! Native models of the bootstrap contracts.
//!
//! The simulated backend does not interpret bytecode. Each artifact is backed by a small Rust
//! model implementing the calls the deployment makes and the views used to inspect it,
//! including the guards that make a misordered deployment revert.

use std::collections::HashMap;

use alloy_core::{
    dyn_abi::DynSolValue,
    primitives::{Address, B256, U256},
};

use crate::{
    ContractArtifact,
    artifacts::{
        BRIDGE, BRIDGE_EXIT_ROOT_MANAGER, BRIDGE_INITIALIZE, BRIDGE_ROLLUP_ADDRESS,
        COMMITTEE_INITIALIZE, COMMITTEE_MEMBER_COUNT, COMMITTEE_OWNER, COMMITTEE_SETUP,
        DATA_COMMITTEE, EXIT_ROOT_BRIDGE_ADDRESS, EXIT_ROOT_ROLLUP_ADDRESS,
        GLOBAL_EXIT_ROOT_MANAGER, MOCK_VERIFIER, ROLLUP, ROLLUP_ACTIVATE_FORCE_BATCHES,
        ROLLUP_ADMIN, ROLLUP_BRIDGE_ADDRESS, ROLLUP_FORCE_BATCHES_DISALLOWED, ROLLUP_INITIALIZE,
        TOKEN, TOKEN_ALLOWANCE, TOKEN_APPROVE, TOKEN_BALANCE_OF,
    },
    backend::BackendError,
};

/// Longest timeout the rollup accepts, in seconds (one week).
const HALT_AGGREGATION_TIMEOUT: u64 = 7 * 24 * 60 * 60;

/// Length in bytes of an address packed into the committee's member list.
const PACKED_ADDRESS_LEN: usize = 20;

/// A contract instance living in simulated state.
#[derive(Debug, Clone)]
pub(super) enum NativeContract {
    DataCommittee(DataCommittee),
    Token(Token),
    Verifier,
    ExitRootManager(ExitRootManager),
    Bridge(Bridge),
    Rollup(Rollup),
}

impl NativeContract {
    /// Run the constructor of `artifact` on behalf of `deployer`.
    pub(super) fn construct(
        artifact: &'static ContractArtifact,
        deployer: Address,
        args: &[DynSolValue],
    ) -> Result<Self, BackendError> {
        let contract = match artifact.name {
            name if name == DATA_COMMITTEE.name => Self::DataCommittee(DataCommittee::default()),
            name if name == TOKEN.name => Self::Token(Token {
                balances: HashMap::from([(deployer, uint_arg(args, 3)?)]),
                allowances: HashMap::new(),
            }),
            name if name == MOCK_VERIFIER.name => Self::Verifier,
            name if name == GLOBAL_EXIT_ROOT_MANAGER.name => {
                Self::ExitRootManager(ExitRootManager {
                    rollup: address_arg(args, 0)?,
                    bridge: address_arg(args, 1)?,
                })
            }
            name if name == BRIDGE.name => Self::Bridge(Bridge::default()),
            name if name == ROLLUP.name => Self::Rollup(Rollup {
                bridge: address_arg(args, 3)?,
                admin: None,
                force_batches_allowed: false,
            }),
            other => {
                return Err(BackendError::Reverted(format!(
                    "no implementation available for {other}"
                )));
            }
        };
        Ok(contract)
    }

    /// The artifact this instance was created from.
    pub(super) fn artifact(&self) -> &'static ContractArtifact {
        match self {
            Self::DataCommittee(_) => &DATA_COMMITTEE,
            Self::Token(_) => &TOKEN,
            Self::Verifier => &MOCK_VERIFIER,
            Self::ExitRootManager(_) => &GLOBAL_EXIT_ROOT_MANAGER,
            Self::Bridge(_) => &BRIDGE,
            Self::Rollup(_) => &ROLLUP,
        }
    }

    /// Execute `signature` with already type-checked `args`.
    pub(super) fn call(
        &mut self,
        caller: Address,
        signature: &str,
        args: &[DynSolValue],
    ) -> Result<DynSolValue, BackendError> {
        match self {
            Self::DataCommittee(committee) => committee.call(caller, signature, args),
            Self::Token(token) => token.call(caller, signature, args),
            Self::Verifier => Err(unknown_function(&MOCK_VERIFIER, signature)),
            Self::ExitRootManager(manager) => manager.call(signature),
            Self::Bridge(bridge) => bridge.call(signature, args),
            Self::Rollup(rollup) => rollup.call(caller, signature, args),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(super) struct DataCommittee {
    owner: Option<Address>,
    member_count: usize,
}

impl DataCommittee {
    fn call(
        &mut self,
        caller: Address,
        signature: &str,
        args: &[DynSolValue],
    ) -> Result<DynSolValue, BackendError> {
        match signature {
            COMMITTEE_INITIALIZE => {
                if self.owner.is_some() {
                    return Err(revert("Initializable: contract is already initialized"));
                }
                self.owner = Some(caller);
                Ok(unit())
            }
            COMMITTEE_SETUP => {
                if self.owner != Some(caller) {
                    return Err(revert("Ownable: caller is not the owner"));
                }

                let required = uint_arg(args, 0)?;
                let members = array_arg(args, 1)?.len();
                if U256::from(members) < required {
                    return Err(revert("TooManyRequiredSignatures"));
                }
                if bytes_arg(args, 2)?.len() != members * PACKED_ADDRESS_LEN {
                    return Err(revert("UnexpectedAddrsBytesLength"));
                }

                self.member_count = members;
                Ok(unit())
            }
            COMMITTEE_MEMBER_COUNT => Ok(uint256(U256::from(self.member_count))),
            COMMITTEE_OWNER => Ok(DynSolValue::Address(self.owner.unwrap_or_default())),
            _ => Err(unknown_function(&DATA_COMMITTEE, signature)),
        }
    }
}

#[derive(Debug, Clone)]
pub(super) struct Token {
    balances: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address), U256>,
}

impl Token {
    fn call(
        &mut self,
        caller: Address,
        signature: &str,
        args: &[DynSolValue],
    ) -> Result<DynSolValue, BackendError> {
        match signature {
            TOKEN_APPROVE => {
                let spender = address_arg(args, 0)?;
                if spender == Address::ZERO {
                    return Err(revert("ERC20: approve to the zero address"));
                }
                self.allowances.insert((caller, spender), uint_arg(args, 1)?);
                Ok(DynSolValue::Bool(true))
            }
            TOKEN_ALLOWANCE => {
                let key = (address_arg(args, 0)?, address_arg(args, 1)?);
                Ok(uint256(self.allowances.get(&key).copied().unwrap_or_default()))
            }
            TOKEN_BALANCE_OF => Ok(uint256(
                self.balances
                    .get(&address_arg(args, 0)?)
                    .copied()
                    .unwrap_or_default(),
            )),
            _ => Err(unknown_function(&TOKEN, signature)),
        }
    }
}

#[derive(Debug, Clone)]
pub(super) struct ExitRootManager {
    rollup: Address,
    bridge: Address,
}

impl ExitRootManager {
    fn call(&self, signature: &str) -> Result<DynSolValue, BackendError> {
        match signature {
            EXIT_ROOT_ROLLUP_ADDRESS => Ok(DynSolValue::Address(self.rollup)),
            EXIT_ROOT_BRIDGE_ADDRESS => Ok(DynSolValue::Address(self.bridge)),
            _ => Err(unknown_function(&GLOBAL_EXIT_ROOT_MANAGER, signature)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(super) struct Bridge {
    initialized: bool,
    exit_root_manager: Address,
    rollup: Address,
}

impl Bridge {
    fn call(&mut self, signature: &str, args: &[DynSolValue]) -> Result<DynSolValue, BackendError> {
        match signature {
            BRIDGE_INITIALIZE => {
                if self.initialized {
                    return Err(revert("Initializable: contract is already initialized"));
                }
                self.exit_root_manager = address_arg(args, 1)?;
                self.rollup = address_arg(args, 2)?;
                self.initialized = true;
                Ok(unit())
            }
            BRIDGE_EXIT_ROOT_MANAGER => Ok(DynSolValue::Address(self.exit_root_manager)),
            BRIDGE_ROLLUP_ADDRESS => Ok(DynSolValue::Address(self.rollup)),
            _ => Err(unknown_function(&BRIDGE, signature)),
        }
    }
}

#[derive(Debug, Clone)]
pub(super) struct Rollup {
    bridge: Address,
    /// Set by `initialize`.
    admin: Option<Address>,
    force_batches_allowed: bool,
}

impl Rollup {
    fn call(
        &mut self,
        caller: Address,
        signature: &str,
        args: &[DynSolValue],
    ) -> Result<DynSolValue, BackendError> {
        match signature {
            ROLLUP_INITIALIZE => {
                if self.admin.is_some() {
                    return Err(revert("Initializable: contract is already initialized"));
                }

                let params = tuple_arg(args, 0)?;
                if u64_arg(params, 2)? > HALT_AGGREGATION_TIMEOUT {
                    return Err(revert("PendingStateTimeoutExceedHaltAggregationTimeout"));
                }
                if u64_arg(params, 4)? > HALT_AGGREGATION_TIMEOUT {
                    return Err(revert("TrustedAggregatorTimeoutExceedHaltAggregationTimeout"));
                }
                if fixed_bytes_arg(args, 1)? == B256::ZERO {
                    return Err(revert("genesis root must be non-zero"));
                }

                self.admin = Some(address_arg(params, 0)?);
                Ok(unit())
            }
            ROLLUP_ACTIVATE_FORCE_BATCHES => {
                let admin = self
                    .admin
                    .ok_or_else(|| revert("contract is not initialized"))?;
                if admin != caller {
                    return Err(revert("OnlyAdmin"));
                }
                if self.force_batches_allowed {
                    return Err(revert("ForceBatchesAlreadyActive"));
                }
                self.force_batches_allowed = true;
                Ok(unit())
            }
            ROLLUP_FORCE_BATCHES_DISALLOWED => Ok(DynSolValue::Bool(!self.force_batches_allowed)),
            ROLLUP_ADMIN => Ok(DynSolValue::Address(self.admin.unwrap_or_default())),
            ROLLUP_BRIDGE_ADDRESS => Ok(DynSolValue::Address(self.bridge)),
            _ => Err(unknown_function(&ROLLUP, signature)),
        }
    }
}

fn revert(reason: &str) -> BackendError {
    BackendError::Reverted(reason.to_string())
}

fn unknown_function(artifact: &'static ContractArtifact, signature: &str) -> BackendError {
    BackendError::UnknownFunction {
        contract: artifact.name,
        signature: signature.to_string(),
    }
}

/// Return value of functions returning nothing.
fn unit() -> DynSolValue {
    DynSolValue::Tuple(Vec::new())
}

fn uint256(value: U256) -> DynSolValue {
    DynSolValue::Uint(value, 256)
}

fn arg(args: &[DynSolValue], index: usize) -> Result<&DynSolValue, BackendError> {
    args.get(index)
        .ok_or_else(|| BackendError::Reverted(format!("missing argument {index}")))
}

fn mismatch(index: usize, expected: &str) -> BackendError {
    BackendError::Reverted(format!("argument {index} is not {expected}"))
}

fn address_arg(args: &[DynSolValue], index: usize) -> Result<Address, BackendError> {
    match arg(args, index)? {
        DynSolValue::Address(address) => Ok(*address),
        _ => Err(mismatch(index, "an address")),
    }
}

fn uint_arg(args: &[DynSolValue], index: usize) -> Result<U256, BackendError> {
    match arg(args, index)? {
        DynSolValue::Uint(value, _) => Ok(*value),
        _ => Err(mismatch(index, "an unsigned integer")),
    }
}

fn u64_arg(args: &[DynSolValue], index: usize) -> Result<u64, BackendError> {
    u64::try_from(uint_arg(args, index)?).map_err(|_| mismatch(index, "a uint64"))
}

fn bytes_arg(args: &[DynSolValue], index: usize) -> Result<&[u8], BackendError> {
    match arg(args, index)? {
        DynSolValue::Bytes(value) => Ok(value),
        _ => Err(mismatch(index, "bytes")),
    }
}

fn fixed_bytes_arg(args: &[DynSolValue], index: usize) -> Result<B256, BackendError> {
    match arg(args, index)? {
        DynSolValue::FixedBytes(word, 32) => Ok(*word),
        _ => Err(mismatch(index, "a bytes32")),
    }
}

fn array_arg(args: &[DynSolValue], index: usize) -> Result<&[DynSolValue], BackendError> {
    match arg(args, index)? {
        DynSolValue::Array(values) => Ok(values),
        _ => Err(mismatch(index, "an array")),
    }
}

fn tuple_arg(args: &[DynSolValue], index: usize) -> Result<&[DynSolValue], BackendError> {
    match arg(args, index)? {
        DynSolValue::Tuple(values) => Ok(values),
        _ => Err(mismatch(index, "a tuple")),
    }
}

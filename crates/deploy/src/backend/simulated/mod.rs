//! In-process execution backend.
//!
//! Holds a committed world state and a pending one. Transactions are checked (chain id,
//! argument types, gas, funds) and applied to the pending state; [`SimulatedBackend::commit`]
//! seals them into a block and makes them visible to read-only calls. A transaction that
//! reverts leaves no trace: it is not included and does not consume a nonce.

mod contracts;

use std::collections::{BTreeMap, HashMap};

use alloy_core::{
    dyn_abi::{DynSolType, DynSolValue},
    primitives::{Address, B256, Bytes, U256, keccak256},
};

use contracts::NativeContract;

use crate::{
    ContractArtifact, TransactOpts, address::predict_create_address,
    backend::{BackendError, ExecutionBackend},
};

/// Base cost of any transaction.
const TX_GAS: u64 = 21_000;
/// Extra cost of a contract-creation transaction.
const TX_CREATE_GAS: u64 = 32_000;
/// Cost per zero byte of transaction input.
const TX_DATA_ZERO_GAS: u64 = 4;
/// Cost per non-zero byte of transaction input.
const TX_DATA_NON_ZERO_GAS: u64 = 16;
/// Gas price applied when none is configured, in wei.
pub const DEFAULT_GAS_PRICE: u64 = 1_000_000_000;

/// Initial balances, keyed by account.
pub type GenesisAlloc = BTreeMap<Address, U256>;

/// A transaction included in the pending or a sealed block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub hash: B256,
    pub from: Address,
    pub nonce: u64,
    /// `None` for contract creations.
    pub to: Option<Address>,
    pub value: U256,
    pub input: Bytes,
    pub gas_used: u64,
    /// Address of the created contract, for creations.
    pub contract_address: Option<Address>,
}

/// A sealed block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub number: u64,
    pub gas_used: u64,
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Clone, Copy, Default)]
struct AccountState {
    balance: U256,
    nonce: u64,
}

#[derive(Debug, Clone, Default)]
struct WorldState {
    accounts: HashMap<Address, AccountState>,
    contracts: HashMap<Address, NativeContract>,
}

impl WorldState {
    fn account(&self, address: &Address) -> AccountState {
        self.accounts.get(address).copied().unwrap_or_default()
    }
}

/// Simulated chain dedicated to a single deployment session.
#[derive(Debug)]
pub struct SimulatedBackend {
    chain_id: u64,
    block_gas_limit: u64,
    gas_price: u64,
    committed: WorldState,
    pending: WorldState,
    pending_transactions: Vec<Transaction>,
    pending_gas_used: u64,
    blocks: Vec<Block>,
    closed: bool,
}

impl SimulatedBackend {
    /// Create a backend whose genesis block funds the accounts in `genesis`.
    pub fn new(genesis: GenesisAlloc, block_gas_limit: u64, chain_id: u64) -> Self {
        let accounts = genesis
            .into_iter()
            .map(|(address, balance)| (address, AccountState { balance, nonce: 0 }))
            .collect();
        let state = WorldState {
            accounts,
            contracts: HashMap::new(),
        };

        tracing::debug!(chain_id, block_gas_limit, "Created simulated backend");

        Self {
            chain_id,
            block_gas_limit,
            gas_price: DEFAULT_GAS_PRICE,
            committed: state.clone(),
            pending: state,
            pending_transactions: Vec::new(),
            pending_gas_used: 0,
            blocks: vec![Block {
                number: 0,
                gas_used: 0,
                transactions: Vec::new(),
            }],
            closed: false,
        }
    }

    /// Set the price charged per unit of gas, in wei.
    pub fn with_gas_price(mut self, gas_price: u64) -> Self {
        self.gas_price = gas_price;
        self
    }

    pub fn gas_price(&self) -> u64 {
        self.gas_price
    }

    pub fn block_gas_limit(&self) -> u64 {
        self.block_gas_limit
    }

    /// Number of the latest sealed block.
    pub fn block_number(&self) -> u64 {
        self.blocks.len() as u64 - 1
    }

    /// Sealed blocks, genesis first.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Transactions waiting for the next commit.
    pub fn pending_transactions(&self) -> &[Transaction] {
        &self.pending_transactions
    }

    /// Committed balance of `address`.
    pub fn balance(&self, address: Address) -> U256 {
        self.committed.account(&address).balance
    }

    /// Name of the contract deployed at `address` in committed state.
    pub fn contract_at(&self, address: Address) -> Option<&'static str> {
        self.committed
            .contracts
            .get(&address)
            .map(|contract| contract.artifact().name)
    }

    /// Transfer `value` wei from the credentials' account to `to`.
    pub fn send_value(
        &mut self,
        opts: &TransactOpts,
        to: Address,
        value: U256,
    ) -> Result<B256, BackendError> {
        self.ensure_open()?;
        self.ensure_chain(opts)?;

        let gas = intrinsic_gas(&[], false);
        let nonce = self.charge(opts, gas, value)?;

        *self.pending_balance_mut(to) += value;
        let hash = self.include(Transaction {
            hash: B256::ZERO,
            from: opts.address(),
            nonce,
            to: Some(to),
            value,
            input: Bytes::new(),
            gas_used: gas,
            contract_address: None,
        });

        tracing::debug!(from = %opts.address(), %to, %value, nonce, "Sent value transfer");
        Ok(hash)
    }

    /// Shut the backend down. Every later operation fails with [`BackendError::Unavailable`].
    pub fn close(&mut self) {
        self.closed = true;
        tracing::debug!(chain_id = self.chain_id, "Closed simulated backend");
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> Result<(), BackendError> {
        if self.closed {
            return Err(BackendError::Unavailable("backend is closed".into()));
        }
        Ok(())
    }

    fn ensure_chain(&self, opts: &TransactOpts) -> Result<(), BackendError> {
        if opts.chain_id() != self.chain_id {
            return Err(BackendError::ChainIdMismatch {
                expected: self.chain_id,
                got: opts.chain_id(),
            });
        }
        Ok(())
    }

    /// Check that `opts` can pay `gas` plus `value` and return the nonce to use.
    /// Nothing is written until the transaction is applied.
    fn check_affordable(
        &self,
        opts: &TransactOpts,
        gas: u64,
        value: U256,
    ) -> Result<u64, BackendError> {
        if let Some(limit) = opts.gas_limit {
            if gas > limit {
                return Err(BackendError::OutOfGas {
                    required: gas,
                    limit,
                });
            }
        }

        let available = self.block_gas_limit.saturating_sub(self.pending_gas_used);
        if gas > available {
            return Err(BackendError::BlockGasLimitExceeded {
                required: gas,
                available,
            });
        }

        let account = self.pending.account(&opts.address());
        let cost = U256::from(gas) * U256::from(self.gas_price) + value;
        if account.balance < cost {
            return Err(BackendError::InsufficientFunds {
                address: opts.address(),
            });
        }

        if account.nonce == u64::MAX {
            return Err(BackendError::NonceOverflow(opts.address()));
        }

        Ok(account.nonce)
    }

    /// Debit the sender for `gas` and `value` and bump its nonce.
    fn charge(&mut self, opts: &TransactOpts, gas: u64, value: U256) -> Result<u64, BackendError> {
        let nonce = self.check_affordable(opts, gas, value)?;
        let cost = U256::from(gas) * U256::from(self.gas_price) + value;

        let account = self.pending.accounts.entry(opts.address()).or_default();
        account.balance -= cost;
        account.nonce += 1;
        self.pending_gas_used += gas;

        Ok(nonce)
    }

    fn pending_balance_mut(&mut self, address: Address) -> &mut U256 {
        &mut self.pending.accounts.entry(address).or_default().balance
    }

    /// Hash and queue `tx` for the next block.
    fn include(&mut self, mut tx: Transaction) -> B256 {
        let mut preimage = Vec::with_capacity(8 + 20 + 8 + tx.input.len());
        preimage.extend_from_slice(&self.chain_id.to_be_bytes());
        preimage.extend_from_slice(tx.from.as_slice());
        preimage.extend_from_slice(&tx.nonce.to_be_bytes());
        preimage.extend_from_slice(&tx.input);
        tx.hash = keccak256(preimage);

        let hash = tx.hash;
        self.pending_transactions.push(tx);
        hash
    }
}

impl ExecutionBackend for SimulatedBackend {
    fn chain_id(&self) -> Result<u64, BackendError> {
        self.ensure_open()?;
        Ok(self.chain_id)
    }

    fn pending_nonce(&self, account: Address) -> Result<u64, BackendError> {
        self.ensure_open()?;
        Ok(self.pending.account(&account).nonce)
    }

    fn deploy_contract(
        &mut self,
        opts: &TransactOpts,
        artifact: &'static ContractArtifact,
        args: &[DynSolValue],
    ) -> Result<Address, BackendError> {
        self.ensure_open()?;
        self.ensure_chain(opts)?;

        let mut input = artifact.name.as_bytes().to_vec();
        input.extend(encode_arguments(artifact.constructor, args)?);

        let gas = intrinsic_gas(&input, true);
        let nonce = self.check_affordable(opts, gas, U256::ZERO)?;
        let address = predict_create_address(opts.address(), nonce)
            .map_err(|_| BackendError::NonceOverflow(opts.address()))?;
        if self.pending.contracts.contains_key(&address) {
            return Err(BackendError::Reverted(format!(
                "contract address collision at {address}"
            )));
        }

        let contract = NativeContract::construct(artifact, opts.address(), args)?;

        self.charge(opts, gas, U256::ZERO)?;
        self.pending.contracts.insert(address, contract);
        self.include(Transaction {
            hash: B256::ZERO,
            from: opts.address(),
            nonce,
            to: None,
            value: U256::ZERO,
            input: input.into(),
            gas_used: gas,
            contract_address: Some(address),
        });

        tracing::debug!(
            contract = artifact.name,
            %address,
            nonce,
            gas,
            "Created contract"
        );
        Ok(address)
    }

    fn call_contract(
        &mut self,
        opts: &TransactOpts,
        to: Address,
        signature: &str,
        args: &[DynSolValue],
    ) -> Result<DynSolValue, BackendError> {
        self.ensure_open()?;
        self.ensure_chain(opts)?;

        let mut contract = self
            .pending
            .contracts
            .get(&to)
            .cloned()
            .ok_or(BackendError::UnknownContract(to))?;
        ensure_function(contract.artifact(), signature)?;

        let mut input = selector(signature).to_vec();
        input.extend(encode_arguments(signature, args)?);

        let gas = intrinsic_gas(&input, false);
        self.check_affordable(opts, gas, U256::ZERO)?;

        let output = contract.call(opts.address(), signature, args)?;

        let nonce = self.charge(opts, gas, U256::ZERO)?;
        self.pending.contracts.insert(to, contract);
        self.include(Transaction {
            hash: B256::ZERO,
            from: opts.address(),
            nonce,
            to: Some(to),
            value: U256::ZERO,
            input: input.into(),
            gas_used: gas,
            contract_address: None,
        });

        tracing::trace!(%to, signature, nonce, gas, "Called contract");
        Ok(output)
    }

    fn view(
        &self,
        to: Address,
        signature: &str,
        args: &[DynSolValue],
    ) -> Result<DynSolValue, BackendError> {
        self.ensure_open()?;

        let mut contract = self
            .committed
            .contracts
            .get(&to)
            .cloned()
            .ok_or(BackendError::UnknownContract(to))?;
        ensure_function(contract.artifact(), signature)?;
        encode_arguments(signature, args)?;

        contract.call(Address::ZERO, signature, args)
    }

    fn commit(&mut self) -> Result<(), BackendError> {
        self.ensure_open()?;

        let number = self.blocks.len() as u64;
        let block = Block {
            number,
            gas_used: self.pending_gas_used,
            transactions: std::mem::take(&mut self.pending_transactions),
        };

        tracing::debug!(
            number,
            transactions = block.transactions.len(),
            gas_used = block.gas_used,
            "Sealed block"
        );

        self.committed = self.pending.clone();
        self.pending_gas_used = 0;
        self.blocks.push(block);
        Ok(())
    }
}

fn ensure_function(artifact: &'static ContractArtifact, signature: &str) -> Result<(), BackendError> {
    if !artifact.has_function(signature) {
        return Err(BackendError::UnknownFunction {
            contract: artifact.name,
            signature: signature.to_string(),
        });
    }
    Ok(())
}

/// First four bytes of the keccak hash of a canonical signature.
fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Type-check `args` against the parameter list of `signature` and ABI-encode them.
fn encode_arguments(signature: &str, args: &[DynSolValue]) -> Result<Vec<u8>, BackendError> {
    let invalid = |reason: String| BackendError::InvalidArguments {
        signature: signature.to_string(),
        reason,
    };

    let params = signature
        .find('(')
        .map(|start| &signature[start..])
        .ok_or_else(|| invalid("signature has no parameter list".into()))?;
    let values = DynSolValue::Tuple(args.to_vec());

    if params == "()" {
        if !args.is_empty() {
            return Err(invalid(format!("expected no arguments, got {}", args.len())));
        }
        return Ok(Vec::new());
    }

    let expected = DynSolType::parse(params).map_err(|e| invalid(e.to_string()))?;
    if !expected.matches(&values) {
        return Err(invalid(format!("expected {params}")));
    }
    Ok(values.abi_encode_params())
}

fn intrinsic_gas(input: &[u8], create: bool) -> u64 {
    let data: u64 = input
        .iter()
        .map(|byte| {
            if *byte == 0 {
                TX_DATA_ZERO_GAS
            } else {
                TX_DATA_NON_ZERO_GAS
            }
        })
        .sum();
    TX_GAS + if create { TX_CREATE_GAS } else { 0 } + data
}

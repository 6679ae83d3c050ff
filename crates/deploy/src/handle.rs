//! Handles to deployed contracts.

use std::collections::BTreeMap;

use alloy_core::{dyn_abi::DynSolValue, primitives::Address};
use serde::{Deserialize, Serialize};

use crate::{
    ContractArtifact, ContractRole, TransactOpts,
    backend::{BackendError, ExecutionBackend},
};

/// A contract deployed by a run, bound to its artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployedContract {
    pub role: ContractRole,
    pub address: Address,
}

impl DeployedContract {
    pub fn new(role: ContractRole, address: Address) -> Self {
        Self { role, address }
    }

    pub fn artifact(&self) -> &'static ContractArtifact {
        self.role.artifact()
    }

    /// Send a state-changing call to this contract.
    pub fn call<B: ExecutionBackend>(
        &self,
        backend: &mut B,
        opts: &TransactOpts,
        signature: &str,
        args: &[DynSolValue],
    ) -> Result<DynSolValue, BackendError> {
        backend.call_contract(opts, self.address, signature, args)
    }

    /// Read from this contract's committed state.
    pub fn view<B: ExecutionBackend>(
        &self,
        backend: &B,
        signature: &str,
        args: &[DynSolValue],
    ) -> Result<DynSolValue, BackendError> {
        backend.view(self.address, signature, args)
    }
}

/// Contracts deployed by a run, keyed by role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployedContracts(BTreeMap<ContractRole, DeployedContract>);

impl DeployedContracts {
    pub fn insert(&mut self, contract: DeployedContract) {
        self.0.insert(contract.role, contract);
    }

    pub fn get(&self, role: ContractRole) -> Option<&DeployedContract> {
        self.0.get(&role)
    }

    pub fn address(&self, role: ContractRole) -> Option<Address> {
        self.get(role).map(|contract| contract.address)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeployedContract> {
        self.0.values()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        artifacts::{COMMITTEE_INITIALIZE, COMMITTEE_OWNER, DATA_COMMITTEE},
        backend::{GenesisAlloc, SimulatedBackend},
    };
    use alloy_core::primitives::U256;

    #[test]
    fn test_handle_view_and_call() {
        let opts = TransactOpts::random(1337);
        let genesis = GenesisAlloc::from([(opts.address(), U256::from(10u64).pow(U256::from(20)))]);
        let mut backend = SimulatedBackend::new(genesis, 30_000_000, 1337);

        let address = backend.deploy_contract(&opts, &DATA_COMMITTEE, &[]).unwrap();
        let committee = DeployedContract::new(ContractRole::DataCommittee, address);
        assert_eq!(committee.artifact(), &DATA_COMMITTEE);

        assert_eq!(
            committee.call(&mut backend, &opts, COMMITTEE_INITIALIZE, &[]).unwrap(),
            DynSolValue::Tuple(vec![])
        );
        // Views read committed state only.
        assert_eq!(
            committee.view(&backend, COMMITTEE_OWNER, &[]),
            Err(BackendError::UnknownContract(address))
        );

        backend.commit().unwrap();
        assert_eq!(
            committee.view(&backend, COMMITTEE_OWNER, &[]).unwrap(),
            DynSolValue::Address(opts.address())
        );
    }

    #[test]
    fn test_contracts_by_role() {
        let mut contracts = DeployedContracts::default();
        assert!(contracts.is_empty());

        contracts.insert(DeployedContract::new(ContractRole::Bridge, Address::repeat_byte(1)));
        contracts.insert(DeployedContract::new(ContractRole::Token, Address::repeat_byte(2)));
        contracts.insert(DeployedContract::new(ContractRole::Bridge, Address::repeat_byte(3)));

        assert_eq!(contracts.len(), 2);
        assert_eq!(
            contracts.address(ContractRole::Bridge),
            Some(Address::repeat_byte(3))
        );
        assert_eq!(contracts.address(ContractRole::Rollup), None);
    }
}

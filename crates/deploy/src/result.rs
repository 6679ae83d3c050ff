//! Outcome of a deployment run.

use std::collections::{BTreeMap, HashSet};

use alloy_core::primitives::Address;
use derive_more::Deref;
use serde::{Deserialize, Serialize};

use crate::{
    AuthRegistry, ContractRole, DeployError, PredictedAddress,
    handle::{DeployedContract, DeployedContracts},
    orchestrator::DeploymentOutcome,
};

/// Addresses of the contracts forming the rollup system: the rollup, its exit root manager
/// and its data committee.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deref, Serialize, Deserialize)]
pub struct SystemContracts(HashSet<Address>);

/// Result of [`crate::Deployer::deploy`].
#[derive(Debug)]
pub enum Deployment<B> {
    /// No credentials were supplied: nothing was deployed and no backend exists.
    ReadOnly,
    /// Every step succeeded.
    Deployed(Box<DeploymentResult<B>>),
}

impl<B> Deployment<B> {
    pub fn is_read_only(&self) -> bool {
        matches!(self, Self::ReadOnly)
    }

    pub fn result(&self) -> Option<&DeploymentResult<B>> {
        match self {
            Self::ReadOnly => None,
            Self::Deployed(result) => Some(result),
        }
    }

    pub fn into_result(self) -> Option<DeploymentResult<B>> {
        match self {
            Self::ReadOnly => None,
            Self::Deployed(result) => Some(*result),
        }
    }
}

/// A completed deployment: the backend it ran on, the credentials registry and handles to
/// every deployed contract.
#[derive(Debug)]
pub struct DeploymentResult<B> {
    pub backend: B,
    pub auth: AuthRegistry,
    pub contracts: DeployedContracts,
    pub predictions: BTreeMap<ContractRole, PredictedAddress>,
    pub system_contracts: SystemContracts,
    pub token_address: Address,
    pub rollup: DeployedContract,
    pub bridge: DeployedContract,
    pub exit_root_manager: DeployedContract,
    pub data_committee: DeployedContract,
}

impl<B> DeploymentResult<B> {
    /// Package a finished run.
    pub fn assemble(
        backend: B,
        auth: AuthRegistry,
        outcome: DeploymentOutcome,
    ) -> Result<Self, DeployError> {
        let DeploymentOutcome {
            contracts,
            predictions,
        } = outcome;

        let handle = |role: ContractRole| {
            contracts.get(role).copied().ok_or_else(|| {
                DeployError::InvalidPlan(format!("the plan did not deploy {role}"))
            })
        };

        let rollup = handle(ContractRole::Rollup)?;
        let bridge = handle(ContractRole::Bridge)?;
        let exit_root_manager = handle(ContractRole::ExitRootManager)?;
        let data_committee = handle(ContractRole::DataCommittee)?;
        let token_address = handle(ContractRole::Token)?.address;

        let system_contracts = SystemContracts(HashSet::from([
            rollup.address,
            exit_root_manager.address,
            data_committee.address,
        ]));

        Ok(Self {
            backend,
            auth,
            contracts,
            predictions,
            system_contracts,
            token_address,
            rollup,
            bridge,
            exit_root_manager,
            data_committee,
        })
    }

    /// Serializable summary of the deployment.
    pub fn report(&self) -> DeploymentReport {
        let mut system_contracts: Vec<Address> = self.system_contracts.iter().copied().collect();
        system_contracts.sort();

        DeploymentReport {
            chain_id: self.auth.chain_id(),
            accounts: self.auth.addresses().copied().collect(),
            contracts: self.contracts.iter().copied().collect(),
            predictions: self.predictions.clone(),
            token_address: self.token_address,
            system_contracts,
        }
    }
}

/// Summary of a deployment, as written by the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentReport {
    pub chain_id: u64,
    pub accounts: Vec<Address>,
    pub contracts: Vec<DeployedContract>,
    pub predictions: BTreeMap<ContractRole, PredictedAddress>,
    pub token_address: Address,
    pub system_contracts: Vec<Address>,
}

impl DeploymentReport {
    pub fn to_json_pretty(&self) -> Result<String, DeployError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| DeployError::Config(format!("Failed to serialize deployment report: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(roles: &[ContractRole]) -> DeploymentOutcome {
        let mut contracts = DeployedContracts::default();
        for (i, role) in roles.iter().enumerate() {
            contracts.insert(DeployedContract::new(*role, Address::repeat_byte(i as u8 + 1)));
        }
        DeploymentOutcome {
            contracts,
            predictions: BTreeMap::new(),
        }
    }

    #[test]
    fn test_system_contracts() {
        use strum::IntoEnumIterator;

        let roles: Vec<_> = ContractRole::iter().collect();
        let result = DeploymentResult::assemble((), AuthRegistry::new(1337), outcome(&roles)).unwrap();

        assert_eq!(result.system_contracts.len(), 3);
        assert!(result.system_contracts.contains(&result.rollup.address));
        assert!(result.system_contracts.contains(&result.exit_root_manager.address));
        assert!(result.system_contracts.contains(&result.data_committee.address));
        assert!(!result.system_contracts.contains(&result.bridge.address));
        assert!(!result.system_contracts.contains(&result.token_address));
    }

    #[test]
    fn test_missing_role_is_rejected() {
        let result = DeploymentResult::assemble(
            (),
            AuthRegistry::new(1337),
            outcome(&[ContractRole::Token, ContractRole::Bridge]),
        );
        assert!(matches!(result, Err(DeployError::InvalidPlan(_))));
    }

    #[test]
    fn test_read_only() {
        let deployment: Deployment<()> = Deployment::ReadOnly;
        assert!(deployment.is_read_only());
        assert!(deployment.result().is_none());
        assert!(deployment.into_result().is_none());
    }
}

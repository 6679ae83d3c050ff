use std::path::Path;

use alloy_core::primitives::U256;
use serde::{Deserialize, Serialize};

use crate::{
    AuthRegistry, BridgeConfig, DeployError, Deployment, DeploymentPlan, DeploymentResult,
    Orchestrator, RollupConfig, TokenConfig, TransactOpts,
    backend::{DEFAULT_GAS_PRICE, ExecutionBackend, GenesisAlloc, SimulatedBackend},
};

/// The default name for the simchain configuration file.
pub const SIMCHAIN_CONFIG_FILENAME: &str = "Simchain.toml";

pub const DEFAULT_CHAIN_ID: u64 = 1337;
pub const DEFAULT_BLOCK_GAS_LIMIT: u64 = 999_999_999_999_999_999;

/// Deploys the rollup bootstrap contracts onto a fresh simulated chain.
///
/// This struct contains all the configuration needed for a deployment and can be
/// serialized to/from TOML format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployer {
    /// Chain id of the simulated chain.
    pub chain_id: u64,
    /// Balance granted to the deploying account at genesis, in wei.
    pub initial_balance: U256,
    /// Gas available to each block.
    pub block_gas_limit: u64,
    /// Price charged per unit of gas, in wei.
    pub gas_price: u64,
    /// Token allowance granted to the bridge and to the rollup.
    pub approval_amount: U256,

    /// Configuration for the fee token.
    pub token: TokenConfig,
    /// Configuration for the rollup contract.
    pub rollup: RollupConfig,
    /// Configuration for the bridge contract.
    pub bridge: BridgeConfig,
}

impl Default for Deployer {
    fn default() -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID,
            // 10 million ether.
            initial_balance: U256::from(10u64).pow(U256::from(25)),
            block_gas_limit: DEFAULT_BLOCK_GAS_LIMIT,
            gas_price: DEFAULT_GAS_PRICE,
            // 10 thousand tokens.
            approval_amount: U256::from(10u64).pow(U256::from(22)),
            token: TokenConfig::default(),
            rollup: RollupConfig::default(),
            bridge: BridgeConfig::default(),
        }
    }
}

impl Deployer {
    /// Save the configuration to a TOML file.
    pub fn save_to_file(&self, path: &Path) -> Result<(), DeployError> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            DeployError::Config(format!("Failed to serialize deployer config to TOML: {e}"))
        })?;
        std::fs::write(path, content).map_err(|e| {
            DeployError::Config(format!("Failed to write config to {}: {e}", path.display()))
        })?;
        tracing::info!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    /// Load the configuration from a TOML file, or from [`SIMCHAIN_CONFIG_FILENAME`] inside a
    /// directory.
    pub fn load_from_file(path: &Path) -> Result<Self, DeployError> {
        if !path.exists() {
            return Err(DeployError::Config(format!(
                "Configuration file or directory not found: {}",
                path.display()
            )));
        }

        let config_path = if path.is_dir() {
            path.join(SIMCHAIN_CONFIG_FILENAME)
        } else {
            path.to_path_buf()
        };

        let content = std::fs::read_to_string(&config_path).map_err(|e| {
            DeployError::Config(format!(
                "Failed to read config from {}: {e}",
                config_path.display()
            ))
        })?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| DeployError::Config(format!("Failed to parse config file as TOML: {e}")))?;
        tracing::info!(path = %config_path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Check settings that would otherwise only fail halfway through a run.
    pub fn validate(&self) -> Result<(), DeployError> {
        if self.chain_id == 0 {
            return Err(DeployError::InvalidInput("chain id must be non-zero".into()));
        }
        if self.block_gas_limit == 0 {
            return Err(DeployError::InvalidInput(
                "block gas limit must be non-zero".into(),
            ));
        }
        if self.approval_amount > self.token.initial_supply {
            tracing::warn!(
                approval_amount = %self.approval_amount,
                initial_supply = %self.token.initial_supply,
                "Approval amount exceeds the token supply"
            );
        }
        self.rollup.validate()
    }

    /// The plan this configuration deploys.
    pub fn plan(&self) -> Result<DeploymentPlan, DeployError> {
        DeploymentPlan::standard(self)
    }

    /// Deploy onto a fresh simulated chain funding `auth`'s account.
    ///
    /// Without credentials nothing is created and an inert [`Deployment::ReadOnly`] is returned.
    pub fn deploy(
        &self,
        auth: Option<&TransactOpts>,
    ) -> Result<Deployment<SimulatedBackend>, DeployError> {
        let Some(auth) = auth else {
            tracing::info!("No credentials supplied, skipping deployment");
            return Ok(Deployment::ReadOnly);
        };

        let genesis = GenesisAlloc::from([(auth.address(), self.initial_balance)]);
        let backend = SimulatedBackend::new(genesis, self.block_gas_limit, self.chain_id)
            .with_gas_price(self.gas_price);

        let result = self.deploy_on(backend, auth)?;
        Ok(Deployment::Deployed(Box::new(result)))
    }

    /// Deploy onto an existing backend on which `auth`'s account is funded.
    pub fn deploy_on<B: ExecutionBackend>(
        &self,
        mut backend: B,
        auth: &TransactOpts,
    ) -> Result<DeploymentResult<B>, DeployError> {
        self.validate()?;
        let plan = self.plan()?;

        let chain_id = backend
            .chain_id()
            .map_err(|e| DeployError::BackendUnavailable(e.to_string()))?;
        let mut registry = AuthRegistry::new(chain_id);
        registry.add_or_replace(auth.clone())?;

        tracing::info!(
            chain_id,
            deployer = %auth.address(),
            "Starting deployment..."
        );

        let outcome = Orchestrator::new(&mut backend, auth).execute(&plan)?;
        let result = DeploymentResult::assemble(backend, registry, outcome)?;

        tracing::info!(
            rollup = %result.rollup.address,
            bridge = %result.bridge.address,
            token = %result.token_address,
            "Deployment complete"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_config_round_trip() {
        let dir = TempDir::new("simchain-config").unwrap();
        let path = dir.path().join(SIMCHAIN_CONFIG_FILENAME);

        let mut deployer = Deployer::default();
        deployer.rollup.network_name = "testnet".to_string();
        deployer.bridge.network_id = 7;
        deployer.save_to_file(&path).unwrap();

        assert_eq!(Deployer::load_from_file(&path).unwrap(), deployer);
        // A directory resolves to the default file name inside it.
        assert_eq!(Deployer::load_from_file(dir.path()).unwrap(), deployer);
    }

    #[test]
    fn test_missing_config() {
        let dir = TempDir::new("simchain-config").unwrap();
        let result = Deployer::load_from_file(&dir.path().join("missing.toml"));
        assert!(matches!(result, Err(DeployError::Config(_))));
    }

    #[test]
    fn test_malformed_config() {
        let dir = TempDir::new("simchain-config").unwrap();
        let path = dir.path().join(SIMCHAIN_CONFIG_FILENAME);
        std::fs::write(&path, "chain_id = \"not a number\"").unwrap();

        assert!(matches!(
            Deployer::load_from_file(&path),
            Err(DeployError::Config(_))
        ));
    }

    #[test]
    fn test_read_only_without_credentials() {
        let deployer = Deployer::default();
        assert!(deployer.deploy(None).unwrap().is_read_only());
        assert!(deployer.deploy(None).unwrap().is_read_only());
    }

    #[test]
    fn test_foreign_credentials_are_rejected() {
        let deployer = Deployer::default();
        let auth = TransactOpts::random(1);

        let result = deployer.deploy(Some(&auth));
        assert!(matches!(
            result,
            Err(DeployError::AuthorizationRegistrationFailed { .. })
        ));
    }

    #[test]
    fn test_deploy_defaults() {
        let deployer = Deployer::default();
        let auth = TransactOpts::random(deployer.chain_id);

        let result = deployer.deploy(Some(&auth)).unwrap().into_result().unwrap();

        assert_eq!(result.contracts.len(), 6);
        assert!(result.auth.get(&auth.address()).is_some());
        assert_eq!(result.backend.block_number(), 1);
        assert_eq!(result.backend.contract_at(result.rollup.address), Some("Rollup"));
    }

    #[test]
    fn test_invalid_config_fails_before_sending() {
        let mut deployer = Deployer::default();
        deployer.rollup.genesis_root = Default::default();
        let auth = TransactOpts::random(deployer.chain_id);

        assert!(matches!(
            deployer.deploy(Some(&auth)),
            Err(DeployError::InvalidInput(_))
        ));
    }
}

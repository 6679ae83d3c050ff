//! Builder module for creating a [`Deployer`] configuration.
//!
//! This module provides the [`DeployerBuilder`] struct which starts from the default
//! configuration, lets callers override individual settings and validates the result.

use alloy_core::primitives::{B256, U256};

use crate::{DeployError, Deployer};

/// Builder for creating a [`Deployer`] configuration.
///
/// # Example
///
/// ```no_run
/// use simchain_deploy::{DeployerBuilder, TransactOpts};
///
/// # fn example() -> Result<(), simchain_deploy::DeployError> {
/// let deployer = DeployerBuilder::new()
///     .chain_id(1337)
///     .network_name("my-rollup")
///     .batch_limit(500)
///     .build()?;
///
/// let auth = TransactOpts::random(deployer.chain_id);
/// let deployment = deployer.deploy(Some(&auth))?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct DeployerBuilder {
    deployer: Deployer,
}

impl DeployerBuilder {
    /// Create a new [`DeployerBuilder`] holding the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration, e.g. one loaded from a file.
    pub fn from_deployer(deployer: Deployer) -> Self {
        Self { deployer }
    }

    /// Set the chain id of the simulated chain.
    pub fn chain_id(mut self, chain_id: u64) -> Self {
        self.deployer.chain_id = chain_id;
        self
    }

    /// Set the genesis balance of the deploying account, in wei.
    pub fn initial_balance(mut self, balance: U256) -> Self {
        self.deployer.initial_balance = balance;
        self
    }

    pub fn block_gas_limit(mut self, gas_limit: u64) -> Self {
        self.deployer.block_gas_limit = gas_limit;
        self
    }

    pub fn gas_price(mut self, gas_price: u64) -> Self {
        self.deployer.gas_price = gas_price;
        self
    }

    /// Set the token allowance granted to the bridge and to the rollup.
    pub fn approval_amount(mut self, amount: U256) -> Self {
        self.deployer.approval_amount = amount;
        self
    }

    pub fn token_name(mut self, name: impl Into<String>) -> Self {
        self.deployer.token.name = name.into();
        self
    }

    pub fn token_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.deployer.token.symbol = symbol.into();
        self
    }

    pub fn token_decimals(mut self, decimals: u8) -> Self {
        self.deployer.token.decimals = decimals;
        self
    }

    pub fn token_supply(mut self, supply: U256) -> Self {
        self.deployer.token.initial_supply = supply;
        self
    }

    pub fn batch_limit(mut self, batch_limit: u64) -> Self {
        self.deployer.rollup.batch_limit = batch_limit;
        self
    }

    pub fn version_tag(mut self, version_tag: u64) -> Self {
        self.deployer.rollup.version_tag = version_tag;
        self
    }

    pub fn pending_state_timeout(mut self, seconds: u64) -> Self {
        self.deployer.rollup.pending_state_timeout = seconds;
        self
    }

    pub fn trusted_aggregator_timeout(mut self, seconds: u64) -> Self {
        self.deployer.rollup.trusted_aggregator_timeout = seconds;
        self
    }

    /// Set the rollup genesis root. Zero is rejected by [`DeployerBuilder::build`].
    pub fn genesis_root(mut self, root: B256) -> Self {
        self.deployer.rollup.genesis_root = root;
        self
    }

    pub fn sequencer_url(mut self, url: impl Into<String>) -> Self {
        self.deployer.rollup.sequencer_url = url.into();
        self
    }

    pub fn network_name(mut self, name: impl Into<String>) -> Self {
        self.deployer.rollup.network_name = name.into();
        self
    }

    pub fn rollup_version(mut self, version: impl Into<String>) -> Self {
        self.deployer.rollup.version = version.into();
        self
    }

    pub fn bridge_network_id(mut self, network_id: u32) -> Self {
        self.deployer.bridge.network_id = network_id;
        self
    }

    /// Build the [`Deployer`] configuration.
    pub fn build(self) -> Result<Deployer, DeployError> {
        self.deployer.validate()?;

        tracing::info!(
            chain_id = self.deployer.chain_id,
            network_name = %self.deployer.rollup.network_name,
            "Building simchain deployer configuration..."
        );

        Ok(self.deployer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let deployer = DeployerBuilder::new().build().unwrap();
        assert_eq!(deployer, Deployer::default());
        assert_eq!(deployer.chain_id, 1337);
        assert_eq!(deployer.block_gas_limit, 999_999_999_999_999_999);
        assert_eq!(deployer.rollup.batch_limit, 1000);
        assert_eq!(deployer.bridge.network_id, 0);
    }

    #[test]
    fn test_builder_with_options() {
        let deployer = DeployerBuilder::new()
            .chain_id(42)
            .token_symbol("TKN")
            .batch_limit(10)
            .network_name("test-network")
            .bridge_network_id(3)
            .approval_amount(U256::from(5))
            .build()
            .unwrap();

        assert_eq!(deployer.chain_id, 42);
        assert_eq!(deployer.token.symbol, "TKN");
        assert_eq!(deployer.rollup.batch_limit, 10);
        assert_eq!(deployer.rollup.network_name, "test-network");
        assert_eq!(deployer.bridge.network_id, 3);
        assert_eq!(deployer.approval_amount, U256::from(5));
    }

    #[test]
    fn test_builder_rejects_invalid_settings() {
        assert!(matches!(
            DeployerBuilder::new().genesis_root(B256::ZERO).build(),
            Err(DeployError::InvalidInput(_))
        ));
        assert!(matches!(
            DeployerBuilder::new().chain_id(0).build(),
            Err(DeployError::InvalidInput(_))
        ));
        assert!(DeployerBuilder::new().block_gas_limit(0).build().is_err());
    }

    #[test]
    fn test_builder_from_deployer() {
        let mut base = Deployer::default();
        base.gas_price = 0;

        let deployer = DeployerBuilder::from_deployer(base.clone())
            .version_tag(2)
            .build()
            .unwrap();
        assert_eq!(deployer.gas_price, 0);
        assert_eq!(deployer.rollup.version_tag, 2);
    }
}

//! Per-contract settings of a deployment.

use alloy_core::primitives::{B256, U256, b256};
use serde::{Deserialize, Serialize};

use crate::DeployError;

pub const DEFAULT_TOKEN_NAME: &str = "Matic Token";
pub const DEFAULT_TOKEN_SYMBOL: &str = "MATIC";
pub const DEFAULT_TOKEN_DECIMALS: u8 = 18;

pub const DEFAULT_BATCH_LIMIT: u64 = 1000;
pub const DEFAULT_VERSION_TAG: u64 = 1;
pub const DEFAULT_PENDING_STATE_TIMEOUT: u64 = 10_000;
pub const DEFAULT_TRUSTED_AGGREGATOR_TIMEOUT: u64 = 10_000;
pub const DEFAULT_GENESIS_ROOT: B256 =
    b256!("fd3434cd8f67e59d73488a2b8da242dd1f02849ea5dd99f0ca22c836c3d5b4a9");
pub const DEFAULT_SEQUENCER_URL: &str = "http://localhost";
pub const DEFAULT_NETWORK_NAME: &str = "L2";
pub const DEFAULT_ROLLUP_VERSION: &str = "v1";

/// Longest pending-state or aggregator timeout the rollup accepts, in seconds.
pub const MAX_ROLLUP_TIMEOUT: u64 = 7 * 24 * 60 * 60;

/// Fee token settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    /// Supply minted to the deployer, in base units.
    pub initial_supply: U256,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_TOKEN_NAME.to_string(),
            symbol: DEFAULT_TOKEN_SYMBOL.to_string(),
            decimals: DEFAULT_TOKEN_DECIMALS,
            // 10 billion tokens.
            initial_supply: U256::from(10u64).pow(U256::from(28)),
        }
    }
}

/// Rollup construction and initialization settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollupConfig {
    pub batch_limit: u64,
    pub version_tag: u64,
    /// Seconds before a pending state can be consolidated.
    pub pending_state_timeout: u64,
    /// Seconds before anyone may aggregate in place of the trusted aggregator.
    pub trusted_aggregator_timeout: u64,
    /// State root of the rollup's genesis. Must be non-zero.
    pub genesis_root: B256,
    pub sequencer_url: String,
    pub network_name: String,
    pub version: String,
}

impl Default for RollupConfig {
    fn default() -> Self {
        Self {
            batch_limit: DEFAULT_BATCH_LIMIT,
            version_tag: DEFAULT_VERSION_TAG,
            pending_state_timeout: DEFAULT_PENDING_STATE_TIMEOUT,
            trusted_aggregator_timeout: DEFAULT_TRUSTED_AGGREGATOR_TIMEOUT,
            genesis_root: DEFAULT_GENESIS_ROOT,
            sequencer_url: DEFAULT_SEQUENCER_URL.to_string(),
            network_name: DEFAULT_NETWORK_NAME.to_string(),
            version: DEFAULT_ROLLUP_VERSION.to_string(),
        }
    }
}

impl RollupConfig {
    pub fn validate(&self) -> Result<(), DeployError> {
        if self.genesis_root == B256::ZERO {
            return Err(DeployError::InvalidInput(
                "rollup genesis root must be non-zero".into(),
            ));
        }
        if self.pending_state_timeout > MAX_ROLLUP_TIMEOUT {
            return Err(DeployError::InvalidInput(format!(
                "pending state timeout {} exceeds {MAX_ROLLUP_TIMEOUT} seconds",
                self.pending_state_timeout
            )));
        }
        if self.trusted_aggregator_timeout > MAX_ROLLUP_TIMEOUT {
            return Err(DeployError::InvalidInput(format!(
                "trusted aggregator timeout {} exceeds {MAX_ROLLUP_TIMEOUT} seconds",
                self.trusted_aggregator_timeout
            )));
        }
        Ok(())
    }
}

/// Bridge initialization settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Network id of the chain the bridge lives on. 0 for the settlement layer.
    pub network_id: u32,
}

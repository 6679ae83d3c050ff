//! simchain-deploy - Rollup bootstrap deployment on a simulated chain.
//!
//! This crate deploys the contracts of a rollup and its bridge onto an in-process execution
//! backend. The exit root manager, the bridge and the rollup reference each other at
//! construction time; the cycle is broken by predicting contract-creation addresses from the
//! deployer nonce and verifying the predictions once everything is deployed.

mod address;
pub use address::{PredictedAddress, predict_create_address, predict_create_address_str};

pub mod artifacts;
pub use artifacts::{ContractArtifact, ContractRole};

mod auth;
pub use auth::{AuthRegistry, TransactOpts};

pub mod backend;
pub use backend::{BackendError, ExecutionBackend, SimulatedBackend};

mod builder;
pub use builder::DeployerBuilder;

mod config;
pub use config::{BridgeConfig, RollupConfig, TokenConfig};

mod deployer;
pub use deployer::{
    DEFAULT_BLOCK_GAS_LIMIT, DEFAULT_CHAIN_ID, Deployer, SIMCHAIN_CONFIG_FILENAME,
};

mod error;
pub use error::DeployError;

mod handle;
pub use handle::{DeployedContract, DeployedContracts};

mod nonce;
pub use nonce::current_nonce;

mod orchestrator;
pub use orchestrator::{DeploymentOutcome, Orchestrator};

pub mod plan;
pub use plan::{DeploymentPlan, DeploymentStep, Expectation, Param, StepKind};

mod result;
pub use result::{Deployment, DeploymentReport, DeploymentResult, SystemContracts};

//! Contract artifacts deployed during the bootstrap and the roles they play.
//!
//! An artifact only carries what the orchestrator needs to talk to a contract: its name,
//! its constructor signature and the signatures of its public functions. Signatures are in
//! canonical form (no parameter names, no whitespace) since selectors are derived from them.

use serde::{Deserialize, Serialize};

/// Logical role of a contract within the deployment.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum ContractRole {
    /// Data-availability committee gating trusted participants.
    DataCommittee,
    /// Fee and stake token.
    Token,
    /// Permissive proof verifier.
    Verifier,
    /// Global exit root manager shared by the bridge and the rollup.
    #[serde(rename = "exitManager")]
    #[strum(serialize = "exitManager")]
    ExitRootManager,
    /// Bridge contract.
    Bridge,
    /// Main rollup contract.
    Rollup,
}

impl ContractRole {
    /// The artifact deployed for this role.
    pub fn artifact(&self) -> &'static ContractArtifact {
        match self {
            Self::DataCommittee => &DATA_COMMITTEE,
            Self::Token => &TOKEN,
            Self::Verifier => &MOCK_VERIFIER,
            Self::ExitRootManager => &GLOBAL_EXIT_ROOT_MANAGER,
            Self::Bridge => &BRIDGE,
            Self::Rollup => &ROLLUP,
        }
    }
}

/// Calling convention of a deployable contract.
#[derive(Debug, PartialEq, Eq)]
pub struct ContractArtifact {
    /// Contract name.
    pub name: &'static str,
    /// Constructor signature, e.g. `constructor(address,address)`.
    pub constructor: &'static str,
    /// Public function signatures.
    pub functions: &'static [&'static str],
}

impl ContractArtifact {
    /// Whether `signature` is one of the artifact's public functions.
    pub fn has_function(&self, signature: &str) -> bool {
        self.functions.contains(&signature)
    }
}

pub const COMMITTEE_INITIALIZE: &str = "initialize()";
pub const COMMITTEE_SETUP: &str = "setupCommittee(uint256,string[],bytes)";
pub const COMMITTEE_MEMBER_COUNT: &str = "getAmountOfMembers()";
pub const COMMITTEE_OWNER: &str = "owner()";

pub const DATA_COMMITTEE: ContractArtifact = ContractArtifact {
    name: "DataCommittee",
    constructor: "constructor()",
    functions: &[
        COMMITTEE_INITIALIZE,
        COMMITTEE_SETUP,
        COMMITTEE_MEMBER_COUNT,
        COMMITTEE_OWNER,
    ],
};

pub const TOKEN_APPROVE: &str = "approve(address,uint256)";
pub const TOKEN_ALLOWANCE: &str = "allowance(address,address)";
pub const TOKEN_BALANCE_OF: &str = "balanceOf(address)";

pub const TOKEN: ContractArtifact = ContractArtifact {
    name: "Token",
    constructor: "constructor(string,string,uint8,uint256)",
    functions: &[TOKEN_APPROVE, TOKEN_ALLOWANCE, TOKEN_BALANCE_OF],
};

/// Only referenced by address from the rollup.
pub const MOCK_VERIFIER: ContractArtifact = ContractArtifact {
    name: "MockVerifier",
    constructor: "constructor()",
    functions: &[],
};

pub const EXIT_ROOT_ROLLUP_ADDRESS: &str = "rollupAddress()";
pub const EXIT_ROOT_BRIDGE_ADDRESS: &str = "bridgeAddress()";

pub const GLOBAL_EXIT_ROOT_MANAGER: ContractArtifact = ContractArtifact {
    name: "GlobalExitRootManager",
    constructor: "constructor(address,address)",
    functions: &[EXIT_ROOT_ROLLUP_ADDRESS, EXIT_ROOT_BRIDGE_ADDRESS],
};

pub const BRIDGE_INITIALIZE: &str = "initialize(uint32,address,address)";
pub const BRIDGE_EXIT_ROOT_MANAGER: &str = "globalExitRootManager()";
pub const BRIDGE_ROLLUP_ADDRESS: &str = "rollupAddress()";

pub const BRIDGE: ContractArtifact = ContractArtifact {
    name: "Bridge",
    constructor: "constructor()",
    functions: &[
        BRIDGE_INITIALIZE,
        BRIDGE_EXIT_ROOT_MANAGER,
        BRIDGE_ROLLUP_ADDRESS,
    ],
};

pub const ROLLUP_INITIALIZE: &str =
    "initialize((address,address,uint64,address,uint64),bytes32,string,string,string)";
pub const ROLLUP_ACTIVATE_FORCE_BATCHES: &str = "activateForceBatches()";
pub const ROLLUP_FORCE_BATCHES_DISALLOWED: &str = "isForcedBatchDisallowed()";
pub const ROLLUP_ADMIN: &str = "admin()";
pub const ROLLUP_BRIDGE_ADDRESS: &str = "bridgeAddress()";

pub const ROLLUP: ContractArtifact = ContractArtifact {
    name: "Rollup",
    constructor: "constructor(address,address,address,address,address,uint64,uint64)",
    functions: &[
        ROLLUP_INITIALIZE,
        ROLLUP_ACTIVATE_FORCE_BATCHES,
        ROLLUP_FORCE_BATCHES_DISALLOWED,
        ROLLUP_ADMIN,
        ROLLUP_BRIDGE_ADDRESS,
    ],
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_role_names() {
        assert_eq!(ContractRole::ExitRootManager.to_string(), "exitManager");
        assert_eq!(ContractRole::DataCommittee.to_string(), "dataCommittee");
        assert_eq!(
            ContractRole::from_str("rollup").unwrap(),
            ContractRole::Rollup
        );
    }

    #[test]
    fn test_signatures_are_canonical() {
        for role in ContractRole::iter() {
            let artifact = role.artifact();
            assert!(artifact.constructor.starts_with("constructor("));
            for signature in artifact.functions {
                assert!(!signature.contains(' '), "{signature} contains whitespace");
                assert!(signature.ends_with(')'), "{signature} is not a signature");
            }
        }
    }
}

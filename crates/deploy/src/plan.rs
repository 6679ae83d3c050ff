//! The deployment plan: an ordered list of steps, checked before anything is sent.
//!
//! Ordering is what makes address prediction work, so it is data rather than control flow.
//! [`DeploymentPlan::new`] rejects plans referencing contracts before they exist or predicting
//! addresses nothing ever verifies, and derives the nonce offset of each predicted contract
//! from the number of transactions sent between the prediction and its creation.

use std::collections::{BTreeMap, HashMap};

use alloy_core::{
    dyn_abi::DynSolValue,
    primitives::{B256, U256, ruint::UintTryFrom},
};

use crate::{
    ContractRole, DeployError, Deployer,
    artifacts::{
        BRIDGE_INITIALIZE, COMMITTEE_INITIALIZE, COMMITTEE_SETUP, ROLLUP_ACTIVATE_FORCE_BATCHES,
        ROLLUP_INITIALIZE,
    },
};

/// A call or constructor argument, resolved when its step runs.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    /// A literal value.
    Value(DynSolValue),
    /// The deploying account.
    Deployer,
    /// The address of a contract created by an earlier step.
    Deployed(ContractRole),
    /// The predicted address of a contract not created yet.
    Predicted(ContractRole),
    /// A struct argument.
    Tuple(Vec<Param>),
}

impl Param {
    pub fn uint<T>(value: T, bits: usize) -> Self
    where
        U256: UintTryFrom<T>,
    {
        Self::Value(DynSolValue::Uint(U256::from(value), bits))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::Value(DynSolValue::String(value.into()))
    }

    pub fn bytes32(value: B256) -> Self {
        Self::Value(DynSolValue::FixedBytes(value, 32))
    }

    /// Collect this parameter and every parameter nested in it.
    fn flatten<'a>(&'a self, out: &mut Vec<&'a Param>) {
        out.push(self);
        if let Self::Tuple(inner) = self {
            for param in inner {
                param.flatten(out);
            }
        }
    }
}

/// What a step does.
#[derive(Debug, Clone, PartialEq)]
pub enum StepKind {
    /// Deploy the artifact of `role`.
    Create { role: ContractRole, args: Vec<Param> },
    /// Send a state-changing call to a deployed contract.
    Call {
        target: ContractRole,
        signature: &'static str,
        args: Vec<Param>,
    },
    /// Grant `spender` an allowance of `amount` on `token`.
    Approve {
        token: ContractRole,
        spender: ContractRole,
        amount: U256,
    },
    /// Read the deployer nonce and predict the addresses of `roles`.
    Predict { roles: Vec<ContractRole> },
    /// Check every prediction against the address actually assigned.
    Verify,
    /// Seal pending transactions.
    Commit,
}

/// Validation applied to a step's return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    ReturnsTrue,
}

impl Expectation {
    pub fn holds(&self, output: &DynSolValue) -> bool {
        match self {
            Self::ReturnsTrue => *output == DynSolValue::Bool(true),
        }
    }
}

/// A single step of a deployment.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentStep {
    pub label: String,
    pub kind: StepKind,
    pub expect: Option<Expectation>,
}

impl DeploymentStep {
    pub fn create(label: impl Into<String>, role: ContractRole, args: Vec<Param>) -> Self {
        Self::new(label, StepKind::Create { role, args })
    }

    pub fn call(
        label: impl Into<String>,
        target: ContractRole,
        signature: &'static str,
        args: Vec<Param>,
    ) -> Self {
        Self::new(
            label,
            StepKind::Call {
                target,
                signature,
                args,
            },
        )
    }

    /// An ERC-20 approval. Approvals must return `true`.
    pub fn approve(
        label: impl Into<String>,
        token: ContractRole,
        spender: ContractRole,
        amount: U256,
    ) -> Self {
        Self::new(
            label,
            StepKind::Approve {
                token,
                spender,
                amount,
            },
        )
        .expecting(Expectation::ReturnsTrue)
    }

    pub fn predict(label: impl Into<String>, roles: Vec<ContractRole>) -> Self {
        Self::new(label, StepKind::Predict { roles })
    }

    pub fn verify(label: impl Into<String>) -> Self {
        Self::new(label, StepKind::Verify)
    }

    pub fn commit(label: impl Into<String>) -> Self {
        Self::new(label, StepKind::Commit)
    }

    fn new(label: impl Into<String>, kind: StepKind) -> Self {
        Self {
            label: label.into(),
            kind,
            expect: None,
        }
    }

    pub fn expecting(mut self, expectation: Expectation) -> Self {
        self.expect = Some(expectation);
        self
    }

    /// Whether executing this step sends a transaction, consuming a deployer nonce.
    pub fn sends_transaction(&self) -> bool {
        matches!(
            self.kind,
            StepKind::Create { .. } | StepKind::Call { .. } | StepKind::Approve { .. }
        )
    }

    /// The contract this step acts on, if any.
    pub fn role(&self) -> Option<ContractRole> {
        match &self.kind {
            StepKind::Create { role, .. } => Some(*role),
            StepKind::Call { target, .. } => Some(*target),
            StepKind::Approve { token, .. } => Some(*token),
            StepKind::Predict { .. } | StepKind::Verify | StepKind::Commit => None,
        }
    }

    fn params(&self) -> Vec<&Param> {
        let mut out = Vec::new();
        if let StepKind::Create { args, .. } | StepKind::Call { args, .. } = &self.kind {
            for arg in args {
                arg.flatten(&mut out);
            }
        }
        out
    }
}

/// A validated, ordered deployment.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentPlan {
    steps: Vec<DeploymentStep>,
    /// Prediction step index -> (role, offset from the nonce read at that step).
    offsets: BTreeMap<usize, Vec<(ContractRole, u64)>>,
}

impl DeploymentPlan {
    /// Validate `steps` and derive prediction offsets.
    pub fn new(steps: Vec<DeploymentStep>) -> Result<Self, DeployError> {
        let offsets = validate(&steps)?;
        Ok(Self { steps, offsets })
    }

    /// The bootstrap of a rollup and its bridge, configured by `deployer`.
    ///
    /// The exit root manager needs the bridge and rollup addresses at construction while both
    /// of those need the manager, so the two are predicted just before the manager is created
    /// and verified once everything is initialized.
    pub fn standard(deployer: &Deployer) -> Result<Self, DeployError> {
        use ContractRole::*;

        let token = &deployer.token;
        let rollup = &deployer.rollup;

        Self::new(vec![
            DeploymentStep::create("deploy data committee", DataCommittee, vec![]),
            DeploymentStep::call(
                "initialize data committee",
                DataCommittee,
                COMMITTEE_INITIALIZE,
                vec![],
            ),
            DeploymentStep::call(
                "set up empty committee",
                DataCommittee,
                COMMITTEE_SETUP,
                vec![
                    Param::uint(U256::ZERO, 256),
                    Param::Value(DynSolValue::Array(vec![])),
                    Param::Value(DynSolValue::Bytes(vec![])),
                ],
            ),
            DeploymentStep::create(
                "deploy token",
                Token,
                vec![
                    Param::string(token.name.clone()),
                    Param::string(token.symbol.clone()),
                    Param::uint(token.decimals, 8),
                    Param::uint(token.initial_supply, 256),
                ],
            ),
            DeploymentStep::create("deploy verifier", Verifier, vec![]),
            DeploymentStep::predict("predict bridge and rollup", vec![Bridge, Rollup]),
            DeploymentStep::create(
                "deploy exit root manager",
                ExitRootManager,
                vec![Param::Predicted(Rollup), Param::Predicted(Bridge)],
            ),
            DeploymentStep::create("deploy bridge", Bridge, vec![]),
            DeploymentStep::create(
                "deploy rollup",
                Rollup,
                vec![
                    Param::Deployed(ExitRootManager),
                    Param::Deployed(Token),
                    Param::Deployed(Verifier),
                    Param::Deployed(Bridge),
                    Param::Deployed(DataCommittee),
                    Param::uint(rollup.batch_limit, 64),
                    Param::uint(rollup.version_tag, 64),
                ],
            ),
            DeploymentStep::call(
                "initialize bridge",
                Bridge,
                BRIDGE_INITIALIZE,
                vec![
                    Param::uint(deployer.bridge.network_id, 32),
                    Param::Deployed(ExitRootManager),
                    Param::Deployed(Rollup),
                ],
            ),
            DeploymentStep::call(
                "initialize rollup",
                Rollup,
                ROLLUP_INITIALIZE,
                vec![
                    Param::Tuple(vec![
                        Param::Deployer,
                        Param::Deployer,
                        Param::uint(rollup.pending_state_timeout, 64),
                        Param::Deployer,
                        Param::uint(rollup.trusted_aggregator_timeout, 64),
                    ]),
                    Param::bytes32(rollup.genesis_root),
                    Param::string(rollup.sequencer_url.clone()),
                    Param::string(rollup.network_name.clone()),
                    Param::string(rollup.version.clone()),
                ],
            ),
            DeploymentStep::verify("verify predicted addresses"),
            DeploymentStep::approve(
                "approve bridge",
                Token,
                Bridge,
                deployer.approval_amount,
            ),
            DeploymentStep::approve(
                "approve rollup",
                Token,
                Rollup,
                deployer.approval_amount,
            ),
            DeploymentStep::call(
                "activate forced batches",
                Rollup,
                ROLLUP_ACTIVATE_FORCE_BATCHES,
                vec![],
            ),
            DeploymentStep::commit("commit"),
        ])
    }

    pub fn steps(&self) -> &[DeploymentStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Roles predicted by the step at `index` with their nonce offsets. Empty for other steps.
    pub fn prediction_offsets(&self, index: usize) -> &[(ContractRole, u64)] {
        self.offsets.get(&index).map(Vec::as_slice).unwrap_or_default()
    }

    /// Every role this plan predicts.
    pub fn predicted_roles(&self) -> impl Iterator<Item = ContractRole> + '_ {
        self.offsets.values().flatten().map(|(role, _)| *role)
    }
}

fn invalid(reason: String) -> DeployError {
    DeployError::InvalidPlan(reason)
}

fn validate(steps: &[DeploymentStep]) -> Result<BTreeMap<usize, Vec<(ContractRole, u64)>>, DeployError> {
    let mut created: HashMap<ContractRole, usize> = HashMap::new();
    for (index, step) in steps.iter().enumerate() {
        if let StepKind::Create { role, .. } = step.kind {
            if created.insert(role, index).is_some() {
                return Err(invalid(format!("{role} is created twice")));
            }
        }
    }

    let verify_index = steps
        .iter()
        .position(|step| matches!(step.kind, StepKind::Verify));

    let mut predicted: HashMap<ContractRole, usize> = HashMap::new();
    let mut offsets = BTreeMap::new();

    for (index, step) in steps.iter().enumerate() {
        let created_before = |role: &ContractRole| created.get(role).is_some_and(|at| *at < index);

        for param in step.params() {
            match param {
                Param::Deployed(role) if !created_before(role) => {
                    return Err(invalid(format!(
                        "step {index} ({}) uses the address of {role} before it is created",
                        step.label
                    )));
                }
                Param::Predicted(role) if !predicted.contains_key(role) => {
                    return Err(invalid(format!(
                        "step {index} ({}) uses a prediction of {role} that was never made",
                        step.label
                    )));
                }
                _ => {}
            }
        }

        match &step.kind {
            StepKind::Call { target, .. } if !created_before(target) => {
                return Err(invalid(format!(
                    "step {index} ({}) calls {target} before it is created",
                    step.label
                )));
            }
            StepKind::Approve { token, spender, .. } => {
                for role in [token, spender] {
                    if !created_before(role) {
                        return Err(invalid(format!(
                            "step {index} ({}) approves with {role} before it is created",
                            step.label
                        )));
                    }
                }
            }
            StepKind::Predict { roles } => {
                if roles.is_empty() {
                    return Err(invalid(format!("step {index} ({}) predicts nothing", step.label)));
                }

                let mut step_offsets = Vec::with_capacity(roles.len());
                for role in roles {
                    if predicted.insert(*role, index).is_some() {
                        return Err(invalid(format!("{role} is predicted twice")));
                    }

                    let create_index = created
                        .get(role)
                        .copied()
                        .filter(|at| *at > index)
                        .ok_or_else(|| {
                            invalid(format!(
                                "{role} is predicted at step {index} but not created after it"
                            ))
                        })?;

                    match verify_index {
                        Some(gate) if gate > create_index => {}
                        Some(gate) => {
                            return Err(invalid(format!(
                                "{role} is created at step {create_index}, after the verification gate at step {gate}"
                            )));
                        }
                        None => {
                            return Err(invalid(
                                "plan predicts addresses but never verifies them".into(),
                            ));
                        }
                    }

                    let offset = steps[index + 1..create_index]
                        .iter()
                        .filter(|step| step.sends_transaction())
                        .count() as u64;
                    step_offsets.push((*role, offset));
                }
                offsets.insert(index, step_offsets);
            }
            _ => {}
        }
    }

    Ok(offsets)
}

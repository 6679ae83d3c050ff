//! Plan execution.

use std::collections::BTreeMap;

use alloy_core::{dyn_abi::DynSolValue, primitives::Address};

use crate::{
    ContractRole, DeployError, PredictedAddress, TransactOpts,
    artifacts::TOKEN_APPROVE,
    backend::{BackendError, ExecutionBackend},
    handle::{DeployedContract, DeployedContracts},
    nonce::current_nonce,
    plan::{DeploymentPlan, DeploymentStep, Param, StepKind},
};

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentOutcome {
    pub contracts: DeployedContracts,
    pub predictions: BTreeMap<ContractRole, PredictedAddress>,
}

/// Executes a [`DeploymentPlan`] step by step against a backend, stopping at the first error.
pub struct Orchestrator<'a, B> {
    backend: &'a mut B,
    auth: &'a TransactOpts,
    contracts: DeployedContracts,
    predictions: BTreeMap<ContractRole, PredictedAddress>,
}

impl<'a, B: ExecutionBackend> Orchestrator<'a, B> {
    pub fn new(backend: &'a mut B, auth: &'a TransactOpts) -> Self {
        Self {
            backend,
            auth,
            contracts: DeployedContracts::default(),
            predictions: BTreeMap::new(),
        }
    }

    /// Run every step of `plan` in order.
    pub fn execute(mut self, plan: &DeploymentPlan) -> Result<DeploymentOutcome, DeployError> {
        tracing::info!(
            steps = plan.len(),
            deployer = %self.auth.address(),
            "Executing deployment plan"
        );

        for (index, step) in plan.steps().iter().enumerate() {
            self.execute_step(plan, index, step)?;
        }

        tracing::info!(contracts = self.contracts.len(), "Deployment plan executed");

        Ok(DeploymentOutcome {
            contracts: self.contracts,
            predictions: self.predictions,
        })
    }

    fn execute_step(
        &mut self,
        plan: &DeploymentPlan,
        index: usize,
        step: &DeploymentStep,
    ) -> Result<(), DeployError> {
        let output = match &step.kind {
            StepKind::Create { role, args } => {
                let args = self.resolve_all(args)?;
                let address = self
                    .backend
                    .deploy_contract(self.auth, role.artifact(), &args)
                    .map_err(|source| failed(index, step, *role, source))?;

                tracing::info!(step = index, label = %step.label, %role, %address, "Contract deployed");
                self.contracts.insert(DeployedContract::new(*role, address));
                None
            }
            StepKind::Call {
                target,
                signature,
                args,
            } => {
                let address = self.deployed(*target)?;
                let args = self.resolve_all(args)?;
                let output = self
                    .backend
                    .call_contract(self.auth, address, signature, &args)
                    .map_err(|source| failed(index, step, *target, source))?;

                tracing::info!(step = index, label = %step.label, role = %target, signature, "Contract called");
                Some(output)
            }
            StepKind::Approve {
                token,
                spender,
                amount,
            } => {
                let token_address = self.deployed(*token)?;
                let spender_address = self.deployed(*spender)?;
                let output = self
                    .backend
                    .call_contract(
                        self.auth,
                        token_address,
                        TOKEN_APPROVE,
                        &[
                            DynSolValue::Address(spender_address),
                            DynSolValue::Uint(*amount, 256),
                        ],
                    )
                    .map_err(|source| failed(index, step, *token, source))?;

                tracing::info!(step = index, label = %step.label, %spender, %amount, "Allowance granted");
                Some(output)
            }
            StepKind::Predict { .. } => {
                let sender = self.auth.address();
                let nonce = current_nonce(&*self.backend, sender)?;

                for (role, offset) in plan.prediction_offsets(index) {
                    let predicted = PredictedAddress::at_offset(sender, nonce, *offset)?;
                    tracing::info!(
                        step = index,
                        %role,
                        nonce = predicted.nonce,
                        address = %predicted.address,
                        "Predicted contract address"
                    );
                    self.predictions.insert(*role, predicted);
                }
                None
            }
            StepKind::Verify => {
                for (role, predicted) in &self.predictions {
                    let actual = self.deployed(*role)?;
                    if actual != predicted.address {
                        tracing::error!(%role, predicted = %predicted.address, %actual, "Predicted address mismatch");
                        return Err(DeployError::AddressMismatch {
                            role: *role,
                            predicted: predicted.address,
                            actual,
                        });
                    }
                }
                tracing::info!(step = index, verified = self.predictions.len(), "Predicted addresses verified");
                None
            }
            StepKind::Commit => {
                self.backend
                    .commit()
                    .map_err(|e| DeployError::BackendUnavailable(e.to_string()))?;
                tracing::info!(step = index, "Committed pending state");
                None
            }
        };

        if let Some(expectation) = step.expect {
            let holds = output.as_ref().is_some_and(|output| expectation.holds(output));
            if !holds {
                return Err(DeployError::UnexpectedResult {
                    step: index,
                    label: step.label.clone(),
                });
            }
        }

        Ok(())
    }

    fn deployed(&self, role: ContractRole) -> Result<Address, DeployError> {
        self.contracts
            .address(role)
            .ok_or_else(|| DeployError::InvalidPlan(format!("{role} has not been deployed")))
    }

    fn resolve_all(&self, params: &[Param]) -> Result<Vec<DynSolValue>, DeployError> {
        params.iter().map(|param| self.resolve(param)).collect()
    }

    fn resolve(&self, param: &Param) -> Result<DynSolValue, DeployError> {
        match param {
            Param::Value(value) => Ok(value.clone()),
            Param::Deployer => Ok(DynSolValue::Address(self.auth.address())),
            Param::Deployed(role) => self.deployed(*role).map(DynSolValue::Address),
            Param::Predicted(role) => self
                .predictions
                .get(role)
                .map(|predicted| DynSolValue::Address(predicted.address))
                .ok_or_else(|| DeployError::InvalidPlan(format!("{role} has not been predicted"))),
            Param::Tuple(inner) => self.resolve_all(inner).map(DynSolValue::Tuple),
        }
    }
}

fn failed(index: usize, step: &DeploymentStep, role: ContractRole, source: BackendError) -> DeployError {
    tracing::error!(step = index, label = %step.label, %role, error = %source, "Deployment step failed");
    DeployError::BackendCallFailed {
        step: index,
        label: step.label.clone(),
        role,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Deployer,
        artifacts::{MOCK_VERIFIER, TOKEN_ALLOWANCE},
        backend::{GenesisAlloc, SimulatedBackend},
        plan::Expectation,
    };
    use alloy_core::primitives::U256;

    fn funded() -> (SimulatedBackend, TransactOpts) {
        let opts = TransactOpts::random(1337);
        let genesis = GenesisAlloc::from([(opts.address(), U256::from(10u64).pow(U256::from(25)))]);
        (SimulatedBackend::new(genesis, 999_999_999_999_999_999, 1337), opts)
    }

    #[test]
    fn test_standard_plan_predictions_hold() {
        let (mut backend, opts) = funded();
        let plan = DeploymentPlan::standard(&Deployer::default()).unwrap();

        let outcome = Orchestrator::new(&mut backend, &opts).execute(&plan).unwrap();

        assert_eq!(outcome.contracts.len(), 6);
        for (role, predicted) in &outcome.predictions {
            assert_eq!(outcome.contracts.address(*role), Some(predicted.address));
        }
        assert_eq!(outcome.predictions[&ContractRole::Bridge].nonce, 6);
        assert_eq!(outcome.predictions[&ContractRole::Rollup].nonce, 7);
        assert!(backend.pending_transactions().is_empty());
    }

    #[test]
    fn test_approvals_are_committed() {
        let (mut backend, opts) = funded();
        let deployer = Deployer::default();
        let plan = DeploymentPlan::standard(&deployer).unwrap();

        let outcome = Orchestrator::new(&mut backend, &opts).execute(&plan).unwrap();
        let token = outcome.contracts.get(ContractRole::Token).unwrap();

        for spender in [ContractRole::Bridge, ContractRole::Rollup] {
            let allowance = token
                .view(
                    &backend,
                    TOKEN_ALLOWANCE,
                    &[
                        DynSolValue::Address(opts.address()),
                        DynSolValue::Address(outcome.contracts.address(spender).unwrap()),
                    ],
                )
                .unwrap();
            assert_eq!(allowance, DynSolValue::Uint(deployer.approval_amount, 256));
        }
    }

    #[test]
    fn test_failing_step_reports_position() {
        let (mut backend, opts) = funded();
        let plan = DeploymentPlan::new(vec![
            DeploymentStep::create("deploy committee", ContractRole::DataCommittee, vec![]),
            DeploymentStep::call(
                "setup before initialize",
                ContractRole::DataCommittee,
                crate::artifacts::COMMITTEE_SETUP,
                vec![
                    Param::uint(U256::ZERO, 256),
                    Param::Value(DynSolValue::Array(vec![])),
                    Param::Value(DynSolValue::Bytes(vec![])),
                ],
            ),
        ])
        .unwrap();

        let result = Orchestrator::new(&mut backend, &opts).execute(&plan);
        match result {
            Err(DeployError::BackendCallFailed {
                step, role, source, ..
            }) => {
                assert_eq!(step, 1);
                assert_eq!(role, ContractRole::DataCommittee);
                assert!(matches!(source, BackendError::Reverted(_)));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_unmet_expectation() {
        let (mut backend, opts) = funded();
        let plan = DeploymentPlan::new(vec![
            DeploymentStep::create("deploy verifier", ContractRole::Verifier, vec![])
                .expecting(Expectation::ReturnsTrue),
        ])
        .unwrap();

        let result = Orchestrator::new(&mut backend, &opts).execute(&plan);
        assert!(matches!(
            result,
            Err(DeployError::UnexpectedResult { step: 0, .. })
        ));
    }

    #[test]
    fn test_prediction_reads_nonce_at_marker() {
        let (mut backend, opts) = funded();
        let plan = DeploymentPlan::new(vec![
            DeploymentStep::predict("predict verifier", vec![ContractRole::Verifier]),
            DeploymentStep::create("deploy token", ContractRole::Token, vec![
                Param::string("Token"),
                Param::string("TKN"),
                Param::uint(18u8, 8),
                Param::uint(U256::from(1_000u64), 256),
            ]),
            DeploymentStep::create("deploy verifier", ContractRole::Verifier, vec![]),
            DeploymentStep::verify("verify"),
        ])
        .unwrap();

        // Nonce 0 is spent before the run starts.
        backend.deploy_contract(&opts, &MOCK_VERIFIER, &[]).unwrap();
        let outcome = Orchestrator::new(&mut backend, &opts).execute(&plan).unwrap();
        assert_eq!(outcome.predictions[&ContractRole::Verifier].nonce, 2);
    }
}

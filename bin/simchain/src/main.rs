//! simchain deploys a rollup, its bridge and their supporting contracts onto a simulated chain
//! and reports where everything landed.

mod cli;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use comfy_table::{Table, presets::UTF8_FULL};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use cli::Cli;
use simchain_deploy::{
    Deployer, DeployerBuilder, Deployment, DeploymentPlan, DeploymentResult,
    SIMCHAIN_CONFIG_FILENAME, SimulatedBackend, StepKind, TransactOpts,
};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    let deployer = load_deployer(&cli)?;

    if let Some(path) = &cli.save_config {
        deployer.save_to_file(path)?;
    }

    let auth = if cli.dry_run {
        None
    } else {
        let auth = match &cli.private_key {
            Some(private_key) => TransactOpts::from_private_key(private_key, deployer.chain_id)
                .context("Failed to parse the deployer private key")?,
            None => TransactOpts::random(deployer.chain_id),
        };
        Some(auth)
    };

    match deployer.deploy(auth.as_ref()).context("Deployment failed")? {
        Deployment::ReadOnly => {
            let plan = deployer.plan()?;
            println!("{}", plan_table(&plan));
        }
        Deployment::Deployed(result) => {
            println!("{}", contracts_table(&result));

            if let Some(path) = &cli.output {
                write_report(&result, path)?;
            }
        }
    }

    Ok(())
}

/// Layer defaults, the configuration file, the environment and CLI flags.
fn load_deployer(cli: &Cli) -> Result<Deployer> {
    let mut figment = Figment::from(Serialized::defaults(Deployer::default()));

    if let Some(path) = &cli.config {
        let config_path = if path.is_dir() {
            path.join(SIMCHAIN_CONFIG_FILENAME)
        } else {
            path.clone()
        };
        if !config_path.exists() {
            anyhow::bail!("Configuration file not found: {}", config_path.display());
        }

        tracing::info!(config_path = %config_path.display(), "Loading configuration file...");
        figment = figment.merge(Toml::file(config_path));
    }

    let deployer: Deployer = figment
        .merge(Env::prefixed("SIMCHAIN_").split("__"))
        .extract()
        .context("Failed to load configuration")?;

    let mut builder = DeployerBuilder::from_deployer(deployer);

    if let Some(chain_id) = cli.chain_id {
        builder = builder.chain_id(chain_id);
    }

    if let Some(network_name) = &cli.network_name {
        builder = builder.network_name(network_name.clone());
    }

    builder.build().context("Invalid configuration")
}

fn plan_table(plan: &DeploymentPlan) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["#", "Step", "Contract", "Sends tx"]);

    for (index, step) in plan.steps().iter().enumerate() {
        let contract = match &step.kind {
            StepKind::Predict { roles } => roles
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
            _ => step.role().map(|role| role.to_string()).unwrap_or_default(),
        };

        table.add_row(vec![
            index.to_string(),
            step.label.clone(),
            contract,
            if step.sends_transaction() { "yes" } else { "no" }.to_string(),
        ]);
    }

    table
}

fn contracts_table(result: &DeploymentResult<SimulatedBackend>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Contract", "Address", "Predicted at nonce", "System"]);

    for contract in result.contracts.iter() {
        let predicted = result
            .predictions
            .get(&contract.role)
            .map(|predicted| predicted.nonce.to_string())
            .unwrap_or_default();
        let system = if result.system_contracts.contains(&contract.address) {
            "yes"
        } else {
            ""
        };

        table.add_row(vec![
            contract.role.to_string(),
            contract.address.to_string(),
            predicted,
            system.to_string(),
        ]);
    }

    table
}

fn write_report(result: &DeploymentResult<SimulatedBackend>, path: &Path) -> Result<()> {
    let report = result.report().to_json_pretty()?;
    std::fs::write(path, report)
        .context(format!("Failed to write deployment report to {}", path.display()))?;

    tracing::info!(path = %path.display(), "Deployment report written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_report_is_written() {
        let dir = TempDir::new("simchain-report").unwrap();
        let path = dir.path().join("report.json");

        let deployer = Deployer::default();
        let auth = TransactOpts::random(deployer.chain_id);
        let result = deployer
            .deploy(Some(&auth))
            .unwrap()
            .into_result()
            .unwrap();

        write_report(&result, &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"tokenAddress\""));
        assert!(content.contains("\"exitManager\""));
    }

    #[test]
    fn test_config_file_is_layered() {
        let dir = TempDir::new("simchain-config").unwrap();
        let mut base = Deployer::default();
        base.rollup.batch_limit = 42;
        base.save_to_file(&dir.path().join(SIMCHAIN_CONFIG_FILENAME))
            .unwrap();

        let cli = Cli::try_parse_from([
            "simchain",
            "--config",
            dir.path().to_str().unwrap(),
            "--name",
            "layered",
        ])
        .unwrap();
        let deployer = load_deployer(&cli).unwrap();

        assert_eq!(deployer.rollup.batch_limit, 42);
        assert_eq!(deployer.rollup.network_name, "layered");
    }

    #[test]
    fn test_plan_table_lists_every_step() {
        let plan = Deployer::default().plan().unwrap();
        let rendered = plan_table(&plan).to_string();

        for step in plan.steps() {
            assert!(rendered.contains(&step.label), "missing {}", step.label);
        }
    }
}

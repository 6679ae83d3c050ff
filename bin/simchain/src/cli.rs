use std::path::PathBuf;

use clap::Parser;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "simchain")]
#[command(
    author,
    version,
    about = "Deploy a rollup and its bridge onto a simulated chain"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "SIMCHAIN_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// Path to a Simchain.toml configuration file, or to a directory containing one.
    ///
    /// Settings are layered: defaults, then this file, then SIMCHAIN_* environment
    /// variables (nested keys separated by `__`, e.g. SIMCHAIN_ROLLUP__NETWORK_NAME),
    /// then the flags below.
    #[arg(long, alias = "conf", env = "SIMCHAIN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Hex-encoded private key of the deploying account.
    ///
    /// If not provided, a random account is generated and funded.
    #[arg(long, env = "SIMCHAIN_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: Option<String>,

    /// The chain id of the simulated chain.
    #[arg(long)]
    pub chain_id: Option<u64>,

    /// The network name passed to the rollup.
    #[arg(long, visible_alias = "name")]
    pub network_name: Option<String>,

    /// Print the deployment plan without deploying anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Write the effective configuration to this path.
    #[arg(long)]
    pub save_config: Option<PathBuf>,

    /// Write a JSON deployment report to this path.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["simchain"]).unwrap();
        assert!(cli.config.is_none());
        assert!(cli.chain_id.is_none());
        assert!(!cli.dry_run);
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::try_parse_from([
            "simchain",
            "--verbosity",
            "debug",
            "--chain-id",
            "42",
            "--name",
            "testnet",
            "--dry-run",
            "-o",
            "report.json",
        ])
        .unwrap();

        assert_eq!(cli.verbosity, LevelFilter::DEBUG);
        assert_eq!(cli.chain_id, Some(42));
        assert_eq!(cli.network_name.as_deref(), Some("testnet"));
        assert!(cli.dry_run);
        assert_eq!(cli.output, Some(PathBuf::from("report.json")));
    }
}

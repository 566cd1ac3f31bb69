//! # CLI Interface
//!
//! Defines the command-line argument structure for `badge-node` using
//! `clap` derive. Supports four subcommands: `serve`, `keygen`, `inspect`,
//! and `version`.
//!
//! Badge settings that the library reads itself (`BADGE_SIGNING_KEY`,
//! `BADGE_NETWORK`, `BADGE_LOCKED_LOVELACE`, ...) stay in the environment;
//! flags here only cover what the binary owns or commonly overrides.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::logging::LogFormat;

/// Badge minting node.
///
/// Serves `POST /badges/mint` against an in-memory devnet ledger, signs
/// with the custodial key from `BADGE_SIGNING_KEY`, and exposes Prometheus
/// metrics.
#[derive(Parser, Debug)]
#[command(
    name = "badge-node",
    about = "Badge lifecycle minting node",
    version,
    propagate_version = true
)]
pub struct BadgeNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the badge node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API and metrics servers.
    Serve(ServeArgs),
    /// Generate a fresh custodial signing key and print it.
    Keygen(KeygenArgs),
    /// Load a contract bundle and print the derived policy id and address.
    Inspect(InspectArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `serve` subcommand.
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Port for the REST API.
    #[arg(long, env = "BADGE_HTTP_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "BADGE_METRICS_PORT", default_value_t = 9100)]
    pub metrics_port: u16,

    /// Contract bundle path. Overrides `BADGE_BLUEPRINT_PATH`.
    #[arg(long, short = 'b')]
    pub blueprint: Option<PathBuf>,

    /// Log output format.
    #[arg(long, env = "BADGE_LOG_FORMAT", value_enum, ignore_case = true, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Arguments for the `keygen` subcommand.
#[derive(Parser, Debug)]
pub struct KeygenArgs {
    /// Print only the bech32 `ed25519_sk1...` form.
    #[arg(long)]
    pub bech32: bool,
}

/// Arguments for the `inspect` subcommand.
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Contract bundle to load.
    #[arg(long, short = 'b', env = "BADGE_BLUEPRINT_PATH", default_value = "plutus.json")]
    pub blueprint: PathBuf,

    /// Network to derive the holder address for.
    #[arg(long, env = "BADGE_NETWORK", default_value = "testnet")]
    pub network: String,

    /// Bundle title of the minting policy.
    #[arg(long, env = "BADGE_POLICY_TITLE", default_value = "badge.badge_policy.mint")]
    pub policy_title: String,

    /// Bundle title of the holder spending validator.
    #[arg(long, env = "BADGE_HOLDER_TITLE", default_value = "badge.badge_holder.spend")]
    pub holder_title: String,

    /// Owner key hash (hex) to print a badge unit for.
    #[arg(long, requires = "level")]
    pub owner: Option<String>,

    /// Badge level to print a unit for.
    #[arg(long, requires = "owner")]
    pub level: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        BadgeNodeCli::command().debug_assert();
    }

    #[test]
    fn inspect_owner_requires_level() {
        let parsed = BadgeNodeCli::try_parse_from([
            "badge-node",
            "inspect",
            "--owner",
            "00000000000000000000000000000000000000000000000000000000",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn inspect_accepts_custom_titles() {
        let cli = BadgeNodeCli::try_parse_from([
            "badge-node",
            "inspect",
            "--policy-title",
            "acme.policy.mint",
            "--holder-title",
            "acme.holder.spend",
        ])
        .unwrap();
        match cli.command {
            Commands::Inspect(args) => {
                assert_eq!(args.policy_title, "acme.policy.mint");
                assert_eq!(args.holder_title, "acme.holder.spend");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn serve_defaults() {
        let cli = BadgeNodeCli::try_parse_from(["badge-node", "serve"]).unwrap();
        match cli.command {
            Commands::Serve(args) => {
                assert!(args.blueprint.is_none());
                assert_eq!(args.log_format, LogFormat::Pretty);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn serve_rejects_unknown_log_format() {
        let parsed = BadgeNodeCli::try_parse_from(["badge-node", "serve", "--log-format", "yaml"]);
        assert!(parsed.is_err());
    }
}

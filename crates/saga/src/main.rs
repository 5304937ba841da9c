// SPDX-FileCopyrightText: 2026 Saga Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Saga - a retrieval-grounded story co-authoring service.
//!
//! Binary entry point: argument parsing, configuration, tracing, dispatch.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod commands;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use saga_config::SagaConfig;
use tracing::error;

/// Saga - a retrieval-grounded story co-authoring service.
#[derive(Parser, Debug)]
#[command(name = "saga", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API with the indexer and periodic consolidation.
    Serve,
    /// Run one consolidation job once and exit.
    Consolidate {
        #[command(subcommand)]
        job: ConsolidateJob,
    },
    /// Rewrite verified lines into a canonical story.
    Canonicalize {
        #[arg(long)]
        title: Option<String>,
        /// Restrict to these line ids (repeatable). Defaults to every verified line.
        #[arg(long = "line-id", value_name = "ID")]
        line_ids: Vec<i64>,
    },
    /// Inspect configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum ConsolidateJob {
    /// Extract lore from the most recent verified lines.
    Lore,
    /// Summarize the ledger in fixed-size chunks.
    Summary,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigAction {
    /// Validate configuration and report what would be used.
    Check,
}

fn load_config(path: Option<&std::path::Path>) -> SagaConfig {
    let loaded = match path {
        Some(p) => saga_config::load_and_validate_path(p),
        None => saga_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            saga_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());
    serve::init_tracing(&config.server.log_level);

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Consolidate { job }) => commands::run_consolidate(config, job).await,
        Some(Commands::Canonicalize { title, line_ids }) => {
            commands::run_canonicalize(config, title, line_ids).await
        }
        Some(Commands::Config {
            action: ConfigAction::Check,
        }) => {
            commands::run_config_check(&config);
            Ok(())
        }
        None => {
            println!("saga: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        error!(error = %e, "command failed");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0);
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_canonicalize_selection() {
        let cli = Cli::try_parse_from([
            "saga",
            "canonicalize",
            "--title",
            "The Gate",
            "--line-id",
            "3",
            "--line-id",
            "5",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Canonicalize { title, line_ids }) => {
                assert_eq!(title.as_deref(), Some("The Gate"));
                assert_eq!(line_ids, vec![3, 5]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_consolidate_job_and_global_config() {
        let cli = Cli::try_parse_from(["saga", "consolidate", "summary", "--config", "saga.toml"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("saga.toml")));
        assert!(matches!(
            cli.command,
            Some(Commands::Consolidate {
                job: ConsolidateJob::Summary
            })
        ));
    }

    #[test]
    fn unknown_job_is_rejected() {
        assert!(Cli::try_parse_from(["saga", "consolidate", "everything"]).is_err());
    }

    #[test]
    fn default_config_is_valid() {
        let config = saga_config::load_and_validate_str("").expect("defaults should validate");
        assert_eq!(config.server.port, 8000);
    }
}

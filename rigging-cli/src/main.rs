//! rig: resource scaffolding and schema migrations

#![allow(clippy::multiple_crate_versions)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use rigging::plan::ArtifactKind;
use rigging_cli::{exit, observability, DbCommand, GenerateCommand, InflectCommand, Project};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "rig")]
#[command(version)]
#[command(about = "Resource scaffolding and schema migrations", long_about = None)]
struct Cli {
    /// More log output (-v, -vv); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Config file to use instead of ./rigging.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Project root
    #[arg(short = 'C', long = "project", global = true, default_value = ".")]
    project: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a resource: migration, model, handlers, views and tests
    Generate {
        /// Resource name (`Post`, `invoice_item`)
        resource: String,
        /// Field definitions (`title:string:required`, `author:references:User`)
        #[arg(required = true)]
        fields: Vec<String>,
        /// Only generate these artifact kinds
        #[arg(long, value_delimiter = ',')]
        only: Vec<ArtifactKind>,
        /// Show what would be written without touching disk
        #[arg(long)]
        dry_run: bool,
        /// Apply pending migrations afterwards
        #[arg(long)]
        migrate: bool,
    },
    /// Database migrations
    Db {
        #[command(subcommand)]
        command: DbCommand,
    },
    /// Show every naming variant of a word
    Inflect {
        /// Word or resource name
        word: String,
    },
}

async fn run(cli: Cli) -> Result<()> {
    if let Commands::Inflect { word } = &cli.command {
        return InflectCommand { word: word.clone() }.execute();
    }

    let project = Project::load(&cli.project, cli.config.as_deref())?;
    match cli.command {
        Commands::Generate {
            resource,
            fields,
            only,
            dry_run,
            migrate,
        } => {
            GenerateCommand {
                resource,
                fields,
                only,
                dry_run,
                migrate,
            }
            .execute(&project)
            .await
        }
        Commands::Db { command } => command.execute(&project).await,
        Commands::Inflect { .. } => Ok(()),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = match observability::init(cli.verbose).context("Failed to initialize logging") {
        Ok(()) => run(cli).await,
        Err(e) => Err(e),
    };

    if let Err(err) = &result {
        eprintln!("\n{} {err:#}", style("error:").red().bold());
    }
    exit::exit_code(&result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_generate_with_only() {
        let cli = Cli::try_parse_from([
            "rig", "generate", "post", "title:string", "--only", "model,view", "-vv",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Commands::Generate { only, .. } = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(only, vec![ArtifactKind::Model, ArtifactKind::View]);
    }

    #[test]
    fn test_print_sql_dialect_requires_flag() {
        assert!(Cli::try_parse_from(["rig", "db", "migrate", "--dialect", "postgres"]).is_err());
        assert!(
            Cli::try_parse_from(["rig", "db", "migrate", "--print-sql", "--dialect", "mssql"])
                .is_ok()
        );
    }
}

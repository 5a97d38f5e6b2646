use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Args;

use dcr_core::config::EngineConfig;
use dcr_runtime::{Controller, DirectoryDeployer, DirectorySchemaSource, StaticSessionProvider};

use crate::ConfigArgs;

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
    /// Comma-separated table identifiers
    #[arg(long, value_delimiter = ',', required_unless_present = "tables_file")]
    pub tables: Vec<String>,
    /// File with one table identifier per line (`#` starts a comment)
    #[arg(long, conflicts_with = "tables")]
    pub tables_file: Option<PathBuf>,
    /// Directory of `<table>.json` schema documents
    #[arg(long)]
    pub schema_dir: PathBuf,
    /// Directory standing in for deployed resources
    #[arg(long, default_value = "./deployed")]
    pub deploy_dir: PathBuf,
    /// Artifact output directory
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
    /// Deploy auto-deployable rules instead of a dry run
    #[arg(long)]
    pub deploy: bool,
    /// Process tables on a worker pool
    #[arg(long)]
    pub parallel: bool,
}

/// Runs the batch and prints the summary. Returns false if any table failed.
pub fn execute(mut config: EngineConfig, args: &RunArgs) -> anyhow::Result<bool> {
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    config.deploy |= args.deploy;
    config.parallel |= args.parallel;

    let tables = match &args.tables_file {
        Some(path) => read_tables_file(path)?,
        None => args.tables.clone(),
    };
    anyhow::ensure!(!tables.is_empty(), "no tables to process");
    tracing::debug!(
        tables = tables.len(),
        schema_dir = %args.schema_dir.display(),
        deploy_dir = %args.deploy_dir.display(),
        "Loaded batch"
    );

    let controller = Controller::new(
        config,
        Arc::new(DirectorySchemaSource::new(&args.schema_dir)),
        Arc::new(DirectoryDeployer::new(&args.deploy_dir)),
        Arc::new(StaticSessionProvider::from_env()),
    )?;

    let summary = controller.run(&tables);
    print!("{}", summary);
    Ok(!summary.has_failures())
}

fn read_tables_file(path: &Path) -> anyhow::Result<Vec<String>> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(parse_table_list(&contents))
}

fn parse_table_list(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(|line| line.split('#').next().unwrap_or_default().trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

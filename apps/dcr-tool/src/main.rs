//! Command-line front end for Data Collection Rule synthesis.

mod commands;
mod logging;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use dcr_core::config::EngineConfig;
use dcr_core::schema::TableMode;

#[derive(Parser)]
#[command(
    name = "dcr-tool",
    version,
    about = "Synthesize Data Collection Rules from live table schemas"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Debug logging (overrides the configured log level)
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Settings shared by every subcommand. Flags override the config file,
/// which is itself overridden by `DCR_*` variables.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Table mode: native or custom
    #[arg(long)]
    mode: Option<TableMode>,
    /// Azure region
    #[arg(long)]
    location: Option<String>,
    /// Log Analytics workspace resource id
    #[arg(long)]
    workspace: Option<String>,
    /// Data collection endpoint resource id
    #[arg(long)]
    endpoint: Option<String>,
}

impl ConfigArgs {
    /// File, then environment, then flags.
    pub fn load(&self) -> anyhow::Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => EngineConfig::default(),
        };
        config.apply_env_overrides()?;
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(location) = &self.location {
            config.location = location.clone();
        }
        if let Some(workspace) = &self.workspace {
            config.workspace = workspace.clone();
        }
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = Some(endpoint.clone());
        }
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Process a batch of tables against schema and deployment directories
    Run(commands::run::RunArgs),
    /// Synthesize one template offline from a schema document
    Synthesize(commands::synthesize::SynthesizeArgs),
    /// Print the DCR name a table resolves to
    Name(commands::name::NameArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (config_args, level_hint) = match &cli.command {
        Commands::Run(args) => (&args.config, None),
        Commands::Synthesize(args) => (&args.config, None),
        Commands::Name(args) => (&args.config, Some("warn")),
    };
    let config = config_args.load()?;
    let level = if cli.verbose {
        "debug"
    } else {
        level_hint.unwrap_or(config.log_level.as_str())
    };
    logging::init(level);

    match cli.command {
        Commands::Run(args) => {
            let succeeded = commands::run::execute(config, &args)?;
            if !succeeded {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Synthesize(args) => commands::synthesize::execute(config, &args),
        Commands::Name(args) => commands::name::execute(config, &args),
    }
}

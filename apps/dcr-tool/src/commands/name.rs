use clap::Args;

use dcr_core::config::EngineConfig;
use dcr_core::naming::NameResolver;

use crate::ConfigArgs;

#[derive(Args, Debug)]
pub struct NameArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
    /// Table identifier
    pub table: String,
    /// Name prefix
    #[arg(long)]
    pub prefix: Option<String>,
    /// Name suffix
    #[arg(long)]
    pub suffix: Option<String>,
    /// Maximum name length
    #[arg(long)]
    pub max_length: Option<usize>,
}

pub fn execute(mut config: EngineConfig, args: &NameArgs) -> anyhow::Result<()> {
    if let Some(prefix) = &args.prefix {
        config.name.prefix = prefix.clone();
    }
    if let Some(suffix) = &args.suffix {
        config.name.suffix = suffix.clone();
    }
    if let Some(max) = args.max_length {
        config.name.max_length = max;
    }

    let resolved = NameResolver::new(config.name).resolve(&args.table, None)?;
    println!("{}", resolved.name);
    for warning in &resolved.warnings {
        eprintln!("warning: {}", warning);
    }
    Ok(())
}

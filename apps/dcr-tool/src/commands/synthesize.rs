use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use serde_json::Value;

use dcr_core::advisor;
use dcr_core::config::EngineConfig;
use dcr_core::naming::NameResolver;
use dcr_core::schema::SchemaResolver;
use dcr_core::template::TemplateSynthesizer;

use crate::ConfigArgs;

#[derive(Args, Debug)]
pub struct SynthesizeArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
    /// Schema document (JSON)
    pub schema: PathBuf,
    /// Table identifier (defaults to the file stem)
    #[arg(long)]
    pub table: Option<String>,
    /// Fail on an ambiguous schema instead of using the best guess
    #[arg(long)]
    pub strict: bool,
}

/// Prints the template on stdout and the verdict on stderr.
pub fn execute(config: EngineConfig, args: &SynthesizeArgs) -> anyhow::Result<()> {
    config.validate()?;
    let contents = fs::read_to_string(&args.schema)
        .with_context(|| format!("reading {}", args.schema.display()))?;
    let document: Value = serde_json::from_str(&contents)
        .with_context(|| format!("parsing {}", args.schema.display()))?;
    let table = match &args.table {
        Some(table) => table.clone(),
        None => args
            .schema
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .context("cannot derive a table name from the schema path")?,
    };

    // The document answers for whichever name variant is probed first.
    let resolution =
        SchemaResolver::new(config.mode).resolve(&table, |_| Ok(Some(document.clone())))?;
    let schema = if args.strict {
        resolution.into_strict()?
    } else {
        resolution.into_schema()
    };
    let (columns, mut warnings) = schema.normalize(config.mode);
    let name = NameResolver::new(config.name.clone()).resolve(&schema.table_name, None)?;
    warnings.extend(name.warnings);

    let definition = TemplateSynthesizer::new(
        config.location.clone(),
        config.workspace_for(&table, &schema.table_name).to_string(),
        config.endpoint.clone(),
    )
    .synthesize(&schema.table_name, config.mode, &name.name, columns);
    let rendered = definition.to_json_pretty()?;
    let verdict = advisor::assess(&definition, rendered.len());

    println!("{}", rendered);
    for warning in warnings.iter().chain(&verdict.warnings) {
        eprintln!("warning: {}", warning);
    }
    eprintln!("{}", serde_json::to_string_pretty(&verdict)?);
    Ok(())
}

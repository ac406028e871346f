pub mod cli;
pub mod error;
pub mod model;
pub mod parser;
pub mod processor;
pub mod writer;

pub use error::ResolveError;
pub use processor::{ConvertOptions, MissingClassPolicy, ParsedResult};

use anyhow::Context;
use tracing::info;

/// Parse both documents and resolve every entity.
pub fn convert(
    project_json: &str,
    map_json: &str,
    options: &ConvertOptions,
) -> anyhow::Result<ParsedResult> {
    let project = parser::load_project(project_json).with_context(|| "Parsing project JSON")?;
    let map = parser::load_map(map_json).with_context(|| "Parsing map JSON")?;
    processor::run(project, &map, options)
}

pub fn run(args: &cli::Cli) -> anyhow::Result<()> {
    // 1. ── Parse ──────────────────────────────────────────────────────
    let project = std::fs::read_to_string(&args.project)
        .with_context(|| format!("Reading {}", args.project.display()))?;
    let map = std::fs::read_to_string(&args.map)
        .with_context(|| format!("Reading {}", args.map.display()))?;

    // 2. ── Process ────────────────────────────────────────────────────
    let options = ConvertOptions {
        on_missing_class: args.on_missing_class,
    };
    let result = convert(&project, &map, &options)?;

    // 3. ── Write output ───────────────────────────────────────────────
    writer::json::emit(&result, &args.output, !args.compact)
        .with_context(|| format!("Writing {}", args.output.display()))?;

    info!(output = %args.output.display(), "done");
    Ok(())
}

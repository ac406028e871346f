use clap::Parser;
use std::path::PathBuf;

use crate::processor::MissingClassPolicy;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Tiled project file declaring the custom classes
    #[arg(short = 'p', long = "project")]
    pub project: PathBuf,
    /// Tiled map file (JSON)
    #[arg(short = 'm', long = "map")]
    pub map: PathBuf,
    /// Output JSON file
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
    /// What to do with entities whose class is not declared
    #[arg(long, value_enum, default_value_t = MissingClassPolicy::Abort)]
    pub on_missing_class: MissingClassPolicy,
    /// Write the output on a single line
    #[arg(long)]
    pub compact: bool,
    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

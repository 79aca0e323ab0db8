//! CLI Module
//!
//! Command-line interface for inspecting and editing map-asset projects.

pub mod commands;

use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;

use crate::asset::AssetKind;

/// Atlas - file-backed map asset projects
#[derive(Parser, Debug)]
#[command(name = "atlas")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Project configuration file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the asset directories of a new project
    #[command(name = "init")]
    Init {
        /// Project root directory
        root: PathBuf,
    },

    /// Load a project and print its summary
    #[command(name = "load")]
    Load {
        /// Project root directory
        root: PathBuf,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Copy an asset file into a project and load it
    #[command(name = "add")]
    Add {
        /// Project root directory
        root: PathBuf,

        /// Asset kind (symbol, renderer, feature-set, layer)
        #[arg(short, long)]
        kind: AssetKind,

        /// File to add
        file: PathBuf,
    },

    /// Add a point feature through a layer and save it to its feature set
    #[command(name = "add-feature")]
    AddFeature {
        /// Project root directory
        root: PathBuf,

        /// Layer name (file name without extension)
        #[arg(short, long)]
        layer: String,

        #[arg(long, allow_negative_numbers = true)]
        x: f64,

        #[arg(long, allow_negative_numbers = true)]
        y: f64,

        /// Attribute as key=value; values that parse as JSON keep their type
        #[arg(long = "attr", value_parser = parse_attribute)]
        attributes: Vec<(String, Value)>,
    },
}

/// Parse a `key=value` attribute argument.
pub fn parse_attribute(input: &str) -> Result<(String, Value), String> {
    let (key, raw) = input
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{}`", input))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("attribute name missing in `{}`", input));
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

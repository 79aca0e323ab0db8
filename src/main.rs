//! Atlas CLI - Map Asset Projects
//!
//! Command-line interface for loading and editing file-backed map projects.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;

use atlas::cli::{commands, Cli, Commands};
use atlas::logging::init_logging;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    debug!("Atlas v{}", env!("CARGO_PKG_VERSION"));

    let config =
        commands::load_config(cli.config.as_deref()).context("failed to read configuration")?;

    match cli.command {
        Commands::Init { root } => commands::init_project(&root, config)
            .await
            .with_context(|| format!("failed to initialize {}", root.display())),
        Commands::Load { root, json } => commands::load_project(&root, config, json)
            .await
            .with_context(|| format!("failed to load project {}", root.display())),
        Commands::Add { root, kind, file } => commands::add_asset(&root, config, kind, &file)
            .await
            .with_context(|| format!("failed to add {} to {}", file.display(), root.display())),
        Commands::AddFeature {
            root,
            layer,
            x,
            y,
            attributes,
        } => commands::add_feature(&root, config, &layer, x, y, attributes)
            .await
            .with_context(|| format!("failed to edit layer {}", layer)),
    }
}

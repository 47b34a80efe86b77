use anyhow::{Context, Result};
use clap::Args;

use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};
use crate::services::create_backend_with_embedding_config;

#[derive(Debug, Args)]
pub struct DeleteArgs {
    #[arg(required = true, help = "Ids of the items to remove")]
    pub ids: Vec<String>,
}

pub async fn handle_delete(args: DeleteArgs, format: OutputFormat, _verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(format);

    let store = create_backend_with_embedding_config(&config.vector_store, &config.embedding)
        .await
        .context("failed to open vector store")?;
    let count = store
        .delete_by_ids(&args.ids)
        .await
        .context("delete failed")?;
    tracing::info!(requested = args.ids.len(), count, "deleted items");

    println!(
        "{}",
        formatter.format_message(&format!("Deleted {count} of {} items", args.ids.len()))
    );
    Ok(())
}

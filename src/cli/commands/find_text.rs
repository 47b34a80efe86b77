use anyhow::{Context, Result};
use clap::Args;

use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};
use crate::services::create_backend_with_embedding_config;

#[derive(Debug, Args)]
pub struct FindTextArgs {
    /// Exact stored text to look up
    pub text: String,
}

pub async fn handle_find_text(args: FindTextArgs, format: OutputFormat, _verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(format);

    let store = create_backend_with_embedding_config(&config.vector_store, &config.embedding)
        .await
        .context("failed to open vector store")?;
    let items = store
        .find_by_text(&args.text)
        .await
        .context("text lookup failed")?;

    print!("{}", formatter.format_items(&items));
    Ok(())
}

use anyhow::Result;

use crate::cli::output::{StatusInfo, get_formatter};
use crate::models::{Config, OutputFormat, VectorDriver};
use crate::services::{FileCheckpoint, create_backend_with_embedding_config};

pub async fn handle_status(format: OutputFormat, _verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(format);

    let (vector_store_connected, vector_store_points) =
        match create_backend_with_embedding_config(&config.vector_store, &config.embedding).await {
            Ok(store) => {
                let connected = store.health_check().await.unwrap_or(false);
                let points = if connected {
                    store.count().await.ok().flatten()
                } else {
                    None
                };
                (connected, points)
            }
            Err(e) => {
                tracing::debug!(error = %e, "vector store unavailable");
                (false, None)
            }
        };

    let checkpoint_offset = config.checkpoint_path().and_then(|path| {
        FileCheckpoint::new(path, String::new())
            .load()
            .ok()
            .flatten()
            .map(|cp| cp.offset)
    });

    let status = StatusInfo {
        embedding_model: config.embedding.model.clone(),
        embedding_url: config.embedding.url.clone(),
        vector_store_driver: config.vector_store.driver.to_string(),
        vector_store_location: config.vector_store.location(),
        vector_store_connected,
        vector_store_points,
        collection: config.vector_store.collection.clone(),
        checkpoint_offset,
    };

    print!("{}", formatter.format_status(&status));

    if !vector_store_connected {
        eprintln!();
        match config.vector_store.driver {
            VectorDriver::Qdrant => {
                eprintln!("Warning: Qdrant not reachable. Start with: docker-compose up -d qdrant");
            }
            VectorDriver::Local => {
                eprintln!("Warning: local index could not be opened. Check vector_store.data_dir.");
            }
        }
    }
    if config.embedding.api_key.is_none() {
        eprintln!("Hint: no embedding API key set. Export OPENAI_API_KEY or set embedding.api_key.");
    }

    Ok(())
}

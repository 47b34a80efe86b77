use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;

use super::threads::load_threads;
use crate::cli::output::{IngestStats, get_formatter};
use crate::error::CheckpointError;
use crate::models::{Config, EmbeddingItem, OutputFormat};
use crate::services::{
    CheckpointSink, EmbeddingProvider, FileCheckpoint, IngestOptions, OpenAiEmbeddingClient,
    create_backend_with_embedding_config, ingest,
};

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// Preprocessed posts as a JSON array or JSONL, oldest first
    pub file: PathBuf,

    #[arg(long, help = "Threads per embedding request (default: embedding.batch_size)")]
    pub batch_size: Option<u32>,

    #[arg(long, help = "Start at this thread offset instead of the saved checkpoint")]
    pub from: Option<usize>,

    #[arg(long, help = "Discard the saved checkpoint before starting")]
    pub reset: bool,

    #[arg(long, help = "Rebuild threads and report what would be ingested")]
    pub dry_run: bool,
}

/// Saves the checkpoint and advances the progress bar.
struct ProgressCheckpoint {
    inner: FileCheckpoint,
    bar: ProgressBar,
    start: usize,
}

impl CheckpointSink for ProgressCheckpoint {
    fn record(&mut self, offset: usize) -> Result<(), CheckpointError> {
        self.inner.record(offset)?;
        self.bar
            .set_position(offset.saturating_sub(self.start) as u64);
        Ok(())
    }
}

pub async fn handle_ingest(args: IngestArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(format);
    let start_time = Instant::now();

    if args.batch_size == Some(0) {
        anyhow::bail!("batch size must be at least 1");
    }

    let threads = load_threads(&args.file)?;
    let thread_count = threads.len();
    let items: Vec<EmbeddingItem> = threads.into_iter().map(EmbeddingItem::from).collect();

    let checkpoint_path = config
        .checkpoint_path()
        .ok_or_else(|| anyhow::anyhow!("could not determine checkpoint path"))?;
    let checkpoint = FileCheckpoint::new(checkpoint_path, args.file.display().to_string());
    if args.reset {
        checkpoint.clear().context("failed to clear checkpoint")?;
    }

    let start = match args.from {
        Some(offset) => offset,
        None => checkpoint
            .load_offset()
            .context("failed to read checkpoint")?,
    }
    .min(thread_count);

    if verbose {
        eprintln!("Threads: {thread_count}");
        eprintln!("  Starting at: {start}");
        eprintln!("  Checkpoint: {}", checkpoint.path().display());
    }

    if args.dry_run {
        let stats = IngestStats {
            threads: thread_count,
            considered: thread_count - start,
            next_offset: start,
            dry_run: true,
            duration_ms: start_time.elapsed().as_millis() as u64,
            ..Default::default()
        };
        print!("{}", formatter.format_ingest_stats(&stats));
        return Ok(());
    }

    let provider = OpenAiEmbeddingClient::new(&config.embedding)?;
    let store = create_backend_with_embedding_config(&config.vector_store, &config.embedding)
        .await
        .context("failed to open vector store")?;
    tracing::info!(
        backend = store.backend_name(),
        collection = store.collection(),
        model = provider.model(),
        start,
        "ingesting threads"
    );

    let mut options = IngestOptions::from_config(&config).with_start_offset(start);
    if let Some(batch_size) = args.batch_size {
        options = options.with_batch_size(batch_size as usize);
    }

    let bar = ProgressBar::new((thread_count - start) as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )?
            .progress_chars("#>-"),
    );
    let mut sink = ProgressCheckpoint {
        inner: checkpoint,
        bar: bar.clone(),
        start,
    };

    let result = ingest(items, &provider, store.as_ref(), &options, Some(&mut sink)).await;
    bar.finish_and_clear();

    let report = result.map_err(|e| {
        if let Some(offset) = e.offset() {
            eprintln!("Resume with: tsearch ingest {} --from {offset}", args.file.display());
        }
        anyhow::Error::new(e).context("ingestion stopped")
    })?;

    let stats = IngestStats {
        threads: thread_count,
        considered: report.considered,
        skipped: report.skipped,
        inserted: report.inserted,
        batches: report.batches,
        last_mutation_id: report.last_mutation_id().map(ToString::to_string),
        next_offset: report.next_offset,
        dry_run: false,
        duration_ms: start_time.elapsed().as_millis() as u64,
    };
    print!("{}", formatter.format_ingest_stats(&stats));

    Ok(())
}

//! Thread reconstruction command and the shared post loader.

use anyhow::{Context, Result};
use clap::Args;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::cli::output::get_formatter;
use crate::models::{OutputFormat, Post, Thread};
use crate::services::{ThreadStats, reconstruct};

#[derive(Debug, Args)]
pub struct ThreadsArgs {
    /// Preprocessed posts as a JSON array or JSONL, oldest first (use - for stdin)
    pub file: PathBuf,
}

pub async fn handle_threads(args: ThreadsArgs, format: OutputFormat, _verbose: bool) -> Result<()> {
    let formatter = get_formatter(format);
    let threads = load_threads(&args.file)?;
    let stats = ThreadStats::from_threads(&threads);

    print!("{}", formatter.format_thread_stats(&stats));
    Ok(())
}

/// Read posts from `path` and rebuild their threads.
pub(crate) fn load_threads(path: &Path) -> Result<Vec<Thread>> {
    let posts = read_posts(path)?;
    let threads = reconstruct(&posts).context("failed to reconstruct threads")?;
    let stats = ThreadStats::from_threads(&threads);
    tracing::info!(
        posts = posts.len(),
        threads = stats.threads,
        words = stats.words,
        "reconstructed threads"
    );
    Ok(threads)
}

pub(crate) fn read_posts(path: &Path) -> Result<Vec<Post>> {
    let input = read_input(path)?;
    parse_posts(&input)
}

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut input = String::new();
        io::stdin()
            .read_to_string(&mut input)
            .context("failed to read stdin")?;
        return Ok(input);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Parse posts from a JSON array or one JSON object per line.
fn parse_posts(input: &str) -> Result<Vec<Post>> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(Vec::new());
    }

    if input.starts_with('[') {
        return serde_json::from_str(input).context("failed to parse JSON array");
    }

    let mut posts = Vec::new();
    for (i, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let post: Post = serde_json::from_str(line)
            .with_context(|| format!("failed to parse JSON at line {}", i + 1))?;
        posts.push(post);
    }
    Ok(posts)
}

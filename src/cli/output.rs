use std::fmt::Write as FmtWrite;

use serde::Serialize;

use crate::models::{OutputFormat, SearchResults, StoredItem};
use crate::services::ThreadStats;

const PREVIEW_CHARS: usize = 200;

pub trait Formatter {
    fn format_search_results(&self, results: &SearchResults) -> String;
    fn format_status(&self, status: &StatusInfo) -> String;
    fn format_ingest_stats(&self, stats: &IngestStats) -> String;
    fn format_thread_stats(&self, stats: &ThreadStats) -> String;
    fn format_items(&self, items: &[StoredItem]) -> String;
    fn format_message(&self, message: &str) -> String;
    fn format_error(&self, error: &str) -> String;
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusInfo {
    pub embedding_model: String,
    pub embedding_url: String,
    pub vector_store_driver: String,
    pub vector_store_location: String,
    pub vector_store_connected: bool,
    /// None until the first insert creates the index.
    pub vector_store_points: Option<u64>,
    pub collection: String,
    pub checkpoint_offset: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestStats {
    pub threads: usize,
    pub considered: usize,
    pub skipped: usize,
    pub inserted: usize,
    pub batches: usize,
    pub last_mutation_id: Option<String>,
    pub next_offset: usize,
    pub dry_run: bool,
    pub duration_ms: u64,
}

fn preview(text: &str) -> String {
    let head: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().count() > PREVIEW_CHARS {
        format!("{head}...")
    } else {
        head
    }
}

pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format_search_results(&self, results: &SearchResults) -> String {
        if results.is_empty() {
            return format!("No results found for: {}\n", results.query);
        }

        let mut output = String::new();
        writeln!(output, "Search results for: \"{}\"", results.query).unwrap();
        writeln!(
            output,
            "Found {} results in {}ms\n",
            results.len(),
            results.duration_ms
        )
        .unwrap();

        for (i, result) in results.results.iter().enumerate() {
            writeln!(output, "{}. [Score: {:.3}] {}", i + 1, result.score, result.id).unwrap();
            writeln!(output, "   ---").unwrap();
            for line in preview(result.text().unwrap_or_default()).lines() {
                writeln!(output, "   {}", line).unwrap();
            }
            writeln!(output).unwrap();
        }

        output
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        let mut output = String::new();
        writeln!(output, "Status").unwrap();
        writeln!(output, "------").unwrap();
        writeln!(output, "Embedding:     {}", status.embedding_model).unwrap();
        writeln!(output, "  URL:         {}", status.embedding_url).unwrap();
        writeln!(output).unwrap();

        let vector_status = if status.vector_store_connected {
            "[CONNECTED]"
        } else {
            "[DISCONNECTED]"
        };
        writeln!(
            output,
            "Vector Store:  {} ({})",
            status.vector_store_driver, vector_status
        )
        .unwrap();
        writeln!(output, "  Location:    {}", status.vector_store_location).unwrap();
        writeln!(output, "  Collection:  {}", status.collection).unwrap();
        match status.vector_store_points {
            Some(points) => writeln!(output, "  Points:      {}", points).unwrap(),
            None => writeln!(output, "  Points:      (not created)").unwrap(),
        }
        if let Some(offset) = status.checkpoint_offset {
            writeln!(output, "  Checkpoint:  {}", offset).unwrap();
        }

        output
    }

    fn format_ingest_stats(&self, stats: &IngestStats) -> String {
        let mut output = String::new();
        if stats.dry_run {
            writeln!(output, "Dry Run").unwrap();
            writeln!(output, "-------").unwrap();
        } else {
            writeln!(output, "Ingestion Complete").unwrap();
            writeln!(output, "------------------").unwrap();
        }
        writeln!(output, "Threads:      {}", stats.threads).unwrap();
        writeln!(output, "Considered:   {}", stats.considered).unwrap();
        writeln!(output, "Skipped:      {}", stats.skipped).unwrap();
        writeln!(output, "Inserted:     {}", stats.inserted).unwrap();
        writeln!(output, "Batches:      {}", stats.batches).unwrap();
        if let Some(ref id) = stats.last_mutation_id {
            writeln!(output, "Mutation:     {}", id).unwrap();
        }
        writeln!(output, "Next offset:  {}", stats.next_offset).unwrap();
        writeln!(output, "Duration:     {}ms", stats.duration_ms).unwrap();
        output
    }

    fn format_thread_stats(&self, stats: &ThreadStats) -> String {
        let mut output = String::new();
        writeln!(output, "Threads").unwrap();
        writeln!(output, "-------").unwrap();
        writeln!(output, "Threads:        {}", stats.threads).unwrap();
        writeln!(output, "Posts:          {}", stats.posts).unwrap();
        writeln!(output, "Words:          {}", stats.words).unwrap();
        writeln!(output, "Longest thread: {} posts", stats.longest).unwrap();
        output
    }

    fn format_items(&self, items: &[StoredItem]) -> String {
        if items.is_empty() {
            return "No matching items.\n".to_string();
        }

        let mut output = String::new();
        for item in items {
            writeln!(output, "{}", item.id).unwrap();
            for line in preview(item.text().unwrap_or_default()).lines() {
                writeln!(output, "   {}", line).unwrap();
            }
        }
        output
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("Error: {}\n", error)
    }
}

pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn render<T: Serialize + ?Sized>(&self, value: &T) -> String {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        rendered.unwrap_or_else(|e| serde_json::json!({"error": e.to_string()}).to_string())
    }
}

impl Formatter for JsonFormatter {
    fn format_search_results(&self, results: &SearchResults) -> String {
        self.render(results)
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        let json = serde_json::json!({
            "embedding": {
                "model": status.embedding_model,
                "url": status.embedding_url,
            },
            "vector_store": {
                "driver": status.vector_store_driver,
                "location": status.vector_store_location,
                "connected": status.vector_store_connected,
                "collection": status.collection,
                "points": status.vector_store_points,
            },
            "checkpoint_offset": status.checkpoint_offset,
        });
        self.render(&json)
    }

    fn format_ingest_stats(&self, stats: &IngestStats) -> String {
        self.render(stats)
    }

    fn format_thread_stats(&self, stats: &ThreadStats) -> String {
        self.render(stats)
    }

    fn format_items(&self, items: &[StoredItem]) -> String {
        self.render(items)
    }

    fn format_message(&self, message: &str) -> String {
        serde_json::json!({"message": message}).to_string()
    }

    fn format_error(&self, error: &str) -> String {
        serde_json::json!({"error": error}).to_string()
    }
}

pub struct MarkdownFormatter;

impl Formatter for MarkdownFormatter {
    fn format_search_results(&self, results: &SearchResults) -> String {
        if results.is_empty() {
            return format!("## No results found\n\nQuery: `{}`\n", results.query);
        }

        let mut output = String::new();
        writeln!(output, "## Search Results\n").unwrap();
        writeln!(output, "**Query:** `{}`\n", results.query).unwrap();
        writeln!(
            output,
            "Found {} results in {}ms\n",
            results.len(),
            results.duration_ms
        )
        .unwrap();

        for (i, result) in results.results.iter().enumerate() {
            writeln!(output, "### {}. Score: {:.3}\n", i + 1, result.score).unwrap();
            writeln!(output, "**Thread:** `{}`\n", result.id).unwrap();
            for line in result.text().unwrap_or_default().lines() {
                writeln!(output, "> {}", line).unwrap();
            }
            writeln!(output).unwrap();
        }

        output
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        let mut output = String::new();
        writeln!(output, "## Status\n").unwrap();
        writeln!(output, "| Component | Value |").unwrap();
        writeln!(output, "|-----------|-------|").unwrap();
        writeln!(output, "| Embedding model | {} |", status.embedding_model).unwrap();
        writeln!(output, "| Embedding URL | {} |", status.embedding_url).unwrap();
        writeln!(output, "| Driver | {} |", status.vector_store_driver).unwrap();
        writeln!(output, "| Location | {} |", status.vector_store_location).unwrap();
        writeln!(
            output,
            "| Connected | {} |",
            if status.vector_store_connected { "yes" } else { "no" }
        )
        .unwrap();
        writeln!(output, "| Collection | {} |", status.collection).unwrap();
        writeln!(
            output,
            "| Points | {} |",
            status
                .vector_store_points
                .map_or_else(|| "-".to_string(), |p| p.to_string())
        )
        .unwrap();
        output
    }

    fn format_ingest_stats(&self, stats: &IngestStats) -> String {
        let mut output = String::new();
        let title = if stats.dry_run { "Dry Run" } else { "Ingestion Complete" };
        writeln!(output, "## {}\n", title).unwrap();
        writeln!(output, "- **Threads:** {}", stats.threads).unwrap();
        writeln!(output, "- **Considered:** {}", stats.considered).unwrap();
        writeln!(output, "- **Skipped:** {}", stats.skipped).unwrap();
        writeln!(output, "- **Inserted:** {}", stats.inserted).unwrap();
        writeln!(output, "- **Batches:** {}", stats.batches).unwrap();
        writeln!(output, "- **Next offset:** {}", stats.next_offset).unwrap();
        writeln!(output, "- **Duration:** {}ms", stats.duration_ms).unwrap();
        output
    }

    fn format_thread_stats(&self, stats: &ThreadStats) -> String {
        let mut output = String::new();
        writeln!(output, "## Threads\n").unwrap();
        writeln!(output, "- **Threads:** {}", stats.threads).unwrap();
        writeln!(output, "- **Posts:** {}", stats.posts).unwrap();
        writeln!(output, "- **Words:** {}", stats.words).unwrap();
        writeln!(output, "- **Longest thread:** {} posts", stats.longest).unwrap();
        output
    }

    fn format_items(&self, items: &[StoredItem]) -> String {
        if items.is_empty() {
            return "_No matching items._\n".to_string();
        }

        let mut output = String::new();
        for item in items {
            writeln!(output, "### `{}`\n", item.id).unwrap();
            for line in item.text().unwrap_or_default().lines() {
                writeln!(output, "> {}", line).unwrap();
            }
            writeln!(output).unwrap();
        }
        output
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("**Error:** {}\n", error)
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
        OutputFormat::Markdown => Box::new(MarkdownFormatter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Metadata, MetadataValue, QueryMatch, TEXT_KEY};

    fn results() -> SearchResults {
        let mut metadata = Metadata::new();
        metadata.insert(TEXT_KEY.to_string(), MetadataValue::from("a thread about rust"));
        SearchResults::new(
            "rust".to_string(),
            vec![QueryMatch {
                id: "42".to_string(),
                score: 0.875,
                metadata: Some(metadata),
            }],
            12,
        )
    }

    #[test]
    fn test_text_search_results() {
        let out = TextFormatter.format_search_results(&results());
        assert!(out.contains("[Score: 0.875] 42"));
        assert!(out.contains("a thread about rust"));
    }

    #[test]
    fn test_text_empty_results() {
        let empty = SearchResults::new("nothing".to_string(), Vec::new(), 1);
        assert_eq!(
            TextFormatter.format_search_results(&empty),
            "No results found for: nothing\n"
        );
    }

    #[test]
    fn test_json_search_results_parse() {
        let out = JsonFormatter::new(false).format_search_results(&results());
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["results"][0]["id"], "42");
        assert_eq!(value["results"][0]["metadata"]["text"], "a thread about rust");
    }

    #[test]
    fn test_preview_truncates() {
        let long = "z".repeat(PREVIEW_CHARS + 10);
        let p = preview(&long);
        assert!(p.ends_with("..."));
        assert_eq!(p.chars().count(), PREVIEW_CHARS + 3);
    }

    #[test]
    fn test_ingest_stats_dry_run_title() {
        let stats = IngestStats {
            dry_run: true,
            ..Default::default()
        };
        assert!(TextFormatter.format_ingest_stats(&stats).starts_with("Dry Run"));
        assert!(MarkdownFormatter
            .format_ingest_stats(&stats)
            .starts_with("## Dry Run"));
    }

    #[test]
    fn test_status_without_index() {
        let status = StatusInfo {
            embedding_model: "m".to_string(),
            embedding_url: "u".to_string(),
            vector_store_driver: "local".to_string(),
            vector_store_location: "/tmp/x".to_string(),
            vector_store_connected: true,
            vector_store_points: None,
            collection: "threads".to_string(),
            checkpoint_offset: None,
        };
        assert!(TextFormatter.format_status(&status).contains("(not created)"));
        let json: serde_json::Value =
            serde_json::from_str(&JsonFormatter::new(true).format_status(&status)).unwrap();
        assert!(json["vector_store"]["points"].is_null());
    }
}

//! Command output
//!
//! Every command prints through [`Output`] so `--json` and `--quiet` behave
//! the same everywhere. Quiet mode prints bare ids, one per line.

use anyhow::Result;
use chrono::{Local, TimeZone};

use klept_core::{display_domain, Bookmark, Counts};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
    /// Ids and names only
    Quiet,
}

impl OutputFormat {
    /// `--quiet` wins over `--json`
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

pub struct Output {
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Print a single bookmark
    pub fn print_bookmark(&self, bookmark: &Bookmark) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                println!("ID:      {}", bookmark.id);
                println!("Title:   {}", bookmark.title);
                println!("URL:     {}", bookmark.url);
                if !bookmark.tags.is_empty() {
                    println!("Tags:    {}", bookmark.tags.join(", "));
                }
                println!("Pinned:  {}", if bookmark.pinned { "yes" } else { "no" });
                println!("Created: {}", format_timestamp(bookmark.created_at));
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(bookmark)?);
            }
            OutputFormat::Quiet => {
                println!("{}", bookmark.id);
            }
        }
        Ok(())
    }

    /// Print a list of bookmarks in display order
    pub fn print_bookmarks(
        &self,
        bookmarks: &[Bookmark],
        counts: Counts,
        filtered: bool,
    ) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                if bookmarks.is_empty() {
                    if filtered {
                        println!("No bookmarks match.");
                    } else {
                        println!("No bookmarks found.");
                    }
                    return Ok(());
                }
                for bookmark in bookmarks {
                    let pin = if bookmark.pinned { "*" } else { " " };
                    let tags = if bookmark.tags.is_empty() {
                        String::new()
                    } else {
                        format!(" #{}", bookmark.tags.join(" #"))
                    };
                    println!(
                        "{} {} | {} | {}{}",
                        pin,
                        short_id(&bookmark.id),
                        truncate(&bookmark.title, 40),
                        display_domain(&bookmark.url),
                        tags
                    );
                }
                println!("\n{}", summary_line(counts, filtered));
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(bookmarks)?);
            }
            OutputFormat::Quiet => {
                for bookmark in bookmarks {
                    println!("{}", bookmark.id);
                }
            }
        }
        Ok(())
    }

    /// Print a list of tags
    pub fn print_tags(&self, tags: &[(String, usize)]) {
        match self.format {
            OutputFormat::Human => {
                if tags.is_empty() {
                    println!("No tags yet.");
                    return;
                }
                let width = tags.iter().map(|(name, _)| name.chars().count()).max().unwrap_or(0);
                for (name, count) in tags {
                    println!("#{:<width$}  {}", name, count, width = width);
                }
            }
            OutputFormat::Json => {
                let entries = tags
                    .iter()
                    .map(|(tag, count)| serde_json::json!({ "tag": tag, "bookmarks": count }))
                    .collect();
                println!("{:#}", serde_json::Value::Array(entries));
            }
            OutputFormat::Quiet => {
                for (name, _) in tags {
                    println!("{}", name);
                }
            }
        }
    }

    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print a warning to stderr (suppressed in quiet mode)
    pub fn warning(&self, message: &str) {
        if !self.is_quiet() {
            eprintln!("⚠ {}", message);
        }
    }

    /// Prompts only make sense for human output
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// Footer under a human-readable list
fn summary_line(counts: Counts, filtered: bool) -> String {
    if filtered {
        format!("{} of {} bookmark(s)", counts.visible, counts.total)
    } else {
        format!("{} bookmark(s)", counts.total)
    }
}

/// First eight characters of an id
pub fn short_id(id: &str) -> &str {
    id.char_indices().nth(8).map_or(id, |(i, _)| &id[..i])
}

/// Hide all but the last four characters of a secret
pub fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        return "(not set)".to_string();
    }
    let count = secret.chars().count();
    if count <= 4 {
        return "****".to_string();
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("****{}", tail)
}

/// Local date and time of an epoch-millisecond timestamp
fn format_timestamp(millis: i64) -> String {
    Local
        .timestamp_millis_opt(millis)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| millis.to_string())
}

/// Cut to `max_len` characters, ending in "..." when shortened
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

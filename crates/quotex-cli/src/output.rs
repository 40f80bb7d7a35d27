//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use serde::Serialize;

use quotex_core::corpus::Chapter;
use quotex_core::{Category, ImportReport, NodePath, Promise, Quote, Subtitle, Title};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
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

/// Output helper for consistent formatting
#[derive(Debug, Clone, Copy)]
pub struct Output {
    /// The output format
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

    pub fn print_categories(&self, categories: &[Category]) {
        self.print_nodes("category", categories, |c| (c.id.0, c.name.as_str()));
    }

    pub fn print_titles(&self, titles: &[Title]) {
        self.print_nodes("title", titles, |t| (t.id.0, t.name.as_str()));
    }

    pub fn print_subtitles(&self, subtitles: &[Subtitle]) {
        self.print_nodes("subtitle", subtitles, |s| (s.id.0, s.name.as_str()));
    }

    fn print_nodes<T: Serialize>(&self, kind: &str, nodes: &[T], id_name: impl Fn(&T) -> (i64, &str)) {
        match self.format {
            OutputFormat::Human => {
                if nodes.is_empty() {
                    println!("No {} found.", plural(kind));
                    return;
                }
                for node in nodes {
                    let (id, name) = id_name(node);
                    println!("{:>4}  {}", id, name);
                }
                println!("\n{} {}(s)", nodes.len(), kind);
            }
            OutputFormat::Json => print_json(nodes),
            OutputFormat::Quiet => {
                for node in nodes {
                    println!("{}", id_name(node).1);
                }
            }
        }
    }

    /// Print a single promise, with its place in the tree when known
    pub fn print_promise(&self, promise: &Promise, path: Option<&NodePath>) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:        {}", promise.id);
                if let Some(path) = path {
                    println!("Filed:     {}", path);
                }
                if !promise.title.is_empty() {
                    println!("Title:     {}", promise.title);
                }
                if !promise.reference.is_empty() {
                    println!("Reference: {}", promise.reference);
                }
                println!("Created:   {}", promise.created_at.format("%Y-%m-%d %H:%M"));
                println!("Updated:   {}", promise.updated_at.format("%Y-%m-%d %H:%M"));
                println!();
                println!("{}", promise.verse);
            }
            OutputFormat::Json => print_json(&serde_json::json!({
                "promise": promise,
                "path": path,
            })),
            OutputFormat::Quiet => println!("{}", promise.id),
        }
    }

    /// Print a list of promises
    pub fn print_promises(&self, promises: &[Promise]) {
        match self.format {
            OutputFormat::Human => {
                if promises.is_empty() {
                    println!("No promises found.");
                    return;
                }
                for promise in promises {
                    println!("{}", promise_line(promise));
                }
                println!("\n{} promise(s)", promises.len());
            }
            OutputFormat::Json => print_json(promises),
            OutputFormat::Quiet => {
                for promise in promises {
                    println!("{}", promise.id);
                }
            }
        }
    }

    /// Print search hits grouped under their path
    pub fn print_search_results(&self, hits: &[(Promise, NodePath)]) {
        match self.format {
            OutputFormat::Human => {
                if hits.is_empty() {
                    println!("No promises found.");
                    return;
                }
                let mut last_path: Option<&NodePath> = None;
                for (promise, path) in hits {
                    if last_path != Some(path) {
                        println!("── {} ──", path);
                        last_path = Some(path);
                    }
                    println!("{}", promise_line(promise));
                }
                println!("\n{} promise(s)", hits.len());
            }
            OutputFormat::Json => {
                let hits: Vec<_> = hits
                    .iter()
                    .map(|(promise, path)| serde_json::json!({"promise": promise, "path": path}))
                    .collect();
                print_json(&hits);
            }
            OutputFormat::Quiet => {
                for (promise, _) in hits {
                    println!("{}", promise.id);
                }
            }
        }
    }

    pub fn print_quote(&self, quote: &Quote) {
        match self.format {
            OutputFormat::Human => {
                println!("{}", quote.text);
                println!("    {}", quote.reference());
            }
            OutputFormat::Json => print_json(&serde_json::json!({
                "chapter": quote.chapter,
                "verse": quote.verse,
                "text": quote.text,
                "reference": quote.reference(),
            })),
            OutputFormat::Quiet => println!("{}", quote.text),
        }
    }

    pub fn print_chapter(&self, chapter: &Chapter) {
        match self.format {
            OutputFormat::Human => {
                println!("Proverbs {}", chapter.chapter);
                println!();
                for verse in &chapter.verses {
                    println!("{:>3}  {}", verse.number, verse.text);
                }
            }
            OutputFormat::Json => print_json(chapter),
            OutputFormat::Quiet => {
                for verse in &chapter.verses {
                    println!("{}", verse.text);
                }
            }
        }
    }

    pub fn print_import_report(&self, report: &ImportReport) {
        match self.format {
            OutputFormat::Json => print_json(report),
            _ => self.success(&format!(
                "Imported {} promise(s), {} new node(s), {} row(s) skipped, {} already present",
                report.promises, report.nodes_created, report.skipped, report.duplicates
            )),
        }
    }

    /// Print a success message
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

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
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

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize output: {}", e),
    }
}

fn promise_line(promise: &Promise) -> String {
    let label = if promise.title.is_empty() {
        truncate_line(&promise.verse, 50)
    } else {
        format!("{} - {}", truncate(&promise.title, 20), truncate_line(&promise.verse, 30))
    };
    if promise.reference.is_empty() {
        format!("{:>4} | {}", promise.id, label)
    } else {
        format!("{:>4} | {} | {}", promise.id, label, truncate(&promise.reference, 20))
    }
}

fn plural(kind: &str) -> String {
    match kind {
        "category" => "categories".to_string(),
        other => format!("{}s", other),
    }
}

/// Truncate a string to max length in characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Truncate to first line and max length
fn truncate_line(s: &str, max_len: usize) -> String {
    let first_line = s.lines().next().unwrap_or("");
    truncate(first_line, max_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
        // Multi-byte characters are never split
        assert_eq!(truncate("¦¦¦¦¦¦¦¦", 5), "¦¦...");
    }

    #[test]
    fn test_truncate_line() {
        assert_eq!(truncate_line("single line", 20), "single line");
        assert_eq!(truncate_line("line one\nline two", 20), "line one");
        assert_eq!(
            truncate_line("very long single line here", 10),
            "very lo..."
        );
    }

    #[test]
    fn test_plural() {
        assert_eq!(plural("category"), "categories");
        assert_eq!(plural("subtitle"), "subtitles");
    }
}

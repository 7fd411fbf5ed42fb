//! Output formatters for search reports and ingestion summaries

use crate::config::OutputFormat;
use crate::error::Result;
use crate::pipeline::{IngestSummary, SearchReport};
use colored::{Color, Colorize};
use std::path::Path;

/// Trait for rendering pipeline results
pub trait OutputFormatter {
    fn format_search(&self, report: &SearchReport) -> Result<String>;
    fn format_ingest(&self, summary: &IngestSummary) -> Result<String>;
    fn supports_format(&self) -> OutputFormat;
}

/// Console formatter with optional colors
pub struct ConsoleFormatter {
    use_colors: bool,
    detailed: bool,
}

/// JSON formatter for piping into other tools
pub struct JsonFormatter {
    pretty: bool,
}

/// Picks a formatter for the requested format
pub struct ReportGenerator {
    console_formatter: ConsoleFormatter,
    json_formatter: JsonFormatter,
}

impl ConsoleFormatter {
    pub fn new(use_colors: bool, detailed: bool) -> Self {
        Self { use_colors, detailed }
    }

    fn colorize(&self, text: &str, color: Color) -> String {
        if self.use_colors {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn format_header(&self, title: &str, level: u8) -> String {
        let prefix = match level {
            1 => "█",
            2 => "▓",
            _ => "░",
        };

        let color = match level {
            1 => Color::Blue,
            2 => Color::Green,
            _ => Color::White,
        };

        if self.use_colors {
            format!("\n{} {}\n", prefix.color(color).bold(), title.color(color).bold())
        } else {
            format!("\n{} {}\n", prefix, title)
        }
    }

    fn score_color(score: f64) -> Color {
        if score >= 0.8 {
            Color::Green
        } else if score >= 0.6 {
            Color::Yellow
        } else {
            Color::Red
        }
    }

    fn or_dash(value: Option<&str>) -> &str {
        match value {
            Some(v) if !v.trim().is_empty() => v,
            _ => "-",
        }
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format_search(&self, report: &SearchReport) -> Result<String> {
        let mut output = String::new();

        output.push_str(&self.format_header("SIMILAR DOCUMENTS", 1));

        if self.detailed {
            output.push_str(&self.format_header("Query", 2));
            output.push_str(&format!(
                "Title: {}\n",
                Self::or_dash(report.query.title.as_deref())
            ));
            output.push_str(&format!(
                "Location: {}\n",
                Self::or_dash(report.query.location.as_deref())
            ));
            if let Some(skills) = &report.query.skillset {
                if !skills.is_empty() {
                    output.push_str(&format!("Skillset: {}\n", skills.join(", ")));
                }
            }
            output.push_str(&format!("Tokens: {}\n", report.query_tokens));
        }

        output.push_str(&format!(
            "{} of {} candidates scored above {}\n",
            report.results.len(),
            report.candidates,
            report.threshold
        ));

        if report.results.is_empty() {
            output.push_str(&self.colorize("No matches above the threshold.\n", Color::Yellow));
            return Ok(output);
        }

        output.push_str(&self.format_header("Results", 2));
        for result in &report.results {
            let score = format!("{:.4}", result.score);
            output.push_str(&format!(
                "{:>3}. [{}] {} {}\n",
                result.rank,
                self.colorize(&score, Self::score_color(result.score)),
                self.colorize(&result.identifier, Color::Cyan),
                Self::or_dash(result.title.as_deref())
            ));
            if let Some(link) = &result.link {
                output.push_str(&format!("       {}\n", link));
            }
        }

        Ok(output)
    }

    fn format_ingest(&self, summary: &IngestSummary) -> Result<String> {
        let mut output = String::new();

        output.push_str(&self.format_header("INGESTION SUMMARY", 1));
        output.push_str(&format!(
            "{} inserted, {} replaced, {} failed\n",
            self.colorize(&summary.inserted.to_string(), Color::Green),
            self.colorize(&summary.replaced.to_string(), Color::Cyan),
            self.colorize(&summary.failures.len().to_string(), Color::Red)
        ));

        if summary.has_failures() {
            output.push_str(&self.format_header("Failures", 2));
            for failure in &summary.failures {
                output.push_str(&format!(
                    "  • {}: {}\n",
                    failure.source,
                    self.colorize(&failure.error, Color::Red)
                ));
            }
        }

        Ok(output)
    }

    fn supports_format(&self) -> OutputFormat {
        OutputFormat::Console
    }
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn render<T: serde::Serialize>(&self, value: &T) -> Result<String> {
        if self.pretty {
            Ok(serde_json::to_string_pretty(value)?)
        } else {
            Ok(serde_json::to_string(value)?)
        }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_search(&self, report: &SearchReport) -> Result<String> {
        self.render(report)
    }

    fn format_ingest(&self, summary: &IngestSummary) -> Result<String> {
        self.render(summary)
    }

    fn supports_format(&self) -> OutputFormat {
        OutputFormat::Json
    }
}

impl ReportGenerator {
    pub fn new() -> Self {
        Self {
            console_formatter: ConsoleFormatter::new(true, false),
            json_formatter: JsonFormatter::new(true),
        }
    }

    pub fn with_options(use_colors: bool, detailed: bool, pretty_json: bool) -> Self {
        Self {
            console_formatter: ConsoleFormatter::new(use_colors, detailed),
            json_formatter: JsonFormatter::new(pretty_json),
        }
    }

    fn formatter(&self, format: &OutputFormat) -> &dyn OutputFormatter {
        match format {
            OutputFormat::Console => &self.console_formatter,
            OutputFormat::Json => &self.json_formatter,
        }
    }

    pub fn search_report(&self, report: &SearchReport, format: &OutputFormat) -> Result<String> {
        self.formatter(format).format_search(report)
    }

    pub fn ingest_summary(&self, summary: &IngestSummary, format: &OutputFormat) -> Result<String> {
        self.formatter(format).format_ingest(summary)
    }
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self::new()
    }
}

pub fn save_report_to_file(content: &str, file_path: &Path) -> Result<()> {
    use std::fs;
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(file_path, content)?;
    Ok(())
}

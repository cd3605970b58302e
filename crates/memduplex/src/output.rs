use std::io::IsTerminal;
use std::time::Duration;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// A command result that can be rendered in every output format.
pub trait Report: Serialize {
    /// Short name shown as the table title and pretty prefix.
    fn title(&self) -> &'static str;

    /// Key/value rows for table and pretty output.
    fn rows(&self) -> Vec<(&'static str, String)>;
}

pub fn print_report<R: Report>(report: &R, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(report).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec![report.title().to_uppercase(), String::new()]);
            for (key, value) in report.rows() {
                table.add_row(vec![key.to_string(), value]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let fields: Vec<String> = report
                .rows()
                .into_iter()
                .map(|(key, value)| format!("{key}={value}"))
                .collect();
            println!("{}: {}", report.title(), fields.join(" "));
        }
    }
}

/// Bytes per second, or 0 when no time elapsed.
pub fn throughput(bytes: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        bytes as f64 / secs
    } else {
        0.0
    }
}

pub fn human_bytes(bytes: f64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

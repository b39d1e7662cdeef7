//! Terminal rendering helpers

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable tables (default)
    #[default]
    Table,
    /// Raw API payload, pretty-printed
    Json,
}

impl OutputFormat {
    /// Print `value` as JSON, or hand it to `table` for the human layout
    pub fn render<T: Serialize>(self, value: &T, table: impl FnOnce(&T)) -> anyhow::Result<()> {
        match self {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
            OutputFormat::Table => table(value),
        }
        Ok(())
    }
}

pub fn print_heading(title: &str, width: usize) {
    println!("{}", title.bold());
    println!("{}", "=".repeat(width));
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Binary units, two decimals above one KiB
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Ki", "Mi", "Gi", "Ti"];

    if bytes < 1024 {
        return format!("{}B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2}{}", value, UNITS[unit])
}

pub fn format_percent(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}

/// Seconds as `3d 4h 5m`, dropping leading zero units
pub fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;

    match (days, hours) {
        (0, 0) => format!("{}m", minutes),
        (0, _) => format!("{}h {}m", hours, minutes),
        _ => format!("{}d {}h {}m", days, hours, minutes),
    }
}

/// RFC 3339 timestamps as local-free `YYYY-MM-DD HH:MM:SS`; anything else passes through
pub fn format_timestamp(ts: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(ts)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|_| ts.to_string())
}

/// Colour a health, state or severity word
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "healthy" | "ok" => status.green().to_string(),
        "warning" | "degraded" | "unknown" => status.yellow().to_string(),
        "critical" | "unhealthy" => status.red().to_string(),
        _ => status.to_string(),
    }
}

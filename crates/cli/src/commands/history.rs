//! Alert history and dashboard self-health commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, DashboardHealth, HistoryResponse};
use crate::output::{
    color_status, format_timestamp, print_heading, print_success, print_warning, OutputFormat,
};

/// Row for history table
#[derive(Tabled)]
struct CheckRow {
    #[tabled(rename = "Timestamp")]
    timestamp: String,
    #[tabled(rename = "Health")]
    health: String,
    #[tabled(rename = "Alerts")]
    alerts: String,
}

/// Show recent checks, newest last
pub async fn show_history(client: &ApiClient, limit: usize, format: OutputFormat) -> Result<()> {
    let history = client.history(limit).await?;
    format.render(&history, print_history)
}

/// Show the dashboard's own health
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health = client.health().await?;
    format.render(&health, print_health)
}

fn print_history(history: &HistoryResponse) {
    let summary = &history.summary;
    print_heading("Alert History", 60);
    println!("Since:         {}", format_timestamp(&summary.start_time));
    println!("Total checks:  {}", summary.total_checks);
    println!("Total alerts:  {}", summary.total_alerts);
    if let Some(last) = &summary.last_status {
        println!("Last status:   {}", color_status(last));
    }
    println!();

    if history.checks.is_empty() {
        print_warning("No checks recorded yet");
        return;
    }

    let rows: Vec<CheckRow> = history
        .checks
        .iter()
        .map(|check| CheckRow {
            timestamp: format_timestamp(&check.timestamp),
            health: color_status(&check.overall_health),
            alerts: check
                .alerts
                .iter()
                .map(|a| a.message.as_str())
                .collect::<Vec<_>>()
                .join("; "),
        })
        .collect();

    let table = tabled::Table::new(rows)
        .with(tabled::settings::Style::rounded())
        .to_string();
    println!("{}", table);
    println!(
        "\nShowing {} of {} retained checks",
        history.checks.len(),
        summary.retained
    );
}

fn print_health(health: &DashboardHealth) {
    if health.status == "ok" {
        print_success(&format!(
            "{} v{} is healthy on port {}",
            health.service, health.version, health.port
        ));
    } else {
        print_warning(&format!(
            "{} v{} is {}",
            health.service, health.version, health.status
        ));
    }

    for (name, component) in &health.components {
        let mut detail = component.message.clone().unwrap_or_default();
        if component.consecutive_failures > 1 {
            detail = format!("{} ({} failures in a row)", detail, component.consecutive_failures);
        }
        println!(
            "  {:<16} {} {}",
            name,
            color_status(&component.status),
            detail.dimmed()
        );
    }
}

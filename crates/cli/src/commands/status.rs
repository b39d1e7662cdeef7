//! Snapshot, system and single-service commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, ServiceStatus, Snapshot, SystemMetrics};
use crate::output::{
    color_status, format_bytes, format_percent, format_timestamp, format_uptime, print_heading,
    print_success, print_warning, OutputFormat,
};

/// Row for services table
#[derive(Tabled)]
struct ServiceRow {
    #[tabled(rename = "Service")]
    name: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Latency")]
    latency: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

impl From<&ServiceStatus> for ServiceRow {
    fn from(service: &ServiceStatus) -> Self {
        let name = if service.system {
            format!("{} (system)", service.name)
        } else {
            service.name.clone()
        };
        Self {
            name,
            state: color_status(&service.state),
            latency: format!("{}ms", service.response_time_ms),
            detail: service.error.clone().unwrap_or_default(),
        }
    }
}

/// Show the full snapshot from a fresh poll
pub async fn show_status(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let snapshot = client.status().await?;
    format.render(&snapshot, print_snapshot)
}

/// Show host metrics only
pub async fn show_system(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let system = client.system().await?;
    format.render(&system, |system| {
        print_heading("System", 50);
        print_system(system);
    })
}

/// Probe one named service
pub async fn show_service(client: &ApiClient, name: &str, format: OutputFormat) -> Result<()> {
    let service = client.service(name).await?;
    format.render(&service, |service| {
        print_heading(&format!("Service {}", service.name), 50);
        println!("URL:       {}", service.url.cyan());
        println!("State:     {}", color_status(&service.state));
        println!("Latency:   {}ms", service.response_time_ms);
        println!("Observed:  {}", format_timestamp(&service.observed_at));
        if let Some(error) = &service.error {
            println!("Error:     {}", error.red());
        }
    })
}

fn print_snapshot(snapshot: &Snapshot) {
    print_heading(&format!("Status of {}", snapshot.system.hostname), 60);
    println!("Overall:  {}", color_status(&snapshot.overall_health).bold());
    println!("Taken:    {}", format_timestamp(&snapshot.timestamp).dimmed());
    println!();

    if snapshot.alerts.is_empty() {
        print_success("No active alerts");
    } else {
        println!("{}", "Alerts".bold());
        for alert in &snapshot.alerts {
            println!(
                "  [{}] {}",
                color_status(&alert.severity.to_uppercase()),
                alert.message
            );
        }
    }
    println!();

    print_services(&snapshot.services);
    println!();
    print_system(&snapshot.system);

    if !snapshot.display.is_empty() {
        println!();
        println!("{}", "Info".bold());
        for (key, value) in &snapshot.display {
            println!("  {:<16} {}", key, value);
        }
    }
}

fn print_services(services: &[ServiceStatus]) {
    println!("{}", "Services".bold());
    if services.is_empty() {
        print_warning("No services configured");
        return;
    }

    let rows: Vec<ServiceRow> = services.iter().map(ServiceRow::from).collect();
    let table = tabled::Table::new(rows)
        .with(tabled::settings::Style::rounded())
        .to_string();
    println!("{}", table);
}

fn print_system(system: &SystemMetrics) {
    if !system.available {
        print_warning("System metrics unavailable");
        return;
    }

    println!("Host:        {}", system.hostname.cyan());
    println!("Platform:    {}", system.platform);
    println!("Uptime:      {}", format_uptime(system.uptime_seconds));
    println!("CPU load:    {:.2} ({} cores)", system.cpu_load, system.cpu_count);
    println!(
        "Memory:      {} / {} ({})",
        format_bytes(system.memory_used_bytes),
        format_bytes(system.memory_total_bytes),
        format_percent(system.memory_used_ratio())
    );
    println!(
        "Disk:        {} / {} ({})",
        format_bytes(system.disk_used_bytes),
        format_bytes(system.disk_total_bytes),
        format_percent(system.disk_used_ratio())
    );
    println!("Processes:   {}", system.process_count);
}

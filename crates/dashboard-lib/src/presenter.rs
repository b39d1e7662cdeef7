//! HTML rendering of a snapshot
//!
//! The page trusts the snapshot's precomputed health and alerts; nothing is
//! reclassified here.

use crate::history::HistorySummary;
use crate::models::{OverallHealth, ServiceState, Snapshot};
use std::fmt::Write;

/// Default client-side refresh interval in seconds
pub const DEFAULT_REFRESH_SECS: u64 = 30;

const STYLE: &str = r#"
body { font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", sans-serif; margin: 0; background: #0f172a; color: #e2e8f0; }
header { padding: 24px 32px; border-bottom: 1px solid #1e293b; display: flex; justify-content: space-between; align-items: center; }
h1 { margin: 0; font-size: 22px; }
main { padding: 24px 32px; display: grid; gap: 24px; grid-template-columns: repeat(auto-fit, minmax(320px, 1fr)); }
section { background: #111827; border: 1px solid #1f2937; border-radius: 8px; padding: 16px 20px; }
h2 { margin-top: 0; font-size: 16px; color: #94a3b8; text-transform: uppercase; letter-spacing: 0.05em; }
table { width: 100%; border-collapse: collapse; }
td, th { text-align: left; padding: 6px 4px; border-bottom: 1px solid #1f2937; font-size: 14px; }
.badge { padding: 4px 10px; border-radius: 999px; font-weight: 600; font-size: 13px; text-transform: uppercase; }
.healthy { background: #14532d; color: #bbf7d0; }
.warning { background: #713f12; color: #fde68a; }
.critical { background: #7f1d1d; color: #fecaca; }
.unknown { background: #334155; color: #cbd5e1; }
ul.alerts { list-style: none; padding: 0; margin: 0; }
ul.alerts li { padding: 6px 0; border-bottom: 1px solid #1f2937; }
footer { padding: 12px 32px; color: #64748b; font-size: 12px; }
"#;

/// Refresh script, updating the page in place from `/api/status`
const SCRIPT: &str = include_str!("dashboard.js");

/// Render the full dashboard page
pub fn render_dashboard(snapshot: &Snapshot, summary: &HistorySummary, refresh_secs: u64) -> String {
    let mut html = String::with_capacity(8 * 1024);
    let health = health_class(snapshot.overall_health);

    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>Status: {health}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n\
         <header><h1>{host} status</h1><span id=\"overall\" class=\"badge {health}\">{health}</span></header>\n<main>\n",
        host = escape(&snapshot.system.hostname),
    );

    render_alerts(&mut html, snapshot);
    render_system(&mut html, snapshot);
    render_services(&mut html, snapshot);
    if !snapshot.display.is_empty() {
        render_display(&mut html, snapshot);
    }
    render_history(&mut html, summary);

    let _ = write!(
        html,
        "</main>\n<footer>Snapshot taken <span id=\"taken\">{ts}</span>. \
         Refreshing every {refresh_secs}s.</footer>\n\
         <script>const REFRESH_MS = {interval_ms};</script>\n<script>\n{SCRIPT}</script>\n\
         </body>\n</html>\n",
        ts = snapshot.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
        interval_ms = refresh_secs.max(1) * 1000,
    );

    html
}

fn render_alerts(html: &mut String, snapshot: &Snapshot) {
    html.push_str("<section><h2>Alerts</h2><div id=\"alerts\">");
    if snapshot.alerts.is_empty() {
        html.push_str("<p>No active alerts.</p>");
    } else {
        html.push_str("<ul class=\"alerts\">");
        for alert in &snapshot.alerts {
            let _ = write!(
                html,
                "<li><span class=\"badge {sev}\">{sev}</span> {msg}</li>",
                sev = alert.severity,
                msg = escape(&alert.message)
            );
        }
        html.push_str("</ul>");
    }
    html.push_str("</div></section>\n");
}

fn render_system(html: &mut String, snapshot: &Snapshot) {
    let system = &snapshot.system;
    let _ = write!(
        html,
        "<section><h2>System</h2>\
         <p id=\"sys-unavailable\" class=\"badge critical\"{hidden}>metrics unavailable</p>\
         <table>\
         <tr><th>Platform</th><td id=\"sys-platform\">{platform}</td></tr>\
         <tr><th>CPU load (1m)</th><td id=\"sys-load\">{load:.2} on {cpus} CPUs</td></tr>\
         <tr><th>Memory</th><td id=\"sys-memory\">{mem_used} / {mem_total} ({mem_pct:.1}%)</td></tr>\
         <tr><th>Disk</th><td id=\"sys-disk\">{disk_used} / {disk_total} ({disk_pct:.1}%)</td></tr>\
         <tr><th>Processes</th><td id=\"sys-processes\">{procs}</td></tr>\
         <tr><th>Uptime</th><td id=\"sys-uptime\">{uptime}</td></tr>\
         </table></section>\n",
        hidden = if system.available { " hidden" } else { "" },
        platform = escape(&system.platform),
        load = system.cpu_load,
        cpus = system.cpu_count,
        mem_used = format_bytes(system.memory_used_bytes),
        mem_total = format_bytes(system.memory_total_bytes),
        mem_pct = system.memory_used_ratio() * 100.0,
        disk_used = format_bytes(system.disk_used_bytes),
        disk_total = format_bytes(system.disk_total_bytes),
        disk_pct = system.disk_used_ratio() * 100.0,
        procs = system.process_count,
        uptime = format_uptime(system.uptime_seconds),
    );
}

fn render_services(html: &mut String, snapshot: &Snapshot) {
    html.push_str("<section><h2>Services</h2>");
    if snapshot.services.is_empty() {
        html.push_str("<p>No services configured.</p></section>\n");
        return;
    }
    html.push_str(
        "<table><thead><tr><th>Name</th><th>State</th><th>Latency</th><th>Detail</th></tr></thead>\
         <tbody id=\"services\">",
    );
    for service in &snapshot.services {
        let state = match service.state {
            ServiceState::Healthy => "healthy",
            ServiceState::Critical => "critical",
            ServiceState::Unknown => "unknown",
        };
        let _ = write!(
            html,
            "<tr><td title=\"{url}\">{name}</td><td><span class=\"badge {state}\">{state}</span></td>\
             <td>{ms} ms</td><td>{detail}</td></tr>",
            url = escape(&service.url),
            name = escape(&service.name),
            ms = service.response_time_ms,
            detail = escape(service.error.as_deref().unwrap_or("")),
        );
    }
    html.push_str("</tbody></table></section>\n");
}

fn render_display(html: &mut String, snapshot: &Snapshot) {
    html.push_str("<section><h2>Info</h2><table>");
    for (key, value) in &snapshot.display {
        let _ = write!(
            html,
            "<tr><th>{}</th><td>{}</td></tr>",
            escape(key),
            escape(value)
        );
    }
    html.push_str("</table></section>\n");
}

fn render_history(html: &mut String, summary: &HistorySummary) {
    let _ = write!(
        html,
        "<section><h2>History</h2><table>\
         <tr><th>Checks</th><td id=\"history-checks\">{checks}</td></tr>\
         <tr><th>Alerts raised</th><td id=\"history-alerts\">{alerts}</td></tr>\
         <tr><th>Retained</th><td id=\"history-retained\">{retained}</td></tr>\
         <tr><th>Since</th><td>{since}</td></tr>\
         </table></section>\n",
        checks = summary.total_checks,
        alerts = summary.total_alerts,
        retained = summary.retained,
        since = summary.start_time.format("%Y-%m-%d %H:%M UTC"),
    );
}

fn health_class(health: OverallHealth) -> &'static str {
    match health {
        OverallHealth::Healthy => "healthy",
        OverallHealth::Warning => "warning",
        OverallHealth::Critical => "critical",
    }
}

/// Escape text for HTML element and attribute content
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GiB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MiB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KiB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;
    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

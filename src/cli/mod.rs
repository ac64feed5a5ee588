//! CLI command implementations for clusterboard.
//!
//! Provides subcommand handlers for:
//! - `clusterboard clusters` — filtered, sorted, paged cluster table
//! - `clusterboard stats` / `gaps` / `timeline` / `suggestions` — derived views
//! - `clusterboard leaderboard` / `deflection` — backend-computed views
//! - `clusterboard whoami` / `trigger` — session and pipeline control
//! - `clusterboard health` — config, backend reachability, fetch log
//! - `clusterboard config show|init|set|reset` — configuration management

pub mod views;

use anyhow::Result;
use colored::Colorize;

use crate::analytics::logger::FetchLog;
use crate::analytics::reporter::{self, HealthReport};
use crate::backend::{self, BackendClient};
use crate::config::{self, DashboardConfig};
use crate::dashboard::Dashboard;
use crate::model::{Coverage, Sentiment};
use crate::store::LoadOutcome;

pub use views::{
    run_clusters, run_deflection, run_gaps, run_leaderboard, run_stats, run_suggestions,
    run_timeline,
};

/// Output format for every data command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl OutputFormat {
    pub fn from_str_opt(s: Option<&str>) -> Self {
        match s {
            Some("json") => Self::Json,
            Some("csv") => Self::Csv,
            _ => Self::Table,
        }
    }
}

// ---------------------------------------------------------------------------
// Shared setup
// ---------------------------------------------------------------------------

/// Resolve config and build a backend client from it.
pub fn connect() -> Result<(DashboardConfig, BackendClient)> {
    let cfg = config::load();
    let client = BackendClient::from_config(&cfg.backend, FetchLog::from_config(&cfg.logging))?;
    Ok((cfg, client))
}

/// Fetch a snapshot into a fresh dashboard configured from `cfg`.
///
/// A failed fetch is fatal here: a one-shot command has no previous
/// snapshot to fall back on.
pub fn load_dashboard(
    cfg: &DashboardConfig,
    client: &BackendClient,
    include_messages: bool,
) -> Result<Dashboard> {
    let mut dash = Dashboard::new(cfg.dashboard.items_per_page, cfg.dashboard.sort_state());
    let snapshot = client.fetch_snapshot(include_messages)?;
    if let LoadOutcome::Applied {
        duplicates_dropped,
        records_skipped,
        ..
    } = dash.load(snapshot)
    {
        if duplicates_dropped > 0 {
            eprintln!(
                "{} dropped {} cluster(s) with duplicate ids",
                "warning:".yellow().bold(),
                duplicates_dropped
            );
        }
        if records_skipped > 0 {
            eprintln!(
                "{} skipped {} backend record(s) that could not be decoded",
                "warning:".yellow().bold(),
                records_skipped
            );
        }
    }
    Ok(dash)
}

// ---------------------------------------------------------------------------
// clusterboard whoami / trigger
// ---------------------------------------------------------------------------

/// Show the authenticated user and whether they are an admin.
pub fn run_whoami() -> Result<()> {
    let (_, client) = connect()?;
    let session = client.session()?;

    println!("  {} {}", "User: ".bold(), session.username);
    println!(
        "  {} {}",
        "Admin:".bold(),
        if session.capabilities.is_admin {
            "yes".green()
        } else {
            "no".normal()
        }
    );
    Ok(())
}

/// Ask the backend to rerun the clustering pipeline (admin only).
pub fn run_trigger() -> Result<()> {
    let (_, client) = connect()?;
    let session = client.session()?;
    let status = client.trigger_pipeline(session.capabilities)?;

    println!("{} Pipeline triggered", "✓".green().bold());
    if !status.status.is_empty() {
        println!("  {}", status.status.dimmed());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// clusterboard health
// ---------------------------------------------------------------------------

/// Check config files, backend reachability and recent fetch health.
pub fn run_health() -> Result<()> {
    println!("{}", "clusterboard Health Check".bold().cyan());
    println!("{}", "=".repeat(40));

    // 1. Config file status
    let global_exists = config::global_config_file().is_some_and(|p| p.exists());
    let project_exists = config::project_config_file().is_some_and(|p| p.exists());
    let cfg = config::load();
    print_health_item(
        "Global config",
        global_exists,
        if global_exists {
            "~/.clusterboard/config.toml found"
        } else {
            "not found (run `clusterboard config init` to create)"
        },
    );
    print_health_item(
        "Project config",
        project_exists,
        if project_exists {
            ".clusterboard.toml found"
        } else {
            "none (optional)"
        },
    );

    // 2. Backend reachability and session
    let log = FetchLog::from_config(&cfg.logging);
    match BackendClient::from_config(&cfg.backend, log.clone()) {
        Ok(client) => match client.session() {
            Ok(session) => print_health_item(
                "Backend",
                true,
                &format!(
                    "reachable at {} as {}{}",
                    client.base_url(),
                    session.username,
                    if session.capabilities.is_admin {
                        " (admin)"
                    } else {
                        ""
                    }
                ),
            ),
            Err(err) => match backend::error::login_url(&err) {
                Some(url) => print_health_item(
                    "Backend",
                    false,
                    &format!("reachable, but not logged in (see {url})"),
                ),
                None => print_health_item("Backend", false, &format!("{err:#}")),
            },
        },
        Err(err) => print_health_item("Backend", false, &format!("{err:#}")),
    }

    // 3. Fetch log
    match log.path() {
        None => print_health_item("Fetch log", false, "disabled"),
        Some(path) if !path.exists() => print_health_item("Fetch log", false, "no log file yet"),
        Some(_) => {
            let report = reporter::health_report(&log, Some(7));
            print_fetch_health(&report);
        }
    }

    Ok(())
}

fn print_fetch_health(report: &HealthReport) {
    print_health_item(
        "Fetches (7 days)",
        report.failures == 0,
        &format!(
            "{} calls, {:.1}% ok, avg {:.0}ms",
            format_number(report.total_calls),
            report.success_pct,
            report.avg_latency_ms
        ),
    );

    for endpoint in &report.endpoints {
        println!(
            "      {:<34} {:>5} calls {:>4} failed {:>7.0}ms avg",
            truncate(&endpoint.endpoint, 34),
            endpoint.calls,
            endpoint.failures,
            endpoint.avg_latency_ms,
        );
    }

    if let Some(last) = &report.last_error {
        println!(
            "  {} {} {}: {}",
            "Last error:".dimmed(),
            last.timestamp.dimmed(),
            last.endpoint,
            last.message.red()
        );
    }
}

fn print_health_item(name: &str, ok: bool, detail: &str) {
    let status = if ok {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    println!("  {} {:<25} {}", status, name, detail.dimmed());
}

// ---------------------------------------------------------------------------
// clusterboard config show | init | set | reset
// ---------------------------------------------------------------------------

/// Show the effective (merged) configuration as TOML.
pub fn run_config_show() -> Result<()> {
    let toml_str = config::show_effective_config()?;
    println!("{}", "Effective clusterboard Configuration".bold().cyan());
    println!("{}", "=".repeat(50));
    println!();
    println!("{toml_str}");

    let global_exists = config::global_config_file().is_some_and(|p| p.exists());
    let project_exists = config::project_config_file().is_some_and(|p| p.exists());
    println!("{}", "Sources (highest priority last):".dimmed());
    println!("  {} built-in defaults", "·".dimmed());
    print_source(global_exists, "~/.clusterboard/config.toml");
    print_source(project_exists, ".clusterboard.toml");
    println!(
        "  {} {}",
        "·".dimmed(),
        "CLUSTERBOARD_* environment variables".dimmed()
    );

    Ok(())
}

fn print_source(exists: bool, name: &str) {
    if exists {
        println!("  {} {}", "✓".green(), name.dimmed());
    } else {
        println!("  {} {}", "·".dimmed(), format!("{name} (not found)").dimmed());
    }
}

/// Initialize a default config file at `~/.clusterboard/config.toml`.
pub fn run_config_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!(
        "{} Config written to {}",
        "✓".green().bold(),
        path.display()
    );
    println!(
        "  {}",
        "Set backend.base_url and backend.api_token to get started.".dimmed()
    );
    Ok(())
}

/// Set a single configuration value in the global config file.
pub fn run_config_set(key: &str, value: &str) -> Result<()> {
    config::set_config_value(key, value)?;
    println!("{} Set {} = {}", "✓".green().bold(), key.bold(), value);
    Ok(())
}

/// Reset configuration to defaults.
pub fn run_config_reset() -> Result<()> {
    let path = config::reset_config()?;
    println!(
        "{} Config reset to defaults at {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// Format a number with comma separators for readability.
pub(crate) fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, ch) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    result.chars().rev().collect()
}

/// Truncate a string to `max_len` characters, appending "…" if truncated.
pub(crate) fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

/// Quote a CSV field when it contains a separator, quote or line break.
pub(crate) fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Colorize a sentiment label.
pub(crate) fn colorize_sentiment(sentiment: Sentiment) -> colored::ColoredString {
    match sentiment {
        Sentiment::Positive => sentiment.label().green(),
        Sentiment::Neutral => sentiment.label().normal(),
        Sentiment::Negative => sentiment.label().red(),
    }
}

/// Colorize a coverage label.
pub(crate) fn colorize_coverage(coverage: Coverage) -> colored::ColoredString {
    match coverage {
        Coverage::Fully => coverage.label().green(),
        Coverage::Partially => coverage.label().yellow(),
        Coverage::Not => coverage.label().red(),
        Coverage::Unknown => coverage.label().dimmed(),
    }
}

/// Print a pretty JSON value.
pub(crate) fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

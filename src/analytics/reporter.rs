//! Fetch-log reporter: backend health for `clusterboard health`.
//!
//! Reads the JSONL fetch log and summarizes success rate and latency, overall
//! and per endpoint.

use std::collections::HashMap;

use serde::Serialize;

use crate::analytics::aggregate::pct;
use crate::analytics::logger::{FetchLog, FetchLogEntry};

// ---------------------------------------------------------------------------
// Health report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HealthReport {
    pub total_calls: usize,
    pub failures: usize,
    pub success_pct: f64,
    pub avg_latency_ms: f64,
    pub endpoints: Vec<EndpointStat>,
    pub last_error: Option<LastError>,
}

/// Per-endpoint aggregated statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointStat {
    pub endpoint: String,
    pub calls: usize,
    pub failures: usize,
    pub avg_latency_ms: f64,
    pub max_latency_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LastError {
    pub timestamp: String,
    pub endpoint: String,
    pub message: String,
}

/// Summarize the log, optionally limited to the last `days` days.
pub fn health_report(log: &FetchLog, days: Option<u32>) -> HealthReport {
    build_report(&log.read_since_days(days))
}

fn build_report(entries: &[FetchLogEntry]) -> HealthReport {
    if entries.is_empty() {
        return HealthReport::default();
    }

    let total_calls = entries.len();
    let failures = entries.iter().filter(|e| !e.success).count();

    let last_error = entries
        .iter()
        .rev()
        .find(|e| !e.success)
        .map(|e| LastError {
            timestamp: e.timestamp.clone(),
            endpoint: e.endpoint.clone(),
            message: e.error.clone().unwrap_or_default(),
        });

    HealthReport {
        total_calls,
        failures,
        success_pct: pct(total_calls - failures, total_calls),
        avg_latency_ms: mean_latency(entries.iter()),
        endpoints: endpoint_stats(entries),
        last_error,
    }
}

fn mean_latency<'a>(entries: impl ExactSizeIterator<Item = &'a FetchLogEntry>) -> f64 {
    let count = entries.len();
    if count == 0 {
        return 0.0;
    }
    entries.map(|e| e.latency_ms as f64).sum::<f64>() / count as f64
}

/// Group entries by endpoint, busiest first.
fn endpoint_stats(entries: &[FetchLogEntry]) -> Vec<EndpointStat> {
    let mut groups: HashMap<&str, Vec<&FetchLogEntry>> = HashMap::new();
    for entry in entries {
        groups.entry(entry.endpoint.as_str()).or_default().push(entry);
    }

    let mut stats: Vec<EndpointStat> = groups
        .into_iter()
        .map(|(endpoint, group)| EndpointStat {
            endpoint: endpoint.to_string(),
            calls: group.len(),
            failures: group.iter().filter(|e| !e.success).count(),
            avg_latency_ms: mean_latency(group.iter().copied()),
            max_latency_ms: group.iter().map(|e| e.latency_ms).max().unwrap_or(0),
        })
        .collect();

    stats.sort_by(|a, b| b.calls.cmp(&a.calls).then_with(|| a.endpoint.cmp(&b.endpoint)));
    stats
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(endpoint: &str, success: bool, latency_ms: u64) -> FetchLogEntry {
        FetchLogEntry {
            timestamp: "2025-01-15T10:00:00+00:00".to_string(),
            endpoint: endpoint.to_string(),
            success,
            latency_ms,
            records: None,
            error: (!success).then(|| "timed out".to_string()),
        }
    }

    #[test]
    fn empty_log_reports_zeros() {
        let report = build_report(&[]);
        assert_eq!(report.total_calls, 0);
        assert_eq!(report.success_pct, 0.0);
        assert!(report.last_error.is_none());
    }

    #[test]
    fn report_totals_and_last_error() {
        let entries = vec![
            entry("/api/faq/clusters/", true, 100),
            entry("/api/faq/clusters/", false, 300),
            entry("/api/me/", true, 20),
            entry("/api/faq/clusters/", true, 200),
        ];
        let report = build_report(&entries);

        assert_eq!(report.total_calls, 4);
        assert_eq!(report.failures, 1);
        assert_eq!(report.success_pct, 75.0);
        assert_eq!(report.avg_latency_ms, 155.0);

        let last = report.last_error.unwrap();
        assert_eq!(last.endpoint, "/api/faq/clusters/");
        assert_eq!(last.message, "timed out");
    }

    #[test]
    fn endpoints_sorted_by_calls() {
        let entries = vec![
            entry("/api/me/", true, 20),
            entry("/api/faq/clusters/", true, 100),
            entry("/api/faq/clusters/", true, 300),
        ];
        let report = build_report(&entries);
        assert_eq!(report.endpoints[0].endpoint, "/api/faq/clusters/");
        assert_eq!(report.endpoints[0].calls, 2);
        assert_eq!(report.endpoints[0].avg_latency_ms, 200.0);
        assert_eq!(report.endpoints[0].max_latency_ms, 300);
    }
}

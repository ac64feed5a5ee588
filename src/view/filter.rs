//! Conjunctive cluster filter.
//!
//! Every active predicate must pass. Filtering never reorders: the output is
//! always a subsequence of the input in its original order.

use anyhow::{Result, bail};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::{ClusterRecord, Coverage, RecordDate, Sentiment};

/// User-chosen filter values. `None` / empty / `0` mean "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterState {
    /// `None` is "All".
    pub sentiment: Option<Sentiment>,
    /// Case-insensitive substring matched against each keyword.
    pub keyword: String,
    /// `None` is "All".
    pub coverage: Option<Coverage>,
    /// Minimum resolution score; 0 disables the predicate.
    pub min_resolution_score: u8,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    /// Case-insensitive substring matched against the top message.
    pub search_text: String,
}

impl FilterState {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn has_date_bound(&self) -> bool {
        self.date_from.is_some() || self.date_to.is_some()
    }

    /// Evaluate every predicate against one record.
    pub fn matches(&self, record: &ClusterRecord) -> bool {
        self.matches_sentiment(record)
            && self.matches_keyword(record)
            && self.matches_coverage(record)
            && self.matches_resolution(record)
            && self.matches_date(record)
            && self.matches_search(record)
    }

    fn matches_sentiment(&self, record: &ClusterRecord) -> bool {
        self.sentiment.is_none_or(|s| record.sentiment == s)
    }

    fn matches_coverage(&self, record: &ClusterRecord) -> bool {
        self.coverage.is_none_or(|c| record.coverage == c)
    }

    fn matches_keyword(&self, record: &ClusterRecord) -> bool {
        let needle = self.keyword.trim();
        if needle.is_empty() {
            return true;
        }
        let needle = needle.to_lowercase();
        record
            .keywords
            .iter()
            .any(|k| k.to_lowercase().contains(&needle))
    }

    fn matches_resolution(&self, record: &ClusterRecord) -> bool {
        if self.min_resolution_score == 0 {
            return true;
        }
        record
            .resolution_score
            .is_some_and(|score| score >= self.min_resolution_score)
    }

    fn matches_date(&self, record: &ClusterRecord) -> bool {
        if !self.has_date_bound() {
            return true;
        }
        let RecordDate::Known(day) = record.created_at else {
            return false;
        };
        self.date_from.is_none_or(|from| day >= from) && self.date_to.is_none_or(|to| day <= to)
    }

    fn matches_search(&self, record: &ClusterRecord) -> bool {
        let needle = self.search_text.trim();
        if needle.is_empty() {
            return true;
        }
        record
            .top_message
            .to_lowercase()
            .contains(&needle.to_lowercase())
    }
}

/// Keep the records that pass every active predicate, in input order.
pub fn filter<'a>(clusters: &'a [ClusterRecord], state: &FilterState) -> Vec<&'a ClusterRecord> {
    clusters.iter().filter(|c| state.matches(c)).collect()
}

// ---------------------------------------------------------------------------
// Parsing user input
// ---------------------------------------------------------------------------

/// Parse a sentiment filter value; `""` and `"all"` clear the filter.
pub fn parse_sentiment_filter(raw: &str) -> Result<Option<Sentiment>> {
    if is_all(raw) {
        return Ok(None);
    }
    match Sentiment::parse(raw) {
        Some(s) => Ok(Some(s)),
        None => bail!("unknown sentiment '{raw}' (expected all, positive, neutral or negative)"),
    }
}

/// Parse a coverage filter value; `""` and `"all"` clear the filter.
pub fn parse_coverage_filter(raw: &str) -> Result<Option<Coverage>> {
    if is_all(raw) {
        return Ok(None);
    }
    match Coverage::parse(raw) {
        Some(c) => Ok(Some(c)),
        None => bail!("unknown coverage '{raw}' (expected all, fully, partially, not or unknown)"),
    }
}

/// Parse an optional `YYYY-MM-DD` bound; empty input clears it.
pub fn parse_date_bound(raw: &str) -> Result<Option<NaiveDate>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    match RecordDate::parse(raw) {
        RecordDate::Known(day) => Ok(Some(day)),
        RecordDate::Unknown => bail!("invalid date '{raw}' (expected YYYY-MM-DD)"),
    }
}

fn is_all(raw: &str) -> bool {
    let raw = raw.trim();
    raw.is_empty() || raw.eq_ignore_ascii_case("all")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn sample() -> Vec<ClusterRecord> {
        let mut a = ClusterRecord::new(1);
        a.sentiment = Sentiment::Positive;
        a.coverage = Coverage::Fully;
        a.resolution_score = Some(5);
        a.keywords = vec!["Refund".into(), "card".into()];
        a.top_message = "Where is my REFUND?".into();
        a.created_at = RecordDate::Known(day("2024-01-10"));

        let mut b = ClusterRecord::new(2);
        b.sentiment = Sentiment::Negative;
        b.coverage = Coverage::Not;
        b.resolution_score = Some(2);
        b.keywords = vec!["delivery".into()];
        b.top_message = "Package late".into();
        b.created_at = RecordDate::Known(day("2024-02-01"));

        let mut c = ClusterRecord::new(3);
        c.sentiment = Sentiment::Neutral;
        c.coverage = Coverage::Partially;
        c.top_message = "refund status".into();

        vec![a, b, c]
    }

    fn ids(records: &[&ClusterRecord]) -> Vec<String> {
        records.iter().map(|r| r.cluster_id.to_string()).collect()
    }

    #[test]
    fn empty_state_passes_everything_in_order() {
        let clusters = sample();
        let out = filter(&clusters, &FilterState::default());
        assert_eq!(ids(&out), ["1", "2", "3"]);
    }

    #[test]
    fn keyword_is_case_insensitive_substring() {
        let clusters = sample();
        let state = FilterState {
            keyword: "REF".into(),
            ..Default::default()
        };
        assert_eq!(ids(&filter(&clusters, &state)), ["1"]);
    }

    #[test]
    fn missing_score_fails_a_minimum() {
        let clusters = sample();
        let state = FilterState {
            min_resolution_score: 2,
            ..Default::default()
        };
        assert_eq!(ids(&filter(&clusters, &state)), ["1", "2"]);
    }

    #[test]
    fn unknown_dates_excluded_only_when_bounded() {
        let clusters = sample();
        let state = FilterState {
            date_from: Some(day("2024-01-15")),
            ..Default::default()
        };
        assert_eq!(ids(&filter(&clusters, &state)), ["2"]);

        let state = FilterState {
            date_to: Some(day("2024-01-10")),
            ..Default::default()
        };
        assert_eq!(ids(&filter(&clusters, &state)), ["1"]);
    }

    #[test]
    fn predicates_combine_with_and() {
        let clusters = sample();
        let state = FilterState {
            search_text: "refund".into(),
            sentiment: Some(Sentiment::Neutral),
            ..Default::default()
        };
        assert_eq!(ids(&filter(&clusters, &state)), ["3"]);

        let state = FilterState {
            coverage: Some(Coverage::Not),
            sentiment: Some(Sentiment::Positive),
            ..Default::default()
        };
        assert!(filter(&clusters, &state).is_empty());
    }

    #[test]
    fn parse_helpers() {
        assert_eq!(parse_sentiment_filter("All").unwrap(), None);
        assert_eq!(
            parse_sentiment_filter("negative").unwrap(),
            Some(Sentiment::Negative)
        );
        assert!(parse_sentiment_filter("angry").is_err());
        assert_eq!(parse_coverage_filter("").unwrap(), None);
        assert_eq!(parse_coverage_filter("Not").unwrap(), Some(Coverage::Not));
        assert_eq!(parse_date_bound("2024-03-01").unwrap(), Some(day("2024-03-01")));
        assert!(parse_date_bound("March").is_err());
    }
}

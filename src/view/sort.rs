//! Stable ordering of cluster records by a table column.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::ClusterRecord;

// ---------------------------------------------------------------------------
// Sort key / order
// ---------------------------------------------------------------------------

/// A sortable column of the cluster table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    ClusterId,
    MessageCount,
    TopMessage,
    MatchedFaq,
    Similarity,
    Sentiment,
    Coverage,
    ResolutionScore,
    Summary,
    Keywords,
    TopicLabel,
    CreatedAt,
}

impl SortKey {
    pub const ALL: [SortKey; 12] = [
        Self::ClusterId,
        Self::MessageCount,
        Self::TopMessage,
        Self::MatchedFaq,
        Self::Similarity,
        Self::Sentiment,
        Self::Coverage,
        Self::ResolutionScore,
        Self::Summary,
        Self::Keywords,
        Self::TopicLabel,
        Self::CreatedAt,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ClusterId => "cluster_id",
            Self::MessageCount => "message_count",
            Self::TopMessage => "top_message",
            Self::MatchedFaq => "matched_faq",
            Self::Similarity => "similarity",
            Self::Sentiment => "sentiment",
            Self::Coverage => "coverage",
            Self::ResolutionScore => "resolution_score",
            Self::Summary => "summary",
            Self::Keywords => "keywords",
            Self::TopicLabel => "topic_label",
            Self::CreatedAt => "created_at",
        }
    }

    /// Parse a column name; accepts `snake_case` and `kebab-case`.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL.into_iter().find(|k| k.as_str() == normalized)
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Some(Self::Asc),
            "desc" | "descending" => Some(Self::Desc),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => write!(f, "asc"),
            Self::Desc => write!(f, "desc"),
        }
    }
}

/// Active column and direction of the cluster table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub key: SortKey,
    pub order: SortOrder,
}

impl SortState {
    pub fn new(key: SortKey, order: SortOrder) -> Self {
        Self { key, order }
    }

    /// Column-header click: same column flips direction, another column
    /// becomes active in ascending order.
    pub fn toggle_column(&mut self, key: SortKey) {
        if self.key == key {
            self.order = self.order.toggled();
        } else {
            self.key = key;
            self.order = SortOrder::Asc;
        }
    }
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

/// Ascending comparison of two records on one column.
///
/// Numeric columns compare numerically with missing values lowest. Cluster
/// ids compare numerically when both are integers; integer ids order before
/// textual ones so the relation stays a total order on mixed snapshots.
/// Everything else compares as case-insensitive text.
pub fn compare(a: &ClusterRecord, b: &ClusterRecord, key: SortKey) -> Ordering {
    match key {
        SortKey::ClusterId => match (a.cluster_id.numeric(), b.cluster_id.numeric()) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => cmp_text(a.cluster_id.as_str(), b.cluster_id.as_str()),
        },
        SortKey::MessageCount => a.message_count.cmp(&b.message_count),
        SortKey::Similarity => cmp_optional_f64(a.similarity, b.similarity),
        SortKey::ResolutionScore => a.resolution_score.cmp(&b.resolution_score),
        _ => cmp_text(&text_value(a, key), &text_value(b, key)),
    }
}

/// Stable in-place sort. `Desc` reverses the comparator result only, so
/// equal records keep their original relative order in both directions.
pub fn sort_records(records: &mut [&ClusterRecord], state: SortState) {
    records.sort_by(|a, b| {
        let ord = compare(a, b, state.key);
        match state.order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });
}

fn cmp_optional_f64(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

fn cmp_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

/// The displayed text of a non-numeric column.
fn text_value(record: &ClusterRecord, key: SortKey) -> String {
    match key {
        SortKey::TopMessage => record.top_message.clone(),
        SortKey::MatchedFaq => record
            .matched_faq
            .as_ref()
            .map(|m| m.question().to_string())
            .unwrap_or_default(),
        SortKey::Sentiment => record.sentiment.label().to_string(),
        SortKey::Coverage => record.coverage.label().to_string(),
        SortKey::Summary => record.summary.clone(),
        SortKey::Keywords => record.keywords.join(", "),
        SortKey::TopicLabel => record.topic_label.clone(),
        SortKey::CreatedAt => record
            .created_at
            .known()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        SortKey::ClusterId => record.cluster_id.to_string(),
        SortKey::MessageCount => record.message_count.to_string(),
        SortKey::Similarity => record.similarity.map(|s| s.to_string()).unwrap_or_default(),
        SortKey::ResolutionScore => record
            .resolution_score
            .map(|s| s.to_string())
            .unwrap_or_default(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Sentiment;

    fn record(id: &str, count: u64, similarity: Option<f64>, sentiment: Sentiment) -> ClusterRecord {
        let mut r = ClusterRecord::new(id);
        r.message_count = count;
        r.similarity = similarity;
        r.sentiment = sentiment;
        r
    }

    fn ids(records: &[&ClusterRecord]) -> Vec<String> {
        records.iter().map(|r| r.cluster_id.to_string()).collect()
    }

    #[test]
    fn numeric_ids_sort_numerically() {
        let data = vec![
            record("10", 0, None, Sentiment::Neutral),
            record("9", 0, None, Sentiment::Neutral),
            record("x", 0, None, Sentiment::Neutral),
            record("100", 0, None, Sentiment::Neutral),
        ];
        let mut refs: Vec<&ClusterRecord> = data.iter().collect();
        sort_records(&mut refs, SortState::default());
        assert_eq!(ids(&refs), ["9", "10", "100", "x"]);
    }

    #[test]
    fn missing_similarity_sorts_lowest() {
        let data = vec![
            record("1", 0, Some(0.4), Sentiment::Neutral),
            record("2", 0, None, Sentiment::Neutral),
            record("3", 0, Some(0.9), Sentiment::Neutral),
        ];
        let mut refs: Vec<&ClusterRecord> = data.iter().collect();
        sort_records(&mut refs, SortState::new(SortKey::Similarity, SortOrder::Asc));
        assert_eq!(ids(&refs), ["2", "1", "3"]);
        sort_records(&mut refs, SortState::new(SortKey::Similarity, SortOrder::Desc));
        assert_eq!(ids(&refs), ["3", "1", "2"]);
    }

    #[test]
    fn descending_keeps_tie_order() {
        let data = vec![
            record("a", 5, None, Sentiment::Negative),
            record("b", 7, None, Sentiment::Positive),
            record("c", 5, None, Sentiment::Negative),
            record("d", 7, None, Sentiment::Neutral),
        ];
        let mut refs: Vec<&ClusterRecord> = data.iter().collect();
        sort_records(&mut refs, SortState::new(SortKey::MessageCount, SortOrder::Desc));
        assert_eq!(ids(&refs), ["b", "d", "a", "c"]);
    }

    #[test]
    fn text_columns_ignore_case() {
        let mut a = ClusterRecord::new(1);
        a.top_message = "banana".into();
        let mut b = ClusterRecord::new(2);
        b.top_message = "Apple".into();
        let mut c = ClusterRecord::new(3);
        c.top_message = "cherry".into();
        let data = [a, b, c];
        let mut refs: Vec<&ClusterRecord> = data.iter().collect();
        sort_records(&mut refs, SortState::new(SortKey::TopMessage, SortOrder::Asc));
        assert_eq!(ids(&refs), ["2", "1", "3"]);
    }

    #[test]
    fn toggle_column_semantics() {
        let mut state = SortState::default();
        state.toggle_column(SortKey::ClusterId);
        assert_eq!(state.order, SortOrder::Desc);
        state.toggle_column(SortKey::Similarity);
        assert_eq!(state, SortState::new(SortKey::Similarity, SortOrder::Asc));
    }

    #[test]
    fn parse_accepts_kebab_case() {
        assert_eq!(SortKey::parse("message-count"), Some(SortKey::MessageCount));
        assert_eq!(SortKey::parse("Resolution_Score"), Some(SortKey::ResolutionScore));
        assert_eq!(SortKey::parse("bogus"), None);
        assert_eq!(SortOrder::parse("DESC"), Some(SortOrder::Desc));
    }
}

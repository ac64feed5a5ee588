//! Response bodies of the backend's JSON endpoints.
//!
//! Every collection is decoded element by element: an element that does not
//! decode at all is skipped rather than failing the whole response. The
//! cluster and message envelopes count what they skipped.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::model::wire::{lenient_count, lenient_f64, null_as_default, text, topic_label};
use crate::model::{ClusterRecord, MapPoint, MessageRecord, Sentiment, UNLABELED_TOPIC};

/// Maximum example messages shown per process gap.
pub const MAX_GAP_EXAMPLES: usize = 5;

/// Decode a list, dropping elements that don't fit `T`. `null` is empty.
pub fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Option::<Vec<Value>>::deserialize(deserializer)?;
    Ok(decode_each(raw.unwrap_or_default()).0)
}

/// Decode elements one by one. Returns the survivors and how many were
/// dropped.
pub fn decode_each<T: DeserializeOwned>(values: Vec<Value>) -> (Vec<T>, usize) {
    let total = values.len();
    let items: Vec<T> = values
        .into_iter()
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect();
    let skipped = total - items.len();
    (items, skipped)
}

// ---------------------------------------------------------------------------
// /api/faq/clusters/
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "RawClusters")]
pub struct ClustersResponse {
    pub clusters: Vec<ClusterRecord>,
    pub cluster_map: Vec<MapPoint>,
    /// Clusters and map points that could not be decoded at all.
    pub skipped: usize,
}

#[derive(Deserialize)]
struct RawClusters {
    #[serde(default, deserialize_with = "null_as_default")]
    clusters: Vec<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    cluster_map: Vec<Value>,
}

impl From<RawClusters> for ClustersResponse {
    fn from(raw: RawClusters) -> Self {
        let (clusters, bad_clusters) = decode_each(raw.clusters);
        let (cluster_map, bad_points) = decode_each(raw.cluster_map);
        Self {
            clusters,
            cluster_map,
            skipped: bad_clusters + bad_points,
        }
    }
}

// ---------------------------------------------------------------------------
// /api/faq/messages/
// ---------------------------------------------------------------------------

/// The messages endpoint returns a bare array; paginated deployments wrap
/// it in `{"results": [...]}`. Any other object is an error body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "RawMessages")]
pub struct MessagesResponse {
    pub messages: Vec<MessageRecord>,
    pub skipped: usize,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawMessages {
    List(Vec<Value>),
    Wrapped {
        #[serde(alias = "messages", deserialize_with = "null_as_default")]
        results: Vec<Value>,
    },
}

impl From<RawMessages> for MessagesResponse {
    fn from(raw: RawMessages) -> Self {
        let (RawMessages::List(values) | RawMessages::Wrapped { results: values }) = raw;
        let (messages, skipped) = decode_each(values);
        Self { messages, skipped }
    }
}

impl MessagesResponse {
    pub fn into_messages(self) -> Vec<MessageRecord> {
        self.messages
    }
}

// ---------------------------------------------------------------------------
// /api/faq/top-process-gaps/
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProcessGapsResponse {
    #[serde(default, deserialize_with = "lenient_list")]
    pub process_gaps: Vec<ProcessGap>,
}

/// A recurring topic the support process handles poorly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessGap {
    #[serde(default = "unlabeled", deserialize_with = "topic_label")]
    pub topic: String,
    #[serde(default, deserialize_with = "lenient_count")]
    pub count: u64,
    #[serde(default, deserialize_with = "lenient_list")]
    pub examples: Vec<String>,
}

fn unlabeled() -> String {
    UNLABELED_TOPIC.to_string()
}

impl ProcessGap {
    /// At most [`MAX_GAP_EXAMPLES`] example messages.
    pub fn example_preview(&self) -> &[String] {
        &self.examples[..self.examples.len().min(MAX_GAP_EXAMPLES)]
    }
}

// ---------------------------------------------------------------------------
// /api/faq/trending-leaderboard/
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeaderboardResponse {
    #[serde(default, deserialize_with = "lenient_list")]
    pub leaderboard: Vec<LeaderboardEntry>,
}

/// Sentiment breakdown of the messages mentioning one keyword.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct KeywordSentiment {
    #[serde(default, deserialize_with = "lenient_count")]
    pub positive: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub neutral: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub negative: u64,
    /// Net score; only its sign is meaningful.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub score: Option<f64>,
}

/// Week-over-week movement of a keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Flat,
}

/// One keyword trending in this week's messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    #[serde(default, deserialize_with = "text")]
    pub keyword: String,
    #[serde(default, deserialize_with = "lenient_count")]
    pub count: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub previous_count: u64,
    #[serde(default, deserialize_with = "lenient_change")]
    pub change: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sentiment: KeywordSentiment,
    #[serde(default, deserialize_with = "lenient_list")]
    pub messages: Vec<String>,
}

fn lenient_change<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    Ok(lenient_f64(deserializer)?.map(|v| v as i64).unwrap_or(0))
}

impl LeaderboardEntry {
    /// Overall sentiment from the sign of the net score.
    pub fn verdict(&self) -> Sentiment {
        match self.sentiment.score {
            Some(s) if s > 0.0 => Sentiment::Positive,
            Some(s) if s < 0.0 => Sentiment::Negative,
            _ => Sentiment::Neutral,
        }
    }

    pub fn direction(&self) -> Direction {
        match self.change {
            c if c > 0 => Direction::Up,
            c if c < 0 => Direction::Down,
            _ => Direction::Flat,
        }
    }

    /// Signed change, e.g. `+3`, `-2`, `0`.
    pub fn change_display(&self) -> String {
        if self.change > 0 {
            format!("+{}", self.change)
        } else {
            self.change.to_string()
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => write!(f, "up"),
            Self::Down => write!(f, "down"),
            Self::Flat => write!(f, "flat"),
        }
    }
}

// ---------------------------------------------------------------------------
// /api/faq/deflection-metrics/
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeflectionResponse {
    #[serde(default, deserialize_with = "lenient_list")]
    pub faq_performance: Vec<FaqPerformance>,
}

/// Weekly deflection of one FAQ.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaqPerformance {
    #[serde(default, deserialize_with = "text")]
    pub question: String,
    #[serde(default, deserialize_with = "lenient_list")]
    pub trend: Vec<TrendPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    #[serde(default, deserialize_with = "text")]
    pub week: String,
    #[serde(default, deserialize_with = "lenient_count")]
    pub deflection_count: u64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub avg_resolution_score: Option<f64>,
}

impl FaqPerformance {
    pub fn total_deflections(&self) -> u64 {
        self.trend.iter().map(|t| t.deflection_count).sum()
    }

    /// Most recent week's point (the backend orders weeks ascending).
    pub fn latest(&self) -> Option<&TrendPoint> {
        self.trend.last()
    }
}

// ---------------------------------------------------------------------------
// /api/me/ and /api/trigger-pipeline/
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    #[serde(default, deserialize_with = "text")]
    pub username: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_admin: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStatus {
    #[serde(default, deserialize_with = "text")]
    pub status: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ClusterId;

    #[test]
    fn clusters_response_skips_broken_elements() {
        let body = r#"{
            "clusters": [{"cluster_id": 1, "top_message": "hi"}, "garbage", {"cluster_id": 2}],
            "cluster_map": [{"x": 0.5, "y": 1.5, "label": 1}, {"x": 2, "y": 3, "label": "-1"}]
        }"#;
        let parsed: ClustersResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.clusters.len(), 2);
        assert_eq!(parsed.cluster_map[0].label, ClusterId::from(1));
        assert_eq!(parsed.cluster_map[1].label, ClusterId::from("-1"));
    }

    #[test]
    fn clusters_response_tolerates_nulls() {
        let parsed: ClustersResponse =
            serde_json::from_str(r#"{"clusters": null, "cluster_map": null}"#).unwrap();
        assert!(parsed.clusters.is_empty());
        assert!(parsed.cluster_map.is_empty());
    }

    #[test]
    fn messages_accept_bare_and_wrapped() {
        let bare: MessagesResponse = serde_json::from_str(
            r#"[{"author_name": "Ana", "created_at": "2024-01-01T10:00:00Z", "sentiment": "positive", "text": "thanks"}]"#,
        )
        .unwrap();
        assert_eq!(bare.into_messages().len(), 1);

        let wrapped: MessagesResponse =
            serde_json::from_str(r#"{"results": [{"text": "a"}, {"text": "b"}, 7]}"#).unwrap();
        assert_eq!(wrapped.skipped, 1);
        let messages = wrapped.into_messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].author_name, "Unknown");
    }

    #[test]
    fn wrong_typed_fields_keep_the_record() {
        let parsed: ClustersResponse = serde_json::from_str(
            r#"{"clusters": [
                {"cluster_id": 1, "created_at": 1704067200, "coverage": false},
                {"cluster_id": 2, "sentiment": 3, "top_message": 17, "matched_faq": 5},
                "garbage"
            ]}"#,
        )
        .unwrap();
        assert_eq!(parsed.clusters.len(), 2);
        assert_eq!(parsed.skipped, 1);

        let first = &parsed.clusters[0];
        assert_eq!(first.created_at, crate::model::RecordDate::Unknown);
        assert_eq!(first.coverage, crate::model::Coverage::Unknown);

        let second = &parsed.clusters[1];
        assert_eq!(second.sentiment, Sentiment::Neutral);
        assert_eq!(second.top_message, "17");
        assert_eq!(second.matched_faq, None);
    }

    #[test]
    fn messages_error_body_is_not_an_empty_list() {
        let parsed = serde_json::from_str::<MessagesResponse>(
            r#"{"detail": "Authentication credentials were not provided."}"#,
        );
        assert!(parsed.is_err());

        let empty: MessagesResponse = serde_json::from_str(r#"{"results": null}"#).unwrap();
        assert!(empty.messages.is_empty());
    }

    #[test]
    fn process_gap_examples_are_capped() {
        let gap: ProcessGap = serde_json::from_str(
            r#"{"topic": null, "count": "3", "examples": ["a","b","c","d","e","f","g"]}"#,
        )
        .unwrap();
        assert_eq!(gap.topic, UNLABELED_TOPIC);
        assert_eq!(gap.count, 3);
        assert_eq!(gap.example_preview().len(), MAX_GAP_EXAMPLES);
    }

    #[test]
    fn leaderboard_verdict_follows_score_sign() {
        let parsed: LeaderboardResponse = serde_json::from_str(
            r#"{"leaderboard": [
                {"keyword": "refund", "count": 9, "previous_count": 4, "change": 5,
                 "sentiment": {"positive": 1, "neutral": 2, "negative": 6, "score": -5},
                 "messages": ["where is my refund"]},
                {"keyword": "login", "count": 2, "previous_count": 2, "change": 0,
                 "sentiment": null, "trend": []}
            ]}"#,
        )
        .unwrap();
        let refund = &parsed.leaderboard[0];
        assert_eq!(refund.verdict(), Sentiment::Negative);
        assert_eq!(refund.direction(), Direction::Up);
        assert_eq!(refund.change_display(), "+5");
        assert_eq!(refund.messages.len(), 1);

        let login = &parsed.leaderboard[1];
        assert_eq!(login.verdict(), Sentiment::Neutral);
        assert_eq!(login.direction(), Direction::Flat);
    }

    #[test]
    fn deflection_totals() {
        let parsed: DeflectionResponse = serde_json::from_str(
            r#"{"faq_performance": [{"question": "Reset password", "trend": [
                {"week": "2024-W01", "deflection_count": 4, "avg_resolution_score": 3.5},
                {"week": "N/A", "deflection_count": 0, "avg_resolution_score": null}
            ]}]}"#,
        )
        .unwrap();
        let faq = &parsed.faq_performance[0];
        assert_eq!(faq.total_deflections(), 4);
        assert_eq!(faq.latest().unwrap().avg_resolution_score, None);
    }

    #[test]
    fn current_user_defaults_to_non_admin() {
        let user: CurrentUser = serde_json::from_str(r#"{"username": "ops"}"#).unwrap();
        assert!(!user.is_admin);
    }
}

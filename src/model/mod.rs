//! Record types shared by every view of the dashboard.
//!
//! Everything here is deserialized straight from backend payloads. Decoding
//! is tolerant: missing or malformed optional fields collapse to defaults
//! ("Unlabeled" topic, "Unknown" author, zero counts) instead of failing the
//! whole snapshot. See [`wire`] for the normalizing deserializers.

pub mod date;
pub mod wire;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use date::RecordDate;

/// Topic label used when the backend did not assign one.
pub const UNLABELED_TOPIC: &str = "Unlabeled";

/// Author name used when a message carries none.
pub const UNKNOWN_AUTHOR: &str = "Unknown";

// ---------------------------------------------------------------------------
// Cluster id
// ---------------------------------------------------------------------------

/// Opaque, snapshot-stable cluster identifier.
///
/// The backend emits integer ids, older payloads and map labels sometimes
/// carry strings. Both decode into the same textual form so that
/// `MapPoint.label == ClusterRecord.cluster_id` joins work regardless of the
/// JSON type on either side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ClusterId(String);

impl ClusterId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value of the id, when it is an integer.
    pub fn numeric(&self) -> Option<i64> {
        self.0.parse().ok()
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i32> for ClusterId {
    fn from(id: i32) -> Self {
        Self(id.to_string())
    }
}

impl From<i64> for ClusterId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<u64> for ClusterId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for ClusterId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl<'de> Deserialize<'de> for ClusterId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = wire::loose_scalar(deserializer)?;
        Ok(raw.map(|r| Self::new(r.into_text())).unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Sentiment
// ---------------------------------------------------------------------------

/// Three-way sentiment verdict.
///
/// Cluster payloads use capitalized labels, message payloads use lower
/// case. Both normalize here; anything unrecognized routes to `Neutral` so
/// no record is ever dropped from a count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Sentiment {
    Positive,
    #[default]
    Neutral,
    Negative,
}

impl Sentiment {
    pub const ALL: [Sentiment; 3] = [Self::Positive, Self::Neutral, Self::Negative];

    pub fn normalize(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "positive" => Self::Positive,
            "negative" => Self::Negative,
            _ => Self::Neutral,
        }
    }

    /// Strict parse used for user-supplied filter values.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "positive" => Some(Self::Positive),
            "neutral" => Some(Self::Neutral),
            "negative" => Some(Self::Negative),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Positive => "Positive",
            Self::Neutral => "Neutral",
            Self::Negative => "Negative",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Sentiment {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = wire::loose_text(deserializer)?;
        Ok(raw.as_deref().map(Self::normalize).unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Coverage
// ---------------------------------------------------------------------------

/// Verdict on whether an existing FAQ answers a cluster's top message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum Coverage {
    Fully,
    Partially,
    Not,
    /// The evaluator produced no usable label.
    #[default]
    Unknown,
}

impl Coverage {
    /// The three verdicts that participate in coverage percentages.
    pub const RATED: [Coverage; 3] = [Self::Fully, Self::Partially, Self::Not];

    pub fn normalize(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "fully" | "full" | "fully covered" => Self::Fully,
            "partially" | "partial" | "partially covered" => Self::Partially,
            "not" | "none" | "not covered" => Self::Not,
            _ => Self::Unknown,
        }
    }

    /// Strict parse used for user-supplied filter values.
    pub fn parse(raw: &str) -> Option<Self> {
        match Self::normalize(raw) {
            Self::Unknown if !raw.trim().eq_ignore_ascii_case("unknown") => None,
            coverage => Some(coverage),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Fully => "Fully",
            Self::Partially => "Partially",
            Self::Not => "Not",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Coverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Coverage {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = wire::loose_text(deserializer)?;
        Ok(raw.as_deref().map(Self::normalize).unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// FAQ payloads
// ---------------------------------------------------------------------------

/// A question/answer pair, either an existing FAQ or a suggested one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaqPair {
    #[serde(default, deserialize_with = "wire::text")]
    pub question: String,
    #[serde(default, deserialize_with = "wire::text")]
    pub answer: String,
}

impl FaqPair {
    pub fn is_empty(&self) -> bool {
        self.question.trim().is_empty() && self.answer.trim().is_empty()
    }
}

/// The FAQ the evaluator matched a cluster against.
///
/// Older runs store only the question text, newer ones the full pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MatchedFaq {
    Pair(FaqPair),
    Text(String),
}

impl MatchedFaq {
    pub fn question(&self) -> &str {
        match self {
            Self::Pair(pair) => &pair.question,
            Self::Text(text) => text,
        }
    }

    pub fn answer(&self) -> Option<&str> {
        match self {
            Self::Pair(pair) if !pair.answer.is_empty() => Some(&pair.answer),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Cluster record
// ---------------------------------------------------------------------------

/// One cluster of semantically related user messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterRecord {
    pub cluster_id: ClusterId,
    #[serde(default, deserialize_with = "wire::lenient_count")]
    pub message_count: u64,
    #[serde(default, deserialize_with = "wire::text")]
    pub top_message: String,
    #[serde(default, deserialize_with = "wire::lenient_option")]
    pub matched_faq: Option<MatchedFaq>,
    #[serde(default, deserialize_with = "wire::lenient_f64")]
    pub similarity: Option<f64>,
    #[serde(default)]
    pub sentiment: Sentiment,
    #[serde(default)]
    pub coverage: Coverage,
    #[serde(default, deserialize_with = "wire::lenient_score")]
    pub resolution_score: Option<u8>,
    #[serde(default, deserialize_with = "wire::text")]
    pub summary: String,
    #[serde(default, deserialize_with = "wire::keywords")]
    pub keywords: Vec<String>,
    #[serde(default, deserialize_with = "wire::lenient_option")]
    pub faq_suggestion: Option<FaqPair>,
    #[serde(default, deserialize_with = "wire::text")]
    pub resolution_reason: String,
    #[serde(default = "default_topic", deserialize_with = "wire::topic_label")]
    pub topic_label: String,
    #[serde(default)]
    pub created_at: RecordDate,
}

fn default_topic() -> String {
    UNLABELED_TOPIC.to_string()
}

impl ClusterRecord {
    /// Minimal record, mostly useful for building fixtures.
    pub fn new(cluster_id: impl Into<ClusterId>) -> Self {
        Self {
            cluster_id: cluster_id.into(),
            message_count: 0,
            top_message: String::new(),
            matched_faq: None,
            similarity: None,
            sentiment: Sentiment::default(),
            coverage: Coverage::default(),
            resolution_score: None,
            summary: String::new(),
            keywords: Vec::new(),
            faq_suggestion: None,
            resolution_reason: String::new(),
            topic_label: default_topic(),
            created_at: RecordDate::Unknown,
        }
    }

    /// Similarity as a percentage string, or `"N/A"` when absent.
    pub fn similarity_display(&self) -> String {
        match self.similarity {
            Some(s) => format!("{:.1}%", s * 100.0),
            None => "N/A".to_string(),
        }
    }

    /// Question text of the matched FAQ, or `"None"`.
    pub fn matched_faq_display(&self) -> &str {
        self.matched_faq
            .as_ref()
            .map(MatchedFaq::question)
            .filter(|q| !q.is_empty())
            .unwrap_or("None")
    }

    /// First three keywords, with an ellipsis when more exist.
    pub fn keyword_preview(&self) -> String {
        let mut preview = self
            .keywords
            .iter()
            .take(3)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        if self.keywords.len() > 3 {
            preview.push_str("...");
        }
        preview
    }

    /// The suggested FAQ, if the evaluator produced a non-empty one.
    pub fn suggestion(&self) -> Option<&FaqPair> {
        self.faq_suggestion.as_ref().filter(|s| !s.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Map point
// ---------------------------------------------------------------------------

/// One 2D projection of a cluster (UMAP coordinates from the backend).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapPoint {
    #[serde(default, deserialize_with = "wire::lenient_f64_zero")]
    pub x: f64,
    #[serde(default, deserialize_with = "wire::lenient_f64_zero")]
    pub y: f64,
    #[serde(default)]
    pub label: ClusterId,
}

// ---------------------------------------------------------------------------
// Message record
// ---------------------------------------------------------------------------

/// One raw user or agent message, used by the sentiment timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    #[serde(default = "default_author", deserialize_with = "wire::author_name")]
    pub author_name: String,
    #[serde(default)]
    pub created_at: RecordDate,
    #[serde(default)]
    pub sentiment: Sentiment,
    #[serde(default, deserialize_with = "wire::text")]
    pub text: String,
}

fn default_author() -> String {
    UNKNOWN_AUTHOR.to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_record_decodes_full_payload() {
        let json = r#"{
            "cluster_id": 7,
            "message_count": 42,
            "top_message": "How do I reset my password?",
            "matched_faq": {"question": "Resetting passwords", "answer": "Use the link."},
            "similarity": 0.875,
            "sentiment": "negative",
            "coverage": "Partially",
            "resolution_score": 3,
            "summary": "Password resets",
            "keywords": ["password", "reset", "login", "account"],
            "faq_suggestion": {"question": "Q?", "answer": "A."},
            "resolution_reason": "Missing steps",
            "topic_label": "Login",
            "created_at": "2024-03-05T10:00:00Z"
        }"#;
        let record: ClusterRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.cluster_id, ClusterId::from(7));
        assert_eq!(record.message_count, 42);
        assert_eq!(record.sentiment, Sentiment::Negative);
        assert_eq!(record.coverage, Coverage::Partially);
        assert_eq!(record.resolution_score, Some(3));
        assert_eq!(record.similarity_display(), "87.5%");
        assert_eq!(record.matched_faq_display(), "Resetting passwords");
        assert_eq!(record.keyword_preview(), "password, reset, login...");
        assert_eq!(record.topic_label, "Login");
        assert!(record.created_at.known().is_some());
    }

    #[test]
    fn cluster_record_tolerates_missing_and_null_fields() {
        let json = r#"{"cluster_id": "abc", "similarity": null, "topic_label": null,
                       "keywords": null, "resolution_score": null, "matched_faq": null}"#;
        let record: ClusterRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.cluster_id.as_str(), "abc");
        assert_eq!(record.message_count, 0);
        assert_eq!(record.similarity_display(), "N/A");
        assert_eq!(record.topic_label, UNLABELED_TOPIC);
        assert!(record.keywords.is_empty());
        assert_eq!(record.resolution_score, None);
        assert_eq!(record.matched_faq_display(), "None");
        assert_eq!(record.coverage, Coverage::Unknown);
        assert_eq!(record.created_at, RecordDate::Unknown);
    }

    #[test]
    fn matched_faq_accepts_plain_string() {
        let json = r#"{"cluster_id": 1, "matched_faq": "Shipping times"}"#;
        let record: ClusterRecord = serde_json::from_str(json).unwrap();
        assert_eq!(
            record.matched_faq,
            Some(MatchedFaq::Text("Shipping times".to_string()))
        );
        assert_eq!(record.matched_faq_display(), "Shipping times");
    }

    #[test]
    fn sentiment_normalizes_case_and_unknowns() {
        assert_eq!(Sentiment::normalize("POSITIVE"), Sentiment::Positive);
        assert_eq!(Sentiment::normalize(" negative "), Sentiment::Negative);
        assert_eq!(Sentiment::normalize("unknown-label"), Sentiment::Neutral);
        assert_eq!(Sentiment::parse("mixed"), None);
    }

    #[test]
    fn coverage_parse_rejects_garbage() {
        assert_eq!(Coverage::parse("not"), Some(Coverage::Not));
        assert_eq!(Coverage::parse("Unknown"), Some(Coverage::Unknown));
        assert_eq!(Coverage::parse("sideways"), None);
    }

    #[test]
    fn empty_suggestion_is_ignored() {
        let mut record = ClusterRecord::new(1);
        record.faq_suggestion = Some(FaqPair::default());
        assert!(record.suggestion().is_none());
    }

    #[test]
    fn message_record_defaults_author() {
        let json = r#"{"created_at": "2024-01-01T08:30:00Z", "sentiment": "positive", "author_name": null}"#;
        let message: MessageRecord = serde_json::from_str(json).unwrap();
        assert_eq!(message.author_name, UNKNOWN_AUTHOR);
        assert_eq!(message.sentiment, Sentiment::Positive);
    }

    #[test]
    fn map_label_joins_numeric_and_string_ids() {
        let point: MapPoint = serde_json::from_str(r#"{"x": 1.5, "y": -2, "label": 4}"#).unwrap();
        assert_eq!(point.label, ClusterId::from("4"));
        assert_eq!(point.y, -2.0);
    }
}

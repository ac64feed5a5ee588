//! Chart-ready summaries derived from cluster and message records.
//!
//! All derivations are pure and independent of the table view state; the
//! caller decides whether to pass the full snapshot or the filtered set.
//! Cluster-level functions take any iterator of record references, so the
//! output of [`crate::view::filter`] can be passed as is.
//! Percentages are guarded so an empty input yields zeros, never NaN.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::Serialize;

use crate::model::{ClusterId, ClusterRecord, Coverage, MatchedFaq, MessageRecord, Sentiment};
use crate::store::EnrichedPoint;

/// `count / total * 100`, or 0 when `total` is zero.
pub fn pct(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (count as f64 / total as f64) * 100.0
    }
}

// ---------------------------------------------------------------------------
// Coverage
// ---------------------------------------------------------------------------

/// Counts per coverage verdict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CoverageStats {
    pub fully: usize,
    pub partially: usize,
    pub not: usize,
    /// Clusters without a usable verdict; excluded from percentages.
    pub unknown: usize,
}

impl CoverageStats {
    /// Rated clusters (Fully + Partially + Not).
    pub fn total(&self) -> usize {
        self.fully + self.partially + self.not
    }

    pub fn count(&self, coverage: Coverage) -> usize {
        match coverage {
            Coverage::Fully => self.fully,
            Coverage::Partially => self.partially,
            Coverage::Not => self.not,
            Coverage::Unknown => self.unknown,
        }
    }

    pub fn pct(&self, coverage: Coverage) -> f64 {
        match coverage {
            Coverage::Unknown => 0.0,
            rated => pct(self.count(rated), self.total()),
        }
    }
}

pub fn coverage_stats<'a>(
    clusters: impl IntoIterator<Item = &'a ClusterRecord>,
) -> CoverageStats {
    let mut stats = CoverageStats::default();
    for c in clusters {
        match c.coverage {
            Coverage::Fully => stats.fully += 1,
            Coverage::Partially => stats.partially += 1,
            Coverage::Not => stats.not += 1,
            Coverage::Unknown => stats.unknown += 1,
        }
    }
    stats
}

// ---------------------------------------------------------------------------
// Sentiment
// ---------------------------------------------------------------------------

/// Counts per sentiment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SentimentCounts {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
}

impl SentimentCounts {
    pub fn add(&mut self, sentiment: Sentiment) {
        match sentiment {
            Sentiment::Positive => self.positive += 1,
            Sentiment::Neutral => self.neutral += 1,
            Sentiment::Negative => self.negative += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.positive + self.neutral + self.negative
    }

    pub fn count(&self, sentiment: Sentiment) -> usize {
        match sentiment {
            Sentiment::Positive => self.positive,
            Sentiment::Neutral => self.neutral,
            Sentiment::Negative => self.negative,
        }
    }

    pub fn pct(&self, sentiment: Sentiment) -> f64 {
        pct(self.count(sentiment), self.total())
    }
}

/// Sentiment distribution over clusters. Unrecognized labels were routed to
/// `Neutral` when decoded, so every cluster lands in exactly one bucket.
pub fn sentiment_distribution<'a>(
    clusters: impl IntoIterator<Item = &'a ClusterRecord>,
) -> SentimentCounts {
    let mut counts = SentimentCounts::default();
    for c in clusters {
        counts.add(c.sentiment);
    }
    counts
}

/// Mean resolution score per sentiment; 0 for a sentiment with no scores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ResolutionBySentiment {
    pub positive: f64,
    pub neutral: f64,
    pub negative: f64,
}

pub fn resolution_by_sentiment<'a>(
    clusters: impl IntoIterator<Item = &'a ClusterRecord>,
) -> ResolutionBySentiment {
    // (sum, count) per sentiment, in `Sentiment::ALL` order
    let mut totals = [(0.0_f64, 0_usize); 3];
    for c in clusters {
        let Some(score) = c.resolution_score else {
            continue;
        };
        let slot = match c.sentiment {
            Sentiment::Positive => 0,
            Sentiment::Neutral => 1,
            Sentiment::Negative => 2,
        };
        totals[slot].0 += f64::from(score);
        totals[slot].1 += 1;
    }

    let mean = |(sum, count): (f64, usize)| if count == 0 { 0.0 } else { sum / count as f64 };
    ResolutionBySentiment {
        positive: mean(totals[0]),
        neutral: mean(totals[1]),
        negative: mean(totals[2]),
    }
}

// ---------------------------------------------------------------------------
// Resolution score histogram
// ---------------------------------------------------------------------------

/// Five fixed buckets for scores 1..=5.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionHistogram {
    /// `buckets[i]` counts clusters scored `i + 1`.
    pub buckets: [usize; 5],
    /// Clusters without a score; not part of any bucket.
    pub unscored: usize,
}

impl ResolutionHistogram {
    pub fn count(&self, score: u8) -> usize {
        match score {
            1..=5 => self.buckets[usize::from(score) - 1],
            _ => 0,
        }
    }
}

pub fn resolution_histogram<'a>(
    clusters: impl IntoIterator<Item = &'a ClusterRecord>,
) -> ResolutionHistogram {
    let mut histogram = ResolutionHistogram::default();
    for c in clusters {
        match c.resolution_score {
            Some(score @ 1..=5) => histogram.buckets[usize::from(score) - 1] += 1,
            _ => histogram.unscored += 1,
        }
    }
    histogram
}

// ---------------------------------------------------------------------------
// Topic gaps
// ---------------------------------------------------------------------------

/// Clusters under one topic label lacking full FAQ coverage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicGap {
    pub topic: String,
    pub count: usize,
}

/// Group clusters with `coverage != Fully` by topic, largest first. Ties
/// keep the order in which topics first appear.
pub fn topic_gaps<'a>(clusters: impl IntoIterator<Item = &'a ClusterRecord>) -> Vec<TopicGap> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut gaps: Vec<TopicGap> = Vec::new();

    for c in clusters.into_iter().filter(|c| c.coverage != Coverage::Fully) {
        match index.get(c.topic_label.as_str()) {
            Some(&i) => gaps[i].count += 1,
            None => {
                index.insert(c.topic_label.as_str(), gaps.len());
                gaps.push(TopicGap {
                    topic: c.topic_label.clone(),
                    count: 1,
                });
            }
        }
    }

    gaps.sort_by(|a, b| b.count.cmp(&a.count));
    gaps
}

// ---------------------------------------------------------------------------
// Sentiment timeline
// ---------------------------------------------------------------------------

/// Sentiment counts for one day (and optionally one author).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineBucket {
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(flatten)]
    pub counts: SentimentCounts,
}

/// Day-by-day sentiment of raw messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SentimentTimeline {
    /// Ascending by date, then author.
    pub buckets: Vec<TimelineBucket>,
    /// Messages without a usable timestamp; not placed in any bucket.
    pub undated: usize,
}

/// Bucket messages by day, and by author when `by_author` is set.
///
/// Each message contributes to exactly one sentiment count of exactly one
/// bucket, so `positive + neutral + negative` equals the bucket's message
/// count.
pub fn sentiment_timeline(messages: &[MessageRecord], by_author: bool) -> SentimentTimeline {
    let mut grouped: BTreeMap<(NaiveDate, Option<&str>), SentimentCounts> = BTreeMap::new();
    let mut undated = 0;

    for m in messages {
        let Some(day) = m.created_at.known() else {
            undated += 1;
            continue;
        };
        let author = by_author.then_some(m.author_name.as_str());
        grouped.entry((day, author)).or_default().add(m.sentiment);
    }

    SentimentTimeline {
        buckets: grouped
            .into_iter()
            .map(|((date, author), counts)| TimelineBucket {
                date,
                author: author.map(str::to_string),
                counts,
            })
            .collect(),
        undated,
    }
}

// ---------------------------------------------------------------------------
// Per-day cluster trends
// ---------------------------------------------------------------------------

/// Cluster volume and mean resolution score for one day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyClusterTrend {
    pub date: NaiveDate,
    pub clusters: usize,
    /// Mean over scored clusters of that day, `None` if none were scored.
    pub avg_resolution_score: Option<f64>,
}

/// Clusters per known creation day, ascending. Undated clusters are skipped.
pub fn daily_cluster_trends<'a>(
    clusters: impl IntoIterator<Item = &'a ClusterRecord>,
) -> Vec<DailyClusterTrend> {
    let mut daily: BTreeMap<NaiveDate, (usize, Vec<u8>)> = BTreeMap::new();
    for c in clusters {
        let Some(day) = c.created_at.known() else {
            continue;
        };
        let entry = daily.entry(day).or_default();
        entry.0 += 1;
        entry.1.extend(c.resolution_score);
    }

    daily
        .into_iter()
        .map(|(date, (count, scores))| DailyClusterTrend {
            date,
            clusters: count,
            avg_resolution_score: (!scores.is_empty()).then(|| {
                scores.iter().map(|&s| f64::from(s)).sum::<f64>() / scores.len() as f64
            }),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// FAQ improvement
// ---------------------------------------------------------------------------

/// A cluster for which the evaluator proposed a better FAQ.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaqCandidate {
    pub cluster_id: ClusterId,
    pub question: String,
    pub answer: String,
    pub reason: String,
    pub coverage: Coverage,
    pub matched_faq: Option<MatchedFaq>,
    pub resolution_score: Option<u8>,
}

pub fn faq_candidates<'a>(
    clusters: impl IntoIterator<Item = &'a ClusterRecord>,
) -> Vec<FaqCandidate> {
    clusters
        .into_iter()
        .filter_map(|c| {
            let suggestion = c.suggestion()?;
            Some(FaqCandidate {
                cluster_id: c.cluster_id.clone(),
                question: suggestion.question.clone(),
                answer: suggestion.answer.clone(),
                reason: c.resolution_reason.clone(),
                coverage: c.coverage,
                matched_faq: c.matched_faq.clone(),
                resolution_score: c.resolution_score,
            })
        })
        .collect()
}

/// A weakly covered cluster whose best FAQ match is also a poor fit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mismatch {
    pub cluster_id: ClusterId,
    pub top_message: String,
    pub matched_faq: String,
    pub coverage: Coverage,
    pub similarity: f64,
}

/// Clusters not fully covered with similarity below `threshold`. A cluster
/// without a similarity score is never reported.
pub fn mismatches<'a>(
    clusters: impl IntoIterator<Item = &'a ClusterRecord>,
    threshold: f64,
) -> Vec<Mismatch> {
    clusters
        .into_iter()
        .filter(|c| c.coverage != Coverage::Fully)
        .filter_map(|c| {
            let similarity = c.similarity.filter(|&s| s < threshold)?;
            Some(Mismatch {
                cluster_id: c.cluster_id.clone(),
                top_message: c.top_message.clone(),
                matched_faq: c.matched_faq_display().to_string(),
                coverage: c.coverage,
                similarity,
            })
        })
        .collect()
}

/// Representative questions of the `limit` largest clusters.
pub fn top_questions<'a>(
    clusters: impl IntoIterator<Item = &'a ClusterRecord>,
    limit: usize,
) -> Vec<String> {
    let mut ranked: Vec<&ClusterRecord> = clusters
        .into_iter()
        .filter(|c| !c.top_message.trim().is_empty())
        .collect();
    ranked.sort_by(|a, b| b.message_count.cmp(&a.message_count));
    ranked
        .into_iter()
        .take(limit)
        .map(|c| c.top_message.clone())
        .collect()
}

// ---------------------------------------------------------------------------
// Map series
// ---------------------------------------------------------------------------

/// All map points sharing one label, drawn in one color.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapSeries {
    pub label: ClusterId,
    /// HSL hue in degrees.
    pub hue: u32,
    pub points: Vec<EnrichedPoint>,
}

/// Group points per label in first-appearance order; series `i` gets hue
/// `(i * 67) % 360` so neighbouring series stay distinguishable.
pub fn map_series(points: &[EnrichedPoint]) -> Vec<MapSeries> {
    let mut index: HashMap<&ClusterId, usize> = HashMap::new();
    let mut series: Vec<MapSeries> = Vec::new();

    for p in points {
        let i = *index.entry(&p.label).or_insert_with(|| {
            let i = series.len();
            series.push(MapSeries {
                label: p.label.clone(),
                hue: ((i * 67) % 360) as u32,
                points: Vec::new(),
            });
            i
        });
        series[i].points.push(p.clone());
    }
    series
}

// ---------------------------------------------------------------------------
// Overview
// ---------------------------------------------------------------------------

/// Every cluster-level summary the stats panel shows, computed in one pass
/// over the same record set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub total_clusters: usize,
    pub total_messages: u64,
    pub coverage: CoverageStats,
    pub sentiment: SentimentCounts,
    pub resolution: ResolutionHistogram,
    pub resolution_by_sentiment: ResolutionBySentiment,
    pub mismatches: Vec<Mismatch>,
    pub top_questions: Vec<String>,
    pub daily: Vec<DailyClusterTrend>,
}

pub fn overview<'a>(
    clusters: impl IntoIterator<Item = &'a ClusterRecord>,
    top_n: usize,
    mismatch_threshold: f64,
) -> Overview {
    let rows: Vec<&ClusterRecord> = clusters.into_iter().collect();
    let each = || rows.iter().copied();
    Overview {
        total_clusters: rows.len(),
        total_messages: each().map(|c| c.message_count).sum(),
        coverage: coverage_stats(each()),
        sentiment: sentiment_distribution(each()),
        resolution: resolution_histogram(each()),
        resolution_by_sentiment: resolution_by_sentiment(each()),
        mismatches: mismatches(each(), mismatch_threshold),
        top_questions: top_questions(each(), top_n),
        daily: daily_cluster_trends(each()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FaqPair, RecordDate};

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn cluster(id: i64, coverage: Coverage, topic: &str, score: Option<u8>) -> ClusterRecord {
        let mut c = ClusterRecord::new(id);
        c.coverage = coverage;
        c.topic_label = topic.to_string();
        c.resolution_score = score;
        c
    }

    #[test]
    fn coverage_percentages_guard_zero() {
        let stats = coverage_stats(&[] as &[ClusterRecord]);
        assert_eq!(stats.total(), 0);
        for c in Coverage::RATED {
            assert_eq!(stats.pct(c), 0.0);
        }
    }

    #[test]
    fn coverage_unknown_is_reported_separately() {
        let data = [
            cluster(1, Coverage::Fully, "a", None),
            cluster(2, Coverage::Unknown, "a", None),
            cluster(3, Coverage::Not, "a", None),
        ];
        let stats = coverage_stats(&data);
        assert_eq!(stats.unknown, 1);
        assert_eq!(stats.pct(Coverage::Fully), 50.0);
        assert_eq!(stats.pct(Coverage::Not), 50.0);
    }

    #[test]
    fn histogram_excludes_unscored() {
        let data = [
            cluster(1, Coverage::Fully, "a", Some(5)),
            cluster(2, Coverage::Fully, "a", Some(5)),
            cluster(3, Coverage::Fully, "a", Some(1)),
            cluster(4, Coverage::Fully, "a", None),
        ];
        let h = resolution_histogram(&data);
        assert_eq!(h.buckets, [1, 0, 0, 0, 2]);
        assert_eq!(h.unscored, 1);
        assert_eq!(h.count(5), 2);
        assert_eq!(h.count(0), 0);
    }

    #[test]
    fn topic_gaps_skip_fully_and_rank_by_count() {
        let data = [
            cluster(1, Coverage::Not, "Billing", None),
            cluster(2, Coverage::Partially, "Login", None),
            cluster(3, Coverage::Fully, "Login", None),
            cluster(4, Coverage::Not, "Login", None),
            cluster(5, Coverage::Unknown, "Shipping", None),
        ];
        let gaps = topic_gaps(&data);
        assert_eq!(
            gaps,
            vec![
                TopicGap { topic: "Login".into(), count: 2 },
                TopicGap { topic: "Billing".into(), count: 1 },
                TopicGap { topic: "Shipping".into(), count: 1 },
            ]
        );
    }

    #[test]
    fn timeline_routes_unknown_sentiment_to_neutral() {
        let messages: Vec<MessageRecord> = serde_json::from_str(
            r#"[
                {"created_at": "2024-01-01T09:00:00Z", "sentiment": "positive", "author_name": "Ana"},
                {"created_at": "2024-01-01T17:00:00Z", "sentiment": "unknown-label", "author_name": "Ben"},
                {"created_at": null, "sentiment": "negative"}
            ]"#,
        )
        .unwrap();

        let timeline = sentiment_timeline(&messages, false);
        assert_eq!(timeline.buckets.len(), 1);
        assert_eq!(timeline.undated, 1);
        let bucket = &timeline.buckets[0];
        assert_eq!(bucket.date, day("2024-01-01"));
        assert_eq!(
            bucket.counts,
            SentimentCounts { positive: 1, neutral: 1, negative: 0 }
        );

        let by_author = sentiment_timeline(&messages, true);
        assert_eq!(by_author.buckets.len(), 2);
        assert_eq!(by_author.buckets[0].author.as_deref(), Some("Ana"));
    }

    #[test]
    fn daily_trends_average_scored_only() {
        let mut a = cluster(1, Coverage::Fully, "a", Some(4));
        a.created_at = RecordDate::Known(day("2024-02-02"));
        let mut b = cluster(2, Coverage::Fully, "a", Some(2));
        b.created_at = RecordDate::Known(day("2024-02-02"));
        let mut c = cluster(3, Coverage::Fully, "a", None);
        c.created_at = RecordDate::Known(day("2024-02-01"));
        let d = cluster(4, Coverage::Fully, "a", Some(5));

        let trends = daily_cluster_trends(&[a, b, c, d]);
        assert_eq!(trends.len(), 2);
        assert_eq!(trends[0].date, day("2024-02-01"));
        assert_eq!(trends[0].avg_resolution_score, None);
        assert_eq!(trends[1].clusters, 2);
        assert_eq!(trends[1].avg_resolution_score, Some(3.0));
    }

    #[test]
    fn faq_candidates_project_suggestions() {
        let mut a = cluster(1, Coverage::Not, "a", Some(1));
        a.faq_suggestion = Some(FaqPair {
            question: "How do refunds work?".into(),
            answer: "Within 5 days.".into(),
        });
        a.resolution_reason = "No FAQ mentions refunds".into();
        let mut b = cluster(2, Coverage::Partially, "a", None);
        b.faq_suggestion = Some(FaqPair::default());

        let candidates = faq_candidates(&[a, b]);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].question, "How do refunds work?");
        assert_eq!(candidates[0].reason, "No FAQ mentions refunds");
        assert_eq!(candidates[0].coverage, Coverage::Not);
    }

    #[test]
    fn mismatches_require_similarity() {
        let mut a = cluster(1, Coverage::Not, "a", None);
        a.similarity = Some(0.5);
        let mut b = cluster(2, Coverage::Fully, "a", None);
        b.similarity = Some(0.1);
        let c = cluster(3, Coverage::Partially, "a", None);
        let mut d = cluster(4, Coverage::Partially, "a", None);
        d.similarity = Some(0.95);

        let found = mismatches(&[a, b, c, d], 0.8);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].cluster_id, ClusterId::from(1));
        assert_eq!(found[0].matched_faq, "None");
    }

    #[test]
    fn resolution_by_sentiment_means() {
        let mut a = cluster(1, Coverage::Fully, "a", Some(4));
        a.sentiment = Sentiment::Positive;
        let mut b = cluster(2, Coverage::Fully, "a", Some(2));
        b.sentiment = Sentiment::Positive;
        let mut c = cluster(3, Coverage::Fully, "a", None);
        c.sentiment = Sentiment::Negative;
        let r = resolution_by_sentiment(&[a, b, c]);
        assert_eq!(r.positive, 3.0);
        assert_eq!(r.negative, 0.0);
    }

    #[test]
    fn top_questions_by_volume() {
        let mut a = cluster(1, Coverage::Fully, "a", None);
        a.top_message = "small".into();
        a.message_count = 2;
        let mut b = cluster(2, Coverage::Fully, "a", None);
        b.top_message = "big".into();
        b.message_count = 50;
        let c = cluster(3, Coverage::Fully, "a", None);
        assert_eq!(top_questions(&[a, b, c], 15), vec!["big", "small"]);
    }

    #[test]
    fn two_cluster_overview() {
        let a = cluster(1, Coverage::Fully, "a", Some(5));
        let b = cluster(2, Coverage::Not, "b", Some(2));
        let o = overview(&[a, b], 15, 0.8);
        assert_eq!(o.total_clusters, 2);
        assert_eq!(o.coverage.pct(Coverage::Fully), 50.0);
        assert_eq!(o.resolution.count(5), 1);
        assert_eq!(o.resolution.count(2), 1);
        let pct_sum: f64 = Sentiment::ALL.iter().map(|&s| o.sentiment.pct(s)).sum();
        assert!((pct_sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn map_series_groups_in_first_seen_order() {
        let point = |label: &str| EnrichedPoint {
            x: 0.0,
            y: 0.0,
            label: ClusterId::from(label),
            enrichment: None,
        };
        let series = map_series(&[point("2"), point("1"), point("2")]);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].label, ClusterId::from("2"));
        assert_eq!(series[0].points.len(), 2);
        assert_eq!(series[1].hue, 67);
    }
}

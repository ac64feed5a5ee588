//! Record store: the single latest snapshot every view derives from.
//!
//! Snapshots are replaced wholesale. Each fetch is issued a monotonically
//! increasing [`FetchToken`]; only the completion carrying the most recently
//! issued token is applied, so a slow, superseded fetch can never overwrite
//! fresher data. A failed fetch keeps the previous snapshot and records the
//! error instead.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{ClusterId, ClusterRecord, Coverage, MapPoint, MessageRecord, Sentiment};

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Everything one successful fetch produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub clusters: Vec<ClusterRecord>,
    pub map_points: Vec<MapPoint>,
    /// Raw messages, when the fetch included them.
    pub messages: Option<Vec<MessageRecord>>,
    /// Payload elements the backend sent that could not be decoded.
    pub records_skipped: usize,
}

impl Snapshot {
    pub fn new(clusters: Vec<ClusterRecord>, map_points: Vec<MapPoint>) -> Self {
        Self {
            clusters,
            map_points,
            messages: None,
            records_skipped: 0,
        }
    }

    pub fn with_messages(mut self, messages: Vec<MessageRecord>) -> Self {
        self.messages = Some(messages);
        self
    }

    pub fn with_skipped(mut self, records_skipped: usize) -> Self {
        self.records_skipped = records_skipped;
        self
    }

    /// Drop repeated cluster ids, keeping the first occurrence.
    ///
    /// Returns how many records were dropped.
    fn dedup_clusters(&mut self) -> usize {
        let before = self.clusters.len();
        let mut seen = HashSet::new();
        self.clusters.retain(|c| seen.insert(c.cluster_id.clone()));
        before - self.clusters.len()
    }
}

// ---------------------------------------------------------------------------
// Map join
// ---------------------------------------------------------------------------

/// Cluster fields copied onto a map point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointEnrichment {
    pub top_message: String,
    pub sentiment: Sentiment,
    pub coverage: Coverage,
    pub resolution_score: Option<u8>,
}

/// A map point joined with its cluster. Unmatched points keep
/// `enrichment: None` and are still drawn, uncategorized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedPoint {
    pub x: f64,
    pub y: f64,
    pub label: ClusterId,
    #[serde(flatten)]
    pub enrichment: Option<PointEnrichment>,
}

/// Join map points to clusters on `label == cluster_id`. Never drops a point.
pub fn join(points: &[MapPoint], clusters: &[ClusterRecord]) -> Vec<EnrichedPoint> {
    let by_id: HashMap<&ClusterId, &ClusterRecord> =
        clusters.iter().map(|c| (&c.cluster_id, c)).collect();

    points
        .iter()
        .map(|p| EnrichedPoint {
            x: p.x,
            y: p.y,
            label: p.label.clone(),
            enrichment: by_id.get(&p.label).map(|c| PointEnrichment {
                top_message: c.top_message.clone(),
                sentiment: c.sentiment,
                coverage: c.coverage,
                resolution_score: c.resolution_score,
            }),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Fetch bookkeeping
// ---------------------------------------------------------------------------

/// Identifies one fetch. Later tokens compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct FetchToken(u64);

impl FetchToken {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// What happened to a fetch completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The snapshot replaced the previous one.
    Applied {
        clusters: usize,
        map_points: usize,
        duplicates_dropped: usize,
        /// Undecodable payload elements reported by the fetch.
        records_skipped: usize,
    },
    /// The fetch failed; the previous snapshot is still served.
    Failed,
    /// A newer fetch was started after this one; the result was discarded.
    Stale,
}

/// Load status exposed to every view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStatus {
    pub loading: bool,
    pub error: Option<String>,
    pub last_token: Option<u64>,
    pub loaded_at: Option<DateTime<Utc>>,
    pub has_data: bool,
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Holder of the latest snapshot. Written only through fetch completion.
#[derive(Debug, Default)]
pub struct RecordStore {
    snapshot: Snapshot,
    joined: Vec<EnrichedPoint>,
    issued: u64,
    loading: bool,
    error: Option<String>,
    loaded_at: Option<DateTime<Utc>>,
    has_data: bool,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fetch. Supersedes any fetch still in flight.
    pub fn begin_fetch(&mut self) -> FetchToken {
        self.issued += 1;
        self.loading = true;
        FetchToken(self.issued)
    }

    /// Whether `token` is the most recently issued fetch.
    pub fn is_current(&self, token: FetchToken) -> bool {
        token.0 == self.issued
    }

    /// Deliver the result of the fetch identified by `token`.
    pub fn complete_fetch(
        &mut self,
        token: FetchToken,
        result: anyhow::Result<Snapshot>,
    ) -> LoadOutcome {
        if !self.is_current(token) {
            return LoadOutcome::Stale;
        }
        self.loading = false;

        match result {
            Ok(mut snapshot) => {
                let duplicates_dropped = snapshot.dedup_clusters();
                self.joined = join(&snapshot.map_points, &snapshot.clusters);
                self.snapshot = snapshot;
                self.error = None;
                self.loaded_at = Some(Utc::now());
                self.has_data = true;
                LoadOutcome::Applied {
                    clusters: self.snapshot.clusters.len(),
                    map_points: self.joined.len(),
                    duplicates_dropped,
                    records_skipped: self.snapshot.records_skipped,
                }
            }
            Err(err) => {
                self.error = Some(format!("{err:#}"));
                LoadOutcome::Failed
            }
        }
    }

    /// Replace the snapshot synchronously (begin + complete in one step).
    pub fn load(&mut self, snapshot: Snapshot) -> LoadOutcome {
        let token = self.begin_fetch();
        self.complete_fetch(token, Ok(snapshot))
    }

    pub fn clusters(&self) -> &[ClusterRecord] {
        &self.snapshot.clusters
    }

    pub fn map_points(&self) -> &[EnrichedPoint] {
        &self.joined
    }

    pub fn messages(&self) -> &[MessageRecord] {
        self.snapshot.messages.as_deref().unwrap_or_default()
    }

    pub fn contains(&self, cluster_id: &ClusterId) -> bool {
        self.snapshot
            .clusters
            .iter()
            .any(|c| &c.cluster_id == cluster_id)
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn status(&self) -> StoreStatus {
        StoreStatus {
            loading: self.loading,
            error: self.error.clone(),
            last_token: (self.issued > 0).then_some(self.issued),
            loaded_at: self.loaded_at,
            has_data: self.has_data,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn point(label: &str) -> MapPoint {
        MapPoint {
            x: 0.0,
            y: 1.0,
            label: ClusterId::from(label),
        }
    }

    fn snapshot(ids: &[i64]) -> Snapshot {
        Snapshot::new(
            ids.iter().map(|&i| ClusterRecord::new(i)).collect(),
            Vec::new(),
        )
    }

    #[test]
    fn join_keeps_unmatched_points() {
        let mut c = ClusterRecord::new(1);
        c.top_message = "hello".into();
        let points = [point("1"), point("-1")];
        let joined = join(&points, &[c]);
        assert_eq!(joined.len(), 2);
        assert_eq!(joined[0].enrichment.as_ref().unwrap().top_message, "hello");
        assert!(joined[1].enrichment.is_none());
    }

    #[test]
    fn load_replaces_wholesale_and_rejoins() {
        let mut store = RecordStore::new();
        let mut first = snapshot(&[1, 2]);
        first.map_points = vec![point("1")];
        store.load(first);
        assert!(store.map_points()[0].enrichment.is_some());

        store.load(Snapshot::new(vec![ClusterRecord::new(3)], vec![point("1")]));
        assert_eq!(store.clusters().len(), 1);
        assert!(store.map_points()[0].enrichment.is_none());
        assert!(store.messages().is_empty());
    }

    #[test]
    fn failure_keeps_previous_snapshot() {
        let mut store = RecordStore::new();
        store.load(snapshot(&[1, 2]));

        let token = store.begin_fetch();
        assert!(store.is_loading());
        let outcome = store.complete_fetch(token, Err(anyhow::anyhow!("connection refused")));
        assert_eq!(outcome, LoadOutcome::Failed);
        assert!(!store.is_loading());
        assert_eq!(store.clusters().len(), 2);
        assert!(store.error().unwrap().contains("connection refused"));
    }

    #[test]
    fn stale_completion_is_discarded() {
        let mut store = RecordStore::new();
        let slow = store.begin_fetch();
        let fast = store.begin_fetch();

        let applied = store.complete_fetch(fast, Ok(snapshot(&[9])));
        assert!(matches!(applied, LoadOutcome::Applied { clusters: 1, .. }));

        let stale = store.complete_fetch(slow, Ok(snapshot(&[1, 2, 3])));
        assert_eq!(stale, LoadOutcome::Stale);
        assert_eq!(store.clusters()[0].cluster_id, ClusterId::from(9));
    }

    #[test]
    fn loading_spans_current_fetch_only() {
        let mut store = RecordStore::new();
        let old = store.begin_fetch();
        let new = store.begin_fetch();
        store.complete_fetch(old, Ok(snapshot(&[1])));
        assert!(store.is_loading());
        store.complete_fetch(new, Ok(snapshot(&[2])));
        assert!(!store.is_loading());
    }

    #[test]
    fn duplicate_ids_keep_first() {
        let mut store = RecordStore::new();
        let mut a = ClusterRecord::new(1);
        a.top_message = "first".into();
        let mut b = ClusterRecord::new(1);
        b.top_message = "second".into();
        let outcome = store.load(Snapshot::new(vec![a, b, ClusterRecord::new(2)], Vec::new()));
        assert_eq!(
            outcome,
            LoadOutcome::Applied {
                clusters: 2,
                map_points: 0,
                duplicates_dropped: 1,
                records_skipped: 0,
            }
        );
        assert_eq!(store.clusters()[0].top_message, "first");
    }

    #[test]
    fn skipped_records_are_reported() {
        let mut store = RecordStore::new();
        let outcome = store.load(snapshot(&[1]).with_skipped(2));
        assert!(matches!(
            outcome,
            LoadOutcome::Applied {
                records_skipped: 2,
                ..
            }
        ));
    }
}

//! The dashboard view-model: one record store, one view state, kept in sync.
//!
//! Every surface (CLI, web API) drives the dashboard through this type so
//! that filter, sort, pagination and selection behave identically
//! everywhere. The store is only ever written through
//! [`Dashboard::complete_fetch`]; user-chosen view state survives refreshes.

use anyhow::{Result, bail};

use crate::model::{ClusterId, ClusterRecord, MessageRecord};
use crate::store::{EnrichedPoint, FetchToken, LoadOutcome, RecordStore, Snapshot, StoreStatus};
use crate::view::filter::{parse_coverage_filter, parse_date_bound, parse_sentiment_filter};
use crate::view::{
    self, FilterState, FocusRequest, SelectionPhase, SelectionSynchronizer, SortKey, SortOrder,
    SortState, TableView, ViewState, paginate,
};

// ---------------------------------------------------------------------------
// Table query
// ---------------------------------------------------------------------------

/// A table request in user-facing text form. CLI flags and web query
/// parameters both decode into this before touching the dashboard.
///
/// Absent filter fields clear that filter; absent `sort`, `page` and
/// `select` leave the current value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableQuery {
    pub sentiment: Option<String>,
    pub coverage: Option<String>,
    pub keyword: Option<String>,
    pub min_score: Option<u8>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub page: Option<usize>,
    pub select: Option<String>,
}

impl TableQuery {
    pub fn filter_state(&self) -> Result<FilterState> {
        let min_resolution_score = self.min_score.unwrap_or(0);
        if min_resolution_score > 5 {
            bail!("minimum resolution score must be between 0 and 5, got {min_resolution_score}");
        }

        let state = FilterState {
            sentiment: parse_sentiment_filter(self.sentiment.as_deref().unwrap_or_default())?,
            keyword: self.keyword.clone().unwrap_or_default(),
            coverage: parse_coverage_filter(self.coverage.as_deref().unwrap_or_default())?,
            min_resolution_score,
            date_from: parse_date_bound(self.date_from.as_deref().unwrap_or_default())?,
            date_to: parse_date_bound(self.date_to.as_deref().unwrap_or_default())?,
            search_text: self.search.clone().unwrap_or_default(),
        };
        Ok(state)
    }

    /// Resolve the requested sort against the current one. A new column
    /// without an explicit order sorts ascending.
    pub fn sort_state(&self, current: SortState) -> Result<SortState> {
        let key = match self.sort.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(raw) => match SortKey::parse(raw) {
                Some(key) => key,
                None => bail!("unknown sort column '{raw}'"),
            },
            None => current.key,
        };
        let order = match self.order.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(raw) => match SortOrder::parse(raw) {
                Some(order) => order,
                None => bail!("unknown sort order '{raw}' (expected asc or desc)"),
            },
            None if key == current.key => current.order,
            None => SortOrder::Asc,
        };
        Ok(SortState::new(key, order))
    }
}

#[derive(Debug, Default)]
pub struct Dashboard {
    store: RecordStore,
    view: ViewState,
    sync: SelectionSynchronizer,
}

impl Dashboard {
    pub fn new(items_per_page: usize, sort: SortState) -> Self {
        Self {
            store: RecordStore::new(),
            view: ViewState::new(items_per_page, sort),
            sync: SelectionSynchronizer::default(),
        }
    }

    // -- Snapshot lifecycle --

    pub fn begin_fetch(&mut self) -> FetchToken {
        self.store.begin_fetch()
    }

    /// Apply a fetch result. When the new snapshot no longer contains the
    /// selected cluster, the selection is cleared.
    pub fn complete_fetch(
        &mut self,
        token: FetchToken,
        result: anyhow::Result<Snapshot>,
    ) -> LoadOutcome {
        let outcome = self.store.complete_fetch(token, result);
        if matches!(outcome, LoadOutcome::Applied { .. }) {
            self.drop_stale_selection();
        }
        outcome
    }

    pub fn load(&mut self, snapshot: Snapshot) -> LoadOutcome {
        let token = self.begin_fetch();
        self.complete_fetch(token, Ok(snapshot))
    }

    fn drop_stale_selection(&mut self) {
        let Some(selected) = &self.view.selection.selected_cluster_id else {
            return;
        };
        if !self.store.contains(selected) {
            self.view.selection.selected_cluster_id = None;
            self.sync.invalidate();
        }
    }

    // -- Read access --

    pub fn clusters(&self) -> &[ClusterRecord] {
        self.store.clusters()
    }

    pub fn map_points(&self) -> &[EnrichedPoint] {
        self.store.map_points()
    }

    pub fn messages(&self) -> &[MessageRecord] {
        self.store.messages()
    }

    pub fn status(&self) -> StoreStatus {
        self.store.status()
    }

    pub fn view_state(&self) -> &ViewState {
        &self.view
    }

    pub fn selection_phase(&self) -> &SelectionPhase {
        self.sync.phase()
    }

    /// Filtered and sorted records.
    pub fn visible(&self) -> Vec<&ClusterRecord> {
        view::visible(self.store.clusters(), &self.view)
    }

    /// Current table page.
    /// Clusters passing the current filters, in snapshot order.
    pub fn filtered(&self) -> Vec<&ClusterRecord> {
        view::filter(self.store.clusters(), &self.view.filter)
    }

    pub fn table(&self) -> TableView<'_> {
        view::derive_table(self.store.clusters(), &self.view)
    }

    // -- View state mutation --

    /// Replace the filters and return to the first page.
    pub fn set_filter(&mut self, filter: FilterState) {
        if self.view.filter != filter {
            self.view.filter = filter;
            self.view.pagination.current_page = 1;
        }
    }

    pub fn set_sort(&mut self, sort: SortState) {
        self.view.sort = sort;
    }

    /// Column-header click.
    pub fn toggle_sort(&mut self, key: SortKey) {
        self.view.sort.toggle_column(key);
    }

    pub fn set_page(&mut self, page: usize) {
        let total = self.total_pages();
        self.view.pagination.jump(page, total);
    }

    pub fn next_page(&mut self) {
        let total = self.total_pages();
        self.view.pagination.next(total);
    }

    pub fn prev_page(&mut self) {
        let total = self.total_pages();
        self.view.pagination.prev(total);
    }

    fn total_pages(&self) -> usize {
        paginate::total_pages(self.visible().len(), self.view.pagination.items_per_page)
    }

    /// Clear filters, selection and paging; the sort is kept.
    pub fn reset_view(&mut self) {
        self.view.filter = FilterState::default();
        self.view.pagination.current_page = 1;
        self.view.selection.selected_cluster_id = None;
        self.sync.invalidate();
    }

    /// Apply a whole table request. Nothing changes unless every part of the
    /// query is valid.
    ///
    /// The page is applied before the selection, so a successful selection
    /// wins over an explicit page.
    pub fn apply_query(&mut self, query: &TableQuery) -> Result<Option<FocusRequest>> {
        let filter = query.filter_state()?;
        let sort = query.sort_state(self.view.sort)?;

        self.set_filter(filter);
        self.set_sort(sort);
        if let Some(page) = query.page {
            self.set_page(page);
        }
        Ok(query
            .select
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .and_then(|id| self.select(ClusterId::from(id))))
    }

    /// Focus `cluster_id` from another view (map point, leaderboard row).
    ///
    /// Returns the scroll-into-view request on success. A cluster hidden by
    /// the current filters, or absent from the snapshot, is silently
    /// ignored.
    pub fn select(&mut self, cluster_id: ClusterId) -> Option<FocusRequest> {
        self.sync.request(cluster_id);
        let rows = view::visible(self.store.clusters(), &self.view);
        self.sync
            .resolve(&rows, &mut self.view.pagination, &mut self.view.selection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Sentiment;

    fn snapshot(n: i64) -> Snapshot {
        let clusters = (0..n)
            .map(|i| {
                let mut c = ClusterRecord::new(i);
                c.sentiment = if i % 2 == 0 {
                    Sentiment::Positive
                } else {
                    Sentiment::Negative
                };
                c
            })
            .collect();
        Snapshot::new(clusters, Vec::new())
    }

    #[test]
    fn selection_jumps_to_page() {
        let mut dash = Dashboard::new(10, SortState::default());
        dash.load(snapshot(25));
        let focus = dash.select(ClusterId::from(17)).unwrap();
        assert_eq!(focus.page, 2);
        assert_eq!(dash.table().page, 2);
        assert!(dash.table().is_selected(&ClusterId::from(17)));
    }

    #[test]
    fn filtered_out_selection_is_ignored() {
        let mut dash = Dashboard::new(10, SortState::default());
        dash.load(snapshot(25));
        dash.set_filter(FilterState {
            sentiment: Some(Sentiment::Positive),
            ..Default::default()
        });
        dash.set_page(2);
        assert!(dash.select(ClusterId::from(17)).is_none());
        assert_eq!(dash.view_state().pagination.current_page, 2);
        assert_eq!(dash.view_state().selection.selected_cluster_id, None);
    }

    #[test]
    fn filtered_keeps_snapshot_order_regardless_of_sort() {
        let mut dash = Dashboard::new(10, SortState::default());
        dash.load(snapshot(6));
        dash.apply_query(&TableQuery {
            sentiment: Some("negative".into()),
            sort: Some("cluster-id".into()),
            order: Some("desc".into()),
            ..TableQuery::default()
        })
        .unwrap();

        let ids: Vec<_> = dash.filtered().iter().map(|c| c.cluster_id.clone()).collect();
        assert_eq!(
            ids,
            vec![ClusterId::from(1), ClusterId::from(3), ClusterId::from(5)]
        );
        assert_eq!(dash.visible()[0].cluster_id, ClusterId::from(5));
    }

    #[test]
    fn refresh_preserves_view_state_but_drops_vanished_selection() {
        let mut dash = Dashboard::new(5, SortState::new(SortKey::ClusterId, SortOrder::Desc));
        dash.load(snapshot(25));
        dash.select(ClusterId::from(3));
        let page = dash.view_state().pagination.current_page;

        dash.load(snapshot(25));
        assert_eq!(dash.view_state().pagination.current_page, page);
        assert_eq!(
            dash.view_state().selection.selected_cluster_id,
            Some(ClusterId::from(3))
        );

        dash.load(snapshot(2));
        assert_eq!(dash.view_state().selection.selected_cluster_id, None);
        assert_eq!(dash.selection_phase(), &SelectionPhase::Idle);
        assert_eq!(dash.view_state().sort.order, SortOrder::Desc);
    }

    #[test]
    fn failed_refresh_keeps_table() {
        let mut dash = Dashboard::new(10, SortState::default());
        dash.load(snapshot(4));
        let token = dash.begin_fetch();
        dash.complete_fetch(token, Err(anyhow::anyhow!("timeout")));
        assert_eq!(dash.table().rows.len(), 4);
        assert!(dash.status().error.is_some());
    }

    #[test]
    fn query_applies_filter_sort_page_and_selection() {
        let mut dash = Dashboard::new(5, SortState::default());
        dash.load(snapshot(25));

        let query = TableQuery {
            sentiment: Some("positive".into()),
            sort: Some("cluster-id".into()),
            order: Some("desc".into()),
            page: Some(2),
            ..Default::default()
        };
        assert!(dash.apply_query(&query).unwrap().is_none());
        let table = dash.table();
        assert_eq!(table.filtered_count, 13);
        assert_eq!(table.page, 2);
        assert_eq!(table.rows[0].cluster_id, ClusterId::from(14));

        let select = TableQuery {
            sentiment: Some("positive".into()),
            select: Some("0".into()),
            ..Default::default()
        };
        let focus = dash.apply_query(&select).unwrap().unwrap();
        assert_eq!(focus.page, 3);
        assert_eq!(dash.view_state().sort.order, SortOrder::Desc);
    }

    #[test]
    fn invalid_query_changes_nothing() {
        let mut dash = Dashboard::new(5, SortState::default());
        dash.load(snapshot(25));
        dash.set_page(3);

        let bad = TableQuery {
            coverage: Some("sideways".into()),
            page: Some(1),
            ..Default::default()
        };
        assert!(dash.apply_query(&bad).is_err());
        assert_eq!(dash.view_state().pagination.current_page, 3);

        let bad_score = TableQuery {
            min_score: Some(9),
            ..Default::default()
        };
        assert!(bad_score.filter_state().is_err());
        let bad_sort = TableQuery {
            sort: Some("nope".into()),
            ..Default::default()
        };
        assert!(bad_sort.sort_state(SortState::default()).is_err());
    }

    #[test]
    fn filter_change_resets_page() {
        let mut dash = Dashboard::new(5, SortState::default());
        dash.load(snapshot(25));
        dash.next_page();
        dash.next_page();
        assert_eq!(dash.view_state().pagination.current_page, 3);
        dash.set_filter(FilterState {
            search_text: "x".into(),
            ..Default::default()
        });
        assert_eq!(dash.view_state().pagination.current_page, 1);
    }
}

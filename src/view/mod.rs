//! Table view derivation: filter → sort → paginate, plus selection sync.
//!
//! The engines are pure functions over borrowed records; [`ViewState`] owns
//! the user's choices and [`derive_table`] turns a record slice plus that
//! state into the rows of one table page.

pub mod filter;
pub mod paginate;
pub mod selection;
pub mod sort;

use serde::Serialize;

use crate::model::{ClusterId, ClusterRecord};

pub use filter::{FilterState, filter};
pub use paginate::{DEFAULT_ITEMS_PER_PAGE, Page, PaginationState, paginate};
pub use selection::{FocusRequest, SelectionPhase, SelectionState, SelectionSynchronizer};
pub use sort::{SortKey, SortOrder, SortState, sort_records};

/// Everything the user chose about the table. Not persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ViewState {
    pub filter: FilterState,
    pub sort: SortState,
    pub pagination: PaginationState,
    pub selection: SelectionState,
}

impl ViewState {
    pub fn new(items_per_page: usize, sort: SortState) -> Self {
        Self {
            filter: FilterState::default(),
            sort,
            pagination: PaginationState::new(items_per_page),
            selection: SelectionState::default(),
        }
    }
}

/// Filtered then sorted records, in display order.
pub fn visible<'a>(clusters: &'a [ClusterRecord], state: &ViewState) -> Vec<&'a ClusterRecord> {
    let mut rows = filter(clusters, &state.filter);
    sort_records(&mut rows, state.sort);
    rows
}

/// One rendered page of the cluster table.
#[derive(Debug, Clone, Serialize)]
pub struct TableView<'a> {
    pub rows: Vec<&'a ClusterRecord>,
    pub page: usize,
    pub total_pages: usize,
    /// Records passing the filters.
    pub filtered_count: usize,
    /// Records in the snapshot.
    pub total_count: usize,
    pub items_per_page: usize,
    pub sort: SortState,
    pub selected_cluster_id: Option<&'a ClusterId>,
}

impl TableView<'_> {
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    /// Whether `cluster_id` is the highlighted row.
    pub fn is_selected(&self, cluster_id: &ClusterId) -> bool {
        self.selected_cluster_id == Some(cluster_id)
    }
}

/// Build the current table page. The requested page is clamped, never an
/// error.
pub fn derive_table<'a>(clusters: &'a [ClusterRecord], state: &'a ViewState) -> TableView<'a> {
    let rows = visible(clusters, state);
    let page = paginate(
        &rows,
        state.pagination.current_page,
        state.pagination.items_per_page,
    );

    TableView {
        rows: page.items.to_vec(),
        page: page.page,
        total_pages: page.total_pages,
        filtered_count: page.total_count,
        total_count: clusters.len(),
        items_per_page: page.items_per_page,
        sort: state.sort,
        selected_cluster_id: state.selection.selected_cluster_id.as_ref(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Coverage, Sentiment};

    fn clusters() -> Vec<ClusterRecord> {
        (1..=23)
            .map(|i| {
                let mut c = ClusterRecord::new(i as i64);
                c.message_count = (i % 5) as u64;
                c.sentiment = if i % 2 == 0 {
                    Sentiment::Positive
                } else {
                    Sentiment::Negative
                };
                c.coverage = Coverage::Fully;
                c
            })
            .collect()
    }

    #[test]
    fn derive_table_filters_sorts_and_pages() {
        let data = clusters();
        let mut state = ViewState::new(5, SortState::new(SortKey::MessageCount, SortOrder::Desc));
        state.filter.sentiment = Some(Sentiment::Positive);
        state.pagination.current_page = 9;

        let table = derive_table(&data, &state);
        assert_eq!(table.filtered_count, 11);
        assert_eq!(table.total_count, 23);
        assert_eq!(table.total_pages, 3);
        assert_eq!(table.page, 3);
        assert!(table.has_prev());
        assert!(!table.has_next());
        assert!(table.rows.iter().all(|r| r.sentiment == Sentiment::Positive));
    }

    #[test]
    fn visible_is_sorted_subsequence() {
        let data = clusters();
        let state = ViewState::new(10, SortState::new(SortKey::MessageCount, SortOrder::Asc));
        let rows = visible(&data, &state);
        assert_eq!(rows.len(), 23);
        assert!(rows.windows(2).all(|w| w[0].message_count <= w[1].message_count));
    }
}

//! Cross-view selection: map point or leaderboard row → table row.
//!
//! A selection only succeeds when the target is visible under the active
//! filters. A miss is silent and leaves the current page and selection
//! exactly as they were.

use serde::Serialize;

use crate::model::{ClusterId, ClusterRecord};

use super::paginate::PaginationState;

/// The cluster currently highlighted in the table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectionState {
    pub selected_cluster_id: Option<ClusterId>,
}

/// Instruction for the table to show and scroll to one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FocusRequest {
    pub cluster_id: ClusterId,
    /// 1-based page holding the row.
    pub page: usize,
    /// 0-based row within that page.
    pub row_in_page: usize,
    /// 0-based position within the filtered, sorted sequence.
    pub index: usize,
}

/// Synchronizer phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SelectionPhase {
    #[default]
    Idle,
    Resolving(ClusterId),
    Focused(FocusRequest),
}

/// Where `cluster_id` sits in `sorted`, paged by `items_per_page`.
pub fn locate(
    sorted: &[&ClusterRecord],
    cluster_id: &ClusterId,
    items_per_page: usize,
) -> Option<FocusRequest> {
    let per_page = items_per_page.max(1);
    let index = sorted.iter().position(|r| &r.cluster_id == cluster_id)?;
    Some(FocusRequest {
        cluster_id: cluster_id.clone(),
        page: index / per_page + 1,
        row_in_page: index % per_page,
        index,
    })
}

/// Three-state selection machine: `Idle → Resolving → Focused | Idle`.
#[derive(Debug, Default)]
pub struct SelectionSynchronizer {
    phase: SelectionPhase,
}

impl SelectionSynchronizer {
    pub fn phase(&self) -> &SelectionPhase {
        &self.phase
    }

    /// The last successful focus, while still focused.
    pub fn focus(&self) -> Option<&FocusRequest> {
        match &self.phase {
            SelectionPhase::Focused(focus) => Some(focus),
            _ => None,
        }
    }

    /// A view activated `cluster_id`. Any previous focus is dropped.
    pub fn request(&mut self, cluster_id: ClusterId) {
        self.phase = SelectionPhase::Resolving(cluster_id);
    }

    /// Resolve a pending request against the visible sequence.
    ///
    /// On success the page jumps to the row and the selection is updated. On
    /// a miss the machine returns to `Idle` without touching either.
    pub fn resolve(
        &mut self,
        sorted: &[&ClusterRecord],
        pagination: &mut PaginationState,
        selection: &mut SelectionState,
    ) -> Option<FocusRequest> {
        let SelectionPhase::Resolving(cluster_id) = std::mem::take(&mut self.phase) else {
            return None;
        };

        let focus = locate(sorted, &cluster_id, pagination.items_per_page)?;
        pagination.current_page = focus.page;
        selection.selected_cluster_id = Some(cluster_id);
        self.phase = SelectionPhase::Focused(focus.clone());
        Some(focus)
    }

    /// A new snapshot no longer contains the focused cluster.
    pub fn invalidate(&mut self) {
        self.phase = SelectionPhase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clusters(n: usize) -> Vec<ClusterRecord> {
        (0..n).map(|i| ClusterRecord::new(i as i64)).collect()
    }

    #[test]
    fn index_17_of_25_lands_on_page_2() {
        let data = clusters(25);
        let sorted: Vec<&ClusterRecord> = data.iter().collect();
        let mut sync = SelectionSynchronizer::default();
        let mut pagination = PaginationState::new(10);
        let mut selection = SelectionState::default();

        sync.request(ClusterId::from(17));
        assert!(matches!(sync.phase(), SelectionPhase::Resolving(_)));

        let focus = sync
            .resolve(&sorted, &mut pagination, &mut selection)
            .unwrap();
        assert_eq!(focus.page, 2);
        assert_eq!(focus.row_in_page, 7);
        assert_eq!(pagination.current_page, 2);
        assert_eq!(selection.selected_cluster_id, Some(ClusterId::from(17)));
        assert!(sync.focus().is_some());
    }

    #[test]
    fn miss_leaves_state_untouched() {
        let data = clusters(25);
        let sorted: Vec<&ClusterRecord> = data.iter().collect();
        let mut sync = SelectionSynchronizer::default();
        let mut pagination = PaginationState::new(10);
        pagination.current_page = 3;
        let mut selection = SelectionState {
            selected_cluster_id: Some(ClusterId::from(21)),
        };

        sync.request(ClusterId::from(99));
        assert!(sync.resolve(&sorted, &mut pagination, &mut selection).is_none());
        assert_eq!(sync.phase(), &SelectionPhase::Idle);
        assert_eq!(pagination.current_page, 3);
        assert_eq!(selection.selected_cluster_id, Some(ClusterId::from(21)));
    }

    #[test]
    fn resolve_without_request_is_noop() {
        let data = clusters(3);
        let sorted: Vec<&ClusterRecord> = data.iter().collect();
        let mut sync = SelectionSynchronizer::default();
        let mut pagination = PaginationState::new(10);
        let mut selection = SelectionState::default();
        assert!(sync.resolve(&sorted, &mut pagination, &mut selection).is_none());
        assert_eq!(sync.phase(), &SelectionPhase::Idle);
    }

    #[test]
    fn invalidate_returns_to_idle() {
        let data = clusters(3);
        let sorted: Vec<&ClusterRecord> = data.iter().collect();
        let mut sync = SelectionSynchronizer::default();
        let mut pagination = PaginationState::new(2);
        let mut selection = SelectionState::default();
        sync.request(ClusterId::from(2));
        sync.resolve(&sorted, &mut pagination, &mut selection);
        assert_eq!(pagination.current_page, 2);
        sync.invalidate();
        assert_eq!(sync.phase(), &SelectionPhase::Idle);
    }
}

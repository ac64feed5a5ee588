/// Dashboard lifecycle tests.
///
/// Drives fetch tokens, refreshes and view-state preservation through the
/// same `Dashboard` type the CLI and the web server use.
use clusterboard::dashboard::{Dashboard, TableQuery};
use clusterboard::model::{ClusterId, ClusterRecord, Sentiment};
use clusterboard::store::{LoadOutcome, Snapshot};
use clusterboard::view::{SortKey, SortOrder, SortState};

fn snapshot(ids: impl IntoIterator<Item = i64>) -> Snapshot {
    let clusters = ids
        .into_iter()
        .map(|i| {
            let mut c = ClusterRecord::new(i);
            c.sentiment = if i % 2 == 0 {
                Sentiment::Positive
            } else {
                Sentiment::Negative
            };
            c.message_count = i as u64;
            c
        })
        .collect();
    Snapshot::new(clusters, Vec::new())
}

#[test]
fn last_started_fetch_wins() {
    let mut dash = Dashboard::new(10, SortState::default());
    let first = dash.begin_fetch();
    let second = dash.begin_fetch();

    assert!(matches!(
        dash.complete_fetch(second, Ok(snapshot(0..3))),
        LoadOutcome::Applied { clusters: 3, .. }
    ));
    assert_eq!(
        dash.complete_fetch(first, Ok(snapshot(0..50))),
        LoadOutcome::Stale
    );
    assert_eq!(dash.clusters().len(), 3);
    assert!(!dash.status().loading);
    assert_eq!(dash.status().last_token, Some(second.value()));
}

#[test]
fn loading_flag_tracks_the_current_fetch() {
    let mut dash = Dashboard::new(10, SortState::default());
    let token = dash.begin_fetch();
    assert!(dash.status().loading);
    assert!(!dash.status().has_data);

    dash.complete_fetch(token, Err(anyhow::anyhow!("connection refused")));
    let status = dash.status();
    assert!(!status.loading);
    assert!(status.error.unwrap().contains("connection refused"));
    assert!(dash.table().rows.is_empty());
}

#[test]
fn refresh_keeps_user_choices() {
    let mut dash = Dashboard::new(5, SortState::default());
    dash.load(snapshot(0..30));
    dash.apply_query(&TableQuery {
        sentiment: Some("negative".into()),
        sort: Some("message_count".into()),
        order: Some("desc".into()),
        page: Some(2),
        ..Default::default()
    })
    .unwrap();
    let before = dash.view_state().clone();

    dash.load(snapshot(0..30));
    assert_eq!(dash.view_state(), &before);

    let table = dash.table();
    assert_eq!(table.page, 2);
    assert_eq!(table.sort, SortState::new(SortKey::MessageCount, SortOrder::Desc));
    assert_eq!(table.rows[0].cluster_id, ClusterId::from(19));
}

#[test]
fn duplicate_ids_keep_the_first_record() {
    let mut dash = Dashboard::new(10, SortState::default());
    let mut snap = snapshot([1, 2, 2, 3]);
    snap.clusters[2].top_message = "second copy".into();

    match dash.load(snap) {
        LoadOutcome::Applied {
            clusters,
            duplicates_dropped,
            ..
        } => {
            assert_eq!(clusters, 3);
            assert_eq!(duplicates_dropped, 1);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(dash.clusters().iter().all(|c| c.top_message != "second copy"));
}

#[test]
fn refresh_that_drops_selected_cluster_clears_selection() {
    let mut dash = Dashboard::new(10, SortState::default());
    dash.load(snapshot(0..25));
    assert!(dash.select(ClusterId::from(21)).is_some());

    dash.load(snapshot(0..20));
    assert_eq!(dash.view_state().selection.selected_cluster_id, None);
    assert!(dash.table().selected_cluster_id.is_none());
}

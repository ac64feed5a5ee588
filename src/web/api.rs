//! JSON API handlers for the web dashboard.
//!
//! Each handler corresponds to an API endpoint and returns an
//! [`HttpResponse`] with JSON content. Handlers never hold the dashboard
//! lock across a backend call.

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use tiny_http::{Response, StatusCode};

use crate::analytics::aggregate;
use crate::dashboard::{Dashboard, TableQuery};
use crate::model::{ClusterId, ClusterRecord};
use crate::store::StoreStatus;
use crate::view::{FocusRequest, TableView};

use super::{HttpResponse, WebState, content_type_json, json_status};

// ---------------------------------------------------------------------------
// JSON response types
// ---------------------------------------------------------------------------

/// Table API response: the current page plus where a selection landed.
#[derive(Serialize)]
struct TableResponse<'a> {
    table: TableView<'a>,
    focus: Option<FocusRequest>,
    status: StoreStatus,
}

/// Session API response.
#[derive(Serialize)]
struct SessionResponse<'a> {
    logged_in: bool,
    username: &'a str,
    is_admin: bool,
    login_url: &'a str,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a JSON success response.
fn json_response<T: Serialize>(data: &T) -> Result<HttpResponse> {
    let body = serde_json::to_string(data).context("failed to serialize JSON response")?;
    Ok(Response::from_data(body.into_bytes())
        .with_header(content_type_json())
        .with_status_code(StatusCode(200)))
}

fn bad_request(message: impl std::fmt::Display) -> HttpResponse {
    json_status(400, &serde_json::json!({ "error": message.to_string() }))
}

/// Decoded `key=value` pairs of the URL's query string.
fn query_params(url: &str) -> Vec<(String, String)> {
    let Some((_, query)) = url.split_once('?') else {
        return Vec::new();
    };
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            (percent_decode(k), percent_decode(v))
        })
        .collect()
}

/// Last value of `key`, if present and non-empty.
fn param(params: &[(String, String)], key: &str) -> Option<String> {
    params
        .iter()
        .rev()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.clone())
        .filter(|v| !v.is_empty())
}

/// Decode `%XX` escapes and `+` as space. Malformed escapes pass through.
fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                let hex = (
                    (bytes[i + 1] as char).to_digit(16),
                    (bytes[i + 2] as char).to_digit(16),
                );
                if let (Some(hi), Some(lo)) = hex {
                    out.push(((hi << 4) + lo) as u8);
                    i += 3;
                    continue;
                }
                out.push(b'%');
            }
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Which clusters a summary covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    All,
    /// Only clusters passing the table's current filters.
    Filtered,
}

fn scope(url: &str) -> Result<Scope, HttpResponse> {
    match param(&query_params(url), "scope").as_deref() {
        None | Some("all") => Ok(Scope::All),
        Some("filtered") => Ok(Scope::Filtered),
        Some(other) => Err(bad_request(format!(
            "unknown scope '{other}' (expected all or filtered)"
        ))),
    }
}

/// Clusters a summary runs over.
fn scoped<'a>(dash: &'a Dashboard, scope: Scope) -> Vec<&'a ClusterRecord> {
    match scope {
        Scope::All => dash.clusters().iter().collect(),
        Scope::Filtered => dash.filtered(),
    }
}

/// Decode a table request from query parameters.
fn table_query(params: &[(String, String)]) -> Result<TableQuery> {
    let min_score = param(params, "min_score")
        .map(|v| v.parse::<u8>())
        .transpose()
        .context("min_score must be a number between 0 and 5")?;
    let page = param(params, "page")
        .map(|v| v.parse::<usize>())
        .transpose()
        .context("page must be a positive number")?;

    Ok(TableQuery {
        sentiment: param(params, "sentiment"),
        coverage: param(params, "coverage"),
        keyword: param(params, "keyword"),
        min_score,
        date_from: param(params, "date_from"),
        date_to: param(params, "date_to"),
        search: param(params, "search"),
        sort: param(params, "sort"),
        order: param(params, "order"),
        page,
        select: param(params, "select"),
    })
}

// ---------------------------------------------------------------------------
// API Handlers
// ---------------------------------------------------------------------------

/// `GET /api/table?sentiment=&coverage=&keyword=&min_score=&date_from=&date_to=&search=&sort=&order=&page=&select=`
///
/// The query replaces the filters; an invalid query answers 400 and leaves
/// the view untouched.
pub fn get_table(state: &WebState, url: &str) -> Result<HttpResponse> {
    let params = query_params(url);
    let query = match table_query(&params) {
        Ok(query) => query,
        Err(err) => return Ok(bad_request(format!("{err:#}"))),
    };

    let mut dash = state.dashboard()?;
    let focus = match dash.apply_query(&query) {
        Ok(focus) => focus,
        Err(err) => return Ok(bad_request(err)),
    };

    json_response(&TableResponse {
        table: dash.table(),
        focus,
        status: dash.status(),
    })
}

/// `POST /api/select?cluster_id=N` — focus a cluster picked on the map or
/// another view. A cluster hidden by the filters is ignored.
pub fn post_select(state: &WebState, url: &str) -> Result<HttpResponse> {
    let params = query_params(url);
    let Some(id) = param(&params, "cluster_id") else {
        return Ok(bad_request("missing cluster_id"));
    };

    let mut dash = state.dashboard()?;
    let focus = dash.select(ClusterId::new(id));
    json_response(&TableResponse {
        table: dash.table(),
        focus,
        status: dash.status(),
    })
}

/// `GET /api/stats?scope=all|filtered` — coverage, sentiment, resolution
/// and mismatch overview.
pub fn get_stats(state: &WebState, url: &str) -> Result<HttpResponse> {
    let scope = match scope(url) {
        Ok(scope) => scope,
        Err(resp) => return Ok(resp),
    };
    let view = state.view_config();
    let dash = state.dashboard()?;
    let overview = aggregate::overview(
        scoped(&dash, scope),
        view.top_questions,
        view.mismatch_similarity_threshold,
    );
    json_response(&overview)
}

/// `GET /api/gaps?scope=all|filtered` — topic gaps from the snapshot plus
/// the backend's process gaps. A failing process-gaps endpoint leaves that
/// list empty and reports the error alongside the topic gaps.
pub fn get_gaps(state: &WebState, url: &str) -> Result<HttpResponse> {
    let scope = match scope(url) {
        Ok(scope) => scope,
        Err(resp) => return Ok(resp),
    };
    let topic_gaps = {
        let dash = state.dashboard()?;
        aggregate::topic_gaps(scoped(&dash, scope))
    };
    let (process_gaps, process_gaps_error) = state.client().process_gaps_or_empty()?;
    if let Some(err) = &process_gaps_error {
        eprintln!("{} process gaps unavailable: {err}", "warning:".yellow().bold());
    }
    json_response(&serde_json::json!({
        "topic_gaps": topic_gaps,
        "process_gaps": process_gaps,
        "process_gaps_error": process_gaps_error,
    }))
}

/// `GET /api/timeline?by_author=1` — daily message sentiment.
pub fn get_timeline(state: &WebState, url: &str) -> Result<HttpResponse> {
    let params = query_params(url);
    let by_author = param(&params, "by_author")
        .is_some_and(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"));
    let dash = state.dashboard()?;
    json_response(&aggregate::sentiment_timeline(dash.messages(), by_author))
}

/// `GET /api/suggestions?scope=all|filtered` — suggested FAQ entries.
pub fn get_suggestions(state: &WebState, url: &str) -> Result<HttpResponse> {
    let scope = match scope(url) {
        Ok(scope) => scope,
        Err(resp) => return Ok(resp),
    };
    let dash = state.dashboard()?;
    json_response(&aggregate::faq_candidates(scoped(&dash, scope)))
}

/// `GET /api/map` — enriched map points grouped into colored series.
pub fn get_map(state: &WebState) -> Result<HttpResponse> {
    let dash = state.dashboard()?;
    json_response(&aggregate::map_series(dash.map_points()))
}

/// `GET /api/session` — who is logged in and what they may do.
pub fn get_session(state: &WebState) -> Result<HttpResponse> {
    let session = state.session();
    json_response(&SessionResponse {
        logged_in: session.is_some(),
        username: session.map(|s| s.username.as_str()).unwrap_or_default(),
        is_admin: session.is_some_and(|s| s.capabilities.is_admin),
        login_url: state.client().login_url(),
    })
}

/// `GET /api/status` — loading flag, last error and last fetch token.
pub fn get_status(state: &WebState) -> Result<HttpResponse> {
    let status = state.dashboard()?.status();
    json_response(&status)
}

/// `POST /api/refresh` — start a background refresh. Answers 202 with the
/// fetch token; poll `/api/status` to see it land.
pub fn post_refresh(state: &WebState) -> Result<HttpResponse> {
    let token = state.spawn_refresh()?;
    Ok(json_status(
        202,
        &serde_json::json!({ "refreshing": true, "token": token.value() }),
    ))
}

/// `POST /api/trigger-pipeline` — admin only; 403 for everyone else.
pub fn post_trigger_pipeline(state: &WebState) -> Result<HttpResponse> {
    let capabilities = state
        .session()
        .map(|s| s.capabilities)
        .unwrap_or_default();
    if !capabilities.is_admin {
        return Ok(json_status(403, &serde_json::json!({ "error": "Forbidden" })));
    }

    let status = state.client().trigger_pipeline(capabilities)?;
    json_response(&status)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io::Read;

    use tiny_http::Method;

    use super::super::dispatch;
    use super::super::tests::state;
    use super::*;
    use crate::model::{ClusterRecord, Coverage, MapPoint, Sentiment};
    use crate::store::Snapshot;

    fn loaded(is_admin: bool) -> WebState {
        let state = state(is_admin);
        let clusters = (0..25)
            .map(|i| {
                let mut c = ClusterRecord::new(i);
                c.sentiment = if i % 2 == 0 {
                    Sentiment::Positive
                } else {
                    Sentiment::Negative
                };
                c.coverage = if i < 5 { Coverage::Not } else { Coverage::Fully };
                c.top_message = format!("question {i}");
                c
            })
            .collect();
        let points = vec![
            MapPoint {
                x: 0.5,
                y: 1.5,
                label: ClusterId::from(3),
            },
            MapPoint {
                x: 2.0,
                y: -1.0,
                label: ClusterId::from(99),
            },
        ];
        state
            .dashboard()
            .unwrap()
            .load(Snapshot::new(clusters, points));
        state
    }

    fn body(resp: HttpResponse) -> (u16, serde_json::Value) {
        let code = resp.status_code().0;
        let mut text = String::new();
        resp.into_reader().read_to_string(&mut text).unwrap();
        (code, serde_json::from_str(&text).unwrap())
    }

    fn call(state: &WebState, method: Method, url: &str) -> (u16, serde_json::Value) {
        body(dispatch(state, &method, url).unwrap())
    }

    #[test]
    fn query_params_are_decoded() {
        let params = query_params("/api/table?search=reset+my%20password&page=2&empty=");
        assert_eq!(param(&params, "search").as_deref(), Some("reset my password"));
        assert_eq!(param(&params, "page").as_deref(), Some("2"));
        assert_eq!(param(&params, "empty"), None);
        assert_eq!(param(&params, "missing"), None);
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("%zz"), "%zz");
    }

    #[test]
    fn table_applies_filters_and_paging() {
        let state = loaded(false);
        let (code, json) = call(&state, Method::Get, "/api/table?sentiment=positive&page=2");
        assert_eq!(code, 200);
        assert_eq!(json["table"]["filtered_count"], 13);
        assert_eq!(json["table"]["total_count"], 25);
        assert_eq!(json["table"]["page"], 2);
        assert_eq!(json["table"]["rows"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn invalid_table_query_is_400_and_keeps_view() {
        let state = loaded(false);
        call(&state, Method::Get, "/api/table?page=3");

        let (code, json) = call(&state, Method::Get, "/api/table?coverage=sideways&page=1");
        assert_eq!(code, 400);
        assert!(json["error"].as_str().unwrap().contains("sideways"));
        assert_eq!(
            state.dashboard().unwrap().view_state().pagination.current_page,
            3
        );

        let (code, _) = call(&state, Method::Get, "/api/table?min_score=lots");
        assert_eq!(code, 400);
    }

    #[test]
    fn select_jumps_to_the_clusters_page() {
        let state = loaded(false);
        let (code, json) = call(&state, Method::Post, "/api/select?cluster_id=17");
        assert_eq!(code, 200);
        assert_eq!(json["focus"]["page"], 2);
        assert_eq!(json["table"]["selected_cluster_id"], "17");

        let (_, json) = call(&state, Method::Post, "/api/select?cluster_id=404");
        assert!(json["focus"].is_null());
        assert_eq!(json["table"]["page"], 2);

        let (code, _) = call(&state, Method::Post, "/api/select");
        assert_eq!(code, 400);
    }

    #[test]
    fn stats_and_suggestions_reflect_snapshot() {
        let state = loaded(false);
        let (code, json) = call(&state, Method::Get, "/api/stats");
        assert_eq!(code, 200);
        assert_eq!(json["total_clusters"], 25);
        assert_eq!(json["coverage"]["not"], 5);

        let (code, json) = call(&state, Method::Get, "/api/suggestions");
        assert_eq!(code, 200);
        assert!(json.as_array().unwrap().is_empty());
    }

    #[test]
    fn stats_follow_the_requested_scope() {
        let state = loaded(false);
        call(&state, Method::Get, "/api/table?coverage=not");

        let (_, json) = call(&state, Method::Get, "/api/stats?scope=filtered");
        assert_eq!(json["total_clusters"], 5);
        assert_eq!(json["coverage"]["not"], 5);
        assert_eq!(json["coverage"]["fully"], 0);

        let (_, json) = call(&state, Method::Get, "/api/stats");
        assert_eq!(json["total_clusters"], 25);

        let (_, json) = call(&state, Method::Get, "/api/gaps?scope=filtered");
        assert_eq!(json["topic_gaps"][0]["count"], 5);

        let (code, json) = call(&state, Method::Get, "/api/stats?scope=sideways");
        assert_eq!(code, 400);
        assert!(json["error"].as_str().unwrap().contains("sideways"));
    }

    #[test]
    fn map_groups_points_per_label() {
        let state = loaded(false);
        let (code, json) = call(&state, Method::Get, "/api/map");
        assert_eq!(code, 200);
        let series = json.as_array().unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0]["hue"], 0);
        assert_eq!(series[1]["hue"], 67);
    }

    #[test]
    fn trigger_requires_admin() {
        let (code, json) = call(&loaded(false), Method::Post, "/api/trigger-pipeline");
        assert_eq!(code, 403);
        assert_eq!(json["error"], "Forbidden");
    }

    #[test]
    fn session_and_status_report_state() {
        let state = loaded(true);
        let (_, json) = call(&state, Method::Get, "/api/session");
        assert_eq!(json["logged_in"], true);
        assert_eq!(json["is_admin"], true);
        assert_eq!(json["username"], "ops");

        let (_, json) = call(&state, Method::Get, "/api/status");
        assert_eq!(json["loading"], false);
        assert_eq!(json["has_data"], true);
        assert_eq!(json["last_token"], 1);
    }
}

//! HTTP client for the FAQ clustering backend.
//!
//! Talks to the Django backend with the synchronous `ureq` client. Every
//! request carries the configured timeout and, when set, an
//! `Authorization: Token ...` header. Every call is recorded in the fetch
//! log, successful or not.
//!
//! Authentication failures surface as [`AuthRequired`]; calling an
//! admin-only endpoint without the capability surfaces as [`Forbidden`].

pub mod error;
pub mod wire;

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::analytics::logger::{FetchLog, FetchLogEntry};
use crate::config::schema::BackendConfig;
use crate::model::MessageRecord;
use crate::store::Snapshot;

pub use error::{AuthRequired, Forbidden};
pub use wire::{
    ClustersResponse, CurrentUser, DeflectionResponse, Direction, FaqPerformance,
    LeaderboardEntry, LeaderboardResponse, MessagesResponse, PipelineStatus, ProcessGap,
    ProcessGapsResponse, TrendPoint,
};

// ---------------------------------------------------------------------------
// Endpoints
// ---------------------------------------------------------------------------

pub const CLUSTERS: &str = "/api/faq/clusters/";
pub const PROCESS_GAPS: &str = "/api/faq/top-process-gaps/";
pub const LEADERBOARD: &str = "/api/faq/trending-leaderboard/";
pub const DEFLECTION: &str = "/api/faq/deflection-metrics/";
pub const MESSAGES: &str = "/api/faq/messages/";
pub const CURRENT_USER: &str = "/api/me/";
pub const TRIGGER_PIPELINE: &str = "/api/trigger-pipeline/";

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// What the current session may do. Resolved once from `/api/me/`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub is_admin: bool,
}

/// The authenticated user and their capabilities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Session {
    pub username: String,
    pub capabilities: Capabilities,
}

impl From<CurrentUser> for Session {
    fn from(user: CurrentUser) -> Self {
        Self {
            username: user.username,
            capabilities: Capabilities {
                is_admin: user.is_admin,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Synchronous backend client. Cheap to clone; clones share one connection
/// pool.
#[derive(Debug, Clone)]
pub struct BackendClient {
    agent: ureq::Agent,
    config: BackendConfig,
    log: FetchLog,
}

impl BackendClient {
    /// Build a client from the resolved `[backend]` section.
    pub fn from_config(config: &BackendConfig, log: FetchLog) -> Result<Self> {
        if config.base_url.trim().is_empty() {
            anyhow::bail!("backend.base_url is not set");
        }
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_millis(config.timeout_ms.max(1)))
            .build();
        Ok(Self {
            agent,
            config: config.clone(),
            log,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn login_url(&self) -> &str {
        &self.config.login_url
    }

    // -- Dashboard data --

    /// Clusters and their 2D map projection.
    pub fn clusters(&self) -> Result<ClustersResponse> {
        self.get_json(CLUSTERS, |r: &ClustersResponse| Some(r.clusters.len()))
    }

    /// Raw messages for the sentiment timeline, ordered by creation time.
    pub fn messages(&self) -> Result<Vec<MessageRecord>> {
        self.messages_response().map(MessagesResponse::into_messages)
    }

    fn messages_response(&self) -> Result<MessagesResponse> {
        self.get_json(MESSAGES, |r: &MessagesResponse| Some(r.messages.len()))
    }

    /// Process gaps, or an empty list plus the error text when the endpoint
    /// fails. Authentication failures still propagate.
    pub fn process_gaps_or_empty(&self) -> Result<(Vec<ProcessGap>, Option<String>)> {
        or_empty(self.process_gaps())
    }

    pub fn process_gaps(&self) -> Result<Vec<ProcessGap>> {
        self.get_json(PROCESS_GAPS, |r: &ProcessGapsResponse| {
            Some(r.process_gaps.len())
        })
        .map(|r| r.process_gaps)
    }

    pub fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>> {
        self.get_json(LEADERBOARD, |r: &LeaderboardResponse| {
            Some(r.leaderboard.len())
        })
        .map(|r| r.leaderboard)
    }

    pub fn deflection_metrics(&self) -> Result<Vec<FaqPerformance>> {
        self.get_json(DEFLECTION, |r: &DeflectionResponse| {
            Some(r.faq_performance.len())
        })
        .map(|r| r.faq_performance)
    }

    /// Fetch everything the record store holds. Messages are optional
    /// because only the timeline needs them.
    pub fn fetch_snapshot(&self, include_messages: bool) -> Result<Snapshot> {
        let clusters = self.clusters()?;
        let mut skipped = clusters.skipped;
        let mut snapshot = Snapshot::new(clusters.clusters, clusters.cluster_map);
        if include_messages {
            let messages = self.messages_response()?;
            skipped += messages.skipped;
            snapshot = snapshot.with_messages(messages.messages);
        }
        Ok(snapshot.with_skipped(skipped))
    }

    // -- Session --

    pub fn current_user(&self) -> Result<CurrentUser> {
        self.get_json(CURRENT_USER, |_: &CurrentUser| None)
    }

    /// Resolve the session's capabilities.
    pub fn session(&self) -> Result<Session> {
        self.current_user().map(Session::from)
    }

    /// Ask the backend to rerun the clustering pipeline. Fire-and-forget:
    /// the returned status only acknowledges the request.
    ///
    /// Refused locally without the admin capability, so no request is sent.
    pub fn trigger_pipeline(&self, capabilities: Capabilities) -> Result<PipelineStatus> {
        if !capabilities.is_admin {
            return Err(forbidden_pipeline());
        }
        self.post_json(TRIGGER_PIPELINE)
    }

    // -- Transport --

    fn get_json<T, F>(&self, endpoint: &str, count: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn(&T) -> Option<usize>,
    {
        let started = Instant::now();
        let result = self.request("GET", endpoint).and_then(|resp| {
            resp.into_json::<T>()
                .with_context(|| format!("failed to decode response from {endpoint}"))
        });
        self.record(endpoint, started, &result, count);
        result
    }

    fn post_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let started = Instant::now();
        let result = self.request("POST", endpoint).and_then(|resp| {
            resp.into_json::<T>()
                .with_context(|| format!("failed to decode response from {endpoint}"))
        });
        self.record(endpoint, started, &result, |_| None);
        result
    }

    fn request(&self, method: &str, endpoint: &str) -> Result<ureq::Response> {
        let url = self.config.url(endpoint);
        let mut req = self
            .agent
            .request(method, &url)
            .set("Accept", "application/json");
        if !self.config.api_token.is_empty() {
            req = req.set(
                "Authorization",
                &format!("Token {}", self.config.api_token),
            );
        }

        let result = if method == "POST" {
            req.send_json(serde_json::json!({}))
        } else {
            req.call()
        };

        match result {
            Ok(resp) => Ok(resp),
            Err(ureq::Error::Status(code, resp)) => {
                let body = resp.into_string().unwrap_or_default();
                Err(status_error(code, method, endpoint, &body, &self.config.login_url))
            }
            Err(err) => Err(anyhow::Error::new(err).context(format!("{method} {url} failed"))),
        }
    }

    fn record<T>(
        &self,
        endpoint: &str,
        started: Instant,
        result: &Result<T>,
        count: impl Fn(&T) -> Option<usize>,
    ) {
        let latency_ms = started.elapsed().as_millis() as u64;
        let entry = match result {
            Ok(value) => FetchLogEntry::success(endpoint, latency_ms, count(value)),
            Err(err) => FetchLogEntry::failure(endpoint, latency_ms, err),
        };
        self.log.record(&entry);
    }
}

/// Degrade a failed secondary fetch to `T::default()` and the error text.
fn or_empty<T: Default>(result: Result<T>) -> Result<(T, Option<String>)> {
    match result {
        Ok(value) => Ok((value, None)),
        Err(err) if error::login_url(&err).is_some() => Err(err),
        Err(err) => Ok((T::default(), Some(format!("{err:#}")))),
    }
}

fn forbidden_pipeline() -> anyhow::Error {
    anyhow::Error::new(Forbidden {
        action: "triggering the pipeline".to_string(),
    })
}

/// Map a non-2xx response onto the error callers branch on.
///
/// 401 is always an authentication failure. 403 means "not logged in" on
/// reads and "not allowed" on the admin-only trigger.
fn status_error(
    code: u16,
    method: &str,
    endpoint: &str,
    body: &str,
    login_url: &str,
) -> anyhow::Error {
    match code {
        401 => anyhow::Error::new(AuthRequired {
            login_url: login_url.to_string(),
        }),
        403 if endpoint == TRIGGER_PIPELINE => forbidden_pipeline(),
        403 => anyhow::Error::new(AuthRequired {
            login_url: login_url.to_string(),
        }),
        _ => {
            let detail = error_detail(body);
            if detail.is_empty() {
                anyhow::anyhow!("{method} {endpoint} returned HTTP {code}")
            } else {
                anyhow::anyhow!("{method} {endpoint} returned HTTP {code}: {detail}")
            }
        }
    }
}

/// The backend reports failures as `{"error": "..."}`; fall back to the
/// first line of the raw body.
fn error_detail(body: &str) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        error: String,
    }

    serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| body.lines().next().unwrap_or_default().trim().to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

/// Configuration schema and defaults for clusterboard.
///
/// Defines the TOML-serializable configuration structure with all sections:
/// `[backend]`, `[dashboard]`, `[web]`, and `[logging]`.
///
/// Every field has a sensible built-in default. Users only need to set the
/// values they want to override.
use serde::{Deserialize, Serialize};

use crate::view::{DEFAULT_ITEMS_PER_PAGE, SortKey, SortOrder, SortState};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level clusterboard configuration.
///
/// Maps directly to the `~/.clusterboard/config.toml` and
/// `.clusterboard.toml` file schemas. All sections and fields are optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub backend: BackendConfig,
    pub dashboard: ViewConfig,
    pub web: WebConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// [backend]
// ---------------------------------------------------------------------------

/// Where the clustering backend lives and how to talk to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the backend, without a trailing slash.
    pub base_url: String,
    /// Per-request timeout (milliseconds).
    pub timeout_ms: u64,
    /// Sent as `Authorization: Token <api_token>` when non-empty.
    pub api_token: String,
    /// Shown to the user when the backend rejects the session.
    pub login_url: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_ms: 10_000,
            api_token: String::new(),
            login_url: "http://localhost:8000/accounts/login/".to_string(),
        }
    }
}

impl BackendConfig {
    /// Join `path` onto the base URL with exactly one slash between them.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

// ---------------------------------------------------------------------------
// [dashboard]
// ---------------------------------------------------------------------------

/// Initial table state and analysis thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub items_per_page: usize,
    pub default_sort_key: SortKey,
    pub default_sort_order: SortOrder,
    /// How many questions the "top questions" panel lists.
    pub top_questions: usize,
    /// Similarity below which a weakly covered cluster counts as a mismatch.
    pub mismatch_similarity_threshold: f64,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            items_per_page: DEFAULT_ITEMS_PER_PAGE,
            default_sort_key: SortKey::ClusterId,
            default_sort_order: SortOrder::Asc,
            top_questions: 15,
            mismatch_similarity_threshold: 0.8,
        }
    }
}

impl ViewConfig {
    pub fn sort_state(&self) -> SortState {
        SortState::new(self.default_sort_key, self.default_sort_order)
    }
}

// ---------------------------------------------------------------------------
// [web]
// ---------------------------------------------------------------------------

/// Local web dashboard settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Listen address, `host:port`.
    pub addr: String,
    /// Open the dashboard in the default browser on start.
    pub open_browser: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:7878".to_string(),
            open_browser: false,
        }
    }
}

// ---------------------------------------------------------------------------
// [logging]
// ---------------------------------------------------------------------------

/// Fetch log settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub enabled: bool,
    /// Empty means `~/.clusterboard/fetch-log.jsonl`.
    pub path: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default TOML
// ---------------------------------------------------------------------------

impl DashboardConfig {
    /// Annotated default config written by `clusterboard config init`.
    pub fn default_toml() -> String {
        r#"# clusterboard configuration
#
# Configuration hierarchy (highest precedence wins):
#   1. Environment variables (CLUSTERBOARD_*)
#   2. Project config (.clusterboard.toml in current directory)
#   3. User global config (~/.clusterboard/config.toml)
#   4. Built-in defaults

[backend]
base_url = "http://localhost:8000"
timeout_ms = 10000
api_token = ""                        # or CLUSTERBOARD_API_TOKEN
login_url = "http://localhost:8000/accounts/login/"

[dashboard]
items_per_page = 10
default_sort_key = "cluster_id"       # any table column, e.g. message_count
default_sort_order = "asc"            # asc | desc
top_questions = 15
mismatch_similarity_threshold = 0.8

[web]
addr = "127.0.0.1:7878"
open_browser = false

[logging]
enabled = true
path = ""                             # empty: ~/.clusterboard/fetch-log.jsonl
"#
        .to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

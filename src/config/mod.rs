/// Configuration system for clusterboard.
///
/// Provides a layered configuration hierarchy:
///
/// 1. **Built-in defaults** — hardcoded in [`schema::DashboardConfig::default()`]
/// 2. **User global config** — `~/.clusterboard/config.toml`
/// 3. **Project local config** — `.clusterboard.toml` in the current working directory
/// 4. **Environment variables** — `CLUSTERBOARD_*` overrides (highest precedence)
///
/// Layers merge at the key level: a file only overrides the keys it
/// actually sets, everything else keeps the previous layer's value.
///
/// # Usage
///
/// ```rust,ignore
/// use clusterboard::config;
///
/// let cfg = config::load();
/// let client = BackendClient::from_config(&cfg.backend, FetchLog::from_config(&cfg.logging))?;
/// ```
pub mod schema;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub use schema::DashboardConfig;

use crate::view::{SortKey, SortOrder};

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the fully resolved configuration.
///
/// Merges all layers in order: defaults → global TOML → project TOML → env
/// vars.
pub fn load() -> DashboardConfig {
    let mut config = load_layers(&[global_config_path(), project_config_path()]);
    apply_env_overrides(&mut config);
    config
}

/// Merge the given TOML files over the defaults, in order. Missing or
/// malformed files are skipped.
pub fn load_layers(paths: &[Option<PathBuf>]) -> DashboardConfig {
    let Ok(mut merged) = toml::Value::try_from(DashboardConfig::default()) else {
        return DashboardConfig::default();
    };

    for layer in paths.iter().flatten().filter_map(|p| load_toml_file(p)) {
        let mut candidate = merged.clone();
        merge_values(&mut candidate, layer);
        // A layer whose values don't fit the schema is ignored as a whole.
        if candidate.clone().try_into::<DashboardConfig>().is_ok() {
            merged = candidate;
        }
    }

    merged.try_into().unwrap_or_default()
}

/// Read a TOML file as a raw value tree (if it exists and parses).
fn load_toml_file(path: &Path) -> Option<toml::Value> {
    let content = fs::read_to_string(path).ok()?;
    toml::from_str(&content).ok()
}

/// Recursively overlay `overlay` onto `base`. Tables merge key by key;
/// any other value replaces the base value outright.
fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                match base_table.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_table.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

/// Path to the user global config: `~/.clusterboard/config.toml`.
fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".clusterboard").join("config.toml"))
}

/// Path to the project local config: `.clusterboard.toml` in the current directory.
fn project_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".clusterboard.toml"))
}

/// Return the path to the global config file for display/init purposes.
pub fn global_config_file() -> Option<PathBuf> {
    global_config_path()
}

/// Return the path to the project config file for display purposes.
pub fn project_config_file() -> Option<PathBuf> {
    project_config_path()
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides (highest precedence layer).
///
/// Supported variables:
/// - `CLUSTERBOARD_BASE_URL` — backend base URL
/// - `CLUSTERBOARD_API_TOKEN` — backend API token
/// - `CLUSTERBOARD_TIMEOUT_MS` — backend request timeout
/// - `CLUSTERBOARD_ITEMS_PER_PAGE` — table page size
/// - `CLUSTERBOARD_SORT` — default sort column
/// - `CLUSTERBOARD_WEB_ADDR` — web dashboard listen address
/// - `CLUSTERBOARD_LOG` — fetch log on/off (`1`/`true`/`yes`/`on`)
fn apply_env_overrides(config: &mut DashboardConfig) {
    apply_overrides(config, |name| std::env::var(name).ok());
}

fn apply_overrides(config: &mut DashboardConfig, var: impl Fn(&str) -> Option<String>) {
    // Backend
    if let Some(val) = var("CLUSTERBOARD_BASE_URL")
        && !val.is_empty()
    {
        config.backend.base_url = val;
    }
    if let Some(val) = var("CLUSTERBOARD_API_TOKEN") {
        config.backend.api_token = val;
    }
    if let Some(val) = var("CLUSTERBOARD_TIMEOUT_MS")
        && let Ok(ms) = val.parse::<u64>()
    {
        config.backend.timeout_ms = ms;
    }

    // Dashboard
    if let Some(val) = var("CLUSTERBOARD_ITEMS_PER_PAGE")
        && let Ok(n) = val.parse::<usize>()
        && n > 0
    {
        config.dashboard.items_per_page = n;
    }
    if let Some(val) = var("CLUSTERBOARD_SORT")
        && let Some((key, order)) = parse_sort_spec(&val)
    {
        config.dashboard.default_sort_key = key;
        if let Some(order) = order {
            config.dashboard.default_sort_order = order;
        }
    }

    // Web
    if let Some(val) = var("CLUSTERBOARD_WEB_ADDR")
        && !val.is_empty()
    {
        config.web.addr = val;
    }

    // Logging
    if let Some(val) = var("CLUSTERBOARD_LOG") {
        config.logging.enabled = is_truthy(&val);
    }
}

/// Parse `column` or `column:order`, e.g. `message_count:desc`.
fn parse_sort_spec(val: &str) -> Option<(SortKey, Option<SortOrder>)> {
    match val.split_once(':') {
        Some((key, order)) => Some((SortKey::parse(key)?, Some(SortOrder::parse(order)?))),
        None => Some((SortKey::parse(val)?, None)),
    }
}

/// Check if a string value represents a truthy boolean.
fn is_truthy(val: &str) -> bool {
    matches!(
        val.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

// ---------------------------------------------------------------------------
// Config init / set / reset
// ---------------------------------------------------------------------------

/// Write the default annotated config to `~/.clusterboard/config.toml`.
///
/// Returns an error if the file already exists (use `force = true` to
/// overwrite).
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;
    write_default_config(&path, force)?;
    Ok(path)
}

fn write_default_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }

    fs::write(path, DashboardConfig::default_toml()).context("failed to write config file")
}

/// Set a single config key to a value in the global config file.
///
/// Supports dotted keys like `backend.timeout_ms`. The value is parsed
/// according to the type of the key's current (or default) value.
pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let path = global_config_path().context("could not determine home directory")?;
    set_config_value_at(&path, key, value)
}

fn set_config_value_at(path: &Path, key: &str, value: &str) -> Result<()> {
    let mut root: toml::Value = if path.exists() {
        let content = fs::read_to_string(path).context("failed to read config file")?;
        toml::from_str(&content).context("failed to parse config as TOML value")?
    } else {
        toml::Value::try_from(DashboardConfig::default())
            .context("failed to serialize default config")?
    };

    // Fill in sections the file omits so any known key can be set.
    let mut full = toml::Value::try_from(DashboardConfig::default())
        .context("failed to serialize default config")?;
    merge_values(&mut full, root.clone());
    set_toml_value(&mut full, key, value)?;

    // Only write back what the user had plus the edited key.
    let (section, leaf) = split_key(key)?;
    let edited = full
        .get(section)
        .and_then(|s| s.get(leaf))
        .cloned()
        .with_context(|| format!("config key not found: '{key}'"))?;
    let table = root
        .as_table_mut()
        .context("config file is not a TOML table")?;
    let section_table = table
        .entry(section.to_string())
        .or_insert(toml::Value::Table(toml::map::Map::new()));
    section_table
        .as_table_mut()
        .with_context(|| format!("expected table at '{section}'"))?
        .insert(leaf.to_string(), edited);

    // Reject edits the schema can't represent (e.g. an unknown sort column).
    let mut check = toml::Value::try_from(DashboardConfig::default())
        .context("failed to serialize default config")?;
    merge_values(&mut check, root.clone());
    check
        .try_into::<DashboardConfig>()
        .with_context(|| format!("invalid value '{value}' for '{key}'"))?;

    let output = toml::to_string_pretty(&root).context("failed to serialize updated config")?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(path, output).context("failed to write config file")?;

    Ok(())
}

fn split_key(key: &str) -> Result<(&str, &str)> {
    key.split_once('.')
        .filter(|(s, l)| !s.is_empty() && !l.is_empty() && !l.contains('.'))
        .with_context(|| format!("expected a 'section.key' config key, got '{key}'"))
}

/// Set a value in a TOML value tree using a dotted key path.
fn set_toml_value(root: &mut toml::Value, key: &str, raw_value: &str) -> Result<()> {
    let (section, leaf) = split_key(key)?;

    let table = root
        .get_mut(section)
        .with_context(|| format!("config key not found: section '{section}' in '{key}'"))?
        .as_table_mut()
        .with_context(|| format!("expected table at '{section}'"))?;

    let existing = table
        .get(leaf)
        .with_context(|| format!("config key not found: '{key}'"))?;

    // Parse according to the type of the existing value
    let new_value = match existing {
        toml::Value::Boolean(_) => toml::Value::Boolean(is_truthy(raw_value)),
        toml::Value::Integer(_) => {
            let n: i64 = raw_value
                .parse()
                .with_context(|| format!("expected integer for '{key}', got '{raw_value}'"))?;
            toml::Value::Integer(n)
        }
        toml::Value::Float(_) => {
            let f: f64 = raw_value
                .parse()
                .with_context(|| format!("expected float for '{key}', got '{raw_value}'"))?;
            toml::Value::Float(f)
        }
        _ => toml::Value::String(raw_value.to_string()),
    };

    table.insert(leaf.to_string(), new_value);
    Ok(())
}

/// Reset the global config to defaults (overwrite the file).
pub fn reset_config() -> Result<PathBuf> {
    init_config(true)
}

/// Show the effective (fully resolved) config as TOML.
///
/// The API token is masked.
pub fn show_effective_config() -> Result<String> {
    let mut config = load();
    if !config.backend.api_token.is_empty() {
        config.backend.api_token = "********".to_string();
    }
    toml::to_string_pretty(&config).context("failed to serialize effective config")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "clusterboard-config-{name}-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn is_truthy_accepts_variants() {
        assert!(is_truthy("1"));
        assert!(is_truthy("TRUE"));
        assert!(is_truthy("yes"));
        assert!(is_truthy("on"));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("off"));
        assert!(!is_truthy(""));
    }

    #[test]
    fn layers_merge_at_key_level() {
        let dir = temp_dir("layers");
        let global = dir.join("global.toml");
        let project = dir.join("project.toml");
        fs::write(
            &global,
            "[backend]\nbase_url = \"https://faq.example.com\"\ntimeout_ms = 2500\n",
        )
        .unwrap();
        fs::write(&project, "[backend]\ntimeout_ms = 500\n").unwrap();

        let config = load_layers(&[Some(global), Some(project)]);
        assert_eq!(config.backend.base_url, "https://faq.example.com");
        assert_eq!(config.backend.timeout_ms, 500);
        assert_eq!(config.dashboard.items_per_page, 10);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn malformed_layer_is_ignored() {
        let dir = temp_dir("malformed");
        let good = dir.join("good.toml");
        let bad = dir.join("bad.toml");
        let mistyped = dir.join("mistyped.toml");
        fs::write(&good, "[web]\naddr = \"0.0.0.0:9000\"\n").unwrap();
        fs::write(&bad, "[web\naddr = ").unwrap();
        fs::write(&mistyped, "[web]\nopen_browser = \"maybe\"\n").unwrap();

        let config = load_layers(&[Some(good), Some(bad), Some(mistyped), None]);
        assert_eq!(config.web.addr, "0.0.0.0:9000");
        assert!(!config.web.open_browser);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn env_overrides_take_precedence() {
        let mut config = DashboardConfig::default();
        apply_overrides(&mut config, |name| match name {
            "CLUSTERBOARD_BASE_URL" => Some("http://backend:9000".to_string()),
            "CLUSTERBOARD_TIMEOUT_MS" => Some("1500".to_string()),
            "CLUSTERBOARD_ITEMS_PER_PAGE" => Some("0".to_string()),
            "CLUSTERBOARD_SORT" => Some("message-count:desc".to_string()),
            "CLUSTERBOARD_LOG" => Some("off".to_string()),
            _ => None,
        });
        assert_eq!(config.backend.base_url, "http://backend:9000");
        assert_eq!(config.backend.timeout_ms, 1500);
        assert_eq!(config.dashboard.items_per_page, 10);
        assert_eq!(config.dashboard.default_sort_key, SortKey::MessageCount);
        assert_eq!(config.dashboard.default_sort_order, SortOrder::Desc);
        assert!(!config.logging.enabled);
    }

    #[test]
    fn set_toml_value_preserves_types() {
        let mut root = toml::Value::try_from(DashboardConfig::default()).unwrap();
        set_toml_value(&mut root, "backend.timeout_ms", "50").unwrap();
        set_toml_value(&mut root, "web.open_browser", "yes").unwrap();
        set_toml_value(&mut root, "dashboard.mismatch_similarity_threshold", "0.65").unwrap();

        assert_eq!(root["backend"]["timeout_ms"].as_integer(), Some(50));
        assert_eq!(root["web"]["open_browser"].as_bool(), Some(true));
        assert!((root["dashboard"]["mismatch_similarity_threshold"].as_float().unwrap() - 0.65).abs() < f64::EPSILON);
    }

    #[test]
    fn set_toml_value_rejects_bad_input() {
        let mut root = toml::Value::try_from(DashboardConfig::default()).unwrap();
        assert!(set_toml_value(&mut root, "nonexistent.key", "value").is_err());
        assert!(set_toml_value(&mut root, "backend.nope", "value").is_err());
        assert!(set_toml_value(&mut root, "backend", "value").is_err());
        assert!(set_toml_value(&mut root, "backend.timeout_ms", "soon").is_err());
    }

    #[test]
    fn set_config_value_writes_only_touched_keys() {
        let dir = temp_dir("set");
        let path = dir.join("config.toml");
        fs::write(&path, "[web]\naddr = \"0.0.0.0:1\"\n").unwrap();

        set_config_value_at(&path, "backend.timeout_ms", "42").unwrap();
        let written: toml::Value = toml::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["backend"]["timeout_ms"].as_integer(), Some(42));
        assert_eq!(written["web"]["addr"].as_str(), Some("0.0.0.0:1"));
        assert!(written["backend"].get("base_url").is_none());

        assert!(set_config_value_at(&path, "dashboard.default_sort_key", "bogus").is_err());
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn init_refuses_to_overwrite_without_force() {
        let dir = temp_dir("init");
        let path = dir.join("config.toml");
        write_default_config(&path, false).unwrap();
        assert!(write_default_config(&path, false).is_err());
        write_default_config(&path, true).unwrap();

        let parsed: DashboardConfig = toml::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed, DashboardConfig::default());
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn show_effective_config_returns_toml() {
        let toml_str = show_effective_config().unwrap();
        let _: DashboardConfig = toml::from_str(&toml_str).unwrap();
    }
}

// src/config.rs
//! Pipeline configuration loaded from TOML.
//!
//! Resolution: `$DEAL_PIPELINE_CONFIG` → `config/pipeline.toml` → built-in
//! defaults. A file that exists but fails to parse is an error. Secrets can be
//! written as `"ENV"` and are then read from the environment.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::extract::JsonStrategy;

// --- env defaults & names ---
pub const DEFAULT_CONFIG_PATH: &str = "config/pipeline.toml";
pub const ENV_CONFIG_PATH: &str = "DEAL_PIPELINE_CONFIG";
pub const ENV_CLASSIFIER_THRESHOLD: &str = "DEAL_CLASSIFIER_THRESHOLD";
pub const ENV_GNEWS_API_KEY: &str = "GNEWS_API_KEY";

pub const DEFAULT_CLASSIFIER_THRESHOLD: u32 = 3;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub fetch: FetchConfig,
    pub keyword_filter: KeywordFilterConfig,
    pub classifier: ClassifierConfig,
    pub llm: LlmConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchProvider {
    #[default]
    Gnews,
    Gdelt,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub provider: FetchProvider,
    /// Literal key, or "ENV" to read `GNEWS_API_KEY`.
    pub api_key: String,
    pub language: String,
    pub max_per_query: u32,
    pub queries: Vec<String>,
    pub gnews_base_url: String,
    pub gdelt_base_url: String,
    pub max_retries: u32,
    pub wait_seconds: u64,
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            provider: FetchProvider::Gnews,
            api_key: "ENV".to_string(),
            language: "en".to_string(),
            max_per_query: 5,
            queries: default_queries(),
            gnews_base_url: "https://gnews.io/api/v4/search".to_string(),
            gdelt_base_url: "https://api.gdeltproject.org/api/v2/doc/doc".to_string(),
            max_retries: 3,
            wait_seconds: 5,
            timeout_secs: 10,
        }
    }
}

fn default_queries() -> Vec<String> {
    [
        "defense company secured contract",
        "military procurement order awarded",
        "arms manufacturer won deal",
        "drone company signed agreement army",
        "defense firm to supply systems",
        "military modernization contract",
        "government defense contract awarded",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KeywordFilterConfig {
    pub enabled: bool,
    pub product: Vec<String>,
    pub deal: Vec<String>,
    pub context: Vec<String>,
}

impl Default for KeywordFilterConfig {
    fn default() -> Self {
        let list = |xs: &[&str]| xs.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            enabled: false,
            product: list(&["drone", "uav", "counter drone", "unmanned vehicle", "CUAS"]),
            deal: list(&["contract", "deal", "procurement", "order", "awarded", "signed"]),
            context: list(&["military", "army", "defense", "navy", "air force"]),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub threshold: u32,
    pub weights: BTreeMap<String, u32>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_CLASSIFIER_THRESHOLD,
            weights: default_weights(),
        }
    }
}

pub fn default_weights() -> BTreeMap<String, u32> {
    [
        ("contract", 3),
        ("deal", 3),
        ("worth", 2),
        ("million", 3),
        ("billion", 3),
        ("awarded", 2),
        ("signed", 2),
        ("order", 2),
        ("$", 3),
    ]
    .into_iter()
    .map(|(k, w)| (k.to_string(), w))
    .collect()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub json_strategy: JsonStrategy,
    /// When set, responses are cached on disk keyed by article text.
    pub cache_dir: Option<PathBuf>,
    /// Max real model calls per UTC day (only with `cache_dir`).
    pub daily_limit: Option<u32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3".to_string(),
            timeout_secs: 120,
            json_strategy: JsonStrategy::BraceSpan,
            cache_dir: None,
            daily_limit: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// An empty string disables the writer.
    #[serde(deserialize_with = "empty_path_as_none")]
    pub csv_path: Option<PathBuf>,
    #[serde(deserialize_with = "empty_path_as_none")]
    pub sqlite_path: Option<PathBuf>,
}

fn empty_path_as_none<'de, D>(de: D) -> std::result::Result<Option<PathBuf>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(de)?;
    let trimmed = raw.trim();
    Ok((!trimmed.is_empty()).then(|| PathBuf::from(trimmed)))
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            csv_path: Some(PathBuf::from("deals_database.csv")),
            sqlite_path: Some(PathBuf::from("deals_database.db")),
        }
    }
}

// parse optional threshold env; invalid values are ignored
fn parse_threshold_env(raw: Option<String>) -> Option<u32> {
    raw.and_then(|s| s.trim().parse::<u32>().ok())
}

impl PipelineConfig {
    /// Parse a TOML document; missing sections fall back to defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: PipelineConfig = toml::from_str(s).context("parsing pipeline config toml")?;
        Ok(cfg)
    }

    /// Load from an explicit path and apply environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading pipeline config from {}", path.display()))?;
        let mut cfg = Self::from_toml_str(&content)
            .with_context(|| format!("in {}", path.display()))?;
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    /// Load using env var + fallbacks:
    /// 1) $DEAL_PIPELINE_CONFIG (must exist)
    /// 2) config/pipeline.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!(
                    "{ENV_CONFIG_PATH} points to non-existent path {}",
                    pb.display()
                ));
            }
            return Self::load_from(&pb);
        }
        let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_path.exists() {
            return Self::load_from(&default_path);
        }
        let mut cfg = Self::default();
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(t) = parse_threshold_env(std::env::var(ENV_CLASSIFIER_THRESHOLD).ok()) {
            self.classifier.threshold = t;
        }
    }

    /// Resolve the news API key, reading `GNEWS_API_KEY` when configured as "ENV".
    pub fn resolve_api_key(&self) -> Result<String> {
        let key = self.fetch.api_key.trim();
        if key.eq_ignore_ascii_case("env") {
            return std::env::var(ENV_GNEWS_API_KEY)
                .map_err(|_| anyhow!("Missing {ENV_GNEWS_API_KEY} env var"));
        }
        Ok(key.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn empty_document_yields_defaults() {
        let cfg = PipelineConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.classifier.threshold, 3);
        assert_eq!(cfg.classifier.weights.get("$"), Some(&3));
        assert_eq!(cfg.fetch.queries.len(), 7);
        assert_eq!(cfg.llm.model, "llama3");
        assert_eq!(cfg.llm.json_strategy, JsonStrategy::BraceSpan);
        assert!(!cfg.keyword_filter.enabled);
    }

    #[test]
    fn sections_override_selectively() {
        let cfg = PipelineConfig::from_toml_str(
            r#"
            [fetch]
            provider = "gdelt"
            queries = ["navy frigate order"]

            [classifier]
            threshold = 5

            [llm]
            json_strategy = "scan"
            daily_limit = 50

            [storage]
            csv_path = "out/deals.csv"
            sqlite_path = ""
            "#,
        )
        .unwrap();
        assert_eq!(cfg.fetch.provider, FetchProvider::Gdelt);
        assert_eq!(cfg.fetch.queries, vec!["navy frigate order".to_string()]);
        assert_eq!(cfg.fetch.max_per_query, 5);
        assert_eq!(cfg.classifier.threshold, 5);
        // Providing [classifier] without weights keeps the default table.
        assert_eq!(cfg.classifier.weights.len(), 9);
        assert_eq!(cfg.llm.json_strategy, JsonStrategy::Scan);
        assert_eq!(cfg.llm.daily_limit, Some(50));
        assert_eq!(cfg.storage.csv_path, Some(PathBuf::from("out/deals.csv")));
        assert_eq!(cfg.storage.sqlite_path, None);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        assert!(PipelineConfig::from_toml_str("[classifier]\nthreshold = \"high\"").is_err());
    }

    #[test]
    fn threshold_env_parse() {
        assert_eq!(parse_threshold_env(Some(" 7 ".into())), Some(7));
        assert_eq!(parse_threshold_env(Some("-1".into())), None);
        assert_eq!(parse_threshold_env(None), None);
    }

    #[serial_test::serial]
    #[test]
    fn api_key_literal_or_env() {
        let mut cfg = PipelineConfig::default();
        cfg.fetch.api_key = "abc123".into();
        assert_eq!(cfg.resolve_api_key().unwrap(), "abc123");

        cfg.fetch.api_key = "ENV".into();
        env::set_var(ENV_GNEWS_API_KEY, "from-env");
        assert_eq!(cfg.resolve_api_key().unwrap(), "from-env");
        env::remove_var(ENV_GNEWS_API_KEY);
        assert!(cfg.resolve_api_key().is_err());
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        // Isolate CWD so the repo's own config/ is not read.
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        env::remove_var(ENV_CONFIG_PATH);
        env::remove_var(ENV_CLASSIFIER_THRESHOLD);

        let cfg = PipelineConfig::load_default().unwrap();
        assert_eq!(cfg.classifier.threshold, 3);

        fs::create_dir_all(tmp.path().join("config")).unwrap();
        fs::write(
            tmp.path().join(DEFAULT_CONFIG_PATH),
            "[classifier]\nthreshold = 4\n",
        )
        .unwrap();
        assert_eq!(PipelineConfig::load_default().unwrap().classifier.threshold, 4);

        let p_env = tmp.path().join("other.toml");
        fs::write(&p_env, "[classifier]\nthreshold = 6\n").unwrap();
        env::set_var(ENV_CONFIG_PATH, p_env.display().to_string());
        assert_eq!(PipelineConfig::load_default().unwrap().classifier.threshold, 6);

        env::set_var(ENV_CLASSIFIER_THRESHOLD, "9");
        assert_eq!(PipelineConfig::load_default().unwrap().classifier.threshold, 9);
        env::remove_var(ENV_CLASSIFIER_THRESHOLD);

        env::set_var(ENV_CONFIG_PATH, tmp.path().join("missing.toml").display().to_string());
        assert!(PipelineConfig::load_default().is_err());
        env::remove_var(ENV_CONFIG_PATH);

        env::set_current_dir(&old).unwrap();
    }
}

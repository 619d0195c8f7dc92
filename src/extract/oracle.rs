//! LLM oracle: provider abstraction + file cache + daily limit.
//!
//! The model is a text-in/text-out black box. Nothing here interprets its
//! output; that is the cleaner's job.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::config::LlmConfig;

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

#[async_trait]
pub trait LlmOracle: Send + Sync {
    /// Return the model's raw response for one article's text.
    async fn complete(&self, article_text: &str) -> Result<String>;
    /// Provider name for diagnostics.
    fn name(&self) -> &'static str;
}

/// Extraction prompt sent for every article.
pub fn build_prompt(article_text: &str) -> String {
    format!(
        "Return STRICT JSON only with:\n\n\
         buyer, seller, product, quantity, deal_value, currency, deal_date, summary\n\n\
         Text:\n{article_text}\n"
    )
}

// ------------------------------------------------------------
// Ollama provider
// ------------------------------------------------------------

/// Local Ollama server (`POST /api/generate`, non-streaming).
pub struct OllamaOracle {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaOracle {
    pub fn new(cfg: &LlmConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("defense-deal-pipeline/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("building ollama http client")?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            model: cfg.model.clone(),
        })
    }
}

#[async_trait]
impl LlmOracle for OllamaOracle {
    async fn complete(&self, article_text: &str) -> Result<String> {
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            prompt: String,
            stream: bool,
        }
        #[derive(Deserialize)]
        struct Resp {
            response: String,
        }

        let req = Req {
            model: &self.model,
            prompt: build_prompt(article_text),
            stream: false,
        };

        let resp = self
            .http
            .post(format!("{}/api/generate", self.base_url))
            .json(&req)
            .send()
            .await
            .context("ollama request")?;

        let status = resp.status();
        if !status.is_success() {
            bail!("ollama returned status {status}");
        }
        let body: Resp = resp.json().await.context("decoding ollama response")?;
        Ok(body.response)
    }

    fn name(&self) -> &'static str {
        "ollama"
    }
}

// ------------------------------------------------------------
// Caching wrapper (file cache + daily limit)
// ------------------------------------------------------------

/// File-backed response cache with a per-day budget of real model calls.
pub struct CachingOracle<O: LlmOracle> {
    inner: O,
    cache_dir: PathBuf,
    budget_path: PathBuf,
    daily_limit: Option<u32>,
    budget: Mutex<CallBudget>,
}

impl<O: LlmOracle> CachingOracle<O> {
    pub fn new(inner: O, cache_dir: PathBuf, daily_limit: Option<u32>) -> Result<Self> {
        fs::create_dir_all(&cache_dir)
            .with_context(|| format!("creating llm cache dir {}", cache_dir.display()))?;
        let budget_path = cache_dir.join(BUDGET_FILE);
        let budget = Mutex::new(CallBudget::load(&budget_path, utc_today()));
        Ok(Self {
            inner,
            cache_dir,
            budget_path,
            daily_limit,
            budget,
        })
    }

    /// Real calls made today (cache hits excluded).
    pub fn calls_today(&self) -> u32 {
        self.budget.lock().map(|b| b.spent).unwrap_or(0)
    }

    fn check_limit(&self) -> Result<()> {
        let mut b = self
            .budget
            .lock()
            .map_err(|_| anyhow!("llm call budget poisoned"))?;
        if b.roll_to(utc_today()) {
            self.persist_budget(&b);
        }
        if !b.allows(self.daily_limit) {
            bail!(
                "daily llm call limit of {} reached",
                self.daily_limit.unwrap_or_default()
            );
        }
        Ok(())
    }

    fn record_call(&self) {
        if let Ok(mut b) = self.budget.lock() {
            b.spent = b.spent.saturating_add(1);
            self.persist_budget(&b);
        }
    }

    fn persist_budget(&self, b: &CallBudget) {
        if let Err(e) = b.save(&self.budget_path) {
            warn!(target: "extract", path = %self.budget_path.display(), error = %e, "failed to persist llm call budget");
        }
    }
}

#[async_trait]
impl<O: LlmOracle> LlmOracle for CachingOracle<O> {
    async fn complete(&self, article_text: &str) -> Result<String> {
        let key = cache_key(article_text);
        if let Some(hit) = read_cache_file(&self.cache_dir, &key) {
            debug!(target: "extract", %key, "llm cache hit");
            return Ok(hit.response);
        }

        self.check_limit()?;

        let response = self.inner.complete(article_text).await?;
        self.record_call();
        let entry = CacheEntry {
            response: response.clone(),
        };
        if let Err(e) = write_cache_file(&self.cache_dir, &key, &entry) {
            warn!(target: "extract", error = %e, "failed to write llm cache entry");
        }
        Ok(response)
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

// ------------------------------------------------------------
// File cache helpers
// ------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    response: String,
}

fn cache_key(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let mut out = String::with_capacity(32);
    for b in digest.iter().take(16) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

fn cache_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{key}.json"))
}

fn read_cache_file(dir: &Path, key: &str) -> Option<CacheEntry> {
    let s = fs::read_to_string(cache_path(dir, key)).ok()?;
    serde_json::from_str(&s).ok()
}

fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    let tmp = path.with_extension("json.tmp");
    let mut f = fs::File::create(&tmp)?;
    f.write_all(contents.as_bytes())?;
    fs::rename(tmp, path)
}

fn write_cache_file(dir: &Path, key: &str, value: &CacheEntry) -> io::Result<()> {
    let json = serde_json::to_string(value).map_err(io::Error::other)?;
    write_atomic(&cache_path(dir, key), &json)
}

// ------------------------------------------------------------
// Daily call budget
// ------------------------------------------------------------

const BUDGET_FILE: &str = "call_budget.json";

fn utc_today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Real model calls spent on one UTC day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CallBudget {
    day: NaiveDate,
    spent: u32,
}

impl CallBudget {
    fn starting(day: NaiveDate) -> Self {
        Self { day, spent: 0 }
    }

    /// Switch to `today`, dropping an older day's spend. Returns whether it switched.
    fn roll_to(&mut self, today: NaiveDate) -> bool {
        if self.day == today {
            return false;
        }
        *self = Self::starting(today);
        true
    }

    fn allows(&self, limit: Option<u32>) -> bool {
        limit.map_or(true, |max| self.spent < max)
    }

    /// Missing or unreadable state starts a fresh budget for `today`.
    fn load(path: &Path, today: NaiveDate) -> Self {
        let Ok(raw) = fs::read_to_string(path) else {
            return Self::starting(today);
        };
        match serde_json::from_str::<CallBudget>(&raw) {
            Ok(mut b) => {
                b.roll_to(today);
                b
            }
            Err(e) => {
                warn!(target: "extract", path = %path.display(), error = %e, "ignoring corrupt llm call budget");
                Self::starting(today)
            }
        }
    }

    fn save(&self, path: &Path) -> io::Result<()> {
        let json = serde_json::to_string(self).map_err(io::Error::other)?;
        write_atomic(path, &json)
    }
}

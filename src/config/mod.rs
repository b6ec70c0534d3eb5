use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub browser: BrowserConfig,
    pub crawler: CrawlerConfig,
    pub storage: StorageConfig,
}

/// Headless Chrome session options
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrowserConfig {
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    #[serde(default = "default_true")]
    pub headless: bool,

    #[serde(default = "default_window_size")]
    pub window_size: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_page_load_timeout_secs")]
    pub page_load_timeout_secs: u64,
}

/// Crawl pacing and wait budgets
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CrawlerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Budget for a page's readiness marker to appear after load.
    #[serde(default = "default_wait_timeout_secs")]
    pub wait_timeout_secs: u64,

    /// Pause after a readiness marker or a pagination click, letting the
    /// table re-render before the snapshot is taken.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    #[serde(default = "default_refresh_ms")]
    pub refresh_ms: u64,

    /// Pause between the bottom and top of a scroll pass.
    #[serde(default = "default_pause_ms")]
    pub pause_ms: u64,

    #[serde(default = "default_poll_attempts")]
    pub poll_attempts: u32,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Browser tabs the pool may hold open at once.
    #[serde(default = "default_surfaces")]
    pub surfaces: usize,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_webdriver_url() -> String {
    "http://localhost:9515".to_string()
}
fn default_window_size() -> String {
    "1920,1080".to_string()
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/120.0.0.0 Safari/537.36"
        .to_string()
}
fn default_page_load_timeout_secs() -> u64 {
    30
}
fn default_base_url() -> String {
    "https://www.mexc.com/vi-VN/pre-market".to_string()
}
fn default_wait_timeout_secs() -> u64 {
    10
}
fn default_settle_ms() -> u64 {
    5000
}
fn default_refresh_ms() -> u64 {
    3000
}
fn default_pause_ms() -> u64 {
    1000
}
fn default_poll_attempts() -> u32 {
    10
}
fn default_poll_interval_ms() -> u64 {
    1000
}
fn default_request_delay_ms() -> u64 {
    1500
}
fn default_jitter_ms() -> u64 {
    500
}
fn default_max_retries() -> u32 {
    3
}
fn default_surfaces() -> usize {
    1
}
fn default_db_path() -> PathBuf {
    PathBuf::from("data/premarket.duckdb")
}
fn default_true() -> bool {
    true
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("MEXC").separator("__"))
            .build()?;

        let app_cfg: AppConfig = cfg.try_deserialize().unwrap_or_else(|_| AppConfig::default());
        Ok(app_cfg)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            browser: BrowserConfig {
                webdriver_url: default_webdriver_url(),
                headless: true,
                window_size: default_window_size(),
                user_agent: default_user_agent(),
                page_load_timeout_secs: default_page_load_timeout_secs(),
            },
            crawler: CrawlerConfig {
                base_url: default_base_url(),
                wait_timeout_secs: default_wait_timeout_secs(),
                settle_ms: default_settle_ms(),
                refresh_ms: default_refresh_ms(),
                pause_ms: default_pause_ms(),
                poll_attempts: default_poll_attempts(),
                poll_interval_ms: default_poll_interval_ms(),
                request_delay_ms: default_request_delay_ms(),
                jitter_ms: default_jitter_ms(),
                max_retries: default_max_retries(),
                surfaces: default_surfaces(),
            },
            storage: StorageConfig {
                db_path: default_db_path(),
                run_migrations: true,
            },
        }
    }
}

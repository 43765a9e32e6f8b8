//! Application configuration for tenderfeed.
//!
//! User config lives at `~/.tenderfeed/tenderfeed.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, TenderFeedError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "tenderfeed.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".tenderfeed";

/// Largest batch the downstream queue accepts in one call.
pub const MAX_BATCH_SIZE: usize = 10;

// ---------------------------------------------------------------------------
// Config structs (matching tenderfeed.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Portal endpoints and identity.
    #[serde(default)]
    pub portal: PortalConfig,

    /// HTTP client settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Queue delivery settings.
    #[serde(default)]
    pub delivery: DeliveryConfig,
}

/// `[portal]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Literal written into every tender's `source` field.
    #[serde(default = "default_source")]
    pub source: String,

    /// Origin that relative detail-page links are resolved against.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Open-tenders listing endpoint.
    #[serde(default = "default_listing_url")]
    pub listing_url: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            origin: default_origin(),
            listing_url: default_listing_url(),
        }
    }
}

fn default_source() -> String {
    "SANRAL".into()
}
fn default_origin() -> String {
    "https://www.nra.co.za".into()
}
fn default_listing_url() -> String {
    "https://www.nra.co.za/sanral-tenders/list/open-tenders?pageSize=100&pageIndex=1&order_by=0&order=asc&init=0".into()
}

/// `[http]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Timeout for a single detail-page fetch.
    #[serde(default = "default_detail_timeout")]
    pub detail_timeout_secs: u64,

    /// Timeout for the listing feed request.
    #[serde(default = "default_feed_timeout")]
    pub feed_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            detail_timeout_secs: default_detail_timeout(),
            feed_timeout_secs: default_feed_timeout(),
        }
    }
}

fn default_user_agent() -> String {
    concat!("Mozilla/5.0 (compatible; tenderfeed/", env!("CARGO_PKG_VERSION"), ")").into()
}
fn default_detail_timeout() -> u64 {
    15
}
fn default_feed_timeout() -> u64 {
    30
}

/// `[delivery]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Messages per queue batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Ordering group shared by every message of this portal.
    #[serde(default = "default_message_group_id")]
    pub message_group_id: String,

    /// Where the JSON-lines sink writes: `-` for stdout, otherwise a file path.
    #[serde(default = "default_output")]
    pub output: String,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            message_group_id: default_message_group_id(),
            output: default_output(),
        }
    }
}

fn default_batch_size() -> usize {
    MAX_BATCH_SIZE
}
fn default_message_group_id() -> String {
    "SanralTenderScrape".into()
}
fn default_output() -> String {
    "-".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.tenderfeed/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| TenderFeedError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.tenderfeed/tenderfeed.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| TenderFeedError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        TenderFeedError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| TenderFeedError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| TenderFeedError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| TenderFeedError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Reject configs the pipeline cannot run with.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    let batch_size = config.delivery.batch_size;
    if batch_size == 0 || batch_size > MAX_BATCH_SIZE {
        return Err(TenderFeedError::config(format!(
            "delivery.batch_size must be between 1 and {MAX_BATCH_SIZE}, got {batch_size}"
        )));
    }

    for (key, value) in [
        ("portal.origin", &config.portal.origin),
        ("portal.listing_url", &config.portal.listing_url),
    ] {
        let parsed = Url::parse(value)
            .map_err(|e| TenderFeedError::config(format!("{key} '{value}' is not a URL: {e}")))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(TenderFeedError::config(format!(
                "{key} must be an http(s) URL, got '{value}'"
            )));
        }
    }

    if config.http.detail_timeout_secs == 0 {
        return Err(TenderFeedError::config(
            "http.detail_timeout_secs must be greater than zero",
        ));
    }

    Ok(())
}

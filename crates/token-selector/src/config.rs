use serde::{Deserialize, Serialize};

use crate::error::Error;

pub const DEFAULT_PLACEHOLDER_LOGO: &str = "/images/token-placeholder.svg";
pub const DEFAULT_LOGO_BATCH_SIZE: usize = 10;
pub const DEFAULT_BIRDEYE_URL: &str = "https://public-api.birdeye.so";
pub const DEFAULT_GECKOTERMINAL_URL: &str = "https://api.geckoterminal.com/api/v2";

/// Runtime settings for the selector pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SelectorConfig {
    /// Icon shown when no logo source produced a usable URL.
    pub placeholder_logo: String,

    /// Number of logo lookups issued concurrently during a prefetch.
    pub logo_batch_size: usize,

    /// Hosts serving decentralized storage content. Secondary-provider logos
    /// pointing at these are discarded.
    pub rejected_logo_hosts: Vec<String>,

    pub birdeye: BirdeyeConfig,

    pub geckoterminal: GeckoTerminalConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BirdeyeConfig {
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeckoTerminalConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            placeholder_logo: DEFAULT_PLACEHOLDER_LOGO.to_string(),
            logo_batch_size: DEFAULT_LOGO_BATCH_SIZE,
            rejected_logo_hosts: vec![
                "ipfs.io".to_string(),
                "dweb.link".to_string(),
                "cloudflare-ipfs.com".to_string(),
                "nftstorage.link".to_string(),
                "mypinata.cloud".to_string(),
                "arweave.net".to_string(),
            ],
            birdeye: BirdeyeConfig::default(),
            geckoterminal: GeckoTerminalConfig::default(),
        }
    }
}

impl Default for BirdeyeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BIRDEYE_URL.to_string(),
            api_key: None,
            timeout_secs: 10,
        }
    }
}

impl Default for GeckoTerminalConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GECKOTERMINAL_URL.to_string(),
            timeout_secs: 10,
        }
    }
}

impl SelectorConfig {
    /// Parse a config from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let config: Self = serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize config to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.logo_batch_size == 0 {
            return Err(Error::Config("logoBatchSize must be at least 1".to_string()));
        }
        if self.placeholder_logo.trim().is_empty() {
            return Err(Error::Config("placeholderLogo must not be empty".to_string()));
        }
        Ok(())
    }
}

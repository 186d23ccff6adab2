//! HTTP logo sources: Birdeye (primary) and GeckoTerminal (secondary).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::address::CanonicalAddress;
use crate::config::{BirdeyeConfig, GeckoTerminalConfig};
use crate::error::ProviderError;
use crate::provider::LogoSource;

fn build_client(timeout_secs: u64) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ProviderError::Http(e.to_string()))
}

fn non_empty(url: Option<String>) -> Option<String> {
    url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty())
}

#[derive(Debug, Deserialize)]
struct BirdeyeResponse {
    #[serde(default)]
    success: bool,
    data: Option<BirdeyeMetadata>,
}

#[derive(Debug, Deserialize)]
struct BirdeyeMetadata {
    logo_uri: Option<String>,
}

/// Birdeye token metadata: `GET /defi/v3/token/meta-data/single`.
pub struct BirdeyeLogoSource {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl BirdeyeLogoSource {
    pub fn new(config: &BirdeyeConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl LogoSource for BirdeyeLogoSource {
    fn name(&self) -> &str {
        "birdeye"
    }

    async fn fetch_logo(
        &self,
        address: &CanonicalAddress,
    ) -> Result<Option<String>, ProviderError> {
        let url = format!("{}/defi/v3/token/meta-data/single", self.base_url);
        let mut request = self
            .client
            .get(&url)
            .query(&[("address", address.as_str())])
            .header("accept", "application/json")
            .header("x-chain", "sui");
        if let Some(ref key) = self.api_key {
            request = request.header("X-API-KEY", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ProviderError::Status {
                provider: self.name().to_string(),
                status: status.as_u16(),
            });
        }

        let body: BirdeyeResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;
        if !body.success {
            debug!(address = %address, "birdeye reported no metadata");
            return Ok(None);
        }

        Ok(non_empty(body.data.and_then(|d| d.logo_uri)))
    }
}

#[derive(Debug, Deserialize)]
struct GeckoTerminalResponse {
    data: Option<GeckoTerminalData>,
}

#[derive(Debug, Deserialize)]
struct GeckoTerminalData {
    attributes: Option<GeckoTerminalAttributes>,
}

#[derive(Debug, Deserialize)]
struct GeckoTerminalAttributes {
    image_url: Option<String>,
}

/// GeckoTerminal token info: `GET /networks/sui-network/tokens/{address}/info`.
pub struct GeckoTerminalLogoSource {
    client: Client,
    base_url: String,
}

impl GeckoTerminalLogoSource {
    pub fn new(config: &GeckoTerminalConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl LogoSource for GeckoTerminalLogoSource {
    fn name(&self) -> &str {
        "geckoterminal"
    }

    async fn fetch_logo(
        &self,
        address: &CanonicalAddress,
    ) -> Result<Option<String>, ProviderError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| ProviderError::Http(format!("invalid base url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| ProviderError::Http("base url cannot carry a path".to_string()))?
            .extend(["networks", "sui-network", "tokens", address.as_str(), "info"]);

        let response = self
            .client
            .get(url)
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ProviderError::Status {
                provider: self.name().to_string(),
                status: status.as_u16(),
            });
        }

        let body: GeckoTerminalResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        // GeckoTerminal answers "missing.png" for tokens it has no art for.
        let image = non_empty(
            body.data
                .and_then(|d| d.attributes)
                .and_then(|a| a.image_url),
        )
        .filter(|u| u != "missing.png" && !u.ends_with("/missing.png"));
        Ok(image)
    }
}

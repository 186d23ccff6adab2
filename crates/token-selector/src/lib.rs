pub mod address;
pub mod config;
pub mod error;
#[cfg(feature = "http-providers")]
pub mod http;
pub mod loader;
pub mod logo;
pub mod merge;
pub mod provider;
pub mod sort;
pub mod token;

use std::sync::Arc;

// Re-exports for convenience
pub use address::{normalize, CanonicalAddress};
pub use config::SelectorConfig;
pub use error::{Error, ProviderError};
pub use loader::{DisplayState, SelectorView, TokenSelector};
pub use logo::LogoCache;
pub use merge::merge;
pub use provider::{LogoSource, TokenListSource, WalletSource};
pub use sort::{filter_tokens, smart_sort};
pub use token::{TokenDescriptor, TokenRecord, WalletBalance};

/// Build a logo cache backed by Birdeye (primary) and GeckoTerminal
/// (secondary).
#[cfg(feature = "http-providers")]
pub fn http_logo_cache(config: &SelectorConfig) -> Result<LogoCache, Error> {
    config.validate()?;
    let primary = http::BirdeyeLogoSource::new(&config.birdeye)?;
    let secondary = http::GeckoTerminalLogoSource::new(&config.geckoterminal)?;
    Ok(LogoCache::new(Arc::new(primary), Arc::new(secondary), config))
}

/// Wire a selector from its collaborators, sharing `logos` across sessions.
pub fn selector(
    wallet: Arc<dyn WalletSource>,
    trending: Arc<dyn TokenListSource>,
    catalog: Arc<dyn TokenListSource>,
    logos: Arc<LogoCache>,
) -> TokenSelector {
    TokenSelector::new(wallet, trending, catalog, logos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::NATIVE_COIN_FULL;
    use crate::provider::{EmptyLogoSource, StaticLogoSource, StaticTokenList, StaticWallet};

    fn descriptor(address: &str, symbol: &str, price: f64) -> TokenDescriptor {
        TokenDescriptor {
            address: address.to_string(),
            symbol: symbol.to_string(),
            name: symbol.to_string(),
            logo: None,
            decimals: 9,
            price,
            is_trending: None,
        }
    }

    #[tokio::test]
    async fn test_full_pipeline() {
        let config = SelectorConfig::from_json(r#"{ "logoBatchSize": 2 }"#).unwrap();
        let primary = StaticLogoSource::new("birdeye")
            .with("0x2::sui::SUI", "https://img.example/sui.png")
            .with("0xCE::cetus::CETUS", "https://img.example/cetus.png");
        let logos = Arc::new(LogoCache::new(
            Arc::new(primary),
            Arc::new(EmptyLogoSource),
            &config,
        ));

        let wallet = WalletBalance::from_raw("0x2::sui::SUI", "SUI", "Sui", 9, "3000000000").unwrap();
        let picker = selector(
            Arc::new(StaticWallet::cached(vec![wallet])),
            Arc::new(StaticTokenList::new(vec![descriptor("0xCE::cetus::CETUS", "CETUS", 0.1)])),
            Arc::new(StaticTokenList::new(vec![
                descriptor(NATIVE_COIN_FULL, "SUI", 3.0),
                descriptor("0xCE::cetus::CETUS", "CETUS", 0.1),
                descriptor("0xDE::deep::DEEP", "DEEP", 0.2),
            ])),
            Arc::clone(&logos),
        );

        assert_eq!(picker.open().await, DisplayState::All);
        assert_eq!(picker.refresh_logos().await, 2);

        let view = picker.view();
        let symbols: Vec<&str> = view.tokens.iter().map(|t| t.symbol.as_str()).collect();
        assert_eq!(symbols, ["SUI", "CETUS", "DEEP"]);
        assert_eq!(view.tokens[0].address, NATIVE_COIN_FULL);
        assert_eq!(view.tokens[0].usd_value(), 9.0);
        assert_eq!(view.tokens[0].logo, "https://img.example/sui.png");
        assert_eq!(view.tokens[1].logo, "https://img.example/cetus.png");
        assert_eq!(view.tokens[2].logo, logos.placeholder());
    }
}

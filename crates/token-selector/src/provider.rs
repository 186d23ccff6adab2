use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::address::CanonicalAddress;
use crate::error::ProviderError;
use crate::token::{TokenDescriptor, WalletBalance};

/// Balances of the connected account.
#[async_trait]
pub trait WalletSource: Send + Sync {
    /// Balances already held in memory; must not touch the network.
    fn cached_balances(&self) -> Vec<WalletBalance>;

    /// Re-query balances from the chain.
    async fn refresh_balances(&self) -> Result<Vec<WalletBalance>, ProviderError>;
}

/// A list of token descriptors: the trending feed or the full catalog.
#[async_trait]
pub trait TokenListSource: Send + Sync {
    async fn fetch_tokens(&self) -> Result<Vec<TokenDescriptor>, ProviderError>;
}

/// Logo metadata lookup for a single coin.
#[async_trait]
pub trait LogoSource: Send + Sync {
    /// Short provider name used in logs.
    fn name(&self) -> &str;

    async fn fetch_logo(&self, address: &CanonicalAddress)
        -> Result<Option<String>, ProviderError>;
}

/// A logo source that never knows anything.
pub struct EmptyLogoSource;

#[async_trait]
impl LogoSource for EmptyLogoSource {
    fn name(&self) -> &str {
        "empty"
    }

    async fn fetch_logo(
        &self,
        _address: &CanonicalAddress,
    ) -> Result<Option<String>, ProviderError> {
        Ok(None)
    }
}

/// In-memory logo source. Counts lookups so callers can observe fetches.
pub struct StaticLogoSource {
    name: String,
    logos: HashMap<CanonicalAddress, String>,
    calls: AtomicUsize,
}

impl StaticLogoSource {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            logos: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn insert(&mut self, address: &str, url: &str) {
        self.logos
            .insert(CanonicalAddress::new(address), url.to_string());
    }

    pub fn with(mut self, address: &str, url: &str) -> Self {
        self.insert(address, url);
        self
    }

    /// Number of `fetch_logo` calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LogoSource for StaticLogoSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_logo(
        &self,
        address: &CanonicalAddress,
    ) -> Result<Option<String>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.logos.get(address).cloned())
    }
}

/// In-memory token list.
pub struct StaticTokenList {
    tokens: Vec<TokenDescriptor>,
}

impl StaticTokenList {
    pub fn new(tokens: Vec<TokenDescriptor>) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl TokenListSource for StaticTokenList {
    async fn fetch_tokens(&self) -> Result<Vec<TokenDescriptor>, ProviderError> {
        Ok(self.tokens.clone())
    }
}

/// In-memory wallet. `refresh_balances` promotes the pending balances into
/// the cache, the way a wallet adapter fills its store after an RPC call.
pub struct StaticWallet {
    cached: Mutex<Vec<WalletBalance>>,
    on_refresh: Vec<WalletBalance>,
    refreshes: AtomicUsize,
}

impl StaticWallet {
    /// A wallet whose balances are already cached.
    pub fn cached(balances: Vec<WalletBalance>) -> Self {
        Self {
            cached: Mutex::new(balances.clone()),
            on_refresh: balances,
            refreshes: AtomicUsize::new(0),
        }
    }

    /// A wallet that only knows its balances after a refresh.
    pub fn cold(balances: Vec<WalletBalance>) -> Self {
        Self {
            cached: Mutex::new(Vec::new()),
            on_refresh: balances,
            refreshes: AtomicUsize::new(0),
        }
    }

    pub fn empty() -> Self {
        Self::cold(Vec::new())
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletSource for StaticWallet {
    fn cached_balances(&self) -> Vec<WalletBalance> {
        self.cached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn refresh_balances(&self) -> Result<Vec<WalletBalance>, ProviderError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        *cached = self.on_refresh.clone();
        Ok(cached.clone())
    }
}

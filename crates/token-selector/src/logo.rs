//! Logo resolution cache.
//!
//! Logos are looked up in this order: the logo the caller already has, the
//! primary provider cache, the fallback cache (seeded from token lists), the
//! secondary provider cache, then a live fetch against the primary and the
//! secondary provider. Entries live as long as the `LogoCache` value.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use futures::future::{join_all, BoxFuture, FutureExt, Shared};
use tracing::{debug, warn};
use url::Url;

use crate::address::CanonicalAddress;
use crate::config::SelectorConfig;
use crate::provider::LogoSource;

type PendingFetch = Shared<BoxFuture<'static, Option<String>>>;

#[derive(Default)]
struct LogoState {
    primary: HashMap<CanonicalAddress, String>,
    fallback: HashMap<CanonicalAddress, String>,
    secondary: HashMap<CanonicalAddress, String>,
    /// URLs that failed to load. Never handed out again.
    failed: HashSet<String>,
    /// Addresses whose live fetch already ran.
    fetched: HashSet<CanonicalAddress>,
    /// Addresses that already used their one post-failure refetch.
    retried: HashSet<CanonicalAddress>,
    pending: HashMap<CanonicalAddress, PendingFetch>,
}

/// Acceptance rules for logo URLs.
#[derive(Debug, Clone)]
struct LogoPolicy {
    placeholder: String,
    rejected_hosts: Vec<String>,
}

impl LogoPolicy {
    fn is_usable(&self, url: &str, failed: &HashSet<String>) -> bool {
        !url.is_empty() && url != self.placeholder && !failed.contains(url) && is_web_url(url)
    }

    /// IPFS / Arweave style URLs, either by scheme, gateway path or host.
    fn is_decentralized_storage(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };

        if matches!(parsed.scheme(), "ipfs" | "ipns" | "ar") {
            return true;
        }
        if parsed.path().starts_with("/ipfs/") || parsed.path().starts_with("/ipns/") {
            return true;
        }

        let host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();
        host.contains(".ipfs.")
            || self
                .rejected_hosts
                .iter()
                .any(|h| host == *h || host.ends_with(&format!(".{h}")))
    }

    fn pick<'a>(
        &self,
        state: &'a LogoState,
        key: &CanonicalAddress,
        direct: Option<&'a str>,
    ) -> Option<&'a str> {
        let usable = |url: &&str| self.is_usable(url, &state.failed);

        direct
            .map(str::trim)
            .filter(usable)
            .or_else(|| state.primary.get(key).map(String::as_str).filter(usable))
            .or_else(|| state.fallback.get(key).map(String::as_str).filter(usable))
            .or_else(|| state.secondary.get(key).map(String::as_str).filter(usable))
    }
}

fn is_web_url(url: &str) -> bool {
    if url.starts_with("data:image/") {
        return true;
    }
    match Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some(),
        Err(_) => false,
    }
}

fn read_state(state: &RwLock<LogoState>) -> RwLockReadGuard<'_, LogoState> {
    state.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_state(state: &RwLock<LogoState>) -> RwLockWriteGuard<'_, LogoState> {
    state.write().unwrap_or_else(PoisonError::into_inner)
}

fn evict(map: &mut HashMap<CanonicalAddress, String>, key: &CanonicalAddress, url: &str) {
    if map.get(key).is_some_and(|cached| cached == url) {
        map.remove(key);
    }
}

/// Process-scoped logo cache backed by two priority-ordered providers.
///
/// Construct once and share it (`Arc<LogoCache>`) between selector sessions;
/// nothing here expires.
pub struct LogoCache {
    state: Arc<RwLock<LogoState>>,
    primary: Arc<dyn LogoSource>,
    secondary: Arc<dyn LogoSource>,
    policy: Arc<LogoPolicy>,
    batch_size: usize,
}

impl LogoCache {
    pub fn new(
        primary: Arc<dyn LogoSource>,
        secondary: Arc<dyn LogoSource>,
        config: &SelectorConfig,
    ) -> Self {
        Self {
            state: Arc::new(RwLock::new(LogoState::default())),
            primary,
            secondary,
            policy: Arc::new(LogoPolicy {
                placeholder: config.placeholder_logo.clone(),
                rejected_hosts: config
                    .rejected_logo_hosts
                    .iter()
                    .map(|h| h.to_ascii_lowercase())
                    .collect(),
            }),
            batch_size: config.logo_batch_size.max(1),
        }
    }

    pub fn placeholder(&self) -> &str {
        &self.policy.placeholder
    }

    /// Best logo already known for `address`, without any network access.
    pub fn cached_logo(&self, address: &str, direct: Option<&str>) -> Option<String> {
        let key = CanonicalAddress::new(address);
        let state = read_state(&self.state);
        self.policy.pick(&state, &key, direct).map(str::to_string)
    }

    /// Like [`cached_logo`](Self::cached_logo) but falls back to the placeholder.
    pub fn logo_for(&self, address: &str, direct: Option<&str>) -> String {
        self.cached_logo(address, direct)
            .unwrap_or_else(|| self.policy.placeholder.clone())
    }

    /// Record a logo from a token list. The first usable URL per address wins.
    pub fn seed_fallback(&self, address: &str, url: &str) -> bool {
        let url = url.trim();
        let key = CanonicalAddress::new(address);
        let mut state = write_state(&self.state);
        if !self.policy.is_usable(url, &state.failed) || state.fallback.contains_key(&key) {
            return false;
        }
        state.fallback.insert(key, url.to_string());
        true
    }

    pub fn is_failed(&self, url: &str) -> bool {
        read_state(&self.state).failed.contains(url.trim())
    }

    /// Whether a live fetch for `address` is in flight.
    pub fn is_pending(&self, address: &str) -> bool {
        read_state(&self.state)
            .pending
            .contains_key(&CanonicalAddress::new(address))
    }

    /// Resolve a logo, fetching from the providers when no cache has one.
    ///
    /// Concurrent calls for the same address share one fetch. An address is
    /// fetched at most once, plus once more after [`mark_failed`](Self::mark_failed).
    pub async fn resolve_logo(&self, address: &str, direct: Option<&str>) -> Option<String> {
        let key = CanonicalAddress::new(address);

        let fetch = {
            let mut state = write_state(&self.state);
            if let Some(url) = self.policy.pick(&state, &key, direct) {
                debug!(address = %key, "logo cache hit");
                return Some(url.to_string());
            }

            if let Some(pending) = state.pending.get(&key) {
                debug!(address = %key, "joining in-flight logo fetch");
                pending.clone()
            } else if state.fetched.contains(&key) {
                return None;
            } else {
                let fetch = fetch_remote(
                    key.clone(),
                    Arc::clone(&self.primary),
                    Arc::clone(&self.secondary),
                    Arc::clone(&self.state),
                    Arc::clone(&self.policy),
                )
                .boxed()
                .shared();
                state.fetched.insert(key.clone());
                state.pending.insert(key.clone(), fetch.clone());
                fetch
            }
        };

        let url = fetch.await?;
        // The URL may have been reported broken while the fetch was running.
        if self.is_failed(&url) {
            return None;
        }
        Some(url)
    }

    /// Record a URL that failed to load for `address`.
    ///
    /// The URL is never returned again. The address gets one more live
    /// fetch; a second failure leaves it on whatever the caches still hold.
    pub fn mark_failed(&self, address: &str, url: &str) {
        let key = CanonicalAddress::new(address);
        let url = url.trim();
        let mut state = write_state(&self.state);

        state.failed.insert(url.to_string());
        evict(&mut state.primary, &key, url);
        evict(&mut state.fallback, &key, url);
        evict(&mut state.secondary, &key, url);

        if state.retried.insert(key.clone()) {
            debug!(address = %key, url = %url, "logo failed to load, allowing one refetch");
            state.fetched.remove(&key);
        } else {
            debug!(address = %key, url = %url, "logo failed to load again, no further refetch");
        }
    }

    /// Resolve logos for many addresses, `batch_size` at a time.
    ///
    /// Batches run one after another; lookups inside a batch run
    /// concurrently. Returns how many addresses ended with a logo.
    pub async fn prefetch<S: AsRef<str>>(&self, addresses: &[S]) -> usize {
        let todo: Vec<CanonicalAddress> = {
            let state = read_state(&self.state);
            let mut seen = HashSet::new();
            addresses
                .iter()
                .map(|a| CanonicalAddress::new(a.as_ref()))
                .filter(|key| seen.insert(key.clone()))
                // A fetch whose caller went away is still pending; join it.
                .filter(|key| {
                    self.policy.pick(&state, key, None).is_none()
                        && (!state.fetched.contains(key) || state.pending.contains_key(key))
                })
                .collect()
        };

        let mut resolved = 0;
        for batch in todo.chunks(self.batch_size) {
            debug!(size = batch.len(), "prefetching logo batch");
            let lookups = batch.iter().map(|key| self.resolve_logo(key.as_str(), None));
            let results = join_all(lookups).await;
            resolved += results.iter().filter(|r| r.is_some()).count();
        }
        resolved
    }
}

async fn fetch_remote(
    key: CanonicalAddress,
    primary: Arc<dyn LogoSource>,
    secondary: Arc<dyn LogoSource>,
    state: Arc<RwLock<LogoState>>,
    policy: Arc<LogoPolicy>,
) -> Option<String> {
    let result = async {
        match primary.fetch_logo(&key).await {
            Ok(Some(url)) => {
                let url = url.trim().to_string();
                let mut guard = write_state(&state);
                if policy.is_usable(&url, &guard.failed) {
                    guard.primary.insert(key.clone(), url.clone());
                    return Some(url);
                }
                debug!(provider = primary.name(), address = %key, url = %url, "unusable logo");
            }
            Ok(None) => debug!(provider = primary.name(), address = %key, "no logo"),
            Err(e) => {
                warn!(provider = primary.name(), address = %key, error = %e, "logo lookup failed")
            }
        }

        match secondary.fetch_logo(&key).await {
            Ok(Some(url)) => {
                let url = url.trim().to_string();
                if policy.is_decentralized_storage(&url) {
                    warn!(
                        provider = secondary.name(),
                        address = %key,
                        url = %url,
                        "rejecting decentralized storage logo"
                    );
                    return None;
                }
                let mut guard = write_state(&state);
                if policy.is_usable(&url, &guard.failed) {
                    guard.secondary.insert(key.clone(), url.clone());
                    return Some(url);
                }
                debug!(
                    provider = secondary.name(),
                    address = %key,
                    url = %url,
                    "unusable logo"
                );
            }
            Ok(None) => debug!(provider = secondary.name(), address = %key, "no logo"),
            Err(e) => {
                warn!(provider = secondary.name(), address = %key, error = %e, "logo lookup failed")
            }
        }

        None
    }
    .await;

    write_state(&state).pending.remove(&key);
    result
}

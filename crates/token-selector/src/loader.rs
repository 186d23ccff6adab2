//! Progressive loading of the selector's token list.
//!
//! A session starts in [`DisplayState::Loading`] and moves forward as the
//! wallet, the trending feed and the catalog resolve. The current view is
//! published on a `tokio::sync::watch` channel.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt};
use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::address::CanonicalAddress;
use crate::error::ProviderError;
use crate::logo::LogoCache;
use crate::merge::{apply_logos, merge};
use crate::provider::{TokenListSource, WalletSource};
use crate::sort::{filter_tokens, smart_sort};
use crate::token::{TokenDescriptor, TokenRecord, WalletBalance};

/// Which token sets the selector is showing. Ordered by completeness.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum DisplayState {
    #[default]
    Loading,
    Wallet,
    Trending,
    All,
}

/// What the selector currently shows: filtered and sorted by `query`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectorView {
    pub state: DisplayState,
    pub tokens: Vec<TokenRecord>,
    pub query: String,
}

/// Receives the token the user picked.
pub type SelectionCallback = Box<dyn Fn(&TokenRecord) + Send + Sync>;

#[derive(Default)]
struct Session {
    generation: u64,
    state: DisplayState,
    merged: Vec<TokenRecord>,
    query: String,
}

enum Outcome {
    Wallet(Result<Vec<WalletBalance>, ProviderError>),
    Trending(Result<Vec<TokenDescriptor>, ProviderError>),
    Catalog(Result<Vec<TokenDescriptor>, ProviderError>),
}

/// Everything one `open` has learned so far.
#[derive(Default)]
struct Progress {
    wallet: Vec<WalletBalance>,
    trending: Option<Result<Vec<TokenDescriptor>, ProviderError>>,
    catalog: Option<Result<Vec<TokenDescriptor>, ProviderError>>,
}

impl Progress {
    fn trending_tokens(&self) -> Option<&[TokenDescriptor]> {
        match self.trending {
            Some(Ok(ref tokens)) => Some(tokens.as_slice()),
            _ => None,
        }
    }

    fn catalog_tokens(&self) -> Option<&[TokenDescriptor]> {
        match self.catalog {
            Some(Ok(ref tokens)) => Some(tokens.as_slice()),
            _ => None,
        }
    }

    /// Best intermediate stage while at least one list is still loading.
    fn interim(&self, logos: &LogoCache) -> Option<(DisplayState, Vec<TokenRecord>)> {
        if let Some(trending) = self.trending_tokens() {
            return Some((DisplayState::Trending, merge(&self.wallet, &[], trending, logos)));
        }
        if !self.wallet.is_empty() {
            return Some((DisplayState::Wallet, merge(&self.wallet, &[], &[], logos)));
        }
        None
    }

    /// Final stage once both lists have settled, successfully or not.
    fn terminal(&self, logos: &LogoCache) -> (DisplayState, Vec<TokenRecord>) {
        let trending = self.trending_tokens();
        let catalog = self.catalog_tokens();

        if trending.is_none() && catalog.is_none() && !self.wallet.is_empty() {
            return (DisplayState::Wallet, merge(&self.wallet, &[], &[], logos));
        }

        let merged = merge(
            &self.wallet,
            catalog.unwrap_or_default(),
            trending.unwrap_or_default(),
            logos,
        );
        (DisplayState::All, merged)
    }
}

/// Token selector session driver.
///
/// The logo cache is shared and outlives sessions; everything else is reset
/// by [`open`](Self::open).
pub struct TokenSelector {
    wallet: Arc<dyn WalletSource>,
    trending: Arc<dyn TokenListSource>,
    catalog: Arc<dyn TokenListSource>,
    logos: Arc<LogoCache>,
    session: Mutex<Session>,
    view: watch::Sender<SelectorView>,
    on_select: Option<SelectionCallback>,
}

impl TokenSelector {
    pub fn new(
        wallet: Arc<dyn WalletSource>,
        trending: Arc<dyn TokenListSource>,
        catalog: Arc<dyn TokenListSource>,
        logos: Arc<LogoCache>,
    ) -> Self {
        let (view, _) = watch::channel(SelectorView::default());
        Self {
            wallet,
            trending,
            catalog,
            logos,
            session: Mutex::new(Session::default()),
            view,
            on_select: None,
        }
    }

    /// Register the callback invoked by [`select`](Self::select).
    pub fn on_select(mut self, callback: impl Fn(&TokenRecord) + Send + Sync + 'static) -> Self {
        self.on_select = Some(Box::new(callback));
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<SelectorView> {
        self.view.subscribe()
    }

    pub fn view(&self) -> SelectorView {
        self.view.borrow().clone()
    }

    pub fn state(&self) -> DisplayState {
        self.view.borrow().state
    }

    pub fn logos(&self) -> &Arc<LogoCache> {
        &self.logos
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, session: &Session) {
        let visible = filter_tokens(&session.merged, &session.query);
        let tokens = smart_sort(&visible, &session.query);
        self.view.send_replace(SelectorView {
            state: session.state,
            tokens,
            query: session.query.clone(),
        });
    }

    /// Start a new session in `Loading`. Returns its generation.
    fn reset(&self) -> u64 {
        let mut session = self.lock();
        let generation = session.generation + 1;
        *session = Session {
            generation,
            ..Session::default()
        };
        self.publish(&session);
        generation
    }

    /// Move the session forward. Stale sessions and backward moves are ignored.
    fn advance(&self, generation: u64, state: DisplayState, merged: Vec<TokenRecord>) -> bool {
        let mut session = self.lock();
        if session.generation != generation {
            debug!(generation, current = session.generation, "dropping update from stale session");
            return false;
        }
        if state < session.state {
            debug!(from = ?session.state, to = ?state, "ignoring backward transition");
            return false;
        }

        if state != session.state {
            debug!(
                from = ?session.state,
                to = ?state,
                tokens = merged.len(),
                "display state advanced"
            );
        }
        session.state = state;
        session.merged = merged;
        self.publish(&session);
        true
    }

    /// Run a full selector session and return the state it ended in.
    ///
    /// Cached wallet balances are shown right away; otherwise balances are
    /// refreshed alongside the trending and catalog fetches. The session
    /// reaches its final state as soon as both lists have settled; a wallet
    /// refresh landing after that is merged in without changing the state,
    /// and `open` returns once it has. Provider failures are logged and
    /// degrade the result, they never leave the session in `Loading`.
    ///
    /// If a newer `open` started meanwhile, the newer session's state is
    /// returned.
    pub async fn open(&self) -> DisplayState {
        let generation = self.reset();
        info!(generation, "token selector opened");

        let mut progress = Progress {
            wallet: self.wallet.cached_balances(),
            ..Progress::default()
        };

        let mut tasks: FuturesUnordered<BoxFuture<'_, Outcome>> = FuturesUnordered::new();
        if progress.wallet.is_empty() {
            debug!("no cached balances, refreshing");
            tasks.push(
                async move { Outcome::Wallet(self.wallet.refresh_balances().await) }.boxed(),
            );
        } else {
            let merged = merge(&progress.wallet, &[], &[], &self.logos);
            self.advance(generation, DisplayState::Wallet, merged);
        }
        tasks.push(async move { Outcome::Trending(self.trending.fetch_tokens().await) }.boxed());
        tasks.push(async move { Outcome::Catalog(self.catalog.fetch_tokens().await) }.boxed());

        let mut settled: Option<DisplayState> = None;
        while let Some(outcome) = tasks.next().await {
            match outcome {
                Outcome::Wallet(Ok(balances)) => {
                    debug!(count = balances.len(), "wallet balances refreshed");
                    progress.wallet = balances;
                }
                Outcome::Wallet(Err(e)) => warn!(error = %e, "wallet balance refresh failed"),
                Outcome::Trending(result) => {
                    if let Err(ref e) = result {
                        warn!(error = %e, "trending token fetch failed");
                    }
                    progress.trending = Some(result);
                }
                Outcome::Catalog(result) => {
                    if let Err(ref e) = result {
                        warn!(error = %e, "token catalog fetch failed");
                    }
                    progress.catalog = Some(result);
                }
            }

            if progress.trending.is_none() || progress.catalog.is_none() {
                if let Some((state, merged)) = progress.interim(&self.logos) {
                    self.advance(generation, state, merged);
                }
                continue;
            }

            // Both lists are in: the state is fixed from here on. A wallet
            // refresh still in flight only re-merges at that state.
            let (state, merged) = progress.terminal(&self.logos);
            let state = match settled {
                Some(state) => state,
                None => {
                    info!(generation, state = ?state, tokens = merged.len(), "token selector loaded");
                    *settled.insert(state)
                }
            };
            self.advance(generation, state, merged);
        }

        self.current_state(generation)
    }

    /// The state a session ended in, or the newer session's state if it was
    /// superseded.
    fn current_state(&self, generation: u64) -> DisplayState {
        let session = self.lock();
        if session.generation != generation {
            debug!(generation, current = session.generation, "open superseded by a newer session");
        }
        session.state
    }

    /// Change the search query; the view is re-filtered and re-sorted.
    pub fn set_query(&self, query: &str) {
        let mut session = self.lock();
        session.query = query.to_string();
        self.publish(&session);
    }

    /// Fetch logos for rows still showing the placeholder, then republish.
    pub async fn refresh_logos(&self) -> usize {
        let missing: Vec<String> = {
            let session = self.lock();
            session
                .merged
                .iter()
                .filter(|t| t.logo == self.logos.placeholder())
                .map(|t| t.address.clone())
                .collect()
        };
        if missing.is_empty() {
            return 0;
        }

        let resolved = self.logos.prefetch(&missing).await;
        let mut session = self.lock();
        apply_logos(&mut session.merged, &self.logos);
        self.publish(&session);
        resolved
    }

    /// Report a logo that failed to render. The cache gets one more try for
    /// this address; the view is republished with the result.
    pub async fn report_logo_error(&self, address: &str, url: &str) -> String {
        self.logos.mark_failed(address, url);
        self.logos.resolve_logo(address, None).await;

        let key = CanonicalAddress::new(address);
        let mut session = self.lock();
        for record in session.merged.iter_mut().filter(|t| t.key() == key) {
            if record.logo == url.trim() {
                record.logo = self.logos.logo_for(&record.address, None);
            }
        }
        self.publish(&session);
        self.logos.logo_for(address, None)
    }

    /// Pick a token from the current session. The record carries the best
    /// logo available, fetching one if the row still has the placeholder.
    pub async fn select(&self, address: &str) -> Option<TokenRecord> {
        let key = CanonicalAddress::new(address);
        let mut record = {
            let session = self.lock();
            session.merged.iter().find(|t| t.key() == key).cloned()
        }?;

        let direct = (record.logo != self.logos.placeholder()).then(|| record.logo.clone());
        if let Some(logo) = self.logos.resolve_logo(&record.address, direct.as_deref()).await {
            record.logo = logo;
        } else {
            record.logo = self.logos.placeholder().to_string();
        }

        info!(address = %key, symbol = %record.symbol, "token selected");
        if let Some(ref callback) = self.on_select {
            callback(&record);
        }
        Some(record)
    }
}

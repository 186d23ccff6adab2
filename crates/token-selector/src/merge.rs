use std::collections::HashMap;

use crate::address::CanonicalAddress;
use crate::logo::LogoCache;
use crate::token::{sanitize, TokenDescriptor, TokenRecord, WalletBalance};

/// Token collection keyed by canonical address, kept in insertion order.
#[derive(Debug, Default)]
struct TokenBook {
    index: HashMap<CanonicalAddress, usize>,
    records: Vec<TokenRecord>,
}

impl TokenBook {
    fn get_mut(&mut self, key: &CanonicalAddress) -> Option<&mut TokenRecord> {
        let idx = *self.index.get(key)?;
        self.records.get_mut(idx)
    }

    fn insert(&mut self, key: CanonicalAddress, record: TokenRecord) {
        self.index.insert(key, self.records.len());
        self.records.push(record);
    }

    fn into_records(self) -> Vec<TokenRecord> {
        self.records
    }
}

/// Merge wallet holdings, the catalog and the trending feed into one record
/// per canonical address.
///
/// Wallet entries go in first and keep their balance, decimals and logo.
/// Catalog and trending entries only add addresses not seen yet; for known
/// addresses they fill in a missing price and the trending flag. Logos come
/// from `logos` in the order wallet, primary provider, token lists,
/// secondary provider, placeholder. The result is unsorted.
pub fn merge(
    wallet: &[WalletBalance],
    catalog: &[TokenDescriptor],
    trending: &[TokenDescriptor],
    logos: &LogoCache,
) -> Vec<TokenRecord> {
    for desc in catalog.iter().chain(trending) {
        if let Some(ref logo) = desc.logo {
            logos.seed_fallback(&desc.address, logo);
        }
    }

    let mut book = TokenBook::default();
    let mut held: HashMap<CanonicalAddress, f64> = HashMap::new();

    for balance in wallet {
        let key = CanonicalAddress::new(&balance.coin_type);
        let amount = sanitize(balance.balance);
        *held.entry(key.clone()).or_insert(0.0) += amount;

        // The same coin reported twice (shorthand and full form) is one holding.
        if let Some(existing) = book.get_mut(&key) {
            existing.balance = sanitize(existing.balance + amount);
            continue;
        }

        let logo = logos.logo_for(key.as_str(), balance.logo.as_deref());
        book.insert(key, balance.clone().into_record(logo));
    }

    for desc in catalog {
        absorb(&mut book, &held, desc, false, logos);
    }

    for desc in trending {
        absorb(&mut book, &held, desc, true, logos);
    }

    book.into_records()
}

fn absorb(
    book: &mut TokenBook,
    held: &HashMap<CanonicalAddress, f64>,
    desc: &TokenDescriptor,
    from_trending: bool,
    logos: &LogoCache,
) {
    let key = desc.key();
    let trending = from_trending || desc.is_trending.unwrap_or(false);

    if let Some(existing) = book.get_mut(&key) {
        existing.is_trending |= trending;
        if existing.price == 0.0 && desc.price.is_finite() && desc.price > 0.0 {
            existing.price = desc.price;
        }
        return;
    }

    let balance = held.get(&key).copied().unwrap_or(0.0);
    let logo = logos.logo_for(key.as_str(), None);
    let mut record = desc.to_record(balance, logo);
    record.is_trending |= trending;
    book.insert(key, record);
}

/// Swap placeholder or broken logos for whatever the cache knows now.
pub fn apply_logos(records: &mut [TokenRecord], logos: &LogoCache) {
    for record in records.iter_mut() {
        if record.logo == logos.placeholder() || logos.is_failed(&record.logo) {
            record.logo = logos.logo_for(&record.address, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use super::*;
    use crate::address::NATIVE_COIN_FULL;
    use crate::config::SelectorConfig;
    use crate::provider::{EmptyLogoSource, StaticLogoSource};

    fn logos() -> LogoCache {
        LogoCache::new(
            Arc::new(EmptyLogoSource),
            Arc::new(EmptyLogoSource),
            &SelectorConfig::default(),
        )
    }

    fn wallet(coin_type: &str, symbol: &str, balance: f64) -> WalletBalance {
        WalletBalance {
            coin_type: coin_type.to_string(),
            symbol: symbol.to_string(),
            name: symbol.to_string(),
            decimals: 9,
            balance,
            logo: None,
        }
    }

    fn desc(address: &str, symbol: &str, price: f64, logo: Option<&str>) -> TokenDescriptor {
        TokenDescriptor {
            address: address.to_string(),
            symbol: symbol.to_string(),
            name: symbol.to_string(),
            logo: logo.map(str::to_string),
            decimals: 6,
            price,
            is_trending: None,
        }
    }

    #[test]
    fn test_one_record_per_canonical_address() {
        let logos = logos();
        let merged = merge(
            &[wallet("0x2::sui::SUI", "SUI", 2.0)],
            &[
                desc(NATIVE_COIN_FULL, "SUI", 3.5, None),
                desc("0xAA::x::X", "X", 1.0, None),
            ],
            &[desc("0x2::sui::SUI", "SUI", 3.5, None), desc("0xAA::x::X", "X", 1.0, None)],
            &logos,
        );

        let keys: HashSet<_> = merged.iter().map(TokenRecord::key).collect();
        assert_eq!(keys.len(), merged.len());
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_wallet_balance_kept_and_trending_ored() {
        let logos = logos();
        let merged = merge(
            &[wallet("0xAA::x::X", "X", 100.0)],
            &[],
            &[desc("0xAA::x::X", "X-TRENDING", 4.0, None)],
            &logos,
        );

        assert_eq!(merged.len(), 1);
        let x = &merged[0];
        assert_eq!(x.balance, 100.0);
        assert!(x.is_trending);
        assert_eq!(x.symbol, "X");
        assert_eq!(x.decimals, 9);
        // Wallets quote no price; the trending feed fills it.
        assert_eq!(x.price, 4.0);
    }

    #[test]
    fn test_catalog_does_not_override_wallet_logo() {
        let logos = logos();
        let mut held = wallet("0xAA::x::X", "X", 1.0);
        held.logo = Some("https://wallet.example/x.png".to_string());

        let merged = merge(
            &[held],
            &[desc("0xAA::x::X", "X", 1.0, Some("https://list.example/x.png"))],
            &[],
            &logos,
        );
        assert_eq!(merged[0].logo, "https://wallet.example/x.png");
    }

    #[test]
    fn test_logo_priority_across_sources() {
        let primary = Arc::new(StaticLogoSource::new("a"));
        let logos = LogoCache::new(primary, Arc::new(EmptyLogoSource), &SelectorConfig::default());

        let merged = merge(
            &[wallet("0xAA::x::X", "X", 1.0)],
            &[desc("0xBB::y::Y", "Y", 1.0, Some("https://list.example/y.png"))],
            &[desc("0xCC::z::Z", "Z", 1.0, None)],
            &logos,
        );

        let by_symbol = |s: &str| merged.iter().find(|r| r.symbol == s).unwrap().logo.clone();
        assert_eq!(by_symbol("X"), logos.placeholder());
        assert_eq!(by_symbol("Y"), "https://list.example/y.png");
        assert_eq!(by_symbol("Z"), logos.placeholder());
    }

    #[test]
    fn test_zero_valued_tokens_kept() {
        let logos = logos();
        let mut zero = desc("0xDD::d::D", "D", 0.0, None);
        zero.decimals = 0;
        let merged = merge(&[], &[zero], &[], &logos);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].decimals, 0);
        assert_eq!(merged[0].price, 0.0);
        assert_eq!(merged[0].balance, 0.0);
    }

    #[test]
    fn test_duplicate_wallet_entries_collapse() {
        let logos = logos();
        let merged = merge(
            &[
                wallet("0x2::sui::SUI", "SUI", 1.0),
                wallet(NATIVE_COIN_FULL, "SUI", 0.5),
            ],
            &[],
            &[],
            &logos,
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].balance, 1.5);
        assert_eq!(merged[0].address, NATIVE_COIN_FULL);
    }

    #[test]
    fn test_bad_wallet_balances_read_as_zero() {
        let logos = logos();
        let merged = merge(
            &[
                wallet("0x2::sui::SUI", "SUI", f64::NAN),
                wallet(NATIVE_COIN_FULL, "SUI", -5.0),
                wallet("0xAA::x::X", "X", f64::INFINITY),
            ],
            &[],
            &[],
            &logos,
        );
        assert_eq!(merged.len(), 2);
        for record in &merged {
            assert_eq!(record.balance, 0.0, "{}", record.symbol);
            assert!(!record.is_held());
        }
    }

    #[test]
    fn test_trending_only_token_flagged() {
        let logos = logos();
        let merged = merge(&[], &[], &[desc("0xAA", "X", 1.0, None)], &logos);
        assert!(merged[0].is_trending);
    }

    #[test]
    fn test_apply_logos_replaces_placeholder() {
        let logos = logos();
        let mut merged = merge(&[], &[desc("0xAA::x::X", "X", 1.0, None)], &[], &logos);
        assert_eq!(merged[0].logo, logos.placeholder());

        logos.seed_fallback("0xAA::x::X", "https://list.example/x.png");
        apply_logos(&mut merged, &logos);
        assert_eq!(merged[0].logo, "https://list.example/x.png");
    }
}

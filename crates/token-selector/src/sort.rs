use std::cmp::Ordering;

use crate::token::TokenRecord;

/// How well a token matches the search query. Lower sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum MatchTier {
    ExactSymbol,
    SymbolPrefix,
    Substring,
    NoMatch,
}

/// Classify `token` against an already lower-cased, trimmed query.
fn match_tier(token: &TokenRecord, query: &str) -> MatchTier {
    let symbol = token.symbol.to_lowercase();
    if symbol == query {
        MatchTier::ExactSymbol
    } else if symbol.starts_with(query) {
        MatchTier::SymbolPrefix
    } else if symbol.contains(query) || token.name.to_lowercase().contains(query) {
        MatchTier::Substring
    } else {
        MatchTier::NoMatch
    }
}

fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

/// Order tokens for display, returning a new vector.
///
/// Held tokens first, richest holdings first, then trending tokens, then
/// search relevance (when `query` is not blank), then price. Equal tokens
/// keep their input order.
pub fn smart_sort(tokens: &[TokenRecord], query: &str) -> Vec<TokenRecord> {
    let query = normalize_query(query);
    let mut keyed: Vec<(MatchTier, &TokenRecord)> = tokens
        .iter()
        .map(|t| {
            let tier = if query.is_empty() {
                MatchTier::NoMatch
            } else {
                match_tier(t, &query)
            };
            (tier, t)
        })
        .collect();

    keyed.sort_by(|(tier_a, a), (tier_b, b)| compare(a, *tier_a, b, *tier_b));
    keyed.into_iter().map(|(_, t)| t.clone()).collect()
}

fn compare(a: &TokenRecord, tier_a: MatchTier, b: &TokenRecord, tier_b: MatchTier) -> Ordering {
    b.is_held()
        .cmp(&a.is_held())
        .then_with(|| {
            if a.is_held() && b.is_held() {
                b.usd_value().total_cmp(&a.usd_value())
            } else {
                Ordering::Equal
            }
        })
        .then_with(|| b.is_trending.cmp(&a.is_trending))
        .then_with(|| tier_a.cmp(&tier_b))
        .then_with(|| b.price.total_cmp(&a.price))
}

/// Keep tokens whose symbol, name or address contains `query`
/// (case-insensitive). A blank query keeps everything.
pub fn filter_tokens(tokens: &[TokenRecord], query: &str) -> Vec<TokenRecord> {
    let query = normalize_query(query);
    if query.is_empty() {
        return tokens.to_vec();
    }

    tokens
        .iter()
        .filter(|t| {
            t.symbol.to_lowercase().contains(&query)
                || t.name.to_lowercase().contains(&query)
                || t.address.to_lowercase().contains(&query)
        })
        .cloned()
        .collect()
}

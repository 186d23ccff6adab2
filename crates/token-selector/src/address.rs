use std::fmt;

use serde::{Deserialize, Serialize};

/// Shorthand coin type wallets and SDKs use for native SUI.
pub const NATIVE_COIN_SHORT: &str = "0x2::sui::SUI";

/// Fully-qualified coin type for native SUI.
pub const NATIVE_COIN_FULL: &str =
    "0x0000000000000000000000000000000000000000000000000000000000000002::sui::SUI";

/// Canonicalize a coin address.
///
/// The native shorthand collapses to its fully-qualified form; every other
/// address is returned as given (minus surrounding whitespace). Applying it
/// twice is the same as applying it once.
pub fn normalize(address: &str) -> String {
    let trimmed = address.trim();
    if trimmed == NATIVE_COIN_SHORT {
        NATIVE_COIN_FULL.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Display label for a coin type: `0x1234...abcd::module::NAME`.
///
/// Addresses without a module path are shortened the same way; anything
/// too short to abbreviate is returned unchanged.
pub fn short_address(address: &str) -> String {
    let (package, rest) = match address.find("::") {
        Some(idx) => (&address[..idx], &address[idx..]),
        None => (address, ""),
    };

    if package.len() <= 12 || !package.is_ascii() {
        return address.to_string();
    }

    format!(
        "{}...{}{}",
        &package[..6],
        &package[package.len() - 4..],
        rest
    )
}

/// Normalized map key for a coin. All caches and merge maps key by this.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalAddress(String);

impl CanonicalAddress {
    pub fn new(address: &str) -> Self {
        Self(normalize(address))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn short(&self) -> String {
        short_address(&self.0)
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for CanonicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CanonicalAddress {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

impl AsRef<str> for CanonicalAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_shorthand_expands() {
        assert_eq!(normalize("0x2::sui::SUI"), NATIVE_COIN_FULL);
        assert_eq!(normalize("  0x2::sui::SUI "), NATIVE_COIN_FULL);
    }

    #[test]
    fn test_other_addresses_unchanged() {
        let usdc = "0xdba34672e30cb065b1f93e3ab55318768fd6fef66c15942c9f7cb846e2f900e7::usdc::USDC";
        assert_eq!(normalize(usdc), usdc);
        // Only an exact match of the shorthand is rewritten.
        assert_eq!(normalize("0x2::sui::SUIX"), "0x2::sui::SUIX");
    }

    #[test]
    fn test_normalize_idempotent() {
        for addr in [
            "0x2::sui::SUI",
            NATIVE_COIN_FULL,
            "0xAA",
            "",
            "0x5d4b302506645c37ff133b98c4b50a5ae14841659738d6d733d59d0d217a93bf::coin::COIN",
        ] {
            let once = normalize(addr);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn test_canonical_address_equality() {
        assert_eq!(
            CanonicalAddress::new("0x2::sui::SUI"),
            CanonicalAddress::new(NATIVE_COIN_FULL)
        );
    }

    #[test]
    fn test_short_address() {
        assert_eq!(
            short_address(NATIVE_COIN_FULL),
            "0x0000...0002::sui::SUI"
        );
        assert_eq!(short_address("0xAA"), "0xAA");
        assert_eq!(
            short_address("0x1234567890abcdef"),
            "0x1234...cdef"
        );
    }
}

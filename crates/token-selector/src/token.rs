use num_bigint::BigUint;
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::address::{short_address, CanonicalAddress};
use crate::error::Error;

/// One fungible asset as shown in the selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRecord {
    pub address: String,
    pub symbol: String,
    pub name: String,
    pub logo: String,
    pub decimals: u8,
    pub price: f64,
    pub balance: f64,
    #[serde(default)]
    pub is_trending: bool,
}

impl TokenRecord {
    /// Held quantity valued in USD.
    pub fn usd_value(&self) -> f64 {
        self.balance * self.price
    }

    pub fn is_held(&self) -> bool {
        self.balance > 0.0
    }

    pub fn key(&self) -> CanonicalAddress {
        CanonicalAddress::new(&self.address)
    }

    /// Display-only abbreviation of the address.
    pub fn short_address(&self) -> String {
        short_address(&self.address)
    }
}

/// A coin held by the connected account, as reported by the wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletBalance {
    pub coin_type: String,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    pub balance: f64,
    /// Icon the wallet already knows about, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

impl WalletBalance {
    /// Build a wallet entry from the raw integer balance an RPC returns
    /// (e.g. `"1500000000"` with 9 decimals is 1.5).
    pub fn from_raw(
        coin_type: &str,
        symbol: &str,
        name: &str,
        decimals: u8,
        raw_balance: &str,
    ) -> Result<Self, Error> {
        let balance = scale_raw_balance(raw_balance, decimals).map_err(|reason| Error::Balance {
            coin_type: coin_type.to_string(),
            reason,
        })?;

        Ok(Self {
            coin_type: coin_type.to_string(),
            symbol: symbol.to_string(),
            name: name.to_string(),
            decimals,
            balance,
            logo: None,
        })
    }

    /// Project into a record. Wallets quote no price; the merge fills it in.
    pub fn into_record(self, logo: String) -> TokenRecord {
        TokenRecord {
            address: CanonicalAddress::new(&self.coin_type).into_inner(),
            symbol: self.symbol,
            name: self.name,
            logo,
            decimals: self.decimals,
            price: 0.0,
            balance: sanitize(self.balance),
            is_trending: false,
        }
    }
}

/// Token descriptor returned by the trending feed and the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenDescriptor {
    pub address: String,
    pub symbol: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(default)]
    pub decimals: u8,
    #[serde(default)]
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_trending: Option<bool>,
}

impl TokenDescriptor {
    pub fn key(&self) -> CanonicalAddress {
        CanonicalAddress::new(&self.address)
    }

    /// Project into a record with the given held balance and resolved logo.
    pub fn to_record(&self, balance: f64, logo: String) -> TokenRecord {
        TokenRecord {
            address: self.key().into_inner(),
            symbol: self.symbol.clone(),
            name: self.name.clone(),
            logo,
            decimals: self.decimals,
            price: sanitize(self.price),
            balance: sanitize(balance),
            is_trending: self.is_trending.unwrap_or(false),
        }
    }
}

/// Negative and non-finite amounts read as zero.
pub(crate) fn sanitize(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

fn scale_raw_balance(raw: &str, decimals: u8) -> Result<f64, String> {
    let raw = raw.trim();
    let units = raw
        .parse::<BigUint>()
        .map_err(|e| format!("'{raw}' is not an unsigned integer: {e}"))?;

    let divisor = BigUint::from(10u32).pow(u32::from(decimals));
    let whole = &units / &divisor;
    let frac = &units % &divisor;

    let whole = whole
        .to_f64()
        .ok_or_else(|| format!("'{raw}' does not fit in f64"))?;
    let frac = frac.to_f64().unwrap_or(0.0) / divisor.to_f64().unwrap_or(1.0);

    Ok(whole + frac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::NATIVE_COIN_FULL;

    #[test]
    fn test_from_raw_scales_by_decimals() {
        let sui = WalletBalance::from_raw("0x2::sui::SUI", "SUI", "Sui", 9, "1500000000").unwrap();
        assert_eq!(sui.balance, 1.5);

        let zero_dec = WalletBalance::from_raw("0xAA::x::X", "X", "X", 0, "42").unwrap();
        assert_eq!(zero_dec.balance, 42.0);
    }

    #[test]
    fn test_from_raw_larger_than_u64() {
        let big = WalletBalance::from_raw("0xAA::x::X", "X", "X", 18, "100000000000000000000000")
            .unwrap();
        assert_eq!(big.balance, 100_000.0);
    }

    #[test]
    fn test_from_raw_rejects_garbage() {
        let err = WalletBalance::from_raw("0xAA::x::X", "X", "X", 9, "-12").unwrap_err();
        assert!(matches!(err, Error::Balance { .. }));
    }

    #[test]
    fn test_wallet_record_is_canonical() {
        let sui = WalletBalance::from_raw("0x2::sui::SUI", "SUI", "Sui", 9, "1000000000").unwrap();
        let record = sui.into_record("placeholder".to_string());
        assert_eq!(record.address, NATIVE_COIN_FULL);
        assert_eq!(record.balance, 1.0);
        assert!(record.is_held());
    }

    #[test]
    fn test_wallet_record_negative_balance_reads_as_zero() {
        let mut sui = WalletBalance::from_raw("0x2::sui::SUI", "SUI", "Sui", 9, "0").unwrap();
        sui.balance = -5.0;
        assert_eq!(sui.clone().into_record(String::new()).balance, 0.0);
        sui.balance = f64::NAN;
        assert_eq!(sui.into_record(String::new()).balance, 0.0);
    }

    #[test]
    fn test_descriptor_json_shape() {
        let json = r#"{
            "address": "0xAA",
            "symbol": "X",
            "name": "Token X",
            "logo": "https://example.com/x.png",
            "decimals": 6,
            "price": 2.5,
            "isTrending": true
        }"#;
        let desc: TokenDescriptor = serde_json::from_str(json).unwrap();
        let record = desc.to_record(0.0, "https://example.com/x.png".to_string());
        assert!(record.is_trending);
        assert_eq!(record.decimals, 6);
        assert_eq!(record.price, 2.5);
    }

    #[test]
    fn test_descriptor_negative_price_reads_as_zero() {
        let desc = TokenDescriptor {
            address: "0xAA".to_string(),
            symbol: "X".to_string(),
            name: "X".to_string(),
            logo: None,
            decimals: 0,
            price: -3.0,
            is_trending: None,
        };
        assert_eq!(desc.to_record(0.0, String::new()).price, 0.0);
    }
}

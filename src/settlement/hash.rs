//! Settlement idempotency key and fixed-point amount conversion.

use crate::core::errors::LedgerError;
use crate::core::models::{PaymentId, WalletAddress};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SettlementHash([u8; 32]);

impl SettlementHash {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for SettlementHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl Serialize for SettlementHash {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SettlementHash {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let digits = raw.strip_prefix("0x").unwrap_or(&raw);
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(digits, &mut bytes).map_err(serde::de::Error::custom)?;
        Ok(SettlementHash(bytes))
    }
}

/// Keccak-256 over the tightly packed tuple
/// `payer (20) ‖ payee (20) ‖ amount (32, big-endian) ‖ payment id (32, big-endian)`.
pub fn settlement_hash(
    payer: &WalletAddress,
    payee: &WalletAddress,
    amount_minor_units: u128,
    payment_id: PaymentId,
) -> SettlementHash {
    let mut hasher = Keccak256::new();
    hasher.update(payer.as_bytes());
    hasher.update(payee.as_bytes());
    hasher.update(word(amount_minor_units));
    hasher.update(word(payment_id.0.as_u128()));
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&hasher.finalize());
    SettlementHash(digest)
}

fn word(value: u128) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[16..].copy_from_slice(&value.to_be_bytes());
    out
}

/// Converts a currency amount to the registry's `decimals`-place fixed point.
///
/// Digits beyond `decimals` are truncated.
pub fn to_minor_units(amount: Decimal, decimals: u32) -> Result<u128, LedgerError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(LedgerError::AmountOutOfRange(format!("{} is negative", amount)));
    }
    let mantissa = amount.mantissa().unsigned_abs();
    let scale = amount.scale();
    let converted = if scale <= decimals {
        10u128
            .checked_pow(decimals - scale)
            .and_then(|factor| mantissa.checked_mul(factor))
    } else {
        10u128.checked_pow(scale - decimals).map(|divisor| mantissa / divisor)
    };
    converted.ok_or_else(|| {
        LedgerError::AmountOutOfRange(format!("{} does not fit {} decimals", amount, decimals))
    })
}

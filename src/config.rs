use dotenv::dotenv;
use once_cell::sync::Lazy;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::core::errors::LedgerError;
use crate::core::models::WalletAddress;
use crate::settlement::RetryPolicy;

/// Settlement contract and signing identity.
///
/// Only the in-process registry ships with this crate; these settings select
/// whether settlement is attempted at all.
pub struct RegistryConfig {
    pub contract_address: Option<String>,
    pub private_key: Option<String>,
}

impl RegistryConfig {
    /// Both the contract address and the signing key are required to submit.
    pub fn is_configured(&self) -> bool {
        self.contract_address.is_some() && self.private_key.is_some()
    }

    /// Rejects a half-configured registry and a malformed contract address.
    pub fn validate(&self) -> Result<(), LedgerError> {
        match (&self.contract_address, &self.private_key) {
            (Some(address), Some(_)) => address.parse::<WalletAddress>().map(|_| ()).map_err(|_| {
                LedgerError::ConfigError(format!(
                    "SETTLEMENT_CONTRACT_ADDRESS `{}` is not a 20-byte address",
                    address
                ))
            }),
            (None, None) => Ok(()),
            (Some(_), None) => Err(LedgerError::ConfigError(
                "SETTLEMENT_CONTRACT_ADDRESS is set but PRIVATE_KEY is missing".to_string(),
            )),
            (None, Some(_)) => Err(LedgerError::ConfigError(
                "PRIVATE_KEY is set but SETTLEMENT_CONTRACT_ADDRESS is missing".to_string(),
            )),
        }
    }
}

impl fmt::Debug for RegistryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryConfig")
            .field("contract_address", &self.contract_address)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug)]
pub struct Config {
    pub log_level: String,
    pub registry: RegistryConfig,
    pub settlement_max_attempts: u32,
    pub settlement_retry_delay: Duration,
    /// Fixed-point decimals of the registry's amount representation.
    pub settlement_decimals: u32,
    /// `None` disables the periodic global simplification.
    pub simplify_interval: Option<Duration>,
}

fn parsed<T: FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    fn from_env() -> Self {
        dotenv().ok();

        let simplify_secs: u64 = parsed("SIMPLIFY_INTERVAL_SECS", 0);
        Self {
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            registry: RegistryConfig {
                contract_address: optional("SETTLEMENT_CONTRACT_ADDRESS"),
                private_key: optional("PRIVATE_KEY"),
            },
            settlement_max_attempts: parsed("SETTLEMENT_MAX_ATTEMPTS", 6),
            settlement_retry_delay: Duration::from_secs(parsed("SETTLEMENT_RETRY_DELAY_SECS", 60)),
            settlement_decimals: parsed("SETTLEMENT_DECIMALS", 18),
            simplify_interval: (simplify_secs > 0).then(|| Duration::from_secs(simplify_secs)),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(self.settlement_max_attempts, self.settlement_retry_delay)
    }
}

pub static CONFIG: Lazy<Config> = Lazy::new(Config::from_env);

#[cfg(test)]
mod tests {
    use super::*;

    const CONTRACT: &str = "0x5fbdb2315678afecb367f032d93f642f64180aa3";

    fn registry(contract_address: Option<&str>, private_key: Option<&str>) -> RegistryConfig {
        RegistryConfig {
            contract_address: contract_address.map(String::from),
            private_key: private_key.map(String::from),
        }
    }

    #[test]
    fn registry_debug_hides_private_key() {
        let registry = registry(Some(CONTRACT), Some("0xac0974bec39a17e36ba4a6b4d238ff944bacb478"));
        let rendered = format!("{:?}", registry);
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("ac0974"));
        assert!(registry.is_configured());
        assert_eq!(registry.validate(), Ok(()));
    }

    #[test]
    fn registry_without_settings_is_valid_but_unconfigured() {
        let registry = registry(None, None);
        assert!(!registry.is_configured());
        assert_eq!(registry.validate(), Ok(()));
    }

    #[test]
    fn half_configured_registry_is_rejected() {
        let missing_key = registry(Some(CONTRACT), None);
        assert!(!missing_key.is_configured());
        assert!(matches!(missing_key.validate(), Err(LedgerError::ConfigError(_))));

        let missing_contract = registry(None, Some("0xac09"));
        assert!(matches!(missing_contract.validate(), Err(LedgerError::ConfigError(_))));
    }

    #[test]
    fn malformed_contract_address_is_rejected() {
        let registry = registry(Some("0x1234"), Some("0xac09"));
        let err = registry.validate().unwrap_err();
        assert!(matches!(err, LedgerError::ConfigError(message) if message.contains("0x1234")));
    }
}

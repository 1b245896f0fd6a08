use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

use crate::decimal::Rate;
use crate::errors::{LedgerError, Result};

/// key holding the late-fee percentage charged per day
pub const LATE_FEE_PERCENTAGE_KEY: &str = "late_fee_percentage";
/// key holding the minimum days late once a quota is overdue
pub const MINIMUM_OVERDUE_DAYS_KEY: &str = "minimum_overdue_days";

pub const DEFAULT_LATE_FEE_PERCENTAGE: Decimal = dec!(10);
pub const DEFAULT_MINIMUM_OVERDUE_DAYS: u32 = 1;

/// key-value settings store
pub trait ConfigSource {
    fn get(&self, key: &str) -> Option<String>;
}

impl ConfigSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// a parsed JSON settings object; strings and numbers are both accepted
impl ConfigSource for serde_json::Map<String, serde_json::Value> {
    fn get(&self, key: &str) -> Option<String> {
        match serde_json::Map::get(self, key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

/// a resolved config doubles as a fixed source
impl ConfigSource for BillingConfig {
    fn get(&self, key: &str) -> Option<String> {
        match key {
            LATE_FEE_PERCENTAGE_KEY => Some(self.late_fee_rate.as_percentage().to_string()),
            MINIMUM_OVERDUE_DAYS_KEY => Some(self.minimum_overdue_days.to_string()),
            _ => None,
        }
    }
}

/// billing parameters resolved once per pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    /// penalty per day as a fraction of the unpaid amount
    pub late_fee_rate: Rate,
    pub minimum_overdue_days: u32,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            late_fee_rate: Rate::from_percentage_decimal(DEFAULT_LATE_FEE_PERCENTAGE),
            minimum_overdue_days: DEFAULT_MINIMUM_OVERDUE_DAYS,
        }
    }
}

impl BillingConfig {
    pub fn new(late_fee_percentage: Decimal) -> Result<Self> {
        let config = Self {
            late_fee_rate: Rate::from_percentage_decimal(late_fee_percentage),
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// read settings from a key-value source, falling back to defaults
    pub fn load(source: &dyn ConfigSource) -> Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = source.get(LATE_FEE_PERCENTAGE_KEY) {
            let percentage = Decimal::from_str(raw.trim()).map_err(|e| LedgerError::InvalidConfiguration {
                message: format!("{LATE_FEE_PERCENTAGE_KEY}: {e}"),
            })?;
            config.late_fee_rate = Rate::from_percentage_decimal(percentage);
        }

        if let Some(raw) = source.get(MINIMUM_OVERDUE_DAYS_KEY) {
            config.minimum_overdue_days = raw.trim().parse().map_err(|e| LedgerError::InvalidConfiguration {
                message: format!("{MINIMUM_OVERDUE_DAYS_KEY}: {e}"),
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// parse a JSON settings object keyed like the key-value store
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(json).map_err(|e| LedgerError::InvalidConfiguration {
                message: e.to_string(),
            })?;
        Self::load(&settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.late_fee_rate.is_negative() {
            return Err(LedgerError::InvalidConfiguration {
                message: format!("late fee rate cannot be negative: {}", self.late_fee_rate),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_when_keys_missing() {
        let config = BillingConfig::load(&source(&[])).unwrap();
        assert_eq!(config, BillingConfig::default());
        assert_eq!(config.late_fee_rate.as_decimal(), dec!(0.1));
        assert_eq!(config.minimum_overdue_days, 1);
    }

    #[test]
    fn test_load_from_key_value_store() {
        let config = BillingConfig::load(&source(&[
            (LATE_FEE_PERCENTAGE_KEY, "2.5"),
            (MINIMUM_OVERDUE_DAYS_KEY, "3"),
        ]))
        .unwrap();

        assert_eq!(config.late_fee_rate.as_decimal(), dec!(0.025));
        assert_eq!(config.minimum_overdue_days, 3);
    }

    #[test]
    fn test_malformed_values_rejected() {
        let err = BillingConfig::load(&source(&[(LATE_FEE_PERCENTAGE_KEY, "ten")])).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidConfiguration { .. }));

        assert!(BillingConfig::load(&source(&[(LATE_FEE_PERCENTAGE_KEY, "-1")])).is_err());
        assert!(BillingConfig::load(&source(&[(MINIMUM_OVERDUE_DAYS_KEY, "-2")])).is_err());
    }

    #[test]
    fn test_config_reloads_from_itself() {
        let config = BillingConfig {
            late_fee_rate: Rate::from_percentage(3),
            minimum_overdue_days: 2,
        };
        assert_eq!(BillingConfig::load(&config).unwrap(), config);
    }

    #[test]
    fn test_from_json() {
        let config = BillingConfig::from_json(r#"{"late_fee_percentage": "5"}"#).unwrap();
        assert_eq!(config.late_fee_rate.as_decimal(), dec!(0.05));
        assert_eq!(config.minimum_overdue_days, 1);

        assert!(BillingConfig::from_json("not json").is_err());
        assert!(BillingConfig::from_json("[1, 2]").is_err());
    }

    #[test]
    fn test_json_and_key_value_share_units() {
        let json = BillingConfig::from_json(r#"{"late_fee_percentage": 2.5, "minimum_overdue_days": 3}"#).unwrap();
        let kv = BillingConfig::load(&source(&[
            (LATE_FEE_PERCENTAGE_KEY, "2.5"),
            (MINIMUM_OVERDUE_DAYS_KEY, "3"),
        ]))
        .unwrap();
        assert_eq!(json, kv);
        assert_eq!(json.late_fee_rate.as_decimal(), dec!(0.025));

        assert!(BillingConfig::from_json(r#"{"late_fee_percentage": -1}"#).is_err());
    }
}

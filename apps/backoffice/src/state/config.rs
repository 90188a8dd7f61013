//! # Configuration State
//!
//! Stores back-office configuration loaded at startup.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`CAJA_*`)
//! 2. Defaults (this file)
//!
//! ## Thread Safety
//! Configuration is read-only after initialization, so no mutex needed.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// Back-office configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigState {
    /// Database file override (`CAJA_DB_PATH`).
    /// `None` uses the platform data directory.
    pub db_path: Option<PathBuf>,

    /// Branch the admin monitor watches.
    pub branch_id: String,

    /// Store name (shown in the monitor header)
    pub store_name: String,

    /// Currency code (ISO 4217)
    pub currency_code: String,

    /// Currency symbol (for display)
    pub currency_symbol: String,

    /// Number of decimal places for currency
    pub currency_decimals: u8,

    /// Default page size of the session history
    pub history_limit: i64,
}

impl Default for ConfigState {
    /// Returns default configuration suitable for development.
    ///
    /// ## Default Values
    /// - Branch: "branch-dev"
    /// - Currency: CLP ($, no decimals)
    /// - History: 50 sessions
    fn default() -> Self {
        ConfigState {
            db_path: None,
            branch_id: "branch-dev".to_string(),
            store_name: "Caja Dev Store".to_string(),
            currency_code: "CLP".to_string(),
            currency_symbol: "$".to_string(),
            currency_decimals: 0,
            history_limit: 50,
        }
    }
}

impl ConfigState {
    /// Creates a new ConfigState from environment variables and defaults.
    ///
    /// ## Environment Variables
    /// - `CAJA_DB_PATH`: database file
    /// - `CAJA_BRANCH_ID`: branch to monitor
    /// - `CAJA_STORE_NAME`: store name
    /// - `CAJA_CURRENCY`: currency code
    /// - `CAJA_CURRENCY_DECIMALS`: minor-unit digits (0..=4)
    /// - `CAJA_HISTORY_LIMIT`: history page size
    ///
    /// Unparseable numbers keep the default and log a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = ConfigState::default();

        if let Some(path) = lookup("CAJA_DB_PATH") {
            config.db_path = Some(PathBuf::from(path));
        }

        if let Some(branch_id) = lookup("CAJA_BRANCH_ID") {
            config.branch_id = branch_id;
        }

        if let Some(store_name) = lookup("CAJA_STORE_NAME") {
            config.store_name = store_name;
        }

        if let Some(code) = lookup("CAJA_CURRENCY") {
            config.currency_code = code.to_uppercase();
        }

        if let Some(raw) = lookup("CAJA_CURRENCY_DECIMALS") {
            match raw.parse::<u8>() {
                Ok(decimals) if decimals <= 4 => config.currency_decimals = decimals,
                _ => warn!(value = %raw, "Ignoring invalid CAJA_CURRENCY_DECIMALS"),
            }
        }

        if let Some(raw) = lookup("CAJA_HISTORY_LIMIT") {
            match raw.parse::<i64>() {
                Ok(limit) if limit > 0 => config.history_limit = limit,
                _ => warn!(value = %raw, "Ignoring invalid CAJA_HISTORY_LIMIT"),
            }
        }

        config
    }

    /// Formats a minor-unit amount as a currency string.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let config = ConfigState::default(); // CLP
    /// assert_eq!(config.format_currency(15000), "$15.000");
    /// ```
    pub fn format_currency(&self, minor: i64) -> String {
        let divisor = 10_i64.pow(self.currency_decimals as u32);
        let whole = (minor / divisor).abs();
        let frac = (minor % divisor).abs();

        let grouped = group_thousands(whole, self.thousands_separator());

        format!(
            "{}{}{}",
            if minor < 0 { "-" } else { "" },
            self.currency_symbol,
            if self.currency_decimals > 0 {
                format!(
                    "{}{}{:0width$}",
                    grouped,
                    self.decimal_separator(),
                    frac,
                    width = self.currency_decimals as usize
                )
            } else {
                grouped
            }
        )
    }

    fn thousands_separator(&self) -> char {
        if self.currency_code == "CLP" {
            '.'
        } else {
            ','
        }
    }

    fn decimal_separator(&self) -> char {
        if self.currency_code == "CLP" {
            ','
        } else {
            '.'
        }
    }
}

fn group_thousands(value: i64, separator: char) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(c);
    }

    out
}

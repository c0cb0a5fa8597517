//! Engine configuration
//!
//! Settings are stored as TOML. Every field has a default, so an empty file
//! (or a missing section) yields the same engine as [`EngineConfig::default`].
//!
//! ```toml
//! [selection]
//! strategy = "largest_first"
//! fee_rate = "2.5"
//! fee_unit = "v_byte"
//!
//! [change]
//! dust_relay_fee = 3000
//!
//! [transaction]
//! version = 2
//!
//! [signing]
//! sighash = "ALL"
//!
//! [logging]
//! level = "info"
//! ```
//!
//! ## Security Considerations
//!
//! - No key material is ever stored in this configuration
//! - Values must pass [`EngineConfig::validate`] before they reach the signer

use crate::fee::{FeeRate, FeeUnit, DEFAULT_DUST_RELAY_FEE};
use crate::logging::{self, LogConfig, LogLevel};
use crate::utxo_selection::types::SelectionStrategy;
use anyhow::{anyhow, bail, Result};
use bitcoin::sighash::EcdsaSighashType;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fs;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub selection: SelectionConfig,

    #[serde(default)]
    pub change: ChangeConfig,

    #[serde(default)]
    pub transaction: TransactionConfig,

    #[serde(default)]
    pub signing: SigningConfig,

    #[serde(default)]
    pub logging: LogConfig,
}

/// Coin selection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionConfig {
    #[serde(default = "default_strategy")]
    pub strategy: SelectionStrategy,

    /// Fee rate, in `fee_unit`s
    #[serde(default = "default_fee_rate")]
    pub fee_rate: Decimal,

    #[serde(default = "default_fee_unit")]
    pub fee_unit: FeeUnit,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            fee_rate: default_fee_rate(),
            fee_unit: default_fee_unit(),
        }
    }
}

/// Change output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeConfig {
    /// Dust relay fee in sat/kvB
    #[serde(default = "default_dust_relay_fee")]
    pub dust_relay_fee: u64,
}

impl Default for ChangeConfig {
    fn default() -> Self {
        Self {
            dust_relay_fee: default_dust_relay_fee(),
        }
    }
}

/// Transaction assembly settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionConfig {
    #[serde(default = "default_version")]
    pub version: i32,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
        }
    }
}

/// Signing settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningConfig {
    /// Default sighash flag, e.g. `ALL` or `SINGLE|ANYONECANPAY`
    #[serde(default = "default_sighash")]
    pub sighash: String,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            sighash: default_sighash(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path.display(), e))?;

        let config: EngineConfig =
            toml::from_str(&content).map_err(|e| anyhow!("Failed to parse config file: {}", e))?;

        logging::log_config(
            LogLevel::Debug,
            "config_loaded",
            Some(json!({
                "strategy": config.selection.strategy.as_str(),
                "fee_rate": config.selection.fee_rate.to_string(),
            })),
        );

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| anyhow!("Failed to serialize config: {}", e))?;

        fs::write(path, content).map_err(|e| anyhow!("Failed to write config file: {}", e))?;

        logging::log_config(LogLevel::Debug, "config_saved", None);
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.fee_rate()?;

        if !matches!(self.transaction.version, 1 | 2) {
            bail!(
                "Invalid transaction version {}: must be 1 or 2",
                self.transaction.version
            );
        }

        self.sighash_type()?;
        Ok(())
    }

    /// The configured fee rate
    pub fn fee_rate(&self) -> Result<FeeRate> {
        FeeRate::new(self.selection.fee_rate, self.selection.fee_unit)
            .map_err(|e| anyhow!("Invalid fee rate: {}", e))
    }

    /// The configured default sighash flag
    pub fn sighash_type(&self) -> Result<EcdsaSighashType> {
        parse_sighash(&self.signing.sighash)
    }
}

/// Parse a sighash name such as `ALL`, `SIGHASH_NONE` or `SINGLE|ANYONECANPAY`
pub fn parse_sighash(name: &str) -> Result<EcdsaSighashType> {
    let normalized = name.trim().to_ascii_uppercase().replace("SIGHASH_", "");
    let sighash = match normalized.as_str() {
        "ALL" => EcdsaSighashType::All,
        "NONE" => EcdsaSighashType::None,
        "SINGLE" => EcdsaSighashType::Single,
        "ALL|ANYONECANPAY" => EcdsaSighashType::AllPlusAnyoneCanPay,
        "NONE|ANYONECANPAY" => EcdsaSighashType::NonePlusAnyoneCanPay,
        "SINGLE|ANYONECANPAY" => EcdsaSighashType::SinglePlusAnyoneCanPay,
        _ => bail!("Unknown sighash type: {}", name),
    };
    Ok(sighash)
}

/// Ensure a configuration file exists at the specified path
/// If it doesn't exist, create it with default values
pub fn ensure_config_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .map_err(|e| anyhow!("Failed to create config directory: {}", e))?;
            }
        }

        EngineConfig::default()
            .save(path)
            .map_err(|e| anyhow!("Failed to write default config file: {}", e))?;
    }

    Ok(())
}

// Default value functions

fn default_strategy() -> SelectionStrategy {
    SelectionStrategy::LargestFirst
}

fn default_fee_rate() -> Decimal {
    Decimal::ONE
}

fn default_fee_unit() -> FeeUnit {
    FeeUnit::VByte
}

fn default_dust_relay_fee() -> u64 {
    DEFAULT_DUST_RELAY_FEE
}

fn default_version() -> i32 {
    2
}

fn default_sighash() -> String {
    "ALL".to_string()
}

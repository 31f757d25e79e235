use crate::catalog::CatalogAddresses;
use crate::dispatcher::DispatchSettings;
use crate::retry::RetryConfig;
use alloy::primitives::utils::parse_units;
use alloy::primitives::Address;
use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use toml::map::Map;

pub const DEFAULT_CONFIG_PATH: &str = "configs/injective_testnet.toml";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainConfig {
    pub chain: ChainSettings,
    pub contracts: ContractAddresses,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub monitoring: MonitoringSettings,
    #[serde(default)]
    pub dispatch: DispatchTiming,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub signer: SignerSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainSettings {
    pub chain_id: u64,
    pub rpc_url: String,
    /// Fixed gas price for every transaction, in gwei (decimal string).
    pub gas_price_gwei: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContractAddresses {
    pub staking_address: String,
    pub wrapped_native_address: String,
    pub dex_router_address: String,
    pub token_a_address: String,
    pub token_b_address: String,
    /// Swap recipient; the signer's own address when unset.
    pub recipient_address: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub delay_seconds: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay_seconds: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitoringSettings {
    pub receipt_timeout_seconds: u64,
    pub poll_interval_seconds: u64,
}

impl Default for MonitoringSettings {
    fn default() -> Self {
        Self {
            receipt_timeout_seconds: 120,
            poll_interval_seconds: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchTiming {
    pub repeat_delay_seconds: u64,
    pub spec_delay_seconds: u64,
    pub swap_deadline_seconds: u64,
}

impl Default for DispatchTiming {
    fn default() -> Self {
        Self {
            repeat_delay_seconds: 10,
            spec_delay_seconds: 5,
            swap_deadline_seconds: 600,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageSettings {
    pub outputs_file: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            outputs_file: PathBuf::from("data/swap_outputs.json"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SignerSettings {
    /// Environment variable holding the hex private key.
    pub private_key_env: String,
    /// Environment variable that enables test mode when set to `true`.
    pub test_mode_env: String,
}

impl Default for SignerSettings {
    fn default() -> Self {
        Self {
            private_key_env: "INJECTIVE_PRIVATE_KEY".to_string(),
            test_mode_env: "TEST_MODE".to_string(),
        }
    }
}

impl ChainConfig {
    pub fn load(path: &str) -> Result<Self> {
        // Load .env file if it exists
        dotenv::dotenv().ok();

        // common.toml next to the chosen file supplies shared defaults
        let common_content = Self::load_common_config(Path::new(path))?;

        let specific_content = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read config {}: {}", path, e))?;

        // Merge common and specific configs
        let merged_content = Self::merge_configs(common_content, specific_content)?;

        let content = Self::substitute_env_vars(merged_content)?;

        let config: ChainConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn load_common_config(path: &Path) -> Result<String> {
        let common_path = path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join("common.toml");
        if common_path.as_path() == path {
            return Ok(String::new());
        }
        match fs::read_to_string(&common_path) {
            Ok(content) => Ok(content),
            Err(_) => {
                // If common.toml doesn't exist, return empty config
                Ok(String::new())
            }
        }
    }

    fn merge_configs(common: String, specific: String) -> Result<String> {
        if common.is_empty() {
            return Ok(specific);
        }

        let common_toml: toml::Value = toml::from_str(&common)?;
        let specific_toml: toml::Value = toml::from_str(&specific)?;

        // Specific config overrides common
        let merged = Self::merge_toml_values(common_toml, specific_toml);

        let merged_toml = toml::to_string_pretty(&merged)?;
        Ok(merged_toml)
    }

    fn merge_toml_values(mut base: toml::Value, override_val: toml::Value) -> toml::Value {
        match (&mut base, override_val) {
            (toml::Value::Table(base_map), toml::Value::Table(override_map)) => {
                for (key, value) in override_map {
                    let existing = base_map
                        .remove(&key)
                        .unwrap_or(toml::Value::Table(Map::new()));
                    base_map.insert(key, Self::merge_toml_values(existing, value));
                }
                base
            }
            (_, override_val) => override_val,
        }
    }

    fn substitute_env_vars(content: String) -> Result<String> {
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")?;
        let mut result = content.clone();

        for cap in re.captures_iter(&content) {
            let var_name = &cap[1];
            if let Ok(value) = env::var(var_name) {
                let placeholder = cap[0].to_string();
                result = result.replace(&placeholder, &value);
            }
        }

        Ok(result)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chain.rpc_url.contains("${") {
            return Err(anyhow::anyhow!(
                "rpc_url still contains an unresolved variable: {}",
                self.chain.rpc_url
            ));
        }
        self.gas_price_wei()?;
        self.catalog_addresses()?;
        self.recipient_override()?;
        Ok(())
    }

    pub fn gas_price_wei(&self) -> Result<u128> {
        let wei = parse_units(&self.chain.gas_price_gwei, "gwei")
            .map_err(|e| anyhow::anyhow!("Invalid gas_price_gwei {}: {}", self.chain.gas_price_gwei, e))?
            .get_absolute();
        u128::try_from(wei).map_err(|_| anyhow::anyhow!("gas price {} wei does not fit in u128", wei))
    }

    pub fn catalog_addresses(&self) -> Result<CatalogAddresses> {
        Ok(CatalogAddresses {
            staking: parse_address("staking_address", &self.contracts.staking_address)?,
            wrapped_native: parse_address("wrapped_native_address", &self.contracts.wrapped_native_address)?,
            dex_router: parse_address("dex_router_address", &self.contracts.dex_router_address)?,
            token_a: parse_address("token_a_address", &self.contracts.token_a_address)?,
            token_b: parse_address("token_b_address", &self.contracts.token_b_address)?,
        })
    }

    pub fn recipient_override(&self) -> Result<Option<Address>> {
        self.contracts
            .recipient_address
            .as_deref()
            .map(|addr| parse_address("recipient_address", addr))
            .transpose()
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new(
            self.retry.max_attempts,
            Duration::from_secs(self.retry.delay_seconds),
        )
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.monitoring.poll_interval_seconds)
    }

    pub fn dispatch_settings(&self, test_mode: bool) -> DispatchSettings {
        DispatchSettings {
            retry: self.retry_config(),
            receipt_timeout: Duration::from_secs(self.monitoring.receipt_timeout_seconds),
            repeat_delay: Duration::from_secs(self.dispatch.repeat_delay_seconds),
            spec_delay: Duration::from_secs(self.dispatch.spec_delay_seconds),
            swap_deadline: Duration::from_secs(self.dispatch.swap_deadline_seconds),
            test_mode,
        }
    }

    /// Signing key from the configured environment variable.
    pub fn read_private_key(&self) -> Result<String> {
        let name = &self.signer.private_key_env;
        match env::var(name) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(anyhow::anyhow!(
                "Private key not found. Set the {} environment variable",
                name
            )),
        }
    }

    pub fn test_mode_from_env(&self) -> bool {
        env::var(&self.signer.test_mode_env)
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }
}

fn parse_address(field: &str, value: &str) -> Result<Address> {
    Address::from_str(value).map_err(|e| anyhow::anyhow!("Invalid {} {}: {}", field, value, e))
}

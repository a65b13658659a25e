//! Configuration module for the permit issuer.
//!
//! Configuration is read from TOML. String values may reference environment
//! variables as `${VAR}` or `${VAR:-default}`, which keeps private keys out
//! of the file itself.
//!
//! ## Modular Configuration Support
//!
//! Configurations can be split into multiple files:
//! - Use `include = ["networks.toml", "keys.toml"]` to include other config files
//! - Each top-level section must be unique across all files (no duplicates allowed)

mod loader;

#[cfg(feature = "testing")]
pub mod builders {
	pub mod config;
}

use alloy_primitives::{address, Address};
use permit_types::{networks::deserialize_networks, DeadlinePolicy, NetworksConfig, PayoutConfig};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Canonical Permit2 deployment, identical on every supported chain.
pub const PERMIT2_ADDRESS: Address = address!("000000000022D473030F116dDEE9F6B43aC78BA3");

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Configuration error: {0}")]
	Parse(String),
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message, drop the echoed input
		ConfigError::Parse(err.message().to_string())
	}
}

/// Top-level configuration of the permit issuer.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Identity of this issuer instance.
	pub issuer: IssuerConfig,
	/// Chains the issuer signs for, with RPC candidates and payment tokens.
	#[serde(deserialize_with = "deserialize_networks")]
	pub networks: NetworksConfig,
	/// Key providers for each permit kind.
	pub account: AccountConfig,
	/// Endpoint selection and retry policy.
	pub rpc: RpcConfig,
	/// Fungible payout permit settings.
	#[serde(default)]
	pub erc20: Erc20Config,
	/// NFT reward permit settings.
	#[serde(default)]
	pub erc721: Erc721Config,
	/// HTTP API server.
	pub api: Option<ApiConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IssuerConfig {
	pub id: String,
}

/// A key provider selection: the implementation name plus its settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KeySourceConfig {
	/// Registered key provider name, e.g. "local" or "env".
	pub implementation: String,
	/// Implementation-specific settings, validated by the provider's schema.
	#[serde(default = "empty_table")]
	pub config: toml::Value,
}

/// Key providers per permit kind.
///
/// Payouts and NFT mints are usually signed by different wallets, so each
/// kind selects its own provider. Without an `erc721` entry NFT permits
/// fail with a missing-key error.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountConfig {
	pub erc20: KeySourceConfig,
	pub erc721: Option<KeySourceConfig>,
}

/// Endpoint selection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RpcConfig {
	/// Registered endpoint selector name, e.g. "latency" or "fixed".
	pub selector: String,
	/// Attempts made before endpoint resolution gives up.
	#[serde(default = "default_max_attempts")]
	pub max_attempts: u32,
	/// Fixed delay between failed attempts in milliseconds.
	#[serde(default = "default_retry_delay_ms")]
	pub retry_delay_ms: u64,
	/// Settings per selector implementation.
	#[serde(default)]
	pub implementations: HashMap<String, toml::Value>,
}

impl RpcConfig {
	/// Settings for the selected implementation, an empty table if absent.
	pub fn selector_config(&self) -> toml::Value {
		self.implementations
			.get(&self.selector)
			.cloned()
			.unwrap_or_else(empty_table)
	}
}

fn default_max_attempts() -> u32 {
	5
}

fn default_retry_delay_ms() -> u64 {
	1000
}

fn empty_table() -> toml::Value {
	toml::Value::Table(toml::map::Map::new())
}

/// Settings of Permit2 transfer permits.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Erc20Config {
	/// Permit2 contract used as the verifying contract of the domain.
	#[serde(default = "default_permit2_address")]
	pub permit2_address: Address,
	/// Decimals of the payment tokens.
	#[serde(default = "default_token_decimals")]
	pub decimals: u8,
	#[serde(default)]
	pub deadline: DeadlinePolicy,
}

impl Default for Erc20Config {
	fn default() -> Self {
		Self {
			permit2_address: default_permit2_address(),
			decimals: default_token_decimals(),
			deadline: DeadlinePolicy::default(),
		}
	}
}

fn default_permit2_address() -> Address {
	PERMIT2_ADDRESS
}

fn default_token_decimals() -> u8 {
	18
}

/// Settings of NFT reward mint permits.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Erc721Config {
	/// Reward contract that verifies the permits.
	#[serde(default = "default_nft_contract")]
	pub contract_address: Address,
	#[serde(default = "default_nft_domain_name")]
	pub domain_name: String,
	#[serde(default = "default_nft_domain_version")]
	pub domain_version: String,
	#[serde(default)]
	pub deadline: DeadlinePolicy,
}

impl Default for Erc721Config {
	fn default() -> Self {
		Self {
			contract_address: default_nft_contract(),
			domain_name: default_nft_domain_name(),
			domain_version: default_nft_domain_version(),
			deadline: DeadlinePolicy::default(),
		}
	}
}

fn default_nft_contract() -> Address {
	address!("6a87f05a74AB2EC25D1Eea0a3Cd24C3A2eCfF3E0")
}

fn default_nft_domain_name() -> String {
	"NftReward-Domain".to_string()
}

fn default_nft_domain_version() -> String {
	"1".to_string()
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	#[serde(default)]
	pub enabled: bool,
	#[serde(default = "default_api_host")]
	pub host: String,
	#[serde(default = "default_api_port")]
	pub port: u16,
	/// Request timeout in seconds.
	#[serde(default = "default_api_timeout")]
	pub timeout_seconds: u64,
	/// Origins allowed by CORS; any origin when empty.
	#[serde(default)]
	pub allowed_origins: Vec<String>,
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	3000
}

fn default_api_timeout() -> u64 {
	30
}

/// Resolves `${VAR}` and `${VAR:-default}` references to environment variables.
///
/// Input is capped at 1MB so the regex scan stays bounded.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last = 0;
	for cap in re.captures_iter(input) {
		let (Some(whole), Some(name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match (std::env::var(name.as_str()), cap.get(2)) {
			(Ok(value), _) => value,
			(Err(_), Some(default)) => default.as_str().to_string(),
			(Err(_), None) => {
				return Err(ConfigError::Validation(format!(
					"Environment variable '{}' not found",
					name.as_str()
				)))
			},
		};
		result.push_str(&input[last..whole.start()]);
		result.push_str(&value);
		last = whole.end();
	}
	result.push_str(&input[last..]);

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, following `include` directives and
	/// resolving environment variables.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;

		let mut loader = loader::ConfigLoader::new(base_dir);
		loader.load_config(file_name).await
	}

	/// Payment token table built from the network entries that declare one.
	pub fn payout_table(&self) -> HashMap<u64, PayoutConfig> {
		self.networks
			.iter()
			.filter_map(|(chain_id, network)| {
				network.payment_token.map(|payment_token| {
					(*chain_id, PayoutConfig { payment_token })
				})
			})
			.collect()
	}

	/// Validates cross-field constraints serde cannot express.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.issuer.id.trim().is_empty() {
			return Err(ConfigError::Validation("Issuer ID cannot be empty".into()));
		}

		if self.networks.is_empty() {
			return Err(ConfigError::Validation(
				"Networks configuration cannot be empty".into(),
			));
		}
		for (chain_id, network) in &self.networks {
			if network.rpc_urls.is_empty() {
				return Err(ConfigError::Validation(format!(
					"Network {} must have at least one rpc_url",
					chain_id
				)));
			}
		}

		if self.account.erc20.implementation.is_empty() {
			return Err(ConfigError::Validation(
				"account.erc20.implementation cannot be empty".into(),
			));
		}
		if let Some(erc721) = &self.account.erc721 {
			if erc721.implementation.is_empty() {
				return Err(ConfigError::Validation(
					"account.erc721.implementation cannot be empty".into(),
				));
			}
		}

		if self.rpc.selector.is_empty() {
			return Err(ConfigError::Validation("rpc.selector cannot be empty".into()));
		}
		if self.rpc.max_attempts == 0 {
			return Err(ConfigError::Validation(
				"rpc.max_attempts must be at least 1".into(),
			));
		}

		// 10^78 no longer fits in a uint256
		if self.erc20.decimals > 77 {
			return Err(ConfigError::Validation(format!(
				"erc20.decimals must be at most 77, got {}",
				self.erc20.decimals
			)));
		}

		if self.erc721.domain_name.is_empty() || self.erc721.domain_version.is_empty() {
			return Err(ConfigError::Validation(
				"erc721 domain name and version cannot be empty".into(),
			));
		}

		if self.payout_table().is_empty() {
			tracing::warn!("No network declares a payment_token, ERC20 permits will be rejected");
		}

		Ok(())
	}
}

impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

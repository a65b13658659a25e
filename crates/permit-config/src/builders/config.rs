//! Fluent construction of [`Config`] values for tests.

use crate::{
	AccountConfig, ApiConfig, Config, Erc20Config, Erc721Config, IssuerConfig, KeySourceConfig,
	RpcConfig,
};
use alloy_primitives::Address;
use permit_types::{DeadlinePolicy, NetworkConfig, NetworksConfig};
use std::collections::HashMap;

/// Well-known development key (first Anvil account).
pub const TEST_PRIVATE_KEY: &str =
	"0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// Builder for [`Config`] with defaults that pass validation.
///
/// Starts with one network (chain 100) paying in WXDAI, a `local` key
/// provider holding [`TEST_PRIVATE_KEY`] for both permit kinds and the
/// `fixed` selector.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	issuer_id: String,
	networks: NetworksConfig,
	erc20_key: KeySourceConfig,
	erc721_key: Option<KeySourceConfig>,
	selector: String,
	selector_config: Option<toml::Value>,
	max_attempts: u32,
	retry_delay_ms: u64,
	erc20: Erc20Config,
	erc721: Erc721Config,
	api: Option<ApiConfig>,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigBuilder {
	pub fn new() -> Self {
		let mut networks = HashMap::new();
		networks.insert(
			100,
			NetworkConfig {
				rpc_urls: vec!["https://rpc.gnosischain.com".to_string()],
				payment_token: Some(alloy_primitives::address!(
					"e91D153E0b41518A2Ce8Dd3D7944Fa863463a97d"
				)),
			},
		);

		Self {
			issuer_id: "test-issuer".to_string(),
			networks,
			erc20_key: local_key(TEST_PRIVATE_KEY),
			erc721_key: Some(local_key(TEST_PRIVATE_KEY)),
			selector: "fixed".to_string(),
			selector_config: None,
			max_attempts: 5,
			retry_delay_ms: 1000,
			erc20: Erc20Config::default(),
			erc721: Erc721Config::default(),
			api: None,
		}
	}

	pub fn issuer_id(mut self, id: impl Into<String>) -> Self {
		self.issuer_id = id.into();
		self
	}

	/// Adds or replaces a network.
	pub fn network(
		mut self,
		chain_id: u64,
		rpc_urls: Vec<String>,
		payment_token: Option<Address>,
	) -> Self {
		self.networks.insert(
			chain_id,
			NetworkConfig {
				rpc_urls,
				payment_token,
			},
		);
		self
	}

	/// Uses a `local` provider with the given key for ERC20 permits.
	pub fn erc20_private_key(mut self, key: &str) -> Self {
		self.erc20_key = local_key(key);
		self
	}

	/// Sets the ERC721 key provider, or removes it with `None`.
	pub fn erc721_key(mut self, source: Option<KeySourceConfig>) -> Self {
		self.erc721_key = source;
		self
	}

	pub fn selector(mut self, name: impl Into<String>, config: Option<toml::Value>) -> Self {
		self.selector = name.into();
		self.selector_config = config;
		self
	}

	pub fn retry(mut self, max_attempts: u32, retry_delay_ms: u64) -> Self {
		self.max_attempts = max_attempts;
		self.retry_delay_ms = retry_delay_ms;
		self
	}

	pub fn erc20_deadline(mut self, deadline: DeadlinePolicy) -> Self {
		self.erc20.deadline = deadline;
		self
	}

	pub fn erc721_deadline(mut self, deadline: DeadlinePolicy) -> Self {
		self.erc721.deadline = deadline;
		self
	}

	pub fn api(mut self, api: ApiConfig) -> Self {
		self.api = Some(api);
		self
	}

	/// Builds the configuration without running validation.
	pub fn build(self) -> Config {
		let mut implementations = HashMap::new();
		if let Some(config) = self.selector_config {
			implementations.insert(self.selector.clone(), config);
		}

		Config {
			issuer: IssuerConfig { id: self.issuer_id },
			networks: self.networks,
			account: AccountConfig {
				erc20: self.erc20_key,
				erc721: self.erc721_key,
			},
			rpc: RpcConfig {
				selector: self.selector,
				max_attempts: self.max_attempts,
				retry_delay_ms: self.retry_delay_ms,
				implementations,
			},
			erc20: self.erc20,
			erc721: self.erc721,
			api: self.api,
		}
	}
}

/// Key source for the `local` provider holding `key`.
pub fn local_key(key: &str) -> KeySourceConfig {
	let mut table = toml::map::Map::new();
	table.insert(
		"private_key".to_string(),
		toml::Value::String(key.to_string()),
	);
	KeySourceConfig {
		implementation: "local".to_string(),
		config: toml::Value::Table(table),
	}
}

//! Network configuration types.
//!
//! Each network entry lists the RPC candidates the endpoint selector may
//! choose from and, for networks that pay out fungible rewards, the payment
//! token used in transfer permits.

use alloy_primitives::Address;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Configuration for a single chain.
///
/// # Fields
///
/// * `rpc_urls` - Candidate RPC endpoints, probed by the endpoint selector
/// * `payment_token` - ERC20 token paid out on this chain, if any
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
	pub rpc_urls: Vec<String>,
	#[serde(default)]
	pub payment_token: Option<Address>,
}

/// Payout configuration resolved for one network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayoutConfig {
	pub payment_token: Address,
}

/// Networks keyed by chain id.
pub type NetworksConfig = HashMap<u64, NetworkConfig>;

/// Deserializes the `[networks]` table, whose keys are chain ids written as
/// strings since TOML has no numeric table keys.
pub fn deserialize_networks<'de, D>(deserializer: D) -> Result<NetworksConfig, D::Error>
where
	D: Deserializer<'de>,
{
	let string_map: HashMap<String, NetworkConfig> = HashMap::deserialize(deserializer)?;
	string_map
		.into_iter()
		.map(|(key, value)| {
			key.parse::<u64>()
				.map(|chain_id| (chain_id, value))
				.map_err(|e| serde::de::Error::custom(format!("Invalid chain_id '{}': {}", key, e)))
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[derive(Deserialize)]
	struct Wrapper {
		#[serde(deserialize_with = "deserialize_networks")]
		networks: NetworksConfig,
	}

	#[test]
	fn test_deserialize_networks() {
		let wrapper: Wrapper = toml::from_str(
			r#"
			[networks.100]
			rpc_urls = ["https://rpc.gnosischain.com"]
			payment_token = "0xe91D153E0b41518A2Ce8Dd3D7944Fa863463a97d"

			[networks.31337]
			rpc_urls = ["http://127.0.0.1:8545"]
			"#,
		)
		.unwrap();

		assert_eq!(wrapper.networks.len(), 2);
		assert!(wrapper.networks[&100].payment_token.is_some());
		assert!(wrapper.networks[&31337].payment_token.is_none());
	}

	#[test]
	fn test_non_numeric_chain_id() {
		let result: Result<Wrapper, _> = toml::from_str(
			r#"
			[networks.gnosis]
			rpc_urls = []
			"#,
		);
		assert!(result.is_err());
	}
}

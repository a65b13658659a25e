//! Deterministic selector returning the first configured candidate.
//!
//! Performs no network I/O. Useful for single-endpoint deployments and for
//! tests that must not depend on node availability.

use crate::{EndpointLatency, EndpointSelector, RpcError};
use async_trait::async_trait;
use permit_types::{ConfigSchema, Endpoint, NetworksConfig, Schema, ValidationError};
use std::collections::HashMap;
use std::time::Duration;

/// Selector pinned to the first `rpc_urls` entry of each network.
pub struct FixedSelector {
	endpoints: HashMap<u64, String>,
}

impl FixedSelector {
	pub fn new(networks: &NetworksConfig) -> Self {
		let endpoints = networks
			.iter()
			.filter_map(|(id, network)| network.rpc_urls.first().map(|url| (*id, url.clone())))
			.collect();
		Self { endpoints }
	}

	fn url(&self, network_id: u64) -> Result<&String, RpcError> {
		self.endpoints
			.get(&network_id)
			.ok_or(RpcError::UnknownNetwork(network_id))
	}
}

/// The fixed selector takes no settings.
pub struct FixedSelectorSchema;

impl ConfigSchema for FixedSelectorSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![]).validate(config)
	}
}

#[async_trait]
impl EndpointSelector for FixedSelector {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(FixedSelectorSchema)
	}

	async fn fastest_endpoint(&self, network_id: u64) -> Result<Endpoint, RpcError> {
		self.url(network_id)
			.map(|url| Endpoint::new(network_id, url.clone()))
	}

	async fn latencies(&self, network_id: u64) -> Result<Vec<EndpointLatency>, RpcError> {
		self.url(network_id).map(|url| {
			vec![EndpointLatency {
				url: url.clone(),
				latency: Duration::ZERO,
			}]
		})
	}
}

/// Factory function to create a fixed selector.
pub fn create_selector(
	config: &toml::Value,
	networks: &NetworksConfig,
) -> Result<Box<dyn EndpointSelector>, RpcError> {
	FixedSelectorSchema
		.validate(config)
		.map_err(|e| RpcError::Implementation(format!("Invalid configuration: {}", e)))?;

	Ok(Box::new(FixedSelector::new(networks)))
}

/// Registry for the fixed selector.
pub struct Registry;

impl permit_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "fixed";
	type Factory = crate::EndpointSelectorFactory;

	fn factory() -> Self::Factory {
		create_selector
	}
}

impl crate::EndpointSelectorRegistry for Registry {}

//! RPC endpoint selection for the permit issuer.
//!
//! Every issuance needs a reachable node of the target network. Selectors
//! choose among the configured candidates; the [`EndpointResolver`] wraps a
//! selector with a bounded retry policy.

use async_trait::async_trait;
use permit_types::{ConfigSchema, Endpoint, ImplementationRegistry, NetworksConfig};
use std::time::Duration;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod fixed;
	pub mod latency;
}

mod retry;

pub use retry::{EndpointResolver, RetryPolicy};

/// Errors that can occur during endpoint selection.
#[derive(Debug, Error)]
pub enum RpcError {
	/// The network has no entry in configuration.
	#[error("Network {0} is not configured")]
	UnknownNetwork(u64),
	/// Every candidate of the network failed its probe.
	#[error("No healthy endpoint for network {network_id}: {reason}")]
	NoHealthyEndpoint { network_id: u64, reason: String },
	/// A candidate URL could not be used.
	#[error("Invalid endpoint '{url}': {reason}")]
	InvalidEndpoint { url: String, reason: String },
	/// All retry attempts failed; carries the last failure.
	#[error("Endpoint resolution for network {network_id} failed after {attempts} attempts: {source}")]
	ResolutionExhausted {
		network_id: u64,
		attempts: u32,
		#[source]
		source: Box<RpcError>,
	},
	/// Error that occurs when interacting with the selector implementation.
	#[error("Implementation error: {0}")]
	Implementation(String),
}

impl RpcError {
	/// Whether another selection attempt can succeed.
	///
	/// Unknown networks and unusable URLs are configuration faults.
	pub fn is_retryable(&self) -> bool {
		!matches!(
			self,
			RpcError::UnknownNetwork(_) | RpcError::InvalidEndpoint { .. }
		)
	}
}

/// Measured round trip of one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointLatency {
	pub url: String,
	pub latency: Duration,
}

/// Interface of an endpoint selection strategy.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EndpointSelector: Send + Sync {
	/// Returns the configuration schema for this selector.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Picks the best currently reachable endpoint of a network.
	async fn fastest_endpoint(&self, network_id: u64) -> Result<Endpoint, RpcError>;

	/// Latest measurements of a network's healthy candidates, fastest first.
	async fn latencies(&self, network_id: u64) -> Result<Vec<EndpointLatency>, RpcError>;
}

/// Type alias for endpoint selector factory functions.
pub type EndpointSelectorFactory =
	fn(&toml::Value, &NetworksConfig) -> Result<Box<dyn EndpointSelector>, RpcError>;

/// Registry trait for endpoint selector implementations.
pub trait EndpointSelectorRegistry:
	ImplementationRegistry<Factory = EndpointSelectorFactory>
{
}

/// Get all registered endpoint selector implementations.
pub fn get_all_implementations() -> Vec<(&'static str, EndpointSelectorFactory)> {
	use implementations::{fixed, latency};

	vec![
		(latency::Registry::NAME, latency::Registry::factory()),
		(fixed::Registry::NAME, fixed::Registry::factory()),
	]
}

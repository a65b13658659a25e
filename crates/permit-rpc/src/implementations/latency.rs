//! Latency-ranked endpoint selection.
//!
//! Every candidate of a network is probed concurrently with `eth_chainId`.
//! Candidates that time out, fail, or report a different chain are dropped;
//! the rest are ranked by round trip. The ranking is cached per network and
//! re-probed after `refresh_cycles` selections.

use crate::{EndpointLatency, EndpointSelector, RpcError};
use alloy_provider::{Provider, ProviderBuilder};
use async_trait::async_trait;
use futures::future::join_all;
use permit_types::{ConfigSchema, Endpoint, Field, FieldType, NetworksConfig, Schema, ValidationError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

const DEFAULT_PROBE_TIMEOUT_MS: u64 = 3000;
const DEFAULT_REFRESH_CYCLES: u32 = 5;

/// Cached ranking of one network.
struct Ranking {
	entries: Vec<EndpointLatency>,
	/// Selections answered from this ranking.
	served: AtomicU32,
}

/// Selector probing all candidates and returning the fastest.
pub struct LatencySelector {
	candidates: HashMap<u64, Vec<reqwest::Url>>,
	probe_timeout: Duration,
	refresh_cycles: u32,
	rankings: RwLock<HashMap<u64, Arc<Ranking>>>,
}

impl LatencySelector {
	pub fn new(
		networks: &NetworksConfig,
		probe_timeout: Duration,
		refresh_cycles: u32,
	) -> Result<Self, RpcError> {
		let mut candidates = HashMap::new();
		for (network_id, network) in networks {
			let urls = network
				.rpc_urls
				.iter()
				.map(|url| {
					url.parse::<reqwest::Url>()
						.map_err(|e| RpcError::InvalidEndpoint {
							url: url.clone(),
							reason: e.to_string(),
						})
				})
				.collect::<Result<Vec<_>, _>>()?;
			candidates.insert(*network_id, urls);
		}

		Ok(Self {
			candidates,
			probe_timeout,
			refresh_cycles: refresh_cycles.max(1),
			rankings: RwLock::new(HashMap::new()),
		})
	}

	/// Probes every candidate of a network and ranks the healthy ones.
	async fn rank(&self, network_id: u64) -> Result<Arc<Ranking>, RpcError> {
		let urls = self
			.candidates
			.get(&network_id)
			.ok_or(RpcError::UnknownNetwork(network_id))?;

		let probes = urls
			.iter()
			.map(|url| probe(url.clone(), network_id, self.probe_timeout));
		let results = join_all(probes).await;

		let mut entries = Vec::with_capacity(results.len());
		let mut failures = Vec::new();
		for (url, result) in urls.iter().zip(results) {
			match result {
				Ok(latency) => entries.push(EndpointLatency {
					url: url.to_string(),
					latency,
				}),
				Err(reason) => {
					tracing::debug!(network_id, url = %url, reason = %reason, "Discarding endpoint");
					failures.push(format!("{}: {}", url, reason));
				},
			}
		}

		if entries.is_empty() {
			return Err(RpcError::NoHealthyEndpoint {
				network_id,
				reason: failures.join("; "),
			});
		}
		entries.sort_by_key(|entry| entry.latency);

		tracing::debug!(
			network_id,
			healthy = entries.len(),
			discarded = failures.len(),
			fastest_ms = entries[0].latency.as_millis() as u64,
			"Ranked endpoints"
		);

		let ranking = Arc::new(Ranking {
			entries,
			served: AtomicU32::new(0),
		});
		self.rankings
			.write()
			.await
			.insert(network_id, ranking.clone());
		Ok(ranking)
	}

	async fn cached(&self, network_id: u64) -> Option<Arc<Ranking>> {
		self.rankings.read().await.get(&network_id).cloned()
	}
}

/// Measures one `eth_chainId` round trip, checking the reported chain.
async fn probe(url: reqwest::Url, expected_chain_id: u64, timeout: Duration) -> Result<Duration, String> {
	let provider = ProviderBuilder::new().on_http(url);

	let started = Instant::now();
	let chain_id = tokio::time::timeout(timeout, provider.get_chain_id())
		.await
		.map_err(|_| format!("no answer within {}ms", timeout.as_millis()))?
		.map_err(|e| e.to_string())?;
	let latency = started.elapsed();

	if chain_id != expected_chain_id {
		return Err(format!(
			"reports chain {} instead of {}",
			chain_id, expected_chain_id
		));
	}
	Ok(latency)
}

/// Configuration schema for [`LatencySelector`].
pub struct LatencySelectorSchema;

impl LatencySelectorSchema {
	/// Static validation method for use before instance creation
	pub fn validate_config(config: &toml::Value) -> Result<(), ValidationError> {
		Self.validate(config)
	}
}

impl ConfigSchema for LatencySelectorSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![
				Field::new(
					"probe_timeout_ms",
					FieldType::Integer {
						min: Some(1),
						max: Some(60_000),
					},
				),
				Field::new(
					"refresh_cycles",
					FieldType::Integer {
						min: Some(1),
						max: Some(10_000),
					},
				),
			],
		);

		schema.validate(config)
	}
}

#[async_trait]
impl EndpointSelector for LatencySelector {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(LatencySelectorSchema)
	}

	async fn fastest_endpoint(&self, network_id: u64) -> Result<Endpoint, RpcError> {
		if let Some(ranking) = self.cached(network_id).await {
			if ranking.served.fetch_add(1, Ordering::SeqCst) < self.refresh_cycles {
				if let Some(best) = ranking.entries.first() {
					return Ok(Endpoint::new(network_id, best.url.clone()));
				}
			}
		}

		let ranking = self.rank(network_id).await?;
		ranking.served.fetch_add(1, Ordering::SeqCst);
		ranking
			.entries
			.first()
			.map(|best| Endpoint::new(network_id, best.url.clone()))
			.ok_or_else(|| RpcError::NoHealthyEndpoint {
				network_id,
				reason: "empty ranking".to_string(),
			})
	}

	async fn latencies(&self, network_id: u64) -> Result<Vec<EndpointLatency>, RpcError> {
		let ranking = match self.cached(network_id).await {
			Some(ranking) => ranking,
			None => self.rank(network_id).await?,
		};
		Ok(ranking.entries.clone())
	}
}

/// Factory function to create a latency selector.
///
/// Configuration parameters:
/// - `probe_timeout_ms` (optional): per-probe timeout, default 3000
/// - `refresh_cycles` (optional): selections served per ranking, default 5
pub fn create_selector(
	config: &toml::Value,
	networks: &NetworksConfig,
) -> Result<Box<dyn EndpointSelector>, RpcError> {
	LatencySelectorSchema::validate_config(config)
		.map_err(|e| RpcError::Implementation(format!("Invalid configuration: {}", e)))?;

	let probe_timeout_ms = config
		.get("probe_timeout_ms")
		.and_then(|v| v.as_integer())
		.map(|v| v as u64)
		.unwrap_or(DEFAULT_PROBE_TIMEOUT_MS);
	let refresh_cycles = config
		.get("refresh_cycles")
		.and_then(|v| v.as_integer())
		.map(|v| v as u32)
		.unwrap_or(DEFAULT_REFRESH_CYCLES);

	Ok(Box::new(LatencySelector::new(
		networks,
		Duration::from_millis(probe_timeout_ms),
		refresh_cycles,
	)?))
}

/// Registry for the latency selector.
pub struct Registry;

impl permit_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "latency";
	type Factory = crate::EndpointSelectorFactory;

	fn factory() -> Self::Factory {
		create_selector
	}
}

impl crate::EndpointSelectorRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::{routing::post, Json, Router};
	use permit_types::NetworkConfig;
	use serde_json::{json, Value};
	use std::sync::atomic::AtomicUsize;

	/// Starts a JSON-RPC stub answering `eth_chainId`, returning its URL and
	/// a request counter.
	async fn spawn_node(chain_id: u64, delay: Duration) -> (String, Arc<AtomicUsize>) {
		let hits = Arc::new(AtomicUsize::new(0));
		let counter = hits.clone();
		let app = Router::new().route(
			"/",
			post(move |Json(request): Json<Value>| {
				let counter = counter.clone();
				async move {
					counter.fetch_add(1, Ordering::SeqCst);
					tokio::time::sleep(delay).await;
					Json(json!({
						"jsonrpc": "2.0",
						"id": request["id"],
						"result": format!("0x{:x}", chain_id),
					}))
				}
			}),
		);

		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		tokio::spawn(async move {
			axum::serve(listener, app).await.unwrap();
		});
		(format!("http://{}/", addr), hits)
	}

	fn networks(network_id: u64, urls: Vec<String>) -> NetworksConfig {
		let mut networks = HashMap::new();
		networks.insert(
			network_id,
			NetworkConfig {
				rpc_urls: urls,
				payment_token: None,
			},
		);
		networks
	}

	#[tokio::test]
	async fn test_ranks_by_latency_and_drops_wrong_chain() {
		let (slow, _) = spawn_node(100, Duration::from_millis(150)).await;
		let (fast, _) = spawn_node(100, Duration::ZERO).await;
		let (wrong_chain, _) = spawn_node(1, Duration::ZERO).await;

		let selector = LatencySelector::new(
			&networks(100, vec![slow.clone(), wrong_chain, fast.clone()]),
			Duration::from_secs(2),
			5,
		)
		.unwrap();

		let endpoint = selector.fastest_endpoint(100).await.unwrap();
		assert_eq!(endpoint.url, fast);

		let latencies = selector.latencies(100).await.unwrap();
		let urls: Vec<_> = latencies.iter().map(|l| l.url.as_str()).collect();
		assert_eq!(urls, vec![fast.as_str(), slow.as_str()]);
	}

	#[tokio::test]
	async fn test_reprobes_after_refresh_cycles() {
		let (url, hits) = spawn_node(100, Duration::ZERO).await;
		let selector =
			LatencySelector::new(&networks(100, vec![url]), Duration::from_secs(2), 2).unwrap();

		selector.fastest_endpoint(100).await.unwrap();
		selector.fastest_endpoint(100).await.unwrap();
		assert_eq!(hits.load(Ordering::SeqCst), 1);

		selector.fastest_endpoint(100).await.unwrap();
		assert_eq!(hits.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn test_timeout_discards_candidate() {
		let (url, _) = spawn_node(100, Duration::from_secs(5)).await;
		let selector =
			LatencySelector::new(&networks(100, vec![url]), Duration::from_millis(100), 5).unwrap();

		let err = selector.fastest_endpoint(100).await.unwrap_err();
		assert!(matches!(err, RpcError::NoHealthyEndpoint { network_id: 100, .. }));
	}

	#[tokio::test]
	async fn test_unknown_network() {
		let selector =
			LatencySelector::new(&networks(100, vec![]), Duration::from_millis(100), 5).unwrap();
		assert!(matches!(
			selector.fastest_endpoint(5).await,
			Err(RpcError::UnknownNetwork(5))
		));
	}

	#[test]
	fn test_invalid_candidate_url() {
		let result = LatencySelector::new(
			&networks(100, vec!["not a url".to_string()]),
			Duration::from_millis(100),
			5,
		);
		assert!(matches!(result, Err(RpcError::InvalidEndpoint { .. })));
	}

	#[test]
	fn test_config_bounds() {
		let config: toml::Value = toml::from_str("probe_timeout_ms = 0").unwrap();
		assert!(create_selector(&config, &HashMap::new()).is_err());

		let config: toml::Value = toml::from_str("refresh_cycles = 3").unwrap();
		assert!(create_selector(&config, &HashMap::new()).is_ok());
	}
}

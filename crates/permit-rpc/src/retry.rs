//! Bounded retry around an endpoint selector.

use crate::{EndpointLatency, EndpointSelector, RpcError};
use permit_types::Endpoint;
use std::time::Duration;

/// Attempt budget and fixed back-off between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
	max_attempts: u32,
	delay: Duration,
}

impl RetryPolicy {
	/// Creates a policy; at least one attempt is required.
	pub fn new(max_attempts: u32, delay: Duration) -> Result<Self, RpcError> {
		if max_attempts == 0 {
			return Err(RpcError::Implementation(
				"max_attempts must be at least 1".to_string(),
			));
		}
		Ok(Self {
			max_attempts,
			delay,
		})
	}

	pub fn max_attempts(&self) -> u32 {
		self.max_attempts
	}

	pub fn delay(&self) -> Duration {
		self.delay
	}
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_attempts: 5,
			delay: Duration::from_millis(1000),
		}
	}
}

/// Resolves endpoints through a selector, retrying failed selections.
pub struct EndpointResolver {
	selector: Box<dyn EndpointSelector>,
	policy: RetryPolicy,
}

impl EndpointResolver {
	pub fn new(selector: Box<dyn EndpointSelector>, policy: RetryPolicy) -> Self {
		Self { selector, policy }
	}

	pub fn policy(&self) -> RetryPolicy {
		self.policy
	}

	/// Returns an endpoint for `network_id`.
	///
	/// Intermediate failures are only logged. After the last attempt the
	/// final failure is returned inside [`RpcError::ResolutionExhausted`].
	/// Failures that are not retryable are returned as they are.
	pub async fn resolve(&self, network_id: u64) -> Result<Endpoint, RpcError> {
		let max = self.policy.max_attempts;
		let mut attempt = 0;
		loop {
			attempt += 1;
			match self.selector.fastest_endpoint(network_id).await {
				Ok(endpoint) => {
					if attempt > 1 {
						tracing::info!(
							network_id,
							attempt,
							url = %endpoint.url,
							"Endpoint resolved after retry"
						);
					}
					return Ok(endpoint);
				},
				Err(e) if !e.is_retryable() => {
					tracing::error!(network_id, attempt, error = %e, "Endpoint selection failed permanently");
					return Err(e);
				},
				Err(e) if attempt >= max => {
					tracing::error!(network_id, attempts = attempt, error = %e, "Endpoint resolution exhausted");
					return Err(RpcError::ResolutionExhausted {
						network_id,
						attempts: attempt,
						source: Box::new(e),
					});
				},
				Err(e) => {
					tracing::warn!(
						network_id,
						attempt,
						retries_left = max - attempt,
						error = %e,
						"Endpoint selection failed, retrying"
					);
					tokio::time::sleep(self.policy.delay).await;
				},
			}
		}
	}

	/// Latest candidate measurements, without retry.
	pub async fn latencies(&self, network_id: u64) -> Result<Vec<EndpointLatency>, RpcError> {
		self.selector.latencies(network_id).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::MockEndpointSelector;
	use std::sync::atomic::{AtomicU32, Ordering};
	use std::sync::Arc;

	fn unhealthy(network_id: u64) -> RpcError {
		RpcError::NoHealthyEndpoint {
			network_id,
			reason: "connection refused".into(),
		}
	}

	#[test]
	fn test_zero_attempts_rejected() {
		assert!(RetryPolicy::new(0, Duration::from_millis(10)).is_err());
		assert_eq!(RetryPolicy::default().max_attempts(), 5);
		assert_eq!(RetryPolicy::default().delay(), Duration::from_secs(1));
	}

	#[tokio::test(start_paused = true)]
	async fn test_exhaustion_waits_between_attempts_only() {
		let mut selector = MockEndpointSelector::new();
		selector
			.expect_fastest_endpoint()
			.times(5)
			.returning(|id| Err(unhealthy(id)));

		let resolver = EndpointResolver::new(
			Box::new(selector),
			RetryPolicy::new(5, Duration::from_millis(1000)).unwrap(),
		);

		let started = tokio::time::Instant::now();
		let err = resolver.resolve(100).await.unwrap_err();
		let elapsed = started.elapsed();

		assert!(elapsed >= Duration::from_millis(4000));
		assert!(elapsed < Duration::from_millis(4100));
		match err {
			RpcError::ResolutionExhausted {
				network_id,
				attempts,
				source,
			} => {
				assert_eq!(network_id, 100);
				assert_eq!(attempts, 5);
				assert!(matches!(*source, RpcError::NoHealthyEndpoint { .. }));
			},
			other => panic!("unexpected error: {:?}", other),
		}
	}

	#[tokio::test(start_paused = true)]
	async fn test_recovers_after_transient_failures() {
		let calls = Arc::new(AtomicU32::new(0));
		let counter = calls.clone();
		let mut selector = MockEndpointSelector::new();
		selector.expect_fastest_endpoint().returning(move |id| {
			if counter.fetch_add(1, Ordering::SeqCst) < 2 {
				Err(unhealthy(id))
			} else {
				Ok(Endpoint::new(id, "https://rpc.gnosischain.com"))
			}
		});

		let resolver = EndpointResolver::new(
			Box::new(selector),
			RetryPolicy::new(5, Duration::from_millis(250)).unwrap(),
		);

		let started = tokio::time::Instant::now();
		let endpoint = resolver.resolve(100).await.unwrap();

		assert_eq!(endpoint.url, "https://rpc.gnosischain.com");
		assert_eq!(calls.load(Ordering::SeqCst), 3);
		assert!(started.elapsed() >= Duration::from_millis(500));
		assert!(started.elapsed() < Duration::from_millis(600));
	}

	#[tokio::test(start_paused = true)]
	async fn test_single_attempt_does_not_wait() {
		let mut selector = MockEndpointSelector::new();
		selector
			.expect_fastest_endpoint()
			.times(1)
			.returning(|id| Err(unhealthy(id)));

		let resolver = EndpointResolver::new(
			Box::new(selector),
			RetryPolicy::new(1, Duration::from_secs(30)).unwrap(),
		);

		let started = tokio::time::Instant::now();
		assert!(resolver.resolve(1).await.is_err());
		assert!(started.elapsed() < Duration::from_millis(1));
	}

	#[tokio::test(start_paused = true)]
	async fn test_unknown_network_is_not_retried() {
		let mut selector = MockEndpointSelector::new();
		selector
			.expect_fastest_endpoint()
			.times(1)
			.returning(|id| Err(RpcError::UnknownNetwork(id)));

		let resolver = EndpointResolver::new(Box::new(selector), RetryPolicy::default());

		let started = tokio::time::Instant::now();
		let err = resolver.resolve(424242).await.unwrap_err();
		assert!(matches!(err, RpcError::UnknownNetwork(424242)));
		assert_eq!(started.elapsed(), Duration::ZERO);
	}

	#[test]
	fn test_retryable_errors() {
		assert!(unhealthy(1).is_retryable());
		assert!(RpcError::Implementation("timeout".into()).is_retryable());
		assert!(!RpcError::UnknownNetwork(1).is_retryable());
		assert!(!RpcError::InvalidEndpoint {
			url: "ftp://node".into(),
			reason: "unsupported scheme".into(),
		}
		.is_retryable());
	}

	#[tokio::test]
	async fn test_latencies_pass_through() {
		let mut selector = MockEndpointSelector::new();
		selector.expect_latencies().returning(|_| {
			Ok(vec![EndpointLatency {
				url: "https://a.example".into(),
				latency: Duration::from_millis(12),
			}])
		});

		let resolver = EndpointResolver::new(Box::new(selector), RetryPolicy::default());
		let latencies = resolver.latencies(100).await.unwrap();
		assert_eq!(latencies.len(), 1);
		assert_eq!(latencies[0].latency, Duration::from_millis(12));
	}
}

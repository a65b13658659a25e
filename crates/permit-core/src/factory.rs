//! Construction of a [`PermitIssuer`] from configuration.
//!
//! Key providers and endpoint selectors are looked up by name in factory
//! maps, so the binary decides which implementations are available.

use crate::builder::{Erc20Settings, Erc721Settings, PayoutTable, PermitBuilder};
use crate::PermitIssuer;
use permit_account::{KeyProviderFactory, KeyService};
use permit_config::{Config, KeySourceConfig};
use permit_rpc::{EndpointResolver, EndpointSelectorFactory, RetryPolicy};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while assembling the issuer.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factories for every pluggable component, keyed by implementation name.
pub struct IssuerFactories {
	pub key_factories: HashMap<String, KeyProviderFactory>,
	pub selector_factories: HashMap<String, EndpointSelectorFactory>,
}

impl Default for IssuerFactories {
	/// All implementations shipped with the workspace.
	fn default() -> Self {
		Self {
			key_factories: permit_account::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
			selector_factories: permit_rpc::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
		}
	}
}

/// Builder for constructing a [`PermitIssuer`].
pub struct IssuerBuilder {
	config: Config,
}

impl IssuerBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	pub fn build(self, factories: IssuerFactories) -> Result<PermitIssuer, BuilderError> {
		let erc20_keys = load_key_service("erc20", &self.config.account.erc20, &factories)?;
		let erc721_keys = match &self.config.account.erc721 {
			Some(source) => Some(load_key_service("erc721", source, &factories)?),
			None => {
				tracing::warn!(
					component = "account",
					kind = "erc721",
					"No key provider configured, NFT permits are disabled"
				);
				None
			},
		};

		let selector_name = &self.config.rpc.selector;
		let factory = factories.selector_factories.get(selector_name).ok_or_else(|| {
			BuilderError::MissingComponent(format!("endpoint selector '{}'", selector_name))
		})?;
		let selector_config = self.config.rpc.selector_config();
		let selector = factory(&selector_config, &self.config.networks).map_err(|e| {
			tracing::error!(
				component = "rpc",
				implementation = %selector_name,
				error = %e,
				"Failed to create endpoint selector"
			);
			BuilderError::Config(format!(
				"Failed to create endpoint selector '{}': {}",
				selector_name, e
			))
		})?;
		// Validate the configuration using the selector's schema
		selector.config_schema().validate(&selector_config).map_err(|e| {
			tracing::error!(
				component = "rpc",
				implementation = %selector_name,
				error = %e,
				"Invalid configuration for endpoint selector"
			);
			BuilderError::Config(format!(
				"Invalid configuration for endpoint selector '{}': {}",
				selector_name, e
			))
		})?;
		tracing::info!(component = "rpc", implementation = %selector_name, "Loaded");

		let policy = RetryPolicy::new(
			self.config.rpc.max_attempts,
			Duration::from_millis(self.config.rpc.retry_delay_ms),
		)
		.map_err(|e| BuilderError::Config(e.to_string()))?;
		tracing::info!(
			component = "rpc",
			max_attempts = policy.max_attempts(),
			retry_delay_ms = self.config.rpc.retry_delay_ms,
			"Retry policy"
		);

		let payouts = PayoutTable::new(self.config.payout_table())
			.with_networks(self.config.networks.keys().copied());
		let builder = PermitBuilder::new(
			payouts,
			Erc20Settings::from(&self.config.erc20),
			Erc721Settings::from(&self.config.erc721),
		);
		tracing::info!(
			component = "issuer",
			issuer_id = %self.config.issuer.id,
			networks = self.config.networks.len(),
			"Issuer ready"
		);

		Ok(PermitIssuer::new(
			builder,
			erc20_keys,
			erc721_keys,
			EndpointResolver::new(selector, policy),
		))
	}
}

fn load_key_service(
	kind: &str,
	source: &KeySourceConfig,
	factories: &IssuerFactories,
) -> Result<KeyService, BuilderError> {
	let factory = factories
		.key_factories
		.get(&source.implementation)
		.ok_or_else(|| {
			BuilderError::MissingComponent(format!("key provider '{}'", source.implementation))
		})?;

	match factory(&source.config) {
		Ok(provider) => {
			// Validate the configuration using the provider's schema
			if let Err(e) = provider.config_schema().validate(&source.config) {
				tracing::error!(
					component = "account",
					kind,
					implementation = %source.implementation,
					error = %e,
					"Invalid configuration for key provider"
				);
				return Err(BuilderError::Config(format!(
					"Invalid configuration for {} key provider '{}': {}",
					kind, source.implementation, e
				)));
			}
			tracing::info!(component = "account", kind, implementation = %source.implementation, "Loaded");
			Ok(KeyService::new(provider))
		},
		Err(e) => {
			tracing::error!(
				component = "account",
				kind,
				implementation = %source.implementation,
				error = %e,
				"Failed to create key provider"
			);
			Err(BuilderError::Config(format!(
				"Failed to create {} key provider '{}': {}",
				kind, source.implementation, e
			)))
		},
	}
}

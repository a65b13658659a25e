//! Key material sources for the permit issuer.
//!
//! A key provider hands out the private key that signs one kind of permit.
//! Providers are selected by name in configuration and may be backed by the
//! configuration file itself or by the process environment.

use async_trait::async_trait;
use permit_types::{ConfigSchema, ImplementationRegistry, SecretString};
use thiserror::Error;
use zeroize::Zeroizing;

/// Re-export implementations
pub mod implementations {
	pub mod env;
	pub mod local;
}

/// Errors that can occur while obtaining key material.
#[derive(Debug, Error)]
pub enum AccountError {
	/// No key is configured or the configured source is empty.
	#[error("Missing key: {0}")]
	MissingKey(String),
	/// The key is present but is not a 32-byte hex secp256k1 scalar.
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	/// Error that occurs when interacting with the provider implementation.
	#[error("Implementation error: {0}")]
	Implementation(String),
}

/// Interface of a private key source.
#[async_trait]
pub trait KeyProvider: Send + Sync {
	/// Returns the configuration schema for this provider.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Loads the private key, 0x-prefixed.
	///
	/// Called once per issued permit, so sources that change at runtime
	/// are picked up without a restart.
	async fn private_key(&self) -> Result<SecretString, AccountError>;
}

/// Type alias for key provider factory functions.
pub type KeyProviderFactory = fn(&toml::Value) -> Result<Box<dyn KeyProvider>, AccountError>;

/// Registry trait for key provider implementations.
pub trait KeyProviderRegistry: ImplementationRegistry<Factory = KeyProviderFactory> {}

/// Get all registered key provider implementations.
pub fn get_all_implementations() -> Vec<(&'static str, KeyProviderFactory)> {
	use implementations::{env, local};

	vec![
		(local::Registry::NAME, local::Registry::factory()),
		(env::Registry::NAME, env::Registry::factory()),
	]
}

/// Checks that `key` is 32 bytes of hex, with or without a 0x prefix.
///
/// The decoded bytes are wiped before returning.
pub(crate) fn check_key_format(key: &str) -> Result<(), AccountError> {
	let digits = permit_types::without_0x_prefix(key.trim());
	if digits.len() != 64 {
		return Err(AccountError::InvalidKey(format!(
			"expected 64 hex digits, got {}",
			digits.len()
		)));
	}
	let mut bytes = Zeroizing::new([0u8; 32]);
	hex::decode_to_slice(digits, bytes.as_mut_slice())
		.map_err(|e| AccountError::InvalidKey(format!("not hex encoded: {}", e)))?;
	Ok(())
}

/// Service that hands out the key of one permit kind.
pub struct KeyService {
	/// The underlying provider implementation.
	implementation: Box<dyn KeyProvider>,
}

impl KeyService {
	pub fn new(implementation: Box<dyn KeyProvider>) -> Self {
		Self { implementation }
	}

	/// Loads the private key from the underlying provider.
	pub async fn private_key(&self) -> Result<SecretString, AccountError> {
		self.implementation.private_key().await
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_registered_names() {
		let names: Vec<_> = get_all_implementations()
			.into_iter()
			.map(|(name, _)| name)
			.collect();
		assert_eq!(names, vec!["local", "env"]);
	}

	#[test]
	fn test_check_key_format() {
		let key = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
		assert!(check_key_format(key).is_ok());
		assert!(check_key_format(&format!("0x{}", key)).is_ok());
		assert!(matches!(
			check_key_format("0x1234"),
			Err(AccountError::InvalidKey(_))
		));
		assert!(matches!(
			check_key_format("0xnothex"),
			Err(AccountError::InvalidKey(_))
		));
		assert!(matches!(
			check_key_format(&format!("0x{}zz", &key[2..])),
			Err(AccountError::InvalidKey(msg)) if msg.contains("not hex")
		));
		assert!(matches!(
			check_key_format(&format!("{}00", key)),
			Err(AccountError::InvalidKey(msg)) if msg.contains("66")
		));
	}
}

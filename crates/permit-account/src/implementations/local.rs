//! Key provider holding the key inline in configuration.
//!
//! Meant for development and for deployments that inject the key through
//! `${VAR}` substitution in the configuration file.

use crate::{check_key_format, AccountError, KeyProvider};
use async_trait::async_trait;
use permit_types::{
	with_0x_prefix, ConfigSchema, Field, FieldType, Schema, SecretString, ValidationError,
};

/// Provider returning a fixed key read at startup.
pub struct LocalKeyProvider {
	key: SecretString,
}

impl LocalKeyProvider {
	/// Creates a provider from a hex key, with or without 0x prefix.
	pub fn new(private_key: &str) -> Result<Self, AccountError> {
		check_key_format(private_key)?;
		Ok(Self {
			key: SecretString::from(with_0x_prefix(private_key.trim())),
		})
	}
}

/// Configuration schema for [`LocalKeyProvider`].
pub struct LocalKeySchema;

impl LocalKeySchema {
	/// Static validation method for use before instance creation
	pub fn validate_config(config: &toml::Value) -> Result<(), ValidationError> {
		Self.validate(config)
	}
}

impl ConfigSchema for LocalKeySchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("private_key", FieldType::String).with_validator(|value| {
				match value.as_str() {
					Some(s) if !s.trim().is_empty() => Ok(()),
					_ => Err("private_key cannot be empty".to_string()),
				}
			})],
			vec![],
		);

		schema.validate(config)
	}
}

#[async_trait]
impl KeyProvider for LocalKeyProvider {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(LocalKeySchema)
	}

	async fn private_key(&self) -> Result<SecretString, AccountError> {
		Ok(self.key.clone())
	}
}

/// Factory function to create a local key provider from configuration.
///
/// Configuration parameters:
/// - `private_key`: hex-encoded secp256k1 private key
pub fn create_provider(config: &toml::Value) -> Result<Box<dyn KeyProvider>, AccountError> {
	LocalKeySchema::validate_config(config).map_err(|e| match e {
		ValidationError::MissingField(_) => {
			AccountError::MissingKey("local provider has no private_key".to_string())
		},
		other => AccountError::Implementation(format!("Invalid configuration: {}", other)),
	})?;

	let private_key = config
		.get("private_key")
		.and_then(|v| v.as_str())
		.ok_or_else(|| AccountError::MissingKey("private_key is required".to_string()))?;

	Ok(Box::new(LocalKeyProvider::new(private_key)?))
}

/// Registry for the local key provider.
pub struct Registry;

impl permit_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "local";
	type Factory = crate::KeyProviderFactory;

	fn factory() -> Self::Factory {
		create_provider
	}
}

impl crate::KeyProviderRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;

	const KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

	fn config(s: &str) -> toml::Value {
		toml::from_str(s).unwrap()
	}

	#[tokio::test]
	async fn test_returns_prefixed_key() {
		let provider = create_provider(&config(&format!("private_key = \"{}\"", KEY))).unwrap();
		let key = provider.private_key().await.unwrap();
		key.with_exposed(|k| assert_eq!(k, format!("0x{}", KEY)));
	}

	#[test]
	fn test_missing_key() {
		let result = create_provider(&config(""));
		assert!(matches!(result, Err(AccountError::MissingKey(_))));
	}

	#[test]
	fn test_malformed_key() {
		let result = create_provider(&config("private_key = \"0xdeadbeef\""));
		assert!(matches!(result, Err(AccountError::InvalidKey(_))));
	}

	#[test]
	fn test_wrong_type() {
		let result = create_provider(&config("private_key = 42"));
		assert!(matches!(result, Err(AccountError::Implementation(_))));
	}
}

//! Key provider reading the key from an environment variable on every use.

use crate::{check_key_format, AccountError, KeyProvider};
use async_trait::async_trait;
use zeroize::Zeroizing;
use permit_types::{
	with_0x_prefix, ConfigSchema, Field, FieldType, Schema, SecretString, ValidationError,
};

/// Provider backed by a process environment variable.
pub struct EnvKeyProvider {
	variable: String,
}

impl EnvKeyProvider {
	pub fn new(variable: impl Into<String>) -> Self {
		Self {
			variable: variable.into(),
		}
	}
}

/// Configuration schema for [`EnvKeyProvider`].
pub struct EnvKeySchema;

impl EnvKeySchema {
	/// Static validation method for use before instance creation
	pub fn validate_config(config: &toml::Value) -> Result<(), ValidationError> {
		Self.validate(config)
	}
}

impl ConfigSchema for EnvKeySchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("variable", FieldType::String).with_validator(|value| {
				let name = value.as_str().unwrap_or_default();
				let well_formed = !name.is_empty()
					&& name
						.chars()
						.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_');
				if well_formed {
					Ok(())
				} else {
					Err(format!("'{}' is not a valid environment variable name", name))
				}
			})],
			vec![],
		);

		schema.validate(config)
	}
}

#[async_trait]
impl KeyProvider for EnvKeyProvider {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(EnvKeySchema)
	}

	async fn private_key(&self) -> Result<SecretString, AccountError> {
		// Wiped on every return path
		let raw = Zeroizing::new(std::env::var(&self.variable).map_err(|_| {
			AccountError::MissingKey(format!("environment variable {} is not set", self.variable))
		})?);
		let value = raw.trim();
		if value.is_empty() {
			return Err(AccountError::MissingKey(format!(
				"environment variable {} is empty",
				self.variable
			)));
		}
		check_key_format(value)?;

		tracing::debug!(variable = %self.variable, "Loaded signing key from environment");
		Ok(SecretString::from(with_0x_prefix(value)))
	}
}

/// Factory function to create an environment key provider.
///
/// Configuration parameters:
/// - `variable`: name of the environment variable holding the key
pub fn create_provider(config: &toml::Value) -> Result<Box<dyn KeyProvider>, AccountError> {
	EnvKeySchema::validate_config(config)
		.map_err(|e| AccountError::Implementation(format!("Invalid configuration: {}", e)))?;

	let variable = config
		.get("variable")
		.and_then(|v| v.as_str())
		.ok_or_else(|| AccountError::Implementation("variable is required".to_string()))?;

	Ok(Box::new(EnvKeyProvider::new(variable)))
}

/// Registry for the environment key provider.
pub struct Registry;

impl permit_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "env";
	type Factory = crate::KeyProviderFactory;

	fn factory() -> Self::Factory {
		create_provider
	}
}

impl crate::KeyProviderRegistry for Registry {}

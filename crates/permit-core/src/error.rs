//! Error taxonomy of a permit issuance.

use permit_account::AccountError;
use permit_rpc::RpcError;
use thiserror::Error;

/// Errors that abort an issuance.
///
/// Every variant carries the originating cause. Nothing is partially issued
/// when one of these is returned.
#[derive(Debug, Error)]
pub enum IssueError {
	/// No key is configured for the permit kind, or the source is empty.
	#[error("Missing signer key: {0}")]
	MissingSignerKey(String),
	/// No payment token is configured for the network.
	#[error("Network {0} is not supported")]
	UnsupportedNetwork(u64),
	/// Endpoint resolution failed after every retry.
	#[error("Endpoint resolution failed for network {network_id}: {source}")]
	EndpointResolution {
		network_id: u64,
		#[source]
		source: RpcError,
	},
	/// The loaded key is not a usable secp256k1 private key.
	#[error("Invalid key material: {0}")]
	InvalidKeyMaterial(String),
	#[error("Signing failed: {0}")]
	SigningFailure(String),
	/// A request field is malformed.
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	/// The caller abandoned the issuance before signing started.
	#[error("Issuance cancelled")]
	Cancelled,
}

/// What a caller should do about a failed issuance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
	/// Fix the request or the configuration; retrying will not help.
	Configuration,
	/// Retry the whole issuance later.
	Transient,
	/// Cryptographic failure inside the issuer.
	Internal,
}

impl IssueError {
	pub fn class(&self) -> ErrorClass {
		match self {
			IssueError::MissingSignerKey(_)
			| IssueError::UnsupportedNetwork(_)
			| IssueError::InvalidKeyMaterial(_)
			| IssueError::InvalidArgument(_) => ErrorClass::Configuration,
			IssueError::EndpointResolution { .. } | IssueError::Cancelled => ErrorClass::Transient,
			IssueError::SigningFailure(_) => ErrorClass::Internal,
		}
	}
}

impl From<AccountError> for IssueError {
	fn from(err: AccountError) -> Self {
		match err {
			AccountError::MissingKey(msg) | AccountError::Implementation(msg) => {
				IssueError::MissingSignerKey(msg)
			},
			AccountError::InvalidKey(msg) => IssueError::InvalidKeyMaterial(msg),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_classes() {
		assert_eq!(
			IssueError::UnsupportedNetwork(5).class(),
			ErrorClass::Configuration
		);
		assert_eq!(
			IssueError::InvalidArgument("empty".into()).class(),
			ErrorClass::Configuration
		);
		assert_eq!(IssueError::Cancelled.class(), ErrorClass::Transient);
		assert_eq!(
			IssueError::EndpointResolution {
				network_id: 1,
				source: RpcError::UnknownNetwork(1),
			}
			.class(),
			ErrorClass::Transient
		);
		assert_eq!(
			IssueError::SigningFailure("bad".into()).class(),
			ErrorClass::Internal
		);
	}

	#[test]
	fn test_account_errors_map_to_key_variants() {
		assert!(matches!(
			IssueError::from(AccountError::MissingKey("unset".into())),
			IssueError::MissingSignerKey(_)
		));
		assert!(matches!(
			IssueError::from(AccountError::InvalidKey("short".into())),
			IssueError::InvalidKeyMaterial(_)
		));
	}

	#[test]
	fn test_resolution_error_keeps_source() {
		let err = IssueError::EndpointResolution {
			network_id: 100,
			source: RpcError::UnknownNetwork(100),
		};
		let source = std::error::Error::source(&err).map(|s| s.to_string());
		assert_eq!(source.as_deref(), Some("Network 100 is not configured"));
	}
}

//! Signing of unsigned permits.

use crate::builder::UnsignedPermit;
use crate::IssueError;
use alloy_primitives::{Address, Signature, B256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use permit_types::{without_0x_prefix, Endpoint, SecretString};
use zeroize::Zeroizing;

/// A signed permit and everything needed to verify it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPermit {
	pub permit: UnsignedPermit,
	/// `r || s || v` with `v` in {27, 28}.
	pub signature: [u8; 65],
	pub signer: Address,
	/// The EIP-712 digest that was signed.
	pub digest: B256,
}

/// Key material bound to the endpoint of one issuance.
///
/// The secp256k1 key is zeroed when the identity is dropped.
pub struct SigningIdentity<'a> {
	signer: PrivateKeySigner,
	endpoint: &'a Endpoint,
}

impl<'a> SigningIdentity<'a> {
	/// Parses the private key. Error messages never include key material.
	pub fn instantiate(private_key: &SecretString, endpoint: &'a Endpoint) -> Result<Self, IssueError> {
		if private_key.is_blank() {
			return Err(IssueError::MissingSignerKey("signing key is empty".into()));
		}
		let mut bytes = Zeroizing::new([0u8; 32]);
		private_key
			.with_exposed(|key| {
				hex::decode_to_slice(without_0x_prefix(key.trim()), bytes.as_mut_slice())
			})
			.map_err(|_| IssueError::InvalidKeyMaterial("key is not 32 bytes of hex".into()))?;
		let signer = PrivateKeySigner::from_slice(bytes.as_slice()).map_err(|_| {
			IssueError::InvalidKeyMaterial("key is not a valid secp256k1 private key".into())
		})?;

		Ok(Self { signer, endpoint })
	}

	pub fn address(&self) -> Address {
		self.signer.address()
	}

	pub fn endpoint(&self) -> &Endpoint {
		self.endpoint
	}

	/// Signs the permit's EIP-712 digest with a deterministic (RFC 6979)
	/// signature.
	pub fn sign(&self, permit: UnsignedPermit) -> Result<SignedPermit, IssueError> {
		if permit.network_id() != self.endpoint.network_id {
			return Err(IssueError::SigningFailure(format!(
				"permit for network {} cannot be signed through an endpoint of network {}",
				permit.network_id(),
				self.endpoint.network_id
			)));
		}

		let digest = permit.signing_hash();
		let signature = self
			.signer
			.sign_hash_sync(&digest)
			.map_err(|e| IssueError::SigningFailure(e.to_string()))?;

		Ok(SignedPermit {
			permit,
			signature: signature.as_bytes(),
			signer: self.signer.address(),
			digest,
		})
	}
}

/// Recovers the address that produced `signature` over `digest`.
pub fn recover_signer(digest: &B256, signature: &[u8]) -> Result<Address, IssueError> {
	let signature = Signature::try_from(signature)
		.map_err(|e| IssueError::SigningFailure(format!("malformed signature: {}", e)))?;
	signature
		.recover_address_from_prehash(digest)
		.map_err(|e| IssueError::SigningFailure(format!("signature recovery failed: {}", e)))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::builder::test_support::*;
	use alloy_primitives::{address, U256};
	use permit_types::Erc20PermitRequest;
	use rust_decimal::Decimal;

	const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
	const OWNER: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

	fn unsigned(network_id: u64) -> UnsignedPermit {
		builder()
			.build_erc20(
				&Erc20PermitRequest {
					beneficiary: BENEFICIARY.to_string(),
					amount: Decimal::new(105, 1),
					user_id: "123".into(),
					issue_id: "456".into(),
					network_id,
				},
				U256::from(1),
				0,
			)
			.unwrap()
	}

	#[test]
	fn test_sign_and_recover() {
		let endpoint = Endpoint::new(100, "https://rpc.gnosischain.com");
		let identity = SigningIdentity::instantiate(&SecretString::from(KEY), &endpoint).unwrap();
		assert_eq!(identity.address(), OWNER);

		let signed = identity.sign(unsigned(100)).unwrap();
		assert_eq!(signed.signer, OWNER);
		assert!(signed.signature[64] == 27 || signed.signature[64] == 28);
		assert_eq!(recover_signer(&signed.digest, &signed.signature).unwrap(), OWNER);
	}

	#[test]
	fn test_signatures_are_deterministic() {
		let endpoint = Endpoint::new(100, "https://rpc.gnosischain.com");
		let identity = SigningIdentity::instantiate(&SecretString::from(KEY), &endpoint).unwrap();

		let a = identity.sign(unsigned(100)).unwrap();
		let b = identity.sign(unsigned(100)).unwrap();
		assert_eq!(a.signature, b.signature);
	}

	#[test]
	fn test_invalid_key_does_not_leak() {
		let endpoint = Endpoint::new(100, "https://rpc.gnosischain.com");
		let secret = "0xnot-a-key-but-secret-looking";
		match SigningIdentity::instantiate(&SecretString::from(secret), &endpoint) {
			Err(IssueError::InvalidKeyMaterial(msg)) => assert!(!msg.contains("secret-looking")),
			Err(other) => panic!("unexpected error: {}", other),
			Ok(_) => panic!("key should be rejected"),
		}
	}

	#[test]
	fn test_out_of_range_scalar_rejected() {
		let endpoint = Endpoint::new(100, "https://rpc.gnosischain.com");
		let zero = format!("0x{}", "00".repeat(32));
		match SigningIdentity::instantiate(&SecretString::from(zero), &endpoint) {
			Err(IssueError::InvalidKeyMaterial(msg)) => assert!(msg.contains("secp256k1")),
			Err(other) => panic!("unexpected error: {}", other),
			Ok(_) => panic!("zero key should be rejected"),
		}
	}

	#[test]
	fn test_key_without_prefix_accepted() {
		let endpoint = Endpoint::new(100, "https://rpc.gnosischain.com");
		let identity =
			SigningIdentity::instantiate(&SecretString::from(&KEY[2..]), &endpoint).unwrap();
		assert_eq!(identity.address(), OWNER);
	}

	#[test]
	fn test_blank_key_is_missing() {
		let endpoint = Endpoint::new(100, "https://rpc.gnosischain.com");
		assert!(matches!(
			SigningIdentity::instantiate(&SecretString::from("  "), &endpoint),
			Err(IssueError::MissingSignerKey(_))
		));
	}

	#[test]
	fn test_endpoint_network_must_match() {
		let endpoint = Endpoint::new(1, "https://eth.llamarpc.com");
		let identity = SigningIdentity::instantiate(&SecretString::from(KEY), &endpoint).unwrap();
		assert!(matches!(
			identity.sign(unsigned(100)),
			Err(IssueError::SigningFailure(_))
		));
	}

	#[test]
	fn test_recover_rejects_short_signature() {
		assert!(recover_signer(&B256::ZERO, &[0u8; 10]).is_err());
	}
}

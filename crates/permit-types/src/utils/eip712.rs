//! EIP-712 encoding primitives shared by the permit builders.
//!
//! These helpers provide:
//! - The type strings of both permit kinds and their signing domains
//! - Domain separator computation for versioned and unversioned domains
//! - Final digest computation (0x1901 || domainSeparator || structHash)
//! - A minimal ABI encoder covering the field types the permits use

use alloy_primitives::{keccak256, Address, B256, U256};
use serde::Serialize;

/// Domain type used by Permit2, which carries no version field.
pub const DOMAIN_TYPE: &str = "EIP712Domain(string name,uint256 chainId,address verifyingContract)";
/// Domain type used by contracts that declare a version.
pub const VERSIONED_DOMAIN_TYPE: &str =
	"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";
pub const NAME_PERMIT2: &str = "Permit2";
pub const TOKEN_PERMISSIONS_TYPE: &str = "TokenPermissions(address token,uint256 amount)";
pub const PERMIT_TRANSFER_FROM_TYPE: &str =
	"PermitTransferFrom(TokenPermissions permitted,address spender,uint256 nonce,uint256 deadline)";
pub const MINT_REQUEST_TYPE: &str =
	"MintRequest(address beneficiary,uint256 deadline,bytes32[] keys,uint256 nonce,string[] values)";

/// Signing domain of a typed-data structure.
///
/// `version` is `None` for Permit2, whose domain omits the field entirely;
/// that changes the domain type string and therefore the separator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedDomain {
	pub name: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub version: Option<String>,
	pub chain_id: u64,
	pub verifying_contract: Address,
}

impl TypedDomain {
	/// Computes the domain separator hash.
	pub fn separator(&self) -> B256 {
		let mut enc = Eip712AbiEncoder::new();
		match &self.version {
			Some(version) => {
				enc.push_b256(&keccak256(VERSIONED_DOMAIN_TYPE));
				enc.push_string(&self.name);
				enc.push_string(version);
			},
			None => {
				enc.push_b256(&keccak256(DOMAIN_TYPE));
				enc.push_string(&self.name);
			},
		}
		enc.push_u256(U256::from(self.chain_id));
		enc.push_address(&self.verifying_contract);
		keccak256(enc.finish())
	}
}

/// Compute the final EIP-712 digest: keccak256(0x1901 || domainHash || structHash).
pub fn compute_final_digest(domain_hash: &B256, struct_hash: &B256) -> B256 {
	let mut out = Vec::with_capacity(2 + 32 + 32);
	out.push(0x19);
	out.push(0x01);
	out.extend_from_slice(domain_hash.as_slice());
	out.extend_from_slice(struct_hash.as_slice());
	keccak256(out)
}

/// Minimal ABI encoder for EIP-712 struct hashing.
///
/// Dynamic members (strings, arrays) are encoded as the keccak256 of their
/// contents, as `encodeData` requires.
#[derive(Debug, Default)]
pub struct Eip712AbiEncoder {
	buf: Vec<u8>,
}

impl Eip712AbiEncoder {
	pub fn new() -> Self {
		Self { buf: Vec::new() }
	}

	pub fn push_b256(&mut self, v: &B256) {
		self.buf.extend_from_slice(v.as_slice());
	}

	pub fn push_address(&mut self, addr: &Address) {
		let mut word = [0u8; 32];
		word[12..].copy_from_slice(addr.as_slice());
		self.buf.extend_from_slice(&word);
	}

	pub fn push_u256(&mut self, v: U256) {
		let word: [u8; 32] = v.to_be_bytes::<32>();
		self.buf.extend_from_slice(&word);
	}

	pub fn push_string(&mut self, s: &str) {
		self.push_b256(&keccak256(s.as_bytes()));
	}

	/// `bytes32[]`: hash of the concatenated elements.
	pub fn push_b256_array(&mut self, items: &[B256]) {
		let mut packed = Vec::with_capacity(items.len() * 32);
		for item in items {
			packed.extend_from_slice(item.as_slice());
		}
		self.push_b256(&keccak256(packed));
	}

	/// `string[]`: hash of the concatenated element hashes.
	pub fn push_string_array<S: AsRef<str>>(&mut self, items: &[S]) {
		let mut packed = Vec::with_capacity(items.len() * 32);
		for item in items {
			packed.extend_from_slice(keccak256(item.as_ref().as_bytes()).as_slice());
		}
		self.push_b256(&keccak256(packed));
	}

	pub fn finish(self) -> Vec<u8> {
		self.buf
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::address;
	use alloy_sol_types::Eip712Domain;
	use std::borrow::Cow;

	const PERMIT2: Address = address!("000000000022D473030F116dDEE9F6B43aC78BA3");

	#[test]
	fn test_unversioned_separator_matches_reference() {
		let domain = TypedDomain {
			name: NAME_PERMIT2.to_string(),
			version: None,
			chain_id: 100,
			verifying_contract: PERMIT2,
		};
		let reference = Eip712Domain::new(
			Some(Cow::Borrowed("Permit2")),
			None,
			Some(U256::from(100u64)),
			Some(PERMIT2),
			None,
		);

		assert_eq!(domain.separator(), reference.separator());
	}

	#[test]
	fn test_versioned_separator_matches_reference() {
		let contract = address!("6a87f05a74AB2EC25D1Eea0a3Cd24C3A2eCfF3E0");
		let domain = TypedDomain {
			name: "NftReward-Domain".to_string(),
			version: Some("1".to_string()),
			chain_id: 1,
			verifying_contract: contract,
		};
		let reference = Eip712Domain::new(
			Some(Cow::Borrowed("NftReward-Domain")),
			Some(Cow::Borrowed("1")),
			Some(U256::from(1u64)),
			Some(contract),
			None,
		);

		assert_eq!(domain.separator(), reference.separator());
	}

	#[test]
	fn test_version_changes_separator() {
		let mut domain = TypedDomain {
			name: "Permit2".to_string(),
			version: None,
			chain_id: 1,
			verifying_contract: PERMIT2,
		};
		let without = domain.separator();
		domain.version = Some("1".to_string());
		assert_ne!(without, domain.separator());
	}

	#[test]
	fn test_final_digest_prefix() {
		let domain = B256::repeat_byte(0x11);
		let structure = B256::repeat_byte(0x22);

		let mut expected = vec![0x19, 0x01];
		expected.extend_from_slice(domain.as_slice());
		expected.extend_from_slice(structure.as_slice());

		assert_eq!(compute_final_digest(&domain, &structure), keccak256(expected));
	}

	#[test]
	fn test_array_encoding() {
		let mut enc = Eip712AbiEncoder::new();
		enc.push_string_array(&["a", "b"]);
		let encoded = enc.finish();

		let mut packed = Vec::new();
		packed.extend_from_slice(keccak256("a").as_slice());
		packed.extend_from_slice(keccak256("b").as_slice());
		assert_eq!(encoded, keccak256(packed).to_vec());

		let mut enc = Eip712AbiEncoder::new();
		enc.push_b256_array(&[]);
		assert_eq!(enc.finish(), keccak256([0u8; 0]).to_vec());
	}
}

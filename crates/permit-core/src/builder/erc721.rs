//! `MintRequest` permits for NFT rewards.

use super::{parse_address, type_hash, PermitBuilder, PermitMessage, UnsignedPermit};
use crate::IssueError;
use alloy_primitives::{keccak256, Address, B256, U256};
use permit_types::utils::{Eip712AbiEncoder, TypedDomain, MINT_REQUEST_TYPE};
use permit_types::{Erc721PermitRequest, NFT_METADATA_KEYS};

/// Message authorizing one NFT mint with attached metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintRequest {
	pub beneficiary: Address,
	pub deadline: U256,
	/// keccak256 of each canonical metadata key name.
	pub keys: Vec<B256>,
	pub nonce: U256,
	/// Metadata values, positionally matching `keys`.
	pub values: Vec<String>,
}

impl MintRequest {
	pub fn encode_type() -> &'static str {
		MINT_REQUEST_TYPE
	}

	pub fn struct_hash(&self) -> B256 {
		let mut enc = Eip712AbiEncoder::new();
		enc.push_b256(&type_hash(MINT_REQUEST_TYPE));
		enc.push_address(&self.beneficiary);
		enc.push_u256(self.deadline);
		enc.push_b256_array(&self.keys);
		enc.push_u256(self.nonce);
		enc.push_string_array(&self.values);
		keccak256(enc.finish())
	}
}

/// Hashed metadata key names, in signing order.
pub fn metadata_keys() -> Vec<B256> {
	NFT_METADATA_KEYS
		.iter()
		.map(|name| keccak256(name.as_bytes()))
		.collect()
}

impl PermitBuilder {
	/// Builds a mint permit on the configured reward contract.
	///
	/// Fails with `UnsupportedNetwork` when the network is not configured.
	pub fn build_erc721(
		&self,
		request: &Erc721PermitRequest,
		nonce: U256,
		now: u64,
	) -> Result<UnsignedPermit, IssueError> {
		if !self.payouts.is_served(request.network_id) {
			return Err(IssueError::UnsupportedNetwork(request.network_id));
		}
		let beneficiary = parse_address("beneficiary", &request.beneficiary)?;

		let values = request.metadata_values();
		if let Some(i) = values.iter().position(|v| v.trim().is_empty()) {
			return Err(IssueError::InvalidArgument(format!(
				"metadata value {} cannot be empty",
				NFT_METADATA_KEYS[i]
			)));
		}

		Ok(UnsignedPermit {
			domain: TypedDomain {
				name: self.erc721.domain_name.clone(),
				version: Some(self.erc721.domain_version.clone()),
				chain_id: request.network_id,
				verifying_contract: self.erc721.contract_address,
			},
			message: PermitMessage::Mint(MintRequest {
				beneficiary,
				deadline: self.erc721.deadline.resolve(now),
				keys: metadata_keys(),
				nonce,
				values: values.iter().map(|v| v.to_string()).collect(),
			}),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::super::test_support::*;
	use super::*;
	use alloy_primitives::address;
	use alloy_sol_types::{Eip712Domain, SolStruct};
	use std::borrow::Cow;

	mod reference {
		alloy_sol_types::sol! {
			struct MintRequest {
				address beneficiary;
				uint256 deadline;
				bytes32[] keys;
				uint256 nonce;
				string[] values;
			}
		}
	}

	const REWARD_CONTRACT: Address = address!("6a87f05a74AB2EC25D1Eea0a3Cd24C3A2eCfF3E0");

	fn request() -> Erc721PermitRequest {
		Erc721PermitRequest {
			beneficiary: BENEFICIARY.to_string(),
			organization_name: "ubiquity".to_string(),
			repository_name: "pay.ubq.fi".to_string(),
			issue_id: "2001".to_string(),
			issue_number: "42".to_string(),
			username: "alice".to_string(),
			user_id: "9001".to_string(),
			contribution_type: "assignee".to_string(),
			network_id: 100,
		}
	}

	fn message(permit: &UnsignedPermit) -> &MintRequest {
		match &permit.message {
			PermitMessage::Mint(message) => message,
			other => panic!("unexpected message: {:?}", other),
		}
	}

	#[test]
	fn test_builds_mint_request() {
		let permit = builder()
			.build_erc721(&request(), U256::from(3), 0)
			.unwrap();
		let msg = message(&permit);

		assert_eq!(permit.domain.name, "NftReward-Domain");
		assert_eq!(permit.domain.version.as_deref(), Some("1"));
		assert_eq!(permit.domain.verifying_contract, REWARD_CONTRACT);
		assert_eq!(permit.primary_type(), "MintRequest");
		assert_eq!(msg.keys.len(), 5);
		assert_eq!(msg.keys[0], keccak256("GITHUB_ORGANIZATION_NAME"));
		assert_eq!(msg.keys[4], keccak256("GITHUB_CONTRIBUTION_TYPE"));
		assert_eq!(
			msg.values,
			vec!["ubiquity", "pay.ubq.fi", "42", "alice", "assignee"]
		);
		assert_eq!(msg.deadline, U256::MAX);
	}

	#[test]
	fn test_network_without_payout_still_mints() {
		let mut req = request();
		req.network_id = 31337;
		let permit = builder().build_erc721(&req, U256::from(3), 0).unwrap();
		assert_eq!(permit.network_id(), 31337);
	}

	#[test]
	fn test_unconfigured_network_rejected() {
		let mut req = request();
		req.network_id = 424242;
		req.beneficiary = "not-an-address".to_string();
		assert!(matches!(
			builder().build_erc721(&req, U256::from(3), 0),
			Err(IssueError::UnsupportedNetwork(424242))
		));
	}

	#[test]
	fn test_empty_metadata_rejected() {
		let mut req = request();
		req.username = String::new();
		match builder().build_erc721(&req, U256::from(3), 0) {
			Err(IssueError::InvalidArgument(msg)) => assert!(msg.contains("GITHUB_USERNAME")),
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn test_schema_is_fixed() {
		let mut other = request();
		other.organization_name = "another-org".to_string();
		other.contribution_type = "reviewer".to_string();

		let a = builder().build_erc721(&request(), U256::from(1), 0).unwrap();
		let b = builder().build_erc721(&other, U256::from(2), 0).unwrap();
		assert_eq!(a.type_schema(), b.type_schema());
		assert_eq!(a.type_schema(), MINT_REQUEST_TYPE);
	}

	#[test]
	fn test_signing_hash_matches_sol_types() {
		let permit = builder()
			.build_erc721(&request(), U256::from(77), 0)
			.unwrap();
		let msg = message(&permit);

		let reference = reference::MintRequest {
			beneficiary: msg.beneficiary,
			deadline: msg.deadline,
			keys: msg.keys.clone(),
			nonce: msg.nonce,
			values: msg.values.clone(),
		};
		let domain = Eip712Domain::new(
			Some(Cow::Borrowed("NftReward-Domain")),
			Some(Cow::Borrowed("1")),
			Some(U256::from(100)),
			Some(REWARD_CONTRACT),
			None,
		);

		assert_eq!(permit.struct_hash(), reference.eip712_hash_struct());
		assert_eq!(permit.signing_hash(), reference.eip712_signing_hash(&domain));
	}

	#[test]
	fn test_erc20_and_erc721_domains_differ() {
		let permit = builder().build_erc721(&request(), U256::from(1), 0).unwrap();
		let unversioned = TypedDomain {
			version: None,
			..permit.domain.clone()
		};
		assert_ne!(permit.domain.separator(), unversioned.separator());
	}
}

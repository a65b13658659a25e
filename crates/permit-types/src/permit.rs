//! Permit requests and the transaction payloads returned to callers.
//!
//! Payload field names and nesting are consumed verbatim by the redeeming
//! contracts' front-ends, so they serialize in camelCase and carry every
//! numeric value as a decimal string.

use alloy_primitives::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Canonical attribute names of an NFT reward, in signing order.
pub const NFT_METADATA_KEYS: [&str; 5] = [
	"GITHUB_ORGANIZATION_NAME",
	"GITHUB_REPOSITORY_NAME",
	"GITHUB_ISSUE_ID",
	"GITHUB_USERNAME",
	"GITHUB_CONTRIBUTION_TYPE",
];

/// The two kinds of permit the issuer signs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermitKind {
	/// Permit2 `PermitTransferFrom` for a fungible payout.
	Erc20,
	/// `MintRequest` for an NFT reward.
	Erc721,
}

impl fmt::Display for PermitKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			PermitKind::Erc20 => f.write_str("erc20"),
			PermitKind::Erc721 => f.write_str("erc721"),
		}
	}
}

/// How the `deadline` field of a permit is chosen.
///
/// `Unbounded` signs `type(uint256).max`, so the permit never expires. `Ttl`
/// bounds the lifetime of a leaked signature at the cost of permits that
/// must be reissued once they lapse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum DeadlinePolicy {
	#[default]
	Unbounded,
	Ttl { seconds: u64 },
}

impl DeadlinePolicy {
	/// Deadline for a permit signed at `now` (UNIX seconds).
	pub fn resolve(&self, now: u64) -> U256 {
		match self {
			DeadlinePolicy::Unbounded => U256::MAX,
			DeadlinePolicy::Ttl { seconds } => U256::from(now) + U256::from(*seconds),
		}
	}
}

/// Request for a fungible payout permit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Erc20PermitRequest {
	/// Address receiving the payout.
	pub beneficiary: String,
	/// Payout in whole tokens, scaled by the token decimals when signing.
	pub amount: Decimal,
	pub user_id: String,
	pub issue_id: String,
	pub network_id: u64,
}

/// Request for an NFT reward permit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Erc721PermitRequest {
	pub beneficiary: String,
	pub organization_name: String,
	pub repository_name: String,
	/// Identifier used for nonce derivation.
	pub issue_id: String,
	/// Human-facing issue number stored in the NFT metadata.
	pub issue_number: String,
	pub username: String,
	pub user_id: String,
	pub contribution_type: String,
	pub network_id: u64,
}

impl Erc721PermitRequest {
	/// Metadata values in the order of [`NFT_METADATA_KEYS`].
	pub fn metadata_values(&self) -> [&str; 5] {
		[
			self.organization_name.as_str(),
			self.repository_name.as_str(),
			self.issue_number.as_str(),
			self.username.as_str(),
			self.contribution_type.as_str(),
		]
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPermissionsData {
	pub token: String,
	pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitTransferFromData {
	pub permitted: TokenPermissionsData,
	pub nonce: String,
	pub deadline: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferDetails {
	pub to: String,
	pub requested_amount: String,
}

/// Payload for a Permit2 `permitTransferFrom` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Erc20PermitTransactionData {
	pub permit: PermitTransferFromData,
	pub transfer_details: TransferDetails,
	/// Address of the signer funding the transfer.
	pub owner: String,
	pub signature: String,
	pub network_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintRequestData {
	pub beneficiary: String,
	pub deadline: String,
	/// Hashed metadata keys as 0x-prefixed bytes32.
	pub keys: Vec<String>,
	pub nonce: String,
	pub values: Vec<String>,
}

/// Payload for a reward contract `safeMint` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Erc721PermitTransactionData {
	pub request: MintRequestData,
	/// Canonical key name to value.
	pub nft_metadata: BTreeMap<String, String>,
	pub nft_address: String,
	pub network_id: u64,
	pub signature: String,
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_erc20_request_accepts_string_or_number_amount() {
		let from_string: Erc20PermitRequest = serde_json::from_value(json!({
			"beneficiary": "0x70997970C51812dc3A010C7d01b50e0d17dc79C8",
			"amount": "10.5",
			"userId": "user-42",
			"issueId": "issue-7",
			"networkId": 100
		}))
		.unwrap();
		let from_number: Erc20PermitRequest = serde_json::from_value(json!({
			"beneficiary": "0x70997970C51812dc3A010C7d01b50e0d17dc79C8",
			"amount": 10.5,
			"userId": "user-42",
			"issueId": "issue-7",
			"networkId": 100
		}))
		.unwrap();

		assert_eq!(from_string.amount, from_number.amount);
		assert_eq!(from_string.network_id, 100);
	}

	#[test]
	fn test_deadline_policy() {
		assert_eq!(DeadlinePolicy::default().resolve(1_700_000_000), U256::MAX);
		assert_eq!(
			DeadlinePolicy::Ttl { seconds: 3600 }.resolve(1_700_000_000),
			U256::from(1_700_003_600u64)
		);

		let policy: DeadlinePolicy =
			serde_json::from_value(json!({ "mode": "ttl", "seconds": 60 })).unwrap();
		assert_eq!(policy, DeadlinePolicy::Ttl { seconds: 60 });
		let policy: DeadlinePolicy = serde_json::from_value(json!({ "mode": "unbounded" })).unwrap();
		assert_eq!(policy, DeadlinePolicy::Unbounded);
	}

	#[test]
	fn test_metadata_values_order() {
		let request = Erc721PermitRequest {
			beneficiary: "0x70997970C51812dc3A010C7d01b50e0d17dc79C8".into(),
			organization_name: "org".into(),
			repository_name: "repo".into(),
			issue_id: "123456".into(),
			issue_number: "7".into(),
			username: "alice".into(),
			user_id: "42".into(),
			contribution_type: "issuer".into(),
			network_id: 100,
		};
		assert_eq!(
			request.metadata_values(),
			["org", "repo", "7", "alice", "issuer"]
		);
	}

	#[test]
	fn test_payload_field_names() {
		let payload = Erc20PermitTransactionData {
			permit: PermitTransferFromData {
				permitted: TokenPermissionsData {
					token: "0xtoken".into(),
					amount: "1".into(),
				},
				nonce: "2".into(),
				deadline: "3".into(),
			},
			transfer_details: TransferDetails {
				to: "0xto".into(),
				requested_amount: "1".into(),
			},
			owner: "0xowner".into(),
			signature: "0xsig".into(),
			network_id: 100,
		};
		let value = serde_json::to_value(&payload).unwrap();
		assert_eq!(value["transferDetails"]["requestedAmount"], "1");
		assert_eq!(value["permit"]["permitted"]["token"], "0xtoken");
		assert_eq!(value["networkId"], 100);
	}
}

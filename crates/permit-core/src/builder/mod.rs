//! Construction of unsigned permits.
//!
//! The builder turns a validated request, its nonce and the current time
//! into the typed-data structure that gets signed. Type schemas are fixed
//! at compile time; request data only ever fills message values.

mod erc20;
mod erc721;

pub use erc20::PermitTransferFrom;
pub use erc721::MintRequest;

use alloy_primitives::{keccak256, Address, B256};
use permit_config::{Erc20Config, Erc721Config};
use permit_types::utils::{compute_final_digest, TypedDomain};
use permit_types::{truncate_id, DeadlinePolicy, PayoutConfig, PermitKind};
use std::collections::{HashMap, HashSet};

/// Networks the issuer serves and the payment token of each.
///
/// Every network with a payment token is served. Networks without one only
/// take NFT permits.
#[derive(Debug, Clone, Default)]
pub struct PayoutTable {
	tokens: HashMap<u64, Address>,
	networks: HashSet<u64>,
}

impl PayoutTable {
	pub fn new(payouts: HashMap<u64, PayoutConfig>) -> Self {
		let tokens: HashMap<u64, Address> = payouts
			.into_iter()
			.map(|(network_id, payout)| (network_id, payout.payment_token))
			.collect();
		let networks = tokens.keys().copied().collect();
		Self { tokens, networks }
	}

	/// Adds networks that are served without a payment token.
	pub fn with_networks(mut self, network_ids: impl IntoIterator<Item = u64>) -> Self {
		self.networks.extend(network_ids);
		self
	}

	/// Token paid out on `network_id`, if the network pays out at all.
	pub fn payment_token(&self, network_id: u64) -> Option<Address> {
		self.tokens.get(&network_id).copied()
	}

	pub fn is_served(&self, network_id: u64) -> bool {
		self.networks.contains(&network_id)
	}
}

/// Settings of Permit2 transfer permits.
#[derive(Debug, Clone)]
pub struct Erc20Settings {
	pub permit2_address: Address,
	pub decimals: u8,
	pub deadline: DeadlinePolicy,
}

impl From<&Erc20Config> for Erc20Settings {
	fn from(config: &Erc20Config) -> Self {
		Self {
			permit2_address: config.permit2_address,
			decimals: config.decimals,
			deadline: config.deadline,
		}
	}
}

/// Settings of NFT mint permits.
#[derive(Debug, Clone)]
pub struct Erc721Settings {
	pub contract_address: Address,
	pub domain_name: String,
	pub domain_version: String,
	pub deadline: DeadlinePolicy,
}

impl From<&Erc721Config> for Erc721Settings {
	fn from(config: &Erc721Config) -> Self {
		Self {
			contract_address: config.contract_address,
			domain_name: config.domain_name.clone(),
			domain_version: config.domain_version.clone(),
			deadline: config.deadline,
		}
	}
}

/// Message values of an unsigned permit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermitMessage {
	TransferFrom(PermitTransferFrom),
	Mint(MintRequest),
}

/// A permit ready to be signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedPermit {
	pub domain: TypedDomain,
	pub message: PermitMessage,
}

impl UnsignedPermit {
	pub fn kind(&self) -> PermitKind {
		match self.message {
			PermitMessage::TransferFrom(_) => PermitKind::Erc20,
			PermitMessage::Mint(_) => PermitKind::Erc721,
		}
	}

	pub fn primary_type(&self) -> &'static str {
		match self.message {
			PermitMessage::TransferFrom(_) => "PermitTransferFrom",
			PermitMessage::Mint(_) => "MintRequest",
		}
	}

	/// Full `encodeType` string of the primary type.
	pub fn type_schema(&self) -> String {
		match self.message {
			PermitMessage::TransferFrom(_) => PermitTransferFrom::encode_type(),
			PermitMessage::Mint(_) => MintRequest::encode_type().to_string(),
		}
	}

	/// `hashStruct` of the message.
	pub fn struct_hash(&self) -> B256 {
		match &self.message {
			PermitMessage::TransferFrom(message) => message.struct_hash(),
			PermitMessage::Mint(message) => message.struct_hash(),
		}
	}

	/// The EIP-712 digest the verifying contract recomputes.
	pub fn signing_hash(&self) -> B256 {
		compute_final_digest(&self.domain.separator(), &self.struct_hash())
	}

	pub fn network_id(&self) -> u64 {
		self.domain.chain_id
	}
}

/// Builds unsigned permits from immutable issuer settings.
#[derive(Debug, Clone)]
pub struct PermitBuilder {
	payouts: PayoutTable,
	erc20: Erc20Settings,
	erc721: Erc721Settings,
}

impl PermitBuilder {
	pub fn new(payouts: PayoutTable, erc20: Erc20Settings, erc721: Erc721Settings) -> Self {
		Self {
			payouts,
			erc20,
			erc721,
		}
	}
}

/// keccak256 of a type string.
pub(crate) fn type_hash(encode_type: &str) -> B256 {
	keccak256(encode_type.as_bytes())
}

/// Parses a request address field.
pub(crate) fn parse_address(field: &str, value: &str) -> Result<Address, crate::IssueError> {
	let value = value.trim();
	value.parse::<Address>().map_err(|e| {
		crate::IssueError::InvalidArgument(format!(
			"{} '{}' is not an address: {}",
			field,
			truncate_id(value),
			e
		))
	})
}

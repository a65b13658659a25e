//! Transaction payloads handed back to callers.
//!
//! Numbers are rendered as decimal strings, addresses in EIP-55 checksum
//! form and byte strings as 0x-prefixed hex.

use crate::builder::PermitMessage;
use crate::signer::SignedPermit;
use crate::IssueError;
use permit_types::{
	Erc20PermitTransactionData, Erc721PermitTransactionData, MintRequestData,
	PermitTransferFromData, TokenPermissionsData, TransferDetails, NFT_METADATA_KEYS,
};

fn hex_bytes(bytes: &[u8]) -> String {
	format!("0x{}", hex::encode(bytes))
}

/// Assembles the Permit2 `permitTransferFrom` arguments.
pub fn assemble_erc20(
	signed: &SignedPermit,
	network_id: u64,
) -> Result<Erc20PermitTransactionData, IssueError> {
	let PermitMessage::TransferFrom(message) = &signed.permit.message else {
		return Err(IssueError::InvalidArgument(format!(
			"cannot assemble a transfer payload from a {} permit",
			signed.permit.kind()
		)));
	};

	let amount = message.amount.to_string();
	Ok(Erc20PermitTransactionData {
		permit: PermitTransferFromData {
			permitted: TokenPermissionsData {
				token: message.token.to_checksum(None),
				amount: amount.clone(),
			},
			nonce: message.nonce.to_string(),
			deadline: message.deadline.to_string(),
		},
		transfer_details: TransferDetails {
			to: message.spender.to_checksum(None),
			requested_amount: amount,
		},
		owner: signed.signer.to_checksum(None),
		signature: hex_bytes(&signed.signature),
		network_id,
	})
}

/// Assembles the reward contract `safeMint` arguments.
pub fn assemble_erc721(
	signed: &SignedPermit,
	network_id: u64,
) -> Result<Erc721PermitTransactionData, IssueError> {
	let PermitMessage::Mint(message) = &signed.permit.message else {
		return Err(IssueError::InvalidArgument(format!(
			"cannot assemble a mint payload from a {} permit",
			signed.permit.kind()
		)));
	};

	let nft_metadata = NFT_METADATA_KEYS
		.iter()
		.zip(&message.values)
		.map(|(key, value)| (key.to_string(), value.clone()))
		.collect();

	Ok(Erc721PermitTransactionData {
		request: MintRequestData {
			beneficiary: message.beneficiary.to_checksum(None),
			deadline: message.deadline.to_string(),
			keys: message.keys.iter().map(|key| hex_bytes(key.as_slice())).collect(),
			nonce: message.nonce.to_string(),
			values: message.values.clone(),
		},
		nft_metadata,
		nft_address: signed.permit.domain.verifying_contract.to_checksum(None),
		network_id,
		signature: hex_bytes(&signed.signature),
	})
}

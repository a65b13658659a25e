//! Permit2 `PermitTransferFrom` permits for fungible payouts.

use super::{parse_address, type_hash, PermitBuilder, PermitMessage, UnsignedPermit};
use crate::IssueError;
use alloy_primitives::{keccak256, Address, B256, U256};
use permit_types::utils::{
	parse_units, Eip712AbiEncoder, TypedDomain, NAME_PERMIT2, PERMIT_TRANSFER_FROM_TYPE,
	TOKEN_PERMISSIONS_TYPE,
};
use permit_types::Erc20PermitRequest;

/// Message of a Permit2 signature transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermitTransferFrom {
	pub token: Address,
	pub amount: U256,
	/// Account allowed to redeem the permit; the beneficiary.
	pub spender: Address,
	pub nonce: U256,
	pub deadline: U256,
}

impl PermitTransferFrom {
	/// Primary type followed by its referenced `TokenPermissions` type.
	pub fn encode_type() -> String {
		format!("{}{}", PERMIT_TRANSFER_FROM_TYPE, TOKEN_PERMISSIONS_TYPE)
	}

	fn permissions_hash(&self) -> B256 {
		let mut enc = Eip712AbiEncoder::new();
		enc.push_b256(&type_hash(TOKEN_PERMISSIONS_TYPE));
		enc.push_address(&self.token);
		enc.push_u256(self.amount);
		keccak256(enc.finish())
	}

	pub fn struct_hash(&self) -> B256 {
		let mut enc = Eip712AbiEncoder::new();
		enc.push_b256(&type_hash(&Self::encode_type()));
		enc.push_b256(&self.permissions_hash());
		enc.push_address(&self.spender);
		enc.push_u256(self.nonce);
		enc.push_u256(self.deadline);
		keccak256(enc.finish())
	}
}

impl PermitBuilder {
	/// Builds a Permit2 transfer permit paying `request.amount` tokens.
	///
	/// Fails with `UnsupportedNetwork` when the network has no payment
	/// token, before any other check touches the request.
	pub fn build_erc20(
		&self,
		request: &Erc20PermitRequest,
		nonce: U256,
		now: u64,
	) -> Result<UnsignedPermit, IssueError> {
		let token = self
			.payouts
			.payment_token(request.network_id)
			.ok_or(IssueError::UnsupportedNetwork(request.network_id))?;
		let spender = parse_address("beneficiary", &request.beneficiary)?;
		let amount = parse_units(&request.amount, self.erc20.decimals)
			.map_err(|e| IssueError::InvalidArgument(e.to_string()))?;

		Ok(UnsignedPermit {
			domain: TypedDomain {
				name: NAME_PERMIT2.to_string(),
				version: None,
				chain_id: request.network_id,
				verifying_contract: self.erc20.permit2_address,
			},
			message: PermitMessage::TransferFrom(PermitTransferFrom {
				token,
				amount,
				spender,
				nonce,
				deadline: self.erc20.deadline.resolve(now),
			}),
		})
	}
}

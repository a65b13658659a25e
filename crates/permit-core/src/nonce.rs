//! Deterministic permit nonces.
//!
//! A nonce identifies one reward for one contributor. Re-issuing the same
//! reward yields the same nonce, so the verifying contract redeems it at
//! most once.

use crate::IssueError;
use alloy_primitives::{keccak256, U256};

/// Derives the nonce of the reward `work_item_id` granted to `recipient_id`.
///
/// The nonce is `keccak256("{recipient_id}-{work_item_id}")` read as a
/// big-endian integer.
pub fn derive_nonce(recipient_id: &str, work_item_id: &str) -> Result<U256, IssueError> {
	if recipient_id.trim().is_empty() {
		return Err(IssueError::InvalidArgument("user id cannot be empty".into()));
	}
	if work_item_id.trim().is_empty() {
		return Err(IssueError::InvalidArgument("issue id cannot be empty".into()));
	}

	let digest = keccak256(format!("{}-{}", recipient_id, work_item_id));
	Ok(U256::from_be_bytes(digest.0))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_same_pair_same_nonce() {
		let a = derive_nonce("123", "456").unwrap();
		let b = derive_nonce("123", "456").unwrap();
		assert_eq!(a, b);
	}

	#[test]
	fn test_matches_hash_of_joined_ids() {
		let nonce = derive_nonce("123", "456").unwrap();
		assert_eq!(nonce, U256::from_be_bytes(keccak256("123-456").0));
	}

	#[test]
	fn test_distinct_pairs_differ() {
		let a = derive_nonce("alice", "1").unwrap();
		let b = derive_nonce("alice", "2").unwrap();
		let c = derive_nonce("bob", "1").unwrap();
		assert_ne!(a, b);
		assert_ne!(a, c);
	}

	#[test]
	fn test_empty_ids_rejected() {
		assert!(matches!(
			derive_nonce("", "456"),
			Err(IssueError::InvalidArgument(_))
		));
		assert!(matches!(
			derive_nonce("123", "  "),
			Err(IssueError::InvalidArgument(_))
		));
	}
}

//! Utility functions for encoding, unit conversion and formatting.

pub mod eip712;
pub mod formatting;
pub mod units;

pub use eip712::{
	compute_final_digest, Eip712AbiEncoder, TypedDomain, DOMAIN_TYPE, MINT_REQUEST_TYPE,
	NAME_PERMIT2, PERMIT_TRANSFER_FROM_TYPE, TOKEN_PERMISSIONS_TYPE, VERSIONED_DOMAIN_TYPE,
};
pub use formatting::{truncate_id, with_0x_prefix, without_0x_prefix};
pub use units::{current_timestamp, parse_units, UnitsError};

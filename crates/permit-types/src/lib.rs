//! Common types module for the permit issuer.
//!
//! This crate defines the data types shared by every permit crate: request
//! and payload shapes, network and payout configuration, RPC endpoints, the
//! EIP-712 encoding helpers, and the configuration validation framework.

/// API error shapes returned by the HTTP surface.
pub mod api;
/// RPC endpoint handles.
pub mod endpoint;
/// Network, RPC candidate and payout configuration types.
pub mod networks;
/// Permit requests and transaction payloads.
pub mod permit;
/// Registry trait for named implementations.
pub mod registry;
/// Zeroizing string wrapper for key material.
pub mod secret_string;
/// Utility functions for encoding and formatting.
pub mod utils;
/// Configuration validation types.
pub mod validation;

pub use alloy_primitives::{Address, B256, U256};
pub use api::{APIError, ErrorResponse};
pub use endpoint::Endpoint;
pub use networks::{NetworkConfig, NetworksConfig, PayoutConfig};
pub use permit::*;
pub use registry::ImplementationRegistry;
pub use secret_string::SecretString;
pub use utils::{truncate_id, with_0x_prefix, without_0x_prefix};
pub use validation::*;

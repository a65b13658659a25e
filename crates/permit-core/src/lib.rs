//! Core of the permit issuer.
//!
//! Turns permit requests into signed transaction payloads:
//! nonce derivation, typed-data construction, EIP-712 signing and payload
//! assembly, wired together by [`PermitIssuer`].

pub mod builder;
mod error;
mod factory;
mod issuer;
pub mod nonce;
pub mod payload;
pub mod signer;

pub use builder::{Erc20Settings, Erc721Settings, PayoutTable, PermitBuilder, UnsignedPermit};
pub use error::{ErrorClass, IssueError};
pub use factory::{BuilderError, IssuerBuilder, IssuerFactories};
pub use issuer::PermitIssuer;
pub use nonce::derive_nonce;
pub use signer::{recover_signer, SignedPermit, SigningIdentity};

//! RPC endpoint handles.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A blockchain node endpoint selected for one network.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
	pub network_id: u64,
	pub url: String,
}

impl Endpoint {
	pub fn new(network_id: u64, url: impl Into<String>) -> Self {
		Self {
			network_id,
			url: url.into(),
		}
	}
}

impl fmt::Display for Endpoint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} (network {})", self.url, self.network_id)
	}
}

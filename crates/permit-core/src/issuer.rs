//! The issuance pipeline.

use crate::builder::{PermitBuilder, UnsignedPermit};
use crate::nonce::derive_nonce;
use crate::payload::{assemble_erc20, assemble_erc721};
use crate::signer::{SignedPermit, SigningIdentity};
use crate::IssueError;
use permit_account::KeyService;
use permit_rpc::{EndpointResolver, RpcError};
use permit_types::utils::current_timestamp;
use permit_types::{
	Endpoint, Erc20PermitRequest, Erc20PermitTransactionData, Erc721PermitRequest,
	Erc721PermitTransactionData, SecretString,
};
use tokio_util::sync::CancellationToken;

/// Issues signed permits.
///
/// Request validation and permit construction happen before any I/O. Key
/// loading and endpoint resolution then run concurrently; the issuance can
/// be cancelled until signing starts.
pub struct PermitIssuer {
	builder: PermitBuilder,
	erc20_keys: KeyService,
	erc721_keys: Option<KeyService>,
	resolver: EndpointResolver,
}

impl PermitIssuer {
	pub fn new(
		builder: PermitBuilder,
		erc20_keys: KeyService,
		erc721_keys: Option<KeyService>,
		resolver: EndpointResolver,
	) -> Self {
		Self {
			builder,
			erc20_keys,
			erc721_keys,
			resolver,
		}
	}

	/// Issues a Permit2 transfer permit.
	pub async fn issue_erc20(
		&self,
		request: &Erc20PermitRequest,
		cancel: &CancellationToken,
	) -> Result<Erc20PermitTransactionData, IssueError> {
		let nonce = derive_nonce(&request.user_id, &request.issue_id)?;
		let unsigned = self
			.builder
			.build_erc20(request, nonce, current_timestamp())?;

		let signed = self
			.sign(&self.erc20_keys, unsigned, request.network_id, cancel)
			.await?;
		let payload = assemble_erc20(&signed, request.network_id)?;

		tracing::info!(
			kind = "erc20",
			network_id = request.network_id,
			user_id = %request.user_id,
			issue_id = %request.issue_id,
			payload = ?payload,
			"Issued permit"
		);
		Ok(payload)
	}

	/// Issues an NFT reward mint permit.
	pub async fn issue_erc721(
		&self,
		request: &Erc721PermitRequest,
		cancel: &CancellationToken,
	) -> Result<Erc721PermitTransactionData, IssueError> {
		let nonce = derive_nonce(&request.user_id, &request.issue_id)?;
		let unsigned = self
			.builder
			.build_erc721(request, nonce, current_timestamp())?;
		let keys = self.erc721_keys.as_ref().ok_or_else(|| {
			IssueError::MissingSignerKey("no key provider configured for erc721 permits".into())
		})?;

		let signed = self
			.sign(keys, unsigned, request.network_id, cancel)
			.await?;
		let payload = assemble_erc721(&signed, request.network_id)?;

		tracing::info!(
			kind = "erc721",
			network_id = request.network_id,
			user_id = %request.user_id,
			issue_id = %request.issue_id,
			payload = ?payload,
			"Issued permit"
		);
		Ok(payload)
	}

	async fn sign(
		&self,
		keys: &KeyService,
		unsigned: UnsignedPermit,
		network_id: u64,
		cancel: &CancellationToken,
	) -> Result<SignedPermit, IssueError> {
		let (key, endpoint) = self.prepare(keys, network_id, cancel).await?;
		let identity = SigningIdentity::instantiate(&key, &endpoint)?;
		drop(key);
		identity.sign(unsigned)
	}

	/// Loads the key and resolves the endpoint concurrently.
	async fn prepare(
		&self,
		keys: &KeyService,
		network_id: u64,
		cancel: &CancellationToken,
	) -> Result<(SecretString, Endpoint), IssueError> {
		let load = async { keys.private_key().await.map_err(IssueError::from) };
		let resolve = async {
			self.resolver
				.resolve(network_id)
				.await
				.map_err(|source| match source {
					RpcError::UnknownNetwork(id) => IssueError::UnsupportedNetwork(id),
					source => IssueError::EndpointResolution { network_id, source },
				})
		};

		let (key, endpoint) = tokio::select! {
			biased;
			_ = cancel.cancelled() => {
				tracing::info!(network_id, "Issuance cancelled before signing");
				return Err(IssueError::Cancelled);
			},
			ready = async { tokio::try_join!(load, resolve) } => ready?,
		};

		if tracing::enabled!(tracing::Level::DEBUG) {
			match self.resolver.latencies(network_id).await {
				Ok(latencies) => {
					for entry in latencies {
						tracing::debug!(
							network_id,
							url = %entry.url,
							latency_ms = entry.latency.as_millis() as u64,
							"Endpoint latency"
						);
					}
				},
				Err(e) => tracing::debug!(network_id, error = %e, "Endpoint latencies unavailable"),
			}
		}

		Ok((key, endpoint))
	}
}

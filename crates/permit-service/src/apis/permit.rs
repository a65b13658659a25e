//! Permit issuance endpoints.
//!
//! Each issuance runs in its own task tied to a cancellation token. The
//! token is cancelled when the request is dropped (client disconnect) or
//! times out, which stops the issuance before it signs anything.

use crate::server::AppState;
use permit_core::IssueError;
use permit_types::{
	APIError, Erc20PermitRequest, Erc20PermitTransactionData, Erc721PermitRequest,
	Erc721PermitTransactionData,
};
use serde_json::json;
use std::future::Future;
use tokio_util::sync::CancellationToken;

pub async fn issue_erc20(
	state: &AppState,
	request: Erc20PermitRequest,
) -> Result<Erc20PermitTransactionData, APIError> {
	let issuer = state.issuer.clone();
	run_cancellable(state, move |cancel| async move {
		issuer.issue_erc20(&request, &cancel).await
	})
	.await
}

pub async fn issue_erc721(
	state: &AppState,
	request: Erc721PermitRequest,
) -> Result<Erc721PermitTransactionData, APIError> {
	let issuer = state.issuer.clone();
	run_cancellable(state, move |cancel| async move {
		issuer.issue_erc721(&request, &cancel).await
	})
	.await
}

async fn run_cancellable<T, F, Fut>(state: &AppState, issue: F) -> Result<T, APIError>
where
	T: Send + 'static,
	F: FnOnce(CancellationToken) -> Fut,
	Fut: Future<Output = Result<T, IssueError>> + Send + 'static,
{
	let cancel = CancellationToken::new();
	// Dropped with this future, cancelling the task below
	let _guard = cancel.clone().drop_guard();
	let task = tokio::spawn(issue(cancel));

	match tokio::time::timeout(state.request_timeout, task).await {
		Ok(Ok(result)) => result.map_err(|e| {
			tracing::warn!(error = %e, class = ?e.class(), "Permit issuance failed");
			to_api_error(e, state.retry_after)
		}),
		Ok(Err(join_error)) => {
			tracing::error!(error = %join_error, "Permit issuance task failed");
			Err(APIError::InternalServerError {
				error_type: "ISSUANCE_TASK_FAILED".to_string(),
				message: "Permit issuance terminated unexpectedly".to_string(),
			})
		},
		Err(_) => {
			tracing::warn!(
				timeout_secs = state.request_timeout.as_secs(),
				"Permit issuance timed out"
			);
			Err(APIError::ServiceUnavailable {
				error_type: "TIMEOUT".to_string(),
				message: "Permit issuance did not complete in time".to_string(),
				retry_after: Some(state.retry_after),
			})
		},
	}
}

/// Maps an issuance failure to its HTTP error.
pub fn to_api_error(err: IssueError, retry_after: u64) -> APIError {
	let message = err.to_string();
	match err {
		IssueError::InvalidArgument(_) => APIError::BadRequest {
			error_type: "INVALID_ARGUMENT".to_string(),
			message,
			details: None,
		},
		IssueError::UnsupportedNetwork(network_id) => APIError::UnprocessableEntity {
			error_type: "UNSUPPORTED_NETWORK".to_string(),
			message,
			details: Some(json!({ "networkId": network_id })),
		},
		IssueError::MissingSignerKey(_) => APIError::UnprocessableEntity {
			error_type: "MISSING_SIGNER_KEY".to_string(),
			message,
			details: None,
		},
		IssueError::InvalidKeyMaterial(_) => APIError::UnprocessableEntity {
			error_type: "INVALID_KEY_MATERIAL".to_string(),
			message,
			details: None,
		},
		IssueError::EndpointResolution { .. } => APIError::ServiceUnavailable {
			error_type: "ENDPOINT_RESOLUTION".to_string(),
			message,
			retry_after: Some(retry_after),
		},
		IssueError::Cancelled => APIError::ServiceUnavailable {
			error_type: "CANCELLED".to_string(),
			message,
			retry_after: Some(retry_after),
		},
		IssueError::SigningFailure(_) => APIError::InternalServerError {
			error_type: "SIGNING_FAILURE".to_string(),
			message,
		},
	}
}

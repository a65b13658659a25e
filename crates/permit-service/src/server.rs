//! HTTP server for the permit issuer API.

use axum::{
	extract::State,
	http::HeaderValue,
	response::Json,
	routing::{get, post},
	Router,
};
use permit_config::{ApiConfig, Config};
use permit_core::PermitIssuer;
use permit_types::{
	APIError, Erc20PermitRequest, Erc20PermitTransactionData, Erc721PermitRequest,
	Erc721PermitTransactionData,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	pub issuer: Arc<PermitIssuer>,
	pub issuer_id: String,
	/// Upper bound on a single issuance.
	pub request_timeout: Duration,
	/// Hint returned with transient failures, in seconds.
	pub retry_after: u64,
}

impl AppState {
	pub fn new(issuer: Arc<PermitIssuer>, config: &Config, api: &ApiConfig) -> Self {
		// One full retry cycle of endpoint resolution, at least a second
		let retry_window_ms =
			u64::from(config.rpc.max_attempts).saturating_mul(config.rpc.retry_delay_ms);
		Self {
			issuer,
			issuer_id: config.issuer.id.clone(),
			request_timeout: Duration::from_secs(api.timeout_seconds),
			retry_after: retry_window_ms.div_ceil(1000).max(1),
		}
	}
}

#[derive(Debug, Serialize)]
struct HealthResponse {
	status: &'static str,
	issuer: String,
}

/// Builds the `/api` router.
pub fn router(state: AppState, allowed_origins: &[String]) -> Router {
	let cors = if allowed_origins.is_empty() {
		CorsLayer::permissive()
	} else {
		let origins: Vec<HeaderValue> = allowed_origins
			.iter()
			.filter_map(|origin| match origin.parse() {
				Ok(value) => Some(value),
				Err(_) => {
					tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
					None
				},
			})
			.collect();
		CorsLayer::new()
			.allow_origin(AllowOrigin::list(origins))
			.allow_methods(tower_http::cors::Any)
			.allow_headers(tower_http::cors::Any)
	};

	Router::new()
		.nest(
			"/api",
			Router::new()
				.route("/health", get(handle_health))
				.route("/permits/erc20", post(handle_erc20))
				.route("/permits/erc721", post(handle_erc721)),
		)
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(cors),
		)
		.with_state(state)
}

/// Starts the HTTP server and runs until ctrl-c.
pub async fn start_server(
	api_config: ApiConfig,
	state: AppState,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = router(state, &api_config.allowed_origins);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Permit issuer API server starting on {}", bind_address);

	axum::serve(listener, app)
		.with_graceful_shutdown(async {
			if let Err(e) = tokio::signal::ctrl_c().await {
				tracing::error!(error = %e, "Failed to listen for shutdown signal");
			}
		})
		.await?;

	Ok(())
}

/// Handles GET /api/health requests.
async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
	Json(HealthResponse {
		status: "ok",
		issuer: state.issuer_id.clone(),
	})
}

/// Handles POST /api/permits/erc20 requests.
async fn handle_erc20(
	State(state): State<AppState>,
	Json(request): Json<Erc20PermitRequest>,
) -> Result<Json<Erc20PermitTransactionData>, APIError> {
	crate::apis::permit::issue_erc20(&state, request)
		.await
		.map(Json)
}

/// Handles POST /api/permits/erc721 requests.
async fn handle_erc721(
	State(state): State<AppState>,
	Json(request): Json<Erc721PermitRequest>,
) -> Result<Json<Erc721PermitTransactionData>, APIError> {
	crate::apis::permit::issue_erc721(&state, request)
		.await
		.map(Json)
}

//! Main entry point for the permit issuer service.
//!
//! Loads the configuration, builds the issuer with the registered key
//! providers and endpoint selectors, and serves the HTTP API.

use clap::Parser;
use permit_config::Config;
use permit_core::{IssuerBuilder, IssuerFactories};
use std::path::PathBuf;
use std::sync::Arc;

mod apis;
mod server;

/// Command-line arguments for the permit issuer.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml", env = "PERMIT_CONFIG")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started permit issuer");

	let config_path = args
		.config
		.to_str()
		.ok_or("Configuration path is not valid UTF-8")?;
	let config = Config::from_file(config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.issuer.id);

	let issuer = IssuerBuilder::new(config.clone()).build(IssuerFactories::default())?;

	let Some(api_config) = config.api.clone().filter(|api| api.enabled) else {
		tracing::warn!("API server is disabled, nothing to serve");
		return Ok(());
	};

	let state = server::AppState::new(Arc::new(issuer), &config, &api_config);
	server::start_server(api_config, state).await?;

	tracing::info!("Stopped permit issuer");
	Ok(())
}

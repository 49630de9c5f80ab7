//! Gateway configuration assembled outside the core components.
//!
//! This module is the only place the process environment is read; the token
//! provider and executor receive already-validated values and never touch the
//! environment themselves.

// std
use std::env;
// self
use crate::{_prelude::*, auth::Credentials};

/// Environment variable naming the carrier base URL.
pub const ENV_BASE_URL: &str = "CARRIER_GATEWAY_BASE_URL";
/// Environment variable naming the carrier client identifier.
pub const ENV_CLIENT_ID: &str = "CARRIER_GATEWAY_CLIENT_ID";
/// Environment variable naming the carrier client secret.
pub const ENV_CLIENT_SECRET: &str = "CARRIER_GATEWAY_CLIENT_SECRET";

/// Validated gateway configuration for one carrier account.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
	/// Carrier API base URL.
	pub base_url: Url,
	/// Client credentials for the carrier token endpoint.
	pub credentials: Credentials,
}
impl GatewayConfig {
	/// Builds a validated configuration from raw values.
	pub fn new(base_url: &str, client_id: &str, client_secret: &str) -> Result<Self> {
		if client_id.trim().is_empty() {
			return Err(Error::validation("Carrier client identifier must not be empty."));
		}
		if client_secret.trim().is_empty() {
			return Err(Error::validation("Carrier client secret must not be empty."));
		}

		let base_url = Url::parse(base_url)
			.map_err(|err| Error::validation(format!("Carrier base URL is invalid: {err}.")))?;

		Ok(Self { base_url, credentials: Credentials::new(client_id, client_secret) })
	}

	/// Loads and validates configuration from the process environment.
	pub fn from_env() -> Result<Self> {
		let base_url = require_env(ENV_BASE_URL)?;
		let client_id = require_env(ENV_CLIENT_ID)?;
		let client_secret = require_env(ENV_CLIENT_SECRET)?;

		Self::new(&base_url, &client_id, &client_secret)
	}
}

fn require_env(name: &str) -> Result<String> {
	match env::var(name) {
		Ok(value) if !value.trim().is_empty() => Ok(value),
		_ => Err(Error::validation(format!("Environment variable {name} must be set."))),
	}
}

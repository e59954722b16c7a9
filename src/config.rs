//! Client configuration: backend location, refresh endpoint, transport deadline, and the
//! caller-facing session-expired message.

/// Builder API for assembling client configurations.
pub mod builder;

pub use builder::*;

// self
use crate::{_prelude::*, error::ConfigError};

/// Immutable configuration consumed by [`ApiClient`](crate::client::ApiClient).
///
/// Deserialization goes through [`ClientConfigBuilder::build`], so a loaded configuration is
/// normalized and validated exactly like one assembled in code.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ClientConfigBuilder")]
pub struct ClientConfig {
	/// Base URL every request path is resolved against; always ends with `/`.
	pub base_url: Url,
	/// Refresh endpoint path, relative to [`ClientConfig::base_url`].
	pub refresh_path: String,
	/// Per-request deadline enforced by the transport, including the refresh exchange.
	pub timeout: Duration,
	/// Sends and stores cookies so an HTTP-only refresh cookie reaches the refresh endpoint.
	pub with_credentials: bool,
	/// Message handed to every caller whose request failed because the session ended.
	pub session_expired_message: String,
}
impl ClientConfig {
	/// Default refresh endpoint path.
	pub const DEFAULT_REFRESH_PATH: &'static str = "auth/refresh";
	/// Default message for requests that failed because the refresh exchange failed.
	pub const DEFAULT_SESSION_EXPIRED_MESSAGE: &'static str = "Session expired. Please log in again.";
	/// Default transport deadline.
	pub const DEFAULT_TIMEOUT: Duration = Duration::seconds(30);

	/// Creates a new builder for the provided base URL.
	pub fn builder(base_url: Url) -> ClientConfigBuilder {
		ClientConfigBuilder::new(base_url)
	}

	/// Resolves a request path against the base URL.
	///
	/// A leading `/` is ignored so `"/complaints"` and `"complaints"` address the same resource
	/// below the base path. Absolute URLs are accepted as-is.
	pub fn resolve(&self, path: &str) -> Result<Url> {
		self.base_url
			.join(path.trim_start_matches('/'))
			.map_err(|source| ConfigError::InvalidUrl { path: path.to_owned(), source }.into())
	}

	/// Fully-qualified refresh endpoint.
	pub fn refresh_url(&self) -> Result<Url> {
		self.resolve(&self.refresh_path)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn config(base: &str) -> ClientConfig {
		ClientConfig::builder(Url::parse(base).expect("Fixture base URL should parse."))
			.build()
			.expect("Fixture configuration should validate.")
	}

	#[test]
	fn resolves_paths_below_the_base_path() {
		let config = config("https://console.example.com/api/v1");

		assert_eq!(
			config.resolve("/complaints").expect("Path should resolve.").as_str(),
			"https://console.example.com/api/v1/complaints"
		);
		assert_eq!(
			config.resolve("complaints/42").expect("Path should resolve.").as_str(),
			"https://console.example.com/api/v1/complaints/42"
		);
		assert_eq!(
			config.refresh_url().expect("Refresh path should resolve.").as_str(),
			"https://console.example.com/api/v1/auth/refresh"
		);
	}

	#[test]
	fn defaults_match_documented_values() {
		let config = config("http://localhost:4000");

		assert_eq!(config.refresh_path, ClientConfig::DEFAULT_REFRESH_PATH);
		assert_eq!(config.timeout, Duration::seconds(30));
		assert!(config.with_credentials);
		assert_eq!(config.session_expired_message, "Session expired. Please log in again.");
	}

	#[test]
	fn deserialized_config_is_normalized_like_a_built_one() {
		let config: ClientConfig =
			serde_json::from_value(serde_json::json!({ "base_url": "https://host.example.com/api" }))
				.expect("Minimal configuration should deserialize.");

		assert_eq!(config.base_url.as_str(), "https://host.example.com/api/");
		assert_eq!(
			config.resolve("complaints").expect("Path should resolve.").as_str(),
			"https://host.example.com/api/complaints"
		);
		assert_eq!(
			config.refresh_url().expect("Refresh path should resolve.").as_str(),
			"https://host.example.com/api/auth/refresh"
		);
		assert_eq!(config.timeout, ClientConfig::DEFAULT_TIMEOUT);
	}

	#[test]
	fn deserialized_config_is_validated() {
		let mut payload = serde_json::to_value(config("https://host.example.com/api"))
			.expect("Configuration should serialize.");

		payload["timeout"] = serde_json::json!([0, 0]);

		let err = serde_json::from_value::<ClientConfig>(payload)
			.expect_err("Zero timeouts should be rejected on load.");

		assert!(err.to_string().contains("The request timeout must be positive."));

		let err = serde_json::from_value::<ClientConfig>(
			serde_json::json!({ "base_url": "ftp://files.example.com" }),
		)
		.expect_err("Non-HTTP base URLs should be rejected on load.");

		assert!(err.to_string().contains("must use http or https"));
	}
}

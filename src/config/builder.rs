// self
use crate::{_prelude::*, config::ClientConfig};

/// Errors raised while constructing or validating configurations.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ConfigValidationError {
	/// Base URL must use HTTP or HTTPS.
	#[error("The base URL must use http or https: {url}.")]
	UnsupportedScheme {
		/// Base URL that failed validation.
		url: String,
	},
	/// Base URL must be able to carry a path.
	#[error("The base URL cannot carry a path: {url}.")]
	CannotBeABase {
		/// Base URL that failed validation.
		url: String,
	},
	/// Refresh endpoint path must not be empty.
	#[error("The refresh path must not be empty.")]
	EmptyRefreshPath,
	/// Transport deadline must be positive.
	#[error("The request timeout must be positive.")]
	NonPositiveTimeout,
}

/// Builder for [`ClientConfig`] values.
///
/// Also the unvalidated wire form of a configuration: omitted fields take their defaults.
#[derive(Debug, Deserialize)]
pub struct ClientConfigBuilder {
	/// Base URL every request path is resolved against.
	pub base_url: Url,
	/// Refresh endpoint path.
	#[serde(default = "default_refresh_path")]
	pub refresh_path: String,
	/// Per-request deadline.
	#[serde(default = "default_timeout")]
	pub timeout: Duration,
	/// Whether cookies are stored and sent.
	#[serde(default = "default_with_credentials")]
	pub with_credentials: bool,
	/// Session-expired message returned to callers.
	#[serde(default = "default_session_expired_message")]
	pub session_expired_message: String,
}
impl ClientConfigBuilder {
	/// Creates a new builder seeded with defaults.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			refresh_path: default_refresh_path(),
			timeout: default_timeout(),
			with_credentials: default_with_credentials(),
			session_expired_message: default_session_expired_message(),
		}
	}

	/// Overrides the refresh endpoint path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = path.into();

		self
	}

	/// Overrides the transport deadline.
	pub fn timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Enables or disables the cookie store.
	pub fn with_credentials(mut self, enabled: bool) -> Self {
		self.with_credentials = enabled;

		self
	}

	/// Overrides the session-expired message.
	pub fn session_expired_message(mut self, message: impl Into<String>) -> Self {
		self.session_expired_message = message.into();

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ClientConfig, ConfigValidationError> {
		let mut base_url = self.base_url;

		if !matches!(base_url.scheme(), "http" | "https") {
			return Err(ConfigValidationError::UnsupportedScheme { url: base_url.to_string() });
		}
		if base_url.cannot_be_a_base() {
			return Err(ConfigValidationError::CannotBeABase { url: base_url.to_string() });
		}
		if !base_url.path().ends_with('/') {
			let path = format!("{}/", base_url.path());

			base_url.set_path(&path);
		}

		let refresh_path = self.refresh_path.trim().trim_start_matches('/').to_owned();

		if refresh_path.is_empty() {
			return Err(ConfigValidationError::EmptyRefreshPath);
		}
		if !self.timeout.is_positive() {
			return Err(ConfigValidationError::NonPositiveTimeout);
		}

		Ok(ClientConfig {
			base_url,
			refresh_path,
			timeout: self.timeout,
			with_credentials: self.with_credentials,
			session_expired_message: self.session_expired_message,
		})
	}
}
impl TryFrom<ClientConfigBuilder> for ClientConfig {
	type Error = ConfigValidationError;

	fn try_from(builder: ClientConfigBuilder) -> Result<Self, Self::Error> {
		builder.build()
	}
}

fn default_refresh_path() -> String {
	ClientConfig::DEFAULT_REFRESH_PATH.into()
}

fn default_timeout() -> Duration {
	ClientConfig::DEFAULT_TIMEOUT
}

fn default_with_credentials() -> bool {
	true
}

fn default_session_expired_message() -> String {
	ClientConfig::DEFAULT_SESSION_EXPIRED_MESSAGE.into()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn base(url: &str) -> Url {
		Url::parse(url).expect("Fixture URL should parse.")
	}

	#[test]
	fn rejects_non_http_schemes() {
		let err = ClientConfig::builder(base("ftp://files.example.com"))
			.build()
			.expect_err("FTP base URLs should be rejected.");

		assert!(matches!(err, ConfigValidationError::UnsupportedScheme { .. }));
	}

	#[test]
	fn rejects_blank_refresh_path_and_zero_timeout() {
		assert_eq!(
			ClientConfig::builder(base("https://api.example.com"))
				.refresh_path(" / ")
				.build()
				.expect_err("Blank refresh paths should be rejected."),
			ConfigValidationError::EmptyRefreshPath
		);
		assert_eq!(
			ClientConfig::builder(base("https://api.example.com"))
				.timeout(Duration::ZERO)
				.build()
				.expect_err("Zero timeouts should be rejected."),
			ConfigValidationError::NonPositiveTimeout
		);
	}

	#[test]
	fn normalizes_base_path_and_refresh_path() {
		let config = ClientConfig::builder(base("https://api.example.com/v2"))
			.refresh_path("/session/renew")
			.build()
			.expect("Configuration should validate.");

		assert_eq!(config.base_url.as_str(), "https://api.example.com/v2/");
		assert_eq!(config.refresh_path, "session/renew");
	}
}

//! Access/refresh credential pair issued at sign-in and rotated by the refresh coordinator.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Short-lived access token plus the optional longer-lived refresh token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPair {
	/// Token presented on every authenticated request.
	pub access_token: TokenSecret,
	/// Token presented only to the refresh endpoint, if the backend issued one.
	pub refresh_token: Option<TokenSecret>,
}
impl CredentialPair {
	/// Creates a pair without a refresh token.
	pub fn new(access_token: impl Into<TokenSecret>) -> Self {
		Self { access_token: access_token.into(), refresh_token: None }
	}

	/// Attaches a refresh token.
	pub fn with_refresh_token(mut self, refresh_token: impl Into<TokenSecret>) -> Self {
		self.refresh_token = Some(refresh_token.into());

		self
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn pair_uses_camel_case_wire_names() {
		let pair = CredentialPair::new("access-1").with_refresh_token("refresh-1");
		let payload = serde_json::to_value(&pair).expect("Credential pair should serialize.");

		assert_eq!(payload, serde_json::json!({ "accessToken": "access-1", "refreshToken": "refresh-1" }));
	}
}

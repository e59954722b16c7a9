//! Token extraction from refresh endpoint payloads.
//!
//! Backends disagree on where the new tokens live, so extraction walks an explicit priority
//! list of JSON pointers instead of ad hoc conditionals.
// TODO: collapse both lists to a single location once every backend returns `data.accessToken`.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Locations checked for the new access token, in preference order.
pub const ACCESS_TOKEN_POINTERS: [&str; 3] = ["/accessToken", "/token", "/data/accessToken"];
/// Locations checked for a rotated refresh token, in preference order.
pub const REFRESH_TOKEN_POINTERS: [&str; 2] = ["/refreshToken", "/data/refreshToken"];

/// Tokens issued by a successful refresh exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefreshGrant {
	/// New access token.
	pub access_token: TokenSecret,
	/// Rotated refresh token; absent when the backend does not rotate.
	pub refresh_token: Option<TokenSecret>,
}
impl RefreshGrant {
	/// Extracts a grant from a refresh payload, or `None` when it carries no access token.
	pub fn from_payload(payload: &Value) -> Option<Self> {
		let access_token = first_token(payload, &ACCESS_TOKEN_POINTERS)?;
		let refresh_token = first_token(payload, &REFRESH_TOKEN_POINTERS);

		Some(Self { access_token, refresh_token })
	}
}

fn first_token(payload: &Value, pointers: &[&str]) -> Option<TokenSecret> {
	pointers
		.iter()
		.filter_map(|pointer| payload.pointer(pointer).and_then(Value::as_str))
		.find(|token| !token.trim().is_empty())
		.map(TokenSecret::new)
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	fn access(payload: Value) -> Option<String> {
		RefreshGrant::from_payload(&payload).map(|grant| grant.access_token.expose().to_owned())
	}

	#[test]
	fn prefers_top_level_access_token() {
		assert_eq!(
			access(json!({ "accessToken": "a", "token": "b", "data": { "accessToken": "c" } })),
			Some("a".into())
		);
		assert_eq!(access(json!({ "token": "b", "data": { "accessToken": "c" } })), Some("b".into()));
		assert_eq!(access(json!({ "data": { "accessToken": "c" } })), Some("c".into()));
	}

	#[test]
	fn skips_blank_and_non_string_candidates() {
		assert_eq!(access(json!({ "accessToken": "", "token": 42, "data": { "accessToken": "c" } })), Some("c".into()));
		assert_eq!(access(json!({ "success": true })), None);
		assert_eq!(access(Value::Null), None);
	}

	#[test]
	fn refresh_rotation_is_optional() {
		let rotated = RefreshGrant::from_payload(
			&json!({ "data": { "accessToken": "a", "refreshToken": "r2" } }),
		)
		.expect("Nested payload should yield a grant.");
		let kept = RefreshGrant::from_payload(&json!({ "accessToken": "a" }))
			.expect("Bare payload should yield a grant.");

		assert_eq!(rotated.refresh_token, Some(TokenSecret::new("r2")));
		assert_eq!(kept.refresh_token, None);
	}
}

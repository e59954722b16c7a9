//! Caller-facing result shapes.
//!
//! Every call made through [`ApiClient`](crate::client::ApiClient) resolves to a
//! [`ResponseEnvelope`] or fails with an [`ErrorEnvelope`], whatever shape the backend used.

pub mod classify;

pub use classify::*;

// std
use std::borrow::Cow;
// crates.io
use serde::{Serializer, de::DeserializeOwned, ser::SerializeStruct};
// self
use crate::{_prelude::*, http::TransportResponse};

/// Normalized success envelope.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResponseEnvelope {
	/// Backend-reported success flag, or whether the status was 2xx.
	pub success: bool,
	/// HTTP status.
	pub status: u16,
	/// Backend message, when present.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
	/// `data` member of the payload, or the whole payload when it was not wrapped.
	pub data: Value,
	/// Pagination block, when present.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub pagination: Option<Value>,
	/// Aggregate statistics block, when present.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub stats: Option<Value>,
}
impl ResponseEnvelope {
	/// Normalizes a payload received with the given status.
	pub fn from_payload(status: u16, payload: Value) -> Self {
		let success = payload
			.get("success")
			.and_then(Value::as_bool)
			.unwrap_or((200..300).contains(&status));
		let message = payload.get("message").and_then(Value::as_str).map(str::to_owned);
		let pagination = passthrough(&payload, "pagination");
		let stats = passthrough(&payload, "stats");
		let data = match payload {
			Value::Object(mut map) if map.contains_key("data") =>
				map.remove("data").unwrap_or(Value::Null),
			payload => payload,
		};

		Self { success, status, message, data, pagination, stats }
	}

	/// Deserializes [`ResponseEnvelope::data`] into a typed value, reporting the failing path.
	pub fn data_as<T>(&self) -> Result<T, serde_path_to_error::Error<serde_json::Error>>
	where
		T: DeserializeOwned,
	{
		serde_path_to_error::deserialize(&self.data)
	}
}
impl From<TransportResponse> for ResponseEnvelope {
	fn from(response: TransportResponse) -> Self {
		Self::from_payload(response.status.as_u16(), response.payload())
	}
}

/// Normalizes a successful transport response.
pub fn normalize(response: TransportResponse) -> ResponseEnvelope {
	response.into()
}

fn passthrough(payload: &Value, key: &str) -> Option<Value> {
	payload.get(key).filter(|value| !value.is_null()).cloned()
}

/// Closed taxonomy of failure kinds surfaced to callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
	/// No response was received at all.
	NetworkError,
	/// The request exceeded the configured deadline.
	Timeout,
	/// The refresh fallback found no refresh token in the store.
	NoRefreshToken,
	/// Neither refresh attempt produced an access token.
	RefreshNoAccessToken,
	/// The refresh protocol failed and credentials were cleared.
	TokenExpired,
	/// Any other non-2xx response.
	Http(u16),
}
impl ErrorCode {
	/// Returns the stable wire label (`NETWORK_ERROR`, `HTTP_404`, ...).
	pub fn as_str(self) -> Cow<'static, str> {
		match self {
			Self::NetworkError => Cow::Borrowed("NETWORK_ERROR"),
			Self::Timeout => Cow::Borrowed("TIMEOUT"),
			Self::NoRefreshToken => Cow::Borrowed("NO_REFRESH_TOKEN"),
			Self::RefreshNoAccessToken => Cow::Borrowed("REFRESH_NO_ACCESS_TOKEN"),
			Self::TokenExpired => Cow::Borrowed("TOKEN_EXPIRED"),
			Self::Http(status) => Cow::Owned(format!("HTTP_{status}")),
		}
	}
}
impl Display for ErrorCode {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.as_str())
	}
}
impl Serialize for ErrorCode {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.collect_str(self)
	}
}

/// Structured rejection handed to callers; immutable once produced.
#[derive(Clone, Debug, PartialEq, ThisError)]
#[error("{message}")]
pub struct ErrorEnvelope {
	/// HTTP status, when a response was received.
	pub status: Option<u16>,
	/// Human-readable message.
	pub message: String,
	/// Failure kind.
	pub code: ErrorCode,
	/// Field-level validation details from the backend, when present.
	pub errors: Option<Value>,
}
impl ErrorEnvelope {
	/// Creates an envelope without status or details.
	pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
		Self { status: None, message: message.into(), code, errors: None }
	}

	/// Always `false`; present for parity with [`ResponseEnvelope::success`].
	pub fn success(&self) -> bool {
		false
	}
}
impl Serialize for ErrorEnvelope {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let len = 3 + usize::from(self.status.is_some()) + usize::from(self.errors.is_some());
		let mut state = serializer.serialize_struct("ErrorEnvelope", len)?;

		state.serialize_field("success", &false)?;

		if let Some(status) = self.status {
			state.serialize_field("status", &status)?;
		}

		state.serialize_field("message", &self.message)?;
		state.serialize_field("code", &self.code)?;

		if let Some(errors) = &self.errors {
			state.serialize_field("errors", errors)?;
		}

		state.end()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	#[test]
	fn wrapped_payload_unwraps_data_and_message() {
		let envelope =
			ResponseEnvelope::from_payload(200, json!({ "data": { "x": 1 }, "message": "ok" }));

		assert_eq!(
			serde_json::to_value(&envelope).expect("Envelope should serialize."),
			json!({ "success": true, "status": 200, "data": { "x": 1 }, "message": "ok" })
		);
	}

	#[test]
	fn bare_payload_becomes_data() {
		let envelope = ResponseEnvelope::from_payload(200, json!({ "x": 1 }));

		assert_eq!(
			serde_json::to_value(&envelope).expect("Envelope should serialize."),
			json!({ "success": true, "status": 200, "data": { "x": 1 } })
		);
	}

	#[test]
	fn backend_success_flag_and_list_metadata_pass_through() {
		let envelope = ResponseEnvelope::from_payload(
			200,
			json!({
				"success": false,
				"data": [],
				"pagination": { "page": 2, "total": 40 },
				"stats": { "open": 3 },
			}),
		);

		assert!(!envelope.success);
		assert_eq!(envelope.data, json!([]));
		assert_eq!(envelope.pagination, Some(json!({ "page": 2, "total": 40 })));
		assert_eq!(envelope.stats, Some(json!({ "open": 3 })));
		assert_eq!(envelope.message, None);
	}

	#[test]
	fn data_as_reports_failing_path() {
		#[derive(Debug, Deserialize)]
		#[allow(dead_code)]
		struct Complaint {
			id: u64,
			title: String,
		}

		let envelope =
			ResponseEnvelope::from_payload(200, json!({ "data": { "id": 9, "title": 4 } }));
		let err = envelope.data_as::<Complaint>().expect_err("Mismatched title should fail.");

		assert_eq!(err.path().to_string(), "title");
	}

	#[test]
	fn error_codes_render_wire_labels() {
		assert_eq!(ErrorCode::Http(503).to_string(), "HTTP_503");
		assert_eq!(ErrorCode::TokenExpired.to_string(), "TOKEN_EXPIRED");
		assert_eq!(
			serde_json::to_value(ErrorCode::RefreshNoAccessToken)
				.expect("Error code should serialize."),
			json!("REFRESH_NO_ACCESS_TOKEN")
		);
	}

	#[test]
	fn error_envelope_serializes_with_success_false() {
		let envelope = ErrorEnvelope::new(ErrorCode::TokenExpired, "Session expired.");

		assert!(!envelope.success());
		assert_eq!(envelope.to_string(), "Session expired.");
		assert_eq!(
			serde_json::to_value(&envelope).expect("Error envelope should serialize."),
			json!({ "success": false, "message": "Session expired.", "code": "TOKEN_EXPIRED" })
		);
	}
}

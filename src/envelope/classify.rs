//! Maps transport failures and non-2xx responses into [`ErrorEnvelope`]s.

// self
use crate::{
	_prelude::*,
	envelope::{ErrorCode, ErrorEnvelope},
	http::{TransportFailure, TransportResponse},
};

const NETWORK_MESSAGE: &str = "Unable to reach the server. Please check your connection.";
const TIMEOUT_MESSAGE: &str = "The request timed out. Please try again.";

/// Classifies a request that never produced a response.
pub fn classify_failure(failure: &TransportFailure) -> ErrorEnvelope {
	match failure {
		TransportFailure::Timeout => ErrorEnvelope::new(ErrorCode::Timeout, TIMEOUT_MESSAGE),
		TransportFailure::Network { .. } | TransportFailure::Build { .. } =>
			ErrorEnvelope::new(ErrorCode::NetworkError, NETWORK_MESSAGE),
	}
}

/// Classifies a received non-2xx response as `HTTP_<status>`.
///
/// The backend's `message` (or `error`) string wins over the per-status fallback, and any
/// `errors` block is carried through for form-level display.
pub fn classify_response(response: &TransportResponse) -> ErrorEnvelope {
	let status = response.status.as_u16();
	let payload = response.payload();
	let message = backend_message(&payload).unwrap_or_else(|| fallback_message(status).into_owned());
	let errors = payload.get("errors").filter(|value| !value.is_null()).cloned();

	ErrorEnvelope { status: Some(status), message, code: ErrorCode::Http(status), errors }
}

/// Envelope handed to every caller whose request failed because the refresh protocol gave up.
pub fn session_expired(message: impl Into<String>) -> ErrorEnvelope {
	ErrorEnvelope::new(ErrorCode::TokenExpired, message)
}

fn backend_message(payload: &Value) -> Option<String> {
	["message", "error"]
		.iter()
		.filter_map(|key| payload.get(key).and_then(Value::as_str))
		.map(str::trim)
		.find(|message| !message.is_empty())
		.map(str::to_owned)
}

fn fallback_message(status: u16) -> std::borrow::Cow<'static, str> {
	let message = match status {
		400 => "The request was invalid.",
		401 => "Authentication is required.",
		403 => "You do not have permission to perform this action.",
		404 => "The requested resource was not found.",
		409 => "The request conflicts with the current state of the resource.",
		422 => "The submitted data failed validation.",
		429 => "Too many requests. Please slow down.",
		500 => "The server encountered an internal error.",
		502..=504 => "The service is temporarily unavailable.",
		_ => return format!("Request failed with status {status}.").into(),
	};

	message.into()
}

#[cfg(test)]
mod tests {
	// crates.io
	use http::StatusCode;
	use serde_json::json;
	// self
	use super::*;

	#[test]
	fn missing_response_is_a_network_error() {
		let failure = TransportFailure::network(std::io::Error::new(
			std::io::ErrorKind::ConnectionRefused,
			"connection refused",
		));
		let envelope = classify_failure(&failure);

		assert_eq!(envelope.code, ErrorCode::NetworkError);
		assert_eq!(envelope.status, None);
	}

	#[test]
	fn deadline_is_a_timeout() {
		assert_eq!(classify_failure(&TransportFailure::Timeout).code, ErrorCode::Timeout);
	}

	#[test]
	fn server_error_keeps_backend_message() {
		let response = TransportResponse::json(
			StatusCode::INTERNAL_SERVER_ERROR,
			&json!({ "message": "boom" }),
		);
		let envelope = classify_response(&response);

		assert_eq!(envelope.code, ErrorCode::Http(500));
		assert_eq!(envelope.code.to_string(), "HTTP_500");
		assert_eq!(envelope.message, "boom");
		assert_eq!(envelope.status, Some(500));
	}

	#[test]
	fn validation_errors_pass_through() {
		let response = TransportResponse::json(
			StatusCode::UNPROCESSABLE_ENTITY,
			&json!({ "error": "Invalid complaint", "errors": { "title": ["required"] } }),
		);
		let envelope = classify_response(&response);

		assert_eq!(envelope.message, "Invalid complaint");
		assert_eq!(envelope.errors, Some(json!({ "title": ["required"] })));
	}

	#[test]
	fn falls_back_to_per_status_messages() {
		let not_found = classify_response(&TransportResponse::new(StatusCode::NOT_FOUND, ""));
		let teapot = classify_response(&TransportResponse::new(StatusCode::IM_A_TEAPOT, "   "));
		let blank = classify_response(&TransportResponse::json(
			StatusCode::FORBIDDEN,
			&json!({ "message": "" }),
		));

		assert_eq!(not_found.message, "The requested resource was not found.");
		assert_eq!(teapot.message, "Request failed with status 418.");
		assert_eq!(blank.message, "You do not have permission to perform this action.");
	}

	#[test]
	fn session_expired_has_no_status() {
		let envelope = session_expired("Session expired. Please log in again.");

		assert_eq!(envelope.code, ErrorCode::TokenExpired);
		assert_eq!(envelope.status, None);
	}
}

//! Request decoration applied before every send, replays included.

// crates.io
use http::header::CONTENT_TYPE;
// self
use crate::{http::ApiRequest, obs::event, store::TokenStore};

/// Attaches the stored access token and clears explicit multipart content types.
///
/// Never fails: without a token the request goes out unauthenticated and the backend rejects
/// it uniformly. A multipart body loses any explicit `content-type` so the transport can
/// write its own boundary.
pub fn decorate(request: &mut ApiRequest, store: &dyn TokenStore) {
	let attached = store.access_token().map(|token| request.set_bearer(&token));

	if attached == Some(false) {
		event!(
			warn,
			request = %request.describe(),
			"Stored access token cannot form a header; sending unauthenticated."
		);
	}
	if request.body.is_multipart() {
		request.headers.remove(CONTENT_TYPE);
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use http::{HeaderValue, Method, header::AUTHORIZATION};
	use url::Url;
	// self
	use super::*;
	use crate::{
		auth::TokenSecret,
		http::{MultipartForm, RequestBody},
		store::MemoryStore,
	};

	fn request() -> ApiRequest {
		ApiRequest::new(
			Method::POST,
			Url::parse("https://api.example.com/complaints").expect("Fixture URL should parse."),
		)
		.with_header(CONTENT_TYPE, HeaderValue::from_static("multipart/form-data"))
	}

	#[test]
	fn attaches_bearer_token() {
		let store = MemoryStore::default();

		store.set_access_token(TokenSecret::new("access-1")).expect("Seeding should succeed.");

		let mut request = request();

		decorate(&mut request, &store);

		assert_eq!(
			request.headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok()),
			Some("Bearer access-1")
		);
		assert!(request.headers.contains_key(CONTENT_TYPE));
	}

	#[test]
	fn leaves_request_unauthenticated_without_token() {
		let mut request = request();

		decorate(&mut request, &MemoryStore::default());

		assert!(!request.headers.contains_key(AUTHORIZATION));
	}

	#[test]
	fn strips_content_type_for_multipart_bodies() {
		let mut request = request()
			.with_body(RequestBody::Multipart(MultipartForm::new().text("title", "Leak")));

		decorate(&mut request, &MemoryStore::default());

		assert!(!request.headers.contains_key(CONTENT_TYPE));
	}
}

//! Transport primitives: captured requests, raw responses, and the transport contract.
//!
//! [`ApiRequest`] is the descriptor the pipeline owns from decoration through replay. It keeps
//! its body in a re-sendable form (JSON value, bytes, or a [`MultipartForm`] description) so a
//! request that failed with an expired token can be resubmitted as-is after the refresh
//! coordinator patches its `Authorization` header.
//!
//! [`HttpTransport`] is the crate's only dependency on an HTTP stack. Implementations must
//! report whether a response arrived at all: a received response of any status is `Ok`, while
//! [`TransportFailure`] is reserved for requests that never produced one.

// crates.io
use http::{
	HeaderMap, HeaderValue, Method, StatusCode,
	header::{AUTHORIZATION, CONTENT_TYPE},
};
// self
use crate::{_prelude::*, auth::TokenSecret, error::BoxError};

/// Boxed future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<TransportResponse, TransportFailure>> + 'a + Send>>;

/// Abstraction over HTTP stacks able to execute captured [`ApiRequest`]s.
///
/// Implementations must be `Send + Sync + 'static` so a single transport can be shared by the
/// client and its refresh coordinator, and the futures they return must be `Send`.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends the request exactly as captured, enforcing the transport's deadline.
	fn send<'a>(&'a self, request: &'a ApiRequest) -> TransportFuture<'a>;
}

/// Outgoing request captured by the pipeline.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Fully-qualified target URL.
	pub url: Url,
	/// Request headers; `Authorization` is managed by the decorator.
	pub headers: HeaderMap,
	/// Re-sendable request body.
	pub body: RequestBody,
	retried: bool,
}
impl ApiRequest {
	/// Creates a request with no headers and an empty body.
	pub fn new(method: Method, url: Url) -> Self {
		Self { method, url, headers: HeaderMap::new(), body: RequestBody::Empty, retried: false }
	}

	/// Appends query pairs to the URL.
	pub fn with_query<I, K, V>(mut self, pairs: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: AsRef<str>,
		V: AsRef<str>,
	{
		self.url.query_pairs_mut().extend_pairs(pairs);

		self
	}

	/// Inserts a header, replacing any previous value.
	pub fn with_header(mut self, name: http::HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Replaces the body.
	pub fn with_body(mut self, body: RequestBody) -> Self {
		self.body = body;

		self
	}

	/// Sets `Authorization: Bearer <token>`.
	///
	/// Returns `false` and leaves the headers untouched when the token cannot form a header.
	pub fn set_bearer(&mut self, token: &TokenSecret) -> bool {
		match token.bearer() {
			Some(value) => {
				self.headers.insert(AUTHORIZATION, value);

				true
			},
			None => false,
		}
	}

	/// Whether this request has already been replayed after a token refresh.
	pub fn is_retried(&self) -> bool {
		self.retried
	}

	/// Marks the request as replayed; a later 401 is then final.
	pub fn mark_retried(&mut self) {
		self.retried = true;
	}

	/// Path and method label used in logs; never includes the query string.
	pub(crate) fn describe(&self) -> String {
		format!("{} {}", self.method, self.url.path())
	}
}

/// Re-sendable request body.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum RequestBody {
	/// No body.
	#[default]
	Empty,
	/// JSON document; sent with `content-type: application/json` unless overridden.
	Json(Value),
	/// Raw bytes with an optional content type.
	Bytes {
		/// Content type header value.
		content_type: Option<String>,
		/// Payload bytes.
		bytes: Vec<u8>,
	},
	/// Multipart form; the transport computes the boundary.
	Multipart(MultipartForm),
}
impl RequestBody {
	/// Whether the body is a multipart form.
	pub fn is_multipart(&self) -> bool {
		matches!(self, Self::Multipart(_))
	}
}

/// Multipart form description that can be rebuilt for every send.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MultipartForm {
	/// Form parts in submission order.
	pub parts: Vec<MultipartPart>,
}
impl MultipartForm {
	/// Creates an empty form.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a text field.
	pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.parts.push(MultipartPart { name: name.into(), value: PartValue::Text(value.into()) });

		self
	}

	/// Adds a file field.
	pub fn file(
		mut self,
		name: impl Into<String>,
		file_name: impl Into<String>,
		mime: Option<&str>,
		bytes: impl Into<Vec<u8>>,
	) -> Self {
		self.parts.push(MultipartPart {
			name: name.into(),
			value: PartValue::File {
				file_name: file_name.into(),
				mime: mime.map(str::to_owned),
				bytes: bytes.into(),
			},
		});

		self
	}

	#[cfg(feature = "reqwest")]
	fn to_reqwest(&self) -> Result<reqwest::multipart::Form, ReqwestError> {
		use reqwest::multipart::{Form, Part};

		let mut form = Form::new();

		for part in &self.parts {
			form = match &part.value {
				PartValue::Text(text) => form.text(part.name.clone(), text.clone()),
				PartValue::File { file_name, mime, bytes } => {
					let mut file = Part::bytes(bytes.clone()).file_name(file_name.clone());

					if let Some(mime) = mime {
						file = file.mime_str(mime)?;
					}

					form.part(part.name.clone(), file)
				},
			};
		}

		Ok(form)
	}
}

/// Single named multipart field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultipartPart {
	/// Field name.
	pub name: String,
	/// Field value.
	pub value: PartValue,
}

/// Multipart field value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PartValue {
	/// Plain text field.
	Text(String),
	/// File upload.
	File {
		/// Reported file name.
		file_name: String,
		/// Optional MIME type.
		mime: Option<String>,
		/// File contents.
		bytes: Vec<u8>,
	},
}

/// Response received from the backend, whatever its status.
#[derive(Clone, Debug)]
pub struct TransportResponse {
	/// HTTP status.
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
	/// Raw body bytes.
	pub body: Vec<u8>,
}
impl TransportResponse {
	/// Creates a response with no headers.
	pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
		Self { status, headers: HeaderMap::new(), body: body.into() }
	}

	/// Creates a JSON response with no headers.
	pub fn json(status: StatusCode, payload: &Value) -> Self {
		Self::new(status, payload.to_string())
	}

	/// Interprets the body as a JSON payload.
	///
	/// An empty body reads as `null`; a body that is not JSON reads as a string.
	pub fn payload(&self) -> Value {
		if self.body.iter().all(u8::is_ascii_whitespace) {
			return Value::Null;
		}

		serde_json::from_slice(&self.body)
			.unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&self.body).into_owned()))
	}
}

/// Failures where no response was received.
#[derive(Debug, ThisError)]
pub enum TransportFailure {
	/// The request exceeded the configured deadline.
	#[error("Request exceeded the configured deadline.")]
	Timeout,
	/// The server could not be reached (DNS, TCP, TLS, or a broken body stream).
	#[error("No response was received from the server.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The request could not be assembled, so it was never sent.
	#[error("Request could not be built.")]
	Build {
		/// Transport-specific builder error.
		#[source]
		source: BoxError,
	},
}
impl TransportFailure {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Wraps a transport-specific builder error.
	pub fn build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Build { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportFailure {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() {
			Self::Timeout
		} else if e.is_builder() {
			Self::build(e)
		} else {
			Self::network(e)
		}
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// [`ReqwestTransport::from_config`] is the only constructor that follows the client
/// configuration (deadline and cookie store). A client wrapped with
/// [`ReqwestTransport::with_client`] keeps its own settings, so it must enable cookies itself
/// for the cookie refresh attempt to carry anything.
#[cfg(feature = "reqwest")]
#[derive(Clone)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client that enforces the configured deadline and, when credentials are enabled,
	/// keeps cookies so the refresh cookie travels with the refresh exchange.
	pub fn from_config(config: &crate::config::ClientConfig) -> Result<Self> {
		let client = ReqwestClient::builder()
			.timeout(config.timeout.unsigned_abs())
			.cookie_store(config.with_credentials)
			.build()
			.map_err(crate::error::ConfigError::from)?;

		Ok(Self(client))
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Debug for ReqwestTransport {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("ReqwestTransport(..)")
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn send<'a>(&'a self, request: &'a ApiRequest) -> TransportFuture<'a> {
		Box::pin(async move {
			let mut builder = self
				.0
				.request(request.method.clone(), request.url.clone())
				.headers(request.headers.clone());

			builder = match &request.body {
				RequestBody::Empty => builder,
				RequestBody::Json(value) => {
					let bytes = serde_json::to_vec(value).map_err(TransportFailure::build)?;

					if !request.headers.contains_key(CONTENT_TYPE) {
						builder = builder
							.header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
					}

					builder.body(bytes)
				},
				RequestBody::Bytes { content_type, bytes } => {
					match content_type {
						Some(content_type) if !request.headers.contains_key(CONTENT_TYPE) => {
							builder = builder.header(CONTENT_TYPE, content_type.as_str());
						},
						_ => {},
					}

					builder.body(bytes.clone())
				},
				RequestBody::Multipart(form) =>
					builder.multipart(form.to_reqwest().map_err(TransportFailure::build)?),
			};

			let response = builder.send().await?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let body = response.bytes().await?.to_vec();

			Ok(TransportResponse { status, headers, body })
		})
	}
}

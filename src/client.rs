//! The request pipeline.
//!
//! Every call is decorated with the stored access token and sent. Then one of three things
//! happens:
//!
//! - A 2xx response is normalized into a [`ResponseEnvelope`].
//! - A first 401 goes through the [`RefreshCoordinator`], and the same captured request is
//!   replayed through the whole pipeline.
//! - Anything else is classified into an [`ErrorEnvelope`].
//!
//! A replayed request that is rejected again is final.

// crates.io
use http::{Method, StatusCode};
// self
use crate::{
	_prelude::*,
	auth::CredentialPair,
	config::ClientConfig,
	envelope::{
		ErrorEnvelope, ResponseEnvelope, classify_failure, classify_response, normalize,
		session_expired,
	},
	http::{ApiRequest, HttpTransport, MultipartForm, RequestBody, TransportFailure},
	interceptor,
	obs::{self, Stage, StageOutcome, StageSpan, event},
	refresh::{RefreshCoordinator, RefreshMetrics},
	session::SessionSignal,
	store::TokenStore,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestApiClient = ApiClient<ReqwestTransport>;

/// REST client that renews expired sessions transparently.
///
/// The client owns its transport, token store, session signal, and refresh coordinator, so
/// two clients never share refresh state. Clones share all of them.
pub struct ApiClient<T>
where
	T: HttpTransport,
{
	/// Transport used for every request, refresh exchanges included.
	pub transport: Arc<T>,
	/// Store holding the current credential pair.
	pub store: Arc<dyn TokenStore>,
	/// Validated client configuration.
	pub config: ClientConfig,
	session: Arc<SessionSignal>,
	refresh: Arc<RefreshCoordinator>,
}
impl<T> ApiClient<T>
where
	T: HttpTransport,
{
	/// Creates a client around a caller-provided transport.
	pub fn with_transport(
		config: ClientConfig,
		store: Arc<dyn TokenStore>,
		transport: impl Into<Arc<T>>,
	) -> Result<Self> {
		let session = Arc::new(SessionSignal::default());
		let refresh = Arc::new(RefreshCoordinator::new(
			store.clone(),
			config.refresh_url()?,
			session.clone(),
		));

		Ok(Self { transport: transport.into(), store, config, session, refresh })
	}

	/// Session signal that fires when renewal fails and credentials are cleared.
	pub fn session(&self) -> &SessionSignal {
		&self.session
	}

	/// Refresh coordinator owned by this client.
	pub fn refresh(&self) -> &RefreshCoordinator {
		&self.refresh
	}

	/// Refresh exchange counters.
	pub fn refresh_metrics(&self) -> &RefreshMetrics {
		self.refresh.metrics()
	}

	/// Stores the credentials (and optional user identity) returned by a login, replacing any
	/// previous session.
	pub fn sign_in(&self, pair: CredentialPair, user: Option<Value>) -> Result<()> {
		self.store.clear_all()?;
		self.store.set_credentials(pair)?;

		if let Some(user) = user {
			self.store.set_user(user)?;
		}

		Ok(())
	}

	/// Clears both tokens and the cached user identity.
	pub fn logout(&self) -> Result<()> {
		self.store.clear_all()?;

		Ok(())
	}

	/// Builds a request for a path relative to the configured base URL.
	pub fn request(&self, method: Method, path: &str) -> Result<ApiRequest> {
		Ok(ApiRequest::new(method, self.config.resolve(path)?))
	}

	/// Sends a request through the full pipeline.
	pub async fn send(&self, request: ApiRequest) -> Result<ResponseEnvelope, ErrorEnvelope> {
		let span = StageSpan::new(Stage::Dispatch, &request.describe());

		obs::record_stage_outcome(Stage::Dispatch, StageOutcome::Attempt);

		let result = span.instrument(self.dispatch(request)).await;

		obs::record_stage_outcome(Stage::Dispatch, StageOutcome::of(&result));

		result
	}

	/// `GET path`.
	pub async fn get(&self, path: &str) -> Result<ResponseEnvelope, ErrorEnvelope> {
		self.call(Method::GET, path, Ok(RequestBody::Empty)).await
	}

	/// `POST path` with a JSON body.
	pub async fn post<B>(&self, path: &str, body: &B) -> Result<ResponseEnvelope, ErrorEnvelope>
	where
		B: ?Sized + Serialize,
	{
		self.call(Method::POST, path, json_body(body)).await
	}

	/// `PUT path` with a JSON body.
	pub async fn put<B>(&self, path: &str, body: &B) -> Result<ResponseEnvelope, ErrorEnvelope>
	where
		B: ?Sized + Serialize,
	{
		self.call(Method::PUT, path, json_body(body)).await
	}

	/// `PATCH path` with a JSON body.
	pub async fn patch<B>(&self, path: &str, body: &B) -> Result<ResponseEnvelope, ErrorEnvelope>
	where
		B: ?Sized + Serialize,
	{
		self.call(Method::PATCH, path, json_body(body)).await
	}

	/// `DELETE path`.
	pub async fn delete(&self, path: &str) -> Result<ResponseEnvelope, ErrorEnvelope> {
		self.call(Method::DELETE, path, Ok(RequestBody::Empty)).await
	}

	/// `POST path` with a multipart form.
	pub async fn upload(
		&self,
		path: &str,
		form: MultipartForm,
	) -> Result<ResponseEnvelope, ErrorEnvelope> {
		self.call(Method::POST, path, Ok(RequestBody::Multipart(form))).await
	}

	async fn call(
		&self,
		method: Method,
		path: &str,
		body: Result<RequestBody, ErrorEnvelope>,
	) -> Result<ResponseEnvelope, ErrorEnvelope> {
		let request = self.request(method, path).map_err(unsendable)?.with_body(body?);

		self.send(request).await
	}

	async fn dispatch(&self, mut request: ApiRequest) -> Result<ResponseEnvelope, ErrorEnvelope> {
		loop {
			interceptor::decorate(&mut request, self.store.as_ref());

			let response = match self.transport.send(&request).await {
				Ok(response) => response,
				Err(failure) => {
					event!(debug, error = %failure, "Request received no response.");

					return Err(classify_failure(&failure));
				},
			};

			if response.status.is_success() {
				return Ok(normalize(response));
			}
			if response.status != StatusCode::UNAUTHORIZED {
				return Err(classify_response(&response));
			}
			if request.is_retried() {
				event!(warn, "Replayed request was rejected again; not refreshing twice.");

				return Err(classify_response(&response));
			}

			request.mark_retried();

			match self.refresh.acquire(self.transport.as_ref()).await {
				Ok(token) => {
					request.set_bearer(&token);
					event!(debug, "Replaying request with the renewed access token.");
				},
				Err(_) => return Err(session_expired(self.config.session_expired_message.clone())),
			}
		}
	}
}
#[cfg(feature = "reqwest")]
impl ApiClient<ReqwestTransport> {
	/// Creates a client whose reqwest transport follows the configured deadline and cookie mode.
	pub fn new(config: ClientConfig, store: Arc<dyn TokenStore>) -> Result<Self> {
		let transport = ReqwestTransport::from_config(&config)?;

		Self::with_transport(config, store, transport)
	}
}
impl<T> Clone for ApiClient<T>
where
	T: HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			store: self.store.clone(),
			config: self.config.clone(),
			session: self.session.clone(),
			refresh: self.refresh.clone(),
		}
	}
}
impl<T> Debug for ApiClient<T>
where
	T: HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("base_url", &self.config.base_url.as_str())
			.field("refresh", &self.refresh)
			.finish()
	}
}

fn json_body<B>(body: &B) -> Result<RequestBody, ErrorEnvelope>
where
	B: ?Sized + Serialize,
{
	serde_json::to_value(body).map(RequestBody::Json).map_err(unsendable)
}

fn unsendable(err: impl 'static + Send + Sync + std::error::Error) -> ErrorEnvelope {
	classify_failure(&TransportFailure::build(err))
}

#[cfg(test)]
mod tests {
	// std
	use std::collections::BTreeMap;
	// self
	use super::*;
	use crate::envelope::ErrorCode;

	#[test]
	fn unserializable_body_never_reaches_the_transport() {
		let body = BTreeMap::from([((1, 2), "tuple keys cannot become JSON object keys")]);
		let err = json_body(&body).expect_err("Tuple keys should fail to serialize.");

		assert_eq!(err.code, ErrorCode::NetworkError);
		assert_eq!(err.status, None);
	}
}

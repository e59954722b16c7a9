//! Single-flight token renewal.
//!
//! [`RefreshCoordinator`] is either idle or refreshing. The first caller that needs a new access
//! token while idle becomes the leader and runs the shared exchange; every caller arriving
//! while the exchange is in flight queues a waiter instead of starting a second one. Settling
//! swaps the state back to idle and drains the queue in one locked step, then hands every
//! waiter a clone of the same outcome.
//!
//! The exchange tries the refresh endpoint twice:
//!
//! 1. With an empty body, relying on the refresh cookie carried by the transport.
//! 2. With the stored refresh token, sent both as a `{ "refreshToken": .. }` body and as a bearer
//!    credential. Without a stored refresh token this attempt is skipped and the exchange fails
//!    with [`RefreshError::NoRefreshToken`].
//!
//! A failed exchange clears the store and emits [`SessionEvent::Expired`] once.

mod grant;
mod metrics;

pub use grant::*;
pub use metrics::RefreshMetrics;

// std
use std::mem;
// crates.io
use futures::channel::oneshot;
use http::Method;
use serde_json::json;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	envelope::ErrorCode,
	http::{ApiRequest, HttpTransport, RequestBody},
	obs::{self, Stage, StageOutcome, StageSpan, event},
	session::{SessionEvent, SessionSignal},
	store::{StoreError, TokenStore},
};

/// Outcome broadcast to the leader and every waiter of one refresh exchange.
pub type RefreshOutcome = Result<TokenSecret, RefreshError>;

type Waiter = oneshot::Sender<RefreshOutcome>;

/// Reasons a shared refresh exchange failed.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum RefreshError {
	/// The cookie attempt failed and the store holds no refresh token.
	#[error("No refresh token is available.")]
	NoRefreshToken,
	/// Neither attempt produced an access token.
	#[error("Refresh endpoint did not return an access token.")]
	NoAccessToken,
	/// The renewed credentials could not be persisted.
	#[error("Refreshed credentials could not be stored: {message}")]
	Store {
		/// Store failure description.
		message: String,
	},
}
impl RefreshError {
	/// Failure kind reported for this error.
	pub fn code(&self) -> ErrorCode {
		match self {
			Self::NoRefreshToken => ErrorCode::NoRefreshToken,
			Self::NoAccessToken | Self::Store { .. } => ErrorCode::RefreshNoAccessToken,
		}
	}
}
impl From<StoreError> for RefreshError {
	fn from(e: StoreError) -> Self {
		Self::Store { message: e.to_string() }
	}
}

enum RefreshState {
	Idle,
	Refreshing { waiters: Vec<Waiter> },
}

/// Serializes token renewal for one client instance.
pub struct RefreshCoordinator {
	store: Arc<dyn TokenStore>,
	endpoint: Url,
	signal: Arc<SessionSignal>,
	metrics: RefreshMetrics,
	state: Mutex<RefreshState>,
}
impl RefreshCoordinator {
	/// Creates an idle coordinator refreshing against `endpoint`.
	pub fn new(store: Arc<dyn TokenStore>, endpoint: Url, signal: Arc<SessionSignal>) -> Self {
		Self {
			store,
			endpoint,
			signal,
			metrics: RefreshMetrics::default(),
			state: Mutex::new(RefreshState::Idle),
		}
	}

	/// Exchange counters.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.metrics
	}

	/// Whether an exchange is currently in flight.
	pub fn is_refreshing(&self) -> bool {
		matches!(*self.state.lock(), RefreshState::Refreshing { .. })
	}

	/// Number of callers currently queued behind the in-flight exchange.
	pub fn queued_waiters(&self) -> usize {
		match &*self.state.lock() {
			RefreshState::Idle => 0,
			RefreshState::Refreshing { waiters } => waiters.len(),
		}
	}

	/// Returns a fresh access token, running the shared exchange or joining the one in flight.
	///
	/// Every caller that joins a given exchange observes the same outcome. On success the new
	/// tokens are already persisted when this returns; on failure the store is already cleared.
	pub async fn acquire(&self, transport: &dyn HttpTransport) -> RefreshOutcome {
		loop {
			let waiter = {
				let mut state = self.state.lock();

				if let RefreshState::Refreshing { waiters } = &mut *state {
					let (tx, rx) = oneshot::channel();

					waiters.push(tx);

					Some(rx)
				} else {
					*state = RefreshState::Refreshing { waiters: Vec::new() };

					None
				}
			};
			let Some(waiter) = waiter else {
				return self.lead(transport).await;
			};

			self.metrics.record_join();
			event!(debug, "Joined the in-flight token refresh.");

			match waiter.await {
				Ok(outcome) => return outcome,
				Err(oneshot::Canceled) => {
					event!(debug, "Token refresh was abandoned by its leader; starting over.");
				},
			}
		}
	}

	async fn lead(&self, transport: &dyn HttpTransport) -> RefreshOutcome {
		let mut leader = LeaderGuard { state: &self.state, armed: true };
		let span = StageSpan::new(Stage::Refresh, self.endpoint.path());

		self.metrics.record_attempt();
		event!(debug, endpoint = self.endpoint.path(), "Leading a token refresh.");
		obs::record_stage_outcome(Stage::Refresh, StageOutcome::Attempt);

		let outcome = span
			.instrument(async {
				let grant = self.exchange(transport).await?;

				self.persist(grant)
			})
			.await;

		match &outcome {
			Ok(_) => {
				self.metrics.record_success();
				event!(info, "Access token refreshed.");
			},
			Err(err) => {
				self.metrics.record_failure();
				event!(warn, code = %err.code(), error = %err, "Token refresh failed; clearing credentials.");
				#[cfg(not(feature = "tracing"))]
				let _ = err;

				if let Err(err) = self.store.clear_all() {
					event!(error, error = %err, "Failed to clear stored credentials.");
					#[cfg(not(feature = "tracing"))]
					let _ = err;
				}
			},
		}

		obs::record_stage_outcome(Stage::Refresh, StageOutcome::of(&outcome));

		let waiters = leader.settle();

		event!(debug, waiters = waiters.len(), "Releasing queued refresh waiters.");

		for waiter in waiters {
			let _ = waiter.send(outcome.clone());
		}

		if outcome.is_err() {
			self.signal.emit(SessionEvent::Expired);
		}

		outcome
	}

	async fn exchange(&self, transport: &dyn HttpTransport) -> Result<RefreshGrant, RefreshError> {
		let cookie = ApiRequest::new(Method::POST, self.endpoint.clone());

		if let Some(grant) = self.attempt(transport, &cookie, "cookie").await {
			return Ok(grant);
		}

		event!(debug, "Cookie refresh yielded no access token; falling back to the stored refresh token.");

		let Some(refresh_token) = self.store.refresh_token() else {
			event!(warn, "Cookie refresh failed and no refresh token is stored.");

			return Err(RefreshError::NoRefreshToken);
		};
		let mut explicit = ApiRequest::new(Method::POST, self.endpoint.clone())
			.with_body(RequestBody::Json(json!({ "refreshToken": refresh_token.expose() })));

		explicit.set_bearer(&refresh_token);

		self.attempt(transport, &explicit, "explicit").await.ok_or(RefreshError::NoAccessToken)
	}

	async fn attempt(
		&self,
		transport: &dyn HttpTransport,
		request: &ApiRequest,
		mode: &'static str,
	) -> Option<RefreshGrant> {
		#[cfg(not(feature = "tracing"))]
		let _ = mode;

		match transport.send(request).await {
			Ok(response) if response.status.is_success() => {
				let grant = RefreshGrant::from_payload(&response.payload());

				if grant.is_none() {
					event!(debug, mode, "Refresh response carried no access token.");
				}

				grant
			},
			Ok(response) => {
				event!(debug, mode, status = response.status.as_u16(), "Refresh attempt was rejected.");
				#[cfg(not(feature = "tracing"))]
				let _ = response;

				None
			},
			Err(failure) => {
				event!(debug, mode, error = %failure, "Refresh attempt received no response.");
				#[cfg(not(feature = "tracing"))]
				let _ = failure;

				None
			},
		}
	}

	fn persist(&self, grant: RefreshGrant) -> RefreshOutcome {
		let RefreshGrant { access_token, refresh_token } = grant;

		self.store.set_access_token(access_token.clone())?;

		if let Some(refresh_token) = refresh_token {
			self.store.set_refresh_token(refresh_token)?;
		}

		Ok(access_token)
	}
}
impl Debug for RefreshCoordinator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshCoordinator")
			.field("endpoint", &self.endpoint.as_str())
			.field("refreshing", &self.is_refreshing())
			.field("metrics", &self.metrics)
			.finish()
	}
}

/// Returns the coordinator to idle even if the leader's future is dropped mid-exchange.
///
/// Dropping an armed guard also drops every queued sender, so waiters wake with
/// [`oneshot::Canceled`] and compete to lead a fresh exchange.
struct LeaderGuard<'a> {
	state: &'a Mutex<RefreshState>,
	armed: bool,
}
impl LeaderGuard<'_> {
	fn settle(&mut self) -> Vec<Waiter> {
		self.armed = false;

		take_waiters(&mut self.state.lock())
	}
}
impl Drop for LeaderGuard<'_> {
	fn drop(&mut self) {
		if self.armed {
			let abandoned = take_waiters(&mut self.state.lock());

			event!(warn, waiters = abandoned.len(), "Token refresh leader dropped mid-exchange.");
			drop(abandoned);
		}
	}
}

fn take_waiters(state: &mut RefreshState) -> Vec<Waiter> {
	match mem::replace(state, RefreshState::Idle) {
		RefreshState::Idle => Vec::new(),
		RefreshState::Refreshing { waiters } => waiters,
	}
}

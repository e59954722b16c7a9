//! Token store contract and built-in store implementations.
//!
//! A store is a synchronous key/value accessor for the current [`CredentialPair`] and the cached
//! user identity. Only the refresh coordinator, sign-in, and logout mutate it; the request
//! decorator reads it on every call.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, TokenSecret},
};

/// Storage backend contract implemented by token stores.
///
/// Getters never fail; a missing value reads as `None`. Setters report persistence failures so
/// durable backends can surface them.
pub trait TokenStore
where
	Self: Send + Sync,
{
	/// Returns the current access token, if any.
	fn access_token(&self) -> Option<TokenSecret>;

	/// Replaces the access token.
	fn set_access_token(&self, token: TokenSecret) -> Result<(), StoreError>;

	/// Returns the current refresh token, if any.
	fn refresh_token(&self) -> Option<TokenSecret>;

	/// Replaces the refresh token.
	fn set_refresh_token(&self, token: TokenSecret) -> Result<(), StoreError>;

	/// Returns the cached user identity, if any.
	fn user(&self) -> Option<Value>;

	/// Replaces the cached user identity.
	fn set_user(&self, user: Value) -> Result<(), StoreError>;

	/// Clears both tokens and the cached user identity.
	fn clear_all(&self) -> Result<(), StoreError>;

	/// Persists a freshly issued pair, keeping the stored refresh token when the pair has none.
	fn set_credentials(&self, pair: CredentialPair) -> Result<(), StoreError> {
		self.set_access_token(pair.access_token)?;

		if let Some(refresh) = pair.refresh_token {
			self.set_refresh_token(refresh)?;
		}

		Ok(())
	}
}

/// Serializable snapshot shared by the built-in stores.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
	/// Current access token.
	pub access_token: Option<TokenSecret>,
	/// Current refresh token.
	pub refresh_token: Option<TokenSecret>,
	/// Cached user identity returned at sign-in.
	pub user: Option<Value>,
}
impl SessionSnapshot {
	/// Returns `true` when neither token nor a user is cached.
	pub fn is_empty(&self) -> bool {
		self.access_token.is_none() && self.refresh_token.is_none() && self.user.is_none()
	}
}

/// Error type produced by [`TokenStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as StdError;
	// self
	use super::*;
	use crate::error::Error;

	#[test]
	fn store_error_converts_into_crate_error_with_source() {
		let store_error = StoreError::Backend { message: "disk full".into() };
		let error: Error = store_error.clone().into();

		assert!(matches!(error, Error::Storage(_)));
		assert!(error.to_string().contains("disk full"));

		let source = StdError::source(&error)
			.expect("Crate error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[test]
	fn set_credentials_keeps_refresh_token_when_pair_has_none() {
		let store = MemoryStore::default();

		store
			.set_credentials(CredentialPair::new("access-1").with_refresh_token("refresh-1"))
			.expect("Seeding credentials should succeed.");
		store
			.set_credentials(CredentialPair::new("access-2"))
			.expect("Rotating the access token should succeed.");

		assert_eq!(store.access_token(), Some(TokenSecret::new("access-2")));
		assert_eq!(store.refresh_token(), Some(TokenSecret::new("refresh-1")));
	}

	#[test]
	fn snapshot_serializes_with_camel_case_keys() {
		let snapshot = SessionSnapshot {
			access_token: Some(TokenSecret::new("a")),
			refresh_token: None,
			user: Some(serde_json::json!({ "id": 7 })),
		};
		let payload = serde_json::to_value(&snapshot).expect("Snapshot should serialize.");

		assert_eq!(payload["accessToken"], "a");
		assert!(payload["refreshToken"].is_null());
		assert!(!snapshot.is_empty());
		assert!(SessionSnapshot::default().is_empty());
	}
}

//! Thread-safe in-memory [`TokenStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	store::{SessionSnapshot, StoreError, TokenStore},
};

/// Thread-safe storage backend that keeps the session in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Arc<RwLock<SessionSnapshot>>);
impl MemoryStore {
	/// Creates a store seeded with the provided snapshot.
	pub fn with_snapshot(snapshot: SessionSnapshot) -> Self {
		Self(Arc::new(RwLock::new(snapshot)))
	}

	/// Returns a copy of the current snapshot.
	pub fn snapshot(&self) -> SessionSnapshot {
		self.0.read().clone()
	}
}
impl TokenStore for MemoryStore {
	fn access_token(&self) -> Option<TokenSecret> {
		self.0.read().access_token.clone()
	}

	fn set_access_token(&self, token: TokenSecret) -> Result<(), StoreError> {
		self.0.write().access_token = Some(token);

		Ok(())
	}

	fn refresh_token(&self) -> Option<TokenSecret> {
		self.0.read().refresh_token.clone()
	}

	fn set_refresh_token(&self, token: TokenSecret) -> Result<(), StoreError> {
		self.0.write().refresh_token = Some(token);

		Ok(())
	}

	fn user(&self) -> Option<Value> {
		self.0.read().user.clone()
	}

	fn set_user(&self, user: Value) -> Result<(), StoreError> {
		self.0.write().user = Some(user);

		Ok(())
	}

	fn clear_all(&self) -> Result<(), StoreError> {
		*self.0.write() = SessionSnapshot::default();

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn clones_share_the_same_session() {
		let store = MemoryStore::default();
		let alias = store.clone();

		store.set_access_token(TokenSecret::new("shared")).expect("Write should succeed.");

		assert_eq!(alias.access_token(), Some(TokenSecret::new("shared")));
	}

	#[test]
	fn clear_all_drops_tokens_and_user() {
		let store = MemoryStore::with_snapshot(SessionSnapshot {
			access_token: Some(TokenSecret::new("access")),
			refresh_token: Some(TokenSecret::new("refresh")),
			user: Some(serde_json::json!({ "name": "operator" })),
		});

		store.clear_all().expect("Clearing an in-memory store should succeed.");

		assert!(store.snapshot().is_empty());
		assert!(store.user().is_none());
	}
}

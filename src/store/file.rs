//! Simple file-backed [`TokenStore`] that keeps a session across process restarts.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	store::{SessionSnapshot, StoreError, TokenStore},
};

/// Persists the session snapshot to a JSON file after each mutation.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<SessionSnapshot>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Location of the backing JSON file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<SessionSnapshot, StoreError> {
		if !path.exists() {
			return Ok(SessionSnapshot::default());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		if bytes.iter().all(u8::is_ascii_whitespace) {
			return Ok(SessionSnapshot::default());
		}

		serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist_locked(&self, snapshot: &SessionSnapshot) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized =
			serde_json::to_vec_pretty(snapshot).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize session snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}

	fn mutate(&self, apply: impl FnOnce(&mut SessionSnapshot)) -> Result<(), StoreError> {
		let mut guard = self.inner.write();

		apply(&mut guard);

		self.persist_locked(&guard)
	}
}
impl TokenStore for FileStore {
	fn access_token(&self) -> Option<TokenSecret> {
		self.inner.read().access_token.clone()
	}

	fn set_access_token(&self, token: TokenSecret) -> Result<(), StoreError> {
		self.mutate(|snapshot| snapshot.access_token = Some(token))
	}

	fn refresh_token(&self) -> Option<TokenSecret> {
		self.inner.read().refresh_token.clone()
	}

	fn set_refresh_token(&self, token: TokenSecret) -> Result<(), StoreError> {
		self.mutate(|snapshot| snapshot.refresh_token = Some(token))
	}

	fn user(&self) -> Option<Value> {
		self.inner.read().user.clone()
	}

	fn set_user(&self, user: Value) -> Result<(), StoreError> {
		self.mutate(|snapshot| snapshot.user = Some(user))
	}

	fn clear_all(&self) -> Result<(), StoreError> {
		self.mutate(|snapshot| *snapshot = SessionSnapshot::default())
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// self
	use super::*;

	fn temp_path(label: &str) -> PathBuf {
		let unique = format!(
			"token_relay_file_store_{label}_{}_{}.json",
			process::id(),
			time::OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	#[test]
	fn save_and_reload_round_trip() {
		let path = temp_path("reload");
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");

		store.set_access_token(TokenSecret::new("access-token")).expect("Write should persist.");
		store.set_refresh_token(TokenSecret::new("refresh-token")).expect("Write should persist.");
		drop(store);

		let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");

		assert_eq!(reopened.access_token(), Some(TokenSecret::new("access-token")));
		assert_eq!(reopened.refresh_token(), Some(TokenSecret::new("refresh-token")));

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn malformed_snapshot_is_a_serialization_error() {
		let path = temp_path("malformed");

		fs::write(&path, b"{not json").expect("Failed to write malformed fixture.");

		let err = FileStore::open(&path).expect_err("Malformed snapshot should fail to load.");

		assert!(matches!(err, StoreError::Serialization { .. }));

		fs::remove_file(&path).expect("Failed to remove malformed fixture.");
	}
}

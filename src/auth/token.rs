//! Token secrets and the credential pair persisted by stores.

pub mod pair;
pub mod secret;

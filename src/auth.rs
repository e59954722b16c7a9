//! Credential models shared by the store, decorator, and refresh coordinator.

pub mod token;

pub use token::{pair::*, secret::*};

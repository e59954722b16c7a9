//! Demonstrates a session renewal against a mock backend.
//!
//! The stored access token has expired. Three concurrent calls all receive a 401. One of them
//! runs the shared refresh exchange. The others wait on it, and all three are replayed with the
//! renewed token.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use futures::future;
use httpmock::prelude::*;
use serde_json::json;
// self
use token_relay::{
	auth::CredentialPair,
	client::ReqwestApiClient,
	config::ClientConfig,
	store::{MemoryStore, TokenStore},
	url::Url,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let _expired = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/complaints").header("authorization", "Bearer expired-access");
			then.status(401).json_body(json!({ "message": "jwt expired" }));
		})
		.await;
	let _renewed = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/complaints").header("authorization", "Bearer renewed-access");
			then.status(200).json_body(json!({
				"success": true,
				"data": [{ "id": 1, "title": "Broken meter" }],
				"pagination": { "page": 1, "total": 1 },
			}));
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/refresh");
			then.status(200).json_body(json!({
				"data": { "accessToken": "renewed-access", "refreshToken": "renewed-refresh" },
			}));
		})
		.await;
	let store = Arc::new(MemoryStore::default());
	let client =
		ReqwestApiClient::new(ClientConfig::builder(Url::parse(&server.url("/api"))?).build()?, store.clone())?;

	client.sign_in(
		CredentialPair::new("expired-access").with_refresh_token("demo-refresh"),
		Some(json!({ "id": 42, "name": "Demo Operator" })),
	)?;

	let results = future::join_all((0..3).map(|_| client.get("complaints"))).await;

	for result in results {
		let envelope = result?;

		println!("Status {} with data {}.", envelope.status, envelope.data);
	}

	println!(
		"Refresh exchanges: {}; joined callers: {}; refresh token rotated: {}.",
		client.refresh_metrics().attempts(),
		client.refresh_metrics().joined(),
		store.refresh_token().map(|token| token.expose() == "renewed-refresh").unwrap_or_default(),
	);

	refresh.assert_async().await;

	Ok(())
}

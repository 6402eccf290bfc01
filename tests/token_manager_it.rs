// crates.io
use httpmock::prelude::*;
use serde_json::json;
use time::macros;
// self
use dnc_compliance::{_preludet::*, auth::GrantKind, clock::ManualClock};

const TOKEN_PATH: &str = "/oauth/token";

#[tokio::test]
async fn concurrent_callers_share_one_exchange() {
	let server = MockServer::start_async().await;
	let client = build_test_client(&server.base_url());
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(TOKEN_PATH)
				.header("content-type", "application/x-www-form-urlencoded")
				.body_includes("grant_type=client_credentials");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"shared-token\",\"token_type\":\"bearer\",\"expires_in\":3600}",
			);
		})
		.await;
	let tokens = client.token_manager();
	let (first, second, third) =
		tokio::join!(tokens.access_token(), tokens.access_token(), tokens.access_token());

	for secret in [first, second, third] {
		assert_eq!(
			secret.expect("Concurrent callers should receive the token.").expose(),
			"shared-token"
		);
	}

	mock.assert_calls_async(1).await;

	assert!(client.token_info().is_valid);
	assert!(!tokens.is_refreshing());
	assert_eq!(tokens.exchange_metrics().attempts(), 1);
	assert_eq!(tokens.exchange_metrics().successes(), 1);
}

#[tokio::test]
async fn concurrent_callers_share_one_failure() {
	let server = MockServer::start_async().await;
	let client = build_test_client(&server.base_url());
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(401).json_body(json!({ "error": "invalid_client" }));
		})
		.await;
	let tokens = client.token_manager();
	let (first, second) = tokio::join!(tokens.access_token(), tokens.access_token());

	for result in [first, second] {
		let err = result.expect_err("Rejected credentials should surface to every waiter.");

		assert_eq!(err.code, ErrorCode::AuthInvalidCredentials);
		assert_eq!(err.status, Some(401));
	}

	mock.assert_calls_async(1).await;

	assert!(!tokens.is_refreshing());
	assert_eq!(tokens.exchange_metrics().failures(), 1);
}

#[tokio::test]
async fn token_endpoint_failures_are_classified_by_status() {
	for (status, code) in [
		(401, ErrorCode::AuthInvalidCredentials),
		(400, ErrorCode::AuthInvalidRequest),
		(500, ErrorCode::AuthFailed),
		(503, ErrorCode::AuthFailed),
	] {
		let server = MockServer::start_async().await;
		let client = build_test_client(&server.base_url());

		server
			.mock_async(|when, then| {
				when.method(POST).path(TOKEN_PATH);
				then.status(status).json_body(json!({ "error": "invalid_request" }));
			})
			.await;

		let err = client
			.token_manager()
			.authenticate()
			.await
			.expect_err("Non-success token responses should fail.");

		assert_eq!(err.code, code, "status {status}");
		assert_eq!(err.status, Some(status));
		assert!(!err.is_transient());
	}
}

#[tokio::test]
async fn malformed_token_responses_are_unexpected_errors() {
	let server = MockServer::start_async().await;
	let client = build_test_client(&server.base_url());

	server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200).header("content-type", "application/json").body("{\"token_type\":1}");
		})
		.await;

	let err = client
		.token_manager()
		.access_token()
		.await
		.expect_err("Malformed success bodies should fail.");

	assert_eq!(err.code, ErrorCode::AuthUnexpectedError);
	assert_eq!(err.status, None);
}

#[tokio::test]
async fn expired_tokens_are_renewed_with_the_refresh_grant() {
	let server = MockServer::start_async().await;
	let clock = ManualClock::new(macros::datetime!(2025-01-01 00:00 UTC));
	let config = test_config_builder(&server.base_url())
		.build()
		.expect("Test configuration should be valid.");
	let client = build_test_client_with_clock(config, Arc::new(clock.clone()));
	let initial = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH).body_includes("grant_type=client_credentials");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"first\",\"refresh_token\":\"refresh-1\",\"token_type\":\"bearer\",\"expires_in\":3600}",
			);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(TOKEN_PATH)
				.body_includes("grant_type=refresh_token")
				.body_includes("refresh_token=refresh-1");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"second\",\"token_type\":\"bearer\",\"expires_in\":3600}",
			);
		})
		.await;
	let tokens = client.token_manager();
	let first = tokens.access_token().await.expect("Initial exchange should succeed.");

	assert_eq!(first.expose(), "first");

	// Inside the five-minute safety buffer.
	clock.advance(Duration::from_secs(3_301));

	assert!(!tokens.token_info().is_valid);

	let second = tokens.access_token().await.expect("Refresh exchange should succeed.");

	assert_eq!(second.expose(), "second");

	initial.assert_calls_async(1).await;
	refresh.assert_calls_async(1).await;
}

#[tokio::test]
async fn concurrent_callers_share_one_refresh_of_an_expired_token() {
	let server = MockServer::start_async().await;
	let clock = ManualClock::new(macros::datetime!(2025-01-01 00:00 UTC));
	let config = test_config_builder(&server.base_url())
		.build()
		.expect("Test configuration should be valid.");
	let client = build_test_client_with_clock(config, Arc::new(clock.clone()));

	server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH).body_includes("grant_type=client_credentials");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"stale\",\"refresh_token\":\"refresh-1\",\"token_type\":\"bearer\",\"expires_in\":3600}",
			);
		})
		.await;

	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH).body_includes("grant_type=refresh_token");
			then.status(200)
				.header("content-type", "application/json")
				.delay(Duration::from_millis(50))
				.body("{\"access_token\":\"renewed\",\"token_type\":\"bearer\",\"expires_in\":3600}");
		})
		.await;
	let tokens = client.token_manager();

	tokens.access_token().await.expect("Initial exchange should succeed.");
	clock.advance(Duration::from_secs(3_600));

	let (first, second, third) =
		tokio::join!(tokens.access_token(), tokens.access_token(), tokens.access_token());

	for secret in [first, second, third] {
		assert_eq!(
			secret.expect("Every caller should receive the renewed token.").expose(),
			"renewed"
		);
	}

	refresh.assert_calls_async(1).await;

	assert!(!tokens.is_refreshing());
	assert_eq!(tokens.exchange_metrics().grant(GrantKind::RefreshToken).attempts, 1);
}

#[tokio::test]
async fn authenticate_always_performs_a_fresh_exchange() {
	let server = MockServer::start_async().await;
	let client = build_test_client(&server.base_url());
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"fresh\",\"token_type\":\"bearer\",\"expires_in\":3600}",
			);
		})
		.await;
	let tokens = client.token_manager();

	tokens.authenticate().await.expect("First exchange should succeed.");
	tokens.authenticate().await.expect("Second exchange should succeed.");
	tokens.access_token().await.expect("Held token should be served.");

	mock.assert_calls_async(2).await;

	tokens.clear_token();

	assert!(!tokens.token_info().is_valid);
}

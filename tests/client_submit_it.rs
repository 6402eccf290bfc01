// std
use std::time::Instant;
// crates.io
use httpmock::{Mock, prelude::*};
use serde_json::json;
use time::macros;
// self
use dnc_compliance::{
	_preludet::*,
	breaker::CircuitState,
	client::ComplianceClient,
	clock::ManualClock,
	config::{BreakerPolicy, RateLimitConfig},
	model::BatchStatus,
};

const BATCH_PATH: &str = "/api/dnc/batch";

async fn mock_token(server: &MockServer) -> Mock<'_> {
	server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"api-token\",\"token_type\":\"bearer\",\"expires_in\":3600}",
			);
		})
		.await
}

fn submission(batch_id: &str, record_count: usize) -> serde_json::Value {
	json!({
		"batchId": batch_id,
		"status": "queued",
		"recordCount": record_count,
		"submittedAt": "2025-01-01T00:00:00Z",
	})
}

#[tokio::test]
async fn full_batch_is_submitted_with_bearer_and_all_checks() {
	let server = MockServer::start_async().await;
	let client = build_test_client(&server.base_url());
	let token = mock_token(&server).await;
	let batch = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(BATCH_PATH)
				.header("authorization", "Bearer api-token")
				.header("content-type", "application/json")
				.body_includes("\"includeFederalDNC\":true")
				.body_includes("\"includeTCPACompliance\":true")
				.body_includes("\"phoneNumber\":\"+15550000499\"");
			then.status(202).json_body(submission("batch-500", 500));
		})
		.await;
	let accepted = client
		.submit_batch(&sample_records(500))
		.await
		.expect("A 500-record batch should be accepted.");

	assert_eq!(accepted.batch_id, "batch-500");
	assert_eq!(accepted.status, BatchStatus::Queued);
	assert_eq!(accepted.record_count, 500);
	assert!(client.is_initialized());

	token.assert_calls_async(1).await;
	batch.assert_calls_async(1).await;
}

#[tokio::test]
async fn local_validation_runs_before_any_network_call() {
	let server = MockServer::start_async().await;
	let client = build_test_client(&server.base_url());
	let token = mock_token(&server).await;
	let oversized = client
		.submit_batch(&sample_records(501))
		.await
		.expect_err("501 records should be rejected.");
	let empty = client.submit_batch(&[]).await.expect_err("Empty batches should be rejected.");
	let blank_id = client.get_results("  ").await.expect_err("Blank ids should be rejected.");
	let nothing =
		client.submit_multiple_batches(&[]).await.expect_err("Empty input should be rejected.");

	assert_eq!(oversized.code, ErrorCode::BatchSizeExceeded);
	assert_eq!(empty.code, ErrorCode::InvalidRequest);
	assert_eq!(blank_id.code, ErrorCode::InvalidRequest);
	assert_eq!(nothing.code, ErrorCode::InvalidRequest);

	token.assert_calls_async(0).await;
}

#[tokio::test]
async fn client_errors_make_exactly_one_attempt() {
	let server = MockServer::start_async().await;
	let client = build_test_client(&server.base_url());

	mock_token(&server).await;

	let batch = server
		.mock_async(|when, then| {
			when.method(POST).path(BATCH_PATH);
			then.status(400).json_body(json!({ "error": "invalid phone number" }));
		})
		.await;
	let err = client.submit_batch(&sample_records(3)).await.expect_err("400 should surface.");

	assert_eq!(err.code, ErrorCode::ApiError);
	assert_eq!(err.status, Some(400));
	assert_eq!(err.details, Some(json!({ "error": "invalid phone number" })));

	batch.assert_calls_async(1).await;
}

#[tokio::test]
async fn server_errors_are_retried_up_to_the_attempt_limit() {
	let server = MockServer::start_async().await;
	let client = build_test_client(&server.base_url());

	mock_token(&server).await;

	let batch = server
		.mock_async(|when, then| {
			when.method(POST).path(BATCH_PATH);
			then.status(502).body("upstream unavailable");
		})
		.await;
	let err = client.submit_batch(&sample_records(3)).await.expect_err("502 should surface.");

	assert_eq!(err.code, ErrorCode::ApiError);
	assert_eq!(err.status, Some(502));

	batch.assert_calls_async(3).await;
}

#[tokio::test]
async fn throttling_is_classified_and_retried() {
	let server = MockServer::start_async().await;
	let client = build_test_client(&server.base_url());

	mock_token(&server).await;

	let results = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/dnc/batch/b-1/results");
			then.status(429).header("x-ratelimit-remaining", "0");
		})
		.await;
	let err = client.get_results("b-1").await.expect_err("429 should surface after retries.");

	assert_eq!(err.code, ErrorCode::RateLimitExceeded);
	assert_eq!(err.status, Some(429));

	results.assert_calls_async(3).await;
}

#[tokio::test]
async fn unauthorized_api_calls_reset_the_session() {
	let server = MockServer::start_async().await;
	let client = build_test_client(&server.base_url());
	let token = mock_token(&server).await;
	let batch = server
		.mock_async(|when, then| {
			when.method(POST).path(BATCH_PATH);
			then.status(401).json_body(json!({ "error": "token expired" }));
		})
		.await;
	let err = client.submit_batch(&sample_records(1)).await.expect_err("401 should surface.");

	assert_eq!(err.code, ErrorCode::AuthFailed);
	assert_eq!(err.status, Some(401));
	assert!(!client.is_initialized());
	assert!(!client.token_info().is_valid);

	batch.assert_calls_async(1).await;

	client.initialize().await.expect("Re-initialization should succeed.");

	token.assert_calls_async(2).await;
}

#[tokio::test]
async fn concurrent_initialization_authenticates_once() {
	let server = MockServer::start_async().await;
	let client = build_test_client(&server.base_url());
	let token = mock_token(&server).await;
	let other = client.clone();
	let (first, second) = tokio::join!(client.initialize(), other.initialize());

	first.expect("First initialization should succeed.");
	second.expect("Second initialization should succeed.");
	client.initialize().await.expect("Repeat initialization should be a no-op.");

	token.assert_calls_async(1).await;
}

#[tokio::test]
async fn large_inputs_are_split_and_returned_in_order() {
	let server = MockServer::start_async().await;
	let client = build_test_client(&server.base_url());

	mock_token(&server).await;

	let mut mocks = Vec::new();

	for (first_id, batch_id, count) in
		[("rec-0", "b-1", 500), ("rec-500", "b-2", 500), ("rec-1000", "b-3", 200)]
	{
		let marker = format!("{{\"id\":\"{first_id}\",");

		mocks.push(
			server
				.mock_async(|when, then| {
					when.method(POST).path(BATCH_PATH).body_includes(marker);
					then.status(202).json_body(submission(batch_id, count));
				})
				.await,
		);
	}

	let accepted = client
		.submit_multiple_batches(&sample_records(1_200))
		.await
		.expect("Every batch should be accepted.");
	let ids = accepted.iter().map(|sub| sub.batch_id.as_str()).collect::<Vec<_>>();
	let counts = accepted.iter().map(|sub| sub.record_count).collect::<Vec<_>>();

	assert_eq!(ids, ["b-1", "b-2", "b-3"]);
	assert_eq!(counts, [500, 500, 200]);

	for mock in mocks {
		mock.assert_calls_async(1).await;
	}
}

#[tokio::test]
async fn groups_are_capped_and_separated_by_the_group_delay() {
	let server = MockServer::start_async().await;
	let config = test_config_builder(&server.base_url())
		.batch_concurrency(3)
		.batch_group_delay(Duration::from_millis(300))
		.build()
		.expect("Test configuration should be valid.");
	let client = ComplianceClient::new(config).expect("Client should build.");

	mock_token(&server).await;

	let batch = server
		.mock_async(|when, then| {
			when.method(POST).path(BATCH_PATH);
			then.status(202).delay(Duration::from_millis(200)).json_body(submission("b-n", 400));
		})
		.await;
	let started = Instant::now();
	let accepted = client
		.submit_multiple_batches(&sample_records(1_600))
		.await
		.expect("Every batch should be accepted.");

	assert_eq!(accepted.len(), 4);
	// First group of three in parallel, the pause, then the fourth batch on its own.
	assert!(started.elapsed() >= Duration::from_millis(700), "elapsed {:?}", started.elapsed());

	batch.assert_calls_async(4).await;
}

#[tokio::test]
async fn abandoned_half_open_trial_does_not_wedge_the_circuit() {
	let server = MockServer::start_async().await;
	let clock = ManualClock::new(macros::datetime!(2025-01-01 00:00 UTC));
	let config = test_config_builder(&server.base_url())
		.max_retries(1)
		.breaker(BreakerPolicy { failure_threshold: 1, reset_timeout: Duration::from_secs(30) })
		.build()
		.expect("Test configuration should be valid.");
	let client = build_test_client_with_clock(config, Arc::new(clock.clone()));

	mock_token(&server).await;

	let mut outage = server
		.mock_async(|when, then| {
			when.method(POST).path(BATCH_PATH);
			then.status(500);
		})
		.await;

	client.submit_batch(&sample_records(1)).await.expect_err("500 should surface.");
	assert_eq!(client.circuit_breaker().state(), CircuitState::Open);

	outage.delete_async().await;
	server
		.mock_async(|when, then| {
			when.method(POST).path(BATCH_PATH);
			then.status(202).json_body(submission("b-1", 1));
		})
		.await;
	clock.advance(Duration::from_secs(31));

	// Siblings are rejected while the first batch holds the trial, which is then abandoned.
	client
		.submit_multiple_batches(&sample_records(1_200))
		.await
		.expect_err("Only one trial may run while half-open.");
	client.submit_batch(&sample_records(1)).await.expect("A fresh trial should be admitted.");

	assert_eq!(client.circuit_breaker().state(), CircuitState::Closed);
}

#[tokio::test]
async fn open_circuit_rejects_calls_with_service_unavailable() {
	let server = MockServer::start_async().await;
	let config = test_config_builder(&server.base_url())
		.max_retries(1)
		.breaker(BreakerPolicy { failure_threshold: 2, reset_timeout: Duration::from_secs(60) })
		.build()
		.expect("Test configuration should be valid.");
	let client = ComplianceClient::new(config).expect("Client should build.");

	mock_token(&server).await;

	let batch = server
		.mock_async(|when, then| {
			when.method(POST).path(BATCH_PATH);
			then.status(500);
		})
		.await;

	for _ in 0..2 {
		let err = client.submit_batch(&sample_records(1)).await.expect_err("500 should surface.");

		assert_eq!(err.code, ErrorCode::ApiError);
	}

	assert_eq!(client.circuit_breaker().state(), CircuitState::Open);

	let err = client.submit_batch(&sample_records(1)).await.expect_err("Open circuit should reject.");

	assert_eq!(err.code, ErrorCode::ServiceUnavailable);
	assert_eq!(err.status, Some(503));

	batch.assert_calls_async(2).await;
}

#[tokio::test]
async fn rate_limit_headers_tighten_the_local_buckets() {
	let server = MockServer::start_async().await;
	let config = test_config_builder(&server.base_url())
		.rate_limits(RateLimitConfig::default().per_second(10).per_minute(60))
		.build()
		.expect("Test configuration should be valid.");
	let client = ComplianceClient::new(config).expect("Client should build.");

	mock_token(&server).await;
	server
		.mock_async(|when, then| {
			when.method(POST).path(BATCH_PATH);
			then.status(202)
				.header("x-ratelimit-limit", "60")
				.header("x-ratelimit-remaining", "2")
				.header("x-ratelimit-reset", "1735689600")
				.json_body(submission("b-1", 1));
		})
		.await;
	client.submit_batch(&sample_records(1)).await.expect("Submission should succeed.");

	let snapshot = client.rate_limit_info().expect("Configured limiter should report.");

	assert_eq!(snapshot.limit, 60);
	assert_eq!(snapshot.remaining, 2);
}

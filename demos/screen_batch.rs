//! Screens a small customer list end to end against a mock compliance service: authenticate,
//! submit, poll until the batch completes, and print the compliance report.

// std
use std::time::Duration;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::json;
// self
use dnc_compliance::{
	client::{ComplianceClient, WaitOptions},
	config::{ClientConfig, Environment, RateLimitConfig},
	model::{CustomerRecord, ScreeningOptions},
	report,
	url::Url,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"token_type\":\"bearer\",\"expires_in\":3600}",
			);
		})
		.await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/v1/dnc/batch");
			then.status(202)
				.header("x-ratelimit-limit", "60")
				.header("x-ratelimit-remaining", "58")
				.json_body(json!({
					"batchId": "demo-batch",
					"status": "queued",
					"recordCount": 2,
					"submittedAt": "2025-01-01T00:00:00Z",
				}));
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/dnc/batch/demo-batch/results");
			then.status(200).json_body(json!({
				"batchId": "demo-batch",
				"status": "completed",
				"results": [
					{ "recordId": "c-1", "phoneNumber": "+15550100001", "status": "clean" },
					{
						"recordId": "c-2",
						"phoneNumber": "+15550100002",
						"status": "flagged",
						"flags": { "federalDNC": true, "wireless": true },
					},
				],
			}));
		})
		.await;

	let config = ClientConfig::builder(Environment::Sandbox, "demo-client", "super-secret")
		.endpoints(Url::parse(&server.url("/v1"))?, Url::parse(&server.url("/oauth/token"))?)
		.rate_limits(RateLimitConfig::default().per_second(5).per_minute(60))
		.build()?;
	let client = ComplianceClient::new(config)?;
	let records = [
		CustomerRecord::new("c-1", "+15550100001").with_name("Avery"),
		CustomerRecord::new("c-2", "+15550100002").with_zip("94107"),
	];
	let wait =
		WaitOptions { polling_interval: Duration::from_millis(200), max_wait: Duration::from_secs(5) };
	let batches = client.screen_records(&records, ScreeningOptions::default(), wait).await?;
	let compliance = report::generate_combined_report(&batches);

	println!("{}", serde_json::to_string_pretty(&compliance)?);
	println!("Rate limit after screening: {:?}.", client.rate_limit_info());

	token_mock.assert_async().await;

	Ok(())
}

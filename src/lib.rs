//! Resilient client for batch Do-Not-Call compliance screening: single-flight OAuth2 tokens,
//! multi-window rate limiting, and circuit-broken batch polling.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod breaker;
pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod http;
pub mod limiter;
pub mod model;
pub mod obs;
pub mod report;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests and demos.

	pub use crate::_prelude::*;

	// self
	use crate::{
		client::ComplianceClient,
		clock::Clock,
		config::{ClientConfig, ClientConfigBuilder, Environment},
		model::CustomerRecord,
	};

	/// Client identifier used by test fixtures.
	pub const TEST_CLIENT_ID: &str = "client-test";
	/// Client secret used by test fixtures.
	pub const TEST_CLIENT_SECRET: &str = "secret-test";

	/// Returns a sandbox config builder pointed at a mock server's `/api` and `/oauth/token`.
	///
	/// Backoff and batch-group delays are shrunk so retry paths finish quickly.
	pub fn test_config_builder(server_base: &str) -> ClientConfigBuilder {
		let base = Url::parse(&format!("{server_base}/api"))
			.expect("Mock API base URL should parse successfully.");
		let auth = Url::parse(&format!("{server_base}/oauth/token"))
			.expect("Mock token URL should parse successfully.");

		ClientConfig::builder(Environment::Sandbox, TEST_CLIENT_ID, TEST_CLIENT_SECRET)
			.endpoints(base, auth)
			.retry_backoff(Duration::from_millis(5), Duration::from_millis(20))
			.batch_group_delay(Duration::from_millis(5))
	}

	/// Builds a client against a mock server with the default test tuning.
	pub fn build_test_client(server_base: &str) -> ComplianceClient {
		let config = test_config_builder(server_base)
			.build()
			.expect("Test client configuration should be valid.");

		ComplianceClient::new(config).expect("Test client should build successfully.")
	}

	/// Builds a client that reads time from `clock`.
	pub fn build_test_client_with_clock(
		config: ClientConfig,
		clock: Arc<dyn Clock>,
	) -> ComplianceClient {
		ComplianceClient::with_clock(config, clock).expect("Test client should build successfully.")
	}

	/// Generates `count` records with sequential identifiers and phone numbers.
	pub fn sample_records(count: usize) -> Vec<CustomerRecord> {
		(0..count)
			.map(|idx| CustomerRecord::new(format!("rec-{idx}"), format!("+1555{idx:07}")))
			.collect()
	}
}

mod _prelude {
	pub use std::{
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
		time::Duration,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::Mutex;
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::OffsetDateTime;
	pub use url::Url;

	pub use crate::error::{Error, ErrorCode, Result};
}

pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};

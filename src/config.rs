//! Construction-time configuration for [`ComplianceClient`](crate::client::ComplianceClient).
//!
//! [`ClientConfig`] values are assembled through [`ClientConfigBuilder`], which validates the
//! credential, timeout, and rate-limit invariants before any network handle exists.

// self
use crate::{_prelude::*, auth::TokenSecret, error::ConfigError};

/// Default OAuth scope requested by the client-credentials grant.
pub const DEFAULT_SCOPE: &str = "dnc:read dnc:write";
/// Hard cap on records per submitted batch.
pub const MAX_BATCH_SIZE: usize = 500;

/// Deployment target that selects the fixed service endpoints.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
	#[default]
	/// Vendor sandbox with synthetic screening data.
	Sandbox,
	/// Live screening service.
	Production,
}
impl Environment {
	/// Returns the API base URL for the environment.
	pub const fn base_url(self) -> &'static str {
		match self {
			Environment::Sandbox => "https://sandbox-api.dnc-compliance.com/v1",
			Environment::Production => "https://api.dnc-compliance.com/v1",
		}
	}

	/// Returns the OAuth token endpoint for the environment.
	pub const fn auth_url(self) -> &'static str {
		match self {
			Environment::Sandbox => "https://sandbox-auth.dnc-compliance.com/oauth/token",
			Environment::Production => "https://auth.dnc-compliance.com/oauth/token",
		}
	}
}

/// Resolved service endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
	/// API base; batch paths are appended to it.
	pub base: Url,
	/// OAuth token endpoint.
	pub auth: Url,
}
impl Endpoints {
	/// Returns the fixed endpoints for `environment`.
	pub fn for_environment(environment: Environment) -> Result<Self, ConfigError> {
		let base = Url::parse(environment.base_url())
			.map_err(|source| ConfigError::InvalidEndpoint { endpoint: "base", source })?;
		let auth = Url::parse(environment.auth_url())
			.map_err(|source| ConfigError::InvalidEndpoint { endpoint: "auth", source })?;

		Ok(Self { base, auth })
	}
}

/// Per-window request ceilings. Each window is independent; `None` leaves it unconstrained.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
	/// Requests allowed per second.
	pub requests_per_second: Option<u32>,
	/// Requests allowed per minute.
	pub requests_per_minute: Option<u32>,
	/// Requests allowed per hour.
	pub requests_per_hour: Option<u32>,
}
impl RateLimitConfig {
	/// Sets the per-second ceiling.
	pub fn per_second(mut self, limit: u32) -> Self {
		self.requests_per_second = Some(limit);

		self
	}

	/// Sets the per-minute ceiling.
	pub fn per_minute(mut self, limit: u32) -> Self {
		self.requests_per_minute = Some(limit);

		self
	}

	/// Sets the per-hour ceiling.
	pub fn per_hour(mut self, limit: u32) -> Self {
		self.requests_per_hour = Some(limit);

		self
	}

	/// Rejects windows configured with a zero limit.
	pub fn validate(&self) -> Result<(), ConfigError> {
		for (window, limit) in [
			("per-second", self.requests_per_second),
			("per-minute", self.requests_per_minute),
			("per-hour", self.requests_per_hour),
		] {
			if limit == Some(0) {
				return Err(ConfigError::ZeroRateLimit { window });
			}
		}

		Ok(())
	}
}

/// Exponential backoff applied between attempts of one operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
	/// Total attempts per operation (at least one attempt is always made).
	pub max_retries: u32,
	/// Delay before the second attempt; doubles afterwards.
	pub base_delay: Duration,
	/// Ceiling applied to every delay.
	pub max_delay: Duration,
}
impl RetryPolicy {
	/// Number of attempts the retry loop makes.
	pub fn max_attempts(&self) -> u32 {
		self.max_retries.max(1)
	}

	/// Delay to wait after failed attempt number `attempt` (1-based).
	pub fn backoff(&self, attempt: u32) -> Duration {
		let factor = 2_u32.saturating_pow(attempt.saturating_sub(1));

		self.base_delay.saturating_mul(factor).min(self.max_delay)
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_retries: 3,
			base_delay: Duration::from_millis(1_000),
			max_delay: Duration::from_millis(10_000),
		}
	}
}

/// Controls how oversized inputs are fanned out into batches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchPolicy {
	/// Batches submitted concurrently per group.
	pub concurrency: usize,
	/// Pause inserted between groups.
	pub group_delay: Duration,
}
impl Default for BatchPolicy {
	fn default() -> Self {
		Self { concurrency: 3, group_delay: Duration::from_secs(1) }
	}
}

/// Circuit breaker thresholds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakerPolicy {
	/// Consecutive transient failures that open the circuit.
	pub failure_threshold: u32,
	/// How long the circuit stays open before a trial call is let through.
	pub reset_timeout: Duration,
}
impl Default for BreakerPolicy {
	fn default() -> Self {
		Self { failure_threshold: 5, reset_timeout: Duration::from_secs(30) }
	}
}

/// Validated client configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientConfig {
	/// Selected deployment target.
	pub environment: Environment,
	/// Resolved endpoints (environment defaults unless overridden).
	pub endpoints: Endpoints,
	/// OAuth client identifier.
	pub client_id: String,
	/// OAuth client secret.
	pub client_secret: TokenSecret,
	/// Space-delimited scope requested by the client-credentials grant.
	pub scope: String,
	/// Overall timeout applied to every HTTP request.
	pub timeout: Duration,
	/// Safety margin subtracted from token lifetimes.
	pub token_expiry_buffer: Duration,
	/// Per-window request ceilings.
	pub rate_limits: RateLimitConfig,
	/// Retry/backoff policy.
	pub retry: RetryPolicy,
	/// Multi-batch fan-out policy.
	pub batch: BatchPolicy,
	/// Circuit breaker thresholds.
	pub breaker: BreakerPolicy,
}
impl ClientConfig {
	/// Default request timeout.
	pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
	/// Default token expiry safety margin (five minutes).
	pub const DEFAULT_EXPIRY_BUFFER: Duration = Duration::from_secs(300);

	/// Creates a new builder for the provided environment and credentials.
	pub fn builder(
		environment: Environment,
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
	) -> ClientConfigBuilder {
		ClientConfigBuilder::new(environment, client_id, client_secret)
	}

	/// Validates invariants for the configuration.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.client_id.trim().is_empty() {
			return Err(ConfigError::MissingCredential { field: "client id" });
		}
		if self.client_secret.expose().trim().is_empty() {
			return Err(ConfigError::MissingCredential { field: "client secret" });
		}
		if self.timeout < Duration::from_millis(1_000) {
			return Err(ConfigError::TimeoutTooShort { millis: self.timeout.as_millis() });
		}
		if self.batch.concurrency == 0 {
			return Err(ConfigError::ZeroConcurrency);
		}
		if self.breaker.failure_threshold == 0 {
			return Err(ConfigError::ZeroFailureThreshold);
		}

		self.rate_limits.validate()
	}
}

/// Builder for [`ClientConfig`] values.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	/// Selected deployment target.
	pub environment: Environment,
	/// Endpoint override; environment defaults apply when unset.
	pub endpoints: Option<Endpoints>,
	/// OAuth client identifier.
	pub client_id: String,
	/// OAuth client secret.
	pub client_secret: TokenSecret,
	/// Requested OAuth scope.
	pub scope: String,
	/// Overall request timeout.
	pub timeout: Duration,
	/// Token expiry safety margin.
	pub token_expiry_buffer: Duration,
	/// Per-window request ceilings.
	pub rate_limits: RateLimitConfig,
	/// Retry/backoff policy.
	pub retry: RetryPolicy,
	/// Multi-batch fan-out policy.
	pub batch: BatchPolicy,
	/// Circuit breaker thresholds.
	pub breaker: BreakerPolicy,
}
impl ClientConfigBuilder {
	/// Creates a builder seeded with environment defaults.
	pub fn new(
		environment: Environment,
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
	) -> Self {
		Self {
			environment,
			endpoints: None,
			client_id: client_id.into(),
			client_secret: TokenSecret::new(client_secret),
			scope: DEFAULT_SCOPE.into(),
			timeout: ClientConfig::DEFAULT_TIMEOUT,
			token_expiry_buffer: ClientConfig::DEFAULT_EXPIRY_BUFFER,
			rate_limits: RateLimitConfig::default(),
			retry: RetryPolicy::default(),
			batch: BatchPolicy::default(),
			breaker: BreakerPolicy::default(),
		}
	}

	/// Overrides the OAuth scope.
	pub fn scope(mut self, scope: impl Into<String>) -> Self {
		self.scope = scope.into();

		self
	}

	/// Overrides the request timeout.
	pub fn timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Overrides the number of attempts per operation.
	pub fn max_retries(mut self, max_retries: u32) -> Self {
		self.retry.max_retries = max_retries;

		self
	}

	/// Overrides the backoff base and ceiling.
	pub fn retry_backoff(mut self, base_delay: Duration, max_delay: Duration) -> Self {
		self.retry.base_delay = base_delay;
		self.retry.max_delay = max_delay;

		self
	}

	/// Sets the per-window request ceilings.
	pub fn rate_limits(mut self, limits: RateLimitConfig) -> Self {
		self.rate_limits = limits;

		self
	}

	/// Points the client at non-default endpoints (staging, mocks).
	pub fn endpoints(mut self, base: Url, auth: Url) -> Self {
		self.endpoints = Some(Endpoints { base, auth });

		self
	}

	/// Overrides the token expiry safety margin.
	pub fn token_expiry_buffer(mut self, buffer: Duration) -> Self {
		self.token_expiry_buffer = buffer;

		self
	}

	/// Overrides how many batches are submitted concurrently.
	pub fn batch_concurrency(mut self, concurrency: usize) -> Self {
		self.batch.concurrency = concurrency;

		self
	}

	/// Overrides the pause between batch groups.
	pub fn batch_group_delay(mut self, delay: Duration) -> Self {
		self.batch.group_delay = delay;

		self
	}

	/// Overrides the circuit breaker thresholds.
	pub fn breaker(mut self, policy: BreakerPolicy) -> Self {
		self.breaker = policy;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		let endpoints = match self.endpoints {
			Some(endpoints) => endpoints,
			None => Endpoints::for_environment(self.environment)?,
		};
		let config = ClientConfig {
			environment: self.environment,
			endpoints,
			client_id: self.client_id,
			client_secret: self.client_secret,
			scope: self.scope,
			timeout: self.timeout,
			token_expiry_buffer: self.token_expiry_buffer,
			rate_limits: self.rate_limits,
			retry: self.retry,
			batch: self.batch,
			breaker: self.breaker,
		};

		config.validate()?;

		Ok(config)
	}
}

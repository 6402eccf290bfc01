//! Batch screening client composing tokens, throttling, retries, and the circuit breaker.
//!
//! Every API call follows the same path: the circuit breaker admits the operation, the retry
//! loop runs attempts with exponential backoff, and each attempt waits for rate-limit capacity,
//! attaches a fresh bearer token, sends the request, and feeds the response's rate-limit headers
//! back into the limiter.

mod api;
mod batch;
mod polling;
mod retry;

pub use batch::split_into_batches;
pub use polling::WaitOptions;

// std
use std::sync::atomic::{AtomicBool, Ordering};
// self
use crate::{
	_prelude::*,
	auth::{TokenExchange, TokenInfo, TokenManager},
	breaker::CircuitBreaker,
	clock::{Clock, SystemClock},
	config::ClientConfig,
	http::ReqwestHttpClient,
	limiter::{RateLimitSnapshot, RateLimiter},
};

struct ClientInner {
	config: ClientConfig,
	http_client: ReqwestHttpClient,
	tokens: TokenManager,
	limiter: RateLimiter,
	breaker: CircuitBreaker,
	initialized: AtomicBool,
	init_guard: AsyncMutex<()>,
}

/// Client for the batch compliance API.
///
/// Cloning is cheap; clones share tokens, rate-limit buckets, and breaker state.
#[derive(Clone)]
pub struct ComplianceClient {
	inner: Arc<ClientInner>,
}
impl ComplianceClient {
	/// Builds a client from a validated configuration.
	pub fn new(config: ClientConfig) -> Result<Self> {
		Self::with_clock(config, Arc::new(SystemClock))
	}

	/// Builds a client whose token expiry, refill, and breaker cooldown read from `clock`.
	pub fn with_clock(config: ClientConfig, clock: Arc<dyn Clock>) -> Result<Self> {
		config.validate()?;

		let http_client = ReqwestHttpClient::with_timeout(config.timeout)?;
		let exchange = TokenExchange::new(&config, http_client.clone(), clock.clone());
		let tokens = TokenManager::new(exchange, clock.clone(), config.token_expiry_buffer);
		let limiter = RateLimiter::with_clock(&config.rate_limits, clock.clone())?;
		let breaker = CircuitBreaker::with_clock(config.breaker, clock);

		Ok(Self {
			inner: Arc::new(ClientInner {
				config,
				http_client,
				tokens,
				limiter,
				breaker,
				initialized: AtomicBool::new(false),
				init_guard: AsyncMutex::new(()),
			}),
		})
	}

	/// Authenticates once; later and concurrent calls return immediately.
	///
	/// Every operation calls this first, so explicit initialization is optional.
	pub async fn initialize(&self) -> Result<()> {
		if self.is_initialized() {
			return Ok(());
		}

		let _guard = self.inner.init_guard.lock().await;

		if self.is_initialized() {
			return Ok(());
		}

		self.inner.tokens.authenticate().await?;
		self.inner.initialized.store(true, Ordering::Release);

		Ok(())
	}

	/// Returns `true` after a successful [`initialize`](Self::initialize) that no 401 has undone.
	pub fn is_initialized(&self) -> bool {
		self.inner.initialized.load(Ordering::Acquire)
	}

	/// Configuration the client was built with.
	pub fn config(&self) -> &ClientConfig {
		&self.inner.config
	}

	/// Token manager shared by every request.
	pub fn token_manager(&self) -> &TokenManager {
		&self.inner.tokens
	}

	/// Rate limiter shared by every request.
	pub fn rate_limiter(&self) -> &RateLimiter {
		&self.inner.limiter
	}

	/// Circuit breaker wrapping every operation.
	pub fn circuit_breaker(&self) -> &CircuitBreaker {
		&self.inner.breaker
	}

	/// Snapshot of the held token.
	pub fn token_info(&self) -> TokenInfo {
		self.inner.tokens.token_info()
	}

	/// Snapshot of the most restrictive rate-limit window.
	pub fn rate_limit_info(&self) -> Option<RateLimitSnapshot> {
		self.inner.limiter.rate_limit_info()
	}

	/// Forgets the token and the initialized flag after the API rejected the bearer token.
	fn invalidate_session(&self) {
		self.inner.tokens.clear_token();
		self.inner.initialized.store(false, Ordering::Release);
	}
}
impl Debug for ComplianceClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ComplianceClient")
			.field("environment", &self.inner.config.environment)
			.field("initialized", &self.is_initialized())
			.field("tokens", &self.inner.tokens)
			.field("limiter", &self.inner.limiter)
			.field("breaker", &self.inner.breaker)
			.finish()
	}
}

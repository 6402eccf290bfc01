//! Client-side multi-window rate limiting.
//!
//! One [`TokenBucket`](bucket::TokenBucket) exists per configured window. Admission is
//! all-or-nothing: a request passes only when every bucket holds at least one token, and then
//! exactly one token is taken from each. Buckets refill continuously from the injected
//! [`Clock`], and the service's `x-ratelimit-*` headers can only lower the local estimate.

mod bucket;

pub use bucket::Window;

// self
use crate::{
	_prelude::*,
	clock::{Clock, SystemClock},
	config::RateLimitConfig,
	error::ConfigError,
	http::RateLimitHeaders,
	limiter::bucket::TokenBucket,
	obs,
};

/// Extra sleep added on top of the computed refill wait.
pub const WAIT_JITTER: Duration = Duration::from_millis(10);

/// Most restrictive window at the time of observation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RateLimitSnapshot {
	/// Window the snapshot describes.
	pub window: Window,
	/// Capacity of that window.
	pub limit: u32,
	/// Whole tokens currently available.
	pub remaining: u32,
	/// Instant by which the window is guaranteed to be full again.
	pub reset_at: OffsetDateTime,
}

/// Diagnostic view of one bucket.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BucketState {
	/// Window the bucket enforces.
	pub window: Window,
	/// Tokens available, including fractional refill.
	pub tokens: f64,
	/// Bucket capacity.
	pub capacity: f64,
	/// `tokens / capacity` as a percentage.
	pub percent_full: f64,
}

/// Multi-window token-bucket limiter shared by every request a client sends.
#[derive(Clone)]
pub struct RateLimiter {
	buckets: Arc<Mutex<Vec<TokenBucket>>>,
	clock: Arc<dyn Clock>,
}
impl RateLimiter {
	/// Builds a limiter backed by the system clock.
	pub fn new(config: &RateLimitConfig) -> Result<Self, ConfigError> {
		Self::with_clock(config, Arc::new(SystemClock))
	}

	/// Builds a limiter that reads time from `clock`.
	///
	/// A window configured with a zero limit could never refill and is rejected.
	pub fn with_clock(
		config: &RateLimitConfig,
		clock: Arc<dyn Clock>,
	) -> Result<Self, ConfigError> {
		config.validate()?;

		let now = clock.now();
		let buckets = [
			(Window::Second, config.requests_per_second),
			(Window::Minute, config.requests_per_minute),
			(Window::Hour, config.requests_per_hour),
		]
		.into_iter()
		.filter_map(|(window, limit)| limit.map(|limit| TokenBucket::new(window, limit, now)))
		.collect();

		Ok(Self { buckets: Arc::new(Mutex::new(buckets)), clock })
	}

	/// Returns `true` when no window is configured.
	pub fn is_unconstrained(&self) -> bool {
		self.buckets.lock().is_empty()
	}

	/// Refills every bucket and takes one token from each if all of them can spare one.
	pub fn check_and_consume(&self) -> bool {
		let mut buckets = self.buckets.lock();

		self.refill(&mut buckets);

		if !buckets.iter().all(TokenBucket::has_token) {
			return false;
		}

		buckets.iter_mut().for_each(TokenBucket::take);

		true
	}

	/// Waits until [`check_and_consume`](Self::check_and_consume) succeeds.
	///
	/// Each miss sleeps for as long as the most starved bucket needs to accrue one token, plus
	/// [`WAIT_JITTER`]. Waiters are not queued, so there is no ordering between them.
	pub async fn wait_for_capacity(&self) {
		loop {
			if self.check_and_consume() {
				return;
			}

			let wait = self.time_to_capacity() + WAIT_JITTER;

			obs::log_throttled(wait);
			tokio::time::sleep(wait).await;
		}
	}

	/// Lowers the matching bucket to the server-reported remaining count.
	///
	/// A bucket matches when its capacity equals the reported limit. Missing fields, or a limit
	/// no bucket carries, leave the limiter untouched.
	pub fn update_from_headers(&self, headers: &RateLimitHeaders) {
		let (Some(limit), Some(remaining)) = (headers.limit, headers.remaining) else {
			return;
		};
		let mut buckets = self.buckets.lock();

		self.refill(&mut buckets);

		for bucket in buckets.iter_mut().filter(|bucket| bucket.capacity == f64::from(limit)) {
			bucket.clamp_to(remaining);
		}
	}

	/// Snapshot of the bucket with the fewest tokens; earlier windows win ties.
	pub fn rate_limit_info(&self) -> Option<RateLimitSnapshot> {
		let mut buckets = self.buckets.lock();
		let now = self.clock.now();

		self.refill(&mut buckets);

		let tightest = buckets.iter().reduce(|tightest, bucket| {
			if bucket.tokens < tightest.tokens { bucket } else { tightest }
		})?;

		Some(RateLimitSnapshot {
			window: tightest.window,
			limit: tightest.capacity as u32,
			remaining: tightest.tokens.floor() as u32,
			reset_at: now + tightest.window.length(),
		})
	}

	/// Per-bucket diagnostics after a refill.
	pub fn bucket_states(&self) -> Vec<BucketState> {
		let mut buckets = self.buckets.lock();

		self.refill(&mut buckets);

		buckets
			.iter()
			.map(|bucket| BucketState {
				window: bucket.window,
				tokens: bucket.tokens,
				capacity: bucket.capacity,
				percent_full: bucket.tokens / bucket.capacity * 100.,
			})
			.collect()
	}

	/// Restores every bucket to full capacity.
	pub fn reset(&self) {
		let now = self.clock.now();

		self.buckets.lock().iter_mut().for_each(|bucket| bucket.fill(now));
	}

	fn time_to_capacity(&self) -> Duration {
		let mut buckets = self.buckets.lock();

		self.refill(&mut buckets);

		buckets.iter().map(TokenBucket::time_to_token).max().unwrap_or_default()
	}

	fn refill(&self, buckets: &mut [TokenBucket]) {
		let now = self.clock.now();

		buckets.iter_mut().for_each(|bucket| bucket.refill(now));
	}
}
impl Debug for RateLimiter {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RateLimiter").field("buckets", &*self.buckets.lock()).finish()
	}
}

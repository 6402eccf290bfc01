// self
use crate::{_prelude::*, clock};

/// Rate-limit window enforced by one bucket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Window {
	/// One-second window.
	Second,
	/// One-minute window.
	Minute,
	/// One-hour window.
	Hour,
}
impl Window {
	/// Length of the window.
	pub const fn length(self) -> Duration {
		match self {
			Window::Second => Duration::from_secs(1),
			Window::Minute => Duration::from_secs(60),
			Window::Hour => Duration::from_secs(3_600),
		}
	}

	/// Returns a stable label for logs and diagnostics.
	pub const fn as_str(self) -> &'static str {
		match self {
			Window::Second => "second",
			Window::Minute => "minute",
			Window::Hour => "hour",
		}
	}
}
impl Display for Window {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Continuously refilling token bucket for a single window.
#[derive(Clone, Debug)]
pub(crate) struct TokenBucket {
	pub(crate) window: Window,
	pub(crate) tokens: f64,
	pub(crate) capacity: f64,
	refill_per_second: f64,
	last_refill: OffsetDateTime,
}
impl TokenBucket {
	pub(crate) fn new(window: Window, limit: u32, now: OffsetDateTime) -> Self {
		let capacity = f64::from(limit);

		Self {
			window,
			tokens: capacity,
			capacity,
			refill_per_second: capacity / window.length().as_secs_f64(),
			last_refill: now,
		}
	}

	/// Adds the tokens accrued since the last refill, capped at capacity.
	pub(crate) fn refill(&mut self, now: OffsetDateTime) {
		if now <= self.last_refill {
			return;
		}

		let elapsed = clock::non_negative(now - self.last_refill).as_secs_f64();

		self.tokens = (self.tokens + elapsed * self.refill_per_second).min(self.capacity);
		self.last_refill = now;
	}

	pub(crate) fn has_token(&self) -> bool {
		self.tokens >= 1.0
	}

	pub(crate) fn take(&mut self) {
		self.tokens = (self.tokens - 1.0).max(0.0);
	}

	/// Time until one whole token is available.
	pub(crate) fn time_to_token(&self) -> Duration {
		if self.has_token() {
			return Duration::ZERO;
		}

		Duration::from_secs_f64((1.0 - self.tokens) / self.refill_per_second)
	}

	/// Lowers the token count to `remaining`; never raises it.
	pub(crate) fn clamp_to(&mut self, remaining: u32) {
		self.tokens = self.tokens.min(f64::from(remaining));
	}

	pub(crate) fn fill(&mut self, now: OffsetDateTime) {
		self.tokens = self.capacity;
		self.last_refill = now;
	}
}

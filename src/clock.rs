//! Injectable wall clock so expiry, refill, and cooldown math stays deterministic in tests.

// self
use crate::_prelude::*;

/// Source of the current UTC instant.
pub trait Clock
where
	Self: 'static + Send + Sync,
{
	/// Returns the current instant.
	fn now(&self) -> OffsetDateTime;
}

/// Clock backed by the operating system.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;
impl Clock for SystemClock {
	fn now(&self) -> OffsetDateTime {
		OffsetDateTime::now_utc()
	}
}

/// Manually advanced clock for tests and simulations.
///
/// Clones share the same instant, so advancing one handle moves every component built from it.
#[derive(Clone, Debug)]
pub struct ManualClock(Arc<Mutex<OffsetDateTime>>);
impl ManualClock {
	/// Creates a clock frozen at `start`.
	pub fn new(start: OffsetDateTime) -> Self {
		Self(Arc::new(Mutex::new(start)))
	}

	/// Moves the clock forward.
	pub fn advance(&self, by: Duration) {
		let mut now = self.0.lock();

		*now += by;
	}

	/// Pins the clock to a specific instant.
	pub fn set(&self, instant: OffsetDateTime) {
		*self.0.lock() = instant;
	}
}
impl Default for ManualClock {
	fn default() -> Self {
		Self::new(OffsetDateTime::now_utc())
	}
}
impl Clock for ManualClock {
	fn now(&self) -> OffsetDateTime {
		*self.0.lock()
	}
}

/// Converts a possibly negative span into a non-negative std duration.
pub(crate) fn non_negative(span: time::Duration) -> Duration {
	Duration::try_from(span).unwrap_or(Duration::ZERO)
}

//! Circuit breaker guarding calls to the compliance API.
//!
//! The breaker counts consecutive transient failures (see [`Error::is_transient`]). Once the
//! threshold is hit it opens and rejects calls with [`ErrorCode::ServiceUnavailable`] until the
//! reset timeout elapses; the next call is then let through as a half-open trial whose outcome
//! either closes the circuit again or reopens it. Errors the service answered deliberately, such
//! as a 400, prove the service is reachable and count as successes.

// self
use crate::{
	_prelude::*,
	clock::{Clock, SystemClock},
	config::BreakerPolicy,
	obs,
};

/// Observable breaker state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
	/// Calls flow normally.
	Closed,
	/// Calls are rejected without reaching the service.
	Open,
	/// A single trial call checks whether the service has recovered.
	HalfOpen,
}
impl CircuitState {
	/// Returns a stable label for logs and diagnostics.
	pub const fn as_str(self) -> &'static str {
		match self {
			CircuitState::Closed => "closed",
			CircuitState::Open => "open",
			CircuitState::HalfOpen => "half_open",
		}
	}
}
impl Display for CircuitState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

#[derive(Debug)]
struct BreakerState {
	state: CircuitState,
	consecutive_failures: u32,
	opened_at: Option<OffsetDateTime>,
	trial_in_flight: bool,
}
impl BreakerState {
	fn closed() -> Self {
		Self {
			state: CircuitState::Closed,
			consecutive_failures: 0,
			opened_at: None,
			trial_in_flight: false,
		}
	}

	fn transition(&mut self, to: CircuitState) {
		if self.state != to {
			obs::log_breaker_transition(self.state.as_str(), to.as_str());

			self.state = to;
		}
	}
}

/// Releases the half-open trial slot if the trial future is dropped before it completes.
struct TrialGuard<'a> {
	state: &'a Mutex<BreakerState>,
	armed: bool,
}
impl Drop for TrialGuard<'_> {
	fn drop(&mut self) {
		if self.armed {
			self.state.lock().trial_in_flight = false;
		}
	}
}

/// Closed/open/half-open circuit breaker.
#[derive(Clone)]
pub struct CircuitBreaker {
	policy: BreakerPolicy,
	state: Arc<Mutex<BreakerState>>,
	clock: Arc<dyn Clock>,
}
impl CircuitBreaker {
	/// Creates a closed breaker backed by the system clock.
	pub fn new(policy: BreakerPolicy) -> Self {
		Self::with_clock(policy, Arc::new(SystemClock))
	}

	/// Creates a closed breaker that reads time from `clock`.
	pub fn with_clock(policy: BreakerPolicy, clock: Arc<dyn Clock>) -> Self {
		Self { policy, state: Arc::new(Mutex::new(BreakerState::closed())), clock }
	}

	/// Current state, promoting an expired open circuit to half-open.
	pub fn state(&self) -> CircuitState {
		let mut state = self.state.lock();

		self.promote_if_cooled(&mut state);

		state.state
	}

	/// Forces the breaker back to closed and forgets past failures.
	pub fn reset(&self) {
		let mut state = self.state.lock();

		state.transition(CircuitState::Closed);

		*state = BreakerState::closed();
	}

	/// Runs `operation` unless the circuit rejects it.
	///
	/// A rejected call never invokes `operation` and fails with
	/// [`ErrorCode::ServiceUnavailable`] (status 503).
	pub async fn execute<F, Fut, T>(&self, operation: F) -> Result<T>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<T>>,
	{
		let mut trial = TrialGuard { state: &self.state, armed: self.admit()? };
		let result = operation().await;

		trial.armed = false;

		match &result {
			Err(err) if err.is_transient() => self.record_failure(),
			_ => self.record_success(),
		}

		result
	}

	/// Returns whether the admitted call is the half-open trial.
	fn admit(&self) -> Result<bool> {
		let mut state = self.state.lock();

		self.promote_if_cooled(&mut state);

		match state.state {
			CircuitState::Closed => Ok(false),
			CircuitState::HalfOpen if !state.trial_in_flight => {
				state.trial_in_flight = true;

				Ok(true)
			},
			_ => Err(Error::service_unavailable()),
		}
	}

	fn record_success(&self) {
		let mut state = self.state.lock();

		state.consecutive_failures = 0;
		state.trial_in_flight = false;
		state.opened_at = None;
		state.transition(CircuitState::Closed);
	}

	fn record_failure(&self) {
		let mut state = self.state.lock();

		state.consecutive_failures = state.consecutive_failures.saturating_add(1);
		state.trial_in_flight = false;

		let trips = match state.state {
			CircuitState::HalfOpen => true,
			CircuitState::Closed => state.consecutive_failures >= self.policy.failure_threshold,
			CircuitState::Open => false,
		};

		if trips {
			state.opened_at = Some(self.clock.now());
			state.transition(CircuitState::Open);
		}
	}

	fn promote_if_cooled(&self, state: &mut BreakerState) {
		if state.state != CircuitState::Open {
			return;
		}

		let cooled = state
			.opened_at
			.map(|opened_at| opened_at + self.policy.reset_timeout <= self.clock.now())
			.unwrap_or(true);

		if cooled {
			state.trial_in_flight = false;
			state.transition(CircuitState::HalfOpen);
		}
	}
}
impl Debug for CircuitBreaker {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CircuitBreaker")
			.field("policy", &self.policy)
			.field("state", &*self.state.lock())
			.finish()
	}
}

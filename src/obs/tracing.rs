// self
use crate::{_prelude::*, obs::OperationKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedOperation<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedOperation<F> = F;

/// A span builder used by client operations.
#[derive(Clone, Debug)]
pub struct OperationSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl OperationSpan {
	/// Creates a new span tagged with the provided operation kind + stage.
	pub fn new(kind: OperationKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span =
				tracing::info_span!("dnc_compliance.operation", operation = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOperation<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Logs a failure that is about to be surfaced to the caller.
pub fn log_failure(kind: OperationKind, err: &Error) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(
			operation = kind.as_str(),
			code = err.code.as_str(),
			status = err.status,
			"{}",
			err.message
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, err);
	}
}

/// Logs a transient failure that will be retried after `delay`.
pub fn log_retry(kind: OperationKind, attempt: u32, delay: Duration, err: &Error) {
	#[cfg(feature = "tracing")]
	{
		tracing::info!(
			operation = kind.as_str(),
			attempt,
			delay_ms = delay.as_millis() as u64,
			code = err.code.as_str(),
			status = err.status,
			"retrying after transient failure"
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, attempt, delay, err);
	}
}

/// Logs a circuit breaker state change.
pub fn log_breaker_transition(from: &'static str, to: &'static str) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(from, to, "circuit breaker state changed");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (from, to);
	}
}

/// Logs a rate-limiter wait.
pub fn log_throttled(wait: Duration) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(wait_ms = wait.as_millis() as u64, "waiting for rate-limit capacity");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = wait;
	}
}

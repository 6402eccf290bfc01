// self
use crate::{
	_prelude::*,
	client::ComplianceClient,
	config::RetryPolicy,
	obs::{self, OperationKind},
};

impl ComplianceClient {
	/// Runs `operation` behind the circuit breaker with bounded exponential backoff.
	///
	/// The breaker sees the whole retry loop as one call. Inside it, transient failures (429,
	/// 5xx, transport errors) are retried up to the configured attempt count; anything else is
	/// returned at once.
	pub async fn execute_with_retry<F, Fut, T>(&self, kind: OperationKind, operation: F) -> Result<T>
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<T>>,
	{
		let policy = self.inner.config.retry;

		self.inner.breaker.execute(|| retry_with_backoff(kind, &policy, operation)).await
	}
}

pub(crate) async fn retry_with_backoff<F, Fut, T>(
	kind: OperationKind,
	policy: &RetryPolicy,
	mut operation: F,
) -> Result<T>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T>>,
{
	let max_attempts = policy.max_attempts();
	let mut attempt = 1;

	loop {
		match operation().await {
			Ok(value) => return Ok(value),
			Err(err) if err.is_transient() && attempt < max_attempts => {
				let delay = policy.backoff(attempt);

				obs::log_retry(kind, attempt, delay, &err);
				obs::record_retry(kind);
				tokio::time::sleep(delay).await;

				attempt += 1;
			},
			Err(err) => return Err(err),
		}
	}
}

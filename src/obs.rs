//! Optional observability helpers for client operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` (on by default) to emit structured spans named
//!   `dnc_compliance.operation` with the `operation` and `stage` fields, plus events for retries,
//!   surfaced failures, and circuit breaker transitions.
//! - Enable `metrics` to increment the `dnc_compliance_operation_total` counter for every
//!   attempt/success/failure (labeled by `operation` + `outcome`) and the
//!   `dnc_compliance_retry_total` counter for every scheduled retry.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Client operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
	/// Client-credentials exchange.
	Authenticate,
	/// Refresh-token exchange.
	RefreshToken,
	/// Single batch submission.
	SubmitBatch,
	/// Batch results lookup.
	GetResults,
	/// Polling loop around [`OperationKind::GetResults`].
	WaitForCompletion,
}
impl OperationKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OperationKind::Authenticate => "authenticate",
			OperationKind::RefreshToken => "refresh_token",
			OperationKind::SubmitBatch => "submit_batch",
			OperationKind::GetResults => "get_results",
			OperationKind::WaitForCompletion => "wait_for_completion",
		}
	}
}
impl Display for OperationKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationOutcome {
	/// Entry to an operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl OperationOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OperationOutcome::Attempt => "attempt",
			OperationOutcome::Success => "success",
			OperationOutcome::Failure => "failure",
		}
	}
}
impl Display for OperationOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Records the final outcome of `result` for `kind`.
pub fn record_result<T>(kind: OperationKind, result: &Result<T>) {
	match result {
		Ok(_) => record_operation_outcome(kind, OperationOutcome::Success),
		Err(err) => {
			record_operation_outcome(kind, OperationOutcome::Failure);
			log_failure(kind, err);
		},
	}
}

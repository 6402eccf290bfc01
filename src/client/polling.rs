// std
use std::time::Instant;
// self
use crate::{
	_prelude::*,
	client::ComplianceClient,
	model::{BatchResultsResponse, BatchStatus},
	obs::{self, OperationKind, OperationOutcome, OperationSpan},
};

/// Polling cadence and deadline for [`ComplianceClient::wait_for_completion`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitOptions {
	/// Pause between results lookups.
	pub polling_interval: Duration,
	/// Deadline after which waiting stops. The batch keeps running server-side.
	pub max_wait: Duration,
}
impl Default for WaitOptions {
	fn default() -> Self {
		Self { polling_interval: Duration::from_secs(5), max_wait: Duration::from_secs(300) }
	}
}

impl ComplianceClient {
	/// Polls a batch until it completes, fails, or `options.max_wait` elapses.
	///
	/// A `failed` batch yields [`ErrorCode::BatchProcessingFailed`] and an elapsed deadline
	/// yields [`ErrorCode::BatchProcessingTimeout`]; lookup errors are returned as they are.
	pub async fn wait_for_completion(
		&self,
		batch_id: &str,
		options: WaitOptions,
	) -> Result<BatchResultsResponse> {
		const KIND: OperationKind = OperationKind::WaitForCompletion;

		let span = OperationSpan::new(KIND, "wait_for_completion");

		obs::record_operation_outcome(KIND, OperationOutcome::Attempt);

		let result = span
			.instrument(poll_until_terminal(batch_id, options, move || self.get_results(batch_id)))
			.await;

		obs::record_result(KIND, &result);

		result
	}
}

pub(crate) async fn poll_until_terminal<F, Fut>(
	batch_id: &str,
	options: WaitOptions,
	mut fetch: F,
) -> Result<BatchResultsResponse>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<BatchResultsResponse>>,
{
	let started = Instant::now();

	loop {
		let response = fetch().await?;

		match response.status {
			BatchStatus::Completed => return Ok(response),
			BatchStatus::Failed => {
				return Err(Error::new(
					ErrorCode::BatchProcessingFailed,
					format!("Batch {batch_id} failed during processing."),
				)
				.with_details(serde_json::json!({ "batchId": batch_id })));
			},
			BatchStatus::Queued | BatchStatus::Processing => {},
		}

		let elapsed = started.elapsed();

		if elapsed >= options.max_wait {
			return Err(Error::new(
				ErrorCode::BatchProcessingTimeout,
				format!(
					"Batch {batch_id} did not finish within {}ms.",
					options.max_wait.as_millis()
				),
			)
			.with_details(serde_json::json!({ "batchId": batch_id })));
		}

		tokio::time::sleep(options.polling_interval.min(options.max_wait - elapsed)).await;
	}
}

// crates.io
use futures::future;
// self
use crate::{
	_prelude::*,
	client::{ComplianceClient, WaitOptions},
	config::MAX_BATCH_SIZE,
	model::{BatchResultsResponse, BatchSubmission, CustomerRecord, ScreeningOptions},
};

/// Splits `records` into consecutive chunks of at most [`MAX_BATCH_SIZE`] records.
pub fn split_into_batches(records: &[CustomerRecord]) -> Vec<&[CustomerRecord]> {
	records.chunks(MAX_BATCH_SIZE).collect()
}

impl ComplianceClient {
	/// Submits any number of records as consecutive batches.
	///
	/// Batches go out in groups of the configured concurrency with the configured pause between
	/// groups. Submissions are returned in input order; the first failure aborts the remaining
	/// groups.
	pub async fn submit_multiple_batches(
		&self,
		records: &[CustomerRecord],
	) -> Result<Vec<BatchSubmission>> {
		self.submit_in_groups(records, ScreeningOptions::default()).await
	}

	/// Submits every record, waits for each batch to finish, and returns the final results in
	/// submission order.
	pub async fn screen_records(
		&self,
		records: &[CustomerRecord],
		options: ScreeningOptions,
		wait: WaitOptions,
	) -> Result<Vec<BatchResultsResponse>> {
		let submissions = self.submit_in_groups(records, options).await?;

		future::try_join_all(
			submissions
				.iter()
				.map(|submission| self.wait_for_completion(&submission.batch_id, wait)),
		)
		.await
	}

	async fn submit_in_groups(
		&self,
		records: &[CustomerRecord],
		options: ScreeningOptions,
	) -> Result<Vec<BatchSubmission>> {
		if records.is_empty() {
			return Err(Error::invalid_request("At least one record is required."));
		}

		let batches = split_into_batches(records);
		let policy = self.inner.config.batch;
		let mut submissions = Vec::with_capacity(batches.len());

		for (idx, group) in batches.chunks(policy.concurrency).enumerate() {
			if idx > 0 {
				tokio::time::sleep(policy.group_delay).await;
			}

			let accepted = future::try_join_all(
				group.iter().map(|batch| self.submit_batch_with_options(batch, options)),
			)
			.await?;

			submissions.extend(accepted);
		}

		Ok(submissions)
	}
}

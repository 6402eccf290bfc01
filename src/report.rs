//! Pure reporting helpers over batch results.

// std
use std::slice;
// self
use crate::{
	_prelude::*,
	model::{BatchResultsResponse, DncCheckResult, DncStatus},
};

/// Headline counts for a report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct ReportSummary {
	/// Records covered by the report.
	pub total_processed: usize,
	/// Records screened clean.
	pub compliant: usize,
	/// Records flagged by at least one list.
	pub non_compliant: usize,
	/// Records the service could not screen.
	pub errors: usize,
	/// `compliant / total_processed * 100`, or `0` when nothing was processed.
	pub compliance_rate: f64,
}

/// Number of records that tripped each flag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ViolationTally {
	/// National registry matches.
	pub federal_dnc: usize,
	/// State registry matches.
	pub state_dnc: usize,
	/// Internal suppression list matches.
	pub internal_dnc: usize,
	/// Wireless numbers.
	pub wireless: usize,
	/// TCPA consent violations.
	pub tcpa_violation: usize,
}

/// Compliance report over one or more batches.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ComplianceReport {
	/// Headline counts.
	pub summary: ReportSummary,
	/// Per-flag counts.
	pub violations: ViolationTally,
	/// Follow-up actions, one per non-zero violation category.
	pub recommendations: Vec<String>,
}

/// Returns the records that screened clean.
pub fn filter_clean_records(results: &[DncCheckResult]) -> Vec<DncCheckResult> {
	results.iter().filter(|result| result.status == DncStatus::Clean).cloned().collect()
}

/// Builds a report for a single batch.
///
/// Headline counts come from the service's batch summary; the violation tally is counted over
/// the per-record results.
pub fn generate_compliance_report(batch: &BatchResultsResponse) -> ComplianceReport {
	build_report(slice::from_ref(batch))
}

/// Builds one report spanning several batches by summing their summaries and tallies.
pub fn generate_combined_report(batches: &[BatchResultsResponse]) -> ComplianceReport {
	build_report(batches)
}

fn build_report(batches: &[BatchResultsResponse]) -> ComplianceReport {
	let mut summary = ReportSummary::default();
	let mut violations = ViolationTally::default();

	for batch in batches {
		summary.total_processed += batch.summary.total_records;
		summary.compliant += batch.summary.clean_records;
		summary.non_compliant += batch.summary.flagged_records;
		summary.errors += batch.summary.error_records;

		for flags in batch.results.iter().map(|result| &result.flags) {
			violations.federal_dnc += usize::from(flags.federal_dnc);
			violations.state_dnc += usize::from(flags.state_dnc);
			violations.internal_dnc += usize::from(flags.internal_dnc);
			violations.wireless += usize::from(flags.wireless);
			violations.tcpa_violation += usize::from(flags.tcpa_violation);
		}
	}

	if summary.total_processed > 0 {
		summary.compliance_rate = summary.compliant as f64 / summary.total_processed as f64 * 100.;
	}

	ComplianceReport { summary, violations, recommendations: recommendations(&violations) }
}

fn recommendations(violations: &ViolationTally) -> Vec<String> {
	[
		(
			violations.federal_dnc,
			"Remove numbers on the National Do-Not-Call Registry from calling lists.",
		),
		(violations.state_dnc, "Suppress numbers listed on state Do-Not-Call registries."),
		(violations.internal_dnc, "Honor internal opt-out requests before the next campaign."),
		(
			violations.wireless,
			"Obtain prior express consent before autodialing or texting wireless numbers.",
		),
		(
			violations.tcpa_violation,
			"Review consent records for contacts flagged with TCPA violations.",
		),
	]
	.into_iter()
	.filter(|(count, _)| *count > 0)
	.map(|(_, advice)| advice.to_owned())
	.collect()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::model::{BatchStatus, BatchSummary, DncFlags};

	fn result(id: &str, status: DncStatus, flags: DncFlags) -> DncCheckResult {
		DncCheckResult {
			record_id: id.into(),
			phone_number: format!("+1555{id}"),
			status,
			flags,
			details: None,
			errors: None,
		}
	}

	fn batch(results: Vec<DncCheckResult>) -> BatchResultsResponse {
		let count = |status| results.iter().filter(|result| result.status == status).count();
		let summary = BatchSummary {
			total_records: results.len(),
			clean_records: count(DncStatus::Clean),
			flagged_records: count(DncStatus::Flagged),
			error_records: count(DncStatus::Error),
		};

		BatchResultsResponse {
			batch_id: "b-1".into(),
			status: BatchStatus::Completed,
			results,
			summary,
			completed_at: None,
		}
	}

	fn mixed_batch() -> BatchResultsResponse {
		batch(vec![
			result("1", DncStatus::Clean, DncFlags::default()),
			result(
				"2",
				DncStatus::Flagged,
				DncFlags { federal_dnc: true, wireless: true, tcpa_violation: true, ..Default::default() },
			),
		])
	}

	#[test]
	fn one_clean_one_flagged_is_half_compliant() {
		let report = generate_compliance_report(&mixed_batch());

		assert_eq!(report.summary.total_processed, 2);
		assert_eq!(report.summary.compliant, 1);
		assert_eq!(report.summary.non_compliant, 1);
		assert_eq!(report.summary.compliance_rate, 50.0);
		assert_eq!(report.violations.federal_dnc, 1);
		assert_eq!(report.violations.state_dnc, 0);

		assert_eq!(
			report.recommendations,
			[
				"Remove numbers on the National Do-Not-Call Registry from calling lists.",
				"Obtain prior express consent before autodialing or texting wireless numbers.",
				"Review consent records for contacts flagged with TCPA violations.",
			]
		);
	}

	#[test]
	fn headline_counts_come_from_the_service_summary() {
		let mut summarized = batch(Vec::new());

		summarized.summary = BatchSummary {
			total_records: 10,
			clean_records: 9,
			flagged_records: 1,
			error_records: 0,
		};

		let report = generate_compliance_report(&summarized);

		assert_eq!(report.summary.total_processed, 10);
		assert_eq!(report.summary.compliant, 9);
		assert_eq!(report.summary.non_compliant, 1);
		assert_eq!(report.summary.compliance_rate, 90.0);
		assert_eq!(report.violations, ViolationTally::default());
	}

	#[test]
	fn empty_batches_report_zero_rate() {
		let report = generate_compliance_report(&batch(Vec::new()));

		assert_eq!(report.summary, ReportSummary::default());
		assert!(report.recommendations.is_empty());
	}

	#[test]
	fn clean_filter_keeps_only_clean_records() {
		let clean = filter_clean_records(&mixed_batch().results);

		assert_eq!(clean.len(), 1);
		assert_eq!(clean[0].record_id, "1");
	}

	#[test]
	fn combined_reports_span_batches() {
		let errored = batch(vec![result(
			"3",
			DncStatus::Error,
			DncFlags { state_dnc: true, ..Default::default() },
		)]);
		let report = generate_combined_report(&[mixed_batch(), errored]);

		assert_eq!(report.summary.total_processed, 3);
		assert_eq!(report.summary.errors, 1);
		assert_eq!(report.violations.state_dnc, 1);
		assert_eq!(report.recommendations.len(), 4);
	}
}

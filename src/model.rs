//! Wire types exchanged with the compliance API.

// crates.io
use serde_json::Value;
// self
use crate::_prelude::*;

/// Customer record submitted for screening.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRecord {
	/// Caller-side identifier echoed back as `recordId`.
	pub id: String,
	/// Phone number to screen.
	pub phone_number: String,
	/// Customer name.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	/// Customer email.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub email: Option<String>,
	/// Postal code, used for state-level lists.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub zip: Option<String>,
	/// Free-form metadata passed through untouched.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub metadata: Option<Value>,
}
impl CustomerRecord {
	/// Creates a record with only the required fields.
	pub fn new(id: impl Into<String>, phone_number: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			phone_number: phone_number.into(),
			name: None,
			email: None,
			zip: None,
			metadata: None,
		}
	}

	/// Sets the customer name.
	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());

		self
	}

	/// Sets the customer email.
	pub fn with_email(mut self, email: impl Into<String>) -> Self {
		self.email = Some(email.into());

		self
	}

	/// Sets the postal code.
	pub fn with_zip(mut self, zip: impl Into<String>) -> Self {
		self.zip = Some(zip.into());

		self
	}

	/// Attaches pass-through metadata.
	pub fn with_metadata(mut self, metadata: Value) -> Self {
		self.metadata = Some(metadata);

		self
	}
}

/// Server-side batch lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
	/// Accepted, not yet started.
	Queued,
	/// Being screened.
	Processing,
	/// Finished; results are final.
	Completed,
	/// Finished unsuccessfully.
	Failed,
}
impl BatchStatus {
	/// Returns `true` for `completed` and `failed`.
	pub const fn is_terminal(self) -> bool {
		matches!(self, BatchStatus::Completed | BatchStatus::Failed)
	}
}

/// Acknowledgement returned when a batch is accepted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSubmission {
	/// Server-assigned batch identifier.
	pub batch_id: String,
	/// Initial status.
	pub status: BatchStatus,
	/// Records the server accepted.
	pub record_count: usize,
	/// Submission timestamp as reported by the server.
	pub submitted_at: String,
}

/// Lists and checks to run against each record. Every check is on by default.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreeningOptions {
	/// National Do-Not-Call registry.
	#[serde(rename = "includeFederalDNC")]
	pub include_federal_dnc: bool,
	/// State registries.
	#[serde(rename = "includeStateDNC")]
	pub include_state_dnc: bool,
	/// Internal suppression list.
	#[serde(rename = "includeInternalDNC")]
	pub include_internal_dnc: bool,
	/// Wireless number detection.
	#[serde(rename = "includeWirelessCheck")]
	pub include_wireless_check: bool,
	/// TCPA consent checks.
	#[serde(rename = "includeTCPACompliance")]
	pub include_tcpa_compliance: bool,
}
impl Default for ScreeningOptions {
	fn default() -> Self {
		Self {
			include_federal_dnc: true,
			include_state_dnc: true,
			include_internal_dnc: true,
			include_wireless_check: true,
			include_tcpa_compliance: true,
		}
	}
}

#[derive(Debug, Serialize)]
pub(crate) struct BatchRequest<'a> {
	pub(crate) records: &'a [CustomerRecord],
	pub(crate) options: ScreeningOptions,
}

/// Screening verdict for one record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DncStatus {
	/// No list matched.
	Clean,
	/// At least one list matched.
	Flagged,
	/// The record could not be screened.
	Error,
}

/// Per-list match flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DncFlags {
	/// Listed on the national registry.
	#[serde(rename = "federalDNC")]
	pub federal_dnc: bool,
	/// Listed on a state registry.
	#[serde(rename = "stateDNC")]
	pub state_dnc: bool,
	/// Listed on the internal suppression list.
	#[serde(rename = "internalDNC")]
	pub internal_dnc: bool,
	/// Number is wireless.
	pub wireless: bool,
	/// Contact would violate TCPA consent rules.
	#[serde(rename = "tcpaViolation")]
	pub tcpa_violation: bool,
}

/// Screening result for one record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DncCheckResult {
	/// Identifier of the submitted record.
	pub record_id: String,
	/// Screened phone number.
	pub phone_number: String,
	/// Verdict.
	pub status: DncStatus,
	/// Per-list flags.
	#[serde(default)]
	pub flags: DncFlags,
	/// Opaque extra data from the service.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub details: Option<Value>,
	/// Screening errors for this record.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub errors: Option<Vec<String>>,
}

/// Per-batch counters reported by the service.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BatchSummary {
	/// Records in the batch.
	pub total_records: usize,
	/// Records with no match.
	pub clean_records: usize,
	/// Records with at least one match.
	pub flagged_records: usize,
	/// Records that could not be screened.
	pub error_records: usize,
}

/// Results lookup for one batch. `results` and `summary` are empty while the batch runs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResultsResponse {
	/// Batch identifier.
	pub batch_id: String,
	/// Current status.
	pub status: BatchStatus,
	/// Per-record results.
	#[serde(default)]
	pub results: Vec<DncCheckResult>,
	/// Aggregate counters.
	#[serde(default)]
	pub summary: BatchSummary,
	/// Completion timestamp, once terminal.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub completed_at: Option<String>,
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	#[test]
	fn records_serialize_with_camel_case_and_skip_absent_fields() {
		let record = CustomerRecord::new("c-1", "+15550000001").with_zip("94107");

		assert_eq!(
			serde_json::to_value(&record).expect("Record should serialize."),
			json!({ "id": "c-1", "phoneNumber": "+15550000001", "zip": "94107" })
		);
	}

	#[test]
	fn screening_options_use_the_service_field_names() {
		assert_eq!(
			serde_json::to_value(ScreeningOptions::default()).expect("Options should serialize."),
			json!({
				"includeFederalDNC": true,
				"includeStateDNC": true,
				"includeInternalDNC": true,
				"includeWirelessCheck": true,
				"includeTCPACompliance": true,
			})
		);
	}

	#[test]
	fn processing_responses_default_results_and_summary() {
		let response: BatchResultsResponse =
			serde_json::from_value(json!({ "batchId": "b-1", "status": "processing" }))
				.expect("Partial response should decode.");

		assert_eq!(response.status, BatchStatus::Processing);
		assert!(response.results.is_empty());
		assert_eq!(response.summary, BatchSummary::default());
		assert!(!response.status.is_terminal());
	}

	#[test]
	fn results_decode_flag_names() {
		let result: DncCheckResult = serde_json::from_value(json!({
			"recordId": "c-1",
			"phoneNumber": "+15550000001",
			"status": "flagged",
			"flags": { "federalDNC": true, "tcpaViolation": true },
		}))
		.expect("Result should decode.");

		assert_eq!(result.status, DncStatus::Flagged);
		assert!(result.flags.federal_dnc && result.flags.tcpa_violation);
		assert!(!result.flags.wireless);
	}
}

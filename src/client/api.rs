//! Request/response plumbing for the compliance API.

// crates.io
use reqwest::{
	Method, StatusCode,
	header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue},
};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	client::ComplianceClient,
	config::MAX_BATCH_SIZE,
	http::{self, RateLimitHeaders},
	model::{BatchRequest, BatchResultsResponse, BatchSubmission, CustomerRecord, ScreeningOptions},
	obs::{self, OperationKind, OperationOutcome, OperationSpan},
};

impl ComplianceClient {
	/// Submits one batch with every screening check enabled.
	///
	/// Empty input fails with [`ErrorCode::InvalidRequest`] and more than
	/// [`MAX_BATCH_SIZE`](crate::config::MAX_BATCH_SIZE) records with
	/// [`ErrorCode::BatchSizeExceeded`], both before any network call.
	pub async fn submit_batch(&self, records: &[CustomerRecord]) -> Result<BatchSubmission> {
		self.submit_batch_with_options(records, ScreeningOptions::default()).await
	}

	/// Submits one batch with caller-selected screening checks.
	pub async fn submit_batch_with_options(
		&self,
		records: &[CustomerRecord],
		options: ScreeningOptions,
	) -> Result<BatchSubmission> {
		const KIND: OperationKind = OperationKind::SubmitBatch;

		if records.is_empty() {
			return Err(Error::invalid_request("At least one record is required."));
		}
		if records.len() > MAX_BATCH_SIZE {
			return Err(Error::new(
				ErrorCode::BatchSizeExceeded,
				format!(
					"Batch holds {} records but the service accepts at most {MAX_BATCH_SIZE}.",
					records.len()
				),
			));
		}

		let span = OperationSpan::new(KIND, "submit_batch");

		obs::record_operation_outcome(KIND, OperationOutcome::Attempt);

		let result = span
			.instrument(async {
				self.initialize().await?;

				let body = serde_json::to_vec(&BatchRequest { records, options }).map_err(|e| {
					Error::invalid_request(format!("Batch could not be encoded: {e}."))
				})?;
				let url = self.endpoint(&["dnc", "batch"])?;
				let (url, body) = (&url, body.as_slice());

				self.execute_with_retry(KIND, move || self.send(Method::POST, url.clone(), Some(body)))
					.await
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	/// Fetches the current results of a batch.
	pub async fn get_results(&self, batch_id: &str) -> Result<BatchResultsResponse> {
		const KIND: OperationKind = OperationKind::GetResults;

		if batch_id.trim().is_empty() {
			return Err(Error::invalid_request("A batch identifier is required."));
		}

		let span = OperationSpan::new(KIND, "get_results");

		obs::record_operation_outcome(KIND, OperationOutcome::Attempt);

		let result = span
			.instrument(async {
				self.initialize().await?;

				let url = self.endpoint(&["dnc", "batch", batch_id, "results"])?;
				let url = &url;

				self.execute_with_retry(KIND, move || self.send(Method::GET, url.clone(), None)).await
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	/// Appends `segments` to the API base, percent-encoding each one.
	fn endpoint(&self, segments: &[&str]) -> Result<Url> {
		let mut url = self.inner.config.endpoints.base.clone();

		url.path_segments_mut()
			.map_err(|_| {
				Error::new(ErrorCode::InvalidConfig, "The API base URL cannot carry a path.")
			})?
			.pop_if_empty()
			.extend(segments);

		Ok(url)
	}

	/// One attempt: wait for capacity, attach the token, send, and classify the response.
	async fn send<T>(&self, method: Method, url: Url, body: Option<&[u8]>) -> Result<T>
	where
		T: DeserializeOwned,
	{
		self.inner.limiter.wait_for_capacity().await;

		let token = self.inner.tokens.access_token().await?;
		let bearer = HeaderValue::from_str(&token.bearer()).map_err(|_| {
			Error::new(ErrorCode::AuthUnexpectedError, "Access token is not a valid header value.")
		})?;
		let mut request = self.inner.http_client.request(method, url).header(AUTHORIZATION, bearer);

		if let Some(body) = body {
			request = request.header(CONTENT_TYPE, "application/json").body(body.to_vec());
		}

		let response = request.send().await.map_err(network_error)?;
		let status = response.status();

		self.inner.limiter.update_from_headers(&RateLimitHeaders::from_headers(response.headers()));

		let bytes = response.bytes().await.map_err(network_error)?;

		if status.is_success() {
			return decode(status, &bytes);
		}
		if status == StatusCode::UNAUTHORIZED {
			self.invalidate_session();
		}

		Err(classify_status(status, &bytes))
	}
}

fn network_error(err: ReqwestError) -> Error {
	Error::new(ErrorCode::NetworkError, format!("Request to the compliance API failed: {err}."))
}

fn decode<T>(status: StatusCode, bytes: &[u8]) -> Result<T>
where
	T: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_slice(bytes);

	serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
		Error::new(
			ErrorCode::ApiError,
			format!("Response body could not be decoded at `{}`: {}.", e.path(), e.inner()),
		)
		.with_status(status.as_u16())
	})
}

fn classify_status(status: StatusCode, bytes: &[u8]) -> Error {
	let code = match status {
		StatusCode::TOO_MANY_REQUESTS => ErrorCode::RateLimitExceeded,
		StatusCode::UNAUTHORIZED => ErrorCode::AuthFailed,
		_ => ErrorCode::ApiError,
	};
	let message = match code {
		ErrorCode::RateLimitExceeded => "Compliance API throttled the request.".to_owned(),
		ErrorCode::AuthFailed => "Compliance API rejected the bearer token.".to_owned(),
		_ => format!("Compliance API responded with status {status}."),
	};
	let error = Error::new(code, message).with_status(status.as_u16());

	match http::body_details(bytes) {
		Some(details) => error.with_details(details),
		None => error,
	}
}

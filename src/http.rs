//! Transport primitives shared by the credential exchange and the compliance API.
//!
//! [`ReqwestHttpClient`] wraps the configured reqwest client. Token exchanges run through
//! [`InstrumentedHandle`], an `oauth2` [`AsyncHttpClient`] that records the HTTP status of the
//! most recent response in a [`ResponseMetadataSlot`] so failures can be classified by status
//! after the `oauth2` crate has flattened them. Every response, successful or not, is also
//! scanned for the service's `x-ratelimit-*` headers via [`RateLimitHeaders::from_headers`].

// std
use std::ops::Deref;
// crates.io
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};
use reqwest::{header::HeaderMap, redirect::Policy};
use serde_json::Value;
// self
use crate::{_prelude::*, error::ConfigError};

/// Header carrying the window capacity the service enforces.
pub const RATE_LIMIT_LIMIT: &str = "x-ratelimit-limit";
/// Header carrying the requests left in the current window.
pub const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
/// Header carrying the window reset time (epoch seconds).
pub const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";

/// Rate-limit state reported by the service. Every field is optional; a missing or malformed
/// header simply leaves the field unset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitHeaders {
	/// Capacity of the window the service counted this request against.
	pub limit: Option<u32>,
	/// Requests left in that window.
	pub remaining: Option<u32>,
	/// Reset time in epoch seconds.
	pub reset: Option<i64>,
}
impl RateLimitHeaders {
	/// Extracts the `x-ratelimit-*` headers from a response.
	pub fn from_headers(headers: &HeaderMap) -> Self {
		Self {
			limit: header_value(headers, RATE_LIMIT_LIMIT),
			remaining: header_value(headers, RATE_LIMIT_REMAINING),
			reset: header_value(headers, RATE_LIMIT_RESET),
		}
	}

	/// Returns `true` when no rate-limit header was present.
	pub fn is_empty(&self) -> bool {
		self.limit.is_none() && self.remaining.is_none() && self.reset.is_none()
	}
}

/// Captures metadata from the most recent HTTP response for downstream error mapping.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadata {
	/// HTTP status code returned by the endpoint, if available.
	pub status: Option<u16>,
	/// Rate-limit headers returned alongside the status.
	pub rate_limit: RateLimitHeaders,
}

/// Thread-safe slot for sharing [`ResponseMetadata`] between transport and error layers.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadataSlot(Arc<Mutex<Option<ResponseMetadata>>>);
impl ResponseMetadataSlot {
	/// Stores new metadata for the current request.
	pub fn store(&self, meta: ResponseMetadata) {
		*self.0.lock() = Some(meta);
	}

	/// Returns the captured metadata, if any, consuming it from the slot.
	pub fn take(&self) -> Option<ResponseMetadata> {
		self.0.lock().take()
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Neither the token endpoint nor the batch API is expected to redirect, so redirects are
/// never followed.
#[derive(Clone, Debug)]
pub struct ReqwestHttpClient(pub ReqwestClient);
impl ReqwestHttpClient {
	/// Builds a client that enforces `timeout` on every request.
	pub fn with_timeout(timeout: Duration) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder().timeout(timeout).redirect(Policy::none()).build()?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds an instrumented handle that records response metadata in `slot`.
	pub fn instrumented(&self, slot: ResponseMetadataSlot) -> InstrumentedHandle {
		InstrumentedHandle(Arc::new(InstrumentedHttpClient { client: self.0.clone(), slot }))
	}
}
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

struct InstrumentedHttpClient {
	client: ReqwestClient,
	slot: ResponseMetadataSlot,
}

/// [`AsyncHttpClient`] handle returned by [`ReqwestHttpClient::instrumented`].
#[derive(Clone)]
pub struct InstrumentedHandle(Arc<InstrumentedHttpClient>);
impl<'c> AsyncHttpClient<'c> for InstrumentedHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let client = Arc::clone(&self.0);

		Box::pin(async move {
			client.slot.take();

			let response = client
				.client
				.execute(request.try_into().map_err(Box::new)?)
				.await
				.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();

			client.slot.store(ResponseMetadata {
				status: Some(status.as_u16()),
				rate_limit: RateLimitHeaders::from_headers(&headers),
			});

			let mut response_new =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

/// Turns an error body into a details payload: JSON when it parses, raw text otherwise.
pub(crate) fn body_details(body: &[u8]) -> Option<Value> {
	if body.is_empty() {
		return None;
	}

	serde_json::from_slice(body)
		.ok()
		.or_else(|| Some(Value::String(String::from_utf8_lossy(body).into_owned())))
}

fn header_value<T>(headers: &HeaderMap, name: &str) -> Option<T>
where
	T: FromStr,
{
	headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

//! Client-level error types shared across authentication, throttling, and batch operations.

// crates.io
use serde_json::Value;
// self
use crate::_prelude::*;

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Stable error codes surfaced to callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	/// Token endpoint rejected the client credentials (HTTP 401).
	AuthInvalidCredentials,
	/// Token endpoint rejected the request shape (HTTP 400).
	AuthInvalidRequest,
	/// Token endpoint failed with another HTTP status, or the API answered 401.
	AuthFailed,
	/// Credential exchange failed without an HTTP status.
	AuthUnexpectedError,
	/// Caller supplied empty input.
	InvalidRequest,
	/// Batch holds more records than the service accepts.
	BatchSizeExceeded,
	/// Service throttled the request (HTTP 429).
	RateLimitExceeded,
	/// Circuit breaker is open.
	ServiceUnavailable,
	/// Service reported the batch as failed.
	BatchProcessingFailed,
	/// Polling deadline elapsed before the batch reached a terminal state.
	BatchProcessingTimeout,
	/// Any other HTTP failure from the compliance API.
	ApiError,
	/// Transport failure without an HTTP status.
	NetworkError,
	/// Construction-time configuration problem.
	InvalidConfig,
}
impl ErrorCode {
	/// Returns the stable wire label for the code.
	pub const fn as_str(self) -> &'static str {
		match self {
			ErrorCode::AuthInvalidCredentials => "AUTH_INVALID_CREDENTIALS",
			ErrorCode::AuthInvalidRequest => "AUTH_INVALID_REQUEST",
			ErrorCode::AuthFailed => "AUTH_FAILED",
			ErrorCode::AuthUnexpectedError => "AUTH_UNEXPECTED_ERROR",
			ErrorCode::InvalidRequest => "INVALID_REQUEST",
			ErrorCode::BatchSizeExceeded => "BATCH_SIZE_EXCEEDED",
			ErrorCode::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
			ErrorCode::ServiceUnavailable => "SERVICE_UNAVAILABLE",
			ErrorCode::BatchProcessingFailed => "BATCH_PROCESSING_FAILED",
			ErrorCode::BatchProcessingTimeout => "BATCH_PROCESSING_TIMEOUT",
			ErrorCode::ApiError => "API_ERROR",
			ErrorCode::NetworkError => "NETWORK_ERROR",
			ErrorCode::InvalidConfig => "INVALID_CONFIG",
		}
	}

	/// Returns `true` for the credential-exchange family of codes.
	pub const fn is_auth(self) -> bool {
		matches!(
			self,
			ErrorCode::AuthInvalidCredentials
				| ErrorCode::AuthInvalidRequest
				| ErrorCode::AuthFailed
				| ErrorCode::AuthUnexpectedError
		)
	}
}
impl Display for ErrorCode {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Canonical client error exposed by public APIs.
///
/// The type is `Clone` so a single refresh outcome can be handed to every caller that waited on
/// it.
#[derive(Clone, Debug, ThisError)]
#[error("[{code}] {message}")]
pub struct Error {
	/// Stable classification.
	pub code: ErrorCode,
	/// Human-readable summary.
	pub message: String,
	/// HTTP status code, when one was observed.
	pub status: Option<u16>,
	/// Opaque payload (usually the response body) kept for logging.
	pub details: Option<Value>,
}
impl Error {
	/// Creates an error without status or details.
	pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
		Self { code, message: message.into(), status: None, details: None }
	}

	/// Attaches an HTTP status code.
	pub fn with_status(mut self, status: u16) -> Self {
		self.status = Some(status);

		self
	}

	/// Attaches an opaque details payload.
	pub fn with_details(mut self, details: Value) -> Self {
		self.details = Some(details);

		self
	}

	/// Returns `true` for 4xx responses the caller must fix; 429 is excluded because the
	/// service uses it for transient throttling.
	pub fn is_client_error(&self) -> bool {
		matches!(self.status, Some(status) if (400..500).contains(&status) && status != 429)
	}

	/// Returns `true` when another attempt may succeed without caller intervention.
	///
	/// Throttling, transport failures, and 5xx answers qualify. An [`ErrorCode::ApiError`] on a
	/// success status (an undecodable body) does not.
	pub fn is_transient(&self) -> bool {
		match self.code {
			ErrorCode::RateLimitExceeded | ErrorCode::NetworkError => true,
			ErrorCode::ApiError => matches!(self.status, Some(status) if status >= 500),
			_ => false,
		}
	}

	pub(crate) fn invalid_request(message: impl Into<String>) -> Self {
		Self::new(ErrorCode::InvalidRequest, message)
	}

	pub(crate) fn service_unavailable() -> Self {
		Self::new(ErrorCode::ServiceUnavailable, "Compliance service is temporarily unavailable.")
			.with_status(503)
	}
}
impl From<ConfigError> for Error {
	fn from(e: ConfigError) -> Self {
		Self::new(ErrorCode::InvalidConfig, e.to_string())
	}
}

/// Configuration and validation failures raised while building a client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// An endpoint URL cannot be parsed.
	#[error("The {endpoint} endpoint URL is invalid.")]
	InvalidEndpoint {
		/// Which endpoint failed to parse.
		endpoint: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A required credential is empty.
	#[error("The {field} must not be empty.")]
	MissingCredential {
		/// Name of the missing field.
		field: &'static str,
	},
	/// Request timeout is below the supported floor.
	#[error("Request timeout must be at least 1000ms, got {millis}ms.")]
	TimeoutTooShort {
		/// Configured timeout in milliseconds.
		millis: u128,
	},
	/// A configured rate-limit window is zero.
	#[error("The {window} rate limit must be greater than zero.")]
	ZeroRateLimit {
		/// Window label (second, minute, hour).
		window: &'static str,
	},
	/// Batch submission concurrency is zero.
	#[error("Batch concurrency must be at least 1.")]
	ZeroConcurrency,
	/// Circuit breaker threshold is zero.
	#[error("Circuit breaker failure threshold must be at least 1.")]
	ZeroFailureThreshold,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn client_error_range_excludes_throttling() {
		let bad_request = Error::new(ErrorCode::ApiError, "bad").with_status(400);
		let throttled = Error::new(ErrorCode::RateLimitExceeded, "slow down").with_status(429);
		let server = Error::new(ErrorCode::ApiError, "boom").with_status(502);

		assert!(bad_request.is_client_error());
		assert!(!bad_request.is_transient());
		assert!(!throttled.is_client_error());
		assert!(throttled.is_transient());
		assert!(server.is_transient());
		assert!(!Error::new(ErrorCode::ApiError, "bad body").with_status(200).is_transient());
	}

	#[test]
	fn auth_errors_never_retry() {
		let err = Error::new(ErrorCode::AuthFailed, "token endpoint down").with_status(500);

		assert!(err.code.is_auth());
		assert!(!err.is_transient());
	}

	#[test]
	fn config_errors_convert_to_invalid_config() {
		let err = Error::from(ConfigError::TimeoutTooShort { millis: 10 });

		assert_eq!(err.code, ErrorCode::InvalidConfig);
		assert_eq!(err.to_string(), "[INVALID_CONFIG] Request timeout must be at least 1000ms, got 10ms.");
	}

	#[test]
	fn codes_serialize_to_wire_labels() {
		let encoded = serde_json::to_string(&ErrorCode::BatchProcessingTimeout)
			.expect("Error code should serialize.");

		assert_eq!(encoded, "\"BATCH_PROCESSING_TIMEOUT\"");
		assert_eq!(ErrorCode::BatchProcessingTimeout.as_str(), "BATCH_PROCESSING_TIMEOUT");
	}
}

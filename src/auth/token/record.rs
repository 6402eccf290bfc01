//! OAuth2 token record and freshness helpers.

// self
use crate::{_prelude::*, auth::TokenSecret, clock};

/// Access token issued by the compliance service's token endpoint.
///
/// Records are immutable; a refresh replaces the whole value.
#[derive(Clone, Serialize, Deserialize)]
pub struct OAuth2Token {
	/// Bearer token attached to API calls.
	pub access_token: TokenSecret,
	/// Token type reported by the endpoint (normally `bearer`).
	pub token_type: String,
	/// Lifetime in seconds, relative to `created_at`.
	pub expires_in: u64,
	/// Refresh token, if the endpoint issued one.
	pub refresh_token: Option<TokenSecret>,
	/// Instant the token was received.
	pub created_at: OffsetDateTime,
}
impl OAuth2Token {
	/// Instant the token stops being accepted by the service.
	pub fn expires_at(&self) -> OffsetDateTime {
		let lifetime = i64::try_from(self.expires_in).unwrap_or(i64::MAX);

		self.created_at.saturating_add(time::Duration::seconds(lifetime))
	}

	/// Returns `true` while `now` is earlier than the expiry minus `buffer`.
	pub fn is_valid_at(&self, now: OffsetDateTime, buffer: Duration) -> bool {
		let deadline = self.expires_at().saturating_sub(time_span(buffer));

		now < deadline
	}

	/// Builds an introspection snapshot at `now`.
	pub fn info_at(&self, now: OffsetDateTime, buffer: Duration) -> TokenInfo {
		let expires_at = self.expires_at();

		TokenInfo {
			is_valid: self.is_valid_at(now, buffer),
			expires_at: Some(expires_at),
			remaining: Some(clock::non_negative(expires_at - now)),
		}
	}
}
impl Debug for OAuth2Token {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuth2Token")
			.field("access_token", &"<redacted>")
			.field("token_type", &self.token_type)
			.field("expires_in", &self.expires_in)
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("created_at", &self.created_at)
			.finish()
	}
}

/// Read-only view of the held token.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TokenInfo {
	/// Whether the token can be used without a refresh.
	pub is_valid: bool,
	/// Hard expiry instant, when a token is held.
	pub expires_at: Option<OffsetDateTime>,
	/// Time left until the hard expiry, when a token is held.
	pub remaining: Option<Duration>,
}

fn time_span(duration: Duration) -> time::Duration {
	time::Duration::try_from(duration).unwrap_or(time::Duration::MAX)
}

//! Token lifecycle management with single-flight refreshes.
//!
//! [`TokenManager::access_token`] hands out the held token while it is valid (expiry minus the
//! configured safety buffer) and otherwise starts a refresh. The refresh is an in-flight handle,
//! a [`Shared`] future stored next to the token: the first caller creates it under the state
//! mutex, every caller awaits a clone of it, and the exchange itself clears the handle when it
//! finishes. Concurrent callers therefore share one network round-trip and observe the same
//! outcome, whether that is a fresh token or a classified error.

mod metrics;

pub use metrics::{ExchangeMetrics, GrantStats};

// crates.io
use futures::{
	FutureExt,
	future::{BoxFuture, Shared},
};
// self
use crate::{
	_prelude::*,
	auth::{GrantKind, OAuth2Token, TokenExchange, TokenInfo, TokenSecret},
	clock::Clock,
	obs::{self, OperationKind, OperationOutcome, OperationSpan},
};

type InFlight = Shared<BoxFuture<'static, Result<OAuth2Token>>>;

#[derive(Default)]
struct TokenState {
	token: Option<OAuth2Token>,
	in_flight: Option<InFlight>,
}

enum PendingGrant {
	ClientCredentials,
	Refresh(TokenSecret),
}
impl PendingGrant {
	fn kind(&self) -> OperationKind {
		match self {
			PendingGrant::ClientCredentials => OperationKind::Authenticate,
			PendingGrant::Refresh(_) => OperationKind::RefreshToken,
		}
	}

	fn grant(&self) -> GrantKind {
		match self {
			PendingGrant::ClientCredentials => GrantKind::ClientCredentials,
			PendingGrant::Refresh(_) => GrantKind::RefreshToken,
		}
	}
}

/// Owns the OAuth2 token and deduplicates concurrent refreshes.
///
/// Clones share the same token state, so one manager can be handed to every component that
/// needs a bearer token.
#[derive(Clone)]
pub struct TokenManager {
	exchange: Arc<TokenExchange>,
	clock: Arc<dyn Clock>,
	expiry_buffer: Duration,
	state: Arc<Mutex<TokenState>>,
	metrics: Arc<ExchangeMetrics>,
}
impl TokenManager {
	/// Creates a manager that refreshes through `exchange` and treats tokens as expired
	/// `expiry_buffer` before their hard expiry.
	pub fn new(exchange: TokenExchange, clock: Arc<dyn Clock>, expiry_buffer: Duration) -> Self {
		Self {
			exchange: Arc::new(exchange),
			clock,
			expiry_buffer,
			state: Default::default(),
			metrics: Default::default(),
		}
	}

	/// Returns a valid access token, refreshing first when the held one is absent or stale.
	///
	/// A stale token that carries a refresh token is renewed with the refresh grant; otherwise
	/// the client-credentials exchange runs again.
	pub async fn access_token(&self) -> Result<TokenSecret> {
		let flight = {
			let mut state = self.state.lock();
			let now = self.clock.now();

			if let Some(token) =
				state.token.as_ref().filter(|token| token.is_valid_at(now, self.expiry_buffer))
			{
				return Ok(token.access_token.clone());
			}

			let grant = match state.token.as_ref().and_then(|token| token.refresh_token.clone()) {
				Some(refresh) => PendingGrant::Refresh(refresh),
				None => PendingGrant::ClientCredentials,
			};

			self.join_or_start(&mut state, grant)
		};

		flight.await.map(|token| token.access_token)
	}

	/// Performs the client-credentials exchange regardless of the held token's freshness.
	///
	/// A refresh that is already in flight is joined instead of starting a second exchange.
	pub async fn authenticate(&self) -> Result<()> {
		let flight = {
			let mut state = self.state.lock();

			self.join_or_start(&mut state, PendingGrant::ClientCredentials)
		};

		flight.await.map(|_| ())
	}

	/// Drops the held token so the next caller re-authenticates.
	pub fn clear_token(&self) {
		self.state.lock().token = None;
	}

	/// Returns a side-effect-free snapshot of the held token.
	pub fn token_info(&self) -> TokenInfo {
		let state = self.state.lock();

		match state.token.as_ref() {
			Some(token) => token.info_at(self.clock.now(), self.expiry_buffer),
			None => TokenInfo::default(),
		}
	}

	/// Returns `true` while a refresh is pending.
	pub fn is_refreshing(&self) -> bool {
		self.state.lock().in_flight.is_some()
	}

	/// Counters for exchanges performed by this manager.
	pub fn exchange_metrics(&self) -> &ExchangeMetrics {
		&self.metrics
	}

	fn join_or_start(&self, state: &mut TokenState, grant: PendingGrant) -> InFlight {
		if let Some(flight) = state.in_flight.as_ref() {
			return flight.clone();
		}

		let manager = self.clone();
		let flight = async move { manager.run_exchange(grant).await }.boxed().shared();

		state.in_flight = Some(flight.clone());

		flight
	}

	async fn run_exchange(self, grant: PendingGrant) -> Result<OAuth2Token> {
		let (kind, grant_kind) = (grant.kind(), grant.grant());
		let span = OperationSpan::new(kind, "token_exchange");

		obs::record_operation_outcome(kind, OperationOutcome::Attempt);
		self.metrics.record_attempt(grant_kind);

		let result = span
			.instrument(async {
				match &grant {
					PendingGrant::ClientCredentials => self.exchange.client_credentials().await,
					PendingGrant::Refresh(refresh) => self.exchange.refresh(refresh).await,
				}
			})
			.await;

		{
			let mut state = self.state.lock();

			state.in_flight = None;

			match &result {
				Ok(token) => {
					state.token = Some(token.clone());
					self.metrics.record_success(grant_kind);
				},
				Err(_) => {
					// The held token was already unusable; dropping it lets the next caller fall
					// back to the client-credentials grant.
					if matches!(grant, PendingGrant::Refresh(_)) && state.token.take().is_some() {
						self.metrics.record_discard();
					}

					self.metrics.record_failure(grant_kind);
				},
			}
		}

		obs::record_result(kind, &result);

		result
	}

	#[cfg(test)]
	pub(crate) fn install_token(&self, token: OAuth2Token) {
		self.state.lock().token = Some(token);
	}
}
impl Debug for TokenManager {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let state = self.state.lock();

		f.debug_struct("TokenManager")
			.field("token", &state.token)
			.field("refreshing", &state.in_flight.is_some())
			.field("expiry_buffer", &self.expiry_buffer)
			.finish()
	}
}

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::{_prelude::*, auth::GrantKind};

/// Point-in-time counts for one grant type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GrantStats {
	/// Exchanges started.
	pub attempts: u64,
	/// Exchanges that produced a token.
	pub successes: u64,
	/// Exchanges that ended in a classified error.
	pub failures: u64,
}

#[derive(Debug, Default)]
struct GrantCounters {
	attempts: AtomicU64,
	successes: AtomicU64,
	failures: AtomicU64,
}
impl GrantCounters {
	fn stats(&self) -> GrantStats {
		GrantStats {
			attempts: self.attempts.load(Ordering::Relaxed),
			successes: self.successes.load(Ordering::Relaxed),
			failures: self.failures.load(Ordering::Relaxed),
		}
	}
}

/// Token endpoint counters, split by grant type.
///
/// A refresh-grant failure also discards the held token; those discards are counted separately
/// so a run of client-credentials fallbacks can be traced back to them.
#[derive(Debug, Default)]
pub struct ExchangeMetrics {
	client_credentials: GrantCounters,
	refresh_token: GrantCounters,
	tokens_discarded: AtomicU64,
}
impl ExchangeMetrics {
	/// Counts for a single grant type.
	pub fn grant(&self, kind: GrantKind) -> GrantStats {
		self.counters(kind).stats()
	}

	/// Exchanges started across both grants.
	pub fn attempts(&self) -> u64 {
		self.totals().attempts
	}

	/// Exchanges that produced a token across both grants.
	pub fn successes(&self) -> u64 {
		self.totals().successes
	}

	/// Exchanges that failed across both grants.
	pub fn failures(&self) -> u64 {
		self.totals().failures
	}

	/// Held tokens thrown away after a failed refresh.
	pub fn tokens_discarded(&self) -> u64 {
		self.tokens_discarded.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self, kind: GrantKind) {
		self.counters(kind).attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_success(&self, kind: GrantKind) {
		self.counters(kind).successes.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self, kind: GrantKind) {
		self.counters(kind).failures.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_discard(&self) {
		self.tokens_discarded.fetch_add(1, Ordering::Relaxed);
	}

	fn counters(&self, kind: GrantKind) -> &GrantCounters {
		match kind {
			GrantKind::ClientCredentials => &self.client_credentials,
			GrantKind::RefreshToken => &self.refresh_token,
		}
	}

	fn totals(&self) -> GrantStats {
		let (cc, rt) = (self.client_credentials.stats(), self.refresh_token.stats());

		GrantStats {
			attempts: cc.attempts + rt.attempts,
			successes: cc.successes + rt.successes,
			failures: cc.failures + rt.failures,
		}
	}
}

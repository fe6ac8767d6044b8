use tracing::debug;

use crate::cached::{CacheConfig, CachedLedger};
use crate::host::HostLedger;

/// A transaction's logical scope (spec §5: "a logical scope supplied by the
/// host with a begin and an end"). Owns the `CachedLedger` exclusively; when
/// a `Transaction` is dropped — via `commit` or `discard`, or just falling
/// out of scope — every cache it held goes with it, including any side-cache
/// memoization.
///
/// The host, not this type, is the source of commit/rollback atomicity:
/// `put`/`del` on the wrapped facade already take effect against the host
/// immediately, so `commit`/`discard` here only draw the line on the
/// caches' lifetime, not on what's already been durably written.
pub struct Transaction<'a, L: HostLedger> {
    ledger: CachedLedger<'a, L>,
}

impl<'a, L: HostLedger> Transaction<'a, L> {
    pub fn begin(host: &'a L, config: CacheConfig) -> Self {
        debug!(tx_id = %host.tx_id(), "transaction begin");
        Self {
            ledger: CachedLedger::new(host, config),
        }
    }

    pub fn ledger(&self) -> &CachedLedger<'a, L> {
        &self.ledger
    }

    /// Close out the transaction normally. Every write already reached the
    /// host; this only releases the facade's caches.
    pub fn commit(self) {
        debug!(tx_id = %self.ledger.tx_id(), "transaction commit");
    }

    /// Close out the transaction after a failure. The host is responsible
    /// for rolling back anything it already applied; this call exists so
    /// the intent reads clearly at the call site (spec §5: "a cancelled
    /// transaction discards every cached write").
    pub fn discard(self) {
        debug!(tx_id = %self.ledger.tx_id(), "transaction discarded");
    }
}

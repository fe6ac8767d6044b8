use custodia_core::Result;

pub type LedgerKey = Vec<u8>;
pub type LedgerValue = Vec<u8>;

/// Capabilities the embedding host MUST provide (spec §6).
///
/// The host owns persistence and transaction atomicity: every `put`/`del`
/// here is expected to take effect immediately within the host's own
/// transaction scope, which the host rolls back wholesale on any error
/// surfaced by the core. `range` is synchronous and returns a materialized
/// vector rather than a lazy iterator — the host's range query MUST already
/// be start-inclusive, end-exclusive, lexical, so there is nothing left for
/// the facade to reorder.
pub trait HostLedger {
    fn get(&self, key: &[u8]) -> Result<Option<LedgerValue>>;
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;
    fn del(&self, key: &[u8]) -> Result<()>;
    fn range(&self, start: &[u8], end: &[u8]) -> Result<Vec<(LedgerKey, LedgerValue)>>;

    /// Build a composite key from a table/type tag and ordered parts.
    fn composite_key(&self, table: &str, parts: &[&[u8]]) -> LedgerKey;

    /// Inverse of `composite_key`: recover the table tag and parts.
    fn split_composite_key(&self, key: &[u8]) -> Result<(String, Vec<Vec<u8>>)>;

    fn tx_id(&self) -> String;
    fn tx_timestamp(&self) -> custodia_core::Timestamp;
}

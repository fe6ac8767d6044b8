use serde_json::{json, Map, Value};

use custodia_core::{AssetId, IndexTableDescriptor, KeyId, Result};
use custodia_ledger::{CachedLedger, HostLedger};

const HISTORY_TABLE: &str = "asset_history";
const CONSENT_LOG_TABLE: &str = "consent_log";

#[derive(Clone, Copy, Debug)]
pub enum HistoryEvent {
    Added,
    Updated,
    Deleted,
}

impl HistoryEvent {
    fn as_str(self) -> &'static str {
        match self {
            HistoryEvent::Added => "added",
            HistoryEvent::Updated => "updated",
            HistoryEvent::Deleted => "deleted",
        }
    }
}

fn history_table() -> IndexTableDescriptor {
    IndexTableDescriptor::new(HISTORY_TABLE, "entry_id")
        .with_index(vec!["asset_id".to_string(), "tx_timestamp".to_string()])
}

/// Append one entry to an asset's history index (spec §4.F: asset
/// mutations are recorded under `(asset_id, tx_timestamp)` for
/// chronological replay). The primary key is the timestamp itself, so
/// consecutive events on the same asset within one transaction overwrite
/// rather than accumulate — acceptable since a single transaction can only
/// apply one mutation to a given asset under the single-owner invariant.
pub fn record_history<L: HostLedger>(
    ledger: &CachedLedger<L>,
    asset_id: &AssetId,
    event: HistoryEvent,
) -> Result<()> {
    let table = history_table();
    let tx_timestamp = ledger.tx_timestamp();
    let entry_id = format!("{}-{}", asset_id.as_str(), tx_timestamp);
    let row: Map<String, Value> = serde_json::from_value(json!({
        "entry_id": entry_id,
        "asset_id": asset_id.as_str(),
        "tx_timestamp": tx_timestamp.to_string(),
        "event": event.as_str(),
    }))
    .expect("static shape");
    custodia_index::put_row(ledger, None, None, &table, &row, None, Some(&entry_id))
}

/// Every history row for `asset_id`, oldest first (numeric order on
/// `tx_timestamp`).
pub fn asset_history<L: HostLedger>(
    ledger: &CachedLedger<L>,
    asset_id: &AssetId,
) -> Result<Vec<Map<String, Value>>> {
    let table = history_table();
    custodia_index::get_rows_by_partial_key(
        ledger,
        None,
        None,
        &table,
        &["asset_id".to_string(), "tx_timestamp".to_string()],
        &[asset_id.as_str().to_string()],
    )
}

fn consent_log_table() -> IndexTableDescriptor {
    IndexTableDescriptor::new(CONSENT_LOG_TABLE, "entry_id").with_index(vec![
        "owner".to_string(),
        "datatype".to_string(),
        "target".to_string(),
        "expires_at".to_string(),
    ])
}

/// Record a consent grant/revoke for audit (spec §4.G). `expires_at` is a
/// Unix timestamp, or `0` for a consent without expiry.
pub fn record_consent_log<L: HostLedger>(
    ledger: &CachedLedger<L>,
    owner: &KeyId,
    datatype: &str,
    target: &KeyId,
    expires_at: i64,
    granted: bool,
) -> Result<()> {
    let table = consent_log_table();
    let entry_id = format!(
        "{}-{}-{}-{}",
        owner.as_str(),
        datatype,
        target.as_str(),
        ledger.tx_timestamp()
    );
    let row: Map<String, Value> = serde_json::from_value(json!({
        "entry_id": entry_id,
        "owner": owner.as_str(),
        "datatype": datatype,
        "target": target.as_str(),
        "expires_at": expires_at.to_string(),
        "granted": granted,
    }))
    .expect("static shape");
    custodia_index::put_row(ledger, None, None, &table, &row, None, Some(&entry_id))
}

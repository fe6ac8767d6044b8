use serde_json::{Map, Value};
use tracing::instrument;

use custodia_core::constants::MAX_UNICODE_RUNE;
use custodia_core::{CustodiaError, IndexTableDescriptor, Result};
use custodia_ledger::{BlobStore, CachedLedger, HostLedger};

use crate::encode::encode_value;
use crate::secret::TableSecret;

const INDEX_TABLE: &str = "idx";
const BLOB_POINTER_FIELD: &str = "__blob";

fn index_label(fields: &[String]) -> String {
    fields.join(",")
}

fn field_str(row: &Map<String, Value>, field: &str) -> Option<String> {
    row.get(field).map(value_to_string)
}

fn value_to_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Resolve a field's indexed value for a row, falling back to the previous
/// row's value when absent (spec §4.E: "missing indexed values are carried
/// forward from the previous row"), and finally to `fallback_pk` for the
/// table's declared primary-key field on first write.
fn resolve_field(
    table: &IndexTableDescriptor,
    field: &str,
    row: &Map<String, Value>,
    previous_row: Option<&Map<String, Value>>,
    fallback_pk: Option<&str>,
) -> Result<String> {
    if let Some(v) = field_str(row, field) {
        return Ok(v);
    }
    if let Some(prev) = previous_row {
        if let Some(v) = field_str(prev, field) {
            return Ok(v);
        }
    }
    if field == table.primary_key_field {
        if let Some(pk) = fallback_pk {
            return Ok(pk.to_string());
        }
    }
    Err(CustodiaError::invalid_input(format!(
        "missing value for indexed field '{field}' with no prior row to carry forward"
    )))
}

fn row_values(
    table: &IndexTableDescriptor,
    fields: &[String],
    row: &Map<String, Value>,
    previous_row: Option<&Map<String, Value>>,
    fallback_pk: Option<&str>,
) -> Result<Vec<String>> {
    fields
        .iter()
        .map(|f| resolve_field(table, f, row, previous_row, fallback_pk))
        .collect()
}

fn composite_row_key<L: HostLedger>(
    ledger: &CachedLedger<L>,
    table_name: &str,
    label: &str,
    values: &[String],
    secret: Option<&TableSecret>,
) -> Vec<u8> {
    let encoded: Vec<String> = values.iter().map(|v| encode_value(v)).collect();
    let segments: Vec<String> = match secret {
        Some(s) => encoded.iter().map(|v| s.encode_segment(v)).collect(),
        None => encoded,
    };
    let mut parts: Vec<&[u8]> = vec![table_name.as_bytes(), label.as_bytes()];
    let owned: Vec<&[u8]> = segments.iter().map(|s| s.as_bytes()).collect();
    parts.extend(owned);
    ledger.composite_key(INDEX_TABLE, &parts)
}

fn prefix_key<L: HostLedger>(ledger: &CachedLedger<L>, table_name: &str, label: &str) -> Vec<u8> {
    ledger.composite_key(INDEX_TABLE, &[table_name.as_bytes(), label.as_bytes()])
}

fn upper_bound(prefix: &[u8]) -> Vec<u8> {
    let mut v = prefix.to_vec();
    v.extend_from_slice(&[0xFF; 4]);
    v
}

fn table_descriptor_key(name: &str) -> Vec<u8> {
    format!("table/{name}").into_bytes()
}

/// `GetTable(name)` (spec §4.E): loads a table descriptor, or `None` if it
/// has never been saved — callers treat that as a fresh handle with no
/// configured indexes.
pub fn get_table<L: HostLedger>(
    ledger: &CachedLedger<L>,
    name: &str,
) -> Result<Option<IndexTableDescriptor>> {
    match ledger.get(&table_descriptor_key(name))? {
        Some(bytes) => {
            let table: IndexTableDescriptor = serde_json::from_slice(&bytes)
                .map_err(|e| CustodiaError::integrity(format!("corrupt index table descriptor: {e}")))?;
            Ok(Some(table))
        }
        None => Ok(None),
    }
}

/// Persists a table descriptor under the `table/{name}` layout (spec §6).
pub fn put_table<L: HostLedger>(ledger: &CachedLedger<L>, table: &IndexTableDescriptor) -> Result<()> {
    let bytes = serde_json::to_vec(table)
        .map_err(|e| CustodiaError::integrity(format!("cannot serialize index table descriptor: {e}")))?;
    ledger.put(&table_descriptor_key(&table.name), &bytes)
}

/// Write (or move) every configured index's ledger entry for one row,
/// deleting the previous row's stale composite keys first (spec §4.E row
/// maintenance). `fallback_pk` supplies the asset id to use for the
/// default primary-key field on a first write with no explicit pk value.
#[instrument(skip(ledger, blob, table, row, previous_row), fields(table = %table.name))]
pub fn put_row<L: HostLedger>(
    ledger: &CachedLedger<L>,
    blob: Option<&dyn BlobStore>,
    secret: Option<&TableSecret>,
    table: &IndexTableDescriptor,
    row: &Map<String, Value>,
    previous_row: Option<&Map<String, Value>>,
    fallback_pk: Option<&str>,
) -> Result<()> {
    let stored_value = store_row_value(blob, secret, row)?;

    for fields in &table.indexes {
        let mut full_fields = fields.clone();
        full_fields.push(table.primary_key_field.clone());
        let label = index_label(fields);

        let new_values = row_values(table, &full_fields, row, previous_row, fallback_pk)?;
        let new_key = composite_row_key(ledger, &table.name, &label, &new_values, secret);

        if let Some(prev) = previous_row {
            let old_values = row_values(table, &full_fields, prev, previous_row, fallback_pk)?;
            let old_key = composite_row_key(ledger, &table.name, &label, &old_values, secret);
            if old_key != new_key {
                ledger.del(&old_key)?;
            }
        }

        ledger.put(&new_key, &stored_value)?;
    }
    Ok(())
}

/// Delete every configured index's ledger entry for `row` (used by
/// `delete_asset`'s index-row cleanup, spec §4.F).
pub fn delete_row<L: HostLedger>(
    ledger: &CachedLedger<L>,
    secret: Option<&TableSecret>,
    table: &IndexTableDescriptor,
    row: &Map<String, Value>,
    fallback_pk: Option<&str>,
) -> Result<()> {
    for fields in &table.indexes {
        let mut full_fields = fields.clone();
        full_fields.push(table.primary_key_field.clone());
        let label = index_label(fields);
        let values = row_values(table, &full_fields, row, None, fallback_pk)?;
        let key = composite_row_key(ledger, &table.name, &label, &values, secret);
        ledger.del(&key)?;
    }
    Ok(())
}

fn store_row_value(
    blob: Option<&dyn BlobStore>,
    secret: Option<&TableSecret>,
    row: &Map<String, Value>,
) -> Result<Vec<u8>> {
    let plaintext = serde_json::to_vec(row)
        .map_err(|e| CustodiaError::integrity(format!("cannot serialize row: {e}")))?;

    let payload = match secret {
        Some(s) => s.encrypt_row(&plaintext)?,
        None => plaintext,
    };

    match blob {
        Some(store) => {
            let content_id = store.put(&payload)?;
            let pointer = Map::from_iter([(
                BLOB_POINTER_FIELD.to_string(),
                Value::String(content_id),
            )]);
            serde_json::to_vec(&pointer)
                .map_err(|e| CustodiaError::integrity(format!("cannot serialize pointer: {e}")))
        }
        None => Ok(payload),
    }
}

fn load_row_value(
    blob: Option<&dyn BlobStore>,
    secret: Option<&TableSecret>,
    bytes: &[u8],
) -> Result<Map<String, Value>> {
    let resolved = if let Some(store) = blob {
        let wrapper: Value = serde_json::from_slice(bytes)
            .map_err(|e| CustodiaError::integrity(format!("corrupt index row: {e}")))?;
        if let Some(content_id) = wrapper.get(BLOB_POINTER_FIELD).and_then(Value::as_str) {
            store
                .get(content_id)?
                .ok_or_else(|| CustodiaError::not_found(format!("blob {content_id}")))?
        } else {
            bytes.to_vec()
        }
    } else {
        bytes.to_vec()
    };

    let plaintext = match secret {
        Some(s) => s.decrypt_row(&resolved)?,
        None => resolved,
    };

    let row: Value = serde_json::from_slice(&plaintext)
        .map_err(|e| CustodiaError::integrity(format!("corrupt index row payload: {e}")))?;
    match row {
        Value::Object(map) => Ok(map),
        _ => Err(CustodiaError::integrity("index row payload is not an object")),
    }
}

/// Range scan over one configured index (spec §4.E). `field_names` must be
/// a prefix of one of `table.indexes`' field sequences (excluding the
/// primary key). Disabled for `encrypted` tables beyond exact/partial-key
/// lookup — see `get_rows_by_partial_key`.
pub fn get_rows_by_range<L: HostLedger>(
    ledger: &CachedLedger<L>,
    blob: Option<&dyn BlobStore>,
    secret: Option<&TableSecret>,
    table: &IndexTableDescriptor,
    field_names: &[String],
    start_values: &[String],
    end_values: &[String],
) -> Result<Vec<Map<String, Value>>> {
    if table.encrypted {
        return Err(CustodiaError::invalid_input(
            "range scans are disabled on encrypted index tables; use get_rows_by_partial_key",
        ));
    }
    scan(ledger, blob, secret, table, field_names, start_values, end_values)
}

/// Exact/partial-key lookup, the only scan encrypted tables permit (spec
/// §4.E: "This preserves GetRowsByPartialKey but DISABLES arbitrary
/// GetRowsByRange").
pub fn get_rows_by_partial_key<L: HostLedger>(
    ledger: &CachedLedger<L>,
    blob: Option<&dyn BlobStore>,
    secret: Option<&TableSecret>,
    table: &IndexTableDescriptor,
    field_names: &[String],
    values: &[String],
) -> Result<Vec<Map<String, Value>>> {
    scan(ledger, blob, secret, table, field_names, values, values)
}

fn scan<L: HostLedger>(
    ledger: &CachedLedger<L>,
    blob: Option<&dyn BlobStore>,
    secret: Option<&TableSecret>,
    table: &IndexTableDescriptor,
    field_names: &[String],
    start_values: &[String],
    end_values: &[String],
) -> Result<Vec<Map<String, Value>>> {
    scan_with_keys(ledger, blob, secret, table, field_names, start_values, end_values)
        .map(|rows| rows.into_iter().map(|(_, row)| row).collect())
}

/// Same scan as [`get_rows_by_range`]/[`get_rows_by_partial_key`] but keeps
/// the raw ledger key alongside each row, so a caller (the Asset Manager's
/// iterator) can resume a scan precisely after the last row it delivered
/// (spec §4.F `previous_ledger_key` cursor).
fn scan_with_keys<L: HostLedger>(
    ledger: &CachedLedger<L>,
    blob: Option<&dyn BlobStore>,
    secret: Option<&TableSecret>,
    table: &IndexTableDescriptor,
    field_names: &[String],
    start_values: &[String],
    end_values: &[String],
) -> Result<Vec<(Vec<u8>, Map<String, Value>)>> {
    let label = index_label(field_names);

    let start_key = if start_values.is_empty() {
        prefix_key(ledger, &table.name, &label)
    } else {
        composite_row_key(ledger, &table.name, &label, start_values, secret)
    };

    let end_key = if end_values.is_empty() {
        upper_bound(&prefix_key(ledger, &table.name, &label))
    } else if start_values.len() > end_values.len() || start_values == end_values {
        let mut sentinel = end_values.to_vec();
        sentinel.push(MAX_UNICODE_RUNE.to_string());
        composite_row_key(ledger, &table.name, &label, &sentinel, secret)
    } else {
        composite_row_key(ledger, &table.name, &label, end_values, secret)
    };

    let rows = ledger.range(&start_key, &end_key)?;
    rows.into_iter()
        .map(|(key, bytes)| load_row_value(blob, secret, &bytes).map(|row| (key, row)))
        .collect()
}

/// Range scan that also returns each row's raw ledger key (spec §4.F
/// iterator contract).
pub fn get_rows_by_range_with_keys<L: HostLedger>(
    ledger: &CachedLedger<L>,
    blob: Option<&dyn BlobStore>,
    secret: Option<&TableSecret>,
    table: &IndexTableDescriptor,
    field_names: &[String],
    start_values: &[String],
    end_values: &[String],
) -> Result<Vec<(Vec<u8>, Map<String, Value>)>> {
    if table.encrypted {
        return Err(CustodiaError::invalid_input(
            "range scans are disabled on encrypted index tables; use get_rows_by_partial_key",
        ));
    }
    scan_with_keys(ledger, blob, secret, table, field_names, start_values, end_values)
}

/// The byte-wise immediate successor of `key`: the smallest key strictly
/// greater than `key` under lexical order. Used to resume a range scan just
/// past a previously delivered `previous_ledger_key` (spec §4.F: "the next
/// scan starts at cursor + min_unicode_rune to exclude the prior row").
pub fn successor_key(key: &[u8]) -> Vec<u8> {
    let mut out = key.to_vec();
    out.push(0x01);
    out
}

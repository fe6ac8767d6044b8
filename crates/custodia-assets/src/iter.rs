use serde_json::{Map, Value};
use tracing::instrument;

use custodia_core::constants::ITER_NO_LIMIT;
use custodia_core::{Asset, IndexTableDescriptor, Key, Result};
use custodia_ledger::{CachedLedger, HostLedger};

use crate::asset_store::load_asset;
use crate::key_path::{resolve_key_path, KeyPathSpec};

/// Everything `get_asset_iter` needs beyond the index range itself (spec
/// §4.F iterator contract).
pub struct IterOptions<'a, L: HostLedger> {
    pub decrypt: bool,
    pub private_only: bool,
    pub key_path_spec: Option<KeyPathSpec<'a, L>>,
    pub caller: Option<&'a Key>,
    pub filter_rule: Option<&'a Value>,
    pub limit: i64,
    pub cursor: Option<Vec<u8>>,
}

impl<'a, L: HostLedger> Default for IterOptions<'a, L> {
    fn default() -> Self {
        Self {
            decrypt: false,
            private_only: false,
            key_path_spec: None,
            caller: None,
            filter_rule: None,
            limit: ITER_NO_LIMIT,
            cursor: None,
        }
    }
}

/// One page of `get_asset_iter` results: the qualifying assets plus the
/// cursor to resume after, if the page was cut short by `limit`.
pub struct IterPage {
    pub assets: Vec<(Asset, Option<Vec<u8>>)>,
    pub previous_ledger_key: Option<Vec<u8>>,
}

fn asset_data_map(asset: &Asset, decrypted: Option<&[u8]>) -> Value {
    let public_data: Value =
        serde_json::from_slice(&asset.public_data).unwrap_or(Value::Object(Map::new()));
    let private_data: Value = match decrypted {
        Some(bytes) => serde_json::from_slice(bytes).unwrap_or(Value::Object(Map::new())),
        None => Value::Object(Map::new()),
    };
    serde_json::json!({
        "asset_id": asset.asset_id.as_str(),
        "owner_id": asset.owner().as_str(),
        "datatypes": asset.datatypes,
        "public_data": public_data,
        "private_data": private_data,
    })
}

/// `get_asset_iter(namespace, table, fields, start, end, decrypt,
/// private_only, key_path_spec, cursor, limit, filter_rule)` (spec §4.F).
///
/// Eagerly scans the underlying index range (the host ledger's own range
/// call is the only true suspension point, per spec §4.H) and applies the
/// per-row filter pipeline in order: fetch asset, resolve key path when
/// `private_only`, decrypt when `decrypt`, evaluate `filter_rule`. A row
/// that fails any step is skipped and iteration continues, except ledger
/// errors, which abort the whole call (spec §8 rule-evaluation-failure
/// invariant).
#[instrument(skip_all, fields(table = %table.name))]
pub fn get_asset_iter<L: HostLedger>(
    ledger: &CachedLedger<L>,
    table: &IndexTableDescriptor,
    field_names: &[String],
    start_values: &[String],
    end_values: &[String],
    opts: IterOptions<'_, L>,
) -> Result<IterPage> {
    if opts.limit == 0 {
        return Ok(IterPage {
            assets: Vec::new(),
            previous_ledger_key: None,
        });
    }

    // The host ledger range call is the one true suspension point; resuming
    // after a cursor re-scans the same bounded range and drops every row up
    // to and including the cursor's successor key (spec §4.F: "the next
    // scan starts at cursor + min_unicode_rune to exclude the prior row").
    let all_rows = custodia_index::get_rows_by_range_with_keys(
        ledger, None, None, table, field_names, start_values, end_values,
    )?;
    let rows = match &opts.cursor {
        Some(cursor) => {
            let resume_after = custodia_index::successor_key(cursor);
            all_rows
                .into_iter()
                .filter(|(key, _)| key.as_slice() >= resume_after.as_slice())
                .collect::<Vec<_>>()
        }
        None => all_rows,
    };

    let mut out = Vec::new();
    let mut previous_ledger_key = None;
    for (ledger_key, row) in rows {
        if opts.limit != ITER_NO_LIMIT && out.len() as i64 >= opts.limit {
            break;
        }

        let Some(asset_id_str) = row.get(&table.primary_key_field).and_then(Value::as_str) else {
            continue;
        };
        let asset_id = custodia_core::AssetId(asset_id_str.to_string());
        let Ok(Some(asset)) = load_asset(ledger, &asset_id) else {
            continue;
        };

        let key_material = if opts.private_only {
            let (Some(caller), Some(spec)) = (opts.caller, opts.key_path_spec.as_ref()) else {
                continue;
            };
            match resolve_key_path(ledger, caller, &asset, spec) {
                Ok(material) => Some(material),
                Err(_) => continue,
            }
        } else {
            None
        };

        let decrypted = if opts.decrypt {
            let Some(material) = key_material.as_deref() else {
                continue;
            };
            match custodia_crypto::sym_decrypt(material, &asset.private_data) {
                Ok(plaintext) => Some(plaintext),
                Err(_) => continue,
            }
        } else {
            None
        };

        if let Some(rule) = opts.filter_rule {
            let data_map = asset_data_map(&asset, decrypted.as_deref());
            if !custodia_rules::evaluate_filter(rule, data_map) {
                continue;
            }
        }

        previous_ledger_key = Some(ledger_key);
        out.push((asset, decrypted));
    }

    Ok(IterPage {
        assets: out,
        previous_ledger_key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use custodia_core::KeyId;
    use custodia_ledger::{CacheConfig, MemoryLedger};
    use serde_json::json;

    fn table() -> IndexTableDescriptor {
        IndexTableDescriptor::new("people_by_age", "asset_id").with_index(vec!["age".to_string()])
    }

    fn seed_row<L: HostLedger>(ledger: &CachedLedger<L>, t: &IndexTableDescriptor, id: &str, age: &str) {
        let row: Map<String, Value> = serde_json::from_value(json!({"asset_id": id, "age": age})).unwrap();
        custodia_index::put_row(ledger, None, None, t, &row, None, Some(id)).unwrap();

        let owner = KeyId::new("user-sym-owner");
        let asset_key = custodia_crypto::generate_symmetric_key(KeyId::new(format!("asset-key-{id}")));
        let asset = custodia_core::Asset {
            asset_id: custodia_core::AssetId(id.to_string()),
            owner_ids: [owner],
            datatypes: Default::default(),
            public_data: Vec::new(),
            private_data: custodia_crypto::sym_encrypt(asset_key.material(), b"{}").unwrap(),
            asset_key_id: asset_key.key_id,
            asset_key_hash: custodia_crypto::hash(asset_key.material()),
            index_table_name: Some(t.name.clone()),
            metadata: Default::default(),
        };
        crate::asset_store::store_asset(ledger, &asset).unwrap();
    }

    #[test]
    fn limit_zero_returns_nothing() {
        let host = MemoryLedger::new("tx", 0);
        let ledger = CachedLedger::new(&host, CacheConfig::default());
        let t = table();
        seed_row(&ledger, &t, "a-1", "10");

        let opts: IterOptions<MemoryLedger> = IterOptions {
            limit: 0,
            ..Default::default()
        };
        let page = get_asset_iter(&ledger, &t, &["age".to_string()], &[], &[], opts).unwrap();
        assert!(page.assets.is_empty());
    }

    #[test]
    fn unbounded_limit_returns_every_row_in_numeric_order() {
        let host = MemoryLedger::new("tx", 0);
        let ledger = CachedLedger::new(&host, CacheConfig::default());
        let t = table();
        seed_row(&ledger, &t, "a-1", "30");
        seed_row(&ledger, &t, "a-2", "5");

        let opts: IterOptions<MemoryLedger> = IterOptions::default();
        let page = get_asset_iter(&ledger, &t, &["age".to_string()], &[], &[], opts).unwrap();
        let ids: Vec<&str> = page.assets.iter().map(|(a, _)| a.asset_id.as_str()).collect();
        assert_eq!(ids, vec!["a-2", "a-1"]);
    }

    #[test]
    fn cursor_resumption_concatenates_to_full_page() {
        let host = MemoryLedger::new("tx", 0);
        let ledger = CachedLedger::new(&host, CacheConfig::default());
        let t = table();
        seed_row(&ledger, &t, "a-1", "10");
        seed_row(&ledger, &t, "a-2", "20");
        seed_row(&ledger, &t, "a-3", "30");

        let first_opts: IterOptions<MemoryLedger> = IterOptions {
            limit: 2,
            ..Default::default()
        };
        let first = get_asset_iter(&ledger, &t, &["age".to_string()], &[], &[], first_opts).unwrap();
        assert_eq!(first.assets.len(), 2);
        let cursor = first.previous_ledger_key.clone();

        let rest_opts: IterOptions<MemoryLedger> = IterOptions {
            cursor,
            ..Default::default()
        };
        let rest = get_asset_iter(&ledger, &t, &["age".to_string()], &[], &[], rest_opts).unwrap();

        let mut combined: Vec<&str> = first.assets.iter().map(|(a, _)| a.asset_id.as_str()).collect();
        combined.extend(rest.assets.iter().map(|(a, _)| a.asset_id.as_str()));

        let full_opts: IterOptions<MemoryLedger> = IterOptions::default();
        let full = get_asset_iter(&ledger, &t, &["age".to_string()], &[], &[], full_opts).unwrap();
        let full_ids: Vec<&str> = full.assets.iter().map(|(a, _)| a.asset_id.as_str()).collect();

        assert_eq!(combined, full_ids);
    }
}

use serde_json::Value;

/// Split a dotted variable path (`"a.b.2.c"`) into segments. Empty string
/// means "the whole data map" per JSON-Logic `var` convention.
pub fn segments(path: &str) -> Vec<&str> {
    if path.is_empty() {
        Vec::new()
    } else {
        path.split('.').collect()
    }
}

/// Read a dotted path out of `data`. Numeric segments index arrays;
/// anything else indexes objects. Returns `None` if any segment is absent.
pub fn get<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    let mut cur = data;
    for seg in segments(path) {
        cur = match cur {
            Value::Object(map) => map.get(seg)?,
            Value::Array(arr) => {
                let idx: usize = seg.parse().ok()?;
                arr.get(idx)?
            }
            _ => return None,
        };
    }
    Some(cur)
}

/// Write `value` at a dotted path inside `data`, creating intermediate
/// objects/arrays as needed (spec §4.B `let`/`:=`: "supporting indexed
/// update of arrays/maps; array index -1 appends").
pub fn set(data: &mut Value, path: &str, value: Value) {
    let segs = segments(path);
    if segs.is_empty() {
        *data = value;
        return;
    }
    set_segments(data, &segs, value);
}

fn set_segments(cur: &mut Value, segs: &[&str], value: Value) {
    let (head, rest) = (segs[0], &segs[1..]);

    if let Ok(idx) = head.parse::<i64>() {
        if !cur.is_array() {
            *cur = Value::Array(Vec::new());
        }
        let arr = cur.as_array_mut().unwrap();
        let append = idx == -1;
        let target_idx = if append { arr.len() } else { idx.max(0) as usize };
        while arr.len() <= target_idx {
            arr.push(Value::Null);
        }
        if rest.is_empty() {
            arr[target_idx] = value;
        } else {
            set_segments(&mut arr[target_idx], rest, value);
        }
        return;
    }

    if !cur.is_object() {
        *cur = Value::Object(serde_json::Map::new());
    }
    let map = cur.as_object_mut().unwrap();
    if rest.is_empty() {
        map.insert(head.to_string(), value);
    } else {
        let entry = map
            .entry(head.to_string())
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
        set_segments(entry, rest, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn get_nested_path() {
        let data = json!({"a": {"b": [1, 2, 3]}});
        assert_eq!(get(&data, "a.b.1"), Some(&json!(2)));
    }

    #[test]
    fn get_missing_path_is_none() {
        let data = json!({"a": 1});
        assert_eq!(get(&data, "b.c"), None);
    }

    #[test]
    fn set_creates_intermediate_objects() {
        let mut data = json!({});
        set(&mut data, "a.b.c", json!(42));
        assert_eq!(get(&data, "a.b.c"), Some(&json!(42)));
    }

    #[test]
    fn set_array_append_with_negative_one() {
        let mut data = json!({"list": [1, 2]});
        set(&mut data, "list.-1", json!(3));
        assert_eq!(data["list"], json!([1, 2, 3]));
    }

    #[test]
    fn set_array_index_in_place() {
        let mut data = json!({"list": [1, 2, 3]});
        set(&mut data, "list.1", json!(99));
        assert_eq!(data["list"], json!([1, 99, 3]));
    }
}

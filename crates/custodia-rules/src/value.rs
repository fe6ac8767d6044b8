use serde_json::Value;

use crate::error::RuleError;

/// JSON-Logic truthiness: `false`, `null`, `0`, `""`, and empty arrays are
/// falsy; everything else (including empty objects) is truthy.
pub fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(_) => true,
    }
}

pub fn as_f64(v: &Value, op: &'static str) -> Result<f64, RuleError> {
    match v {
        Value::Number(n) => n.as_f64().ok_or(RuleError::TypeError {
            op,
            detail: "not a finite number".into(),
        }),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.parse::<f64>().map_err(|_| RuleError::TypeError {
            op,
            detail: format!("cannot coerce \"{s}\" to a number"),
        }),
        Value::Null => Ok(0.0),
        other => Err(RuleError::TypeError {
            op,
            detail: format!("cannot coerce {other} to a number"),
        }),
    }
}

/// Require a whole-number value (spec §4.B: "integer-requiring operators
/// fail when presented a non-whole value").
pub fn as_whole_i64(v: &Value, op: &'static str) -> Result<i64, RuleError> {
    let f = as_f64(v, op)?;
    if f.fract() != 0.0 {
        return Err(RuleError::NotAWholeNumber { op, value: f });
    }
    Ok(f as i64)
}

pub fn as_str<'a>(v: &'a Value, op: &'static str) -> Result<&'a str, RuleError> {
    v.as_str().ok_or_else(|| RuleError::TypeError {
        op,
        detail: format!("expected a string, got {v}"),
    })
}

/// Loose equality (`==`): numbers/strings/bools are coerced the way the
/// JSON-Logic reference implementation does — numeric comparison when both
/// sides parse as numbers, otherwise string comparison, otherwise strict.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        (Value::Number(_), _) | (_, Value::Number(_)) => {
            matches!((as_f64(a, "=="), as_f64(b, "==")), (Ok(x), Ok(y)) if x == y)
        }
        (Value::Bool(x), other) | (other, Value::Bool(x)) => truthy(other) == *x,
        (Value::Null, Value::Null) => true,
        _ => false,
    }
}

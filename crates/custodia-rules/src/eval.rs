use serde_json::{Map, Value};

use crate::error::RuleError;
use crate::ops::{dispatch_table, OpFn};
use crate::{path, value as v};

/// Mutable evaluation context: the data map that `var`/`let` read and write.
///
/// A fresh `Env` is pushed (not a new struct, just a swapped `data`) whenever
/// `map`/`filter`/`reduce` evaluate their lambda body against a single
/// element, so outer assignments are never visible to — nor mutated by — the
/// inner body. This keeps the evaluator a pure, restartable tree walker
/// (spec §4.B, §9 Design Notes).
pub struct Env {
    pub data: Value,
    steps: u64,
}

/// Upper bound on `while`-loop iterations, guarding against runaway rules.
const MAX_WHILE_STEPS: u64 = 1_000_000;

impl Env {
    pub fn new(data: Value) -> Self {
        Self { data, steps: 0 }
    }

    pub fn tick(&mut self) -> Result<(), RuleError> {
        self.steps += 1;
        if self.steps > MAX_WHILE_STEPS {
            return Err(RuleError::LoopBoundExceeded);
        }
        Ok(())
    }

    /// Run `body` against a scratch env whose data is `scoped_data`,
    /// returning the result without leaking the scratch env's step budget
    /// mutations back to `self` beyond the counter.
    pub fn with_scope<T>(
        &mut self,
        scoped_data: Value,
        f: impl FnOnce(&mut Env) -> Result<T, RuleError>,
    ) -> Result<T, RuleError> {
        let mut scratch = Env {
            data: scoped_data,
            steps: self.steps,
        };
        let result = f(&mut scratch);
        self.steps = scratch.steps;
        result
    }
}

/// Evaluate an expression tree against `env`.
///
/// - `{"op": [args...]}` (single-key object) is an operator call.
/// - A bare array is literal data whose elements are themselves recursively
///   evaluated (so nested operator calls inside literal arrays still run).
/// - Anything else is a literal scalar.
pub fn eval(expr: &Value, env: &mut Env) -> Result<Value, RuleError> {
    match expr {
        Value::Object(map) if map.len() == 1 => {
            let (op, raw_args) = map.iter().next().expect("len == 1");
            let args: Vec<Value> = match raw_args {
                Value::Array(items) => items.clone(),
                other => vec![other.clone()],
            };
            call(op, &args, env)
        }
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(eval(item, env)?);
            }
            Ok(Value::Array(out))
        }
        other => Ok(other.clone()),
    }
}

fn call(op: &str, args: &[Value], env: &mut Env) -> Result<Value, RuleError> {
    let table = dispatch_table();
    let f: &OpFn = table
        .get(op)
        .ok_or_else(|| RuleError::UnknownOperator(op.to_string()))?;
    f(args, env)
}

/// Evaluate `rule` against `init_data` merged with `data`, storing the
/// result at `$result` in the returned map and preserving every other key
/// (spec §4.B: "The result of a rule is stored at the key $result in the
/// output data map; all other keys ... are preserved").
pub fn evaluate_rule(
    rule: &Value,
    init_data: Map<String, Value>,
    data: Map<String, Value>,
) -> Result<Map<String, Value>, RuleError> {
    let mut merged = init_data;
    for (k, val) in data {
        merged.insert(k, val);
    }
    let mut env = Env::new(Value::Object(merged));
    let result = eval(rule, &mut env)?;

    let mut out = match env.data {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    out.insert("$result".to_string(), result);
    Ok(out)
}

/// Contract used by the Asset Manager's iteration filter (spec §4.B): the
/// rule MUST evaluate to a boolean at `$result`; any error or non-boolean
/// result means "exclude this asset" rather than propagating.
pub fn evaluate_filter(rule: &Value, asset_data: Value) -> bool {
    let mut env = Env::new(asset_data);
    match eval(rule, &mut env) {
        Ok(Value::Bool(b)) => b,
        _ => false,
    }
}

// Re-exported for ops.rs' convenience without a circular `pub use`.
pub(crate) fn truthy(val: &Value) -> bool {
    v::truthy(val)
}

pub(crate) fn get_var(env: &Env, path_str: &str) -> Option<Value> {
    path::get(&env.data, path_str).cloned()
}

pub(crate) fn set_var(env: &mut Env, path_str: &str, val: Value) {
    path::set(&mut env.data, path_str, val)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(rule: Value, data: Value) -> Value {
        let map = match data {
            Value::Object(m) => m,
            _ => Map::new(),
        };
        evaluate_rule(&rule, map, Map::new()).unwrap()["$result"].clone()
    }

    #[test]
    fn literal_passthrough() {
        assert_eq!(run(json!(42), json!({})), json!(42));
    }

    #[test]
    fn var_lookup() {
        assert_eq!(run(json!({"var": "x"}), json!({"x": 7})), json!(7));
    }

    #[test]
    fn var_missing_uses_default() {
        assert_eq!(run(json!({"var": ["missing", 99]}), json!({})), json!(99));
    }

    #[test]
    fn preserves_other_keys() {
        let out = evaluate_rule(
            &json!({"==": [1, 1]}),
            Map::new(),
            serde_json::from_value(json!({"kept": "yes"})).unwrap(),
        )
        .unwrap();
        assert_eq!(out["kept"], json!("yes"));
        assert_eq!(out["$result"], json!(true));
    }
}

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde_json::{Map, Value};

use crate::error::RuleError;
use crate::eval::{eval, get_var, set_var, truthy, Env};
use crate::value::{as_f64, as_str, as_whole_i64, loose_eq};

pub type OpFn = fn(&[Value], &mut Env) -> Result<Value, RuleError>;

/// Operator dispatch table, built once and shared across every evaluation
/// (spec §4.B lists the operator families below; grouped the same way here).
pub fn dispatch_table() -> &'static HashMap<&'static str, OpFn> {
    static TABLE: Lazy<HashMap<&'static str, OpFn>> = Lazy::new(|| {
        let mut m: HashMap<&'static str, OpFn> = HashMap::new();

        // Arithmetic
        m.insert("+", op_add);
        m.insert("-", op_sub);
        m.insert("*", op_mul);
        m.insert("/", op_div);
        m.insert("%", op_mod);

        // Comparison
        m.insert("==", op_eq);
        m.insert("===", op_strict_eq);
        m.insert("!=", op_neq);
        m.insert("!==", op_strict_neq);
        m.insert("<", op_lt);
        m.insert("<=", op_lte);
        m.insert(">", op_gt);
        m.insert(">=", op_gte);

        // Boolean
        m.insert("and", op_and);
        m.insert("or", op_or);
        m.insert("not", op_not);
        m.insert("!", op_not);
        m.insert("bool", op_bool);
        m.insert("!!", op_bool);

        // String
        m.insert("cat", op_cat);
        m.insert("contains", op_contains);
        m.insert("substr", op_substr);

        // Array / map
        m.insert("map", op_map);
        m.insert("filter", op_filter);
        m.insert("reduce", op_reduce);
        m.insert("all", op_all);
        m.insert("some", op_some);
        m.insert("none", op_none);
        m.insert("merge", op_merge);
        m.insert("in", op_in);
        m.insert("dict", op_dict);
        m.insert("keys", op_keys);
        m.insert("has_key", op_has_key);
        m.insert("get", op_get);
        m.insert("len", op_len);

        // Variable access
        m.insert("var", op_var);

        // Assignment
        m.insert("let", op_let);
        m.insert(":=", op_let);

        // Control flow
        m.insert("if", op_if);
        m.insert("while", op_while);
        m.insert("proc", op_proc);

        m
    });
    &TABLE
}

fn eval_all(args: &[Value], env: &mut Env) -> Result<Vec<Value>, RuleError> {
    args.iter().map(|a| eval(a, env)).collect()
}

fn arity(op: &'static str, expected: &'static str, args: &[Value], ok: bool) -> Result<(), RuleError> {
    if ok {
        Ok(())
    } else {
        Err(RuleError::Arity {
            op,
            expected,
            got: args.len(),
        })
    }
}

// ---- arithmetic ----

fn op_add(args: &[Value], env: &mut Env) -> Result<Value, RuleError> {
    let vals = eval_all(args, env)?;
    let mut total = 0.0;
    for v in &vals {
        total += as_f64(v, "+")?;
    }
    Ok(num(total))
}

fn op_sub(args: &[Value], env: &mut Env) -> Result<Value, RuleError> {
    let vals = eval_all(args, env)?;
    arity("-", "1 or 2", args, vals.len() == 1 || vals.len() == 2)?;
    if vals.len() == 1 {
        Ok(num(-as_f64(&vals[0], "-")?))
    } else {
        Ok(num(as_f64(&vals[0], "-")? - as_f64(&vals[1], "-")?))
    }
}

fn op_mul(args: &[Value], env: &mut Env) -> Result<Value, RuleError> {
    let vals = eval_all(args, env)?;
    let mut total = 1.0;
    for v in &vals {
        total *= as_f64(v, "*")?;
    }
    Ok(num(total))
}

fn op_div(args: &[Value], env: &mut Env) -> Result<Value, RuleError> {
    let vals = eval_all(args, env)?;
    arity("/", "2", args, vals.len() == 2)?;
    let denom = as_f64(&vals[1], "/")?;
    if denom == 0.0 {
        return Err(RuleError::DivisionByZero);
    }
    Ok(num(as_f64(&vals[0], "/")? / denom))
}

fn op_mod(args: &[Value], env: &mut Env) -> Result<Value, RuleError> {
    let vals = eval_all(args, env)?;
    arity("%", "2", args, vals.len() == 2)?;
    let a = as_whole_i64(&vals[0], "%")?;
    let b = as_whole_i64(&vals[1], "%")?;
    if b == 0 {
        return Err(RuleError::DivisionByZero);
    }
    Ok(num((a % b) as f64))
}

fn num(f: f64) -> Value {
    serde_json::Number::from_f64(f)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

// ---- comparison ----

fn op_eq(args: &[Value], env: &mut Env) -> Result<Value, RuleError> {
    let vals = eval_all(args, env)?;
    arity("==", "2", args, vals.len() == 2)?;
    Ok(Value::Bool(loose_eq(&vals[0], &vals[1])))
}

fn op_strict_eq(args: &[Value], env: &mut Env) -> Result<Value, RuleError> {
    let vals = eval_all(args, env)?;
    arity("===", "2", args, vals.len() == 2)?;
    Ok(Value::Bool(vals[0] == vals[1]))
}

fn op_neq(args: &[Value], env: &mut Env) -> Result<Value, RuleError> {
    match op_eq(args, env)? {
        Value::Bool(b) => Ok(Value::Bool(!b)),
        _ => unreachable!(),
    }
}

fn op_strict_neq(args: &[Value], env: &mut Env) -> Result<Value, RuleError> {
    match op_strict_eq(args, env)? {
        Value::Bool(b) => Ok(Value::Bool(!b)),
        _ => unreachable!(),
    }
}

/// `<`/`<=` support the 3-arg "between" form: `{"<": [a, b, c]}` means
/// `a < b && b < c` (spec §4.B).
fn chained_cmp(op: &'static str, args: &[Value], env: &mut Env, cmp: fn(f64, f64) -> bool) -> Result<Value, RuleError> {
    let vals = eval_all(args, env)?;
    arity(op, "2 or 3", args, vals.len() == 2 || vals.len() == 3)?;
    let nums: Vec<f64> = vals
        .iter()
        .map(|v| as_f64(v, op))
        .collect::<Result<_, _>>()?;
    Ok(Value::Bool(nums.windows(2).all(|w| cmp(w[0], w[1]))))
}

fn op_lt(args: &[Value], env: &mut Env) -> Result<Value, RuleError> {
    chained_cmp("<", args, env, |a, b| a < b)
}
fn op_lte(args: &[Value], env: &mut Env) -> Result<Value, RuleError> {
    chained_cmp("<=", args, env, |a, b| a <= b)
}
fn op_gt(args: &[Value], env: &mut Env) -> Result<Value, RuleError> {
    chained_cmp(">", args, env, |a, b| a > b)
}
fn op_gte(args: &[Value], env: &mut Env) -> Result<Value, RuleError> {
    chained_cmp(">=", args, env, |a, b| a >= b)
}

// ---- boolean (short-circuit) ----

fn op_and(args: &[Value], env: &mut Env) -> Result<Value, RuleError> {
    let mut last = Value::Bool(true);
    for a in args {
        last = eval(a, env)?;
        if !truthy(&last) {
            return Ok(last);
        }
    }
    Ok(last)
}

fn op_or(args: &[Value], env: &mut Env) -> Result<Value, RuleError> {
    let mut last = Value::Bool(false);
    for a in args {
        last = eval(a, env)?;
        if truthy(&last) {
            return Ok(last);
        }
    }
    Ok(last)
}

fn op_not(args: &[Value], env: &mut Env) -> Result<Value, RuleError> {
    arity("not", "1", args, args.len() == 1)?;
    let v = eval(&args[0], env)?;
    Ok(Value::Bool(!truthy(&v)))
}

fn op_bool(args: &[Value], env: &mut Env) -> Result<Value, RuleError> {
    arity("bool", "1", args, args.len() == 1)?;
    let v = eval(&args[0], env)?;
    Ok(Value::Bool(truthy(&v)))
}

// ---- string ----

fn op_cat(args: &[Value], env: &mut Env) -> Result<Value, RuleError> {
    let vals = eval_all(args, env)?;
    let mut out = String::new();
    for v in &vals {
        match v {
            Value::String(s) => out.push_str(s),
            other => out.push_str(&other.to_string()),
        }
    }
    Ok(Value::String(out))
}

fn op_contains(args: &[Value], env: &mut Env) -> Result<Value, RuleError> {
    let vals = eval_all(args, env)?;
    arity("contains", "2", args, vals.len() == 2)?;
    let haystack = as_str(&vals[0], "contains")?;
    let needle = as_str(&vals[1], "contains")?;
    Ok(Value::Bool(haystack.contains(needle)))
}

/// Python-style negative indices: `start < 0` counts from the end; a
/// negative `length` trims that many characters off the end instead of
/// specifying a count (spec §4.B).
fn op_substr(args: &[Value], env: &mut Env) -> Result<Value, RuleError> {
    let vals = eval_all(args, env)?;
    arity("substr", "2 or 3", args, vals.len() == 2 || vals.len() == 3)?;
    let s = as_str(&vals[0], "substr")?;
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len() as i64;

    let start_raw = as_whole_i64(&vals[1], "substr")?;
    let start = if start_raw < 0 {
        (len + start_raw).max(0)
    } else {
        start_raw.min(len)
    };

    let end = if vals.len() == 3 {
        let l = as_whole_i64(&vals[2], "substr")?;
        if l < 0 {
            (len + l).max(start)
        } else {
            (start + l).min(len)
        }
    } else {
        len
    };

    if start >= end {
        return Ok(Value::String(String::new()));
    }
    let out: String = chars[start as usize..end as usize].iter().collect();
    Ok(Value::String(out))
}

// ---- array / map ----

fn as_array<'a>(v: &'a Value, op: &'static str) -> Result<&'a Vec<Value>, RuleError> {
    v.as_array().ok_or_else(|| RuleError::TypeError {
        op,
        detail: "expected an array".into(),
    })
}

fn op_map(args: &[Value], env: &mut Env) -> Result<Value, RuleError> {
    arity("map", "2", args, args.len() == 2)?;
    let arr = eval(&args[0], env)?;
    let items = as_array(&arr, "map")?.clone();
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        out.push(env.with_scope(item, |scoped| eval(&args[1], scoped))?);
    }
    Ok(Value::Array(out))
}

fn op_filter(args: &[Value], env: &mut Env) -> Result<Value, RuleError> {
    arity("filter", "2", args, args.len() == 2)?;
    let arr = eval(&args[0], env)?;
    let items = as_array(&arr, "filter")?.clone();
    let mut out = Vec::new();
    for item in items {
        let keep = env.with_scope(item.clone(), |scoped| eval(&args[1], scoped))?;
        if truthy(&keep) {
            out.push(item);
        }
    }
    Ok(Value::Array(out))
}

/// Body is evaluated with data `{"current": item, "accumulator": acc}`.
fn op_reduce(args: &[Value], env: &mut Env) -> Result<Value, RuleError> {
    arity("reduce", "3", args, args.len() == 3)?;
    let arr = eval(&args[0], env)?;
    let items = as_array(&arr, "reduce")?.clone();
    let mut acc = eval(&args[2], env)?;
    for item in items {
        let scope = Value::Object(Map::from_iter([
            ("current".to_string(), item),
            ("accumulator".to_string(), acc.clone()),
        ]));
        acc = env.with_scope(scope, |scoped| eval(&args[1], scoped))?;
    }
    Ok(acc)
}

fn quantify(
    args: &[Value],
    env: &mut Env,
    op: &'static str,
    init: bool,
    fold: fn(bool, bool) -> bool,
    empty: bool,
) -> Result<Value, RuleError> {
    arity(op, "2", args, args.len() == 2)?;
    let arr = eval(&args[0], env)?;
    let items = as_array(&arr, op)?.clone();
    if items.is_empty() {
        return Ok(Value::Bool(empty));
    }
    let mut acc = init;
    for item in items {
        let cur = truthy(&env.with_scope(item, |scoped| eval(&args[1], scoped))?);
        acc = fold(acc, cur);
    }
    Ok(Value::Bool(acc))
}

fn op_all(args: &[Value], env: &mut Env) -> Result<Value, RuleError> {
    quantify(args, env, "all", true, |acc, cur| acc && cur, false)
}

fn op_some(args: &[Value], env: &mut Env) -> Result<Value, RuleError> {
    quantify(args, env, "some", false, |acc, cur| acc || cur, false)
}

fn op_none(args: &[Value], env: &mut Env) -> Result<Value, RuleError> {
    match quantify(args, env, "none", false, |acc, cur| acc || cur, false)? {
        Value::Bool(any) => Ok(Value::Bool(!any)),
        _ => unreachable!(),
    }
}

fn op_merge(args: &[Value], env: &mut Env) -> Result<Value, RuleError> {
    let vals = eval_all(args, env)?;
    let mut out = Vec::new();
    for v in vals {
        match v {
            Value::Array(items) => out.extend(items),
            other => out.push(other),
        }
    }
    Ok(Value::Array(out))
}

fn op_in(args: &[Value], env: &mut Env) -> Result<Value, RuleError> {
    let vals = eval_all(args, env)?;
    arity("in", "2", args, vals.len() == 2)?;
    let found = match &vals[1] {
        Value::Array(items) => items.iter().any(|i| loose_eq(i, &vals[0])),
        Value::String(haystack) => {
            let needle = as_str(&vals[0], "in")?;
            haystack.contains(needle)
        }
        Value::Object(map) => {
            let key = as_str(&vals[0], "in")?;
            map.contains_key(key)
        }
        _ => false,
    };
    Ok(Value::Bool(found))
}

/// `{"dict": ["a", 1, "b", 2]}` builds `{"a": 1, "b": 2}` from alternating
/// key/value pairs (spec §4.B).
fn op_dict(args: &[Value], env: &mut Env) -> Result<Value, RuleError> {
    let vals = eval_all(args, env)?;
    arity("dict", "an even number", args, vals.len() % 2 == 0)?;
    let mut map = Map::new();
    for pair in vals.chunks(2) {
        let key = as_str(&pair[0], "dict")?.to_string();
        map.insert(key, pair[1].clone());
    }
    Ok(Value::Object(map))
}

fn op_keys(args: &[Value], env: &mut Env) -> Result<Value, RuleError> {
    arity("keys", "1", args, args.len() == 1)?;
    let v = eval(&args[0], env)?;
    match v {
        Value::Object(map) => Ok(Value::Array(map.keys().map(|k| Value::String(k.clone())).collect())),
        _ => Err(RuleError::TypeError {
            op: "keys",
            detail: "expected an object".into(),
        }),
    }
}

fn op_has_key(args: &[Value], env: &mut Env) -> Result<Value, RuleError> {
    let vals = eval_all(args, env)?;
    arity("has_key", "2", args, vals.len() == 2)?;
    let key = as_str(&vals[1], "has_key")?;
    match &vals[0] {
        Value::Object(map) => Ok(Value::Bool(map.contains_key(key))),
        _ => Ok(Value::Bool(false)),
    }
}

fn op_get(args: &[Value], env: &mut Env) -> Result<Value, RuleError> {
    let vals = eval_all(args, env)?;
    arity("get", "2 or 3", args, vals.len() == 2 || vals.len() == 3)?;
    let found = match (&vals[0], &vals[1]) {
        (Value::Object(map), key) => {
            let k = as_str(key, "get")?;
            map.get(k).cloned()
        }
        (Value::Array(arr), idx) => {
            let i = as_whole_i64(idx, "get")?;
            if i < 0 {
                None
            } else {
                arr.get(i as usize).cloned()
            }
        }
        _ => None,
    };
    match found {
        Some(v) => Ok(v),
        None if vals.len() == 3 => Ok(vals[2].clone()),
        None => Ok(Value::Null),
    }
}

fn op_len(args: &[Value], env: &mut Env) -> Result<Value, RuleError> {
    arity("len", "1", args, args.len() == 1)?;
    let v = eval(&args[0], env)?;
    let n = match &v {
        Value::String(s) => s.chars().count(),
        Value::Array(a) => a.len(),
        Value::Object(o) => o.len(),
        _ => {
            return Err(RuleError::TypeError {
                op: "len",
                detail: "expected a string, array, or object".into(),
            })
        }
    };
    Ok(Value::Number(n.into()))
}

// ---- variable access ----

fn op_var(args: &[Value], env: &mut Env) -> Result<Value, RuleError> {
    if args.is_empty() {
        return Ok(env_data_snapshot(env));
    }
    let path = eval(&args[0], env)?;
    let path_str = match &path {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => {
            return Err(RuleError::TypeError {
                op: "var",
                detail: "path must be a string".into(),
            })
        }
    };
    match get_var(env, &path_str) {
        Some(v) => Ok(v),
        None if args.len() >= 2 => eval(&args[1], env),
        None => Ok(Value::Null),
    }
}

fn env_data_snapshot(env: &Env) -> Value {
    get_var(env, "").unwrap_or(Value::Null)
}

// ---- assignment ----

fn op_let(args: &[Value], env: &mut Env) -> Result<Value, RuleError> {
    arity(":=", "2", args, args.len() == 2)?;
    let path = eval(&args[0], env)?;
    let path_str = as_str(&path, ":=")?.to_string();
    let value = eval(&args[1], env)?;
    set_var(env, &path_str, value.clone());
    Ok(value)
}

// ---- control flow ----

/// `{"if": [cond1, then1, cond2, then2, ..., else]}`; an even argument
/// count omits the trailing else, which then defaults to `null`.
fn op_if(args: &[Value], env: &mut Env) -> Result<Value, RuleError> {
    if args.is_empty() {
        return Ok(Value::Null);
    }
    let mut i = 0;
    while i + 1 < args.len() {
        let cond = eval(&args[i], env)?;
        if truthy(&cond) {
            return eval(&args[i + 1], env);
        }
        i += 2;
    }
    if i < args.len() {
        eval(&args[i], env)
    } else {
        Ok(Value::Null)
    }
}

fn op_while(args: &[Value], env: &mut Env) -> Result<Value, RuleError> {
    arity("while", "2", args, args.len() == 2)?;
    let mut last = Value::Null;
    loop {
        env.tick()?;
        let cond = eval(&args[0], env)?;
        if !truthy(&cond) {
            break;
        }
        last = eval(&args[1], env)?;
    }
    Ok(last)
}

fn op_proc(args: &[Value], env: &mut Env) -> Result<Value, RuleError> {
    let mut last = Value::Null;
    for a in args {
        last = eval(a, env)?;
    }
    Ok(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::evaluate_rule;
    use serde_json::json;

    fn run(rule: Value, data: Value) -> Value {
        let map = match data {
            Value::Object(m) => m,
            _ => Map::new(),
        };
        evaluate_rule(&rule, map, Map::new()).unwrap()["$result"].clone()
    }

    #[test]
    fn arithmetic() {
        assert_eq!(run(json!({"+": [1, 2, 3]}), json!({})), json!(6.0));
        assert_eq!(run(json!({"-": [5]}), json!({})), json!(-5.0));
        assert_eq!(run(json!({"%": [7, 3]}), json!({})), json!(1.0));
    }

    #[test]
    fn between_form() {
        assert_eq!(run(json!({"<": [1, 2, 3]}), json!({})), json!(true));
        assert_eq!(run(json!({"<": [1, 5, 3]}), json!({})), json!(false));
    }

    #[test]
    fn loose_vs_strict_eq() {
        assert_eq!(run(json!({"==": ["1", 1]}), json!({})), json!(true));
        assert_eq!(run(json!({"===": ["1", 1]}), json!({})), json!(false));
    }

    #[test]
    fn and_or_short_circuit() {
        assert_eq!(run(json!({"and": [true, false, true]}), json!({})), json!(false));
        assert_eq!(run(json!({"or": [false, 0, "hit"]}), json!({})), json!("hit"));
    }

    #[test]
    fn substr_negative_indices() {
        assert_eq!(run(json!({"substr": ["hello world", -5]}), json!({})), json!("world"));
        assert_eq!(run(json!({"substr": ["hello world", 0, -6]}), json!({})), json!("hello"));
    }

    #[test]
    fn map_filter_reduce() {
        assert_eq!(
            run(json!({"map": [[1, 2, 3], {"*": [{"var": ""}, 2]}]}), json!({})),
            json!([2.0, 4.0, 6.0])
        );
        assert_eq!(
            run(json!({"filter": [[1, 2, 3, 4], {">": [{"var": ""}, 2]}]}), json!({})),
            json!([3, 4])
        );
        assert_eq!(
            run(
                json!({"reduce": [[1, 2, 3], {"+": [{"var": "accumulator"}, {"var": "current"}]}, 0]}),
                json!({})
            ),
            json!(6.0)
        );
    }

    #[test]
    fn quantifiers() {
        assert_eq!(run(json!({"all": [[1, 2, 3], {">": [{"var": ""}, 0]}]}), json!({})), json!(true));
        assert_eq!(run(json!({"some": [[1, 2, 3], {">": [{"var": ""}, 2]}]}), json!({})), json!(true));
        assert_eq!(run(json!({"none": [[1, 2, 3], {">": [{"var": ""}, 5]}]}), json!({})), json!(true));
        assert_eq!(run(json!({"all": [[], true]}), json!({})), json!(false));
    }

    #[test]
    fn dict_and_get() {
        assert_eq!(run(json!({"dict": ["a", 1, "b", 2]}), json!({})), json!({"a": 1, "b": 2}));
        assert_eq!(run(json!({"get": [{"a": 1}, "b", "fallback"]}), json!({})), json!("fallback"));
    }

    #[test]
    fn let_and_var_roundtrip() {
        let out = evaluate_rule(
            &json!({"proc": [{":=": ["x", 5]}, {"var": "x"}]}),
            Map::new(),
            Map::new(),
        )
        .unwrap();
        assert_eq!(out["x"], json!(5));
        assert_eq!(out["$result"], json!(5));
    }

    #[test]
    fn if_chain() {
        assert_eq!(run(json!({"if": [false, "a", true, "b", "c"]}), json!({})), json!("b"));
        assert_eq!(run(json!({"if": [false, "a", "else"]}), json!({})), json!("else"));
    }
}

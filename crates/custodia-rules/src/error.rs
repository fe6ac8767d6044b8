use thiserror::Error;

/// Failures from evaluating a rule expression (spec §4.B).
///
/// `custodia-assets` treats every one of these as "exclude this asset and
/// continue iteration" when the rule is used as a filter predicate (spec
/// §4.B filter contract).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RuleError {
    #[error("unknown operator: {0}")]
    UnknownOperator(String),

    #[error("operator {op} expects {expected}, got {got} argument(s)")]
    Arity {
        op: &'static str,
        expected: &'static str,
        got: usize,
    },

    #[error("operator {op} requires an integer value, got {value}")]
    NotAWholeNumber { op: &'static str, value: f64 },

    #[error("type error in {op}: {detail}")]
    TypeError { op: &'static str, detail: String },

    #[error("variable path not found and no default given: {0}")]
    MissingVariable(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("index out of bounds: {0}")]
    IndexOutOfBounds(isize),

    #[error("malformed expression: {0}")]
    MalformedExpression(String),

    #[error("while loop exceeded maximum iteration bound")]
    LoopBoundExceeded,
}

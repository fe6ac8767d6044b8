//! JSON-Logic-style rule evaluator used as the Asset Manager's filter
//! predicate contract: a boolean expression tree, evaluated against a data
//! map built from an asset's public/private fields.

mod error;
mod eval;
mod ops;
mod path;
mod value;

pub use error::RuleError;
pub use eval::{evaluate_filter, evaluate_rule, Env};

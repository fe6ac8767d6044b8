use thiserror::Error;

/// Stable error taxonomy for the Custodia core (spec §7).
///
/// Every variant carries a free-form message but never key material or
/// plaintext. Callers match on the variant to decide how to react; the
/// message is for logs and humans only.
#[derive(Debug, Error)]
pub enum CustodiaError {
    /// Malformed id, bad key path, wrong arity, unsupported option.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Target object (asset, edge, datatype, user) absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// Strict add against an existing object.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Hash mismatch, decrypt failure, index row corruption.
    #[error("integrity error: {0}")]
    IntegrityError(String),

    /// Authorization denied. No information about missing edges is
    /// leaked beyond this boolean-shaped error.
    #[error("access denied")]
    NoAccess,

    /// Host ledger or external datastore returned an error.
    #[error("dependency error: {0}")]
    DependencyError(String),
}

impl CustodiaError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn already_exists(msg: impl Into<String>) -> Self {
        Self::AlreadyExists(msg.into())
    }

    pub fn integrity(msg: impl Into<String>) -> Self {
        Self::IntegrityError(msg.into())
    }

    pub fn dependency(msg: impl Into<String>) -> Self {
        Self::DependencyError(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, CustodiaError>;

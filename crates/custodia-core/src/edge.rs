use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::KeyId;

/// Strongly typed KAG edge metadata (spec §9 Design Notes).
///
/// The distilled source models `edge_data` as an untagged
/// `HashMap<String, String>`; here it is a tagged union plus a
/// forward-compatible annotation map, which removes the "forgot to check
/// access_type" class of bugs while still letting a caller stash arbitrary
/// string annotations.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum EdgeKind {
    /// Grants read access to whatever the edge reaches.
    Read,
    /// Grants read+write access.
    Write,
    /// Grants write access only, realized via a phantom target key id that
    /// the grantee cannot use to recover read access.
    WriteOnly { phantom_key_id: KeyId },
    /// An asset is tagged with `datatype_id`; edge sits between the
    /// datatype key and the asset key.
    Datatype { datatype_id: String },
    /// `source` directly administers the group `target`.
    Admin,
    /// `source` is a member of the group `target`.
    Member,
}

impl EdgeKind {
    pub fn access_type_str(&self) -> &'static str {
        match self {
            EdgeKind::Read => "read",
            EdgeKind::Write => "write",
            EdgeKind::WriteOnly { .. } => "write_only",
            EdgeKind::Datatype { .. } => "datatype",
            EdgeKind::Admin => "admin",
            EdgeKind::Member => "member",
        }
    }

    /// Whether this edge kind satisfies a request for `requested` access.
    /// Write edges implicitly satisfy read requests (spec §4.D: "write
    /// access positive results implicitly satisfy read checks").
    pub fn satisfies(&self, requested: AccessType) -> bool {
        match (self, requested) {
            (EdgeKind::Read, AccessType::Read) => true,
            (EdgeKind::Write, AccessType::Read | AccessType::Write) => true,
            (EdgeKind::WriteOnly { .. }, AccessType::Write) => true,
            _ => false,
        }
    }
}

/// The access level a caller is requesting or has been granted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessType {
    Read,
    Write,
    WriteOnly,
}

/// Edge metadata persisted alongside the wrapped key bytes.
///
/// `kind` drives authorization decisions; `annotations` is a small
/// string→string map for forward-compatible, non-authorizing metadata
/// (spec §3: "recognized keys: access_type, edge, datatype").
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EdgeData {
    pub kind: EdgeKind,
    #[serde(default)]
    pub annotations: HashMap<String, String>,
}

impl EdgeData {
    pub fn new(kind: EdgeKind) -> Self {
        Self {
            kind,
            annotations: HashMap::new(),
        }
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }
}

/// A directed KAG edge as stored on the ledger (spec §3 KAG Edge).
///
/// Identified by the ordered pair `(source_key_id, target_key_id)`. At most
/// one edge exists per ordered pair; `edge_data` may be updated in place
/// but the key pair is immutable for the edge's lifetime.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Edge {
    pub source_key_id: KeyId,
    pub target_key_id: KeyId,
    /// `source`-encrypt(`target`.material), produced by `custodia-crypto`.
    pub wrapped_target: Vec<u8>,
    pub edge_data: EdgeData,
}

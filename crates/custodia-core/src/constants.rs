//! ─── Custodia core constants ────────────────────────────────────────────────

// ── Key / asset id conventions ──────────────────────────────────────────────

/// Prefix every asset id must carry (spec §6).
pub use crate::types::ASSET_ID_PREFIX;

/// Derived-id prefix for a user's asymmetric public key.
pub const USER_PUBLIC_KEY_PREFIX: &str = "user-pub-";

/// Derived-id prefix for a user's asymmetric private key.
pub const USER_PRIVATE_KEY_PREFIX: &str = "user-priv-";

/// Derived-id prefix for a user's symmetric key.
pub const USER_SYM_KEY_PREFIX: &str = "user-sym-";

/// Derived-id prefix for a user's log symmetric key.
pub const USER_LOG_KEY_PREFIX: &str = "user-log-";

/// Derived-id prefix for a per-asset symmetric key.
pub const ASSET_KEY_PREFIX: &str = "asset-key-";

/// Derived-id prefix for a (datatype, owner) datatype key.
pub const DATATYPE_KEY_PREFIX: &str = "datatype-key-";

/// Derived-id prefix for a phantom write-only target key (spec §4.D).
pub const WRITE_ONLY_KEY_PREFIX: &str = "write-only-";

/// Derived-id prefix for a deterministic consent edge source.
pub const CONSENT_KEY_PREFIX: &str = "consent-";

// ── KAG traversal ────────────────────────────────────────────────────────────

/// Group-admin closure traversal depth (spec §4.D strategy 5: "one hop").
pub const GROUP_ADMIN_TRAVERSAL_DEPTH: usize = 1;

/// Bound on BFS depth when resolving transitive group membership (spec §4.G).
pub const MAX_GROUP_MEMBERSHIP_BFS_DEPTH: usize = 32;

// ── Ledger key namespace ─────────────────────────────────────────────────────

/// Delimiter byte used inside composite-key encoding (spec §6).
pub const COMPOSITE_KEY_DELIMITER: u8 = 0x00;

/// Prefix byte composite keys are renormalized under to avoid colliding with
/// simple keys (spec §4.C).
pub const COMPOSITE_KEY_NORMALIZED_PREFIX: u8 = 0x02;

/// Max-unicode-rune sentinel used to make a range end open (spec §4.E/§6).
pub const MAX_UNICODE_RUNE: char = '\u{10FFFF}';

// ── Index engine ─────────────────────────────────────────────────────────────

/// Fixed width the canonical numeric encoder pads integer digits to, so that
/// lexical order equals numeric order (spec §4.E).
pub const NUMERIC_ENCODING_INT_WIDTH: usize = 20;

/// Fixed number of fractional digits kept by the canonical numeric encoder.
pub const NUMERIC_ENCODING_FRAC_DIGITS: usize = 6;

// ── Iteration ────────────────────────────────────────────────────────────────

/// Sentinel meaning "no limit" for `get_asset_iter` (spec §4.F).
pub const ITER_NO_LIMIT: i64 = -1;

/// Default page size used by callers that don't specify one explicitly.
pub const DEFAULT_ITER_PAGE_SIZE: usize = 100;

use custodia_core::constants::{DEFAULT_ITER_PAGE_SIZE, GROUP_ADMIN_TRAVERSAL_DEPTH};
use custodia_ledger::CacheConfig;

/// Tunables the distilled spec hard-codes or scatters (spec §3.1): cache
/// behavior, iterator page size, and the group-admin traversal bound. A
/// host embedding this library constructs one of these programmatically —
/// there is no file-based loader, matching the teacher's pattern of
/// passing constructor arguments rather than reading config files from
/// within the core crates.
#[derive(Debug, Clone)]
pub struct CustodiaConfig {
    pub cache: CacheConfig,
    pub default_page_size: usize,
    pub group_admin_traversal_depth: usize,
    pub rsa_key_bits: usize,
    pub aes_key_bits: usize,
    /// Upper bound on the number of parts a single composite ledger key
    /// may carry, guarding against unbounded index definitions.
    pub max_composite_key_segments: usize,
}

impl Default for CustodiaConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            default_page_size: DEFAULT_ITER_PAGE_SIZE,
            group_admin_traversal_depth: GROUP_ADMIN_TRAVERSAL_DEPTH,
            rsa_key_bits: 2048,
            aes_key_bits: 256,
            max_composite_key_segments: 16,
        }
    }
}

impl CustodiaConfig {
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_default_page_size(mut self, size: usize) -> Self {
        self.default_page_size = size;
        self
    }
}

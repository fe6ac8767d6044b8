use serde::{Deserialize, Serialize};
use tracing::instrument;

use custodia_core::constants::{
    USER_LOG_KEY_PREFIX, USER_PRIVATE_KEY_PREFIX, USER_PUBLIC_KEY_PREFIX, USER_SYM_KEY_PREFIX,
};
use custodia_core::{CustodiaError, EdgeData, EdgeKind, Key, KeyId, KeyKind, Result};
use custodia_kag::add_edge;
use custodia_ledger::{CachedLedger, HostLedger};

/// The four keys owned by a User (spec §3: "asymmetric key pair, a
/// symmetric key, and a derived log symmetric key").
pub struct UserKeys {
    pub public_key: Key,
    pub private_key: Key,
    pub sym_key: Key,
    pub log_key: Key,
}

/// Metadata persisted as a User asset's `private_data` (spec §4.G). Key
/// material itself is never stored here — only the ids.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserRecord {
    pub display_name: String,
    pub is_group: bool,
    pub public_key_id: KeyId,
    pub private_key_id: KeyId,
    pub sym_key_id: KeyId,
    pub log_key_id: KeyId,
}

/// Generate a fresh key quartet for user or group `slug` (spec §3/§4.G).
/// The log key is derived from the symmetric key's material so it never
/// needs its own KAG edge to be recoverable by the user.
pub fn generate_user_keys(slug: &str) -> UserKeys {
    let (public_key, private_key) = custodia_crypto::generate_asymmetric_key(
        KeyId::new(format!("{USER_PUBLIC_KEY_PREFIX}{slug}")),
        KeyId::new(format!("{USER_PRIVATE_KEY_PREFIX}{slug}")),
    )
    .expect("RSA-2048 keypair generation");
    let sym_key = custodia_crypto::generate_symmetric_key(KeyId::new(format!(
        "{USER_SYM_KEY_PREFIX}{slug}"
    )));
    let mut log_seed = sym_key.material().to_vec();
    log_seed.extend_from_slice(b"log");
    let log_key = custodia_crypto::symmetric_key_from_seed(
        KeyId::new(format!("{USER_LOG_KEY_PREFIX}{slug}")),
        &log_seed,
    );
    UserKeys {
        public_key,
        private_key,
        sym_key,
        log_key,
    }
}

/// A proxy `Key` used only to drive `custodia_crypto::wrap` for edges whose
/// stored source id is a private key but whose actual encryption must use
/// the matching public key — RSA-OAEP only encrypts under the public half,
/// so `user.priv → X` edges are wrapped this way rather than with the
/// private key itself (which `custodia_kag::add_edge` would reject).
fn private_holder_proxy(private_key_id: &KeyId, public_key_material: &[u8]) -> Key {
    Key::new(
        private_key_id.clone(),
        KeyKind::AsymmetricPublic,
        public_key_material.to_vec(),
    )
}

/// Seed the KAG edges that let `caller` recover `user`'s symmetric key and
/// let the user recover their own symmetric key from their private key
/// (spec §4.G: "caller→user.pub, caller→user.sym, user.priv→user.sym").
/// `caller→user.pub` is omitted: public key material needs no
/// confidentiality-preserving edge (see DESIGN.md).
#[instrument(skip(ledger, caller, keys), fields(user = %keys.sym_key.key_id))]
pub fn seed_user_edges<L: HostLedger>(
    ledger: &CachedLedger<L>,
    caller: &Key,
    keys: &UserKeys,
) -> Result<()> {
    add_edge(ledger, caller, &keys.sym_key, EdgeData::new(EdgeKind::Read))?;
    let proxy = private_holder_proxy(&keys.private_key.key_id, keys.public_key.material());
    add_edge(ledger, &proxy, &keys.sym_key, EdgeData::new(EdgeKind::Read))?;
    Ok(())
}

/// Create a group: same key quartet as a user, `is_group = true` on the
/// record (spec §4.G: "A Group is a User with `is_group = true`").
pub fn generate_group_keys(slug: &str) -> UserKeys {
    generate_user_keys(slug)
}

/// `admin: user.priv → group.priv` with `edge="admin"` (spec §4.G). Uses
/// the same private-holder proxy technique as `seed_user_edges`.
pub fn grant_group_admin<L: HostLedger>(
    ledger: &CachedLedger<L>,
    admin_private_key_id: &KeyId,
    admin_public_key_material: &[u8],
    group_private_key: &Key,
) -> Result<()> {
    if group_private_key.kind != KeyKind::AsymmetricPrivate {
        return Err(CustodiaError::invalid_input("group admin target must be a private key"));
    }
    let proxy = private_holder_proxy(admin_private_key_id, admin_public_key_material);
    add_edge(ledger, &proxy, group_private_key, EdgeData::new(EdgeKind::Admin))
}

/// `member: user.sym → group.sym` with `edge="member"` (spec §4.G).
pub fn grant_group_membership<L: HostLedger>(
    ledger: &CachedLedger<L>,
    member_sym_key: &Key,
    group_sym_key: &Key,
) -> Result<()> {
    add_edge(ledger, member_sym_key, group_sym_key, EdgeData::new(EdgeKind::Member))
}

#[cfg(test)]
mod tests {
    use super::*;
    use custodia_ledger::{CacheConfig, MemoryLedger};

    #[test]
    fn seed_user_edges_let_caller_and_self_recover_sym_key() {
        let host = MemoryLedger::new("tx", 0);
        let ledger = CachedLedger::new(&host, CacheConfig::default());
        let caller = custodia_crypto::generate_symmetric_key(KeyId::new("user-sym-caller"));
        let keys = generate_user_keys("alice");

        seed_user_edges(&ledger, &caller, &keys).unwrap();

        let via_caller = custodia_kag::get_edge(&ledger, &caller.key_id, &keys.sym_key.key_id)
            .unwrap()
            .unwrap();
        let recovered = custodia_crypto::unwrap(&caller, &via_caller.wrapped_target).unwrap();
        assert_eq!(recovered, keys.sym_key.material());

        let via_priv = custodia_kag::get_edge(&ledger, &keys.private_key.key_id, &keys.sym_key.key_id)
            .unwrap()
            .unwrap();
        let recovered = custodia_crypto::unwrap(&keys.private_key, &via_priv.wrapped_target).unwrap();
        assert_eq!(recovered, keys.sym_key.material());
    }

    #[test]
    fn group_admin_and_membership_edges_round_trip() {
        let host = MemoryLedger::new("tx", 0);
        let ledger = CachedLedger::new(&host, CacheConfig::default());
        let admin = generate_user_keys("admin");
        let group = generate_group_keys("g1");

        grant_group_admin(&ledger, &admin.private_key.key_id, admin.public_key.material(), &group.private_key).unwrap();
        grant_group_membership(&ledger, &admin.sym_key, &group.sym_key).unwrap();

        let admin_edge = custodia_kag::get_edge(&ledger, &admin.private_key.key_id, &group.private_key.key_id)
            .unwrap()
            .unwrap();
        assert_eq!(admin_edge.edge_data.kind, EdgeKind::Admin);
        let member_edge = custodia_kag::get_edge(&ledger, &admin.sym_key.key_id, &group.sym_key.key_id)
            .unwrap()
            .unwrap();
        assert_eq!(member_edge.edge_data.kind, EdgeKind::Member);
    }
}

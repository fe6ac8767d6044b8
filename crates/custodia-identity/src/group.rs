use std::collections::{HashSet, VecDeque};

use custodia_core::constants::MAX_GROUP_MEMBERSHIP_BFS_DEPTH;
use custodia_core::{EdgeKind, KeyId, Result};
use custodia_kag::edges_from;
use custodia_ledger::{CachedLedger, HostLedger};

/// Bounded BFS over edges of `kind_filter` starting at `start`, stopping as
/// soon as `target` is reached or `MAX_GROUP_MEMBERSHIP_BFS_DEPTH` hops have
/// been exhausted (spec §4.G: "Transitive membership is answered by a
/// bounded BFS over member edges; admin checks follow admin edges").
fn bfs_reaches<L: HostLedger>(
    ledger: &CachedLedger<L>,
    start: &KeyId,
    target: &KeyId,
    kind_filter: impl Fn(&EdgeKind) -> bool,
) -> Result<bool> {
    if start == target {
        return Ok(true);
    }
    let mut visited: HashSet<KeyId> = HashSet::new();
    visited.insert(start.clone());
    let mut frontier: VecDeque<(KeyId, usize)> = VecDeque::new();
    frontier.push_back((start.clone(), 0));

    while let Some((current, depth)) = frontier.pop_front() {
        if depth >= MAX_GROUP_MEMBERSHIP_BFS_DEPTH {
            continue;
        }
        for edge in edges_from(ledger, &current)? {
            if !kind_filter(&edge.edge_data.kind) {
                continue;
            }
            if &edge.target_key_id == target {
                return Ok(true);
            }
            if visited.insert(edge.target_key_id.clone()) {
                frontier.push_back((edge.target_key_id, depth + 1));
            }
        }
    }
    Ok(false)
}

/// `true` iff `member_sym_key_id` is transitively a member of
/// `group_sym_key_id`, following `member` edges (group-of-groups allowed).
pub fn is_member<L: HostLedger>(
    ledger: &CachedLedger<L>,
    member_sym_key_id: &KeyId,
    group_sym_key_id: &KeyId,
) -> Result<bool> {
    bfs_reaches(ledger, member_sym_key_id, group_sym_key_id, |k| {
        matches!(k, EdgeKind::Member)
    })
}

/// `true` iff `admin_private_key_id` transitively administers
/// `group_private_key_id`, following `admin` edges.
pub fn is_admin<L: HostLedger>(
    ledger: &CachedLedger<L>,
    admin_private_key_id: &KeyId,
    group_private_key_id: &KeyId,
) -> Result<bool> {
    bfs_reaches(ledger, admin_private_key_id, group_private_key_id, |k| {
        matches!(k, EdgeKind::Admin)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::{generate_group_keys, generate_user_keys, grant_group_admin, grant_group_membership};
    use custodia_ledger::{CacheConfig, MemoryLedger};

    #[test]
    fn transitive_membership_through_group_of_groups() {
        let host = MemoryLedger::new("tx", 0);
        let ledger = CachedLedger::new(&host, CacheConfig::default());
        let alice = generate_user_keys("alice");
        let inner = generate_group_keys("inner");
        let outer = generate_group_keys("outer");

        grant_group_membership(&ledger, &alice.sym_key, &inner.sym_key).unwrap();
        grant_group_membership(&ledger, &inner.sym_key, &outer.sym_key).unwrap();

        assert!(is_member(&ledger, &alice.sym_key.key_id, &outer.sym_key.key_id).unwrap());
        assert!(!is_member(&ledger, &outer.sym_key.key_id, &alice.sym_key.key_id).unwrap());
    }

    #[test]
    fn admin_closure_is_direct_by_default() {
        let host = MemoryLedger::new("tx", 0);
        let ledger = CachedLedger::new(&host, CacheConfig::default());
        let admin = generate_user_keys("admin");
        let group = generate_group_keys("g1");
        grant_group_admin(&ledger, &admin.private_key.key_id, admin.public_key.material(), &group.private_key).unwrap();
        assert!(is_admin(&ledger, &admin.private_key.key_id, &group.private_key.key_id).unwrap());

        let stranger = generate_user_keys("stranger");
        assert!(!is_admin(&ledger, &stranger.private_key.key_id, &group.private_key.key_id).unwrap());
    }
}

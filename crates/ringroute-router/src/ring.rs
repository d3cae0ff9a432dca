//! Consistent-hash ring.
//!
//! Each backend is projected onto the ring at [`VIRTUAL_NODES_PER_NODE`]
//! positions so that load spreads evenly and removing one backend only
//! remaps the keys that sat on its own positions. The ring is built once
//! from the registry and never mutated afterwards, so request handlers can
//! share it behind an `Arc` without locking.

use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use crate::registry::NodeRegistry;

/// Ring positions each backend occupies.
pub const VIRTUAL_NODES_PER_NODE: usize = 10;

/// Hashes a ring label or routing key to its position on the ring.
///
/// FNV-1a over the characters of the label, followed by an avalanche mix,
/// both carried out in 32-bit signed wraparound arithmetic with the sign
/// dropped at the end. Existing deployments depend on these exact positions,
/// so the sequence must not change.
pub fn hash_label(label: &str) -> u32 {
    let mut hash = 2_166_136_261_u32 as i32;
    for ch in label.chars() {
        hash = (hash ^ ch as i32).wrapping_mul(16_777_619);
    }
    hash = hash.wrapping_add(hash << 13);
    hash ^= hash >> 7;
    hash = hash.wrapping_add(hash << 3);
    hash ^= hash >> 17;
    hash = hash.wrapping_add(hash << 5);
    hash.unsigned_abs()
}

/// One ring position owned by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualNode {
    /// Synthetic label the position was hashed from, e.g. `127.0.0.1:9001&&VN3`.
    pub label: String,
    /// Identity of the owning backend, e.g. `127.0.0.1:9001`.
    pub owner: String,
}

/// Ordered ring of virtual nodes, keyed by hash position.
#[derive(Debug, Clone)]
pub struct HashRing {
    entries: BTreeMap<u32, VirtualNode>,
}

impl HashRing {
    /// Builds the ring with the default replica count.
    pub fn build(registry: &NodeRegistry) -> Self {
        Self::with_replicas(registry, VIRTUAL_NODES_PER_NODE)
    }

    /// Builds the ring with an explicit replica count per backend.
    ///
    /// Position collisions are resolved last-write-wins; they mean one
    /// backend silently loses a position, so they are logged rather than
    /// ignored.
    pub fn with_replicas(registry: &NodeRegistry, replicas: usize) -> Self {
        let mut entries = BTreeMap::new();

        for node in registry.nodes() {
            let identity = node.identity();
            for index in 0..replicas {
                let label = format!("{identity}&&VN{index}");
                let position = hash_label(&label);
                let vnode = VirtualNode {
                    label,
                    owner: identity.clone(),
                };

                if let Some(displaced) = entries.insert(position, vnode) {
                    warn!(
                        "hash collision at ring position {}: displaced virtual node {}",
                        position, displaced.label
                    );
                }
            }
        }

        Self { entries }
    }

    /// Resolves a routing key to the virtual node that owns it.
    ///
    /// The owner is the first entry at or clockwise of the key's hash,
    /// wrapping to the smallest position when the key hashes past the last
    /// entry. Returns `None` only for an empty ring.
    pub fn lookup(&self, key: &str) -> Option<&VirtualNode> {
        self.entry_at(hash_label(key))
    }

    fn entry_at(&self, position: u32) -> Option<&VirtualNode> {
        self.entries
            .range(position..)
            .next()
            .or_else(|| self.entries.iter().next())
            .map(|(_, vnode)| vnode)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct backend identities present on the ring.
    pub fn owners(&self) -> BTreeSet<&str> {
        self.entries
            .values()
            .map(|vnode| vnode.owner.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Node;

    fn registry(ports: &[u16]) -> NodeRegistry {
        NodeRegistry::new(
            ports
                .iter()
                .map(|&port| Node::new("127.0.0.1", port))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_hash_is_deterministic() {
        let key = "1.2.3.4#req-42";
        assert_eq!(hash_label(key), hash_label(key));
    }

    #[test]
    fn test_hash_differs_across_labels() {
        assert_ne!(
            hash_label("127.0.0.1:9001&&VN0"),
            hash_label("127.0.0.1:9001&&VN1")
        );
    }

    #[test]
    fn test_two_nodes_produce_twenty_entries() {
        let ring = HashRing::build(&registry(&[9001, 9002]));
        assert_eq!(ring.len(), 20);
    }

    #[test]
    fn test_every_node_owns_replica_count_positions() {
        let ring = HashRing::build(&registry(&[9001, 9002, 9003]));

        for identity in ["127.0.0.1:9001", "127.0.0.1:9002", "127.0.0.1:9003"] {
            let owned = ring
                .entries
                .values()
                .filter(|vnode| vnode.owner == identity)
                .count();
            assert_eq!(owned, VIRTUAL_NODES_PER_NODE, "positions for {identity}");
        }
    }

    #[test]
    fn test_lookup_is_stable() {
        let ring = HashRing::build(&registry(&[9001, 9002]));

        let first = ring.lookup("1.2.3.4#req-42").unwrap();
        let second = ring.lookup("1.2.3.4#req-42").unwrap();
        assert_eq!(first, second);
        assert!(first.owner == "127.0.0.1:9001" || first.owner == "127.0.0.1:9002");
    }

    #[test]
    fn test_lookup_wraps_past_last_entry() {
        let ring = HashRing::build(&registry(&[9001, 9002]));

        let max_position = *ring.entries.keys().max().unwrap();
        let min_position = *ring.entries.keys().min().unwrap();

        // A position past the last entry belongs to the first one.
        let wrapped = ring.entry_at(max_position + 1).unwrap();
        assert_eq!(wrapped, &ring.entries[&min_position]);
    }

    #[test]
    fn test_lookup_finds_clockwise_successor() {
        let ring = HashRing::build(&registry(&[9001, 9002]));
        let min_position = *ring.entries.keys().min().unwrap();

        // Position 0 is at or before every entry, so its successor is the
        // smallest entry on the ring.
        let entry = ring.entry_at(0).unwrap();
        assert_eq!(entry, &ring.entries[&min_position]);
    }

    #[test]
    fn test_empty_replicas_yield_empty_ring() {
        let ring = HashRing::with_replicas(&registry(&[9001]), 0);
        assert!(ring.is_empty());
        assert!(ring.lookup("anything").is_none());
    }

    #[test]
    fn test_owners_lists_every_backend() {
        let ring = HashRing::build(&registry(&[9001, 9002]));
        let owners = ring.owners();
        assert_eq!(owners.len(), 2);
        assert!(owners.contains("127.0.0.1:9001"));
        assert!(owners.contains("127.0.0.1:9002"));
    }

    #[test]
    fn test_removing_a_node_only_remaps_its_own_keys() {
        let before = HashRing::build(&registry(&[9001, 9002, 9003]));
        let after = HashRing::build(&registry(&[9001, 9002]));

        for i in 0..200 {
            let key = format!("10.0.0.{}#req-{i}", i % 16);
            let owner_before = &before.lookup(&key).unwrap().owner;
            let owner_after = &after.lookup(&key).unwrap().owner;

            // Keys that did not sit on the removed backend keep their owner.
            if owner_before != "127.0.0.1:9003" {
                assert_eq!(owner_before, owner_after, "key {key} moved needlessly");
            }
        }
    }
}

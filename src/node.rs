//! The node engine: a fixed-fanout, sorted container of (key, value)
//! entries shared by the leaf and branch flavors.
//!
//! One mutex per node guards the sorted data vector and prefix table.
//! Insert and remove are `lower_bound`-based; `list` doubles as the
//! iteration core `serialize` reuses while already holding the lock
//! (see [`list_locked`] below).

use std::sync::Mutex;

use log::{debug, trace};

use crate::error::BplusError;
use crate::flags;
use crate::key::{FenceKey, Interval, KeyOps, LeafKey, PrefixTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum NodeKind {
    Leaf = 0,
    Branch = 1,
}

impl NodeKind {
    pub fn from_tag(tag: u8) -> Result<Self, BplusError> {
        match tag {
            0 => Ok(NodeKind::Leaf),
            1 => Ok(NodeKind::Branch),
            other => Err(BplusError::UnknownNodeType(other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Entry<K> {
    pub key: K,
    pub value: Vec<u8>,
}

#[derive(Debug)]
pub(crate) struct NodeState<K> {
    pub(crate) entries: Vec<Entry<K>>,
    pub(crate) prefix_table: PrefixTable,
}

/// A sorted, fixed-fanout container of (key, value) entries. Leaf
/// nodes hold terminal data (`K = LeafKey`); branch nodes hold
/// interior routing entries (`K = FenceKey`). See [`LeafNode`] /
/// [`BranchNode`].
#[derive(Debug)]
pub struct Node<K> {
    kind: NodeKind,
    fanout: u32,
    prefix_min_len: u16,
    bounds: Interval,
    state: Mutex<NodeState<K>>,
}

pub type LeafNode = Node<LeafKey>;
pub type BranchNode = Node<FenceKey>;

impl LeafNode {
    pub fn new(fanout: u32, prefix_min_len: u16) -> Self {
        Self::with_bounds(fanout, prefix_min_len, Interval::unbounded())
    }

    pub fn with_bounds(fanout: u32, prefix_min_len: u16, bounds: Interval) -> Self {
        Node {
            kind: NodeKind::Leaf,
            fanout,
            prefix_min_len,
            bounds,
            state: Mutex::new(NodeState {
                entries: Vec::new(),
                prefix_table: PrefixTable::new(),
            }),
        }
    }
}

impl BranchNode {
    pub fn new(fanout: u32, prefix_min_len: u16, bounds: Interval) -> Self {
        Node {
            kind: NodeKind::Branch,
            fanout,
            prefix_min_len,
            bounds,
            state: Mutex::new(NodeState {
                entries: Vec::new(),
                prefix_table: PrefixTable::new(),
            }),
        }
    }
}

impl<K: KeyOps> Node<K> {
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn fanout(&self) -> u32 {
        self.fanout
    }

    pub fn prefix_min_len(&self) -> u16 {
        self.prefix_min_len
    }

    pub fn bounds(&self) -> &Interval {
        &self.bounds
    }

    pub fn size(&self) -> usize {
        self.state.lock().unwrap().entries.len()
    }

    pub fn clear(&self, flags: u32) {
        let mut guard = self.lock_unless(flags);
        guard.entries.clear();
    }

    /// `std::sync::Mutex` has no `defer_lock`/already-held mode, so the
    /// `LOCKED` flag only has real meaning for `serialize`'s internal
    /// reentry via [`list_locked`]; public callers always get a freshly
    /// acquired guard here.
    fn lock_unless(&self, _flags: u32) -> std::sync::MutexGuard<'_, NodeState<K>> {
        self.state.lock().unwrap()
    }

    pub fn insert(&self, key: K, value: Vec<u8>) -> Result<(), BplusError> {
        let mut state = self.state.lock().unwrap();
        let pos = state.entries.partition_point(|e| {
            e.key.cmp_with(&key, &state.prefix_table) == std::cmp::Ordering::Less
        });

        if let Some(existing) = state.entries.get(pos) {
            if existing.key.eq_with(&key, &state.prefix_table) {
                debug!("key already present at position {pos}, insert rejected");
                return Err(BplusError::AlreadyExists);
            }
        }

        if state.entries.len() as u32 == self.fanout {
            debug!("node at fanout {}, insert rejected", self.fanout);
            return Err(BplusError::TooBig);
        }

        let insert_key = if pos > 0 {
            let prev_key = state.entries[pos - 1].key.clone();
            K::maybe_compress(
                &mut state.prefix_table,
                &key,
                &prev_key,
                self.prefix_min_len,
            )
            .unwrap_or(key)
        } else {
            key
        };

        state.entries.insert(
            pos,
            Entry {
                key: insert_key,
                value,
            },
        );
        trace!(
            "inserted entry at position {pos}, node now holds {} entries",
            state.entries.len()
        );
        Ok(())
    }

    /// Always returns `Ok`; removing an absent key is a no-op.
    /// Prefix-table entries are never garbage collected here.
    pub fn remove(&self, key: &K) -> Result<(), BplusError> {
        let mut state = self.state.lock().unwrap();
        let pos = state.entries.partition_point(|e| {
            e.key.cmp_with(key, &state.prefix_table) == std::cmp::Ordering::Less
        });
        if let Some(existing) = state.entries.get(pos) {
            if existing.key.eq_with(key, &state.prefix_table) {
                state.entries.remove(pos);
                trace!(
                    "removed entry, node now holds {} entries",
                    state.entries.len()
                );
            }
        }
        Ok(())
    }

    pub fn list(
        &self,
        prefix: Option<&[u8]>,
        mut callback: impl FnMut(&[u8], &[u8]) -> u32,
        limit: Option<u32>,
        flags: u32,
    ) -> u32 {
        let state = self.state.lock().unwrap();
        list_locked(&state, prefix, &mut callback, limit, flags)
    }

    /// Serializes this node to its wire format. Acquires the lock once
    /// for its full duration and reuses [`list_locked`] directly rather
    /// than calling the public `list`, which would try to lock a
    /// second time.
    pub fn serialize(&self) -> Vec<u8> {
        let state = self.state.lock().unwrap();
        crate::format::serialize_locked(self.kind, self.fanout, self.prefix_min_len, &state)
    }
}

/// The reentrant iteration core behind both `list` and `serialize`:
/// the `LOCKED` flag signals that the caller already holds the lock.
pub(crate) fn list_locked<K: KeyOps>(
    state: &NodeState<K>,
    prefix: Option<&[u8]>,
    callback: &mut dyn FnMut(&[u8], &[u8]) -> u32,
    limit: Option<u32>,
    flags: u32,
) -> u32 {
    let lim = limit.unwrap_or(u32::MAX);
    let start = match prefix {
        Some(p) => state
            .entries
            .partition_point(|e| e.key.materialize(&state.prefix_table).as_slice() < p),
        None => 0,
    };

    let mut count = 0;
    for entry in &state.entries[start..] {
        if count >= lim {
            break;
        }
        let logical = entry.key.materialize(&state.prefix_table);
        if let Some(p) = prefix {
            if (flags & flags::REQUIRE_PREFIX) != 0 && !logical.starts_with(p) {
                break;
            }
        }
        let ret = callback(&logical, &entry.value);
        count += 1;
        if (ret & flags::STOP) != 0 {
            break;
        }
    }
    count
}

/// Rebuilds a node from a flat `kv-data` stream already known to be
/// sorted. The reconstructed node's prefix table starts empty; the
/// wire format does not persist it.
pub(crate) fn rebuild_entries<K: KeyOps>(
    fanout: u32,
    prefix_min_len: u16,
    bounds: Interval,
    kind: NodeKind,
    pairs: Vec<(K, Vec<u8>)>,
) -> Result<Node<K>, BplusError> {
    let node = Node {
        kind,
        fanout,
        prefix_min_len,
        bounds,
        state: Mutex::new(NodeState::<K> {
            entries: Vec::with_capacity(pairs.len()),
            prefix_table: PrefixTable::new(),
        }),
    };
    {
        let mut state = node.state.lock().unwrap();
        let pv = PrefixTable::new();
        for (i, (key, value)) in pairs.into_iter().enumerate() {
            if i > 0 {
                let prior = &state.entries[i - 1].key;
                if prior.cmp_with(&key, &pv) != std::cmp::Ordering::Less {
                    return Err(BplusError::Corrupt(
                        "kv-data entries are not in strictly increasing order".into(),
                    ));
                }
            }
            state.entries.push(Entry { key, value });
        }
    }
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::LeafKey;

    fn init() {
        let _ = env_logger::try_init();
    }

    fn collect(
        node: &LeafNode,
        prefix: Option<&str>,
        limit: Option<u32>,
        flags: u32,
    ) -> Vec<String> {
        let mut out = Vec::new();
        node.list(
            prefix.map(|s| s.as_bytes()),
            |k, _v| {
                out.push(String::from_utf8(k.to_vec()).unwrap());
                flags::NONE
            },
            limit,
            flags,
        );
        out
    }

    #[test]
    fn fill_to_fanout() {
        init();
        let node = LeafNode::new(100, 2);
        for i in 0..100 {
            let k = format!("f_{i}");
            node.insert(LeafKey::plain(k), b"v".to_vec()).unwrap();
        }
        assert_eq!(node.size(), 100);
        assert_eq!(
            node.insert(LeafKey::plain("f_5"), b"v".to_vec()),
            Err(BplusError::AlreadyExists)
        );
        assert_eq!(
            node.insert(LeafKey::plain("foo"), b"v".to_vec()),
            Err(BplusError::TooBig)
        );
    }

    #[test]
    fn prefix_scan_and_remove() {
        init();
        let node = LeafNode::new(100, 2);
        for i in 0..100 {
            node.insert(LeafKey::plain(format!("f_{i}")), b"v".to_vec())
                .unwrap();
        }
        let hits = collect(&node, Some("f_9"), None, flags::REQUIRE_PREFIX);
        assert_eq!(hits.len(), 11);

        for k in ["f_92", "f_94", "f_97"] {
            node.remove(&LeafKey::plain(k)).unwrap();
        }
        assert_eq!(node.size(), 97);
        let hits = collect(&node, Some("f_9"), None, flags::REQUIRE_PREFIX);
        assert_eq!(hits.len(), 8);
    }

    #[test]
    fn remove_insert_idempotence() {
        init();
        let node = LeafNode::new(10, 1);
        for k in ["a", "b", "c"] {
            node.insert(LeafKey::plain(k), b"v".to_vec()).unwrap();
        }
        let before = collect(&node, None, None, flags::NONE);
        node.insert(LeafKey::plain("zzz"), b"v".to_vec()).unwrap();
        node.remove(&LeafKey::plain("zzz")).unwrap();
        let after = collect(&node, None, None, flags::NONE);
        assert_eq!(before, after);
    }

    #[test]
    fn stop_bit_terminates_early() {
        init();
        let node = LeafNode::new(10, 1);
        for k in ["a", "b", "c", "d"] {
            node.insert(LeafKey::plain(k), b"v".to_vec()).unwrap();
        }
        let mut seen = Vec::new();
        let count = node.list(
            None,
            |k, _v| {
                seen.push(k.to_vec());
                flags::STOP
            },
            None,
            flags::NONE,
        );
        assert_eq!(count, 1);
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn clear_empties_the_node() {
        init();
        let node = LeafNode::new(10, 1);
        for k in ["a", "b", "c"] {
            node.insert(LeafKey::plain(k), b"v".to_vec()).unwrap();
        }
        assert_eq!(node.size(), 3);

        node.clear(flags::NONE);

        assert_eq!(node.size(), 0);
        assert_eq!(
            collect(&node, None, None, flags::NONE),
            Vec::<String>::new()
        );
    }
}

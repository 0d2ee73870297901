//! The wire format (`spec.md` §4.3): a self-describing flexbuffer map
//! with a single entry `"rgw-bplus-leaf"` — kept under that name for
//! both flavors, for backward compatibility with already-serialized
//! bytes — whose value is `[header, kv-data, update-log]`.
//!
//! Grounded directly on `examples/original_source/bplus_node.h`'s
//! `serialize()`/`node_factory::from_flexbuffers()`: the builder call
//! sequence here (`start_map`, nested `start_vector("header")`, etc.)
//! mirrors the C++ `flexbuffers::Builder` usage one to one.

use flexbuffers::{Blob, Reader};
use log::warn;

use crate::config::ONDISK_VERSION;
use crate::error::BplusError;
use crate::flags;
use crate::key::{FenceKey, Interval, KeyOps, LeafKey};
use crate::node::{list_locked, rebuild_entries, BranchNode, LeafNode, Node, NodeKind, NodeState};

const ROOT_KEY: &str = "rgw-bplus-leaf";

pub(crate) fn serialize_locked<K: KeyOps>(
    kind: NodeKind,
    fanout: u32,
    prefix_min_len: u16,
    state: &NodeState<K>,
) -> Vec<u8> {
    let mut kv_pairs: Vec<(Vec<u8>, Vec<u8>)> = Vec::new();
    list_locked(
        state,
        None,
        &mut |k, v| {
            kv_pairs.push((k.to_vec(), v.to_vec()));
            flags::NONE
        },
        None,
        flags::LOCKED,
    );

    let mut builder = flexbuffers::Builder::default();
    {
        let mut root = builder.start_map();
        let mut entry = root.start_vector(ROOT_KEY);
        {
            let mut header = entry.start_vector();
            header.push(ONDISK_VERSION);
            header.push(kind as u8 as u32);
            header.push(fanout);
            header.push(prefix_min_len as u32);
        }
        {
            let mut kv = entry.start_vector();
            for (k, v) in &kv_pairs {
                kv.push(Blob(k.as_slice()));
                kv.push(Blob(v.as_slice()));
            }
        }
        {
            let mut update_log = entry.start_vector();
            update_log.push("update log records");
        }
    }
    builder.take_buffer()
}

/// A node of either flavor, returned by [`from_bytes`] once the
/// header's `node_type` tag has been dispatched.
#[derive(Debug)]
pub enum AnyNode {
    Leaf(LeafNode),
    Branch(BranchNode),
}

/// Reconstructs a node from `serialize`'s wire format. The prefix
/// table is always empty after reconstruction (`spec.md` §4.3) and
/// the node's bounds are unbounded, since bounds are not part of the
/// persisted header either.
pub fn from_bytes(bytes: &[u8]) -> Result<AnyNode, BplusError> {
    let root = Reader::get_root(bytes).map_err(|e| {
        let err = BplusError::Corrupt(format!("not a flexbuffer root: {e}"));
        warn!("from_bytes: {err}");
        err
    })?;
    let map = root.get_map().map_err(|e| {
        let err = BplusError::Corrupt(format!("root is not a map: {e}"));
        warn!("from_bytes: {err}");
        err
    })?;
    let entry = map
        .index(ROOT_KEY)
        .map_err(|_| {
            let err = BplusError::Corrupt(format!("missing \"{ROOT_KEY}\" entry"));
            warn!("from_bytes: {err}");
            err
        })?
        .get_vector()
        .map_err(|e| {
            let err = BplusError::Corrupt(format!("\"{ROOT_KEY}\" is not a vector: {e}"));
            warn!("from_bytes: {err}");
            err
        })?;
    if entry.len() != 3 {
        let err = BplusError::Corrupt(format!("expected 3 segments, found {}", entry.len()));
        warn!("from_bytes: {err}");
        return Err(err);
    }

    let header = entry.index(0).and_then(|r| r.get_vector()).map_err(|e| {
        let err = BplusError::Corrupt(format!("bad header segment: {e}"));
        warn!("from_bytes: {err}");
        err
    })?;
    if header.len() != 4 {
        let err = BplusError::Corrupt(format!("expected 4 header fields, found {}", header.len()));
        warn!("from_bytes: {err}");
        return Err(err);
    }
    let ondisk_version = header.idx(0).as_u32();
    if ondisk_version != ONDISK_VERSION {
        let err = BplusError::UnsupportedVersion(ondisk_version);
        warn!("from_bytes: {err}");
        return Err(err);
    }
    let node_type = header.idx(1).as_u8();
    let kind = NodeKind::from_tag(node_type).inspect_err(|err| {
        warn!("from_bytes: {err}");
    })?;
    let fanout = header.idx(2).as_u32();
    let prefix_min_len = header.idx(3).as_u16();

    let kv_data = entry.index(1).and_then(|r| r.get_vector()).map_err(|e| {
        let err = BplusError::Corrupt(format!("bad kv-data segment: {e}"));
        warn!("from_bytes: {err}");
        err
    })?;
    if kv_data.len() % 2 != 0 {
        let err = BplusError::Corrupt("kv-data has an odd number of elements".into());
        warn!("from_bytes: {err}");
        return Err(err);
    }

    let mut pairs: Vec<(Vec<u8>, Vec<u8>)> = Vec::with_capacity(kv_data.len() / 2);
    let mut i = 0;
    while i < kv_data.len() {
        let key = kv_data
            .index(i)
            .map_err(|e| {
                let err = BplusError::Corrupt(format!("bad kv-data key: {e}"));
                warn!("from_bytes: {err}");
                err
            })?
            .as_blob()
            .0
            .to_vec();
        let value = kv_data
            .index(i + 1)
            .map_err(|e| {
                let err = BplusError::Corrupt(format!("bad kv-data value: {e}"));
                warn!("from_bytes: {err}");
                err
            })?
            .as_blob()
            .0
            .to_vec();
        pairs.push((key, value));
        i += 2;
    }

    match kind {
        NodeKind::Leaf => {
            let leaf_pairs = pairs
                .into_iter()
                .map(|(k, v)| (LeafKey::plain(k), v))
                .collect();
            let node: Node<LeafKey> = rebuild_entries(
                fanout,
                prefix_min_len,
                Interval::unbounded(),
                NodeKind::Leaf,
                leaf_pairs,
            )
            .inspect_err(|err| warn!("from_bytes: {err}"))?;
            Ok(AnyNode::Leaf(node))
        }
        NodeKind::Branch => {
            let branch_pairs = pairs
                .into_iter()
                .map(|(k, v)| (FenceKey::Bounded(LeafKey::plain(k)), v))
                .collect();
            let node: Node<FenceKey> = rebuild_entries(
                fanout,
                prefix_min_len,
                Interval::unbounded(),
                NodeKind::Branch,
                branch_pairs,
            )
            .inspect_err(|err| warn!("from_bytes: {err}"))?;
            Ok(AnyNode::Branch(node))
        }
    }
}

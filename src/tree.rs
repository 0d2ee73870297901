//! The tree façade (`spec.md` §4.4): root resolution, node naming, and
//! a top-level kv API mirroring the node engine's across a (currently
//! single-node) tree.
//!
//! Grounded on `examples/original_source/bplus_tree.h`/`.cxx`'s `Tree`
//! class: `root_name()`/`gen_node_name()` are ports of the C++
//! one-liners, and the lazily-initialized `root_node` mirrors the
//! teacher's own lazy-root pattern in `store.rs`.

use std::sync::{Arc, Mutex};

use log::{debug, trace};

use crate::config::TreeConfig;
use crate::error::BplusError;
use crate::format::{self, AnyNode};
use crate::io::{ObjectStore, RandomSource, SystemRandom};
use crate::key::{Interval, LeafKey};
use crate::node::LeafNode;

const NAME_STEM: &str = "rgw-bplus";

/// An embeddable ordered key-value store over a named tree of nodes,
/// addressed through an injected [`ObjectStore`].
///
/// The current implementation only covers the leaf-resident case
/// (`spec.md` §4.4): the root leaf grows until it hits `fanout`, at
/// which point `insert` surfaces [`BplusError::TooBig`] rather than
/// splitting. Multi-level traversal is a future collaborator's job.
pub struct Tree {
    name: String,
    config: TreeConfig,
    store: Arc<dyn ObjectStore>,
    random: Arc<dyn RandomSource>,
    root: Mutex<Option<Arc<LeafNode>>>,
}

impl Tree {
    pub fn new(name: impl Into<String>, config: TreeConfig, store: Arc<dyn ObjectStore>) -> Self {
        Tree {
            name: name.into(),
            config,
            store,
            random: Arc::new(SystemRandom::new()),
            root: Mutex::new(None),
        }
    }

    /// Same as [`Tree::new`] but with an explicit `RandomSource`,
    /// primarily for deterministic tests.
    pub fn with_random(
        name: impl Into<String>,
        config: TreeConfig,
        store: Arc<dyn ObjectStore>,
        random: Arc<dyn RandomSource>,
    ) -> Self {
        Tree {
            name: name.into(),
            config,
            store,
            random,
            root: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `"rgw-bplus-<name>-root"` (`spec.md` §4.4).
    pub fn root_name(&self) -> String {
        format!("{NAME_STEM}-{}-root", self.name)
    }

    /// `"rgw-bplus-<name>-<z85(16 random bytes)>"` (`spec.md` §4.4).
    /// Expands 16 bytes to at most 24 printable characters.
    pub fn gen_node_name(&self) -> String {
        let bytes = self.random.random_bytes(16);
        format!("{NAME_STEM}-{}-{}", self.name, z85::encode(bytes))
    }

    /// Resolves the root leaf, creating and registering it under
    /// `root_name()` on first access if absent.
    fn get_root(&self) -> Result<Arc<LeafNode>, BplusError> {
        let mut guard = self.root.lock().unwrap();
        if let Some(root) = guard.as_ref() {
            return Ok(root.clone());
        }

        let root_name = self.root_name();
        let root = match self.store.get(&root_name)? {
            Some(bytes) => match format::from_bytes(&bytes)? {
                AnyNode::Leaf(node) => Arc::new(node),
                AnyNode::Branch(_) => {
                    return Err(BplusError::Corrupt(format!(
                        "{root_name} holds a branch node; multi-level trees are not supported"
                    )))
                }
            },
            None => {
                debug!("no root object for tree {:?}, creating one", self.name);
                let node = LeafNode::with_bounds(
                    self.config.fanout,
                    self.config.prefix_min_len,
                    Interval::unbounded(),
                );
                self.store.put(&root_name, node.serialize())?;
                Arc::new(node)
            }
        };
        *guard = Some(root.clone());
        Ok(root)
    }

    /// Flushes the root leaf's current contents back to the object
    /// store under `root_name()`.
    fn persist_root(&self, root: &LeafNode) -> Result<(), BplusError> {
        self.store.put(&self.root_name(), root.serialize())
    }

    pub fn insert(
        &self,
        key: impl Into<Vec<u8>>,
        value: impl Into<Vec<u8>>,
    ) -> Result<(), BplusError> {
        let root = self.get_root()?;
        root.insert(LeafKey::plain(key.into()), value.into())?;
        trace!(
            "inserted into tree {:?}, root now holds {} entries",
            self.name,
            root.size()
        );
        self.persist_root(&root)
    }

    pub fn remove(&self, key: impl Into<Vec<u8>>) -> Result<(), BplusError> {
        let root = self.get_root()?;
        root.remove(&LeafKey::plain(key.into()))?;
        self.persist_root(&root)
    }

    pub fn list(
        &self,
        prefix: Option<&[u8]>,
        callback: impl FnMut(&[u8], &[u8]) -> u32,
        limit: Option<u32>,
        flags: u32,
    ) -> Result<u32, BplusError> {
        let root = self.get_root()?;
        Ok(root.list(prefix, callback, limit, flags))
    }
}

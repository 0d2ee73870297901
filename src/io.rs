//! The IO collaborator surface (`spec.md` §4.5): an opaque
//! name→bytes object store and a source of random bytes, both
//! injected rather than owned by the tree façade.
//!
//! Grounded on the teacher's `store::StorageBackend` trait plus its
//! always-available `InMemStorage` implementation, and (for the
//! `persist` feature) `local_array/persist/lsm_tree.rs`'s `PersistTree`
//! wrapping an `lsm_tree::Tree` — same feature name, reused from the
//! teacher's own `Cargo.toml`.

use std::collections::HashMap;
use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

use crate::error::BplusError;

/// Persistence contract for serialized nodes (`spec.md` §4.5). The
/// engine never assumes atomic cross-object operations.
pub trait ObjectStore: Send + Sync {
    fn get(&self, name: &str) -> Result<Option<Vec<u8>>, BplusError>;
    fn put(&self, name: &str, bytes: Vec<u8>) -> Result<(), BplusError>;
}

/// A source of uniformly random bytes, seeded from a nondeterministic
/// entropy source at start-up (`spec.md` §4.5).
pub trait RandomSource: Send + Sync {
    fn random_bytes(&self, count: usize) -> Vec<u8>;
}

/// An in-process object store for tests and the demo CLI.
#[derive(Debug, Default)]
pub struct MemStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemStore {
    pub fn new() -> Self {
        MemStore::default()
    }
}

impl ObjectStore for MemStore {
    fn get(&self, name: &str) -> Result<Option<Vec<u8>>, BplusError> {
        let objects = self
            .objects
            .lock()
            .map_err(|_| BplusError::IoError("MemStore lock poisoned".into()))?;
        Ok(objects.get(name).cloned())
    }

    fn put(&self, name: &str, bytes: Vec<u8>) -> Result<(), BplusError> {
        let mut objects = self
            .objects
            .lock()
            .map_err(|_| BplusError::IoError("MemStore lock poisoned".into()))?;
        objects.insert(name.to_string(), bytes);
        Ok(())
    }
}

/// `rand`-backed `RandomSource`, seeded once from OS entropy at
/// construction (the `Tree`'s default collaborator).
pub struct SystemRandom {
    rng: Mutex<StdRng>,
}

impl SystemRandom {
    pub fn new() -> Self {
        SystemRandom {
            rng: Mutex::new(StdRng::from_rng(&mut rand::rng())),
        }
    }
}

impl Default for SystemRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for SystemRandom {
    fn random_bytes(&self, count: usize) -> Vec<u8> {
        let mut rng = self.rng.lock().unwrap();
        let mut buf = vec![0u8; count];
        rng.fill_bytes(&mut buf);
        buf
    }
}

/// A fixed-seed `RandomSource` for deterministic tests.
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        SeededRandom {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn random_bytes(&self, count: usize) -> Vec<u8> {
        let mut rng = self.rng.lock().unwrap();
        (0..count).map(|_| rng.random()).collect()
    }
}

#[cfg(feature = "persist")]
pub use persist::LsmStore;

#[cfg(feature = "persist")]
mod persist {
    use super::*;
    use lsm_tree::AbstractTree;
    use std::path::Path;

    /// Disk-backed `ObjectStore` over an `lsm_tree::Tree`, mirroring
    /// the teacher's own optional `persist` feature.
    pub struct LsmStore {
        tree: lsm_tree::Tree,
    }

    impl LsmStore {
        pub fn open(path: &Path) -> Result<Self, BplusError> {
            let tree = lsm_tree::Config::new(path)
                .open()
                .map_err(|e| BplusError::IoError(format!("opening lsm-tree store: {e}")))?;
            Ok(LsmStore { tree })
        }
    }

    impl ObjectStore for LsmStore {
        fn get(&self, name: &str) -> Result<Option<Vec<u8>>, BplusError> {
            self.tree
                .get(name.as_bytes(), None)
                .map(|opt| opt.map(|slice| slice.to_vec()))
                .map_err(|e| BplusError::IoError(format!("lsm-tree get failed: {e}")))
        }

        fn put(&self, name: &str, bytes: Vec<u8>) -> Result<(), BplusError> {
            self.tree.insert(name.as_bytes(), bytes, 0);
            Ok(())
        }
    }
}

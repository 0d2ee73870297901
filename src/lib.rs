pub use config::TreeConfig;
pub use error::BplusError;
pub use io::{MemStore, ObjectStore, RandomSource, SeededRandom, SystemRandom};
pub use node::{BranchNode, LeafNode, NodeKind};
pub use tree::Tree;

#[cfg(feature = "persist")]
pub use io::LsmStore;

pub mod config;
pub mod error;
pub mod flags;
pub mod format;
pub mod io;
pub mod key;
pub mod node;
pub mod tree;

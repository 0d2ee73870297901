use std::fmt;

/// Errors returned by node and tree operations.
///
/// Mirrors the status codes in the design: client errors
/// (`AlreadyExists`, `TooBig`), an environmental error (`IoError`), and
/// format errors (`UnsupportedVersion`, `UnknownNodeType`, `Corrupt`).
#[derive(Debug, PartialEq, Eq)]
pub enum BplusError {
    /// A key logically equal to an existing entry was inserted.
    AlreadyExists,
    /// The node is already at `fanout` entries; a split is required
    /// before the insert can proceed. Not intercepted by this crate —
    /// the rebalancer is a future collaborator (see `spec.md` §1).
    TooBig,
    /// The object store failed to serve or accept a node's bytes.
    IoError(String),
    /// The node's `ondisk_version` header field is not supported by
    /// this implementation.
    UnsupportedVersion(u32),
    /// The node's `node_type` header field does not match a known
    /// variant.
    UnknownNodeType(u8),
    /// The byte buffer could not be parsed into a well-formed node.
    Corrupt(String),
}

impl fmt::Display for BplusError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BplusError::AlreadyExists => {
                write!(f, "Error: key already exists in node.")
            }
            BplusError::TooBig => {
                write!(f, "Error: node is at fanout; a split is required.")
            }
            BplusError::IoError(msg) => {
                write!(f, "Error: object store operation failed: {msg}")
            }
            BplusError::UnsupportedVersion(v) => {
                write!(f, "Error: unsupported on-disk version {v}.")
            }
            BplusError::UnknownNodeType(t) => {
                write!(f, "Error: unknown node type tag {t}.")
            }
            BplusError::Corrupt(msg) => {
                write!(f, "Error: corrupt node bytes: {msg}")
            }
        }
    }
}

impl std::error::Error for BplusError {}

//! Prefix-compressed key model.
//!
//! A [`LeafKey`] is a stem plus an optional reference to a shared
//! prefix held in a per-node [`PrefixTable`]. Ordering and equality
//! always operate on the *logical* key — the resolved prefix
//! concatenated with the stem — never on the physical representation.

use std::cmp::Ordering;

/// Per-node table of shared byte-string prefixes. Append-only for the
/// life of the owning node; indices are stable 16-bit offsets.
#[derive(Debug, Default, Clone)]
pub struct PrefixTable(Vec<Vec<u8>>);

impl PrefixTable {
    pub fn new() -> Self {
        PrefixTable(Vec::new())
    }

    pub fn new_with(entries: Vec<Vec<u8>>) -> Self {
        PrefixTable(entries)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: u16) -> Option<&[u8]> {
        self.0.get(index as usize).map(|v| v.as_slice())
    }

    /// Appends `prefix` and returns its stable index.
    pub fn push(&mut self, prefix: Vec<u8>) -> u16 {
        self.0.push(prefix);
        (self.0.len() - 1) as u16
    }
}

/// A key's optional shared prefix: either carried inline or resolved
/// indirectly through the owning node's [`PrefixTable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefixRef {
    Inline(Vec<u8>),
    Index(u16),
}

/// A prefix-compressed leaf key: `prefix ⧺ stem` is the logical key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafKey {
    pub prefix: Option<PrefixRef>,
    pub stem: Vec<u8>,
}

impl LeafKey {
    /// A key with no shared prefix — the logical key equals `stem`.
    pub fn plain(stem: impl Into<Vec<u8>>) -> Self {
        LeafKey {
            prefix: None,
            stem: stem.into(),
        }
    }

    pub fn with_index(index: u16, stem: impl Into<Vec<u8>>) -> Self {
        LeafKey {
            prefix: Some(PrefixRef::Index(index)),
            stem: stem.into(),
        }
    }

    pub fn with_inline(prefix: impl Into<Vec<u8>>, stem: impl Into<Vec<u8>>) -> Self {
        LeafKey {
            prefix: Some(PrefixRef::Inline(prefix.into())),
            stem: stem.into(),
        }
    }

    /// Resolves and concatenates prefix and stem into the logical key.
    pub fn logical(&self, pv: &PrefixTable) -> Vec<u8> {
        let mut out = match &self.prefix {
            None => Vec::with_capacity(self.stem.len()),
            Some(PrefixRef::Inline(p)) => p.clone(),
            Some(PrefixRef::Index(i)) => pv.get(*i).map(|s| s.to_vec()).unwrap_or_default(),
        };
        out.extend_from_slice(&self.stem);
        out
    }
}

/// A fence key: a leaf key, or the unbounded sentinel used to express
/// open-ended interval endpoints on branch nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FenceKey {
    Bounded(LeafKey),
    Unbounded,
}

/// The half-open keyspace region a branch node governs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval {
    pub lower: FenceKey,
    pub upper: FenceKey,
}

impl Interval {
    /// The root's initial interval: unbounded on both ends.
    pub fn unbounded() -> Self {
        Interval {
            lower: FenceKey::Unbounded,
            upper: FenceKey::Unbounded,
        }
    }
}

/// Comparisons and materialization threaded explicitly through a
/// [`PrefixTable`] rather than a back-pointer from the key to its node.
pub trait KeyOps: Clone {
    fn cmp_with(&self, other: &Self, pv: &PrefixTable) -> Ordering;

    fn eq_with(&self, other: &Self, pv: &PrefixTable) -> bool {
        self.cmp_with(other, pv) == Ordering::Equal
    }

    /// The fully resolved, authoritative byte sequence for this key.
    fn materialize(&self, pv: &PrefixTable) -> Vec<u8>;

    /// Prefix compression against the sorted predecessor, applied on
    /// insert. Default: no compression (used by [`FenceKey`], whose
    /// entries are not prefix-compressed by this spec).
    fn maybe_compress(
        _pv: &mut PrefixTable,
        _key: &Self,
        _prev: &Self,
        _min_len: u16,
    ) -> Option<Self> {
        None
    }
}

impl KeyOps for LeafKey {
    fn cmp_with(&self, other: &Self, pv: &PrefixTable) -> Ordering {
        self.logical(pv).cmp(&other.logical(pv))
    }

    fn materialize(&self, pv: &PrefixTable) -> Vec<u8> {
        self.logical(pv)
    }

    fn maybe_compress(pv: &mut PrefixTable, key: &Self, prev: &Self, min_len: u16) -> Option<Self> {
        make_prefix_key(pv, key, prev, min_len)
    }
}

impl KeyOps for FenceKey {
    fn cmp_with(&self, other: &Self, pv: &PrefixTable) -> Ordering {
        match (self, other) {
            (FenceKey::Unbounded, FenceKey::Unbounded) => Ordering::Equal,
            (FenceKey::Unbounded, FenceKey::Bounded(_)) => Ordering::Greater,
            (FenceKey::Bounded(_), FenceKey::Unbounded) => Ordering::Less,
            (FenceKey::Bounded(a), FenceKey::Bounded(b)) => a.cmp_with(b, pv),
        }
    }

    fn materialize(&self, pv: &PrefixTable) -> Vec<u8> {
        match self {
            FenceKey::Bounded(lk) => lk.logical(pv),
            FenceKey::Unbounded => Vec::new(),
        }
    }
}

/// Length of the longer common byte prefix of `a` and `b`, or empty if
/// that length does not exceed `min_len`.
pub fn common_prefix(a: &[u8], b: &[u8], min_len: usize) -> Vec<u8> {
    let l = a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count();
    if l > min_len {
        a[..l].to_vec()
    } else {
        Vec::new()
    }
}

/// Decides whether to rewrite `key` (about to be inserted just after
/// `prev`, which is already present) to share or extend a prefix.
/// Returns `None` to leave `key` as given.
pub fn make_prefix_key(
    pv: &mut PrefixTable,
    key: &LeafKey,
    prev: &LeafKey,
    min_len: u16,
) -> Option<LeafKey> {
    let key_logical = key.logical(pv);
    let prev_logical = prev.logical(pv);

    let carry = match &prev.prefix {
        Some(PrefixRef::Index(i)) => pv
            .get(*i)
            .filter(|p| key_logical.starts_with(p))
            .map(|p| (*i, p.len())),
        _ => None,
    };

    let cp = common_prefix(&key_logical, &prev_logical, min_len as usize);
    let introduce_wins = !cp.is_empty() && carry.is_none_or(|(_, carry_len)| cp.len() > carry_len);

    if introduce_wins {
        let idx = pv.push(cp.clone());
        return Some(LeafKey::with_index(idx, key_logical[cp.len()..].to_vec()));
    }

    if let Some((idx, carry_len)) = carry {
        return Some(LeafKey::with_index(idx, key_logical[carry_len..].to_vec()));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_prefix_threshold() {
        let a = b"/sub1/docrequest/D/DOC597z85";
        let b = b"/sub1/docrequest/D/PDF448x79";
        let cp = common_prefix(a, b, 5);
        assert!(cp.len() >= 18);
        let cp2 = common_prefix(a, b, 20);
        assert!(cp2.is_empty());
        assert_eq!(common_prefix(a, b, 5), common_prefix(b, a, 5));
    }

    #[test]
    fn prefix_equality() {
        let mut pv = PrefixTable::new();
        pv.push(b"one".to_vec());
        pv.push(b"one_".to_vec());

        let k1 = LeafKey::with_index(0, "_two_three");
        let k2 = LeafKey::with_index(1, "two_three");
        let k3 = LeafKey::with_inline(b"one".to_vec(), "_two_three");
        let k4 = LeafKey::with_inline(b"one_".to_vec(), "two_three");
        let k5 = LeafKey::with_index(1, "_two_three");

        for k in [&k1, &k2, &k3, &k4] {
            assert!(k1.eq_with(k, &pv));
            assert_eq!(k.logical(&pv), b"one_two_three");
        }
        assert!(!k1.eq_with(&k5, &pv));
    }

    #[test]
    fn prefix_ordering() {
        let pv = PrefixTable::new_with(vec![b"abc".to_vec(), b"def".to_vec()]);
        let a = LeafKey::with_index(0, "_apple");
        let b = LeafKey::with_index(1, "_orange");
        assert_eq!(a.cmp_with(&b, &pv), Ordering::Less);
        assert_eq!(b.cmp_with(&a, &pv), Ordering::Greater);

        let a2 = LeafKey::with_inline(b"abc".to_vec(), "_apple");
        let b2 = LeafKey::with_inline(b"def".to_vec(), "_orange");
        assert_eq!(a2.cmp_with(&b2, &pv), Ordering::Less);
    }

    #[test]
    fn fence_key_ordering() {
        let pv = PrefixTable::new();
        let leaf = FenceKey::Bounded(LeafKey::plain("k"));
        assert_eq!(
            FenceKey::Unbounded.cmp_with(&FenceKey::Unbounded, &pv),
            Ordering::Equal
        );
        assert_eq!(FenceKey::Unbounded.cmp_with(&leaf, &pv), Ordering::Greater);
        assert_eq!(leaf.cmp_with(&FenceKey::Unbounded, &pv), Ordering::Less);
    }

    #[test]
    fn make_prefix_key_preserves_logical() {
        let mut pv = PrefixTable::new();
        let prev = LeafKey::plain("f_10");
        let key = LeafKey::plain("f_11");
        let before = key.logical(&pv);
        if let Some(rewritten) = make_prefix_key(&mut pv, &key, &prev, 1) {
            assert_eq!(rewritten.logical(&pv), before);
        }
    }
}

//! Scenarios 5-7 of `spec.md` §8: common-prefix threshold, prefix
//! equality, and prefix ordering.

use rgw_bplus::key::{common_prefix, FenceKey, KeyOps, LeafKey, PrefixTable};

#[test]
fn common_prefix_respects_min_len_and_is_symmetric() {
    let a = b"/sub1/docrequest/D/DOC597z85";
    let b = b"/sub1/docrequest/D/PDF448x79";
    let cp = common_prefix(a, b, 5);
    assert!(
        cp.len() >= 18,
        "expected at least 18 shared bytes, got {}",
        cp.len()
    );
    assert!(common_prefix(a, b, 20).is_empty());
    assert_eq!(common_prefix(a, b, 5), common_prefix(b, a, 5));
}

#[test]
fn prefix_equality_ignores_physical_representation() {
    let pv = PrefixTable::new_with(vec![b"one".to_vec(), b"one_".to_vec()]);

    let k0 = LeafKey::with_index(0, "_two_three");
    let k1 = LeafKey::with_index(1, "two_three");
    let k_inline0 = LeafKey::with_inline(b"one".to_vec(), "_two_three");
    let k_inline1 = LeafKey::with_inline(b"one_".to_vec(), "two_three");
    let k_mismatch = LeafKey::with_index(1, "_two_three");

    for k in [&k0, &k1, &k_inline0, &k_inline1] {
        assert!(k0.eq_with(k, &pv));
        assert_eq!(k.logical(&pv), b"one_two_three");
    }
    assert!(!k0.eq_with(&k_mismatch, &pv));
}

#[test]
fn prefix_ordering_resolves_through_the_table() {
    let pv = PrefixTable::new_with(vec![b"abc".to_vec(), b"def".to_vec()]);
    let apple = LeafKey::with_index(0, "_apple");
    let orange = LeafKey::with_index(1, "_orange");
    assert!(apple.cmp_with(&orange, &pv).is_lt());
    assert!(orange.cmp_with(&apple, &pv).is_gt());

    let apple_inline = LeafKey::with_inline(b"abc".to_vec(), "_apple");
    let orange_inline = LeafKey::with_inline(b"def".to_vec(), "_orange");
    assert!(apple_inline.cmp_with(&orange_inline, &pv).is_lt());
}

#[test]
fn fence_key_unbounded_is_greatest() {
    let pv = PrefixTable::new();
    let bounded = FenceKey::Bounded(LeafKey::plain("k"));
    assert!(FenceKey::Unbounded.cmp_with(&bounded, &pv).is_gt());
    assert!(bounded.cmp_with(&FenceKey::Unbounded, &pv).is_lt());
    assert!(FenceKey::Unbounded
        .cmp_with(&FenceKey::Unbounded, &pv)
        .is_eq());
}

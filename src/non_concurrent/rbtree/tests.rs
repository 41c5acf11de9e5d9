use std::cell::Cell;
use std::collections::BTreeSet;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use proptest::prelude::*;

use super::*;

const SEQUENCE: [i32; 20] = [5, 15, 4, 17, 2, 20, 8, 18, 3, 14, 9, 19, 1, 16, 12, 7, 11, 6, 10, 13];

fn collect<T: Clone>(tree: &RBTree<T>) -> Vec<T> {
    tree.iter().cloned().collect()
}

#[test]
fn empty_tree() {
    let tree = RBTree::<i32>::new();
    assert!(tree.is_empty());
    assert_eq!(tree.len(), 0);
    assert_eq!(tree.first(), None);
    assert_eq!(tree.last(), None);
    assert!(tree.begin().is_end());
    assert_eq!(tree.begin(), tree.end());
    assert_eq!(tree.validate(), Ok(0));
    assert_eq!(tree.dump(), "");
    assert_eq!(tree.to_string(), "{}");
}

#[test]
fn five_unique_inserts() {
    let mut tree = RBTree::new();
    for v in [5, 15, 4, 17, 2] {
        assert!(tree.insert_unique(v));
        tree.validate().unwrap();
    }
    assert_eq!(tree.to_string(), "{2, 4, 5, 15, 17}");
    assert_eq!(tree.dump(), "5:B(4:B(2:R), 15:B(, 17:R))");
    assert_eq!(tree.validate(), Ok(2));
}

#[test]
fn twenty_in_twenty_out() {
    let mut tree = RBTree::new();
    for v in SEQUENCE {
        assert!(tree.insert_unique(v));
        tree.validate().unwrap();
    }
    assert_eq!(collect(&tree), (1..=20).collect::<Vec<_>>());
    assert_eq!(tree.first(), Some(&1));
    assert_eq!(tree.last(), Some(&20));

    for (i, v) in SEQUENCE.into_iter().enumerate() {
        assert_eq!(tree.erase(&v), 1);
        assert_eq!(tree.len(), SEQUENCE.len() - i - 1);
        tree.validate().unwrap();
    }

    assert_eq!(tree.len(), 0);
    assert!(tree.begin().is_end());
    assert_eq!(tree.first(), None);
    assert_eq!(tree.last(), None);
}

#[test]
fn unique_insert_and_absent_erase_change_nothing() {
    let mut tree: RBTree<i32> = SEQUENCE.into_iter().collect();
    let before = collect(&tree);

    assert!(!tree.insert_unique(9));
    assert_eq!(tree.erase(&42), 0);

    assert_eq!(collect(&tree), before);
    assert_eq!(tree.len(), 20);
}

#[test]
fn duplicates_with_insert_equal() {
    let mut tree = RBTree::new();
    for v in [3, 1, 3, 2, 3, 1] {
        tree.insert_equal(v);
        tree.validate().unwrap();
    }
    assert_eq!(collect(&tree), [1, 1, 2, 3, 3, 3]);
    assert_eq!(tree.count(&3), 3);
    assert_eq!(tree.count(&4), 0);

    assert_eq!(tree.erase(&3), 3);
    tree.validate().unwrap();
    assert_eq!(collect(&tree), [1, 1, 2]);
    assert_eq!(tree.last(), Some(&2));
}

#[test]
fn equal_runs_keep_insertion_order() {
    #[derive(Debug, Clone, Copy)]
    struct Tagged(u8, char);
    impl PartialEq for Tagged {
        fn eq(&self, other: &Self) -> bool { self.0 == other.0 }
    }
    impl Eq for Tagged {}
    impl PartialOrd for Tagged {
        fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
    }
    impl Ord for Tagged {
        fn cmp(&self, other: &Self) -> Ordering { self.0.cmp(&other.0) }
    }

    let mut tree = RBTree::new();
    for (key, tag) in [(2, 'a'), (1, 'b'), (2, 'c'), (2, 'd'), (1, 'e')] {
        tree.insert_equal(Tagged(key, tag));
    }
    let tags: String = tree.iter().map(|t| t.1).collect();
    assert_eq!(tags, "beacd");
}

#[test]
fn bounds() {
    let tree: RBTree<i32> = [10, 20, 20, 30].into_iter().collect();

    assert_eq!(tree.lower_bound(&20).get(), Some(&20));
    assert_eq!(tree.upper_bound(&20).get(), Some(&30));
    assert_eq!(tree.lower_bound(&15).get(), Some(&20));
    assert_eq!(tree.lower_bound(&5).get(), Some(&10));
    assert!(tree.lower_bound(&31).is_end());
    assert!(tree.upper_bound(&30).is_end());

    let run: Vec<_> = tree.lower_bound(&20).iter().collect();
    assert_eq!(run, [&20, &20, &30]);
}

#[test]
fn cursors_wrap_through_the_end() {
    let tree: RBTree<i32> = [1, 2, 3].into_iter().collect();

    let mut cursor = tree.end();
    cursor.move_next();
    assert_eq!(cursor.get(), Some(&1));
    cursor.move_prev();
    assert!(cursor.is_end());
    cursor.move_prev();
    assert_eq!(cursor.get(), Some(&3));
    cursor.move_next();
    assert_eq!(cursor, tree.end());
}

#[test]
fn iterates_both_ways() {
    let tree: RBTree<i32> = SEQUENCE.into_iter().collect();

    let forward: Vec<_> = tree.iter().copied().collect();
    let mut backward: Vec<_> = tree.iter().rev().copied().collect();
    backward.reverse();
    assert_eq!(forward, backward);

    let mut iter = tree.iter();
    assert_eq!(iter.len(), 20);
    assert_eq!(iter.next(), Some(&1));
    assert_eq!(iter.next_back(), Some(&20));
    assert_eq!(iter.len(), 18);
    assert_eq!(iter.map(|v| *v).sum::<i32>(), (2..20).sum());

    let owned: Vec<_> = tree.into_iter().rev().collect();
    assert_eq!(owned, (1..=20).rev().collect::<Vec<_>>());
}

#[test]
fn pop_and_take() {
    let mut tree: RBTree<i32> = SEQUENCE.into_iter().collect();

    assert_eq!(tree.pop_first(), Some(1));
    assert_eq!(tree.pop_last(), Some(20));
    assert_eq!(tree.take(&10), Some(10));
    assert_eq!(tree.take(&10), None);
    tree.validate().unwrap();
    assert_eq!(tree.len(), 17);
    assert_eq!(tree.first(), Some(&2));
    assert_eq!(tree.last(), Some(&19));
}

#[test]
fn copies_are_independent() {
    let mut original: RBTree<i32> = SEQUENCE.into_iter().collect();
    let mut copy = original.clone();

    assert_eq!(copy.dump(), original.dump());
    copy.validate().unwrap();

    for v in 1..=10 {
        copy.erase(&v);
    }
    copy.insert_unique(100);
    copy.validate().unwrap();

    assert_eq!(collect(&original), (1..=20).collect::<Vec<_>>());
    assert_eq!(original.len(), 20);
    original.validate().unwrap();

    original.clone_from(&copy);
    assert_eq!(collect(&original), collect(&copy));
}

#[test]
fn taking_leaves_an_empty_tree() {
    let mut source: RBTree<i32> = SEQUENCE.into_iter().collect();
    let moved = std::mem::take(&mut source);

    assert_eq!(moved.len(), 20);
    moved.validate().unwrap();
    assert!(source.is_empty());
    assert!(source.begin().is_end());
    source.validate().unwrap();

    source.insert_unique(1);
    assert_eq!(source.len(), 1);
}

/// Ordered by `key`; counts its clones and drops.
struct Counted {
    key: i32,
    clones: Rc<Cell<usize>>,
    drops: Rc<Cell<usize>>,
}

impl Clone for Counted {
    fn clone(&self) -> Self {
        if self.key == 7 {
            panic!("refusing to clone 7");
        }
        self.clones.set(self.clones.get() + 1);
        Counted { key: self.key, clones: self.clones.clone(), drops: self.drops.clone() }
    }
}

impl Drop for Counted {
    fn drop(&mut self) {
        self.drops.set(self.drops.get() + 1);
    }
}

impl PartialEq for Counted {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Counted {}

impl PartialOrd for Counted {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Counted {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

#[test]
fn every_payload_is_dropped_once() {
    let clones = Rc::new(Cell::new(0));
    let drops = Rc::new(Cell::new(0));

    let mut tree = RBTree::new();
    for key in SEQUENCE {
        tree.insert_unique(Counted { key, clones: clones.clone(), drops: drops.clone() });
    }
    assert!(!tree.insert_unique(Counted { key: 3, clones: clones.clone(), drops: drops.clone() }));
    assert_eq!(drops.get(), 1);

    tree.erase(&Counted { key: 4, clones: clones.clone(), drops: drops.clone() });
    // the erased node plus the probe
    assert_eq!(drops.get(), 3);

    tree.clear();
    assert_eq!(drops.get(), 3 + 19);
    assert!(tree.is_empty());
}

#[test]
fn panicking_clone_frees_the_partial_copy() {
    let clones = Rc::new(Cell::new(0));
    let drops = Rc::new(Cell::new(0));

    let tree: RBTree<Counted> = SEQUENCE
        .into_iter()
        .map(|key| Counted { key, clones: clones.clone(), drops: drops.clone() })
        .collect();

    let result = catch_unwind(AssertUnwindSafe(|| tree.clone()));
    assert!(result.is_err());

    // everything that got cloned before the panic was dropped again
    assert!(clones.get() > 0);
    assert_eq!(drops.get(), clones.get());

    tree.validate().unwrap();
    assert_eq!(tree.len(), 20);
}

proptest! {
    #[test]
    fn random_operations_keep_every_invariant(ops in prop::collection::vec((any::<bool>(), 0u8..48), 0..300)) {
        let mut tree = RBTree::new();
        let mut model = BTreeSet::new();

        for (insert, key) in ops {
            if insert {
                prop_assert_eq!(tree.insert_unique(key), model.insert(key));
            } else {
                prop_assert_eq!(tree.erase(&key), usize::from(model.remove(&key)));
            }

            prop_assert!(tree.validate().is_ok(), "{:?} after {} {}", tree.validate(), if insert { "inserting" } else { "erasing" }, key);
            prop_assert_eq!(tree.len(), model.len());
            prop_assert_eq!(tree.first(), model.first());
            prop_assert_eq!(tree.last(), model.last());
            prop_assert!(tree.iter().eq(model.iter()));
        }
    }

    #[test]
    fn equal_inserts_match_a_sorted_vec(keys in prop::collection::vec(0u8..16, 0..120), gone in 0u8..16) {
        let mut tree = RBTree::new();
        for &key in &keys {
            tree.insert_equal(key);
        }
        prop_assert!(tree.validate().is_ok());

        let mut sorted = keys.clone();
        sorted.sort();
        prop_assert!(tree.iter().eq(sorted.iter()));

        let expected = sorted.iter().filter(|&&k| k == gone).count();
        prop_assert_eq!(tree.count(&gone), expected);
        prop_assert_eq!(tree.erase(&gone), expected);
        prop_assert!(tree.validate().is_ok());
        prop_assert_eq!(tree.len(), keys.len() - expected);
    }
}

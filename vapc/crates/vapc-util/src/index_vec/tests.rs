//! Tests for the IndexVec module.

use super::*;
use quickcheck_macros::quickcheck;

crate::define_idx!(TestId);

// ============================================================================
// BASIC OPERATIONS
// ============================================================================

#[test]
fn test_new_and_empty() {
    let vec: IndexVec<TestId, i32> = IndexVec::new();
    assert!(vec.is_empty());
    assert_eq!(vec.len(), 0);
    assert_eq!(vec.next_index(), TestId(0));
}

#[test]
fn test_push_and_index() {
    let mut vec: IndexVec<TestId, i32> = IndexVec::new();
    let idx1 = vec.push(10);
    let idx2 = vec.push(20);
    let idx3 = vec.push(30);

    assert_eq!(vec[idx1], 10);
    assert_eq!(vec[idx2], 20);
    assert_eq!(vec[idx3], 30);
    assert_eq!(vec.len(), 3);
    assert!(vec.contains(idx3));
    assert!(!vec.contains(TestId(3)));
}

#[test]
fn test_index_mut_replaces_in_place() {
    let mut vec: IndexVec<TestId, &str> = IndexVec::new();
    let idx = vec.push("before");
    vec[idx] = "after";
    assert_eq!(vec.get(idx), Some(&"after"));
    assert_eq!(vec.get(TestId(7)), None);
}

// ============================================================================
// ITERATION
// ============================================================================

#[test]
fn test_iter_enumerated_yields_typed_indices() {
    let vec: IndexVec<TestId, char> = "abc".chars().collect();
    let pairs: Vec<(TestId, char)> = vec.iter_enumerated().map(|(i, c)| (i, *c)).collect();
    assert_eq!(pairs, vec![(TestId(0), 'a'), (TestId(1), 'b'), (TestId(2), 'c')]);
    assert_eq!(vec.indices().rev().next(), Some(TestId(2)));
}

#[test]
fn test_pick2_mut_both_orders() {
    let mut vec: IndexVec<TestId, i32> = vec![1, 2, 3].into_iter().collect();
    {
        let (a, b) = vec.pick2_mut(TestId(0), TestId(2));
        std::mem::swap(a, b);
    }
    {
        let (a, b) = vec.pick2_mut(TestId(1), TestId(0));
        *a += 10;
        *b += 100;
    }
    assert_eq!(vec.as_slice(), &[103, 12, 1]);
}

#[test]
#[should_panic(expected = "identical indices")]
fn test_pick2_mut_same_index_panics() {
    let mut vec: IndexVec<TestId, i32> = vec![1].into_iter().collect();
    let _ = vec.pick2_mut(TestId(0), TestId(0));
}

// ============================================================================
// PROPERTIES
// ============================================================================

#[quickcheck]
fn prop_push_returns_sequential_indices(values: Vec<u8>) -> bool {
    let mut vec: IndexVec<TestId, u8> = IndexVec::new();
    values
        .iter()
        .enumerate()
        .all(|(i, v)| vec.push(*v) == TestId(i as u32))
}

#[quickcheck]
fn prop_indices_address_pushed_values(values: Vec<i64>) -> bool {
    let vec: IndexVec<TestId, i64> = values.iter().copied().collect();
    vec.iter_enumerated().all(|(i, v)| vec[i] == *v) && vec.len() == values.len()
}

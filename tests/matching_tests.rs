use image_stitcher::matching::{DescriptorMatcher, Match};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

fn create_random_descriptors(rows: usize, seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::from_shape_fn((rows, 128), |_| rng.gen_range(0.0..0.2))
}

fn assert_one_to_one(matches: &[Match]) {
    let firsts: HashSet<usize> = matches.iter().map(|m| m.first).collect();
    let seconds: HashSet<usize> = matches.iter().map(|m| m.second).collect();
    assert_eq!(firsts.len(), matches.len());
    assert_eq!(seconds.len(), matches.len());
}

#[test]
fn test_permuted_copy_is_matched_exactly() {
    let a = create_random_descriptors(12, 1);
    let permutation: Vec<usize> = vec![5, 2, 9, 0, 11, 7, 1, 3, 10, 4, 8, 6];
    let b = Array2::from_shape_fn((12, 128), |(i, j)| a[[permutation[i], j]]);

    let matches = DescriptorMatcher::new(None).match_descriptors(&a.view(), &b.view());
    assert_eq!(matches.len(), 12);
    assert_one_to_one(&matches);
    for m in &matches {
        assert_eq!(permutation[m.second], m.first);
    }
}

#[test]
fn test_match_count_is_bounded() {
    let a = create_random_descriptors(20, 2);
    let b = create_random_descriptors(8, 3);

    for (limit, expected) in [(Some(5), 5), (Some(50), 8), (None, 8)] {
        let matches = DescriptorMatcher::new(limit).match_descriptors(&a.view(), &b.view());
        assert_eq!(matches.len(), expected);
        assert_one_to_one(&matches);
        assert!(matches.iter().all(|m| m.first < 20 && m.second < 8));
    }
}

#[test]
fn test_zero_limit_gives_no_matches() {
    let a = create_random_descriptors(4, 4);
    let matches = DescriptorMatcher::new(Some(0)).match_descriptors(&a.view(), &a.view());
    assert!(matches.is_empty());
}

#[test]
fn test_empty_set_gives_no_matches() {
    let a = create_random_descriptors(4, 5);
    let empty = Array2::<f64>::zeros((0, 128));
    let matches = DescriptorMatcher::new(None).match_descriptors(&a.view(), &empty.view());
    assert!(matches.is_empty());
}

#[test]
fn test_ties_resolve_in_row_major_order() {
    let a = Array2::<f64>::zeros((2, 128));
    let b = Array2::<f64>::zeros((3, 128));
    let matches = DescriptorMatcher::new(None).match_descriptors(&a.view(), &b.view());
    assert_eq!(matches, vec![Match::new(0, 0), Match::new(1, 1)]);
}

#[test]
fn test_first_index_refers_to_first_set() {
    // Three descriptors in the first set, one in the second: the only match
    // must name the second set's row 0.
    let mut a = Array2::<f64>::zeros((3, 128));
    a[[2, 0]] = 1.0;
    let mut b = Array2::<f64>::zeros((1, 128));
    b[[0, 0]] = 1.0;
    let matches = DescriptorMatcher::new(None).match_descriptors(&a.view(), &b.view());
    assert_eq!(matches, vec![Match::new(2, 0)]);
}

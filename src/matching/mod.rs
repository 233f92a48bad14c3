//! Greedy one-to-one descriptor matching.

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Index pair into the first and second keypoint/descriptor collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Match {
    pub first: usize,
    pub second: usize,
}

impl Match {
    pub fn new(first: usize, second: usize) -> Self {
        Self { first, second }
    }
}

/// Matches descriptors by globally sorting every candidate pair by squared
/// Euclidean distance and accepting the cheapest pairs whose indices are both
/// still unused.
///
/// The result is conflict-free but not a minimum-cost assignment.
#[derive(Debug, Clone, Default)]
pub struct DescriptorMatcher {
    /// Upper bound on accepted matches; `None` means unbounded.
    pub max_matches: Option<usize>,
}

impl DescriptorMatcher {
    pub fn new(max_matches: Option<usize>) -> Self {
        Self { max_matches }
    }

    pub fn match_descriptors(
        &self,
        descriptors1: &ArrayView2<f64>,
        descriptors2: &ArrayView2<f64>,
    ) -> Vec<Match> {
        let distances = squared_distances(descriptors1, descriptors2);

        let mut pairs: Vec<(usize, usize, f64)> = distances
            .indexed_iter()
            .map(|((i, j), &d)| (i, j, d))
            .collect();
        // Stable sort: equal distances keep row-major order.
        pairs.sort_by(|a, b| a.2.total_cmp(&b.2));

        let limit = self.max_matches.unwrap_or(usize::MAX);
        let mut used1 = HashSet::new();
        let mut used2 = HashSet::new();
        let mut matches = Vec::new();

        for (i, j, _) in pairs {
            if matches.len() >= limit {
                break;
            }
            if !used1.contains(&i) && !used2.contains(&j) {
                used1.insert(i);
                used2.insert(j);
                matches.push(Match::new(i, j));
            }
        }

        tracing::debug!(
            candidates = distances.len(),
            accepted = matches.len(),
            "Greedy descriptor matching completed"
        );
        matches
    }
}

/// `n1 x n2` matrix of squared Euclidean distances between descriptor rows.
pub fn squared_distances(
    descriptors1: &ArrayView2<f64>,
    descriptors2: &ArrayView2<f64>,
) -> Array2<f64> {
    let n1 = descriptors1.nrows();
    let n2 = descriptors2.nrows();
    Array2::from_shape_fn((n1, n2), |(i, j)| {
        descriptors1
            .row(i)
            .iter()
            .zip(descriptors2.row(j).iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_squared_distances() {
        let a = array![[0.0, 0.0], [1.0, 1.0]];
        let b = array![[0.0, 1.0], [3.0, 1.0], [1.0, 1.0]];
        let d = squared_distances(&a.view(), &b.view());
        assert_eq!(d.dim(), (2, 3));
        assert_eq!(d[[0, 0]], 1.0);
        assert_eq!(d[[0, 1]], 10.0);
        assert_eq!(d[[1, 2]], 0.0);
    }

    #[test]
    fn test_greedy_prefers_cheapest_pair_first() {
        // Pairs are accepted in ascending distance order: (1,0)=0.01 then (0,1)=0.25.
        let a = array![[0.0], [1.0]];
        let b = array![[0.9], [-0.5]];
        let matches = DescriptorMatcher::new(None).match_descriptors(&a.view(), &b.view());
        assert_eq!(matches, vec![Match::new(1, 0), Match::new(0, 1)]);
    }
}

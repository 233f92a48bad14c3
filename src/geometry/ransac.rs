use super::homography::{fit_homography, Homography, PointPair};
use crate::features::Keypoint;
use crate::matching::Match;
use crate::{Result, StitchError};
use rand::Rng;

/// Size of the minimal sample drawn on every iteration.
pub const SAMPLE_SIZE: usize = 4;

/// Configuration for RANSAC homography estimation
#[derive(Clone, Debug)]
pub struct RansacConfig {
    /// Exact number of iterations; there is no early exit.
    pub iterations: usize,
    /// Inlier tolerance in pixels.
    pub inlier_threshold: f64,
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self {
            iterations: 1000,
            inlier_threshold: 1.0,
        }
    }
}

/// Result of RANSAC estimation
#[derive(Clone, Debug)]
pub struct RansacEstimate {
    pub homography: Homography,
    /// Matches consistent with the best minimal-sample model.
    pub inliers: Vec<Match>,
    /// Best inlier count after each iteration.
    pub best_inlier_history: Vec<usize>,
    /// Whether the final model was refit on all inliers.
    pub refined: bool,
}

impl RansacEstimate {
    pub fn inlier_count(&self) -> usize {
        self.inliers.len()
    }
}

/// Robustly fit the homography mapping `keypoints1` onto `keypoints2`.
///
/// Each iteration fits the DLT to 4 distinct matches drawn from `rng` and
/// counts matches whose squared reprojection error is below `threshold^2`.
/// A candidate replaces the best model only with strictly more inliers. When
/// the best model has more than 4 inliers it is refit on all of them.
pub fn run_ransac<R: Rng + ?Sized>(
    matches: &[Match],
    keypoints1: &[Keypoint],
    keypoints2: &[Keypoint],
    config: &RansacConfig,
    rng: &mut R,
) -> Result<RansacEstimate> {
    if matches.len() < SAMPLE_SIZE {
        return Err(StitchError::InsufficientCorrespondences {
            found: matches.len(),
        });
    }
    if let Some(m) = matches
        .iter()
        .find(|m| m.first >= keypoints1.len() || m.second >= keypoints2.len())
    {
        return Err(StitchError::MatchOutOfRange {
            first: m.first,
            second: m.second,
        });
    }

    let pairs: Vec<PointPair> = matches
        .iter()
        .map(|m| point_pair(&keypoints1[m.first], &keypoints2[m.second]))
        .collect();
    let threshold_sq = config.inlier_threshold * config.inlier_threshold;

    let mut best: Option<Homography> = None;
    let mut best_inliers: Vec<usize> = Vec::new();
    let mut history = Vec::new();

    for _ in 0..config.iterations {
        let sample: Vec<PointPair> = rand::seq::index::sample(rng, pairs.len(), SAMPLE_SIZE)
            .iter()
            .map(|i| pairs[i])
            .collect();

        if let Ok(candidate) = fit_homography(&sample) {
            let inliers = count_inliers(&candidate, &pairs, threshold_sq);
            if inliers.len() > best_inliers.len() {
                best = Some(candidate);
                best_inliers = inliers;
            }
        }
        history.push(best_inliers.len());
    }

    let best = best.ok_or(StitchError::HomographyEstimationFailed)?;
    tracing::debug!(
        iterations = config.iterations,
        inliers = best_inliers.len(),
        total_matches = matches.len(),
        "RANSAC sampling completed"
    );

    let (homography, refined) = if best_inliers.len() > SAMPLE_SIZE {
        let inlier_pairs: Vec<PointPair> = best_inliers.iter().map(|&i| pairs[i]).collect();
        match fit_homography(&inlier_pairs) {
            Ok(refit) => (refit, true),
            Err(e) => {
                tracing::warn!(error = %e, "Inlier refit failed, keeping best sample model");
                (best, false)
            }
        }
    } else {
        (best, false)
    };

    Ok(RansacEstimate {
        homography,
        inliers: best_inliers.iter().map(|&i| matches[i]).collect(),
        best_inlier_history: history,
        refined,
    })
}

fn point_pair(kp1: &Keypoint, kp2: &Keypoint) -> PointPair {
    let (x1, y1) = kp1.position();
    let (x2, y2) = kp2.position();
    PointPair::new([x1, y1], [x2, y2])
}

/// Indices of pairs whose squared reprojection error is below `threshold_sq`.
fn count_inliers(homography: &Homography, pairs: &[PointPair], threshold_sq: f64) -> Vec<usize> {
    pairs
        .iter()
        .enumerate()
        .filter(|(_, pair)| {
            let (px, py) = homography.project_guarded(pair.from[0], pair.from[1]);
            let dx = px - pair.to[0];
            let dy = py - pair.to[1];
            dx * dx + dy * dy < threshold_sq
        })
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn kp(x: usize, y: usize) -> Keypoint {
        Keypoint::new(x, y, 8.0)
    }

    #[test]
    fn test_too_few_matches() {
        let keypoints = vec![kp(0, 0), kp(1, 1), kp(2, 2)];
        let matches = vec![Match::new(0, 0), Match::new(1, 1), Match::new(2, 2)];
        let mut rng = StdRng::seed_from_u64(1);
        let result = run_ransac(&matches, &keypoints, &keypoints, &RansacConfig::default(), &mut rng);
        assert!(matches!(
            result,
            Err(StitchError::InsufficientCorrespondences { found: 3 })
        ));
    }

    #[test]
    fn test_out_of_range_match_is_rejected() {
        let keypoints = vec![kp(0, 0), kp(10, 0), kp(10, 10), kp(0, 10)];
        let mut matches: Vec<Match> = (0..4).map(|i| Match::new(i, i)).collect();
        matches.push(Match::new(0, 9));
        let mut rng = StdRng::seed_from_u64(1);
        let result = run_ransac(&matches, &keypoints, &keypoints, &RansacConfig::default(), &mut rng);
        assert!(matches!(result, Err(StitchError::MatchOutOfRange { .. })));
    }

    #[test]
    fn test_zero_iterations_finds_nothing() {
        let keypoints = vec![kp(0, 0), kp(10, 0), kp(10, 10), kp(0, 10)];
        let matches: Vec<Match> = (0..4).map(|i| Match::new(i, i)).collect();
        let config = RansacConfig {
            iterations: 0,
            inlier_threshold: 1.0,
        };
        let mut rng = StdRng::seed_from_u64(1);
        let result = run_ransac(&matches, &keypoints, &keypoints, &config, &mut rng);
        assert!(matches!(result, Err(StitchError::HomographyEstimationFailed)));
    }

    #[test]
    fn test_count_inliers_uses_strict_threshold() {
        let pairs = vec![
            PointPair::new([0.0, 0.0], [0.0, 0.0]),
            PointPair::new([5.0, 5.0], [6.0, 5.0]),
            PointPair::new([5.0, 5.0], [5.5, 5.0]),
        ];
        let inliers = count_inliers(&Homography::identity(), &pairs, 1.0);
        assert_eq!(inliers, vec![0, 2]);
    }
}

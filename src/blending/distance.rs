//! Exact Euclidean distance transform (Felzenszwalb and Huttenlocher).

use ndarray::{Array2, ArrayView2, Axis};

/// Stand-in for an unbounded squared distance.
const INF: f64 = 1e20;

/// For every `true` pixel, the Euclidean distance to the nearest `false`
/// pixel; `false` pixels map to 0.
///
/// A mask with no `false` pixel at all yields huge values rather than
/// infinity, which is harmless once normalized into blend weights.
pub fn euclidean_distance_transform(mask: &ArrayView2<bool>) -> Array2<f64> {
    let (rows, cols) = mask.dim();
    let mut dist = mask.mapv(|inside| if inside { INF } else { 0.0 });
    if rows == 0 || cols == 0 {
        return dist;
    }

    let longest = rows.max(cols);
    let mut scratch = Envelope::with_capacity(longest);
    let mut line = vec![0.0; longest];

    for axis in [Axis(0), Axis(1)] {
        for mut lane in dist.lanes_mut(axis) {
            let n = lane.len();
            for (dst, src) in line.iter_mut().zip(lane.iter()) {
                *dst = *src;
            }
            scratch.transform(&line[..n]);
            for (dst, src) in lane.iter_mut().zip(scratch.output.iter()) {
                *dst = *src;
            }
        }
    }

    dist.mapv_inplace(f64::sqrt);
    dist
}

/// Buffers for the 1D lower-envelope-of-parabolas pass.
struct Envelope {
    vertices: Vec<usize>,
    boundaries: Vec<f64>,
    output: Vec<f64>,
}

impl Envelope {
    fn with_capacity(n: usize) -> Self {
        Self {
            vertices: vec![0; n],
            boundaries: vec![0.0; n + 1],
            output: vec![0.0; n],
        }
    }

    /// Squared distance transform of the sampled function `f` into `self.output`.
    fn transform(&mut self, f: &[f64]) {
        let n = f.len();
        let v = &mut self.vertices;
        let z = &mut self.boundaries;
        let intersect = |q: usize, p: usize| {
            let (qf, pf) = (q as f64, p as f64);
            ((f[q] + qf * qf) - (f[p] + pf * pf)) / (2.0 * (qf - pf))
        };

        let mut k = 0;
        v[0] = 0;
        z[0] = -INF;
        z[1] = INF;
        for q in 1..n {
            let mut s = intersect(q, v[k]);
            while s <= z[k] {
                k -= 1;
                s = intersect(q, v[k]);
            }
            k += 1;
            v[k] = q;
            z[k] = s;
            z[k + 1] = INF;
        }

        k = 0;
        for q in 0..n {
            while z[k + 1] < q as f64 {
                k += 1;
            }
            let d = q as f64 - v[k] as f64;
            self.output[q] = d * d + f[v[k]];
        }
    }
}

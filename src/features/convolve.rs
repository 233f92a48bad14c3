use ndarray::{Array2, ArrayView2};

/// A 2D kernel stored as the outer product `vertical ⊗ horizontal`.
///
/// Every kernel the detector and the descriptor need is separable, so the
/// convolution runs as two 1D passes instead of one dense 2D pass.
#[derive(Debug, Clone, PartialEq)]
pub struct SeparableKernel {
    /// Factor applied along rows (axis 0).
    pub vertical: Vec<f64>,
    /// Factor applied along columns (axis 1).
    pub horizontal: Vec<f64>,
}

impl SeparableKernel {
    pub fn new(vertical: Vec<f64>, horizontal: Vec<f64>) -> Self {
        Self { vertical, horizontal }
    }

    /// Dense `rows x cols` form of the kernel.
    pub fn to_dense(&self) -> Array2<f64> {
        Array2::from_shape_fn((self.vertical.len(), self.horizontal.len()), |(r, c)| {
            self.vertical[r] * self.horizontal[c]
        })
    }

    pub fn transposed(&self) -> Self {
        Self {
            vertical: self.horizontal.clone(),
            horizontal: self.vertical.clone(),
        }
    }
}

/// Convolve `image` with `kernel`, zero-filled outside the image, keeping the
/// output the same size as the input (kernel centered on each pixel).
pub fn convolve_same(image: &ArrayView2<f64>, kernel: &SeparableKernel) -> Array2<f64> {
    let along_cols = convolve_axis(image, &kernel.horizontal, Axis::Cols);
    convolve_axis(&along_cols.view(), &kernel.vertical, Axis::Rows)
}

#[derive(Clone, Copy)]
enum Axis {
    Rows,
    Cols,
}

fn convolve_axis(image: &ArrayView2<f64>, taps: &[f64], axis: Axis) -> Array2<f64> {
    let (height, width) = image.dim();
    let mut out = Array2::zeros((height, width));
    if taps.is_empty() || height == 0 || width == 0 {
        return out;
    }

    let len = match axis {
        Axis::Rows => height,
        Axis::Cols => width,
    } as isize;
    let origin = ((taps.len() - 1) / 2) as isize;

    for ((row, col), value) in out.indexed_iter_mut() {
        let pos = match axis {
            Axis::Rows => row,
            Axis::Cols => col,
        } as isize;

        let mut acc = 0.0;
        for (a, &tap) in taps.iter().enumerate() {
            let src = pos + origin - a as isize;
            if src < 0 || src >= len {
                continue;
            }
            let sample = match axis {
                Axis::Rows => image[[src as usize, col]],
                Axis::Cols => image[[row, src as usize]],
            };
            acc += sample * tap;
        }
        *value = acc;
    }

    out
}

/// Unnormalized Gaussian profile sampled at integer offsets `-radius..=radius`.
pub fn gaussian_profile(sigma: f64, radius: usize) -> Vec<f64> {
    let r = radius as isize;
    (-r..=r)
        .map(|x| {
            let x = x as f64;
            (-(x * x) / (2.0 * sigma * sigma)).exp() / (sigma * (2.0 * std::f64::consts::PI).sqrt())
        })
        .collect()
}

/// Gaussian smoothing kernel for the corner detector.
///
/// Radius is `round(3 * floor(sigma))`; the dense kernel sums to 1.
pub fn harris_smoothing_kernel(sigma: f64) -> SeparableKernel {
    let radius = (3.0 * sigma.floor()).round().max(0.0) as usize;
    let mut profile = gaussian_profile(sigma, radius);
    let sum: f64 = profile.iter().sum();
    if sum != 0.0 {
        profile.iter_mut().for_each(|v| *v /= sum);
    }
    SeparableKernel::new(profile.clone(), profile)
}

/// 3x3 centered-difference kernels `(d/dx, d/dy)`: the row `[-1, 0, 1]`
/// repeated over three rows, and its transpose.
pub fn centered_difference_kernels() -> (SeparableKernel, SeparableKernel) {
    let dx = SeparableKernel::new(vec![1.0, 1.0, 1.0], vec![-1.0, 0.0, 1.0]);
    let dy = dx.transposed();
    (dx, dy)
}

/// Derivative-of-Gaussian kernels `(d/dx, d/dy)` of radius `4 * floor(sigma)`,
/// each rescaled so the absolute values of the dense kernel sum to 2.
pub fn gaussian_derivative_kernels(sigma: f64) -> (SeparableKernel, SeparableKernel) {
    let radius = (4.0 * sigma.floor()).max(0.0) as usize;
    let profile = gaussian_profile(sigma, radius);
    let mut derivative = finite_difference(&profile);

    let abs_sum = profile.iter().map(|v| v.abs()).sum::<f64>()
        * derivative.iter().map(|v| v.abs()).sum::<f64>();
    if abs_sum != 0.0 {
        let scale = 2.0 / abs_sum;
        derivative.iter_mut().for_each(|v| *v *= scale);
    }

    let dx = SeparableKernel::new(profile, derivative);
    let dy = dx.transposed();
    (dx, dy)
}

/// Central differences in the interior, one-sided differences at both ends.
fn finite_difference(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    if n < 2 {
        return vec![0.0; n];
    }
    (0..n)
        .map(|i| match i {
            0 => values[1] - values[0],
            i if i == n - 1 => values[n - 1] - values[n - 2],
            i => (values[i + 1] - values[i - 1]) / 2.0,
        })
        .collect()
}

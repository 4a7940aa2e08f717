// Gaussian-process surrogate over points in the unit cube.
//
// Kernel: Matern (nu = 5/2) with unit amplitude on standardized targets plus a white-noise term.
// The isotropic length scale and the noise level are picked from fixed grids by maximizing the
// log marginal likelihood, which keeps fitting deterministic and free of inner optimizers.

use quantlib::errors::QuantError;

const LENGTH_SCALES: [f64; 9] = [0.05, 0.1, 0.2, 0.3, 0.5, 0.75, 1.0, 1.5, 2.5];
const NOISE_LEVELS: [f64; 3] = [1e-6, 1e-4, 1e-2];
const JITTER: [f64; 4] = [0.0, 1e-10, 1e-8, 1e-6];

pub fn matern52(a: &[f64], b: &[f64], length_scale: f64) -> f64 {
    let distance = a
        .iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt();
    let s = 5f64.sqrt() * distance / length_scale;
    (1.0 + s + s * s / 3.0) * (-s).exp()
}

pub struct GaussianProcess {
    points: Vec<Vec<f64>>,
    length_scale: f64,
    noise: f64,
    // Lower triangular Cholesky factor of K + noise * I, row-major n x n
    cholesky: Vec<f64>,
    alpha: Vec<f64>,
    y_mean: f64,
    y_std: f64,
    log_marginal_likelihood: f64,
}

impl GaussianProcess {
    pub fn fit(points: &[Vec<f64>], values: &[f64]) -> Result<GaussianProcess, QuantError> {
        if points.is_empty() || points.len() != values.len() {
            return Err(QuantError::SurrogateFailure(format!(
                "cannot fit {} points to {} values",
                points.len(),
                values.len()
            )));
        }

        let n = values.len() as f64;
        let y_mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|y| (y - y_mean).powi(2)).sum::<f64>() / n;
        let y_std = if variance.sqrt() > 1e-12 {
            variance.sqrt()
        } else {
            1.0
        };
        let targets: Vec<f64> = values.iter().map(|y| (y - y_mean) / y_std).collect();

        let mut best: Option<GaussianProcess> = None;
        for length_scale in LENGTH_SCALES {
            for noise in NOISE_LEVELS {
                let candidate = match Self::factorize(points, &targets, length_scale, noise) {
                    Some(candidate) => candidate,
                    None => continue,
                };
                let better = match &best {
                    Some(best) => candidate.log_marginal_likelihood > best.log_marginal_likelihood,
                    None => true,
                };
                if better {
                    best = Some(candidate);
                }
            }
        }

        let mut gp = best.ok_or_else(|| {
            QuantError::SurrogateFailure(format!(
                "kernel matrix over {} points is not positive definite",
                points.len()
            ))
        })?;
        gp.y_mean = y_mean;
        gp.y_std = y_std;
        Ok(gp)
    }

    fn factorize(
        points: &[Vec<f64>],
        targets: &[f64],
        length_scale: f64,
        noise: f64,
    ) -> Option<GaussianProcess> {
        let n = points.len();
        let mut kernel = vec![0.0; n * n];
        for i in 0..n {
            for j in 0..=i {
                let k = matern52(&points[i], &points[j], length_scale);
                kernel[i * n + j] = k;
                kernel[j * n + i] = k;
            }
            kernel[i * n + i] += noise;
        }

        let cholesky = JITTER.iter().find_map(|jitter| {
            let mut matrix = kernel.clone();
            for i in 0..n {
                matrix[i * n + i] += jitter;
            }
            cholesky(&matrix, n)
        })?;

        let alpha = back_substitute(&cholesky, &forward_substitute(&cholesky, targets, n), n);
        let fit = targets.iter().zip(&alpha).map(|(y, a)| y * a).sum::<f64>();
        let log_det = (0..n).map(|i| cholesky[i * n + i].ln()).sum::<f64>();
        let log_marginal_likelihood =
            -0.5 * fit - log_det - 0.5 * n as f64 * (2.0 * std::f64::consts::PI).ln();
        if !log_marginal_likelihood.is_finite() {
            return None;
        }

        Some(GaussianProcess {
            points: points.to_vec(),
            length_scale,
            noise,
            cholesky,
            alpha,
            y_mean: 0.0,
            y_std: 1.0,
            log_marginal_likelihood,
        })
    }

    // Posterior mean and standard deviation of the latent function, in the units of the fitted values
    pub fn predict(&self, x: &[f64]) -> (f64, f64) {
        let n = self.points.len();
        let k: Vec<f64> = self
            .points
            .iter()
            .map(|point| matern52(x, point, self.length_scale))
            .collect();

        let mean = k.iter().zip(&self.alpha).map(|(k, a)| k * a).sum::<f64>();
        let v = forward_substitute(&self.cholesky, &k, n);
        let variance = (1.0 - v.iter().map(|v| v * v).sum::<f64>()).max(0.0);

        (
            mean * self.y_std + self.y_mean,
            variance.sqrt() * self.y_std,
        )
    }

    pub fn length_scale(&self) -> f64 {
        self.length_scale
    }

    pub fn noise(&self) -> f64 {
        self.noise
    }
}

// Returns None if the matrix is not positive definite
fn cholesky(matrix: &[f64], n: usize) -> Option<Vec<f64>> {
    let mut lower = vec![0.0; n * n];
    for i in 0..n {
        for j in 0..=i {
            let mut sum = matrix[i * n + j];
            for k in 0..j {
                sum -= lower[i * n + k] * lower[j * n + k];
            }
            if i == j {
                if !(sum > 0.0) {
                    return None;
                }
                lower[i * n + i] = sum.sqrt();
            } else {
                lower[i * n + j] = sum / lower[j * n + j];
            }
        }
    }
    Some(lower)
}

// Solves L z = b
fn forward_substitute(lower: &[f64], b: &[f64], n: usize) -> Vec<f64> {
    let mut z = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum -= lower[i * n + j] * z[j];
        }
        z[i] = sum / lower[i * n + i];
    }
    z
}

// Solves L^T x = z
fn back_substitute(lower: &[f64], z: &[f64], n: usize) -> Vec<f64> {
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = z[i];
        for j in (i + 1)..n {
            sum -= lower[j * n + i] * x[j];
        }
        x[i] = sum / lower[i * n + i];
    }
    x
}

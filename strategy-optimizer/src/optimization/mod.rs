// Bayesian minimizer for bounded, expensive, black-box functions.
//
// The first `n_random_starts` evaluations are uniform draws inside the bounds. Every later point
// is the candidate with the highest expected improvement under a Gaussian-process surrogate fitted
// to all observations so far. All randomness comes from the generator passed in by the caller.

pub mod acquisition;
pub mod gaussian_process;

use rand::Rng;
use rayon::prelude::*;

use quantlib::errors::QuantError;
use quantlib::util::Settings;

use acquisition::{expected_improvement, standard_normal};
use gaussian_process::GaussianProcess;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dimension {
    pub low: f64,
    pub high: f64,
}

impl Dimension {
    pub fn new(low: f64, high: f64) -> Self {
        Dimension { low, high }
    }

    pub fn span(&self) -> f64 {
        self.high - self.low
    }

    pub fn contains(&self, x: f64) -> bool {
        self.low <= x && x <= self.high
    }

    fn to_unit(&self, x: f64) -> f64 {
        (x - self.low) / self.span()
    }

    fn from_unit(&self, u: f64) -> f64 {
        (self.low + u * self.span()).clamp(self.low, self.high)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MinimizerConfig {
    pub n_calls: usize,
    pub n_random_starts: usize,
    pub n_candidates: usize,
    pub xi: f64,
}

impl MinimizerConfig {
    pub fn new(n_calls: usize) -> Self {
        MinimizerConfig {
            n_calls,
            n_random_starts: 15.min(n_calls),
            n_candidates: 2000,
            xi: 0.01,
        }
    }

    pub fn with_initial_samples(mut self, samples: usize) -> Self {
        self.n_random_starts = samples;
        self
    }

    pub fn with_candidates(mut self, candidates: usize) -> Self {
        self.n_candidates = candidates;
        self
    }

    pub fn with_exploration(mut self, xi: f64) -> Self {
        self.xi = xi;
        self
    }
}

impl From<&Settings> for MinimizerConfig {
    fn from(settings: &Settings) -> Self {
        MinimizerConfig::new(settings.n_calls)
            .with_initial_samples(settings.n_random_starts)
            .with_candidates(settings.n_candidates)
            .with_exploration(settings.xi)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptimizeResult {
    // Best point and value seen across every evaluation
    pub x: Vec<f64>,
    pub fun: f64,
    // Every evaluation in order
    pub x_iters: Vec<Vec<f64>>,
    pub func_vals: Vec<f64>,
}

impl OptimizeResult {
    // Running minimum of the objective, one entry per evaluation
    pub fn best_so_far(&self) -> Vec<f64> {
        self.func_vals
            .iter()
            .scan(f64::INFINITY, |best, value| {
                *best = best.min(*value);
                Some(*best)
            })
            .collect()
    }
}

pub fn check_point(point: &[f64], bounds: &[Dimension]) -> Result<(), QuantError> {
    if point.len() != bounds.len() {
        return Err(QuantError::InvalidWeightVector(format!(
            "expected {} components, got {}",
            bounds.len(),
            point.len()
        )));
    }
    for (i, (x, dimension)) in point.iter().zip(bounds).enumerate() {
        if !dimension.contains(*x) {
            return Err(QuantError::InvalidWeightVector(format!(
                "component {} = {} lies outside [{}, {}]",
                i, x, dimension.low, dimension.high
            )));
        }
    }
    Ok(())
}

fn validate(bounds: &[Dimension], config: &MinimizerConfig) -> Result<(), QuantError> {
    if bounds.is_empty() {
        return Err(QuantError::InvalidSettings("no dimensions to optimize".to_string()));
    }
    if let Some(dimension) = bounds
        .iter()
        .find(|d| !d.low.is_finite() || !d.high.is_finite() || d.low >= d.high)
    {
        return Err(QuantError::InvalidSettings(format!(
            "invalid bound [{}, {}]",
            dimension.low, dimension.high
        )));
    }
    if config.n_random_starts == 0 || config.n_random_starts > config.n_calls {
        return Err(QuantError::InvalidSettings(format!(
            "{} random starts do not fit a budget of {} calls",
            config.n_random_starts, config.n_calls
        )));
    }
    if config.n_candidates == 0 {
        return Err(QuantError::InvalidSettings(
            "at least one acquisition candidate is required".to_string(),
        ));
    }
    Ok(())
}

pub fn gp_minimize<F, R>(
    mut objective: F,
    bounds: &[Dimension],
    config: &MinimizerConfig,
    rng: &mut R,
) -> Result<OptimizeResult, QuantError>
where
    F: FnMut(&[f64]) -> Result<f64, QuantError>,
    R: Rng,
{
    validate(bounds, config)?;

    let mut x_iters: Vec<Vec<f64>> = Vec::with_capacity(config.n_calls);
    let mut func_vals: Vec<f64> = Vec::with_capacity(config.n_calls);

    for iteration in 0..config.n_calls {
        let point = if iteration < config.n_random_starts {
            random_point(bounds, rng)
        } else {
            next_point(bounds, &x_iters, &func_vals, config, rng)?
        };
        check_point(&point, bounds)?;

        let value = objective(&point)?;
        if !value.is_finite() {
            return Err(QuantError::NonFiniteObjective(point));
        }
        log::debug!("Evaluation {}: f({:?}) = {}", iteration + 1, point, value);

        x_iters.push(point);
        func_vals.push(value);
    }

    // First occurrence wins on ties
    let mut best = 0;
    for (i, value) in func_vals.iter().enumerate() {
        if *value < func_vals[best] {
            best = i;
        }
    }

    Ok(OptimizeResult {
        x: x_iters[best].clone(),
        fun: func_vals[best],
        x_iters,
        func_vals,
    })
}

fn random_point<R: Rng>(bounds: &[Dimension], rng: &mut R) -> Vec<f64> {
    bounds
        .iter()
        .map(|dimension| dimension.from_unit(rng.gen::<f64>()))
        .collect()
}

fn next_point<R: Rng>(
    bounds: &[Dimension],
    x_iters: &[Vec<f64>],
    func_vals: &[f64],
    config: &MinimizerConfig,
    rng: &mut R,
) -> Result<Vec<f64>, QuantError> {
    let observed: Vec<Vec<f64>> = x_iters
        .iter()
        .map(|x| {
            x.iter()
                .zip(bounds)
                .map(|(x, dimension)| dimension.to_unit(*x))
                .collect()
        })
        .collect();
    let gp = GaussianProcess::fit(&observed, func_vals)?;
    let y_opt = func_vals.iter().cloned().fold(f64::INFINITY, f64::min);
    let normal = standard_normal()?;

    // Candidates are drawn sequentially so the generator state does not depend on thread scheduling
    let candidates: Vec<Vec<f64>> = (0..config.n_candidates)
        .map(|_| bounds.iter().map(|_| rng.gen::<f64>()).collect())
        .collect();
    let scores: Vec<f64> = candidates
        .par_iter()
        .map(|candidate| {
            let (mean, std) = gp.predict(candidate);
            expected_improvement(&normal, mean, std, y_opt, config.xi)
        })
        .collect();

    let mut best = 0;
    for (i, score) in scores.iter().enumerate() {
        if *score > scores[best] {
            best = i;
        }
    }
    log::debug!(
        "Surrogate length scale {}, noise {}, best EI {}",
        gp.length_scale(),
        gp.noise(),
        scores[best]
    );

    Ok(candidates[best]
        .iter()
        .zip(bounds)
        .map(|(u, dimension)| dimension.from_unit(*u))
        .collect())
}

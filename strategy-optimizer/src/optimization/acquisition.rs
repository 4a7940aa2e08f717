use statrs::distribution::{Continuous, ContinuousCDF, Normal};

use quantlib::errors::QuantError;

pub fn standard_normal() -> Result<Normal, QuantError> {
    Normal::new(0.0, 1.0).map_err(|e| QuantError::SurrogateFailure(e.to_string()))
}

// Expected improvement below `y_opt` for a minimization problem.
// `xi` trades exploitation for exploration; zero-variance points can not improve.
pub fn expected_improvement(normal: &Normal, mean: f64, std: f64, y_opt: f64, xi: f64) -> f64 {
    if !(std > 0.0) {
        return 0.0;
    }
    let improvement = y_opt - mean - xi;
    let z = improvement / std;
    (improvement * normal.cdf(z) + std * normal.pdf(z)).max(0.0)
}

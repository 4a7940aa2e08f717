use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::QuantError;
use crate::models::rule::{default_rules, Rule, Thresholds};

// Everything one optimization run needs. Missing keys fall back to the defaults below.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub ticker: String,
    pub first_year: i32,
    pub year_count: u32,
    pub rules: Vec<Rule>,
    pub buy_threshold: f64,
    pub sell_threshold: f64,

    // One [low, high] range per rule
    pub bounds: Vec<(f64, f64)>,
    pub n_calls: usize,
    pub n_random_starts: usize,
    pub n_candidates: usize,
    pub xi: f64,
    pub seed: u64,

    pub initial_balance: f64,
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub parallel: bool,
    pub save_evaluations: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            ticker: "SPY".to_string(),
            first_year: 2000,
            year_count: 20,
            rules: default_rules(),
            buy_threshold: -2.5,
            sell_threshold: -2.5,
            bounds: vec![(0.0, 10.0); 4],
            n_calls: 50,
            n_random_starts: 15,
            n_candidates: 2000,
            xi: 0.01,
            seed: 1234,
            initial_balance: 100_000.0,
            data_dir: PathBuf::from("assets/data"),
            output_dir: PathBuf::from("assets/opt"),
            parallel: false,
            save_evaluations: false,
        }
    }
}

impl Settings {
    pub fn load(path: impl AsRef<Path>) -> Result<Settings, QuantError> {
        let settings = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&settings)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            buy: self.buy_threshold,
            sell: self.sell_threshold,
        }
    }

    pub fn validate(&self) -> Result<(), QuantError> {
        let invalid = |message: String| Err(QuantError::InvalidSettings(message));

        if self.ticker.trim().is_empty() {
            return invalid("ticker is empty".to_string());
        }
        if self.rules.is_empty() {
            return invalid("at least one rule is required".to_string());
        }
        for rule in &self.rules {
            rule.validate()?;
        }
        if self.bounds.len() != self.rules.len() {
            return invalid(format!(
                "{} bounds given for {} rules",
                self.bounds.len(),
                self.rules.len()
            ));
        }
        for (low, high) in &self.bounds {
            if !low.is_finite() || !high.is_finite() || *low < 0.0 || low >= high {
                return invalid(format!("bound [{}, {}] is not a valid weight range", low, high));
            }
        }
        if !self.buy_threshold.is_finite() || !self.sell_threshold.is_finite() {
            return invalid("thresholds must be finite".to_string());
        }
        if self.n_random_starts == 0 {
            return invalid("nRandomStarts must be at least 1".to_string());
        }
        if self.n_random_starts > self.n_calls {
            return invalid(format!(
                "nRandomStarts ({}) exceeds nCalls ({})",
                self.n_random_starts, self.n_calls
            ));
        }
        if self.n_candidates == 0 {
            return invalid("nCandidates must be at least 1".to_string());
        }
        if !self.xi.is_finite() || self.xi < 0.0 {
            return invalid(format!("xi must be a non-negative number, got {}", self.xi));
        }
        if self.year_count == 0 {
            return invalid("yearCount must be at least 1".to_string());
        }
        // The last window ends on Jan 1 of first_year + year_count
        let end_year = i32::try_from(self.year_count)
            .ok()
            .and_then(|count| self.first_year.checked_add(count));
        if end_year.and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1)).is_none() {
            return invalid(format!(
                "{} years from {} run past the supported calendar",
                self.year_count, self.first_year
            ));
        }
        if !(self.initial_balance > 0.0) || !self.initial_balance.is_finite() {
            return invalid(format!(
                "initialBalance must be positive, got {}",
                self.initial_balance
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.rules.len(), 4);
        assert_eq!(settings.thresholds(), Thresholds { buy: -2.5, sell: -2.5 });
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"ticker": "QQQ", "firstYear": 2010, "parallel": true}"#)
                .unwrap();
        assert_eq!(settings.ticker, "QQQ");
        assert_eq!(settings.first_year, 2010);
        assert!(settings.parallel);
        assert_eq!(settings.n_calls, 50);
        assert_eq!(settings.bounds, vec![(0.0, 10.0); 4]);
    }

    #[test]
    fn bounds_must_match_rules() {
        let settings = Settings {
            bounds: vec![(0.0, 10.0); 3],
            ..Settings::default()
        };
        assert!(matches!(settings.validate(), Err(QuantError::InvalidSettings(_))));
    }

    #[test]
    fn random_starts_cannot_exceed_budget() {
        let settings = Settings {
            n_calls: 10,
            n_random_starts: 11,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn negative_weight_bounds_are_rejected() {
        let mut settings = Settings::default();
        settings.bounds[2] = (-1.0, 10.0);
        assert!(settings.validate().is_err());
    }

    #[test]
    fn year_span_must_fit_the_calendar() {
        let settings = Settings {
            year_count: 3_000_000_000,
            ..Settings::default()
        };
        assert!(matches!(settings.validate(), Err(QuantError::InvalidSettings(_))));

        let settings = Settings {
            first_year: i32::MAX - 5,
            year_count: 10,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());

        let settings = Settings {
            first_year: 1990,
            year_count: 35,
            ..Settings::default()
        };
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn load_reads_and_validates_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        std::fs::write(&path, r#"{"yearCount": 3, "bounds": [[0, 5], [0, 5], [0, 5], [0, 5]]}"#)
            .unwrap();
        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.year_count, 3);
        assert_eq!(settings.bounds[0], (0.0, 5.0));

        std::fs::write(&path, r#"{"yearCount": 0}"#).unwrap();
        assert!(Settings::load(&path).is_err());
    }
}

use quantlib::errors::QuantError;
use quantlib::history::{OptimizationWindow, RoiCalculator};
use quantlib::models::{RoiSeries, Rule, Thresholds};

// Scores a vector of rule weights by the negated return of the strategy over one window,
// so minimizing it maximizes the trailing return.
pub struct WeightObjective<'a, C: RoiCalculator + ?Sized> {
    calculator: &'a C,
    rules: Vec<Rule>,
    thresholds: Thresholds,
    ticker: String,
    window: OptimizationWindow,
}

impl<'a, C: RoiCalculator + ?Sized> WeightObjective<'a, C> {
    pub fn new(
        calculator: &'a C,
        rules: &[Rule],
        thresholds: Thresholds,
        ticker: &str,
        window: OptimizationWindow,
    ) -> Self {
        WeightObjective {
            calculator,
            rules: rules.to_vec(),
            thresholds,
            ticker: ticker.to_string(),
            window,
        }
    }

    // A copy of the rule list with each percentage replaced by the matching weight
    pub fn weighted_rules(&self, weights: &[f64]) -> Result<Vec<Rule>, QuantError> {
        if weights.len() != self.rules.len() {
            return Err(QuantError::InvalidWeightVector(format!(
                "expected {} weights, got {}",
                self.rules.len(),
                weights.len()
            )));
        }
        if let Some(weight) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
            return Err(QuantError::InvalidWeightVector(format!(
                "weights must be finite and non-negative, got {} in {:?}",
                weight, weights
            )));
        }

        let mut rules = self.rules.clone();
        for (rule, weight) in rules.iter_mut().zip(weights) {
            rule.percentage = *weight;
        }
        Ok(rules)
    }

    pub fn series(&self, weights: &[f64]) -> Result<RoiSeries, QuantError> {
        let rules = self.weighted_rules(weights)?;
        let series =
            self.calculator
                .roi_series(&self.ticker, &self.window, &rules, &self.thresholds)?;
        if series.is_empty() {
            return Err(QuantError::DataUnavailable {
                ticker: self.ticker.clone(),
                start: self.window.base_time,
                end: self.window.now_time,
            });
        }
        Ok(series)
    }

    pub fn evaluate(&self, weights: &[f64]) -> Result<f64, QuantError> {
        let series = self.series(weights)?;
        Ok(-series.roi()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use quantlib::models::default_rules;
    use std::sync::Mutex;

    // Returns a canned series and remembers the percentages it was asked about
    struct CannedRoi {
        series: RoiSeries,
        seen: Mutex<Vec<Vec<f64>>>,
    }

    impl CannedRoi {
        fn new(values: Vec<f64>) -> Self {
            let start = NaiveDate::from_ymd_opt(2012, 1, 3).unwrap();
            let series = RoiSeries {
                dates: (0..values.len())
                    .map(|i| start + chrono::Duration::days(i as i64))
                    .collect(),
                hold_values: values.clone(),
                signals: vec![0.0; values.len()],
                strategic_values: values,
                ..RoiSeries::default()
            };
            CannedRoi {
                series,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl RoiCalculator for CannedRoi {
        fn roi_series(
            &self,
            _ticker: &str,
            _window: &OptimizationWindow,
            rules: &[Rule],
            _thresholds: &Thresholds,
        ) -> Result<RoiSeries, QuantError> {
            self.seen
                .lock()
                .unwrap()
                .push(rules.iter().map(|rule| rule.percentage).collect());
            Ok(self.series.clone())
        }
    }

    fn objective(calculator: &CannedRoi) -> WeightObjective<'_, CannedRoi> {
        WeightObjective::new(
            calculator,
            &default_rules(),
            Thresholds { buy: -2.5, sell: -2.5 },
            "SPY",
            OptimizationWindow::calendar_year(2012).unwrap(),
        )
    }

    #[test]
    fn returns_negated_final_over_initial_value() {
        let calculator = CannedRoi::new(vec![100.0, 90.0, 125.0]);
        let value = objective(&calculator).evaluate(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(value, -1.25);
    }

    #[test]
    fn weights_replace_percentages_on_a_private_copy() {
        let calculator = CannedRoi::new(vec![100.0, 110.0]);
        let objective = objective(&calculator);
        objective.evaluate(&[0.5, 0.0, 9.5, 10.0]).unwrap();

        assert_eq!(calculator.seen.lock().unwrap()[0], vec![0.5, 0.0, 9.5, 10.0]);
        assert!(objective.rules.iter().all(|rule| rule.percentage == 1.0));
    }

    #[test]
    fn empty_series_is_unavailable_data() {
        let calculator = CannedRoi::new(Vec::new());
        let result = objective(&calculator).evaluate(&[1.0; 4]);
        assert!(matches!(result, Err(QuantError::DataUnavailable { .. })));
    }

    #[test]
    fn worthless_start_is_malformed() {
        let calculator = CannedRoi::new(vec![0.0, 10.0]);
        let result = objective(&calculator).evaluate(&[1.0; 4]);
        assert!(matches!(result, Err(QuantError::MalformedSeries(_))));
    }

    #[test]
    fn wrong_length_or_negative_weights_are_rejected() {
        let calculator = CannedRoi::new(vec![100.0, 110.0]);
        let objective = objective(&calculator);
        assert!(matches!(
            objective.evaluate(&[1.0; 3]),
            Err(QuantError::InvalidWeightVector(_))
        ));
        assert!(matches!(
            objective.evaluate(&[1.0, -0.5, 1.0, 1.0]),
            Err(QuantError::InvalidWeightVector(_))
        ));
        assert!(calculator.seen.lock().unwrap().is_empty());
    }
}

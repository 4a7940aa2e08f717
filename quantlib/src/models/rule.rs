use serde::{Deserialize, Serialize};

use crate::errors::QuantError;
use crate::history::DailyBar;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceField {
    Open,
    High,
    Low,
    Close,
    #[serde(rename = "Adj Close")]
    AdjClose,
    Volume,
}

impl PriceField {
    pub fn of(&self, bar: &DailyBar) -> f64 {
        match self {
            PriceField::Open => bar.open,
            PriceField::High => bar.high,
            PriceField::Low => bar.low,
            PriceField::Close => bar.close,
            PriceField::AdjClose => bar.adj_close,
            PriceField::Volume => bar.volume,
        }
    }
}

// Compares two historical price points, e.g. "close 10 days ago" against "close today".
// Offsets count trading days relative to the scored day and are never positive.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Rule {
    #[serde(rename = "Larger: When?")]
    pub larger_when: i64,
    #[serde(rename = "Larger: What?")]
    pub larger_what: PriceField,
    #[serde(rename = "Smaller: When?")]
    pub smaller_when: i64,
    #[serde(rename = "Smaller: What?")]
    pub smaller_what: PriceField,

    // Tunable relative weight
    #[serde(rename = "Percentage")]
    pub percentage: f64,
    // Fixed direction and magnitude
    #[serde(rename = "Weight")]
    pub weight: f64,
}

impl Rule {
    pub fn new(
        larger_when: i64,
        larger_what: PriceField,
        smaller_when: i64,
        smaller_what: PriceField,
        weight: f64,
    ) -> Self {
        Rule {
            larger_when,
            larger_what,
            smaller_when,
            smaller_what,
            percentage: 1.0,
            weight,
        }
    }

    pub fn validate(&self) -> Result<(), QuantError> {
        if self.larger_when > 0 || self.smaller_when > 0 {
            return Err(QuantError::InvalidSettings(format!(
                "rule offsets must not look ahead: {:?}",
                self
            )));
        }
        if !self.weight.is_finite() || !self.percentage.is_finite() {
            return Err(QuantError::InvalidSettings(format!(
                "rule weights must be finite: {:?}",
                self
            )));
        }
        Ok(())
    }

    // Returns None when either referenced bar lies before the start of `bars`.
    pub fn fires(&self, bars: &[DailyBar], index: usize) -> Option<bool> {
        let larger = bars.get(offset_index(index, self.larger_when)?)?;
        let smaller = bars.get(offset_index(index, self.smaller_when)?)?;
        Some(self.larger_what.of(larger) > self.smaller_what.of(smaller))
    }

    pub fn contribution(&self, bars: &[DailyBar], index: usize) -> f64 {
        match self.fires(bars, index) {
            Some(true) => self.weight * self.percentage,
            _ => 0.0,
        }
    }
}

fn offset_index(index: usize, offset: i64) -> Option<usize> {
    let target = index as i64 + offset;
    if target < 0 {
        None
    } else {
        Some(target as usize)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub buy: f64,
    pub sell: f64,
}

// The rule list the weights are tuned for: one 10-day reversal rule and three momentum rules.
pub fn default_rules() -> Vec<Rule> {
    vec![
        Rule::new(-10, PriceField::Close, 0, PriceField::Close, -2.0),
        Rule::new(0, PriceField::Close, -1, PriceField::Close, -1.0),
        Rule::new(0, PriceField::Close, -3, PriceField::Close, -1.0),
        Rule::new(0, PriceField::Close, -5, PriceField::Close, -1.0),
    ]
}

// Sums the contributions of every rule that fires on the given day
pub fn score(rules: &[Rule], bars: &[DailyBar], index: usize) -> f64 {
    rules
        .iter()
        .map(|rule| rule.contribution(bars, index))
        .sum()
}

#![allow(dead_code)]

use chrono::{Datelike, NaiveDate, Weekday};
use quantlib::errors::QuantError;
use quantlib::history::{DailyBar, PriceSource};
use quantlib::util::Settings;

// Weekday bars with a slow trend and two overlapping cycles, optionally leaving out one year
pub struct SyntheticSource {
    pub first: NaiveDate,
    pub last: NaiveDate,
    pub missing_year: Option<i32>,
}

impl SyntheticSource {
    pub fn new(first_year: i32, last_year: i32) -> Self {
        SyntheticSource {
            // A few months of history ahead of the first window
            first: NaiveDate::from_ymd_opt(first_year - 1, 9, 1).unwrap(),
            last: NaiveDate::from_ymd_opt(last_year, 12, 31).unwrap(),
            missing_year: None,
        }
    }

    pub fn without_year(mut self, year: i32) -> Self {
        self.missing_year = Some(year);
        self
    }

    pub fn bars(&self) -> Vec<DailyBar> {
        let mut bars = Vec::new();
        let mut date = self.first;
        let mut i: f64 = 0.0;
        while date <= self.last {
            let weekend = matches!(date.weekday(), Weekday::Sat | Weekday::Sun);
            if !weekend && Some(date.year()) != self.missing_year {
                let close = 100.0 + 0.02 * i + 8.0 * (i / 7.0).sin() + 3.0 * (i / 2.3).cos();
                bars.push(DailyBar::flat(date, close));
                i += 1.0;
            }
            date = date.succ_opt().unwrap();
        }
        bars
    }
}

impl PriceSource for SyntheticSource {
    fn load(&self, _ticker: &str) -> Result<Vec<DailyBar>, QuantError> {
        Ok(self.bars())
    }
}

// Default rules and thresholds with a budget small enough for debug builds
pub fn quick_settings(output_dir: &std::path::Path) -> Settings {
    Settings {
        n_calls: 8,
        n_random_starts: 4,
        n_candidates: 64,
        output_dir: output_dir.to_path_buf(),
        ..Settings::default()
    }
}

pub fn read_table(path: &std::path::Path) -> Vec<csv::StringRecord> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    reader.records().map(|record| record.unwrap()).collect()
}

pub mod roi;
pub use roi::*;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use serde::Deserialize;

use crate::errors::QuantError;

#[derive(Debug, Clone, PartialEq)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adj_close: f64,
    pub volume: f64,
}

impl DailyBar {
    // A bar whose prices all equal `close`, used for synthetic series
    pub fn flat(date: NaiveDate, close: f64) -> Self {
        DailyBar {
            date,
            open: close,
            high: close,
            low: close,
            close,
            adj_close: close,
            volume: 0.0,
        }
    }
}

// Half-open interval [base_time, now_time) of calendar dates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OptimizationWindow {
    pub base_time: NaiveDate,
    pub now_time: NaiveDate,
}

impl OptimizationWindow {
    pub fn new(base_time: NaiveDate, now_time: NaiveDate) -> Self {
        OptimizationWindow {
            base_time,
            now_time,
        }
    }

    // [Jan 1 of `year`, Jan 1 of `year + 1`)
    pub fn calendar_year(year: i32) -> Result<Self, QuantError> {
        let jan_first = |year: i32| {
            NaiveDate::from_ymd_opt(year, 1, 1)
                .ok_or_else(|| QuantError::InvalidSettings(format!("year {} is out of range", year)))
        };
        Ok(OptimizationWindow::new(jan_first(year)?, jan_first(year + 1)?))
    }

    pub fn year(&self) -> i32 {
        self.base_time.year()
    }
}

pub trait PriceSource: Send + Sync {
    // All known bars for the ticker, sorted by date
    fn load(&self, ticker: &str) -> Result<Vec<DailyBar>, QuantError>;
}

// Reads Yahoo-style daily bars from `<data_dir>/<TICKER>.csv`
pub struct CsvPriceSource {
    data_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Date")]
    date: NaiveDate,
    #[serde(rename = "Open", deserialize_with = "csv::invalid_option")]
    open: Option<f64>,
    #[serde(rename = "High", deserialize_with = "csv::invalid_option")]
    high: Option<f64>,
    #[serde(rename = "Low", deserialize_with = "csv::invalid_option")]
    low: Option<f64>,
    #[serde(rename = "Close", deserialize_with = "csv::invalid_option")]
    close: Option<f64>,
    #[serde(rename = "Adj Close", deserialize_with = "csv::invalid_option")]
    adj_close: Option<f64>,
    #[serde(rename = "Volume", deserialize_with = "csv::invalid_option")]
    volume: Option<f64>,
}

impl CsvRow {
    fn into_bar(self) -> Option<DailyBar> {
        Some(DailyBar {
            date: self.date,
            open: self.open?,
            high: self.high?,
            low: self.low?,
            close: self.close?,
            adj_close: self.adj_close?,
            volume: self.volume?,
        })
    }
}

impl CsvPriceSource {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        CsvPriceSource {
            data_dir: data_dir.into(),
        }
    }

    pub fn path(&self, ticker: &str) -> PathBuf {
        self.data_dir.join(format!("{}.csv", ticker))
    }
}

impl PriceSource for CsvPriceSource {
    fn load(&self, ticker: &str) -> Result<Vec<DailyBar>, QuantError> {
        read_bars(&self.path(ticker))
    }
}

pub fn read_bars(path: &Path) -> Result<Vec<DailyBar>, QuantError> {
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(BufReader::new(file));

    let mut bars = Vec::new();
    let mut skipped = 0;
    for row in reader.deserialize() {
        let row: CsvRow = row?;
        let date = row.date;
        match row.into_bar() {
            Some(bar) => bars.push(bar),
            None => {
                log::warn!("Skipping incomplete row for {} in {}", date, path.display());
                skipped += 1;
            }
        }
    }

    bars.sort_by_key(|bar| bar.date);
    log::debug!(
        "Loaded {} bars from {} ({} skipped)",
        bars.len(),
        path.display(),
        skipped
    );
    Ok(bars)
}

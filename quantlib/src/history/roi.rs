use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::errors::QuantError;
use crate::history::{DailyBar, OptimizationWindow, PriceSource};
use crate::models::portfolio::{Backtest, RoiSeries};
use crate::models::rule::{Rule, Thresholds};

pub trait RoiCalculator: Send + Sync {
    fn roi_series(
        &self,
        ticker: &str,
        window: &OptimizationWindow,
        rules: &[Rule],
        thresholds: &Thresholds,
    ) -> Result<RoiSeries, QuantError>;
}

// Backtests rule sets against a price source, keeping each ticker's bars in memory after the first load
pub struct HistoricalRoi<S: PriceSource> {
    source: S,
    initial_balance: f64,
    cache: Mutex<HashMap<String, Arc<Vec<DailyBar>>>>,
}

impl<S: PriceSource> HistoricalRoi<S> {
    pub fn new(source: S, initial_balance: f64) -> Self {
        HistoricalRoi {
            source,
            initial_balance,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn bars(&self, ticker: &str) -> Result<Arc<Vec<DailyBar>>, QuantError> {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(bars) = cache.get(ticker) {
            return Ok(Arc::clone(bars));
        }

        let bars = Arc::new(self.source.load(ticker)?);
        log::info!("Cached {} bars for {}", bars.len(), ticker);
        cache.insert(ticker.to_string(), Arc::clone(&bars));
        Ok(bars)
    }
}

impl<S: PriceSource> RoiCalculator for HistoricalRoi<S> {
    fn roi_series(
        &self,
        ticker: &str,
        window: &OptimizationWindow,
        rules: &[Rule],
        thresholds: &Thresholds,
    ) -> Result<RoiSeries, QuantError> {
        let bars = self.bars(ticker)?;

        // Bars before the window stay available as rule history
        let first = bars.partition_point(|bar| bar.date < window.base_time);
        let end = bars.partition_point(|bar| bar.date < window.now_time);
        if first == end {
            return Err(QuantError::DataUnavailable {
                ticker: ticker.to_string(),
                start: window.base_time,
                end: window.now_time,
            });
        }

        Backtest::new(rules, *thresholds, self.initial_balance).run(&bars[..end], first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::rule::default_rules;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        bars: Vec<DailyBar>,
        loads: AtomicUsize,
    }

    impl PriceSource for CountingSource {
        fn load(&self, _ticker: &str) -> Result<Vec<DailyBar>, QuantError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(self.bars.clone())
        }
    }

    fn source() -> CountingSource {
        let start = NaiveDate::from_ymd_opt(2009, 12, 20).unwrap();
        let bars = (0..40)
            .map(|i| DailyBar::flat(start + chrono::Duration::days(i), 100.0 + i as f64))
            .collect();
        CountingSource {
            bars,
            loads: AtomicUsize::new(0),
        }
    }

    const THRESHOLDS: Thresholds = Thresholds { buy: -2.5, sell: -2.5 };

    #[test]
    fn series_covers_only_the_window() {
        let calculator = HistoricalRoi::new(source(), 10_000.0);
        let window = OptimizationWindow::new(
            NaiveDate::from_ymd_opt(2010, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2010, 1, 11).unwrap(),
        );
        let series = calculator
            .roi_series("SPY", &window, &default_rules(), &THRESHOLDS)
            .unwrap();

        assert_eq!(series.len(), 10);
        assert!(series
            .dates
            .iter()
            .all(|date| window.base_time <= *date && *date < window.now_time));
        // Earlier bars supply the momentum rules with history on the first day
        assert_eq!(series.signals[0], -3.0);
    }

    #[test]
    fn bars_are_loaded_once_per_ticker() {
        let calculator = HistoricalRoi::new(source(), 10_000.0);
        let window = OptimizationWindow::new(
            NaiveDate::from_ymd_opt(2010, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2010, 1, 5).unwrap(),
        );
        for _ in 0..3 {
            calculator
                .roi_series("SPY", &window, &default_rules(), &THRESHOLDS)
                .unwrap();
        }
        assert_eq!(calculator.source.loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn window_without_bars_is_unavailable() {
        let calculator = HistoricalRoi::new(source(), 10_000.0);
        let window = OptimizationWindow::calendar_year(1995).unwrap();
        let result = calculator.roi_series("SPY", &window, &default_rules(), &THRESHOLDS);
        assert!(matches!(result, Err(QuantError::DataUnavailable { .. })));
    }
}

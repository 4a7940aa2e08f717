use std::fs::File;
use std::path::Path;

use chrono::NaiveDate;

use crate::errors::QuantError;
use crate::history::DailyBar;
use crate::models::rule::{score, Rule, Thresholds};
use crate::models::trading_signal::{Action, TradingSignal};

// Value of the rule strategy and of a buy-and-hold benchmark, one entry per trading day
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoiSeries {
    pub dates: Vec<NaiveDate>,
    pub strategic_values: Vec<f64>,
    pub hold_values: Vec<f64>,
    pub signals: Vec<f64>,
    pub trade_count: u64,
    pub max_drawdown: f64,
}

impl RoiSeries {
    pub fn len(&self) -> usize {
        self.strategic_values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategic_values.is_empty()
    }

    // Final strategic value over initial strategic value
    pub fn roi(&self) -> Result<f64, QuantError> {
        ratio(&self.strategic_values, "strategic_values")
    }

    pub fn hold_roi(&self) -> Result<f64, QuantError> {
        ratio(&self.hold_values, "hold_values")
    }

    pub fn save_report(&self, output: &Path) -> Result<(), QuantError> {
        let file = File::create(output)?;
        let mut writer = csv::Writer::from_writer(file);

        writer.write_record(["date", "signal", "strategic_value", "hold_value"])?;
        for i in 0..self.len() {
            writer.write_record([
                self.dates[i].format("%Y-%m-%d").to_string(),
                self.signals[i].to_string(),
                self.strategic_values[i].to_string(),
                self.hold_values[i].to_string(),
            ])?;
        }

        writer.flush()?;
        Ok(())
    }
}

fn ratio(values: &[f64], column: &str) -> Result<f64, QuantError> {
    let (first, last) = match (values.first(), values.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => {
            return Err(QuantError::MalformedSeries(format!("{} is empty", column)));
        }
    };

    if !(first > 0.0) {
        return Err(QuantError::MalformedSeries(format!(
            "{} starts at {}, expected a positive value",
            column, first
        )));
    }

    let ratio = last / first;
    if !ratio.is_finite() {
        return Err(QuantError::MalformedSeries(format!(
            "{} ratio {} / {} is not finite",
            column, last, first
        )));
    }
    Ok(ratio)
}

// Long-only, all-in/all-out simulation of a rule set. Trades fill at the day's close.
pub struct Backtest<'a> {
    // Input parameters
    pub rules: &'a [Rule],
    pub thresholds: Thresholds,
    pub initial_balance: f64,

    // Primary variables
    pub balance: f64,
    pub position_size: f64,

    // Secondary variables (metrics)
    pub max_balance: f64,
    pub max_drawdown: f64,
    pub trade_count: u64,

    hold_units: Option<f64>,
    pub results: RoiSeries,
}

impl<'a> Backtest<'a> {
    pub fn new(rules: &'a [Rule], thresholds: Thresholds, balance: f64) -> Self {
        Backtest {
            rules,
            thresholds,
            initial_balance: balance,
            balance,
            position_size: 0.0,
            max_balance: balance,
            max_drawdown: 0.0,
            trade_count: 0,
            hold_units: None,
            results: RoiSeries::default(),
        }
    }

    // Scores every bar from `first` onwards. Earlier bars only serve as rule history.
    pub fn run(mut self, bars: &[DailyBar], first: usize) -> Result<RoiSeries, QuantError> {
        for index in first..bars.len() {
            self.tick(bars, index)?;
        }
        self.results.trade_count = self.trade_count;
        self.results.max_drawdown = self.max_drawdown;
        Ok(self.results)
    }

    pub fn tick(&mut self, bars: &[DailyBar], index: usize) -> Result<(), QuantError> {
        let bar = &bars[index];
        if !(bar.close > 0.0) || !bar.close.is_finite() {
            return Err(QuantError::MalformedSeries(format!(
                "close on {} is {}, expected a positive price",
                bar.date, bar.close
            )));
        }

        let signal = TradingSignal {
            forecast: score(self.rules, bars, index),
        };
        self.handle_signal(&signal, bar);
        self.update(bar);

        let hold_units = *self
            .hold_units
            .get_or_insert(self.initial_balance / bar.close);

        self.results.dates.push(bar.date);
        self.results.signals.push(signal.forecast);
        self.results.strategic_values.push(self.total_value(bar));
        self.results.hold_values.push(hold_units * bar.close);
        Ok(())
    }

    fn handle_signal(&mut self, signal: &TradingSignal, bar: &DailyBar) {
        match signal.action(&self.thresholds) {
            Action::Buy if self.position_size == 0.0 => self.buy(bar),
            Action::Sell if self.position_size > 0.0 => self.sell(bar),
            _ => {}
        }
    }

    pub fn buy(&mut self, bar: &DailyBar) {
        self.position_size = self.balance / bar.close;
        self.balance = 0.0;
        self.trade_count += 1;
    }

    pub fn sell(&mut self, bar: &DailyBar) {
        self.balance += self.position_size * bar.close;
        self.position_size = 0.0;
        self.trade_count += 1;
    }

    pub fn total_value(&self, bar: &DailyBar) -> f64 {
        self.balance + self.position_size * bar.close
    }

    fn update(&mut self, bar: &DailyBar) {
        let total_value = self.total_value(bar);

        if total_value > self.max_balance {
            self.max_balance = total_value;
        }

        let drawdown = 1.0 - total_value / self.max_balance;
        if drawdown > self.max_drawdown {
            self.max_drawdown = drawdown;
        }
    }
}

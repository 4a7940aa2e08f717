use std::path::PathBuf;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

use quantlib::errors::QuantError;
use quantlib::history::{OptimizationWindow, RoiCalculator};
use quantlib::models::RoiSeries;
use quantlib::util::Settings;

use crate::objective::WeightObjective;
use crate::optimization::{gp_minimize, Dimension, MinimizerConfig, OptimizeResult};
use crate::report;

#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    pub best_weights: Vec<f64>,
    pub best_value: f64,
    pub window: OptimizationWindow,
}

// A finished year: the table row plus what it took to get there
#[derive(Debug, Clone)]
pub struct YearlyRun {
    pub record: ResultRecord,
    pub evaluations: OptimizeResult,
    pub replay: RoiSeries,
}

pub struct YearlyOptimizer<'a, C: RoiCalculator> {
    settings: &'a Settings,
    calculator: &'a C,
}

impl<'a, C: RoiCalculator> YearlyOptimizer<'a, C> {
    pub fn new(settings: &'a Settings, calculator: &'a C) -> Result<Self, QuantError> {
        settings.validate()?;
        Ok(YearlyOptimizer {
            settings,
            calculator,
        })
    }

    pub fn windows(&self) -> Result<Vec<OptimizationWindow>, QuantError> {
        let count = i32::try_from(self.settings.year_count).map_err(|_| {
            QuantError::InvalidSettings(format!("yearCount {} is too large", self.settings.year_count))
        })?;
        (0..count)
            .map(|i| OptimizationWindow::calendar_year(self.settings.first_year + i))
            .collect()
    }

    pub fn bounds(&self) -> Vec<Dimension> {
        self.settings
            .bounds
            .iter()
            .map(|(low, high)| Dimension::new(*low, *high))
            .collect()
    }

    pub fn optimize_year(&self, window: OptimizationWindow) -> Result<YearlyRun, QuantError> {
        let tic = Instant::now();
        let settings = self.settings;
        log::info!(
            "Optimizing {} rule weights for {} over [{}, {})",
            settings.rules.len(),
            settings.ticker,
            window.base_time,
            window.now_time
        );

        let objective = WeightObjective::new(
            self.calculator,
            &settings.rules,
            settings.thresholds(),
            &settings.ticker,
            window,
        );

        // Every year starts from the same seed, independent of the years run before it
        let mut rng = StdRng::seed_from_u64(settings.seed);
        let result = gp_minimize(
            |weights| objective.evaluate(weights),
            &self.bounds(),
            &MinimizerConfig::from(settings),
            &mut rng,
        )?;

        let replay = objective.series(&result.x)?;
        let (roi, hold_roi) = (replay.roi()?, replay.hold_roi()?);
        log::info!(
            "[{}] Best weights {:?}, objective {:.5}, strategy ROI {:.4}, hold ROI {:.4}, {} trades, max drawdown {:.2}%",
            window.year(),
            result.x,
            result.fun,
            roi,
            hold_roi,
            replay.trade_count,
            replay.max_drawdown * 100.0
        );
        log::info!(
            "[{}] Optimize time: {:.3}s",
            window.year(),
            tic.elapsed().as_secs_f64()
        );

        Ok(YearlyRun {
            record: ResultRecord {
                best_weights: result.x.clone(),
                best_value: result.fun,
                window,
            },
            evaluations: result,
            replay,
        })
    }

    // Years are independent, so the parallel path returns the same runs in the same order
    pub fn run(&self) -> Result<Vec<YearlyRun>, QuantError> {
        let windows = self.windows()?;
        if self.settings.parallel {
            windows
                .into_par_iter()
                .map(|window| self.optimize_year(window))
                .collect()
        } else {
            windows
                .into_iter()
                .map(|window| self.optimize_year(window))
                .collect()
        }
    }
}

// Optimizes every configured year, then persists the table. The table is written last, so
// nothing appears under its name if any year or any trace fails.
pub fn create_yearly_solutions<C: RoiCalculator>(
    settings: &Settings,
    calculator: &C,
) -> Result<PathBuf, QuantError> {
    let tic = Instant::now();
    let optimizer = YearlyOptimizer::new(settings, calculator)?;
    let runs = optimizer.run()?;

    if settings.save_evaluations {
        for run in &runs {
            let year = run.record.window.year();
            report::write_evaluations(&settings.output_dir, &settings.ticker, year, &run.evaluations)?;
            run.replay
                .save_report(&report::values_path(&settings.output_dir, &settings.ticker, year))?;
        }
        log::info!("Wrote evaluation traces for {} years", runs.len());
    }

    let records: Vec<ResultRecord> = runs.iter().map(|run| run.record.clone()).collect();
    let path = report::write_results(&settings.output_dir, &settings.ticker, &records)?;
    log::info!(
        "Wrote {} yearly solutions for {} to {} in {:.3}s",
        records.len(),
        settings.ticker,
        path.display(),
        tic.elapsed().as_secs_f64()
    );

    Ok(path)
}

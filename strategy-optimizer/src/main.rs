use std::env;

use anyhow::Context;
use quantlib::history::{CsvPriceSource, HistoricalRoi};
use quantlib::logging;
use quantlib::util::Settings;
use strategy_optimizer::driver;

const LOG_PATH: &str = "logs/strategy-optimizer.log";

fn main() -> anyhow::Result<()> {
    logging::configure_logger(LOG_PATH)?;

    // Optional settings file; everything else is fixed
    let settings = match env::args().nth(1) {
        Some(path) => Settings::load(&path)
            .with_context(|| format!("Failed to read settings from {}", path))?,
        None => Settings::default(),
    };
    log::info!(
        "Optimizing {} for {} years starting {}, {} evaluations per year",
        settings.ticker,
        settings.year_count,
        settings.first_year,
        settings.n_calls
    );

    let source = CsvPriceSource::new(settings.data_dir.clone());
    let calculator = HistoricalRoi::new(source, settings.initial_balance);

    let path = driver::create_yearly_solutions(&settings, &calculator)
        .with_context(|| format!("Yearly optimization for {} failed", settings.ticker))?;
    log::info!("Saved yearly solutions to {}", path.display());
    Ok(())
}

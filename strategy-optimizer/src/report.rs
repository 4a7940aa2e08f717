use std::path::{Path, PathBuf};

use quantlib::errors::QuantError;

use crate::driver::ResultRecord;
use crate::optimization::OptimizeResult;

fn ensure_dir_exists(path: &Path) -> Result<(), QuantError> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

pub fn results_path(output_dir: &Path, ticker: &str) -> PathBuf {
    output_dir.join(format!("{}.csv", ticker))
}

pub fn evaluations_path(output_dir: &Path, ticker: &str, year: i32) -> PathBuf {
    output_dir.join(format!("{}-{}-evaluations.csv", ticker, year))
}

pub fn values_path(output_dir: &Path, ticker: &str, year: i32) -> PathBuf {
    output_dir.join(format!("{}-{}-values.csv", ticker, year))
}

// One row per year: res_x_0 .. res_x_{n-1}, res_fun, base_time.
// The table is written to a temporary file first, so readers never see a partial table.
pub fn write_results(
    output_dir: &Path,
    ticker: &str,
    records: &[ResultRecord],
) -> Result<PathBuf, QuantError> {
    let dimensions = records.first().map_or(0, |record| record.best_weights.len());
    if let Some(record) = records
        .iter()
        .find(|record| record.best_weights.len() != dimensions)
    {
        return Err(QuantError::InvalidWeightVector(format!(
            "result for {} has {} weights, expected {}",
            record.window.base_time,
            record.best_weights.len(),
            dimensions
        )));
    }

    ensure_dir_exists(output_dir)?;
    let path = results_path(output_dir, ticker);
    let staging = path.with_extension("csv.tmp");

    {
        let mut writer = csv::Writer::from_path(&staging)?;

        let mut headers: Vec<String> = (0..dimensions).map(|i| format!("res_x_{}", i)).collect();
        headers.push("res_fun".to_string());
        headers.push("base_time".to_string());
        writer.write_record(&headers)?;

        for record in records {
            let mut row: Vec<String> = record.best_weights.iter().map(|x| x.to_string()).collect();
            row.push(record.best_value.to_string());
            row.push(record.window.base_time.format("%Y-%m-%d").to_string());
            writer.write_record(&row)?;
        }
        writer.flush()?;
    }

    std::fs::rename(&staging, &path)?;
    Ok(path)
}

// Every evaluation of one run, in the order the optimizer made them
pub fn write_evaluations(
    output_dir: &Path,
    ticker: &str,
    year: i32,
    result: &OptimizeResult,
) -> Result<PathBuf, QuantError> {
    ensure_dir_exists(output_dir)?;
    let path = evaluations_path(output_dir, ticker, year);
    let mut writer = csv::Writer::from_path(&path)?;

    let dimensions = result.x.len();
    let mut headers = vec!["iteration".to_string()];
    headers.extend((0..dimensions).map(|i| format!("x_{}", i)));
    headers.push("fun".to_string());
    headers.push("best_so_far".to_string());
    writer.write_record(&headers)?;

    let best_so_far = result.best_so_far();
    for (i, (x, fun)) in result.x_iters.iter().zip(&result.func_vals).enumerate() {
        let mut row = vec![(i + 1).to_string()];
        row.extend(x.iter().map(|x| x.to_string()));
        row.push(fun.to_string());
        row.push(best_so_far[i].to_string());
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(path)
}

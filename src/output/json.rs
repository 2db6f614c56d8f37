//! JSON result files
//!
//! Results are written pretty-printed under `data/` and stamped with the
//! time of writing, the run duration and the excluded extensions in effect.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Directory result files are placed in unless an absolute path is given
pub const DATA_DIR: &str = "data";

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to format output: {0}")]
    Format(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// A result record with run metadata appended at the top level
#[derive(Serialize)]
struct Stamped<'a, T: Serialize> {
    #[serde(flatten)]
    results: &'a T,
    timestamp: String,
    execution_time_seconds: f64,
    excluded_extensions: &'a [String],
}

/// Works out where a result file goes
///
/// - no name: `<data_dir>/domain_results_<YYYYmmdd_HHMMSS>.json`
/// - absolute path: used as is
/// - relative path already starting with `data`: used as is
/// - any other relative path: placed under `data_dir`
pub fn resolve_output_path(output: Option<&Path>, data_dir: &Path, now: DateTime<Local>) -> PathBuf {
    match output {
        None => data_dir.join(format!(
            "domain_results_{}.json",
            now.format("%Y%m%d_%H%M%S")
        )),
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => {
            let under_data = matches!(
                path.components().next(),
                Some(Component::Normal(first)) if first == DATA_DIR
            );
            if under_data {
                path.to_path_buf()
            } else {
                data_dir.join(path)
            }
        }
    }
}

/// Writes results as pretty JSON and returns the path written
///
/// # Arguments
///
/// * `results` - Any serializable result record
/// * `output` - Optional file name or path (see [`resolve_output_path`])
/// * `execution_time` - Wall time of the run, rounded to hundredths
/// * `excluded_extensions` - Suffixes that were filtered during the run
pub fn save_results<T: Serialize>(
    results: &T,
    output: Option<&Path>,
    execution_time: Duration,
    excluded_extensions: &[String],
) -> OutputResult<PathBuf> {
    let now = Local::now();
    let path = resolve_output_path(output, Path::new(DATA_DIR), now);
    write_stamped(results, &path, now, execution_time, excluded_extensions)?;
    Ok(path)
}

fn write_stamped<T: Serialize>(
    results: &T,
    path: &Path,
    now: DateTime<Local>,
    execution_time: Duration,
    excluded_extensions: &[String],
) -> OutputResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let stamped = Stamped {
        results,
        timestamp: now.to_rfc3339(),
        execution_time_seconds: (execution_time.as_secs_f64() * 100.0).round() / 100.0,
        excluded_extensions,
    };

    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, &stamped)?;
    writer.write_all(b"\n")?;
    writer.flush()?;

    Ok(())
}

//! Output module for persisting and summarizing results
//!
//! This module handles:
//! - Writing result records as timestamped JSON files
//! - Printing a short console summary of a run

mod json;
mod summary;

pub use json::{resolve_output_path, save_results, OutputError, OutputResult, DATA_DIR};
pub use summary::{format_summary, print_summary, RunSummary};

//! Bulk enumerate → fetch → store runs with progress reporting.

mod driver;
mod ids;
mod progress;

pub use driver::{harvest, HarvestSummary, RecordSource, MAX_CONSECUTIVE_FAILURES};
pub use ids::{parse_ids, read_ids_file};
pub use progress::{format_elapsed, progress_eta, Progress, REPORT_INTERVAL};

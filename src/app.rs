pub mod commands;
pub mod report;
pub mod state;
pub mod summary;

pub use report::{build_report, export_report, ComparativeReport, ReportRow, REPORT_WINDOWS};
pub use state::AppState;
pub use summary::{summarize, SeriesSummary};

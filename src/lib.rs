pub mod clean;
pub mod export;
pub mod pipeline;
pub mod resolve;
pub mod summary;
pub mod table;

pub use pipeline::{execute_analysis, Analysis, AnalysisOptions, Outcome};
pub use table::Table;

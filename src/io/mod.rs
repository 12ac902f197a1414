//! Input dataset ingestion, coefficient persistence and diagnostic output

pub mod coefficient_file;
pub mod dataset;
pub mod plot;
pub mod report;

pub use coefficient_file::CoefficientFile;
pub use dataset::{DatasetReader, ObservationTable};
pub use plot::{plot_fit, write_plots};
pub use report::{render_report, write_report};

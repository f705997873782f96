pub mod csv;
pub mod json;

pub use csv::{writer_for_path, FlightRecorder, FlightRow};
pub use json::{write_summary, write_summary_file, FlightSummary};

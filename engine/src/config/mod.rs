pub mod settings;

pub use settings::{ChartBackend, ChartSettings, ReportSettings};

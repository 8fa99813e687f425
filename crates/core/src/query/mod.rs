pub mod engine;
pub mod pattern;

pub use engine::{ScanOutcome, scan_snapshot};
pub use pattern::TypeNamePattern;

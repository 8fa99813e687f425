pub mod error;
pub mod models;
pub mod prefs;
pub mod reader;

pub use error::{ApiError, ApiResult};
pub use prefs::{EmptyPreferences, PreferenceSource};
pub use reader::{BoxError, ContainerReader};

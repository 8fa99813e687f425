use std::path::Path;

use crate::models::{ContainerRef, TypeEntry};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Extracts the declared types of one container. Implementations must be
/// pure with respect to the container content: re-reading an unchanged
/// container yields the same entry set.
pub trait ContainerReader: Send + Sync {
    fn can_read(&self, path: &Path) -> bool;

    fn read_container(&self, container: &ContainerRef) -> Result<Vec<TypeEntry>, BoxError>;
}

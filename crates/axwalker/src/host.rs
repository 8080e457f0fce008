//! Where the walker gets its application root from.

use std::path::{Path, PathBuf};

use axtree::{AxError, Element, ElementSnapshot, MemoryElement};

/// A source of accessibility trees for one host application.
pub trait Host {
    type Element: Element;

    /// Whether this process may read the tree at all.
    fn check_access(&self) -> Result<bool, AxError>;

    /// The application root, fetched fresh for each command.
    fn application(&self) -> Result<Self::Element, AxError>;
}

/// Replays commands against a tree captured earlier with `query`.
#[derive(Debug, Clone)]
pub struct SnapshotHost {
    path: PathBuf,
}

impl SnapshotHost {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl Host for SnapshotHost {
    type Element = MemoryElement;

    fn check_access(&self) -> Result<bool, AxError> {
        Ok(true)
    }

    fn application(&self) -> Result<MemoryElement, AxError> {
        let text = std::fs::read_to_string(&self.path)
            .map_err(|_| AxError::NotFound(format!("snapshot {}", self.path.display())))?;
        let snapshot: ElementSnapshot =
            serde_json::from_str(&text).map_err(|e| AxError::Api {
                code: 0,
                message: format!("invalid snapshot {}: {}", self.path.display(), e),
            })?;
        Ok(MemoryElement::from(snapshot))
    }
}

use axtree::{AxError, MemoryElement};

use crate::host::Host;

/// Stand-in for platforms without the accessibility API this walker speaks.
#[derive(Debug, Clone)]
pub struct LiveHost {
    process_name: String,
}

impl LiveHost {
    pub fn new(process_name: impl Into<String>, _timeout_ms: u64) -> Self {
        Self {
            process_name: process_name.into(),
        }
    }

    fn unsupported(&self) -> AxError {
        AxError::Unsupported(format!(
            "cannot walk {}: the accessibility walker only runs on macOS",
            self.process_name
        ))
    }
}

impl Host for LiveHost {
    type Element = MemoryElement;

    fn check_access(&self) -> Result<bool, AxError> {
        Err(self.unsupported())
    }

    fn application(&self) -> Result<MemoryElement, AxError> {
        Err(self.unsupported())
    }
}

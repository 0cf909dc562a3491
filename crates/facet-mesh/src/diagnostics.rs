use std::fmt;
use std::sync::Mutex;

use hashbrown::HashSet;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Severity {
    /// Geometry was discarded.
    Error,
    /// Defaults were substituted.
    Warning,
    /// Construction protocol violated; recovered.
    Internal,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.severity {
            Severity::Error => "Error",
            Severity::Warning => "Warning",
            Severity::Internal => "Internal",
        };
        write!(f, "{label}: {}", self.message)
    }
}

/// Shows each distinct warning message once per process.
#[derive(Debug, Default)]
pub struct WarningLog {
    seen: Mutex<HashSet<String>>,
}

impl WarningLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs `message` at warn level unless it was shown before.
    /// Returns whether it was shown.
    pub fn show_once(&self, message: &str) -> bool {
        let mut seen = match self.seen.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if seen.contains(message) {
            return false;
        }
        seen.insert(message.to_owned());
        log::warn!(target: "mesh", "{message}");
        true
    }

    pub fn len(&self) -> usize {
        self.seen.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

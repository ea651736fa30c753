use serde::Serialize;
use std::fmt;
use tracing::{error, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Unsupported or partially decoded feature; the element is otherwise intact.
    Warning,
    /// The element (or artboard) could not be decoded and was degraded or skipped.
    Error,
}

/// A non-fatal problem found while decoding, attributed to an element by name.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub element: Option<String>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        match &self.element {
            Some(name) => write!(f, "{}: {}: {}", level, name, self.message),
            None => write!(f, "{}: {}", level, self.message),
        }
    }
}

/// Collects diagnostics and mirrors each one to the log.
#[derive(Clone, Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, element: Option<&str>, message: impl Into<String>) {
        let message = message.into();
        warn!(element = element.unwrap_or(""), "{}", message);
        self.push(Severity::Warning, element, message);
    }

    pub fn error(&mut self, element: Option<&str>, message: impl Into<String>) {
        let message = message.into();
        error!(element = element.unwrap_or(""), "{}", message);
        self.push(Severity::Error, element, message);
    }

    fn push(&mut self, severity: Severity, element: Option<&str>, message: String) {
        self.entries.push(Diagnostic {
            severity,
            element: element.map(str::to_string),
            message,
        });
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_and_display() {
        let mut diags = Diagnostics::new();
        diags.warn(Some("Rectangle"), "clipping masks are not supported");
        diags.error(None, "artboard skipped");

        assert_eq!(diags.len(), 2);
        let all = diags.into_vec();
        assert_eq!(all[0].severity, Severity::Warning);
        assert_eq!(
            all[0].to_string(),
            "warning: Rectangle: clipping masks are not supported"
        );
        assert_eq!(all[1].to_string(), "error: artboard skipped");
    }
}

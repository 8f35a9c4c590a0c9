//! Assumption entries: the record of one failed check.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a check was evaluated (or where its assertion panicked).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl From<&std::panic::Location<'_>> for SourceLocation {
    fn from(location: &std::panic::Location<'_>) -> Self {
        Self::new(location.file(), location.line(), location.column())
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// A local variable captured at the point of failure, rendered with `Debug`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalBinding {
    pub name: String,
    pub value: String,
}

impl LocalBinding {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Record of one failed (or, for observers, passed) check.
///
/// Entries are immutable once built. The fields are only reachable through
/// accessors, and the `with_*` builders consume the entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssumptionEntry {
    message: String,
    expression: Option<String>,
    location: SourceLocation,
    traceback: Option<String>,
    locals: Vec<LocalBinding>,
}

impl AssumptionEntry {
    /// Create an entry for a failure at `location`
    pub fn new(location: SourceLocation, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            expression: None,
            location,
            traceback: None,
            locals: Vec::new(),
        }
    }

    /// Trivial entry handed to observers for a passing check
    pub fn passed(location: SourceLocation) -> Self {
        Self::new(location, String::new())
    }

    /// Attach the source text of the evaluated expression
    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = Some(expression.into());
        self
    }

    /// Attach rendered stack frames
    pub fn with_traceback(mut self, traceback: impl Into<String>) -> Self {
        self.traceback = Some(traceback.into());
        self
    }

    /// Attach the local bindings in scope at the failure point
    pub fn with_locals(mut self, locals: Vec<LocalBinding>) -> Self {
        self.locals = locals;
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn expression(&self) -> Option<&str> {
        self.expression.as_deref()
    }

    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    pub fn line(&self) -> u32 {
        self.location.line
    }

    pub fn traceback(&self) -> Option<&str> {
        self.traceback.as_deref()
    }

    pub fn locals(&self) -> &[LocalBinding] {
        &self.locals
    }
}

impl fmt::Display for AssumptionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.location)?;
        if let Some(ref expression) = self.expression {
            write!(f, " [{}]", expression)?;
        }
        if !self.message.is_empty() {
            write!(f, " {}", self.message)?;
        }
        Ok(())
    }
}

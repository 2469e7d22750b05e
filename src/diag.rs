//! Structured parse and semantic diagnostics.
//!
//! Every recoverable condition ends up here rather than in an error return:
//! the parser degrades to a best-effort model plus a diagnostics list, and
//! only an unterminated span aborts the parse.

use serde::Serialize;
use std::fmt;

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Recoverable; parsing continued.
    Warning,
    /// Statement boundaries beyond this point cannot be trusted; parsing halted.
    Fatal,
}

/// Diagnostic kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagKind {
    /// A string, quoted identifier, block comment, or dollar-quoted block
    /// reached end-of-input unterminated.
    UnterminatedSpan,
    /// A statement matched no recognized declaration shape.
    MalformedStatement,
    /// A later enum type declaration reused an existing name.
    DuplicateEnumType,
    /// A later table declaration reused an existing (schema, name) pair.
    DuplicateTable,
    /// A foreign key's target table was not found (or its target columns
    /// could not be inferred).
    UnresolvedForeignKey,
    /// Local and target column lists of a foreign key differ in length.
    ForeignKeyArityMismatch,
    /// A recognized statement used a clause the parser does not model; its
    /// raw text is preserved on the owning table.
    UnsupportedConstruct,
    /// A column references an enum type declared later in the input.
    EnumForwardReference,
    /// An ALTER TABLE or CREATE INDEX statement named a table that was never
    /// declared.
    UnknownConstraintTarget,
}

impl DiagKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnterminatedSpan => "UNTERMINATED_SPAN",
            Self::MalformedStatement => "MALFORMED_STATEMENT",
            Self::DuplicateEnumType => "DUPLICATE_ENUM_TYPE",
            Self::DuplicateTable => "DUPLICATE_TABLE",
            Self::UnresolvedForeignKey => "UNRESOLVED_FOREIGN_KEY",
            Self::ForeignKeyArityMismatch => "FOREIGN_KEY_ARITY_MISMATCH",
            Self::UnsupportedConstruct => "UNSUPPORTED_CONSTRUCT",
            Self::EnumForwardReference => "ENUM_FORWARD_REFERENCE",
            Self::UnknownConstraintTarget => "UNKNOWN_CONSTRAINT_TARGET",
        }
    }
}

impl fmt::Display for DiagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Inclusive 1-based source line range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LineRange {
    pub start: u32,
    pub end: u32,
}

impl LineRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn single(line: u32) -> Self {
        Self { start: line, end: line }
    }
}

impl fmt::Display for LineRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "line {}", self.start)
        } else {
            write!(f, "lines {}-{}", self.start, self.end)
        }
    }
}

/// One diagnostic entry on the model's error list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagKind,
    pub severity: Severity,
    pub message: String,
    pub lines: LineRange,
}

impl Diagnostic {
    pub fn warning(kind: DiagKind, lines: LineRange, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: Severity::Warning,
            message: message.into(),
            lines,
        }
    }

    pub fn fatal(kind: DiagKind, lines: LineRange, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: Severity::Fatal,
            message: message.into(),
            lines,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Warning => "warning",
            Severity::Fatal => "fatal",
        };
        write!(f, "{} {} at {}: {}", severity, self.kind, self.lines, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_strings() {
        assert_eq!(DiagKind::UnterminatedSpan.as_str(), "UNTERMINATED_SPAN");
        assert_eq!(DiagKind::DuplicateTable.as_str(), "DUPLICATE_TABLE");
    }

    #[test]
    fn test_display() {
        let diag = Diagnostic::warning(
            DiagKind::DuplicateTable,
            LineRange::new(3, 9),
            "table \"users\" already declared",
        );
        assert_eq!(
            diag.to_string(),
            "warning DUPLICATE_TABLE at lines 3-9: table \"users\" already declared"
        );
    }

    #[test]
    fn test_serialize() {
        let diag = Diagnostic::fatal(
            DiagKind::UnterminatedSpan,
            LineRange::single(7),
            "unterminated dollar-quoted block",
        );
        let json = serde_json::to_string(&diag).unwrap();
        assert!(json.contains("UNTERMINATED_SPAN"));
        assert!(json.contains("fatal"));
    }
}

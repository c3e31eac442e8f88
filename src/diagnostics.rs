//! Unified, `miette`-based diagnostics for the specforge compiler.
//!
//! Every failure mode in the crate is represented by [`ForgeError`]. Errors are
//! constructed through the `err_msg!` and `err_src!` macros so call sites never
//! assemble an [`ErrorContext`] by hand:
//!
//! - `err_msg!(Validation, "no documents found under '{}'", dir)` for
//!   message-only errors.
//! - `err_src!(Parse, message, &named_source, span)` when a source file and
//!   span are available for a labeled report.
//!
//! Fatal errors abort the compiler run and are rendered by the CLI as miette
//! reports; everything recoverable travels as a [`crate::resolver::Warning`]
//! instead of an error.

use std::sync::Arc;

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceCode};
use thiserror::Error;

/// Shared handle to a named source file for diagnostic rendering.
pub type SourceArc = Arc<NamedSource<String>>;

/// A byte range into a source document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// Type-safe classification of [`ForgeError`] variants, used by tests instead
/// of matching on rendered messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    /// A document could not be parsed as structured text.
    Parse,
    /// User-facing input problems: empty source directory, unknown entity.
    Validation,
    /// Internal consistency violations (e.g. a synthetic filename with no
    /// registered entity); these indicate a bug, not a user error.
    Internal,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Parse => "Parse",
            ErrorType::Validation => "Validation",
            ErrorType::Internal => "Internal",
        }
    }
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Minimal, composable error context: optional source, span, and help text.
#[derive(Debug, Default)]
pub struct ErrorContext {
    pub source: Option<SourceArc>,
    pub span: Option<Span>,
    pub help: Option<String>,
}

impl ErrorContext {
    /// An empty context (no source, span, or help).
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_source_and_span(source: SourceArc, span: Span) -> Self {
        Self {
            source: Some(source),
            span: Some(span),
            help: None,
        }
    }
}

/// Unified error type for all specforge failure modes.
#[derive(Debug, Error)]
pub enum ForgeError {
    #[error("Parse error: {message}")]
    Parse { message: String, ctx: ErrorContext },
    #[error("Validation error: {message}")]
    Validation { message: String, ctx: ErrorContext },
    #[error("Internal error: {message}")]
    Internal { message: String, ctx: ErrorContext },
}

impl ForgeError {
    fn get_ctx(&self) -> &ErrorContext {
        match self {
            ForgeError::Parse { ctx, .. }
            | ForgeError::Validation { ctx, .. }
            | ForgeError::Internal { ctx, .. } => ctx,
        }
    }

    fn message(&self) -> &str {
        match self {
            ForgeError::Parse { message, .. }
            | ForgeError::Validation { message, .. }
            | ForgeError::Internal { message, .. } => message,
        }
    }

    /// Returns the type-safe classification for this error.
    pub fn error_type(&self) -> ErrorType {
        match self {
            ForgeError::Parse { .. } => ErrorType::Parse,
            ForgeError::Validation { .. } => ErrorType::Validation,
            ForgeError::Internal { .. } => ErrorType::Internal,
        }
    }

    /// Attaches a help message, replacing any existing one.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        match &mut self {
            ForgeError::Parse { ctx, .. }
            | ForgeError::Validation { ctx, .. }
            | ForgeError::Internal { ctx, .. } => ctx.help = Some(help.into()),
        }
        self
    }
}

impl Diagnostic for ForgeError {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let code = match self.error_type() {
            ErrorType::Parse => "specforge::parse",
            ErrorType::Validation => "specforge::validation",
            ErrorType::Internal => "specforge::internal",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        self.get_ctx()
            .help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn std::fmt::Display + 'a>)
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        self.get_ctx()
            .source
            .as_ref()
            .map(|s| s.as_ref() as &dyn SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let span = self.get_ctx().span?;
        let len = if span.end > span.start {
            span.end - span.start
        } else {
            1
        };
        let label = LabeledSpan::new(Some(self.message().to_string()), span.start, len);
        Some(Box::new(std::iter::once(label)))
    }
}

/// Constructs a [`ForgeError`] variant with a formatted message and no context.
#[macro_export]
macro_rules! err_msg {
    ($variant:ident, $($arg:tt)*) => {
        $crate::ForgeError::$variant {
            message: format!($($arg)*),
            ctx: $crate::ErrorContext::none(),
        }
    };
}

/// Constructs a [`ForgeError`] variant with a pre-built `NamedSource` and span.
#[macro_export]
macro_rules! err_src {
    ($variant:ident, $msg:expr, $source:expr, $span:expr) => {
        $crate::ForgeError::$variant {
            message: $msg.to_string(),
            ctx: $crate::ErrorContext::with_source_and_span(
                std::sync::Arc::clone($source),
                $span,
            ),
        }
    };
}

/// Wraps a source string into a [`SourceArc`] for use in error contexts.
pub fn to_error_source(name: impl AsRef<str>, source: impl AsRef<str>) -> SourceArc {
    Arc::new(NamedSource::new(
        name.as_ref(),
        source.as_ref().to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use miette::Report;

    use super::*;

    #[test]
    fn labeled_report_contains_message_and_help() {
        let src = to_error_source("checkout.yaml", "type: suite\nname: [");
        let err = err_src!(
            Parse,
            "unexpected sequence start",
            &src,
            Span { start: 18, end: 19 }
        )
        .with_help("entity names must be plain strings");
        let rendered = format!("{:?}", Report::new(err));
        assert!(rendered.contains("unexpected sequence start"));
        assert!(rendered.contains("entity names must be plain strings"));
    }

    #[test]
    fn message_only_errors_classify_by_variant() {
        let err = err_msg!(Validation, "no documents found under '{}'", "specs");
        assert_eq!(err.error_type(), ErrorType::Validation);
        assert!(err.to_string().contains("specs"));
    }
}

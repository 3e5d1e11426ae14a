//! Error types and reporting

use crate::span::Span;
use std::fmt;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, FalconError>;

/// Kinds of failure, each mapped to a process exit status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Lexical,
    Syntactic,
    UndefinedVariable,
    UndefinedFunction,
    Semantic,
    DivideByZero,
    TypeCompatibility,
    /// `numeric` given text that does not start with a number
    TypeChange,
    Runtime,
    /// Broken invariant inside the interpreter itself, or an I/O failure
    Internal,
}

impl ErrorKind {
    /// Exit status reported by the `falcon` binary
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::Lexical => 1,
            ErrorKind::Syntactic => 2,
            ErrorKind::UndefinedVariable => 3,
            ErrorKind::UndefinedFunction => 4,
            ErrorKind::Semantic => 5,
            ErrorKind::DivideByZero => 10,
            ErrorKind::TypeCompatibility => 11,
            ErrorKind::TypeChange => 12,
            ErrorKind::Runtime => 13,
            ErrorKind::Internal => 99,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Lexical => "lexical",
            ErrorKind::Syntactic => "syntax",
            ErrorKind::UndefinedVariable => "undefined variable",
            ErrorKind::UndefinedFunction => "undefined function",
            ErrorKind::Semantic => "semantic",
            ErrorKind::DivideByZero => "divide by zero",
            ErrorKind::TypeCompatibility => "type compatibility",
            ErrorKind::TypeChange => "type change",
            ErrorKind::Runtime => "runtime",
            ErrorKind::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// The first error raised anywhere in the pipeline
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind} error: {message}")]
pub struct FalconError {
    pub kind: ErrorKind,
    pub message: String,
    pub span: Option<Span>,
}

impl FalconError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            span: None,
        }
    }

    pub fn lexical(message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorKind::Lexical, message).with_span(span)
    }

    pub fn syntax(message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorKind::Syntactic, message).with_span(span)
    }

    pub fn semantic(message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorKind::Semantic, message).with_span(span)
    }

    pub fn undefined_variable(name: &str) -> Self {
        Self::new(
            ErrorKind::UndefinedVariable,
            format!("undefined variable: {name}"),
        )
    }

    pub fn undefined_function(name: &str) -> Self {
        Self::new(
            ErrorKind::UndefinedFunction,
            format!("undefined function: {name}"),
        )
    }

    pub fn divide_by_zero() -> Self {
        Self::new(ErrorKind::DivideByZero, "division by zero")
    }

    pub fn type_compatibility(op: &str, left: &str, right: &str) -> Self {
        Self::new(
            ErrorKind::TypeCompatibility,
            format!("operator {op} cannot combine {left} and {right}"),
        )
    }

    pub fn type_change(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeChange, message)
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Runtime, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Attach a source location
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Attach a source location unless one is already known
    pub fn or_span(mut self, span: Option<Span>) -> Self {
        if self.span.is_none() {
            self.span = span;
        }
        self
    }

    pub fn exit_code(&self) -> i32 {
        self.kind.exit_code()
    }
}

impl From<std::io::Error> for FalconError {
    fn from(err: std::io::Error) -> Self {
        FalconError::internal(format!("I/O error: {err}"))
    }
}

/// Report error with ariadne on stderr
pub fn report_error(filename: &str, source: &str, error: &FalconError) -> std::io::Result<()> {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    let title = format!("{} error", error.kind);
    match error.span {
        Some(span) => Report::build(ReportKind::Error, (filename, span.range()))
            .with_code(error.exit_code())
            .with_message(title)
            .with_label(
                Label::new((filename, span.range()))
                    .with_message(&error.message)
                    .with_color(Color::Red),
            )
            .finish()
            .eprint((filename, Source::from(source))),
        None => Report::build(ReportKind::Error, (filename, 0..0))
            .with_code(error.exit_code())
            .with_message(format!("{title}: {}", error.message))
            .finish()
            .eprint((filename, Source::from(source))),
    }
}

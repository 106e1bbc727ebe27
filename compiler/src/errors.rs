//! Rich error reporting with source spans.
//!
//! Uses miette for terminal error output with source context and an
//! underline on the offending lexeme. Syntax and semantic errors are both
//! fatal and share this one type; the label carries what was expected.

use crate::token::Span;
use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

/// A fatal compilation error with source location information.
#[derive(Error, Debug, Diagnostic)]
#[error("{message}")]
pub struct CompileError {
    pub message: String,

    #[source_code]
    pub src: String,

    #[label("{label}")]
    pub span: SourceSpan,

    pub label: String,
}

impl CompileError {
    pub fn new(message: impl Into<String>, src: &str, span: Span, label: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            src: src.to_string(),
            span: (span.start, span.end.saturating_sub(span.start)).into(),
            label: label.into(),
        }
    }
}

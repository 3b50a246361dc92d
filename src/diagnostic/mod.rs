pub mod ansi;
pub mod json;
pub mod registry;

use crate::ast::Span;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Severity {
    Error,
    /// An interpreter bug rather than a fault in the script.
    Internal,
}

#[derive(Debug, Clone)]
pub struct Label {
    pub span: Span,
    pub message: String,
    pub is_primary: bool,
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: Option<&'static str>,
    pub message: String,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
    pub suggestion: Option<String>,
    pub source: Option<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            code: None,
            message: message.into(),
            labels: Vec::new(),
            notes: Vec::new(),
            suggestion: None,
            source: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Diagnostic { severity: Severity::Internal, ..Diagnostic::error(message) }
    }

    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_span(mut self, span: Span, label: impl Into<String>) -> Self {
        self.labels.push(Label { span, message: label.into(), is_primary: true });
        self
    }

    pub fn with_secondary_span(mut self, span: Span, label: impl Into<String>) -> Self {
        self.labels.push(Label { span, message: label.into(), is_primary: false });
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn primary_label(&self) -> Option<&Label> {
        self.labels.iter().find(|l| l.is_primary)
    }
}

// ---- From impls for every error the pipeline can produce ----

impl From<&crate::lexer::LexError> for Diagnostic {
    fn from(e: &crate::lexer::LexError) -> Self {
        let span = Span {
            start: e.position,
            end: e.position + e.snippet.len().max(1),
        };
        let mut d = Diagnostic::error(format!("unexpected input '{}'", e.snippet))
            .with_code(e.code)
            .with_span(span, "here");
        if !e.suggestion.is_empty() {
            d = d.with_suggestion(e.suggestion.clone());
        }
        d
    }
}

impl From<&crate::parser::ParseError> for Diagnostic {
    fn from(e: &crate::parser::ParseError) -> Self {
        Diagnostic::error(&e.message).with_code(e.code).with_span(e.span, "here")
    }
}

impl From<&crate::compiler::CompileError> for Diagnostic {
    fn from(e: &crate::compiler::CompileError) -> Self {
        let d = Diagnostic::error(e.to_string()).with_code(e.code());
        match e {
            crate::compiler::CompileError::Unlowered { span, .. } => {
                Diagnostic::internal(e.to_string()).with_code(e.code()).with_span(*span, "")
            }
            crate::compiler::CompileError::OutsideLoop { span, .. } => {
                d.with_span(*span, "not inside a loop").with_note("function bodies do not see loops around them")
            }
            crate::compiler::CompileError::DuplicateName { span, .. } => d.with_span(*span, "declared here"),
        }
    }
}

impl From<&crate::error::Error> for Diagnostic {
    fn from(e: &crate::error::Error) -> Self {
        match e {
            crate::error::Error::User(u) => {
                Diagnostic::error(u.kind.to_string()).with_code(e.code()).with_span(u.assoc, "")
            }
            crate::error::Error::Internal(i) => Diagnostic::internal(i.to_string())
                .with_code(e.code())
                .with_note("this is a bug in winter, not in the script"),
        }
    }
}

impl From<&crate::driver::SessionError> for Diagnostic {
    fn from(e: &crate::driver::SessionError) -> Self {
        use crate::driver::SessionError;
        match e {
            SessionError::Lex(e) => e.into(),
            SessionError::Parse(e) => e.into(),
            SessionError::Compile(e) => e.into(),
            SessionError::Runtime(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Span;

    #[test]
    fn diagnostic_error_builder() {
        let d = Diagnostic::error("something went wrong");
        assert_eq!(d.severity, Severity::Error);
        assert_eq!(d.message, "something went wrong");
        assert!(d.code.is_none());
        assert!(d.labels.is_empty());
        assert!(d.notes.is_empty());
        assert!(d.suggestion.is_none());
    }

    #[test]
    fn diagnostic_with_span() {
        let d = Diagnostic::error("bad token")
            .with_span(Span { start: 5, end: 8 }, "here");
        assert_eq!(d.labels.len(), 1);
        assert_eq!(d.labels[0].span.start, 5);
        assert_eq!(d.labels[0].span.end, 8);
        assert!(d.labels[0].is_primary);
    }

    #[test]
    fn diagnostic_with_note_and_suggestion() {
        let d = Diagnostic::error("type mismatch")
            .with_note("while calling 'f'")
            .with_suggestion("cast with 'as int'");
        assert_eq!(d.notes, vec!["while calling 'f'"]);
        assert_eq!(d.suggestion.as_deref(), Some("cast with 'as int'"));
    }

    #[test]
    fn from_lex_error() {
        let e = crate::lexer::lex("x = 'a';").unwrap_err();
        let d = Diagnostic::from(&e);
        assert_eq!(d.severity, Severity::Error);
        assert_eq!(d.code, Some("WIN-L001"));
        assert_eq!(d.labels[0].span, Span { start: 4, end: 5 });
        assert!(d.suggestion.unwrap().contains("double quotes"));
    }

    #[test]
    fn from_parse_error() {
        let e = crate::parser::ParseError {
            code: "WIN-P004",
            position: 2,
            span: Span { start: 10, end: 15 },
            message: "expected a name".to_string(),
        };
        let d = Diagnostic::from(&e);
        assert!(d.message.contains("expected a name"));
        assert_eq!(d.code, Some("WIN-P004"));
        assert_eq!(d.labels[0].span, Span { start: 10, end: 15 });
    }

    #[test]
    fn from_compile_error() {
        let e = crate::compiler::CompileError::OutsideLoop { keyword: "break", span: Span { start: 0, end: 6 } };
        let d = Diagnostic::from(&e);
        assert_eq!(d.code, Some("WIN-C001"));
        assert!(d.message.contains("break"));
        assert_eq!(d.notes.len(), 1);
    }

    #[test]
    fn from_user_runtime_error() {
        let e = crate::error::UserErrorKind::AssertionFailed.at(Span { start: 0, end: 13 });
        let d = Diagnostic::from(&e);
        assert_eq!(d.severity, Severity::Error);
        assert_eq!(d.code, Some("WIN-R017"));
        assert_eq!(d.labels[0].span, Span { start: 0, end: 13 });
    }

    #[test]
    fn from_internal_error() {
        let e: crate::error::Error = crate::error::InternalError::StackUnderflow.into();
        let d = Diagnostic::from(&e);
        assert_eq!(d.severity, Severity::Internal);
        assert!(d.labels.is_empty());
        assert!(d.notes[0].contains("bug"));
    }
}

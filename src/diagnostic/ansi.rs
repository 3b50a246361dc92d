//! Terminal rendering: a header, the offending source line with carets,
//! then `=` lines for secondary labels, notes and the suggestion.

use std::fmt::{self, Write};

use crate::ast::SourceMap;
use super::{Diagnostic, Label, Severity};

#[derive(Debug, Clone, Copy)]
enum Style {
    Error,
    Internal,
    Bold,
    Gutter,
    Faint,
}

impl Style {
    fn sgr(self) -> &'static str {
        match self {
            Style::Error => "1;31",
            Style::Internal => "1;35",
            Style::Bold => "1",
            Style::Gutter => "36",
            Style::Faint => "2",
        }
    }
}

pub struct AnsiRenderer {
    pub use_color: bool,
}

impl AnsiRenderer {
    fn paint(&self, style: Style, text: &str) -> String {
        if self.use_color {
            format!("\x1b[{}m{text}\x1b[0m", style.sgr())
        } else {
            text.to_string()
        }
    }

    pub fn render(&self, d: &Diagnostic) -> String {
        let mut out = String::new();
        // writing into a String cannot fail
        let _ = self.write(&mut out, d);
        out
    }

    fn write(&self, out: &mut String, d: &Diagnostic) -> fmt::Result {
        let (accent, severity) = match d.severity {
            Severity::Error => (Style::Error, "error"),
            Severity::Internal => (Style::Internal, "internal error"),
        };
        let header = match d.code {
            Some(code) => format!("{severity}[{code}]"),
            None => severity.to_string(),
        };
        writeln!(out, "{}: {}", self.paint(accent, &header), self.paint(Style::Bold, &d.message))?;

        if let (Some(label), Some(source)) = (d.primary_label(), d.source.as_deref()) {
            self.write_snippet(out, label, source, accent)?;
        }

        let eq = self.paint(Style::Faint, "=");
        for label in d.labels.iter().filter(|l| !l.is_primary && !l.message.is_empty()) {
            writeln!(out, "  {eq} {}", label.message)?;
        }
        for note in &d.notes {
            writeln!(out, "  {eq} note: {note}")?;
        }
        if let Some(suggestion) = &d.suggestion {
            writeln!(out, "  {eq} suggestion: {suggestion}")?;
        }
        if d.severity == Severity::Internal {
            writeln!(out, "  {eq} note: this is a bug in winter, not in the script")?;
        }
        Ok(())
    }

    /// `--> line:col`, then the source line framed by empty gutter lines,
    /// with carets under the span. Carets stop at the end of the line.
    fn write_snippet(&self, out: &mut String, label: &Label, source: &str, accent: Style) -> fmt::Result {
        let map = SourceMap::new(source);
        let (line, col) = map.lookup(label.span.start);
        let text = map.line_text(source, line);

        let width = line.to_string().len();
        let blank = " ".repeat(width);
        let pipe = self.paint(Style::Gutter, "|");
        writeln!(out, "  {} {line}:{col}", self.paint(Style::Gutter, "-->"))?;
        writeln!(out, "{blank} {pipe}")?;
        writeln!(out, "{} {pipe} {text}", self.paint(Style::Gutter, &format!("{line:>width$}")))?;

        let indent = col.saturating_sub(1);
        let room = text.len().saturating_sub(indent);
        let span_len = label.span.end.saturating_sub(label.span.start).min(room).max(1);
        let carets = self.paint(accent, &"^".repeat(span_len));
        write!(out, "{blank} {pipe} {}{carets}", " ".repeat(indent))?;
        if !label.message.is_empty() {
            write!(out, " {}", self.paint(accent, &label.message))?;
        }
        writeln!(out)?;
        writeln!(out, "{blank} {pipe}")
    }
}

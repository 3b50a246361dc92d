//! `--json` output: one object per diagnostic, with the code first.

use serde::Serialize;

use crate::ast::SourceMap;
use super::{Diagnostic, Severity};

#[derive(Serialize)]
struct Record<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
    severity: &'static str,
    internal: bool,
    message: &'a str,
    labels: Vec<LabelRecord<'a>>,
    notes: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    suggestion: Option<&'a str>,
}

#[derive(Serialize)]
struct LabelRecord<'a> {
    start: usize,
    end: usize,
    message: &'a str,
    primary: bool,
    // 1-based; only present when the diagnostic carries its source
    #[serde(skip_serializing_if = "Option::is_none")]
    line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    col: Option<usize>,
}

pub fn render(d: &Diagnostic) -> String {
    let map = d.source.as_deref().map(SourceMap::new);
    let labels = d
        .labels
        .iter()
        .map(|l| {
            let position = map.as_ref().map(|m| m.lookup(l.span.start));
            LabelRecord {
                start: l.span.start,
                end: l.span.end,
                message: &l.message,
                primary: l.is_primary,
                line: position.map(|(line, _)| line),
                col: position.map(|(_, col)| col),
            }
        })
        .collect();

    let record = Record {
        code: d.code,
        severity: match d.severity {
            Severity::Error => "error",
            Severity::Internal => "internal",
        },
        internal: d.severity == Severity::Internal,
        message: &d.message,
        labels,
        notes: &d.notes,
        suggestion: d.suggestion.as_deref(),
    };

    serde_json::to_string(&record).unwrap_or_else(|e| {
        serde_json::json!({
            "severity": "internal",
            "internal": true,
            "message": format!("cannot serialize diagnostic: {e}"),
        })
        .to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Span;

    fn parse_json(s: &str) -> serde_json::Value {
        serde_json::from_str(s).expect("valid JSON")
    }

    #[test]
    fn render_basic_error() {
        let d = Diagnostic::error("cannot apply '+' to int and string");
        let out = render(&d);
        let v = parse_json(&out);
        assert_eq!(v["severity"], "error");
        assert_eq!(v["message"], "cannot apply '+' to int and string");
        assert!(v["labels"].as_array().unwrap().is_empty());
    }

    #[test]
    fn render_with_span_and_source() {
        let d = Diagnostic::error("expected a name")
            .with_span(Span { start: 2, end: 5 }, "here")
            .with_source("x = abc;".to_string());
        let out = render(&d);
        let v = parse_json(&out);
        let label = &v["labels"][0];
        assert_eq!(label["start"], 2);
        assert_eq!(label["end"], 5);
        assert_eq!(label["primary"], true);
        assert_eq!(label["line"], 1);
        assert_eq!(label["col"], 3);
    }

    #[test]
    fn render_with_suggestion() {
        let d = Diagnostic::error("bad")
            .with_suggestion("try this instead");
        let out = render(&d);
        let v = parse_json(&out);
        assert_eq!(v["suggestion"], "try this instead");
    }

    #[test]
    fn render_with_notes() {
        let d = Diagnostic::error("bad")
            .with_note("while calling 'f'")
            .with_note("called from 'g'");
        let out = render(&d);
        let v = parse_json(&out);
        let notes = v["notes"].as_array().unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0], "while calling 'f'");
    }

    #[test]
    fn render_no_suggestion_key_absent() {
        let d = Diagnostic::error("bad");
        let out = render(&d);
        let v = parse_json(&out);
        assert!(v.get("suggestion").is_none());
    }

    #[test]
    fn render_label_without_source_no_line_col() {
        let d = Diagnostic::error("bad")
            .with_span(Span { start: 5, end: 8 }, "here");
        let out = render(&d);
        let v = parse_json(&out);
        let label = &v["labels"][0];
        // No source → no line/col fields
        assert!(label.get("line").is_none());
        assert!(label.get("col").is_none());
    }

    #[test]
    fn render_is_valid_json() {
        let d = Diagnostic::error("complex error")
            .with_span(Span { start: 0, end: 5 }, "primary")
            .with_secondary_span(Span { start: 10, end: 12 }, "secondary")
            .with_note("some note")
            .with_suggestion("fix it")
            .with_source("x = [1, 2];\nprint(x);".to_string());
        let out = render(&d);
        // Must be parseable JSON
        parse_json(&out);
    }

    #[test]
    fn render_internal_severity_and_code() {
        let d = Diagnostic::internal("evaluation stack underflow").with_code("WIN-I005");
        let v = parse_json(&render(&d));
        assert_eq!(v["severity"], "internal");
        assert_eq!(v["code"], "WIN-I005");
    }

    #[test]
    fn code_leads_the_object() {
        let d = Diagnostic::error("'y' is not bound").with_code("WIN-R003");
        let out = render(&d);
        assert!(out.starts_with(r#"{"code":"WIN-R003","severity":"error","internal":false"#), "got {out}");
    }

    #[test]
    fn internal_flag_follows_severity() {
        assert_eq!(parse_json(&render(&Diagnostic::internal("bug")))["internal"], true);
        assert_eq!(parse_json(&render(&Diagnostic::error("bad")))["internal"], false);
    }

    #[test]
    fn render_code_absent_when_none() {
        let v = parse_json(&render(&Diagnostic::error("bad")));
        assert!(v.get("code").is_none());
    }
}

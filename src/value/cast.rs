use crate::ast::Span;
use crate::error::{Result, UserErrorKind};
use crate::gc::Heap;

use super::display::display;
use super::{TypeTag, Value};

/// Convert `value` to `target`. Every value casts to its own type and to
/// string; the remaining pairs are listed below and anything else fails.
pub fn cast(heap: &mut Heap, value: Value, target: TypeTag, assoc: Span) -> Result<Value> {
    if value.type_tag() == target {
        return Ok(value);
    }
    match (value, target) {
        (_, TypeTag::String) => {
            let text = display(heap, value)?;
            Ok(Value::new_string(heap, text))
        }
        (Value::Integer(i), TypeTag::Float) => Ok(Value::Float(i as f64)),
        (Value::Integer(i), TypeTag::Bool) => Ok(Value::Bool(i != 0)),
        (Value::Float(f), TypeTag::Integer) => Ok(Value::Integer(f as i64)),
        (Value::Bool(b), TypeTag::Integer) => Ok(Value::Integer(i64::from(b))),
        (Value::String(h), _) => {
            let text = heap.string(h)?.to_text();
            parse_string(heap, text, target, assoc)
        }
        _ => Err(UserErrorKind::CannotCast { from: value.type_name(), to: target.name() }.at(assoc)),
    }
}

fn parse_string(heap: &mut Heap, text: String, target: TypeTag, assoc: Span) -> Result<Value> {
    let malformed = |text: String| UserErrorKind::MalformedNumber { text, target: target.name() }.at(assoc);
    match target {
        TypeTag::Integer => text.parse().map(Value::Integer).map_err(|_| malformed(text)),
        TypeTag::Float => text.parse().map(Value::Float).map_err(|_| malformed(text)),
        TypeTag::Bool => match text.as_str() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(malformed(text)),
        },
        TypeTag::List => {
            let chars: Vec<Value> = text
                .chars()
                .map(|c| Value::new_string(heap, c.to_string()))
                .collect();
            let list = Value::new_list(heap);
            for c in chars {
                super::collections::append(heap, list, c, assoc)?;
            }
            Ok(list)
        }
        _ => Err(UserErrorKind::CannotCast { from: "string", to: target.name() }.at(assoc)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::display::display;

    const AT: Span = Span { start: 0, end: 0 };

    fn round_trip(heap: &mut Heap, x: Value) -> Value {
        let s = cast(heap, x, TypeTag::String, AT).unwrap();
        cast(heap, s, x.type_tag(), AT).unwrap()
    }

    #[test]
    fn textual_round_trip() {
        let mut heap = Heap::new();
        for x in [
            Value::Integer(0),
            Value::Integer(-42),
            Value::Integer(i64::MAX),
            Value::Float(3.5),
            Value::Float(-0.125),
            Value::Float(1e300),
            Value::Bool(true),
            Value::Bool(false),
        ] {
            assert_eq!(round_trip(&mut heap, x), x);
        }
    }

    #[test]
    fn numeric_conversions() {
        let mut heap = Heap::new();
        assert_eq!(cast(&mut heap, Value::Float(2.9), TypeTag::Integer, AT).unwrap(), Value::Integer(2));
        assert_eq!(cast(&mut heap, Value::Bool(true), TypeTag::Integer, AT).unwrap(), Value::Integer(1));
        assert_eq!(cast(&mut heap, Value::Integer(0), TypeTag::Bool, AT).unwrap(), Value::Bool(false));
        assert_eq!(cast(&mut heap, Value::Integer(3), TypeTag::Float, AT).unwrap(), Value::Float(3.0));
    }

    #[test]
    fn malformed_string_reports_target() {
        let mut heap = Heap::new();
        let s = Value::new_string(&mut heap, "12a");
        let err = cast(&mut heap, s, TypeTag::Integer, AT).unwrap_err();
        assert_eq!(err.code(), "WIN-R013");
        assert_eq!(err.to_string(), "string \"12a\" is not in int form");
    }

    #[test]
    fn impossible_pair_names_both_types() {
        let mut heap = Heap::new();
        let err = cast(&mut heap, Value::Bool(true), TypeTag::Float, AT).unwrap_err();
        assert_eq!(err.to_string(), "cannot cast bool to float");
    }

    #[test]
    fn string_to_list_splits_characters() {
        let mut heap = Heap::new();
        let s = Value::new_string(&mut heap, "abc");
        let list = cast(&mut heap, s, TypeTag::List, AT).unwrap();
        assert_eq!(display(&heap, list).unwrap(), "[a, b, c]");
    }
}

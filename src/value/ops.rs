//! Arithmetic, logic and comparison on values.
//!
//! Binary operators require both operands to share a type tag. Integer
//! arithmetic wraps; integer division widens to float.

use std::cmp::Ordering;

use crate::ast::Span;
use crate::error::{InternalError, Result, UserErrorKind};
use crate::gc::Heap;

use super::Value;

fn same_type(op: &'static str, a: Value, b: Value, assoc: Span) -> Result<()> {
    if a.type_tag() == b.type_tag() {
        Ok(())
    } else {
        Err(UserErrorKind::TypeMismatch { op, left: a.type_name(), right: b.type_name() }.at(assoc))
    }
}

fn invalid(op: &'static str, operand: Value, assoc: Span) -> crate::error::Error {
    UserErrorKind::InvalidOperand { op, operand: operand.type_name() }.at(assoc)
}

pub fn negate(a: Value, assoc: Span) -> Result<Value> {
    match a {
        Value::Integer(i) => Ok(Value::Integer(i.wrapping_neg())),
        Value::Float(f) => Ok(Value::Float(-f)),
        other => Err(invalid("-", other, assoc)),
    }
}

pub fn not(a: Value, assoc: Span) -> Result<Value> {
    match a {
        Value::Bool(b) => Ok(Value::Bool(!b)),
        other => Err(invalid("!", other, assoc)),
    }
}

pub fn add(heap: &mut Heap, a: Value, b: Value, assoc: Span) -> Result<Value> {
    same_type("+", a, b, assoc)?;
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => Ok(Value::Integer(x.wrapping_add(y))),
        (Value::Float(x), Value::Float(y)) => Ok(Value::Float(x + y)),
        (Value::String(x), Value::String(y)) => {
            let mut bytes = heap.string(x)?.bytes.clone();
            bytes.extend_from_slice(&heap.string(y)?.bytes);
            Ok(Value::new_string(heap, bytes))
        }
        _ => Err(invalid("+", a, assoc)),
    }
}

pub fn multiply(a: Value, b: Value, assoc: Span) -> Result<Value> {
    same_type("*", a, b, assoc)?;
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => Ok(Value::Integer(x.wrapping_mul(y))),
        (Value::Float(x), Value::Float(y)) => Ok(Value::Float(x * y)),
        _ => Err(invalid("*", a, assoc)),
    }
}

pub fn divide(a: Value, b: Value, assoc: Span) -> Result<Value> {
    same_type("/", a, b, assoc)?;
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => Ok(Value::Float(x as f64 / y as f64)),
        (Value::Float(x), Value::Float(y)) => Ok(Value::Float(x / y)),
        _ => Err(invalid("/", a, assoc)),
    }
}

pub fn and(a: Value, b: Value, assoc: Span) -> Result<Value> {
    same_type("&&", a, b, assoc)?;
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => Ok(Value::Bool(x && y)),
        _ => Err(invalid("&&", a, assoc)),
    }
}

pub fn or(a: Value, b: Value, assoc: Span) -> Result<Value> {
    same_type("||", a, b, assoc)?;
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => Ok(Value::Bool(x || y)),
        _ => Err(invalid("||", a, assoc)),
    }
}

/// Language-level `==`. Containers have no equality.
pub fn equal(heap: &Heap, a: Value, b: Value, assoc: Span) -> Result<Value> {
    same_type("==", a, b, assoc)?;
    match a {
        Value::List(_) | Value::Dictionary(_) | Value::Record(_) => {
            Err(UserErrorKind::UnsupportedEquality { kind: a.type_name() }.at(assoc))
        }
        _ => Ok(Value::Bool(scalar_eq(heap, a, b)?)),
    }
}

/// Equality for same-tagged non-container values. Functions compare by
/// identity, record types by canon identity.
fn scalar_eq(heap: &Heap, a: Value, b: Value) -> std::result::Result<bool, InternalError> {
    Ok(match (a, b) {
        (Value::None, Value::None) => true,
        (Value::Type { tag: t1, canon: c1 }, Value::Type { tag: t2, canon: c2 }) => t1 == t2 && c1 == c2,
        (Value::Integer(x), Value::Integer(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => x == y,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::String(x), Value::String(y)) => {
            let (x, y) = (heap.string(x)?, heap.string(y)?);
            x.len() == y.len() && x.bytes == y.bytes
        }
        (Value::Function(x), Value::Function(y)) => x == y,
        (Value::Builtin(x), Value::Builtin(y)) => x == y,
        _ => false,
    })
}

/// Dictionary key matching. Keys of different types never match; container
/// keys match by identity.
pub fn keys_match(heap: &Heap, a: Value, b: Value) -> std::result::Result<bool, InternalError> {
    if a.type_tag() != b.type_tag() {
        return Ok(false);
    }
    match (a, b) {
        (Value::List(x), Value::List(y))
        | (Value::Dictionary(x), Value::Dictionary(y))
        | (Value::Record(x), Value::Record(y)) => Ok(x == y),
        _ => scalar_eq(heap, a, b),
    }
}

fn compare(heap: &Heap, op: &'static str, a: Value, b: Value, assoc: Span) -> Result<Option<Ordering>> {
    same_type(op, a, b, assoc)?;
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => Ok(Some(x.cmp(&y))),
        (Value::Float(x), Value::Float(y)) => Ok(x.partial_cmp(&y)),
        (Value::String(x), Value::String(y)) => Ok(Some(heap.string(x)?.bytes.cmp(&heap.string(y)?.bytes))),
        _ => Err(invalid(op, a, assoc)),
    }
}

pub fn greater_than(heap: &Heap, a: Value, b: Value, assoc: Span) -> Result<Value> {
    let ord = compare(heap, ">", a, b, assoc)?;
    Ok(Value::Bool(ord == Some(Ordering::Greater)))
}

pub fn less_than(heap: &Heap, a: Value, b: Value, assoc: Span) -> Result<Value> {
    let ord = compare(heap, "<", a, b, assoc)?;
    Ok(Value::Bool(ord == Some(Ordering::Less)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    const AT: Span = Span { start: 0, end: 1 };

    fn user_code(result: Result<Value>) -> &'static str {
        match result {
            Err(e @ Error::User(_)) => e.code(),
            other => panic!("expected a user error, got {other:?}"),
        }
    }

    #[test]
    fn integer_division_widens() {
        assert_eq!(divide(Value::Integer(7), Value::Integer(2), AT).unwrap(), Value::Float(3.5));
        assert_eq!(divide(Value::Integer(1), Value::Integer(0), AT).unwrap(), Value::Float(f64::INFINITY));
    }

    #[test]
    fn mixed_types_are_rejected() {
        let mut heap = Heap::new();
        assert_eq!(user_code(add(&mut heap, Value::Integer(1), Value::Float(1.0), AT)), "WIN-R001");
        assert_eq!(user_code(equal(&heap, Value::Integer(1), Value::Bool(true), AT)), "WIN-R001");
    }

    #[test]
    fn same_type_but_unsupported_operand() {
        let mut heap = Heap::new();
        assert_eq!(user_code(add(&mut heap, Value::Bool(true), Value::Bool(false), AT)), "WIN-R002");
        assert_eq!(user_code(negate(Value::Bool(true), AT)), "WIN-R002");
    }

    #[test]
    fn arithmetic_wraps() {
        let mut heap = Heap::new();
        assert_eq!(
            add(&mut heap, Value::Integer(i64::MAX), Value::Integer(1), AT).unwrap(),
            Value::Integer(i64::MIN)
        );
    }

    #[test]
    fn strings_concatenate_and_compare() {
        let mut heap = Heap::new();
        let a = Value::new_string(&mut heap, "ab");
        let b = Value::new_string(&mut heap, "c");
        let Value::String(joined) = add(&mut heap, a, b, AT).unwrap() else { panic!() };
        assert_eq!(heap.string(joined).unwrap().bytes, b"abc");
        assert_eq!(less_than(&heap, a, b, AT).unwrap(), Value::Bool(true));

        let again = Value::new_string(&mut heap, "ab");
        assert_eq!(equal(&heap, a, again, AT).unwrap(), Value::Bool(true));
    }

    #[test]
    fn list_equality_is_unsupported() {
        let mut heap = Heap::new();
        let l = Value::new_list(&mut heap);
        assert_eq!(user_code(equal(&heap, l, l, AT)), "WIN-R016");
    }

    #[test]
    fn keys_of_different_types_never_match() {
        let heap = Heap::new();
        assert!(!keys_match(&heap, Value::Integer(1), Value::Float(1.0)).unwrap());
        assert!(keys_match(&heap, Value::Integer(1), Value::Integer(1)).unwrap());
    }
}

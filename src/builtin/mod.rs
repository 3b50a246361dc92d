//! Native functions callable from scripts exactly like user functions.

use std::io::Write;

use crate::ast::Span;
use crate::error::{InternalError, Result, UserErrorKind};
use crate::gc::Heap;
use crate::value::{cast::cast, collections, TypeTag, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Print,
    Assert,
    Typeof,
    ListAppend,
    ListPop,
    ListCount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Fixed(usize),
    Variadic,
}

impl Builtin {
    pub const ALL: [Builtin; 6] = [
        Builtin::Print,
        Builtin::Assert,
        Builtin::Typeof,
        Builtin::ListAppend,
        Builtin::ListPop,
        Builtin::ListCount,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Print => "print",
            Builtin::Assert => "assert",
            Builtin::Typeof => "typeof",
            Builtin::ListAppend => "list_append",
            Builtin::ListPop => "list_pop",
            Builtin::ListCount => "list_count",
        }
    }

    pub fn from_name(name: &str) -> Option<Builtin> {
        Builtin::ALL.into_iter().find(|b| b.name() == name)
    }

    pub fn arity(self) -> Arity {
        match self {
            Builtin::Print => Arity::Variadic,
            Builtin::Assert | Builtin::Typeof | Builtin::ListPop | Builtin::ListCount => Arity::Fixed(1),
            Builtin::ListAppend => Arity::Fixed(2),
        }
    }

    /// Run the builtin on arguments in call order. Arity has already been
    /// checked by the caller.
    pub fn call(self, heap: &mut Heap, out: &mut dyn Write, args: &[Value], assoc: Span) -> Result<Value> {
        match self {
            Builtin::Print => {
                let mut line = Vec::new();
                for (i, &arg) in args.iter().enumerate() {
                    if i > 0 {
                        line.push(b' ');
                    }
                    let Value::String(h) = cast(heap, arg, TypeTag::String, assoc)? else {
                        return Err(InternalError::ObjectKind { expected: "string", found: "value" }.into());
                    };
                    line.extend_from_slice(&heap.string(h)?.bytes);
                }
                line.push(b'\n');
                out.write_all(&line).map_err(InternalError::from)?;
                Ok(Value::None)
            }
            Builtin::Assert => match args.first() {
                Some(Value::Bool(true)) => Ok(Value::None),
                Some(Value::Bool(false)) => Err(UserErrorKind::AssertionFailed.at(assoc)),
                other => Err(UserErrorKind::BuiltinArgument {
                    builtin: "assert",
                    expected: "a bool",
                    got: other.map_or("nothing", |v| v.type_name()),
                }
                .at(assoc)),
            },
            Builtin::Typeof => Ok(first(args).type_of(heap)?),
            Builtin::ListAppend => {
                collections::append(heap, first(args), args.get(1).copied().unwrap_or(Value::None), assoc)?;
                Ok(Value::None)
            }
            Builtin::ListPop => collections::pop_list(heap, first(args), assoc),
            Builtin::ListCount => {
                let n = collections::count(heap, first(args), assoc)?;
                Ok(Value::Integer(n as i64))
            }
        }
    }
}

fn first(args: &[Value]) -> Value {
    args.first().copied().unwrap_or(Value::None)
}

#[cfg(test)]
mod tests {
    use super::*;

    const AT: Span = Span { start: 0, end: 0 };

    #[test]
    fn names_resolve_both_ways() {
        for b in Builtin::ALL {
            assert_eq!(Builtin::from_name(b.name()), Some(b));
        }
        assert_eq!(Builtin::from_name("println"), None);
    }

    #[test]
    fn print_joins_with_spaces() {
        let mut heap = Heap::new();
        let mut out = Vec::new();
        let s = Value::new_string(&mut heap, "x =");
        Builtin::Print
            .call(&mut heap, &mut out, &[s, Value::Integer(3), Value::Float(0.5)], AT)
            .unwrap();
        Builtin::Print.call(&mut heap, &mut out, &[], AT).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "x = 3 0.5\n\n");
    }

    #[test]
    fn assert_requires_true_bool() {
        let mut heap = Heap::new();
        let mut out = Vec::new();
        assert!(Builtin::Assert.call(&mut heap, &mut out, &[Value::Bool(true)], AT).is_ok());
        let failed = Builtin::Assert.call(&mut heap, &mut out, &[Value::Bool(false)], AT).unwrap_err();
        assert_eq!(failed.code(), "WIN-R017");
        let wrong = Builtin::Assert.call(&mut heap, &mut out, &[Value::Integer(1)], AT).unwrap_err();
        assert_eq!(wrong.to_string(), "assert requires a bool, got int");
    }

    #[test]
    fn list_helpers() {
        let mut heap = Heap::new();
        let mut out = Vec::new();
        let l = Value::new_list(&mut heap);
        Builtin::ListAppend.call(&mut heap, &mut out, &[l, Value::Integer(1)], AT).unwrap();
        Builtin::ListAppend.call(&mut heap, &mut out, &[l, Value::Integer(2)], AT).unwrap();
        assert_eq!(Builtin::ListCount.call(&mut heap, &mut out, &[l], AT).unwrap(), Value::Integer(2));
        assert_eq!(Builtin::ListPop.call(&mut heap, &mut out, &[l], AT).unwrap(), Value::Integer(2));

        let err = Builtin::ListCount.call(&mut heap, &mut out, &[Value::None], AT).unwrap_err();
        assert_eq!(err.to_string(), "list_count requires a list, got none");
    }

    #[test]
    fn typeof_reports_type_values() {
        let mut heap = Heap::new();
        let mut out = Vec::new();
        assert_eq!(
            Builtin::Typeof.call(&mut heap, &mut out, &[Value::Float(1.0)], AT).unwrap(),
            Value::Type { tag: TypeTag::Float, canon: None }
        );
    }
}

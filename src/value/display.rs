use crate::error::InternalError;
use crate::gc::{Handle, Heap};

use super::Value;

/// Text form of a value, as `print` and casts to string produce it.
pub fn display(heap: &Heap, value: Value) -> Result<String, InternalError> {
    let mut out = String::new();
    write_value(heap, value, &mut out, &mut Vec::new())?;
    Ok(out)
}

/// Floats always carry a `.` or an exponent so they read back as floats.
pub fn format_float(f: f64) -> String {
    format!("{f:?}")
}

/// `(a, b)` from a list of name strings.
pub fn name_tuple(heap: &Heap, names: &[Value]) -> Result<String, InternalError> {
    let names = names
        .iter()
        .map(|&n| super::text_of(heap, n))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(format!("({})", names.join(", ")))
}

fn write_value(heap: &Heap, value: Value, out: &mut String, path: &mut Vec<Handle>) -> Result<(), InternalError> {
    match value {
        Value::None => out.push_str("none"),
        Value::Bool(b) => out.push_str(if b { "true" } else { "false" }),
        Value::Integer(i) => out.push_str(&i.to_string()),
        Value::Float(f) => out.push_str(&format_float(f)),
        Value::Type { canon: Some(canon), .. } => {
            out.push_str("record ");
            out.push_str(&name_tuple(heap, &heap.canon(canon)?.fields)?);
        }
        Value::Type { tag, canon: None } => out.push_str(tag.name()),
        Value::String(h) => out.push_str(&heap.string(h)?.to_text()),
        Value::Function(h) => {
            out.push_str("<function ");
            out.push_str(&name_tuple(heap, &heap.function(h)?.parameters)?);
            out.push('>');
        }
        Value::Builtin(b) => {
            out.push_str("<builtin ");
            out.push_str(b.name());
            out.push('>');
        }
        Value::List(h) => {
            if path.contains(&h) {
                out.push_str("[...]");
                return Ok(());
            }
            path.push(h);
            out.push('[');
            for (i, &item) in heap.list(h)?.items().iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(heap, item, out, path)?;
            }
            out.push(']');
            path.pop();
        }
        Value::Dictionary(h) => {
            if path.contains(&h) {
                out.push_str("{...}");
                return Ok(());
            }
            path.push(h);
            let dict = heap.dictionary(h)?;
            write_pairs(heap, dict.keys(), dict.values(), out, path)?;
            path.pop();
        }
        Value::Record(h) => {
            if path.contains(&h) {
                out.push_str("{...}");
                return Ok(());
            }
            path.push(h);
            let record = heap.record(h)?;
            out.push_str(&name_tuple(heap, &heap.canon(record.canon)?.fields)?);
            out.push_str(" : ");
            write_pairs(heap, record.fields.keys(), record.fields.values(), out, path)?;
            path.pop();
        }
    }
    Ok(())
}

fn write_pairs(
    heap: &Heap,
    keys: &[Value],
    values: &[Value],
    out: &mut String,
    path: &mut Vec<Handle>,
) -> Result<(), InternalError> {
    out.push('{');
    for (i, (&k, &v)) in keys.iter().zip(values).enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_value(heap, k, out, path)?;
        out.push_str(" -> ");
        write_value(heap, v, out, path)?;
    }
    out.push('}');
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::Builtin;
    use crate::value::TypeTag;

    #[test]
    fn scalars() {
        let heap = Heap::new();
        assert_eq!(display(&heap, Value::None).unwrap(), "none");
        assert_eq!(display(&heap, Value::Integer(-4)).unwrap(), "-4");
        assert_eq!(display(&heap, Value::Float(2.0)).unwrap(), "2.0");
        assert_eq!(display(&heap, Value::Float(3.5)).unwrap(), "3.5");
        assert_eq!(display(&heap, Value::Bool(false)).unwrap(), "false");
        assert_eq!(display(&heap, Value::Builtin(Builtin::Print)).unwrap(), "<builtin print>");
        assert_eq!(display(&heap, Value::Type { tag: TypeTag::Dictionary, canon: None }).unwrap(), "dict");
    }

    #[test]
    fn nested_list() {
        let mut heap = Heap::new();
        let inner = Value::new_list(&mut heap);
        let outer = Value::new_list(&mut heap);
        let s = Value::new_string(&mut heap, "hi");
        let (Value::List(i), Value::List(o)) = (inner, outer) else { panic!() };
        heap.list_mut(i).unwrap().push(Value::Integer(1));
        heap.list_mut(o).unwrap().push(inner);
        heap.list_mut(o).unwrap().push(s);
        assert_eq!(display(&heap, outer).unwrap(), "[[1], hi]");
    }

    #[test]
    fn self_containing_list_is_elided() {
        let mut heap = Heap::new();
        let list = Value::new_list(&mut heap);
        let Value::List(h) = list else { panic!() };
        heap.list_mut(h).unwrap().push(list);
        assert_eq!(display(&heap, list).unwrap(), "[[...]]");
    }

    #[test]
    fn record_shows_canon_and_fields() {
        let mut heap = Heap::new();
        let x = Value::new_string(&mut heap, "x");
        let y = Value::new_string(&mut heap, "y");
        let ty = Value::new_canon(&mut heap, vec![x, y]).unwrap();
        let Value::Type { canon: Some(canon), .. } = ty else { panic!() };
        let record = Value::new_record(&mut heap, canon).unwrap();
        let Value::Record(r) = record else { panic!() };
        heap.record_mut(r).unwrap().fields.set_value(0, Value::Integer(1)).unwrap();

        assert_eq!(display(&heap, record).unwrap(), "(x, y) : {x -> 1, y -> none}");
        assert_eq!(display(&heap, ty).unwrap(), "record (x, y)");
    }
}

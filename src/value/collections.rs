//! Indexing and mutation of lists, dictionaries, records and strings.
//!
//! Every store into a container retains the stored value; every removal or
//! overwrite releases the old one.

use crate::ast::Span;
use crate::error::{InternalError, Result, UserErrorKind};
use crate::gc::{Handle, Heap};

use super::display::{display, name_tuple};
use super::ops::keys_match;
use super::Value;

/// A resolved `collection[key]` location.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Place {
    ListItem(Handle, usize),
    DictionaryValue(Handle, usize),
    RecordField(Handle, usize),
    Character(Handle, usize),
}

#[derive(Clone, Copy, PartialEq)]
enum Access {
    Read,
    Write,
}

fn position(index: i64, len: usize, assoc: Span) -> Result<usize> {
    if index >= 0 && (index as usize) < len {
        Ok(index as usize)
    } else {
        Err(UserErrorKind::OutOfBounds { index, len }.at(assoc))
    }
}

pub fn find_key(heap: &Heap, keys: &[Value], key: Value) -> std::result::Result<Option<usize>, InternalError> {
    for (i, &k) in keys.iter().enumerate() {
        if keys_match(heap, k, key)? {
            return Ok(Some(i));
        }
    }
    Ok(None)
}

/// Mutable-index lookup shared by reads and assignments. `Ok(None)` is a
/// dictionary that lacks `key`.
fn locate(heap: &Heap, collection: Value, key: Value, access: Access, assoc: Span) -> Result<Option<Place>> {
    let wrong = || {
        let (kind, key) = (collection.type_name(), key.type_name());
        match access {
            Access::Read => UserErrorKind::NotIndexable { kind, key },
            Access::Write => UserErrorKind::NotAssignable { kind, key },
        }
        .at(assoc)
    };
    match (collection, key) {
        (Value::List(h), Value::Integer(i)) => {
            let len = heap.list(h)?.len();
            Ok(Some(Place::ListItem(h, position(i, len, assoc)?)))
        }
        (Value::Dictionary(h), _) => {
            let dict = heap.dictionary(h)?;
            dict.check_sync()?;
            Ok(find_key(heap, dict.keys(), key)?.map(|i| Place::DictionaryValue(h, i)))
        }
        (Value::Record(h), Value::String(_)) => {
            let record = heap.record(h)?;
            match find_key(heap, record.fields.keys(), key)? {
                Some(i) => Ok(Some(Place::RecordField(h, i))),
                None => Err(UserErrorKind::NoSuchField { field: display(heap, key)? }.at(assoc)),
            }
        }
        (Value::String(h), Value::Integer(i)) if access == Access::Read => {
            let len = heap.string(h)?.to_text().chars().count();
            Ok(Some(Place::Character(h, position(i, len, assoc)?)))
        }
        _ => Err(wrong()),
    }
}

fn read(heap: &mut Heap, place: Place) -> Result<Value> {
    let missing = || InternalError::ObjectKind { expected: "element", found: "nothing" };
    match place {
        Place::ListItem(h, i) => heap.list(h)?.get(i).ok_or_else(missing).map_err(Into::into),
        Place::DictionaryValue(h, i) => heap.dictionary(h)?.value_at(i).ok_or_else(missing).map_err(Into::into),
        Place::RecordField(h, i) => heap.record(h)?.fields.value_at(i).ok_or_else(missing).map_err(Into::into),
        Place::Character(h, i) => {
            let text = heap.string(h)?.to_text();
            let c = text.chars().nth(i).ok_or_else(missing)?;
            Ok(Value::new_string(heap, c.to_string()))
        }
    }
}

fn write(heap: &mut Heap, place: Place, value: Value) -> Result<()> {
    heap.retain(value)?;
    let old = match place {
        Place::ListItem(h, i) => heap.list_mut(h)?.set(i, value),
        Place::DictionaryValue(h, i) => Some(heap.dictionary_mut(h)?.set_value(i, value)?),
        Place::RecordField(h, i) => Some(heap.record_mut(h)?.fields.set_value(i, value)?),
        Place::Character(..) => None,
    };
    if let Some(old) = old {
        heap.release(old)?;
    }
    Ok(())
}

/// `collection[key]`.
pub fn index(heap: &mut Heap, collection: Value, key: Value, assoc: Span) -> Result<Value> {
    match locate(heap, collection, key, Access::Read, assoc)? {
        Some(place) => read(heap, place),
        None => Err(UserErrorKind::KeyNotFound { key: display(heap, key)? }.at(assoc)),
    }
}

/// `collection[key] = value`. Dictionaries insert missing keys; lists and
/// records only overwrite existing slots.
pub fn index_assign(heap: &mut Heap, collection: Value, key: Value, value: Value, assoc: Span) -> Result<()> {
    match locate(heap, collection, key, Access::Write, assoc)? {
        Some(place) => write(heap, place, value),
        None => add_pair(heap, collection, key, value),
    }
}

fn list_handle(builtin: &'static str, list: Value, assoc: Span) -> Result<Handle> {
    match list {
        Value::List(h) => Ok(h),
        other => Err(UserErrorKind::BuiltinArgument { builtin, expected: "a list", got: other.type_name() }.at(assoc)),
    }
}

/// Append to a list, taking a durable reference to `value`.
pub fn append(heap: &mut Heap, list: Value, value: Value, assoc: Span) -> Result<()> {
    let h = list_handle("list_append", list, assoc)?;
    heap.retain(value)?;
    heap.list_mut(h)?.push(value);
    Ok(())
}

/// Remove the last element. The list's reference is released, so the caller
/// must retain the result if it stores it.
pub fn pop_list(heap: &mut Heap, list: Value, assoc: Span) -> Result<Value> {
    let h = list_handle("list_pop", list, assoc)?;
    let popped = heap.list_mut(h)?.pop().ok_or_else(|| UserErrorKind::EmptyList.at(assoc))?;
    heap.release(popped)?;
    Ok(popped)
}

pub fn count(heap: &Heap, list: Value, assoc: Span) -> Result<usize> {
    let h = list_handle("list_count", list, assoc)?;
    Ok(heap.list(h)?.len())
}

/// Append a pair without looking for an existing key.
pub fn add_pair(heap: &mut Heap, dict: Value, key: Value, value: Value) -> Result<()> {
    let Value::Dictionary(h) = dict else {
        return Err(InternalError::ObjectKind { expected: "dict", found: dict.type_name() }.into());
    };
    heap.retain(key)?;
    heap.retain(value)?;
    heap.dictionary_mut(h)?.push_pair(key, value)?;
    Ok(())
}

/// Insert or overwrite.
pub fn insert(heap: &mut Heap, dict: Value, key: Value, value: Value, assoc: Span) -> Result<()> {
    index_assign(heap, dict, key, value, assoc)
}

/// Constructor-call sugar: a fresh record of `canon` whose leading fields take
/// `args` in order.
pub fn construct_record(heap: &mut Heap, canon: Handle, args: &[Value], assoc: Span) -> Result<Value> {
    let fields = heap.canon(canon)?.fields.len();
    if args.len() > fields {
        let names = heap.canon(canon)?.fields.clone();
        let record = name_tuple(heap, &names)?;
        return Err(UserErrorKind::TooManyFields { record, max: fields, got: args.len() }.at(assoc));
    }
    let record = Value::new_record(heap, canon)?;
    let Value::Record(h) = record else {
        return Err(InternalError::ObjectKind { expected: "record", found: record.type_name() }.into());
    };
    for (i, &arg) in args.iter().enumerate() {
        write(heap, Place::RecordField(h, i), arg)?;
    }
    Ok(record)
}

use std::rc::Rc;

use crate::bytecode::Chunk;
use crate::error::InternalError;
use crate::gc::{Handle, Heap};
use crate::vm::VariableMap;

use super::Value;

/// Anything that lives on the heap.
#[derive(Debug, Clone)]
pub enum Object {
    String(StringObject),
    Function(FunctionObject),
    List(ListObject),
    Dictionary(DictionaryObject),
    Canon(CanonObject),
    Record(RecordObject),
}

impl Object {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Object::String(_) => "string",
            Object::Function(_) => "function",
            Object::List(_) => "list",
            Object::Dictionary(_) => "dict",
            Object::Canon(_) => "canon",
            Object::Record(_) => "record",
        }
    }

    /// Push the handle of every value this object stores durably.
    pub fn children(&self, out: &mut Vec<Handle>) {
        fn handles<'a>(values: impl IntoIterator<Item = &'a Value>, out: &mut Vec<Handle>) {
            out.extend(values.into_iter().filter_map(|v| v.handle()));
        }
        match self {
            Object::String(_) => {}
            Object::Function(f) => {
                handles(&f.parameters, out);
                handles(f.closure.values(), out);
            }
            Object::List(l) => handles(l.items(), out),
            Object::Dictionary(d) => {
                handles(d.keys(), out);
                handles(d.values(), out);
            }
            Object::Canon(c) => handles(&c.fields, out),
            Object::Record(r) => {
                out.push(r.canon);
                handles(r.fields.keys(), out);
                handles(r.fields.values(), out);
            }
        }
    }
}

/// Explicit length is authoritative; contents need not be UTF-8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringObject {
    pub bytes: Vec<u8>,
}

impl StringObject {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        StringObject { bytes: bytes.into() }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn to_text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

#[derive(Debug, Clone)]
pub struct FunctionObject {
    /// Parameter names as string values, in declaration order.
    pub parameters: Vec<Value>,
    pub closure: VariableMap,
    pub body: Rc<Chunk>,
}

/// Growable array with an explicit capacity that starts at
/// [`ListObject::INITIAL_CAPACITY`] and doubles.
#[derive(Debug, Clone, PartialEq)]
pub struct ListObject {
    items: Vec<Value>,
    capacity: usize,
}

impl Default for ListObject {
    fn default() -> Self {
        ListObject::new()
    }
}

impl ListObject {
    pub const INITIAL_CAPACITY: usize = 4;

    pub fn new() -> Self {
        ListObject { items: Vec::with_capacity(Self::INITIAL_CAPACITY), capacity: Self::INITIAL_CAPACITY }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.items.get(index).copied()
    }

    /// Overwrite in place, returning the previous occupant.
    pub fn set(&mut self, index: usize, value: Value) -> Option<Value> {
        self.items.get_mut(index).map(|slot| std::mem::replace(slot, value))
    }

    pub fn push(&mut self, value: Value) {
        if self.items.len() == self.capacity {
            self.capacity *= 2;
            self.items.reserve_exact(self.capacity - self.items.len());
        }
        self.items.push(value);
    }

    pub fn pop(&mut self) -> Option<Value> {
        self.items.pop()
    }
}

/// Parallel key and value lists. No hashing: lookup is a linear scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DictionaryObject {
    size: usize,
    keys: ListObject,
    values: ListObject,
}

impl DictionaryObject {
    pub fn new() -> Self {
        DictionaryObject::default()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn keys(&self) -> &[Value] {
        self.keys.items()
    }

    pub fn values(&self) -> &[Value] {
        self.values.items()
    }

    pub fn check_sync(&self) -> Result<(), InternalError> {
        if self.keys.len() == self.size && self.values.len() == self.size {
            Ok(())
        } else {
            Err(InternalError::DictionaryDesync {
                keys: self.keys.len(),
                values: self.values.len(),
                size: self.size,
            })
        }
    }

    pub fn push_pair(&mut self, key: Value, value: Value) -> Result<(), InternalError> {
        self.keys.push(key);
        self.values.push(value);
        self.size += 1;
        self.check_sync()
    }

    pub fn value_at(&self, index: usize) -> Option<Value> {
        self.values.get(index)
    }

    pub fn set_value(&mut self, index: usize, value: Value) -> Result<Value, InternalError> {
        let old = self.values.set(index, value);
        self.check_sync()?;
        old.ok_or(InternalError::DictionaryDesync {
            keys: self.keys.len(),
            values: self.values.len(),
            size: self.size,
        })
    }
}

/// Field-name list of a record type. Identity, not contents, makes two
/// record types equal.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonObject {
    pub fields: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordObject {
    pub canon: Handle,
    /// Keys share the canon's field strings, in canon order.
    pub fields: DictionaryObject,
}

macro_rules! typed_access {
    ($get:ident, $get_mut:ident, $variant:ident, $ty:ty, $name:literal) => {
        pub fn $get(&self, handle: Handle) -> Result<&$ty, InternalError> {
            match self.get(handle)? {
                Object::$variant(o) => Ok(o),
                other => Err(InternalError::ObjectKind { expected: $name, found: other.kind_name() }),
            }
        }

        pub fn $get_mut(&mut self, handle: Handle) -> Result<&mut $ty, InternalError> {
            match self.get_mut(handle)? {
                Object::$variant(o) => Ok(o),
                other => Err(InternalError::ObjectKind { expected: $name, found: other.kind_name() }),
            }
        }
    };
}

impl Heap {
    typed_access!(string, string_mut, String, StringObject, "string");
    typed_access!(function, function_mut, Function, FunctionObject, "function");
    typed_access!(list, list_mut, List, ListObject, "list");
    typed_access!(dictionary, dictionary_mut, Dictionary, DictionaryObject, "dict");
    typed_access!(canon, canon_mut, Canon, CanonObject, "canon");
    typed_access!(record, record_mut, Record, RecordObject, "record");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_capacity_doubles_from_four() {
        let mut list = ListObject::new();
        assert_eq!(list.capacity(), 4);
        for i in 0..9 {
            list.push(Value::Integer(i));
        }
        assert_eq!(list.capacity(), 16);
        assert_eq!(list.get(8), Some(Value::Integer(8)));
    }

    #[test]
    fn list_set_returns_previous() {
        let mut list = ListObject::new();
        list.push(Value::Bool(true));
        assert_eq!(list.set(0, Value::None), Some(Value::Bool(true)));
        assert_eq!(list.set(5, Value::None), None);
    }

    #[test]
    fn dictionary_pairs_stay_in_sync() {
        let mut dict = DictionaryObject::new();
        dict.push_pair(Value::Integer(1), Value::Bool(true)).unwrap();
        dict.push_pair(Value::Integer(2), Value::Bool(false)).unwrap();
        assert_eq!(dict.size(), 2);
        assert_eq!(dict.keys().len(), dict.values().len());
        assert_eq!(dict.set_value(1, Value::None).unwrap(), Value::Bool(false));
    }

    #[test]
    fn dictionary_desync_is_reported() {
        let mut dict = DictionaryObject::new();
        dict.keys.push(Value::Integer(1));
        assert!(matches!(dict.check_sync(), Err(InternalError::DictionaryDesync { keys: 1, values: 0, size: 0 })));
    }

    #[test]
    fn typed_access_checks_kind() {
        let mut heap = Heap::new();
        let h = heap.alloc(Object::List(ListObject::new()));
        assert!(heap.list(h).is_ok());
        assert_eq!(
            heap.string(h).unwrap_err(),
            InternalError::ObjectKind { expected: "string", found: "list" }
        );
    }
}

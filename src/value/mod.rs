//! The value model: inline scalars plus handles into the [`Heap`].
//!
//! `Value` is `Copy`. Copying one is not a store; whoever keeps a copy
//! durably must pair it with [`Heap::retain`] and drop it with
//! [`Heap::release`].

use std::rc::Rc;

use crate::ast::TypeName;
use crate::builtin::Builtin;
use crate::bytecode::Chunk;
use crate::error::InternalError;
use crate::gc::{Handle, Heap};
use crate::vm::VariableMap;

pub mod cast;
pub mod collections;
pub mod display;
mod object;
pub mod ops;

pub use object::{
    CanonObject, DictionaryObject, FunctionObject, ListObject, Object, RecordObject, StringObject,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    None,
    Type,
    Integer,
    Float,
    Bool,
    String,
    Function,
    Builtin,
    List,
    Dictionary,
    Record,
}

impl TypeTag {
    pub fn name(self) -> &'static str {
        match self {
            TypeTag::None => "none",
            TypeTag::Type => "type",
            TypeTag::Integer => "int",
            TypeTag::Float => "float",
            TypeTag::Bool => "bool",
            TypeTag::String => "string",
            TypeTag::Function => "function",
            TypeTag::Builtin => "builtin",
            TypeTag::List => "list",
            TypeTag::Dictionary => "dict",
            TypeTag::Record => "record",
        }
    }
}

impl From<TypeName> for TypeTag {
    fn from(name: TypeName) -> Self {
        match name {
            TypeName::Int => TypeTag::Integer,
            TypeName::Float => TypeTag::Float,
            TypeName::Bool => TypeTag::Bool,
            TypeName::String => TypeTag::String,
            TypeName::List => TypeTag::List,
            TypeName::Dict => TypeTag::Dictionary,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    None,
    /// A reified type. `canon` is set only for record types.
    Type { tag: TypeTag, canon: Option<Handle> },
    Integer(i64),
    Float(f64),
    Bool(bool),
    String(Handle),
    Function(Handle),
    Builtin(Builtin),
    List(Handle),
    Dictionary(Handle),
    Record(Handle),
}

impl Value {
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Value::None => TypeTag::None,
            Value::Type { .. } => TypeTag::Type,
            Value::Integer(_) => TypeTag::Integer,
            Value::Float(_) => TypeTag::Float,
            Value::Bool(_) => TypeTag::Bool,
            Value::String(_) => TypeTag::String,
            Value::Function(_) => TypeTag::Function,
            Value::Builtin(_) => TypeTag::Builtin,
            Value::List(_) => TypeTag::List,
            Value::Dictionary(_) => TypeTag::Dictionary,
            Value::Record(_) => TypeTag::Record,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_tag().name()
    }

    /// The heap object this value refers to, if any.
    pub fn handle(&self) -> Option<Handle> {
        match *self {
            Value::String(h)
            | Value::Function(h)
            | Value::List(h)
            | Value::Dictionary(h)
            | Value::Record(h) => Some(h),
            Value::Type { canon, .. } => canon,
            Value::None
            | Value::Integer(_)
            | Value::Float(_)
            | Value::Bool(_)
            | Value::Builtin(_) => None,
        }
    }

    pub fn is_heap(&self) -> bool {
        self.handle().is_some()
    }

    /// The type of this value, as `typeof` reports it.
    pub fn type_of(&self, heap: &Heap) -> Result<Value, InternalError> {
        let canon = match *self {
            Value::Record(h) => Some(heap.record(h)?.canon),
            _ => None,
        };
        Ok(Value::Type { tag: self.type_tag(), canon })
    }

    // ---- Heap constructors. Every new object starts with refcount zero. ----

    pub fn new_string(heap: &mut Heap, bytes: impl Into<Vec<u8>>) -> Value {
        Value::String(heap.alloc(Object::String(StringObject::new(bytes))))
    }

    pub fn new_list(heap: &mut Heap) -> Value {
        Value::List(heap.alloc(Object::List(ListObject::new())))
    }

    pub fn new_dictionary(heap: &mut Heap) -> Value {
        Value::Dictionary(heap.alloc(Object::Dictionary(DictionaryObject::new())))
    }

    /// A function with an empty closure. `parameters` are name strings.
    pub fn new_function(heap: &mut Heap, parameters: Vec<Value>, body: Rc<Chunk>) -> Result<Value, InternalError> {
        for &p in &parameters {
            heap.retain(p)?;
        }
        let function = FunctionObject { parameters, closure: VariableMap::new(), body };
        Ok(Value::Function(heap.alloc(Object::Function(function))))
    }

    /// Allocate a canon and return the record type it defines.
    pub fn new_canon(heap: &mut Heap, fields: Vec<Value>) -> Result<Value, InternalError> {
        for &f in &fields {
            heap.retain(f)?;
        }
        let canon = heap.alloc(Object::Canon(CanonObject { fields }));
        Ok(Value::Type { tag: TypeTag::Record, canon: Some(canon) })
    }

    /// A record of `canon` with every field set to `none`.
    pub fn new_record(heap: &mut Heap, canon: Handle) -> Result<Value, InternalError> {
        let names = heap.canon(canon)?.fields.clone();
        let mut fields = DictionaryObject::new();
        for name in names {
            heap.retain(name)?;
            fields.push_pair(name, Value::None)?;
        }
        heap.modify_refcount(canon, 1)?;
        Ok(Value::Record(heap.alloc(Object::Record(RecordObject { canon, fields }))))
    }
}

/// Read a string value's text, for names and messages.
pub fn text_of(heap: &Heap, value: Value) -> Result<String, InternalError> {
    match value {
        Value::String(h) => Ok(heap.string(h)?.to_text()),
        other => Err(InternalError::ExpectedName { found: other.type_name() }),
    }
}

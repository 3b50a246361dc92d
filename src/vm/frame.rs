use std::rc::Rc;

use crate::bytecode::Chunk;
use crate::error::InternalError;
use crate::gc::Heap;
use crate::value::Value;

/// Ordered name → value bindings with last-write-wins update in place.
/// Lookup is a linear scan; names are unique within one map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableMap {
    entries: Vec<(Rc<str>, Value)>,
}

impl VariableMap {
    pub fn new() -> Self {
        VariableMap::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Slot index of `name`. Stable for as long as the map lives.
    pub fn index(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(n, _)| &**n == name)
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.index(name).map(|i| self.entries[i].1)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Value)> {
        self.entries.iter().map(|(n, v)| (&**n, *v))
    }

    /// Bind `name`, retaining the new value and releasing any value it
    /// replaces.
    pub fn update(&mut self, heap: &mut Heap, name: Rc<str>, value: Value) -> Result<(), InternalError> {
        heap.retain(value)?;
        match self.index(&name) {
            Some(i) => {
                let old = std::mem::replace(&mut self.entries[i].1, value);
                heap.release(old)
            }
            None => {
                self.entries.push((name, value));
                Ok(())
            }
        }
    }

    /// Shallow copy. Each entry becomes one more durable store.
    pub fn copy(&self, heap: &mut Heap) -> Result<VariableMap, InternalError> {
        for &v in self.values() {
            heap.retain(v)?;
        }
        Ok(self.clone())
    }

    /// Release every binding and empty the map.
    pub fn release_all(&mut self, heap: &mut Heap) -> Result<(), InternalError> {
        for (_, v) in self.entries.drain(..) {
            heap.release(v)?;
        }
        Ok(())
    }
}

/// Instruction span of an active loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Loop {
    pub start: usize,
    pub end: usize,
}

/// One activation record.
#[derive(Debug, Clone)]
pub struct CallFrame {
    pub variables: VariableMap,
    pub body: Rc<Chunk>,
    pub ip: usize,
    pub loops: Vec<Loop>,
}

impl CallFrame {
    pub fn new(body: Rc<Chunk>, variables: VariableMap) -> Self {
        CallFrame { variables, body, ip: 0, loops: Vec::new() }
    }

    pub fn at_end(&self) -> bool {
        self.ip >= self.body.len()
    }

    /// Release every binding before the frame goes away.
    pub fn destroy(mut self, heap: &mut Heap) -> Result<(), InternalError> {
        self.variables.release_all(heap)
    }
}

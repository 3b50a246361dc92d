//! Reference-counted object heap.
//!
//! Every heap object (strings, functions, lists, dictionaries, canons and
//! records) lives in a slot of one arena owned by the machine. A [`Handle`]
//! names a slot together with the generation it was allocated in, so a handle
//! that outlives its object is caught instead of aliasing whatever reuses the
//! slot.
//!
//! A slot's refcount counts *direct* durable stores of its handle: stack
//! slots, variable-map entries and membership in another object. Counts are
//! never propagated into children. When [`Heap::collect`] frees a container it
//! releases each child once, and children that reach zero are freed in the
//! same pass.

use log::trace;

use crate::error::InternalError;
use crate::value::{Object, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl Handle {
    pub fn index(self) -> u32 {
        self.index
    }

    fn unknown(self) -> InternalError {
        InternalError::UnknownHandle { index: self.index, generation: self.generation }
    }
}

struct Slot {
    generation: u32,
    refcount: i32,
    object: Option<Object>,
}

#[derive(Default)]
pub struct Heap {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl Heap {
    pub fn new() -> Self {
        Heap::default()
    }

    /// Track a new object. Its refcount starts at zero, so it is reclaimed by
    /// the next collection unless something stores it first.
    pub fn alloc(&mut self, object: Object) -> Handle {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.refcount = 0;
            slot.object = Some(object);
            return Handle { index, generation: slot.generation };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot { generation: 0, refcount: 0, object: Some(object) });
        Handle { index, generation: 0 }
    }

    fn slot(&self, handle: Handle) -> Option<&Slot> {
        self.slots
            .get(handle.index as usize)
            .filter(|s| s.generation == handle.generation && s.object.is_some())
    }

    fn slot_mut(&mut self, handle: Handle) -> Option<&mut Slot> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|s| s.generation == handle.generation && s.object.is_some())
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.slot(handle).is_some()
    }

    pub fn get(&self, handle: Handle) -> Result<&Object, InternalError> {
        self.slot(handle)
            .and_then(|s| s.object.as_ref())
            .ok_or_else(|| handle.unknown())
    }

    /// Mutable access, used for in-place growth of lists and dictionaries.
    pub fn get_mut(&mut self, handle: Handle) -> Result<&mut Object, InternalError> {
        self.slot_mut(handle)
            .and_then(|s| s.object.as_mut())
            .ok_or_else(|| handle.unknown())
    }

    pub fn modify_refcount(&mut self, handle: Handle, delta: i32) -> Result<(), InternalError> {
        let slot = self.slot_mut(handle).ok_or_else(|| handle.unknown())?;
        slot.refcount += delta;
        Ok(())
    }

    pub fn refcount(&self, handle: Handle) -> Result<i32, InternalError> {
        self.slot(handle).map(|s| s.refcount).ok_or_else(|| handle.unknown())
    }

    /// Record one more durable store of `value`. No-op for inline values.
    pub fn retain(&mut self, value: Value) -> Result<(), InternalError> {
        match value.handle() {
            Some(handle) => self.modify_refcount(handle, 1),
            None => Ok(()),
        }
    }

    /// Record that a durable store of `value` has been released.
    pub fn release(&mut self, value: Value) -> Result<(), InternalError> {
        match value.handle() {
            Some(handle) => self.modify_refcount(handle, -1),
            None => Ok(()),
        }
    }

    /// Number of live objects.
    pub fn allocations(&self) -> usize {
        self.live
    }

    /// Free every object whose refcount is zero or below, cascading into the
    /// children of freed containers. Survivors keep their slots. Returns the
    /// number of objects freed.
    pub fn collect(&mut self) -> usize {
        let mut worklist: Vec<Handle> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.object.is_some() && s.refcount <= 0)
            .map(|(i, s)| Handle { index: i as u32, generation: s.generation })
            .collect();

        let mut freed = 0;
        let mut children = Vec::new();
        while let Some(handle) = worklist.pop() {
            let Some(slot) = self.slot_mut(handle) else { continue };
            let Some(object) = slot.object.take() else { continue };
            slot.generation = slot.generation.wrapping_add(1);
            slot.refcount = 0;
            self.free.push(handle.index);
            self.live -= 1;
            freed += 1;
            trace!("gc: free {} #{}", object.kind_name(), handle.index);

            object.children(&mut children);
            for child in children.drain(..) {
                if let Some(slot) = self.slot_mut(child) {
                    slot.refcount -= 1;
                    if slot.refcount == 0 {
                        worklist.push(child);
                    }
                }
            }
        }
        freed
    }
}

/// Limits and collection cadence for a [`Machine`](crate::vm::Machine).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineConfig {
    /// Collect after every N executed steps. 0 leaves only the collection the
    /// driver runs between statements.
    pub gc_interval: usize,
    /// Deepest call stack allowed, counting the global frame.
    pub max_call_depth: usize,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self { gc_interval: 1, max_call_depth: 1024 }
    }
}

impl MachineConfig {
    pub fn with_gc_interval(mut self, gc_interval: usize) -> Self {
        self.gc_interval = gc_interval;
        self
    }

    pub fn with_max_call_depth(mut self, max_call_depth: usize) -> Self {
        self.max_call_depth = max_call_depth;
        self
    }
}

//! Stack-based bytecode machine.
//!
//! One evaluation stack is shared by every frame; frame 0 is the persistent
//! global frame. Each push onto the evaluation stack retains the value and
//! each pop releases it, so values that are produced and consumed within a
//! statement are reclaimed by the next collection.

use std::io::{self, Write};
use std::rc::Rc;

use log::{debug, trace};

use crate::ast::Span;
use crate::builtin::{Arity, Builtin};
use crate::bytecode::{Chunk, Op};
use crate::config::MachineConfig;
use crate::error::{InternalError, Result, UserErrorKind};
use crate::gc::{Handle, Heap};
use crate::value::display::display;
use crate::value::{cast::cast, collections, ops, text_of, TypeTag, Value};

mod frame;

pub use frame::{CallFrame, Loop, VariableMap};

pub struct Machine {
    heap: Heap,
    eval_stack: Vec<Value>,
    call_stack: Vec<CallFrame>,
    running: bool,
    config: MachineConfig,
    steps_since_collection: usize,
    out: Box<dyn Write>,
}

impl Machine {
    pub fn new(config: MachineConfig) -> Self {
        Machine::with_output(config, Box::new(io::stdout()))
    }

    /// A machine whose `print` output goes to `out`.
    pub fn with_output(config: MachineConfig, out: Box<dyn Write>) -> Self {
        let global = CallFrame::new(Rc::new(Chunk::new()), VariableMap::new());
        Machine {
            heap: Heap::new(),
            eval_stack: Vec::new(),
            call_stack: vec![global],
            running: false,
            config,
            steps_since_collection: 0,
            out,
        }
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn call_depth(&self) -> usize {
        self.call_stack.len()
    }

    pub fn eval_stack(&self) -> &[Value] {
        &self.eval_stack
    }

    /// Look up a binding in the global frame.
    pub fn global(&self, name: &str) -> Option<Value> {
        self.call_stack.first().and_then(|f| f.variables.get(name))
    }

    /// Install `chunk` as the global frame's body and start running it.
    /// Global bindings persist from earlier chunks.
    pub fn prime(&mut self, chunk: Chunk) -> Result<()> {
        if self.running {
            return Err(InternalError::PrimeWhileActive.into());
        }
        chunk.validate()?;
        let global = self.global_frame_mut()?;
        global.body = Rc::new(chunk);
        global.ip = 0;
        global.loops.clear();
        self.running = true;
        Ok(())
    }

    /// Step until the machine halts.
    pub fn run(&mut self) -> Result<()> {
        while self.running {
            self.step()?;
        }
        Ok(())
    }

    /// Execute one instruction, or one implicit return when a function body
    /// runs off its end.
    pub fn step(&mut self) -> Result<()> {
        if !self.running {
            return Ok(());
        }
        let frame = self.current_frame_mut()?;
        if frame.at_end() {
            if self.call_stack.len() == 1 {
                trace!("halt");
                self.running = false;
            } else {
                trace!("implicit return");
                self.push(Value::None)?;
                self.pop_frame()?;
            }
            return self.after_step();
        }

        let body = Rc::clone(&frame.body);
        let ip = frame.ip;
        frame.ip += 1;
        let Some(instruction) = body.get(ip) else {
            return Err(InternalError::JumpOutOfRange { at: ip, target: ip as isize, len: body.len() }.into());
        };
        trace!("[{}] {ip:04} {}", self.call_stack.len() - 1, instruction.op);
        self.execute(&instruction.op, instruction.assoc)?;
        self.after_step()
    }

    /// Reclaim every object nothing stores. Returns how many were freed.
    pub fn collect(&mut self) -> usize {
        self.steps_since_collection = 0;
        let freed = self.heap.collect();
        if freed > 0 {
            debug!("gc: freed {freed}, {} live", self.heap.allocations());
        }
        freed
    }

    /// Return to a clean state after a failed statement: unwind function
    /// frames, clear the evaluation stack and halt. Global bindings survive.
    pub fn recover(&mut self) -> Result<()> {
        while self.call_stack.len() > 1 {
            self.pop_frame()?;
        }
        while let Some(v) = self.eval_stack.pop() {
            self.heap.release(v)?;
        }
        let global = self.global_frame_mut()?;
        global.loops.clear();
        global.ip = global.body.len();
        self.running = false;
        self.collect();
        Ok(())
    }

    fn after_step(&mut self) -> Result<()> {
        self.steps_since_collection += 1;
        if self.config.gc_interval > 0 && self.steps_since_collection >= self.config.gc_interval {
            self.collect();
        }
        Ok(())
    }

    // ---- stack and frame plumbing ----

    fn push(&mut self, value: Value) -> Result<()> {
        self.heap.retain(value)?;
        self.eval_stack.push(value);
        Ok(())
    }

    fn pop(&mut self) -> Result<Value> {
        let value = self.eval_stack.pop().ok_or(InternalError::StackUnderflow)?;
        self.heap.release(value)?;
        Ok(value)
    }

    /// Pop `n` values and return them in the order they were pushed.
    fn pop_n(&mut self, n: usize) -> Result<Vec<Value>> {
        let mut values = (0..n).map(|_| self.pop()).collect::<Result<Vec<_>>>()?;
        values.reverse();
        Ok(values)
    }

    fn current_frame(&self) -> Result<&CallFrame> {
        Ok(self.call_stack.last().ok_or(InternalError::StackUnderflow)?)
    }

    fn current_frame_mut(&mut self) -> Result<&mut CallFrame> {
        Ok(self.call_stack.last_mut().ok_or(InternalError::StackUnderflow)?)
    }

    fn global_frame_mut(&mut self) -> Result<&mut CallFrame> {
        Ok(self.call_stack.first_mut().ok_or(InternalError::StackUnderflow)?)
    }

    fn pop_frame(&mut self) -> Result<()> {
        let frame = self.call_stack.pop().ok_or(InternalError::StackUnderflow)?;
        frame.destroy(&mut self.heap)?;
        Ok(())
    }

    fn active_loop(&self, op: &'static str) -> Result<Loop> {
        let frame = self.current_frame()?;
        Ok(*frame.loops.last().ok_or(InternalError::OutsideLoop { op })?)
    }

    fn jump(&mut self, offset: isize) -> Result<()> {
        let frame = self.current_frame_mut()?;
        frame.ip = frame.ip.wrapping_add_signed(offset);
        Ok(())
    }

    fn pop_name(&mut self) -> Result<Rc<str>> {
        let name = self.pop()?;
        Ok(text_of(&self.heap, name)?.into())
    }

    /// Pop `n` name strings, restoring declaration order.
    fn pop_names(&mut self, n: usize) -> Result<Vec<Value>> {
        let names = self.pop_n(n)?;
        if let Some(bad) = names.iter().find(|v| !matches!(v, Value::String(_))) {
            return Err(InternalError::ExpectedName { found: bad.type_name() }.into());
        }
        Ok(names)
    }

    // ---- dispatch ----

    fn execute(&mut self, op: &Op, assoc: Span) -> Result<()> {
        match op {
            Op::Nop => {}
            Op::Return => {
                if self.call_stack.len() == 1 {
                    return Err(UserErrorKind::ReturnOutsideFunction.at(assoc));
                }
                self.pop_frame()?;
            }
            Op::Pop => {
                self.pop()?;
            }
            Op::LoopEnd => {
                let l = self.active_loop("LOOP_END")?;
                self.current_frame_mut()?.ip = l.start;
            }
            Op::Break => {
                let frame = self.current_frame_mut()?;
                let l = frame.loops.pop().ok_or(InternalError::OutsideLoop { op: "BREAK" })?;
                frame.ip = l.end;
            }
            Op::Continue => {
                let l = self.active_loop("CONTINUE")?;
                self.current_frame_mut()?.ip = l.start;
            }
            Op::Closure => self.capture_closure()?,

            Op::Negate => {
                let a = self.pop()?;
                self.push(ops::negate(a, assoc)?)?;
            }
            Op::Not => {
                let a = self.pop()?;
                self.push(ops::not(a, assoc)?)?;
            }
            Op::Add | Op::Mult | Op::Div | Op::Eq | Op::Gt | Op::Lt | Op::And | Op::Or | Op::Index => {
                let b = self.pop()?;
                let a = self.pop()?;
                let result = self.binary(op, a, b, assoc)?;
                self.push(result)?;
            }

            Op::Push(v) => self.push(*v)?,
            Op::Get(name) => {
                let value = self
                    .current_frame()?
                    .variables
                    .get(name)
                    .or_else(|| self.global(name))
                    .ok_or_else(|| UserErrorKind::NotBound { name: name.to_string() }.at(assoc))?;
                self.push(value)?;
            }
            Op::Bind => {
                let name = self.pop_name()?;
                let value = self.pop()?;
                let frame = self.call_stack.last_mut().ok_or(InternalError::StackUnderflow)?;
                frame.variables.update(&mut self.heap, name, value)?;
            }
            Op::Call(argc) => {
                let callee = self.pop()?;
                self.call(callee, *argc, assoc)?;
            }
            Op::Jump(offset) => self.jump(*offset)?,
            Op::CondJump { offset, expected } => match self.pop()? {
                Value::Bool(b) if b == *expected => self.jump(*offset)?,
                Value::Bool(_) => {}
                other => return Err(UserErrorKind::ConditionNotBool { got: other.type_name() }.at(assoc)),
            },
            Op::SetLoop(end) => {
                let frame = self.current_frame_mut()?;
                let start = frame.ip;
                frame.loops.push(Loop { start, end: start + end });
            }
            Op::Cast(tag) => {
                let v = self.pop()?;
                let result = cast(&mut self.heap, v, *tag, assoc)?;
                self.push(result)?;
            }

            Op::CreateFunction { parameter_count, body } => {
                let parameters = self.pop_names(*parameter_count)?;
                let function = Value::new_function(&mut self.heap, parameters, Rc::clone(body))?;
                self.push(function)?;
            }
            Op::CreateList => {
                let list = Value::new_list(&mut self.heap);
                self.push(list)?;
            }
            Op::CreateString(text) => {
                let s = Value::new_string(&mut self.heap, text.as_bytes());
                self.push(s)?;
            }
            Op::CreateDictionary => {
                let dict = Value::new_dictionary(&mut self.heap);
                self.push(dict)?;
            }
            Op::CreateCanon(field_count) => {
                let fields = self.pop_names(*field_count)?;
                let ty = Value::new_canon(&mut self.heap, fields)?;
                self.push(ty)?;
            }
            Op::Append => {
                let value = self.pop()?;
                let list = self.pop()?;
                collections::append(&mut self.heap, list, value, assoc)?;
                self.push(list)?;
            }
            Op::AddPair => {
                let value = self.pop()?;
                let key = self.pop()?;
                let dict = self.pop()?;
                collections::insert(&mut self.heap, dict, key, value, assoc)?;
                self.push(dict)?;
            }
            Op::IndexAssign => {
                let key = self.pop()?;
                let collection = self.pop()?;
                let value = self.pop()?;
                collections::index_assign(&mut self.heap, collection, key, value, assoc)?;
                self.push(collection)?;
            }
        }
        Ok(())
    }

    fn binary(&mut self, op: &Op, a: Value, b: Value, assoc: Span) -> Result<Value> {
        let heap = &mut self.heap;
        match op {
            Op::Add => ops::add(heap, a, b, assoc),
            Op::Mult => ops::multiply(a, b, assoc),
            Op::Div => ops::divide(a, b, assoc),
            Op::Eq => ops::equal(heap, a, b, assoc),
            Op::Gt => ops::greater_than(heap, a, b, assoc),
            Op::Lt => ops::less_than(heap, a, b, assoc),
            Op::And => ops::and(a, b, assoc),
            Op::Or => ops::or(a, b, assoc),
            Op::Index => collections::index(heap, a, b, assoc),
            other => Err(InternalError::ObjectKind { expected: "binary operator", found: other.mnemonic() }.into()),
        }
    }

    /// CLOSURE: give the function on top of the stack a copy of the current
    /// frame's bindings.
    fn capture_closure(&mut self) -> Result<()> {
        let function = self.pop()?;
        let Value::Function(h) = function else {
            return Err(InternalError::ObjectKind { expected: "function", found: function.type_name() }.into());
        };
        let frame = self.call_stack.last().ok_or(InternalError::StackUnderflow)?;
        let captured = frame.variables.copy(&mut self.heap)?;
        let mut old = std::mem::replace(&mut self.heap.function_mut(h)?.closure, captured);
        old.release_all(&mut self.heap)?;
        self.push(function)
    }

    fn call(&mut self, callee: Value, argc: usize, assoc: Span) -> Result<()> {
        match callee {
            Value::Function(h) => self.call_function(callee, h, argc, assoc),
            Value::Builtin(builtin) => self.call_builtin(builtin, argc, assoc),
            Value::Type { tag: TypeTag::Record, canon: Some(canon) } => self.construct(canon, argc, assoc),
            other => Err(UserErrorKind::NotCallable { kind: other.type_name() }.at(assoc)),
        }
    }

    fn call_function(&mut self, callee: Value, h: Handle, argc: usize, assoc: Span) -> Result<()> {
        if self.call_stack.len() >= self.config.max_call_depth {
            return Err(UserErrorKind::StackOverflow { depth: self.call_stack.len() }.at(assoc));
        }
        let function = self.heap.function(h)?;
        if function.parameters.len() != argc {
            let expected = function.parameters.len();
            return Err(UserErrorKind::ArgumentCount { callee: display(&self.heap, callee)?, expected, got: argc }
                .at(assoc));
        }
        let parameters = function.parameters.clone();
        let body = Rc::clone(&function.body);
        let closure = function.closure.clone();

        let mut variables = closure.copy(&mut self.heap)?;
        let args = self.pop_n(argc)?;
        for (name, arg) in parameters.into_iter().zip(args) {
            let name: Rc<str> = text_of(&self.heap, name)?.into();
            variables.update(&mut self.heap, name, arg)?;
        }
        trace!("call {} with {argc} argument(s)", display(&self.heap, callee)?);
        self.call_stack.push(CallFrame::new(body, variables));
        Ok(())
    }

    fn call_builtin(&mut self, builtin: Builtin, argc: usize, assoc: Span) -> Result<()> {
        match builtin.arity() {
            Arity::Fixed(expected) if expected != argc => {
                return Err(UserErrorKind::ArgumentCount { callee: builtin.name().to_string(), expected, got: argc }
                    .at(assoc));
            }
            _ => {}
        }
        let args = self.pop_n(argc)?;
        let result = builtin.call(&mut self.heap, &mut *self.out, &args, assoc)?;
        self.push(result)
    }

    fn construct(&mut self, canon: Handle, argc: usize, assoc: Span) -> Result<()> {
        let args = self.pop_n(argc)?;
        let record = collections::construct_record(&mut self.heap, canon, &args, assoc)?;
        self.push(record)
    }
}

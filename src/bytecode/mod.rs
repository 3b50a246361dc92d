//! Flat stack-machine instruction set.
//!
//! Jump and loop offsets are relative to the instruction pointer *after* the
//! jumping instruction has been decoded.

use std::fmt;
use std::rc::Rc;

use crate::ast::Span;
use crate::error::InternalError;
use crate::value::display::format_float;
use crate::value::{TypeTag, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Nop,
    Return,
    Pop,
    LoopEnd,
    Break,
    Continue,
    Closure,

    Negate,
    Add,
    Mult,
    Div,
    Not,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Index,

    /// Push an inline constant. Never carries a heap value.
    Push(Value),
    Get(Rc<str>),
    /// Pop a name string, then a value, and bind the value to the name.
    Bind,
    Call(usize),
    Jump(isize),
    CondJump { offset: isize, expected: bool },
    /// Enter a loop spanning `[ip, ip + end)`.
    SetLoop(usize),
    Cast(TypeTag),

    CreateFunction { parameter_count: usize, body: Rc<Chunk> },
    CreateList,
    CreateString(Rc<str>),
    CreateDictionary,
    CreateCanon(usize),
    Append,
    AddPair,
    IndexAssign,
}

impl Op {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Op::Nop => "NOP",
            Op::Return => "RETURN",
            Op::Pop => "POP",
            Op::LoopEnd => "LOOP_END",
            Op::Break => "BREAK",
            Op::Continue => "CONTINUE",
            Op::Closure => "CLOSURE",
            Op::Negate => "NEGATE",
            Op::Add => "ADD",
            Op::Mult => "MULT",
            Op::Div => "DIV",
            Op::Not => "NOT",
            Op::Eq => "EQ",
            Op::Gt => "GT",
            Op::Lt => "LT",
            Op::And => "AND",
            Op::Or => "OR",
            Op::Index => "INDEX",
            Op::Push(_) => "PUSH",
            Op::Get(_) => "GET",
            Op::Bind => "BIND",
            Op::Call(_) => "CALL",
            Op::Jump(_) => "JUMP",
            Op::CondJump { .. } => "CONDJUMP",
            Op::SetLoop(_) => "SET_LOOP",
            Op::Cast(_) => "CAST",
            Op::CreateFunction { .. } => "CREATE_FUNCTION",
            Op::CreateList => "CREATE_LIST",
            Op::CreateString(_) => "CREATE_STRING",
            Op::CreateDictionary => "CREATE_DICTIONARY",
            Op::CreateCanon(_) => "CREATE_CANON",
            Op::Append => "APPEND",
            Op::AddPair => "ADD_PAIR",
            Op::IndexAssign => "INDEX_ASSIGN",
        }
    }
}

fn constant_text(value: &Value) -> String {
    match value {
        Value::None => "none".into(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => format_float(*f),
        Value::Bool(b) => b.to_string(),
        Value::Builtin(b) => format!("<builtin {}>", b.name()),
        Value::Type { tag, .. } => tag.name().into(),
        other => format!("<{}>", other.type_name()),
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.mnemonic();
        match self {
            Op::Push(v) => write!(f, "{name} {}", constant_text(v)),
            Op::Get(n) => write!(f, "{name} {n}"),
            Op::CreateString(s) => write!(f, "{name} {s:?}"),
            Op::Call(n) | Op::SetLoop(n) | Op::CreateCanon(n) => write!(f, "{name} {n}"),
            Op::Jump(o) => write!(f, "{name} {o:+}"),
            Op::CondJump { offset, expected } => write!(f, "{name} {offset:+} if {expected}"),
            Op::Cast(t) => write!(f, "{name} {}", t.name()),
            Op::CreateFunction { parameter_count, .. } => write!(f, "{name} {parameter_count}"),
            _ => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub op: Op,
    /// Source association, used only for error reporting.
    pub assoc: Span,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chunk {
    pub code: Vec<Instruction>,
}

impl Chunk {
    pub fn new() -> Self {
        Chunk::default()
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn get(&self, ip: usize) -> Option<&Instruction> {
        self.code.get(ip)
    }

    pub fn emit(&mut self, op: Op, assoc: Span) -> usize {
        self.code.push(Instruction { op, assoc });
        self.code.len() - 1
    }

    /// Point the jump or loop at `at` to the current end of the chunk.
    pub fn patch(&mut self, at: usize) {
        let distance = self.code.len() - (at + 1);
        match &mut self.code[at].op {
            Op::Jump(offset) | Op::CondJump { offset, .. } => *offset = distance as isize,
            Op::SetLoop(end) => *end = distance,
            _ => {}
        }
    }

    /// Check every jump target and loop end, recursing into function bodies.
    pub fn validate(&self) -> Result<(), InternalError> {
        let len = self.code.len();
        for (at, instruction) in self.code.iter().enumerate() {
            let next = at as isize + 1;
            // an offset that overflows is reported as the largest target
            let target = match &instruction.op {
                Op::Jump(offset) | Op::CondJump { offset, .. } => {
                    Some(next.checked_add(*offset).unwrap_or(isize::MAX))
                }
                Op::SetLoop(end) => Some(
                    isize::try_from(*end)
                        .ok()
                        .and_then(|end| next.checked_add(end))
                        .unwrap_or(isize::MAX),
                ),
                Op::Push(v) if v.is_heap() => return Err(InternalError::HeapConstant { at }),
                Op::CreateFunction { body, .. } => {
                    body.validate()?;
                    None
                }
                _ => None,
            };
            match target {
                Some(target) if !(0..=len as isize).contains(&target) => {
                    return Err(InternalError::JumpOutOfRange { at, target, len });
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let pad = "    ".repeat(depth);
        for (at, instruction) in self.code.iter().enumerate() {
            writeln!(f, "{pad}{at:04}  {}", instruction.op)?;
            if let Op::CreateFunction { body, .. } = &instruction.op {
                body.write_indented(f, depth + 1)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}

//! Runs source text through the whole pipeline, one top-level statement
//! at a time.
//!
//! Each statement is lowered, compiled to its own chunk, primed into the
//! machine's persistent global frame and stepped until the machine halts.
//! Global bindings carry over from one statement to the next, so a REPL
//! and a script file share the same code path.

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use log::debug;

use crate::ast::{Spanned, Stmt};
use crate::compiler::{self, CompileError};
use crate::config::MachineConfig;
use crate::error::Error;
use crate::lexer::{self, LexError};
use crate::lowering;
use crate::parser::{ParseError, Parser};
use crate::vm::Machine;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Runtime(#[from] Error),
}

impl SessionError {
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::Lex(e) => e.code,
            SessionError::Parse(e) => e.code,
            SessionError::Compile(e) => e.code(),
            SessionError::Runtime(e) => e.code(),
        }
    }

    /// Interpreter bugs, as opposed to faults in the script.
    pub fn is_internal(&self) -> bool {
        match self {
            SessionError::Runtime(e) => e.is_internal(),
            SessionError::Compile(CompileError::Unlowered { .. }) => true,
            _ => false,
        }
    }

    /// Process exit status for this failure.
    pub fn exit_code(&self) -> i32 {
        if self.is_internal() { 2 } else { 1 }
    }
}

pub struct Session {
    machine: Machine,
}

impl Session {
    pub fn new(config: MachineConfig) -> Self {
        Session { machine: Machine::new(config) }
    }

    pub fn with_output(config: MachineConfig, out: Box<dyn Write>) -> Self {
        Session { machine: Machine::with_output(config, out) }
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut Machine {
        &mut self.machine
    }

    /// Run every statement in `source`, stopping at the first error.
    /// Statements before the failing one have already taken effect.
    pub fn run_source(&mut self, source: &str) -> Result<(), SessionError> {
        let tokens = lexer::lex(source)?;
        let mut parser = Parser::new(tokens);
        while let Some(stmt) = parser.next_statement() {
            self.execute(stmt?)?;
        }
        Ok(())
    }

    /// Lower, compile and run one top-level statement to completion.
    pub fn execute(&mut self, stmt: Spanned<Stmt>) -> Result<(), SessionError> {
        let lowered = lowering::lower_stmt(stmt);
        let chunk = compiler::compile(std::slice::from_ref(&lowered))?;
        debug!("compiled statement at {}..{} into {} instruction(s)", lowered.span.start, lowered.span.end, chunk.len());
        self.machine.prime(chunk)?;
        self.machine.run()?;
        self.machine.collect();
        Ok(())
    }

    /// Put the machine back in a usable state after a failed statement.
    pub fn recover(&mut self) -> Result<(), SessionError> {
        self.machine.recover()?;
        Ok(())
    }
}

/// A cloneable in-memory sink, for capturing `print` output.
#[derive(Debug, Clone, Default)]
pub struct SharedOutput(Rc<RefCell<Vec<u8>>>);

impl SharedOutput {
    pub fn new() -> Self {
        SharedOutput::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `source` in a fresh session and return what it printed along with
/// how it ended.
pub fn run_to_string(source: &str, config: MachineConfig) -> (String, Result<(), SessionError>) {
    let out = SharedOutput::new();
    let mut session = Session::with_output(config, Box::new(out.clone()));
    let result = session.run_source(source);
    (out.contents(), result)
}

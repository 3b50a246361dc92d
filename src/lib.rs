//! winter: a small dynamically-typed scripting language.
//!
//! Source goes through [`lexer`] → [`parser`] → [`lowering`] → [`compiler`]
//! and runs on the reference-counted stack machine in [`vm`]. The
//! [`driver`] module strings these together one statement at a time.

pub mod ast;
pub mod builtin;
pub mod bytecode;
pub mod compiler;
pub mod config;
pub mod diagnostic;
pub mod driver;
pub mod error;
pub mod gc;
pub mod lexer;
pub mod logging;
pub mod lowering;
pub mod parser;
pub mod value;
pub mod vm;

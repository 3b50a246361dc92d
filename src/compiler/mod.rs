//! Lowered AST → flat stack bytecode.

use std::rc::Rc;

use crate::ast::*;
use crate::builtin::Builtin;
use crate::bytecode::{Chunk, Op};
use crate::value::{TypeTag, Value};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    #[error("'{keyword}' outside of a loop")]
    OutsideLoop { keyword: &'static str, span: Span },
    #[error("duplicate {what} '{name}'")]
    DuplicateName { what: &'static str, name: String, span: Span },
    #[error("'{construct}' must be lowered before compilation")]
    Unlowered { construct: &'static str, span: Span },
}

impl CompileError {
    pub fn code(&self) -> &'static str {
        match self {
            CompileError::OutsideLoop { .. } => "WIN-C001",
            CompileError::DuplicateName { .. } => "WIN-C002",
            CompileError::Unlowered { .. } => "WIN-C003",
        }
    }

    pub fn span(&self) -> Span {
        match self {
            CompileError::OutsideLoop { span, .. }
            | CompileError::DuplicateName { span, .. }
            | CompileError::Unlowered { span, .. } => *span,
        }
    }
}

struct Compiler {
    chunk: Chunk,
    loop_depth: usize,
    /// Compiling a function body. Only functions declared here close over
    /// the enclosing frame; top-level functions read globals live.
    nested: bool,
    errors: Vec<CompileError>,
}

impl Compiler {
    fn new() -> Self {
        Compiler { chunk: Chunk::new(), loop_depth: 0, nested: false, errors: Vec::new() }
    }

    fn function_body() -> Self {
        Compiler { nested: true, ..Compiler::new() }
    }

    fn emit(&mut self, op: Op, span: Span) -> usize {
        self.chunk.emit(op, span)
    }

    fn emit_name(&mut self, name: &str, span: Span) {
        self.emit(Op::CreateString(name.into()), span);
    }

    fn finish(self) -> Result<Chunk, CompileError> {
        match self.errors.into_iter().next() {
            Some(e) => Err(e),
            None => Ok(self.chunk),
        }
    }

    fn compile_body(&mut self, stmts: &[Spanned<Stmt>]) {
        for stmt in stmts {
            self.compile_stmt(stmt);
        }
    }

    fn compile_stmt(&mut self, stmt: &Spanned<Stmt>) {
        let span = stmt.span;
        match &stmt.node {
            Stmt::Expr(e) => {
                self.compile_expr(e);
                self.emit(Op::Pop, span);
            }
            Stmt::Assign { target, value } => {
                self.compile_expr(value);
                match target {
                    Target::Name(name) => {
                        self.emit_name(name, span);
                        self.emit(Op::Bind, span);
                    }
                    Target::Index { collection, index } => {
                        self.compile_expr(collection);
                        self.compile_expr(index);
                        self.emit(Op::IndexAssign, span);
                        self.emit(Op::Pop, span);
                    }
                    Target::Field { object, field } => {
                        self.compile_expr(object);
                        self.emit_name(field, span);
                        self.emit(Op::IndexAssign, span);
                        self.emit(Op::Pop, span);
                    }
                }
            }
            Stmt::Return(value) => {
                match value {
                    Some(e) => self.compile_expr(e),
                    None => {
                        self.emit(Op::Push(Value::None), span);
                    }
                }
                self.emit(Op::Return, span);
            }
            Stmt::If { branches, else_body } => {
                let mut end_jumps = Vec::with_capacity(branches.len());
                for branch in branches {
                    self.compile_expr(&branch.condition);
                    let failure = self.emit(Op::CondJump { offset: 0, expected: false }, branch.condition.span);
                    self.compile_body(&branch.body);
                    end_jumps.push(self.emit(Op::Jump(0), span));
                    self.chunk.patch(failure);
                }
                if let Some(body) = else_body {
                    self.compile_body(body);
                }
                for jump in end_jumps {
                    self.chunk.patch(jump);
                }
            }
            Stmt::Loop { body } => {
                let set_loop = self.emit(Op::SetLoop(0), span);
                self.loop_depth += 1;
                self.compile_body(body);
                self.loop_depth -= 1;
                self.emit(Op::LoopEnd, span);
                self.chunk.patch(set_loop);
            }
            Stmt::While { .. } => self.errors.push(CompileError::Unlowered { construct: "while", span }),
            Stmt::Break => self.compile_jump(Op::Break, "break", span),
            Stmt::Continue => self.compile_jump(Op::Continue, "continue", span),
            Stmt::FuncDecl { name, params, body } => {
                self.check_unique("parameter", params, span);
                for param in params {
                    self.emit_name(param, span);
                }
                let mut inner = Compiler::function_body();
                inner.compile_body(body);
                match inner.finish() {
                    Ok(chunk) => {
                        self.emit(Op::CreateFunction { parameter_count: params.len(), body: Rc::new(chunk) }, span);
                    }
                    Err(e) => self.errors.push(e),
                }
                if self.nested {
                    self.emit(Op::Closure, span);
                }
                self.emit_name(name, span);
                self.emit(Op::Bind, span);
            }
            Stmt::RecordDecl { name, fields } => {
                self.check_unique("field", fields, span);
                for field in fields {
                    self.emit_name(field, span);
                }
                self.emit(Op::CreateCanon(fields.len()), span);
                self.emit_name(name, span);
                self.emit(Op::Bind, span);
            }
        }
    }

    fn compile_jump(&mut self, op: Op, keyword: &'static str, span: Span) {
        if self.loop_depth == 0 {
            self.errors.push(CompileError::OutsideLoop { keyword, span });
        } else {
            self.emit(op, span);
        }
    }

    fn check_unique(&mut self, what: &'static str, names: &[String], span: Span) {
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                self.errors.push(CompileError::DuplicateName { what, name: name.clone(), span });
                return;
            }
        }
    }

    fn compile_expr(&mut self, expr: &Spanned<Expr>) {
        let span = expr.span;
        match &expr.node {
            Expr::Literal(lit) => {
                let value = match lit {
                    Literal::None => Value::None,
                    Literal::Integer(i) => Value::Integer(*i),
                    Literal::Float(f) => Value::Float(*f),
                    Literal::Bool(b) => Value::Bool(*b),
                };
                self.emit(Op::Push(value), span);
            }
            Expr::Str(s) => self.emit_name(s, span),
            Expr::Var(name) => match Builtin::from_name(name) {
                Some(builtin) => {
                    self.emit(Op::Push(Value::Builtin(builtin)), span);
                }
                None => {
                    self.emit(Op::Get(name.as_str().into()), span);
                }
            },
            Expr::Type(name) => {
                self.emit(Op::Push(Value::Type { tag: TypeTag::from(*name), canon: None }), span);
            }
            Expr::Call { callee, args } => {
                for arg in args {
                    self.compile_expr(arg);
                }
                self.compile_expr(callee);
                self.emit(Op::Call(args.len()), span);
            }
            Expr::Unary { op, operand } => {
                self.compile_expr(operand);
                match op {
                    Operator::Negate => {
                        self.emit(Op::Negate, span);
                    }
                    Operator::Not => {
                        self.emit(Op::Not, span);
                    }
                    other => self.errors.push(CompileError::Unlowered { construct: other.symbol(), span }),
                }
            }
            Expr::Binary { op, left, right } => {
                self.compile_expr(left);
                self.compile_expr(right);
                let op = match op {
                    Operator::Add => Op::Add,
                    Operator::Multiply => Op::Mult,
                    Operator::Divide => Op::Div,
                    Operator::Equal => Op::Eq,
                    Operator::Greater => Op::Gt,
                    Operator::Less => Op::Lt,
                    Operator::And => Op::And,
                    Operator::Or => Op::Or,
                    other => {
                        self.errors.push(CompileError::Unlowered { construct: other.symbol(), span });
                        return;
                    }
                };
                self.emit(op, span);
            }
            Expr::Index { collection, index } => {
                self.compile_expr(collection);
                self.compile_expr(index);
                self.emit(Op::Index, span);
            }
            Expr::Field { object, field } => {
                self.compile_expr(object);
                self.emit_name(field, span);
                self.emit(Op::Index, span);
            }
            Expr::Cast { expr: inner, target } => {
                self.compile_expr(inner);
                self.emit(Op::Cast(TypeTag::from(*target)), span);
            }
            Expr::List(items) => {
                self.emit(Op::CreateList, span);
                for item in items {
                    self.compile_expr(item);
                    self.emit(Op::Append, item.span);
                }
            }
            Expr::Dict(pairs) => {
                self.emit(Op::CreateDictionary, span);
                for (key, value) in pairs {
                    self.compile_expr(key);
                    self.compile_expr(value);
                    self.emit(Op::AddPair, key.span.merge(value.span));
                }
            }
        }
    }
}

/// Compile one or more lowered top-level statements into a chunk for the
/// global frame.
pub fn compile(stmts: &[Spanned<Stmt>]) -> Result<Chunk, CompileError> {
    let mut compiler = Compiler::new();
    compiler.compile_body(stmts);
    compiler.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lowering::lower_program;
    use crate::parser::parse_str;

    fn compile_src(source: &str) -> Result<Chunk, CompileError> {
        compile(&lower_program(parse_str(source).unwrap()))
    }

    fn ops(source: &str) -> Vec<Op> {
        compile_src(source).unwrap().code.into_iter().map(|i| i.op).collect()
    }

    #[test]
    fn assignment_binds_by_name_from_stack() {
        assert_eq!(
            ops("x = 5;"),
            vec![Op::Push(Value::Integer(5)), Op::CreateString("x".into()), Op::Bind]
        );
    }

    #[test]
    fn builtin_names_compile_to_constants() {
        assert_eq!(
            ops("print(x);"),
            vec![
                Op::Get("x".into()),
                Op::Push(Value::Builtin(Builtin::Print)),
                Op::Call(1),
                Op::Pop
            ]
        );
    }

    #[test]
    fn subtraction_compiles_through_negate() {
        assert_eq!(
            ops("a - 1;"),
            vec![Op::Get("a".into()), Op::Push(Value::Integer(1)), Op::Negate, Op::Add, Op::Pop]
        );
    }

    #[test]
    fn if_else_jumps_are_patched() {
        let chunk = compile_src("if a { b; } else { c; }").unwrap();
        let code: Vec<Op> = chunk.code.iter().map(|i| i.op.clone()).collect();
        assert_eq!(
            code,
            vec![
                Op::Get("a".into()),
                Op::CondJump { offset: 3, expected: false },
                Op::Get("b".into()),
                Op::Pop,
                Op::Jump(2),
                Op::Get("c".into()),
                Op::Pop,
            ]
        );
        assert!(chunk.validate().is_ok());
    }

    #[test]
    fn loop_spans_its_body() {
        assert_eq!(
            ops("loop { break; }"),
            vec![Op::SetLoop(2), Op::Break, Op::LoopEnd]
        );
    }

    #[test]
    fn while_is_compiled_as_guarded_loop() {
        let chunk = compile_src("while i < 3 { i = i + 1; }").unwrap();
        assert_eq!(chunk.code[0].op, Op::SetLoop(chunk.len() - 1));
        assert!(chunk.code.iter().any(|i| i.op == Op::Break));
        assert_eq!(chunk.code.last().map(|i| &i.op), Some(&Op::LoopEnd));
        assert!(chunk.validate().is_ok());
    }

    #[test]
    fn top_level_function_binds_without_capture() {
        let code = ops("func add(a, b) { return a + b; }");
        assert_eq!(code[0], Op::CreateString("a".into()));
        assert_eq!(code[1], Op::CreateString("b".into()));
        let Op::CreateFunction { parameter_count: 2, body } = &code[2] else {
            panic!("expected CREATE_FUNCTION, got {:?}", code[2]);
        };
        assert_eq!(body.code.last().map(|i| &i.op), Some(&Op::Return));
        assert_eq!(&code[3..], &[Op::CreateString("add".into()), Op::Bind]);
    }

    #[test]
    fn nested_function_captures_enclosing_frame() {
        let code = ops("func outer(n) { func inner() { return n; } return inner; }");
        let Op::CreateFunction { body, .. } = &code[1] else {
            panic!("expected CREATE_FUNCTION, got {:?}", code[1]);
        };
        let inner: Vec<&Op> = body.code.iter().map(|i| &i.op).collect();
        assert!(matches!(inner[0], Op::CreateFunction { parameter_count: 0, .. }));
        assert_eq!(inner[1..4], [&Op::Closure, &Op::CreateString("inner".into()), &Op::Bind]);
        // a loop at top level does not make a declaration nested
        assert!(!ops("loop { func f() { } break; }").contains(&Op::Closure));
    }

    #[test]
    fn record_declaration_creates_canon() {
        assert_eq!(
            ops("record Point { x, y }"),
            vec![
                Op::CreateString("x".into()),
                Op::CreateString("y".into()),
                Op::CreateCanon(2),
                Op::CreateString("Point".into()),
                Op::Bind,
            ]
        );
    }

    #[test]
    fn field_access_and_assignment() {
        assert_eq!(
            ops("p.x = p.y;"),
            vec![
                Op::Get("p".into()),
                Op::CreateString("y".into()),
                Op::Index,
                Op::Get("p".into()),
                Op::CreateString("x".into()),
                Op::IndexAssign,
                Op::Pop,
            ]
        );
    }

    #[test]
    fn collection_literals() {
        assert_eq!(
            ops("{1: [true]};"),
            vec![
                Op::CreateDictionary,
                Op::Push(Value::Integer(1)),
                Op::CreateList,
                Op::Push(Value::Bool(true)),
                Op::Append,
                Op::AddPair,
                Op::Pop,
            ]
        );
    }

    #[test]
    fn break_outside_loop_is_rejected() {
        let err = compile_src("break;").unwrap_err();
        assert_eq!(err.code(), "WIN-C001");
        // a loop in the caller does not cover a function body
        let err = compile_src("loop { func f() { continue; } break; }").unwrap_err();
        assert!(matches!(err, CompileError::OutsideLoop { keyword: "continue", .. }));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        assert_eq!(compile_src("func f(a, a) { }").unwrap_err().code(), "WIN-C002");
        assert_eq!(compile_src("record R { x, x }").unwrap_err().code(), "WIN-C002");
    }

    #[test]
    fn unlowered_nodes_are_rejected() {
        let stmts = parse_str("a != b;").unwrap();
        assert_eq!(compile(&stmts).unwrap_err().code(), "WIN-C003");
    }

    #[test]
    fn instructions_carry_statement_spans() {
        let source = "x = 1;\ny = z;";
        let chunk = compile_src(source).unwrap();
        let get = chunk.code.iter().find(|i| matches!(i.op, Op::Get(_))).unwrap();
        assert_eq!(&source[get.assoc.start..get.assoc.end], "z");
    }
}

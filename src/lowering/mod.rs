//! Desugaring pass run between parsing and compilation.
//!
//! - `a - b`  → `a + -b`
//! - `a != b` → `!(a == b)`
//! - `a <= b` → `!(a > b)`
//! - `a >= b` → `!(a < b)`
//! - `while c { body }` → `loop { if !c { break; } body }`
//!
//! The compiler only ever sees the core operators and `loop`.

use crate::ast::*;

pub fn lower_program(program: Vec<Spanned<Stmt>>) -> Vec<Spanned<Stmt>> {
    program.into_iter().map(lower_stmt).collect()
}

pub fn lower_stmt(stmt: Spanned<Stmt>) -> Spanned<Stmt> {
    let span = stmt.span;
    let node = match stmt.node {
        Stmt::Expr(e) => Stmt::Expr(lower_expr(e)),
        Stmt::Assign { target, value } => Stmt::Assign { target: lower_target(target), value: lower_expr(value) },
        Stmt::Return(e) => Stmt::Return(e.map(lower_expr)),
        Stmt::If { branches, else_body } => Stmt::If {
            branches: branches
                .into_iter()
                .map(|b| Branch { condition: lower_expr(b.condition), body: lower_program(b.body) })
                .collect(),
            else_body: else_body.map(lower_program),
        },
        Stmt::Loop { body } => Stmt::Loop { body: lower_program(body) },
        Stmt::While { condition, body } => {
            let cond_span = condition.span;
            let exit = Spanned::new(
                Stmt::If {
                    branches: vec![Branch {
                        condition: negated(lower_expr(condition)),
                        body: vec![Spanned::new(Stmt::Break, cond_span)],
                    }],
                    else_body: None,
                },
                cond_span,
            );
            let mut lowered = vec![exit];
            lowered.extend(lower_program(body));
            Stmt::Loop { body: lowered }
        }
        Stmt::FuncDecl { name, params, body } => Stmt::FuncDecl { name, params, body: lower_program(body) },
        other @ (Stmt::Break | Stmt::Continue | Stmt::RecordDecl { .. }) => other,
    };
    Spanned::new(node, span)
}

fn lower_target(target: Target) -> Target {
    match target {
        Target::Name(n) => Target::Name(n),
        Target::Index { collection, index } => {
            Target::Index { collection: lower_expr(collection), index: lower_expr(index) }
        }
        Target::Field { object, field } => Target::Field { object: lower_expr(object), field },
    }
}

fn negated(expr: Spanned<Expr>) -> Spanned<Expr> {
    let span = expr.span;
    Spanned::new(Expr::Unary { op: Operator::Not, operand: Box::new(expr) }, span)
}

fn boxed(expr: Box<Spanned<Expr>>) -> Box<Spanned<Expr>> {
    Box::new(lower_expr(*expr))
}

pub fn lower_expr(expr: Spanned<Expr>) -> Spanned<Expr> {
    let span = expr.span;
    let node = match expr.node {
        Expr::Binary { op, left, right } => {
            let (left, right) = (boxed(left), boxed(right));
            match op {
                Operator::Subtract => {
                    let right_span = right.span;
                    let negative = Spanned::new(Expr::Unary { op: Operator::Negate, operand: right }, right_span);
                    Expr::Binary { op: Operator::Add, left, right: Box::new(negative) }
                }
                Operator::NotEqual => return negated(Spanned::new(Expr::Binary { op: Operator::Equal, left, right }, span)),
                Operator::LessEqual => {
                    return negated(Spanned::new(Expr::Binary { op: Operator::Greater, left, right }, span));
                }
                Operator::GreaterEqual => {
                    return negated(Spanned::new(Expr::Binary { op: Operator::Less, left, right }, span));
                }
                op => Expr::Binary { op, left, right },
            }
        }
        Expr::Unary { op, operand } => Expr::Unary { op, operand: boxed(operand) },
        Expr::Call { callee, args } => Expr::Call { callee: boxed(callee), args: args.into_iter().map(lower_expr).collect() },
        Expr::Index { collection, index } => Expr::Index { collection: boxed(collection), index: boxed(index) },
        Expr::Field { object, field } => Expr::Field { object: boxed(object), field },
        Expr::Cast { expr, target } => Expr::Cast { expr: boxed(expr), target },
        Expr::List(items) => Expr::List(items.into_iter().map(lower_expr).collect()),
        Expr::Dict(pairs) => Expr::Dict(pairs.into_iter().map(|(k, v)| (lower_expr(k), lower_expr(v))).collect()),
        leaf @ (Expr::Literal(_) | Expr::Str(_) | Expr::Var(_) | Expr::Type(_)) => leaf,
    };
    Spanned::new(node, span)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> Spanned<Expr> {
        Spanned::unknown(Expr::Var(name.into()))
    }

    fn binary(op: Operator, l: Spanned<Expr>, r: Spanned<Expr>) -> Spanned<Expr> {
        Spanned::unknown(Expr::Binary { op, left: Box::new(l), right: Box::new(r) })
    }

    #[test]
    fn subtract_becomes_add_negate() {
        let lowered = lower_expr(binary(Operator::Subtract, var("a"), var("b")));
        let Expr::Binary { op: Operator::Add, right, .. } = lowered.node else {
            panic!("expected add");
        };
        assert!(matches!(right.node, Expr::Unary { op: Operator::Negate, .. }));
    }

    #[test]
    fn comparisons_become_negated_core_ops() {
        for (op, core) in [
            (Operator::NotEqual, Operator::Equal),
            (Operator::LessEqual, Operator::Greater),
            (Operator::GreaterEqual, Operator::Less),
        ] {
            let lowered = lower_expr(binary(op, var("a"), var("b")));
            let Expr::Unary { op: Operator::Not, operand } = lowered.node else {
                panic!("expected not for {op:?}");
            };
            assert!(matches!(operand.node, Expr::Binary { op, .. } if op == core));
        }
    }

    #[test]
    fn nested_operands_are_lowered() {
        let inner = binary(Operator::Subtract, var("b"), var("c"));
        let call = Spanned::unknown(Expr::Call { callee: Box::new(var("f")), args: vec![inner] });
        let lowered = lower_expr(call);
        let Expr::Call { args, .. } = lowered.node else { panic!() };
        assert!(matches!(args[0].node, Expr::Binary { op: Operator::Add, .. }));
    }

    #[test]
    fn while_becomes_loop_with_guarded_break() {
        let stmt = Spanned::unknown(Stmt::While {
            condition: var("running"),
            body: vec![Spanned::unknown(Stmt::Expr(var("tick")))],
        });
        let Stmt::Loop { body } = lower_stmt(stmt).node else { panic!("expected loop") };
        assert_eq!(body.len(), 2);
        let Stmt::If { branches, else_body: None } = &body[0].node else { panic!("expected guard") };
        assert!(matches!(branches[0].condition.node, Expr::Unary { op: Operator::Not, .. }));
        assert_eq!(branches[0].body[0].node, Stmt::Break);
    }
}

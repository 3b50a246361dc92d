use crate::ast::*;
use crate::lexer::Token;

pub struct Parser {
    tokens: Vec<(Token, Span)>,
    pos: usize,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("Parse error at token {position}: {message}")]
pub struct ParseError {
    pub code: &'static str,
    pub position: usize,
    pub span: Span,
    pub message: String,
}

type Result<T> = std::result::Result<T, ParseError>;

const MAX_ERRORS: usize = 20;

impl Parser {
    pub fn new(tokens: Vec<(Token, Span)>) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn peek_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|(_, s)| *s)
            .unwrap_or(Span::UNKNOWN)
    }

    /// Span of the most recently consumed token.
    fn prev_span(&self) -> Span {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|(_, s)| *s)
            .unwrap_or(Span::UNKNOWN)
    }

    fn advance(&mut self) -> Option<&Token> {
        let tok = self.tokens.get(self.pos).map(|(t, _)| t);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<Span> {
        match self.peek() {
            Some(tok) if tok == expected => {
                let span = self.peek_span();
                self.advance();
                Ok(span)
            }
            Some(tok) => {
                let message = format!("expected {}, got {}", expected.describe(), tok.describe());
                Err(self.error("WIN-P003", message))
            }
            None => Err(self.error("WIN-P002", format!("expected {}, got end of input", expected.describe()))),
        }
    }

    fn expect_name(&mut self) -> Result<String> {
        match self.peek().cloned() {
            Some(Token::Name(name)) => {
                self.advance();
                Ok(name)
            }
            Some(tok) => Err(self.error("WIN-P004", format!("expected a name, got {}", tok.describe()))),
            None => Err(self.error("WIN-P002", "expected a name, got end of input".into())),
        }
    }

    fn error(&self, code: &'static str, message: String) -> ParseError {
        ParseError { code, position: self.pos, span: self.peek_span(), message }
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    // ---- Top-level parsing ----

    /// Parse the next statement, or `None` once the input is exhausted.
    pub fn next_statement(&mut self) -> Option<Result<Spanned<Stmt>>> {
        if self.at_end() {
            None
        } else {
            Some(self.parse_stmt())
        }
    }

    /// Parse everything, recovering at statement boundaries so several
    /// errors can be reported at once.
    pub fn parse_program(&mut self) -> (Vec<Spanned<Stmt>>, Vec<ParseError>) {
        let mut statements = Vec::new();
        let mut errors = Vec::new();

        while let Some(result) = self.next_statement() {
            match result {
                Ok(stmt) => statements.push(stmt),
                Err(e) => {
                    errors.push(e);
                    if errors.len() >= MAX_ERRORS {
                        break;
                    }
                    self.sync_to_statement_boundary();
                }
            }
        }

        (statements, errors)
    }

    /// Skip past the broken statement: up to and including the next `;` at
    /// brace depth zero, or a closing `}` that balances the braces skipped.
    fn sync_to_statement_boundary(&mut self) {
        let mut depth: usize = 0;
        while let Some(tok) = self.advance() {
            match tok {
                Token::LBrace => depth += 1,
                Token::RBrace if depth <= 1 => break,
                Token::RBrace => depth -= 1,
                Token::Semi if depth == 0 => break,
                _ => {}
            }
        }
    }

    fn parse_block(&mut self) -> Result<Vec<Spanned<Stmt>>> {
        self.expect(&Token::LBrace)?;
        let mut body = Vec::new();
        loop {
            match self.peek() {
                Some(Token::RBrace) => {
                    self.advance();
                    return Ok(body);
                }
                None => return Err(self.error("WIN-P002", "expected '}', got end of input".into())),
                Some(_) => body.push(self.parse_stmt()?),
            }
        }
    }

    fn parse_stmt(&mut self) -> Result<Spanned<Stmt>> {
        let start = self.peek_span();
        let node = match self.peek() {
            Some(Token::If) => self.parse_if()?,
            Some(Token::Loop) => {
                self.advance();
                Stmt::Loop { body: self.parse_block()? }
            }
            Some(Token::While) => {
                self.advance();
                let condition = self.parse_expr()?;
                Stmt::While { condition, body: self.parse_block()? }
            }
            Some(Token::Break) => {
                self.advance();
                self.expect(&Token::Semi)?;
                Stmt::Break
            }
            Some(Token::Continue) => {
                self.advance();
                self.expect(&Token::Semi)?;
                Stmt::Continue
            }
            Some(Token::Return) => {
                self.advance();
                let value = if self.peek() == Some(&Token::Semi) { None } else { Some(self.parse_expr()?) };
                self.expect(&Token::Semi)?;
                Stmt::Return(value)
            }
            Some(Token::Func) => self.parse_func()?,
            Some(Token::Record) => self.parse_record()?,
            Some(_) => self.parse_simple_stmt()?,
            None => return Err(self.error("WIN-P002", "expected a statement, got end of input".into())),
        };
        Ok(Spanned::new(node, start.merge(self.prev_span())))
    }

    /// `if c { } else if c { } else { }`
    fn parse_if(&mut self) -> Result<Stmt> {
        self.expect(&Token::If)?;
        let mut branches = vec![Branch { condition: self.parse_expr()?, body: self.parse_block()? }];
        let mut else_body = None;
        while self.eat(&Token::Else) {
            if self.eat(&Token::If) {
                branches.push(Branch { condition: self.parse_expr()?, body: self.parse_block()? });
            } else {
                else_body = Some(self.parse_block()?);
                break;
            }
        }
        Ok(Stmt::If { branches, else_body })
    }

    /// `func name(a, b) { }`
    fn parse_func(&mut self) -> Result<Stmt> {
        self.expect(&Token::Func)?;
        let name = self.expect_name()?;
        self.expect(&Token::LParen)?;
        let params = self.parse_names_until(&Token::RParen)?;
        let body = self.parse_block()?;
        Ok(Stmt::FuncDecl { name, params, body })
    }

    /// `record Name { a, b }`
    fn parse_record(&mut self) -> Result<Stmt> {
        self.expect(&Token::Record)?;
        let name = self.expect_name()?;
        self.expect(&Token::LBrace)?;
        let fields = self.parse_names_until(&Token::RBrace)?;
        Ok(Stmt::RecordDecl { name, fields })
    }

    /// Comma-separated names up to and including `close`. A trailing comma
    /// is allowed.
    fn parse_names_until(&mut self, close: &Token) -> Result<Vec<String>> {
        let mut names = Vec::new();
        while !self.eat(close) {
            names.push(self.expect_name()?);
            if !self.eat(&Token::Comma) {
                self.expect(close)?;
                break;
            }
        }
        Ok(names)
    }

    /// Expression statement or assignment.
    fn parse_simple_stmt(&mut self) -> Result<Stmt> {
        let expr = self.parse_expr()?;
        if self.peek() == Some(&Token::Assign) {
            let target_span = expr.span;
            let target = into_target(expr).ok_or_else(|| ParseError {
                code: "WIN-P005",
                position: self.pos,
                span: target_span,
                message: "left-hand side of '=' must be a name, index or field".into(),
            })?;
            self.advance();
            let value = self.parse_expr()?;
            self.expect(&Token::Semi)?;
            return Ok(Stmt::Assign { target, value });
        }
        self.expect(&Token::Semi)?;
        Ok(Stmt::Expr(expr))
    }

    // ---- Expressions, lowest precedence first ----

    pub fn parse_expr(&mut self) -> Result<Spanned<Expr>> {
        self.parse_or()
    }

    fn binary_level(
        &mut self,
        next: fn(&mut Self) -> Result<Spanned<Expr>>,
        op_for: fn(&Token) -> Option<Operator>,
    ) -> Result<Spanned<Expr>> {
        let mut left = next(self)?;
        while let Some(op) = self.peek().and_then(op_for) {
            self.advance();
            let right = next(self)?;
            let span = left.span.merge(right.span);
            left = Spanned::new(Expr::Binary { op, left: Box::new(left), right: Box::new(right) }, span);
        }
        Ok(left)
    }

    fn parse_or(&mut self) -> Result<Spanned<Expr>> {
        self.binary_level(Self::parse_and, |t| matches!(t, Token::OrOr).then_some(Operator::Or))
    }

    fn parse_and(&mut self) -> Result<Spanned<Expr>> {
        self.binary_level(Self::parse_comparison, |t| matches!(t, Token::AndAnd).then_some(Operator::And))
    }

    fn parse_comparison(&mut self) -> Result<Spanned<Expr>> {
        self.binary_level(Self::parse_additive, |t| match t {
            Token::EqEq => Some(Operator::Equal),
            Token::NotEq => Some(Operator::NotEqual),
            Token::Less => Some(Operator::Less),
            Token::Greater => Some(Operator::Greater),
            Token::LessEq => Some(Operator::LessEqual),
            Token::GreaterEq => Some(Operator::GreaterEqual),
            _ => None,
        })
    }

    fn parse_additive(&mut self) -> Result<Spanned<Expr>> {
        self.binary_level(Self::parse_multiplicative, |t| match t {
            Token::Plus => Some(Operator::Add),
            Token::Minus => Some(Operator::Subtract),
            _ => None,
        })
    }

    fn parse_multiplicative(&mut self) -> Result<Spanned<Expr>> {
        self.binary_level(Self::parse_unary, |t| match t {
            Token::Star => Some(Operator::Multiply),
            Token::Slash => Some(Operator::Divide),
            _ => None,
        })
    }

    fn parse_unary(&mut self) -> Result<Spanned<Expr>> {
        let op = match self.peek() {
            Some(Token::Minus) => Operator::Negate,
            Some(Token::Bang) => Operator::Not,
            _ => return self.parse_cast(),
        };
        let start = self.peek_span();
        self.advance();
        let operand = self.parse_unary()?;
        let span = start.merge(operand.span);
        Ok(Spanned::new(Expr::Unary { op, operand: Box::new(operand) }, span))
    }

    /// `expr as type`
    fn parse_cast(&mut self) -> Result<Spanned<Expr>> {
        let mut expr = self.parse_postfix()?;
        while self.eat(&Token::As) {
            let Some(target) = self.peek().and_then(type_name) else {
                let got = self.peek().map_or("end of input".to_string(), Token::describe);
                return Err(self.error("WIN-P006", format!("expected a type after 'as', got {got}")));
            };
            self.advance();
            let span = expr.span.merge(self.prev_span());
            expr = Spanned::new(Expr::Cast { expr: Box::new(expr), target }, span);
        }
        Ok(expr)
    }

    fn parse_postfix(&mut self) -> Result<Spanned<Expr>> {
        let mut expr = self.parse_atom()?;
        loop {
            if self.eat(&Token::LParen) {
                let args = self.parse_comma_list(&Token::RParen, Self::parse_expr)?;
                let span = expr.span.merge(self.prev_span());
                expr = Spanned::new(Expr::Call { callee: Box::new(expr), args }, span);
            } else if self.eat(&Token::LBracket) {
                let index = self.parse_expr()?;
                self.expect(&Token::RBracket)?;
                let span = expr.span.merge(self.prev_span());
                expr = Spanned::new(Expr::Index { collection: Box::new(expr), index: Box::new(index) }, span);
            } else if self.eat(&Token::Dot) {
                let field = self.expect_name()?;
                let span = expr.span.merge(self.prev_span());
                expr = Spanned::new(Expr::Field { object: Box::new(expr), field }, span);
            } else {
                return Ok(expr);
            }
        }
    }

    /// Items separated by commas, up to and including `close`.
    fn parse_comma_list<T>(&mut self, close: &Token, item: fn(&mut Self) -> Result<T>) -> Result<Vec<T>> {
        let mut items = Vec::new();
        while !self.eat(close) {
            items.push(item(self)?);
            if !self.eat(&Token::Comma) {
                self.expect(close)?;
                break;
            }
        }
        Ok(items)
    }

    fn parse_pair(&mut self) -> Result<(Spanned<Expr>, Spanned<Expr>)> {
        let key = self.parse_expr()?;
        self.expect(&Token::Colon)?;
        let value = self.parse_expr()?;
        Ok((key, value))
    }

    fn parse_atom(&mut self) -> Result<Spanned<Expr>> {
        let start = self.peek_span();
        let Some(tok) = self.peek().cloned() else {
            return Err(self.error("WIN-P002", "expected an expression, got end of input".into()));
        };
        self.advance();
        let node = match tok {
            Token::Integer(i) => Expr::Literal(Literal::Integer(i)),
            Token::Float(f) => Expr::Literal(Literal::Float(f)),
            Token::True => Expr::Literal(Literal::Bool(true)),
            Token::False => Expr::Literal(Literal::Bool(false)),
            Token::None => Expr::Literal(Literal::None),
            Token::Str(s) => Expr::Str(s),
            Token::Name(n) => Expr::Var(n),
            Token::LParen => {
                let inner = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                return Ok(Spanned::new(inner.node, start.merge(self.prev_span())));
            }
            Token::LBracket => Expr::List(self.parse_comma_list(&Token::RBracket, Self::parse_expr)?),
            Token::LBrace => Expr::Dict(self.parse_comma_list(&Token::RBrace, Self::parse_pair)?),
            ref other => match type_name(other) {
                Some(t) => Expr::Type(t),
                None => {
                    self.pos -= 1;
                    return Err(self.error("WIN-P001", format!("expected an expression, got {}", other.describe())));
                }
            },
        };
        Ok(Spanned::new(node, start.merge(self.prev_span())))
    }
}

fn type_name(tok: &Token) -> Option<TypeName> {
    match tok {
        Token::IntType => Some(TypeName::Int),
        Token::FloatType => Some(TypeName::Float),
        Token::BoolType => Some(TypeName::Bool),
        Token::StringType => Some(TypeName::String),
        Token::ListType => Some(TypeName::List),
        Token::DictType => Some(TypeName::Dict),
        _ => None,
    }
}

fn into_target(expr: Spanned<Expr>) -> Option<Target> {
    match expr.node {
        Expr::Var(name) => Some(Target::Name(name)),
        Expr::Index { collection, index } => Some(Target::Index { collection: *collection, index: *index }),
        Expr::Field { object, field } => Some(Target::Field { object: *object, field }),
        _ => None,
    }
}

/// Parse a whole source string, stopping at the first error.
pub fn parse_str(source: &str) -> std::result::Result<Vec<Spanned<Stmt>>, ParseError> {
    let tokens = crate::lexer::lex(source).map_err(|e| ParseError {
        code: e.code,
        position: 0,
        span: Span { start: e.position, end: e.position + e.snippet.len() },
        message: e.to_string(),
    })?;
    let (statements, mut errors) = Parser::new(tokens).parse_program();
    match errors.is_empty() {
        true => Ok(statements),
        false => Err(errors.remove(0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer;

    fn parse(source: &str) -> Vec<Spanned<Stmt>> {
        parse_str(source).unwrap()
    }

    fn parse_errors(source: &str) -> (Vec<Spanned<Stmt>>, Vec<ParseError>) {
        Parser::new(lexer::lex(source).unwrap()).parse_program()
    }

    fn only_expr(source: &str) -> Expr {
        match parse(source).remove(0).node {
            Stmt::Expr(e) => e.node,
            other => panic!("expected expression statement, got {other:?}"),
        }
    }

    #[test]
    fn parse_assignment_and_call() {
        let prog = parse("x = 5; print(x + 3);");
        assert_eq!(prog.len(), 2);
        assert!(matches!(&prog[0].node, Stmt::Assign { target: Target::Name(n), .. } if n == "x"));
        match &prog[1].node {
            Stmt::Expr(e) => match &e.node {
                Expr::Call { callee, args } => {
                    assert_eq!(callee.node, Expr::Var("print".into()));
                    assert!(matches!(args[0].node, Expr::Binary { op: Operator::Add, .. }));
                }
                other => panic!("expected call, got {other:?}"),
            },
            other => panic!("expected expression, got {other:?}"),
        }
    }

    #[test]
    fn precedence_multiply_binds_tighter() {
        match only_expr("1 + 2 * 3;") {
            Expr::Binary { op: Operator::Add, right, .. } => {
                assert!(matches!(right.node, Expr::Binary { op: Operator::Multiply, .. }));
            }
            other => panic!("expected add, got {other:?}"),
        }
    }

    #[test]
    fn precedence_and_over_or() {
        match only_expr("a || b && c;") {
            Expr::Binary { op: Operator::Or, right, .. } => {
                assert!(matches!(right.node, Expr::Binary { op: Operator::And, .. }));
            }
            other => panic!("expected or, got {other:?}"),
        }
    }

    #[test]
    fn subtraction_is_left_associative() {
        match only_expr("a - b - c;") {
            Expr::Binary { op: Operator::Subtract, left, .. } => {
                assert!(matches!(left.node, Expr::Binary { op: Operator::Subtract, .. }));
            }
            other => panic!("expected subtract, got {other:?}"),
        }
    }

    #[test]
    fn cast_binds_tighter_than_unary() {
        match only_expr("-x as float;") {
            Expr::Unary { op: Operator::Negate, operand } => {
                assert!(matches!(operand.node, Expr::Cast { target: TypeName::Float, .. }));
            }
            other => panic!("expected negate, got {other:?}"),
        }
    }

    #[test]
    fn postfix_chain() {
        match only_expr("p.items[0](1, 2);") {
            Expr::Call { callee, args } => {
                assert_eq!(args.len(), 2);
                assert!(matches!(callee.node, Expr::Index { .. }));
            }
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn collection_literals() {
        assert!(matches!(only_expr("[1, 2, 3,];"), Expr::List(items) if items.len() == 3));
        assert!(matches!(only_expr("{\"a\": 1, 2: none};"), Expr::Dict(pairs) if pairs.len() == 2));
        assert!(matches!(only_expr("[];"), Expr::List(items) if items.is_empty()));
    }

    #[test]
    fn type_names_are_values() {
        assert!(matches!(
            only_expr("typeof(x) == int;"),
            Expr::Binary { op: Operator::Equal, right, .. } if right.node == Expr::Type(TypeName::Int)
        ));
    }

    #[test]
    fn if_else_chain() {
        let prog = parse("if a { x = 1; } else if b { x = 2; } else { x = 3; }");
        match &prog[0].node {
            Stmt::If { branches, else_body } => {
                assert_eq!(branches.len(), 2);
                assert_eq!(else_body.as_ref().map(Vec::len), Some(1));
            }
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn func_and_record_declarations() {
        let prog = parse("func add(a, b) { return a + b; } record Point { x, y }");
        match &prog[0].node {
            Stmt::FuncDecl { name, params, body } => {
                assert_eq!(name, "add");
                assert_eq!(params, &["a", "b"]);
                assert!(matches!(body[0].node, Stmt::Return(Some(_))));
            }
            other => panic!("expected func, got {other:?}"),
        }
        assert_eq!(
            prog[1].node,
            Stmt::RecordDecl { name: "Point".into(), fields: vec!["x".into(), "y".into()] }
        );
    }

    #[test]
    fn loops_and_jumps() {
        let prog = parse("while i < 3 { i = i + 1; continue; } loop { break; } return;");
        assert!(matches!(prog[0].node, Stmt::While { .. }));
        assert!(matches!(&prog[1].node, Stmt::Loop { body } if body[0].node == Stmt::Break));
        assert_eq!(prog[2].node, Stmt::Return(None));
    }

    #[test]
    fn index_and_field_targets() {
        let prog = parse("l[0] = 1; p.x = 2;");
        assert!(matches!(prog[0].node, Stmt::Assign { target: Target::Index { .. }, .. }));
        assert!(matches!(&prog[1].node, Stmt::Assign { target: Target::Field { field, .. }, .. } if field == "x"));
    }

    #[test]
    fn statement_spans_cover_source() {
        let source = "x = 5;\nprint(x);";
        let prog = parse(source);
        assert_eq!(&source[prog[0].span.start..prog[0].span.end], "x = 5;");
        assert_eq!(&source[prog[1].span.start..prog[1].span.end], "print(x);");
    }

    #[test]
    fn next_statement_is_incremental() {
        let mut parser = Parser::new(lexer::lex("a = 1; b = ;").unwrap());
        assert!(parser.next_statement().unwrap().is_ok());
        assert!(parser.next_statement().unwrap().is_err());
    }

    #[test]
    fn error_invalid_target() {
        let err = parse_str("1 + 2 = 3;").unwrap_err();
        assert_eq!(err.code, "WIN-P005");
    }

    #[test]
    fn error_missing_semicolon() {
        let err = parse_str("x = 1 y = 2;").unwrap_err();
        assert_eq!(err.code, "WIN-P003");
        assert!(err.message.contains("';'"), "{}", err.message);
    }

    #[test]
    fn error_unterminated_block() {
        let err = parse_str("loop { x = 1;").unwrap_err();
        assert_eq!(err.code, "WIN-P002");
    }

    #[test]
    fn error_bad_cast_target() {
        let err = parse_str("x as y;").unwrap_err();
        assert_eq!(err.code, "WIN-P006");
    }

    // ---- Error recovery ----

    #[test]
    fn recovery_continues_after_bad_statement() {
        let (prog, errors) = parse_errors("x = ; y = 2;");
        assert_eq!(errors.len(), 1);
        assert_eq!(prog.len(), 1);
        assert!(matches!(&prog[0].node, Stmt::Assign { target: Target::Name(n), .. } if n == "y"));
    }

    #[test]
    fn recovery_skips_whole_block() {
        let (prog, errors) = parse_errors("func f( { x = 1; } print(1);");
        assert_eq!(errors.len(), 1);
        assert_eq!(prog.len(), 1);
    }

    #[test]
    fn recovery_stops_at_20_errors() {
        let source = "= ; ".repeat(25);
        let (_prog, errors) = parse_errors(&source);
        assert_eq!(errors.len(), 20);
    }

    #[test]
    fn ast_serializes_to_json() {
        let prog = parse("x = [1];");
        let json = serde_json::to_value(&prog).unwrap();
        assert_eq!(json[0]["Assign"]["target"]["Name"], "x");
    }
}

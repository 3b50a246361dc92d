use serde::{Serialize, Serializer};

pub mod source_map;
pub use source_map::SourceMap;

// ---- Span infrastructure ----

/// Byte range within source text. This is the "source association" every
/// instruction carries into the VM; nothing past the parser interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub const UNKNOWN: Span = Span { start: 0, end: 0 };

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn len(self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(self) -> bool {
        self.len() == 0
    }
}

impl From<std::ops::Range<usize>> for Span {
    fn from(range: std::ops::Range<usize>) -> Self {
        Span { start: range.start, end: range.end }
    }
}

/// Wraps a node with its source span. Transparent to serde (serializes as inner node only).
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Spanned { node, span }
    }

    pub fn unknown(node: T) -> Self {
        Spanned { node, span: Span::UNKNOWN }
    }
}

impl<T> std::ops::Deref for Spanned<T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.node
    }
}

impl<T: Serialize> Serialize for Spanned<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.node.serialize(serializer)
    }
}

// ---- Core AST types ----

/// Operators as written in source. `Subtract`, `NotEqual`, `LessEqual` and
/// `GreaterEqual` never reach the compiler: lowering rewrites them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Operator {
    Negate,
    Not,
    Add,
    Subtract,
    Multiply,
    Divide,
    Equal,
    NotEqual,
    Greater,
    Less,
    GreaterEqual,
    LessEqual,
    And,
    Or,
}

impl Operator {
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Negate | Operator::Subtract => "-",
            Operator::Not => "!",
            Operator::Add => "+",
            Operator::Multiply => "*",
            Operator::Divide => "/",
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::Greater => ">",
            Operator::Less => "<",
            Operator::GreaterEqual => ">=",
            Operator::LessEqual => "<=",
            Operator::And => "&&",
            Operator::Or => "||",
        }
    }
}

/// Built-in type names usable as values (`typeof(x) == int`) and as cast
/// targets (`x as float`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TypeName {
    Int,
    Float,
    Bool,
    String,
    List,
    Dict,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Literal {
    None,
    Integer(i64),
    Float(f64),
    Bool(bool),
}

/// Expressions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    Literal(Literal),

    /// String literal, escapes already resolved
    Str(String),

    /// Variable reference (or built-in name, resolved by the compiler)
    Var(String),

    /// `int`, `float`, ... used as a value
    Type(TypeName),

    /// `callee(args...)`
    Call {
        callee: Box<Spanned<Expr>>,
        args: Vec<Spanned<Expr>>,
    },

    /// `-x`, `!x`
    Unary {
        op: Operator,
        operand: Box<Spanned<Expr>>,
    },

    Binary {
        op: Operator,
        left: Box<Spanned<Expr>>,
        right: Box<Spanned<Expr>>,
    },

    /// `collection[index]`
    Index {
        collection: Box<Spanned<Expr>>,
        index: Box<Spanned<Expr>>,
    },

    /// `record.field`
    Field {
        object: Box<Spanned<Expr>>,
        field: String,
    },

    /// `expr as type`
    Cast {
        expr: Box<Spanned<Expr>>,
        target: TypeName,
    },

    /// `[a, b, c]`
    List(Vec<Spanned<Expr>>),

    /// `{k: v, ...}`
    Dict(Vec<(Spanned<Expr>, Spanned<Expr>)>),
}

/// Left-hand side of an assignment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Target {
    Name(String),
    Index {
        collection: Spanned<Expr>,
        index: Spanned<Expr>,
    },
    Field {
        object: Spanned<Expr>,
        field: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Branch {
    pub condition: Spanned<Expr>,
    pub body: Vec<Spanned<Stmt>>,
}

/// Statements
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Stmt {
    /// `expr;`
    Expr(Spanned<Expr>),

    /// `target = value;`
    Assign { target: Target, value: Spanned<Expr> },

    /// `return;` / `return expr;`
    Return(Option<Spanned<Expr>>),

    /// `if c { } else if c { } else { }`
    If {
        branches: Vec<Branch>,
        else_body: Option<Vec<Spanned<Stmt>>>,
    },

    /// `loop { }`
    Loop { body: Vec<Spanned<Stmt>> },

    /// `while c { }` (lowered into `Loop`)
    While {
        condition: Spanned<Expr>,
        body: Vec<Spanned<Stmt>>,
    },

    Break,
    Continue,

    /// `func name(a, b) { }`
    FuncDecl {
        name: String,
        params: Vec<String>,
        body: Vec<Spanned<Stmt>>,
    },

    /// `record Name { a, b }`
    RecordDecl { name: String, fields: Vec<String> },
}

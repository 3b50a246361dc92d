use crate::ast::Span;

/// A fault in the program being interpreted.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UserErrorKind {
    #[error("cannot apply '{op}' to {left} and {right}")]
    TypeMismatch { op: &'static str, left: &'static str, right: &'static str },
    #[error("cannot apply '{op}' to {operand}")]
    InvalidOperand { op: &'static str, operand: &'static str },
    #[error("'{name}' is not bound")]
    NotBound { name: String },
    #[error("{callee} takes {expected} argument(s) but {got} were given")]
    ArgumentCount { callee: String, expected: usize, got: usize },
    #[error("record {record} has {max} field(s) but {got} were given")]
    TooManyFields { record: String, max: usize, got: usize },
    #[error("index {index} is out of bounds for length {len}")]
    OutOfBounds { index: i64, len: usize },
    #[error("key {key} not found")]
    KeyNotFound { key: String },
    #[error("record has no field '{field}'")]
    NoSuchField { field: String },
    #[error("cannot index into {kind} with {key}")]
    NotIndexable { kind: &'static str, key: &'static str },
    #[error("cannot assign into {kind} with {key}")]
    NotAssignable { kind: &'static str, key: &'static str },
    #[error("{kind} is not callable")]
    NotCallable { kind: &'static str },
    #[error("cannot cast {from} to {to}")]
    CannotCast { from: &'static str, to: &'static str },
    #[error("string {text:?} is not in {target} form")]
    MalformedNumber { text: String, target: &'static str },
    #[error("{builtin} requires {expected}, got {got}")]
    BuiltinArgument { builtin: &'static str, expected: &'static str, got: &'static str },
    #[error("condition must be bool, got {got}")]
    ConditionNotBool { got: &'static str },
    #[error("equality is not supported between {kind} values")]
    UnsupportedEquality { kind: &'static str },
    #[error("assertion failed")]
    AssertionFailed,
    #[error("cannot return from the top level")]
    ReturnOutsideFunction,
    #[error("cannot pop from an empty list")]
    EmptyList,
    #[error("call stack overflow (depth {depth})")]
    StackOverflow { depth: usize },
}

impl UserErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            UserErrorKind::TypeMismatch { .. } => "WIN-R001",
            UserErrorKind::InvalidOperand { .. } => "WIN-R002",
            UserErrorKind::NotBound { .. } => "WIN-R003",
            UserErrorKind::ArgumentCount { .. } => "WIN-R004",
            UserErrorKind::TooManyFields { .. } => "WIN-R005",
            UserErrorKind::OutOfBounds { .. } => "WIN-R006",
            UserErrorKind::KeyNotFound { .. } => "WIN-R007",
            UserErrorKind::NoSuchField { .. } => "WIN-R008",
            UserErrorKind::NotIndexable { .. } => "WIN-R009",
            UserErrorKind::NotAssignable { .. } => "WIN-R010",
            UserErrorKind::NotCallable { .. } => "WIN-R011",
            UserErrorKind::CannotCast { .. } => "WIN-R012",
            UserErrorKind::MalformedNumber { .. } => "WIN-R013",
            UserErrorKind::BuiltinArgument { .. } => "WIN-R014",
            UserErrorKind::ConditionNotBool { .. } => "WIN-R015",
            UserErrorKind::UnsupportedEquality { .. } => "WIN-R016",
            UserErrorKind::AssertionFailed => "WIN-R017",
            UserErrorKind::ReturnOutsideFunction => "WIN-R018",
            UserErrorKind::EmptyList => "WIN-R019",
            UserErrorKind::StackOverflow { .. } => "WIN-R020",
        }
    }

    /// Attach the source association of the instruction that failed.
    pub fn at(self, assoc: Span) -> Error {
        Error::User(UserError { kind: self, assoc })
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind}")]
pub struct UserError {
    pub kind: UserErrorKind,
    pub assoc: Span,
}

/// A violated interpreter invariant. Seeing one of these means a bug in
/// winter itself, not in the script.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InternalError {
    #[error("dictionary out of sync: {keys} keys, {values} values, size {size}")]
    DictionaryDesync { keys: usize, values: usize, size: usize },
    #[error("handle {index}#{generation} does not name a live object")]
    UnknownHandle { index: u32, generation: u32 },
    #[error("expected a {expected} object, found {found}")]
    ObjectKind { expected: &'static str, found: &'static str },
    #[error("{op} executed with no active loop")]
    OutsideLoop { op: &'static str },
    #[error("evaluation stack underflow")]
    StackUnderflow,
    #[error("jump at {at} targets {target}, outside 0..={len}")]
    JumpOutOfRange { at: usize, target: isize, len: usize },
    #[error("cannot prime a machine that is still running")]
    PrimeWhileActive,
    #[error("expected a name string on the stack, found {found}")]
    ExpectedName { found: &'static str },
    #[error("PUSH at {at} carries a heap value")]
    HeapConstant { at: usize },
    #[error("output failed: {0}")]
    Output(String),
}

impl InternalError {
    pub fn code(&self) -> &'static str {
        match self {
            InternalError::DictionaryDesync { .. } => "WIN-I001",
            InternalError::UnknownHandle { .. } => "WIN-I002",
            InternalError::ObjectKind { .. } => "WIN-I003",
            InternalError::OutsideLoop { .. } => "WIN-I004",
            InternalError::StackUnderflow => "WIN-I005",
            InternalError::JumpOutOfRange { .. } => "WIN-I006",
            InternalError::PrimeWhileActive => "WIN-I007",
            InternalError::ExpectedName { .. } => "WIN-I008",
            InternalError::HeapConstant { .. } => "WIN-I009",
            InternalError::Output(_) => "WIN-I010",
        }
    }
}

impl From<std::io::Error> for InternalError {
    fn from(e: std::io::Error) -> Self {
        InternalError::Output(e.to_string())
    }
}

/// Everything the runtime can fail with.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    User(#[from] UserError),
    #[error("internal error: {0}")]
    Internal(#[from] InternalError),
}

impl Error {
    pub fn is_internal(&self) -> bool {
        matches!(self, Error::Internal(_))
    }

    pub fn code(&self) -> &'static str {
        match self {
            Error::User(e) => e.kind.code(),
            Error::Internal(e) => e.code(),
        }
    }

    /// Source association, when the error came from a user program.
    pub fn assoc(&self) -> Option<Span> {
        match self {
            Error::User(e) => Some(e.assoc),
            Error::Internal(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

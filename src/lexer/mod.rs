use logos::Logos;

use crate::ast::Span;

#[derive(Logos, Debug, PartialEq, Clone)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip(r"//[^\n]*", allow_greedy = true))]
pub enum Token {
    // Keywords
    #[token("none")]
    None,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("return")]
    Return,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("func")]
    Func,
    #[token("loop")]
    Loop,
    #[token("while")]
    While,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("as")]
    As,
    #[token("record")]
    Record,

    // Built-in type names
    #[token("int")]
    IntType,
    #[token("float")]
    FloatType,
    #[token("bool")]
    BoolType,
    #[token("string")]
    StringType,
    #[token("list")]
    ListType,
    #[token("dict")]
    DictType,

    // Punctuation
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(";")]
    Semi,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,

    // Operators
    #[token("=")]
    Assign,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Less,
    #[token(">")]
    Greater,
    #[token("<=")]
    LessEq,
    #[token(">=")]
    GreaterEq,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("!")]
    Bang,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,

    // Literals
    #[regex(r"[0-9]+\.[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),

    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Integer(i64),

    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| unescape(lex.slice()))]
    Str(String),

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Name(String),
}

impl Token {
    /// Human-readable form for parse errors.
    pub fn describe(&self) -> String {
        match self {
            Token::Float(f) => format!("float {f}"),
            Token::Integer(i) => format!("integer {i}"),
            Token::Str(s) => format!("string {s:?}"),
            Token::Name(n) => format!("name '{n}'"),
            other => format!("'{}'", other.text()),
        }
    }

    fn text(&self) -> &'static str {
        match self {
            Token::None => "none",
            Token::True => "true",
            Token::False => "false",
            Token::Return => "return",
            Token::If => "if",
            Token::Else => "else",
            Token::Func => "func",
            Token::Loop => "loop",
            Token::While => "while",
            Token::Break => "break",
            Token::Continue => "continue",
            Token::As => "as",
            Token::Record => "record",
            Token::IntType => "int",
            Token::FloatType => "float",
            Token::BoolType => "bool",
            Token::StringType => "string",
            Token::ListType => "list",
            Token::DictType => "dict",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::Comma => ",",
            Token::Semi => ";",
            Token::Colon => ":",
            Token::Dot => ".",
            Token::Assign => "=",
            Token::EqEq => "==",
            Token::NotEq => "!=",
            Token::Less => "<",
            Token::Greater => ">",
            Token::LessEq => "<=",
            Token::GreaterEq => ">=",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Bang => "!",
            Token::AndAnd => "&&",
            Token::OrOr => "||",
            Token::Float(_) | Token::Integer(_) | Token::Str(_) | Token::Name(_) => "literal",
        }
    }
}

/// Strip the quotes and resolve escapes. `None` rejects the token.
fn unescape(quoted: &str) -> Option<String> {
    let inner = &quoted[1..quoted.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '0' => out.push('\0'),
            '\\' => out.push('\\'),
            '"' => out.push('"'),
            _ => return None,
        }
    }
    Some(out)
}

/// Lex source code into a stream of tokens with spans.
/// Stops at the first invalid token and reports where it was.
pub fn lex(source: &str) -> Result<Vec<(Token, Span)>, LexError> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(token) => tokens.push((token, Span::from(span))),
            Err(()) => {
                let snippet = source[span.clone()].to_string();
                return Err(LexError {
                    code: lex_error_code(&snippet),
                    position: span.start,
                    suggestion: suggest_fix(&snippet),
                    snippet,
                });
            }
        }
    }

    Ok(tokens)
}

fn lex_error_code(bad_token: &str) -> &'static str {
    if bad_token.starts_with('"') {
        "WIN-L002"
    } else if bad_token.starts_with(|c: char| c.is_ascii_digit()) {
        "WIN-L003"
    } else {
        "WIN-L001"
    }
}

fn suggest_fix(bad_token: &str) -> String {
    match bad_token {
        "'" => "Strings use double quotes: \"text\"".to_string(),
        "&" => "Did you mean '&&'?".to_string(),
        "|" => "Did you mean '||'?".to_string(),
        s if s.starts_with('"') => {
            "Unterminated string or unknown escape; valid escapes are \\n \\t \\r \\0 \\\\ \\\"".to_string()
        }
        s if s.starts_with(|c: char| c.is_ascii_digit()) => {
            format!("Integer literal '{s}' does not fit in 64 bits")
        }
        s => format!("Unexpected character(s): '{s}'"),
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Lex error at position {position}: '{snippet}'. {suggestion}")]
pub struct LexError {
    pub code: &'static str,
    pub position: usize,
    pub snippet: String,
    pub suggestion: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        lex(source).unwrap().into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn lex_assignment() {
        assert_eq!(
            kinds("x = 5;"),
            vec![Token::Name("x".into()), Token::Assign, Token::Integer(5), Token::Semi]
        );
    }

    #[test]
    fn lex_keywords_beat_names() {
        let tokens = kinds("func loop while record as int dict");
        assert_eq!(
            tokens,
            vec![
                Token::Func,
                Token::Loop,
                Token::While,
                Token::Record,
                Token::As,
                Token::IntType,
                Token::DictType
            ]
        );
        assert_eq!(kinds("looping"), vec![Token::Name("looping".into())]);
    }

    #[test]
    fn lex_two_char_operators() {
        assert_eq!(
            kinds("a <= b != c && d || !e"),
            vec![
                Token::Name("a".into()),
                Token::LessEq,
                Token::Name("b".into()),
                Token::NotEq,
                Token::Name("c".into()),
                Token::AndAnd,
                Token::Name("d".into()),
                Token::OrOr,
                Token::Bang,
                Token::Name("e".into()),
            ]
        );
    }

    #[test]
    fn lex_numbers() {
        assert_eq!(kinds("3.25 7"), vec![Token::Float(3.25), Token::Integer(7)]);
    }

    #[test]
    fn lex_string_escapes() {
        assert_eq!(kinds(r#""a\tb\n\"c\"""#), vec![Token::Str("a\tb\n\"c\"".into())]);
    }

    #[test]
    fn lex_comment_ignored() {
        let tokens = kinds("// a comment\nprint(1); // trailing");
        assert_eq!(tokens[0], Token::Name("print".into()));
        assert_eq!(tokens.len(), 5);
    }

    #[test]
    fn lex_spans_are_byte_ranges() {
        let tokens = lex("ab = 12;").unwrap();
        assert_eq!(tokens[0].1, Span { start: 0, end: 2 });
        assert_eq!(tokens[2].1, Span { start: 5, end: 7 });
    }

    #[test]
    fn lex_error_single_quote() {
        let err = lex("x = 'a';").unwrap_err();
        assert_eq!(err.position, 4);
        assert_eq!(err.code, "WIN-L001");
        assert!(err.suggestion.contains("double quotes"));
    }

    #[test]
    fn lex_error_integer_overflow() {
        let err = lex("x = 99999999999999999999;").unwrap_err();
        assert_eq!(err.code, "WIN-L003");
    }

    #[test]
    fn lex_error_bad_escape() {
        let err = lex(r#"print("\q");"#).unwrap_err();
        assert_eq!(err.code, "WIN-L002");
    }
}

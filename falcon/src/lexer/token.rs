//! Token definitions

use logos::Logos;
use std::fmt;

/// Raw scanner output, before malformed input is turned into errors
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\f]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*([^*]|\*+[^*/])*\*+/")]
pub(super) enum RawToken {
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Identifier(String),

    #[regex(r"[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),

    #[regex(r"[0-9]+\.|[0-9]+(\.[0-9]+)?[eE][+-]?")]
    MalformedNumber,

    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| unescape(lex.slice()))]
    String(String),

    #[token("/*")]
    UnterminatedComment,

    #[token("=")]
    Assign,
    #[token("==")]
    Equal,
    #[token("!=")]
    Unequal,
    #[token(">=")]
    GreaterEq,
    #[token("<=")]
    LessEq,
    #[token("<")]
    Less,
    #[token(">")]
    Greater,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("**")]
    DoubleStar,
    #[token("/")]
    Slash,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("\n")]
    Newline,
}

/// Strip the quotes and resolve escapes; `None` rejects an unknown escape
fn unescape(slice: &str) -> Option<String> {
    let body = &slice[1..slice.len() - 1];
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            '\\' => out.push('\\'),
            '"' => out.push('"'),
            _ => return None,
        }
    }
    Some(out)
}

/// Token handed to the compiler
///
/// Keywords are not distinguished here; the statement compiler recognises
/// them by the identifier text.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Identifier(String),
    Number(f64),
    String(String),
    Assign,
    Equal,
    Unequal,
    GreaterEq,
    LessEq,
    Less,
    Greater,
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    Comma,
    Colon,
    LParen,
    RParen,
    LBracket,
    RBracket,
    EndOfLine,
    EndOfFile,
}

impl Token {
    /// True for tokens that close a statement
    pub fn is_terminator(&self) -> bool {
        matches!(self, Token::EndOfLine | Token::EndOfFile)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Identifier(name) => write!(f, "identifier `{name}`"),
            Token::Number(n) => write!(f, "number `{n}`"),
            Token::String(s) => write!(f, "string {s:?}"),
            Token::Assign => f.write_str("`=`"),
            Token::Equal => f.write_str("`==`"),
            Token::Unequal => f.write_str("`!=`"),
            Token::GreaterEq => f.write_str("`>=`"),
            Token::LessEq => f.write_str("`<=`"),
            Token::Less => f.write_str("`<`"),
            Token::Greater => f.write_str("`>`"),
            Token::Plus => f.write_str("`+`"),
            Token::Minus => f.write_str("`-`"),
            Token::Star => f.write_str("`*`"),
            Token::DoubleStar => f.write_str("`**`"),
            Token::Slash => f.write_str("`/`"),
            Token::Comma => f.write_str("`,`"),
            Token::Colon => f.write_str("`:`"),
            Token::LParen => f.write_str("`(`"),
            Token::RParen => f.write_str("`)`"),
            Token::LBracket => f.write_str("`[`"),
            Token::RBracket => f.write_str("`]`"),
            Token::EndOfLine => f.write_str("end of line"),
            Token::EndOfFile => f.write_str("end of file"),
        }
    }
}

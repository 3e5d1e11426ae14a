//! Lexer implementation using logos

mod token;

pub use token::Token;

use crate::error::{FalconError, Result};
use crate::span::Span;
use logos::Logos;
use token::RawToken;

/// A token together with where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme {
    pub token: Token,
    pub span: Span,
}

impl Lexeme {
    pub fn new(token: Token, span: Span) -> Self {
        Self { token, span }
    }
}

/// Pull-based token stream with one token of push-back
pub struct Lexer<'src> {
    inner: logos::Lexer<'src, RawToken>,
    pending: Option<Lexeme>,
    end: usize,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            inner: RawToken::lexer(source),
            pending: None,
            end: source.len(),
        }
    }

    /// Next token; keeps returning `EndOfFile` once the input is exhausted
    pub fn next_token(&mut self) -> Result<Lexeme> {
        if let Some(lexeme) = self.pending.take() {
            return Ok(lexeme);
        }

        let Some(result) = self.inner.next() else {
            return Ok(Lexeme::new(Token::EndOfFile, Span::point(self.end)));
        };
        let span = Span::from(self.inner.span());
        let token = match result {
            Ok(raw) => convert(raw, span)?,
            Err(_) => {
                return Err(FalconError::lexical(
                    format!("unexpected character: {:?}", self.inner.slice()),
                    span,
                ));
            }
        };
        Ok(Lexeme::new(token, span))
    }

    /// Un-read one token
    pub fn push_back(&mut self, lexeme: Lexeme) -> Result<()> {
        if self.pending.is_some() {
            return Err(FalconError::internal("token pushed back twice").with_span(lexeme.span));
        }
        self.pending = Some(lexeme);
        Ok(())
    }

    /// Look at the next token without consuming it
    pub fn peek(&mut self) -> Result<&Lexeme> {
        if self.pending.is_none() {
            let lexeme = self.next_token()?;
            self.pending = Some(lexeme);
        }
        match &self.pending {
            Some(lexeme) => Ok(lexeme),
            None => Err(FalconError::internal("peek lost its token")),
        }
    }
}

fn convert(raw: RawToken, span: Span) -> Result<Token> {
    let token = match raw {
        RawToken::Identifier(name) => Token::Identifier(name),
        RawToken::Number(n) => Token::Number(n),
        RawToken::String(s) => Token::String(s),
        RawToken::MalformedNumber => {
            return Err(FalconError::lexical("malformed number literal", span));
        }
        RawToken::UnterminatedComment => {
            return Err(FalconError::lexical("unterminated block comment", span));
        }
        RawToken::Assign => Token::Assign,
        RawToken::Equal => Token::Equal,
        RawToken::Unequal => Token::Unequal,
        RawToken::GreaterEq => Token::GreaterEq,
        RawToken::LessEq => Token::LessEq,
        RawToken::Less => Token::Less,
        RawToken::Greater => Token::Greater,
        RawToken::Plus => Token::Plus,
        RawToken::Minus => Token::Minus,
        RawToken::Star => Token::Star,
        RawToken::DoubleStar => Token::DoubleStar,
        RawToken::Slash => Token::Slash,
        RawToken::Comma => Token::Comma,
        RawToken::Colon => Token::Colon,
        RawToken::LParen => Token::LParen,
        RawToken::RParen => Token::RParen,
        RawToken::LBracket => Token::LBracket,
        RawToken::RBracket => Token::RBracket,
        RawToken::Newline => Token::EndOfLine,
    };
    Ok(token)
}

/// Tokenize a whole source text, ending with `EndOfFile`
pub fn tokenize(source: &str) -> Result<Vec<Lexeme>> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let lexeme = lexer.next_token()?;
        let done = lexeme.token == Token::EndOfFile;
        tokens.push(lexeme);
        if done {
            return Ok(tokens);
        }
    }
}

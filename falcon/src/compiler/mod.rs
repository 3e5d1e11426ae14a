//! Single-pass compiler from source text to a [`Program`]
//!
//! All compiler state (token stream, scope stack, label and temporary counter,
//! function registry) lives in one [`Compiler`] value that every statement and
//! expression routine takes by `&mut self`.

mod call;
mod expr;
mod stmt;

use crate::error::{FalconError, Result};
use crate::lexer::{Lexeme, Lexer, Token};
use crate::program::{Instruction, Program, Slot};
use crate::span::Span;
use crate::symtab::{ScopeStack, SymbolTable};
use crate::value::{Value, Variant};
use rustc_hash::FxHashMap;

pub use expr::Operand;

/// Words with statement or literal meaning; never usable as names
pub const KEYWORDS: &[&str] = &[
    "else", "end", "false", "function", "if", "nil", "return", "true", "while",
];

/// Binding holding a function's return value
const RESULT_NAME: &str = "0ret";
/// Binding holding the label a function returns to
const RETURN_ADDRESS_NAME: &str = "0addr";

/// Compile a whole source text
#[tracing::instrument(level = "debug", skip_all)]
pub fn compile(source: &str) -> Result<Program> {
    let mut compiler = Compiler::new(source);
    compiler.compile_program()?;
    Ok(compiler.finish())
}

/// What the compiler remembers about a user-defined function
#[derive(Debug, Clone)]
struct FunctionInfo {
    /// Label slot named after the function
    entry: Slot,
    params: Vec<String>,
    /// The function's own scope, holding its parameters
    scope: SymbolTable,
    result: Slot,
    return_address: Slot,
}

/// Bindings of the function body being compiled
#[derive(Debug, Clone, Copy)]
struct Frame {
    result: Slot,
    return_address: Slot,
}

pub struct Compiler<'src> {
    lexer: Lexer<'src>,
    program: Program,
    scopes: ScopeStack,
    counter: u32,
    functions: FxHashMap<String, FunctionInfo>,
    frame: Option<Frame>,
    /// Nesting of `if`/`while` blocks
    depth: usize,
}

impl<'src> Compiler<'src> {
    pub fn new(source: &'src str) -> Self {
        let mut program = Program::new();
        let global = SymbolTable::seeded(&mut program.memory);
        Self {
            lexer: Lexer::new(source),
            program,
            scopes: ScopeStack::new(global),
            counter: 0,
            functions: FxHashMap::default(),
            frame: None,
            depth: 0,
        }
    }

    pub fn finish(self) -> Program {
        self.program
    }

    // ====================================================================
    // Token helpers
    // ====================================================================

    fn next(&mut self) -> Result<Lexeme> {
        self.lexer.next_token()
    }

    fn push_back(&mut self, lexeme: Lexeme) -> Result<()> {
        self.lexer.push_back(lexeme)
    }

    fn peek_is(&mut self, token: &Token) -> Result<bool> {
        Ok(&self.lexer.peek()?.token == token)
    }

    fn expect(&mut self, token: Token) -> Result<Lexeme> {
        let lexeme = self.next()?;
        if lexeme.token != token {
            return Err(FalconError::syntax(
                format!("expected {token}, found {}", lexeme.token),
                lexeme.span,
            ));
        }
        Ok(lexeme)
    }

    fn expect_identifier(&mut self) -> Result<(String, Span)> {
        let lexeme = self.next()?;
        match lexeme.token {
            Token::Identifier(name) => Ok((name, lexeme.span)),
            other => Err(FalconError::syntax(
                format!("expected identifier, found {other}"),
                lexeme.span,
            )),
        }
    }

    /// Consume the end of the current line; end of file is left in place
    fn expect_line_end(&mut self) -> Result<()> {
        let lexeme = self.next()?;
        match lexeme.token {
            Token::EndOfLine => Ok(()),
            Token::EndOfFile => self.push_back(lexeme),
            other => Err(FalconError::syntax(
                format!("expected end of line, found {other}"),
                lexeme.span,
            )),
        }
    }

    // ====================================================================
    // Synthetic bindings
    // ====================================================================

    fn fresh_name(&mut self, prefix: &str) -> String {
        self.counter += 1;
        format!("{prefix}{}", self.counter)
    }

    /// New temporary in the current scope
    fn temp(&mut self) -> Slot {
        let name = self.fresh_name("$t");
        self.scopes
            .insert(&mut self.program.memory, &name, &Value::Undefined)
    }

    /// New constant cell in the current scope
    fn literal(&mut self, value: Value) -> Slot {
        let name = self.fresh_name("$c");
        self.scopes.insert(&mut self.program.memory, &name, &value)
    }

    /// New label name, not yet placed
    fn new_label(&mut self) -> Slot {
        let name = self.fresh_name("$L");
        let value = Value::string(&name);
        self.scopes.insert(&mut self.program.memory, &name, &value)
    }

    fn place_label(&mut self, label: Slot, span: Span) -> Result<()> {
        self.program.place_label(label, Some(span))?;
        Ok(())
    }

    fn emit(&mut self, instruction: Instruction, span: Span) {
        self.program.emit(instruction.with_span(span));
    }

    /// Compile-time variant of a cell
    fn variant_of(&self, slot: Slot) -> Variant {
        self.program
            .memory
            .get(slot)
            .map(Value::variant)
            .unwrap_or(Variant::Undefined)
    }
}

//! Statements, blocks and function definitions

use super::expr::ExprContext;
use super::{Compiler, Frame, FunctionInfo, KEYWORDS, RESULT_NAME, RETURN_ADDRESS_NAME};
use crate::error::{FalconError, Result};
use crate::lexer::Token;
use crate::program::{Instruction, Opcode, Slot};
use crate::span::Span;
use crate::symtab::SymbolTable;
use crate::value::{FunctionDescriptor, Value, Variant};
use tracing::debug;

/// Stack headroom below which nested blocks move to a fresh segment
const STACK_RED_ZONE: usize = 128 * 1024;
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024;

/// How a statement left the enclosing block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Outcome {
    Continue,
    Eof,
    Else(Span),
    End(Span),
}

impl<'src> Compiler<'src> {
    pub(super) fn compile_program(&mut self) -> Result<()> {
        match self.block()? {
            Outcome::Eof | Outcome::Continue => Ok(()),
            Outcome::Else(span) => Err(FalconError::syntax("`else` without `if`", span)),
            Outcome::End(span) => Err(FalconError::syntax("`end` without an open block", span)),
        }
    }

    /// Compile statements until one of them closes the block
    fn block(&mut self) -> Result<Outcome> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || -> Result<Outcome> {
            loop {
                match self.statement()? {
                    Outcome::Continue => {}
                    other => return Ok(other),
                }
            }
        })
    }

    fn statement(&mut self) -> Result<Outcome> {
        let lexeme = self.next()?;
        let span = lexeme.span;
        let word = match lexeme.token {
            Token::EndOfLine => return Ok(Outcome::Continue),
            Token::EndOfFile => return Ok(Outcome::Eof),
            Token::Identifier(word) => word,
            other => {
                return Err(FalconError::syntax(
                    format!("expected a statement, found {other}"),
                    span,
                ));
            }
        };
        debug!(statement = %word, %span, "statement");

        match word.as_str() {
            "if" => self.if_statement(span)?,
            "while" => self.while_statement(span)?,
            "function" => self.function_definition(span)?,
            "return" => self.return_statement(span)?,
            "else" => {
                self.expect_line_end()?;
                return Ok(Outcome::Else(span));
            }
            "end" => {
                self.expect_line_end()?;
                return Ok(Outcome::End(span));
            }
            _ if KEYWORDS.contains(&word.as_str()) => {
                return Err(FalconError::syntax(
                    format!("unexpected keyword `{word}`"),
                    span,
                ));
            }
            _ => self.identifier_statement(&word, span)?,
        }
        Ok(Outcome::Continue)
    }

    /// `name = ...` or a call statement `name(...)`
    fn identifier_statement(&mut self, name: &str, span: Span) -> Result<()> {
        let lexeme = self.next()?;
        match lexeme.token {
            Token::Assign => self.assignment(name, span),
            Token::LParen => {
                self.call(name, span, None)?;
                self.expect_line_end()
            }
            other => Err(FalconError::syntax(
                format!("expected `=` or `(` after `{name}`, found {other}"),
                lexeme.span,
            )),
        }
    }

    fn assignment(&mut self, name: &str, span: Span) -> Result<()> {
        let target = self.assignment_target(name, span)?;

        let first = self.next()?;
        if let Token::Identifier(callee) = &first.token {
            if !KEYWORDS.contains(&callee.as_str()) && self.peek_is(&Token::LParen)? {
                let callee = callee.clone();
                self.next()?;
                self.call(&callee, first.span, Some(target))?;
                return self.expect_line_end();
            }
        }

        let value = self.expression(Some(first), ExprContext::Statement)?;
        self.expect_line_end()?;
        self.emit(
            Instruction::binary(Opcode::Copy, target, value.slot),
            span.cover(value.span),
        );
        Ok(())
    }

    /// Slot written by an assignment; unknown names are bound as undefined
    fn assignment_target(&mut self, name: &str, span: Span) -> Result<Slot> {
        let Some(slot) = self.scopes.lookup_local(name) else {
            return Ok(self
                .scopes
                .insert(&mut self.program.memory, name, &Value::Undefined));
        };
        match self.variant_of(slot) {
            Variant::Constant => Err(FalconError::semantic(
                format!("cannot assign to reserved name `{name}`"),
                span,
            )),
            Variant::Function => Err(FalconError::semantic(
                format!("cannot assign to function `{name}`"),
                span,
            )),
            _ => Ok(slot),
        }
    }

    fn if_statement(&mut self, span: Span) -> Result<()> {
        let condition = self.expression(None, ExprContext::Statement)?;
        self.expect_line_end()?;
        let otherwise = self.new_label();
        self.emit(
            Instruction::binary(Opcode::BranchFalse, condition.slot, otherwise),
            condition.span,
        );

        self.depth += 1;
        match self.block()? {
            Outcome::End(end) => self.place_label(otherwise, end)?,
            Outcome::Else(else_span) => {
                let done = self.new_label();
                self.emit(Instruction::unary(Opcode::Jump, done), else_span);
                self.place_label(otherwise, else_span)?;
                match self.block()? {
                    Outcome::End(end) => self.place_label(done, end)?,
                    Outcome::Else(again) => {
                        return Err(FalconError::syntax("second `else` for one `if`", again));
                    }
                    Outcome::Eof | Outcome::Continue => {
                        return Err(FalconError::syntax("`if` without matching `end`", span));
                    }
                }
            }
            Outcome::Eof | Outcome::Continue => {
                return Err(FalconError::syntax("`if` without matching `end`", span));
            }
        }
        self.depth -= 1;
        Ok(())
    }

    fn while_statement(&mut self, span: Span) -> Result<()> {
        let top = self.new_label();
        self.place_label(top, span)?;
        let condition = self.expression(None, ExprContext::Statement)?;
        self.expect_line_end()?;
        let exit = self.new_label();
        self.emit(
            Instruction::binary(Opcode::BranchFalse, condition.slot, exit),
            condition.span,
        );

        self.depth += 1;
        match self.block()? {
            Outcome::End(end) => {
                self.emit(Instruction::unary(Opcode::Jump, top), end);
                self.place_label(exit, end)?;
            }
            Outcome::Else(else_span) => {
                return Err(FalconError::syntax("`else` inside `while`", else_span));
            }
            Outcome::Eof | Outcome::Continue => {
                return Err(FalconError::syntax("`while` without matching `end`", span));
            }
        }
        self.depth -= 1;
        Ok(())
    }

    /// `function name(p, ...)` body `end`
    ///
    /// The body is laid out inline behind a jump and entered through a label
    /// carrying the function's name. The name becomes visible only once the
    /// body is complete.
    fn function_definition(&mut self, span: Span) -> Result<()> {
        if self.depth > 0 || !self.scopes.is_global() {
            return Err(FalconError::syntax(
                "functions can only be defined at top level",
                span,
            ));
        }
        let (name, name_span) = self.expect_identifier()?;
        if KEYWORDS.contains(&name.as_str()) {
            return Err(FalconError::syntax(
                format!("keyword `{name}` cannot name a function"),
                name_span,
            ));
        }
        if self.scopes.lookup(&name).is_some() || self.functions.contains_key(&name) {
            return Err(FalconError::semantic(
                format!("`{name}` is already defined"),
                name_span,
            ));
        }

        let mut scope = SymbolTable::seeded(&mut self.program.memory);
        let params = self.parameters(&mut scope)?;
        self.expect_line_end()?;
        let result = scope.insert(&mut self.program.memory, RESULT_NAME, &Value::Undefined);
        let return_address =
            scope.insert(&mut self.program.memory, RETURN_ADDRESS_NAME, &Value::Undefined);

        let skip = self.new_label();
        self.emit(Instruction::unary(Opcode::Jump, skip), span);
        let entry = self.program.memory.alloc(&name, Value::string(&name));
        self.place_label(entry, name_span)?;
        debug!(function = %name, params = params.len(), "function body");

        self.scopes.push_scope(scope);
        self.frame = Some(Frame {
            result,
            return_address,
        });
        let outcome = self.block();
        self.frame = None;
        let end = match outcome? {
            Outcome::End(end) => end,
            Outcome::Else(else_span) => {
                return Err(FalconError::syntax("`else` without `if`", else_span));
            }
            Outcome::Eof | Outcome::Continue => {
                return Err(FalconError::syntax(
                    format!("function `{name}` without matching `end`"),
                    span,
                ));
            }
        };

        // falling off the end returns nil
        let nil = self.literal(Value::Nil);
        self.emit(Instruction::binary(Opcode::Copy, result, nil), end);
        self.emit(Instruction::unary(Opcode::Jump, return_address), end);
        let scope = self.scopes.pop_scope()?;
        self.place_label(skip, end)?;

        let descriptor = FunctionDescriptor::new(params.clone());
        self.scopes.global_mut().insert(
            &mut self.program.memory,
            &name,
            &Value::Function(descriptor),
        );
        self.functions.insert(
            name,
            FunctionInfo {
                entry,
                params,
                scope,
                result,
                return_address,
            },
        );
        Ok(())
    }

    /// `(a, b, ...)` of a definition, each bound in `scope`
    fn parameters(&mut self, scope: &mut SymbolTable) -> Result<Vec<String>> {
        self.expect(Token::LParen)?;
        let mut params = Vec::new();
        if self.peek_is(&Token::RParen)? {
            self.next()?;
            return Ok(params);
        }
        loop {
            let (param, param_span) = self.expect_identifier()?;
            if KEYWORDS.contains(&param.as_str()) {
                return Err(FalconError::syntax(
                    format!("keyword `{param}` cannot name a parameter"),
                    param_span,
                ));
            }
            if scope.contains(&param) {
                return Err(FalconError::semantic(
                    format!("parameter `{param}` is already bound"),
                    param_span,
                ));
            }
            scope.insert(&mut self.program.memory, &param, &Value::Undefined);
            params.push(param);

            let lexeme = self.next()?;
            match lexeme.token {
                Token::Comma => {}
                Token::RParen => return Ok(params),
                other => {
                    return Err(FalconError::syntax(
                        format!("expected `,` or `)` in parameter list, found {other}"),
                        lexeme.span,
                    ));
                }
            }
        }
    }

    /// `return [expr]`
    fn return_statement(&mut self, span: Span) -> Result<()> {
        let Some(frame) = self.frame else {
            return Err(FalconError::syntax("`return` outside of a function", span));
        };
        let value = if self.lexer.peek()?.token.is_terminator() {
            self.literal(Value::Nil)
        } else {
            self.expression(None, ExprContext::Statement)?.slot
        };
        self.expect_line_end()?;
        self.emit(Instruction::binary(Opcode::Copy, frame.result, value), span);
        self.emit(Instruction::unary(Opcode::Jump, frame.return_address), span);
        Ok(())
    }
}

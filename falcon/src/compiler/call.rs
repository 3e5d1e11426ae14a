//! Builtin and user function calls

use super::expr::{ExprContext, Operand};
use super::Compiler;
use crate::builtins::Builtin;
use crate::error::{FalconError, Result};
use crate::lexer::Token;
use crate::program::{Instruction, Opcode, Slot};
use crate::span::Span;
use crate::value::Value;
use tracing::debug;

impl<'src> Compiler<'src> {
    /// Compile a call whose `(` has been consumed
    ///
    /// With a `target` the call's result is written there.
    pub(super) fn call(&mut self, name: &str, span: Span, target: Option<Slot>) -> Result<()> {
        if let Some(builtin) = Builtin::from_name(name) {
            return self.builtin_call(builtin, span, target);
        }
        if self.functions.contains_key(name) {
            return self.user_call(name, span, target);
        }
        Err(FalconError::undefined_function(name).with_span(span))
    }

    /// Comma separated argument expressions up to and including `)`
    fn arguments(&mut self) -> Result<Vec<Operand>> {
        let mut args = Vec::new();
        if self.peek_is(&Token::RParen)? {
            self.next()?;
            return Ok(args);
        }
        loop {
            args.push(self.expression(None, ExprContext::Argument)?);
            let lexeme = self.next()?;
            match lexeme.token {
                Token::Comma => {}
                Token::RParen => return Ok(args),
                other => {
                    return Err(FalconError::syntax(
                        format!("expected `,` or `)` in argument list, found {other}"),
                        lexeme.span,
                    ));
                }
            }
        }
    }

    fn builtin_call(&mut self, builtin: Builtin, span: Span, target: Option<Slot>) -> Result<()> {
        let args = self.arguments()?;
        if !builtin.accepts(args.len()) {
            let expected = if builtin.is_variadic() {
                "at least 1".to_string()
            } else {
                builtin.params().len().to_string()
            };
            return Err(FalconError::syntax(
                format!(
                    "`{}` takes {expected} argument(s), {} given",
                    builtin.name(),
                    args.len()
                ),
                span,
            ));
        }
        debug!(builtin = builtin.name(), args = args.len(), "builtin call");

        let opcode = builtin.opcode();
        match builtin {
            Builtin::Print => {
                for arg in &args {
                    self.emit(Instruction::unary(opcode, arg.slot), arg.span);
                }
                if let Some(target) = target {
                    let nil = self.literal(Value::Nil);
                    self.emit(Instruction::binary(Opcode::Copy, target, nil), span);
                }
            }
            Builtin::Input => {
                let dst = target.unwrap_or_else(|| self.temp());
                self.emit(Instruction::unary(opcode, dst), span);
            }
            Builtin::Find => {
                let dst = target.unwrap_or_else(|| self.temp());
                self.emit(
                    Instruction::ternary(opcode, dst, args[0].slot, args[1].slot),
                    span,
                );
            }
            Builtin::Numeric | Builtin::TypeOf | Builtin::Len | Builtin::Sort => {
                let dst = target.unwrap_or_else(|| self.temp());
                self.emit(Instruction::binary(opcode, dst, args[0].slot), span);
            }
        }
        Ok(())
    }

    /// Bind arguments, jump into the body and come back to a fresh label
    fn user_call(&mut self, name: &str, span: Span, target: Option<Slot>) -> Result<()> {
        let args = self.arguments()?;
        let Some(function) = self.functions.get(name).cloned() else {
            return Err(FalconError::undefined_function(name).with_span(span));
        };
        if args.len() != function.params.len() {
            return Err(FalconError::syntax(
                format!(
                    "`{name}` takes {} argument(s), {} given",
                    function.params.len(),
                    args.len()
                ),
                span,
            ));
        }
        debug!(function = %name, args = args.len(), "call");

        self.scopes.push_scope(function.scope);
        for (param, arg) in function.params.iter().zip(&args) {
            let slot = self.scopes.lookup_local(param).ok_or_else(|| {
                FalconError::internal(format!("parameter `{param}` of `{name}` is unbound"))
            })?;
            self.emit(Instruction::binary(Opcode::Copy, slot, arg.slot), arg.span);
        }
        let callee_scope = self.scopes.pop_scope()?;
        if let Some(info) = self.functions.get_mut(name) {
            info.scope = callee_scope;
        }

        let back = self.new_label();
        self.emit(
            Instruction::binary(Opcode::Copy, function.return_address, back),
            span,
        );
        self.emit(Instruction::unary(Opcode::Jump, function.entry), span);
        self.place_label(back, span)?;
        if let Some(target) = target {
            self.emit(
                Instruction::binary(Opcode::Copy, target, function.result),
                span,
            );
        }
        Ok(())
    }
}

//! Expression compilation
//!
//! An expression is first read into a flat list of nodes. Each node carries an
//! operand, the operator that follows it and a bracket delta: every `(` before
//! the operand subtracts one, every `)` after it adds one. The list is then
//! reduced region by region, innermost brackets first, running the four
//! precedence tiers left to right over each region. Every fusion of two
//! neighbouring nodes emits one instruction.

use super::{Compiler, KEYWORDS};
use crate::error::{FalconError, Result};
use crate::lexer::{Lexeme, Token};
use crate::program::{Instruction, Opcode, Slot};
use crate::span::Span;
use crate::value::{Value, Variant};
use tracing::trace;

/// Where an expression sits, which decides the tokens that end it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ExprContext {
    /// Ends at end of line or end of file
    Statement,
    /// Also ends at a top-level `,` or at the `)` closing the argument list
    Argument,
}

/// Infix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum BinaryOp {
    Pow,
    Mul,
    Div,
    Add,
    Sub,
    Equal,
    Unequal,
    GreaterEq,
    LessEq,
    Less,
    Greater,
}

impl BinaryOp {
    fn from_token(token: &Token) -> Option<Self> {
        let op = match token {
            Token::DoubleStar => BinaryOp::Pow,
            Token::Star => BinaryOp::Mul,
            Token::Slash => BinaryOp::Div,
            Token::Plus => BinaryOp::Add,
            Token::Minus => BinaryOp::Sub,
            Token::Equal => BinaryOp::Equal,
            Token::Unequal => BinaryOp::Unequal,
            Token::GreaterEq => BinaryOp::GreaterEq,
            Token::LessEq => BinaryOp::LessEq,
            Token::Less => BinaryOp::Less,
            Token::Greater => BinaryOp::Greater,
            _ => return None,
        };
        Some(op)
    }

    /// Precedence tier, 1 binds tightest
    fn tier(self) -> u8 {
        match self {
            BinaryOp::Pow => 1,
            BinaryOp::Mul | BinaryOp::Div => 2,
            BinaryOp::Add | BinaryOp::Sub => 3,
            _ => 4,
        }
    }

    fn opcode(self) -> Opcode {
        match self {
            BinaryOp::Pow => Opcode::Pow,
            BinaryOp::Mul => Opcode::Mul,
            BinaryOp::Div => Opcode::Div,
            BinaryOp::Add => Opcode::Add,
            BinaryOp::Sub => Opcode::Sub,
            BinaryOp::Equal => Opcode::Equal,
            BinaryOp::Unequal => Opcode::Unequal,
            BinaryOp::GreaterEq => Opcode::GreaterEq,
            BinaryOp::LessEq => Opcode::LessEq,
            BinaryOp::Less => Opcode::Less,
            BinaryOp::Greater => Opcode::Greater,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Pow => "**",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Equal => "==",
            BinaryOp::Unequal => "!=",
            BinaryOp::GreaterEq => ">=",
            BinaryOp::LessEq => "<=",
            BinaryOp::Less => "<",
            BinaryOp::Greater => ">",
        }
    }

    /// Compile-time operand check; an undefined operand always passes
    fn accepts(self, left: Variant, right: Variant) -> bool {
        let numeric = |v: Variant| matches!(v, Variant::Number | Variant::Undefined);
        let text_or_numeric =
            |v: Variant| matches!(v, Variant::Number | Variant::String | Variant::Undefined);
        match self {
            BinaryOp::Pow | BinaryOp::Div | BinaryOp::Sub => numeric(left) && numeric(right),
            BinaryOp::Mul => text_or_numeric(left) && numeric(right),
            BinaryOp::Add => text_or_numeric(left),
            // checked at run time
            _ => true,
        }
    }

    fn result_variant(self, left: Variant) -> Variant {
        match self {
            BinaryOp::Pow | BinaryOp::Div | BinaryOp::Sub => Variant::Number,
            BinaryOp::Mul | BinaryOp::Add => left,
            _ => Variant::Bool,
        }
    }
}

/// Compiled expression result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operand {
    pub slot: Slot,
    pub span: Span,
}

#[derive(Debug, Clone)]
struct Node {
    slot: Slot,
    variant: Variant,
    /// Operator joining this node to the next one
    op: Option<BinaryOp>,
    delta: i32,
    /// Result temporary of this expression, safe to overwrite in place
    owned: bool,
    span: Span,
}

impl<'src> Compiler<'src> {
    /// Compile one expression, optionally starting from an already read token
    ///
    /// The token that ends the expression is pushed back for the caller.
    pub(super) fn expression(
        &mut self,
        first: Option<Lexeme>,
        context: ExprContext,
    ) -> Result<Operand> {
        let mut first = first;
        let mut nodes: Vec<Node> = Vec::new();
        let mut pending_open = 0;
        let mut depth = 0;
        let mut expect_value = true;

        loop {
            let lexeme = match first.take() {
                Some(lexeme) => lexeme,
                None => self.next()?,
            };

            if expect_value {
                if lexeme.token == Token::LParen {
                    pending_open -= 1;
                    depth += 1;
                    continue;
                }
                let (slot, variant) = self.value_operand(&lexeme)?;
                nodes.push(Node {
                    slot,
                    variant,
                    op: None,
                    delta: pending_open,
                    owned: false,
                    span: lexeme.span,
                });
                pending_open = 0;
                expect_value = false;
                continue;
            }

            if let Some(op) = BinaryOp::from_token(&lexeme.token) {
                if let Some(last) = nodes.last_mut() {
                    last.op = Some(op);
                }
                expect_value = true;
                continue;
            }

            match lexeme.token {
                Token::RParen if depth > 0 => {
                    depth -= 1;
                    if let Some(last) = nodes.last_mut() {
                        last.delta += 1;
                        last.span = last.span.cover(lexeme.span);
                    }
                }
                Token::LBracket => {
                    if nodes.len() != 1 || depth != 0 || nodes[0].delta != 0 {
                        return Err(FalconError::syntax(
                            "a substring cut applies only to a single value",
                            lexeme.span,
                        ));
                    }
                    let node = nodes.remove(0);
                    return self.cut(node, lexeme.span, context);
                }
                Token::EndOfLine | Token::EndOfFile => {
                    self.push_back(lexeme)?;
                    break;
                }
                Token::RParen | Token::Comma if context == ExprContext::Argument && depth == 0 => {
                    self.push_back(lexeme)?;
                    break;
                }
                Token::RParen => {
                    return Err(FalconError::syntax("unmatched `)`", lexeme.span));
                }
                other => {
                    return Err(FalconError::syntax(
                        format!("unexpected {other} in expression"),
                        lexeme.span,
                    ));
                }
            }
        }

        if depth != 0 {
            let span = nodes.last().map(|n| n.span).unwrap_or_default();
            return Err(FalconError::syntax("unmatched `(`", span));
        }
        let node = self.reduce(nodes)?;
        Ok(Operand {
            slot: node.slot,
            span: node.span,
        })
    }

    /// Resolve a token in operand position
    fn value_operand(&mut self, lexeme: &Lexeme) -> Result<(Slot, Variant)> {
        let value = match &lexeme.token {
            Token::Number(n) => Value::Number(*n),
            Token::String(s) => Value::string(s),
            Token::Identifier(name) => match name.as_str() {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                "nil" => Value::Nil,
                _ => return self.named_operand(name, lexeme.span),
            },
            Token::EndOfLine | Token::EndOfFile => {
                return Err(FalconError::syntax("expected an expression", lexeme.span));
            }
            other => {
                return Err(FalconError::syntax(
                    format!("expected a value, found {other}"),
                    lexeme.span,
                ));
            }
        };
        let variant = value.variant();
        Ok((self.literal(value), variant))
    }

    /// Resolve an identifier through the scope chain
    fn named_operand(&self, name: &str, span: Span) -> Result<(Slot, Variant)> {
        if KEYWORDS.contains(&name) {
            return Err(FalconError::syntax(
                format!("unexpected keyword `{name}` in expression"),
                span,
            ));
        }
        let slot = self
            .scopes
            .lookup(name)
            .ok_or_else(|| FalconError::undefined_variable(name).with_span(span))?;
        let variant = self.variant_of(slot);
        if variant == Variant::Constant {
            return Err(FalconError::syntax(
                format!("reserved name `{name}` cannot be used as a value"),
                span,
            ));
        }
        Ok((slot, variant))
    }

    /// `value[from:to]`, both bounds optional; must end the expression
    fn cut(&mut self, node: Node, open: Span, context: ExprContext) -> Result<Operand> {
        let mut lexeme = self.next()?;
        let from = if lexeme.token == Token::Colon {
            None
        } else {
            let bound = self.cut_bound(&lexeme)?;
            lexeme = self.next()?;
            if lexeme.token != Token::Colon {
                return Err(FalconError::syntax(
                    format!("expected `:`, found {}", lexeme.token),
                    lexeme.span,
                ));
            }
            Some(bound)
        };

        let lexeme = self.next()?;
        let (to, close) = if lexeme.token == Token::RBracket {
            (None, lexeme.span)
        } else {
            let bound = self.cut_bound(&lexeme)?;
            let close = self.expect(Token::RBracket)?;
            (Some(bound), close.span)
        };

        let end = self.next()?;
        let ends_here = end.token.is_terminator()
            || (context == ExprContext::Argument
                && matches!(end.token, Token::Comma | Token::RParen));
        if !ends_here {
            return Err(FalconError::syntax(
                format!("expected end of expression after substring cut, found {}", end.token),
                end.span,
            ));
        }
        self.push_back(end)?;

        let span = node.span.cover(open).cover(close);
        let result = self.temp();
        self.emit(Instruction::binary(Opcode::Copy, result, node.slot), span);
        self.emit(Instruction::new(Opcode::Cut, Some(result), from, to), span);
        trace!(slot = %result, "cut");
        Ok(Operand { slot: result, span })
    }

    fn cut_bound(&mut self, lexeme: &Lexeme) -> Result<Slot> {
        match &lexeme.token {
            Token::Number(n) => Ok(self.literal(Value::Number(*n))),
            Token::Identifier(name) => Ok(self.named_operand(name, lexeme.span)?.0),
            other => Err(FalconError::syntax(
                format!("expected a number or identifier as substring bound, found {other}"),
                lexeme.span,
            )),
        }
    }

    /// Reduce bracketed regions innermost first, then the whole list
    fn reduce(&mut self, mut nodes: Vec<Node>) -> Result<Node> {
        while let Some(first) = nodes.iter().position(|n| n.delta < 0) {
            let mut start = first;
            let mut end = None;
            for (i, node) in nodes.iter().enumerate().skip(first + 1) {
                if node.delta < 0 {
                    start = i;
                } else if node.delta > 0 {
                    end = Some(i);
                    break;
                }
            }
            let Some(end) = end else {
                return Err(FalconError::syntax("unmatched `(`", nodes[first].span));
            };
            self.reduce_region(&mut nodes, start, end)?;
        }

        if let Some(node) = nodes.iter().find(|n| n.delta != 0) {
            return Err(FalconError::syntax("unmatched `)`", node.span));
        }
        if nodes.is_empty() {
            return Err(FalconError::internal("empty expression list"));
        }
        let last = nodes.len() - 1;
        self.reduce_region(&mut nodes, 0, last)?;
        nodes
            .pop()
            .ok_or_else(|| FalconError::internal("expression reduced to nothing"))
    }

    /// Collapse `nodes[start..=end]` into one node, tier by tier
    fn reduce_region(&mut self, nodes: &mut Vec<Node>, start: usize, mut end: usize) -> Result<()> {
        for tier in 1..=4 {
            let mut i = start;
            while i < end {
                match nodes[i].op {
                    Some(op) if op.tier() == tier => {
                        self.fuse(nodes, i, op)?;
                        end -= 1;
                    }
                    _ => i += 1,
                }
            }
        }
        if end != start {
            let span = nodes[start].span.cover(nodes[end].span);
            return Err(FalconError::semantic("expression could not be reduced", span));
        }
        Ok(())
    }

    /// Merge `nodes[i]` and `nodes[i + 1]` through `op`
    fn fuse(&mut self, nodes: &mut Vec<Node>, i: usize, op: BinaryOp) -> Result<()> {
        let right = nodes.remove(i + 1);
        let left = &nodes[i];
        let span = left.span.cover(right.span);
        if !op.accepts(left.variant, right.variant) {
            return Err(FalconError::semantic(
                format!(
                    "operator {} cannot be applied to {} and {}",
                    op.symbol(),
                    left.variant,
                    right.variant
                ),
                span,
            ));
        }

        let (left_slot, left_owned, left_variant, left_delta) =
            (left.slot, left.owned, left.variant, left.delta);
        let slot = if left_owned {
            self.emit(Instruction::binary(op.opcode(), left_slot, right.slot), span);
            left_slot
        } else {
            let temp = self.temp();
            self.emit(
                Instruction::ternary(op.opcode(), temp, left_slot, right.slot),
                span,
            );
            temp
        };
        trace!(op = op.symbol(), slot = %slot, "fuse");

        nodes[i] = Node {
            slot,
            variant: op.result_variant(left_variant),
            op: right.op,
            delta: left_delta + right.delta,
            owned: true,
            span,
        };
        Ok(())
    }
}

//! Precedence-climbing parser producing [`Formula`] trees.

use super::lexer::Token;
use crate::error::CompileError;
use crate::formula::{BinaryOp, Formula, Function};

pub(crate) struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    input: &'a str,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(tokens: Vec<Token>, input: &'a str) -> Self {
        Self {
            tokens,
            pos: 0,
            input,
        }
    }

    /// Parses a full expression and rejects trailing tokens.
    pub(crate) fn parse(mut self) -> Result<Formula, CompileError> {
        if self.tokens.is_empty() {
            return Err(CompileError::structural("empty expression"));
        }
        let formula = self.conditional()?;
        if let Some(token) = self.peek() {
            return Err(self.unexpected(token.clone()));
        }
        Ok(formula)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<(), CompileError> {
        if self.eat(&expected) {
            Ok(())
        } else {
            Err(CompileError::structural(format!(
                "expected {} in '{}'",
                what, self.input
            )))
        }
    }

    fn unexpected(&self, token: Token) -> CompileError {
        CompileError::structural(format!("unexpected {:?} in '{}'", token, self.input))
    }

    fn conditional(&mut self) -> Result<Formula, CompileError> {
        let condition = self.binary(BinaryOp::Or.precedence())?;
        if !self.eat(&Token::Question) {
            return Ok(condition);
        }
        let consequent = self.conditional()?;
        if self.eat(&Token::Colon) {
            let alternative = self.conditional()?;
            Ok(Formula::if_else(condition, consequent, alternative))
        } else {
            Ok(Formula::when(condition, consequent))
        }
    }

    fn binary(&mut self, min_precedence: u8) -> Result<Formula, CompileError> {
        let mut left = self.unary()?;
        while let Some(op) = self.peek_binary_op() {
            let precedence = op.precedence();
            if precedence < min_precedence {
                break;
            }
            self.pos += 1;
            let right = self.binary(precedence + 1)?;
            left = Formula::binary(op, left, right);
        }
        Ok(left)
    }

    fn peek_binary_op(&self) -> Option<BinaryOp> {
        let Some(Token::Op(symbol)) = self.peek() else {
            return None;
        };
        Some(match *symbol {
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "<" => BinaryOp::Lt,
            "<=" => BinaryOp::Le,
            ">" => BinaryOp::Gt,
            ">=" => BinaryOp::Ge,
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::Ne,
            "&&" => BinaryOp::And,
            "||" => BinaryOp::Or,
            _ => return None,
        })
    }

    fn unary(&mut self) -> Result<Formula, CompileError> {
        if self.eat(&Token::Op("-")) {
            return Ok(self.unary()?.neg());
        }
        if self.eat(&Token::Op("!")) {
            return Ok(self.unary()?.not());
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Formula, CompileError> {
        let token = self
            .advance()
            .ok_or_else(|| CompileError::structural(format!("unexpected end of '{}'", self.input)))?;

        match token {
            Token::Number(value) => Ok(Formula::number(value)),
            Token::Text(value) => Ok(Formula::text(value)),
            Token::Capture(index) => Ok(Formula::capture(index)),
            Token::QuotedIdent(name) => Ok(Formula::attr(name)),
            Token::LParen => {
                let inner = self.conditional()?;
                self.expect(Token::RParen, "')'")?;
                Ok(inner)
            }
            Token::Ident(name) => {
                if self.peek() == Some(&Token::LParen) {
                    return self.call(&name);
                }
                Ok(match name.as_str() {
                    "source" => Formula::source(),
                    "null" => Formula::Null,
                    _ => Formula::attr(name),
                })
            }
            other => Err(self.unexpected(other)),
        }
    }

    fn call(&mut self, name: &str) -> Result<Formula, CompileError> {
        let function = Function::from_name(name)
            .ok_or_else(|| CompileError::semantic(format!("unknown function '{}'", name)))?;
        self.expect(Token::LParen, "'('")?;

        let mut args = Vec::new();
        if !self.eat(&Token::RParen) {
            loop {
                args.push(self.conditional()?);
                if self.eat(&Token::Comma) {
                    continue;
                }
                self.expect(Token::RParen, "',' or ')'")?;
                break;
            }
        }

        function.check_arity(args.len()).map_err(|expected| {
            CompileError::structural(format!(
                "{}() takes {} arguments, got {}",
                name,
                expected,
                args.len()
            ))
        })?;
        Ok(Formula::call(function, args))
    }
}

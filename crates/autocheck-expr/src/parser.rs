//! Recursive-descent parser with Python operator precedence:
//! `^` < `+ -` < `* /` < unary `- + ~` < `**` (right-associative).
//!
//! Both the recursion and the depth of the resulting tree are capped at
//! [`MAX_DEPTH`], so hostile input fails with [`ExprError::TooDeep`] instead of
//! exhausting the stack here or in the recursive tree walks.

use crate::error::{ExprError, ExprResult};
use crate::expr::Expr;
use crate::lexer::{tokenize, Spanned, Token};

pub const MAX_DEPTH: usize = 256;

pub fn parse(input: &str) -> ExprResult<Expr> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        nesting: 0,
    };
    let parsed = parser.xor()?;
    match parser.tokens.get(parser.pos) {
        None => Ok(parsed.expr),
        Some(extra) => Err(unexpected(extra)),
    }
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    /// Active recursion through `unary`.
    nesting: usize,
}

/// A subtree and its height.
struct Parsed {
    expr: Expr,
    depth: usize,
}

impl Parsed {
    fn leaf(expr: Expr) -> Self {
        Self { expr, depth: 1 }
    }

    fn unary(inner: Parsed, make: fn(Box<Expr>) -> Expr) -> ExprResult<Self> {
        let depth = checked(inner.depth + 1)?;
        Ok(Self {
            expr: make(Box::new(inner.expr)),
            depth,
        })
    }

    fn binary(
        lhs: Parsed,
        rhs: Parsed,
        make: fn(Box<Expr>, Box<Expr>) -> Expr,
    ) -> ExprResult<Self> {
        let depth = checked(lhs.depth.max(rhs.depth) + 1)?;
        Ok(Self {
            expr: make(Box::new(lhs.expr), Box::new(rhs.expr)),
            depth,
        })
    }
}

fn checked(depth: usize) -> ExprResult<usize> {
    if depth > MAX_DEPTH {
        Err(ExprError::TooDeep(MAX_DEPTH))
    } else {
        Ok(depth)
    }
}

fn unexpected(spanned: &Spanned) -> ExprError {
    ExprError::UnexpectedToken {
        found: spanned.token.to_string(),
        position: spanned.position,
    }
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn next(&mut self) -> ExprResult<Spanned> {
        let spanned = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or(ExprError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(spanned)
    }

    fn expect(&mut self, token: &Token) -> ExprResult<()> {
        let spanned = self.next()?;
        if &spanned.token == token {
            Ok(())
        } else {
            Err(unexpected(&spanned))
        }
    }

    fn xor(&mut self) -> ExprResult<Parsed> {
        let mut lhs = self.additive()?;
        while self.eat(&Token::Caret) {
            let rhs = self.additive()?;
            lhs = Parsed::binary(lhs, rhs, Expr::Xor)?;
        }
        Ok(lhs)
    }

    fn additive(&mut self) -> ExprResult<Parsed> {
        let mut lhs = self.term()?;
        loop {
            if self.eat(&Token::Plus) {
                let rhs = self.term()?;
                lhs = Parsed::binary(lhs, rhs, Expr::Add)?;
            } else if self.eat(&Token::Minus) {
                let rhs = self.term()?;
                lhs = Parsed::binary(lhs, rhs, Expr::Sub)?;
            } else {
                return Ok(lhs);
            }
        }
    }

    fn term(&mut self) -> ExprResult<Parsed> {
        let mut lhs = self.unary()?;
        loop {
            if self.eat(&Token::Star) {
                let rhs = self.unary()?;
                lhs = Parsed::binary(lhs, rhs, Expr::Mul)?;
            } else if self.eat(&Token::Slash) {
                let rhs = self.unary()?;
                lhs = Parsed::binary(lhs, rhs, Expr::Div)?;
            } else {
                return Ok(lhs);
            }
        }
    }

    /// Every recursive path (parentheses, arguments, signs, exponents)
    /// passes through here.
    fn unary(&mut self) -> ExprResult<Parsed> {
        self.nesting += 1;
        let result = if self.nesting > MAX_DEPTH {
            Err(ExprError::TooDeep(MAX_DEPTH))
        } else {
            self.signed()
        };
        self.nesting -= 1;
        result
    }

    fn signed(&mut self) -> ExprResult<Parsed> {
        if self.eat(&Token::Minus) {
            Parsed::unary(self.unary()?, Expr::Neg)
        } else if self.eat(&Token::Plus) {
            self.unary()
        } else if self.eat(&Token::Tilde) {
            Parsed::unary(self.unary()?, Expr::Not)
        } else {
            self.power()
        }
    }

    fn power(&mut self) -> ExprResult<Parsed> {
        let base = self.atom()?;
        if self.eat(&Token::Power) {
            // the exponent may itself be signed: x**-2
            let exponent = self.unary()?;
            Parsed::binary(base, exponent, Expr::Pow)
        } else {
            Ok(base)
        }
    }

    fn atom(&mut self) -> ExprResult<Parsed> {
        let spanned = self.next()?;
        match spanned.token {
            Token::Int(i) => Ok(Parsed::leaf(Expr::Int(i))),
            Token::Float(x) => Ok(Parsed::leaf(Expr::Float(x))),
            Token::Ident(name) => {
                if self.eat(&Token::LParen) {
                    let args = self.arguments()?;
                    let depth = checked(args.iter().map(|a| a.depth).max().unwrap_or(0) + 1)?;
                    let args = args.into_iter().map(|a| a.expr).collect();
                    Ok(Parsed {
                        expr: Expr::Call(name, args),
                        depth,
                    })
                } else {
                    Ok(Parsed::leaf(Expr::Symbol(name)))
                }
            }
            Token::LParen => {
                let inner = self.xor()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            _ => Err(unexpected(&spanned)),
        }
    }

    /// Comma-separated arguments after an opening parenthesis.
    fn arguments(&mut self) -> ExprResult<Vec<Parsed>> {
        let mut args = Vec::new();
        if self.eat(&Token::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.xor()?);
            if self.eat(&Token::Comma) {
                continue;
            }
            self.expect(&Token::RParen)?;
            return Ok(args);
        }
    }
}

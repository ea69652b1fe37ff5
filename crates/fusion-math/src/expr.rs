// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Expression Evaluator
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Scalar math expressions over named variables.
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! sum     := product (("+" | "-") product)*
//! product := unary (("*" | "/") unary)*
//! unary   := ("-" | "+") unary | power
//! power   := primary ("^" unary)?          // right-associative
//! primary := number | name | name "(" args ")" | "(" sum ")"
//! ```
//!
//! Names resolve to bound variables first, then to the constants `pi`
//! and `e`. Functions: `sin cos tan asin acos atan sinh cosh tanh exp
//! ln log log10 sqrt abs floor ceil` (one argument) and
//! `pow min max atan2` (two arguments). `log` is the natural logarithm.
//!
//! Sources are limited to [`MAX_TOKENS`] tokens and [`MAX_NESTING`] levels
//! of signs, parentheses and exponents.

use fusion_types::error::{FusionError, FusionResult};
use logos::Logos;
use std::ops::Range;

/// Longest accepted token stream. Also bounds the depth of the parsed tree.
pub const MAX_TOKENS: usize = 2048;

/// Deepest accepted nesting of unary signs, parentheses and exponents.
pub const MAX_NESTING: usize = 128;

/// Callable produced by an [`ExpressionCompiler`]. Takes one value per
/// bound variable, in binding order.
pub type CompiledFn = Box<dyn Fn(&[f64]) -> FusionResult<f64> + Send + Sync>;

/// Compiles a textual expression with a list of variable names into a
/// real-valued function.
pub trait ExpressionCompiler {
    fn compile(&self, source: &str, variables: &[&str]) -> FusionResult<CompiledFn>;
}

/// Compiler backed by [`Expression`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardCompiler;

impl ExpressionCompiler for StandardCompiler {
    fn compile(&self, source: &str, variables: &[&str]) -> FusionResult<CompiledFn> {
        let expr = Expression::parse(source, variables)?;
        tracing::debug!(expression = source, ?variables, "compiled expression");
        Ok(Box::new(move |values: &[f64]| expr.eval(values)))
    }
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
enum Token {
    #[regex(r"[0-9]+(\.[0-9]*)?([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Name(String),

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("^")]
    Caret,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Func {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Exp,
    Ln,
    Log10,
    Sqrt,
    Abs,
    Floor,
    Ceil,
    Pow,
    Min,
    Max,
    Atan2,
}

impl Func {
    fn lookup(name: &str) -> Option<Self> {
        let func = match name {
            "sin" => Func::Sin,
            "cos" => Func::Cos,
            "tan" => Func::Tan,
            "asin" => Func::Asin,
            "acos" => Func::Acos,
            "atan" => Func::Atan,
            "sinh" => Func::Sinh,
            "cosh" => Func::Cosh,
            "tanh" => Func::Tanh,
            "exp" => Func::Exp,
            "ln" | "log" => Func::Ln,
            "log10" => Func::Log10,
            "sqrt" => Func::Sqrt,
            "abs" => Func::Abs,
            "floor" => Func::Floor,
            "ceil" => Func::Ceil,
            "pow" => Func::Pow,
            "min" => Func::Min,
            "max" => Func::Max,
            "atan2" => Func::Atan2,
            _ => return None,
        };
        Some(func)
    }

    fn arity(self) -> usize {
        match self {
            Func::Pow | Func::Min | Func::Max | Func::Atan2 => 2,
            _ => 1,
        }
    }

    fn apply(self, args: &[f64]) -> f64 {
        let x = args[0];
        match self {
            Func::Sin => x.sin(),
            Func::Cos => x.cos(),
            Func::Tan => x.tan(),
            Func::Asin => x.asin(),
            Func::Acos => x.acos(),
            Func::Atan => x.atan(),
            Func::Sinh => x.sinh(),
            Func::Cosh => x.cosh(),
            Func::Tanh => x.tanh(),
            Func::Exp => x.exp(),
            Func::Ln => x.ln(),
            Func::Log10 => x.log10(),
            Func::Sqrt => x.sqrt(),
            Func::Abs => x.abs(),
            Func::Floor => x.floor(),
            Func::Ceil => x.ceil(),
            Func::Pow => x.powf(args[1]),
            Func::Min => x.min(args[1]),
            Func::Max => x.max(args[1]),
            Func::Atan2 => x.atan2(args[1]),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Const(f64),
    Var(usize),
    Neg(Box<Node>),
    Binary(BinOp, Box<Node>, Box<Node>),
    Call(Func, Vec<Node>),
}

impl Node {
    fn eval(&self, values: &[f64]) -> f64 {
        match self {
            Node::Const(v) => *v,
            Node::Var(slot) => values[*slot],
            Node::Neg(inner) => -inner.eval(values),
            Node::Binary(op, lhs, rhs) => {
                let a = lhs.eval(values);
                let b = rhs.eval(values);
                match op {
                    BinOp::Add => a + b,
                    BinOp::Sub => a - b,
                    BinOp::Mul => a * b,
                    BinOp::Div => a / b,
                    BinOp::Pow => a.powf(b),
                }
            }
            Node::Call(func, args) => {
                let mut evaluated = [0.0; 2];
                for (slot, arg) in evaluated.iter_mut().zip(args) {
                    *slot = arg.eval(values);
                }
                func.apply(&evaluated[..args.len()])
            }
        }
    }
}

/// Parsed expression bound to an ordered list of variable names.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    variables: Vec<String>,
    root: Node,
}

impl Expression {
    /// Parse `source` with `variables` bound in the given order.
    pub fn parse(source: &str, variables: &[&str]) -> FusionResult<Self> {
        let compile_error = |message: String| FusionError::ExpressionCompile {
            expression: source.to_string(),
            message,
        };

        for (i, name) in variables.iter().enumerate() {
            if !is_identifier(name) {
                return Err(compile_error(format!("invalid variable name '{name}'")));
            }
            if Func::lookup(name).is_some() {
                return Err(compile_error(format!(
                    "variable '{name}' shadows a built-in function"
                )));
            }
            if variables[..i].contains(name) {
                return Err(compile_error(format!("variable '{name}' bound twice")));
            }
        }

        let mut tokens = Vec::new();
        for (token, span) in Token::lexer(source).spanned() {
            match token {
                Ok(_) if tokens.len() == MAX_TOKENS => {
                    return Err(compile_error(format!(
                        "expression longer than {MAX_TOKENS} tokens"
                    )))
                }
                Ok(token) => tokens.push((token, span)),
                Err(()) => {
                    return Err(compile_error(format!(
                        "unexpected character(s) '{}' at {}",
                        &source[span.clone()],
                        span.start
                    )))
                }
            }
        }
        if tokens.is_empty() {
            return Err(compile_error("empty expression".to_string()));
        }

        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            variables,
            end: source.len(),
            depth: 0,
        };
        let root = parser.sum().map_err(compile_error)?;
        if let Some((token, span)) = parser.peek_spanned() {
            return Err(compile_error(format!(
                "unexpected {token:?} at {}",
                span.start
            )));
        }

        Ok(Expression {
            source: source.to_string(),
            variables: variables.iter().map(|v| v.to_string()).collect(),
            root,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Evaluate with one value per bound variable. Non-finite results are
    /// errors.
    pub fn eval(&self, values: &[f64]) -> FusionResult<f64> {
        if values.len() != self.variables.len() {
            return Err(FusionError::ExpressionEval {
                expression: self.source.clone(),
                message: format!(
                    "expected {} value(s), got {}",
                    self.variables.len(),
                    values.len()
                ),
            });
        }
        let result = self.root.eval(values);
        if !result.is_finite() {
            let bindings = self
                .variables
                .iter()
                .zip(values)
                .map(|(name, v)| format!("{name}={v}"))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(FusionError::ExpressionEval {
                expression: self.source.clone(),
                message: format!("non-finite result {result} at {bindings}"),
            });
        }
        Ok(result)
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

struct Parser<'a> {
    tokens: &'a [(Token, Range<usize>)],
    pos: usize,
    variables: &'a [&'a str],
    end: usize,
    depth: usize,
}

type ParseResult = Result<Node, String>;

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn peek_spanned(&self) -> Option<&'a (Token, Range<usize>)> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos).map(|(t, _)| t);
        self.pos += 1;
        token
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(_, span)| span.start)
            .unwrap_or(self.end)
    }

    fn expect(&mut self, want: Token, what: &str) -> Result<(), String> {
        match self.peek() {
            Some(token) if *token == want => {
                self.pos += 1;
                Ok(())
            }
            Some(token) => Err(format!("expected {what}, found {token:?} at {}", self.offset())),
            None => Err(format!("expected {what}, found end of input")),
        }
    }

    fn sum(&mut self) -> ParseResult {
        let mut lhs = self.product()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.product()?;
            lhs = Node::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn product(&mut self) -> ParseResult {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Node::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    /// Every nested construct re-enters here, so this is where depth is
    /// counted.
    fn unary(&mut self) -> ParseResult {
        if self.depth == MAX_NESTING {
            return Err(format!(
                "nesting deeper than {MAX_NESTING} levels at {}",
                self.offset()
            ));
        }
        self.depth += 1;
        let node = self.signed();
        self.depth -= 1;
        node
    }

    fn signed(&mut self) -> ParseResult {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(Node::Neg(Box::new(self.unary()?)))
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> ParseResult {
        let base = self.primary()?;
        if self.peek() == Some(&Token::Caret) {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(Node::Binary(BinOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn primary(&mut self) -> ParseResult {
        let offset = self.offset();
        match self.advance() {
            Some(Token::Number(v)) => Ok(Node::Const(*v)),
            Some(Token::LParen) => {
                let inner = self.sum()?;
                self.expect(Token::RParen, "')'")?;
                Ok(inner)
            }
            Some(Token::Name(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    self.pos += 1;
                    return self.call(name, offset);
                }
                if let Some(slot) = self.variables.iter().position(|v| v == name) {
                    return Ok(Node::Var(slot));
                }
                match name.as_str() {
                    "pi" => Ok(Node::Const(std::f64::consts::PI)),
                    "e" => Ok(Node::Const(std::f64::consts::E)),
                    _ => Err(format!("unknown name '{name}' at {offset}")),
                }
            }
            Some(token) => Err(format!("unexpected {token:?} at {offset}")),
            None => Err("unexpected end of input".to_string()),
        }
    }

    fn call(&mut self, name: &str, offset: usize) -> ParseResult {
        let func = Func::lookup(name).ok_or_else(|| format!("unknown function '{name}' at {offset}"))?;
        let mut args = Vec::with_capacity(func.arity());
        if self.peek() != Some(&Token::RParen) {
            args.push(self.sum()?);
            while self.peek() == Some(&Token::Comma) {
                self.pos += 1;
                args.push(self.sum()?);
            }
        }
        self.expect(Token::RParen, "')'")?;
        if args.len() != func.arity() {
            return Err(format!(
                "function '{name}' takes {} argument(s), got {}",
                func.arity(),
                args.len()
            ));
        }
        Ok(Node::Call(func, args))
    }
}

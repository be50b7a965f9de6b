//! Expression engine for selections, variables and weights over event columns.
//!
//! Operators from lowest to highest precedence: `||`, `&&`, comparisons
//! (`== != < <= > >=`), `+ -`, `* /`, unary `-` and `!`. Atoms are numbers,
//! `true`/`false`, column names, parenthesised expressions and calls to
//! `abs`, `sqrt`, `log`, `exp`, `pow`, `min`, `max`.
//!
//! Booleans evaluate to `1.0`/`0.0`; any non-zero value counts as true.

use crate::error::{FrameError, Result};
use crate::table::EventTable;

// ── AST ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Const(f64),
    Column(usize),
    Neg(Box<Node>),
    Not(Box<Node>),
    Binary(Op, Box<Node>, Box<Node>),
    Call(Func, Vec<Node>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
}

impl Op {
    fn precedence(self) -> u8 {
        match self {
            Op::Or => 1,
            Op::And => 2,
            Op::Eq | Op::Ne | Op::Lt | Op::Le | Op::Gt | Op::Ge => 3,
            Op::Add | Op::Sub => 4,
            Op::Mul | Op::Div => 5,
        }
    }

    #[inline]
    fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            Op::Add => a + b,
            Op::Sub => a - b,
            Op::Mul => a * b,
            Op::Div => a / b,
            Op::Eq => truth((a - b).abs() < f64::EPSILON),
            Op::Ne => truth((a - b).abs() >= f64::EPSILON),
            Op::Lt => truth(a < b),
            Op::Le => truth(a <= b),
            Op::Gt => truth(a > b),
            Op::Ge => truth(a >= b),
            Op::And => truth(a != 0.0 && b != 0.0),
            Op::Or => truth(a != 0.0 || b != 0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Func {
    Abs,
    Sqrt,
    Log,
    Exp,
    Pow,
    Min,
    Max,
}

impl Func {
    fn lookup(name: &str) -> Option<Self> {
        Some(match name {
            "abs" => Func::Abs,
            "sqrt" => Func::Sqrt,
            "log" => Func::Log,
            "exp" => Func::Exp,
            "pow" => Func::Pow,
            "min" => Func::Min,
            "max" => Func::Max,
            _ => return None,
        })
    }

    fn arity(self) -> usize {
        match self {
            Func::Pow | Func::Min | Func::Max => 2,
            _ => 1,
        }
    }

    /// `b` is ignored by the unary functions.
    #[inline]
    fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            Func::Abs => a.abs(),
            Func::Sqrt => a.sqrt(),
            Func::Log => a.ln(),
            Func::Exp => a.exp(),
            Func::Pow => a.powf(b),
            Func::Min => a.min(b),
            Func::Max => a.max(b),
        }
    }
}

#[inline]
fn truth(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

// ── Compiled expression ────────────────────────────────────────

/// A parsed expression bound to the column names it references.
#[derive(Debug, Clone)]
pub struct Expr {
    source: String,
    root: Node,
    columns: Vec<String>,
}

impl Expr {
    /// Parse an expression. Identifiers that are not function names are
    /// column references.
    pub fn compile(source: &str) -> Result<Self> {
        let tokens = tokenize(source)?;
        let mut parser = Parser { tokens: &tokens, pos: 0, columns: Vec::new(), source };
        let root = parser.parse_binary(1)?;
        if let Some(tok) = parser.tokens.get(parser.pos) {
            return Err(parser.error(format!("unexpected trailing token {tok:?}")));
        }
        let columns = parser.columns;
        Ok(Expr { source: source.to_string(), root, columns })
    }

    /// The original expression text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Column names referenced, in order of first occurrence.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// `true` when the expression references no column.
    pub fn is_constant(&self) -> bool {
        self.columns.is_empty()
    }

    /// Evaluate for one row; `values` follow the order of [`Expr::columns`].
    pub fn eval_row(&self, values: &[f64]) -> f64 {
        eval_row(&self.root, values)
    }

    /// Evaluate over every row of `table`, column-wise.
    pub fn eval_table(&self, table: &EventTable) -> Result<Vec<f64>> {
        let cols: Vec<&[f64]> =
            self.columns.iter().map(|c| table.column(c)).collect::<Result<_>>()?;
        Ok(eval_columns(&self.root, &cols, table.n_rows()))
    }
}

fn eval_row(node: &Node, vals: &[f64]) -> f64 {
    match node {
        Node::Const(c) => *c,
        Node::Column(i) => vals[*i],
        Node::Neg(a) => -eval_row(a, vals),
        Node::Not(a) => truth(eval_row(a, vals) == 0.0),
        Node::Binary(op, a, b) => op.apply(eval_row(a, vals), eval_row(b, vals)),
        Node::Call(f, args) => {
            let a = eval_row(&args[0], vals);
            let b = args.get(1).map_or(0.0, |e| eval_row(e, vals));
            f.apply(a, b)
        }
    }
}

fn eval_columns(node: &Node, cols: &[&[f64]], n: usize) -> Vec<f64> {
    match node {
        Node::Const(c) => vec![*c; n],
        Node::Column(i) => cols[*i].to_vec(),
        Node::Neg(a) => {
            let mut v = eval_columns(a, cols, n);
            v.iter_mut().for_each(|x| *x = -*x);
            v
        }
        Node::Not(a) => {
            let mut v = eval_columns(a, cols, n);
            v.iter_mut().for_each(|x| *x = truth(*x == 0.0));
            v
        }
        Node::Binary(op, a, b) => {
            let mut lhs = eval_columns(a, cols, n);
            let rhs = eval_columns(b, cols, n);
            for (x, y) in lhs.iter_mut().zip(&rhs) {
                *x = op.apply(*x, *y);
            }
            lhs
        }
        Node::Call(f, args) => {
            let mut a = eval_columns(&args[0], cols, n);
            match args.get(1) {
                Some(second) => {
                    let b = eval_columns(second, cols, n);
                    for (x, y) in a.iter_mut().zip(&b) {
                        *x = f.apply(*x, *y);
                    }
                }
                None => a.iter_mut().for_each(|x| *x = f.apply(*x, 0.0)),
            }
            a
        }
    }
}

// ── Tokenizer ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    Op(Op),
    Minus,
    Bang,
    LParen,
    RParen,
    Comma,
}

fn tokenize(source: &str) -> Result<Vec<Token>> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        let next = bytes.get(i + 1).copied();
        let (tok, width) = match (c, next) {
            (b'&', Some(b'&')) => (Token::Op(Op::And), 2),
            (b'|', Some(b'|')) => (Token::Op(Op::Or), 2),
            (b'=', Some(b'=')) => (Token::Op(Op::Eq), 2),
            (b'!', Some(b'=')) => (Token::Op(Op::Ne), 2),
            (b'<', Some(b'=')) => (Token::Op(Op::Le), 2),
            (b'>', Some(b'=')) => (Token::Op(Op::Ge), 2),
            (b'<', _) => (Token::Op(Op::Lt), 1),
            (b'>', _) => (Token::Op(Op::Gt), 1),
            (b'+', _) => (Token::Op(Op::Add), 1),
            (b'-', _) => (Token::Minus, 1),
            (b'*', _) => (Token::Op(Op::Mul), 1),
            (b'/', _) => (Token::Op(Op::Div), 1),
            (b'!', _) => (Token::Bang, 1),
            (b'(', _) => (Token::LParen, 1),
            (b')', _) => (Token::RParen, 1),
            (b',', _) => (Token::Comma, 1),
            _ if c.is_ascii_digit() || c == b'.' => {
                let start = i;
                let mut j = i;
                while j < bytes.len() {
                    let d = bytes[j];
                    let exp_sign =
                        (d == b'+' || d == b'-') && j > start && matches!(bytes[j - 1], b'e' | b'E');
                    if d.is_ascii_digit() || d == b'.' || d == b'e' || d == b'E' || exp_sign {
                        j += 1;
                    } else {
                        break;
                    }
                }
                let text = &source[start..j];
                let n: f64 = text.parse().map_err(|_| {
                    FrameError::Expression(format!("invalid number '{text}' in '{source}'"))
                })?;
                (Token::Num(n), j - start)
            }
            _ if c.is_ascii_alphabetic() || c == b'_' => {
                let start = i;
                let mut j = i;
                while j < bytes.len() && (bytes[j].is_ascii_alphanumeric() || bytes[j] == b'_') {
                    j += 1;
                }
                (Token::Ident(source[start..j].to_string()), j - start)
            }
            _ => {
                return Err(FrameError::Expression(format!(
                    "unexpected character '{}' in '{source}'",
                    c as char
                )));
            }
        };
        tokens.push(tok);
        i += width;
    }

    Ok(tokens)
}

// ── Parser (precedence climbing) ───────────────────────────────

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    columns: Vec<String>,
    source: &'a str,
}

impl Parser<'_> {
    fn error(&self, message: String) -> FrameError {
        FrameError::Expression(format!("{message} in '{}'", self.source))
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn peek_binary(&self) -> Option<Op> {
        match self.tokens.get(self.pos) {
            Some(Token::Op(op)) => Some(*op),
            Some(Token::Minus) => Some(Op::Sub),
            _ => None,
        }
    }

    fn column_index(&mut self, name: &str) -> usize {
        match self.columns.iter().position(|c| c == name) {
            Some(i) => i,
            None => {
                self.columns.push(name.to_string());
                self.columns.len() - 1
            }
        }
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<Node> {
        let mut lhs = self.parse_unary()?;
        while let Some(op) = self.peek_binary() {
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            self.pos += 1;
            let rhs = self.parse_binary(prec + 1)?;
            lhs = Node::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Node> {
        match self.tokens.get(self.pos) {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(Node::Neg(Box::new(self.parse_unary()?)))
            }
            Some(Token::Bang) => {
                self.pos += 1;
                Ok(Node::Not(Box::new(self.parse_unary()?)))
            }
            _ => self.parse_atom(),
        }
    }

    fn parse_atom(&mut self) -> Result<Node> {
        match self.next() {
            Some(Token::Num(n)) => Ok(Node::Const(n)),
            Some(Token::LParen) => {
                let inner = self.parse_binary(1)?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    other => Err(self.error(format!("expected ')', got {other:?}"))),
                }
            }
            Some(Token::Ident(name)) if name == "true" => Ok(Node::Const(1.0)),
            Some(Token::Ident(name)) if name == "false" => Ok(Node::Const(0.0)),
            Some(Token::Ident(name)) => {
                if !matches!(self.tokens.get(self.pos), Some(Token::LParen)) {
                    return Ok(Node::Column(self.column_index(&name)));
                }
                self.pos += 1;
                let func = Func::lookup(&name)
                    .ok_or_else(|| self.error(format!("unknown function '{name}'")))?;
                let mut args = vec![self.parse_binary(1)?];
                while matches!(self.tokens.get(self.pos), Some(Token::Comma)) {
                    self.pos += 1;
                    args.push(self.parse_binary(1)?);
                }
                match self.next() {
                    Some(Token::RParen) => {}
                    other => return Err(self.error(format!("expected ')', got {other:?}"))),
                }
                if args.len() != func.arity() {
                    return Err(self.error(format!(
                        "'{name}' takes {} argument(s), got {}",
                        func.arity(),
                        args.len()
                    )));
                }
                Ok(Node::Call(func, args))
            }
            other => Err(self.error(format!("expected number, column or '(', got {other:?}"))),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────

//! String expressions over frame columns.
//!
//! Supports arithmetic (+, -, *, /), comparisons (==, !=, <, <=, >, >=),
//! boolean operators (&&, ||, !), and built-in functions (abs, sqrt, log,
//! exp, pow, min, max). Identifiers are column names; booleans are `1.0`
//! and `0.0`, and any value `> 0` is true.

use ns_core::{Error, Result};

use crate::column::Kernel;

#[derive(Debug, Clone)]
enum Node {
    Num(f64),
    Col(usize),
    Neg(Box<Node>),
    Not(Box<Node>),
    Bin(Op, Box<Node>, Box<Node>),
    Call(Func, Vec<Node>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, Copy)]
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
    fn lookup(name: &str) -> Option<(Func, usize)> {
        Some(match name {
            "abs" => (Func::Abs, 1),
            "sqrt" => (Func::Sqrt, 1),
            "log" => (Func::Log, 1),
            "exp" => (Func::Exp, 1),
            "pow" => (Func::Pow, 2),
            "min" => (Func::Min, 2),
            "max" => (Func::Max, 2),
            _ => return None,
        })
    }
}

/// A compiled expression, evaluable row by row.
#[derive(Debug, Clone)]
pub struct CompiledExpr {
    root: Node,
    inputs: Vec<String>,
}

impl CompiledExpr {
    /// Parse and compile an expression string.
    pub fn compile(source: &str) -> Result<Self> {
        let tokens = tokenize(source)?;
        let mut p = Parser { tokens: &tokens, pos: 0, inputs: Vec::new() };
        let root = p.or()?;
        if let Some(t) = p.peek() {
            return Err(Error::Expression(format!(
                "unexpected token after expression in '{source}': {t:?}"
            )));
        }
        Ok(CompiledExpr { root, inputs: p.inputs })
    }

    /// Columns referenced by the expression, ordered by first occurrence.
    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    /// Evaluate for one row; `values` follows [`CompiledExpr::inputs`] order.
    pub fn eval(&self, values: &[f64]) -> f64 {
        eval(&self.root, values)
    }

    /// Turn the expression into a scalar column kernel.
    pub fn into_kernel(self) -> Kernel {
        let root = self.root;
        Kernel::scalar(move |xs| eval(&root, xs))
    }
}

#[inline]
fn truth(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

fn eval(node: &Node, vals: &[f64]) -> f64 {
    match node {
        Node::Num(v) => *v,
        Node::Col(i) => vals[*i],
        Node::Neg(a) => -eval(a, vals),
        Node::Not(a) => truth(eval(a, vals) <= 0.0),
        Node::Bin(op, a, b) => {
            let l = eval(a, vals);
            // Short-circuit the boolean operators.
            match op {
                Op::And if l <= 0.0 => return 0.0,
                Op::Or if l > 0.0 => return 1.0,
                _ => {}
            }
            let r = eval(b, vals);
            match op {
                Op::Add => l + r,
                Op::Sub => l - r,
                Op::Mul => l * r,
                Op::Div => l / r,
                Op::Eq => truth((l - r).abs() < f64::EPSILON),
                Op::Ne => truth((l - r).abs() >= f64::EPSILON),
                Op::Lt => truth(l < r),
                Op::Le => truth(l <= r),
                Op::Gt => truth(l > r),
                Op::Ge => truth(l >= r),
                Op::And | Op::Or => truth(r > 0.0),
            }
        }
        Node::Call(f, args) => {
            let x = eval(&args[0], vals);
            match f {
                Func::Abs => x.abs(),
                Func::Sqrt => x.sqrt(),
                Func::Log => x.ln(),
                Func::Exp => x.exp(),
                Func::Pow => x.powf(eval(&args[1], vals)),
                Func::Min => x.min(eval(&args[1], vals)),
                Func::Max => x.max(eval(&args[1], vals)),
            }
        }
    }
}

// ── Tokens ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Num(f64),
    Ident(String),
    Op(Op),
    Minus,
    Bang,
    LParen,
    RParen,
    Comma,
}

fn tokenize(src: &str) -> Result<Vec<Tok>> {
    let bytes = src.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;
        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        let two = src.get(i..i + 2).unwrap_or("");
        let op2 = match two {
            "&&" => Some(Op::And),
            "||" => Some(Op::Or),
            "==" => Some(Op::Eq),
            "!=" => Some(Op::Ne),
            "<=" => Some(Op::Le),
            ">=" => Some(Op::Ge),
            _ => None,
        };
        if let Some(op) = op2 {
            out.push(Tok::Op(op));
            i += 2;
            continue;
        }

        let single = match c {
            '+' => Some(Tok::Op(Op::Add)),
            '-' => Some(Tok::Minus),
            '*' => Some(Tok::Op(Op::Mul)),
            '/' => Some(Tok::Op(Op::Div)),
            '<' => Some(Tok::Op(Op::Lt)),
            '>' => Some(Tok::Op(Op::Gt)),
            '!' => Some(Tok::Bang),
            '(' => Some(Tok::LParen),
            ')' => Some(Tok::RParen),
            ',' => Some(Tok::Comma),
            _ => None,
        };
        if let Some(t) = single {
            out.push(t);
            i += 1;
            continue;
        }

        if c.is_ascii_digit() || c == '.' {
            let start = i;
            while i < bytes.len() {
                let d = bytes[i] as char;
                let exp_sign = (d == '+' || d == '-')
                    && i > start
                    && matches!(bytes[i - 1] as char, 'e' | 'E');
                if d.is_ascii_digit() || d == '.' || d == 'e' || d == 'E' || exp_sign {
                    i += 1;
                } else {
                    break;
                }
            }
            let text = &src[start..i];
            let v: f64 = text
                .parse()
                .map_err(|_| Error::Expression(format!("invalid number: '{text}'")))?;
            out.push(Tok::Num(v));
            continue;
        }

        if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < bytes.len() && ((bytes[i] as char).is_ascii_alphanumeric() || bytes[i] == b'_')
            {
                i += 1;
            }
            out.push(Tok::Ident(src[start..i].to_string()));
            continue;
        }

        return Err(Error::Expression(format!("unexpected character '{c}' in '{src}'")));
    }

    Ok(out)
}

// ── Recursive-descent parser ───────────────────────────────────

struct Parser<'a> {
    tokens: &'a [Tok],
    pos: usize,
    inputs: Vec<String>,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Tok> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn eat(&mut self, want: &Tok) -> Result<()> {
        match self.next() {
            Some(ref t) if t == want => Ok(()),
            got => Err(Error::Expression(format!("expected {want:?}, got {got:?}"))),
        }
    }

    fn column(&mut self, name: String) -> usize {
        match self.inputs.iter().position(|c| *c == name) {
            Some(i) => i,
            None => {
                self.inputs.push(name);
                self.inputs.len() - 1
            }
        }
    }

    fn binary_level(
        &mut self,
        ops: &[Op],
        next: fn(&mut Self) -> Result<Node>,
        chain: bool,
    ) -> Result<Node> {
        let mut lhs = next(self)?;
        loop {
            let op = match self.peek() {
                Some(Tok::Op(op)) if ops.contains(op) => *op,
                Some(Tok::Minus) if ops.contains(&Op::Sub) => Op::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = next(self)?;
            lhs = Node::Bin(op, Box::new(lhs), Box::new(rhs));
            if !chain {
                return Ok(lhs);
            }
        }
    }

    fn or(&mut self) -> Result<Node> {
        self.binary_level(&[Op::Or], Self::and, true)
    }

    fn and(&mut self) -> Result<Node> {
        self.binary_level(&[Op::And], Self::cmp, true)
    }

    fn cmp(&mut self) -> Result<Node> {
        self.binary_level(&[Op::Eq, Op::Ne, Op::Lt, Op::Le, Op::Gt, Op::Ge], Self::add, false)
    }

    fn add(&mut self) -> Result<Node> {
        self.binary_level(&[Op::Add, Op::Sub], Self::mul, true)
    }

    fn mul(&mut self) -> Result<Node> {
        self.binary_level(&[Op::Mul, Op::Div], Self::unary, true)
    }

    fn unary(&mut self) -> Result<Node> {
        match self.peek() {
            Some(Tok::Minus) => {
                self.pos += 1;
                Ok(Node::Neg(Box::new(self.unary()?)))
            }
            Some(Tok::Bang) => {
                self.pos += 1;
                Ok(Node::Not(Box::new(self.unary()?)))
            }
            _ => self.atom(),
        }
    }

    fn atom(&mut self) -> Result<Node> {
        match self.next() {
            Some(Tok::Num(v)) => Ok(Node::Num(v)),
            Some(Tok::LParen) => {
                let e = self.or()?;
                self.eat(&Tok::RParen)?;
                Ok(e)
            }
            Some(Tok::Ident(name)) if matches!(self.peek(), Some(Tok::LParen)) => {
                self.pos += 1;
                let (func, arity) = Func::lookup(&name)
                    .ok_or_else(|| Error::Expression(format!("unknown function: '{name}'")))?;
                let mut args = vec![self.or()?];
                while matches!(self.peek(), Some(Tok::Comma)) {
                    self.pos += 1;
                    args.push(self.or()?);
                }
                self.eat(&Tok::RParen)?;
                if args.len() != arity {
                    return Err(Error::Expression(format!(
                        "{name}() takes {arity} argument(s), got {}",
                        args.len()
                    )));
                }
                Ok(Node::Call(func, args))
            }
            Some(Tok::Ident(name)) => Ok(Node::Col(self.column(name))),
            other => Err(Error::Expression(format!(
                "expected number, column, or '(', got {other:?}"
            ))),
        }
    }
}

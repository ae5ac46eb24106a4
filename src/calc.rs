//! Floating-point expression evaluator behind the `calc` builtin.
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/' | '%') unary)*
//! unary   := ('+' | '-') unary | power
//! power   := primary ('^' unary)?
//! primary := number | '(' expr ')' | name | name '(' expr (',' expr)* ')'
//! ```
//!
//! `^` is right-associative and binds tighter than unary minus, so `-2^2` is
//! `-4` and `2^3^2` is `512`. Division by zero follows IEEE rules.

use std::fmt;

/// Deepest nesting of parentheses, signs and exponents accepted.
pub const MAX_DEPTH: usize = 256;

/// Why an expression could not be evaluated.
#[derive(Debug, Clone, PartialEq)]
pub enum CalcErrorKind {
    UnexpectedChar(char),
    UnexpectedEnd,
    UnknownName(String),
    MissingCloseParen,
    WrongArity { name: String, expected: usize },
    TooDeep,
}

/// Evaluation failure with the 1-based character position it was detected at.
#[derive(Debug, Clone, PartialEq)]
pub struct CalcError {
    pub position: usize,
    pub kind: CalcErrorKind,
}

impl fmt::Display for CalcErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalcErrorKind::UnexpectedChar(c) => write!(f, "unexpected '{c}'"),
            CalcErrorKind::UnexpectedEnd => write!(f, "unexpected end of expression"),
            CalcErrorKind::UnknownName(name) => write!(f, "unknown name '{name}'"),
            CalcErrorKind::MissingCloseParen => write!(f, "missing ')'"),
            CalcErrorKind::WrongArity { name, expected } => {
                write!(f, "{name} takes {expected} argument(s)")
            }
            CalcErrorKind::TooDeep => write!(f, "nested more than {MAX_DEPTH} levels deep"),
        }
    }
}

impl fmt::Display for CalcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at character {}", self.kind, self.position)
    }
}

impl std::error::Error for CalcError {}

/// Evaluate `expr`.
pub fn evaluate(expr: &str) -> Result<f64, CalcError> {
    let mut parser = Parser {
        chars: expr.chars().collect(),
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    parser.skip_whitespace();
    match parser.peek() {
        None => Ok(value),
        Some(c) => Err(parser.error(CalcErrorKind::UnexpectedChar(c))),
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    /// Consume `c` if it is the next non-blank character.
    fn eat(&mut self, c: char) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn error(&self, kind: CalcErrorKind) -> CalcError {
        CalcError {
            position: self.pos + 1,
            kind,
        }
    }

    fn unexpected(&self) -> CalcError {
        match self.peek() {
            Some(c) => self.error(CalcErrorKind::UnexpectedChar(c)),
            None => self.error(CalcErrorKind::UnexpectedEnd),
        }
    }

    fn expr(&mut self) -> Result<f64, CalcError> {
        let mut value = self.term()?;
        loop {
            if self.eat('+') {
                value += self.term()?;
            } else if self.eat('-') {
                value -= self.term()?;
            } else {
                return Ok(value);
            }
        }
    }

    fn term(&mut self) -> Result<f64, CalcError> {
        let mut value = self.unary()?;
        loop {
            if self.eat('*') {
                value *= self.unary()?;
            } else if self.eat('/') {
                value /= self.unary()?;
            } else if self.eat('%') {
                value %= self.unary()?;
            } else {
                return Ok(value);
            }
        }
    }

    /// Every recursive path of the grammar goes through here, so this is where
    /// nesting is bounded.
    fn unary(&mut self) -> Result<f64, CalcError> {
        if self.depth >= MAX_DEPTH {
            self.skip_whitespace();
            return Err(self.error(CalcErrorKind::TooDeep));
        }
        self.depth += 1;
        let value = self.signed();
        self.depth -= 1;
        value
    }

    fn signed(&mut self) -> Result<f64, CalcError> {
        if self.eat('-') {
            Ok(-self.unary()?)
        } else if self.eat('+') {
            self.unary()
        } else {
            self.power()
        }
    }

    fn power(&mut self) -> Result<f64, CalcError> {
        let base = self.primary()?;
        if self.eat('^') {
            let exponent = self.unary()?;
            Ok(base.powf(exponent))
        } else {
            Ok(base)
        }
    }

    fn primary(&mut self) -> Result<f64, CalcError> {
        self.skip_whitespace();
        match self.peek() {
            Some(c) if c.is_ascii_digit() || c == '.' => self.number(),
            Some('(') => {
                self.pos += 1;
                let value = self.expr()?;
                if self.eat(')') {
                    Ok(value)
                } else if self.peek().is_none() {
                    Err(self.error(CalcErrorKind::MissingCloseParen))
                } else {
                    Err(self.unexpected())
                }
            }
            Some(c) if c.is_ascii_alphabetic() => self.name(),
            _ => Err(self.unexpected()),
        }
    }

    fn number(&mut self) -> Result<f64, CalcError> {
        let start = self.pos;
        let digits = |p: &mut Self| {
            while p.peek().is_some_and(|c| c.is_ascii_digit()) {
                p.pos += 1;
            }
        };
        digits(self);
        if self.peek() == Some('.') {
            self.pos += 1;
            digits(self);
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let mark = self.pos;
            self.pos += 1;
            if matches!(self.peek(), Some('+' | '-')) {
                self.pos += 1;
            }
            if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                digits(self);
            } else {
                // Not an exponent after all; `e` is left for the caller.
                self.pos = mark;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse::<f64>().map_err(|_| CalcError {
            position: start + 1,
            kind: CalcErrorKind::UnexpectedChar(self.chars[start]),
        })
    }

    fn name(&mut self) -> Result<f64, CalcError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.pos += 1;
        }
        let name: String = self.chars[start..self.pos].iter().collect();
        let unknown = || CalcError {
            position: start + 1,
            kind: CalcErrorKind::UnknownName(name.clone()),
        };

        if let Some(value) = constant(&name) {
            return Ok(value);
        }
        let Some(function) = function(&name) else {
            return Err(unknown());
        };
        if !self.eat('(') {
            return Err(self.unexpected());
        }
        let mut args = vec![self.expr()?];
        while self.eat(',') {
            args.push(self.expr()?);
        }
        if !self.eat(')') {
            return Err(if self.peek().is_none() {
                self.error(CalcErrorKind::MissingCloseParen)
            } else {
                self.unexpected()
            });
        }
        match (function, args.as_slice()) {
            (Function::Unary(f), [x]) => Ok(f(*x)),
            (Function::Binary(f), [x, y]) => Ok(f(*x, *y)),
            (f, _) => Err(CalcError {
                position: start + 1,
                kind: CalcErrorKind::WrongArity {
                    name,
                    expected: f.arity(),
                },
            }),
        }
    }
}

fn constant(name: &str) -> Option<f64> {
    match name {
        "pi" => Some(std::f64::consts::PI),
        "e" => Some(std::f64::consts::E),
        _ => None,
    }
}

#[derive(Clone, Copy)]
enum Function {
    Unary(fn(f64) -> f64),
    Binary(fn(f64, f64) -> f64),
}

impl Function {
    fn arity(self) -> usize {
        match self {
            Function::Unary(_) => 1,
            Function::Binary(_) => 2,
        }
    }
}

fn function(name: &str) -> Option<Function> {
    use Function::{Binary, Unary};
    Some(match name {
        "abs" => Unary(f64::abs),
        "sqrt" => Unary(f64::sqrt),
        "exp" => Unary(f64::exp),
        "ln" => Unary(f64::ln),
        "log" | "log10" => Unary(f64::log10),
        "sin" => Unary(f64::sin),
        "cos" => Unary(f64::cos),
        "tan" => Unary(f64::tan),
        "asin" => Unary(f64::asin),
        "acos" => Unary(f64::acos),
        "atan" => Unary(f64::atan),
        "sinh" => Unary(f64::sinh),
        "cosh" => Unary(f64::cosh),
        "tanh" => Unary(f64::tanh),
        "floor" => Unary(f64::floor),
        "ceil" => Unary(f64::ceil),
        "pow" => Binary(f64::powf),
        "atan2" => Binary(f64::atan2),
        _ => return None,
    })
}

/// Format like C's `%g`: six significant digits, trailing zeros dropped, and
/// scientific notation for very large or very small magnitudes.
pub fn format_g(value: f64) -> String {
    const PRECISION: i32 = 6;
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    // The exponent after rounding to PRECISION significant digits decides the style.
    let scientific = format!("{:.*e}", (PRECISION - 1) as usize, value);
    let (mantissa, exponent) = scientific
        .split_once('e')
        .map(|(m, e)| (m.to_string(), e.parse::<i32>().unwrap_or(0)))
        .unwrap_or((scientific.clone(), 0));

    if exponent < -4 || exponent >= PRECISION {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{}{:02}",
            trim_fraction(&mantissa),
            sign,
            exponent.abs()
        )
    } else {
        let decimals = (PRECISION - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{value:.decimals$}")).to_string()
    }
}

fn trim_fraction(number: &str) -> &str {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    }
}

//! Sandboxed arithmetic expression evaluator
//!
//! Grammar: numeric literals, `+ - * / // % **`, unary `+`/`-`, parentheses,
//! the constants `pi` and `e`, and an allow-list of functions. Identifiers
//! may carry a `math.` prefix (`math.sin(x)` and `sin(x)` are the same).
//! Integer and float values are kept apart: `/` always yields a float,
//! `int()` truncates towards zero, and mixed operands promote to float.

#![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]

use std::cmp::Ordering;
use std::fmt;

use crate::error::{Error, Result};
use crate::token::Payload;

const MAX_NESTING: usize = 64;

/// Result of an evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    /// Integer
    Int(i64),
    /// Floating point
    Float(f64),
}

impl Number {
    /// Floating point view
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(v) => v as f64,
            Number::Float(v) => v,
        }
    }

    /// Whether this is an integer
    pub fn is_int(self) -> bool {
        matches!(self, Number::Int(_))
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(v) => write!(f, "{}", v),
            Number::Float(v) => write!(f, "{:?}", v),
        }
    }
}

impl From<Number> for Payload {
    fn from(n: Number) -> Self {
        match n {
            Number::Int(v) => Payload::Integer(v),
            Number::Float(v) => Payload::Number(v),
        }
    }
}

/// Evaluate an arithmetic expression
pub fn evaluate(expression: &str) -> Result<Number> {
    let tokens = tokenize(expression)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };

    let value = parser.parse_expression()?;
    if let Some(tok) = parser.peek() {
        return Err(Error::Expression(format!(
            "unexpected {} in '{}'",
            tok, expression
        )));
    }

    Ok(value)
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Num(Number),
    Ident(String),
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    DoubleSlash,
    Percent,
    LParen,
    RParen,
    Comma,
}

impl fmt::Display for Tok {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tok::Num(n) => write!(f, "number {}", n),
            Tok::Ident(name) => write!(f, "name '{}'", name),
            Tok::Plus => write!(f, "'+'"),
            Tok::Minus => write!(f, "'-'"),
            Tok::Star => write!(f, "'*'"),
            Tok::DoubleStar => write!(f, "'**'"),
            Tok::Slash => write!(f, "'/'"),
            Tok::DoubleSlash => write!(f, "'//'"),
            Tok::Percent => write!(f, "'%'"),
            Tok::LParen => write!(f, "'('"),
            Tok::RParen => write!(f, "')'"),
            Tok::Comma => write!(f, "','"),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Tok>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                let mut is_float = false;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.' || chars[i] == '_') {
                    if chars[i] == '.' {
                        is_float = true;
                    }
                    i += 1;
                }
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        is_float = true;
                        i = j;
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }

                let text: String = chars[start..i].iter().filter(|c| **c != '_').collect();
                let number = if is_float {
                    text.parse::<f64>()
                        .map(Number::Float)
                        .map_err(|_| Error::Expression(format!("invalid number '{}'", text)))?
                } else {
                    text.parse::<i64>()
                        .map(Number::Int)
                        .map_err(|_| Error::Expression(format!("integer literal out of range: {}", text)))?
                };
                tokens.push(Tok::Num(number));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '.') {
                    i += 1;
                }
                tokens.push(Tok::Ident(chars[start..i].iter().collect()));
            }
            '+' => {
                tokens.push(Tok::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Tok::Minus);
                i += 1;
            }
            '*' => {
                if chars.get(i + 1) == Some(&'*') {
                    tokens.push(Tok::DoubleStar);
                    i += 2;
                } else {
                    tokens.push(Tok::Star);
                    i += 1;
                }
            }
            '/' => {
                if chars.get(i + 1) == Some(&'/') {
                    tokens.push(Tok::DoubleSlash);
                    i += 2;
                } else {
                    tokens.push(Tok::Slash);
                    i += 1;
                }
            }
            '%' => {
                tokens.push(Tok::Percent);
                i += 1;
            }
            '(' => {
                tokens.push(Tok::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Tok::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Tok::Comma);
                i += 1;
            }
            other => {
                return Err(Error::Expression(format!(
                    "unexpected character '{}' in '{}'",
                    other, input
                )))
            }
        }
    }

    Ok(tokens)
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

struct Parser {
    tokens: Vec<Tok>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Tok> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn expect(&mut self, expected: &Tok) -> Result<()> {
        match self.advance() {
            Some(ref tok) if tok == expected => Ok(()),
            Some(tok) => Err(Error::Expression(format!("expected {}, found {}", expected, tok))),
            None => Err(Error::Expression(format!("expected {}, found end of expression", expected))),
        }
    }

    // Depth guard shared by every recursive descent
    fn nested<F>(&mut self, parse: F) -> Result<Number>
    where
        F: FnOnce(&mut Self) -> Result<Number>,
    {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(Error::Expression("expression nested too deeply".into()));
        }
        let value = parse(self);
        self.depth -= 1;
        value
    }

    fn parse_expression(&mut self) -> Result<Number> {
        self.nested(Self::parse_sum)
    }

    fn parse_sum(&mut self) -> Result<Number> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Some(Tok::Plus) => Op::Add,
                Some(Tok::Minus) => Op::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            left = apply(op, left, right)?;
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Number> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Tok::Star) => Op::Mul,
                Some(Tok::Slash) => Op::Div,
                Some(Tok::DoubleSlash) => Op::FloorDiv,
                Some(Tok::Percent) => Op::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = apply(op, left, right)?;
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Number> {
        match self.peek() {
            Some(Tok::Plus) => {
                self.advance();
                self.nested(Self::parse_unary)
            }
            Some(Tok::Minus) => {
                self.advance();
                negate(self.nested(Self::parse_unary)?)
            }
            _ => self.parse_power(),
        }
    }

    // `**` binds tighter than a unary minus on its left and is right-associative
    fn parse_power(&mut self) -> Result<Number> {
        let base = self.parse_primary()?;
        if matches!(self.peek(), Some(Tok::DoubleStar)) {
            self.advance();
            let exponent = self.nested(Self::parse_unary)?;
            return apply(Op::Pow, base, exponent);
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> Result<Number> {
        match self.advance() {
            Some(Tok::Num(n)) => Ok(n),
            Some(Tok::LParen) => {
                let value = self.parse_expression()?;
                self.expect(&Tok::RParen)?;
                Ok(value)
            }
            Some(Tok::Ident(name)) => {
                if matches!(self.peek(), Some(Tok::LParen)) {
                    self.advance();
                    let args = self.parse_arguments()?;
                    call(&name, &args)
                } else {
                    constant(&name)
                }
            }
            Some(tok) => Err(Error::Expression(format!("unexpected {}", tok))),
            None => Err(Error::Expression("unexpected end of expression".into())),
        }
    }

    fn parse_arguments(&mut self) -> Result<Vec<Number>> {
        let mut args = Vec::new();
        if matches!(self.peek(), Some(Tok::RParen)) {
            self.advance();
            return Ok(args);
        }

        loop {
            args.push(self.parse_expression()?);
            match self.advance() {
                Some(Tok::Comma) => continue,
                Some(Tok::RParen) => break,
                Some(tok) => return Err(Error::Expression(format!("expected ',' or ')', found {}", tok))),
                None => return Err(Error::Expression("unclosed argument list".into())),
            }
        }

        Ok(args)
    }
}

fn normalize(name: &str) -> &str {
    name.strip_prefix("math.").unwrap_or(name)
}

fn constant(name: &str) -> Result<Number> {
    match normalize(name) {
        "pi" => Ok(Number::Float(std::f64::consts::PI)),
        "e" => Ok(Number::Float(std::f64::consts::E)),
        "tau" => Ok(Number::Float(std::f64::consts::TAU)),
        _ => Err(Error::Expression(format!("unknown name '{}'", name))),
    }
}

fn overflow() -> Error {
    Error::Expression("integer overflow".into())
}

fn division_by_zero() -> Error {
    Error::Expression("division by zero".into())
}

fn domain_error(function: &str) -> Error {
    Error::Expression(format!("math domain error in {}()", function))
}

fn negate(n: Number) -> Result<Number> {
    match n {
        Number::Int(v) => v.checked_neg().map(Number::Int).ok_or_else(overflow),
        Number::Float(v) => Ok(Number::Float(-v)),
    }
}

fn floor_div(x: i64, y: i64) -> Option<i64> {
    let q = x.checked_div(y)?;
    if x % y != 0 && ((x < 0) != (y < 0)) {
        Some(q - 1)
    } else {
        Some(q)
    }
}

fn floor_mod(x: i64, y: i64) -> Option<i64> {
    let r = x.checked_rem(y)?;
    if r != 0 && ((r < 0) != (y < 0)) {
        Some(r + y)
    } else {
        Some(r)
    }
}

fn float_to_int(v: f64) -> Result<i64> {
    if !v.is_finite() {
        return Err(Error::Expression(format!("cannot convert {} to integer", v)));
    }
    if v < i64::MIN as f64 || v >= i64::MAX as f64 {
        return Err(overflow());
    }
    Ok(v as i64)
}

fn finite(v: f64, function: &str) -> Result<Number> {
    if v.is_nan() {
        Err(domain_error(function))
    } else if v.is_infinite() {
        Err(Error::Expression(format!("numerical result out of range in {}", function)))
    } else {
        Ok(Number::Float(v))
    }
}

fn apply(op: Op, a: Number, b: Number) -> Result<Number> {
    if let (Number::Int(x), Number::Int(y)) = (a, b) {
        return match op {
            Op::Add => x.checked_add(y).map(Number::Int).ok_or_else(overflow),
            Op::Sub => x.checked_sub(y).map(Number::Int).ok_or_else(overflow),
            Op::Mul => x.checked_mul(y).map(Number::Int).ok_or_else(overflow),
            Op::Div => {
                if y == 0 {
                    Err(division_by_zero())
                } else {
                    Ok(Number::Float(x as f64 / y as f64))
                }
            }
            Op::FloorDiv => {
                if y == 0 {
                    Err(division_by_zero())
                } else {
                    floor_div(x, y).map(Number::Int).ok_or_else(overflow)
                }
            }
            Op::Mod => {
                if y == 0 {
                    Err(division_by_zero())
                } else {
                    floor_mod(x, y).map(Number::Int).ok_or_else(overflow)
                }
            }
            Op::Pow => {
                if y >= 0 {
                    let exp = u32::try_from(y).map_err(|_| overflow())?;
                    x.checked_pow(exp).map(Number::Int).ok_or_else(overflow)
                } else if x == 0 {
                    Err(division_by_zero())
                } else {
                    Ok(Number::Float((x as f64).powf(y as f64)))
                }
            }
        };
    }

    let (x, y) = (a.as_f64(), b.as_f64());
    match op {
        Op::Add => Ok(Number::Float(x + y)),
        Op::Sub => Ok(Number::Float(x - y)),
        Op::Mul => Ok(Number::Float(x * y)),
        Op::Div => {
            if y == 0.0 {
                Err(division_by_zero())
            } else {
                Ok(Number::Float(x / y))
            }
        }
        Op::FloorDiv => {
            if y == 0.0 {
                Err(division_by_zero())
            } else {
                Ok(Number::Float((x / y).floor()))
            }
        }
        Op::Mod => {
            if y == 0.0 {
                return Err(division_by_zero());
            }
            let r = x % y;
            if r != 0.0 && ((r < 0.0) != (y < 0.0)) {
                Ok(Number::Float(r + y))
            } else {
                Ok(Number::Float(r))
            }
        }
        Op::Pow => {
            if x == 0.0 && y < 0.0 {
                return Err(division_by_zero());
            }
            finite(x.powf(y), "pow")
        }
    }
}

fn extreme(args: &[Number], wanted: Ordering, function: &str) -> Result<Number> {
    let (first, rest) = args
        .split_first()
        .ok_or_else(|| Error::Expression(format!("{}() expects at least 1 argument", function)))?;
    let mut best = *first;
    for candidate in rest {
        if candidate.as_f64().total_cmp(&best.as_f64()) == wanted {
            best = *candidate;
        }
    }
    Ok(best)
}

fn call(name: &str, args: &[Number]) -> Result<Number> {
    let function = normalize(name);
    match (function, args) {
        ("int", [Number::Int(v)]) => Ok(Number::Int(*v)),
        ("int", [Number::Float(v)]) => float_to_int(v.trunc()).map(Number::Int),
        ("float", [v]) => Ok(Number::Float(v.as_f64())),
        ("abs", [Number::Int(v)]) => v.checked_abs().map(Number::Int).ok_or_else(overflow),
        ("abs" | "fabs", [v]) => Ok(Number::Float(v.as_f64().abs())),
        ("round", [Number::Int(v)]) => Ok(Number::Int(*v)),
        ("round", [Number::Float(v)]) => float_to_int(v.round_ties_even()).map(Number::Int),
        ("round", [Number::Int(v), Number::Int(_)]) => Ok(Number::Int(*v)),
        ("round", [v, Number::Int(digits)]) => {
            let digits = i32::try_from(*digits).map_err(|_| overflow())?;
            let scale = 10_f64.powi(digits);
            Ok(Number::Float((v.as_f64() * scale).round_ties_even() / scale))
        }
        ("min", args) => extreme(args, Ordering::Less, "min"),
        ("max", args) => extreme(args, Ordering::Greater, "max"),
        ("pow", [a, b]) => apply(Op::Pow, *a, *b),
        ("sqrt", [v]) => {
            if v.as_f64() < 0.0 {
                Err(domain_error("sqrt"))
            } else {
                Ok(Number::Float(v.as_f64().sqrt()))
            }
        }
        ("exp", [v]) => finite(v.as_f64().exp(), "exp"),
        ("log", [v]) => {
            if v.as_f64() <= 0.0 {
                Err(domain_error("log"))
            } else {
                Ok(Number::Float(v.as_f64().ln()))
            }
        }
        ("log", [v, base]) => {
            if v.as_f64() <= 0.0 || base.as_f64() <= 0.0 || base.as_f64() == 1.0 {
                Err(domain_error("log"))
            } else {
                Ok(Number::Float(v.as_f64().ln() / base.as_f64().ln()))
            }
        }
        ("log10", [v]) => {
            if v.as_f64() <= 0.0 {
                Err(domain_error("log10"))
            } else {
                Ok(Number::Float(v.as_f64().log10()))
            }
        }
        ("log2", [v]) => {
            if v.as_f64() <= 0.0 {
                Err(domain_error("log2"))
            } else {
                Ok(Number::Float(v.as_f64().log2()))
            }
        }
        ("sin", [v]) => Ok(Number::Float(v.as_f64().sin())),
        ("cos", [v]) => Ok(Number::Float(v.as_f64().cos())),
        ("tan", [v]) => Ok(Number::Float(v.as_f64().tan())),
        ("floor", [Number::Int(v)]) | ("ceil", [Number::Int(v)]) => Ok(Number::Int(*v)),
        ("floor", [Number::Float(v)]) => float_to_int(v.floor()).map(Number::Int),
        ("ceil", [Number::Float(v)]) => float_to_int(v.ceil()).map(Number::Int),
        (
            "int" | "float" | "abs" | "fabs" | "round" | "pow" | "sqrt" | "exp" | "log" | "log10" | "log2" | "sin"
            | "cos" | "tan" | "floor" | "ceil",
            _,
        ) => Err(Error::Expression(format!(
            "{}() takes a different number of arguments ({} given)",
            function,
            args.len()
        ))),
        _ => Err(Error::Expression(format!("unknown function '{}'", name))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test_case("1 + 4", Number::Int(5) ; "integer addition")]
    #[test_case("int(1 + 1)", Number::Int(2) ; "int of sum")]
    #[test_case("7 / 2", Number::Float(3.5) ; "true division")]
    #[test_case("-7 // 2", Number::Int(-4) ; "floor division rounds down")]
    #[test_case("-7 % 3", Number::Int(2) ; "modulo follows divisor sign")]
    #[test_case("-2 ** 2", Number::Int(-4) ; "power binds tighter than unary minus")]
    #[test_case("2 ** 3 ** 2", Number::Int(512) ; "power is right associative")]
    #[test_case("2 ** -1", Number::Float(0.5) ; "negative exponent yields float")]
    #[test_case("(1 + 2) * 3", Number::Int(9) ; "parentheses")]
    #[test_case("1.5 + 1", Number::Float(2.5) ; "mixed promotes to float")]
    #[test_case("int(-2.7)", Number::Int(-2) ; "int truncates")]
    #[test_case("round(2.5)", Number::Int(2) ; "round half to even")]
    #[test_case("round(1.2345, 2)", Number::Float(1.23) ; "round to digits")]
    #[test_case("max(1, 7.5, 3)", Number::Float(7.5) ; "max keeps argument")]
    #[test_case("min(4, 2, 9)", Number::Int(2) ; "min")]
    #[test_case("math.floor(2.5)", Number::Int(2) ; "math prefix")]
    #[test_case("1e3", Number::Float(1000.0) ; "exponent literal")]
    fn test_evaluate(expression: &str, expected: Number) {
        assert_eq!(evaluate(expression).unwrap(), expected);
    }

    #[test]
    fn test_functions_and_constants() {
        assert!((evaluate("1 + math.sin(0)").unwrap().as_f64() - 1.0).abs() < 1e-12);
        assert!((evaluate("cos(pi)").unwrap().as_f64() + 1.0).abs() < 1e-12);
        assert!((evaluate("log(e)").unwrap().as_f64() - 1.0).abs() < 1e-12);
        assert!((evaluate("sqrt(16)").unwrap().as_f64() - 4.0).abs() < 1e-12);
    }

    #[test_case("1 / 0" ; "division by zero")]
    #[test_case("1 +" ; "dangling operator")]
    #[test_case("(1 + 2" ; "unclosed paren")]
    #[test_case("__import__(1)" ; "unknown function")]
    #[test_case("os.system" ; "unknown name")]
    #[test_case("1 2" ; "trailing token")]
    #[test_case("sqrt(-1)" ; "domain error")]
    #[test_case("int()" ; "missing argument")]
    #[test_case("{X} + 1" ; "unsubstituted placeholder")]
    #[test_case("9223372036854775807 + 1" ; "overflow")]
    fn test_rejects(expression: &str) {
        assert!(matches!(evaluate(expression), Err(Error::Expression(_))));
    }

    #[test_case(format!("{}1{}", "(".repeat(200), ")".repeat(200)) ; "parentheses")]
    #[test_case(format!("{}1", "-".repeat(500_000)) ; "unary minus chain")]
    #[test_case(format!("{}1", "+ -".repeat(1_000)) ; "mixed sign chain")]
    #[test_case(format!("1{}", " ** 1".repeat(500_000)) ; "power chain")]
    #[test_case(format!("{}1{}", "abs(".repeat(200), ")".repeat(200)) ; "function calls")]
    fn test_nesting_limit(expression: String) {
        let err = evaluate(&expression).unwrap_err();
        assert_eq!(err.to_string(), Error::Expression("expression nested too deeply".into()).to_string());
    }

    #[test]
    fn test_moderate_chains_still_evaluate() {
        assert_eq!(evaluate(&format!("{}1", "-".repeat(10))).unwrap(), Number::Int(1));
        assert_eq!(evaluate("2 ** 2 ** 2 ** 2").unwrap(), Number::Int(65536));
    }

    proptest! {
        #[test]
        fn prop_integer_arithmetic_matches(a in -10_000i64..10_000, b in -10_000i64..10_000) {
            prop_assert_eq!(evaluate(&format!("{} + {} * 2", a, b)).unwrap(), Number::Int(a + b * 2));
            prop_assert_eq!(evaluate(&format!("{} - ({})", a, b)).unwrap(), Number::Int(a - b));
        }
    }
}

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts;
use std::fmt;

use autocheck_core::{Symbolic, Value};

use crate::error::{ExprError, ExprResult};
use crate::parser;

/// Expression tree produced by [`Expr::parse`].
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int(i64),
    Float(f64),
    /// A free symbol, or one of the constants `pi` and `E`.
    Symbol(String),
    Neg(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Pow(Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
    /// `a ^ b`: logical xor, usually a mistyped power.
    Xor(Box<Expr>, Box<Expr>),
    /// `~a`
    Not(Box<Expr>),
}

/// Symbol names with a fixed value.
fn constant(name: &str) -> Option<f64> {
    match name {
        "pi" => Some(consts::PI),
        "E" => Some(consts::E),
        _ => None,
    }
}

impl Expr {
    pub fn parse(input: &str) -> ExprResult<Self> {
        parser::parse(input)
    }

    pub fn symbol(name: impl Into<String>) -> Self {
        Self::Symbol(name.into())
    }

    /// Head name in the style of a computer algebra system.
    pub fn head(&self) -> &str {
        match self {
            Self::Int(_) => "Integer",
            Self::Float(_) => "Float",
            Self::Symbol(name) => match name.as_str() {
                "pi" => "Pi",
                "E" => "Exp1",
                _ => "Symbol",
            },
            Self::Add(..) | Self::Sub(..) => "Add",
            Self::Neg(_) | Self::Mul(..) | Self::Div(..) => "Mul",
            Self::Pow(..) => "Pow",
            Self::Call(name, _) => match name.as_str() {
                "sqrt" => "Pow",
                "abs" | "Abs" => "Abs",
                "ln" => "log",
                other => other,
            },
            Self::Xor(..) => "Xor",
            Self::Not(_) => "Not",
        }
    }

    /// True if the tree contains a logical operator anywhere.
    pub fn is_logical(&self) -> bool {
        match self {
            Self::Xor(..) | Self::Not(_) => true,
            Self::Int(_) | Self::Float(_) | Self::Symbol(_) => false,
            Self::Neg(a) => a.is_logical(),
            Self::Add(a, b) | Self::Sub(a, b) | Self::Mul(a, b) | Self::Div(a, b) | Self::Pow(a, b) => {
                a.is_logical() || b.is_logical()
            }
            Self::Call(_, args) => args.iter().any(Self::is_logical),
        }
    }

    /// Free symbols, constants excluded.
    pub fn free_symbols(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_symbols(&mut out);
        out
    }

    fn collect_symbols(&self, out: &mut BTreeSet<String>) {
        match self {
            Self::Symbol(name) if constant(name).is_none() => {
                out.insert(name.clone());
            }
            Self::Int(_) | Self::Float(_) | Self::Symbol(_) => {}
            Self::Neg(a) | Self::Not(a) => a.collect_symbols(out),
            Self::Add(a, b)
            | Self::Sub(a, b)
            | Self::Mul(a, b)
            | Self::Div(a, b)
            | Self::Pow(a, b)
            | Self::Xor(a, b) => {
                a.collect_symbols(out);
                b.collect_symbols(out);
            }
            Self::Call(_, args) => args.iter().for_each(|a| a.collect_symbols(out)),
        }
    }

    /// Numeric value with each free symbol bound in `env`.
    ///
    /// Out-of-domain operations yield NaN or infinity rather than an error.
    pub fn eval(&self, env: &BTreeMap<String, f64>) -> ExprResult<f64> {
        let mut scale = 0.0;
        self.eval_scaled(env, &mut scale)
    }

    /// [`Expr::eval`] that also raises `scale` to the largest finite operand
    /// magnitude of any addition or subtraction. Rounding error lost to
    /// cancellation is a small multiple of it.
    pub fn eval_scaled(&self, env: &BTreeMap<String, f64>, scale: &mut f64) -> ExprResult<f64> {
        match self {
            Self::Int(i) => Ok(*i as f64),
            Self::Float(x) => Ok(*x),
            Self::Symbol(name) => constant(name)
                .or_else(|| env.get(name).copied())
                .ok_or_else(|| ExprError::UnboundSymbol(name.clone())),
            Self::Neg(a) => Ok(-a.eval_scaled(env, scale)?),
            Self::Add(a, b) => {
                let (x, y) = (a.eval_scaled(env, scale)?, b.eval_scaled(env, scale)?);
                widen(scale, x, y);
                Ok(x + y)
            }
            Self::Sub(a, b) => {
                let (x, y) = (a.eval_scaled(env, scale)?, b.eval_scaled(env, scale)?);
                widen(scale, x, y);
                Ok(x - y)
            }
            Self::Mul(a, b) => Ok(a.eval_scaled(env, scale)? * b.eval_scaled(env, scale)?),
            Self::Div(a, b) => Ok(a.eval_scaled(env, scale)? / b.eval_scaled(env, scale)?),
            Self::Pow(a, b) => Ok(a.eval_scaled(env, scale)?.powf(b.eval_scaled(env, scale)?)),
            Self::Call(name, args) => {
                let values = args
                    .iter()
                    .map(|a| a.eval_scaled(env, scale))
                    .collect::<ExprResult<Vec<f64>>>()?;
                call(name, &values)
            }
            Self::Xor(a, b) => Err(ExprError::UnsupportedOperand {
                op: "^",
                lhs: a.head().to_string(),
                rhs: b.head().to_string(),
            }),
            Self::Not(a) => Err(ExprError::UnsupportedOperand {
                op: "~",
                lhs: a.head().to_string(),
                rhs: a.head().to_string(),
            }),
        }
    }

    /// Binding strength used by the printer.
    fn precedence(&self) -> u8 {
        match self {
            Self::Xor(..) => 1,
            Self::Add(..) | Self::Sub(..) => 2,
            Self::Mul(..) | Self::Div(..) => 3,
            Self::Neg(_) | Self::Not(_) => 4,
            Self::Int(i) if *i < 0 => 4,
            Self::Float(x) if x.is_sign_negative() => 4,
            Self::Pow(..) => 5,
            _ => 6,
        }
    }
}

fn widen(scale: &mut f64, x: f64, y: f64) {
    for v in [x, y] {
        if v.is_finite() {
            *scale = scale.max(v.abs());
        }
    }
}

fn arity(name: &str, args: &[f64], expected: usize) -> ExprResult<()> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(ExprError::Arity {
            name: name.to_string(),
            expected,
            found: args.len(),
        })
    }
}

fn call(name: &str, args: &[f64]) -> ExprResult<f64> {
    let unary: Option<fn(f64) -> f64> = match name {
        "sqrt" => Some(f64::sqrt),
        "exp" => Some(f64::exp),
        "sin" => Some(f64::sin),
        "cos" => Some(f64::cos),
        "tan" => Some(f64::tan),
        "asin" => Some(f64::asin),
        "acos" => Some(f64::acos),
        "atan" => Some(f64::atan),
        "sinh" => Some(f64::sinh),
        "cosh" => Some(f64::cosh),
        "tanh" => Some(f64::tanh),
        "abs" | "Abs" => Some(f64::abs),
        _ => None,
    };
    if let Some(f) = unary {
        arity(name, args, 1)?;
        return Ok(f(args[0]));
    }
    match name {
        "log" | "ln" if args.len() == 2 => Ok(args[0].ln() / args[1].ln()),
        "log" | "ln" => {
            arity(name, args, 1)?;
            Ok(args[0].ln())
        }
        "Rational" => {
            arity(name, args, 2)?;
            Ok(args[0] / args[1])
        }
        _ => Ok(undefined_function(name, args)),
    }
}

/// Stand-in value for a function with no definition, such as `ϕ(x)`.
///
/// Deterministic in the name and smooth in the arguments, so equal
/// arguments give equal values and different ones almost never do.
fn undefined_function(name: &str, args: &[f64]) -> f64 {
    let seed = fnv1a(name.as_bytes());
    args.iter().enumerate().fold(0.0, |acc, (i, x)| {
        let h = seed.rotate_left(7 * i as u32 + 3);
        let a = 0.5 + (h & 0xffff) as f64 / 65536.0;
        let b = ((h >> 16) & 0xffff) as f64 / 65536.0;
        acc + (a * x + b).sin() + a * x
    })
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(0x0100_0000_01b3)
    })
}

// ---------------------------------------------------------------------------
// Printing
// ---------------------------------------------------------------------------

struct Operand<'a>(&'a Expr, u8);

impl fmt::Display for Operand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.precedence() < self.1 {
            write!(f, "({})", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{}", Value::Float(*x)),
            Self::Symbol(name) => write!(f, "{name}"),
            Self::Neg(a) => write!(f, "-{}", Operand(a, 4)),
            Self::Not(a) => write!(f, "~{}", Operand(a, 4)),
            Self::Add(a, b) => write!(f, "{} + {}", Operand(a, 2), Operand(b, 2)),
            Self::Sub(a, b) => write!(f, "{} - {}", Operand(a, 2), Operand(b, 3)),
            Self::Mul(a, b) => write!(f, "{}*{}", Operand(a, 3), Operand(b, 3)),
            Self::Div(a, b) => write!(f, "{}/{}", Operand(a, 3), Operand(b, 4)),
            Self::Pow(a, b) => write!(f, "{}**{}", Operand(a, 6), Operand(b, 5)),
            Self::Xor(a, b) => write!(f, "{} ^ {}", Operand(a, 1), Operand(b, 2)),
            Self::Call(name, args) => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}

impl Symbolic for Expr {
    fn type_name(&self) -> &str {
        self.head()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn to_f64(&self) -> Option<f64> {
        if self.free_symbols().is_empty() {
            self.eval(&BTreeMap::new()).ok()
        } else {
            None
        }
    }
}

impl From<Expr> for Value {
    fn from(expr: Expr) -> Self {
        Value::symbolic(expr)
    }
}

/// Parse `input` straight into a symbolic [`Value`].
pub fn sym(input: &str) -> ExprResult<Value> {
    Expr::parse(input).map(Value::from)
}

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};

// ---------------------------------------------------------------------------
// Symbolic
// ---------------------------------------------------------------------------

/// A symbolic expression supplied by an expression engine.
///
/// The core never inspects expressions itself: it only needs their text, the
/// name of their head (used for hints such as `Xor`), and a way for the
/// matching [`Simplifier`](crate::Simplifier) to get the concrete type back.
pub trait Symbolic: fmt::Debug + fmt::Display + Send + Sync {
    /// Name of the outermost node, e.g. `Add`, `Pow`, `Symbol`, `Xor`.
    fn type_name(&self) -> &str;

    fn as_any(&self) -> &dyn Any;

    /// Numeric value of the expression when it has no free symbols.
    fn to_f64(&self) -> Option<f64> {
        None
    }
}

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A submitted answer or an expected answer.
#[derive(Debug, Clone)]
pub enum Value {
    /// No answer was entered.
    Missing,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<Value>),
    Symbolic(Arc<dyn Symbolic>),
}

impl Value {
    pub fn symbolic<S: Symbolic + 'static>(expr: S) -> Self {
        Self::Symbolic(Arc::new(expr))
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Reported type name, shown in operand errors and used for hints.
    pub fn type_name(&self) -> &str {
        match self {
            Self::Missing => "Missing",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "str",
            Self::List(_) => "list",
            Self::Symbolic(s) => s.type_name(),
        }
    }

    /// Numeric view used by the tolerance comparators. Booleans count as
    /// 0 and 1.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Bool(b) => Some(f64::from(u8::from(*b))),
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Symbolic(s) => s.to_f64(),
            _ => None,
        }
    }

    fn fmt_item(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "'{}'", s.replace('\'', "\\'")),
            other => write!(f, "{other}"),
        }
    }
}

pub(crate) fn format_float(x: f64) -> String {
    if x.is_nan() {
        "nan".into()
    } else if x.is_infinite() {
        if x > 0.0 { "inf".into() } else { "-inf".into() }
    } else if x.fract() == 0.0 && x.abs() < 1e16 {
        format!("{x:.1}")
    } else {
        format!("{x}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "..."),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{}", format_float(*x)),
            Self::Text(s) => write!(f, "{s}"),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    item.fmt_item(f)?;
                }
                write!(f, "]")
            }
            Self::Symbolic(s) => write!(f, "{s}"),
        }
    }
}

/// Symbolic values have no JSON form and are sent as their text.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Missing => serializer.serialize_none(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Float(x) => serializer.serialize_f64(*x),
            Self::Text(s) => serializer.serialize_str(s),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Symbolic(s) => serializer.collect_str(s),
        }
    }
}

// --- Conversions ---

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Missing, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match v {
            Json::Null => Self::Missing,
            Json::Bool(b) => Self::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Self::Text(s),
            Json::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            obj @ Json::Object(_) => Self::Text(obj.to_string()),
        }
    }
}

//! The argument value model
//!
//! Every payload that passes through oscreel, inbound or replayed, is an
//! [`Argument`]. Schemes filter and reshape lists of them, sessions persist
//! them as plain JSON, and replay coerces them back into OSC wire values.

use std::fmt;

use rosc::OscType;
use serde::{Deserialize, Serialize};

/// A single control-message argument, or a list of them.
///
/// Serialized untagged so the JSON stays readable: `null`, `true`, `3`,
/// `0.25`, `"bd"`, `[...]`. Integral JSON numbers load as [`Argument::Int`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Argument {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Argument>),
}

impl Argument {
    /// True for `Int` and `Float`.
    pub fn is_number(&self) -> bool {
        matches!(self, Argument::Int(_) | Argument::Float(_))
    }

    /// Convert a decoded OSC argument.
    pub fn from_wire(value: &OscType) -> Self {
        match value {
            OscType::Int(i) => Argument::Int(i64::from(*i)),
            OscType::Long(i) => Argument::Int(*i),
            OscType::Float(f) => Argument::Float(f64::from(*f)),
            OscType::Double(f) => Argument::Float(*f),
            OscType::String(s) => Argument::String(s.clone()),
            OscType::Char(c) => Argument::String(c.to_string()),
            OscType::Bool(b) => Argument::Bool(*b),
            OscType::Nil | OscType::Inf => Argument::Null,
            OscType::Array(array) => {
                Argument::List(array.content.iter().map(Argument::from_wire).collect())
            }
            OscType::Blob(bytes) => {
                Argument::List(bytes.iter().map(|b| Argument::Int(i64::from(*b))).collect())
            }
            other => Argument::String(format!("{:?}", other)),
        }
    }

    /// Convert a full decoded argument list.
    pub fn from_wire_args(args: &[OscType]) -> Vec<Self> {
        args.iter().map(Argument::from_wire).collect()
    }

    /// Append this value to an outbound argument list.
    ///
    /// Integral floats become int32, other floats float32. Integers outside
    /// the int32 range fall back to their decimal string. Lists flatten
    /// recursively. `Null` falls back to its string form, `"null"`.
    pub fn append_wire(&self, out: &mut Vec<OscType>) {
        match self {
            Argument::Null => out.push(OscType::String(self.to_string())),
            Argument::Bool(b) => out.push(OscType::Bool(*b)),
            Argument::Int(i) => match i32::try_from(*i) {
                Ok(small) => out.push(OscType::Int(small)),
                Err(_) => out.push(OscType::String(i.to_string())),
            },
            Argument::Float(f) => {
                if f.fract() == 0.0 && *f >= f64::from(i32::MIN) && *f <= f64::from(i32::MAX) {
                    out.push(OscType::Int(*f as i32));
                } else {
                    out.push(OscType::Float(*f as f32));
                }
            }
            Argument::String(s) => out.push(OscType::String(s.clone())),
            Argument::List(items) => {
                for item in items {
                    item.append_wire(out);
                }
            }
        }
    }

    /// Coerce into a complete outbound argument list.
    pub fn to_wire_args(&self) -> Vec<OscType> {
        let mut out = Vec::new();
        self.append_wire(&mut out);
        out
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Null => write!(f, "null"),
            Argument::Bool(b) => write!(f, "{}", b),
            Argument::Int(i) => write!(f, "{}", i),
            Argument::Float(x) => write!(f, "{}", x),
            Argument::String(s) => write!(f, "{:?}", s),
            Argument::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<i64> for Argument {
    fn from(value: i64) -> Self {
        Argument::Int(value)
    }
}

impl From<i32> for Argument {
    fn from(value: i32) -> Self {
        Argument::Int(i64::from(value))
    }
}

impl From<f64> for Argument {
    fn from(value: f64) -> Self {
        Argument::Float(value)
    }
}

impl From<bool> for Argument {
    fn from(value: bool) -> Self {
        Argument::Bool(value)
    }
}

impl From<&str> for Argument {
    fn from(value: &str) -> Self {
        Argument::String(value.to_string())
    }
}

impl From<String> for Argument {
    fn from(value: String) -> Self {
        Argument::String(value)
    }
}

impl From<Vec<Argument>> for Argument {
    fn from(value: Vec<Argument>) -> Self {
        Argument::List(value)
    }
}

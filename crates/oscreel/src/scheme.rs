//! Payload transforms applied before recording
//!
//! The set of schemes is closed and chosen once at startup. Each one is a
//! pure function of the inbound address and arguments.

use std::fmt;
use std::str::FromStr;

use crate::argument::Argument;

/// Named payload transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// Keep the full argument list.
    Basic,
    /// Keep only the first argument, or null when there is none.
    DirtBasic,
    /// Keep the odd positions (1, 3, 5, ...), i.e. the values of
    /// SuperDirt-style key/value pairs.
    DirtStrip,
    /// Keep integers and floats.
    OnlyNumbers,
}

/// Result of a transform: what gets recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct Transformed {
    pub address: String,
    pub data: Argument,
}

/// Returned when a scheme name is not one of [`Scheme::ALL`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown scheme '{name}' (expected one of: {})", Scheme::names().join(", "))]
pub struct UnknownScheme {
    pub name: String,
}

impl Scheme {
    pub const ALL: [Scheme; 4] = [
        Scheme::Basic,
        Scheme::DirtBasic,
        Scheme::DirtStrip,
        Scheme::OnlyNumbers,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Scheme::Basic => "basic",
            Scheme::DirtBasic => "dirt_basic",
            Scheme::DirtStrip => "dirt_strip",
            Scheme::OnlyNumbers => "only_numbers",
        }
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(Scheme::name).collect()
    }

    pub fn transform(&self, address: &str, args: &[Argument]) -> Transformed {
        let data = match self {
            Scheme::Basic => Argument::List(args.to_vec()),
            Scheme::DirtBasic => args.first().cloned().unwrap_or(Argument::Null),
            Scheme::DirtStrip => Argument::List(args.iter().skip(1).step_by(2).cloned().collect()),
            Scheme::OnlyNumbers => {
                Argument::List(args.iter().filter(|a| a.is_number()).cloned().collect())
            }
        };

        Transformed {
            address: address.to_string(),
            data,
        }
    }
}

impl FromStr for Scheme {
    type Err = UnknownScheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scheme::ALL
            .into_iter()
            .find(|scheme| scheme.name() == s)
            .ok_or_else(|| UnknownScheme {
                name: s.to_string(),
            })
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

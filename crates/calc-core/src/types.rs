//! Wire types shared by the calculator and the proxy.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};

use crate::error::UnknownOperation;

/// Operands of an arithmetic request.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CalcRequest {
    pub a: f64,
    pub b: f64,
}

impl CalcRequest {
    pub fn new(a: f64, b: f64) -> Self {
        Self { a, b }
    }
}

/// Success envelope: `{"Result": <number>}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalcResult {
    #[serde(rename = "Result", serialize_with = "finite")]
    pub result: f64,
}

impl CalcResult {
    pub fn new(result: f64) -> Self {
        Self { result }
    }
}

/// Error envelope: `{"Message": <string>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    #[serde(rename = "Message")]
    pub message: String,
}

impl ErrorEnvelope {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl<E: std::error::Error + ?Sized> From<&E> for ErrorEnvelope {
    fn from(err: &E) -> Self {
        Self::new(err.to_string())
    }
}

/// Integral values below 2^53 go out without a fractional part (`5`, not
/// `5.0`). JSON has no representation for NaN or the infinities.
fn finite<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    const EXACT_INT: f64 = 9_007_199_254_740_992.0;
    if value.is_finite() {
        if value.fract() == 0.0 && value.abs() < EXACT_INT {
            return serializer.serialize_i64(*value as i64);
        }
        return serializer.serialize_f64(*value);
    }
    let repr = if value.is_nan() {
        "NaN"
    } else if value.is_sign_positive() {
        "+Inf"
    } else {
        "-Inf"
    };
    Err(serde::ser::Error::custom(format!("unsupported value: {repr}")))
}

/// One of the four arithmetic operations a route can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Operation {
    Add,
    Sub,
    Mul,
    Div,
}

impl Operation {
    pub const ALL: [Operation; 4] = [Self::Add, Self::Sub, Self::Mul, Self::Div];

    /// Route selector, the last segment of the operation path.
    pub fn selector(self) -> &'static str {
        match self {
            Self::Add => "sum",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Self::Add => '+',
            Self::Sub => '-',
            Self::Mul => '*',
            Self::Div => '/',
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.selector())
    }
}

impl FromStr for Operation {
    type Err = UnknownOperation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sum" | "+" => Ok(Self::Add),
            "sub" | "-" => Ok(Self::Sub),
            "mul" | "*" => Ok(Self::Mul),
            "div" | "/" => Ok(Self::Div),
            other => Err(UnknownOperation(other.to_string())),
        }
    }
}

impl TryFrom<String> for Operation {
    type Error = UnknownOperation;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Operation> for String {
    fn from(op: Operation) -> Self {
        op.selector().to_string()
    }
}

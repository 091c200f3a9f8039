use std::{fmt, str::FromStr};

use crate::{errors::Error, Result};

/// Everything the bot can compute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Convert,
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
    Xor,
}

impl Operation {
    pub const ALL: [Operation; 8] = [
        Operation::Convert,
        Operation::Add,
        Operation::Sub,
        Operation::Mul,
        Operation::Div,
        Operation::And,
        Operation::Or,
        Operation::Xor,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Operation::Convert => "convert",
            Operation::Add => "add",
            Operation::Sub => "sub",
            Operation::Mul => "mul",
            Operation::Div => "div",
            Operation::And => "and",
            Operation::Or => "or",
            Operation::Xor => "xor",
        }
    }

    /// Button label used by the wizard menu.
    pub fn label(self) -> &'static str {
        match self {
            Operation::Convert => "🔄 Convert",
            Operation::Add => "➕ Add",
            Operation::Sub => "➖ Subtract",
            Operation::Mul => "✖️ Multiply",
            Operation::Div => "➗ Divide",
            Operation::And => "AND",
            Operation::Or => "OR",
            Operation::Xor => "XOR",
        }
    }

    /// Number of operands the operation consumes.
    pub fn arity(self) -> usize {
        match self {
            Operation::Convert => 1,
            _ => 2,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Operation::ALL
            .into_iter()
            .find(|op| op.name() == wanted)
            .ok_or_else(|| Error::UnsupportedOperation(s.trim().to_string()))
    }
}

/// Result of a binary operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Value(i128),
    Division { quotient: i128, remainder: i128 },
}

/// Apply a binary operation.
///
/// Division floors: the remainder takes the sign of `b`. Bitwise operations
/// work on two's-complement patterns.
pub fn apply(op: Operation, a: i128, b: i128) -> Result<Outcome> {
    let value = match op {
        Operation::Add => a.checked_add(b),
        Operation::Sub => a.checked_sub(b),
        Operation::Mul => a.checked_mul(b),
        Operation::Div => return floor_div(a, b),
        Operation::And => Some(a & b),
        Operation::Or => Some(a | b),
        Operation::Xor => Some(a ^ b),
        Operation::Convert => return Err(Error::UnsupportedOperation(op.name().to_string())),
    };
    value.map(Outcome::Value).ok_or(Error::ArithmeticOverflow)
}

fn floor_div(a: i128, b: i128) -> Result<Outcome> {
    if b == 0 {
        return Err(Error::DivisionByZero);
    }
    let mut quotient = a.checked_div(b).ok_or(Error::ArithmeticOverflow)?;
    let mut remainder = a.checked_rem(b).ok_or(Error::ArithmeticOverflow)?;
    if remainder != 0 && (remainder < 0) != (b < 0) {
        quotient -= 1;
        remainder += b;
    }
    Ok(Outcome::Division {
        quotient,
        remainder,
    })
}

//! Digit validation and base conversion.
//!
//! Values are `i128`. Negative values render as `-` followed by the magnitude in
//! every base, so `format(-10, Base::Hexadecimal)` is `"-a"`.

use std::{fmt, str::FromStr};

use crate::{errors::Error, Result};

const DIGITS: &str = "0123456789abcdef";

/// A supported numeral radix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Base {
    Binary,
    Octal,
    Decimal,
    Hexadecimal,
}

impl Base {
    pub const ALL: [Base; 4] = [
        Base::Binary,
        Base::Octal,
        Base::Decimal,
        Base::Hexadecimal,
    ];

    pub fn radix(self) -> u32 {
        match self {
            Base::Binary => 2,
            Base::Octal => 8,
            Base::Decimal => 10,
            Base::Hexadecimal => 16,
        }
    }

    /// The first `radix` characters of `0123456789abcdef`.
    pub fn alphabet(self) -> &'static str {
        &DIGITS[..self.radix() as usize]
    }
}

impl fmt::Display for Base {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.radix())
    }
}

impl TryFrom<u32> for Base {
    type Error = Error;

    fn try_from(radix: u32) -> Result<Self> {
        match radix {
            2 => Ok(Base::Binary),
            8 => Ok(Base::Octal),
            10 => Ok(Base::Decimal),
            16 => Ok(Base::Hexadecimal),
            other => Err(Error::UnsupportedBase(other.to_string())),
        }
    }
}

impl FromStr for Base {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let raw = s.trim();
        let radix = raw
            .parse::<u32>()
            .map_err(|_| Error::UnsupportedBase(raw.to_string()))?;
        Base::try_from(radix)
    }
}

/// True iff `text` (trimmed, case-insensitive) is non-empty and only uses the
/// digits of `base`.
pub fn is_valid(text: &str, base: Base) -> bool {
    let text = text.trim().to_lowercase();
    let alphabet = base.alphabet();
    !text.is_empty() && text.chars().all(|c| alphabet.contains(c))
}

/// Parse a digit string written in `base`.
///
/// Fails with `InputFormat` on foreign digits or values that do not fit `i128`.
pub fn parse(text: &str, base: Base) -> Result<i128> {
    let invalid = || Error::InputFormat {
        text: text.to_string(),
        base,
    };
    if !is_valid(text, base) {
        return Err(invalid());
    }
    i128::from_str_radix(&text.trim().to_lowercase(), base.radix()).map_err(|_| invalid())
}

/// Minimal lower-case digits of `value` in `base`, no radix prefix.
pub fn format(value: i128, base: Base) -> String {
    let magnitude = value.unsigned_abs();
    let digits = match base {
        Base::Binary => format!("{magnitude:b}"),
        Base::Octal => format!("{magnitude:o}"),
        Base::Decimal => magnitude.to_string(),
        Base::Hexadecimal => format!("{magnitude:x}"),
    };
    if value < 0 {
        format!("-{digits}")
    } else {
        digits
    }
}

/// A digit string paired with the base it is written in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NumericLiteral {
    text: String,
    base: Base,
}

impl NumericLiteral {
    pub fn new(text: &str, base: Base) -> Result<Self> {
        if !is_valid(text, base) {
            return Err(Error::InputFormat {
                text: text.to_string(),
                base,
            });
        }
        Ok(Self {
            text: text.trim().to_lowercase(),
            base,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn base(&self) -> Base {
        self.base
    }

    pub fn value(&self) -> Result<i128> {
        parse(&self.text, self.base)
    }
}

//! One-shot command surface and the final "compute + render" step shared with
//! the wizard.

use crate::{
    arithmetic::{apply, Operation, Outcome},
    errors::Error,
    formatting::escape_html,
    radix::{format, Base, NumericLiteral},
    Result,
};

pub const CONVERT_USAGE: &str = "/convert <number> <from_base> <to_base>";
pub const OPERATION_USAGE: &str =
    "/operation <op> <num1> <base1> <num2> <base2> <result_base>";

/// A fully collected request: operation, validated operands, result base.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Calculation {
    op: Operation,
    operands: Vec<NumericLiteral>,
    result_base: Base,
}

impl Calculation {
    pub fn new(op: Operation, operands: Vec<NumericLiteral>, result_base: Base) -> Result<Self> {
        if operands.len() != op.arity() {
            return Err(Error::UnsupportedOperation(format!(
                "{op} takes {} operand(s), got {}",
                op.arity(),
                operands.len()
            )));
        }
        Ok(Self {
            op,
            operands,
            result_base,
        })
    }

    /// Compute and render the reply text.
    pub fn run(&self) -> Result<String> {
        let rb = self.result_base;
        match self.operands.as_slice() {
            [number] if self.op == Operation::Convert => {
                let value = number.value()?;
                Ok(format!(
                    "Result in base {rb}: <code>{}</code>",
                    format(value, rb)
                ))
            }
            [lhs, rhs] => {
                let outcome = apply(self.op, lhs.value()?, rhs.value()?)?;
                Ok(render_outcome(self.op, outcome, rb))
            }
            _ => Err(Error::UnsupportedOperation(self.op.to_string())),
        }
    }

    /// One-line summary of the inputs, for logs and the wizard recap.
    pub fn describe(&self) -> String {
        let operands = self
            .operands
            .iter()
            .map(|n| format!("{} (base {})", n.text(), n.base()))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{} {operands} → base {}", self.op, self.result_base)
    }
}

fn render_outcome(op: Operation, outcome: Outcome, rb: Base) -> String {
    match outcome {
        Outcome::Value(v) => format!("Result of {op} in base {rb}: <code>{}</code>", format(v, rb)),
        Outcome::Division {
            quotient,
            remainder,
        } => format!(
            "Result of {op} in base {rb}: quotient <code>{}</code>, remainder <code>{}</code>",
            format(quotient, rb),
            format(remainder, rb)
        ),
    }
}

/// `/convert`: bases are checked before the number.
pub fn convert(number: &str, from_base: u32, to_base: u32) -> Result<String> {
    let from = Base::try_from(from_base)?;
    let to = Base::try_from(to_base)?;
    let literal = NumericLiteral::new(number, from)?;
    Calculation::new(Operation::Convert, vec![literal], to)?.run()
}

/// `/operation`: the operation is checked first, then all bases, then the numbers.
pub fn operation(
    op: &str,
    num1: &str,
    base1: u32,
    num2: &str,
    base2: u32,
    result_base: u32,
) -> Result<String> {
    let op = op.parse::<Operation>()?;
    if op == Operation::Convert {
        return Err(Error::UnsupportedOperation(op.to_string()));
    }
    let base1 = Base::try_from(base1)?;
    let base2 = Base::try_from(base2)?;
    let result_base = Base::try_from(result_base)?;
    let lhs = NumericLiteral::new(num1, base1)?;
    let rhs = NumericLiteral::new(num2, base2)?;
    Calculation::new(op, vec![lhs, rhs], result_base)?.run()
}

/// Parse `/convert` arguments (`ff 16 2`) and run it.
pub fn convert_command(args: &str) -> Result<String> {
    let parts = args.split_whitespace().collect::<Vec<_>>();
    let [number, from, to] = parts.as_slice() else {
        return Err(Error::Usage(CONVERT_USAGE));
    };
    convert(number, base_arg(from)?, base_arg(to)?)
}

/// Parse `/operation` arguments (`add 101 2 7 10 10`) and run it.
pub fn operation_command(args: &str) -> Result<String> {
    let parts = args.split_whitespace().collect::<Vec<_>>();
    let [op, num1, base1, num2, base2, result_base] = parts.as_slice() else {
        return Err(Error::Usage(OPERATION_USAGE));
    };
    // Operation name errors take precedence over base errors.
    op.parse::<Operation>()?;
    operation(
        op,
        num1,
        base_arg(base1)?,
        num2,
        base_arg(base2)?,
        base_arg(result_base)?,
    )
}

fn base_arg(raw: &str) -> Result<u32> {
    let raw = raw.trim();
    raw.parse::<u32>()
        .map_err(|_| Error::UnsupportedBase(raw.to_string()))
}

/// Turn a command result into the reply text, logging failures that are not
/// the user's fault.
pub fn reply_text(result: Result<String>) -> String {
    match result {
        Ok(text) => text,
        Err(err) => {
            if err.recovery() == crate::errors::Recovery::Internal {
                tracing::error!(error = %err, "command failed");
            }
            err.user_message()
        }
    }
}

/// Echo of user-supplied text, safe for HTML replies.
pub fn quote(text: &str) -> String {
    format!("<code>{}</code>", escape_html(text.trim()))
}

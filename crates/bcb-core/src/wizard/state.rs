//! Pure wizard state: which question is pending and what has been collected.

use crate::{
    arithmetic::Operation,
    calculator::{quote, Calculation},
    errors::Error,
    radix::{is_valid, Base, NumericLiteral},
    Result,
};

/// Where a session is. Operand indices are zero-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WizardStep {
    AwaitingOperation,
    AwaitingOperand(usize),
    AwaitingOperandBase(usize),
    AwaitingResultBase,
    Computing,
    Completed,
    Cancelled,
    TimedOut,
}

impl WizardStep {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            WizardStep::Completed | WizardStep::Cancelled | WizardStep::TimedOut
        )
    }
}

/// How a pending question expects to be answered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnswerKind {
    OperationMenu,
    BaseMenu,
    FreeTextNumber,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MenuOption {
    pub label: String,
    pub value: String,
}

impl MenuOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// One pending question. The deadline is applied by the chat interface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptStep {
    pub kind: AnswerKind,
    pub text: String,
    pub options: Vec<MenuOption>,
}

impl PromptStep {
    /// Map a reply onto a menu value: button values pass through, and typed
    /// text matching a value or label (case-insensitive) is accepted too.
    pub fn resolve<'a>(&'a self, reply: &'a str) -> &'a str {
        let wanted = reply.trim();
        self.options
            .iter()
            .find(|o| o.value.eq_ignore_ascii_case(wanted) || o.label.eq_ignore_ascii_case(wanted))
            .map(|o| o.value.as_str())
            .unwrap_or(wanted)
    }
}

#[derive(Clone, Debug, Default)]
struct OperandDraft {
    text: String,
    base: Option<Base>,
}

/// Ephemeral per-invocation state. Only validated replies mutate it.
#[derive(Clone, Debug)]
pub struct WizardSession {
    operation: Option<Operation>,
    operands: Vec<OperandDraft>,
    result_base: Option<Base>,
    step: WizardStep,
}

impl Default for WizardSession {
    fn default() -> Self {
        Self::new()
    }
}

impl WizardSession {
    pub fn new() -> Self {
        Self {
            operation: None,
            operands: Vec::new(),
            result_base: None,
            step: WizardStep::AwaitingOperation,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn operation(&self) -> Option<Operation> {
        self.operation
    }

    /// The question for the current step, or `None` once nothing is pending.
    pub fn prompt(&self) -> Option<PromptStep> {
        let prompt = match self.step {
            WizardStep::AwaitingOperation => PromptStep {
                kind: AnswerKind::OperationMenu,
                text: "🧮 What would you like to do?".to_string(),
                options: Operation::ALL
                    .into_iter()
                    .map(|op| MenuOption::new(op.label(), op.name()))
                    .collect(),
            },
            WizardStep::AwaitingOperand(i) => PromptStep {
                kind: AnswerKind::FreeTextNumber,
                text: self.operand_question(i),
                options: Vec::new(),
            },
            WizardStep::AwaitingOperandBase(i) => PromptStep {
                kind: AnswerKind::BaseMenu,
                text: format!(
                    "Which base is {} written in?",
                    quote(&self.operands[i].text)
                ),
                options: base_options(),
            },
            WizardStep::AwaitingResultBase => PromptStep {
                kind: AnswerKind::BaseMenu,
                text: if self.operation == Some(Operation::Convert) {
                    "Convert to which base?".to_string()
                } else {
                    "Which base should the result be in?".to_string()
                },
                options: base_options(),
            },
            WizardStep::Computing
            | WizardStep::Completed
            | WizardStep::Cancelled
            | WizardStep::TimedOut => return None,
        };
        Some(prompt)
    }

    fn operand_question(&self, i: usize) -> String {
        match (self.operation, i) {
            (Some(Operation::Convert), _) => "Send the number to convert.".to_string(),
            (_, 0) => "Send the first number.".to_string(),
            _ => "Send the second number.".to_string(),
        }
    }

    /// Validate `reply` against the pending question and advance.
    ///
    /// On error the step is unchanged, so the same question can be asked again.
    pub fn answer(&mut self, reply: &str) -> Result<()> {
        let Some(prompt) = self.prompt() else {
            return Err(Error::External(format!(
                "no question pending in {:?}",
                self.step
            )));
        };
        let value = prompt.resolve(reply);

        match self.step {
            WizardStep::AwaitingOperation => {
                let op = value.parse::<Operation>()?;
                self.operation = Some(op);
                self.operands = vec![OperandDraft::default(); op.arity()];
                self.step = WizardStep::AwaitingOperand(0);
            }
            WizardStep::AwaitingOperand(i) => {
                // The base is not known yet; the widest alphabet filters garbage early.
                if !is_valid(value, Base::Hexadecimal) {
                    return Err(Error::InputFormat {
                        text: value.to_string(),
                        base: Base::Hexadecimal,
                    });
                }
                self.operands[i].text = value.trim().to_lowercase();
                self.step = WizardStep::AwaitingOperandBase(i);
            }
            WizardStep::AwaitingOperandBase(i) => {
                let base = value.parse::<Base>()?;
                let text = &self.operands[i].text;
                if !is_valid(text, base) {
                    return Err(Error::InputFormat {
                        text: text.clone(),
                        base,
                    });
                }
                self.operands[i].base = Some(base);
                self.step = if i + 1 < self.operands.len() {
                    WizardStep::AwaitingOperand(i + 1)
                } else {
                    WizardStep::AwaitingResultBase
                };
            }
            WizardStep::AwaitingResultBase => {
                self.result_base = Some(value.parse::<Base>()?);
                self.step = WizardStep::Computing;
            }
            WizardStep::Computing
            | WizardStep::Completed
            | WizardStep::Cancelled
            | WizardStep::TimedOut => {
                return Err(Error::External(format!(
                    "no question pending in {:?}",
                    self.step
                )))
            }
        }
        Ok(())
    }

    /// Build the request once every field is collected.
    pub fn calculation(&self) -> Result<Calculation> {
        let incomplete = || Error::External(format!("wizard incomplete at {:?}", self.step));
        if self.step != WizardStep::Computing {
            return Err(incomplete());
        }
        let op = self.operation.ok_or_else(incomplete)?;
        let result_base = self.result_base.ok_or_else(incomplete)?;
        let operands = self
            .operands
            .iter()
            .map(|d| NumericLiteral::new(&d.text, d.base.ok_or_else(incomplete)?))
            .collect::<Result<Vec<_>>>()?;
        Calculation::new(op, operands, result_base)
    }

    pub fn complete(&mut self) {
        if self.step == WizardStep::Computing {
            self.step = WizardStep::Completed;
        }
    }

    pub fn cancel(&mut self) {
        if !self.step.is_terminal() {
            self.step = WizardStep::Cancelled;
        }
    }

    pub fn time_out(&mut self) {
        if !self.step.is_terminal() {
            self.step = WizardStep::TimedOut;
        }
    }
}

fn base_options() -> Vec<MenuOption> {
    Base::ALL
        .into_iter()
        .map(|b| MenuOption::new(format!("Base {b}"), b.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(session: &mut WizardSession, replies: &[&str]) {
        for r in replies {
            session.answer(r).unwrap();
        }
    }

    #[test]
    fn convert_collects_one_operand() {
        let mut s = WizardSession::new();
        feed(&mut s, &["convert"]);
        assert_eq!(s.step(), WizardStep::AwaitingOperand(0));
        feed(&mut s, &["FF"]);
        assert_eq!(s.step(), WizardStep::AwaitingOperandBase(0));
        feed(&mut s, &["16"]);
        assert_eq!(s.step(), WizardStep::AwaitingResultBase);
        feed(&mut s, &["2"]);
        assert_eq!(s.step(), WizardStep::Computing);
        assert!(s.prompt().is_none());

        let out = s.calculation().unwrap().run().unwrap();
        assert_eq!(out, "Result in base 2: <code>11111111</code>");
    }

    #[test]
    fn binary_operation_walks_both_operands() {
        let mut s = WizardSession::new();
        feed(&mut s, &["add", "101", "2"]);
        assert_eq!(s.step(), WizardStep::AwaitingOperand(1));
        assert_eq!(s.prompt().unwrap().text, "Send the second number.");
        feed(&mut s, &["3", "10", "10"]);
        assert_eq!(s.step(), WizardStep::Computing);
        let out = s.calculation().unwrap().run().unwrap();
        assert!(out.contains('8'), "{out}");
    }

    #[test]
    fn invalid_number_keeps_step() {
        let mut s = WizardSession::new();
        feed(&mut s, &["sub"]);
        let err = s.answer("xyz").unwrap_err();
        assert!(matches!(err, Error::InputFormat { .. }));
        assert_eq!(s.step(), WizardStep::AwaitingOperand(0));
    }

    #[test]
    fn base_must_admit_the_operand() {
        let mut s = WizardSession::new();
        feed(&mut s, &["mul", "12"]);
        let err = s.answer("2").unwrap_err();
        assert!(matches!(err, Error::InputFormat { base: Base::Binary, .. }));
        assert_eq!(s.step(), WizardStep::AwaitingOperandBase(0));
        assert!(matches!(s.answer("3"), Err(Error::UnsupportedBase(b)) if b == "3"));
        feed(&mut s, &["8"]);
        assert_eq!(s.step(), WizardStep::AwaitingOperand(1));
    }

    #[test]
    fn menus_accept_typed_labels() {
        let mut s = WizardSession::new();
        feed(&mut s, &["➗ divide", "10"]);
        assert_eq!(s.operation(), Some(Operation::Div));
        feed(&mut s, &["base 10"]);
        assert_eq!(s.step(), WizardStep::AwaitingOperand(1));
        assert!(matches!(
            WizardSession::new().answer("pow"),
            Err(Error::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn terminal_states_stick() {
        let mut s = WizardSession::new();
        s.time_out();
        assert_eq!(s.step(), WizardStep::TimedOut);
        s.cancel();
        assert_eq!(s.step(), WizardStep::TimedOut);
        assert!(s.prompt().is_none());
        assert!(s.answer("add").is_err());
        assert!(s.calculation().is_err());
    }

    #[test]
    fn calculation_requires_all_fields() {
        let mut s = WizardSession::new();
        feed(&mut s, &["and", "1"]);
        assert!(s.calculation().is_err());
    }
}

use crate::{formatting::escape_html, radix::Base};

/// Core error type for the base calculator bot.
///
/// The calculator and wizard kinds form a closed set; each one maps to a
/// single recovery policy via [`Error::recovery`]. Adapter crates map their
/// failures into `External`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("`{text}` is not a valid base-{base} number")]
    InputFormat { text: String, base: Base },

    #[error("unsupported base: {0}")]
    UnsupportedBase(String),

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("arithmetic overflow")]
    ArithmeticOverflow,

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("session timed out")]
    SessionTimeout,

    #[error("session cancelled")]
    SessionCancelled,

    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// What a caller should do with a failed step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Recovery {
    /// Bad user input: ask again (wizard) or reply with the reason (one-shot).
    Reprompt,
    /// The inputs were fine but the requested computation failed.
    Report,
    /// The session is over.
    Terminate,
    /// Not a user problem; log it and send a generic failure.
    Internal,
}

impl Error {
    pub fn recovery(&self) -> Recovery {
        match self {
            Error::InputFormat { .. }
            | Error::UnsupportedBase(_)
            | Error::UnsupportedOperation(_)
            | Error::Usage(_) => Recovery::Reprompt,
            Error::DivisionByZero | Error::ArithmeticOverflow => Recovery::Report,
            Error::SessionTimeout | Error::SessionCancelled => Recovery::Terminate,
            Error::Config(_) | Error::Io(_) | Error::Json(_) | Error::External(_) => {
                Recovery::Internal
            }
        }
    }

    /// Reply shown to the chat user (Telegram HTML subset).
    pub fn user_message(&self) -> String {
        match self {
            Error::InputFormat { text, base } => {
                format!(
                    "The number <code>{}</code> is not valid in base {base}",
                    escape_html(text.trim())
                )
            }
            Error::UnsupportedBase(_) => "Supported bases: 2, 8, 10, 16".to_string(),
            Error::UnsupportedOperation(_) => {
                "Supported operations: add, sub, mul, div, and, or, xor".to_string()
            }
            Error::Usage(usage) => format!("Usage: <code>{}</code>", escape_html(usage)),
            Error::DivisionByZero => "Cannot divide by zero".to_string(),
            Error::ArithmeticOverflow => "The result is too large to compute".to_string(),
            Error::SessionTimeout => {
                "⏰ Timed out waiting for a reply. Nothing was computed.".to_string()
            }
            Error::SessionCancelled => "🛑 Cancelled. Nothing was computed.".to_string(),
            Error::Config(_) | Error::Io(_) | Error::Json(_) | Error::External(_) => {
                "❌ An error occurred!".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovery_policy_per_kind() {
        let bad_digit = Error::InputFormat {
            text: "xyz".to_string(),
            base: Base::Binary,
        };
        assert_eq!(bad_digit.recovery(), Recovery::Reprompt);
        assert_eq!(
            Error::UnsupportedBase("3".to_string()).recovery(),
            Recovery::Reprompt
        );
        assert_eq!(
            Error::UnsupportedOperation("pow".to_string()).recovery(),
            Recovery::Reprompt
        );
        assert_eq!(Error::DivisionByZero.recovery(), Recovery::Report);
        assert_eq!(Error::SessionTimeout.recovery(), Recovery::Terminate);
        assert_eq!(Error::SessionCancelled.recovery(), Recovery::Terminate);
        assert_eq!(
            Error::External("boom".to_string()).recovery(),
            Recovery::Internal
        );
    }

    #[test]
    fn internal_errors_do_not_leak_details() {
        let msg = Error::External("secret token abc".to_string()).user_message();
        assert!(!msg.contains("secret"));
    }

    #[test]
    fn input_format_message_names_base() {
        let e = Error::InputFormat {
            text: " 12 ".to_string(),
            base: Base::Binary,
        };
        assert_eq!(
            e.user_message(),
            "The number <code>12</code> is not valid in base 2"
        );
    }
}

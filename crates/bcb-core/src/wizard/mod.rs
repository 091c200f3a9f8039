//! Multi-step guided calculator.
//!
//! `state` is the pure state machine, `controller` drives it through a
//! `chat::ChatInterface`, and `registry` routes replies to live sessions.

pub mod chat;
pub mod controller;
pub mod registry;
pub mod state;

pub use chat::{
    ChatInterface, PortConversation, Reply, WaitOutcome, WizardCallback, WizardTimeouts,
};
pub use controller::WizardController;
pub use registry::{run_wizard, Delivery, SessionHandle, SessionRegistry};
pub use state::{AnswerKind, MenuOption, PromptStep, WizardSession, WizardStep};

use crate::{
    errors::{Error, Recovery},
    wizard::{
        chat::{ChatInterface, WaitOutcome},
        state::{AnswerKind, WizardSession, WizardStep},
    },
    Result,
};

/// Drives a [`WizardSession`] through a [`ChatInterface`].
///
/// Each non-terminal step issues exactly one prompt and suspends until a
/// reply, a cancel, or the deadline. Bad replies re-issue the same prompt with
/// no retry cap; timeout and cancel end the session without computing.
#[derive(Debug, Default)]
pub struct WizardController {
    session: WizardSession,
}

impl WizardController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> WizardStep {
        self.session.step()
    }

    pub async fn run<C>(&mut self, chat: &mut C) -> Result<String>
    where
        C: ChatInterface + ?Sized,
    {
        while let Some(prompt) = self.session.prompt() {
            let waited = match prompt.kind {
                AnswerKind::OperationMenu | AnswerKind::BaseMenu => {
                    chat.present_menu(&prompt.text, &prompt.options).await
                }
                AnswerKind::FreeTextNumber => chat.request_free_text(&prompt.text).await,
            };

            match waited? {
                WaitOutcome::Selected(reply) => match self.session.answer(&reply) {
                    Ok(()) => {}
                    Err(err) if err.recovery() == Recovery::Reprompt => {
                        tracing::debug!(
                            step = ?self.session.step(),
                            operation = ?self.session.operation(),
                            error = %err,
                            "reprompting"
                        );
                        chat.send(&err.user_message()).await;
                    }
                    Err(err) => return Err(err),
                },
                WaitOutcome::NoSelection => {
                    self.session.cancel();
                    chat.disable_menus().await;
                    return Err(Error::SessionCancelled);
                }
                WaitOutcome::Timeout => {
                    self.session.time_out();
                    chat.disable_menus().await;
                    return Err(Error::SessionTimeout);
                }
            }
        }

        let calculation = self.session.calculation()?;
        tracing::debug!(request = %calculation.describe(), "computing");
        let message = match calculation.run() {
            Ok(message) => message,
            // Inputs were valid; only the arithmetic failed. Still a completed session.
            Err(err) if err.recovery() == Recovery::Report => err.user_message(),
            Err(err) => return Err(err),
        };
        self.session.complete();
        chat.send(&message).await;
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::VecDeque, sync::Arc, time::Duration};

    use async_trait::async_trait;

    use super::*;
    use crate::{
        domain::{ChatId, SessionKey, UserId},
        testing::FakeMessenger,
        wizard::{
            chat::{PortConversation, Reply, WizardCallback, WizardTimeouts},
            registry::{run_wizard, Delivery, SessionRegistry},
            state::MenuOption,
        },
    };

    /// Replays canned wait outcomes and records what the controller did.
    #[derive(Default)]
    struct ScriptedChat {
        script: VecDeque<WaitOutcome<String>>,
        prompts: Vec<String>,
        sent: Vec<String>,
        menus_open: usize,
        disabled: usize,
    }

    impl ScriptedChat {
        fn new(script: Vec<WaitOutcome<String>>) -> Self {
            Self {
                script: script.into(),
                ..Default::default()
            }
        }

        fn next(&mut self) -> WaitOutcome<String> {
            self.script.pop_front().unwrap_or(WaitOutcome::Timeout)
        }
    }

    #[async_trait]
    impl ChatInterface for ScriptedChat {
        async fn present_menu(
            &mut self,
            prompt: &str,
            _options: &[MenuOption],
        ) -> Result<WaitOutcome<String>> {
            self.prompts.push(prompt.to_string());
            self.menus_open += 1;
            Ok(self.next())
        }

        async fn request_free_text(&mut self, prompt: &str) -> Result<WaitOutcome<String>> {
            self.prompts.push(prompt.to_string());
            Ok(self.next())
        }

        async fn send(&mut self, message: &str) {
            self.sent.push(message.to_string());
        }

        async fn disable_menus(&mut self) {
            self.disabled += self.menus_open;
            self.menus_open = 0;
        }
    }

    fn selected(values: &[&str]) -> Vec<WaitOutcome<String>> {
        values
            .iter()
            .map(|v| WaitOutcome::Selected(v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn convert_ff_to_binary() {
        let mut chat = ScriptedChat::new(selected(&["convert", "ff", "16", "2"]));
        let mut controller = WizardController::new();

        let out = controller.run(&mut chat).await.unwrap();

        assert_eq!(out, "Result in base 2: <code>11111111</code>");
        assert_eq!(controller.step(), WizardStep::Completed);
        assert_eq!(chat.prompts.len(), 4);
        assert_eq!(chat.sent, vec![out]);
    }

    #[tokio::test]
    async fn add_across_bases() {
        let mut chat = ScriptedChat::new(selected(&["add", "101", "2", "3", "10", "10"]));
        let out = WizardController::new().run(&mut chat).await.unwrap();
        assert!(out.contains('8'), "{out}");
    }

    #[tokio::test]
    async fn invalid_number_reprompts_same_question() {
        let mut chat = ScriptedChat::new(selected(&["xor", "xyz", "1", "2", "1", "2", "2"]));
        let mut controller = WizardController::new();

        let out = controller.run(&mut chat).await.unwrap();

        assert_eq!(out, "Result of xor in base 2: <code>0</code>");
        assert_eq!(chat.prompts[1], chat.prompts[2], "same prompt re-issued");
        assert!(chat.sent[0].contains("xyz"), "{:?}", chat.sent);
    }

    #[tokio::test]
    async fn base_that_rejects_operand_reprompts_menu() {
        let mut chat = ScriptedChat::new(selected(&["convert", "12", "2", "8", "10"]));
        let out = WizardController::new().run(&mut chat).await.unwrap();
        assert_eq!(out, "Result in base 10: <code>10</code>");
        assert_eq!(chat.prompts[2], chat.prompts[3]);
    }

    #[tokio::test]
    async fn timeout_at_any_step_ends_without_result() {
        for answered in 0..6 {
            let mut script = selected(&["sub", "1", "10", "1", "10"]);
            script.truncate(answered);
            let mut chat = ScriptedChat::new(script);
            let mut controller = WizardController::new();

            let err = controller.run(&mut chat).await.unwrap_err();

            assert!(matches!(err, Error::SessionTimeout), "step {answered}");
            assert_eq!(controller.step(), WizardStep::TimedOut);
            assert!(chat.sent.is_empty(), "no arithmetic after {answered} answers");
            assert_eq!(chat.menus_open, 0, "menus disabled");
        }
    }

    #[tokio::test]
    async fn no_selection_cancels() {
        let mut chat = ScriptedChat::new(vec![
            WaitOutcome::Selected("mul".to_string()),
            WaitOutcome::NoSelection,
        ]);
        let mut controller = WizardController::new();
        let err = controller.run(&mut chat).await.unwrap_err();
        assert!(matches!(err, Error::SessionCancelled));
        assert_eq!(controller.step(), WizardStep::Cancelled);
    }

    #[tokio::test]
    async fn division_by_zero_still_completes() {
        let mut chat = ScriptedChat::new(selected(&["div", "5", "10", "0", "2", "10"]));
        let mut controller = WizardController::new();

        let out = controller.run(&mut chat).await.unwrap();

        assert_eq!(out, "Cannot divide by zero");
        assert_eq!(controller.step(), WizardStep::Completed);
    }

    fn session_key() -> SessionKey {
        SessionKey::new(ChatId(5), UserId(9))
    }

    /// Press the button carrying `value` on the `n`th menu, once it is shown.
    async fn press(
        registry: &SessionRegistry,
        messenger: &FakeMessenger,
        n: usize,
        value: &str,
    ) -> Delivery {
        while messenger.keyboard_sends().len() < n {
            tokio::task::yield_now().await;
        }
        let (_, keyboard) = &messenger.keyboard_sends()[n - 1];
        let cb = keyboard
            .buttons()
            .filter_map(|b| WizardCallback::parse(&b.callback_data))
            .find(|cb| cb.value == value)
            .unwrap();
        registry.deliver_press(session_key(), cb).await
    }

    #[tokio::test(start_paused = true)]
    async fn end_to_end_over_port_times_out_and_disables_menu() {
        let registry = SessionRegistry::default();
        let handle = registry.begin(session_key()).await;
        let id = handle.id;
        let messenger = Arc::new(FakeMessenger::default());
        let timeouts = WizardTimeouts {
            menu: Duration::from_secs(30),
            reply: Duration::from_secs(30),
        };
        let mut chat = PortConversation::new(messenger.clone(), handle, timeouts);

        let err = run_wizard(&registry, session_key(), id, &mut chat)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::SessionTimeout));
        assert_eq!(messenger.keyboard_sends().len(), 1);
        assert_eq!(messenger.cleared().len(), 1);
        assert!(messenger.sent_html().iter().any(|s| s.contains("Timed out")));
        assert_eq!(
            registry
                .deliver(session_key(), Reply::Text("1".to_string()))
                .await,
            Delivery::NoSession
        );
    }

    #[tokio::test]
    async fn end_to_end_over_port_completes() {
        let registry = Arc::new(SessionRegistry::default());
        let handle = registry.begin(session_key()).await;
        let id = handle.id;
        let messenger = Arc::new(FakeMessenger::default());
        let mut chat = PortConversation::new(messenger.clone(), handle, WizardTimeouts::default());

        let task = {
            let registry = registry.clone();
            tokio::spawn(async move { run_wizard(&registry, session_key(), id, &mut chat).await })
        };

        assert_eq!(press(&registry, &messenger, 1, "convert").await, Delivery::Routed);
        // Typed replies queue in the channel, so this can go ahead of its prompt.
        assert_eq!(
            registry
                .deliver(session_key(), Reply::Text("FF".to_string()))
                .await,
            Delivery::Routed
        );
        assert_eq!(press(&registry, &messenger, 2, "16").await, Delivery::Routed);
        while messenger.keyboard_sends().len() < 3 {
            tokio::task::yield_now().await;
        }
        assert_eq!(
            registry
                .deliver(session_key(), Reply::Text("Base 8".to_string()))
                .await,
            Delivery::Routed
        );

        let out = task.await.unwrap().unwrap();
        assert_eq!(out, "Result in base 8: <code>377</code>");
        assert_eq!(messenger.keyboard_sends().len(), 3);
        let recaps: Vec<String> = messenger.edits().into_iter().map(|(_, t)| t).collect();
        assert_eq!(recaps.len(), 3);
        assert!(recaps[0].ends_with("→ <b>🔄 Convert</b>"), "{}", recaps[0]);
        assert!(recaps[2].ends_with("→ <b>Base 8</b>"), "{}", recaps[2]);
        assert!(messenger.cleared().is_empty());
    }

    #[tokio::test]
    async fn repeated_presses_never_become_operands() {
        let registry = Arc::new(SessionRegistry::default());
        let handle = registry.begin(session_key()).await;
        let id = handle.id;
        // Raw channel: models presses that raced past the registry checks.
        let raw = registry.sender(session_key()).await.unwrap();
        let messenger = Arc::new(FakeMessenger::default());
        let mut chat = PortConversation::new(messenger.clone(), handle, WizardTimeouts::default());

        let task = {
            let registry = registry.clone();
            tokio::spawn(async move { run_wizard(&registry, session_key(), id, &mut chat).await })
        };

        let sel = |menu, value: &str| Reply::Selection {
            menu,
            value: value.to_string(),
        };
        let txt = |value: &str| Reply::Text(value.to_string());
        for reply in [
            sel(1, "add"),
            sel(1, "add"),
            txt("ff"),
            sel(2, "16"),
            txt("1"),
            sel(3, "16"),
            sel(3, "16"),
            sel(4, "16"),
        ] {
            raw.send(reply).await.unwrap();
        }

        let out = task.await.unwrap().unwrap();
        assert_eq!(out, "Result of add in base 16: <code>100</code>");
        assert!(
            messenger.sent_html().iter().all(|s| !s.contains("not valid")),
            "no reprompt expected: {:?}",
            messenger.sent_html()
        );
    }

    #[tokio::test]
    async fn press_on_an_answered_menu_is_stale() {
        let registry = Arc::new(SessionRegistry::default());
        let handle = registry.begin(session_key()).await;
        let id = handle.id;
        let messenger = Arc::new(FakeMessenger::default());
        let mut chat = PortConversation::new(messenger.clone(), handle, WizardTimeouts::default());

        let _task = {
            let registry = registry.clone();
            tokio::spawn(async move { run_wizard(&registry, session_key(), id, &mut chat).await })
        };

        assert_eq!(press(&registry, &messenger, 1, "add").await, Delivery::Routed);
        // Wait for the operand question, i.e. the menu has been answered.
        while messenger.sent_html().is_empty() {
            tokio::task::yield_now().await;
        }
        assert_eq!(press(&registry, &messenger, 1, "add").await, Delivery::Stale);
    }
}

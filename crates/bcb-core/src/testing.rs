//! Test doubles shared by the core unit tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::{port::MessagingPort, types::InlineKeyboard},
    Result,
};

#[derive(Default)]
pub(crate) struct FakeMessenger {
    pub(crate) next_id: Mutex<i32>,
    pub(crate) sends: Mutex<Vec<String>>,
    pub(crate) keyboards: Mutex<Vec<(String, InlineKeyboard)>>,
    pub(crate) edits: Mutex<Vec<(MessageRef, String)>>,
    pub(crate) cleared: Mutex<Vec<MessageRef>>,
    /// Make every `edit_html` fail, as for a message deleted by the user.
    pub(crate) fail_edits: bool,
}

impl FakeMessenger {
    fn alloc(&self, chat_id: ChatId) -> MessageRef {
        let mut guard = self.next_id.lock().unwrap();
        *guard += 1;
        MessageRef {
            chat_id,
            message_id: MessageId(*guard),
        }
    }

    pub(crate) fn sent_html(&self) -> Vec<String> {
        self.sends.lock().unwrap().clone()
    }

    pub(crate) fn keyboard_sends(&self) -> Vec<(String, InlineKeyboard)> {
        self.keyboards.lock().unwrap().clone()
    }

    pub(crate) fn edits(&self) -> Vec<(MessageRef, String)> {
        self.edits.lock().unwrap().clone()
    }

    pub(crate) fn cleared(&self) -> Vec<MessageRef> {
        self.cleared.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessagingPort for FakeMessenger {
    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
        self.sends.lock().unwrap().push(html.to_string());
        Ok(self.alloc(chat_id))
    }

    async fn edit_html(&self, msg: MessageRef, html: &str) -> Result<()> {
        if self.fail_edits {
            return Err(Error::External("message to edit not found".to_string()));
        }
        self.edits.lock().unwrap().push((msg, html.to_string()));
        Ok(())
    }

    async fn send_inline_keyboard(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: InlineKeyboard,
    ) -> Result<MessageRef> {
        self.keyboards
            .lock()
            .unwrap()
            .push((text.to_string(), keyboard));
        Ok(self.alloc(chat_id))
    }

    async fn clear_inline_keyboard(&self, msg: MessageRef) -> Result<()> {
        self.cleared.lock().unwrap().push(msg);
        Ok(())
    }

    async fn answer_callback_query(
        &self,
        _callback_id: &str,
        _text: Option<&str>,
    ) -> Result<()> {
        Ok(())
    }
}

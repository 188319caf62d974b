//! Mock notifier for tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::notify::{LinkButton, MessageFormat, Notifier, NotifyError};

/// One delivered message, as the mock recorded it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub recipient: String,
    pub text: String,
    pub format: MessageFormat,
    pub button: Option<LinkButton>,
}

/// Notifier that records every send, optionally failing all of them.
#[derive(Debug, Default)]
pub struct MockNotifier {
    sent: Mutex<Vec<SentMessage>>,
    failing: AtomicBool,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Messages delivered so far, in order.
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send(
        &self,
        recipient: &str,
        text: &str,
        format: MessageFormat,
        button: Option<&LinkButton>,
    ) -> Result<(), NotifyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Api("scripted failure".to_string()));
        }
        self.sent.lock().unwrap().push(SentMessage {
            recipient: recipient.to_string(),
            text: text.to_string(),
            format,
            button: button.cloned(),
        });
        Ok(())
    }
}

//! Mock poster for tests, with scriptable failures.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use crate::post::{PublishError, Poster};

/// Poster that fails a configured number of times before succeeding, and
/// records every successfully published text.
#[derive(Debug, Default)]
pub struct MockPoster {
    failures_before_success: AtomicU32,
    attempts: AtomicU32,
    published: Mutex<Vec<String>>,
}

impl MockPoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` publish attempts, then succeed.
    pub fn fail_times(&self, count: u32) {
        self.failures_before_success.store(count, Ordering::SeqCst);
    }

    /// Total attempts seen so far.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Texts that were successfully published, in order.
    pub fn published(&self) -> Vec<String> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl Poster for MockPoster {
    async fn publish(&self, text: &str) -> Result<String, PublishError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let remaining = self.failures_before_success.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_before_success
                .store(remaining - 1, Ordering::SeqCst);
            return Err(PublishError::Api("scripted failure".to_string()));
        }
        self.published.lock().unwrap().push(text.to_string());
        Ok(format!("post-{}", attempt))
    }
}

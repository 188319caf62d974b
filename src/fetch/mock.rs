//! Mock page fetcher for tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::fetch::{FetchError, PageFetcher};
use crate::models::RawArticle;

/// A fetcher returning scripted responses, one per call. When the script is
/// exhausted it keeps returning the last configured response (or an empty
/// page if none was configured).
#[derive(Debug, Default)]
pub struct MockFetcher {
    responses: Mutex<VecDeque<Result<Vec<RawArticle>, String>>>,
    last: Mutex<Option<Result<Vec<RawArticle>, String>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a page of raw articles.
    pub fn push_page(&self, articles: Vec<RawArticle>) {
        self.responses.lock().unwrap().push_back(Ok(articles));
    }

    /// Queue a fetch failure.
    pub fn push_failure(&self, message: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch(&self, _url: &str) -> Result<Vec<RawArticle>, FetchError> {
        let next = self.responses.lock().unwrap().pop_front();
        let response = match next {
            Some(response) => {
                *self.last.lock().unwrap() = Some(response.clone());
                response
            }
            None => self
                .last
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| Ok(Vec::new())),
        };
        response.map_err(FetchError::Network)
    }
}

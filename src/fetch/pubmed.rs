//! PubMed search-results page fetcher.

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;

use crate::fetch::{FetchError, PageFetcher};
use crate::models::RawArticle;

/// Fetches and parses a PubMed advanced-search results page.
///
/// Each result is an `article.full-docsum` element carrying the title,
/// author string, short journal citation and PMID of one article.
#[derive(Debug, Clone)]
pub struct PubMedFetcher {
    client: reqwest::Client,
}

impl PubMedFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| FetchError::Network(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Parse a results page into raw records.
    fn parse_results(html: &str) -> Result<Vec<RawArticle>, FetchError> {
        let document = Html::parse_document(html);
        let result_selector = Selector::parse("article.full-docsum")
            .map_err(|e| FetchError::Parse(format!("bad selector: {}", e)))?;

        let mut articles = Vec::new();
        for entry in document.select(&result_selector) {
            let pmid = select_text(&entry, "span.docsum-pmid").unwrap_or_default();
            let title = select_text(&entry, "a.docsum-title").unwrap_or_default();
            let authors = select_text(&entry, "span.full-authors").unwrap_or_default();
            let journal = select_text(&entry, "span.short-journal-citation");
            articles.push(RawArticle {
                pmid,
                title,
                authors,
                journal,
            });
        }

        Ok(articles)
    }
}

/// Trimmed text content of the first element matching `css`, if any.
fn select_text(entry: &ElementRef<'_>, css: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    let element = entry.select(&selector).next()?;
    let text = element.text().collect::<String>().trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[async_trait]
impl PageFetcher for PubMedFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<RawArticle>, FetchError> {
        let response = self
            .client
            .get(url)
            .header("Accept", "text/html")
            .send()
            .await
            .map_err(|e| FetchError::Network(format!("failed to fetch results page: {}", e)))?;

        if !response.status().is_success() {
            return Err(FetchError::Network(format!(
                "results page returned status: {}",
                response.status()
            )));
        }

        let html = response
            .text()
            .await
            .map_err(|e| FetchError::Network(format!("failed to read results page: {}", e)))?;

        Self::parse_results(&html)
    }
}

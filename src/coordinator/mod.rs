//! The poll→diff→publish→record cycle.
//!
//! One logical task runs each cycle to completion before the next starts;
//! there is no parallel fan-out across articles, so the fixed cooldowns are
//! the only rate limiting the external platforms see. Every long wait is
//! cancellable through the shutdown token.

use chrono::Utc;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::compose::compose;
use crate::fetch::{FetchError, PageFetcher};
use crate::models::{ArticleRecord, RawArticle};
use crate::notify::{LinkButton, MessageFormat, Notifier};
use crate::post::Poster;
use crate::schedule::{sleep_cancellable, Scheduler};
use crate::store::{DedupeStore, Store, StoreError};

/// Tunables for the publishing loop.
#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    /// Search-results URL to poll
    pub search_url: String,
    /// Hashtag prefixed to every post
    pub hashtag: String,
    /// Platform post length limit
    pub max_post_length: usize,
    /// Minimum interval between poll cycles
    pub poll_interval: Duration,
    /// Cooldown after a failed fetch, shorter than the normal interval
    pub fetch_retry_cooldown: Duration,
    /// How often the pause signal is re-checked while paused
    pub pause_poll: Duration,
    /// Mandatory delay between two articles
    pub article_cooldown: Duration,
    /// Bound on publish attempts per article
    pub max_publish_attempts: u32,
    /// Base of the linear retry backoff
    pub backoff_base: Duration,
    /// Recipients notified in private chat with the plain post text
    pub private_recipients: Vec<String>,
    /// Recipients notified when a cycle finds nothing new
    pub admin_recipients: Vec<String>,
    /// Public channel receiving the rich message, if configured
    pub channel: Option<String>,
}

/// What one cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleOutcome {
    /// Distinct articles on the fetched page
    pub fetched: usize,
    /// Articles not yet published
    pub surviving: usize,
    /// Articles published this cycle
    pub published: usize,
    /// Articles abandoned after exhausting retries
    pub abandoned: usize,
}

/// A cycle that could not run to completion.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Drives the recurring cycle against the collaborator set.
#[derive(Debug)]
pub struct PublishCoordinator {
    fetcher: Arc<dyn PageFetcher>,
    poster: Arc<dyn Poster>,
    notifier: Arc<dyn Notifier>,
    dedupe: DedupeStore,
    scheduler: Scheduler,
    settings: CoordinatorSettings,
    paused: Arc<AtomicBool>,
    shutdown: CancellationToken,
}

impl PublishCoordinator {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        poster: Arc<dyn Poster>,
        notifier: Arc<dyn Notifier>,
        store: Arc<dyn Store>,
        settings: CoordinatorSettings,
        paused: Arc<AtomicBool>,
        shutdown: CancellationToken,
    ) -> Self {
        let dedupe = DedupeStore::new(Arc::clone(&store));
        let scheduler = Scheduler::new(store, settings.poll_interval);
        Self {
            fetcher,
            poster,
            notifier,
            dedupe,
            scheduler,
            settings,
            paused,
            shutdown,
        }
    }

    /// Run cycles until the shutdown token fires. No error is fatal here:
    /// failed cycles are logged and the loop continues at the appropriate
    /// cadence.
    pub async fn run(&self) {
        while !self.shutdown.is_cancelled() {
            if let Err(err) = self.scheduler.wait_until_due(&self.shutdown).await {
                tracing::error!("could not read the cycle marker: {err}");
                sleep_cancellable(&self.shutdown, self.settings.poll_interval).await;
                continue;
            }

            while self.paused.load(Ordering::SeqCst) && !self.shutdown.is_cancelled() {
                tracing::debug!("paused for maintenance");
                sleep_cancellable(&self.shutdown, self.settings.pause_poll).await;
            }
            if self.shutdown.is_cancelled() {
                break;
            }

            match self.run_cycle().await {
                Ok(outcome) => {
                    tracing::info!(
                        fetched = outcome.fetched,
                        surviving = outcome.surviving,
                        published = outcome.published,
                        abandoned = outcome.abandoned,
                        "cycle completed"
                    );
                }
                Err(CycleError::Fetch(err)) => {
                    tracing::warn!(
                        "fetch failed, retrying in {:?}: {err}",
                        self.settings.fetch_retry_cooldown
                    );
                    sleep_cancellable(&self.shutdown, self.settings.fetch_retry_cooldown).await;
                }
                Err(CycleError::Store(err)) => {
                    tracing::warn!(
                        "store unavailable, skipping this cycle: {err}"
                    );
                    sleep_cancellable(&self.shutdown, self.settings.poll_interval).await;
                }
            }
        }
        tracing::info!("coordinator stopped");
    }

    /// One full cycle. The completed-cycle marker records the cycle's start
    /// time and advances whenever the cycle ran to completion, even if some
    /// or all articles were abandoned; only a fetch failure or a store
    /// outage defers it.
    pub async fn run_cycle(&self) -> Result<CycleOutcome, CycleError> {
        let started = Utc::now();
        tracing::info!("checking for new articles");

        let raws = self.fetcher.fetch(&self.settings.search_url).await?;
        let records = self.normalize(raws);
        let fetched = records.len();

        let mut surviving = Vec::new();
        for record in records {
            if !self.dedupe.is_published(record.pmid()).await? {
                surviving.push(record);
            }
        }
        let surviving_count = surviving.len();

        if surviving.is_empty() {
            tracing::info!("nothing new");
            self.notify_admins("Checked for news but found nothing new.")
                .await;
        }

        let mut published = 0;
        let mut abandoned = 0;
        for record in &surviving {
            if self.shutdown.is_cancelled() {
                break;
            }
            if self.publish_article(record).await {
                published += 1;
            } else {
                abandoned += 1;
            }
            if !sleep_cancellable(&self.shutdown, self.settings.article_cooldown).await {
                break;
            }
        }

        self.scheduler.mark_completed(started).await?;

        Ok(CycleOutcome {
            fetched,
            surviving: surviving_count,
            published,
            abandoned,
        })
    }

    /// Normalize raw records and collapse duplicate identifiers within the
    /// fetched set, first occurrence wins.
    fn normalize(&self, raws: Vec<RawArticle>) -> Vec<ArticleRecord> {
        let mut seen = HashSet::new();
        let mut records = Vec::new();
        for raw in raws {
            match ArticleRecord::try_from(raw) {
                Ok(record) => {
                    if seen.insert(record.pmid().to_string()) {
                        records.push(record);
                    }
                }
                Err(err) => tracing::warn!("dropping unusable result: {err}"),
            }
        }
        records
    }

    /// Publish one article with bounded linear-backoff retry, record it, and
    /// fan out notifications. Returns whether the publish succeeded.
    ///
    /// Known risk: if the platform accepts a post but the response is lost,
    /// the next attempt publishes again. The dedupe entry is only written on
    /// a confirmed success.
    async fn publish_article(&self, record: &ArticleRecord) -> bool {
        let surnames = record.surnames();
        let text = compose(
            &self.settings.hashtag,
            record.title(),
            &surnames,
            &record.link(),
            self.settings.max_post_length,
        );

        let mut attempts: u32 = 0;
        loop {
            match self.poster.publish(&text).await {
                Ok(post_id) => {
                    tracing::info!(pmid = record.pmid(), %post_id, "published: {text}");
                    if let Err(err) = self.dedupe.record(record.pmid(), &text, Utc::now()).await {
                        // The post went out but could not be recorded; it may
                        // be announced again on a later cycle.
                        tracing::error!(
                            "failed to record published entry for {}: {err}",
                            record.pmid()
                        );
                    }
                    self.fan_out(record, &text).await;
                    return true;
                }
                Err(err) => {
                    attempts += 1;
                    if attempts >= self.settings.max_publish_attempts {
                        tracing::warn!(
                            "abandoning article {} after {attempts} attempts: {err}",
                            record.pmid()
                        );
                        return false;
                    }
                    let delay = self.settings.backoff_base + Duration::from_secs(u64::from(attempts));
                    tracing::debug!(
                        "publish attempt {attempts} failed, retrying in {:?}: {err}",
                        delay
                    );
                    if !sleep_cancellable(&self.shutdown, delay).await {
                        return false;
                    }
                }
            }
        }
    }

    /// Best-effort delivery to the side channels. Failures are logged and
    /// never retried; the publish already succeeded.
    async fn fan_out(&self, record: &ArticleRecord, text: &str) {
        for recipient in &self.settings.private_recipients {
            if let Err(err) = self
                .notifier
                .send(recipient, text, MessageFormat::Plain, None)
                .await
            {
                tracing::debug!("failed to notify {recipient}: {err}");
            }
        }

        if let Some(channel) = &self.settings.channel {
            let button = LinkButton::new("Read the article", record.link());
            if let Err(err) = self
                .notifier
                .send(
                    channel,
                    &record.channel_text(&self.settings.hashtag),
                    MessageFormat::Html,
                    Some(&button),
                )
                .await
            {
                tracing::debug!("failed to post to channel {channel}: {err}");
            }
        }
    }

    async fn notify_admins(&self, text: &str) {
        for admin in &self.settings.admin_recipients {
            if let Err(err) = self
                .notifier
                .send(admin, text, MessageFormat::Plain, None)
                .await
            {
                tracing::debug!("failed to notify admin {admin}: {err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MockFetcher;
    use crate::models::CYCLE_LABEL;
    use crate::notify::MockNotifier;
    use crate::post::MockPoster;
    use crate::store::MemoryStore;

    fn settings() -> CoordinatorSettings {
        CoordinatorSettings {
            search_url: "http://example.invalid/search".to_string(),
            hashtag: "#tag".to_string(),
            max_post_length: 140,
            poll_interval: Duration::from_secs(3600),
            fetch_retry_cooldown: Duration::ZERO,
            pause_poll: Duration::ZERO,
            article_cooldown: Duration::ZERO,
            max_publish_attempts: 5,
            backoff_base: Duration::ZERO,
            private_recipients: vec!["7".to_string()],
            admin_recipients: vec!["9".to_string()],
            channel: Some("@channel".to_string()),
        }
    }

    struct Harness {
        fetcher: Arc<MockFetcher>,
        poster: Arc<MockPoster>,
        notifier: Arc<MockNotifier>,
        store: Arc<MemoryStore>,
        coordinator: PublishCoordinator,
    }

    fn harness(settings: CoordinatorSettings) -> Harness {
        let fetcher = Arc::new(MockFetcher::new());
        let poster = Arc::new(MockPoster::new());
        let notifier = Arc::new(MockNotifier::new());
        let store = Arc::new(MemoryStore::new());
        let coordinator = PublishCoordinator::new(
            Arc::clone(&fetcher) as Arc<dyn PageFetcher>,
            Arc::clone(&poster) as Arc<dyn Poster>,
            Arc::clone(&notifier) as Arc<dyn Notifier>,
            Arc::clone(&store) as Arc<dyn Store>,
            settings,
            Arc::new(AtomicBool::new(false)),
            CancellationToken::new(),
        );
        Harness {
            fetcher,
            poster,
            notifier,
            store,
            coordinator,
        }
    }

    fn raw(pmid: &str, title: &str) -> RawArticle {
        RawArticle {
            pmid: pmid.to_string(),
            title: title.to_string(),
            authors: "Smith JA, Doe RB".to_string(),
            journal: Some("J Test".to_string()),
        }
    }

    #[tokio::test]
    async fn test_duplicate_identifiers_collapse_to_one() {
        let h = harness(settings());
        h.fetcher
            .push_page(vec![raw("1", "A title"), raw("1", "Same article again")]);

        let outcome = h.coordinator.run_cycle().await.unwrap();
        assert_eq!(outcome.fetched, 1);
        assert_eq!(outcome.surviving, 1);
        assert_eq!(outcome.published, 1);
    }

    #[tokio::test]
    async fn test_second_cycle_sees_nothing_new() {
        let h = harness(settings());
        h.fetcher.push_page(vec![raw("1", "A title")]);
        h.fetcher.push_page(vec![raw("1", "A title")]);

        let first = h.coordinator.run_cycle().await.unwrap();
        assert_eq!(first.published, 1);

        let second = h.coordinator.run_cycle().await.unwrap();
        assert_eq!(second.fetched, 1);
        assert_eq!(second.surviving, 0);
        assert_eq!(second.published, 0);
    }

    #[tokio::test]
    async fn test_retry_then_success_records_exactly_once() {
        let h = harness(settings());
        h.poster.fail_times(2);
        h.fetcher.push_page(vec![raw("1", "A title")]);

        let outcome = h.coordinator.run_cycle().await.unwrap();
        assert_eq!(outcome.published, 1);
        assert_eq!(h.poster.attempts(), 3);

        let entries = h.store.all_published().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].pmid, "1");
        assert_eq!(entries[0].text, h.poster.published()[0]);
    }

    #[tokio::test]
    async fn test_exhausted_retries_leave_article_unrecorded() {
        let mut s = settings();
        s.max_publish_attempts = 3;
        let h = harness(s);
        h.poster.fail_times(10);
        h.fetcher.push_page(vec![raw("1", "A title")]);

        let outcome = h.coordinator.run_cycle().await.unwrap();
        assert_eq!(outcome.published, 0);
        assert_eq!(outcome.abandoned, 1);
        assert_eq!(h.poster.attempts(), 3);
        assert!(h.store.all_published().await.unwrap().is_empty());

        // The marker still advanced: the cycle ran to completion.
        assert!(h.store.last_cycle(CYCLE_LABEL).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_fetch_failure_does_not_advance_marker() {
        let h = harness(settings());
        h.fetcher.push_failure("connection refused");

        let err = h.coordinator.run_cycle().await.unwrap_err();
        assert!(matches!(err, CycleError::Fetch(_)));
        assert!(h.store.last_cycle(CYCLE_LABEL).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_store_outage_aborts_cycle() {
        let h = harness(settings());
        h.fetcher.push_page(vec![raw("1", "A title")]);
        h.store.set_unavailable(true);

        let err = h.coordinator.run_cycle().await.unwrap_err();
        assert!(matches!(err, CycleError::Store(StoreError::Unavailable(_))));
        assert_eq!(h.poster.attempts(), 0);
    }

    #[tokio::test]
    async fn test_empty_pmid_records_are_dropped() {
        let h = harness(settings());
        h.fetcher.push_page(vec![raw("", "No identifier"), raw("2", "Fine")]);

        let outcome = h.coordinator.run_cycle().await.unwrap();
        assert_eq!(outcome.fetched, 1);
        assert_eq!(outcome.published, 1);
    }

    #[tokio::test]
    async fn test_fan_out_reaches_recipients_and_channel() {
        let h = harness(settings());
        h.fetcher.push_page(vec![raw("1", "A title")]);

        h.coordinator.run_cycle().await.unwrap();

        let sent = h.notifier.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].recipient, "7");
        assert_eq!(sent[0].format, MessageFormat::Plain);
        assert_eq!(sent[1].recipient, "@channel");
        assert_eq!(sent[1].format, MessageFormat::Html);
        let button = sent[1].button.as_ref().unwrap();
        assert_eq!(button.url, "pmid.us/1");
    }

    #[tokio::test]
    async fn test_notifier_failures_do_not_block_publish() {
        let h = harness(settings());
        h.notifier.set_failing(true);
        h.fetcher.push_page(vec![raw("1", "A title")]);

        let outcome = h.coordinator.run_cycle().await.unwrap();
        assert_eq!(outcome.published, 1);
        assert_eq!(h.store.all_published().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_cycle_notifies_admins() {
        let h = harness(settings());
        h.fetcher.push_page(Vec::new());

        let outcome = h.coordinator.run_cycle().await.unwrap();
        assert_eq!(outcome.surviving, 0);

        let sent = h.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient, "9");
    }
}

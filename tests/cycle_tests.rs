//! Integration tests for the publish cycle.
//!
//! These drive the coordinator through the public API with mock
//! collaborators and a real file-backed store, covering the behavior that
//! spans modules: crash-safe resume, the watcher loop, pausing, and the
//! legacy backfill feeding dedupe.

use chrono::Utc;
use pubmed_herald::coordinator::{CoordinatorSettings, PublishCoordinator};
use pubmed_herald::fetch::{MockFetcher, PageFetcher};
use pubmed_herald::migrate::backfill_identifiers;
use pubmed_herald::models::{CycleState, PublishedEntry, RawArticle, CYCLE_LABEL};
use pubmed_herald::notify::{MockNotifier, Notifier};
use pubmed_herald::post::{MockPoster, Poster};
use pubmed_herald::store::{JsonFileStore, Store};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn settings() -> CoordinatorSettings {
    CoordinatorSettings {
        search_url: "http://example.invalid/search".to_string(),
        hashtag: "#IgG4RD".to_string(),
        max_post_length: 140,
        poll_interval: Duration::from_secs(3600),
        fetch_retry_cooldown: Duration::ZERO,
        pause_poll: Duration::from_millis(5),
        article_cooldown: Duration::ZERO,
        max_publish_attempts: 5,
        backoff_base: Duration::ZERO,
        private_recipients: vec!["7".to_string()],
        admin_recipients: Vec::new(),
        channel: None,
    }
}

struct Bot {
    fetcher: Arc<MockFetcher>,
    poster: Arc<MockPoster>,
    notifier: Arc<MockNotifier>,
    paused: Arc<AtomicBool>,
    shutdown: CancellationToken,
    coordinator: Arc<PublishCoordinator>,
}

fn bot(store_path: &Path, settings: CoordinatorSettings) -> Bot {
    let fetcher = Arc::new(MockFetcher::new());
    let poster = Arc::new(MockPoster::new());
    let notifier = Arc::new(MockNotifier::new());
    let store = Arc::new(JsonFileStore::open(store_path).unwrap());
    let paused = Arc::new(AtomicBool::new(false));
    let shutdown = CancellationToken::new();
    let coordinator = Arc::new(PublishCoordinator::new(
        Arc::clone(&fetcher) as Arc<dyn PageFetcher>,
        Arc::clone(&poster) as Arc<dyn Poster>,
        Arc::clone(&notifier) as Arc<dyn Notifier>,
        store as Arc<dyn Store>,
        settings,
        Arc::clone(&paused),
        shutdown.clone(),
    ));
    Bot {
        fetcher,
        poster,
        notifier,
        paused,
        shutdown,
        coordinator,
    }
}

fn raw(pmid: &str, title: &str) -> RawArticle {
    RawArticle {
        pmid: pmid.to_string(),
        title: title.to_string(),
        authors: "Katz G, Hernandez-Barco Y, Palumbo D".to_string(),
        journal: Some("Nat Rev Rheumatol".to_string()),
    }
}

#[tokio::test]
async fn test_published_articles_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");

    let first = bot(&path, settings());
    first
        .fetcher
        .push_page(vec![raw("31203986", "IgG4-related disease"), raw("2", "Another")]);
    let outcome = first.coordinator.run_cycle().await.unwrap();
    assert_eq!(outcome.published, 2);
    drop(first);

    // Fresh process, same state file, same page: nothing is re-announced.
    let second = bot(&path, settings());
    second
        .fetcher
        .push_page(vec![raw("31203986", "IgG4-related disease"), raw("2", "Another")]);
    let outcome = second.coordinator.run_cycle().await.unwrap();
    assert_eq!(outcome.fetched, 2);
    assert_eq!(outcome.surviving, 0);
    assert_eq!(second.poster.attempts(), 0);
}

#[tokio::test]
async fn test_every_published_post_fits_the_length_limit() {
    let dir = tempfile::tempdir().unwrap();
    let bot = bot(&dir.path().join("state.json"), settings());

    bot.fetcher.push_page(vec![RawArticle {
        pmid: "31203986".to_string(),
        title: "Long-term outcomes of rituximab maintenance therapy in relapsing \
                IgG4-related disease of the pancreatobiliary tract and retroperitoneum"
            .to_string(),
        authors: "Fernandez-Codina A, Martinez-Valle F, Castro-Marrero J, Detkova D, \
                  Staniszewska A, Kostov B"
            .to_string(),
        journal: Some("J Clin Med".to_string()),
    }]);

    let outcome = bot.coordinator.run_cycle().await.unwrap();
    assert_eq!(outcome.published, 1);

    let text = &bot.poster.published()[0];
    assert!(text.chars().count() <= 140, "too long: {text:?}");
    assert!(text.starts_with("#IgG4RD "));
    assert!(text.ends_with("pmid.us/31203986"));
}

#[tokio::test]
async fn test_watcher_loop_stops_on_cancellation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");

    // Seed a fresh marker so the loop parks in the schedule wait.
    let store = JsonFileStore::open(&path).unwrap();
    store
        .upsert_cycle(CycleState::new(CYCLE_LABEL, Utc::now()))
        .await
        .unwrap();
    drop(store);

    let bot = bot(&path, settings());
    let coordinator = Arc::clone(&bot.coordinator);
    let handle = tokio::spawn(async move { coordinator.run().await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    bot.shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("loop should stop promptly after cancellation")
        .unwrap();
    assert_eq!(bot.poster.attempts(), 0);
}

#[tokio::test]
async fn test_pause_defers_the_cycle_until_released() {
    let dir = tempfile::tempdir().unwrap();
    let bot = bot(&dir.path().join("state.json"), settings());
    bot.fetcher.push_page(vec![raw("1", "A title")]);
    bot.paused.store(true, Ordering::SeqCst);

    let coordinator = Arc::clone(&bot.coordinator);
    let handle = tokio::spawn(async move { coordinator.run().await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(bot.poster.attempts(), 0, "published while paused");

    bot.paused.store(false, Ordering::SeqCst);
    let published = async {
        while bot.poster.published().is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(2), published)
        .await
        .expect("cycle should run after the pause is released");

    bot.shutdown.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_backfilled_legacy_entries_feed_dedupe() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");

    // A text-keyed entry from the legacy lineage, identifier recoverable
    // from the trailing link.
    let store = JsonFileStore::open(&path).unwrap();
    store
        .append_published(PublishedEntry::new(
            "",
            "#IgG4RD Some old announcement. Smith. pmid.us/31203986",
            Utc::now(),
        ))
        .await
        .unwrap();

    let report = backfill_identifiers(&store).await.unwrap();
    assert_eq!(report.updated, 1);
    drop(store);

    let bot = bot(&path, settings());
    bot.fetcher
        .push_page(vec![raw("31203986", "Some old announcement"), raw("2", "New one")]);
    let outcome = bot.coordinator.run_cycle().await.unwrap();
    assert_eq!(outcome.surviving, 1);
    assert_eq!(bot.poster.published().len(), 1);
    assert!(bot.poster.published()[0].ends_with("pmid.us/2"));

    // The private recipient got exactly the new article's text.
    let sent = bot.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].text, bot.poster.published()[0]);
}

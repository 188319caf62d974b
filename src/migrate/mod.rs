//! One-shot backfill of identifiers for legacy published entries.
//!
//! The text-keyed lineage stored only the published text. Since the article
//! link is derived deterministically from the identifier and always ends the
//! post, the identifier can be recovered from a `pmid.us/<digits>` suffix.
//! Entries whose text does not end that way are left untouched and reported,
//! never guessed at.

use regex::Regex;

use crate::store::{Store, StoreError};

/// What the backfill did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BackfillReport {
    /// Entries that gained an identifier
    pub updated: usize,
    /// Legacy entries whose identifier could not be derived
    pub skipped: usize,
    /// Entries that already had an identifier
    pub already_keyed: usize,
}

/// Derive identifiers for entries stored without one.
pub async fn backfill_identifiers(store: &dyn Store) -> Result<BackfillReport, StoreError> {
    let link_suffix =
        Regex::new(r"pmid\.us/(\d+)\s*$").expect("link suffix pattern is valid");

    let mut entries = store.all_published().await?;
    let mut report = BackfillReport::default();

    for entry in &mut entries {
        if !entry.pmid.is_empty() {
            report.already_keyed += 1;
            continue;
        }
        match link_suffix.captures(&entry.text) {
            Some(captures) => {
                entry.pmid = captures[1].to_string();
                tracing::info!("backfilled identifier {} from stored text", entry.pmid);
                report.updated += 1;
            }
            None => {
                tracing::warn!(
                    "cannot derive an identifier for a legacy entry, leaving it text-keyed: {:?}",
                    entry.text
                );
                report.skipped += 1;
            }
        }
    }

    if report.updated > 0 {
        store.rewrite_published(entries).await?;
    }

    Ok(report)
}

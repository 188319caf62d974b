//! Article model representing one entry on the PubMed search-results page.

use serde::{Deserialize, Serialize};

/// A raw article record as scraped from the results page, before
/// normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawArticle {
    /// PMID text as it appears on the page
    pub pmid: String,

    /// Title, possibly carrying sub/superscript markup
    pub title: String,

    /// Author string as rendered, e.g. "Smith JA, Doe RB"
    pub authors: String,

    /// Short journal citation, if present
    pub journal: Option<String>,
}

/// Error returned when a raw record cannot be normalized.
#[derive(Debug, thiserror::Error)]
#[error("article record has an empty identifier")]
pub struct InvalidArticle;

/// A normalized article.
///
/// Two records with the same PMID are the same article regardless of any
/// text differences. Records are built once per poll cycle and discarded
/// afterwards; only the dedupe store remembers them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pmid: String,
    title: String,
    authors: String,
    journal: Option<String>,
}

impl TryFrom<RawArticle> for ArticleRecord {
    type Error = InvalidArticle;

    fn try_from(raw: RawArticle) -> Result<Self, Self::Error> {
        let pmid = raw.pmid.trim().to_string();
        if pmid.is_empty() {
            return Err(InvalidArticle);
        }
        Ok(Self {
            pmid,
            title: strip_script_markup(raw.title.trim()),
            authors: raw.authors.trim().to_string(),
            journal: raw
                .journal
                .map(|j| j.trim().to_string())
                .filter(|j| !j.is_empty()),
        })
    }
}

impl ArticleRecord {
    /// Stable platform-issued identifier. Never empty.
    pub fn pmid(&self) -> &str {
        &self.pmid
    }

    /// Title with sub/superscript markup stripped.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Raw author string as rendered on the page.
    pub fn authors(&self) -> &str {
        &self.authors
    }

    /// Short journal citation, if the page carried one.
    pub fn journal(&self) -> Option<&str> {
        self.journal.as_deref()
    }

    /// Link to the article, derived deterministically from the PMID.
    pub fn link(&self) -> String {
        format!("pmid.us/{}", self.pmid)
    }

    /// Author surnames, first author first.
    ///
    /// The rendered author string is "Surname AB, Surname2 CD, ..." with an
    /// et-al style trailing entry; all-uppercase tokens are initials and are
    /// dropped, and the last surname is moved to the front to undo the
    /// listing convention.
    pub fn surnames(&self) -> Vec<String> {
        extract_surnames(&self.authors)
    }

    /// Rich HTML message for the public channel.
    pub fn channel_text(&self, hashtag: &str) -> String {
        format!(
            "{}\n<b>{}</b>\n<i>{}</i>\n{}",
            hashtag,
            self.title,
            self.authors,
            self.journal.as_deref().unwrap_or_default()
        )
    }
}

/// Remove `<sub>`/`<sup>` markup, which the results page leaves inline in
/// titles.
pub fn strip_script_markup(title: &str) -> String {
    let mut title = title.to_string();
    for tag in ["<sub>", "</sub>", "<sup>", "</sup>"] {
        title = title.replace(tag, "");
    }
    title
}

fn extract_surnames(raw: &str) -> Vec<String> {
    let cleaned = raw.replace(',', "");
    let mut surnames: Vec<String> = cleaned
        .split_whitespace()
        .filter(|token| *token != token.to_uppercase())
        .map(str::to_string)
        .collect();
    if let Some(last) = surnames.pop() {
        surnames.insert(0, last);
    }
    surnames
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pmid: &str, title: &str, authors: &str) -> RawArticle {
        RawArticle {
            pmid: pmid.to_string(),
            title: title.to_string(),
            authors: authors.to_string(),
            journal: Some("J Test Med".to_string()),
        }
    }

    #[test]
    fn test_normalize_strips_markup() {
        let record =
            ArticleRecord::try_from(raw("123", "IgG<sub>4</sub>-related disease", "Smith JA"))
                .unwrap();
        assert_eq!(record.title(), "IgG4-related disease");
    }

    #[test]
    fn test_empty_pmid_rejected() {
        assert!(ArticleRecord::try_from(raw("  ", "Title", "Smith JA")).is_err());
    }

    #[test]
    fn test_link_derived_from_pmid() {
        let record = ArticleRecord::try_from(raw("31415926", "Title", "Smith JA")).unwrap();
        assert_eq!(record.link(), "pmid.us/31415926");
    }

    #[test]
    fn test_surname_extraction_moves_last_author_to_front() {
        let record = ArticleRecord::try_from(raw("1", "Title", "Smith JA, Doe RB")).unwrap();
        assert_eq!(record.surnames(), vec!["Doe", "Smith"]);
    }

    #[test]
    fn test_surname_extraction_empty_authors() {
        let record = ArticleRecord::try_from(raw("1", "Title", "")).unwrap();
        assert!(record.surnames().is_empty());
    }

    #[test]
    fn test_surname_extraction_drops_initials_only() {
        let record = ArticleRecord::try_from(raw("1", "Title", "Rossi GM, Vaglio A")).unwrap();
        assert_eq!(record.surnames(), vec!["Vaglio", "Rossi"]);
    }

    #[test]
    fn test_channel_text_carries_journal() {
        let record = ArticleRecord::try_from(raw("1", "A title", "Smith JA")).unwrap();
        let text = record.channel_text("#IgG4RD");
        assert!(text.starts_with("#IgG4RD\n"));
        assert!(text.contains("<b>A title</b>"));
        assert!(text.contains("<i>Smith JA</i>"));
        assert!(text.ends_with("J Test Med"));
    }

    #[test]
    fn test_missing_journal_normalizes_to_none() {
        let record = ArticleRecord::try_from(RawArticle {
            pmid: "1".to_string(),
            title: "Title".to_string(),
            authors: "Smith JA".to_string(),
            journal: Some("   ".to_string()),
        })
        .unwrap();
        assert!(record.journal().is_none());
    }
}

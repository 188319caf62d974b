//! Message composition: pack a title and author list into a fixed-length
//! post budget.
//!
//! The composer is a pure function. It seeds the post with title words until
//! a minimum title length is reached, then alternates between remaining
//! title words and author surnames until the length budget is exhausted.
//! Truncation markers (`[...]` for the title, `&al.` for authors) appear
//! exactly when words or authors were dropped.

/// Extra characters the platform counts against a link beyond its visible
/// text: an assumed protocol prefix plus a trailing space.
pub const LINK_COUNT_OVERHEAD: usize = "http:// ".len();

/// Minimum assembled title length before authors start competing for space.
pub const TITLE_SEED_LEN: usize = 50;

/// Compose a post from an article's parts.
///
/// The output always contains the hashtag, a prefix of title words in their
/// original order, a prefix of author surnames, and the link. The budget may
/// be negative when the hashtag or link is unusually long; composition still
/// proceeds and the caller decides whether to truncate.
pub fn compose(
    hash_tag: &str,
    title: &str,
    authors: &[String],
    link: &str,
    max_length: usize,
) -> String {
    let budget = max_length as i64
        - (text_len(hash_tag) as i64 + 1)
        - (text_len(link) as i64 + LINK_COUNT_OVERHEAD as i64);

    // Stacks popped front-first: last element of the reversed vec is the
    // first word of the title / the first author.
    let mut words: Vec<&str> = title.split_whitespace().rev().collect();
    let mut remaining_authors: Vec<&str> = authors.iter().map(String::as_str).rev().collect();
    let mut kept_words: Vec<&str> = Vec::new();
    let mut kept_authors: Vec<&str> = Vec::new();

    // Title seeding phase: keep taking words while the assembled candidate
    // is still below the minimum title length.
    while text_len(&seed_candidate(hash_tag, &kept_words, !words.is_empty())) < TITLE_SEED_LEN {
        match words.pop() {
            Some(word) => kept_words.push(word),
            None => break,
        }
    }

    // Alternating fill phase, starting with a title word. The alternation
    // advances even when one side is exhausted so the other keeps filling.
    let mut candidate = full_candidate(hash_tag, &kept_words, &words, &kept_authors, &remaining_authors, link);
    let mut take_title = true;
    while (text_len(&candidate) as i64) < budget
        && !(words.is_empty() && remaining_authors.is_empty())
    {
        if take_title {
            if let Some(word) = words.pop() {
                kept_words.push(word);
            }
        } else if let Some(author) = remaining_authors.pop() {
            kept_authors.push(author);
        }
        take_title = !take_title;
        candidate = full_candidate(hash_tag, &kept_words, &words, &kept_authors, &remaining_authors, link);
    }

    candidate
}

/// Candidate string during the title seeding phase.
fn seed_candidate(hash_tag: &str, kept_words: &[&str], more_words: bool) -> String {
    format!(
        "{} {}{}",
        hash_tag,
        kept_words.join(" "),
        if more_words { " [...]. " } else { " " }
    )
}

/// Full candidate string with authors and link attached.
fn full_candidate(
    hash_tag: &str,
    kept_words: &[&str],
    words: &[&str],
    kept_authors: &[&str],
    remaining_authors: &[&str],
    link: &str,
) -> String {
    format!(
        "{} {}{}{}{}{}",
        hash_tag,
        kept_words.join(" "),
        if words.is_empty() { " " } else { " [...]. " },
        kept_authors.join(", "),
        if remaining_authors.is_empty() {
            ". "
        } else {
            " &al. "
        },
        link
    )
}

/// Length counted the way the platform counts it: in characters, not bytes.
fn text_len(s: &str) -> usize {
    s.chars().count()
}

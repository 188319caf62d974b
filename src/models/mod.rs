//! Core data models: articles and persisted record kinds.

mod article;
mod records;

pub use article::{strip_script_markup, ArticleRecord, InvalidArticle, RawArticle};
pub use records::{CycleState, PublishedEntry, CYCLE_LABEL};

//! Comma-separated tag filter resolution.
//!
//! # Invariants
//! - Segments are trimmed; empty segments are ignored.
//! - Names match tags exactly (case-sensitive); unmatched names are dropped.
//! - A filter with no usable names, or whose names match no tag, resolves
//!   to `None` (no predicate), never to an empty set.
//! - Associations count regardless of their `saved` flag.

use crate::model::article::ArticleId;
use crate::model::tag::TagId;
use crate::repo::tag_repo::SqliteTagRepository;
use crate::repo::RepoResult;
use log::debug;
use rusqlite::Connection;
use std::collections::BTreeSet;

/// Store reads needed to resolve a tag filter.
pub trait TagQuerySource {
    /// Ids of tags whose name exactly equals one of `names`.
    fn tag_ids_by_names(&self, names: &[String]) -> RepoResult<Vec<TagId>>;
    /// Distinct article ids associated with any of `tag_ids`.
    fn article_ids_for_tags(&self, tag_ids: &[TagId]) -> RepoResult<BTreeSet<ArticleId>>;
}

/// Splits a raw filter into distinct tag names, preserving first occurrence.
pub fn parse_tag_filter(raw: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    raw.split(',')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .filter(|segment| seen.insert(*segment))
        .map(str::to_string)
        .collect()
}

/// Resolves a raw tag filter to the set of matching article ids.
///
/// Returns `None` when the filter must not constrain the listing.
pub fn resolve_tag_filter<S: TagQuerySource>(
    source: &S,
    raw: &str,
) -> RepoResult<Option<BTreeSet<ArticleId>>> {
    let names = parse_tag_filter(raw);
    if names.is_empty() {
        return Ok(None);
    }

    let tag_ids = source.tag_ids_by_names(&names)?;
    if tag_ids.is_empty() {
        debug!(
            "event=tag_filter_resolve module=search status=ok names={} matched_tags=0",
            names.len()
        );
        return Ok(None);
    }

    let article_ids = source.article_ids_for_tags(&tag_ids)?;
    debug!(
        "event=tag_filter_resolve module=search status=ok names={} matched_tags={} articles={}",
        names.len(),
        tag_ids.len(),
        article_ids.len()
    );
    Ok(Some(article_ids))
}

/// Convenience wrapper resolving a filter directly against a connection.
pub fn resolve_tag_filter_to_article_ids(
    conn: &Connection,
    raw: &str,
) -> RepoResult<Option<BTreeSet<ArticleId>>> {
    let source = SqliteTagRepository::try_new(conn)?;
    resolve_tag_filter(&source, raw)
}

//! Source reconciliation between parsed markers and grounding metadata.

use std::collections::HashSet;

use crate::types::Source;

/// Merge parsed sources with metadata sources.
///
/// Parsed entries come first, in order. Metadata entries follow when their
/// URL is not yet present. Entries without a URL are dropped and titles are
/// never merged: the first occurrence of a URL wins as-is.
pub fn reconcile(parsed: &[Source], metadata: &[Source]) -> Vec<Source> {
    let mut seen: HashSet<&str> = HashSet::new();

    parsed
        .iter()
        .chain(metadata)
        .filter(|source| {
            let url = source.url.trim();
            !url.is_empty() && seen.insert(url)
        })
        .cloned()
        .collect()
}

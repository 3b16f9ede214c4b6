//! Search grounding metadata reader.
//!
//! Grounding metadata arrives in several shapes depending on the provider and
//! the SDK that produced it. Each recognised shape may also be nested under a
//! `google` key:
//!
//! - `groundingMetadata.groundingChunks[].web { uri, title }`
//! - `groundingMetadata.sources[] { uri, title }`
//! - `groundingMetadata.webSearchQueries[]`
//! - `sources[] { url, title }`
//! - `safetyRatings[]`
//!
//! Anything else is ignored. Reading never fails.

use serde_json::Value;

use crate::types::{Source, json_string, json_string_array};

/// What the workflow keeps from a grounded response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchMetadata {
    pub sources: Vec<Source>,
    pub search_queries: Vec<String>,
    pub safety_ratings: Vec<Value>,
}

impl SearchMetadata {
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty() && self.search_queries.is_empty() && self.safety_ratings.is_empty()
    }
}

/// Extract sources, queries and safety ratings from provider metadata.
///
/// Sources are returned in discovery order and may contain duplicates; the
/// reconciler deduplicates them.
pub fn extract_search_metadata(metadata: Option<&Value>) -> SearchMetadata {
    let mut result = SearchMetadata::default();
    let Some(root) = metadata.filter(|value| value.is_object()) else {
        return result;
    };

    for scope in [Some(root), root.get("google")].into_iter().flatten() {
        read_scope(scope, &mut result);
    }

    result
}

fn read_scope(scope: &Value, out: &mut SearchMetadata) {
    if let Some(grounding) = scope.get("groundingMetadata") {
        for chunk in array(grounding, "groundingChunks") {
            if let Some(source) = chunk.get("web").and_then(|web| source_from(web, "uri")) {
                out.sources.push(source);
            }
        }
        for entry in array(grounding, "sources") {
            if let Some(source) = source_from(entry, "uri") {
                out.sources.push(source);
            }
        }
        out.search_queries.extend(
            json_string_array(grounding, "webSearchQueries")
                .into_iter()
                .map(|query| query.trim().to_string())
                .filter(|query| !query.is_empty()),
        );
    }

    for entry in array(scope, "sources") {
        if let Some(source) = source_from(entry, "url") {
            out.sources.push(source);
        }
    }

    out.safety_ratings
        .extend(array(scope, "safetyRatings").iter().cloned());
}

fn array<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn source_from(entry: &Value, url_key: &str) -> Option<Source> {
    let url = json_string(entry, url_key)?;
    let url = url.trim();
    if url.is_empty() {
        return None;
    }
    let title = json_string(entry, "title")
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty());
    Some(Source {
        title,
        url: url.to_string(),
    })
}

//! Research Output Parser
//!
//! Extracts learnings and sources from the marker-prefixed text returned by
//! the research step:
//!
//! ```text
//! SOURCE_TITLE: Edutopia - Collaborative Learning
//! SOURCE_URL: https://www.edutopia.org/collaborative-learning
//! LEARNING: Collaborative learning helps students develop ...
//! ```
//!
//! A title only ever pairs with the URL that follows it, so parsing is a
//! single fold over lines carrying the pending title.

use std::collections::HashSet;

use crate::constants::markers;
use crate::types::Source;

/// Learnings and sources found in one research response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedResearch {
    pub learnings: Vec<String>,
    pub sources: Vec<Source>,
}

#[derive(Default)]
struct ParseState<'a> {
    parsed: ParsedResearch,
    pending_title: Option<&'a str>,
    seen_urls: HashSet<&'a str>,
}

impl<'a> ParseState<'a> {
    fn consume(mut self, line: &'a str) -> Self {
        let line = line.trim();

        if let Some(rest) = line.strip_prefix(markers::LEARNING) {
            let learning = rest.trim();
            if !learning.is_empty() {
                self.parsed.learnings.push(learning.to_string());
            }
        } else if let Some(rest) = line.strip_prefix(markers::SOURCE_TITLE) {
            self.pending_title = Some(rest.trim());
        } else if let Some(rest) = line.strip_prefix(markers::SOURCE_URL) {
            let url = rest.trim();
            if url.is_empty() {
                return self;
            }
            let title = self.pending_title.take();
            if self.seen_urls.insert(url) {
                self.parsed.sources.push(Source {
                    title: title.map(str::to_string),
                    url: url.to_string(),
                });
            }
        }

        self
    }
}

/// Parse `LEARNING:` / `SOURCE_TITLE:` / `SOURCE_URL:` lines.
///
/// Duplicate URLs keep their first occurrence. A non-empty `SOURCE_URL:` line
/// clears the pending title even when the URL is a duplicate; a blank one is
/// skipped and leaves the title for the next URL.
pub fn parse_learnings_and_sources(text: &str) -> ParsedResearch {
    text.lines()
        .fold(ParseState::default(), ParseState::consume)
        .parsed
}

/// Treat every substantial non-source line as a learning.
///
/// Used when the model ignored the `LEARNING:` marker.
pub fn fallback_learnings(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| {
            line.chars().count() > markers::FALLBACK_MIN_CHARS
                && !line.starts_with(markers::SOURCE_FAMILY)
        })
        .map(str::to_string)
        .collect()
}

/// Marker learnings, or the fallback when there are none.
///
/// Returns an empty list only if both paths found nothing.
pub fn extract_learnings(text: &str, parsed: &ParsedResearch) -> Vec<String> {
    if !parsed.learnings.is_empty() {
        return parsed.learnings.clone();
    }

    tracing::warn!("No 'LEARNING:' prefixes found, using raw lines fallback");
    fallback_learnings(text)
}

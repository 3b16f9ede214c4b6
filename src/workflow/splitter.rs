//! Title/body splitting for generated Markdown documents.

use crate::constants::markers;

/// A generated document split into its heading and body.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SplitDocument {
    pub title: String,
    pub body: String,
}

/// Split the first `# ` heading off a document.
///
/// Lines before the heading are discarded with it. Without a heading the
/// whole document becomes the body and `fallback_title` is used.
pub fn split_title(document: &str, fallback_title: &str) -> SplitDocument {
    let lines: Vec<&str> = document.lines().collect();

    let heading = lines
        .iter()
        .position(|line| line.trim().starts_with(markers::HEADING));

    match heading {
        Some(index) => {
            let title = lines[index]
                .trim()
                .strip_prefix(markers::HEADING)
                .unwrap_or_default()
                .trim()
                .to_string();
            let body = lines[index + 1..].join("\n").trim().to_string();
            SplitDocument { title, body }
        }
        None => SplitDocument {
            title: fallback_title.to_string(),
            body: document.trim().to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_split_heading() {
        let doc = split_title("# Hello\nBody1\nBody2", "fallback");
        assert_eq!(doc.title, "Hello");
        assert_eq!(doc.body, "Body1\nBody2");
    }

    #[test]
    fn test_only_one_heading_marker_stripped() {
        let doc = split_title("# # Hashtag Title\nbody", "fallback");
        assert_eq!(doc.title, "# Hashtag Title");
        assert_eq!(doc.body, "body");
    }

    #[test]
    fn test_no_heading_uses_fallback() {
        let doc = split_title("\n  Just text\n## Sub heading\n", "Original topic");
        assert_eq!(doc.title, "Original topic");
        assert_eq!(doc.body, "Just text\n## Sub heading");
    }

    #[test]
    fn test_indented_heading_and_preamble() {
        let doc = split_title("Preamble\n   #   Spaced Title  \n\nFirst paragraph\n", "x");
        assert_eq!(doc.title, "Spaced Title");
        assert_eq!(doc.body, "First paragraph");
    }

    #[test]
    fn test_only_first_heading_is_title() {
        let doc = split_title("# One\ntext\n# Two\nmore", "x");
        assert_eq!(doc.title, "One");
        assert_eq!(doc.body, "text\n# Two\nmore");
    }

    #[test]
    fn test_hash_without_space_is_not_heading() {
        let doc = split_title("#NoSpace\nbody", "fallback");
        assert_eq!(doc.title, "fallback");
        assert_eq!(doc.body, "#NoSpace\nbody");
    }

    #[test]
    fn test_heading_only() {
        let doc = split_title("# Lonely", "x");
        assert_eq!(doc.title, "Lonely");
        assert_eq!(doc.body, "");
    }

    proptest! {
        #[test]
        fn prop_body_lines_preserved(
            title in "[A-Za-z][A-Za-z ]{0,20}[A-Za-z]",
            body_lines in prop::collection::vec("[a-z][a-z ]{0,30}[a-z.]", 1..10),
        ) {
            let document = format!("# {}\n{}", title, body_lines.join("\n"));
            let doc = split_title(&document, "fallback");
            prop_assert_eq!(doc.title, title);
            prop_assert_eq!(doc.body, body_lines.join("\n"));
        }

        #[test]
        fn prop_no_heading_body_is_trimmed_input(text in "[a-z \n]{0,80}") {
            let doc = split_title(&text, "fallback");
            prop_assert_eq!(doc.title, "fallback");
            prop_assert_eq!(doc.body, text.trim());
        }
    }
}

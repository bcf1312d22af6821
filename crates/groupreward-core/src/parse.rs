//! Member list document parsing.
//!
//! The directory answers with an XML document. The parser does not rely on
//! the exact document shape: every `steamID64` element that sits anywhere
//! below a `members` element counts as a candidate entry. Each candidate is
//! validated on its own and skipped when invalid, so one bad entry never
//! discards the batch. A document that is not well-formed XML is rejected
//! as a whole and yields no identities.

use std::collections::HashSet;

use groupreward_types::SteamId64;
use roxmltree::{Document, Node};
use tracing::trace;

/// Element name of the members collection.
const MEMBERS_TAG: &str = "members";

/// Element name of a single member identifier.
const MEMBER_ID_TAG: &str = "steamID64";

/// Element carrying the group's total member count.
const MEMBER_COUNT_TAG: &str = "memberCount";

/// Element present when the document is one page of a longer list.
const NEXT_PAGE_TAG: &str = "nextPageLink";

/// The document could not be parsed at all.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The body is not well-formed XML.
    #[error("malformed member list document: {0}")]
    MalformedDocument(String),
}

/// Result of parsing one member list document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDirectory {
    /// Valid member identities, deduplicated.
    pub members: HashSet<SteamId64>,
    /// Number of candidate entries that failed validation.
    pub skipped: usize,
    /// Total member count as reported by the document, when present.
    pub reported_count: Option<u64>,
    /// Whether the document links to a further page that is not followed.
    pub has_more_pages: bool,
}

/// Parse a raw member list document.
///
/// # Errors
///
/// Returns [`ParseError::MalformedDocument`] if `raw` is not well-formed XML.
pub fn parse_member_list(raw: &str) -> Result<ParsedDirectory, ParseError> {
    let doc = Document::parse(raw).map_err(|e| ParseError::MalformedDocument(format!("{e}")))?;

    let mut parsed = ParsedDirectory::default();

    for node in doc.descendants().filter(Node::is_element) {
        match node.tag_name().name() {
            MEMBER_ID_TAG if has_members_ancestor(node) => {
                let text = element_text(node);
                match text.parse::<SteamId64>() {
                    Ok(id) => {
                        parsed.members.insert(id);
                    }
                    Err(e) => {
                        trace!(entry = %text.trim(), error = %e, "skipping invalid member entry");
                        parsed.skipped = parsed.skipped.saturating_add(1);
                    }
                }
            }
            MEMBER_COUNT_TAG if parsed.reported_count.is_none() => {
                parsed.reported_count = element_text(node).trim().parse().ok();
            }
            NEXT_PAGE_TAG => {
                parsed.has_more_pages = !element_text(node).trim().is_empty();
            }
            _ => {}
        }
    }

    Ok(parsed)
}

/// Whether any strict ancestor of `node` is a `members` element.
fn has_members_ancestor(node: Node<'_, '_>) -> bool {
    node.ancestors()
        .skip(1)
        .any(|a| a.is_element() && a.tag_name().name() == MEMBERS_TAG)
}

/// Concatenated text content of an element, including CDATA sections.
fn element_text(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(Node::is_text)
        .filter_map(|n| n.text())
        .collect()
}

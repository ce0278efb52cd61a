//! Statutory unit representation
//!
//! A corpus is a set of laws, each a containment tree of units:
//! chapters and sections organize articles, articles contain paragraphs,
//! paragraphs may contain items and sub-items. Paragraphs are the atomic
//! retrievable unit; everything else is structure.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Unique identifier for a statutory unit
///
/// Serializes as a plain string. For paragraphs the parser guarantees the
/// stable form `<law>::<article>::<paragraph-marker>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(String);

impl UnitId {
    /// Create a UnitId from a string
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The last `::`-separated segment of the id, if the id is segmented.
    ///
    /// For paragraph ids of the stable form this is the paragraph marker.
    pub fn last_segment(&self) -> Option<&str> {
        if self.0.contains("::") {
            self.0.rsplit("::").next()
        } else {
            None
        }
    }
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UnitId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UnitId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Kind of a statutory unit, ordered by containment depth.
///
/// Matches the parser contract: lowercase snake string enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// A whole statute, enforcement decree, or enforcement rule
    Law,
    /// Organizational subdivision ("장")
    Chapter,
    /// Organizational subdivision ("절")
    Section,
    /// Numbered article ("조"); carries a title, typically no free text
    Article,
    /// The atomic retrievable unit ("항"); carries statutory text
    Paragraph,
    /// Subdivision under a paragraph ("호")
    Item,
    /// Subdivision under an item ("목")
    SubItem,
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "law" => Ok(NodeKind::Law),
            "chapter" => Ok(NodeKind::Chapter),
            "section" => Ok(NodeKind::Section),
            "article" => Ok(NodeKind::Article),
            "paragraph" => Ok(NodeKind::Paragraph),
            "item" => Ok(NodeKind::Item),
            "sub_item" => Ok(NodeKind::SubItem),
            _ => Err(format!("Unknown unit kind: {}", s)),
        }
    }
}

impl NodeKind {
    /// The lowercase snake name used on the wire and in storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Law => "law",
            NodeKind::Chapter => "chapter",
            NodeKind::Section => "section",
            NodeKind::Article => "article",
            NodeKind::Paragraph => "paragraph",
            NodeKind::Item => "item",
            NodeKind::SubItem => "sub_item",
        }
    }
}

/// One parsed statutory unit — the sole input contract with the parser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    /// Kind of unit
    pub kind: NodeKind,
    /// Stable, globally unique identifier
    pub full_id: UnitId,
    /// Containing unit, or `None` for top-level units of the law
    pub parent_full_id: Option<UnitId>,
    /// Order within the parent
    pub order: i64,
    /// Heading text, where the unit carries one
    pub title: Option<String>,
    /// Statutory text; required iff `kind == Paragraph`
    pub content: Option<String>,
}

impl Unit {
    /// Create a unit with the given kind and id; remaining fields via builders.
    pub fn new(kind: NodeKind, full_id: impl Into<UnitId>) -> Self {
        Self {
            kind,
            full_id: full_id.into(),
            parent_full_id: None,
            order: 0,
            title: None,
            content: None,
        }
    }

    /// Set the containing unit
    pub fn with_parent(mut self, parent: impl Into<UnitId>) -> Self {
        self.parent_full_id = Some(parent.into());
        self
    }

    /// Set the order within the parent
    pub fn with_order(mut self, order: i64) -> Self {
        self.order = order;
        self
    }

    /// Set the heading text
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the statutory text
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }
}

/// A parsed document: one law and its unit tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Name of the law this document belongs to
    pub law_name: String,
    /// All units of the document, parents before children not required
    pub units: Vec<Unit>,
}

impl Document {
    pub fn new(law_name: impl Into<String>, units: Vec<Unit>) -> Self {
        Self {
            law_name: law_name.into(),
            units,
        }
    }
}

/// Resolved description of a retrievable paragraph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParagraphInfo {
    /// Stable id of the paragraph
    pub full_id: UnitId,
    /// Name of the containing law
    pub law: String,
    /// Containing article (title when present, id otherwise)
    pub article: String,
    /// The paragraph's own marker within the article
    pub paragraph_marker: String,
    /// Statutory text
    pub content: String,
}

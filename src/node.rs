//! Node data model.
//!
//! Nodes live in an arena owned by [`Document`](crate::Document) and are
//! addressed by [`NodeId`] handles. The parent owns the ordered child list;
//! parent/sibling back-references are plain ids, so there is no shared
//! ownership and no cycle. Strings scanned from the source buffer stay
//! unmaterialized ([`RawText::Slice`]) until something needs an owned copy.

use crate::attribute::Attribute;
use crate::position::Span;
use crate::tokenizer::MarkupKind;
use std::cell::OnceCell;

/// Stable handle to a node in a document's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeType {
    Document,
    Element,
    Text,
    Comment,
}

pub(crate) const NAME_DOCUMENT: &str = "#document";
pub(crate) const NAME_TEXT: &str = "#text";
pub(crate) const NAME_COMMENT: &str = "#comment";

/// Text that may still live, unmaterialized, in the source buffer.
///
/// `Slice` carries only the byte range; `Owned` is either a materialized
/// copy or synthetic content that never had a source position.
#[derive(Clone, Debug)]
pub(crate) enum RawText {
    Slice(Span),
    Owned(String),
}

impl RawText {
    pub(crate) fn empty() -> Self {
        RawText::Owned(String::new())
    }

    pub(crate) fn get<'a>(&'a self, source: &'a str) -> &'a str {
        match self {
            RawText::Slice(span) => span.slice(source),
            RawText::Owned(s) => s.as_str(),
        }
    }

    pub(crate) fn span(&self) -> Option<Span> {
        match self {
            RawText::Slice(span) => Some(*span),
            RawText::Owned(_) => None,
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct NodeData {
    pub(crate) kind: NodeType,
    /// Element/end-tag name as scanned; unused for other kinds.
    pub(crate) name: RawText,
    /// Memoized lowercase form of `name`, filled on first read when the
    /// scanned name carries uppercase bytes.
    pub(crate) lower_name: OnceCell<String>,
    /// Text content, or the body of a comment-like node.
    pub(crate) content: RawText,
    pub(crate) markup: MarkupKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) prev: Option<NodeId>,
    pub(crate) next: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) attributes: Vec<Attribute>,
    /// The node covering this element's closing-tag region; the node's own
    /// id for void/self-closing/text/comment nodes; `None` while open.
    pub(crate) end_node: Option<NodeId>,
    pub(crate) outer_start: usize,
    pub(crate) outer_len: usize,
    pub(crate) inner_start: usize,
    pub(crate) inner_len: usize,
    pub(crate) line: u32,
    pub(crate) column: u32,
    pub(crate) stream_position: usize,
    pub(crate) depth: usize,
    /// Cached rendered markup is stale; set by mutations, propagated to all
    /// ancestors, cleared by the next render.
    pub(crate) dirty: bool,
    pub(crate) came_from_parse: bool,
    /// Closed without an explicit end tag in the source; rendering writes
    /// no closing tag (HTML mode).
    pub(crate) implicit_end: bool,
    pub(crate) cached_outer: Option<String>,
}

impl NodeData {
    pub(crate) fn new(kind: NodeType) -> Self {
        Self {
            kind,
            name: RawText::empty(),
            lower_name: OnceCell::new(),
            content: RawText::empty(),
            markup: MarkupKind::Comment,
            parent: None,
            prev: None,
            next: None,
            children: Vec::new(),
            attributes: Vec::new(),
            end_node: None,
            outer_start: 0,
            outer_len: 0,
            inner_start: 0,
            inner_len: 0,
            line: 0,
            column: 0,
            stream_position: 0,
            depth: 0,
            dirty: false,
            came_from_parse: false,
            implicit_end: false,
            cached_outer: None,
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.end_node.is_some()
    }

    /// Lowercase name, memoized only when the scanned form needs folding.
    pub(crate) fn resolved_name<'a>(&'a self, source: &'a str) -> &'a str {
        let raw = self.name.get(source);
        if raw.bytes().any(|b| b.is_ascii_uppercase()) {
            self.lower_name
                .get_or_init(|| raw.to_ascii_lowercase())
                .as_str()
        } else {
            raw
        }
    }
}

//! Tolerant HTML parser and mutable document model.
//!
//! Arbitrary, often malformed, HTML goes in; a navigable, editable tree
//! comes out, and the tree serializes back to HTML or XML with controllable
//! fidelity (original casing, quote styles, entity encoding). Unclosed and
//! implicitly-closed tags, raw-text elements, bare attributes and stray
//! angle brackets are all recovered browser-style; the only fatal parse
//! condition is nesting past the configured depth bound.
//!
//! Parsed nodes keep byte positions into the source buffer and defer
//! materializing strings until something reads them; mutations mark the
//! affected ancestor chain dirty so markup reads re-render exactly what
//! changed.
//!
//! ```
//! let mut doc = htmldom::parse("<div><p>a<p>b</div>").unwrap();
//! let root = doc.root();
//! let div = doc.children(root)[0];
//! assert_eq!(doc.children(div).len(), 2, "p closes implicitly");
//! assert_eq!(doc.inner_text(div), "ab");
//! doc.set_attribute_value(div, "id", "main").unwrap();
//! assert_eq!(doc.element_by_id("main").unwrap(), Some(div));
//! ```

mod attribute;
mod config;
mod document;
mod element_table;
mod entities;
mod error;
mod node;
mod position;
mod serializer;
mod tokenizer;
mod traverse;
mod tree_builder;

pub use crate::attribute::Attribute;
pub use crate::config::{OutputCase, ParseOptions, QuoteStyle, UnmatchedEndTagPolicy};
pub use crate::document::Document;
pub use crate::element_table::{ElementFlags, element_flags, is_raw_text_element, is_void_element};
pub use crate::error::HtmlError;
pub use crate::node::{NodeId, NodeType};
pub use crate::position::{Span, TextPos};
pub use crate::serializer::resolve_quote;
pub use crate::tokenizer::{Event, MarkupKind, Tokenizer};
pub use crate::traverse::{Ancestors, Descendants};

/// Parse with default options.
pub fn parse(text: impl Into<String>) -> Result<Document, HtmlError> {
    Document::parse(text, ParseOptions::default())
}

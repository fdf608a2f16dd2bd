//! Attribute model.
//!
//! An attribute keeps its name in the original casing and its value raw
//! (undecoded, unmaterialized) as scanned; the lowercase name and the
//! entity-decoded value are memoized on first read. Enough parse detail is
//! recorded (`had_equals_sign`, detected quote style) to reproduce exactly
//! whether `name` or `name=""` was written.

use crate::config::QuoteStyle;
use crate::document::Document;
use crate::entities::decode_entities;
use crate::node::RawText;
use crate::position::{Span, TextPos};
use std::cell::OnceCell;

#[derive(Clone, Debug)]
pub struct Attribute {
    pub(crate) name: RawText,
    pub(crate) lower_name: OnceCell<String>,
    /// `None` iff the attribute was written without `=` (bare `readonly`).
    pub(crate) value: Option<RawText>,
    pub(crate) decoded: OnceCell<String>,
    /// Explicit serialization style; `AsParsed` defers to the detected
    /// style, via the document-wide override. See
    /// [`resolve_quote`](crate::resolve_quote).
    pub quote_style: QuoteStyle,
    pub(crate) detected_quote: QuoteStyle,
    pub(crate) came_from_parse: bool,
    pub(crate) had_equals: bool,
    pub(crate) line: u32,
    pub(crate) column: u32,
    pub(crate) stream_position: usize,
}

impl Attribute {
    /// A synthetic attribute with no source position.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: RawText::Owned(name.into()),
            lower_name: OnceCell::new(),
            value: Some(RawText::Owned(value.into())),
            decoded: OnceCell::new(),
            quote_style: QuoteStyle::AsParsed,
            detected_quote: QuoteStyle::Double,
            came_from_parse: false,
            had_equals: true,
            line: 0,
            column: 0,
            stream_position: 0,
        }
    }

    pub(crate) fn from_parse(
        name: Span,
        value: Option<Span>,
        quote: QuoteStyle,
        had_equals: bool,
        pos: TextPos,
    ) -> Self {
        Self {
            name: RawText::Slice(name),
            lower_name: OnceCell::new(),
            value: value.map(RawText::Slice),
            decoded: OnceCell::new(),
            quote_style: QuoteStyle::AsParsed,
            detected_quote: quote,
            came_from_parse: true,
            had_equals,
            line: pos.line,
            column: pos.column,
            stream_position: name.start,
        }
    }

    /// Deep copy with every lazy field materialized from `source`, for
    /// moving the attribute into another document.
    pub(crate) fn materialized(&self, source: &str) -> Self {
        Self {
            name: RawText::Owned(self.name.get(source).to_string()),
            lower_name: OnceCell::new(),
            value: self
                .value
                .as_ref()
                .map(|v| RawText::Owned(v.get(source).to_string())),
            decoded: OnceCell::new(),
            quote_style: self.quote_style,
            detected_quote: self.detected_quote,
            came_from_parse: false,
            had_equals: self.had_equals,
            line: 0,
            column: 0,
            stream_position: 0,
        }
    }

    pub(crate) fn raw_name<'a>(&'a self, source: &'a str) -> &'a str {
        self.name.get(source)
    }

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

    pub(crate) fn raw_value<'a>(&'a self, source: &'a str) -> Option<&'a str> {
        self.value.as_ref().map(|v| v.get(source))
    }

    /// The value with entities decoded (memoized). `decode` comes from the
    /// document's backward-compatibility option.
    pub(crate) fn decoded_value<'a>(&'a self, source: &'a str, decode: bool) -> &'a str {
        let Some(value) = &self.value else {
            return "";
        };
        let raw = value.get(source);
        if !decode || !raw.contains('&') {
            return raw;
        }
        self.decoded
            .get_or_init(|| decode_entities(raw).into_owned())
            .as_str()
    }

    pub(crate) fn set_value(&mut self, value: impl Into<String>) {
        self.value = Some(RawText::Owned(value.into()));
        self.decoded = OnceCell::new();
        self.had_equals = true;
    }

    /// Resolved name: lowercase unless the document prefers original case.
    pub fn name<'a>(&'a self, doc: &'a Document) -> &'a str {
        if doc.options().prefer_original_case {
            self.raw_name(doc.source_text())
        } else {
            self.resolved_name(doc.source_text())
        }
    }

    /// The name exactly as scanned.
    pub fn original_name<'a>(&'a self, doc: &'a Document) -> &'a str {
        self.raw_name(doc.source_text())
    }

    pub fn value<'a>(&'a self, doc: &'a Document) -> &'a str {
        self.decoded_value(
            doc.source_text(),
            !doc.options().backward_compatible_entity_decoding,
        )
    }

    pub fn had_equals_sign(&self) -> bool {
        self.had_equals
    }

    pub fn came_from_parse(&self) -> bool {
        self.came_from_parse
    }

    pub fn detected_quote(&self) -> QuoteStyle {
        self.detected_quote
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn column(&self) -> u32 {
        self.column
    }

    pub fn stream_position(&self) -> usize {
        self.stream_position
    }

    pub fn value_start(&self) -> usize {
        self.value
            .as_ref()
            .and_then(RawText::span)
            .map_or(0, |s| s.start)
    }

    pub fn value_length(&self) -> usize {
        self.value
            .as_ref()
            .and_then(RawText::span)
            .map_or(0, Span::len)
    }
}

//! Forward, single-pass HTML tokenizer producing lexical events with byte
//! spans and line/column positions.
//!
//! Supported tag-name characters (ASCII only): `[A-Za-z0-9:_-]`, first
//! character alphabetic. Attribute names are any run of bytes that is not
//! whitespace, `=`, `>` or `/`.
//!
//! Contract:
//! - Lazy: one event per `next()` call; constructing a tokenizer does no
//!   scanning.
//! - Raw-text elements (`script`, `style`, `textarea`, `title`) switch the
//!   scanner into a mode that looks only for the literal matching end tag;
//!   `<` and `>` inside the body are opaque.
//! - Malformed constructs never fail: a stray `<`, an empty `</>`, or an
//!   unterminated construct degrade to literal text or run to end of input.
//! - The tokenizer only advances its cursor; it never touches the tree.

use crate::config::QuoteStyle;
use crate::element_table::element_flags;
use crate::position::{Span, TextPos};
use memchr::{memchr, memchr_iter};
use std::collections::VecDeque;

/// Comment-like constructs that pass through the tree as comment nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarkupKind {
    Comment,
    Doctype,
    ProcessingInstruction,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    /// `<name` — `start` is the offset of the `<`.
    TagOpen {
        start: usize,
        name: Span,
        pos: TextPos,
    },
    /// `</name` — `start` is the offset of the `<`.
    CloseTagOpen {
        start: usize,
        name: Span,
        pos: TextPos,
    },
    /// One attribute inside the current tag. `value` is `None` iff the
    /// attribute was written without `=`.
    Attr {
        name: Span,
        value: Option<Span>,
        quote: QuoteStyle,
        had_equals: bool,
        pos: TextPos,
    },
    /// `>` or `/>` terminating the current tag; `end` is the offset just
    /// past it (end of input for an unterminated tag).
    TagEnd { end: usize, self_closing: bool },
    Text { span: Span, pos: TextPos },
    /// Comment, doctype or processing instruction. `inner` excludes the
    /// markers (`<!--`/`-->`, `<!`/`>`, `<?`/`>`).
    Markup {
        kind: MarkupKind,
        outer: Span,
        inner: Span,
        pos: TextPos,
    },
}

#[derive(Clone, Copy)]
enum State {
    Data,
    InTag { closing: bool, name: Span },
}

pub struct Tokenizer<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: u32,
    line_start: usize,
    state: State,
    queue: VecDeque<Event>,
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':')
}

impl<'a> Tokenizer<'a> {
    pub fn new(text: &'a str) -> Self {
        Self::from_offset(text, 0)
    }

    /// Start scanning at `offset`; line/column are derived from the prefix.
    pub fn from_offset(text: &'a str, offset: usize) -> Self {
        debug_assert!(text.is_char_boundary(offset));
        let mut tok = Self {
            text,
            bytes: text.as_bytes(),
            pos: 0,
            line: 1,
            line_start: 0,
            state: State::Data,
            queue: VecDeque::new(),
        };
        tok.advance(offset);
        tok
    }

    fn advance(&mut self, to: usize) {
        debug_assert!(to >= self.pos && to <= self.bytes.len());
        for nl in memchr_iter(b'\n', &self.bytes[self.pos..to]) {
            self.line += 1;
            self.line_start = self.pos + nl + 1;
        }
        self.pos = to;
    }

    fn here(&self) -> TextPos {
        TextPos {
            line: self.line,
            column: (self.pos - self.line_start + 1) as u32,
        }
    }

    fn scan_name_end(&self, from: usize) -> usize {
        let mut j = from;
        while j < self.bytes.len() && is_name_byte(self.bytes[j]) {
            j += 1;
        }
        j
    }

    fn scan_data(&mut self) -> Event {
        let start = self.pos;
        let pos = self.here();
        let len = self.bytes.len();
        debug_assert!(start < len);

        if self.bytes[start] != b'<' {
            let end = memchr(b'<', &self.bytes[start..]).map_or(len, |rel| start + rel);
            self.advance(end);
            debug_assert!(self.text.is_char_boundary(end));
            return Event::Text {
                span: Span::new(start, end),
                pos,
            };
        }

        let rest = &self.bytes[start..];
        if rest.starts_with(b"<!--") {
            let inner_start = start + 4;
            return match self.text[inner_start.min(len)..].find("-->") {
                Some(rel) => {
                    let inner_end = inner_start + rel;
                    let outer_end = inner_end + 3;
                    self.advance(outer_end);
                    Event::Markup {
                        kind: MarkupKind::Comment,
                        outer: Span::new(start, outer_end),
                        inner: Span::new(inner_start, inner_end),
                        pos,
                    }
                }
                None => {
                    // unterminated comment runs to end of input
                    self.advance(len);
                    Event::Markup {
                        kind: MarkupKind::Comment,
                        outer: Span::new(start, len),
                        inner: Span::new(inner_start.min(len), len),
                        pos,
                    }
                }
            };
        }
        if rest.starts_with(b"<!") || rest.starts_with(b"<?") {
            let kind = if rest[1] == b'!' {
                MarkupKind::Doctype
            } else {
                MarkupKind::ProcessingInstruction
            };
            let inner_start = start + 2;
            let (inner_end, outer_end) = match memchr(b'>', &self.bytes[inner_start..]) {
                Some(rel) => (inner_start + rel, inner_start + rel + 1),
                None => (len, len),
            };
            self.advance(outer_end);
            return Event::Markup {
                kind,
                outer: Span::new(start, outer_end),
                inner: Span::new(inner_start.min(inner_end), inner_end),
                pos,
            };
        }
        if rest.starts_with(b"</") {
            let name_start = start + 2;
            let name_end = self.scan_name_end(name_start);
            if name_end == name_start {
                // `</>` or `</ ...>`: literal text through the `>`
                let end = memchr(b'>', &self.bytes[name_start..])
                    .map_or(len, |rel| name_start + rel + 1);
                self.advance(end);
                return Event::Text {
                    span: Span::new(start, end),
                    pos,
                };
            }
            let name = Span::new(name_start, name_end);
            self.advance(name_end);
            self.state = State::InTag {
                closing: true,
                name,
            };
            return Event::CloseTagOpen { start, name, pos };
        }
        if start + 1 < len && self.bytes[start + 1].is_ascii_alphabetic() {
            let name_start = start + 1;
            let name_end = self.scan_name_end(name_start);
            let name = Span::new(name_start, name_end);
            self.advance(name_end);
            log::trace!(
                target: "htmldom.tokenizer",
                "tag open <{}> at {}",
                name.slice(self.text),
                start
            );
            self.state = State::InTag {
                closing: false,
                name,
            };
            return Event::TagOpen { start, name, pos };
        }

        // stray '<': literal text up to the next '<'
        let end = memchr(b'<', &self.bytes[start + 1..]).map_or(len, |rel| start + 1 + rel);
        self.advance(end);
        Event::Text {
            span: Span::new(start, end),
            pos,
        }
    }

    fn scan_in_tag(&mut self, closing: bool, name: Span) -> Event {
        let len = self.bytes.len();
        loop {
            let mut k = self.pos;
            while k < len && self.bytes[k].is_ascii_whitespace() {
                k += 1;
            }
            self.advance(k);

            if self.pos >= len {
                // unterminated tag: close it at end of input; the builder
                // force-closes the element
                self.state = State::Data;
                return Event::TagEnd {
                    end: len,
                    self_closing: false,
                };
            }
            match self.bytes[self.pos] {
                b'>' => {
                    let end = self.pos + 1;
                    self.advance(end);
                    self.state = State::Data;
                    if !closing && element_flags(name.slice(self.text)).raw_text {
                        self.enter_raw_text(name);
                    }
                    return Event::TagEnd {
                        end,
                        self_closing: false,
                    };
                }
                b'/' => {
                    if self.pos + 1 < len && self.bytes[self.pos + 1] == b'>' {
                        let end = self.pos + 2;
                        self.advance(end);
                        self.state = State::Data;
                        return Event::TagEnd {
                            end,
                            self_closing: true,
                        };
                    }
                    let next = self.pos + 1;
                    self.advance(next);
                    continue;
                }
                b'=' => {
                    // stray '=' with no attribute name
                    let next = self.pos + 1;
                    self.advance(next);
                    continue;
                }
                _ => {}
            }

            return self.scan_attribute();
        }
    }

    fn scan_attribute(&mut self) -> Event {
        let len = self.bytes.len();
        let attr_pos = self.here();
        let name_start = self.pos;
        let mut k = self.pos;
        while k < len
            && !self.bytes[k].is_ascii_whitespace()
            && !matches!(self.bytes[k], b'=' | b'>' | b'/')
        {
            k += 1;
        }
        debug_assert!(k > name_start);
        let name = Span::new(name_start, k);
        self.advance(k);

        let mut k = self.pos;
        while k < len && self.bytes[k].is_ascii_whitespace() {
            k += 1;
        }
        if k >= len || self.bytes[k] != b'=' {
            // bare attribute; whitespace is consumed by the tag loop
            return Event::Attr {
                name,
                value: None,
                quote: QuoteStyle::Omitted,
                had_equals: false,
                pos: attr_pos,
            };
        }
        self.advance(k + 1);
        let mut k = self.pos;
        while k < len && self.bytes[k].is_ascii_whitespace() {
            k += 1;
        }
        self.advance(k);

        if self.pos < len && matches!(self.bytes[self.pos], b'"' | b'\'') {
            let quote_byte = self.bytes[self.pos];
            let vstart = self.pos + 1;
            let vend = memchr(quote_byte, &self.bytes[vstart.min(len)..])
                .map_or(len, |rel| vstart + rel);
            let after = if vend < len { vend + 1 } else { len };
            self.advance(after);
            return Event::Attr {
                name,
                value: Some(Span::new(vstart.min(vend), vend)),
                quote: if quote_byte == b'"' {
                    QuoteStyle::Double
                } else {
                    QuoteStyle::Single
                },
                had_equals: true,
                pos: attr_pos,
            };
        }

        // unquoted value, possibly empty (`a=>`)
        let vstart = self.pos;
        let mut k = self.pos;
        while k < len && !self.bytes[k].is_ascii_whitespace() && self.bytes[k] != b'>' {
            if self.bytes[k] == b'/' && k + 1 < len && self.bytes[k + 1] == b'>' {
                break;
            }
            k += 1;
        }
        self.advance(k);
        Event::Attr {
            name,
            value: Some(Span::new(vstart, k)),
            quote: QuoteStyle::Unquoted,
            had_equals: true,
            pos: attr_pos,
        }
    }

    /// After the open tag of a raw-text element: emit the body as one text
    /// run, then the matching close tag if present. A missing close tag
    /// leaves the element open for the builder's end-of-input handling.
    fn enter_raw_text(&mut self, name: Span) {
        let from = self.pos;
        let tag = name.slice(self.text);
        match self.find_raw_close(from, tag) {
            Some((close_start, after_gt)) => {
                if close_start > from {
                    let pos = self.here();
                    self.queue.push_back(Event::Text {
                        span: Span::new(from, close_start),
                        pos,
                    });
                }
                self.advance(close_start);
                let name_span = Span::new(close_start + 2, close_start + 2 + tag.len());
                self.queue.push_back(Event::CloseTagOpen {
                    start: close_start,
                    name: name_span,
                    pos: self.here(),
                });
                self.advance(after_gt);
                self.queue.push_back(Event::TagEnd {
                    end: after_gt,
                    self_closing: false,
                });
            }
            None => {
                let len = self.bytes.len();
                if from < len {
                    let pos = self.here();
                    self.queue.push_back(Event::Text {
                        span: Span::new(from, len),
                        pos,
                    });
                }
                self.advance(len);
            }
        }
    }

    /// Find `</name`, ASCII case-insensitive, followed by optional
    /// whitespace and `>`. Returns (offset of `<`, offset past `>`).
    fn find_raw_close(&self, from: usize, name: &str) -> Option<(usize, usize)> {
        let bytes = self.bytes;
        let len = bytes.len();
        let n = name.len();
        let mut i = from;
        while i + 2 + n <= len {
            let rel = memchr(b'<', &bytes[i..])?;
            i += rel;
            if i + 2 + n > len {
                return None;
            }
            if bytes[i + 1] == b'/' && bytes[i + 2..i + 2 + n].eq_ignore_ascii_case(name.as_bytes())
            {
                let mut k = i + 2 + n;
                while k < len && bytes[k].is_ascii_whitespace() {
                    k += 1;
                }
                if k < len && bytes[k] == b'>' {
                    return Some((i, k + 1));
                }
            }
            i += 1;
        }
        None
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Event;

    fn next(&mut self) -> Option<Event> {
        if let Some(event) = self.queue.pop_front() {
            return Some(event);
        }
        if let State::InTag { closing, name } = self.state {
            return Some(self.scan_in_tag(closing, name));
        }
        if self.pos >= self.bytes.len() {
            return None;
        }
        Some(self.scan_data())
    }
}

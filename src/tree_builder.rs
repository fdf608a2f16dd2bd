//! Tree construction from tokenizer events.
//!
//! Scratch state lives for exactly one parse: the open-element index (start
//! offset → node, ordered, so the innermost open element is the largest
//! key) and the last-open-by-name map that resolves implicit closes and end
//! tags in O(1). Both are dropped when the build returns.
//!
//! Recovery rules, not errors: an end tag with no open element is dropped
//! or kept as text per configuration; elements left open at end of input
//! are force-closed. The only fatal condition is nesting past the
//! configured maximum depth.

use crate::attribute::Attribute;
use crate::config::{QuoteStyle, UnmatchedEndTagPolicy};
use crate::document::Document;
use crate::element_table::{ElementFlags, element_flags};
use crate::error::HtmlError;
use crate::node::{NodeData, NodeId, NodeType, RawText};
use crate::position::{Span, TextPos};
use crate::tokenizer::{Event, MarkupKind, Tokenizer};
use std::collections::{BTreeMap, HashMap};

/// Parse `doc.text` into `doc`'s (empty) tree.
pub(crate) fn build_into(doc: &mut Document) -> Result<(), HtmlError> {
    let source = std::mem::take(&mut doc.text);
    let builder = TreeBuilder {
        doc: &mut *doc,
        source: &source,
        open: BTreeMap::new(),
        last_by_name: HashMap::new(),
        pending: None,
    };
    let result = builder.run();
    doc.text = source;
    result
}

struct Pending {
    node: NodeId,
    closing: bool,
    lower: String,
    flags: ElementFlags,
}

struct TreeBuilder<'d, 's> {
    doc: &'d mut Document,
    source: &'s str,
    open: BTreeMap<usize, NodeId>,
    last_by_name: HashMap<String, NodeId>,
    pending: Option<Pending>,
}

impl TreeBuilder<'_, '_> {
    fn run(mut self) -> Result<(), HtmlError> {
        for event in Tokenizer::new(self.source) {
            match event {
                Event::TagOpen { start, name, pos } => self.begin_start_tag(start, name, pos)?,
                Event::CloseTagOpen { start, name, pos } => self.begin_end_tag(start, name, pos),
                Event::Attr {
                    name,
                    value,
                    quote,
                    had_equals,
                    pos,
                } => self.push_attribute(name, value, quote, had_equals, pos),
                Event::TagEnd { end, self_closing } => self.finish_tag(end, self_closing)?,
                Event::Text { span, pos } => self.append_text(span, pos)?,
                Event::Markup {
                    kind,
                    outer,
                    inner,
                    pos,
                } => self.append_markup(kind, outer, inner, pos)?,
            }
        }
        self.finish_input()
    }

    /// Innermost still-open element, or the document node.
    fn current_parent(&self) -> NodeId {
        self.open
            .iter()
            .next_back()
            .map(|(_, &id)| id)
            .unwrap_or_else(|| self.doc.root())
    }

    fn append_to(&mut self, parent: NodeId, child: NodeId) {
        let prev = self.doc.node(parent).children.last().copied();
        self.doc.node_mut(parent).children.push(child);
        if let Some(p) = prev {
            self.doc.node_mut(p).next = Some(child);
        }
        let c = self.doc.node_mut(child);
        c.parent = Some(parent);
        c.prev = prev;
        c.next = None;
    }

    fn begin_start_tag(&mut self, start: usize, name: Span, pos: TextPos) -> Result<(), HtmlError> {
        let lower = name.slice(self.source).to_ascii_lowercase();
        let flags = element_flags(&lower);

        let implicit =
            flags.implicit_close && !(self.doc.options.disable_implicit_p_closing && lower == "p");
        if implicit {
            if let Some(&prev) = self.last_by_name.get(&lower) {
                log::debug!(
                    target: "htmldom.tree_builder",
                    "implicitly closing open <{lower}> before offset {start}"
                );
                let marker = self.make_end_marker(start);
                self.close_node(prev, marker, 0, true)?;
            }
        }

        let parent = self.current_parent();
        let depth = self.doc.node(parent).depth + 1;
        if depth > self.doc.options.max_nested_depth {
            return Err(HtmlError::TooDeep {
                depth,
                line: pos.line,
                column: pos.column,
            });
        }

        let mut data = NodeData::new(NodeType::Element);
        data.name = RawText::Slice(name);
        data.outer_start = start;
        data.inner_start = start;
        data.stream_position = start;
        data.line = pos.line;
        data.column = pos.column;
        data.depth = depth;
        data.came_from_parse = true;
        let id = self.doc.push_node(data);
        self.append_to(parent, id);
        self.pending = Some(Pending {
            node: id,
            closing: false,
            lower,
            flags,
        });
        Ok(())
    }

    fn begin_end_tag(&mut self, start: usize, name: Span, pos: TextPos) {
        let lower = name.slice(self.source).to_ascii_lowercase();
        let flags = element_flags(&lower);
        let mut data = NodeData::new(NodeType::Element);
        data.name = RawText::Slice(name);
        data.outer_start = start;
        data.inner_start = start;
        data.stream_position = start;
        data.line = pos.line;
        data.column = pos.column;
        data.came_from_parse = true;
        let id = self.doc.push_node(data);
        self.doc.node_mut(id).end_node = Some(id);
        self.pending = Some(Pending {
            node: id,
            closing: true,
            lower,
            flags,
        });
    }

    fn push_attribute(
        &mut self,
        name: Span,
        value: Option<Span>,
        quote: QuoteStyle,
        had_equals: bool,
        pos: TextPos,
    ) {
        let Some(pending) = &self.pending else {
            return;
        };
        let attr = Attribute::from_parse(name, value, quote, had_equals, pos);
        self.doc.node_mut(pending.node).attributes.push(attr);
    }

    fn finish_tag(&mut self, end: usize, self_closing: bool) -> Result<(), HtmlError> {
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };
        let node = pending.node;
        {
            let n = self.doc.node_mut(node);
            n.outer_len = end - n.outer_start;
            n.inner_start = end;
            n.inner_len = 0;
        }

        if pending.closing {
            return self.resolve_end_tag(pending);
        }

        if pending.flags.void || self_closing {
            self.doc.node_mut(node).end_node = Some(node);
        } else {
            let start = self.doc.node(node).outer_start;
            self.open.insert(start, node);
            self.last_by_name.insert(pending.lower, node);
        }
        self.index_parsed_id(node);
        Ok(())
    }

    fn resolve_end_tag(&mut self, pending: Pending) -> Result<(), HtmlError> {
        let end_id = pending.node;
        match self.last_by_name.get(&pending.lower).copied() {
            Some(target) => self.close_node(target, end_id, 0, false),
            None => {
                match self.doc.options.unmatched_end_tags {
                    UnmatchedEndTagPolicy::Drop => {
                        log::debug!(
                            target: "htmldom.tree_builder",
                            "dropping unmatched </{}> at offset {}",
                            pending.lower,
                            self.doc.node(end_id).outer_start
                        );
                    }
                    UnmatchedEndTagPolicy::AsText => {
                        let (start, len, line, column) = {
                            let e = self.doc.node(end_id);
                            (e.outer_start, e.outer_len, e.line, e.column)
                        };
                        let parent = self.current_parent();
                        let depth = self.doc.node(parent).depth + 1;
                        if depth > self.doc.options.max_nested_depth {
                            return Err(HtmlError::TooDeep {
                                depth,
                                line,
                                column,
                            });
                        }
                        let mut data = NodeData::new(NodeType::Text);
                        data.content = RawText::Slice(Span::new(start, start + len));
                        data.outer_start = start;
                        data.outer_len = len;
                        data.inner_start = start;
                        data.inner_len = len;
                        data.stream_position = start;
                        data.line = line;
                        data.column = column;
                        data.came_from_parse = true;
                        data.depth = depth;
                        let id = self.doc.push_node(data);
                        self.doc.node_mut(id).end_node = Some(id);
                        self.append_to(parent, id);
                    }
                }
                Ok(())
            }
        }
    }

    /// Close `node` against `end`. Unless the element allows overlap (or
    /// the auto-close-on-end policy defers it), still-open descendants are
    /// eagerly closed first so the tree stays well-formed.
    fn close_node(
        &mut self,
        node: NodeId,
        end: NodeId,
        level: usize,
        implicit: bool,
    ) -> Result<(), HtmlError> {
        if level > self.doc.options.max_nested_depth {
            let n = self.doc.node(node);
            return Err(HtmlError::TooDeep {
                depth: level,
                line: n.line,
                column: n.column,
            });
        }
        if self.doc.node(node).is_closed() {
            return Ok(());
        }

        let lower = self.doc.node(node).resolved_name(self.source).to_string();
        let flags = element_flags(&lower);
        let end_start = self.doc.node(end).outer_start;
        let end_len = self.doc.node(end).outer_len;
        // span before the close extends it: re-derivation of the
        // last-open-by-name entry must not see the not-yet-final range
        let span_before = {
            let n = self.doc.node(node);
            (n.outer_start, n.outer_start + n.outer_len)
        };

        if !self.doc.options.auto_close_on_end && !flags.overlap {
            let kids: Vec<NodeId> = self.doc.node(node).children.clone();
            for child in kids {
                let c = self.doc.node(child);
                if c.kind == NodeType::Element && !c.is_closed() {
                    let marker = self.make_end_marker(end_start);
                    self.close_node(child, marker, level + 1, true)?;
                }
            }
        }

        {
            let n = self.doc.node_mut(node);
            n.end_node = Some(end);
            n.implicit_end = implicit;
            if end != node {
                n.inner_len = end_start.saturating_sub(n.inner_start);
                n.outer_len = (end_start + end_len).saturating_sub(n.outer_start);
            }
        }
        let outer_start = self.doc.node(node).outer_start;
        self.open.remove(&outer_start);
        if self.last_by_name.get(&lower).copied() == Some(node) {
            self.last_by_name.remove(&lower);
            self.update_last_node(span_before, lower);
        }
        Ok(())
    }

    /// Re-derive the last-open-by-name entry after closing the tracked
    /// node: among still-open nodes of the same name positioned outside the
    /// closed node's start-tag span, the one with the largest start offset
    /// wins.
    fn update_last_node(&mut self, span_before: (usize, usize), lower: String) {
        let (lo, hi) = span_before;
        let mut best: Option<(usize, NodeId)> = None;
        for (&start, &id) in &self.open {
            if start >= lo && start <= hi {
                continue;
            }
            if !self
                .doc
                .node(id)
                .name
                .get(self.source)
                .eq_ignore_ascii_case(&lower)
            {
                continue;
            }
            if best.is_none_or(|(b, _)| start > b) {
                best = Some((start, id));
            }
        }
        if let Some((_, id)) = best {
            self.last_by_name.insert(lower, id);
        }
    }

    /// Zero-length synthetic end node at `pos`, used when closure happens
    /// without a real end tag.
    fn make_end_marker(&mut self, pos: usize) -> NodeId {
        let mut data = NodeData::new(NodeType::Element);
        data.outer_start = pos;
        data.inner_start = pos;
        data.stream_position = pos;
        data.came_from_parse = true;
        let id = self.doc.push_node(data);
        self.doc.node_mut(id).end_node = Some(id);
        id
    }

    fn append_text(&mut self, span: Span, pos: TextPos) -> Result<(), HtmlError> {
        let parent = self.current_parent();
        let depth = self.doc.node(parent).depth + 1;
        if depth > self.doc.options.max_nested_depth {
            return Err(HtmlError::TooDeep {
                depth,
                line: pos.line,
                column: pos.column,
            });
        }
        let mut data = NodeData::new(NodeType::Text);
        data.content = RawText::Slice(span);
        data.outer_start = span.start;
        data.outer_len = span.len();
        data.inner_start = span.start;
        data.inner_len = span.len();
        data.stream_position = span.start;
        data.line = pos.line;
        data.column = pos.column;
        data.depth = depth;
        data.came_from_parse = true;
        let id = self.doc.push_node(data);
        self.doc.node_mut(id).end_node = Some(id);
        self.append_to(parent, id);
        Ok(())
    }

    fn append_markup(
        &mut self,
        kind: MarkupKind,
        outer: Span,
        inner: Span,
        pos: TextPos,
    ) -> Result<(), HtmlError> {
        let parent = self.current_parent();
        let depth = self.doc.node(parent).depth + 1;
        if depth > self.doc.options.max_nested_depth {
            return Err(HtmlError::TooDeep {
                depth,
                line: pos.line,
                column: pos.column,
            });
        }
        let mut data = NodeData::new(NodeType::Comment);
        data.content = RawText::Slice(inner);
        data.markup = kind;
        data.outer_start = outer.start;
        data.outer_len = outer.len();
        data.inner_start = inner.start;
        data.inner_len = inner.len();
        data.stream_position = outer.start;
        data.line = pos.line;
        data.column = pos.column;
        data.depth = depth;
        data.came_from_parse = true;
        let id = self.doc.push_node(data);
        self.doc.node_mut(id).end_node = Some(id);
        self.append_to(parent, id);
        Ok(())
    }

    /// End of input: whatever is still open gets closed. By default nodes
    /// are stamped closed against themselves as a synthetic end-of-stream
    /// marker; under `auto_close_on_end` each one is unwound through the
    /// regular close path instead.
    fn finish_input(mut self) -> Result<(), HtmlError> {
        let eof = self.source.len();
        if self.open.is_empty() {
            return Ok(());
        }
        if self.doc.options.auto_close_on_end {
            loop {
                let Some(innermost) = self.open.iter().next_back().map(|(_, &id)| id) else {
                    break;
                };
                let marker = self.make_end_marker(eof);
                self.close_node(innermost, marker, 0, true)?;
            }
        } else {
            let ids: Vec<NodeId> = self.open.values().copied().collect();
            for id in ids {
                let n = self.doc.node_mut(id);
                n.end_node = Some(id);
                n.implicit_end = true;
                n.inner_len = eof.saturating_sub(n.inner_start);
                n.outer_len = eof.saturating_sub(n.outer_start);
            }
            self.open.clear();
            self.last_by_name.clear();
        }
        Ok(())
    }

    fn index_parsed_id(&mut self, node: NodeId) {
        if self.doc.id_index.is_none() {
            return;
        }
        let value = {
            let n = self.doc.node(node);
            n.attributes
                .iter()
                .find(|a| a.resolved_name(self.source) == "id")
                .map(|a| {
                    a.decoded_value(
                        self.source,
                        !self.doc.options.backward_compatible_entity_decoding,
                    )
                    .to_string()
                })
        };
        if let Some(value) = value {
            if let Some(index) = self.doc.id_index.as_mut() {
                index.insert(value, node);
            }
        }
    }
}

//! The document: source buffer, node arena, mutation API.
//!
//! Nodes are addressed by [`NodeId`]; the document owns the arena and the
//! original text. Parsed nodes keep byte positions into that text and only
//! materialize strings when something asks; mutations flip the dirty flag
//! on the node and every ancestor so the next markup read re-renders.

use crate::attribute::Attribute;
use crate::config::ParseOptions;
use crate::entities::decode_entities;
use crate::error::HtmlError;
use crate::node::{NAME_COMMENT, NAME_DOCUMENT, NAME_TEXT, NodeData, NodeId, NodeType, RawText};
use crate::serializer;
use crate::tree_builder;
use std::collections::HashMap;

#[derive(Debug)]
pub struct Document {
    pub(crate) text: String,
    pub(crate) nodes: Vec<NodeData>,
    pub(crate) options: ParseOptions,
    /// `id` attribute value → node, present iff `use_identifier_index`.
    /// Tracks only nodes attached under the document root.
    pub(crate) id_index: Option<HashMap<String, NodeId>>,
}

impl Document {
    /// An empty document (no source text, just the document node).
    pub fn new(options: ParseOptions) -> Self {
        let mut root = NodeData::new(NodeType::Document);
        root.end_node = Some(NodeId(0));
        let id_index = options.use_identifier_index.then(HashMap::new);
        Self {
            text: String::new(),
            nodes: vec![root],
            options,
            id_index,
        }
    }

    /// Parse `text` into a new document. Malformed input yields a
    /// best-effort tree; only nesting past `max_nested_depth` fails.
    pub fn parse(text: impl Into<String>, options: ParseOptions) -> Result<Self, HtmlError> {
        let mut doc = Document::new(options);
        doc.text = text.into();
        {
            let root = doc.node_mut(NodeId(0));
            root.came_from_parse = true;
        }
        let len = doc.text.len();
        {
            let root = doc.node_mut(NodeId(0));
            root.outer_len = len;
            root.inner_len = len;
        }
        tree_builder::build_into(&mut doc)?;
        Ok(doc)
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// The original source text (empty for documents built from scratch).
    pub fn source_text(&self) -> &str {
        &self.text
    }

    pub(crate) fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0 as usize]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.0 as usize]
    }

    pub(crate) fn push_node(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(data);
        id
    }

    // --- basic accessors ---------------------------------------------------

    pub fn node_type(&self, id: NodeId) -> NodeType {
        self.node(id).kind
    }

    /// Resolved node name: lowercase tag name for elements (original casing
    /// under `prefer_original_case`), sentinel names otherwise.
    pub fn name(&self, id: NodeId) -> &str {
        let n = self.node(id);
        match n.kind {
            NodeType::Document => NAME_DOCUMENT,
            NodeType::Text => NAME_TEXT,
            NodeType::Comment => NAME_COMMENT,
            NodeType::Element => {
                if self.options.prefer_original_case {
                    n.name.get(&self.text)
                } else {
                    n.resolved_name(&self.text)
                }
            }
        }
    }

    /// The tag name exactly as scanned.
    pub fn original_name(&self, id: NodeId) -> &str {
        let n = self.node(id);
        match n.kind {
            NodeType::Document => NAME_DOCUMENT,
            NodeType::Text => NAME_TEXT,
            NodeType::Comment => NAME_COMMENT,
            NodeType::Element => n.name.get(&self.text),
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).children.first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).children.last().copied()
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).prev
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).next
    }

    pub fn has_children(&self, id: NodeId) -> bool {
        !self.node(id).children.is_empty()
    }

    pub fn has_attributes(&self, id: NodeId) -> bool {
        !self.node(id).attributes.is_empty()
    }

    pub fn depth(&self, id: NodeId) -> usize {
        self.node(id).depth
    }

    pub fn line(&self, id: NodeId) -> u32 {
        self.node(id).line
    }

    pub fn column(&self, id: NodeId) -> u32 {
        self.node(id).column
    }

    pub fn stream_position(&self, id: NodeId) -> usize {
        self.node(id).stream_position
    }

    pub fn outer_start(&self, id: NodeId) -> usize {
        self.node(id).outer_start
    }

    pub fn outer_length(&self, id: NodeId) -> usize {
        self.node(id).outer_len
    }

    pub fn inner_start(&self, id: NodeId) -> usize {
        self.node(id).inner_start
    }

    pub fn inner_length(&self, id: NodeId) -> usize {
        self.node(id).inner_len
    }

    /// The node representing this element's closing-tag region; the node
    /// itself for self-closing/void/text/comment nodes.
    pub fn end_node(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).end_node
    }

    pub fn is_closed(&self, id: NodeId) -> bool {
        self.node(id).is_closed()
    }

    /// Closed without an explicit end tag in the source.
    pub fn has_implicit_end(&self, id: NodeId) -> bool {
        self.node(id).implicit_end
    }

    pub fn came_from_parse(&self, id: NodeId) -> bool {
        self.node(id).came_from_parse
    }

    pub fn is_dirty(&self, id: NodeId) -> bool {
        self.node(id).dirty
    }

    /// Raw content of a text or comment-like node (undecoded, without the
    /// comment markers).
    pub fn raw_text(&self, id: NodeId) -> Option<&str> {
        let n = self.node(id);
        match n.kind {
            NodeType::Text | NodeType::Comment => Some(n.content.get(&self.text)),
            _ => None,
        }
    }

    pub(crate) fn outer_source(&self, id: NodeId) -> &str {
        let n = self.node(id);
        debug_assert!(n.came_from_parse, "source slice requires a parsed node");
        &self.text[n.outer_start..n.outer_start + n.outer_len]
    }

    pub(crate) fn inner_source(&self, id: NodeId) -> &str {
        let n = self.node(id);
        debug_assert!(n.came_from_parse, "source slice requires a parsed node");
        &self.text[n.inner_start..n.inner_start + n.inner_len]
    }

    // --- factory -----------------------------------------------------------

    /// A detached synthetic element with no source position.
    pub fn create_element(&mut self, name: impl Into<String>) -> NodeId {
        let mut data = NodeData::new(NodeType::Element);
        data.name = RawText::Owned(name.into());
        let id = self.push_node(data);
        self.node_mut(id).end_node = Some(id);
        id
    }

    pub fn create_text(&mut self, content: impl Into<String>) -> NodeId {
        let mut data = NodeData::new(NodeType::Text);
        data.content = RawText::Owned(content.into());
        let id = self.push_node(data);
        self.node_mut(id).end_node = Some(id);
        id
    }

    pub fn create_comment(&mut self, content: impl Into<String>) -> NodeId {
        let mut data = NodeData::new(NodeType::Comment);
        data.content = RawText::Owned(content.into());
        let id = self.push_node(data);
        self.node_mut(id).end_node = Some(id);
        id
    }

    pub fn create_attribute(name: impl Into<String>, value: impl Into<String>) -> Attribute {
        Attribute::new(name, value)
    }

    // --- dirty tracking ----------------------------------------------------

    /// Mark `id` and every ancestor stale. Iterative: the ancestor chain is
    /// unbounded only by tree depth, never by recursion.
    pub(crate) fn mark_dirty(&mut self, id: NodeId) {
        let mut cur = Some(id);
        while let Some(c) = cur {
            let n = self.node_mut(c);
            n.dirty = true;
            n.cached_outer = None;
            cur = n.parent;
        }
    }

    // --- identifier index --------------------------------------------------

    /// Look up an element by its `id` attribute value.
    pub fn element_by_id(&self, value: &str) -> Result<Option<NodeId>, HtmlError> {
        match &self.id_index {
            Some(index) => Ok(index.get(value).copied()),
            None => Err(HtmlError::IdIndexDisabled),
        }
    }

    fn is_attached(&self, id: NodeId) -> bool {
        let mut cur = Some(id);
        while let Some(c) = cur {
            if c == self.root() {
                return true;
            }
            cur = self.node(c).parent;
        }
        false
    }

    fn id_attribute_of(&self, id: NodeId) -> Option<String> {
        let n = self.node(id);
        if n.kind != NodeType::Element {
            return None;
        }
        n.attributes
            .iter()
            .find(|a| a.resolved_name(&self.text) == "id")
            .map(|a| {
                a.decoded_value(
                    &self.text,
                    !self.options.backward_compatible_entity_decoding,
                )
                .to_string()
            })
    }

    fn index_insert(&mut self, value: String, id: NodeId) {
        if let Some(index) = self.id_index.as_mut() {
            index.insert(value, id);
        }
    }

    fn index_remove(&mut self, value: &str, id: NodeId) {
        if let Some(index) = self.id_index.as_mut() {
            if index.get(value) == Some(&id) {
                index.remove(value);
            }
        }
    }

    fn index_subtree(&mut self, id: NodeId, add: bool) {
        if self.id_index.is_none() {
            return;
        }
        let mut entries: Vec<(String, NodeId)> = Vec::new();
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            if let Some(value) = self.id_attribute_of(n) {
                entries.push((value, n));
            }
            stack.extend(self.node(n).children.iter().copied());
        }
        for (value, n) in entries {
            if add {
                self.index_insert(value, n);
            } else {
                self.index_remove(&value, n);
            }
        }
    }

    // --- mutation ----------------------------------------------------------

    fn pre_attach_checks(&self, parent: NodeId, child: NodeId) -> Result<(), HtmlError> {
        if !matches!(self.node(parent).kind, NodeType::Document | NodeType::Element) {
            return Err(HtmlError::NotAnElement);
        }
        let mut cur = Some(parent);
        while let Some(c) = cur {
            if c == child {
                return Err(HtmlError::WouldCreateCycle);
            }
            cur = self.node(c).parent;
        }
        let base = self.node(parent).depth + 1;
        let height = self.subtree_height(child);
        if base + height > self.options.max_nested_depth {
            return Err(HtmlError::TooDeep {
                depth: base + height,
                line: 0,
                column: 0,
            });
        }
        Ok(())
    }

    fn subtree_height(&self, id: NodeId) -> usize {
        let mut max = 0;
        let mut stack = vec![(id, 0usize)];
        while let Some((n, h)) = stack.pop() {
            if h > max {
                max = h;
            }
            for &c in &self.node(n).children {
                stack.push((c, h + 1));
            }
        }
        max
    }

    fn refresh_depths(&mut self, id: NodeId, depth: usize) {
        let mut stack = vec![(id, depth)];
        while let Some((n, d)) = stack.pop() {
            self.node_mut(n).depth = d;
            let kids = self.node(n).children.clone();
            for c in kids {
                stack.push((c, d + 1));
            }
        }
    }

    fn child_index(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.node(parent).children.iter().position(|&c| c == child)
    }

    fn link_child(&mut self, parent: NodeId, child: NodeId, index: usize) {
        let (prev, next) = {
            let siblings = &self.node(parent).children;
            let prev = index.checked_sub(1).map(|i| siblings[i]);
            let next = siblings.get(index).copied();
            (prev, next)
        };
        self.node_mut(parent).children.insert(index, child);
        if let Some(p) = prev {
            self.node_mut(p).next = Some(child);
        }
        if let Some(nx) = next {
            self.node_mut(nx).prev = Some(child);
        }
        {
            let c = self.node_mut(child);
            c.parent = Some(parent);
            c.prev = prev;
            c.next = next;
        }
        let base = self.node(parent).depth + 1;
        self.refresh_depths(child, base);
        if self.is_attached(parent) {
            self.index_subtree(child, true);
        }
        self.mark_dirty(parent);
    }

    /// Detach `id` from its parent, releasing ownership. Sibling links and
    /// the identifier index are kept consistent; no-op for detached nodes.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.node(id).parent else {
            return;
        };
        if self.is_attached(parent) {
            self.index_subtree(id, false);
        }
        let index = self
            .child_index(parent, id)
            .expect("child list consistent with parent link");
        self.node_mut(parent).children.remove(index);
        let prev = self.node(id).prev;
        let next = self.node(id).next;
        if let Some(p) = prev {
            self.node_mut(p).next = next;
        }
        if let Some(nx) = next {
            self.node_mut(nx).prev = prev;
        }
        {
            let n = self.node_mut(id);
            n.parent = None;
            n.prev = None;
            n.next = None;
        }
        self.mark_dirty(parent);
    }

    /// Append `child` as the last child of `parent`. A node attached
    /// elsewhere is detached first; attaching a node into its own subtree
    /// or past the depth bound fails.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<NodeId, HtmlError> {
        self.pre_attach_checks(parent, child)?;
        self.detach(child);
        let index = self.node(parent).children.len();
        self.link_child(parent, child, index);
        Ok(child)
    }

    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) -> Result<NodeId, HtmlError> {
        self.pre_attach_checks(parent, child)?;
        self.detach(child);
        self.link_child(parent, child, 0);
        Ok(child)
    }

    pub fn insert_before(
        &mut self,
        parent: NodeId,
        new: NodeId,
        ref_child: NodeId,
    ) -> Result<NodeId, HtmlError> {
        if self.node(ref_child).parent != Some(parent) {
            return Err(HtmlError::NotAChild);
        }
        if new == ref_child {
            return Ok(new);
        }
        self.pre_attach_checks(parent, new)?;
        self.detach(new);
        let index = self
            .child_index(parent, ref_child)
            .ok_or(HtmlError::NotAChild)?;
        self.link_child(parent, new, index);
        Ok(new)
    }

    pub fn insert_after(
        &mut self,
        parent: NodeId,
        new: NodeId,
        ref_child: NodeId,
    ) -> Result<NodeId, HtmlError> {
        if self.node(ref_child).parent != Some(parent) {
            return Err(HtmlError::NotAChild);
        }
        if new == ref_child {
            return Ok(new);
        }
        self.pre_attach_checks(parent, new)?;
        self.detach(new);
        let index = self
            .child_index(parent, ref_child)
            .ok_or(HtmlError::NotAChild)?;
        self.link_child(parent, new, index + 1);
        Ok(new)
    }

    pub fn replace_child(
        &mut self,
        parent: NodeId,
        new: NodeId,
        old: NodeId,
    ) -> Result<NodeId, HtmlError> {
        if self.node(old).parent != Some(parent) {
            return Err(HtmlError::NotAChild);
        }
        if new == old {
            return Ok(new);
        }
        self.pre_attach_checks(parent, new)?;
        self.detach(new);
        let index = self
            .child_index(parent, old)
            .ok_or(HtmlError::NotAChild)?;
        self.detach(old);
        self.link_child(parent, new, index);
        Ok(new)
    }

    /// Remove `old` from `parent`. With `keep_grandchildren`, `old`'s
    /// children are spliced into `parent` at `old`'s former position, in
    /// order.
    pub fn remove_child(
        &mut self,
        parent: NodeId,
        old: NodeId,
        keep_grandchildren: bool,
    ) -> Result<NodeId, HtmlError> {
        if self.node(old).parent != Some(parent) {
            return Err(HtmlError::NotAChild);
        }
        let index = self
            .child_index(parent, old)
            .expect("child list consistent with parent link");
        if keep_grandchildren {
            let grandchildren: Vec<NodeId> = self.node(old).children.clone();
            for &gc in &grandchildren {
                self.detach(gc);
            }
            self.detach(old);
            for (offset, gc) in grandchildren.into_iter().enumerate() {
                self.link_child(parent, gc, index + offset);
            }
        } else {
            self.detach(old);
        }
        Ok(old)
    }

    pub fn remove_all_children(&mut self, parent: NodeId) {
        let kids: Vec<NodeId> = self.node(parent).children.clone();
        for k in kids {
            self.detach(k);
        }
    }

    /// Structurally independent, detached copy of a node: attributes, end
    /// node, and (when `deep`) the whole subtree.
    pub fn clone_node(&mut self, id: NodeId, deep: bool) -> NodeId {
        let mut data = self.node(id).clone();
        data.parent = None;
        data.prev = None;
        data.next = None;
        let children = std::mem::take(&mut data.children);
        let end = data.end_node;
        data.end_node = None;
        let new_id = self.push_node(data);
        match end {
            Some(e) if e == id => {
                self.node_mut(new_id).end_node = Some(new_id);
            }
            Some(e) => {
                let mut end_data = self.node(e).clone();
                end_data.parent = None;
                end_data.prev = None;
                end_data.next = None;
                end_data.children.clear();
                end_data.end_node = None;
                let new_end = self.push_node(end_data);
                self.node_mut(new_end).end_node = Some(new_end);
                self.node_mut(new_id).end_node = Some(new_end);
            }
            None => {}
        }
        if deep {
            for child in children {
                let c = self.clone_node(child, true);
                let index = self.node(new_id).children.len();
                let prev = self.node(new_id).children.last().copied();
                self.node_mut(new_id).children.insert(index, c);
                if let Some(p) = prev {
                    self.node_mut(p).next = Some(c);
                }
                let cd = self.node_mut(c);
                cd.parent = Some(new_id);
                cd.prev = prev;
                cd.next = None;
            }
        }
        new_id
    }

    // --- attributes --------------------------------------------------------

    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        &self.node(id).attributes
    }

    /// Attributes scanned on the closing tag (`</div foo>`), if any.
    pub fn closing_attributes(&self, id: NodeId) -> &[Attribute] {
        match self.node(id).end_node {
            Some(e) if e != id => &self.node(e).attributes,
            _ => &[],
        }
    }

    fn find_attribute(&self, id: NodeId, name: &str) -> Option<usize> {
        let prefer = self.options.prefer_original_case;
        self.node(id).attributes.iter().position(|a| {
            if prefer {
                a.raw_name(&self.text) == name
            } else {
                a.resolved_name(&self.text).eq_ignore_ascii_case(name)
            }
        })
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.find_attribute(id, name).is_some()
    }

    /// Decoded attribute value; `Some("")` for a bare attribute.
    pub fn attribute_value(&self, id: NodeId, name: &str) -> Option<&str> {
        let i = self.find_attribute(id, name)?;
        let a = &self.node(id).attributes[i];
        Some(a.decoded_value(
            &self.text,
            !self.options.backward_compatible_entity_decoding,
        ))
    }

    pub fn get_attribute_value<'a>(&'a self, id: NodeId, name: &str, default: &'a str) -> &'a str {
        self.attribute_value(id, name).unwrap_or(default)
    }

    /// Set (creating if absent) an attribute value.
    pub fn set_attribute_value(
        &mut self,
        id: NodeId,
        name: &str,
        value: &str,
    ) -> Result<(), HtmlError> {
        if self.node(id).kind != NodeType::Element {
            return Err(HtmlError::NotAnElement);
        }
        let is_id = name.eq_ignore_ascii_case("id");
        let old_id_value = if is_id { self.id_attribute_of(id) } else { None };
        match self.find_attribute(id, name) {
            Some(i) => self.node_mut(id).attributes[i].set_value(value),
            None => self
                .node_mut(id)
                .attributes
                .push(Attribute::new(name, value)),
        }
        if is_id && self.is_attached(id) {
            if let Some(old) = old_id_value {
                self.index_remove(&old, id);
            }
            self.index_insert(value.to_string(), id);
        }
        self.mark_dirty(id);
        Ok(())
    }

    /// Remove an attribute by name; true if one was removed.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> bool {
        let Some(i) = self.find_attribute(id, name) else {
            return false;
        };
        if name.eq_ignore_ascii_case("id") && self.is_attached(id) {
            if let Some(old) = self.id_attribute_of(id) {
                self.index_remove(&old, id);
            }
        }
        self.node_mut(id).attributes.remove(i);
        self.mark_dirty(id);
        true
    }

    /// Append a factory-built attribute.
    pub fn append_attribute(&mut self, id: NodeId, attr: Attribute) -> Result<(), HtmlError> {
        if self.node(id).kind != NodeType::Element {
            return Err(HtmlError::NotAnElement);
        }
        let is_id = attr.resolved_name(&self.text) == "id";
        self.node_mut(id).attributes.push(attr);
        if is_id && self.is_attached(id) {
            if let Some(value) = self.id_attribute_of(id) {
                self.index_insert(value, id);
            }
        }
        self.mark_dirty(id);
        Ok(())
    }

    // --- class helpers -----------------------------------------------------

    pub fn classes(&self, id: NodeId) -> impl Iterator<Item = &str> {
        self.attribute_value(id, "class")
            .unwrap_or("")
            .split_ascii_whitespace()
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.classes(id).any(|c| c == class)
    }

    /// Add a class token. A duplicate is a no-op, or an error when
    /// `strict`.
    pub fn add_class(&mut self, id: NodeId, class: &str, strict: bool) -> Result<(), HtmlError> {
        if self.node(id).kind != NodeType::Element {
            return Err(HtmlError::NotAnElement);
        }
        let current = self.attribute_value(id, "class").map(str::to_string);
        match current {
            None => self.set_attribute_value(id, "class", class),
            Some(v) => {
                if v.split_ascii_whitespace().any(|c| c == class) {
                    if strict {
                        return Err(HtmlError::DuplicateClass(class.to_string()));
                    }
                    return Ok(());
                }
                let joined = if v.is_empty() {
                    class.to_string()
                } else {
                    format!("{v} {class}")
                };
                self.set_attribute_value(id, "class", &joined)
            }
        }
    }

    /// Remove a class token; removing the last one removes the attribute.
    /// A missing token is a no-op, or an error when `strict`.
    pub fn remove_class(&mut self, id: NodeId, class: &str, strict: bool) -> Result<(), HtmlError> {
        if self.node(id).kind != NodeType::Element {
            return Err(HtmlError::NotAnElement);
        }
        let current = self.attribute_value(id, "class").map(str::to_string);
        let Some(v) = current else {
            if strict {
                return Err(HtmlError::ClassNotFound(class.to_string()));
            }
            return Ok(());
        };
        if !v.split_ascii_whitespace().any(|c| c == class) {
            if strict {
                return Err(HtmlError::ClassNotFound(class.to_string()));
            }
            return Ok(());
        }
        let remaining = v
            .split_ascii_whitespace()
            .filter(|c| *c != class)
            .collect::<Vec<_>>()
            .join(" ");
        if remaining.is_empty() {
            self.remove_attribute(id, "class");
            Ok(())
        } else {
            self.set_attribute_value(id, "class", &remaining)
        }
    }

    /// Drop the whole `class` attribute; true if it existed.
    pub fn remove_class_attribute(&mut self, id: NodeId) -> bool {
        self.remove_attribute(id, "class")
    }

    pub fn replace_class(
        &mut self,
        id: NodeId,
        new: &str,
        old: &str,
        strict: bool,
    ) -> Result<(), HtmlError> {
        if self.node(id).kind != NodeType::Element {
            return Err(HtmlError::NotAnElement);
        }
        let current = self.attribute_value(id, "class").map(str::to_string);
        let Some(v) = current else {
            if strict {
                return Err(HtmlError::ClassNotFound(old.to_string()));
            }
            return Ok(());
        };
        if !v.split_ascii_whitespace().any(|c| c == old) {
            if strict {
                return Err(HtmlError::ClassNotFound(old.to_string()));
            }
            return Ok(());
        }
        let replaced = v
            .split_ascii_whitespace()
            .map(|c| if c == old { new } else { c })
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attribute_value(id, "class", &replaced)
    }

    // --- markup reads and writes -------------------------------------------

    /// The node's full markup. Clean parsed nodes return the source slice;
    /// anything else renders once and caches (the dirty flag clears, so a
    /// second read does no rendering work).
    pub fn outer_html(&mut self, id: NodeId) -> String {
        {
            let n = self.node(id);
            if !n.dirty {
                if let Some(cached) = &n.cached_outer {
                    return cached.clone();
                }
                if n.came_from_parse && !self.options.output_as_xml {
                    return self.outer_source(id).to_string();
                }
            }
        }
        let mut out = String::new();
        serializer::write_node(self, id, &mut out);
        let n = self.node_mut(id);
        n.cached_outer = Some(out.clone());
        n.dirty = false;
        out
    }

    /// Markup of the node's children (the content of a text/comment node).
    pub fn inner_html(&mut self, id: NodeId) -> String {
        {
            let n = self.node(id);
            match n.kind {
                NodeType::Text | NodeType::Comment => {
                    return n.content.get(&self.text).to_string();
                }
                _ => {}
            }
            if !n.dirty && n.came_from_parse && !self.options.output_as_xml {
                return self.inner_source(id).to_string();
            }
        }
        let kids: Vec<NodeId> = self.node(id).children.clone();
        let mut out = String::new();
        for k in kids {
            out.push_str(&self.outer_html(k));
        }
        out
    }

    /// Parse `html` as a standalone fragment and replace all children with
    /// the result.
    pub fn set_inner_html(&mut self, id: NodeId, html: &str) -> Result<(), HtmlError> {
        if !matches!(self.node(id).kind, NodeType::Document | NodeType::Element) {
            return Err(HtmlError::NotAnElement);
        }
        let fragment = Document::parse(html, self.options.clone())?;
        log::debug!(
            target: "htmldom.document",
            "replacing children of node {} with a {}-byte fragment",
            id.0,
            html.len()
        );
        self.remove_all_children(id);
        let roots: Vec<NodeId> = fragment.children(fragment.root()).to_vec();
        for r in roots {
            let imported = self.import_node(&fragment, r);
            self.append_child(id, imported)?;
        }
        Ok(())
    }

    /// Deep-copy a node from another document, materializing every lazy
    /// string (the other document's source buffer is not carried over).
    fn import_node(&mut self, src: &Document, sid: NodeId) -> NodeId {
        let sn = src.node(sid);
        let mut data = NodeData::new(sn.kind);
        data.markup = sn.markup;
        data.implicit_end = sn.implicit_end;
        match sn.kind {
            NodeType::Element => {
                data.name = RawText::Owned(sn.name.get(&src.text).to_string());
                data.attributes = sn
                    .attributes
                    .iter()
                    .map(|a| a.materialized(&src.text))
                    .collect();
            }
            NodeType::Text | NodeType::Comment => {
                data.content = RawText::Owned(sn.content.get(&src.text).to_string());
            }
            NodeType::Document => {}
        }
        let id = self.push_node(data);
        self.node_mut(id).end_node = Some(id);
        let kids: Vec<NodeId> = src.node(sid).children.clone();
        for k in kids {
            let c = self.import_node(src, k);
            let prev = self.node(id).children.last().copied();
            self.node_mut(id).children.push(c);
            if let Some(p) = prev {
                self.node_mut(p).next = Some(c);
            }
            let cd = self.node_mut(c);
            cd.parent = Some(id);
            cd.prev = prev;
        }
        id
    }

    /// Concatenated text of all descendant text nodes, entities decoded;
    /// comments contribute nothing.
    pub fn inner_text(&self, id: NodeId) -> String {
        let mut out = String::new();
        for n in self.descendants_and_self(id) {
            if self.node(n).kind == NodeType::Text {
                let raw = self.node(n).content.get(&self.text);
                if self.options.backward_compatible_entity_decoding {
                    out.push_str(raw);
                } else {
                    out.push_str(&decode_entities(raw));
                }
            }
        }
        out
    }

    /// The whole document as markup (equivalent to `outer_html(root())`).
    pub fn to_html(&mut self) -> String {
        self.outer_html(self.root())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParseOptions;

    #[test]
    fn factory_nodes_are_detached_and_synthetic() {
        let mut doc = Document::new(ParseOptions::default());
        let div = doc.create_element("div");
        assert_eq!(doc.node_type(div), NodeType::Element);
        assert_eq!(doc.name(div), "div");
        assert!(doc.parent(div).is_none());
        assert!(!doc.came_from_parse(div));

        let text = doc.create_text("hi");
        assert_eq!(doc.name(text), "#text");
        assert_eq!(doc.raw_text(text), Some("hi"));
    }

    #[test]
    fn append_and_detach_maintain_sibling_links() {
        let mut doc = Document::new(ParseOptions::default());
        let root = doc.root();
        let a = doc.create_element("a");
        let b = doc.create_element("b");
        let c = doc.create_element("c");
        doc.append_child(root, a).unwrap();
        doc.append_child(root, b).unwrap();
        doc.append_child(root, c).unwrap();

        assert_eq!(doc.children(root), &[a, b, c]);
        assert_eq!(doc.next_sibling(a), Some(b));
        assert_eq!(doc.prev_sibling(c), Some(b));

        doc.detach(b);
        assert_eq!(doc.children(root), &[a, c]);
        assert_eq!(doc.next_sibling(a), Some(c));
        assert_eq!(doc.prev_sibling(c), Some(a));
        assert!(doc.parent(b).is_none());
        assert!(doc.prev_sibling(b).is_none());
        assert!(doc.next_sibling(b).is_none());
    }

    #[test]
    fn attach_rejects_cycles_and_wrong_parents() {
        let mut doc = Document::new(ParseOptions::default());
        let root = doc.root();
        let outer = doc.create_element("div");
        let inner = doc.create_element("span");
        doc.append_child(root, outer).unwrap();
        doc.append_child(outer, inner).unwrap();

        assert_eq!(
            doc.append_child(inner, outer),
            Err(HtmlError::WouldCreateCycle)
        );
        let text = doc.create_text("x");
        assert_eq!(doc.append_child(text, outer), Err(HtmlError::NotAnElement));

        let stranger = doc.create_element("b");
        assert_eq!(
            doc.insert_before(root, inner, stranger),
            Err(HtmlError::NotAChild)
        );
    }

    #[test]
    fn attach_enforces_depth_bound() {
        let mut doc = Document::new(ParseOptions {
            max_nested_depth: 3,
            ..ParseOptions::default()
        });
        let root = doc.root();
        let a = doc.create_element("a");
        let b = doc.create_element("b");
        let c = doc.create_element("c");
        doc.append_child(root, a).unwrap();
        doc.append_child(a, b).unwrap();
        doc.append_child(b, c).unwrap();
        let d = doc.create_element("d");
        assert!(matches!(
            doc.append_child(c, d),
            Err(HtmlError::TooDeep { depth: 4, .. })
        ));
    }

    #[test]
    fn set_attribute_creates_and_updates() {
        let mut doc = Document::new(ParseOptions::default());
        let div = doc.create_element("div");
        assert!(doc.attribute_value(div, "title").is_none());
        doc.set_attribute_value(div, "title", "a").unwrap();
        assert_eq!(doc.attribute_value(div, "title"), Some("a"));
        doc.set_attribute_value(div, "TITLE", "b").unwrap();
        assert_eq!(doc.attribute_value(div, "title"), Some("b"));
        assert_eq!(doc.attributes(div).len(), 1);
    }

    #[test]
    fn identifier_index_follows_mutations() {
        let mut doc = Document::new(ParseOptions::default());
        let root = doc.root();
        let div = doc.create_element("div");
        doc.set_attribute_value(div, "id", "x").unwrap();
        assert_eq!(doc.element_by_id("x").unwrap(), None, "detached node");

        doc.append_child(root, div).unwrap();
        assert_eq!(doc.element_by_id("x").unwrap(), Some(div));

        doc.set_attribute_value(div, "id", "y").unwrap();
        assert_eq!(doc.element_by_id("x").unwrap(), None);
        assert_eq!(doc.element_by_id("y").unwrap(), Some(div));

        doc.detach(div);
        assert_eq!(doc.element_by_id("y").unwrap(), None);
    }

    #[test]
    fn element_by_id_errors_when_disabled() {
        let doc = Document::new(ParseOptions {
            use_identifier_index: false,
            ..ParseOptions::default()
        });
        assert_eq!(doc.element_by_id("x"), Err(HtmlError::IdIndexDisabled));
    }

    #[test]
    fn class_helpers_cover_add_remove_replace() {
        let mut doc = Document::new(ParseOptions::default());
        let div = doc.create_element("div");
        doc.set_attribute_value(div, "class", "a").unwrap();

        doc.add_class(div, "x", false).unwrap();
        assert_eq!(doc.attribute_value(div, "class"), Some("a x"));

        doc.add_class(div, "x", false).unwrap();
        assert_eq!(doc.attribute_value(div, "class"), Some("a x"));
        assert_eq!(
            doc.add_class(div, "x", true),
            Err(HtmlError::DuplicateClass("x".to_string()))
        );

        doc.remove_class(div, "a", false).unwrap();
        assert_eq!(doc.attribute_value(div, "class"), Some("x"));

        doc.replace_class(div, "y", "x", false).unwrap();
        assert!(doc.has_class(div, "y"));

        doc.remove_class(div, "y", false).unwrap();
        assert!(
            !doc.has_attribute(div, "class"),
            "removing the last class removes the attribute"
        );
        assert_eq!(
            doc.remove_class(div, "y", true),
            Err(HtmlError::ClassNotFound("y".to_string()))
        );
    }

    #[test]
    fn clone_node_is_structurally_independent() {
        let mut doc = Document::new(ParseOptions::default());
        let root = doc.root();
        let div = doc.create_element("div");
        doc.set_attribute_value(div, "class", "a").unwrap();
        let child = doc.create_text("hi");
        doc.append_child(root, div).unwrap();
        doc.append_child(div, child).unwrap();

        let shallow = doc.clone_node(div, false);
        assert!(doc.children(shallow).is_empty());
        assert_eq!(doc.attribute_value(shallow, "class"), Some("a"));

        let deep = doc.clone_node(div, true);
        assert_eq!(doc.children(deep).len(), 1);
        let copy_text = doc.children(deep)[0];
        assert_ne!(copy_text, child);
        assert_eq!(doc.raw_text(copy_text), Some("hi"));

        doc.set_attribute_value(deep, "class", "b").unwrap();
        assert_eq!(doc.attribute_value(div, "class"), Some("a"));
    }
}

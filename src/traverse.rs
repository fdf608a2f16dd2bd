//! Traversal iterators and positional XPath.
//!
//! Every sequence here is lazy, finite, and restartable: calling the
//! accessor again yields a fresh iterator. Depth is enforced at attach time
//! (see `Document::pre_attach_checks`), so descent cannot run away; the
//! stack bound is debug-asserted.

use crate::document::Document;
use crate::node::{NodeId, NodeType};

pub struct Ancestors<'d> {
    doc: &'d Document,
    cur: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.cur?;
        self.cur = self.doc.parent(id);
        Some(id)
    }
}

/// Pre-order, depth-first descent over a subtree.
pub struct Descendants<'d> {
    doc: &'d Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        debug_assert!(
            self.doc.depth(id) <= self.doc.options().max_nested_depth + 1,
            "attach-time depth guard violated"
        );
        for &child in self.doc.children(id).iter().rev() {
            self.stack.push(child);
        }
        Some(id)
    }
}

impl Document {
    /// Walk from the parent up to the root.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            cur: self.parent(id),
        }
    }

    pub fn ancestors_and_self(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            cur: Some(id),
        }
    }

    /// All descendants in document order, the node itself excluded.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let mut stack: Vec<NodeId> = self.children(id).to_vec();
        stack.reverse();
        Descendants { doc: self, stack }
    }

    pub fn descendants_and_self(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            stack: vec![id],
        }
    }

    fn name_matches(&self, id: NodeId, name: &str) -> bool {
        if self.node_type(id) != NodeType::Element {
            return false;
        }
        if self.options().prefer_original_case {
            self.original_name(id) == name
        } else {
            self.name(id).eq_ignore_ascii_case(name)
        }
    }

    /// Direct element children with the given tag name.
    pub fn elements_named<'a>(
        &'a self,
        parent: NodeId,
        name: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.children(parent)
            .iter()
            .copied()
            .filter(move |&c| self.name_matches(c, name))
    }

    /// First direct element child with the given tag name.
    pub fn element_named(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.elements_named(parent, name).next()
    }

    /// All descendant elements with the given tag name, in document order.
    pub fn descendants_named<'a>(
        &'a self,
        id: NodeId,
        name: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.descendants(id)
            .filter(move |&d| self.name_matches(d, name))
    }

    /// 1-indexed positional XPath of the node, counting same-name preceding
    /// siblings at each level. Text and comment steps render as `text()[n]`
    /// and `comment()[n]`.
    pub fn xpath_of(&self, id: NodeId) -> String {
        if self.node_type(id) == NodeType::Document {
            return "/".to_string();
        }
        let mut steps = Vec::new();
        let mut cur = id;
        loop {
            if self.node_type(cur) == NodeType::Document {
                break;
            }
            steps.push(self.xpath_step(cur));
            match self.parent(cur) {
                Some(p) => cur = p,
                None => break,
            }
        }
        let mut out = String::new();
        for step in steps.iter().rev() {
            out.push('/');
            out.push_str(step);
        }
        out
    }

    fn xpath_step(&self, id: NodeId) -> String {
        let index = self.xpath_index(id);
        match self.node_type(id) {
            NodeType::Element => format!("{}[{index}]", self.name(id)),
            NodeType::Text => format!("text()[{index}]"),
            NodeType::Comment => format!("comment()[{index}]"),
            NodeType::Document => "/".to_string(),
        }
    }

    /// 1 + the number of preceding siblings this step has to skip over.
    fn xpath_index(&self, id: NodeId) -> usize {
        let kind = self.node_type(id);
        let mut index = 1;
        let mut cur = self.prev_sibling(id);
        while let Some(p) = cur {
            let same = match kind {
                NodeType::Element => {
                    self.node_type(p) == NodeType::Element
                        && self.name(p).eq_ignore_ascii_case(self.name(id))
                }
                other => self.node_type(p) == other,
            };
            if same {
                index += 1;
            }
            cur = self.prev_sibling(p);
        }
        index
    }
}

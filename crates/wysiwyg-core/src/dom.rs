use std::cmp::Ordering;

use indexmap::{IndexMap, IndexSet};
use slotmap::{SlotMap, new_key_type};
use thiserror::Error;

new_key_type! { pub struct NodeId; }

pub const ZERO_WIDTH_SPACE: char = '\u{200B}';

const VOID_TAGS: &[&str] = &[
    "AREA", "BR", "COL", "EMBED", "HR", "IMG", "INPUT", "LINK", "META", "SOURCE", "WBR",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    #[error("node does not exist in this document")]
    UnknownNode,
    #[error("node cannot be inserted into its own subtree")]
    HierarchyRequest,
    #[error("reference node is not a child of the parent")]
    NotAChild,
    #[error("text nodes cannot have children")]
    NotAContainer,
    #[error("offset {offset} is larger than the node length {len}")]
    IndexSize { offset: usize, len: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub tag: String,
    pub attrs: IndexMap<String, String>,
    pub classes: IndexSet<String>,
    pub style: IndexMap<String, String>,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_uppercase(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
struct NodeEntry {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Mutable node tree with stable identities.
///
/// Nodes created but never attached (or detached later) stay addressable until
/// they are removed, which is how a "detached node" shows up to range code.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: SlotMap<NodeId, NodeEntry>,
    root: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(NodeEntry {
            data: NodeData::Element(Element::new("#document")),
            parent: None,
            children: Vec::new(),
        });
        Self { nodes, root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.nodes.insert(NodeEntry {
            data: NodeData::Element(Element::new(tag)),
            parent: None,
            children: Vec::new(),
        })
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.nodes.insert(NodeEntry {
            data: NodeData::Text(text.into()),
            parent: None,
            children: Vec::new(),
        })
    }

    pub fn is_alive(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id).map(|n| &n.data)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.data(id)? {
            NodeData::Element(el) => Some(el),
            NodeData::Text(_) => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes.get_mut(id)?.data {
            NodeData::Element(el) => Some(el),
            NodeData::Text(_) => None,
        }
    }

    pub fn node_name(&self, id: NodeId) -> &str {
        match self.data(id) {
            Some(NodeData::Element(el)) => &el.tag,
            Some(NodeData::Text(_)) => "#text",
            None => "",
        }
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.data(id), Some(NodeData::Text(_)))
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.data(id), Some(NodeData::Element(_)))
    }

    pub fn is_tag(&self, id: NodeId, tag: &str) -> bool {
        self.element(id)
            .is_some_and(|el| el.tag.eq_ignore_ascii_case(tag))
    }

    pub fn is_break(&self, id: NodeId) -> bool {
        self.is_tag(id, "BR")
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id)?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn has_children(&self, id: NodeId) -> bool {
        !self.children(id).is_empty()
    }

    pub fn child(&self, id: NodeId, ix: usize) -> Option<NodeId> {
        self.children(id).get(ix).copied()
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).last().copied()
    }

    pub fn first_element_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|&c| self.is_element(c))
    }

    pub fn last_element_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id)
            .iter()
            .rev()
            .copied()
            .find(|&c| self.is_element(c))
    }

    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        self.child(parent, self.index_of(id)? + 1)
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let ix = self.index_of(id)?.checked_sub(1)?;
        self.child(parent, ix)
    }

    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let ix = self.index_of(id)?;
        self.children(parent)
            .iter()
            .skip(ix + 1)
            .copied()
            .find(|&c| self.is_element(c))
    }

    pub fn previous_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let ix = self.index_of(id)?;
        self.children(parent)[..ix]
            .iter()
            .rev()
            .copied()
            .find(|&c| self.is_element(c))
    }

    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&n| self.parent(n))
    }

    /// Inclusive containment. Dead nodes are never contained.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        if !self.is_alive(ancestor) || !self.is_alive(node) {
            return false;
        }
        node == ancestor || self.ancestors(node).any(|a| a == ancestor)
    }

    pub fn is_connected(&self, id: NodeId) -> bool {
        self.contains(self.root, id)
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.insert_before(parent, child, None)
    }

    /// Inserts `child` before `reference`, or appends it when `reference` is `None`.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        if !self.is_alive(parent) || !self.is_alive(child) {
            return Err(DomError::UnknownNode);
        }
        if self.is_text(parent) {
            return Err(DomError::NotAContainer);
        }
        if self.contains(child, parent) {
            return Err(DomError::HierarchyRequest);
        }
        if let Some(reference) = reference {
            if reference == child {
                return Ok(());
            }
            if self.parent(reference) != Some(parent) {
                return Err(DomError::NotAChild);
            }
        }

        self.detach(child);

        let ix = match reference {
            Some(reference) => self
                .index_of(reference)
                .ok_or(DomError::NotAChild)?,
            None => self.children(parent).len(),
        };
        self.nodes[parent].children.insert(ix, child);
        self.nodes[child].parent = Some(parent);
        Ok(())
    }

    /// Unlinks the node from its parent, keeping it (and its subtree) alive.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(entry) = self.nodes.get_mut(parent) {
            entry.children.retain(|&c| c != id);
        }
        if let Some(entry) = self.nodes.get_mut(id) {
            entry.parent = None;
        }
    }

    /// Unlinks the node and frees its whole subtree.
    pub fn remove(&mut self, id: NodeId) {
        if id == self.root {
            return;
        }
        self.detach(id);
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(entry) = self.nodes.remove(next) {
                stack.extend(entry.children);
            }
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.data(id)? {
            NodeData::Text(t) => Some(t),
            NodeData::Element(_) => None,
        }
    }

    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        if let Some(NodeData::Text(t)) = self.nodes.get_mut(id).map(|n| &mut n.data) {
            *t = text.into();
        }
    }

    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match self.data(id) {
            Some(NodeData::Text(t)) => out.push_str(t),
            Some(NodeData::Element(_)) => {
                for &child in self.children(id) {
                    self.collect_text(child, out);
                }
            }
            None => {}
        }
    }

    /// Length of the node's text content in chars.
    pub fn text_len(&self, id: NodeId) -> usize {
        match self.data(id) {
            Some(NodeData::Text(t)) => t.chars().count(),
            Some(NodeData::Element(_)) => self
                .children(id)
                .iter()
                .map(|&c| self.text_len(c))
                .sum(),
            None => 0,
        }
    }

    /// Boundary length: chars for text nodes, child count for elements.
    pub fn node_len(&self, id: NodeId) -> usize {
        match self.data(id) {
            Some(NodeData::Text(t)) => t.chars().count(),
            Some(NodeData::Element(_)) => self.children(id).len(),
            None => 0,
        }
    }

    /// Splits a text node at a char offset. The new node holds the tail and is
    /// inserted right after the original.
    pub fn split_text(&mut self, id: NodeId, offset: usize) -> Result<NodeId, DomError> {
        let Some(text) = self.text(id) else {
            return Err(DomError::UnknownNode);
        };
        let len = text.chars().count();
        if offset > len {
            return Err(DomError::IndexSize { offset, len });
        }
        let byte_ix = char_to_byte(text, offset);
        let tail = text[byte_ix..].to_string();
        let head = text[..byte_ix].to_string();
        self.set_text(id, head);
        let new_node = self.create_text(tail);
        if let Some(parent) = self.parent(id) {
            let next = self.next_sibling(id);
            self.insert_before(parent, new_node, next)?;
        }
        Ok(new_node)
    }

    pub fn path_of(&self, ancestor: NodeId, node: NodeId) -> Option<Vec<usize>> {
        if !self.contains(ancestor, node) {
            return None;
        }
        let mut path = Vec::new();
        let mut current = node;
        while current != ancestor {
            path.push(self.index_of(current)?);
            current = self.parent(current)?;
        }
        path.reverse();
        Some(path)
    }

    pub fn node_at_path(&self, ancestor: NodeId, path: &[usize]) -> Option<NodeId> {
        let mut node = ancestor;
        for &ix in path {
            node = self.child(node, ix)?;
        }
        Some(node)
    }

    pub fn common_ancestor(&self, a: NodeId, b: NodeId) -> Option<NodeId> {
        if !self.is_alive(a) || !self.is_alive(b) {
            return None;
        }
        std::iter::once(a)
            .chain(self.ancestors(a))
            .find(|&candidate| self.contains(candidate, b))
    }

    /// Document order of two nodes; an ancestor sorts before its descendants.
    /// `None` when they do not share a tree.
    pub fn compare_order(&self, a: NodeId, b: NodeId) -> Option<Ordering> {
        if a == b {
            return self.is_alive(a).then_some(Ordering::Equal);
        }
        let top = self.common_ancestor(a, b)?;
        let path_a = self.path_of(top, a)?;
        let path_b = self.path_of(top, b)?;
        Some(path_a.cmp(&path_b))
    }

    /// Walks down the first (or last) child chain from `node` and returns the
    /// first node accepted by `pred`.
    pub fn edge_child(
        &self,
        node: NodeId,
        pred: impl Fn(&Self, NodeId) -> bool,
        last: bool,
    ) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(n) = current {
            if pred(self, n) {
                return Some(n);
            }
            current = if last {
                self.last_child(n)
            } else {
                self.first_child(n)
            };
        }
        None
    }

    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.is_text(id) || !self.has_children(id)
    }

    /// Descendants of `id` in document order (excluding `id`) accepted by `pred`.
    pub fn descendants_where(&self, id: NodeId, pred: impl Fn(&Self, NodeId) -> bool) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            if pred(self, next) {
                out.push(next);
            }
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Nearest inclusive ancestor accepted by `pred`.
    pub fn closest(&self, id: NodeId, pred: impl Fn(&Self, NodeId) -> bool) -> Option<NodeId> {
        if !self.is_alive(id) {
            return None;
        }
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|&n| pred(self, n))
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.attrs.get(name).map(String::as_str)
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        if let Some(el) = self.element_mut(id) {
            el.attrs.insert(name.to_string(), value.into());
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let Some(el) = self.element_mut(id) {
            el.attrs.shift_remove(name);
        }
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id).is_some_and(|el| el.classes.contains(class))
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if let Some(el) = self.element_mut(id) {
            el.classes.insert(class.to_string());
        }
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        if let Some(el) = self.element_mut(id) {
            el.classes.shift_remove(class);
        }
    }

    pub fn style(&self, id: NodeId, prop: &str) -> Option<&str> {
        self.element(id)?.style.get(prop).map(String::as_str)
    }

    /// Sets an inline style property; an empty value removes it.
    pub fn set_style(&mut self, id: NodeId, prop: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(el) = self.element_mut(id) {
            if value.is_empty() {
                el.style.shift_remove(prop);
            } else {
                el.style.insert(prop.to_string(), value);
            }
        }
    }

    pub fn set_style_text(&mut self, id: NodeId, css: &str) {
        if let Some(el) = self.element_mut(id) {
            el.style = parse_style_text(css);
        }
    }

    pub fn is_displayed(&self, id: NodeId) -> bool {
        self.style(id, "display") != Some("none")
    }

    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_html(id, &mut out);
        out
    }

    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for &child in self.children(id) {
            self.write_html(child, &mut out);
        }
        out
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        match self.data(id) {
            Some(NodeData::Text(t)) => escape_into(t, out),
            Some(NodeData::Element(el)) => {
                let tag = el.tag.to_ascii_lowercase();
                out.push('<');
                out.push_str(&tag);
                if !el.classes.is_empty() {
                    out.push_str(" class=\"");
                    let joined = el.classes.iter().cloned().collect::<Vec<_>>().join(" ");
                    escape_into(&joined, out);
                    out.push('"');
                }
                if !el.style.is_empty() {
                    out.push_str(" style=\"");
                    escape_into(&style_text(&el.style), out);
                    out.push('"');
                }
                for (k, v) in &el.attrs {
                    out.push(' ');
                    out.push_str(k);
                    out.push_str("=\"");
                    escape_into(v, out);
                    out.push('"');
                }
                out.push('>');
                if VOID_TAGS.contains(&el.tag.as_str()) {
                    return;
                }
                for &child in self.children(id) {
                    self.write_html(child, out);
                }
                out.push_str("</");
                out.push_str(&tag);
                out.push('>');
            }
            None => {}
        }
    }
}

pub fn char_to_byte(s: &str, char_ix: usize) -> usize {
    s.char_indices()
        .nth(char_ix)
        .map(|(b, _)| b)
        .unwrap_or(s.len())
}

pub fn style_text(style: &IndexMap<String, String>) -> String {
    style
        .iter()
        .map(|(k, v)| format!("{k}: {v};"))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn parse_style_text(css: &str) -> IndexMap<String, String> {
    css.split(';')
        .filter_map(|decl| {
            let (k, v) = decl.split_once(':')?;
            let (k, v) = (k.trim(), v.trim());
            (!k.is_empty() && !v.is_empty()).then(|| (k.to_string(), v.to_string()))
        })
        .collect()
}

fn escape_into(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

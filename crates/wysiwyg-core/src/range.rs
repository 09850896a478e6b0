use std::cmp::Ordering;

use thiserror::Error;

use crate::dom::{Document, NodeId, char_to_byte};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("range boundary node is not attached to the document")]
    Detached,
    #[error("range offset {offset} exceeds node length {len}")]
    IndexSize { offset: usize, len: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Boundary {
    pub node: NodeId,
    pub offset: usize,
}

impl Boundary {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// Ordered pair of boundary points, validated against a document at
/// construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    start: Boundary,
    end: Boundary,
}

impl Range {
    /// Mirrors `setStart` followed by `setEnd`: each boundary must be attached
    /// and in bounds, and an end placed before the start collapses the range
    /// onto the end.
    pub fn new(
        doc: &Document,
        start: NodeId,
        start_offset: usize,
        end: NodeId,
        end_offset: usize,
    ) -> Result<Self, RangeError> {
        let start = validate_boundary(doc, start, start_offset)?;
        let end = validate_boundary(doc, end, end_offset)?;
        match compare_boundaries(doc, &start, &end) {
            Some(Ordering::Greater) => Ok(Self { start: end, end }),
            Some(_) => Ok(Self { start, end }),
            None => Err(RangeError::Detached),
        }
    }

    /// Caller guarantees both boundaries are attached, in bounds and ordered.
    pub(crate) fn from_parts(start: Boundary, end: Boundary) -> Self {
        Self { start, end }
    }

    pub fn collapsed_at(doc: &Document, node: NodeId, offset: usize) -> Result<Self, RangeError> {
        Self::new(doc, node, offset, node, offset)
    }

    pub fn start(&self) -> Boundary {
        self.start
    }

    pub fn end(&self) -> Boundary {
        self.end
    }

    pub fn start_container(&self) -> NodeId {
        self.start.node
    }

    pub fn start_offset(&self) -> usize {
        self.start.offset
    }

    pub fn end_container(&self) -> NodeId {
        self.end.node
    }

    pub fn end_offset(&self) -> usize {
        self.end.offset
    }

    pub fn collapsed(&self) -> bool {
        self.start == self.end
    }

    pub fn common_ancestor(&self, doc: &Document) -> Option<NodeId> {
        doc.common_ancestor(self.start.node, self.end.node)
    }

    /// Whether both boundaries still resolve inside the document.
    pub fn is_valid_in(&self, doc: &Document) -> bool {
        validate_boundary(doc, self.start.node, self.start.offset).is_ok()
            && validate_boundary(doc, self.end.node, self.end.offset).is_ok()
    }

    /// Selected text, in document order.
    pub fn to_text(&self, doc: &Document) -> String {
        let Some(top) = self.common_ancestor(doc) else {
            return String::new();
        };
        let mut texts = doc.descendants_where(top, |d, n| d.is_text(n));
        if doc.is_text(top) {
            texts.push(top);
        }

        let mut out = String::new();
        for t in texts {
            let Some((s, e)) = self.text_span(doc, t) else {
                continue;
            };
            let text = doc.text(t).unwrap_or("");
            out.push_str(&text[char_to_byte(text, s)..char_to_byte(text, e)]);
        }
        out
    }

    /// Removes the selected content and returns the collapsed range at the
    /// start boundary. Boundary containers and their ancestors survive.
    pub fn delete_contents(&self, doc: &mut Document) -> Result<Range, RangeError> {
        let top = self.common_ancestor(doc).ok_or(RangeError::Detached)?;

        let mut removals: Vec<NodeId> = Vec::new();
        let mut trims: Vec<(NodeId, usize, usize)> = Vec::new();
        if doc.is_text(top) {
            if let Some((s, e)) = self.text_span(doc, top) {
                trims.push((top, s, e));
            }
        } else {
            self.collect_deletions(doc, top, &mut removals, &mut trims);
        }

        for (node, s, e) in trims {
            let Some(text) = doc.text(node) else {
                continue;
            };
            let mut next = text.to_string();
            next.replace_range(char_to_byte(text, s)..char_to_byte(text, e), "");
            doc.set_text(node, next);
        }
        for node in removals {
            doc.remove(node);
        }

        Range::collapsed_at(doc, self.start.node, self.start.offset)
    }

    fn collect_deletions(
        &self,
        doc: &Document,
        parent: NodeId,
        removals: &mut Vec<NodeId>,
        trims: &mut Vec<(NodeId, usize, usize)>,
    ) {
        for (ix, &child) in doc.children(parent).iter().enumerate() {
            let before = Boundary::new(parent, ix);
            let after = Boundary::new(parent, ix + 1);
            let starts_inside =
                compare_boundaries(doc, &self.start, &before) != Some(Ordering::Greater);
            let ends_inside = compare_boundaries(doc, &after, &self.end) != Some(Ordering::Greater);
            let holds_boundary =
                doc.contains(child, self.start.node) || doc.contains(child, self.end.node);

            if doc.is_text(child) {
                if let Some((s, e)) = self.text_span(doc, child) {
                    trims.push((child, s, e));
                }
            } else if starts_inside && ends_inside && !holds_boundary {
                removals.push(child);
            } else {
                self.collect_deletions(doc, child, removals, trims);
            }
        }
    }

    /// Char span of text node `t` covered by this range, if non-empty.
    pub fn text_span(&self, doc: &Document, t: NodeId) -> Option<(usize, usize)> {
        let len = doc.node_len(t);
        let s = if self.start.node == t {
            self.start.offset
        } else if compare_boundaries(doc, &self.start, &Boundary::new(t, 0))
            != Some(Ordering::Greater)
        {
            0
        } else {
            len
        };
        let e = if self.end.node == t {
            self.end.offset
        } else if compare_boundaries(doc, &Boundary::new(t, len), &self.end)
            != Some(Ordering::Greater)
        {
            len
        } else {
            0
        };
        (s < e).then_some((s, e.min(len)))
    }
}

fn validate_boundary(doc: &Document, node: NodeId, offset: usize) -> Result<Boundary, RangeError> {
    if !doc.is_connected(node) {
        return Err(RangeError::Detached);
    }
    let len = doc.node_len(node);
    if offset > len {
        return Err(RangeError::IndexSize { offset, len });
    }
    Ok(Boundary::new(node, offset))
}

/// Compares two boundary points in document order.
pub fn compare_boundaries(doc: &Document, a: &Boundary, b: &Boundary) -> Option<Ordering> {
    if a.node == b.node {
        return Some(a.offset.cmp(&b.offset));
    }
    if doc.contains(a.node, b.node) {
        let child_ix = child_index_toward(doc, a.node, b.node)?;
        return Some(if a.offset <= child_ix {
            Ordering::Less
        } else {
            Ordering::Greater
        });
    }
    if doc.contains(b.node, a.node) {
        let child_ix = child_index_toward(doc, b.node, a.node)?;
        return Some(if b.offset <= child_ix {
            Ordering::Greater
        } else {
            Ordering::Less
        });
    }
    doc.compare_order(a.node, b.node)
}

fn child_index_toward(doc: &Document, ancestor: NodeId, descendant: NodeId) -> Option<usize> {
    doc.path_of(ancestor, descendant)?.first().copied()
}

/// Per-root stand-in for the platform selection object.
#[derive(Debug, Clone, Default)]
pub struct NativeSelection {
    ranges: Vec<Range>,
    anchor: Option<Boundary>,
    focus: Option<Boundary>,
}

impl NativeSelection {
    pub fn range_at(&self, ix: usize) -> Option<Range> {
        self.ranges.get(ix).copied()
    }

    pub fn anchor(&self) -> Option<Boundary> {
        self.anchor
    }

    pub fn focus(&self) -> Option<Boundary> {
        self.focus
    }

    pub fn is_collapsed(&self) -> bool {
        match (self.anchor, self.focus) {
            (Some(anchor), Some(focus)) => anchor == focus,
            _ => true,
        }
    }

    pub fn remove_all_ranges(&mut self) {
        self.ranges.clear();
        self.anchor = None;
        self.focus = None;
    }

    pub fn add_range(&mut self, range: Range) {
        self.ranges.push(range);
        self.anchor = Some(range.start());
        self.focus = Some(range.end());
    }

    /// Records a directional selection the way a user drag reports it. The
    /// anchor may come after the focus, and no range object is exposed.
    pub fn set_base_and_extent(&mut self, anchor: Boundary, focus: Boundary) {
        self.ranges.clear();
        self.anchor = Some(anchor);
        self.focus = Some(focus);
    }
}

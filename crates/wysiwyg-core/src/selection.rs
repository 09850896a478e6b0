//! Selection and range normalization for the active root.
//!
//! The cached range lives in the root's [`FrameContext`], next to its native
//! selection, so switching roots never mixes selection state.

use std::cmp::Ordering;

use crate::classify::{
    ComponentClassifier, FileManager, FormatClassifier, is_figure, is_table_cell,
    is_wysiwyg_frame,
};
use crate::dom::{Document, NodeId, ZERO_WIDTH_SPACE};
use crate::frame::FrameContext;
use crate::range::{Boundary, NativeSelection, Range, compare_boundaries};

pub struct Selection<'a> {
    frame: &'a mut FrameContext,
    format: &'a dyn FormatClassifier,
    component: &'a dyn ComponentClassifier,
    files: &'a FileManager,
    default_line: &'a str,
}

impl<'a> Selection<'a> {
    pub fn new(
        frame: &'a mut FrameContext,
        format: &'a dyn FormatClassifier,
        component: &'a dyn ComponentClassifier,
        files: &'a FileManager,
        default_line: &'a str,
    ) -> Self {
        Self {
            frame,
            format,
            component,
            files,
            default_line,
        }
    }

    pub fn get(&self) -> &NativeSelection {
        &self.frame.native
    }

    pub fn doc(&self) -> &Document {
        &self.frame.doc
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.frame.doc.contains(self.frame.wysiwyg, node)
    }

    pub(crate) fn mark_focused(&mut self) {
        self.frame.focused = Some(self.frame.wysiwyg);
    }

    fn surface_element_at(&self, offset: usize) -> Option<NodeId> {
        let doc = &self.frame.doc;
        doc.children(self.frame.wysiwyg)
            .iter()
            .copied()
            .filter(|&c| doc.is_element(c))
            .nth(offset)
    }

    /// Whether a caret on the surface at `offset` sits beside something that
    /// is neither a line nor a component.
    pub(crate) fn needs_line_at(&self, offset: usize) -> bool {
        let doc = &self.frame.doc;
        self.surface_element_at(offset)
            .is_none_or(|c| !self.format.is_line(doc, c) && !self.component.is(doc, c))
    }

    /// Inserts an empty default line before the surface element at `offset`
    /// and puts the caret on its break.
    pub(crate) fn insert_line_at(&mut self, offset: usize) {
        let reference = self.surface_element_at(offset);
        let wysiwyg = self.frame.wysiwyg;
        let doc = &mut self.frame.doc;
        let line = doc.create_element(self.default_line);
        let br = doc.create_element("br");
        let _ = doc.append_child(line, br);
        if doc.insert_before(wysiwyg, line, reference).is_err() {
            return;
        }
        self.set_range(br, 0, br, 0);
    }

    /// Current range of the root.
    ///
    /// The cached range is trusted while its collapsed state agrees with the
    /// native selection, or while the native focus is outside the surface.
    /// Otherwise the native selection is adopted.
    pub fn get_range(&mut self) -> Range {
        let range = match self.frame.selection.range {
            Some(range) => range,
            None => self.create_default_range(),
        };

        let native = &self.frame.native;
        let focus_inside = native
            .focus()
            .is_some_and(|f| self.frame.doc.contains(self.frame.wysiwyg, f.node));
        if range.collapsed() == native.is_collapsed() || !focus_inside {
            return range;
        }

        if let Some(native_range) = native.range_at(0) {
            self.frame.selection.range = Some(native_range);
            return native_range;
        }

        let (Some(anchor), Some(focus)) = (native.anchor(), native.focus()) else {
            return range;
        };
        let forward = matches!(
            compare_boundaries(&self.frame.doc, &anchor, &focus),
            Some(Ordering::Less | Ordering::Equal)
        );
        let (start, end) = if forward {
            (anchor, focus)
        } else {
            (focus, anchor)
        };
        self.set_range(start.node, start.offset, end.node, end.offset)
            .unwrap_or(range)
    }

    /// Validates and installs a new range.
    ///
    /// Offsets past a node's text length are clamped, and an endpoint on a
    /// line container moves onto the child it points at. Returns `None` when
    /// the boundaries cannot form a range; the surface is refocused instead.
    pub fn set_range(
        &mut self,
        start: NodeId,
        start_offset: usize,
        end: NodeId,
        end_offset: usize,
    ) -> Option<Range> {
        let (start, start_offset) = self.retarget_line_endpoint(start, start_offset);
        let (end, end_offset) = self.retarget_line_endpoint(end, end_offset);

        let range = match Range::new(&self.frame.doc, start, start_offset, end, end_offset) {
            Ok(range) => range,
            Err(err) => {
                tracing::warn!(root = %self.frame.key, error = %err, "selection focus recovery");
                self.native_focus();
                return None;
            }
        };

        self.frame.native.remove_all_ranges();
        self.frame.native.add_range(range);
        self.range_info(range);
        if self.frame.is_iframe() {
            self.focus_surface();
        }
        Some(range)
    }

    fn retarget_line_endpoint(&self, node: NodeId, offset: usize) -> (NodeId, usize) {
        let doc = &self.frame.doc;
        let offset = offset.min(doc.text_len(node));
        if !self.format.is_line(doc, node) {
            return (node, offset);
        }

        let target = doc
            .child(node, offset)
            .or_else(|| offset.checked_sub(1).and_then(|ix| doc.child(node, ix)))
            .unwrap_or(node);
        let offset = if offset == 0 {
            0
        } else if doc.is_element(target) {
            1.min(doc.node_len(target))
        } else {
            doc.text_len(target)
        };
        (target, offset)
    }

    /// Drops the cached range. The native selection is only cleared while the
    /// root has focus.
    pub fn remove_range(&mut self) {
        self.frame.selection.range = None;
        self.frame.selection.node = None;
        if self.frame.focused.is_some() {
            self.frame.native.remove_all_ranges();
        }
    }

    /// When `range` carries no usable selection, inserts an empty default line
    /// (after `container`, or first on the surface) and selects its break.
    pub fn get_range_and_add_line(&mut self, range: Range, container: Option<NodeId>) -> Range {
        if !self.is_none(&range) {
            return range;
        }

        let wysiwyg = self.frame.wysiwyg;
        let doc = &mut self.frame.doc;
        let line = doc.create_element(self.default_line);
        let br = doc.create_element("br");
        // Both nodes are fresh, the append cannot fail.
        let _ = doc.append_child(line, br);

        let reference = match container {
            Some(c) if c != wysiwyg => doc.next_element_sibling(c),
            _ => doc.first_element_child(wysiwyg),
        };
        if doc.insert_before(wysiwyg, line, reference).is_err() {
            let _ = doc.append_child(wysiwyg, line);
        }

        self.set_range(br, 0, br, 1);
        self.frame.selection.range.unwrap_or(range)
    }

    /// Node the selection currently sits in. Falls back to the first leaf of
    /// the surface.
    pub fn get_node(&mut self) -> Option<NodeId> {
        let wysiwyg = self.frame.wysiwyg;
        let cached_inside = self
            .frame
            .selection
            .node
            .is_some_and(|n| self.frame.doc.contains(wysiwyg, n));
        if !cached_inside {
            self.init();
        }

        if self.frame.selection.node.is_none() {
            let doc = &self.frame.doc;
            let leaf = doc
                .first_child(wysiwyg)
                .and_then(|first| doc.edge_child(first, |d, n| d.is_leaf(n), false));
            match leaf {
                Some(leaf) => {
                    self.frame.selection.node = Some(leaf);
                    return Some(leaf);
                }
                None => self.init(),
            }
        }
        self.frame.selection.node
    }

    /// True when `range` does not point at editable text: both ends on the
    /// surface itself, or anchored in a figure or component.
    ///
    /// A range with only one end on the surface is a partial selection and
    /// counts as valid.
    pub fn is_none(&self, range: &Range) -> bool {
        let doc = &self.frame.doc;
        let Some(common) = range.common_ancestor(doc) else {
            return true;
        };
        (is_wysiwyg_frame(doc, range.start_container())
            && is_wysiwyg_frame(doc, range.end_container()))
            || is_figure(doc, common)
            || self.files.is_file_tag(doc.node_name(common))
            || self.component.is(doc, common)
    }

    /// Moves both endpoints onto text leaves, replacing bare breaks with a
    /// zero-width text node. Returns false when the range is not usable.
    pub fn reset_range_to_text_node(&mut self) -> bool {
        let range = self.get_range();
        if self.is_none(&range) {
            return false;
        }

        let wysiwyg = self.frame.wysiwyg;
        let mut start = range.start_container();
        let mut start_offset = range.start_offset();
        let mut end = range.end_container();
        let mut end_offset = range.end_offset();

        {
            let doc = &self.frame.doc;
            if self.format.is_line(doc, start) {
                match doc.child(start, start_offset) {
                    Some(child) => {
                        start = child;
                        start_offset = 0;
                    }
                    None => {
                        start = doc.last_child(start).unwrap_or(start);
                        start_offset = doc.text_len(start);
                    }
                }
                while doc.is_element(start) {
                    let Some(first) = doc.first_child(start) else {
                        break;
                    };
                    start = first;
                    start_offset = 0;
                }
            }
            if self.format.is_line(doc, end) {
                end = doc
                    .child(end, end_offset)
                    .or_else(|| doc.last_child(end))
                    .unwrap_or(end);
                while doc.is_element(end) {
                    let Some(last) = doc.last_child(end) else {
                        break;
                    };
                    end = last;
                }
                end_offset = doc.text_len(end);
            }
        }

        // start boundary
        let first = if is_wysiwyg_frame(&self.frame.doc, start) {
            self.frame.doc.first_child(wysiwyg)
        } else {
            Some(start)
        };
        let Some(mut temp) = first else {
            return false;
        };
        let mut temp_offset = start_offset;

        if self.frame.doc.is_break(temp) || self.is_parent_element(temp) {
            let only_break = self.frame.doc.is_break(temp);
            if !only_break {
                let doc = &self.frame.doc;
                while !doc.is_break(temp) && doc.is_element(temp) {
                    let next = doc
                        .child(temp, temp_offset)
                        .or_else(|| doc.next_element_sibling(temp))
                        .or_else(|| doc.next_sibling(temp));
                    let Some(next) = next else {
                        break;
                    };
                    temp = next;
                    temp_offset = 0;
                }
                let in_cell = doc.closest(temp, is_table_cell).is_some();
                self.wrap_in_line(temp, in_cell);
            }

            if self.frame.doc.is_break(temp) {
                temp = self.insert_placeholder_before(temp);
                if only_break && start == end {
                    end = temp;
                    end_offset = 1;
                }
            }
        }
        start = temp;
        start_offset = temp_offset;

        // end boundary
        let last = if is_wysiwyg_frame(&self.frame.doc, end) {
            self.frame.doc.last_child(wysiwyg)
        } else {
            Some(end)
        };
        let Some(mut temp) = last else {
            return false;
        };
        let mut temp_offset = end_offset;

        if self.frame.doc.is_break(temp) || self.is_parent_element(temp) {
            let only_break = self.frame.doc.is_break(temp);
            if !only_break {
                let doc = &self.frame.doc;
                while !doc.is_break(temp) && doc.is_element(temp) {
                    let children = doc.children(temp);
                    let Some(&first_child) = children.first() else {
                        break;
                    };
                    let next = children
                        .get(temp_offset.saturating_sub(1))
                        .copied()
                        .or_else(|| (!is_figure(doc, first_child)).then_some(first_child))
                        .or_else(|| doc.previous_element_sibling(temp))
                        .or_else(|| doc.previous_sibling(temp))
                        .unwrap_or(start);
                    if next == temp {
                        break;
                    }
                    temp = next;
                    if temp_offset > 0 {
                        temp_offset = doc.node_len(temp);
                    }
                }
                let in_cell = doc.closest(temp, is_table_cell).is_some();
                self.wrap_in_line(temp, in_cell);
            }

            if self.frame.doc.is_break(temp) {
                let marker = temp;
                temp = self.insert_placeholder_before(marker);
                temp_offset = 1;
                if only_break && self.frame.doc.previous_sibling(temp).is_none() {
                    self.frame.doc.remove(marker);
                }
            }
        }
        end = temp;
        end_offset = temp_offset;

        self.set_range(start, start_offset, end, end_offset);
        true
    }

    fn is_parent_element(&self, node: NodeId) -> bool {
        self.frame.doc.is_element(node) && self.frame.doc.has_children(node)
    }

    fn insert_placeholder_before(&mut self, marker: NodeId) -> NodeId {
        let doc = &mut self.frame.doc;
        let text = doc.create_text(ZERO_WIDTH_SPACE.to_string());
        if let Some(parent) = doc.parent(marker) {
            let _ = doc.insert_before(parent, text, Some(marker));
        }
        text
    }

    /// Wraps `node` in a new line unless it already sits in a line that is
    /// not itself a block.
    fn wrap_in_line(&mut self, node: NodeId, in_cell: bool) {
        let doc = &self.frame.doc;
        let line = self.format.get_line(doc, node, None);
        let block = line.and_then(|l| self.format.get_block(doc, l, None));
        if line.is_some() && line != block {
            return;
        }
        let Some(parent) = doc.parent(node) else {
            return;
        };

        let tag = if in_cell { "div" } else { self.default_line };
        let doc = &mut self.frame.doc;
        let wrapper = doc.create_element(tag);
        if doc.insert_before(parent, wrapper, Some(node)).is_ok() {
            let _ = doc.append_child(wrapper, node);
        }
    }

    /// Caches `range` and derives the selection node from it.
    pub(crate) fn range_info(&mut self, range: Range) {
        let doc = &self.frame.doc;
        let node = if range.collapsed() {
            range.common_ancestor(doc).map(|common| {
                if is_wysiwyg_frame(doc, common) {
                    doc.children(common)
                        .iter()
                        .copied()
                        .filter(|&c| doc.is_element(c))
                        .nth(range.start_offset())
                        .unwrap_or(common)
                } else {
                    common
                }
            })
        } else {
            self.frame
                .native
                .focus()
                .or(self.frame.native.anchor())
                .map(|b| b.node)
        };
        self.frame.selection.range = Some(range);
        self.frame.selection.node = node;
    }

    /// Re-derives the cached range from the native selection.
    pub(crate) fn init(&mut self) {
        let mut range = match self.frame.native.range_at(0) {
            Some(range) => range,
            None => self.create_default_range(),
        };

        // A selection ending at the very start of a line is pulled back to
        // the end of the start text.
        let doc = &self.frame.doc;
        let start = range.start_container();
        if range.end_offset() == 0
            && self.format.is_line(doc, range.end_container())
            && doc.is_text(start)
        {
            if let Ok(widened) = Range::new(doc, start, range.start_offset(), start, doc.node_len(start))
            {
                range = widened;
            }
        }
        self.range_info(range);
    }

    /// Caret at the start of the surface's first element, creating an empty
    /// default line when there is none. Not cached.
    fn create_default_range(&mut self) -> Range {
        let wysiwyg = self.frame.wysiwyg;
        self.frame.focused = Some(wysiwyg);

        let doc = &mut self.frame.doc;
        let focus_el = match doc.first_element_child(wysiwyg) {
            Some(el) => el,
            None => {
                let line = doc.create_element(self.default_line);
                let br = doc.create_element("br");
                let _ = doc.append_child(line, br);
                let _ = doc.append_child(wysiwyg, line);
                line
            }
        };
        let at = Boundary::new(focus_el, 0);
        Range::from_parts(at, at)
    }

    /// Focuses the enclosing figcaption of the current node, or the surface.
    pub fn focus_surface(&mut self) {
        let caption = self
            .get_node()
            .and_then(|n| self.frame.doc.closest(n, |d, n| d.is_tag(n, "FIGCAPTION")));
        self.frame.focused = Some(caption.unwrap_or(self.frame.wysiwyg));
    }

    pub fn native_focus(&mut self) {
        self.focus_surface();
        self.init();
    }
}

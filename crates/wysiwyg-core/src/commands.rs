use serde_json::Value;

use crate::dom::{Document, NodeId, ZERO_WIDTH_SPACE};
use crate::error::SessionError;
use crate::options::parse_px;
use crate::plugin::DirHook;
use crate::range::Range;
use crate::session::Session;

/// Inline tags stripped by `removeFormat`.
const INLINE_FORMAT_TAGS: &[&str] = &[
    "STRONG", "B", "U", "EM", "I", "DEL", "S", "STRIKE", "SUB", "SUP", "SPAN",
];

fn style_tag(command: &str) -> Option<&'static str> {
    match command {
        "bold" => Some("strong"),
        "underline" => Some("u"),
        "italic" => Some("em"),
        "strike" => Some("del"),
        "subscript" => Some("sub"),
        "superscript" => Some("sup"),
        _ => None,
    }
}

fn style_matches(command: &str, tag: &str) -> bool {
    match command {
        "bold" => matches!(tag, "STRONG" | "B"),
        "underline" => tag == "U",
        "italic" => matches!(tag, "EM" | "I"),
        "strike" => matches!(tag, "DEL" | "S" | "STRIKE"),
        "subscript" => tag == "SUB",
        "superscript" => tag == "SUP",
        _ => false,
    }
}

/// Moves the children of `el` in front of it and removes it.
fn unwrap_element(doc: &mut Document, el: NodeId) {
    let Some(parent) = doc.parent(el) else {
        return;
    };
    for child in doc.children(el).to_vec() {
        let _ = doc.insert_before(parent, child, Some(el));
    }
    doc.remove(el);
}

/// Text nodes under `top` the range covers, with their covered char spans.
fn covered_texts(doc: &Document, range: &Range, top: NodeId) -> Vec<(NodeId, usize, usize)> {
    let mut texts = doc.descendants_where(top, |d, n| d.is_text(n));
    if doc.is_text(top) {
        texts.push(top);
    }
    texts
        .into_iter()
        .filter_map(|t| range.text_span(doc, t).map(|(s, e)| (t, s, e)))
        .collect()
}

impl Session {
    /// Native-style clipboard commands: `copy` and `cut`.
    pub fn exec_command(&mut self, command: &str) -> Result<(), SessionError> {
        let mut sel = self.selection()?;
        let range = sel.get_range();
        let text = range.to_text(sel.doc());
        drop(sel);
        self.clipboard = text;

        if command == "cut" && !range.collapsed() {
            let key = self.active.clone();
            let frame = self.frame_for_mut(&key)?;
            let caret = range.delete_contents(&mut frame.doc)?;
            let mut sel = self.selection()?;
            sel.set_range(
                caret.start_container(),
                caret.start_offset(),
                caret.end_container(),
                caret.end_offset(),
            );
        }
        self.push_history(true);
        Ok(())
    }

    /// Inserts the clipboard text at the selection, replacing selected content.
    pub fn paste(&mut self) -> Result<(), SessionError> {
        if self.clipboard.is_empty() {
            return Ok(());
        }
        let text = self.clipboard.clone();
        let range = self.selection()?.get_range();

        let key = self.active.clone();
        let frame = self.frame_for_mut(&key)?;
        let caret = if range.collapsed() {
            range
        } else {
            range.delete_contents(&mut frame.doc)?
        };
        let (node, offset) = (caret.start_container(), caret.start_offset());
        let doc = &mut frame.doc;

        let (end_node, end_offset) = match doc.text(node) {
            Some(current) => {
                let ix = crate::dom::char_to_byte(current, offset);
                let mut next = current.to_string();
                next.insert_str(ix, &text);
                doc.set_text(node, next);
                (node, offset + text.chars().count())
            }
            None => {
                let inserted = doc.create_text(text.as_str());
                let reference = doc.child(node, offset);
                doc.insert_before(node, inserted, reference)?;
                (inserted, text.chars().count())
            }
        };

        self.selection()?
            .set_range(end_node, end_offset, end_node, end_offset);
        self.push_history(true);
        Ok(())
    }

    /// Selects everything from the first to the last leaf of the surface.
    pub fn select_all(&mut self) -> Result<(), SessionError> {
        let frame = self.frame().ok_or(SessionError::Destroyed)?;
        let doc = &frame.doc;
        let wysiwyg = frame.wysiwyg;
        let first = doc.edge_child(wysiwyg, |d, n| d.is_leaf(n), false);
        let last = doc.edge_child(wysiwyg, |d, n| d.is_leaf(n), true);
        let (start, end, end_offset) = match (first, last) {
            (Some(first), Some(last)) => (first, last, doc.node_len(last)),
            _ => (wysiwyg, wysiwyg, doc.node_len(wysiwyg)),
        };

        let mut sel = self.selection()?;
        sel.set_range(start, 0, end, end_offset);
        sel.mark_focused();
        drop(sel);
        self.effect_node = None;
        self.apply_tag_effect();
        Ok(())
    }

    /// Switches the active root between the editable surface and its
    /// source view.
    pub fn code_view(&mut self, on: bool) -> Result<(), SessionError> {
        let key = self.active.clone();
        let frame = self.frame_for_mut(&key)?;
        if frame.is_code_view == on {
            return Ok(());
        }
        frame.is_code_view = on;
        if on {
            frame.code_value = frame.html();
            frame.doc.set_style(frame.wysiwyg_frame, "display", "none");
            frame.doc.set_style(frame.code, "display", "block");
        } else {
            frame.doc.set_style(frame.code, "display", "none");
            frame.doc.set_style(frame.wysiwyg_frame, "display", "block");
        }

        let ids = self.code_view_disabled.clone();
        self.toolbar.set_disabled(&ids, on);
        if !on && self.status.is_read_only {
            let ids = self.controller_disabled.clone();
            self.toolbar.set_disabled(&ids, true);
        }
        if !on {
            self.refresh_history_buttons();
        }
        self.apply_command_targets("codeView", |b| b.active = on);
        self.check_placeholder(&key);
        self.resources_state_change(&key);
        Ok(())
    }

    pub fn full_screen(&mut self, on: bool) -> Result<(), SessionError> {
        let key = self.active.clone();
        let frame = self.frame_for_mut(&key)?;
        frame.is_full_screen = on;
        if on {
            frame.doc.add_class(frame.top_area, "se-fullscreen");
        } else {
            frame.doc.remove_class(frame.top_area, "se-fullscreen");
        }
        self.toolbar.reset_sticky();
        self.apply_command_targets("fullScreen", |b| b.active = on);
        Ok(())
    }

    pub fn show_blocks(&mut self, on: bool) -> Result<(), SessionError> {
        let key = self.active.clone();
        let frame = self.frame_for_mut(&key)?;
        frame.is_show_blocks = on;
        if on {
            frame.doc.add_class(frame.wysiwyg, "se-show-block");
        } else {
            frame.doc.remove_class(frame.wysiwyg, "se-show-block");
        }
        self.apply_command_targets("showBlocks", |b| b.active = on);
        Ok(())
    }

    /// Lines touched by the current range, in document order.
    pub(crate) fn selected_lines(&mut self) -> Result<Vec<NodeId>, SessionError> {
        let range = self.selection()?.get_range();
        let frame = self.frame().ok_or(SessionError::Destroyed)?;
        let doc = &frame.doc;
        let format = &*self.format;

        let all = doc.descendants_where(frame.wysiwyg, |d, n| format.is_line(d, n));
        let first = format.get_line(doc, range.start_container(), None);
        let last = format.get_line(doc, range.end_container(), None);
        let (Some(first), Some(last)) = (first, last) else {
            return Ok(first.or(last).into_iter().collect());
        };
        let (Some(a), Some(b)) = (
            all.iter().position(|&n| n == first),
            all.iter().position(|&n| n == last),
        ) else {
            return Ok(vec![first]);
        };
        Ok(all[a.min(b)..=a.max(b)].to_vec())
    }

    /// Shifts the selected lines by `indentSize` pixels on the leading side.
    pub fn indent(&mut self, increase: bool) -> Result<(), SessionError> {
        let lines = self.selected_lines()?;
        if lines.is_empty() {
            return Ok(());
        }
        let size = self.options.get_u64("indentSize").unwrap_or(25) as u32;
        let prop = if self.options.get_bool("_rtl") {
            "margin-right"
        } else {
            "margin-left"
        };

        let key = self.active.clone();
        let frame = self.frame_for_mut(&key)?;
        for line in lines {
            let current = frame.doc.style(line, prop).and_then(parse_px).unwrap_or(0);
            let next = if increase {
                current + size
            } else {
                current.saturating_sub(size)
            };
            if next == 0 {
                frame.doc.set_style(line, prop, "");
            } else {
                frame.doc.set_style(line, prop, format!("{next}px"));
            }
        }
        self.push_history(false);
        Ok(())
    }

    pub fn undo(&mut self) {
        if let Some(key) = self.history.undo(&mut self.roots) {
            self.after_history_move(key);
        }
    }

    pub fn redo(&mut self) {
        if let Some(key) = self.history.redo(&mut self.roots) {
            self.after_history_move(key);
        }
    }

    fn after_history_move(&mut self, key: crate::frame::RootKey) {
        tracing::debug!(root = %key, "history moved");
        self.change_frame_context(key.as_str());
        self.effect_node = None;
        self.on_history_change(&key);
    }

    /// Unwraps inline formatting that overlaps the selection.
    pub fn remove_format(&mut self) -> Result<(), SessionError> {
        let range = self.selection()?.get_range();
        let key = self.active.clone();
        let frame = self.frame_for_mut(&key)?;
        let wysiwyg = frame.wysiwyg;
        let doc = &mut frame.doc;
        let Some(top) = range.common_ancestor(doc) else {
            return Ok(());
        };

        let mut formats: Vec<NodeId> = Vec::new();
        for (t, _, _) in covered_texts(doc, &range, top) {
            for a in doc.ancestors(t).take_while(|&n| n != wysiwyg) {
                let tag = doc.node_name(a);
                if INLINE_FORMAT_TAGS.contains(&tag) && !formats.contains(&a) {
                    formats.push(a);
                }
            }
        }
        for el in formats {
            unwrap_element(doc, el);
        }

        if range.is_valid_in(doc) {
            self.selection()?.set_range(
                range.start_container(),
                range.start_offset(),
                range.end_container(),
                range.end_offset(),
            );
        }
        self.effect_node = None;
        self.push_history(false);
        Ok(())
    }

    pub fn print(&mut self) -> Result<(), SessionError> {
        let key = self.active.clone();
        let html = self.get_html(None)?;
        if let Some(on_print) = self.events.on_print.as_mut() {
            on_print(&key, &html);
        }
        Ok(())
    }

    pub fn preview(&mut self) -> Result<(), SessionError> {
        let key = self.active.clone();
        let html = self.get_html(None)?;
        if let Some(on_preview) = self.events.on_preview.as_mut() {
            on_preview(&key, &html);
        }
        Ok(())
    }

    /// Marks the active root's content as saved.
    pub fn save(&mut self) -> Result<(), SessionError> {
        let key = self.active.clone();
        let frame = self.frame_for_mut(&key)?;
        let html = frame.html();
        frame.origin_value.clone_from(&html);
        self.status.is_changed = false;
        self.apply_command_targets("save", |b| b.disabled = true);
        if let Some(on_save) = self.events.on_save.as_mut() {
            on_save(&key, &html);
        }
        Ok(())
    }

    /// Toggles a text style over the selection.
    ///
    /// Inside an element of the style the nearest one is unwrapped. Otherwise
    /// each covered text span is split out and wrapped; a collapsed range gets
    /// an empty styled run holding the caret.
    pub fn font_style(&mut self, command: &str) -> Result<(), SessionError> {
        let Some(tag) = style_tag(command) else {
            tracing::warn!(command, "unknown style command");
            return Ok(());
        };
        let range = self.selection()?.get_range();
        let key = self.active.clone();
        let frame = self.frame_for_mut(&key)?;
        let wysiwyg = frame.wysiwyg;
        let doc = &mut frame.doc;

        let existing = std::iter::once(range.start_container())
            .chain(doc.ancestors(range.start_container()))
            .take_while(|&n| n != wysiwyg)
            .find(|&n| style_matches(command, doc.node_name(n)));

        let new_range = if let Some(el) = existing {
            unwrap_element(doc, el);
            range.is_valid_in(doc).then_some(range)
        } else if range.collapsed() {
            let (node, offset) = (range.start_container(), range.start_offset());
            let styled = doc.create_element(tag);
            let placeholder = doc.create_text(ZERO_WIDTH_SPACE.to_string());
            doc.append_child(styled, placeholder)?;
            match doc.parent(node).filter(|_| doc.is_text(node)) {
                Some(parent) => {
                    let tail = doc.split_text(node, offset)?;
                    doc.insert_before(parent, styled, Some(tail))?;
                }
                None => {
                    let reference = doc.child(node, offset);
                    doc.insert_before(node, styled, reference)?;
                }
            }
            Range::collapsed_at(doc, placeholder, 1).ok()
        } else {
            let top = range.common_ancestor(doc).ok_or(SessionError::Destroyed)?;
            let mut wrapped: Vec<NodeId> = Vec::new();
            for (t, s, e) in covered_texts(doc, &range, top) {
                let len = doc.node_len(t);
                if e < len {
                    doc.split_text(t, e)?;
                }
                let middle = if s > 0 { doc.split_text(t, s)? } else { t };
                let Some(parent) = doc.parent(middle) else {
                    continue;
                };
                let styled = doc.create_element(tag);
                doc.insert_before(parent, styled, Some(middle))?;
                doc.append_child(styled, middle)?;
                wrapped.push(middle);
            }
            match (wrapped.first(), wrapped.last()) {
                (Some(&first), Some(&last)) => {
                    Range::new(doc, first, 0, last, doc.node_len(last)).ok()
                }
                _ => None,
            }
        };

        if let Some(r) = new_range {
            self.selection()?.set_range(
                r.start_container(),
                r.start_offset(),
                r.end_container(),
                r.end_offset(),
            );
        }
        self.effect_node = None;
        self.push_history(false);
        self.apply_tag_effect();
        Ok(())
    }

    /// Switches the writing direction of every root. A no-op when the
    /// direction is already in effect.
    pub fn set_dir(&mut self, dir: &str) {
        let rtl = dir == "rtl";
        if self.options.get_bool("_rtl") == rtl {
            return;
        }
        self.options.set("textDirection", Value::String(dir.to_string()));
        self.origin_options
            .insert("textDirection".to_string(), Value::String(dir.to_string()));
        self.options.set("_rtl", Value::Bool(rtl));

        let hooks: Vec<DirHook> = self
            .plugins
            .values()
            .filter_map(|slot| slot.plugin().and_then(|p| p.set_dir.clone()))
            .collect();
        for hook in hooks {
            hook(self, dir);
        }

        self.apply_dir_classes(rtl);
        for frame in self.roots.values_mut() {
            swap_sides(&mut frame.doc, frame.wysiwyg);
        }

        self.apply_command_targets("dir", |b| b.active = rtl);
        self.apply_command_targets("dir_ltr", |b| b.active = !rtl);
        self.apply_command_targets("dir_rtl", |b| b.active = rtl);
        self.effect_node = None;
        self.apply_tag_effect();
    }

    pub(crate) fn apply_dir_classes(&mut self, rtl: bool) {
        for frame in self.roots.values_mut() {
            for node in [frame.top_area, frame.wysiwyg_frame] {
                if rtl {
                    frame.doc.add_class(node, "se-rtl");
                } else {
                    frame.doc.remove_class(node, "se-rtl");
                }
            }
        }
        self.toolbar.set_rtl(rtl);
    }
}

/// Mirrors horizontal margins and left/right alignment under `root`.
fn swap_sides(doc: &mut Document, root: NodeId) {
    let styled = doc.descendants_where(root, |d, n| {
        d.element(n).is_some_and(|el| !el.style.is_empty())
    });
    for node in styled {
        let left = doc.style(node, "margin-left").map(str::to_string);
        let right = doc.style(node, "margin-right").map(str::to_string);
        doc.set_style(node, "margin-left", right.unwrap_or_default());
        doc.set_style(node, "margin-right", left.unwrap_or_default());

        let align = match doc.style(node, "text-align") {
            Some("left") => Some("right"),
            Some("right") => Some("left"),
            _ => None,
        };
        if let Some(align) = align {
            doc.set_style(node, "text-align", align);
        }
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::classify::WYSIWYG_CLASS;
use crate::content::ContentNode;
use crate::dom::{Document, DomError, NodeId, ZERO_WIDTH_SPACE};
use crate::options::{
    DefaultStyles, OptionMap, Options, default_option_styles, init_frame_options, parse_px,
    value_to_map,
};
use crate::range::{NativeSelection, Range};

pub(crate) const DEFAULT_MIN_HEIGHT: u32 = 65;
const LINE_HEIGHT_PX: u32 = 24;
const ALLOWED_EMPTY_TAGS: &[&str] = &["IMG", "IFRAME", "VIDEO", "AUDIO", "HR", "TABLE", "FIGURE"];

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RootKey(String);

impl RootKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RootKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for RootKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One input element to turn into an editable surface.
#[derive(Debug, Clone)]
pub struct RootTarget {
    pub key: RootKey,
    pub options: OptionMap,
    pub value: Option<Vec<ContentNode>>,
}

impl RootTarget {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: RootKey::new(key),
            options: OptionMap::new(),
            value: None,
        }
    }

    pub fn options(mut self, options: Value) -> Self {
        self.options = value_to_map(&options);
        self
    }

    pub fn value(mut self, content: Vec<ContentNode>) -> Self {
        self.value = Some(content);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct SelectionState {
    pub(crate) range: Option<Range>,
    pub(crate) node: Option<NodeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusbarHandles {
    pub statusbar: NodeId,
    pub navigation: NodeId,
    pub char_wrapper: Option<NodeId>,
    pub char_counter: Option<NodeId>,
}

/// Handles, options and transient flags of one editable surface.
#[derive(Debug, Clone)]
pub struct FrameContext {
    pub key: RootKey,
    pub options: Options,
    pub doc: Document,

    pub top_area: NodeId,
    pub container: NodeId,
    pub editor_area: NodeId,
    pub wysiwyg_frame: NodeId,
    pub wysiwyg: NodeId,
    pub code: NodeId,
    pub toolbar_shadow: NodeId,
    pub line_breaker: NodeId,
    pub line_breaker_t: NodeId,
    pub line_breaker_b: NodeId,
    pub statusbar: Option<StatusbarHandles>,
    pub placeholder: Option<NodeId>,

    pub min_height: u32,
    pub editor_height: u32,
    pub default_styles: DefaultStyles,
    pub css_links: Vec<String>,

    pub is_code_view: bool,
    pub is_full_screen: bool,
    pub is_show_blocks: bool,

    /// Value of the original input element; written back by `save`.
    pub origin_value: String,
    /// Read-only source mirror shown in code view.
    pub code_value: String,
    pub char_count: usize,

    pub(crate) selection: SelectionState,
    pub(crate) native: NativeSelection,
    pub(crate) focused: Option<NodeId>,
}

impl FrameContext {
    pub fn new(
        target: &RootTarget,
        session_origin: &OptionMap,
        default_line: &str,
    ) -> Result<Self, DomError> {
        let options = init_frame_options(session_origin, &target.options);
        let mut doc = Document::new();
        let root = doc.root();

        let top_area = doc.create_element("div");
        doc.add_class(top_area, "sun-editor");
        doc.append_child(root, top_area)?;

        let container = child_with_class(&mut doc, top_area, "div", "se-container")?;
        let toolbar_shadow = child_with_class(&mut doc, container, "div", "se-toolbar-shadow")?;
        let editor_area = child_with_class(&mut doc, container, "div", "se-wrapper")?;

        let (wysiwyg_frame, wysiwyg) = if options.get_bool("iframe") {
            let frame = child_with_class(&mut doc, editor_area, "iframe", "se-wrapper-inner")?;
            let body = child_with_class(&mut doc, frame, "body", WYSIWYG_CLASS)?;
            (frame, body)
        } else {
            let frame = child_with_class(&mut doc, editor_area, "div", "se-wrapper-inner")?;
            doc.add_class(frame, WYSIWYG_CLASS);
            (frame, frame)
        };
        doc.set_attr(wysiwyg, "contenteditable", "true");

        let code = child_with_class(&mut doc, editor_area, "textarea", "se-wrapper-code")?;
        doc.set_style(code, "display", "none");

        let placeholder = match options.get_str("placeholder").filter(|p| !p.is_empty()) {
            Some(text) => {
                let p = child_with_class(&mut doc, editor_area, "span", "se-placeholder")?;
                let t = doc.create_text(text);
                doc.append_child(p, t)?;
                Some(p)
            }
            None => None,
        };

        let line_breaker = child_with_class(&mut doc, container, "div", "se-line-breaker")?;
        let button = doc.create_element("button");
        doc.append_child(line_breaker, button)?;
        let line_breaker_t =
            child_with_class(&mut doc, container, "div", "se-line-breaker-component-t")?;
        let line_breaker_b =
            child_with_class(&mut doc, container, "div", "se-line-breaker-component-b")?;

        let min_height = options
            .get_str("minHeight")
            .and_then(parse_px)
            .unwrap_or(DEFAULT_MIN_HEIGHT);

        let mut frame = Self {
            key: target.key.clone(),
            options,
            doc,
            top_area,
            container,
            editor_area,
            wysiwyg_frame,
            wysiwyg,
            code,
            toolbar_shadow,
            line_breaker,
            line_breaker_t,
            line_breaker_b,
            statusbar: None,
            placeholder,
            min_height,
            editor_height: 0,
            default_styles: DefaultStyles::default(),
            css_links: Vec::new(),
            is_code_view: false,
            is_full_screen: false,
            is_show_blocks: false,
            origin_value: String::new(),
            code_value: String::new(),
            char_count: 0,
            selection: SelectionState::default(),
            native: NativeSelection::default(),
            focused: None,
        };

        if frame.options.get_bool("statusbar") {
            frame.create_statusbar()?;
        }
        frame.css_links = css_file_names(&frame.options);
        frame.apply_editable_attributes(&OptionMap::new());
        frame.apply_iframe_attributes(&OptionMap::new());
        let style = frame.options.get_str("editorStyle").unwrap_or("").to_string();
        frame.set_editor_style(&style);
        frame.init_content(target.value.as_deref(), default_line)?;
        frame.origin_value = frame.doc.inner_html(frame.wysiwyg);
        Ok(frame)
    }

    /// Fills the surface with `content`, or one empty default line.
    pub fn init_content(
        &mut self,
        content: Option<&[ContentNode]>,
        default_line: &str,
    ) -> Result<(), DomError> {
        match content.filter(|c| !c.is_empty()) {
            Some(content) => self.doc.replace_children(self.wysiwyg, content)?,
            None => self
                .doc
                .replace_children(self.wysiwyg, &[ContentNode::line(default_line, "")])?,
        }
        self.selection = SelectionState::default();
        self.native.remove_all_ranges();
        self.char_count = self.char_length();
        Ok(())
    }

    pub fn cached_range(&self) -> Option<Range> {
        self.selection.range
    }

    pub fn selection_node(&self) -> Option<NodeId> {
        self.selection.node
    }

    pub fn native_selection(&self) -> &NativeSelection {
        &self.native
    }

    pub fn native_selection_mut(&mut self) -> &mut NativeSelection {
        &mut self.native
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    pub fn html(&self) -> String {
        self.doc.inner_html(self.wysiwyg)
    }

    /// No visible text, no content-bearing void element, at most one line.
    pub fn is_empty(&self) -> bool {
        let doc = &self.doc;
        let text_empty = doc
            .text_content(self.wysiwyg)
            .chars()
            .all(|c| c == ZERO_WIDTH_SPACE || c.is_whitespace());
        let has_media = !doc
            .descendants_where(self.wysiwyg, |d, n| {
                ALLOWED_EMPTY_TAGS.iter().any(|t| d.is_tag(n, t))
            })
            .is_empty();
        text_empty && !has_media && doc.children(self.wysiwyg).len() <= 1
    }

    pub fn char_length(&self) -> usize {
        self.doc
            .text_content(self.wysiwyg)
            .chars()
            .filter(|&c| c != ZERO_WIDTH_SPACE)
            .count()
    }

    /// Height the surface occupies: the fixed height when one is configured,
    /// otherwise one line box per top-level line, never below the minimum.
    pub fn layout_height(&self) -> u32 {
        if !self.doc.is_displayed(self.wysiwyg_frame) {
            return 0;
        }
        if let Some(fixed) = self.options.get_str("height").and_then(parse_px) {
            return fixed;
        }
        let lines = self.doc.children(self.wysiwyg).len() as u32;
        (lines * LINE_HEIGHT_PX).max(self.min_height)
    }

    pub fn create_statusbar(&mut self) -> Result<StatusbarHandles, DomError> {
        self.remove_statusbar();
        let statusbar = child_with_class(&mut self.doc, self.container, "div", "se-status-bar")?;
        let navigation = child_with_class(&mut self.doc, statusbar, "div", "se-navigation")?;
        let (char_wrapper, char_counter) = if self.options.get_bool("charCounter") {
            let wrapper =
                child_with_class(&mut self.doc, statusbar, "div", "se-char-counter-wrapper")?;
            let counter = child_with_class(&mut self.doc, wrapper, "span", "se-char-counter")?;
            (Some(wrapper), Some(counter))
        } else {
            (None, None)
        };
        let handles = StatusbarHandles {
            statusbar,
            navigation,
            char_wrapper,
            char_counter,
        };
        self.statusbar = Some(handles);
        Ok(handles)
    }

    pub fn remove_statusbar(&mut self) {
        if let Some(handles) = self.statusbar.take() {
            self.doc.remove(handles.statusbar);
        }
    }

    /// Writes the char counter text, when the status bar shows one.
    pub fn update_char_counter(&mut self) {
        self.char_count = self.char_length();
        let Some(counter) = self.statusbar.and_then(|s| s.char_counter) else {
            return;
        };
        for child in self.doc.children(counter).to_vec() {
            self.doc.remove(child);
        }
        let text = self.doc.create_text(self.char_count.to_string());
        let _ = self.doc.append_child(counter, text);
    }

    pub fn set_editor_style(&mut self, style: &str) {
        let styles = default_option_styles(&self.options, style);
        self.doc.set_style_text(self.top_area, &styles.top);

        let code_display = self.doc.style(self.code, "display").map(str::to_string);
        self.doc.set_style_text(self.code, &styles.frame);
        self.doc
            .set_style(self.code, "display", code_display.unwrap_or_else(|| "none".into()));
        if self.options.get_str("height") == Some("auto") {
            self.doc.set_style(self.code, "overflow", "hidden");
        }

        let frame_display = self.doc.style(self.wysiwyg_frame, "display").map(str::to_string);
        if self.wysiwyg_frame == self.wysiwyg {
            let css = format!("{} {}", styles.frame, styles.editor);
            self.doc.set_style_text(self.wysiwyg_frame, &css);
        } else {
            self.doc.set_style_text(self.wysiwyg_frame, &styles.frame);
            self.doc.set_style_text(self.wysiwyg, &styles.editor);
        }
        if let Some(display) = frame_display {
            self.doc.set_style(self.wysiwyg_frame, "display", display);
        }
        self.default_styles = styles;
    }

    /// Swaps the editable-surface attributes from `previous` to the current
    /// `editableFrameAttributes` option.
    pub fn apply_editable_attributes(&mut self, previous: &OptionMap) {
        for k in previous.keys() {
            self.doc.remove_attr(self.wysiwyg, k);
        }
        for (k, v) in self.options.get_map("editableFrameAttributes") {
            self.doc.set_attr(self.wysiwyg, &k, value_text(&v));
        }
    }

    pub fn apply_iframe_attributes(&mut self, previous: &OptionMap) {
        if self.wysiwyg_frame == self.wysiwyg {
            return;
        }
        for k in previous.keys() {
            self.doc.remove_attr(self.wysiwyg_frame, k);
        }
        for (k, v) in self.options.get_map("iframe_attributes") {
            self.doc.set_attr(self.wysiwyg_frame, &k, value_text(&v));
        }
    }

    pub fn is_iframe(&self) -> bool {
        self.wysiwyg_frame != self.wysiwyg
    }
}

pub(crate) fn css_file_names(options: &Options) -> Vec<String> {
    match options.get("iframe_cssFileName") {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn child_with_class(
    doc: &mut Document,
    parent: NodeId,
    tag: &str,
    class: &str,
) -> Result<NodeId, DomError> {
    let id = doc.create_element(tag);
    doc.add_class(id, class);
    doc.append_child(parent, id)?;
    Ok(id)
}

//! Structural predicates consulted by the selection engine.
//!
//! Both classifiers are owned by the formatting subsystem; the session only
//! needs the queries below, so hosts can swap in their own schema.

use indexmap::IndexMap;

use crate::dom::{Document, NodeId};

pub const WYSIWYG_CLASS: &str = "se-wrapper-wysiwyg";
pub const COMPONENT_CLASS: &str = "se-component";
pub const COMPONENT_SELECTED_CLASS: &str = "se-component-selected";

const LINE_TAGS: &[&str] = &[
    "P", "DIV", "H1", "H2", "H3", "H4", "H5", "H6", "PRE", "LI", "TH", "TD", "DETAILS",
];
const BLOCK_TAGS: &[&str] = &[
    "BLOCKQUOTE", "OL", "UL", "FIGCAPTION", "TABLE", "THEAD", "TBODY", "TR", "TH", "TD", "DETAILS",
];

pub type Until<'a> = Option<&'a dyn Fn(&Document, NodeId) -> bool>;

pub fn is_wysiwyg_frame(doc: &Document, node: NodeId) -> bool {
    doc.has_class(node, WYSIWYG_CLASS)
}

pub fn is_table_cell(doc: &Document, node: NodeId) -> bool {
    doc.is_tag(node, "TD") || doc.is_tag(node, "TH")
}

pub fn is_figure(doc: &Document, node: NodeId) -> bool {
    doc.is_tag(node, "FIGURE")
}

pub trait FormatClassifier {
    fn is_line(&self, doc: &Document, node: NodeId) -> bool;

    fn is_block(&self, doc: &Document, node: NodeId) -> bool;

    /// Closest inclusive ancestor that is a line, never climbing past the
    /// editable surface or a node accepted by `until`.
    fn get_line(&self, doc: &Document, node: NodeId, until: Until<'_>) -> Option<NodeId> {
        climb(doc, node, until, |n| self.is_line(doc, n))
    }

    fn get_block(&self, doc: &Document, node: NodeId, until: Until<'_>) -> Option<NodeId> {
        climb(doc, node, until, |n| self.is_block(doc, n))
    }
}

fn climb(
    doc: &Document,
    node: NodeId,
    until: Until<'_>,
    accept: impl Fn(NodeId) -> bool,
) -> Option<NodeId> {
    let mut current = Some(node);
    while let Some(n) = current {
        if is_wysiwyg_frame(doc, n) {
            return None;
        }
        if until.is_some_and(|stop| stop(doc, n)) {
            return None;
        }
        if accept(n) {
            return Some(n);
        }
        current = doc.parent(n);
    }
    None
}

/// Tag-name based classifier matching the stock editor schema.
#[derive(Debug, Clone, Default)]
pub struct DefaultFormat;

impl FormatClassifier for DefaultFormat {
    fn is_line(&self, doc: &Document, node: NodeId) -> bool {
        let Some(el) = doc.element(node) else {
            return false;
        };
        !is_wysiwyg_frame(doc, node)
            && (LINE_TAGS.contains(&el.tag.as_str())
                || el.classes.iter().any(|c| c.starts_with("__se__format__line")))
    }

    fn is_block(&self, doc: &Document, node: NodeId) -> bool {
        let Some(el) = doc.element(node) else {
            return false;
        };
        !is_wysiwyg_frame(doc, node)
            && (BLOCK_TAGS.contains(&el.tag.as_str())
                || el.classes.iter().any(|c| c.starts_with("__se__format__block")))
    }
}

/// Tag names owned by file-managing plugins, and which plugin owns each.
#[derive(Debug, Clone, Default)]
pub struct FileManager {
    tags: Vec<String>,
    plugin_map: IndexMap<String, String>,
}

impl FileManager {
    pub fn register(&mut self, plugin: &str, tag_names: &[String]) {
        for tag in tag_names {
            let tag = tag.to_ascii_lowercase();
            if !self.tags.contains(&tag) {
                self.tags.push(tag.clone());
            }
            self.plugin_map.insert(tag, plugin.to_string());
        }
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn is_file_tag(&self, node_name: &str) -> bool {
        let name = node_name.to_ascii_lowercase();
        self.tags.iter().any(|t| *t == name)
    }

    pub fn plugin_for(&self, node_name: &str) -> Option<&str> {
        self.plugin_map
            .get(&node_name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.tags.clear();
        self.plugin_map.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentInfo {
    pub container: NodeId,
    pub target: NodeId,
    pub plugin_name: String,
}

pub trait ComponentClassifier {
    /// Atomic non-text unit (image, video, table wrapper, rule...).
    fn is(&self, doc: &Document, node: NodeId) -> bool;

    fn get(&self, doc: &Document, node: NodeId, files: &FileManager) -> Option<ComponentInfo>;

    /// Hands focus to the component. The selection is no longer text-based
    /// afterwards.
    fn select(&mut self, doc: &mut Document, info: &ComponentInfo);

    fn deselect(&mut self, doc: &mut Document);
}

#[derive(Debug, Clone, Default)]
pub struct DefaultComponent {
    selected: Option<ComponentInfo>,
}

impl DefaultComponent {
    pub fn selected(&self) -> Option<&ComponentInfo> {
        self.selected.as_ref()
    }
}

impl ComponentClassifier for DefaultComponent {
    fn is(&self, doc: &Document, node: NodeId) -> bool {
        doc.has_class(node, COMPONENT_CLASS) || is_figure(doc, node) || doc.is_tag(node, "HR")
    }

    fn get(&self, doc: &Document, node: NodeId, files: &FileManager) -> Option<ComponentInfo> {
        if let Some(plugin) = files.plugin_for(doc.node_name(node)) {
            let container = doc
                .closest(node, |d, n| self.is(d, n))
                .unwrap_or(node);
            return Some(ComponentInfo {
                container,
                target: node,
                plugin_name: plugin.to_string(),
            });
        }

        let container = doc.closest(node, |d, n| self.is(d, n))?;
        let target = doc
            .descendants_where(container, |d, n| files.is_file_tag(d.node_name(n)))
            .into_iter()
            .next()?;
        let plugin_name = files.plugin_for(doc.node_name(target))?.to_string();
        Some(ComponentInfo {
            container,
            target,
            plugin_name,
        })
    }

    fn select(&mut self, doc: &mut Document, info: &ComponentInfo) {
        self.deselect(doc);
        doc.add_class(info.container, COMPONENT_SELECTED_CLASS);
        self.selected = Some(info.clone());
    }

    fn deselect(&mut self, doc: &mut Document) {
        if let Some(prev) = self.selected.take() {
            doc.remove_class(prev.container, COMPONENT_SELECTED_CLASS);
        }
    }
}

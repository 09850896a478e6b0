use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::dom::{Document, DomError, NodeData, NodeId, parse_style_text, style_text};

const DEFAULT_SCHEMA: &str = "wysiwyg-core";
const DEFAULT_VERSION: u32 = 1;

fn default_schema() -> String {
    DEFAULT_SCHEMA.to_string()
}

fn default_version() -> u32 {
    DEFAULT_VERSION
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum ContentNode {
    Element(ElementContent),
    Text(TextContent),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementContent {
    pub tag: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attrs: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default)]
    pub children: Vec<ContentNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    pub text: String,
}

impl ContentNode {
    pub fn element(tag: impl Into<String>, children: Vec<ContentNode>) -> Self {
        ContentNode::Element(ElementContent {
            tag: tag.into(),
            attrs: IndexMap::new(),
            classes: Vec::new(),
            style: None,
            children,
        })
    }

    pub fn text(text: impl Into<String>) -> Self {
        ContentNode::Text(TextContent { text: text.into() })
    }

    /// A line element holding one text leaf, or a break when `text` is empty.
    pub fn line(tag: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let child = if text.is_empty() {
            ContentNode::element("br", Vec::new())
        } else {
            ContentNode::text(text)
        };
        ContentNode::element(tag, vec![child])
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::line("p", text)
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        if let ContentNode::Element(el) = &mut self {
            el.classes.push(class.into());
        }
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let ContentNode::Element(el) = &mut self {
            el.attrs.insert(name.into(), value.into());
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentValue {
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub content: Vec<ContentNode>,
}

impl ContentValue {
    pub fn from_nodes(content: Vec<ContentNode>) -> Self {
        Self {
            schema: default_schema(),
            version: default_version(),
            content,
        }
    }

    pub fn into_nodes(self) -> Vec<ContentNode> {
        self.content
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl Document {
    /// Builds `node` under `parent` (appended) and returns the new subtree root.
    pub fn import(&mut self, parent: NodeId, node: &ContentNode) -> Result<NodeId, DomError> {
        let id = self.build(node);
        self.append_child(parent, id)?;
        Ok(id)
    }

    /// Builds a detached subtree from content.
    pub fn build(&mut self, node: &ContentNode) -> NodeId {
        match node {
            ContentNode::Text(t) => self.create_text(t.text.clone()),
            ContentNode::Element(el) => {
                let id = self.create_element(&el.tag);
                if let Some(target) = self.element_mut(id) {
                    target.attrs = el.attrs.clone();
                    target.classes = el.classes.iter().cloned().collect();
                    if let Some(style) = &el.style {
                        target.style = parse_style_text(style);
                    }
                }
                for child in &el.children {
                    let child_id = self.build(child);
                    // Freshly created nodes cannot violate hierarchy rules.
                    let _ = self.append_child(id, child_id);
                }
                id
            }
        }
    }

    pub fn export(&self, id: NodeId) -> Option<ContentNode> {
        match self.data(id)? {
            NodeData::Text(t) => Some(ContentNode::text(t.clone())),
            NodeData::Element(el) => Some(ContentNode::Element(ElementContent {
                tag: el.tag.to_ascii_lowercase(),
                attrs: el.attrs.clone(),
                classes: el.classes.iter().cloned().collect(),
                style: (!el.style.is_empty()).then(|| style_text(&el.style)),
                children: self
                    .children(id)
                    .iter()
                    .filter_map(|&c| self.export(c))
                    .collect(),
            })),
        }
    }

    pub fn export_children(&self, id: NodeId) -> Vec<ContentNode> {
        self.children(id)
            .iter()
            .filter_map(|&c| self.export(c))
            .collect()
    }

    /// Replaces every child of `parent` with `content`.
    pub fn replace_children(
        &mut self,
        parent: NodeId,
        content: &[ContentNode],
    ) -> Result<(), DomError> {
        for child in self.children(parent).to_vec() {
            self.remove(child);
        }
        for node in content {
            self.import(parent, node)?;
        }
        Ok(())
    }
}

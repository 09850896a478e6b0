use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::dom::NodeId;
use crate::events::InputEvent;
use crate::session::Session;
use crate::toolbar::ButtonId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CommandError {
    message: String,
}

impl CommandError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// How a trigger element hands control to its command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerKind {
    Command,
    Dropdown,
    Modal,
    Container,
    FileBrowser,
    More,
}

impl TriggerKind {
    /// Any kind name containing `more` (case-insensitive) opens a more layer.
    pub fn parse(kind: &str) -> Option<Self> {
        if kind.to_ascii_lowercase().contains("more") {
            return Some(Self::More);
        }
        match kind {
            "command" => Some(Self::Command),
            "dropdown" => Some(Self::Dropdown),
            "modal" => Some(Self::Modal),
            "container" => Some(Self::Container),
            "fileBrowser" => Some(Self::FileBrowser),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Command => "command",
            Self::Dropdown => "dropdown",
            Self::Modal => "modal",
            Self::Container => "container",
            Self::FileBrowser => "fileBrowser",
            Self::More => "MORE",
        }
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type Hook = Arc<dyn Fn(&mut Session) -> Result<(), CommandError> + Send + Sync>;
pub type TargetHook =
    Arc<dyn Fn(&mut Session, Option<ButtonId>) -> Result<(), CommandError> + Send + Sync>;
/// Asked for each ancestor of the selection; true marks the trigger active.
pub type ActiveHook = Arc<dyn Fn(&mut Session, Option<NodeId>, Option<ButtonId>) -> bool + Send + Sync>;
pub type DirHook = Arc<dyn Fn(&mut Session, &str) + Send + Sync>;
/// Returning false stops the event from reaching the editor.
pub type EventHook = Arc<dyn Fn(&mut Session, &InputEvent) -> bool + Send + Sync>;
pub type ElementHook = Arc<dyn Fn(&mut Session, NodeId) + Send + Sync>;

#[derive(Clone)]
pub struct PreservedClass {
    pub class_name: String,
    pub method: ElementHook,
}

#[derive(Clone)]
pub struct FileManagement {
    pub tag_names: Vec<String>,
    pub check_info: Hook,
    pub reset_info: Hook,
}

/// A plugin instance. Every capability is optional.
#[derive(Clone)]
pub struct Plugin {
    pub title: Option<String>,
    pub icon: Option<String>,
    pub init: Option<Hook>,
    pub action: Option<Hook>,
    pub open: Option<TargetHook>,
    pub active: Option<ActiveHook>,
    pub set_dir: Option<DirHook>,
    pub on_mousedown: Option<EventHook>,
    pub on_keydown: Option<EventHook>,
    pub preserved_class: Option<PreservedClass>,
    pub file_management: Option<FileManagement>,
    pub destroy: Option<Hook>,
}

impl Default for Plugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin {
    pub fn new() -> Self {
        Self {
            title: None,
            icon: None,
            init: None,
            action: None,
            open: None,
            active: None,
            set_dir: None,
            on_mousedown: None,
            on_keydown: None,
            preserved_class: None,
            file_management: None,
            destroy: None,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn init(
        mut self,
        f: impl Fn(&mut Session) -> Result<(), CommandError> + Send + Sync + 'static,
    ) -> Self {
        self.init = Some(Arc::new(f));
        self
    }

    pub fn action(
        mut self,
        f: impl Fn(&mut Session) -> Result<(), CommandError> + Send + Sync + 'static,
    ) -> Self {
        self.action = Some(Arc::new(f));
        self
    }

    pub fn open(
        mut self,
        f: impl Fn(&mut Session, Option<ButtonId>) -> Result<(), CommandError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.open = Some(Arc::new(f));
        self
    }

    pub fn active(
        mut self,
        f: impl Fn(&mut Session, Option<NodeId>, Option<ButtonId>) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.active = Some(Arc::new(f));
        self
    }

    pub fn set_dir(mut self, f: impl Fn(&mut Session, &str) + Send + Sync + 'static) -> Self {
        self.set_dir = Some(Arc::new(f));
        self
    }

    pub fn on_mousedown(
        mut self,
        f: impl Fn(&mut Session, &InputEvent) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.on_mousedown = Some(Arc::new(f));
        self
    }

    pub fn on_keydown(
        mut self,
        f: impl Fn(&mut Session, &InputEvent) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.on_keydown = Some(Arc::new(f));
        self
    }

    pub fn preserved_class(
        mut self,
        class_name: impl Into<String>,
        method: impl Fn(&mut Session, NodeId) + Send + Sync + 'static,
    ) -> Self {
        self.preserved_class = Some(PreservedClass {
            class_name: class_name.into(),
            method: Arc::new(method),
        });
        self
    }

    pub fn file_management<I, S>(
        mut self,
        tag_names: I,
        check_info: impl Fn(&mut Session) -> Result<(), CommandError> + Send + Sync + 'static,
        reset_info: impl Fn(&mut Session) -> Result<(), CommandError> + Send + Sync + 'static,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.file_management = Some(FileManagement {
            tag_names: tag_names.into_iter().map(Into::into).collect(),
            check_info: Arc::new(check_info),
            reset_info: Arc::new(reset_info),
        });
        self
    }

    pub fn destroy(
        mut self,
        f: impl Fn(&mut Session) -> Result<(), CommandError> + Send + Sync + 'static,
    ) -> Self {
        self.destroy = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("title", &self.title)
            .field("action", &self.action.is_some())
            .field("open", &self.open.is_some())
            .field("active", &self.active.is_some())
            .field("file_management", &self.file_management.is_some())
            .finish_non_exhaustive()
    }
}

/// Builds a plugin instance from its per-instance options.
#[derive(Clone)]
pub struct PluginFactory {
    pub name: String,
    pub kind: TriggerKind,
    pub build: Arc<dyn Fn(&Value) -> Plugin + Send + Sync>,
}

impl PluginFactory {
    pub fn new(
        name: impl Into<String>,
        kind: TriggerKind,
        build: impl Fn(&Value) -> Plugin + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            build: Arc::new(build),
        }
    }
}

impl fmt::Debug for PluginFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginFactory")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// A registered plugin, instantiated on first registration.
#[derive(Debug, Clone)]
pub enum PluginSlot {
    Pending(PluginFactory),
    Ready { kind: TriggerKind, plugin: Plugin },
}

impl PluginSlot {
    pub fn kind(&self) -> TriggerKind {
        match self {
            Self::Pending(factory) => factory.kind,
            Self::Ready { kind, .. } => *kind,
        }
    }

    pub fn plugin(&self) -> Option<&Plugin> {
        match self {
            Self::Pending(_) => None,
            Self::Ready { plugin, .. } => Some(plugin),
        }
    }
}

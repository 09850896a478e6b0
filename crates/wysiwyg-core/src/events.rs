use std::collections::VecDeque;
use std::fmt;

use crate::dom::NodeId;
use crate::frame::RootKey;
use crate::session::Session;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputEvent {
    pub key: String,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub target: Option<NodeId>,
}

impl InputEvent {
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn at(target: NodeId) -> Self {
        Self {
            target: Some(target),
            ..Self::default()
        }
    }
}

type Callback = Box<dyn FnMut(&RootKey) + Send>;
type HtmlCallback = Box<dyn FnMut(&RootKey, &str) + Send>;
type ResizeCallback = Box<dyn FnMut(&RootKey, u32, u32) + Send>;

/// Host callbacks.
#[derive(Default)]
pub struct Events {
    pub on_load: Option<Box<dyn FnMut() + Send>>,
    pub on_change: Option<HtmlCallback>,
    pub on_save: Option<HtmlCallback>,
    pub on_print: Option<HtmlCallback>,
    pub on_preview: Option<HtmlCallback>,
    pub on_resize_editor: Option<ResizeCallback>,
    pub on_focus: Option<Callback>,
    pub on_blur: Option<Callback>,
}

impl Events {
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

impl fmt::Debug for Events {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Events")
            .field("on_load", &self.on_load.is_some())
            .field("on_change", &self.on_change.is_some())
            .field("on_save", &self.on_save.is_some())
            .finish_non_exhaustive()
    }
}

pub(crate) type Deferred = Box<dyn FnOnce(&mut Session) + Send>;

/// Continuations scheduled to run after the current call returns.
#[derive(Default)]
pub(crate) struct DeferredQueue {
    queue: VecDeque<Deferred>,
}

impl DeferredQueue {
    pub(crate) fn push(&mut self, task: Deferred) {
        self.queue.push_back(task);
    }

    pub(crate) fn pop(&mut self) -> Option<Deferred> {
        self.queue.pop_front()
    }

    pub(crate) fn len(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn clear(&mut self) {
        self.queue.clear();
    }
}

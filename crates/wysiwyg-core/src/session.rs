use indexmap::{IndexMap, IndexSet};
use serde_json::Value;

use crate::classify::{
    ComponentClassifier, DefaultComponent, DefaultFormat, FileManager, FormatClassifier,
    is_wysiwyg_frame,
};
use crate::content::{ContentNode, ContentValue};
use crate::dom::NodeId;
use crate::error::SessionError;
use crate::events::{DeferredQueue, Events};
use crate::frame::{FrameContext, RootKey, RootTarget};
use crate::history::{History, SnapshotHistory};
use crate::options::{DEFAULT_HISTORY_DELAY_MS, OptionMap, Options, init_session_options, value_to_map};
use crate::plugin::{ElementHook, EventHook, Hook, Plugin, PluginFactory, PluginSlot};
use crate::selection::Selection;
use crate::shortcuts::ShortcutMap;
use crate::toolbar::{ButtonId, Menu, Toolbar, Tray};

/// Commands the session handles without a plugin.
pub const BASIC_COMMANDS: &[&str] = &[
    "selectAll",
    "codeView",
    "fullScreen",
    "indent",
    "outdent",
    "undo",
    "redo",
    "removeFormat",
    "print",
    "preview",
    "showBlocks",
    "save",
    "bold",
    "underline",
    "italic",
    "strike",
    "subscript",
    "superscript",
    "copy",
    "cut",
    "paste",
    "dir",
    "dir_ltr",
    "dir_rtl",
];

/// Commands whose buttons reflect the selection.
pub const ACTIVE_EVENT_COMMANDS: &[&str] = &[
    "bold",
    "underline",
    "italic",
    "strike",
    "subscript",
    "superscript",
    "indent",
    "outdent",
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Status {
    pub is_read_only: bool,
    pub is_disabled: bool,
    pub is_changed: bool,
    pub is_alive: bool,
}

/// Replaceable collaborators of a session.
pub struct Collaborators {
    pub history: Box<dyn History>,
    pub format: Box<dyn FormatClassifier>,
    pub component: Box<dyn ComponentClassifier>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            history: Box::new(SnapshotHistory::default()),
            format: Box::new(DefaultFormat),
            component: Box::new(DefaultComponent::default()),
        }
    }
}

/// Hooks gathered from plugins at startup.
#[derive(Default)]
pub(crate) struct PluginHooks {
    pub(crate) file_checks: Vec<Hook>,
    pub(crate) file_resets: Vec<Hook>,
    pub(crate) mousedown: Vec<EventHook>,
    pub(crate) keydown: Vec<EventHook>,
    pub(crate) preserved: IndexMap<String, ElementHook>,
}

/// One editing session over one or more roots.
pub struct Session {
    pub(crate) roots: IndexMap<RootKey, FrameContext>,
    pub(crate) active: RootKey,
    pub(crate) options: Options,
    pub(crate) origin_options: OptionMap,
    pub(crate) plugin_options: OptionMap,
    pub(crate) plugins: IndexMap<String, PluginSlot>,
    pub(crate) hooks: PluginHooks,
    pub(crate) toolbar: Toolbar,
    pub(crate) menu: Menu,
    pub(crate) command_targets: IndexMap<String, IndexSet<ButtonId>>,
    pub(crate) shortcuts: ShortcutMap,
    pub(crate) active_commands: IndexSet<String>,
    pub(crate) code_view_disabled: Vec<ButtonId>,
    pub(crate) controller_disabled: Vec<ButtonId>,
    pub(crate) history: Box<dyn History>,
    pub(crate) format: Box<dyn FormatClassifier>,
    pub(crate) component: Box<dyn ComponentClassifier>,
    pub(crate) files: FileManager,
    pub(crate) events: Events,
    pub(crate) deferred: DeferredQueue,
    pub(crate) status: Status,
    pub(crate) effect_node: Option<NodeId>,
    pub(crate) clipboard: String,
}

impl Session {
    pub fn new(
        targets: Vec<RootTarget>,
        options: Value,
        factories: Vec<PluginFactory>,
    ) -> Result<Self, SessionError> {
        Self::with_collaborators(targets, options, factories, Collaborators::default())
    }

    pub fn with_collaborators(
        targets: Vec<RootTarget>,
        options: Value,
        factories: Vec<PluginFactory>,
        collaborators: Collaborators,
    ) -> Result<Self, SessionError> {
        let Some(first) = targets.first() else {
            return Err(SessionError::NoRoots);
        };
        let active = first.key.clone();

        let origin = value_to_map(&options);
        let root_keys: Vec<String> = targets.iter().map(|t| t.key.to_string()).collect();
        let session_options = init_session_options(&origin, &root_keys);

        let plugins: IndexMap<String, PluginSlot> = factories
            .into_iter()
            .map(|f| (f.name.clone(), PluginSlot::Pending(f)))
            .collect();

        let mut origin_options = OptionMap::new();
        let mut plugin_options = OptionMap::new();
        for (k, v) in &origin {
            if root_keys.contains(k) {
                continue;
            }
            if plugins.contains_key(k) {
                plugin_options.insert(k.clone(), v.clone());
            }
            origin_options.insert(k.clone(), v.clone());
        }

        let default_line = session_options
            .get_str("defaultLine")
            .unwrap_or("p")
            .to_string();
        let mut roots = IndexMap::new();
        for target in &targets {
            let mut target = target.clone();
            for (k, v) in origin.get(target.key.as_str()).map(value_to_map).unwrap_or_default() {
                target.options.insert(k, v);
            }
            let frame = FrameContext::new(&target, &origin_options, &default_line)?;
            roots.insert(target.key.clone(), frame);
        }

        let mut history = collaborators.history;
        history.reset_delay_time(
            session_options
                .get_u64("historyStackDelayTime")
                .unwrap_or(DEFAULT_HISTORY_DELAY_MS),
        );

        let mut session = Self {
            roots,
            active,
            options: session_options,
            origin_options,
            plugin_options,
            plugins,
            hooks: PluginHooks::default(),
            toolbar: Toolbar::default(),
            menu: Menu::default(),
            command_targets: IndexMap::new(),
            shortcuts: ShortcutMap::default(),
            active_commands: IndexSet::new(),
            code_view_disabled: Vec::new(),
            controller_disabled: Vec::new(),
            history,
            format: collaborators.format,
            component: collaborators.component,
            files: FileManager::default(),
            events: Events::default(),
            deferred: DeferredQueue::default(),
            status: Status {
                is_alive: true,
                ..Status::default()
            },
            effect_node: None,
            clipboard: String::new(),
        };

        session.build_toolbar();
        session.set_frame_info();
        session.init_plugins()?;
        session.check_components()?;
        session.cache_disabled_buttons();
        if session.options.get_bool("_rtl") {
            session.apply_dir_classes(true);
        }
        session.schedule_editor_init();
        Ok(session)
    }

    fn build_toolbar(&mut self) {
        let has_sub = self.options.has("_subMode");
        let mut toolbar = Toolbar::new(has_sub);
        toolbar.main.shortcut_hint = self.options.get_bool("shortcutsHint");
        toolbar.main.hidden = self.options.get_bool("toolbar_hide");
        toolbar.set_rtl(self.options.get_bool("_rtl"));

        let plugins = &self.plugins;
        let known = |name: &str| BASIC_COMMANDS.contains(&name) || plugins.contains_key(name);
        let kind_of = |name: &str| plugins.get(name).map(PluginSlot::kind);

        let main_list = self.options.get("buttonList").cloned().unwrap_or(Value::Null);
        let mut ids = toolbar.load(&main_list, Tray::Main, known, kind_of);
        if has_sub {
            let sub_list = self
                .options
                .get("subToolbar")
                .and_then(|s| s.get("buttonList"))
                .cloned()
                .unwrap_or(Value::Null);
            ids.extend(toolbar.load(&sub_list, Tray::Sub, known, kind_of));
        }
        self.toolbar = toolbar;

        for id in ids {
            let Some(command) = self.toolbar.button(id).map(|b| b.command.clone()) else {
                continue;
            };
            self.set_command_target(&command, id);

            let spec = self
                .options
                .get("shortcuts")
                .and_then(|s| s.get(&command))
                .cloned();
            if let Some(spec) = spec {
                let hint = self.shortcuts.bind(&command, id, &spec);
                if let Some(button) = self.toolbar.button_mut(id) {
                    button.shortcut = hint;
                }
            }
        }
    }

    /// Instantiates every plugin, binds its buttons and collects its hooks.
    fn init_plugins(&mut self) -> Result<(), SessionError> {
        self.active_commands = ACTIVE_EVENT_COMMANDS.iter().map(|c| c.to_string()).collect();
        self.hooks = PluginHooks::default();
        self.files.clear();

        let names: Vec<String> = self.plugins.keys().cloned().collect();
        for name in names {
            let options = self.plugin_options.get(&name).cloned();
            for tray in [Tray::Main, Tray::Sub] {
                let targets: Vec<ButtonId> = self
                    .toolbar
                    .buttons()
                    .filter(|(_, b)| b.command == name && b.tray == tray)
                    .map(|(id, _)| id)
                    .collect();
                self.register_plugin(&name, &targets, options.as_ref())?;
            }

            let Some(plugin) = self.plugin(&name).cloned() else {
                continue;
            };
            if let Some(fm) = plugin.file_management {
                self.hooks.file_checks.push(fm.check_info);
                self.hooks.file_resets.push(fm.reset_info);
                self.files.register(&name, &fm.tag_names);
            }
            if let Some(hook) = plugin.on_mousedown {
                self.hooks.mousedown.push(hook);
            }
            if let Some(hook) = plugin.on_keydown {
                self.hooks.keydown.push(hook);
            }
            if let Some(preserved) = plugin.preserved_class {
                self.hooks
                    .preserved
                    .insert(preserved.class_name, preserved.method);
            }
        }
        Ok(())
    }

    fn cache_disabled_buttons(&mut self) {
        let mut code_view = Vec::new();
        let mut controller = Vec::new();
        for (id, button) in self.toolbar.buttons() {
            if !button.code_view_enabled {
                code_view.push(id);
            }
            if !button.read_only_enabled {
                controller.push(id);
            }
        }
        self.code_view_disabled = code_view;
        self.controller_disabled = controller;

        for command in ["save", "undo", "redo"] {
            self.apply_command_targets(command, |b| b.disabled = true);
        }
    }

    fn schedule_editor_init(&mut self) {
        self.deferred.push(Box::new(|session: &mut Session| {
            if !session.status.is_alive {
                return;
            }
            let keys: Vec<RootKey> = session.roots.keys().cloned().collect();
            for key in keys {
                session.resources_state_change(&key);
            }
            session.history.reset(&session.roots);
            session.refresh_history_buttons();
            if let Some(on_load) = session.events.on_load.as_mut() {
                on_load();
            }
        }));
    }

    /// Runs scheduled continuations until the queue is empty.
    pub fn flush_deferred(&mut self) {
        while let Some(task) = self.deferred.pop() {
            task(self);
        }
    }

    pub fn pending_deferred(&self) -> usize {
        self.deferred.len()
    }

    // --- accessors ---

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn toolbar(&self) -> &Toolbar {
        &self.toolbar
    }

    pub fn menu(&self) -> &Menu {
        &self.menu
    }

    pub fn events_mut(&mut self) -> &mut Events {
        &mut self.events
    }

    pub fn history(&self) -> &dyn History {
        &*self.history
    }

    pub fn files(&self) -> &FileManager {
        &self.files
    }

    pub fn component(&self) -> &dyn ComponentClassifier {
        &*self.component
    }

    pub fn format(&self) -> &dyn FormatClassifier {
        &*self.format
    }

    pub fn clipboard(&self) -> &str {
        &self.clipboard
    }

    pub fn effect_node(&self) -> Option<NodeId> {
        self.effect_node
    }

    pub fn command_targets(&self, command: &str) -> Vec<ButtonId> {
        self.command_targets
            .get(command)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn shortcuts(&self) -> &ShortcutMap {
        &self.shortcuts
    }

    pub fn active_commands(&self) -> &IndexSet<String> {
        &self.active_commands
    }

    pub fn plugin(&self, name: &str) -> Option<&Plugin> {
        self.plugins.get(name).and_then(PluginSlot::plugin)
    }

    pub fn root_keys(&self) -> Vec<RootKey> {
        self.roots.keys().cloned().collect()
    }

    pub fn active_root(&self) -> &RootKey {
        &self.active
    }

    pub fn frame(&self) -> Option<&FrameContext> {
        self.roots.get(&self.active)
    }

    pub fn frame_mut(&mut self) -> Option<&mut FrameContext> {
        self.roots.get_mut(&self.active)
    }

    pub fn frame_by_key(&self, key: &str) -> Option<&FrameContext> {
        self.roots.get(&RootKey::new(key))
    }

    pub fn has_focus(&self) -> bool {
        self.frame().is_some_and(|f| f.focused().is_some())
    }

    /// Selection engine bound to the active root.
    pub fn selection(&mut self) -> Result<Selection<'_>, SessionError> {
        let frame = self
            .roots
            .get_mut(&self.active)
            .ok_or(SessionError::Destroyed)?;
        let default_line = self.options.get_str("defaultLine").unwrap_or("p");
        Ok(Selection::new(
            frame,
            &*self.format,
            &*self.component,
            &self.files,
            default_line,
        ))
    }

    /// Drops the active root's selection and clears every active button.
    pub fn remove_range(&mut self) -> Result<(), SessionError> {
        self.selection()?.remove_range();
        let commands: Vec<String> = self.active_commands.iter().cloned().collect();
        for command in commands {
            self.apply_command_targets(&command, |b| b.active = false);
        }
        self.effect_node = None;
        Ok(())
    }

    pub(crate) fn root_key_or_active(&self, key: Option<&str>) -> Result<RootKey, SessionError> {
        match key {
            None => Ok(self.active.clone()),
            Some(k) if self.roots.contains_key(&RootKey::new(k)) => Ok(RootKey::new(k)),
            Some(k) => Err(SessionError::UnknownRoot(k.to_string())),
        }
    }

    pub(crate) fn frame_for_mut(&mut self, key: &RootKey) -> Result<&mut FrameContext, SessionError> {
        self.roots
            .get_mut(key)
            .ok_or_else(|| SessionError::UnknownRoot(key.to_string()))
    }

    // --- root registry ---

    /// Makes `key` the root every later operation targets.
    pub fn change_frame_context(&mut self, key: &str) {
        let key = RootKey::new(key);
        if key == self.active {
            return;
        }
        if !self.roots.contains_key(&key) {
            tracing::warn!(root = %key, "change_frame_context: unknown root");
            return;
        }
        if let Some(frame) = self.roots.get_mut(&self.active) {
            self.component.deselect(&mut frame.doc);
        }
        tracing::debug!(from = %self.active, to = %key, "switch frame context");
        self.active = key;
        // Node ids are only unique within one root's document.
        self.effect_node = None;
        self.set_frame_info();
        self.toolbar.reset_sticky();
    }

    pub(crate) fn set_frame_info(&mut self) {
        if let Some(frame) = self.roots.get_mut(&self.active) {
            frame.editor_height = frame.layout_height();
        }
    }

    pub fn apply_root_targets(&mut self, mut f: impl FnMut(&mut FrameContext)) {
        for frame in self.roots.values_mut() {
            f(frame);
        }
    }

    // --- surface operations ---

    pub fn is_empty(&self, key: Option<&str>) -> bool {
        let frame = match key {
            Some(k) => self.frame_by_key(k),
            None => self.frame(),
        };
        frame.is_none_or(FrameContext::is_empty)
    }

    pub fn focus(&mut self, key: Option<&str>) -> Result<(), SessionError> {
        if let Some(k) = key {
            self.change_frame_context(k);
        }
        let frame = self.frame_for_mut(&self.active.clone())?;
        if !frame.doc.is_displayed(frame.wysiwyg_frame) {
            return Ok(());
        }
        let iframe = frame.is_iframe();

        let mut sel = self.selection()?;
        let node = sel.get_node();
        let inside = node.is_some_and(|n| sel.contains(n));
        if iframe || !inside {
            sel.native_focus();
        } else {
            let range = sel.get_range();
            let surface_caret = range.start_container() == range.end_container()
                && is_wysiwyg_frame(sel.doc(), range.start_container());
            if surface_caret && sel.needs_line_at(range.start_offset()) {
                sel.insert_line_at(range.start_offset());
            } else {
                sel.set_range(
                    range.start_container(),
                    range.start_offset(),
                    range.end_container(),
                    range.end_offset(),
                );
            }
            sel.mark_focused();
        }

        self.apply_tag_effect();
        let active = self.active.clone();
        if let Some(on_focus) = self.events.on_focus.as_mut() {
            on_focus(&active);
        }
        Ok(())
    }

    /// Selects `node` when it is a component, otherwise puts the caret at the
    /// end of its last leaf. Defaults to the surface's last element.
    pub fn focus_edge(&mut self, node: Option<NodeId>) -> Result<(), SessionError> {
        let frame = self
            .roots
            .get_mut(&self.active)
            .ok_or(SessionError::Destroyed)?;
        let node = node.or_else(|| frame.doc.last_element_child(frame.wysiwyg));

        let info = node.and_then(|n| self.component.get(&frame.doc, n, &self.files));
        if let Some(info) = info {
            self.component.select(&mut frame.doc, &info);
            return Ok(());
        }
        let Some(node) = node else {
            return self.focus(None);
        };

        let leaf = frame.doc.edge_child(node, |d, n| d.is_leaf(n), true);
        let mut sel = self.selection()?;
        match leaf {
            Some(leaf) => {
                let len = sel.doc().text_len(leaf);
                sel.set_range(leaf, len, leaf, len);
                sel.mark_focused();
            }
            None => sel.native_focus(),
        }
        Ok(())
    }

    pub fn blur(&mut self) {
        if let Err(err) = self.remove_range() {
            tracing::debug!(error = %err, "blur without an active root");
        }
        if let Some(frame) = self.frame_mut() {
            frame.focused = None;
        }
        let active = self.active.clone();
        if let Some(on_blur) = self.events.on_blur.as_mut() {
            on_blur(&active);
        }
    }

    pub fn read_only(&mut self, value: bool, key: Option<&str>) -> Result<(), SessionError> {
        let key = self.root_key_or_active(key)?;
        self.status.is_read_only = value;
        let disabled = self.controller_disabled.clone();
        self.toolbar.set_disabled(&disabled, value);

        if value {
            for tray in [Tray::Main, Tray::Sub] {
                let more = self.toolbar.tray(tray).and_then(|t| t.more_layer_active);
                if self.is_button_disabled(more) {
                    self.toolbar.more_layer_off(tray);
                }
            }
            if self.is_button_disabled(self.menu.current_dropdown) {
                self.menu.dropdown_off(&mut self.toolbar);
            }
            if self.is_button_disabled(self.menu.current_container) {
                self.menu.container_off(&mut self.toolbar);
            }
        }

        let frame = self.frame_for_mut(&key)?;
        if value {
            frame.doc.set_attr(frame.code, "readonly", "true");
            frame.doc.add_class(frame.wysiwyg_frame, "se-read-only");
        } else {
            frame.doc.remove_attr(frame.code, "readonly");
            frame.doc.remove_class(frame.wysiwyg_frame, "se-read-only");
        }
        Ok(())
    }

    fn is_button_disabled(&self, id: Option<ButtonId>) -> bool {
        id.and_then(|id| self.toolbar.button(id))
            .is_some_and(|b| b.disabled)
    }

    pub fn disable(&mut self, key: Option<&str>) -> Result<(), SessionError> {
        let key = self.root_key_or_active(key)?;
        self.toolbar.disable();
        self.menu.dropdown_off(&mut self.toolbar);
        self.menu.container_off(&mut self.toolbar);
        if let Some(frame) = self.roots.get_mut(&self.active) {
            self.component.deselect(&mut frame.doc);
        }

        let frame = self.frame_for_mut(&key)?;
        frame.doc.set_attr(frame.wysiwyg, "contenteditable", "false");
        frame.doc.set_attr(frame.code, "disabled", "disabled");
        self.status.is_disabled = true;
        Ok(())
    }

    pub fn enable(&mut self, key: Option<&str>) -> Result<(), SessionError> {
        let key = self.root_key_or_active(key)?;
        self.toolbar.enable();
        if self.status.is_read_only {
            let ids = self.controller_disabled.clone();
            self.toolbar.set_disabled(&ids, true);
        }
        if self.frame().is_some_and(|f| f.is_code_view) {
            let ids = self.code_view_disabled.clone();
            self.toolbar.set_disabled(&ids, true);
        }
        self.refresh_history_buttons();

        let frame = self.frame_for_mut(&key)?;
        frame.doc.set_attr(frame.wysiwyg, "contenteditable", "true");
        frame.doc.remove_attr(frame.code, "disabled");
        self.status.is_disabled = false;
        Ok(())
    }

    pub fn show(&mut self, key: Option<&str>) -> Result<(), SessionError> {
        let key = self.root_key_or_active(key)?;
        let frame = self.frame_for_mut(&key)?;
        if !frame.doc.is_displayed(frame.top_area) {
            frame.doc.set_style(frame.top_area, "display", "block");
        }
        Ok(())
    }

    pub fn hide(&mut self, key: Option<&str>) -> Result<(), SessionError> {
        let key = self.root_key_or_active(key)?;
        let frame = self.frame_for_mut(&key)?;
        frame.doc.set_style(frame.top_area, "display", "none");
        Ok(())
    }

    pub fn set_editor_style(&mut self, style: &str, key: Option<&str>) -> Result<(), SessionError> {
        let key = self.root_key_or_active(key)?;
        self.frame_for_mut(&key)?.set_editor_style(style);
        Ok(())
    }

    pub fn get_contents(&self, key: Option<&str>) -> Result<ContentValue, SessionError> {
        let key = self.root_key_or_active(key)?;
        let frame = self
            .roots
            .get(&key)
            .ok_or_else(|| SessionError::UnknownRoot(key.to_string()))?;
        Ok(ContentValue::from_nodes(frame.doc.export_children(frame.wysiwyg)))
    }

    pub fn get_html(&self, key: Option<&str>) -> Result<String, SessionError> {
        let key = self.root_key_or_active(key)?;
        self.roots
            .get(&key)
            .map(FrameContext::html)
            .ok_or_else(|| SessionError::UnknownRoot(key.to_string()))
    }

    /// Replaces a root's content and records the change.
    pub fn set_contents(
        &mut self,
        content: Vec<ContentNode>,
        key: Option<&str>,
    ) -> Result<(), SessionError> {
        let key = self.root_key_or_active(key)?;
        let default_line = self.options.get_str("defaultLine").unwrap_or("p").to_string();
        let frame = self.frame_for_mut(&key)?;
        frame.init_content(Some(&content), &default_line)?;
        self.push_history_for(&key, true);
        Ok(())
    }

    pub fn set_contents_json(&mut self, json: &str, key: Option<&str>) -> Result<(), SessionError> {
        let value = ContentValue::from_json_str(json)?;
        self.set_contents(value.into_nodes(), key)
    }

    // --- change tracking ---

    /// Records the active root in history and notifies on change.
    pub fn push_history(&mut self, force: bool) {
        let key = self.active.clone();
        self.push_history_for(&key, force);
    }

    pub(crate) fn push_history_for(&mut self, key: &RootKey, force: bool) {
        let Some(frame) = self.roots.get(key) else {
            return;
        };
        if self.history.push(frame, force) {
            self.on_history_change(key);
        }
    }

    pub(crate) fn on_history_change(&mut self, key: &RootKey) {
        if self.has_focus() {
            self.apply_tag_effect();
        }
        self.status.is_changed = true;
        self.apply_command_targets("save", |b| b.disabled = false);
        self.refresh_history_buttons();
        self.check_placeholder(key);
        if let Some(frame) = self.roots.get_mut(key) {
            frame.update_char_counter();
        }

        let html = self.roots.get(key).map(FrameContext::html).unwrap_or_default();
        if let Some(on_change) = self.events.on_change.as_mut() {
            on_change(key, &html);
        }
        self.reposition_balloon();
    }

    pub(crate) fn refresh_history_buttons(&mut self) {
        let can_undo = self.history.can_undo();
        let can_redo = self.history.can_redo();
        self.apply_command_targets("undo", |b| b.disabled = !can_undo);
        self.apply_command_targets("redo", |b| b.disabled = !can_redo);
    }

    pub(crate) fn reposition_balloon(&mut self) {
        let mode = self.options.get_str("mode").unwrap_or("classic");
        if mode.contains("balloon") || mode.contains("inline") {
            self.toolbar.reposition(Tray::Main);
        } else if self.options.get_str("_subMode") == Some("balloon") {
            self.toolbar.reposition(Tray::Sub);
        }
    }

    pub(crate) fn resources_state_change(&mut self, key: &RootKey) {
        let Some(frame) = self.roots.get_mut(key) else {
            return;
        };
        let height = frame.layout_height();
        let previous = frame.editor_height;
        if height != previous {
            frame.editor_height = height;
            if let Some(on_resize) = self.events.on_resize_editor.as_mut() {
                on_resize(key, height, previous);
            }
        }
        self.check_placeholder(key);
    }

    pub(crate) fn check_placeholder(&mut self, key: &RootKey) {
        let Some(frame) = self.roots.get_mut(key) else {
            return;
        };
        let Some(placeholder) = frame.placeholder else {
            return;
        };
        let display = if !frame.is_code_view && frame.is_empty() {
            "block"
        } else {
            "none"
        };
        frame.doc.set_style(placeholder, "display", display);
    }

    /// Tears the session down. Later calls and scheduled work are no-ops.
    pub fn destroy(&mut self) {
        if !self.status.is_alive {
            return;
        }
        tracing::debug!("destroy session");

        let destroyers: Vec<(String, Hook)> = self
            .plugins
            .iter()
            .filter_map(|(name, slot)| {
                slot.plugin()
                    .and_then(|p| p.destroy.clone())
                    .map(|d| (name.clone(), d))
            })
            .collect();
        for (name, destroy) in destroyers {
            if let Err(err) = destroy(self) {
                tracing::warn!(plugin = %name, error = %err, "plugin destroy failed");
            }
        }
        self.plugins.clear();

        self.history.destroy();

        self.menu = Menu::default();
        self.toolbar.destroy();

        self.command_targets.clear();
        self.shortcuts.clear();
        self.active_commands.clear();
        self.code_view_disabled.clear();
        self.controller_disabled.clear();
        self.hooks = PluginHooks::default();
        self.files.clear();
        self.events.clear();
        self.deferred.clear();
        self.options.clear();
        self.origin_options.clear();
        self.plugin_options.clear();

        for frame in self.roots.values_mut() {
            frame.doc.remove(frame.top_area);
            frame.options.clear();
        }
        self.roots.clear();
        self.effect_node = None;
        self.status.is_alive = false;
    }
}

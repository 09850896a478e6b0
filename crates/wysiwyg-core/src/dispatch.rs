//! Command routing from trigger elements to plugins and built-in commands.

use indexmap::IndexSet;
use serde_json::Value;

use crate::dom::NodeId;
use crate::error::SessionError;
use crate::events::InputEvent;
use crate::plugin::{ActiveHook, EventHook, PluginSlot, TriggerKind};
use crate::session::{BASIC_COMMANDS, Session};
use crate::shortcuts::{ShortcutKey, reverse_command};
use crate::toolbar::{Button, ButtonId, READ_ONLY_ENABLED};

/// Inline tags that mark a built-in text style as active.
fn style_tags(command: &str) -> &'static [&'static str] {
    match command {
        "bold" => &["STRONG", "B"],
        "underline" => &["U"],
        "italic" => &["EM", "I"],
        "strike" => &["DEL", "S", "STRIKE"],
        "subscript" => &["SUB"],
        "superscript" => &["SUP"],
        _ => &[],
    }
}

impl Session {
    /// Binds `target` to `command`. Only built-in commands and registered
    /// plugins accept targets; a target is bound at most once.
    pub(crate) fn set_command_target(&mut self, command: &str, target: ButtonId) {
        if !BASIC_COMMANDS.contains(&command) && !self.plugins.contains_key(command) {
            return;
        }
        self.command_targets
            .entry(command.to_string())
            .or_default()
            .insert(target);
    }

    /// Instantiates the plugin on first use and binds `targets` to it.
    pub fn register_plugin(
        &mut self,
        name: &str,
        targets: &[ButtonId],
        options: Option<&Value>,
    ) -> Result<(), SessionError> {
        let slot = self
            .plugins
            .get(name)
            .ok_or_else(|| SessionError::UnknownPlugin(name.to_string()))?;

        if let PluginSlot::Pending(factory) = slot {
            let factory = factory.clone();
            let plugin = (factory.build)(options.unwrap_or(&Value::Null));
            let init = plugin.init.clone();
            self.plugins.insert(
                name.to_string(),
                PluginSlot::Ready {
                    kind: factory.kind,
                    plugin,
                },
            );
            tracing::debug!(plugin = name, kind = %factory.kind, "plugin instantiated");
            if let Some(init) = init {
                init(self)?;
            }
        }

        let Some(slot) = self.plugins.get(name) else {
            return Ok(());
        };
        let kind = slot.kind();
        let (title, icon, has_active) = match slot.plugin() {
            Some(p) => (p.title.clone(), p.icon.clone(), p.active.is_some()),
            None => (None, None, false),
        };

        for &id in targets {
            if let Some(button) = self.toolbar.button_mut(id) {
                if title.is_some() {
                    button.title.clone_from(&title);
                }
                if icon.is_some() {
                    button.icon.clone_from(&icon);
                }
                button.kind = Some(kind);
            }
            self.set_command_target(name, id);
        }

        if has_active {
            self.active_commands.insert(name.to_string());
        }
        Ok(())
    }

    /// Runs the command behind a trigger element.
    pub fn run_from_target(&mut self, target: ButtonId) -> Result<(), SessionError> {
        let Some(button) = self.toolbar.button(target) else {
            return Ok(());
        };
        if button.disabled || (button.command.is_empty() && button.kind.is_none()) {
            return Ok(());
        }
        let command = button.command.clone();
        let kind = button.kind;
        self.run(&command, kind, Some(target))
    }

    /// Routes `command` by trigger kind, then closes menus that should not
    /// stay open.
    pub fn run(
        &mut self,
        command: &str,
        kind: Option<TriggerKind>,
        target: Option<ButtonId>,
    ) -> Result<(), SessionError> {
        if !self.status.is_alive || self.status.is_disabled {
            return Ok(());
        }
        tracing::debug!(command, kind = ?kind, "run command");

        match kind {
            Some(TriggerKind::More) => {
                self.toggle_more_layer(command, target);
                return Ok(());
            }
            Some(TriggerKind::Container) if self.menu.current_container != target => {
                self.menu.container_on(&mut self.toolbar, target);
                self.open_plugin(command, target)?;
                return Ok(());
            }
            _ => {}
        }

        if self.is_blocked_by_read_only(command, target) {
            tracing::debug!(command, "blocked by read-only");
            return Ok(());
        }

        match kind {
            Some(TriggerKind::Dropdown) if self.menu.current_dropdown != target => {
                self.menu.dropdown_on(&mut self.toolbar, target);
                self.open_plugin(command, target)?;
                return Ok(());
            }
            Some(TriggerKind::Modal) => {
                self.open_plugin(command, target)?;
                return Ok(());
            }
            Some(TriggerKind::Command) => {
                let action = self.plugin_or_err(command)?.action.clone();
                if let Some(action) = action {
                    action(self)?;
                }
            }
            Some(TriggerKind::FileBrowser) => self.open_plugin(command, None)?,
            Some(TriggerKind::Dropdown | TriggerKind::Container | TriggerKind::More) => {}
            None => self.command_handler(command)?,
        }

        match kind {
            Some(TriggerKind::Dropdown) => self.menu.dropdown_off(&mut self.toolbar),
            Some(TriggerKind::Command) => {}
            _ => {
                self.menu.dropdown_off(&mut self.toolbar);
                self.menu.container_off(&mut self.toolbar);
            }
        }
        Ok(())
    }

    fn is_blocked_by_read_only(&self, command: &str, target: Option<ButtonId>) -> bool {
        if !self.status.is_read_only {
            return false;
        }
        match target {
            Some(id) => self.controller_disabled.contains(&id),
            None => !READ_ONLY_ENABLED.contains(&command),
        }
    }

    fn plugin_or_err(&self, name: &str) -> Result<&crate::plugin::Plugin, SessionError> {
        self.plugin(name)
            .ok_or_else(|| SessionError::UnknownPlugin(name.to_string()))
    }

    fn open_plugin(&mut self, name: &str, target: Option<ButtonId>) -> Result<(), SessionError> {
        let open = self.plugin_or_err(name)?.open.clone();
        if let Some(open) = open {
            open(self, target)?;
        }
        Ok(())
    }

    fn toggle_more_layer(&mut self, layer: &str, target: Option<ButtonId>) {
        let Some(id) = target else {
            return;
        };
        let Some(tray) = self.toolbar.button(id).map(|b| b.tray) else {
            return;
        };
        let is_open = self
            .toolbar
            .tray(tray)
            .is_some_and(|t| t.more_layer_active == Some(id));
        if is_open {
            self.toolbar.more_layer_off(tray);
            self.reposition_balloon();
        } else {
            self.toolbar.more_layer_on(tray, id, layer);
        }
    }

    /// Built-in commands. Anything not listed is treated as a text style.
    pub fn command_handler(&mut self, command: &str) -> Result<(), SessionError> {
        if self.status.is_read_only && !READ_ONLY_ENABLED.contains(&command) {
            return Ok(());
        }

        match command {
            "copy" | "cut" => self.exec_command(command)?,
            "paste" => self.paste()?,
            "selectAll" => self.select_all()?,
            "codeView" => {
                let on = !self.frame().is_some_and(|f| f.is_code_view);
                self.code_view(on)?;
            }
            "fullScreen" => {
                let on = !self.frame().is_some_and(|f| f.is_full_screen);
                self.full_screen(on)?;
            }
            "showBlocks" => {
                let on = !self.frame().is_some_and(|f| f.is_show_blocks);
                self.show_blocks(on)?;
            }
            "indent" | "outdent" => self.indent(command == "indent")?,
            "undo" => self.undo(),
            "redo" => self.redo(),
            "removeFormat" => self.remove_format()?,
            "print" => self.print()?,
            "preview" => self.preview()?,
            "save" => self.save()?,
            "dir" => {
                let dir = if self.options.get_bool("_rtl") { "ltr" } else { "rtl" };
                self.set_dir(dir);
            }
            "dir_ltr" => self.set_dir("ltr"),
            "dir_rtl" => self.set_dir("rtl"),
            _ => self.font_style(command)?,
        }
        Ok(())
    }

    pub fn apply_command_targets(&mut self, command: &str, mut f: impl FnMut(&mut Button)) {
        let Some(ids) = self.command_targets.get(command) else {
            return;
        };
        for &id in ids {
            if let Some(button) = self.toolbar.button_mut(id) {
                f(button);
            }
        }
    }

    /// Hands a mouse-down to plugin hooks. Returns false when a hook stopped it.
    pub fn dispatch_mousedown(&mut self, event: &InputEvent) -> bool {
        let hooks = self.hooks.mousedown.clone();
        self.dispatch_event(hooks, event)
    }

    pub fn dispatch_keydown(&mut self, event: &InputEvent) -> bool {
        let hooks = self.hooks.keydown.clone();
        self.dispatch_event(hooks, event)
    }

    /// Runs the command bound to the event's key combination and reports
    /// whether one was bound. Under right-to-left text, paired commands such
    /// as indent and outdent swap.
    pub fn run_shortcut(&mut self, event: &InputEvent) -> Result<bool, SessionError> {
        if !self.status.is_alive || self.status.is_disabled {
            return Ok(false);
        }
        let key = ShortcutKey::from_event(event);
        let Some(shortcut) = self.shortcuts.get(&key).cloned() else {
            return Ok(false);
        };

        let mut command = shortcut.command;
        let mut target = Some(shortcut.button);
        if self.options.get_bool("_rtl")
            && let Some(other) = reverse_command(&command)
        {
            target = self.command_targets(other).first().copied();
            command = other.to_string();
        }
        tracing::debug!(command = %command, code = %key.code, "shortcut");

        match target {
            Some(target) => self.run_from_target(target)?,
            None => self.run(&command, None, None)?,
        }
        Ok(true)
    }

    fn dispatch_event(&mut self, hooks: Vec<EventHook>, event: &InputEvent) -> bool {
        if !self.status.is_alive || self.status.is_disabled {
            return false;
        }
        for hook in hooks {
            if !hook(self, event) {
                return false;
            }
        }
        true
    }

    /// Marks the buttons of styles present around the selection as active.
    ///
    /// Ancestors are visited from the selection node up to the surface; the
    /// nearest match wins. Plugins with an `active` hook decide for
    /// themselves; built-in styles match by tag name.
    pub fn apply_tag_effect(&mut self) {
        let node = match self.selection() {
            Ok(mut sel) => sel.get_node(),
            Err(_) => return,
        };
        if node == self.effect_node {
            return;
        }
        self.effect_node = node;

        let ancestors = self.effect_ancestors(node);
        let commands: Vec<String> = self.active_commands.iter().cloned().collect();
        let mut matched: IndexSet<String> = IndexSet::new();

        for &element in &ancestors {
            for command in &commands {
                if matched.contains(command) {
                    continue;
                }
                let hit = match self.active_hook(command) {
                    Some(hook) => self.ask_active(&hook, command, Some(element)),
                    None => {
                        let tags = style_tags(command);
                        let frame = self.frame();
                        let hit = frame.is_some_and(|f| {
                            tags.iter().any(|t| f.doc.is_tag(element, t))
                        });
                        if hit {
                            self.apply_command_targets(command, |b| b.active = true);
                        }
                        hit
                    }
                };
                if hit {
                    matched.insert(command.clone());
                }
            }
        }

        for command in &commands {
            if matched.contains(command) {
                continue;
            }
            match self.active_hook(command) {
                Some(hook) => {
                    self.ask_active(&hook, command, None);
                }
                None => self.apply_command_targets(command, |b| b.active = false),
            }
        }
    }

    fn effect_ancestors(&self, node: Option<NodeId>) -> Vec<NodeId> {
        let (Some(node), Some(frame)) = (node, self.frame()) else {
            return Vec::new();
        };
        let doc = &frame.doc;
        std::iter::once(node)
            .chain(doc.ancestors(node))
            .take_while(|&n| n != frame.wysiwyg)
            .filter(|&n| doc.is_element(n))
            .collect()
    }

    fn active_hook(&self, command: &str) -> Option<ActiveHook> {
        self.plugin(command).and_then(|p| p.active.clone())
    }

    /// True when the hook accepts `element` for any of the command's targets.
    fn ask_active(&mut self, hook: &ActiveHook, command: &str, element: Option<NodeId>) -> bool {
        let targets = self.command_targets(command);
        if targets.is_empty() {
            return hook(self, element, None);
        }
        let mut hit = false;
        for target in targets {
            hit |= hook(self, element, Some(target));
        }
        hit
    }

    /// Calls each preserved-class hook on the surface elements carrying its
    /// class.
    pub fn apply_preserved_classes(&mut self) {
        let hooks: Vec<_> = self
            .hooks
            .preserved
            .iter()
            .map(|(class, hook)| (class.clone(), hook.clone()))
            .collect();
        for (class, hook) in hooks {
            let elements = match self.frame() {
                Some(f) => f
                    .doc
                    .descendants_where(f.wysiwyg, |d, n| d.has_class(n, &class)),
                None => return,
            };
            for element in elements {
                hook(self, element);
            }
        }
    }

    /// Lets file-managing plugins re-scan the surface.
    pub fn check_components(&mut self) -> Result<(), SessionError> {
        let hooks = self.hooks.file_checks.clone();
        for hook in hooks {
            hook(self)?;
        }
        Ok(())
    }

    pub fn reset_components(&mut self) -> Result<(), SessionError> {
        let hooks = self.hooks.file_resets.clone();
        for hook in hooks {
            hook(self)?;
        }
        Ok(())
    }
}

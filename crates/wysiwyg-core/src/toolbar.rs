//! Trigger elements and the open/closed state of toolbar layers and menus.

use indexmap::IndexMap;
use serde_json::Value;
use slotmap::{SlotMap, new_key_type};

use crate::plugin::TriggerKind;

new_key_type! { pub struct ButtonId; }

/// Commands whose buttons stay usable in code view.
pub const CODE_VIEW_ENABLED: &[&str] = &["codeView", "fullScreen", "print", "preview", "save"];

/// Commands that stay usable while the session is read-only.
pub const READ_ONLY_ENABLED: &[&str] = &[
    "copy",
    "cut",
    "selectAll",
    "codeView",
    "fullScreen",
    "print",
    "preview",
    "showBlocks",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tray {
    Main,
    Sub,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Button {
    pub command: String,
    pub kind: Option<TriggerKind>,
    pub tray: Tray,
    /// More layer holding this button, if any.
    pub layer: Option<String>,
    pub disabled: bool,
    pub active: bool,
    pub title: Option<String>,
    pub icon: Option<String>,
    /// Hint text of the first key bound to the command.
    pub shortcut: Option<String>,
    pub code_view_enabled: bool,
    pub read_only_enabled: bool,
}

impl Button {
    pub fn new(command: impl Into<String>, kind: Option<TriggerKind>, tray: Tray) -> Self {
        let command = command.into();
        let is_more = kind == Some(TriggerKind::More);
        Self {
            code_view_enabled: is_more || CODE_VIEW_ENABLED.contains(&command.as_str()),
            read_only_enabled: is_more || READ_ONLY_ENABLED.contains(&command.as_str()),
            command,
            kind,
            tray,
            layer: None,
            disabled: false,
            active: false,
            title: None,
            icon: None,
            shortcut: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrayState {
    pub more_layer_active: Option<ButtonId>,
    pub open_layer: Option<String>,
    pub width: Option<String>,
    pub hidden: bool,
    pub shortcut_hint: bool,
    pub rtl: bool,
    pub disabled: bool,
    /// Times the tray was repositioned for balloon or inline display.
    pub repositions: u32,
    pub sticky_resets: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Menu {
    pub current_dropdown: Option<ButtonId>,
    pub current_container: Option<ButtonId>,
}

impl Menu {
    pub fn dropdown_on(&mut self, toolbar: &mut Toolbar, target: Option<ButtonId>) {
        self.dropdown_off(toolbar);
        self.current_dropdown = target;
        toolbar.set_active(target, true);
    }

    pub fn dropdown_off(&mut self, toolbar: &mut Toolbar) {
        if let Some(prev) = self.current_dropdown.take() {
            toolbar.set_active(Some(prev), false);
        }
    }

    pub fn container_on(&mut self, toolbar: &mut Toolbar, target: Option<ButtonId>) {
        self.container_off(toolbar);
        self.current_container = target;
        toolbar.set_active(target, true);
    }

    pub fn container_off(&mut self, toolbar: &mut Toolbar) {
        if let Some(prev) = self.current_container.take() {
            toolbar.set_active(Some(prev), false);
        }
    }
}

/// Buttons of the main and optional sub tray.
#[derive(Debug, Clone, Default)]
pub struct Toolbar {
    buttons: SlotMap<ButtonId, Button>,
    layers: IndexMap<(Tray, String), Vec<ButtonId>>,
    pub main: TrayState,
    pub sub: Option<TrayState>,
}

impl Toolbar {
    pub fn new(has_sub: bool) -> Self {
        Self {
            sub: has_sub.then(TrayState::default),
            ..Self::default()
        }
    }

    pub fn add_button(&mut self, button: Button) -> ButtonId {
        let layer = button.layer.clone().map(|l| (button.tray, l));
        let id = self.buttons.insert(button);
        if let Some(key) = layer {
            self.layers.entry(key).or_default().push(id);
        }
        id
    }

    /// Adds the buttons described by a `buttonList` value.
    ///
    /// Items are command names or groups of them. A group whose first entry
    /// starts with `:` becomes a more layer: `:name-title-icon` adds a `MORE`
    /// button named `name` and places the rest of the group in that layer.
    /// Names rejected by `known` are dropped.
    pub fn load(
        &mut self,
        list: &Value,
        tray: Tray,
        known: impl Fn(&str) -> bool,
        kind_of: impl Fn(&str) -> Option<TriggerKind>,
    ) -> Vec<ButtonId> {
        let mut added = Vec::new();
        let Some(items) = list.as_array() else {
            return added;
        };

        for item in items {
            match item {
                Value::String(name) => {
                    if let Some(id) = self.add_named(name, tray, None, &known, &kind_of) {
                        added.push(id);
                    }
                }
                Value::Array(group) => {
                    let names: Vec<&str> = group.iter().filter_map(Value::as_str).collect();
                    let (layer, rest) = match names.split_first() {
                        Some((first, rest)) if first.starts_with(':') => {
                            let mut parts = first[1..].splitn(3, '-');
                            let layer = parts.next().unwrap_or_default().to_string();
                            let mut more = Button::new(layer.clone(), Some(TriggerKind::More), tray);
                            more.title = parts.next().map(str::to_string);
                            more.icon = parts.next().map(str::to_string);
                            added.push(self.add_button(more));
                            (Some(layer), rest)
                        }
                        _ => (None, names.as_slice()),
                    };
                    for name in rest {
                        if let Some(id) = self.add_named(name, tray, layer.clone(), &known, &kind_of)
                        {
                            added.push(id);
                        }
                    }
                }
                _ => {}
            }
        }
        added
    }

    fn add_named(
        &mut self,
        name: &str,
        tray: Tray,
        layer: Option<String>,
        known: &impl Fn(&str) -> bool,
        kind_of: &impl Fn(&str) -> Option<TriggerKind>,
    ) -> Option<ButtonId> {
        if name == "|" || name == "/" || name.is_empty() {
            return None;
        }
        if !known(name) {
            tracing::warn!(button = name, "unknown button in buttonList");
            return None;
        }
        let mut button = Button::new(name, kind_of(name), tray);
        button.layer = layer;
        Some(self.add_button(button))
    }

    pub fn button(&self, id: ButtonId) -> Option<&Button> {
        self.buttons.get(id)
    }

    pub fn button_mut(&mut self, id: ButtonId) -> Option<&mut Button> {
        self.buttons.get_mut(id)
    }

    pub fn buttons(&self) -> impl Iterator<Item = (ButtonId, &Button)> {
        self.buttons.iter()
    }

    pub fn find(&self, command: &str, tray: Tray) -> Option<ButtonId> {
        self.buttons
            .iter()
            .find(|(_, b)| b.command == command && b.tray == tray)
            .map(|(id, _)| id)
    }

    pub fn layer(&self, tray: Tray, name: &str) -> &[ButtonId] {
        self.layers
            .get(&(tray, name.to_string()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn set_active(&mut self, id: Option<ButtonId>, active: bool) {
        if let Some(button) = id.and_then(|id| self.buttons.get_mut(id)) {
            button.active = active;
        }
    }

    pub fn set_disabled(&mut self, ids: &[ButtonId], disabled: bool) {
        for &id in ids {
            if let Some(button) = self.buttons.get_mut(id) {
                button.disabled = disabled;
            }
        }
    }

    pub fn tray(&self, tray: Tray) -> Option<&TrayState> {
        match tray {
            Tray::Main => Some(&self.main),
            Tray::Sub => self.sub.as_ref(),
        }
    }

    pub fn tray_mut(&mut self, tray: Tray) -> Option<&mut TrayState> {
        match tray {
            Tray::Main => Some(&mut self.main),
            Tray::Sub => self.sub.as_mut(),
        }
    }

    pub fn more_layer_on(&mut self, tray: Tray, button: ButtonId, layer: &str) {
        self.more_layer_off(tray);
        let Some(state) = self.tray_mut(tray) else {
            return;
        };
        state.more_layer_active = Some(button);
        state.open_layer = Some(layer.to_string());
        self.set_active(Some(button), true);
    }

    pub fn more_layer_off(&mut self, tray: Tray) {
        let Some(state) = self.tray_mut(tray) else {
            return;
        };
        let prev = state.more_layer_active.take();
        state.open_layer = None;
        self.set_active(prev, false);
    }

    /// Re-shows a balloon or inline tray at the current selection.
    pub fn reposition(&mut self, tray: Tray) {
        if let Some(state) = self.tray_mut(tray) {
            state.repositions += 1;
        }
    }

    pub fn reset_sticky(&mut self) {
        self.main.sticky_resets += 1;
    }

    /// Disables every button and closes open layers.
    pub fn disable(&mut self) {
        for tray in [Tray::Main, Tray::Sub] {
            self.more_layer_off(tray);
            if let Some(state) = self.tray_mut(tray) {
                state.disabled = true;
            }
        }
        for (_, button) in self.buttons.iter_mut() {
            button.disabled = true;
        }
    }

    pub fn enable(&mut self) {
        for tray in [Tray::Main, Tray::Sub] {
            if let Some(state) = self.tray_mut(tray) {
                state.disabled = false;
            }
        }
        for (_, button) in self.buttons.iter_mut() {
            button.disabled = false;
        }
    }

    pub fn set_rtl(&mut self, rtl: bool) {
        self.main.rtl = rtl;
        if let Some(sub) = self.sub.as_mut() {
            sub.rtl = rtl;
        }
    }

    pub fn destroy(&mut self) {
        self.buttons.clear();
        self.layers.clear();
        self.main = TrayState::default();
        self.sub = None;
    }
}

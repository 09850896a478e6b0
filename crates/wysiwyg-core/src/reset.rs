//! Applying a new option set to a running session.

use indexmap::{IndexMap, IndexSet};
use serde_json::Value;

use crate::error::SessionError;
use crate::frame::{DEFAULT_MIN_HEIGHT, RootKey, css_file_names};
use crate::options::{
    DEFAULT_HISTORY_DELAY_MS, OptionMap, RESET_UNAVAILABLE, init_frame_options,
    init_session_options, parse_px, reset_diff_key, value_to_map,
};
use crate::session::Session;
use crate::toolbar::Tray;

impl Session {
    /// Drops keys that can only be set at construction, and plugin option
    /// keys, with a warning.
    fn check_reset_keys(&self, options: OptionMap, root: Option<&RootKey>) -> OptionMap {
        options
            .into_iter()
            .filter(|(k, _)| {
                let unavailable = RESET_UNAVAILABLE.contains(&k.as_str());
                let plugin = self.plugins.contains_key(k);
                if unavailable || plugin {
                    tracing::warn!(
                        option = %k,
                        root = root.map(RootKey::as_str).unwrap_or("*"),
                        "option cannot be reset"
                    );
                }
                !unavailable && !plugin
            })
            .collect()
    }

    /// Applies `options` over the current configuration.
    ///
    /// Top-level keys are folded over the session's original options; an
    /// object under a root key is folded over that root's own overrides.
    /// Only the root features whose options changed are rebuilt.
    pub fn reset_options(&mut self, options: Value) -> Result<(), SessionError> {
        if !self.status.is_alive {
            return Err(SessionError::Destroyed);
        }
        if self.frame().is_some_and(|f| f.is_code_view) {
            self.code_view(false)?;
        }
        if self.frame().is_some_and(|f| f.is_show_blocks) {
            self.show_blocks(false)?;
        }

        let root_keys: Vec<RootKey> = self.roots.keys().cloned().collect();
        let mut session_new = OptionMap::new();
        let mut root_new: IndexMap<RootKey, OptionMap> = IndexMap::new();
        for (k, v) in value_to_map(&options) {
            let key = RootKey::new(k.as_str());
            if root_keys.contains(&key) {
                let checked = self.check_reset_keys(value_to_map(&v), Some(&key));
                root_new.insert(key, checked);
            } else {
                session_new.insert(k, v);
            }
        }
        let session_new = self.check_reset_keys(session_new, None);

        for (k, v) in &session_new {
            self.origin_options.insert(k.clone(), v.clone());
        }
        let previous_rtl = self.options.get_bool("_rtl");
        let names: Vec<String> = root_keys.iter().map(RootKey::to_string).collect();
        self.options = init_session_options(&self.origin_options, &names);
        self.options.set("_rtl", Value::Bool(previous_rtl));

        for key in &root_keys {
            self.reset_frame_options(key, root_new.get(key))?;
        }

        if session_new.contains_key("historyStackDelayTime") {
            let delay = self
                .options
                .get_u64("historyStackDelayTime")
                .unwrap_or(DEFAULT_HISTORY_DELAY_MS);
            self.history.reset_delay_time(delay);
        }
        if session_new.contains_key("textDirection") {
            let dir = self
                .options
                .get_str("textDirection")
                .unwrap_or("ltr")
                .to_string();
            self.set_dir(&dir);
        }
        self.apply_toolbar_options(&session_new);

        self.effect_node = None;
        self.set_frame_info();
        tracing::debug!(
            session_keys = session_new.len(),
            roots = root_new.len(),
            "options reset"
        );
        Ok(())
    }

    fn reset_frame_options(
        &mut self,
        key: &RootKey,
        new: Option<&OptionMap>,
    ) -> Result<(), SessionError> {
        let frame = self
            .roots
            .get_mut(key)
            .ok_or_else(|| SessionError::UnknownRoot(key.to_string()))?;
        let previous = frame.options.clone();
        let mut overrides = previous.get_map("_origin");
        if let Some(new) = new {
            for (k, v) in new {
                overrides.insert(k.clone(), v.clone());
            }
        }
        frame.options = init_frame_options(&self.origin_options, &overrides);

        let mut diff: IndexSet<String> = IndexSet::new();
        for (k, v) in frame.options.as_map() {
            if k != "_origin" && previous.get(k) != Some(v) {
                diff.insert(reset_diff_key(k).to_string());
            }
        }
        for k in previous.keys() {
            if !frame.options.has(k) {
                diff.insert(reset_diff_key(k).to_string());
            }
        }

        if diff.contains("statusbar") || diff.contains("charCounter") {
            if frame.options.get_bool("statusbar") {
                frame.create_statusbar()?;
                frame.update_char_counter();
            } else {
                frame.remove_statusbar();
            }
        }
        if diff.contains("iframe_attributes") {
            frame.apply_iframe_attributes(&previous.get_map("iframe_attributes"));
        }
        if diff.contains("iframe_cssFileName") {
            frame.css_links = css_file_names(&frame.options);
        }
        if diff.contains("minHeight") {
            frame.min_height = frame
                .options
                .get_str("minHeight")
                .and_then(parse_px)
                .unwrap_or(DEFAULT_MIN_HEIGHT);
        }

        let style = frame.options.get_str("editorStyle").unwrap_or("").to_string();
        frame.set_editor_style(&style);
        frame.apply_editable_attributes(&previous.get_map("editableFrameAttributes"));
        Ok(())
    }

    fn apply_toolbar_options(&mut self, new: &OptionMap) {
        let mode = self.options.get_str("mode").unwrap_or("classic");
        if new.contains_key("toolbar_width") && (mode.contains("inline") || mode.contains("balloon"))
        {
            self.toolbar.main.width = self.options.get_str("toolbar_width").map(str::to_string);
        }
        if new.contains_key("toolbar_hide") {
            self.toolbar.main.hidden = self.options.get_bool("toolbar_hide");
        }
        if new.contains_key("shortcutsHint") {
            let hint = self.options.get_bool("shortcutsHint");
            self.toolbar.main.shortcut_hint = hint;
            if let Some(sub) = self.toolbar.tray_mut(Tray::Sub) {
                sub.shortcut_hint = hint;
            }
        }
    }
}

use indexmap::IndexMap;
use serde_json::{Value, json};

pub type OptionMap = IndexMap<String, Value>;

/// Options that only take effect while the editor is being built.
pub const RESET_UNAVAILABLE: &[&str] = &[
    "mode",
    "iframe",
    "iframe_fullPage",
    "defaultLine",
    "textTags",
    "formatLine",
    "formatBlock",
    "allowedEmptyTags",
    "buttonList",
    "subToolbar",
    "shortcuts",
    "value",
];

/// Options resolved per root. Given at the top level they act as defaults for
/// every root; given under a root key they override for that root only.
pub const FRAME_KEYS: &[&str] = &[
    "value",
    "placeholder",
    "editableFrameAttributes",
    "width",
    "minWidth",
    "maxWidth",
    "height",
    "minHeight",
    "maxHeight",
    "editorStyle",
    "iframe",
    "iframe_fullPage",
    "iframe_attributes",
    "iframe_cssFileName",
    "statusbar",
    "statusbar_showPathLabel",
    "charCounter",
    "charCounter_max",
];

pub const DEFAULT_HISTORY_DELAY_MS: u64 = 400;

/// Ordered option map with typed getters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options {
    map: OptionMap,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: OptionMap) -> Self {
        Self { map }
    }

    /// Object values become option maps; anything else yields empty options.
    pub fn from_json(value: &Value) -> Self {
        Self {
            map: value_to_map(value),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.map.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.map.insert(key.into(), value);
    }

    pub fn has(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.map.shift_remove(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.map.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> bool {
        match self.map.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Null) | None => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        }
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.map.get(key).and_then(Value::as_u64)
    }

    pub fn get_map(&self, key: &str) -> OptionMap {
        self.map.get(key).map(value_to_map).unwrap_or_default()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.map.keys()
    }

    pub fn as_map(&self) -> &OptionMap {
        &self.map
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }
}

pub fn value_to_map(value: &Value) -> OptionMap {
    match value {
        Value::Object(obj) => obj.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        _ => OptionMap::new(),
    }
}

pub fn map_to_value(map: &OptionMap) -> Value {
    Value::Object(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
}

fn session_defaults() -> OptionMap {
    [
        ("mode", json!("classic")),
        ("defaultLine", json!("p")),
        ("textDirection", json!("ltr")),
        ("historyStackDelayTime", json!(DEFAULT_HISTORY_DELAY_MS)),
        ("shortcutsHint", json!(true)),
        (
            "shortcuts",
            json!({
                "bold": ["c+KeyB", "B"],
                "underline": ["c+KeyU", "U"],
                "italic": ["c+KeyI", "I"],
                "strike": ["cs+KeyS", "S"],
                "indent": ["c+BracketRight", "]"],
                "outdent": ["c+BracketLeft", "["],
                "selectAll": ["c+KeyA", "A"],
                "undo": ["c+KeyZ", "Z"],
                "redo": ["c+KeyY", "Y", "cs+KeyZ", ""],
                "save": ["c+KeyS", "S"],
            }),
        ),
        ("toolbar_hide", json!(false)),
        ("toolbar_width", json!("auto")),
        ("buttonList", json!([])),
        ("tabSize", json!(4)),
        ("indentSize", json!(25)),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

fn frame_defaults() -> OptionMap {
    [
        ("placeholder", json!("")),
        ("editableFrameAttributes", json!({ "spellcheck": "false" })),
        ("width", json!("100%")),
        ("height", json!("auto")),
        ("minHeight", json!("")),
        ("maxHeight", json!("")),
        ("editorStyle", json!("")),
        ("iframe", json!(false)),
        ("iframe_attributes", json!({})),
        ("iframe_cssFileName", json!([])),
        ("statusbar", json!(true)),
        ("charCounter", json!(false)),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

/// Session-scoped options: defaults folded under every top-level key that is
/// not a root key, plus derived keys.
pub fn init_session_options(origin: &OptionMap, root_keys: &[String]) -> Options {
    let mut options = Options::from_map(session_defaults());
    for (k, v) in origin {
        if root_keys.iter().any(|r| r == k) {
            continue;
        }
        options.set(k.clone(), v.clone());
    }
    derive_session_keys(&mut options);
    options
}

pub fn derive_session_keys(options: &mut Options) {
    let rtl = options.get_str("textDirection") == Some("rtl");
    options.set("_rtl", Value::Bool(rtl));

    if let Some(sub) = options.get("subToolbar").filter(|v| v.is_object()) {
        let mode = sub
            .get("mode")
            .and_then(Value::as_str)
            .unwrap_or("balloon")
            .to_string();
        options.set("_subMode", Value::String(mode));
    } else {
        options.remove("_subMode");
    }
}

/// Root-scoped options: frame defaults, then top-level frame keys, then the
/// root's own overrides (kept verbatim under `_origin`).
pub fn init_frame_options(session_origin: &OptionMap, overrides: &OptionMap) -> Options {
    let mut options = Options::from_map(frame_defaults());
    for key in FRAME_KEYS {
        if let Some(v) = session_origin.get(*key) {
            options.set(*key, v.clone());
        }
    }
    for (k, v) in overrides {
        options.set(k.clone(), v.clone());
    }
    options.set("_origin", map_to_value(overrides));
    options
}

/// Keys starting with `statusbar` share one rebuild.
pub fn reset_diff_key(key: &str) -> &str {
    if key.to_ascii_lowercase().starts_with("statusbar") {
        "statusbar"
    } else {
        key
    }
}

/// Editor style strings derived from the root's options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefaultStyles {
    pub top: String,
    pub frame: String,
    pub editor: String,
}

pub fn default_option_styles(options: &Options, editor_style: &str) -> DefaultStyles {
    let mut top = Vec::new();
    let mut frame = Vec::new();

    if let Some(width) = options.get_str("width").filter(|w| !w.is_empty()) {
        top.push(format!("width: {width};"));
    }
    match options.get_str("height") {
        Some("auto") | None => frame.push("height: auto;".to_string()),
        Some(h) => frame.push(format!("height: {h};")),
    }
    for (key, prop) in [("minHeight", "min-height"), ("maxHeight", "max-height")] {
        if let Some(v) = options.get_str(key).filter(|v| !v.is_empty()) {
            frame.push(format!("{prop}: {v};"));
        }
    }

    DefaultStyles {
        top: top.join(" "),
        frame: frame.join(" "),
        editor: editor_style.to_string(),
    }
}

pub fn parse_px(value: &str) -> Option<u32> {
    let digits: String = value
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    digits.parse::<f64>().ok().map(|v| v as u32)
}

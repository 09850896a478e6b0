use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use wysiwyg_core::{ContentNode, RootKey, RootTarget, Session, SessionError};

fn two_roots(options: Value) -> Session {
    let targets = vec![
        RootTarget::new("a").value(vec![ContentNode::paragraph("alpha")]),
        RootTarget::new("b").value(vec![ContentNode::paragraph("beta")]),
    ];
    let mut session = Session::new(targets, options, Vec::new()).unwrap();
    session.flush_deferred();
    session
}

#[test]
fn a_session_needs_at_least_one_root() {
    let err = Session::new(Vec::new(), json!({}), Vec::new()).err().unwrap();

    assert!(matches!(err, SessionError::NoRoots));
}

#[test]
fn first_root_starts_active() {
    let session = two_roots(json!({}));

    assert_eq!(session.active_root().as_str(), "a");
    assert_eq!(
        session.root_keys(),
        vec![RootKey::new("a"), RootKey::new("b")]
    );
}

#[test]
fn change_frame_context_ignores_unknown_and_current_roots() {
    let mut session = two_roots(json!({}));
    let resets = session.toolbar().main.sticky_resets;

    session.change_frame_context("a");
    session.change_frame_context("nope");
    assert_eq!(session.active_root().as_str(), "a");
    assert_eq!(session.toolbar().main.sticky_resets, resets);

    session.change_frame_context("b");
    assert_eq!(session.active_root().as_str(), "b");
    assert_eq!(session.toolbar().main.sticky_resets, resets + 1);
    assert_eq!(session.get_html(None).unwrap(), "<p>beta</p>");
}

#[test]
fn root_options_override_session_options() {
    let targets = vec![
        RootTarget::new("a"),
        RootTarget::new("b").options(json!({ "minHeight": "120px" })),
    ];
    let mut session = Session::new(
        targets,
        json!({ "placeholder": "Write...", "b": { "placeholder": "" } }),
        Vec::new(),
    )
    .unwrap();
    session.flush_deferred();

    let a = session.frame_by_key("a").unwrap();
    let b = session.frame_by_key("b").unwrap();
    let placeholder = a.placeholder.unwrap();
    assert_eq!(a.doc.text_content(placeholder), "Write...");
    assert_eq!(a.doc.style(placeholder, "display"), Some("block"));
    assert_eq!(b.placeholder, None);
    assert_eq!(a.min_height, 65);
    assert_eq!(b.min_height, 120);
}

#[test]
fn is_empty_is_per_root() {
    let targets = vec![
        RootTarget::new("a").value(vec![ContentNode::paragraph("alpha")]),
        RootTarget::new("b"),
    ];
    let session = Session::new(targets, json!({}), Vec::new()).unwrap();

    assert!(!session.is_empty(None));
    assert!(!session.is_empty(Some("a")));
    assert!(session.is_empty(Some("b")));
}

#[test]
fn focus_switches_roots_and_reports() {
    let focused = Arc::new(Mutex::new(Vec::new()));
    let mut session = two_roots(json!({}));
    let recorder = focused.clone();
    session.events_mut().on_focus = Some(Box::new(move |key: &RootKey| {
        recorder.lock().unwrap().push(key.to_string());
    }));

    session.focus(Some("b")).unwrap();

    assert_eq!(session.active_root().as_str(), "b");
    assert!(session.has_focus());
    let frame = session.frame().unwrap();
    let range = frame.cached_range().unwrap();
    assert!(frame.doc.is_text(range.start_container()));
    assert_eq!(*focused.lock().unwrap(), vec!["b".to_string()]);
}

#[test]
fn blur_drops_focus() {
    let blurred = Arc::new(Mutex::new(0));
    let mut session = two_roots(json!({}));
    let counter = blurred.clone();
    session.events_mut().on_blur = Some(Box::new(move |_: &RootKey| {
        *counter.lock().unwrap() += 1;
    }));
    session.focus(None).unwrap();

    assert!(session.frame().unwrap().cached_range().is_some());

    session.blur();

    assert!(!session.has_focus());
    assert_eq!(session.frame().unwrap().cached_range(), None);
    assert_eq!(session.frame().unwrap().selection_node(), None);
    assert_eq!(*blurred.lock().unwrap(), 1);
}

#[test]
fn active_buttons_follow_the_focused_root() {
    let targets = vec![
        RootTarget::new("a").value(vec![ContentNode::element(
            "p",
            vec![ContentNode::element("strong", vec![ContentNode::text("x")])],
        )]),
        RootTarget::new("b").value(vec![ContentNode::element(
            "p",
            vec![ContentNode::element("em", vec![ContentNode::text("x")])],
        )]),
    ];
    let mut session =
        Session::new(targets, json!({ "buttonList": ["bold", "italic"] }), Vec::new()).unwrap();
    session.flush_deferred();
    let active = |session: &Session, command: &str| {
        let id = session.command_targets(command)[0];
        session.toolbar().button(id).unwrap().active
    };

    session.focus(Some("a")).unwrap();
    assert!(active(&session, "bold"));
    assert!(!active(&session, "italic"));

    session.focus(Some("b")).unwrap();
    assert!(!active(&session, "bold"));
    assert!(active(&session, "italic"));
}

#[test]
fn focus_edge_puts_the_caret_after_the_last_leaf() {
    let target = RootTarget::new("main")
        .value(vec![ContentNode::paragraph("one"), ContentNode::paragraph("two")]);
    let mut session = Session::new(vec![target], json!({}), Vec::new()).unwrap();

    session.focus_edge(None).unwrap();

    let frame = session.frame().unwrap();
    let range = frame.cached_range().unwrap();
    assert!(range.collapsed());
    assert_eq!(frame.doc.text(range.start_container()), Some("two"));
    assert_eq!(range.start_offset(), 3);
    assert!(session.has_focus());
}

#[test]
fn read_only_marks_the_surface() {
    let mut session = two_roots(json!({}));

    session.read_only(true, Some("b")).unwrap();
    {
        let b = session.frame_by_key("b").unwrap();
        assert!(session.status().is_read_only);
        assert_eq!(b.doc.attr(b.code, "readonly"), Some("true"));
        assert!(b.doc.has_class(b.wysiwyg_frame, "se-read-only"));
        let a = session.frame_by_key("a").unwrap();
        assert!(!a.doc.has_class(a.wysiwyg_frame, "se-read-only"));
    }

    session.read_only(false, Some("b")).unwrap();
    let b = session.frame_by_key("b").unwrap();
    assert!(!session.status().is_read_only);
    assert_eq!(b.doc.attr(b.code, "readonly"), None);
    assert!(!b.doc.has_class(b.wysiwyg_frame, "se-read-only"));
}

#[test]
fn unknown_root_keys_are_rejected() {
    let mut session = two_roots(json!({}));

    let err = session.read_only(true, Some("zzz")).unwrap_err();
    assert!(matches!(err, SessionError::UnknownRoot(key) if key == "zzz"));
    assert!(session.get_html(Some("zzz")).is_err());
    assert!(session.hide(Some("zzz")).is_err());
}

#[test]
fn disable_and_enable_toggle_editability() {
    let mut session = two_roots(json!({ "buttonList": ["bold"] }));

    session.disable(None).unwrap();
    {
        let frame = session.frame().unwrap();
        assert!(session.status().is_disabled);
        assert_eq!(frame.doc.attr(frame.wysiwyg, "contenteditable"), Some("false"));
        assert_eq!(frame.doc.attr(frame.code, "disabled"), Some("disabled"));
        assert!(session.toolbar().main.disabled);
    }

    session.enable(None).unwrap();
    let frame = session.frame().unwrap();
    assert!(!session.status().is_disabled);
    assert_eq!(frame.doc.attr(frame.wysiwyg, "contenteditable"), Some("true"));
    assert_eq!(frame.doc.attr(frame.code, "disabled"), None);
    assert!(!session.toolbar().main.disabled);
}

#[test]
fn show_and_hide_toggle_the_top_area() {
    let mut session = two_roots(json!({}));

    session.hide(Some("b")).unwrap();
    let b = session.frame_by_key("b").unwrap();
    assert!(!b.doc.is_displayed(b.top_area));

    session.show(Some("b")).unwrap();
    let b = session.frame_by_key("b").unwrap();
    assert_eq!(b.doc.style(b.top_area, "display"), Some("block"));
}

#[test]
fn editor_style_applies_to_one_root() {
    let mut session = two_roots(json!({}));

    session.set_editor_style("color: red;", Some("b")).unwrap();

    let b = session.frame_by_key("b").unwrap();
    assert_eq!(b.doc.style(b.wysiwyg, "color"), Some("red"));
    let a = session.frame_by_key("a").unwrap();
    assert_eq!(a.doc.style(a.wysiwyg, "color"), None);
}

#[test]
fn set_contents_replaces_one_root_and_records_it() {
    let changes = Arc::new(Mutex::new(Vec::new()));
    let mut session = two_roots(json!({ "historyStackDelayTime": 0 }));
    let recorder = changes.clone();
    session.events_mut().on_change = Some(Box::new(move |key: &RootKey, html: &str| {
        recorder.lock().unwrap().push((key.to_string(), html.to_string()));
    }));

    session
        .set_contents(vec![ContentNode::paragraph("gamma")], Some("b"))
        .unwrap();

    assert_eq!(session.get_html(Some("b")).unwrap(), "<p>gamma</p>");
    assert_eq!(session.get_html(Some("a")).unwrap(), "<p>alpha</p>");
    assert_eq!(session.get_contents(Some("b")).unwrap().content.len(), 1);
    assert!(session.status().is_changed);
    assert_eq!(
        *changes.lock().unwrap(),
        vec![("b".to_string(), "<p>gamma</p>".to_string())]
    );
}

#[test]
fn set_contents_json_reports_malformed_input() {
    let mut session = two_roots(json!({}));

    let err = session.set_contents_json("{ not json", None).unwrap_err();

    assert!(matches!(err, SessionError::Content(_)));
    assert_eq!(session.get_html(None).unwrap(), "<p>alpha</p>");
}

#[test]
fn contents_survive_a_json_trip() {
    let mut session = two_roots(json!({}));
    let json = session.get_contents(Some("a")).unwrap().to_json_pretty().unwrap();

    session.set_contents_json(&json, Some("b")).unwrap();

    assert_eq!(session.get_html(Some("b")).unwrap(), "<p>alpha</p>");
}

#[test]
fn undo_returns_to_the_root_that_changed() {
    let changes = Arc::new(Mutex::new(Vec::new()));
    let mut session = two_roots(json!({ "historyStackDelayTime": 0 }));
    let recorder = changes.clone();
    session.events_mut().on_change = Some(Box::new(move |key: &RootKey, _: &str| {
        recorder.lock().unwrap().push(key.to_string());
    }));
    session
        .set_contents(vec![ContentNode::paragraph("gamma")], Some("b"))
        .unwrap();
    assert_eq!(session.active_root().as_str(), "a");

    session.undo();

    assert_eq!(session.active_root().as_str(), "b");
    assert_eq!(session.get_html(None).unwrap(), "<p>beta</p>");
    assert!(session.history().can_redo());

    session.redo();
    assert_eq!(session.get_html(Some("b")).unwrap(), "<p>gamma</p>");
    assert_eq!(*changes.lock().unwrap(), vec!["b", "b", "b"]);
}

use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use wysiwyg_core::{ContentNode, NodeId, RootKey, RootTarget, Session, Tray};

fn session(lines: &[&str], options: Value) -> Session {
    let target = RootTarget::new("main").value(lines.iter().map(|l| ContentNode::paragraph(*l)).collect());
    let mut session = Session::new(vec![target], options, Vec::new()).unwrap();
    session.flush_deferred();
    session
}

fn text_of_line(session: &Session, line: usize) -> NodeId {
    let frame = session.frame().unwrap();
    let line = frame.doc.child(frame.wysiwyg, line).unwrap();
    frame.doc.first_child(line).unwrap()
}

fn select(session: &mut Session, start: (usize, usize), end: (usize, usize)) {
    let s = text_of_line(session, start.0);
    let e = text_of_line(session, end.0);
    session.selection().unwrap().set_range(s, start.1, e, end.1).unwrap();
}

fn button_state(session: &Session, command: &str) -> (bool, bool) {
    let id = session.toolbar().find(command, Tray::Main).unwrap();
    let button = session.toolbar().button(id).unwrap();
    (button.active, button.disabled)
}

#[test]
fn cut_then_paste_moves_text() {
    let mut session = session(&["hello world"], json!({ "historyStackDelayTime": 0 }));
    select(&mut session, (0, 0), (0, 6));

    session.run("cut", None, None).unwrap();
    assert_eq!(session.clipboard(), "hello ");
    assert_eq!(session.get_html(None).unwrap(), "<p>world</p>");

    select(&mut session, (0, 5), (0, 5));
    session.run("paste", None, None).unwrap();
    assert_eq!(session.get_html(None).unwrap(), "<p>worldhello </p>");

    let range = session.frame().unwrap().cached_range().unwrap();
    assert_eq!((range.start_offset(), range.end_offset()), (11, 11));
}

#[test]
fn select_all_spans_every_line() {
    let mut session = session(&["one", "two"], json!({}));

    session.run("selectAll", None, None).unwrap();
    session.run("copy", None, None).unwrap();

    assert_eq!(session.clipboard(), "onetwo");
    assert!(session.has_focus());
}

#[test]
fn remove_format_unwraps_inline_styles() {
    let target = RootTarget::new("main").value(vec![ContentNode::element(
        "p",
        vec![ContentNode::element("strong", vec![ContentNode::text("bold")])],
    )]);
    let mut session = Session::new(vec![target], json!({}), Vec::new()).unwrap();
    let text = {
        let frame = session.frame().unwrap();
        let strong = frame.doc.first_child(frame.doc.child(frame.wysiwyg, 0).unwrap()).unwrap();
        frame.doc.first_child(strong).unwrap()
    };
    session.selection().unwrap().set_range(text, 0, text, 4).unwrap();

    session.run("removeFormat", None, None).unwrap();

    assert_eq!(session.get_html(None).unwrap(), "<p>bold</p>");
    let range = session.frame().unwrap().cached_range().unwrap();
    assert_eq!(range.start_container(), text);
}

#[test]
fn indent_and_outdent_every_selected_line() {
    let mut session = session(&["one", "two"], json!({ "indentSize": 10 }));
    select(&mut session, (0, 0), (1, 1));

    session.run("indent", None, None).unwrap();
    session.run("indent", None, None).unwrap();
    assert_eq!(
        session.get_html(None).unwrap(),
        "<p style=\"margin-left: 20px;\">one</p><p style=\"margin-left: 20px;\">two</p>"
    );

    session.run("outdent", None, None).unwrap();
    session.run("outdent", None, None).unwrap();
    session.run("outdent", None, None).unwrap();
    assert_eq!(session.get_html(None).unwrap(), "<p>one</p><p>two</p>");
}

#[test]
fn undo_and_redo_follow_the_stack() {
    let mut session = session(
        &["hello"],
        json!({ "buttonList": ["undo", "redo"], "historyStackDelayTime": 0 }),
    );
    assert_eq!(button_state(&session, "undo"), (false, true));
    select(&mut session, (0, 0), (0, 5));

    session.run("bold", None, None).unwrap();
    assert_eq!(button_state(&session, "undo"), (false, false));

    session.run("undo", None, None).unwrap();
    assert_eq!(session.get_html(None).unwrap(), "<p>hello</p>");
    assert_eq!(button_state(&session, "undo"), (false, true));
    assert_eq!(button_state(&session, "redo"), (false, false));

    session.run("redo", None, None).unwrap();
    assert_eq!(session.get_html(None).unwrap(), "<p><strong>hello</strong></p>");
    assert_eq!(button_state(&session, "redo"), (false, true));
}

#[test]
fn save_clears_the_changed_flag() {
    let saved = Arc::new(Mutex::new(Vec::new()));
    let mut session = session(
        &["hello"],
        json!({ "buttonList": ["save"], "historyStackDelayTime": 0 }),
    );
    let recorder = saved.clone();
    session.events_mut().on_save = Some(Box::new(move |key: &RootKey, html: &str| {
        recorder.lock().unwrap().push((key.to_string(), html.to_string()));
    }));
    assert_eq!(button_state(&session, "save"), (false, true));

    select(&mut session, (0, 0), (0, 5));
    session.run("italic", None, None).unwrap();
    assert!(session.status().is_changed);
    assert_eq!(button_state(&session, "save"), (false, false));

    session.run("save", None, None).unwrap();

    assert!(!session.status().is_changed);
    assert_eq!(button_state(&session, "save"), (false, true));
    assert_eq!(session.frame().unwrap().origin_value, "<p><em>hello</em></p>");
    assert_eq!(
        *saved.lock().unwrap(),
        vec![("main".to_string(), "<p><em>hello</em></p>".to_string())]
    );
}

#[test]
fn code_view_disables_editing_buttons() {
    let mut session = session(&["hello"], json!({ "buttonList": ["bold", "codeView"] }));

    session.run("codeView", None, None).unwrap();
    {
        let frame = session.frame().unwrap();
        assert!(frame.is_code_view);
        assert_eq!(frame.code_value, "<p>hello</p>");
        assert!(!frame.doc.is_displayed(frame.wysiwyg_frame));
        assert!(frame.doc.is_displayed(frame.code));
    }
    assert_eq!(button_state(&session, "bold"), (false, true));
    assert_eq!(button_state(&session, "codeView"), (true, false));

    session.run("codeView", None, None).unwrap();
    assert!(!session.frame().unwrap().is_code_view);
    assert_eq!(button_state(&session, "bold"), (false, false));
    assert_eq!(button_state(&session, "codeView"), (false, false));
}

#[test]
fn code_view_keeps_read_only_buttons_disabled_on_exit() {
    let mut session = session(&["hello"], json!({ "buttonList": ["bold", "codeView"] }));
    session.read_only(true, None).unwrap();

    session.run("codeView", None, None).unwrap();
    session.run("codeView", None, None).unwrap();

    assert_eq!(button_state(&session, "bold"), (false, true));
}

#[test]
fn full_screen_and_show_blocks_toggle_classes() {
    let mut session = session(&["hello"], json!({ "buttonList": ["fullScreen", "showBlocks"] }));

    session.run("fullScreen", None, None).unwrap();
    session.run("showBlocks", None, None).unwrap();
    {
        let frame = session.frame().unwrap();
        assert!(frame.doc.has_class(frame.top_area, "se-fullscreen"));
        assert!(frame.doc.has_class(frame.wysiwyg, "se-show-block"));
    }
    assert_eq!(button_state(&session, "fullScreen"), (true, false));

    session.run("fullScreen", None, None).unwrap();
    session.run("showBlocks", None, None).unwrap();
    let frame = session.frame().unwrap();
    assert!(!frame.doc.has_class(frame.top_area, "se-fullscreen"));
    assert!(!frame.doc.has_class(frame.wysiwyg, "se-show-block"));
    assert_eq!(button_state(&session, "showBlocks"), (false, false));
}

#[test]
fn switching_direction_mirrors_indents() {
    let mut session = session(
        &["hello"],
        json!({ "buttonList": ["dir_ltr", "dir_rtl"], "historyStackDelayTime": 0 }),
    );
    select(&mut session, (0, 0), (0, 1));
    session.run("indent", None, None).unwrap();

    session.run("dir_rtl", None, None).unwrap();

    assert_eq!(button_state(&session, "dir_rtl"), (true, false));
    assert_eq!(button_state(&session, "dir_ltr"), (false, false));
    assert!(session.toolbar().main.rtl);
    assert_eq!(session.options().get_str("textDirection"), Some("rtl"));
    {
        let frame = session.frame().unwrap();
        let line = frame.doc.child(frame.wysiwyg, 0).unwrap();
        assert!(frame.doc.has_class(frame.top_area, "se-rtl"));
        assert_eq!(frame.doc.style(line, "margin-right"), Some("25px"));
        assert_eq!(frame.doc.style(line, "margin-left"), None);
    }

    session.run("indent", None, None).unwrap();
    let frame = session.frame().unwrap();
    let line = frame.doc.child(frame.wysiwyg, 0).unwrap();
    assert_eq!(frame.doc.style(line, "margin-right"), Some("50px"));
}

#[test]
fn setting_the_same_direction_keeps_margins() {
    let mut session = session(&["hello"], json!({}));
    select(&mut session, (0, 0), (0, 1));
    session.run("indent", None, None).unwrap();

    session.run("dir_ltr", None, None).unwrap();

    let frame = session.frame().unwrap();
    let line = frame.doc.child(frame.wysiwyg, 0).unwrap();
    assert_eq!(frame.doc.style(line, "margin-left"), Some("25px"));
    assert!(!frame.doc.has_class(frame.top_area, "se-rtl"));
}

#[test]
fn print_and_preview_hand_out_the_html() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut session = session(&["hello"], json!({}));
    let (p, v) = (seen.clone(), seen.clone());
    session.events_mut().on_print = Some(Box::new(move |key: &RootKey, html: &str| {
        p.lock().unwrap().push(format!("print {key}: {html}"));
    }));
    session.events_mut().on_preview = Some(Box::new(move |key: &RootKey, html: &str| {
        v.lock().unwrap().push(format!("preview {key}: {html}"));
    }));

    session.run("print", None, None).unwrap();
    session.run("preview", None, None).unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            "print main: <p>hello</p>".to_string(),
            "preview main: <p>hello</p>".to_string(),
        ]
    );
}

#[test]
fn collapsed_style_inserts_a_caret_run() {
    let mut session = session(&["hello"], json!({}));
    select(&mut session, (0, 2), (0, 2));

    session.run("underline", None, None).unwrap();

    assert_eq!(
        session.get_html(None).unwrap(),
        "<p>he<u>\u{200B}</u>llo</p>"
    );
    let range = session.frame().unwrap().cached_range().unwrap();
    assert!(range.collapsed());
    assert_eq!(range.start_offset(), 1);
}

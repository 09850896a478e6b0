use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use wysiwyg_core::{
    CommandError, ContentNode, InputEvent, Plugin, PluginFactory, RootTarget, Session,
    SessionError, Tray, TriggerKind,
};

fn session(lines: &[&str], options: Value, factories: Vec<PluginFactory>) -> Session {
    let target = RootTarget::new("main").value(lines.iter().map(|l| ContentNode::paragraph(*l)).collect());
    let mut session = Session::new(vec![target], options, factories).unwrap();
    session.flush_deferred();
    session
}

fn select_text(session: &mut Session, line: usize, start: usize, end: usize) {
    let frame = session.frame().unwrap();
    let line = frame.doc.child(frame.wysiwyg, line).unwrap();
    let text = frame.doc.first_child(line).unwrap();
    session.selection().unwrap().set_range(text, start, text, end).unwrap();
}

fn counting_open(name: &str, kind: TriggerKind, opened: Arc<AtomicUsize>) -> PluginFactory {
    PluginFactory::new(name, kind, move |_| {
        let opened = opened.clone();
        Plugin::new().open(move |_, _| {
            opened.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    })
}

#[test]
fn read_only_blocks_styles_but_allows_copy() {
    let mut session = session(
        &["hello"],
        json!({ "buttonList": ["bold", "copy"], "historyStackDelayTime": 0 }),
        Vec::new(),
    );
    select_text(&mut session, 0, 0, 5);
    session.read_only(true, None).unwrap();

    session.run("bold", None, None).unwrap();
    session.command_handler("bold").unwrap();
    assert_eq!(session.get_html(None).unwrap(), "<p>hello</p>");
    assert!(!session.history().can_undo());
    assert!(!session.status().is_changed);

    let bold = session.toolbar().find("bold", Tray::Main).unwrap();
    assert!(session.toolbar().button(bold).unwrap().disabled);
    session.run_from_target(bold).unwrap();
    assert_eq!(session.get_html(None).unwrap(), "<p>hello</p>");

    session.run("copy", None, None).unwrap();
    assert_eq!(session.clipboard(), "hello");
}

#[test]
fn bold_toggles_and_marks_its_button() {
    let mut session = session(
        &["hello"],
        json!({ "buttonList": ["bold"], "historyStackDelayTime": 0 }),
        Vec::new(),
    );
    let bold = session.toolbar().find("bold", Tray::Main).unwrap();
    select_text(&mut session, 0, 0, 5);

    session.run_from_target(bold).unwrap();
    assert_eq!(session.get_html(None).unwrap(), "<p><strong>hello</strong></p>");
    assert!(session.toolbar().button(bold).unwrap().active);
    assert!(session.history().can_undo());

    session.run_from_target(bold).unwrap();
    assert_eq!(session.get_html(None).unwrap(), "<p>hello</p>");
    assert!(!session.toolbar().button(bold).unwrap().active);
}

#[test]
fn style_wraps_only_the_selected_span() {
    let mut session = session(&["hello"], json!({}), Vec::new());
    select_text(&mut session, 0, 1, 3);

    session.command_handler("italic").unwrap();

    assert_eq!(session.get_html(None).unwrap(), "<p>h<em>el</em>lo</p>");
}

#[test]
fn unknown_style_command_is_ignored() {
    let mut session = session(&["hello"], json!({}), Vec::new());
    select_text(&mut session, 0, 0, 5);

    session.command_handler("sparkle").unwrap();

    assert_eq!(session.get_html(None).unwrap(), "<p>hello</p>");
}

#[test]
fn dropdown_opens_then_closes_on_second_trigger() {
    let opened = Arc::new(AtomicUsize::new(0));
    let mut session = session(
        &["hello"],
        json!({ "buttonList": ["font"] }),
        vec![counting_open("font", TriggerKind::Dropdown, opened.clone())],
    );
    let font = session.toolbar().find("font", Tray::Main).unwrap();

    session.run_from_target(font).unwrap();
    assert_eq!(session.menu().current_dropdown, Some(font));
    assert!(session.toolbar().button(font).unwrap().active);

    session.run_from_target(font).unwrap();
    assert_eq!(session.menu().current_dropdown, None);
    assert!(!session.toolbar().button(font).unwrap().active);
    assert_eq!(opened.load(Ordering::SeqCst), 1);
}

#[test]
fn container_toggles_like_a_dropdown() {
    let opened = Arc::new(AtomicUsize::new(0));
    let mut session = session(
        &["hello"],
        json!({ "buttonList": ["list"] }),
        vec![counting_open("list", TriggerKind::Container, opened.clone())],
    );
    let list = session.toolbar().find("list", Tray::Main).unwrap();

    session.run_from_target(list).unwrap();
    assert_eq!(session.menu().current_container, Some(list));

    session.run_from_target(list).unwrap();
    assert_eq!(session.menu().current_container, None);
    assert_eq!(opened.load(Ordering::SeqCst), 1);
}

#[test]
fn more_layer_toggles_on_its_tray() {
    let mut session = session(
        &["hello"],
        json!({ "buttonList": [[":extra-More tools-dots", "bold", "italic"]] }),
        Vec::new(),
    );
    let more = session.toolbar().find("extra", Tray::Main).unwrap();
    assert_eq!(session.toolbar().layer(Tray::Main, "extra").len(), 2);
    assert_eq!(
        session.toolbar().button(more).unwrap().title.as_deref(),
        Some("More tools")
    );

    session.run_from_target(more).unwrap();
    let tray = session.toolbar().tray(Tray::Main).unwrap();
    assert_eq!(tray.more_layer_active, Some(more));
    assert_eq!(tray.open_layer.as_deref(), Some("extra"));

    session.run_from_target(more).unwrap();
    let tray = session.toolbar().tray(Tray::Main).unwrap();
    assert_eq!(tray.more_layer_active, None);
    assert_eq!(tray.open_layer, None);
}

#[test]
fn modal_open_receives_its_trigger() {
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let recorder = seen.clone();
    let factory = PluginFactory::new("link", TriggerKind::Modal, move |_| {
        let recorder = recorder.clone();
        Plugin::new().open(move |_, target| {
            recorder.lock().unwrap().push(target);
            Ok(())
        })
    });
    let mut session = session(&["hello"], json!({ "buttonList": ["link"] }), vec![factory]);
    let link = session.toolbar().find("link", Tray::Main).unwrap();

    session.run_from_target(link).unwrap();
    session.run("link", Some(TriggerKind::FileBrowser), Some(link)).unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![Some(link), None]);
}

#[test]
fn plugin_action_errors_reach_the_caller() {
    let factory = PluginFactory::new("broken", TriggerKind::Command, |_| {
        Plugin::new().action(|_| Err(CommandError::new("nothing selected")))
    });
    let mut session = session(&["hello"], json!({ "buttonList": ["broken"] }), vec![factory]);
    let broken = session.toolbar().find("broken", Tray::Main).unwrap();

    let err = session.run_from_target(broken).unwrap_err();

    match err {
        SessionError::Plugin(err) => assert_eq!(err.message(), "nothing selected"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn typed_dispatch_to_missing_plugin_fails() {
    let mut session = session(&["hello"], json!({}), Vec::new());

    let err = session.run("ghost", Some(TriggerKind::Modal), None).unwrap_err();

    assert!(matches!(err, SessionError::UnknownPlugin(name) if name == "ghost"));
}

#[test]
fn disabled_session_ignores_dispatch() {
    let mut session = session(&["hello"], json!({ "buttonList": ["bold"] }), Vec::new());
    select_text(&mut session, 0, 0, 5);
    session.disable(None).unwrap();

    session.run("bold", None, None).unwrap();
    assert_eq!(session.get_html(None).unwrap(), "<p>hello</p>");
    let bold = session.toolbar().find("bold", Tray::Main).unwrap();
    assert!(session.toolbar().button(bold).unwrap().disabled);

    session.enable(None).unwrap();
    session.run("bold", None, None).unwrap();
    assert_eq!(session.get_html(None).unwrap(), "<p><strong>hello</strong></p>");
}

#[test]
fn keydown_hook_can_stop_an_event() {
    let factory = PluginFactory::new("tabs", TriggerKind::Command, |_| {
        Plugin::new().on_keydown(|_, event| event.key != "Tab")
    });
    let mut session = session(&["hello"], json!({}), vec![factory]);

    assert!(!session.dispatch_keydown(&InputEvent::key("Tab")));
    assert!(session.dispatch_keydown(&InputEvent::key("a")));
    assert!(session.dispatch_mousedown(&InputEvent::default()));
}

#[test]
fn command_targets_are_deduplicated() {
    let mut session = session(&["hello"], json!({ "buttonList": ["bold", "nope", "|"] }), Vec::new());
    let bold = session.toolbar().find("bold", Tray::Main).unwrap();

    assert_eq!(session.command_targets("bold"), vec![bold]);
    assert_eq!(session.toolbar().find("nope", Tray::Main), None);
    assert_eq!(session.toolbar().buttons().count(), 1);
}

#[test]
fn remove_range_clears_active_buttons() {
    let mut session = session(
        &["hello"],
        json!({ "buttonList": ["bold"], "historyStackDelayTime": 0 }),
        Vec::new(),
    );
    let bold = session.toolbar().find("bold", Tray::Main).unwrap();
    select_text(&mut session, 0, 0, 5);
    session.run_from_target(bold).unwrap();
    assert!(session.toolbar().button(bold).unwrap().active);

    session.remove_range().unwrap();

    assert!(!session.toolbar().button(bold).unwrap().active);
    assert_eq!(session.frame().unwrap().cached_range(), None);
    assert_eq!(session.effect_node(), None);
}

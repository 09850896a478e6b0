use pretty_assertions::assert_eq;
use serde_json::json;
use wysiwyg_core::{Boundary, ContentNode, NodeId, Range, RootTarget, Session, ZERO_WIDTH_SPACE};

fn session_with(lines: &[&str]) -> Session {
    let target = RootTarget::new("main").value(lines.iter().map(|l| ContentNode::paragraph(*l)).collect());
    Session::new(vec![target], json!({ "historyStackDelayTime": 0 }), Vec::new()).unwrap()
}

/// (line, first child of line) for the `ix`-th line of the active root.
fn line_and_leaf(session: &Session, ix: usize) -> (NodeId, NodeId) {
    let frame = session.frame().unwrap();
    let line = frame.doc.child(frame.wysiwyg, ix).unwrap();
    (line, frame.doc.first_child(line).unwrap())
}

#[test]
fn get_range_is_stable_across_calls() {
    let mut session = session_with(&["hello"]);
    let (_, text) = line_and_leaf(&session, 0);

    let mut sel = session.selection().unwrap();
    sel.set_range(text, 1, text, 3).unwrap();
    let first = sel.get_range();
    let second = sel.get_range();

    assert_eq!(first, second);
    assert_eq!((first.start_container(), first.start_offset()), (text, 1));
    assert_eq!((first.end_container(), first.end_offset()), (text, 3));
}

#[test]
fn set_range_clamps_offsets_past_text_length() {
    let mut session = session_with(&["hello"]);
    let (_, text) = line_and_leaf(&session, 0);

    let range = session.selection().unwrap().set_range(text, 99, text, 99).unwrap();

    assert_eq!(range.start_offset(), 5);
    assert_eq!(range.end_offset(), 5);
    assert!(range.collapsed());
}

#[test]
fn set_range_moves_line_endpoints_onto_children() {
    let mut session = session_with(&["hello"]);
    let (line, text) = line_and_leaf(&session, 0);

    let range = session.selection().unwrap().set_range(line, 0, line, 1).unwrap();

    assert_eq!((range.start_container(), range.start_offset()), (text, 0));
    assert_eq!((range.end_container(), range.end_offset()), (text, 5));
}

#[test]
fn set_range_with_detached_node_recovers_focus() {
    let mut session = session_with(&["hello"]);
    let loose = session.frame_mut().unwrap().doc.create_element("span");

    let result = session.selection().unwrap().set_range(loose, 0, loose, 0);

    assert_eq!(result, None);
    assert!(session.has_focus());
    let frame = session.frame().unwrap();
    assert!(frame.cached_range().unwrap().is_valid_in(&frame.doc));
}

#[test]
fn is_none_for_surface_and_component_ranges() {
    let target = RootTarget::new("main").value(vec![
        ContentNode::paragraph("text"),
        ContentNode::element("figure", vec![ContentNode::element("img", Vec::new())]),
    ]);
    let mut session = Session::new(vec![target], json!({}), Vec::new()).unwrap();
    let frame = session.frame().unwrap();
    let wysiwyg = frame.wysiwyg;
    let text = frame.doc.first_child(frame.doc.child(wysiwyg, 0).unwrap()).unwrap();
    let figure = frame.doc.child(wysiwyg, 1).unwrap();

    let sel = session.selection().unwrap();
    let doc = sel.doc();

    let surface = Range::new(doc, wysiwyg, 0, wysiwyg, 1).unwrap();
    assert!(sel.is_none(&surface));

    let inside_figure = Range::new(doc, figure, 0, figure, 1).unwrap();
    assert!(sel.is_none(&inside_figure));

    let on_text = Range::new(doc, text, 0, text, 2).unwrap();
    assert!(!sel.is_none(&on_text));

    // One end on the surface, the other in text: a usable partial selection.
    let partial = Range::new(doc, wysiwyg, 0, text, 2).unwrap();
    assert!(!sel.is_none(&partial));
}

#[test]
fn get_range_and_add_line_fills_an_empty_surface() {
    let mut session = session_with(&[]);
    let wysiwyg = {
        let frame = session.frame_mut().unwrap();
        for child in frame.doc.children(frame.wysiwyg).to_vec() {
            frame.doc.remove(child);
        }
        frame.wysiwyg
    };

    let mut sel = session.selection().unwrap();
    let empty = Range::collapsed_at(sel.doc(), wysiwyg, 0).unwrap();
    let range = sel.get_range_and_add_line(empty, None);

    let doc = sel.doc();
    assert_eq!(doc.inner_html(wysiwyg), "<p><br></p>");
    assert!(doc.is_break(range.start_container()));
    assert!(range.collapsed());
}

#[test]
fn get_range_and_add_line_keeps_usable_ranges() {
    let mut session = session_with(&["hello"]);
    let (_, text) = line_and_leaf(&session, 0);

    let mut sel = session.selection().unwrap();
    let range = Range::new(sel.doc(), text, 1, text, 2).unwrap();

    assert_eq!(sel.get_range_and_add_line(range, None), range);
}

#[test]
fn reset_range_to_text_node_replaces_a_bare_break() {
    let mut session = session_with(&[]);
    let (_, br) = line_and_leaf(&session, 0);

    let mut sel = session.selection().unwrap();
    sel.set_range(br, 0, br, 0).unwrap();
    assert!(sel.reset_range_to_text_node());

    let range = sel.get_range();
    let doc = sel.doc();
    let zw = range.start_container();
    assert!(doc.is_text(zw));
    assert_eq!(doc.text(zw), Some(ZERO_WIDTH_SPACE.to_string().as_str()));
    assert_eq!((range.start_container(), range.start_offset()), (zw, 0));
    assert_eq!((range.end_container(), range.end_offset()), (zw, 1));
    assert_eq!(doc.node_name(doc.next_sibling(zw).unwrap()), "BR");
}

#[test]
fn reset_range_to_text_node_drops_a_trailing_bare_break() {
    let target = RootTarget::new("main").value(vec![
        ContentNode::paragraph("ab"),
        ContentNode::element("p", vec![ContentNode::element("br", Vec::new())]),
    ]);
    let mut session = Session::new(vec![target], json!({}), Vec::new()).unwrap();
    let (_, text) = line_and_leaf(&session, 0);
    let (second, br) = line_and_leaf(&session, 1);

    let mut sel = session.selection().unwrap();
    sel.set_range(text, 1, br, 0).unwrap();
    assert!(sel.reset_range_to_text_node());

    let range = sel.get_range();
    let doc = sel.doc();
    assert_eq!((range.start_container(), range.start_offset()), (text, 1));
    let zw = range.end_container();
    assert_eq!(doc.text(zw), Some(ZERO_WIDTH_SPACE.to_string().as_str()));
    assert_eq!(range.end_offset(), 1);
    assert_eq!(doc.children(second), &[zw]);
    assert!(!doc.is_alive(br));
}

#[test]
fn reset_range_to_text_node_wraps_a_bare_inline_run_in_a_line() {
    let target = RootTarget::new("main").value(vec![ContentNode::element(
        "span",
        vec![ContentNode::text("hi")],
    )]);
    let mut session = Session::new(vec![target], json!({}), Vec::new()).unwrap();
    let (span, text) = line_and_leaf(&session, 0);

    let mut sel = session.selection().unwrap();
    sel.set_range(span, 0, span, 1).unwrap();
    assert!(sel.reset_range_to_text_node());

    let range = sel.get_range();
    let doc = sel.doc();
    assert_eq!((range.start_container(), range.start_offset()), (text, 0));
    assert_eq!((range.end_container(), range.end_offset()), (text, 2));
    assert_eq!(doc.node_name(doc.parent(text).unwrap()), "P");
    assert_eq!(doc.inner_html(span), "<p>hi</p>");
}

#[test]
fn reset_range_to_text_node_uses_div_lines_in_table_cells() {
    let cell = ContentNode::element(
        "td",
        vec![ContentNode::element("span", vec![ContentNode::text("x")])],
    );
    let table = ContentNode::element(
        "table",
        vec![ContentNode::element(
            "tbody",
            vec![ContentNode::element("tr", vec![cell])],
        )],
    );
    let target = RootTarget::new("main").value(vec![table]);
    let mut session = Session::new(vec![target], json!({}), Vec::new()).unwrap();
    let (td, span, text) = {
        let doc = &session.frame().unwrap().doc;
        let wysiwyg = session.frame().unwrap().wysiwyg;
        let tr = doc.first_child(doc.first_child(doc.first_child(wysiwyg).unwrap()).unwrap()).unwrap();
        let td = doc.first_child(tr).unwrap();
        let span = doc.first_child(td).unwrap();
        (td, span, doc.first_child(span).unwrap())
    };

    let mut sel = session.selection().unwrap();
    sel.set_range(span, 0, span, 1).unwrap();
    assert!(sel.reset_range_to_text_node());

    let range = sel.get_range();
    let doc = sel.doc();
    assert_eq!((range.start_container(), range.start_offset()), (text, 0));
    assert_eq!((range.end_container(), range.end_offset()), (text, 1));
    assert_eq!(doc.node_name(doc.parent(text).unwrap()), "DIV");
    assert_eq!(doc.inner_html(td), "<span><div>x</div></span>");
}

#[test]
fn reset_range_to_text_node_rejects_surface_ranges() {
    let mut session = session_with(&["one"]);
    let wysiwyg = session.frame().unwrap().wysiwyg;

    let mut sel = session.selection().unwrap();
    sel.set_range(wysiwyg, 0, wysiwyg, 1).unwrap();

    assert!(!sel.reset_range_to_text_node());
}

#[test]
fn get_node_defaults_to_first_line() {
    let mut session = session_with(&["first", "second"]);
    let (line, _) = line_and_leaf(&session, 0);

    let node = session.selection().unwrap().get_node().unwrap();

    assert_eq!(node, line);
}

#[test]
fn get_range_adopts_a_drag_selection() {
    let mut session = session_with(&["hello"]);
    let (_, text) = line_and_leaf(&session, 0);

    let mut sel = session.selection().unwrap();
    sel.set_range(text, 2, text, 2).unwrap();
    drop(sel);

    // Anchor after focus, as a right-to-left drag reports it.
    session
        .frame_mut()
        .unwrap()
        .native_selection_mut()
        .set_base_and_extent(
            Boundary::new(text, 4),
            Boundary::new(text, 1),
        );

    let range = session.selection().unwrap().get_range();
    assert_eq!((range.start_offset(), range.end_offset()), (1, 4));
}

#[test]
fn selection_state_stays_with_its_root() {
    let targets = vec![
        RootTarget::new("a").value(vec![ContentNode::paragraph("alpha")]),
        RootTarget::new("b").value(vec![ContentNode::paragraph("beta")]),
    ];
    let mut session = Session::new(targets, json!({}), Vec::new()).unwrap();
    let (_, text) = line_and_leaf(&session, 0);
    session.selection().unwrap().set_range(text, 1, text, 3).unwrap();

    session.change_frame_context("b");

    assert_eq!(session.active_root().as_str(), "b");
    assert_eq!(session.frame().unwrap().cached_range(), None);
    let a = session.frame_by_key("a").unwrap().cached_range().unwrap();
    assert_eq!((a.start_offset(), a.end_offset()), (1, 3));
}

use graph_flow::graph_utils::demo::{demo_flow, DEFAULT_FONT_SIZE, DEFAULT_NODE_COLOR};
use graph_flow::graph_utils::graph::{GraphStore, Point, StylePatch};
use graph_flow::history::global::GlobalHistory;
use graph_flow::history::node::{NodeHistories, NodePatch, NodeSnapshot, PatchSemantics};
use graph_flow::history::session::EditorSession;

fn pt(x: f32, y: f32) -> Point {
    Point::new(x, y)
}

fn demo_session() -> EditorSession {
    EditorSession::new(&demo_flow(10))
}

fn color_patch(color: &str) -> StylePatch {
    StylePatch { color: Some(color.to_string()), font_size: None }
}

fn font_patch(size: u32) -> StylePatch {
    StylePatch { color: None, font_size: Some(size) }
}

#[test]
fn demo_flow_generates_grid_and_chain() {
    let g = demo_flow(10);
    assert_eq!(g.nodes.len(), 10);
    // 4-wide grid: node-1 at the origin offset, node-5 starts the second row
    let n1 = g.node("node-1").expect("node-1 exists");
    assert_eq!(n1.position, pt(100.0, 100.0));
    assert_eq!(n1.style.color, DEFAULT_NODE_COLOR);
    assert_eq!(n1.style.font_size, DEFAULT_FONT_SIZE);
    let n5 = g.node("node-5").expect("node-5 exists");
    assert_eq!(n5.position, pt(100.0, 250.0));
    // Every node links to i+1 and i+2
    assert!(g.edges.iter().any(|e| e.source == "node-1" && e.target == "node-2"));
    assert!(g.edges.iter().any(|e| e.source == "node-1" && e.target == "node-3"));
    assert!(g.edges.iter().all(|e| e.kind == "smoothstep"));
}

#[test]
fn store_restyle_touches_only_listed_fields() {
    let mut store = GraphStore::from_snapshot(&demo_flow(3));
    assert!(store.restyle("node-1", &font_patch(20)));
    let n = store.get_node("node-1").unwrap();
    assert_eq!(n.style.font_size, 20);
    assert_eq!(n.style.color, DEFAULT_NODE_COLOR, "color must be untouched");
}

#[test]
fn store_restyle_applies_zero_and_empty_values() {
    // The store always uses explicit presence; the legacy quirk lives only
    // in timeline patch application.
    let mut store = GraphStore::from_snapshot(&demo_flow(3));
    assert!(store.restyle("node-1", &font_patch(0)));
    assert!(store.restyle("node-1", &color_patch("")));
    let n = store.get_node("node-1").unwrap();
    assert_eq!(n.style.font_size, 0);
    assert_eq!(n.style.color, "");
}

#[test]
fn store_unknown_id_is_silent_noop() {
    let mut store = GraphStore::from_snapshot(&demo_flow(3));
    assert!(!store.move_position("node-99", pt(1.0, 2.0)));
    assert!(!store.restyle("node-99", &font_patch(20)));
}

#[test]
fn global_history_first_record_only_seeds_present() {
    let mut h = GlobalHistory::new();
    assert!(h.undo().is_none());
    h.record(&demo_flow(2), "INITIAL_STATE");
    assert!(h.present().is_some());
    assert!(h.past().is_empty());
    assert!(!h.can_undo());
    assert!(!h.can_redo());
}

#[test]
fn global_history_label_travels_with_the_transition() {
    let mut h = GlobalHistory::new();
    let mut g = demo_flow(2);
    h.record(&g, "INITIAL_STATE");
    g.nodes[0].position = pt(5.0, 5.0);
    h.record(&g, "MOVE_NODE_node-1");
    // The past entry holds the pre-move snapshot under the incoming label
    assert_eq!(h.past().len(), 1);
    assert_eq!(h.past()[0].action, "MOVE_NODE_node-1");
    assert_eq!(h.past()[0].snapshot.node("node-1").unwrap().position, pt(100.0, 100.0));
    // Undo reports the same label and moves it to the future entry
    assert_eq!(h.undo().as_deref(), Some("MOVE_NODE_node-1"));
    assert_eq!(h.future().len(), 1);
    assert_eq!(h.future()[0].action, "MOVE_NODE_node-1");
    assert_eq!(h.redo().as_deref(), Some("MOVE_NODE_node-1"));
}

#[test]
fn global_history_stack_conservation() {
    let mut h = GlobalHistory::new();
    let mut g = demo_flow(2);
    let n = 6;
    for i in 0..n {
        g.nodes[0].position = pt(i as f32, 0.0);
        h.record(&g, &format!("MOVE_NODE_node-1_{}", i));
    }
    for k in 1..=4 {
        assert!(h.undo().is_some());
        assert_eq!(h.past().len() + h.future().len(), n - 1);
        assert_eq!(h.future().len(), k);
    }
}

#[test]
fn global_history_round_trip_restores_present() {
    let mut h = GlobalHistory::new();
    let mut g = demo_flow(2);
    h.record(&g, "INITIAL_STATE");
    g.nodes[0].position = pt(9.0, 9.0);
    h.record(&g, "MOVE_NODE_node-1");
    let before = h.present().unwrap().clone();
    h.undo();
    h.redo();
    assert_eq!(h.present().unwrap(), &before);
}

#[test]
fn global_history_record_discards_redo_branch() {
    let mut h = GlobalHistory::new();
    let mut g = demo_flow(2);
    h.record(&g, "INITIAL_STATE");
    g.nodes[0].position = pt(1.0, 1.0);
    h.record(&g, "MOVE_NODE_node-1");
    h.undo();
    assert!(h.can_redo());
    g.nodes[0].position = pt(2.0, 2.0);
    h.record(&g, "MOVE_NODE_node-1");
    assert!(h.future().is_empty());
    assert!(!h.can_redo());
}

#[test]
fn recorded_snapshots_do_not_alias_the_live_graph() {
    let mut h = GlobalHistory::new();
    let mut g = demo_flow(2);
    h.record(&g, "INITIAL_STATE");
    g.nodes[0].position = pt(1.0, 1.0);
    h.record(&g, "MOVE_NODE_node-1");
    // Mutating the live graph afterwards must not corrupt history entries
    g.nodes[0].position = pt(777.0, 777.0);
    g.nodes[0].style.color = "#123456".to_string();
    assert_eq!(h.past()[0].snapshot.node("node-1").unwrap().position, pt(100.0, 100.0));
    assert_eq!(h.present().unwrap().node("node-1").unwrap().position, pt(1.0, 1.0));
    assert_eq!(
        h.present().unwrap().node("node-1").unwrap().style.color,
        DEFAULT_NODE_COLOR
    );
}

#[test]
fn node_histories_initialize_is_idempotent() {
    let store = GraphStore::from_snapshot(&demo_flow(2));
    let mut nodes = NodeHistories::new();
    let first = NodeSnapshot::capture(store.get_node("node-1").unwrap());
    nodes.initialize("node-1", first.clone());
    // A second initialize with different values keeps the original baseline
    let other = NodeSnapshot { position: pt(0.0, 0.0), color: "#000000".into(), font_size: 99 };
    nodes.initialize("node-1", other);
    assert_eq!(nodes.timeline("node-1").unwrap().initial(), Some(&first));
}

#[test]
fn node_histories_create_lazily_on_first_record() {
    let store = GraphStore::from_snapshot(&demo_flow(2));
    let mut nodes = NodeHistories::new();
    assert!(nodes.timeline("node-2").is_none());
    let current = NodeSnapshot::capture(store.get_node("node-2").unwrap());
    nodes.record(
        "node-2",
        NodePatch { font_size: Some(20), ..Default::default() },
        NodePatch { font_size: Some(16), ..Default::default() },
        "CHANGE_FONT_SIZE_NODE_node-2",
        &current,
    );
    let timeline = nodes.timeline("node-2").unwrap();
    assert_eq!(timeline.past().len(), 1);
    assert_eq!(timeline.initial(), Some(&current));
}

#[test]
fn node_undo_unknown_or_empty_is_noop() {
    let mut store = GraphStore::from_snapshot(&demo_flow(2));
    let mut nodes = NodeHistories::new();
    assert!(nodes.undo("node-1", &mut store, PatchSemantics::Exact).is_none());
    nodes.initialize("node-1", NodeSnapshot::capture(store.get_node("node-1").unwrap()));
    assert!(nodes.undo("node-1", &mut store, PatchSemantics::Exact).is_none());
    assert!(nodes.redo("node-1", &mut store, PatchSemantics::Exact).is_none());
}

// Scenario: one drag records on both timelines with the masked previous value
#[test]
fn drag_end_records_on_both_timelines() {
    let mut session = demo_session();
    assert!(session.on_drag_end("node-1", pt(250.0, 100.0)));
    assert_eq!(session.graph().node("node-1").unwrap().position, pt(250.0, 100.0));
    assert_eq!(session.global_history().past().len(), 1);
    let timeline = session.node_timeline("node-1").unwrap();
    assert_eq!(timeline.past().len(), 1);
    let rec = &timeline.past()[0];
    assert_eq!(rec.action, "MOVE_NODE_node-1");
    assert_eq!(rec.previous.position, Some(pt(100.0, 100.0)));
    assert_eq!(rec.patch.position, Some(pt(250.0, 100.0)));
    // The position-only record carries no style fields
    assert!(rec.previous.color.is_none());
    assert!(rec.previous.font_size.is_none());
}

#[test]
fn drag_end_unchanged_position_records_nothing() {
    let mut session = demo_session();
    assert!(!session.on_drag_end("node-1", pt(100.0, 100.0)));
    assert_eq!(session.global_history().past().len(), 0);
    assert!(session.node_timeline("node-1").unwrap().past().is_empty());
}

#[test]
fn drag_end_unknown_node_records_nothing() {
    let mut session = demo_session();
    assert!(!session.on_drag_end("node-99", pt(1.0, 1.0)));
    assert_eq!(session.global_history().past().len(), 0);
}

// Scenario: global undo reverts the canvas but leaves the node timeline alone
#[test]
fn global_undo_does_not_touch_node_timelines() {
    let mut session = demo_session();
    session.on_drag_end("node-1", pt(250.0, 100.0));
    assert!(session.undo());
    assert_eq!(session.graph().node("node-1").unwrap().position, pt(100.0, 100.0));
    assert_eq!(session.global_history().future().len(), 1);
    // The node timeline still holds its record, past side
    let timeline = session.node_timeline("node-1").unwrap();
    assert_eq!(timeline.past().len(), 1);
    assert!(timeline.future().is_empty());
}

// Scenario: node-scoped undo reverts in place and bypasses global history
#[test]
fn node_undo_bypasses_global_history() {
    let mut session = demo_session();
    session.on_style_change("node-2", &color_patch("#ff0000"));
    let global_past = session.global_history().past().len();
    let global_future = session.global_history().future().len();
    assert!(session.undo_node("node-2"));
    assert_eq!(session.graph().node("node-2").unwrap().style.color, DEFAULT_NODE_COLOR);
    assert_eq!(session.global_history().past().len(), global_past);
    assert_eq!(session.global_history().future().len(), global_future);
}

#[test]
fn node_undo_leaves_other_nodes_alone() {
    let mut session = demo_session();
    session.on_style_change("node-1", &color_patch("#ff0000"));
    session.on_style_change("node-2", &color_patch("#00ff00"));
    assert!(session.undo_node("node-1"));
    assert_eq!(session.graph().node("node-1").unwrap().style.color, DEFAULT_NODE_COLOR);
    assert_eq!(session.graph().node("node-2").unwrap().style.color, "#00ff00");
}

// Scenario: two sequential moves, one undo lands on the state after the first
#[test]
fn one_undo_steps_back_exactly_one_move() {
    let mut session = demo_session();
    session.on_drag_end("node-1", pt(250.0, 100.0));
    session.on_drag_end("node-1", pt(400.0, 300.0));
    assert!(session.undo());
    assert_eq!(session.graph().node("node-1").unwrap().position, pt(250.0, 100.0));
}

#[test]
fn style_change_action_labels() {
    let mut session = demo_session();
    session.on_style_change("node-1", &color_patch("#ff0000"));
    session.on_style_change("node-1", &font_patch(20));
    session.on_style_change(
        "node-1",
        &StylePatch { color: Some("#00ff00".into()), font_size: Some(22) },
    );
    let timeline = session.node_timeline("node-1").unwrap();
    let actions: Vec<&str> = timeline.past().iter().map(|r| r.action.as_str()).collect();
    assert_eq!(
        actions,
        [
            "CHANGE_COLOR_NODE_node-1",
            "CHANGE_FONT_SIZE_NODE_node-1",
            "CHANGE_STYLE_NODE_node-1",
        ]
    );
}

#[test]
fn style_change_previous_is_masked_to_the_patch() {
    let mut session = demo_session();
    session.on_style_change("node-1", &font_patch(20));
    let rec = &session.node_timeline("node-1").unwrap().past()[0];
    assert_eq!(rec.previous.font_size, Some(16));
    assert!(rec.previous.color.is_none(), "untouched fields must not be captured");
    assert!(rec.previous.position.is_none());
}

#[test]
fn empty_style_patch_records_nothing() {
    let mut session = demo_session();
    assert!(!session.on_style_change("node-1", &StylePatch::default()));
    assert_eq!(session.global_history().past().len(), 0);
}

#[test]
fn node_round_trip_restores_the_pre_undo_value() {
    let mut session = demo_session();
    session.on_style_change("node-1", &color_patch("#ff0000"));
    assert!(session.undo_node("node-1"));
    assert!(session.redo_node("node-1"));
    assert_eq!(session.graph().node("node-1").unwrap().style.color, "#ff0000");
    let timeline = session.node_timeline("node-1").unwrap();
    assert_eq!(timeline.past().len(), 1);
    assert!(timeline.future().is_empty());
}

#[test]
fn node_record_discards_redo_branch() {
    let mut session = demo_session();
    session.on_style_change("node-1", &font_patch(20));
    session.undo_node("node-1");
    assert!(session.node_can_redo("node-1"));
    session.on_style_change("node-1", &font_patch(24));
    assert!(!session.node_can_redo("node-1"));
    assert!(session.node_timeline("node-1").unwrap().future().is_empty());
}

#[test]
fn node_undo_interleaves_with_moves() {
    // A style undo after a move must revert only the moved field set
    let mut session = demo_session();
    session.on_style_change("node-1", &color_patch("#ff0000"));
    session.on_drag_end("node-1", pt(250.0, 100.0));
    // Undo twice: move first, then color
    assert!(session.undo_node("node-1"));
    assert_eq!(session.graph().node("node-1").unwrap().position, pt(100.0, 100.0));
    assert_eq!(session.graph().node("node-1").unwrap().style.color, "#ff0000");
    assert!(session.undo_node("node-1"));
    assert_eq!(session.graph().node("node-1").unwrap().style.color, DEFAULT_NODE_COLOR);
}

// Scenario: zero font size round trip in both patch modes
#[test]
fn zero_font_size_round_trips_in_exact_mode() {
    let mut session = demo_session();
    session.set_patch_semantics(PatchSemantics::Exact);
    session.on_style_change("node-3", &font_patch(0));
    assert_eq!(session.graph().node("node-3").unwrap().style.font_size, 0);
    assert!(session.undo_node("node-3"));
    assert_eq!(session.graph().node("node-3").unwrap().style.font_size, 16);
    assert!(session.redo_node("node-3"));
    assert_eq!(session.graph().node("node-3").unwrap().style.font_size, 0);
}

#[test]
fn zero_font_size_redo_is_dropped_in_legacy_mode() {
    // The legacy truthiness behavior: a zero in a timeline patch is treated
    // as absent and silently not applied
    let mut session = demo_session();
    session.set_patch_semantics(PatchSemantics::SkipEmpty);
    session.on_style_change("node-3", &font_patch(0));
    assert_eq!(session.graph().node("node-3").unwrap().style.font_size, 0);
    assert!(session.undo_node("node-3"));
    assert_eq!(session.graph().node("node-3").unwrap().style.font_size, 16);
    assert!(session.redo_node("node-3"), "the record still moves stacks");
    assert_eq!(
        session.graph().node("node-3").unwrap().style.font_size,
        16,
        "the zero payload is skipped"
    );
}

#[test]
fn empty_color_redo_is_dropped_in_legacy_mode() {
    let mut session = demo_session();
    session.set_patch_semantics(PatchSemantics::SkipEmpty);
    session.on_style_change("node-2", &color_patch(""));
    assert_eq!(session.graph().node("node-2").unwrap().style.color, "");
    assert!(session.undo_node("node-2"));
    assert_eq!(session.graph().node("node-2").unwrap().style.color, DEFAULT_NODE_COLOR);
    assert!(session.redo_node("node-2"));
    assert_eq!(session.graph().node("node-2").unwrap().style.color, DEFAULT_NODE_COLOR);
}

#[test]
fn initial_load_seeds_present_and_baselines() {
    let session = demo_session();
    let global = session.global_history();
    assert!(global.present().is_some());
    assert!(global.past().is_empty());
    // Every demo node has a baseline timeline with its starting values
    for i in 1..=10 {
        let id = format!("node-{}", i);
        let timeline = session.node_timeline(&id).expect("baseline timeline");
        assert!(timeline.past().is_empty());
        let initial = timeline.initial().expect("initial value");
        assert_eq!(initial.color, DEFAULT_NODE_COLOR);
        assert_eq!(initial.font_size, DEFAULT_FONT_SIZE);
    }
}

#[test]
fn observer_sees_every_transition() {
    use std::cell::RefCell;
    use std::rc::Rc;

    let mut session = demo_session();
    let seen: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    session.set_observer(move |event| {
        sink.borrow_mut().push(format!("{:?}", event));
    });
    session.on_drag_end("node-1", pt(250.0, 100.0));
    session.undo();
    session.redo();
    session.undo_node("node-1");
    let events = seen.borrow();
    assert_eq!(events.len(), 4);
    assert!(events[0].starts_with("Recorded"));
    assert!(events[1].starts_with("Undone"));
    assert!(events[2].starts_with("Redone"));
    assert!(events[3].starts_with("NodeUndone"));
}

#[test]
fn export_writes_json_and_csv_tables() {
    use graph_flow::persistence::export;

    let graph = demo_flow(4);
    let dir = std::env::temp_dir().join("graph_flow_test_exports");
    let json_path = dir.join("snapshot.json");
    export::export_graph_json(&graph, &json_path).expect("json export");
    let text = std::fs::read_to_string(&json_path).expect("read back");
    assert!(text.contains("\"node-1\""));
    assert!(text.ends_with('\n'));

    let (nodes_csv, edges_csv) =
        export::export_graph_csv(&graph, &dir.join("snapshot.csv")).expect("csv export");
    let nodes_text = std::fs::read_to_string(nodes_csv).expect("nodes csv");
    assert!(nodes_text.starts_with("id,label,x,y,color,font_size"));
    let edges_text = std::fs::read_to_string(edges_csv).expect("edges csv");
    assert!(edges_text.contains("smoothstep"));
}

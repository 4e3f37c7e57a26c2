use crate::graph_utils::graph::{GraphSnapshot, GraphStore, Point, StylePatch};
use crate::history::global::GlobalHistory;
use crate::history::node::{
    NodeHistories, NodePatch, NodeSnapshot, NodeTimeline, PatchSemantics,
};

/// A completed history transition, handed to the session observer after
/// the canonical graph and the timelines are already consistent.
#[derive(Debug)]
pub enum HistoryEvent<'a> {
    Recorded { action: &'a str },
    Undone { action: &'a str },
    Redone { action: &'a str },
    NodeUndone { node_id: &'a str, action: &'a str },
    NodeRedone { node_id: &'a str, action: &'a str },
}

type Observer = Box<dyn FnMut(&HistoryEvent)>;

/// Owns the canonical graph and both timelines and keeps the three in
/// step. Every mutation enters through one of the boundary operations
/// below; the global and node timelines are never driven separately.
pub struct EditorSession {
    store: GraphStore,
    global: GlobalHistory,
    nodes: NodeHistories,
    semantics: PatchSemantics,
    observer: Option<Observer>,
}

impl EditorSession {
    /// Start a session on the given graph: every node gets a baseline
    /// timeline and the snapshot is recorded as INITIAL_STATE.
    pub fn new(initial: &GraphSnapshot) -> Self {
        let mut session = EditorSession {
            store: GraphStore::new(),
            global: GlobalHistory::new(),
            nodes: NodeHistories::new(),
            semantics: PatchSemantics::Exact,
            observer: None,
        };
        session.load_initial(initial);
        session
    }

    pub fn load_initial(&mut self, snapshot: &GraphSnapshot) {
        self.store.replace_snapshot(snapshot);
        for node in &self.store.graph.nodes {
            self.nodes.initialize(&node.id, NodeSnapshot::capture(node));
        }
        self.global.record(&self.store.graph, "INITIAL_STATE");
        self.notify(HistoryEvent::Recorded { action: "INITIAL_STATE" });
    }

    /// Drag release: move the node and record the change on both
    /// timelines. An unknown id or an unchanged position records nothing.
    pub fn on_drag_end(&mut self, node_id: &str, new_position: Point) -> bool {
        let previous = match self.store.get_node(node_id) {
            Some(node) => node.position,
            None => return false,
        };
        if previous == new_position {
            return false;
        }
        self.store.move_position(node_id, new_position);
        let action = format!("MOVE_NODE_{}", node_id);
        self.record_change(
            node_id,
            NodePatch { position: Some(new_position), ..Default::default() },
            NodePatch { position: Some(previous), ..Default::default() },
            &action,
        );
        true
    }

    /// Style edit: merge the patch into the node and record the change on
    /// both timelines. An unknown id or an empty patch records nothing.
    pub fn on_style_change(&mut self, node_id: &str, patch: &StylePatch) -> bool {
        if patch.is_empty() {
            return false;
        }
        let previous = match self.store.get_node(node_id) {
            Some(node) => NodePatch {
                color: patch.color.as_ref().map(|_| node.style.color.clone()),
                font_size: patch.font_size.map(|_| node.style.font_size),
                ..Default::default()
            },
            None => return false,
        };
        self.store.restyle(node_id, patch);
        let action = match (&patch.color, patch.font_size) {
            (Some(_), None) => format!("CHANGE_COLOR_NODE_{}", node_id),
            (None, Some(_)) => format!("CHANGE_FONT_SIZE_NODE_{}", node_id),
            _ => format!("CHANGE_STYLE_NODE_{}", node_id),
        };
        self.record_change(
            node_id,
            NodePatch {
                color: patch.color.clone(),
                font_size: patch.font_size,
                ..Default::default()
            },
            previous,
            &action,
        );
        true
    }

    // Shared tail of every recorded mutation: global entry first, then the
    // node timeline, then the observer
    fn record_change(
        &mut self,
        node_id: &str,
        patch: NodePatch,
        previous: NodePatch,
        action: &str,
    ) {
        self.global.record(&self.store.graph, action);
        if let Some(node) = self.store.get_node(node_id) {
            let current = NodeSnapshot::capture(node);
            self.nodes.record(node_id, patch, previous, action, &current);
        }
        self.notify(HistoryEvent::Recorded { action });
    }

    /// Whole-graph undo: steps the global timeline back and replaces the
    /// canonical graph with the restored present.
    pub fn undo(&mut self) -> bool {
        match self.global.undo() {
            Some(action) => {
                if let Some(present) = self.global.present() {
                    self.store.replace_snapshot(present);
                }
                self.notify(HistoryEvent::Undone { action: &action });
                true
            }
            None => false,
        }
    }

    /// Whole-graph redo; mirror of `undo`.
    pub fn redo(&mut self) -> bool {
        match self.global.redo() {
            Some(action) => {
                if let Some(present) = self.global.present() {
                    self.store.replace_snapshot(present);
                }
                self.notify(HistoryEvent::Redone { action: &action });
                true
            }
            None => false,
        }
    }

    /// Node-scoped undo: reverts the node's last change in place on the
    /// canonical graph. The global timeline is not consulted or modified,
    /// so a later whole-graph undo still steps from the unreverted state.
    pub fn undo_node(&mut self, node_id: &str) -> bool {
        match self.nodes.undo(node_id, &mut self.store, self.semantics) {
            Some(action) => {
                self.notify(HistoryEvent::NodeUndone { node_id, action: &action });
                true
            }
            None => false,
        }
    }

    /// Node-scoped redo; mirror of `undo_node`.
    pub fn redo_node(&mut self, node_id: &str) -> bool {
        match self.nodes.redo(node_id, &mut self.store, self.semantics) {
            Some(action) => {
                self.notify(HistoryEvent::NodeRedone { node_id, action: &action });
                true
            }
            None => false,
        }
    }

    fn notify(&mut self, event: HistoryEvent) {
        if let Some(observer) = &mut self.observer {
            observer(&event);
        }
    }

    /// Install the transition observer. The engine itself never logs;
    /// whatever reporting the host wants happens here.
    pub fn set_observer(&mut self, observer: impl FnMut(&HistoryEvent) + 'static) {
        self.observer = Some(Box::new(observer));
    }

    pub fn set_patch_semantics(&mut self, semantics: PatchSemantics) {
        self.semantics = semantics;
    }

    pub fn patch_semantics(&self) -> PatchSemantics { self.semantics }

    pub fn graph(&self) -> &GraphSnapshot { &self.store.graph }
    pub fn global_history(&self) -> &GlobalHistory { &self.global }
    pub fn node_timeline(&self, node_id: &str) -> Option<&NodeTimeline> {
        self.nodes.timeline(node_id)
    }
    pub fn can_undo(&self) -> bool { self.global.can_undo() }
    pub fn can_redo(&self) -> bool { self.global.can_redo() }
    pub fn node_can_undo(&self, node_id: &str) -> bool { self.nodes.can_undo(node_id) }
    pub fn node_can_redo(&self, node_id: &str) -> bool { self.nodes.can_redo(node_id) }
}

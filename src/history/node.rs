use std::collections::{HashMap, VecDeque};

use crate::graph_utils::graph::{GraphStore, Node, NodeId, Point};

/// How present-but-empty patch fields behave when a patch is applied
/// during node-level undo/redo.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PatchSemantics {
    /// A present field always applies, zero and empty string included.
    #[default]
    Exact,
    /// Compatibility mode: a zero font size or empty color string is
    /// treated as absent and skipped.
    SkipEmpty,
}

// Partial node change: only the fields present are touched. `previous`
// counterparts always carry the same field set as their patch.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodePatch {
    pub position: Option<Point>,
    pub color: Option<String>,
    pub font_size: Option<u32>,
}

impl NodePatch {
    pub fn is_empty(&self) -> bool {
        self.position.is_none() && self.color.is_none() && self.font_size.is_none()
    }

    // Merge the present fields into the node. A position applies in both
    // modes; SkipEmpty only affects the color and font size fields.
    pub fn apply(&self, node: &mut Node, semantics: PatchSemantics) {
        if let Some(position) = self.position {
            node.position = position;
        }
        if let Some(color) = &self.color {
            if semantics == PatchSemantics::Exact || !color.is_empty() {
                node.style.color = color.clone();
            }
        }
        if let Some(font_size) = self.font_size {
            if semantics == PatchSemantics::Exact || font_size != 0 {
                node.style.font_size = font_size;
            }
        }
    }

    // Read the node's current values for exactly the fields present in the mask
    pub fn masked_capture(node: &Node, mask: &NodePatch) -> NodePatch {
        NodePatch {
            position: mask.position.map(|_| node.position),
            color: mask.color.as_ref().map(|_| node.style.color.clone()),
            font_size: mask.font_size.map(|_| node.style.font_size),
        }
    }
}

/// Values of the tracked node fields at one instant.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeSnapshot {
    pub position: Point,
    pub color: String,
    pub font_size: u32,
}

impl NodeSnapshot {
    pub fn capture(node: &Node) -> Self {
        NodeSnapshot {
            position: node.position,
            color: node.style.color.clone(),
            font_size: node.style.font_size,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NodeChangeRecord {
    pub node_id: NodeId,
    pub patch: NodePatch,
    pub previous: NodePatch,
    pub action: String,
}

/// One node's change timeline. Never discarded once created, even when
/// both stacks drain.
#[derive(Clone, Debug, Default)]
pub struct NodeTimeline {
    past: Vec<NodeChangeRecord>,
    future: VecDeque<NodeChangeRecord>,
    initial: Option<NodeSnapshot>,
}

impl NodeTimeline {
    fn new(initial: NodeSnapshot) -> Self {
        NodeTimeline {
            past: Vec::new(),
            future: VecDeque::new(),
            initial: Some(initial),
        }
    }

    pub fn past(&self) -> &[NodeChangeRecord] { &self.past }
    pub fn future(&self) -> &VecDeque<NodeChangeRecord> { &self.future }
    pub fn initial(&self) -> Option<&NodeSnapshot> { self.initial.as_ref() }
    pub fn can_undo(&self) -> bool { !self.past.is_empty() }
    pub fn can_redo(&self) -> bool { !self.future.is_empty() }
}

/// Per-node change timelines, keyed by node id and created lazily on
/// first record.
#[derive(Clone, Debug, Default)]
pub struct NodeHistories {
    timelines: HashMap<NodeId, NodeTimeline>,
}

impl NodeHistories {
    pub fn new() -> Self {
        NodeHistories { timelines: HashMap::new() }
    }

    // Idempotent: an existing timeline keeps its original baseline
    pub fn initialize(&mut self, id: &str, initial: NodeSnapshot) {
        self.timelines
            .entry(id.to_string())
            .or_insert_with(|| NodeTimeline::new(initial));
    }

    // Append a change to the node's past and drop its redo branch. A
    // missing timeline is created with the post-change values as baseline.
    pub fn record(
        &mut self,
        id: &str,
        patch: NodePatch,
        previous: NodePatch,
        action: &str,
        current: &NodeSnapshot,
    ) {
        let timeline = self
            .timelines
            .entry(id.to_string())
            .or_insert_with(|| NodeTimeline::new(current.clone()));
        timeline.past.push(NodeChangeRecord {
            node_id: id.to_string(),
            patch,
            previous,
            action: action.to_string(),
        });
        timeline.future.clear();
    }

    /// Revert the node's most recent change in place on the canonical
    /// graph; returns the label of the undone action. A missing timeline,
    /// empty past, or node absent from the graph leaves everything
    /// untouched.
    pub fn undo(
        &mut self,
        id: &str,
        store: &mut GraphStore,
        semantics: PatchSemantics,
    ) -> Option<String> {
        let timeline = self.timelines.get_mut(id)?;
        if timeline.past.is_empty() {
            return None;
        }
        let node = store.node_mut(id)?;
        let record = timeline.past.pop()?;
        // The redo payload keeps the record's patch; its previous side is
        // the node's pre-undo values masked to the same field set
        let undone = NodeChangeRecord {
            node_id: record.node_id.clone(),
            patch: record.patch.clone(),
            previous: NodePatch::masked_capture(node, &record.patch),
            action: record.action.clone(),
        };
        record.previous.apply(node, semantics);
        timeline.future.push_front(undone);
        Some(record.action)
    }

    /// Re-apply the node's most recently undone change; mirror of `undo`.
    pub fn redo(
        &mut self,
        id: &str,
        store: &mut GraphStore,
        semantics: PatchSemantics,
    ) -> Option<String> {
        let timeline = self.timelines.get_mut(id)?;
        if timeline.future.is_empty() {
            return None;
        }
        let node = store.node_mut(id)?;
        let record = timeline.future.pop_front()?;
        let redone = NodeChangeRecord {
            node_id: record.node_id.clone(),
            patch: record.patch.clone(),
            previous: NodePatch::masked_capture(node, &record.patch),
            action: record.action.clone(),
        };
        record.patch.apply(node, semantics);
        timeline.past.push(redone);
        Some(record.action)
    }

    pub fn timeline(&self, id: &str) -> Option<&NodeTimeline> {
        self.timelines.get(id)
    }

    pub fn can_undo(&self, id: &str) -> bool {
        self.timelines.get(id).is_some_and(|t| t.can_undo())
    }

    pub fn can_redo(&self, id: &str) -> bool {
        self.timelines.get(id).is_some_and(|t| t.can_redo())
    }
}

use serde::{Deserialize, Serialize};

// Basic type alias for clarity
pub type NodeId = String;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Point { x, y }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeStyle {
    pub color: String,
    pub font_size: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub position: Point,
    pub label: String,
    pub style: NodeStyle,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: NodeId,
    pub target: NodeId,
    pub kind: String,
    pub animated: bool,
}

// A whole-graph state: ordered nodes and edges, all values owned
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl GraphSnapshot {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

// Style fields to merge into a node; absent fields are left untouched
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StylePatch {
    pub color: Option<String>,
    pub font_size: Option<u32>,
}

impl StylePatch {
    pub fn is_empty(&self) -> bool {
        self.color.is_none() && self.font_size.is_none()
    }
}

// Canonical, currently-displayed graph state
#[derive(Clone, Debug)]
pub struct GraphStore {
    pub graph: GraphSnapshot,
}

impl GraphStore {
    // Instantiate a new, empty store
    pub fn new() -> Self {
        GraphStore { graph: GraphSnapshot::default() }
    }

    pub fn from_snapshot(snapshot: &GraphSnapshot) -> Self {
        GraphStore { graph: snapshot.clone() }
    }

    pub fn move_position(&mut self, id: &str, new_position: Point) -> bool {
        if let Some(node) = self.node_mut(id) {
            node.position = new_position;
            true
        } else {
            false
        }
    }

    // Merge only the fields present in the patch
    pub fn restyle(&mut self, id: &str, patch: &StylePatch) -> bool {
        if let Some(node) = self.node_mut(id) {
            if let Some(color) = &patch.color {
                node.style.color = color.clone();
            }
            if let Some(font_size) = patch.font_size {
                node.style.font_size = font_size;
            }
            true
        } else {
            false
        }
    }

    // Replace the whole graph with an independent copy of the given snapshot
    pub fn replace_snapshot(&mut self, snapshot: &GraphSnapshot) {
        self.graph = snapshot.clone();
    }

    pub fn get_node(&self, id: &str) -> Option<&Node> { self.graph.node(id) }
    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.graph.nodes.iter_mut().find(|n| n.id == id)
    }
    pub fn snapshot(&self) -> GraphSnapshot { self.graph.clone() }
    pub fn node_count(&self) -> usize { self.graph.nodes.len() }
    pub fn edge_count(&self) -> usize { self.graph.edges.len() }
}

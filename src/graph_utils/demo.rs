use super::graph::{Edge, GraphSnapshot, Node, NodeStyle, Point};

pub const DEFAULT_NODE_COUNT: usize = 10;
pub const DEFAULT_NODE_COLOR: &str = "#4d7cfe";
pub const DEFAULT_FONT_SIZE: u32 = 16;

const GRID_SPACING: f32 = 150.0;
const GRID_OFFSET: f32 = 100.0;

// Square-ish grid: ids node-1..node-N, row length ceil(sqrt(N))
fn grid_nodes(count: usize) -> Vec<Node> {
    let per_row = (count as f32).sqrt().ceil() as usize;
    (0..count)
        .map(|i| Node {
            id: format!("node-{}", i + 1),
            position: Point::new(
                (i % per_row) as f32 * GRID_SPACING + GRID_OFFSET,
                (i / per_row) as f32 * GRID_SPACING + GRID_OFFSET,
            ),
            label: format!("Node {}", i + 1),
            style: NodeStyle {
                color: DEFAULT_NODE_COLOR.to_string(),
                font_size: DEFAULT_FONT_SIZE,
            },
        })
        .collect()
}

// Chain every node to the next one and to the one two steps ahead
fn chain_edges(count: usize) -> Vec<Edge> {
    let mut edges = Vec::new();
    for i in 1..=count {
        if i < count {
            edges.push(Edge {
                id: format!("edge-{}-{}", i, i + 1),
                source: format!("node-{}", i),
                target: format!("node-{}", i + 1),
                kind: "smoothstep".to_string(),
                animated: false,
            });
        }
        if i + 1 < count {
            edges.push(Edge {
                id: format!("edge-{}-{}", i, i + 2),
                source: format!("node-{}", i),
                target: format!("node-{}", i + 2),
                kind: "smoothstep".to_string(),
                animated: false,
            });
        }
    }
    edges
}

pub fn demo_flow(count: usize) -> GraphSnapshot {
    GraphSnapshot {
        nodes: grid_nodes(count),
        edges: chain_edges(count),
    }
}

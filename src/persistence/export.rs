use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use time::OffsetDateTime;
use time::macros::format_description;

use crate::graph_utils::graph::GraphSnapshot;

// Timestamped file name inside the export dir, e.g. graph_20250301_142233.json
pub fn export_path_now(dir: &Path, ext: &str) -> PathBuf {
    let now = OffsetDateTime::now_utc();
    let fmt = format_description!("[year][month][day]_[hour][minute][second]");
    let stamp = now.format(fmt).unwrap_or_else(|_| "unknown".to_string());
    dir.join(format!("graph_{}.{}", stamp, ext))
}

pub fn export_graph_json(graph: &GraphSnapshot, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let f = File::create(path)?;
    serde_json::to_writer_pretty(f, graph)?;
    // ensure newline at end
    let mut f2 = fs::OpenOptions::new().append(true).open(path)?;
    let _ = f2.write_all(b"\n");
    Ok(())
}

// Two flat tables derived from the base path: {stem}_nodes.csv and
// {stem}_edges.csv
pub fn export_graph_csv(graph: &GraphSnapshot, base_path: &Path) -> anyhow::Result<(PathBuf, PathBuf)> {
    let parent = base_path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;
    let stem = base_path.file_stem().and_then(|s| s.to_str()).unwrap_or("graph");
    let nodes_path = parent.join(format!("{}_nodes.csv", stem));
    let edges_path = parent.join(format!("{}_edges.csv", stem));
    {
        let mut wtr = csv::Writer::from_path(&nodes_path)?;
        wtr.write_record(["id", "label", "x", "y", "color", "font_size"])?;
        for n in &graph.nodes {
            wtr.write_record(&[
                n.id.clone(),
                n.label.clone(),
                n.position.x.to_string(),
                n.position.y.to_string(),
                n.style.color.clone(),
                n.style.font_size.to_string(),
            ])?;
        }
        wtr.flush()?;
    }
    {
        let mut wtr = csv::Writer::from_path(&edges_path)?;
        wtr.write_record(["id", "source", "target", "kind", "animated"])?;
        for e in &graph.edges {
            wtr.write_record(&[
                e.id.clone(),
                e.source.clone(),
                e.target.clone(),
                e.kind.clone(),
                e.animated.to_string(),
            ])?;
        }
        wtr.flush()?;
    }
    Ok((nodes_path, edges_path))
}

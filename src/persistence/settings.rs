use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};

use crate::history::node::PatchSemantics;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    // If None, use OS temporary directory for exports
    pub export_override: Option<PathBuf>,
    // Persist UI settings between runs
    pub lod_enabled: bool,
    pub lod_label_min_zoom: f32,
    // Render every edge with the animated dashed styling
    #[serde(default)]
    pub animate_edges: bool,
    // Treat zero/empty patch fields as absent during node undo/redo
    #[serde(default)]
    pub skip_empty_patch_fields: bool,
    #[serde(default = "AppSettings::default_demo_node_count")]
    pub demo_node_count: usize,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            export_override: None,
            lod_enabled: true,
            lod_label_min_zoom: 0.7,
            animate_edges: false,
            skip_empty_patch_fields: false,
            demo_node_count: Self::default_demo_node_count(),
        }
    }
}

impl AppSettings {
    fn config_dir() -> PathBuf {
        // Cross-platform user config dir
        #[cfg(target_os = "macos")]
        {
            // ~/Library/Application Support/Graph-Flow
            let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("~"));
            return home.join("Library").join("Application Support").join("Graph-Flow");
        }
        #[cfg(target_os = "windows")]
        {
            // %APPDATA%\Graph-Flow
            if let Ok(appdata) = std::env::var("APPDATA") {
                return PathBuf::from(appdata).join("Graph-Flow");
            }
            return PathBuf::from("Graph-Flow");
        }
        #[cfg(all(unix, not(target_os = "macos")))]
        {
            // $XDG_CONFIG_HOME/Graph-Flow or ~/.config/Graph-Flow
            if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
                return PathBuf::from(xdg).join("Graph-Flow");
            }
            let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("~"));
            return home.join(".config").join("Graph-Flow");
        }
    }

    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_dir().join("settings.ron");
        if !path.exists() {
            return Ok(Self::default());
        }
        let mut f = fs::File::open(path)?;
        let mut s = String::new();
        f.read_to_string(&mut s)?;
        let v: Self = ron::from_str(&s)?;
        Ok(v)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let dir = Self::config_dir();
        fs::create_dir_all(&dir)?;
        let pretty = PrettyConfig::new().separate_tuple_members(true);
        let s = ron::ser::to_string_pretty(self, pretty)?;
        atomic_write(&dir.join("settings.ron"), s.as_bytes())?;
        Ok(())
    }

    /// Return the directory where the settings file (settings.ron) is stored.
    /// This is OS-specific and resolves to a per-user configuration directory.
    pub fn settings_dir() -> PathBuf {
        Self::config_dir()
    }

    /// Default export directory when no override is set: OS temporary directory.
    /// Example: {temp_dir}/Graph-Flow/exports
    pub fn export_default_dir() -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push("Graph-Flow");
        p.push("exports");
        p
    }

    /// Effective export directory honoring user override or falling back to OS temp.
    pub fn export_dir(&self) -> PathBuf {
        if let Some(p) = &self.export_override { return p.clone(); }
        Self::export_default_dir()
    }

    pub fn patch_semantics(&self) -> PatchSemantics {
        if self.skip_empty_patch_fields {
            PatchSemantics::SkipEmpty
        } else {
            PatchSemantics::Exact
        }
    }

    pub(crate) fn default_demo_node_count() -> usize { 10 }
}

fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let tmp_path = path.with_extension("ron.tmp");
    {
        let mut f = fs::File::create(&tmp_path)?;
        f.write_all(data)?;
        f.flush()?;
    }
    fs::rename(tmp_path, path)?;
    Ok(())
}

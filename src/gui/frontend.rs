#![allow(clippy::collapsible_if)]
use std::time::{Duration, Instant};

use eframe::egui::{self, Color32, Pos2, Rect, Sense, Stroke, StrokeKind, Vec2};
use once_cell::sync::Lazy;

use crate::graph_utils::demo;
use crate::graph_utils::graph::{Node, NodeId, Point, StylePatch};
use crate::history::session::EditorSession;
use crate::persistence::export;
use crate::persistence::settings::AppSettings;

// Font sizes offered by the side-panel dropdown
const FONT_SIZES: [u32; 7] = [12, 14, 16, 18, 20, 22, 24];

// Preset swatches for the side-panel color picker, parsed once. The first
// entry is the demo default; the rest are the usual picker palette.
static SWATCHES: Lazy<Vec<(&'static str, Color32)>> = Lazy::new(|| {
    const HEX: &[&str] = &[
        "#4d7cfe", "#d0021b", "#f5a623", "#f8e71c", "#8b572a", "#7ed321",
        "#417505", "#bd10e0", "#9013fe", "#4a90e2", "#50e3c2", "#b8e986",
        "#000000", "#4a4a4a", "#9b9b9b", "#ffffff",
    ];
    HEX.iter()
        .map(|h| (*h, parse_hex_color(h).unwrap_or(Color32::GRAY)))
        .collect()
});

// "#rrggbb" (or bare "rrggbb") to Color32
pub fn parse_hex_color(s: &str) -> Option<Color32> {
    let s = s.trim().trim_start_matches('#');
    if s.len() != 6 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let r = u8::from_str_radix(&s[0..2], 16).ok()?;
    let g = u8::from_str_radix(&s[2..4], 16).ok()?;
    let b = u8::from_str_radix(&s[4..6], 16).ok()?;
    Some(Color32::from_rgb(r, g, b))
}

// Black or white, whichever reads better on the given fill
fn contrast_text_color(fill: Color32) -> Color32 {
    let lum = 0.299 * fill.r() as f32 + 0.587 * fill.g() as f32 + 0.114 * fill.b() as f32;
    if lum > 150.0 { Color32::from_gray(25) } else { Color32::from_gray(235) }
}

// Style for toast notifications
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum NoticeStyle {
    Subtle,
    Prominent,
}

// A node drag in progress. The canonical graph keeps the pre-drag position
// until release, when the session records the move.
struct DragState {
    id: NodeId,
    current: Point,
}

pub struct GraphApp {
    session: EditorSession,
    selected: Option<NodeId>,
    drag: Option<DragState>,
    hover_node: Option<NodeId>,
    pan: Vec2,
    zoom: f32,
    // Remember last canvas rect for resize-stable panning
    last_canvas_rect: Option<Rect>,
    // Transient zoom HUD (show current zoom briefly when scrolling)
    zoom_hud_until: Option<Instant>,
    // Transient info toast
    last_info: Option<String>,
    last_info_time: Option<Instant>,
    last_info_style: NoticeStyle,
    // Sidebar / windows
    sidebar_open: bool,
    show_history_window: bool,
    // Hex entry buffer; tracks which node it was seeded from
    hex_edit: String,
    hex_edit_node: Option<NodeId>,
    // Export modal
    show_export_window: bool,
    export_is_json: bool,
    export_path: String,
    export_status: Option<String>,
    // App settings and Preferences UI state
    app_settings: AppSettings,
    show_prefs_window: bool,
    prefs_edit: AppSettings,
    prefs_export_override_str: String,
    prefs_status: Option<String>,
}

impl GraphApp {
    pub fn new(settings: AppSettings) -> Self {
        let session = Self::fresh_session(&settings);
        Self {
            session,
            selected: None,
            drag: None,
            hover_node: None,
            pan: Vec2::ZERO,
            zoom: 1.0,
            last_canvas_rect: None,
            zoom_hud_until: None,
            last_info: None,
            last_info_time: None,
            last_info_style: NoticeStyle::Prominent,
            sidebar_open: true,
            show_history_window: false,
            hex_edit: String::new(),
            hex_edit_node: None,
            show_export_window: false,
            export_is_json: true,
            export_path: String::new(),
            export_status: None,
            prefs_export_override_str: settings
                .export_override
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            prefs_edit: settings.clone(),
            prefs_status: None,
            show_prefs_window: false,
            app_settings: settings,
        }
    }

    // A session over the demo flow, with the configured patch semantics and
    // a debug-log observer installed
    fn fresh_session(settings: &AppSettings) -> EditorSession {
        let mut session = EditorSession::new(&demo::demo_flow(settings.demo_node_count));
        session.set_patch_semantics(settings.patch_semantics());
        session.set_observer(|event| log::debug!("history transition: {:?}", event));
        session
    }

    fn notice(&mut self, msg: impl Into<String>, style: NoticeStyle) {
        self.last_info = Some(msg.into());
        self.last_info_time = Some(Instant::now());
        self.last_info_style = style;
    }

    pub fn menu_reset_view(&mut self) {
        self.pan = Vec2::ZERO;
        self.zoom = 1.0;
        self.notice("View reset", NoticeStyle::Subtle);
    }

    pub fn menu_new_graph(&mut self) {
        self.session = Self::fresh_session(&self.app_settings);
        self.selected = None;
        self.drag = None;
        self.hex_edit_node = None;
        self.pan = Vec2::ZERO;
        self.zoom = 1.0;
        self.notice("New demo graph loaded", NoticeStyle::Prominent);
    }

    pub fn menu_open_prefs(&mut self) {
        self.prefs_edit = self.app_settings.clone();
        self.prefs_export_override_str = self
            .app_settings
            .export_override
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        self.prefs_status = None;
        self.show_prefs_window = true;
    }

    fn menu_open_export(&mut self) {
        let ext = if self.export_is_json { "json" } else { "csv" };
        self.export_path = export::export_path_now(&self.app_settings.export_dir(), ext)
            .display()
            .to_string();
        self.export_status = None;
        self.show_export_window = true;
    }

    // One-field color change through the session boundary; an unchanged
    // value records nothing
    fn apply_color(&mut self, id: &str, hex: &str) {
        let unchanged = self
            .session
            .graph()
            .node(id)
            .is_some_and(|n| n.style.color == hex);
        if unchanged {
            return;
        }
        let patch = StylePatch { color: Some(hex.to_string()), font_size: None };
        if self.session.on_style_change(id, &patch) {
            // Reseed the hex buffer next frame
            self.hex_edit_node = None;
        }
    }

    fn apply_font_size(&mut self, id: &str, size: u32) {
        let unchanged = self
            .session
            .graph()
            .node(id)
            .is_some_and(|n| n.style.font_size == size);
        if unchanged {
            return;
        }
        let patch = StylePatch { color: None, font_size: Some(size) };
        self.session.on_style_change(id, &patch);
    }

    fn undo_global(&mut self) {
        if self.session.undo() {
            self.notice("Undo", NoticeStyle::Subtle);
        }
    }

    fn redo_global(&mut self) {
        if self.session.redo() {
            self.notice("Redo", NoticeStyle::Subtle);
        }
    }

    fn undo_selected_node(&mut self) {
        if let Some(id) = self.selected.clone() {
            if self.session.undo_node(&id) {
                self.notice(format!("Undo ({})", id), NoticeStyle::Subtle);
                self.hex_edit_node = None;
            }
        }
    }

    fn redo_selected_node(&mut self) {
        if let Some(id) = self.selected.clone() {
            if self.session.redo_node(&id) {
                self.notice(format!("Redo ({})", id), NoticeStyle::Subtle);
                self.hex_edit_node = None;
            }
        }
    }

    // Ctrl/Cmd+Z, Ctrl/Cmd+Shift+Z and Ctrl/Cmd+Y; skipped while a text
    // field has keyboard focus
    fn handle_history_shortcuts(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        let redo_shift = egui::KeyboardShortcut::new(
            egui::Modifiers::COMMAND | egui::Modifiers::SHIFT,
            egui::Key::Z,
        );
        let redo_y = egui::KeyboardShortcut::new(egui::Modifiers::COMMAND, egui::Key::Y);
        let undo = egui::KeyboardShortcut::new(egui::Modifiers::COMMAND, egui::Key::Z);
        // Order matters: the Shift variant must be consumed before plain Z
        if ctx.input_mut(|i| i.consume_shortcut(&redo_shift) || i.consume_shortcut(&redo_y)) {
            self.redo_global();
        } else if ctx.input_mut(|i| i.consume_shortcut(&undo)) {
            self.undo_global();
        }
    }

    // World position to render a node at: the live drag preview wins over
    // the canonical graph
    fn display_position(&self, node: &Node) -> Point {
        match &self.drag {
            Some(d) if d.id == node.id => d.current,
            _ => node.position,
        }
    }

    // Screen-space rounded rect for a node, sized to its label at the
    // node's own font size
    fn node_rect(&self, ui: &egui::Ui, node: &Node, center: Pos2) -> Rect {
        let font = egui::FontId::proportional(node.style.font_size as f32 * self.zoom);
        let galley = ui
            .painter()
            .layout_no_wrap(node.label.clone(), font, Color32::WHITE);
        let pad = Vec2::new(14.0, 10.0) * self.zoom;
        let size = Vec2::new(
            (galley.size().x + pad.x * 2.0).max(60.0 * self.zoom),
            galley.size().y + pad.y * 2.0,
        );
        Rect::from_center_size(center, size)
    }

    fn prefs_window_ui(&mut self, ctx: &egui::Context) {
        let mut open = true;
        let mut save_clicked = false;
        egui::Window::new("Preferences")
            .open(&mut open)
            .resizable(true)
            .collapsible(false)
            .show(ctx, |ui| {
                ui.heading("General");
                ui.separator();
                ui.label("Export directory (leave empty for OS temp):");
                ui.text_edit_singleline(&mut self.prefs_export_override_str);
                if ui.button("Clear to default (OS temp)").clicked() {
                    self.prefs_export_override_str.clear();
                }
                ui.add_space(4.0);
                ui.label("Settings save directory:");
                ui.monospace(AppSettings::settings_dir().display().to_string());

                ui.separator();
                ui.heading("Demo Graph");
                ui.horizontal(|ui| {
                    ui.label("Node count");
                    ui.add(egui::DragValue::new(&mut self.prefs_edit.demo_node_count).range(2..=64));
                });
                ui.small("Applied the next time a demo graph is loaded.");

                ui.separator();
                ui.heading("Rendering");
                ui.checkbox(&mut self.prefs_edit.animate_edges, "Animate all edges");
                ui.checkbox(&mut self.prefs_edit.lod_enabled, "Hide node labels when zoomed out");
                ui.add(
                    egui::Slider::new(&mut self.prefs_edit.lod_label_min_zoom, 0.3..=1.5)
                        .text("Label min zoom"),
                );

                ui.separator();
                ui.heading("History Compatibility");
                ui.checkbox(
                    &mut self.prefs_edit.skip_empty_patch_fields,
                    "Legacy patch mode: skip zero/empty fields on node undo/redo",
                )
                .on_hover_text(
                    "Reproduces the old behavior where restoring a zero font size \
                     or an empty color string was silently dropped.",
                );

                ui.separator();
                ui.horizontal(|ui| {
                    if ui.button("Save").clicked() {
                        save_clicked = true;
                    }
                    if let Some(status) = &self.prefs_status {
                        ui.small(status.clone());
                    }
                });
            });
        if save_clicked {
            let trimmed = self.prefs_export_override_str.trim();
            self.prefs_edit.export_override =
                if trimmed.is_empty() { None } else { Some(trimmed.into()) };
            match self.prefs_edit.save() {
                Ok(()) => {
                    self.app_settings = self.prefs_edit.clone();
                    self.session
                        .set_patch_semantics(self.app_settings.patch_semantics());
                    self.prefs_status = Some("Saved".to_string());
                }
                Err(e) => {
                    self.prefs_status = Some(format!("Save failed: {}", e));
                }
            }
        }
        if !open {
            self.show_prefs_window = false;
        }
    }

    fn export_window_ui(&mut self, ctx: &egui::Context) {
        let mut open = true;
        let mut do_export = false;
        egui::Window::new("Export Snapshot")
            .open(&mut open)
            .resizable(true)
            .collapsible(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    if ui.radio(self.export_is_json, "JSON").clicked() && !self.export_is_json {
                        self.export_is_json = true;
                        self.export_path =
                            export::export_path_now(&self.app_settings.export_dir(), "json")
                                .display()
                                .to_string();
                    }
                    if ui.radio(!self.export_is_json, "CSV").clicked() && self.export_is_json {
                        self.export_is_json = false;
                        self.export_path =
                            export::export_path_now(&self.app_settings.export_dir(), "csv")
                                .display()
                                .to_string();
                    }
                });
                ui.horizontal(|ui| {
                    ui.label("Path");
                    ui.add(egui::TextEdit::singleline(&mut self.export_path).desired_width(320.0));
                });
                if ui.button("Export").clicked() {
                    do_export = true;
                }
                if let Some(status) = &self.export_status {
                    ui.separator();
                    ui.small(status.clone());
                }
            });
        if do_export {
            let path = std::path::PathBuf::from(self.export_path.trim());
            let result = if self.export_is_json {
                export::export_graph_json(self.session.graph(), &path)
                    .map(|_| format!("Wrote {}", path.display()))
            } else {
                export::export_graph_csv(self.session.graph(), &path)
                    .map(|(n, e)| format!("Wrote {} and {}", n.display(), e.display()))
            };
            match result {
                Ok(msg) => {
                    self.export_status = Some(msg.clone());
                    self.notice(msg, NoticeStyle::Prominent);
                }
                Err(e) => {
                    self.export_status = Some(format!("Export failed: {}", e));
                }
            }
        }
        if !open {
            self.show_export_window = false;
        }
    }

    fn history_window_ui(&mut self, ctx: &egui::Context) {
        let mut open = self.show_history_window;
        egui::Window::new("History Inspector")
            .open(&mut open)
            .resizable(true)
            .default_width(280.0)
            .show(ctx, |ui| {
                ui.heading("Global Timeline");
                let global = self.session.global_history();
                egui::ScrollArea::vertical()
                    .id_salt("global_history_scroll")
                    .max_height(180.0)
                    .auto_shrink([false, true])
                    .show(ui, |ui| {
                        for entry in global.past() {
                            ui.monospace(&entry.action);
                        }
                        ui.label(egui::RichText::new("— present —").weak());
                        for entry in global.future() {
                            ui.monospace(
                                egui::RichText::new(&entry.action).color(Color32::DARK_GRAY),
                            );
                        }
                    });
                ui.separator();
                match &self.selected {
                    Some(id) => {
                        ui.heading(format!("Node Timeline: {}", id));
                        match self.session.node_timeline(id) {
                            Some(timeline) => {
                                egui::ScrollArea::vertical()
                                    .id_salt("node_history_scroll")
                                    .max_height(140.0)
                                    .auto_shrink([false, true])
                                    .show(ui, |ui| {
                                        for rec in timeline.past() {
                                            ui.monospace(&rec.action);
                                        }
                                        if !timeline.future().is_empty() {
                                            ui.label(egui::RichText::new("— redo —").weak());
                                            for rec in timeline.future() {
                                                ui.monospace(
                                                    egui::RichText::new(&rec.action)
                                                        .color(Color32::DARK_GRAY),
                                                );
                                            }
                                        }
                                    });
                            }
                            None => {
                                ui.small("No changes recorded for this node yet.");
                            }
                        }
                    }
                    None => {
                        ui.small("Select a node to inspect its timeline.");
                    }
                }
            });
        self.show_history_window = open;
    }

    fn side_panel_ui(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("customization_panel")
            .resizable(true)
            .default_width(240.0)
            .show(ctx, |ui| {
                ui.heading("Node Customization");
                ui.separator();
                let selected = self
                    .selected
                    .as_ref()
                    .and_then(|id| self.session.graph().node(id))
                    .cloned();
                match selected {
                    Some(node) => {
                        ui.horizontal(|ui| {
                            ui.label("Selected:");
                            ui.strong(&node.label);
                        });
                        ui.add_space(4.0);

                        // Reseed the hex buffer when the selection or the
                        // node's color changed behind it
                        if self.hex_edit_node.as_deref() != Some(node.id.as_str()) {
                            self.hex_edit = node.style.color.clone();
                            self.hex_edit_node = Some(node.id.clone());
                        }

                        ui.label("Node Color:");
                        let mut picked: Option<&'static str> = None;
                        ui.horizontal_wrapped(|ui| {
                            for (hex, color) in SWATCHES.iter() {
                                let swatch = egui::Button::new("")
                                    .fill(*color)
                                    .min_size(Vec2::splat(22.0));
                                if ui.add(swatch).on_hover_text(*hex).clicked() {
                                    picked = Some(*hex);
                                }
                            }
                        });
                        if let Some(hex) = picked {
                            self.apply_color(&node.id, hex);
                        }
                        ui.horizontal(|ui| {
                            ui.add(
                                egui::TextEdit::singleline(&mut self.hex_edit)
                                    .desired_width(80.0)
                                    .hint_text("#rrggbb"),
                            );
                            if ui.button("Apply").clicked() {
                                let entered = self.hex_edit.trim().to_lowercase();
                                let entered = if entered.starts_with('#') {
                                    entered
                                } else {
                                    format!("#{}", entered)
                                };
                                if parse_hex_color(&entered).is_some() {
                                    self.apply_color(&node.id, &entered);
                                } else {
                                    self.notice("Invalid hex color", NoticeStyle::Prominent);
                                }
                            }
                        });

                        ui.add_space(6.0);
                        ui.horizontal(|ui| {
                            ui.label("Font Size:");
                            let mut size = node.style.font_size;
                            egui::ComboBox::from_id_salt("font_size_select")
                                .selected_text(format!("{}px", size))
                                .show_ui(ui, |ui| {
                                    for s in FONT_SIZES {
                                        ui.selectable_value(&mut size, s, format!("{}px", s));
                                    }
                                });
                            if size != node.style.font_size {
                                self.apply_font_size(&node.id, size);
                            }
                        });

                        ui.separator();
                        ui.label("Node History");
                        ui.horizontal(|ui| {
                            let can_undo = self.session.node_can_undo(&node.id);
                            let can_redo = self.session.node_can_redo(&node.id);
                            if ui.add_enabled(can_undo, egui::Button::new("Undo")).clicked() {
                                self.undo_selected_node();
                            }
                            if ui.add_enabled(can_redo, egui::Button::new("Redo")).clicked() {
                                self.redo_selected_node();
                            }
                        });
                    }
                    None => {
                        ui.label("Select a node to customize its appearance.");
                    }
                }

                ui.separator();
                ui.label("Global History");
                ui.horizontal(|ui| {
                    let can_undo = self.session.can_undo();
                    let can_redo = self.session.can_redo();
                    if ui.add_enabled(can_undo, egui::Button::new("Undo")).clicked() {
                        self.undo_global();
                    }
                    if ui.add_enabled(can_redo, egui::Button::new("Redo")).clicked() {
                        self.redo_global();
                    }
                });
                let global = self.session.global_history();
                ui.small(format!(
                    "{} recorded, {} redoable",
                    global.past().len(),
                    global.future().len()
                ));
                if ui.small_button("Open history inspector").clicked() {
                    self.show_history_window = true;
                }
            });
    }

    fn canvas_ui(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            // Keep the view stable across canvas resizes
            let prev_rect = self.last_canvas_rect;
            let available = ui.available_rect_before_wrap();
            if let Some(prev) = prev_rect {
                if prev != available {
                    let dc = available.center() - prev.center();
                    self.pan += dc * (self.zoom - 1.0);
                }
            }
            self.last_canvas_rect = Some(available);

            // Background gets whatever pointer interaction the nodes leave over
            let bg_resp = ui.allocate_rect(available, Sense::click_and_drag());

            // World to screen space
            let center = available.center();
            let zoom = self.zoom;
            let pan = self.pan;
            let to_screen = move |p: Point| -> Pos2 {
                Pos2::new(
                    (p.x - center.x) * zoom + center.x + pan.x,
                    (p.y - center.y) * zoom + center.y + pan.y,
                )
            };

            // Zoom with scroll only when the pointer is over the canvas
            if bg_resp.hovered() {
                let scroll = ui.input(|i| i.raw_scroll_delta.y);
                if scroll != 0.0 {
                    let factor = (1.0 + scroll * 0.001).clamp(0.9, 1.1);
                    self.zoom = (self.zoom * factor).clamp(0.25, 2.5);
                    self.zoom_hud_until = Some(Instant::now() + Duration::from_millis(1000));
                    ui.ctx().request_repaint_after(Duration::from_millis(16));
                }
            }

            let painter = ui.painter_at(available);

            // Transient zoom HUD
            if let Some(until) = self.zoom_hud_until {
                if Instant::now() < until {
                    let text = format!("{:.2}x", self.zoom);
                    let font = egui::FontId::proportional(14.0);
                    let galley = ui.painter().layout_no_wrap(text, font, Color32::WHITE);
                    let pad = Vec2::new(8.0, 4.0);
                    let size = galley.size() + pad * 2.0;
                    let pos = Pos2::new(available.center().x - size.x * 0.5, available.top() + 12.0);
                    painter.rect_filled(
                        Rect::from_min_size(pos, size),
                        8.0,
                        Color32::from_rgba_premultiplied(20, 20, 20, 200),
                    );
                    painter.galley(pos + pad, galley, Color32::WHITE);
                    ui.ctx().request_repaint_after(Duration::from_millis(16));
                } else {
                    self.zoom_hud_until = None;
                }
            }

            let graph = self.session.graph().clone();

            // Node rects in screen space, for edge anchoring and hit testing
            let node_rects: Vec<(NodeId, Rect)> = graph
                .nodes
                .iter()
                .map(|node| {
                    let pos = to_screen(self.display_position(node));
                    (node.id.clone(), self.node_rect(ui, node, pos))
                })
                .collect();
            let rect_of = |id: &str| -> Option<Rect> {
                node_rects.iter().find(|(nid, _)| nid == id).map(|(_, r)| *r)
            };

            // Hover: topmost node whose rect contains the pointer
            self.hover_node = ui.ctx().pointer_hover_pos().and_then(|mouse| {
                node_rects
                    .iter()
                    .rev()
                    .find(|(_, r)| r.contains(mouse))
                    .map(|(id, _)| id.clone())
            });

            // Edges first so nodes draw over them
            let edge_alpha: u8 = if self.zoom < 0.7 { 120 } else { 200 };
            let time = ui.input(|i| i.time);
            let mut any_animated = false;
            for edge in &graph.edges {
                let (Some(ra), Some(rb)) = (rect_of(&edge.source), rect_of(&edge.target)) else {
                    continue;
                };
                let a = ra.center();
                let b = rb.center();
                let incident_hover = self
                    .hover_node
                    .as_ref()
                    .is_some_and(|h| *h == edge.source || *h == edge.target);
                let color = if incident_hover {
                    Color32::from_rgb(120, 220, 255)
                } else {
                    Color32::from_rgba_premultiplied(160, 160, 160, edge_alpha)
                };
                let stroke = Stroke::new(if incident_hover { 2.5 } else { 1.5 }, color);

                // Step routing for the demo's smoothstep edges, a straight
                // segment otherwise
                let points: Vec<Pos2> = if edge.kind == "smoothstep" {
                    let mid_x = (a.x + b.x) * 0.5;
                    vec![a, Pos2::new(mid_x, a.y), Pos2::new(mid_x, b.y), b]
                } else {
                    vec![a, b]
                };
                let animated = edge.animated || self.app_settings.animate_edges;
                if animated {
                    any_animated = true;
                    let dash = 6.0 * self.zoom;
                    let gap = 4.0 * self.zoom;
                    let offset = ((time * 24.0) % (dash + gap) as f64) as f32;
                    for pair in points.windows(2) {
                        painter.extend(egui::Shape::dashed_line_with_offset(
                            pair,
                            stroke,
                            &[dash],
                            &[gap],
                            offset,
                        ));
                    }
                } else {
                    for pair in points.windows(2) {
                        painter.line_segment([pair[0], pair[1]], stroke);
                    }
                }
            }
            if any_animated {
                ui.ctx().request_repaint_after(Duration::from_millis(33));
            }

            // Draw and interact with nodes
            let mut clicked_node: Option<NodeId> = None;
            let mut any_node_dragged = false;
            for node in &graph.nodes {
                let Some(rect) = rect_of(&node.id) else { continue };
                let resp = ui.allocate_rect(rect, Sense::click_and_drag());

                if resp.drag_started() {
                    self.drag = Some(DragState {
                        id: node.id.clone(),
                        current: self.display_position(node),
                    });
                }
                if resp.dragged() {
                    if let Some(drag) = &mut self.drag {
                        if drag.id == node.id {
                            let d = resp.drag_delta() / self.zoom;
                            drag.current = Point::new(drag.current.x + d.x, drag.current.y + d.y);
                            any_node_dragged = true;
                        }
                    }
                }
                if resp.drag_stopped() {
                    if let Some(drag) = self.drag.take() {
                        if drag.id == node.id {
                            // Only now does the move become history
                            self.session.on_drag_end(&drag.id, drag.current);
                        } else {
                            self.drag = Some(drag);
                        }
                    }
                }
                if resp.clicked() {
                    clicked_node = Some(node.id.clone());
                }

                let fill = parse_hex_color(&node.style.color).unwrap_or(Color32::GRAY);
                let is_selected = self.selected.as_deref() == Some(node.id.as_str());
                let is_hovered = self.hover_node.as_deref() == Some(node.id.as_str());
                let stroke = if is_selected {
                    Stroke::new(2.5, Color32::WHITE)
                } else if is_hovered {
                    Stroke::new(2.0, Color32::from_rgb(120, 220, 255))
                } else {
                    Stroke::new(1.0, Color32::from_gray(70))
                };
                let rounding = 6.0 * self.zoom;
                painter.rect_filled(rect, rounding, fill);
                painter.rect_stroke(rect, rounding, stroke, StrokeKind::Outside);

                let show_label = !self.app_settings.lod_enabled
                    || self.zoom >= self.app_settings.lod_label_min_zoom
                    || is_hovered
                    || is_selected;
                if show_label {
                    painter.text(
                        rect.center(),
                        egui::Align2::CENTER_CENTER,
                        &node.label,
                        egui::FontId::proportional(node.style.font_size as f32 * self.zoom),
                        contrast_text_color(fill),
                    );
                }
            }

            if let Some(id) = clicked_node {
                self.selected = Some(id);
            } else if bg_resp.clicked() {
                self.selected = None;
            }

            // Background panning when no node took the drag
            if !any_node_dragged && bg_resp.dragged() {
                self.pan += bg_resp.drag_delta();
            }
        });
    }

    fn toast_ui(&mut self, ctx: &egui::Context) {
        // Bottom-right transient info toast (visible for 3 seconds)
        if let (Some(msg), Some(when)) = (&self.last_info, self.last_info_time) {
            if Instant::now().duration_since(when) <= Duration::from_secs(3) {
                let margin = egui::vec2(12.0, 12.0);
                egui::Area::new("bottom_right_toast".into())
                    .anchor(egui::Align2::RIGHT_BOTTOM, egui::vec2(-margin.x, -margin.y))
                    .interactable(false)
                    .show(ctx, |ui| {
                        let (fill, stroke_col, stroke_w, text_col, inner_margin) =
                            match self.last_info_style {
                                NoticeStyle::Subtle => (
                                    Color32::from_rgba_premultiplied(20, 20, 20, 170),
                                    Color32::from_gray(60),
                                    0.5,
                                    Color32::from_gray(200),
                                    egui::Margin::symmetric(8, 6),
                                ),
                                NoticeStyle::Prominent => (
                                    Color32::from_rgba_premultiplied(30, 30, 30, 230),
                                    Color32::from_gray(100),
                                    1.5,
                                    Color32::LIGHT_GREEN,
                                    egui::Margin::symmetric(12, 8),
                                ),
                            };
                        egui::Frame::popup(ui.style())
                            .corner_radius(egui::CornerRadius::same(8))
                            .stroke(Stroke { width: stroke_w, color: stroke_col })
                            .fill(fill)
                            .inner_margin(inner_margin)
                            .show(ui, |ui| match self.last_info_style {
                                NoticeStyle::Subtle => {
                                    ui.small(egui::RichText::new(msg).color(text_col));
                                }
                                NoticeStyle::Prominent => {
                                    ui.colored_label(text_col, msg);
                                }
                            });
                    });
            }
        }
    }
}

impl eframe::App for GraphApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_history_shortcuts(ctx);

        if self.show_prefs_window {
            self.prefs_window_ui(ctx);
        }
        if self.show_export_window {
            self.export_window_ui(ctx);
        }
        if self.show_history_window {
            self.history_window_ui(ctx);
        }

        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            if ctx.input_mut(|i| {
                i.consume_shortcut(&egui::KeyboardShortcut::new(
                    egui::Modifiers::COMMAND,
                    egui::Key::N,
                ))
            }) {
                self.menu_new_graph();
            }
            ui.horizontal(|ui| {
                ui.label("Graph-Flow");
                ui.menu_button("File", |ui| {
                    if ui.button("Export Snapshot…").clicked() {
                        self.menu_open_export();
                        ui.close();
                    }
                    ui.separator();
                    if ui
                        .add(egui::Button::new("Quit").shortcut_text(ctx.format_shortcut(
                            &egui::KeyboardShortcut::new(egui::Modifiers::COMMAND, egui::Key::Q),
                        )))
                        .clicked()
                    {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });
                ui.menu_button("Edit", |ui| {
                    let undo_btn = egui::Button::new("Undo").shortcut_text(ctx.format_shortcut(
                        &egui::KeyboardShortcut::new(egui::Modifiers::COMMAND, egui::Key::Z),
                    ));
                    if ui.add_enabled(self.session.can_undo(), undo_btn).clicked() {
                        self.undo_global();
                        ui.close();
                    }
                    let redo_btn = egui::Button::new("Redo").shortcut_text(ctx.format_shortcut(
                        &egui::KeyboardShortcut::new(
                            egui::Modifiers::COMMAND | egui::Modifiers::SHIFT,
                            egui::Key::Z,
                        ),
                    ));
                    if ui.add_enabled(self.session.can_redo(), redo_btn).clicked() {
                        self.redo_global();
                        ui.close();
                    }
                });
                ui.menu_button("Graph", |ui| {
                    if ui
                        .add(egui::Button::new("New Demo Graph").shortcut_text(
                            ctx.format_shortcut(&egui::KeyboardShortcut::new(
                                egui::Modifiers::COMMAND,
                                egui::Key::N,
                            )),
                        ))
                        .clicked()
                    {
                        self.menu_new_graph();
                        ui.close();
                    }
                });
                ui.menu_button("View", |ui| {
                    if ui.button("Reset View").clicked() {
                        self.menu_reset_view();
                        ui.close();
                    }
                    ui.checkbox(&mut self.sidebar_open, "Customization panel");
                    if ui.button("History Inspector").clicked() {
                        self.show_history_window = true;
                        ui.close();
                    }
                });
                ui.menu_button("Settings", |ui| {
                    if ui.button("Preferences…").clicked() {
                        self.menu_open_prefs();
                        ui.close();
                    }
                });

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.small(format!(
                        "{} nodes · {} edges",
                        self.session.graph().nodes.len(),
                        self.session.graph().edges.len()
                    ));
                });
            });
        });

        if self.sidebar_open {
            self.side_panel_ui(ctx);
        }
        self.canvas_ui(ctx);
        self.toast_ui(ctx);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if let Err(e) = self.app_settings.save() {
            eprintln!("[Graph-Flow] failed to persist settings: {}", e);
        }
    }
}

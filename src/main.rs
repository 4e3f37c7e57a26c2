use graph_flow::gui::frontend::GraphApp;
use graph_flow::persistence::settings::AppSettings;

use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();
    let settings = AppSettings::load().unwrap_or_else(|e| {
        eprintln!("[Graph-Flow] failed to load settings, using defaults: {}", e);
        AppSettings::default()
    });
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 720.0])
            // Provide sensible bounds so the UI stays usable on small screens
            .with_min_inner_size([700.0, 420.0])
            .with_resizable(true),
        ..Default::default()
    };
    eframe::run_native(
        "Graph-Flow",
        options,
        Box::new(move |_cc| Ok(Box::new(GraphApp::new(settings)) as Box<dyn eframe::App>)),
    )
}

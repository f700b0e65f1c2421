mod app;
mod color;
mod config;
mod data;
mod state;
mod ui;

use app::DashboardApp;
use config::DashboardConfig;
use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 860.0])
            .with_min_inner_size([720.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "극지식물 최적 EC 농도 연구",
        options,
        Box::new(|cc| {
            ui::fonts::install_hangul_font(&cc.egui_ctx);
            Ok(Box::new(DashboardApp::new(DashboardConfig::default())))
        }),
    )
}

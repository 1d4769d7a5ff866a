mod app;
mod color;
mod data;
mod error;
mod heatmap;
mod state;
mod ui;

use app::SnowlinesApp;
use data::archive::{ArchiveClient, ARCHIVE_RECORD_URL};
use data::loader::DEFAULT_TABLE_URL;
use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    // Published datasets, overridable for local/offline use
    // (e.g. the output of the generate_sample binary).
    let table_source =
        std::env::var("SNOWLINES_TABLE").unwrap_or_else(|_| DEFAULT_TABLE_URL.to_string());
    let archive_base =
        std::env::var("SNOWLINES_ARCHIVE").unwrap_or_else(|_| ARCHIVE_RECORD_URL.to_string());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([700.0, 450.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Alaska Snowlines",
        options,
        Box::new(move |_cc| {
            // Construction only fails on TLS backend misconfiguration.
            let archive = ArchiveClient::new(&archive_base).expect("HTTP client");
            Ok(Box::new(SnowlinesApp::new(&table_source, archive)))
        }),
    )
}

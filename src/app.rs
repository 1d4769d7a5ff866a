use eframe::egui;

use crate::data::archive::ArchiveClient;
use crate::state::{AppState, View};
use crate::ui::{map, panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct SnowlinesApp {
    pub state: AppState,
}

impl SnowlinesApp {
    /// Load the glacier table (blocking, once per session) and wire up the
    /// archive client.
    pub fn new(table_source: &str, archive: ArchiveClient) -> Self {
        Self {
            state: AppState::new(table_source, archive),
        }
    }
}

impl eframe::App for SnowlinesApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: view switch + status ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: selection + plot options ----
        egui::SidePanel::left("selection_panel")
            .default_width(260.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: map or heatmaps ----
        egui::CentralPanel::default().show(ctx, |ui| match self.state.view {
            View::Map => map::map_view(ui, &mut self.state),
            View::Plots => plot::plots_view(ui, &mut self.state),
        });
    }
}

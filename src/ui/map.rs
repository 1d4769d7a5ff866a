use eframe::egui::{Color32, Ui};
use egui_plot::{Line, Plot, PlotPoints, Points};

use crate::data::lookup;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Map view – glacier centroids and the selected outline
// ---------------------------------------------------------------------------

/// Render the centroid map. Clicking selects the glacier nearest to the
/// click point (same flat-degree distance as the coordinate query).
pub fn map_view(ui: &mut Ui, state: &mut AppState) {
    let Some(table) = &state.table else {
        ui.centered_and_justified(|ui: &mut Ui| {
            let msg = state
                .table_error
                .as_deref()
                .unwrap_or("Glacier table is not loaded.");
            ui.heading(format!("Failed to load glacier outlines: {msg}"));
        });
        return;
    };

    let centroids: Vec<[f64; 2]> = table
        .records()
        .iter()
        .map(|r| [r.cenlon, r.cenlat])
        .collect();

    let selected_centroid: Option<[f64; 2]> = state
        .selected
        .and_then(|i| table.get(i))
        .map(|r| [r.cenlon, r.cenlat]);

    let selected_outline: Option<Vec<[f64; 2]>> = state
        .selected
        .and_then(|i| table.get(i))
        .and_then(|r| r.geometry.clone());

    let mut clicked: Option<(f64, f64)> = None;

    Plot::new("glacier_map")
        .x_axis_label("Longitude")
        .y_axis_label("Latitude")
        .data_aspect(2.0)
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            plot_ui.points(
                Points::new(centroids)
                    .radius(2.0)
                    .color(Color32::LIGHT_BLUE)
                    .name("Glaciers"),
            );

            if let Some(ring) = &selected_outline {
                let points: PlotPoints = ring.iter().copied().collect();
                plot_ui.line(
                    Line::new(points)
                        .color(Color32::DARK_BLUE)
                        .width(1.5)
                        .name("Outline"),
                );
            }

            if let Some(c) = selected_centroid {
                plot_ui.points(
                    Points::new(vec![c])
                        .radius(5.0)
                        .color(Color32::RED)
                        .name("Selected"),
                );
            }

            if plot_ui.response().clicked() {
                clicked = plot_ui.pointer_coordinate().map(|p| (p.x, p.y));
            }
        });

    if let Some((lon, lat)) = clicked {
        let nearest = state
            .table
            .as_ref()
            .map(|t| lookup::nearest(t, lat, lon))
            .and_then(|hits| hits.first().copied());
        if let Some(index) = nearest {
            state.handle_select(index);
        }
    }
}

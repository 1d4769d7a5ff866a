use eframe::egui::{self, Color32, Key, RichText, ScrollArea, Ui};
use egui_extras::DatePickerButton;

use crate::data::archive::BinMode;
use crate::state::{AppState, View};

// ---------------------------------------------------------------------------
// Left side panel – glacier selection and plot options
// ---------------------------------------------------------------------------

/// Render the left panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Glacier selection");
    ui.separator();

    // ---- Free-text search ----
    ui.label("Glacier name or RGI number:");
    let search = ui.text_edit_singleline(&mut state.search_input);
    let submitted = search.lost_focus() && ui.input(|i| i.key_pressed(Key::Enter));
    if ui.small_button("Search").clicked() || submitted {
        state.handle_search();
    }

    ui.add_space(4.0);

    // ---- Coordinate query ----
    ui.label("Coordinates (lat,lon):");
    let coords = ui.text_edit_singleline(&mut state.coordinate_input);
    let submitted = coords.lost_focus() && ui.input(|i| i.key_pressed(Key::Enter));
    if ui.small_button("Find nearest").clicked() || submitted {
        state.handle_coordinate_query();
    }

    // ---- Disambiguation list ----
    if !state.candidates.is_empty() {
        ui.separator();
        ui.strong("Select glacier:");
        candidate_list(ui, state);
    }

    ui.separator();
    selected_details(ui, state);

    ui.separator();
    plot_options(ui, state);

    ui.separator();
    downloads(ui, state);
}

fn candidate_list(ui: &mut Ui, state: &mut AppState) {
    let labels: Vec<(usize, String)> = {
        let Some(table) = &state.table else { return };
        state
            .candidates
            .iter()
            .filter_map(|&i| table.get(i).map(|r| (i, r.label())))
            .collect()
    };

    ScrollArea::vertical()
        .id_salt("candidates")
        .max_height(180.0)
        .show(ui, |ui: &mut Ui| {
            for (index, label) in labels {
                let is_selected = state.selected == Some(index);
                if ui.selectable_label(is_selected, label).clicked() {
                    state.handle_select(index);
                }
            }
        });
}

fn selected_details(ui: &mut Ui, state: &AppState) {
    let Some(record) = state.selected_record() else {
        ui.label("No glacier selected.");
        return;
    };

    ui.strong(record.label());
    egui::Grid::new("record_details").num_columns(2).show(ui, |ui: &mut Ui| {
        ui.label("RGI number:");
        ui.label(record.number().to_string());
        ui.end_row();

        ui.label("Center:");
        ui.label(format!("{:.4}, {:.4}", record.cenlat, record.cenlon));
        ui.end_row();

        ui.label("Area:");
        ui.label(format!("{:.1} km²", record.area_km2));
        ui.end_row();

        if let (Some(zmin), Some(zmax)) = (record.zmin_m, record.zmax_m) {
            ui.label("Elevation:");
            ui.label(format!("{zmin} – {zmax} m"));
            ui.end_row();
        }
    });
}

fn plot_options(ui: &mut Ui, state: &mut AppState) {
    ui.strong("Plot options");

    // ---- Date range ----
    let mut start = state.date_start;
    let mut end = state.date_end;
    ui.horizontal(|ui: &mut Ui| {
        ui.label("From");
        ui.add(DatePickerButton::new(&mut start).id_salt("date_start"));
    });
    ui.horizontal(|ui: &mut Ui| {
        ui.label("To");
        ui.add(DatePickerButton::new(&mut end).id_salt("date_end"));
    });
    start = start.clamp(AppState::date_min(), AppState::date_max());
    end = end.clamp(AppState::date_min(), AppState::date_max());
    state.handle_date_range(start, end);

    // ---- Variant switches ----
    let mut variant = state.variant;
    ui.checkbox(&mut variant.eos_corrected, "End-of-summer correction");

    egui::ComboBox::from_label("Bins")
        .selected_text(match variant.bin_mode {
            BinMode::Elevation => "Elevation",
            BinMode::EqualArea => "Equal area",
        })
        .show_ui(ui, |ui: &mut Ui| {
            ui.selectable_value(&mut variant.bin_mode, BinMode::Elevation, "Elevation");
            ui.selectable_value(&mut variant.bin_mode, BinMode::EqualArea, "Equal area");
        });
    state.handle_variant_change(variant);
}

fn downloads(ui: &mut Ui, state: &mut AppState) {
    ui.strong("Downloads");
    let enabled = state.selected.is_some();

    if ui
        .add_enabled(enabled, egui::Button::new("Download raw data files"))
        .clicked()
    {
        let result = state.raw_download();
        save_bytes(state, result);
    }

    if ui
        .add_enabled(enabled, egui::Button::new("Download animation"))
        .clicked()
    {
        let result = state.animation_download();
        save_bytes(state, result);
    }
}

/// Ask for a destination and write the fetched archive bytes to disk.
fn save_bytes(
    state: &mut AppState,
    fetched: crate::error::Result<(String, std::sync::Arc<Vec<u8>>)>,
) {
    let (name, bytes) = match fetched {
        Ok(ok) => ok,
        Err(e) => {
            state.report_error(&e);
            return;
        }
    };

    let Some(path) = rfd::FileDialog::new()
        .set_title("Save archive")
        .set_file_name(&name)
        .save_file()
    else {
        return;
    };

    match std::fs::write(&path, bytes.as_slice()) {
        Ok(()) => {
            log::info!("saved {} bytes to {}", bytes.len(), path.display());
            state.status_message = Some(format!("Saved {}", path.display()));
        }
        Err(e) => {
            log::error!("failed to save {}: {e}", path.display());
            state.status_message = Some(format!("Error: could not save file: {e}"));
        }
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / status bar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.strong("Alaska Snowlines");
        ui.separator();

        if ui
            .selectable_label(state.view == View::Map, "Map")
            .clicked()
        {
            state.handle_view_change(View::Map);
        }
        if ui
            .selectable_label(state.view == View::Plots, "Plots")
            .clicked()
        {
            state.handle_view_change(View::Plots);
        }

        ui.separator();

        if let Some(table) = &state.table {
            ui.label(format!("{} glaciers loaded", table.len()));
        } else {
            ui.label(RichText::new("Glacier table unavailable").color(Color32::RED));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

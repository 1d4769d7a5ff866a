use chrono::{Datelike, NaiveDate};
use eframe::egui::{self, Color32, ColorImage, RichText, ScrollArea, TextureHandle, TextureOptions, Ui};
use egui_plot::{Legend, Line, LineStyle, Plot, PlotImage, PlotPoint, PlotPoints};

use crate::color::ColorRamp;
use crate::data::archive::BinMode;
use crate::data::model::TimeSeriesBundle;
use crate::heatmap::{self, HeatmapGrid, GRID_STEP_DAYS};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Heatmap view (central panel)
// ---------------------------------------------------------------------------

/// One tile's pre-rendered heatmap plus its overlay curves.
pub struct TilePlot {
    title: String,
    y_label: &'static str,
    texture: TextureHandle,
    x0: f64,
    x1: f64,
    ymin: f64,
    ymax: f64,
    vmin: f64,
    vmax: f64,
    melt: Vec<[f64; 2]>,
    snowline: Vec<[f64; 2]>,
}

/// Textures and curves built for one plot revision. Rebuilt whenever the
/// selection, variant or date range changes.
pub struct PlotCache {
    pub revision: u64,
    tiles: Vec<TilePlot>,
    errors: Vec<String>,
    colorbar: TextureHandle,
}

/// Render the per-tile heatmaps for the selected glacier.
pub fn plots_view(ui: &mut Ui, state: &mut AppState) {
    let Some(bundle) = state.bundle.clone() else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("No glacier selected. Pick one on the map or search by name.");
        });
        return;
    };

    let stale = state
        .plot_cache
        .as_ref()
        .map(|c| c.revision != state.plot_revision)
        .unwrap_or(true);
    if stale {
        let cache = build_cache(ui.ctx(), state, &bundle);
        state.plot_cache = Some(cache);
    }

    let Some(cache) = &state.plot_cache else {
        return;
    };

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for err in &cache.errors {
                ui.label(RichText::new(err).color(Color32::RED));
            }

            for (i, tile) in cache.tiles.iter().enumerate() {
                ui.heading(&tile.title);
                colorbar_row(ui, cache, tile);
                tile_plot(ui, i, tile);
                ui.add_space(12.0);
            }
        });
}

fn colorbar_row(ui: &mut Ui, cache: &PlotCache, tile: &TilePlot) {
    ui.horizontal(|ui: &mut Ui| {
        ui.label(format!("{:.1}", tile.vmin));
        ui.add(
            egui::Image::from_texture(&cache.colorbar)
                .fit_to_exact_size(egui::vec2(180.0, 14.0)),
        );
        ui.label(format!("{:.1}", tile.vmax));
        ui.label("Backscatter [dB]");
    });
}

fn tile_plot(ui: &mut Ui, index: usize, tile: &TilePlot) {
    Plot::new(("heatmap", index))
        .legend(Legend::default())
        .y_axis_label(tile.y_label)
        .x_axis_formatter(|mark, _range| format_day(mark.value))
        .height(280.0)
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(false)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            let center = PlotPoint::new(
                (tile.x0 + tile.x1) / 2.0,
                (tile.ymin + tile.ymax) / 2.0,
            );
            let size = egui::vec2(
                (tile.x1 - tile.x0) as f32,
                (tile.ymax - tile.ymin) as f32,
            );
            plot_ui.image(PlotImage::new(&tile.texture, center, size));

            let melt: PlotPoints = tile.melt.iter().copied().collect();
            plot_ui.line(
                Line::new(melt)
                    .name("Melt extent")
                    .color(Color32::BLACK)
                    .width(1.0),
            );

            let snowline: PlotPoints = tile.snowline.iter().copied().collect();
            plot_ui.line(
                Line::new(snowline)
                    .name("Snowline")
                    .color(Color32::BLACK)
                    .style(LineStyle::dashed_loose())
                    .width(1.0),
            );
        });
}

// ---------------------------------------------------------------------------
// Cache construction
// ---------------------------------------------------------------------------

fn build_cache(ctx: &egui::Context, state: &AppState, bundle: &TimeSeriesBundle) -> PlotCache {
    let ramp = ColorRamp::rd_yl_bu();
    let mode = state.variant.bin_mode;

    let glacier_label = state
        .selected_record()
        .map(|r| {
            if r.glac_name.is_empty() {
                bundle.number.to_string()
            } else {
                r.glac_name.clone()
            }
        })
        .unwrap_or_else(|| bundle.number.to_string());

    let y_label = match mode {
        BinMode::Elevation => "Elevation [m a.s.l.]",
        BinMode::EqualArea => "Cumulative area [km²]",
    };
    // Melt extent and snowline are areas (m²) in equal-area mode.
    let overlay_scale = match mode {
        BinMode::Elevation => 1.0,
        BinMode::EqualArea => 1e-6,
    };

    let mut tiles = Vec::new();
    let mut errors = Vec::new();

    for tile in &bundle.tiles {
        let grid = match heatmap::build_grid(tile, mode, state.date_start, state.date_end) {
            Ok(grid) => grid,
            Err(e) => {
                errors.push(format!("{} (pathrow: {}): {e}", glacier_label, tile.path_row));
                continue;
            }
        };

        let texture = grid_texture(ctx, &grid, &ramp, &tile.path_row);

        let mut x1 = day(*grid.dates.last().unwrap_or(&state.date_end));
        let x0 = day(grid.dates[0]);
        if x1 <= x0 {
            x1 = x0 + GRID_STEP_DAYS as f64;
        }

        let curve = |series: &crate::data::model::DateSeries| -> Vec<[f64; 2]> {
            series
                .in_range(state.date_start, state.date_end)
                .into_iter()
                .map(|(d, v)| [day(d), v * overlay_scale])
                .collect()
        };

        tiles.push(TilePlot {
            title: format!("{glacier_label} (pathrow: {})", tile.path_row),
            y_label,
            texture,
            x0,
            x1,
            ymin: grid.ymin,
            ymax: grid.ymax,
            vmin: grid.vmin,
            vmax: grid.vmax,
            melt: curve(&tile.melt_extent),
            snowline: curve(&tile.snowline),
        });
    }

    let colorbar = colorbar_texture(ctx, &ramp);

    PlotCache {
        revision: state.plot_revision,
        tiles,
        errors,
        colorbar,
    }
}

/// Rasterize the grid: one pixel per cell, NaN cells transparent,
/// lowest elevation bin at the bottom.
fn grid_texture(
    ctx: &egui::Context,
    grid: &HeatmapGrid,
    ramp: &ColorRamp,
    path_row: &str,
) -> TextureHandle {
    let (w, h) = (grid.cols(), grid.rows());
    let mut image = ColorImage::new([w, h], Color32::TRANSPARENT);

    for (bin, row) in grid.values.iter().enumerate() {
        let pixel_row = h - 1 - bin;
        for (col, &v) in row.iter().enumerate() {
            if v.is_finite() {
                image.pixels[pixel_row * w + col] = ramp.sample(grid.normalized(v));
            }
        }
    }

    ctx.load_texture(
        format!("heatmap_{path_row}"),
        image,
        TextureOptions::NEAREST,
    )
}

fn colorbar_texture(ctx: &egui::Context, ramp: &ColorRamp) -> TextureHandle {
    let gradient = ramp.gradient(256);
    let image = ColorImage {
        size: [gradient.len(), 1],
        pixels: gradient,
    };
    ctx.load_texture("colorbar", image, TextureOptions::LINEAR)
}

/// Plot x axis: days since the common era, so dates stay linear.
fn day(d: NaiveDate) -> f64 {
    d.num_days_from_ce() as f64
}

fn format_day(value: f64) -> String {
    NaiveDate::from_num_days_from_ce_opt(value.round() as i32)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

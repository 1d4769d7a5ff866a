//! Heatmap grid construction.
//!
//! Pure logic shared by the plot view: resample the backscatter matrix
//! onto a regular 12-day time grid, derive the y extent from the
//! hypsometry bins and clip the color scale to robust percentiles.

use chrono::{Duration as ChronoDuration, NaiveDate};

use crate::data::archive::BinMode;
use crate::data::model::TileSeries;
use crate::error::{Result, SnowlineError};

/// Regular time-grid step in days.
pub const GRID_STEP_DAYS: i64 = 12;

/// Color-scale clipping percentiles (resists outliers).
pub const CLIP_LOWER_PERCENTILE: f64 = 2.0;
pub const CLIP_UPPER_PERCENTILE: f64 = 98.0;

/// Relative tolerance when checking that elevation bins are evenly spaced.
const SPACING_TOLERANCE: f64 = 1e-6;

/// A resampled backscatter matrix ready for rendering.
#[derive(Debug, Clone)]
pub struct HeatmapGrid {
    /// Regular 12-day time grid (columns).
    pub dates: Vec<NaiveDate>,
    /// Cell values, row-major `[bin][date]`; NaN marks unobserved dates.
    pub values: Vec<Vec<f64>>,
    /// Color-scale bounds after percentile clipping.
    pub vmin: f64,
    pub vmax: f64,
    /// Vertical extent: elevation (m a.s.l.) or cumulative area (km²).
    pub ymin: f64,
    pub ymax: f64,
}

impl HeatmapGrid {
    pub fn rows(&self) -> usize {
        self.values.len()
    }

    pub fn cols(&self) -> usize {
        self.dates.len()
    }

    /// Normalize a cell value into `[0, 1]` for color mapping.
    pub fn normalized(&self, value: f64) -> f64 {
        if self.vmax <= self.vmin {
            return 0.5;
        }
        ((value - self.vmin) / (self.vmax - self.vmin)).clamp(0.0, 1.0)
    }
}

/// Build the heatmap grid for one tile over `[start, end)`.
///
/// In elevation mode the bins must be evenly spaced; the grid fails loudly
/// otherwise. In equal-area mode the y axis is cumulative glacier area and
/// no spacing requirement applies.
pub fn build_grid(
    tile: &TileSeries,
    mode: BinMode,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<HeatmapGrid> {
    // Columns observed within the selected range.
    let observed: Vec<(NaiveDate, usize)> = tile
        .backscatter
        .dates
        .iter()
        .enumerate()
        .filter(|(_, d)| **d >= start && **d < end)
        .map(|(i, d)| (*d, i))
        .collect();

    if observed.is_empty() {
        return Err(SnowlineError::EmptyRange);
    }

    let (ymin, ymax) = y_extent(tile, mode)?;

    let first = observed.first().map(|(d, _)| *d).unwrap_or(start);
    let last = observed.last().map(|(d, _)| *d).unwrap_or(first);
    let dates = regular_grid(first, last);

    let n_bins = tile.backscatter.values.len();
    let mut values = vec![vec![f64::NAN; dates.len()]; n_bins];

    for (col, grid_date) in dates.iter().enumerate() {
        // Nearest observation within half the grid step; otherwise the
        // column stays missing.
        let nearest = observed
            .iter()
            .map(|(d, i)| (((*d - *grid_date).num_days()).abs(), *i))
            .min_by_key(|(gap, _)| *gap);

        if let Some((gap, src)) = nearest {
            if gap <= GRID_STEP_DAYS / 2 {
                for (bin, row) in values.iter_mut().enumerate() {
                    row[col] = tile.backscatter.values[bin][src];
                }
            }
        }
    }

    // Percentile clipping over the observed (range-filtered) cells.
    let mut finite: Vec<f64> = observed
        .iter()
        .flat_map(|(_, i)| tile.backscatter.values.iter().map(move |row| row[*i]))
        .filter(|v| v.is_finite())
        .collect();
    finite.sort_by(|a, b| a.total_cmp(b));

    let (vmin, vmax) = if finite.is_empty() {
        (0.0, 1.0)
    } else {
        (
            percentile(&finite, CLIP_LOWER_PERCENTILE),
            percentile(&finite, CLIP_UPPER_PERCENTILE),
        )
    };

    Ok(HeatmapGrid {
        dates,
        values,
        vmin,
        vmax,
        ymin,
        ymax,
    })
}

fn regular_grid(first: NaiveDate, last: NaiveDate) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut d = first;
    while d <= last {
        dates.push(d);
        d += ChronoDuration::days(GRID_STEP_DAYS);
    }
    dates
}

fn y_extent(tile: &TileSeries, mode: BinMode) -> Result<(f64, f64)> {
    let centers = &tile.hypsometry.bin_centers;
    match mode {
        BinMode::Elevation => {
            if centers.len() < 2 {
                return Err(SnowlineError::IrregularBins);
            }
            let step = centers[1] - centers[0];
            for pair in centers.windows(2) {
                let d = pair[1] - pair[0];
                if (d - step).abs() > SPACING_TOLERANCE * step.abs().max(1.0) {
                    return Err(SnowlineError::IrregularBins);
                }
            }
            let half = step / 2.0;
            Ok((centers[0] - half, centers[centers.len() - 1] + half))
        }
        BinMode::EqualArea => Ok((0.0, tile.hypsometry.total_area_km2())),
    }
}

/// Linear-interpolated percentile over pre-sorted finite values.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

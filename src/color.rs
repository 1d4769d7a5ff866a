use eframe::egui::Color32;
use palette::{LinSrgb, Mix, Srgb};

// ---------------------------------------------------------------------------
// RdYlBu color ramp for the backscatter heatmap
// ---------------------------------------------------------------------------

/// ColorBrewer RdYlBu control points, low value (red) to high (blue),
/// matching the diverging scale the plots use.
const RD_YL_BU: &[[u8; 3]] = &[
    [165, 0, 38],
    [215, 48, 39],
    [244, 109, 67],
    [253, 174, 97],
    [254, 224, 144],
    [255, 255, 191],
    [224, 243, 248],
    [171, 217, 233],
    [116, 173, 209],
    [69, 117, 180],
    [49, 54, 149],
];

/// Continuous color ramp interpolated between fixed control points.
#[derive(Debug, Clone)]
pub struct ColorRamp {
    stops: Vec<LinSrgb>,
}

impl ColorRamp {
    /// The diverging red-yellow-blue ramp used for backscatter.
    pub fn rd_yl_bu() -> Self {
        let stops = RD_YL_BU
            .iter()
            .map(|&[r, g, b]| Srgb::new(r, g, b).into_format::<f32>().into_linear())
            .collect();
        ColorRamp { stops }
    }

    /// Sample the ramp at `t` in `[0, 1]` (clamped).
    pub fn sample(&self, t: f64) -> Color32 {
        let t = t.clamp(0.0, 1.0) as f32;
        let scaled = t * (self.stops.len() - 1) as f32;
        let lo = scaled.floor() as usize;
        let hi = (lo + 1).min(self.stops.len() - 1);
        let frac = scaled - lo as f32;

        let mixed: Srgb = Srgb::from_linear(self.stops[lo].mix(self.stops[hi], frac));
        Color32::from_rgb(
            (mixed.red * 255.0) as u8,
            (mixed.green * 255.0) as u8,
            (mixed.blue * 255.0) as u8,
        )
    }

    /// Evenly spaced samples for drawing a colorbar legend.
    pub fn gradient(&self, n: usize) -> Vec<Color32> {
        if n < 2 {
            return vec![self.sample(0.0)];
        }
        (0..n)
            .map(|i| self.sample(i as f64 / (n - 1) as f64))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_hit_the_outer_stops() {
        let ramp = ColorRamp::rd_yl_bu();
        let low = ramp.sample(0.0);
        let high = ramp.sample(1.0);

        // Red end vs blue end.
        assert!(low.r() > low.b());
        assert!(high.b() > high.r());
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let ramp = ColorRamp::rd_yl_bu();
        assert_eq!(ramp.sample(-1.0), ramp.sample(0.0));
        assert_eq!(ramp.sample(2.0), ramp.sample(1.0));
    }

    #[test]
    fn gradient_spans_the_ramp() {
        let ramp = ColorRamp::rd_yl_bu();
        let g = ramp.gradient(16);
        assert_eq!(g.len(), 16);
        assert_eq!(g[0], ramp.sample(0.0));
        assert_eq!(g[15], ramp.sample(1.0));
    }
}

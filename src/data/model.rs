use std::fmt;

use chrono::NaiveDate;

// ---------------------------------------------------------------------------
// GlacierRecord – one row of the glacier inventory
// ---------------------------------------------------------------------------

/// Records with a name carrying this marker are ablation-area derivatives
/// of another outline and are dropped from all user-facing views.
pub const ABLATION_MARKER: &str = "_abl";

/// Glaciers at or below this area (km²) are excluded from the table.
pub const MIN_AREA_KM2: f64 = 2.0;

/// A single glacier outline from the RGI inventory.
#[derive(Debug, Clone)]
pub struct GlacierRecord {
    /// Unique, region-prefixed identifier (e.g. `RGI2000-v7.0-G-01-00013`).
    pub rgi_id: String,
    /// Human-readable name; may be empty and is not unique.
    pub glac_name: String,
    /// Centroid latitude, degrees.
    pub cenlat: f64,
    /// Centroid longitude, degrees.
    pub cenlon: f64,
    /// Outline area, km².
    pub area_km2: f64,
    /// Minimum elevation, m a.s.l.
    pub zmin_m: Option<i32>,
    /// Maximum elevation, m a.s.l.
    pub zmax_m: Option<i32>,
    /// Outline ring as (lon, lat) pairs; only used for map rendering.
    pub geometry: Option<Vec<[f64; 2]>>,
}

impl GlacierRecord {
    /// Canonical glacier number for archive lookups.
    pub fn number(&self) -> GlacierNumber {
        GlacierNumber::from_rgi_id(&self.rgi_id)
    }

    /// Short label for selection lists: `rgi_id – name`.
    pub fn label(&self) -> String {
        if self.glac_name.is_empty() {
            self.rgi_id.clone()
        } else {
            format!("{} – {}", self.rgi_id, self.glac_name)
        }
    }
}

// ---------------------------------------------------------------------------
// GlacierNumber – archive key derived from the RGI id
// ---------------------------------------------------------------------------

/// Two-digit region prefix plus the last five characters of the RGI id,
/// e.g. `01.00013`. This is the key the remote archive is indexed by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GlacierNumber(String);

impl GlacierNumber {
    pub fn from_rgi_id(rgi_id: &str) -> Self {
        let suffix = if rgi_id.len() >= 5 {
            &rgi_id[rgi_id.len() - 5..]
        } else {
            rgi_id
        };
        GlacierNumber(format!("01.{suffix}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GlacierNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// GlacierTable – the loaded inventory
// ---------------------------------------------------------------------------

/// Ordered collection of glacier records, loaded once per session.
/// The retention filter (area and ablation marker) is applied on
/// construction, so every record in the table is user-facing.
#[derive(Debug, Clone, Default)]
pub struct GlacierTable {
    records: Vec<GlacierRecord>,
}

impl GlacierTable {
    /// Build a table, dropping small glaciers and ablation derivatives.
    pub fn from_records(records: Vec<GlacierRecord>) -> Self {
        let records = records
            .into_iter()
            .filter(|r| r.area_km2 > MIN_AREA_KM2)
            .filter(|r| !r.glac_name.to_lowercase().contains(ABLATION_MARKER))
            .collect();
        GlacierTable { records }
    }

    pub fn records(&self) -> &[GlacierRecord] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&GlacierRecord> {
        self.records.get(index)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Mean centroid of all records, as (lat, lon). Used to centre the map.
    pub fn mean_center(&self) -> Option<(f64, f64)> {
        if self.records.is_empty() {
            return None;
        }
        let n = self.records.len() as f64;
        let lat = self.records.iter().map(|r| r.cenlat).sum::<f64>() / n;
        let lon = self.records.iter().map(|r| r.cenlon).sum::<f64>() / n;
        Some((lat, lon))
    }
}

// ---------------------------------------------------------------------------
// Time series – one archive bundle per glacier
// ---------------------------------------------------------------------------

/// A dated scalar series (snowline elevation or melt extent).
#[derive(Debug, Clone, Default)]
pub struct DateSeries {
    pub dates: Vec<NaiveDate>,
    pub values: Vec<f64>,
}

impl DateSeries {
    /// Points within `[start, end)` as (date, value) pairs.
    pub fn in_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<(NaiveDate, f64)> {
        self.dates
            .iter()
            .zip(self.values.iter())
            .filter(|(d, _)| **d >= start && **d < end)
            .map(|(d, v)| (*d, *v))
            .collect()
    }
}

/// Mean backscatter per elevation bin over time.
/// `values[bin][date]` aligns rows with the hypsometry bin axis.
#[derive(Debug, Clone, Default)]
pub struct BinnedSeries {
    pub dates: Vec<NaiveDate>,
    pub values: Vec<Vec<f64>>,
}

/// Area distribution over elevation bins; defines the bin-center axis
/// shared by the other series of the same tile.
#[derive(Debug, Clone, Default)]
pub struct Hypsometry {
    /// Bin centers, m a.s.l.
    pub bin_centers: Vec<f64>,
    /// Area per bin, m².
    pub bin_area_m2: Vec<f64>,
}

impl Hypsometry {
    /// Total area in km².
    pub fn total_area_km2(&self) -> f64 {
        self.bin_area_m2.iter().sum::<f64>() / 1e6
    }
}

/// The four series observed from one satellite path/row tile.
#[derive(Debug, Clone)]
pub struct TileSeries {
    /// Satellite imaging tile identifier, e.g. `p062r018`.
    pub path_row: String,
    pub snowline: DateSeries,
    pub melt_extent: DateSeries,
    pub backscatter: BinnedSeries,
    pub hypsometry: Hypsometry,
}

/// Everything the archive holds for one glacier: one [`TileSeries`] per
/// tile the glacier intersects. Held only in an in-memory TTL cache.
#[derive(Debug, Clone)]
pub struct TimeSeriesBundle {
    pub number: GlacierNumber,
    pub tiles: Vec<TileSeries>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(rgi_id: &str, name: &str, area: f64) -> GlacierRecord {
        GlacierRecord {
            rgi_id: rgi_id.to_string(),
            glac_name: name.to_string(),
            cenlat: 63.0,
            cenlon: -145.0,
            area_km2: area,
            zmin_m: None,
            zmax_m: None,
            geometry: None,
        }
    }

    #[test]
    fn number_is_prefix_plus_last_five_digits() {
        let n = GlacierNumber::from_rgi_id("RGI2000-v7.0-G-01-00013");
        assert_eq!(n.as_str(), "01.00013");
        assert_eq!(n.to_string(), "01.00013");
    }

    #[test]
    fn number_derivation_is_deterministic() {
        let a = GlacierNumber::from_rgi_id("RGI2000-v7.0-G-01-12345");
        let b = GlacierNumber::from_rgi_id("RGI2000-v7.0-G-01-12345");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "01.12345");
    }

    #[test]
    fn table_drops_small_and_ablation_records() {
        let table = GlacierTable::from_records(vec![
            record("RGI-01-00001", "Gulkana Glacier", 18.0),
            record("RGI-01-00002", "Tiny Glacier", 1.5),
            record("RGI-01-00003", "Exactly Two", 2.0),
            record("RGI-01-00004", "Gulkana_abl", 12.0),
            record("RGI-01-00005", "Kennicott_ABL", 30.0),
        ]);

        assert_eq!(table.len(), 1);
        for r in table.records() {
            assert!(r.area_km2 > MIN_AREA_KM2);
            assert!(!r.glac_name.to_lowercase().contains(ABLATION_MARKER));
        }
    }

    #[test]
    fn table_preserves_input_order() {
        let table = GlacierTable::from_records(vec![
            record("RGI-01-00003", "C", 5.0),
            record("RGI-01-00001", "A", 5.0),
            record("RGI-01-00002", "B", 5.0),
        ]);
        let names: Vec<&str> = table.records().iter().map(|r| r.glac_name.as_str()).collect();
        assert_eq!(names, vec!["C", "A", "B"]);
    }

    #[test]
    fn label_falls_back_to_id_for_unnamed_records() {
        let named = record("RGI-01-00001", "Gulkana Glacier", 18.0);
        assert_eq!(named.label(), "RGI-01-00001 – Gulkana Glacier");

        let unnamed = record("RGI-01-00002", "", 18.0);
        assert_eq!(unnamed.label(), "RGI-01-00002");
    }
}

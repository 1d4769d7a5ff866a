//! Remote archive access.
//!
//! The published archive is a set of outer zip files, each holding inner
//! per-glacier zips keyed by glacier number, plus a JSON directory mapping
//! `"<number>.zip"` to the outer file name. Inside an inner zip, four CSV
//! families exist per satellite path/row tile, located by name pattern:
//!
//! ```text
//!   <stem>_snowline_elev_percentile_<pathrow>.csv           (anchor)
//!   <stem>_melt_extent_elev_percentile_<pathrow>.csv
//!   <stem>_db_bin_mean_<pathrow>.csv
//!   <stem>_hypsometry_<pathrow>.csv
//! ```
//!
//! An `eos_corr` infix selects the end-of-season corrected snowline and
//! melt-extent variants; an `eabin` suffix selects equal-area binning.

use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;

use crate::data::cache::TtlCache;
use crate::data::model::{
    BinnedSeries, DateSeries, GlacierNumber, Hypsometry, TileSeries, TimeSeriesBundle,
};
use crate::error::{Result, SnowlineError};

/// Zenodo record holding the time-series archive and its directory.
pub const ARCHIVE_RECORD_URL: &str = "https://zenodo.org/records/16961713/files";

/// Directory mapping glacier numbers to outer archive file names.
pub const DIRECTORY_FILE: &str = "rgi_data_links.json";

/// Animation archives are sharded over records by the first letter of the
/// glacier name.
const ANIMATION_RECORDS: &[(char, char, &str)] = &[
    ('A', 'C', "https://zenodo.org/records/17054496/files"),
    ('D', 'I', "https://zenodo.org/records/17054526/files"),
    ('J', 'N', "https://zenodo.org/records/17054660/files"),
    ('O', 'S', "https://zenodo.org/records/17054835/files"),
    ('T', 'Z', "https://zenodo.org/records/17054907/files"),
];

const DIRECTORY_TTL: Duration = Duration::from_secs(24 * 3600);
const BUNDLE_TTL: Duration = Duration::from_secs(24 * 3600);
const RAW_TTL: Duration = Duration::from_secs(300);

const ANCHOR: &str = "snowline_elev_percentile";

// ---------------------------------------------------------------------------
// Variants
// ---------------------------------------------------------------------------

/// Elevation binning (regular bins, y axis in m a.s.l.) or equal-area
/// binning (`eabin` entries, y axis in cumulative km²).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BinMode {
    #[default]
    Elevation,
    EqualArea,
}

/// Which archive entries a fetch resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SeriesVariant {
    /// Use the end-of-season corrected snowline / melt-extent series.
    pub eos_corrected: bool,
    pub bin_mode: BinMode,
}

// ---------------------------------------------------------------------------
// Name-pattern matching
// ---------------------------------------------------------------------------

/// Whether an inner-zip entry anchors a series family for the given bin mode.
fn is_anchor(name: &str, mode: BinMode) -> bool {
    name.contains(ANCHOR)
        && !name.contains("eos_corr")
        && match mode {
            BinMode::Elevation => !name.contains("eabin"),
            BinMode::EqualArea => name.contains("eabin"),
        }
}

/// Path/row tile id encoded in an anchor name.
fn path_row_of(anchor: &str) -> String {
    let suffix = anchor
        .rsplit(&format!("_{ANCHOR}_"))
        .next()
        .unwrap_or(anchor);
    suffix
        .strip_suffix("_eabin.csv")
        .or_else(|| suffix.strip_suffix(".csv"))
        .unwrap_or(suffix)
        .to_string()
}

struct FamilyNames {
    snowline: String,
    melt_extent: String,
    backscatter: String,
    hypsometry: String,
}

/// Derive the three sibling entry names from an anchor by substring
/// replacement, honoring the eos-corrected variant.
fn family_names(anchor: &str, variant: SeriesVariant) -> FamilyNames {
    let (snowline, melt_extent) = if variant.eos_corrected {
        (
            anchor.replace("percentile", "percentile_eos_corr"),
            anchor.replace(ANCHOR, "melt_extent_elev_percentile_eos_corr"),
        )
    } else {
        (anchor.to_string(), anchor.replace("snowline", "melt_extent"))
    };
    FamilyNames {
        snowline,
        melt_extent,
        backscatter: anchor.replace(ANCHOR, "db_bin_mean"),
        hypsometry: anchor.replace(ANCHOR, "hypsometry"),
    }
}

/// Map a glacier display name to the stem the animation archive uses.
fn animation_stem(glac_name: &str) -> String {
    glac_name
        .replace(" Glacier", "")
        .replace("_abl", "")
        .trim()
        .replace('/', "-")
}

fn animation_url(stem: &str) -> Result<String> {
    let first = stem
        .chars()
        .next()
        .map(|c| c.to_ascii_uppercase())
        .ok_or_else(|| SnowlineError::NoAnimation(stem.to_string()))?;

    for (lo, hi, record) in ANIMATION_RECORDS {
        if first >= *lo && first <= *hi {
            return Ok(format!("{record}/{stem}.zip?download=1"));
        }
    }
    Err(SnowlineError::NoAnimation(stem.to_string()))
}

// ---------------------------------------------------------------------------
// ArchiveClient
// ---------------------------------------------------------------------------

/// Synchronous client for the remote archive with TTL memoization.
///
/// Constructed once and passed by reference; all cached state lives here
/// rather than in implicit globals. Fetches are blocking with a single
/// 60 s client timeout and no retry.
pub struct ArchiveClient {
    base_url: String,
    client: reqwest::blocking::Client,
    directory: TtlCache<(), Arc<HashMap<String, String>>>,
    bundles: TtlCache<(GlacierNumber, SeriesVariant), Arc<TimeSeriesBundle>>,
    raw: TtlCache<GlacierNumber, Arc<Vec<u8>>>,
    animations: TtlCache<String, Arc<Vec<u8>>>,
}

impl ArchiveClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(ArchiveClient {
            base_url: base_url.into(),
            client,
            directory: TtlCache::new(DIRECTORY_TTL),
            bundles: TtlCache::new(BUNDLE_TTL),
            raw: TtlCache::new(RAW_TTL),
            animations: TtlCache::new(BUNDLE_TTL),
        })
    }

    fn download(&self, url: &str) -> Result<Vec<u8>> {
        log::info!("downloading {url}");
        let response = self.client.get(url).send()?.error_for_status()?;
        Ok(response.bytes()?.to_vec())
    }

    /// The process-wide archive directory, fetched at most once per TTL.
    fn directory(&mut self) -> Result<Arc<HashMap<String, String>>> {
        if let Some(dir) = self.directory.get(&()) {
            return Ok(dir);
        }
        let bytes = self.download(&format!("{}/{}?download=1", self.base_url, DIRECTORY_FILE))?;
        let mapping: HashMap<String, String> = serde_json::from_slice(&bytes)
            .map_err(|e| SnowlineError::Parse(format!("archive directory: {e}")))?;

        let dir = Arc::new(mapping);
        self.directory.insert((), dir.clone());
        Ok(dir)
    }

    /// Outer archive file name for a glacier number.
    ///
    /// A number absent from the directory is a lookup-miss; no request for
    /// the outer container is made in that case.
    fn entry_name(&mut self, number: &GlacierNumber) -> Result<String> {
        self.directory()?
            .get(&format!("{number}.zip"))
            .cloned()
            .ok_or_else(|| SnowlineError::NoData(number.clone()))
    }

    /// Fetch and parse the full time-series bundle for a glacier.
    pub fn fetch_bundle(
        &mut self,
        number: &GlacierNumber,
        variant: SeriesVariant,
    ) -> Result<Arc<TimeSeriesBundle>> {
        let key = (number.clone(), variant);
        if let Some(bundle) = self.bundles.get(&key) {
            return Ok(bundle);
        }

        let entry = self.entry_name(number)?;
        let outer = self.download(&format!("{}/{}?download=1", self.base_url, entry))?;
        let bundle = Arc::new(parse_bundle(&outer, number, variant)?);

        log::info!(
            "fetched bundle for {number}: {} tile(s)",
            bundle.tiles.len()
        );
        self.bundles.insert(key, bundle.clone());
        Ok(bundle)
    }

    /// Raw bytes of the inner per-glacier zip, for the download button.
    pub fn fetch_raw(&mut self, number: &GlacierNumber) -> Result<Arc<Vec<u8>>> {
        if let Some(bytes) = self.raw.get(number) {
            return Ok(bytes);
        }

        let entry = self.entry_name(number)?;
        let outer = self.download(&format!("{}/{}?download=1", self.base_url, entry))?;
        let bytes = Arc::new(extract_inner_zip(&outer, number)?);

        self.raw.insert(number.clone(), bytes.clone());
        Ok(bytes)
    }

    /// Full animation zip for a named glacier, from the sharded records.
    pub fn fetch_animation(&mut self, glac_name: &str) -> Result<Arc<Vec<u8>>> {
        let stem = animation_stem(glac_name);
        if let Some(bytes) = self.animations.get(&stem) {
            return Ok(bytes);
        }

        let url = animation_url(&stem)?;
        let bytes = Arc::new(self.download(&url)?);
        self.animations.insert(stem, bytes.clone());
        Ok(bytes)
    }

    #[cfg(test)]
    fn seed_directory(&mut self, mapping: HashMap<String, String>) {
        self.directory.insert((), Arc::new(mapping));
    }
}

impl Default for ArchiveClient {
    fn default() -> Self {
        // Client construction only fails on TLS backend misconfiguration.
        ArchiveClient::new(ARCHIVE_RECORD_URL).expect("HTTP client")
    }
}

// ---------------------------------------------------------------------------
// Container parsing
// ---------------------------------------------------------------------------

fn extract_inner_zip(outer: &[u8], number: &GlacierNumber) -> Result<Vec<u8>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(outer))?;
    let inner_name = format!("{number}.zip");

    let mut inner = Vec::new();
    let result = match archive.by_name(&inner_name) {
        Ok(mut file) => {
            file.read_to_end(&mut inner)
                .map_err(SnowlineError::from)?;
            Ok(inner)
        }
        Err(zip::result::ZipError::FileNotFound) => Err(SnowlineError::NoData(number.clone())),
        Err(e) => Err(e.into()),
    };
    result
}

/// Parse an outer archive container into a bundle for one glacier.
fn parse_bundle(
    outer: &[u8],
    number: &GlacierNumber,
    variant: SeriesVariant,
) -> Result<TimeSeriesBundle> {
    let inner = extract_inner_zip(outer, number)?;
    let mut archive = zip::ZipArchive::new(Cursor::new(&inner))?;

    let names: Vec<String> = (0..archive.len())
        .filter_map(|i| archive.by_index(i).ok().map(|f| f.name().to_string()))
        .collect();

    let mut tiles = Vec::new();
    for anchor in names.iter().filter(|n| is_anchor(n, variant.bin_mode)) {
        let family = family_names(anchor, variant);

        let snowline = parse_date_series(&read_entry(&mut archive, &family.snowline)?)?;
        let melt_extent = parse_date_series(&read_entry(&mut archive, &family.melt_extent)?)?;
        let backscatter = parse_binned_series(&read_entry(&mut archive, &family.backscatter)?)?;
        let hypsometry = parse_hypsometry(&read_entry(&mut archive, &family.hypsometry)?)?;

        tiles.push(TileSeries {
            path_row: path_row_of(anchor),
            snowline,
            melt_extent,
            backscatter,
            hypsometry,
        });
    }

    if tiles.is_empty() {
        return Err(SnowlineError::NoData(number.clone()));
    }
    tiles.sort_by(|a, b| a.path_row.cmp(&b.path_row));

    Ok(TimeSeriesBundle {
        number: number.clone(),
        tiles,
    })
}

fn read_entry(
    archive: &mut zip::ZipArchive<Cursor<&Vec<u8>>>,
    name: &str,
) -> Result<String> {
    let mut text = String::new();
    archive
        .by_name(name)
        .map_err(|_| SnowlineError::Parse(format!("archive entry '{name}' is missing")))?
        .read_to_string(&mut text)?;
    Ok(text)
}

// ---------------------------------------------------------------------------
// Series CSV parsing
// ---------------------------------------------------------------------------

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| SnowlineError::Parse(format!("'{s}' is not a YYYY-MM-DD date")))
}

fn parse_value(s: &str) -> f64 {
    s.trim().parse().unwrap_or(f64::NAN)
}

/// `date,value` rows with a header line; the index column holds dates.
fn parse_date_series(text: &str) -> Result<DateSeries> {
    let mut reader = csv::Reader::from_reader(text.as_bytes());
    let mut series = DateSeries::default();

    for row in reader.records() {
        let row = row.map_err(|e| SnowlineError::Parse(e.to_string()))?;
        let date = row
            .get(0)
            .ok_or_else(|| SnowlineError::Parse("empty series row".into()))?;
        series.dates.push(parse_date(date)?);
        series.values.push(parse_value(row.get(1).unwrap_or("")));
    }
    Ok(series)
}

/// `bin_center,area` rows with a header line.
fn parse_hypsometry(text: &str) -> Result<Hypsometry> {
    let mut reader = csv::Reader::from_reader(text.as_bytes());
    let mut hyps = Hypsometry::default();

    for row in reader.records() {
        let row = row.map_err(|e| SnowlineError::Parse(e.to_string()))?;
        hyps.bin_centers.push(parse_value(row.get(0).unwrap_or("")));
        hyps.bin_area_m2.push(parse_value(row.get(1).unwrap_or("")));
    }
    Ok(hyps)
}

/// Matrix CSV: header row carries dates, the index column bin centers,
/// cells the mean backscatter. Missing cells become NaN.
fn parse_binned_series(text: &str) -> Result<BinnedSeries> {
    let mut reader = csv::Reader::from_reader(text.as_bytes());
    let mut series = BinnedSeries::default();

    series.dates = reader
        .headers()
        .map_err(|e| SnowlineError::Parse(e.to_string()))?
        .iter()
        .skip(1)
        .map(parse_date)
        .collect::<Result<Vec<_>>>()?;

    for row in reader.records() {
        let row = row.map_err(|e| SnowlineError::Parse(e.to_string()))?;
        let values: Vec<f64> = row.iter().skip(1).map(parse_value).collect();
        if values.len() != series.dates.len() {
            return Err(SnowlineError::Parse(format!(
                "backscatter row has {} cells, expected {}",
                values.len(),
                series.dates.len()
            )));
        }
        series.values.push(values);
    }
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    const NUMBER: &str = "01.00013";

    fn number() -> GlacierNumber {
        GlacierNumber::from_rgi_id("RGI2000-v7.0-G-01-00013")
    }

    /// Build an inner zip with one full family per path/row plus the
    /// eos-corrected and eabin variants for the first tile.
    fn inner_zip() -> Vec<u8> {
        let entries: &[(&str, &str)] = &[
            (
                "ak_snowline_elev_percentile_p062r018.csv",
                "date,elev\n2021-06-01,1500.0\n2021-06-13,1550.0\n",
            ),
            (
                "ak_melt_extent_elev_percentile_p062r018.csv",
                "date,extent\n2021-06-01,1.0e6\n2021-06-13,2.0e6\n",
            ),
            (
                "ak_db_bin_mean_p062r018.csv",
                "bin,2021-06-01,2021-06-13\n1450,-12.0,-11.0\n1550,-10.0,\n",
            ),
            (
                "ak_hypsometry_p062r018.csv",
                "bin,area\n1450,1.0e6\n1550,2.0e6\n",
            ),
            (
                "ak_snowline_elev_percentile_eos_corr_p062r018.csv",
                "date,elev\n2021-06-01,1480.0\n",
            ),
            (
                "ak_melt_extent_elev_percentile_eos_corr_p062r018.csv",
                "date,extent\n2021-06-01,0.9e6\n",
            ),
            (
                "ak_snowline_elev_percentile_p063r018_eabin.csv",
                "date,elev\n2021-06-01,1400.0\n",
            ),
            (
                "ak_melt_extent_elev_percentile_p063r018_eabin.csv",
                "date,extent\n2021-06-01,1.5e6\n",
            ),
            (
                "ak_db_bin_mean_p063r018_eabin.csv",
                "bin,2021-06-01\n1450,-9.0\n",
            ),
            (
                "ak_hypsometry_p063r018_eabin.csv",
                "bin,area\n1450,3.0e6\n",
            ),
        ];

        let mut bytes = Vec::new();
        let mut writer = zip::ZipWriter::new(Cursor::new(&mut bytes));
        for (name, content) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
        bytes
    }

    fn outer_zip() -> Vec<u8> {
        let mut bytes = Vec::new();
        let mut writer = zip::ZipWriter::new(Cursor::new(&mut bytes));
        writer
            .start_file(format!("{NUMBER}.zip"), SimpleFileOptions::default())
            .unwrap();
        writer.write_all(&inner_zip()).unwrap();
        writer.finish().unwrap();
        bytes
    }

    #[test]
    fn anchor_selection_honors_bin_mode() {
        assert!(is_anchor(
            "ak_snowline_elev_percentile_p062r018.csv",
            BinMode::Elevation
        ));
        assert!(!is_anchor(
            "ak_snowline_elev_percentile_p062r018.csv",
            BinMode::EqualArea
        ));
        assert!(is_anchor(
            "ak_snowline_elev_percentile_p063r018_eabin.csv",
            BinMode::EqualArea
        ));
        assert!(!is_anchor(
            "ak_snowline_elev_percentile_eos_corr_p062r018.csv",
            BinMode::Elevation
        ));
        assert!(!is_anchor("ak_db_bin_mean_p062r018.csv", BinMode::Elevation));
    }

    #[test]
    fn path_row_extraction() {
        assert_eq!(
            path_row_of("ak_snowline_elev_percentile_p062r018.csv"),
            "p062r018"
        );
        assert_eq!(
            path_row_of("ak_snowline_elev_percentile_p063r018_eabin.csv"),
            "p063r018"
        );
    }

    #[test]
    fn family_name_derivation() {
        let anchor = "ak_snowline_elev_percentile_p062r018.csv";

        let plain = family_names(anchor, SeriesVariant::default());
        assert_eq!(plain.snowline, anchor);
        assert_eq!(
            plain.melt_extent,
            "ak_melt_extent_elev_percentile_p062r018.csv"
        );
        assert_eq!(plain.backscatter, "ak_db_bin_mean_p062r018.csv");
        assert_eq!(plain.hypsometry, "ak_hypsometry_p062r018.csv");

        let eos = family_names(
            anchor,
            SeriesVariant {
                eos_corrected: true,
                ..Default::default()
            },
        );
        assert_eq!(
            eos.snowline,
            "ak_snowline_elev_percentile_eos_corr_p062r018.csv"
        );
        assert_eq!(
            eos.melt_extent,
            "ak_melt_extent_elev_percentile_eos_corr_p062r018.csv"
        );
        // Backscatter and hypsometry have no corrected variant.
        assert_eq!(eos.backscatter, plain.backscatter);
    }

    #[test]
    fn bundle_parsing_elevation_mode() {
        let bundle = parse_bundle(&outer_zip(), &number(), SeriesVariant::default()).unwrap();
        assert_eq!(bundle.tiles.len(), 1);

        let tile = &bundle.tiles[0];
        assert_eq!(tile.path_row, "p062r018");
        assert_eq!(tile.snowline.values, vec![1500.0, 1550.0]);
        assert_eq!(tile.hypsometry.bin_centers, vec![1450.0, 1550.0]);
        assert_eq!(tile.backscatter.dates.len(), 2);
        assert_eq!(tile.backscatter.values[0], vec![-12.0, -11.0]);
        assert!(tile.backscatter.values[1][1].is_nan());
    }

    #[test]
    fn bundle_parsing_eos_and_eabin_variants() {
        let eos = parse_bundle(
            &outer_zip(),
            &number(),
            SeriesVariant {
                eos_corrected: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(eos.tiles[0].snowline.values, vec![1480.0]);

        let area = parse_bundle(
            &outer_zip(),
            &number(),
            SeriesVariant {
                eos_corrected: false,
                bin_mode: BinMode::EqualArea,
            },
        )
        .unwrap();
        assert_eq!(area.tiles.len(), 1);
        assert_eq!(area.tiles[0].path_row, "p063r018");
    }

    #[test]
    fn missing_inner_zip_is_a_lookup_miss() {
        let other = GlacierNumber::from_rgi_id("RGI2000-v7.0-G-01-99999");
        let err = parse_bundle(&outer_zip(), &other, SeriesVariant::default()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn absent_directory_key_never_reaches_the_network() {
        // Unroutable base: a network attempt would surface as Transport.
        let mut client = ArchiveClient::new("http://127.0.0.1:9").unwrap();
        client.seed_directory(HashMap::from([(
            "01.00001.zip".to_string(),
            "bundle_A.zip".to_string(),
        )]));

        let err = client
            .fetch_bundle(&number(), SeriesVariant::default())
            .unwrap_err();
        assert!(matches!(err, SnowlineError::NoData(_)));
    }

    #[test]
    fn animation_record_bucketing() {
        assert!(animation_url("Gulkana").unwrap().contains("17054526"));
        assert!(animation_url("Baird").unwrap().contains("17054496"));
        assert!(animation_url("Taku").unwrap().contains("17054907"));
        assert!(animation_url("gulkana").unwrap().contains("17054526"));
        assert!(matches!(
            animation_url(""),
            Err(SnowlineError::NoAnimation(_))
        ));
        assert!(matches!(
            animation_url("0-unnamed"),
            Err(SnowlineError::NoAnimation(_))
        ));
    }

    #[test]
    fn animation_stem_strips_suffixes() {
        assert_eq!(animation_stem("Gulkana Glacier"), "Gulkana");
        assert_eq!(animation_stem("Yanert_abl"), "Yanert");
        assert_eq!(animation_stem("Sushitna/West Fork Glacier"), "Sushitna-West Fork");
    }
}

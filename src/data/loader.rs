use std::io::Cursor;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde_json::Value as JsonValue;

use super::model::{GlacierRecord, GlacierTable};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Published glacier inventory, pre-filtered to Alaska.
pub const DEFAULT_TABLE_URL: &str =
    "https://zenodo.org/records/16961713/files/RGI2000-v7.0-G-01_alaska_2km2.csv?download=1";

/// Load the glacier table from a URL or local path.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – one row per glacier with the RGI attribute columns
/// * `.geojson` / `.json` – FeatureCollection with the same attributes as
///   properties and a Polygon/MultiPolygon outline
/// * `.zip`     – container holding one of the above as its first matching member
pub fn load_table(source: &str) -> Result<GlacierTable> {
    let bytes = if source.starts_with("http://") || source.starts_with("https://") {
        fetch_bytes(source)?
    } else {
        std::fs::read(source).with_context(|| format!("reading {source}"))?
    };

    // Strip any query string before looking at the extension.
    let name = source.split('?').next().unwrap_or(source);
    parse_table(name, &bytes)
}

fn parse_table(name: &str, bytes: &[u8]) -> Result<GlacierTable> {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => parse_csv(bytes),
        "geojson" | "json" => parse_geojson(bytes),
        "zip" => parse_zipped(bytes),
        other => bail!("Unsupported table format: .{other}"),
    }
}

fn fetch_bytes(url: &str) -> Result<Vec<u8>> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(60))
        .build()
        .context("building HTTP client")?;

    let response = client
        .get(url)
        .send()
        .with_context(|| format!("requesting {url}"))?;

    if !response.status().is_success() {
        bail!("glacier table download failed: HTTP {}", response.status());
    }
    Ok(response.bytes().context("reading response body")?.to_vec())
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with at least `rgi_id`, `glac_name`, `cenlat`,
/// `cenlon`, `area_km2`; `zmin_m` / `zmax_m` are optional columns.
fn parse_csv(bytes: &[u8]) -> Result<GlacierTable> {
    let mut reader = csv::Reader::from_reader(bytes);
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let col = |name: &str| headers.iter().position(|h| h == name);
    let require = |name: &str| {
        col(name).with_context(|| format!("glacier table CSV missing '{name}' column"))
    };

    let rgi_idx = require("rgi_id")?;
    let name_idx = require("glac_name")?;
    let lat_idx = require("cenlat")?;
    let lon_idx = require("cenlon")?;
    let area_idx = require("area_km2")?;
    let zmin_idx = col("zmin_m");
    let zmax_idx = col("zmax_m");

    let mut records = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let row = result.with_context(|| format!("CSV row {row_no}"))?;
        let field = |idx: usize| row.get(idx).unwrap_or("").trim();

        let parse_f64 = |idx: usize, what: &str| -> Result<f64> {
            field(idx)
                .parse()
                .with_context(|| format!("CSV row {row_no}: '{}' is not a {what}", field(idx)))
        };

        records.push(GlacierRecord {
            rgi_id: field(rgi_idx).to_string(),
            glac_name: field(name_idx).to_string(),
            cenlat: parse_f64(lat_idx, "latitude")?,
            cenlon: parse_f64(lon_idx, "longitude")?,
            area_km2: parse_f64(area_idx, "area")?,
            zmin_m: zmin_idx.and_then(|i| field(i).parse::<f64>().ok()).map(|v| v as i32),
            zmax_m: zmax_idx.and_then(|i| field(i).parse::<f64>().ok()).map(|v| v as i32),
            geometry: None,
        });
    }

    Ok(GlacierTable::from_records(records))
}

// ---------------------------------------------------------------------------
// GeoJSON loader
// ---------------------------------------------------------------------------

/// Expected shape:
///
/// ```json
/// {
///   "type": "FeatureCollection",
///   "features": [
///     {
///       "properties": { "rgi_id": "...", "glac_name": "...", ... },
///       "geometry": { "type": "Polygon", "coordinates": [[[lon, lat], ...]] }
///     }
///   ]
/// }
/// ```
fn parse_geojson(bytes: &[u8]) -> Result<GlacierTable> {
    let root: JsonValue = serde_json::from_slice(bytes).context("parsing GeoJSON")?;

    let features = root
        .get("features")
        .and_then(|f| f.as_array())
        .context("GeoJSON has no 'features' array")?;

    let mut records = Vec::with_capacity(features.len());

    for (i, feature) in features.iter().enumerate() {
        let props = feature
            .get("properties")
            .and_then(|p| p.as_object())
            .with_context(|| format!("feature {i} has no properties"))?;

        let str_prop = |key: &str| {
            props
                .get(key)
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string()
        };
        let f64_prop = |key: &str| -> Result<f64> {
            props
                .get(key)
                .and_then(|v| v.as_f64())
                .with_context(|| format!("feature {i}: missing or non-numeric '{key}'"))
        };
        let int_prop =
            |key: &str| props.get(key).and_then(|v| v.as_f64()).map(|v| v as i32);

        records.push(GlacierRecord {
            rgi_id: str_prop("rgi_id"),
            glac_name: str_prop("glac_name"),
            cenlat: f64_prop("cenlat")?,
            cenlon: f64_prop("cenlon")?,
            area_km2: f64_prop("area_km2")?,
            zmin_m: int_prop("zmin_m"),
            zmax_m: int_prop("zmax_m"),
            geometry: feature.get("geometry").and_then(outer_ring),
        });
    }

    Ok(GlacierTable::from_records(records))
}

/// Outer ring of a Polygon or of the first polygon in a MultiPolygon.
fn outer_ring(geometry: &JsonValue) -> Option<Vec<[f64; 2]>> {
    let coords = geometry.get("coordinates")?;
    let ring = match geometry.get("type")?.as_str()? {
        "Polygon" => coords.get(0)?,
        "MultiPolygon" => coords.get(0)?.get(0)?,
        _ => return None,
    };

    let points: Option<Vec<[f64; 2]>> = ring
        .as_array()?
        .iter()
        .map(|p| {
            let lon = p.get(0)?.as_f64()?;
            let lat = p.get(1)?.as_f64()?;
            Some([lon, lat])
        })
        .collect();
    points
}

// ---------------------------------------------------------------------------
// Zipped container
// ---------------------------------------------------------------------------

/// Unpack the first `.csv` or `.geojson` member of a zip container.
/// The published outline dataset is distributed this way.
fn parse_zipped(bytes: &[u8]) -> Result<GlacierTable> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).context("opening table zip container")?;

    let member = (0..archive.len())
        .filter_map(|i| archive.by_index(i).ok().map(|f| f.name().to_string()))
        .find(|n| {
            let n = n.to_ascii_lowercase();
            n.ends_with(".csv") || n.ends_with(".geojson") || n.ends_with(".json")
        })
        .context("zip container holds no table file")?;

    let mut inner = Vec::new();
    archive
        .by_name(&member)
        .context("reading zip member")?
        .read_to_end(&mut inner)
        .context("extracting zip member")?;

    parse_table(&member, &inner)
}

//! Generate a small synthetic dataset mirroring the published layout:
//! a glacier table CSV, the archive directory JSON and one outer zip with
//! nested per-glacier zips. Serve the output directory over HTTP and point
//! `SNOWLINES_TABLE` / `SNOWLINES_ARCHIVE` at it to run the app offline.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

struct SampleGlacier {
    rgi_id: &'static str,
    name: &'static str,
    lat: f64,
    lon: f64,
    area_km2: f64,
    zmin: i32,
    zmax: i32,
    path_row: &'static str,
}

const GLACIERS: &[SampleGlacier] = &[
    SampleGlacier {
        rgi_id: "RGI2000-v7.0-G-01-00013",
        name: "Gulkana Glacier",
        lat: 63.28,
        lon: -145.42,
        area_km2: 18.2,
        zmin: 1160,
        zmax: 2430,
        path_row: "p062r018",
    },
    SampleGlacier {
        rgi_id: "RGI2000-v7.0-G-01-00570",
        name: "Kennicott Glacier",
        lat: 61.60,
        lon: -143.00,
        area_km2: 311.0,
        zmin: 430,
        zmax: 4960,
        path_row: "p063r018",
    },
    SampleGlacier {
        rgi_id: "RGI2000-v7.0-G-01-01390",
        name: "Matanuska Glacier",
        lat: 61.75,
        lon: -147.80,
        area_km2: 243.0,
        zmin: 500,
        zmax: 3500,
        path_row: "p068r017",
    },
];

/// 12-day sampling dates over four melt seasons.
fn sample_dates() -> Vec<(i32, u32, u32)> {
    let mut dates = Vec::new();
    for year in 2020..2024 {
        for step in 0..12 {
            let day_of_season = step * 12;
            let month = 5 + day_of_season / 30;
            let day = 1 + day_of_season % 30;
            dates.push((year, month as u32, day as u32));
        }
    }
    dates
}

fn date_str(d: (i32, u32, u32)) -> String {
    format!("{:04}-{:02}-{:02}", d.0, d.1, d.2)
}

/// Seasonal backscatter: bright (dry snow) early, dark (wet) mid-season.
fn backscatter(season_frac: f64, elev_frac: f64, rng: &mut SimpleRng) -> f64 {
    let melt_dip = -8.0 * (std::f64::consts::PI * season_frac).sin();
    let elevation_gain = 6.0 * elev_frac;
    -10.0 + melt_dip + elevation_gain + rng.gauss(0.0, 0.6)
}

fn glacier_csvs(g: &SampleGlacier, rng: &mut SimpleRng) -> BTreeMap<String, String> {
    let dates = sample_dates();
    let n_bins = 12usize;
    let bin_step = ((g.zmax - g.zmin) as f64 / n_bins as f64 / 50.0).ceil() * 50.0;
    let centers: Vec<f64> = (0..n_bins)
        .map(|i| g.zmin as f64 + bin_step / 2.0 + i as f64 * bin_step)
        .collect();

    let area_m2 = g.area_km2 * 1e6;
    let bin_area: Vec<f64> = (0..n_bins)
        .map(|i| {
            // Rough mid-heavy hypsometry.
            let w = 1.0 - ((i as f64 / (n_bins - 1) as f64) - 0.5).abs();
            w * area_m2 / n_bins as f64
        })
        .collect();

    let mut snowline = String::from("date,elev\n");
    let mut melt = String::from("date,extent\n");
    let mut snowline_eos = String::from("date,elev\n");
    let mut melt_eos = String::from("date,extent\n");
    let mut db = String::from("bin");
    for d in &dates {
        let _ = write!(db, ",{}", date_str(*d));
    }
    db.push('\n');
    let mut hyps = String::from("bin,area\n");

    for (i, d) in dates.iter().enumerate() {
        let season = (i % 12) as f64 / 11.0;
        let sl = g.zmin as f64
            + season * 0.8 * (g.zmax - g.zmin) as f64
            + rng.gauss(0.0, 40.0);
        let me = area_m2 * season * 0.6 * rng.next_f64().max(0.2);
        let _ = writeln!(snowline, "{},{:.1}", date_str(*d), sl);
        let _ = writeln!(melt, "{},{:.1}", date_str(*d), me);
        let _ = writeln!(snowline_eos, "{},{:.1}", date_str(*d), sl - 30.0);
        let _ = writeln!(melt_eos, "{},{:.1}", date_str(*d), me * 0.9);
    }

    for (bin, center) in centers.iter().enumerate() {
        let _ = write!(db, "{center}");
        for (i, _) in dates.iter().enumerate() {
            let season = (i % 12) as f64 / 11.0;
            let elev_frac = bin as f64 / (n_bins - 1) as f64;
            // Leave a few gaps so the nearest-date fill has work to do.
            if rng.next_f64() < 0.05 {
                let _ = write!(db, ",");
            } else {
                let _ = write!(db, ",{:.2}", backscatter(season, elev_frac, rng));
            }
        }
        db.push('\n');
        let _ = writeln!(hyps, "{},{:.1}", center, bin_area[bin]);
    }

    let pr = g.path_row;
    BTreeMap::from([
        (format!("ak_snowline_elev_percentile_{pr}.csv"), snowline),
        (format!("ak_melt_extent_elev_percentile_{pr}.csv"), melt),
        (
            format!("ak_snowline_elev_percentile_eos_corr_{pr}.csv"),
            snowline_eos,
        ),
        (
            format!("ak_melt_extent_elev_percentile_eos_corr_{pr}.csv"),
            melt_eos,
        ),
        (format!("ak_db_bin_mean_{pr}.csv"), db),
        (format!("ak_hypsometry_{pr}.csv"), hyps),
    ])
}

fn glacier_number(rgi_id: &str) -> String {
    format!("01.{}", &rgi_id[rgi_id.len() - 5..])
}

fn main() -> std::io::Result<()> {
    let out = Path::new("sample_data");
    fs::create_dir_all(out)?;

    // ---- Glacier table ----
    let mut table = String::from("rgi_id,glac_name,cenlat,cenlon,area_km2,zmin_m,zmax_m\n");
    for g in GLACIERS {
        let _ = writeln!(
            table,
            "{},{},{},{},{},{},{}",
            g.rgi_id, g.name, g.lat, g.lon, g.area_km2, g.zmin, g.zmax
        );
    }
    fs::write(out.join("glaciers.csv"), table)?;

    // ---- Outer archive with nested per-glacier zips ----
    let mut rng = SimpleRng::new(42);
    let mut outer_bytes = Vec::new();
    let mut outer = ZipWriter::new(Cursor::new(&mut outer_bytes));
    let mut directory = BTreeMap::new();

    for g in GLACIERS {
        let number = glacier_number(g.rgi_id);
        directory.insert(format!("{number}.zip"), "bundle_A.zip".to_string());

        let mut inner_bytes = Vec::new();
        let mut inner = ZipWriter::new(Cursor::new(&mut inner_bytes));
        for (name, content) in glacier_csvs(g, &mut rng) {
            inner.start_file(name, SimpleFileOptions::default())?;
            inner.write_all(content.as_bytes())?;
        }
        inner.finish()?;

        outer.start_file(format!("{number}.zip"), SimpleFileOptions::default())?;
        outer.write_all(&inner_bytes)?;
    }
    outer.finish()?;
    fs::write(out.join("bundle_A.zip"), &outer_bytes)?;

    // ---- Directory mapping ----
    let json = serde_json::to_string_pretty(&directory)?;
    fs::write(out.join("rgi_data_links.json"), json)?;

    println!("Wrote sample_data/glaciers.csv, rgi_data_links.json, bundle_A.zip");
    println!("Run the app against it with:");
    println!("  (cd sample_data && python3 -m http.server 8000) &");
    println!("  SNOWLINES_TABLE=sample_data/glaciers.csv \\");
    println!("  SNOWLINES_ARCHIVE=http://127.0.0.1:8000 alaska-snowlines");
    Ok(())
}

use crate::data::model::GlacierTable;
use crate::error::{Result, SnowlineError};

// ---------------------------------------------------------------------------
// Glacier lookup: free-text and coordinate queries
// ---------------------------------------------------------------------------

/// How many records a coordinate query returns (fewer if the table is smaller).
pub const NEAREST_COUNT: usize = 10;

/// Case-insensitive substring match against `rgi_id` and `glac_name`.
///
/// Returns indices into the table, preserving table order. Zero matches
/// means "not found"; more than one means the caller must let the user
/// disambiguate. No automatic tie-break.
pub fn search(table: &GlacierTable, query: &str) -> Vec<usize> {
    let needle = query.to_lowercase();
    table
        .records()
        .iter()
        .enumerate()
        .filter(|(_, r)| {
            r.rgi_id.to_lowercase().contains(&needle)
                || r.glac_name.to_lowercase().contains(&needle)
        })
        .map(|(i, _)| i)
        .collect()
}

/// The `NEAREST_COUNT` records closest to `(lat, lon)`, nearest first.
///
/// Distance is planar Euclidean in raw degree-space; no geodesic or
/// projected correction is applied.
pub fn nearest(table: &GlacierTable, lat: f64, lon: f64) -> Vec<usize> {
    let mut by_distance: Vec<(usize, f64)> = table
        .records()
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let dlat = r.cenlat - lat;
            let dlon = r.cenlon - lon;
            (i, dlat * dlat + dlon * dlon)
        })
        .collect();

    by_distance.sort_by(|a, b| a.1.total_cmp(&b.1));
    by_distance.truncate(NEAREST_COUNT);
    by_distance.into_iter().map(|(i, _)| i).collect()
}

/// Parse a `"lat,lon"` coordinate query into decimal degrees.
pub fn parse_coordinate(input: &str) -> Result<(f64, f64)> {
    let mut parts = input.split(',');
    let (lat, lon) = match (parts.next(), parts.next(), parts.next()) {
        (Some(lat), Some(lon), None) => (lat.trim(), lon.trim()),
        _ => return Err(SnowlineError::InvalidCoordinate(input.to_string())),
    };

    let lat: f64 = lat
        .parse()
        .map_err(|_| SnowlineError::InvalidCoordinate(input.to_string()))?;
    let lon: f64 = lon
        .parse()
        .map_err(|_| SnowlineError::InvalidCoordinate(input.to_string()))?;
    Ok((lat, lon))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::GlacierRecord;

    fn record(rgi_id: &str, name: &str, lat: f64, lon: f64) -> GlacierRecord {
        GlacierRecord {
            rgi_id: rgi_id.to_string(),
            glac_name: name.to_string(),
            cenlat: lat,
            cenlon: lon,
            area_km2: 10.0,
            zmin_m: None,
            zmax_m: None,
            geometry: None,
        }
    }

    fn sample_table() -> GlacierTable {
        GlacierTable::from_records(vec![
            record("RGI2000-v7.0-G-01-00013", "Gulkana Glacier", 63.28, -145.42),
            record("RGI2000-v7.0-G-01-00020", "Kennicott Glacier", 61.60, -143.00),
            record("RGI2000-v7.0-G-01-00031", "", 60.00, -149.00),
            record("RGI2000-v7.0-G-01-00042", "Matanuska Glacier", 61.75, -147.80),
        ])
    }

    #[test]
    fn search_is_case_insensitive_on_both_fields() {
        let table = sample_table();

        assert_eq!(search(&table, "gulkana"), vec![0]);
        assert_eq!(search(&table, "GULKANA"), vec![0]);
        // Substring of the rgi_id.
        assert_eq!(search(&table, "00031"), vec![2]);

        // Consistent with a naive case-folded contains check.
        for (i, r) in table.records().iter().enumerate() {
            let hits = search(&table, &r.rgi_id.to_uppercase());
            assert!(hits.contains(&i));
        }
    }

    #[test]
    fn search_preserves_table_order() {
        let table = sample_table();
        // "Glacier" matches records 0, 1 and 3 in table order.
        assert_eq!(search(&table, "glacier"), vec![0, 1, 3]);
    }

    #[test]
    fn search_returns_empty_for_no_match() {
        let table = sample_table();
        assert!(search(&table, "zzz-not-a-glacier").is_empty());
    }

    #[test]
    fn gulkana_resolves_uniquely() {
        let table = sample_table();
        let hits = search(&table, "Gulkana");
        assert_eq!(hits.len(), 1);

        let r = table.get(hits[0]).unwrap();
        assert!(r.glac_name.contains("Gulkana Glacier"));
        assert_eq!(r.number().as_str(), "01.00013");
    }

    #[test]
    fn nearest_returns_min_count_sorted_by_distance() {
        let table = sample_table();
        let hits = nearest(&table, 63.28, -145.42);
        assert_eq!(hits.len(), table.len().min(NEAREST_COUNT));

        // Gulkana sits exactly at the query point.
        assert_eq!(hits[0], 0);

        // Non-decreasing distance.
        let dist = |i: usize| {
            let r = table.get(i).unwrap();
            let dlat = r.cenlat - 63.28;
            let dlon = r.cenlon + 145.42;
            dlat * dlat + dlon * dlon
        };
        for pair in hits.windows(2) {
            assert!(dist(pair[0]) <= dist(pair[1]));
        }
    }

    #[test]
    fn coordinate_parsing() {
        assert_eq!(parse_coordinate("63.28,-145.42").unwrap(), (63.28, -145.42));
        assert_eq!(parse_coordinate(" 63.28 , -145.42 ").unwrap(), (63.28, -145.42));

        assert!(matches!(
            parse_coordinate("not,a,number"),
            Err(SnowlineError::InvalidCoordinate(_))
        ));
        assert!(matches!(
            parse_coordinate("63.28"),
            Err(SnowlineError::InvalidCoordinate(_))
        ));
        assert!(matches!(
            parse_coordinate("abc,def"),
            Err(SnowlineError::InvalidCoordinate(_))
        ));
    }
}

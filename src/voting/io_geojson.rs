// ZIP code boundaries published as a GeoJSON feature collection.

use std::fs;

use serde::Deserialize;
use serde_json::Value as JSValue;

use crate::voting::io_common::simplify_file_name;
use crate::voting::*;

#[derive(Debug, Clone, Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Debug, Clone, Deserialize)]
struct Feature {
    #[serde(default)]
    properties: Option<serde_json::Map<String, JSValue>>,
    geometry: Option<Geometry>,
}

#[derive(Debug, Clone, Deserialize)]
struct Geometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    coordinates: JSValue,
}

fn read_position(js: &JSValue) -> Option<(f64, f64)> {
    let arr = js.as_array()?;
    match arr.as_slice() {
        [x, y, ..] => Some((x.as_f64()?, y.as_f64()?)),
        _ => None,
    }
}

fn read_ring(js: &JSValue) -> Option<Vec<(f64, f64)>> {
    js.as_array()?.iter().map(read_position).collect()
}

/// The outer ring of every part. Holes are not read.
fn outer_rings(geometry: &Geometry) -> Option<Vec<Vec<(f64, f64)>>> {
    match geometry.kind.as_str() {
        "Polygon" => {
            let outer = geometry.coordinates.as_array()?.first()?;
            Some(vec![read_ring(outer)?])
        }
        "MultiPolygon" => geometry
            .coordinates
            .as_array()?
            .iter()
            .map(|polygon| read_ring(polygon.as_array()?.first()?))
            .collect(),
        _ => None,
    }
}

/// The ZIP code property may be stored as text or as a number.
fn zip_code(properties: &serde_json::Map<String, JSValue>, property: &str) -> Option<String> {
    match properties.get(property)? {
        JSValue::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        JSValue::Number(n) => n.as_u64().map(|x| format!("{:05}", x)),
        _ => None,
    }
}

pub fn zip_boundary_rows(js: &str, path: &str, property: &str) -> ZipVoteResult<Vec<ZipBoundaryRow>> {
    let collection: FeatureCollection = serde_json::from_str(js).context(ParsingJsonSnafu { path })?;
    let mut res: Vec<ZipBoundaryRow> = Vec::with_capacity(collection.features.len());
    let mut skipped = 0;
    for (idx, feature) in collection.features.iter().enumerate() {
        let zip_o = feature
            .properties
            .as_ref()
            .and_then(|p| zip_code(p, property));
        let rings_o = feature.geometry.as_ref().and_then(outer_rings);
        match (zip_o, rings_o) {
            (Some(zip_code), Some(rings)) => res.push(ZipBoundaryRow { zip_code, rings }),
            _ => {
                debug!("zip_boundary_rows: skipping feature {}", idx);
                skipped += 1;
            }
        }
    }
    if skipped > 0 {
        warn!(
            "{}: skipped {} features without a {} property or a polygon geometry",
            simplify_file_name(path),
            skipped,
            property
        );
    }
    info!(
        "Read {} ZIP code features from {}",
        res.len(),
        simplify_file_name(path)
    );
    Ok(res)
}

pub fn read_zip_boundaries(path: &str, property: &str) -> ZipVoteResult<Vec<ZipBoundaryRow>> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    zip_boundary_rows(&contents, path, property)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_polygons_and_multipolygons() {
        let js = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"ZIPCODE": "92101"},
             "geometry": {"type": "Polygon", "coordinates": [
                [[0, 0], [1, 0], [1, 1], [0, 1], [0, 0]],
                [[0.2, 0.2], [0.4, 0.2], [0.4, 0.4], [0.2, 0.2]]]}},
            {"type": "Feature", "properties": {"ZIPCODE": 91901},
             "geometry": {"type": "MultiPolygon", "coordinates": [
                [[[2, 0], [3, 0], [3, 1], [2, 0]]],
                [[[4, 0], [5, 0], [5, 1], [4, 0]]]]}},
            {"type": "Feature", "properties": {"NAME": "no zip"},
             "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1]]]}},
            {"type": "Feature", "properties": {"ZIPCODE": "92199"},
             "geometry": {"type": "Point", "coordinates": [0, 0]}},
            {"type": "Feature", "properties": {"ZIPCODE": "92198"}, "geometry": null}
        ]}"#;
        let rows = zip_boundary_rows(js, "zips.geojson", "ZIPCODE").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].zip_code, "92101");
        // Only the outer ring.
        assert_eq!(rows[0].rings.len(), 1);
        assert_eq!(rows[0].rings[0].len(), 5);
        assert_eq!(rows[1].zip_code, "91901");
        assert_eq!(rows[1].rings.len(), 2);
        assert_eq!(rows[1].rings[1][0], (4.0, 0.0));
    }

    #[test]
    fn zip_property_is_configurable() {
        let js = r#"{"features": [
            {"properties": {"ZCTA5CE20": "02134"},
             "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1]]]}}]}"#;
        let rows = zip_boundary_rows(js, "zips.geojson", "ZCTA5CE20").unwrap();
        assert_eq!(rows[0].zip_code, "02134");
        assert!(zip_boundary_rows(js, "zips.geojson", "ZIPCODE").unwrap().is_empty());
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(zip_boundary_rows("{\"features\": 3}", "zips.geojson", "ZIPCODE").is_err());
    }
}

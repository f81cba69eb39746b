use log::{debug, info};
use std::collections::{BTreeMap, HashMap};

use crate::config::*;
use crate::error::*;
use crate::geometry::Polygon;

pub const GAZETTEER_FEED: &str = "census gazetteer";
pub const ZIP_BOUNDARY_FEED: &str = "ZIP code boundaries";

/// One representative point per census tract of the target county.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct TractCentroidIndex {
    centroids: BTreeMap<String, GeoPoint>,
}

impl TractCentroidIndex {
    /// Keeps the rows whose identifier starts with the county FIPS prefix.
    pub fn build(rows: &[GazetteerRow], county_fips: &str) -> InterpolationResult<TractCentroidIndex> {
        ensure_not_empty(rows.is_empty(), GAZETTEER_FEED, "the feed is empty")?;
        let mut centroids: BTreeMap<String, GeoPoint> = BTreeMap::new();
        let mut non_finite = 0usize;
        for row in rows.iter() {
            let tract_id = row.tract_id.trim();
            if !tract_id.starts_with(county_fips) {
                continue;
            }
            if !row.longitude.is_finite() || !row.latitude.is_finite() {
                non_finite += 1;
                continue;
            }
            centroids.insert(
                tract_id.to_string(),
                GeoPoint {
                    x: row.longitude,
                    y: row.latitude,
                },
            );
        }
        if non_finite > 0 {
            debug!("TractCentroidIndex::build: skipped {} non-finite centroids", non_finite);
        }
        ensure_not_empty(
            centroids.is_empty(),
            GAZETTEER_FEED,
            &format!("no tract matches county prefix {}", county_fips),
        )?;
        info!("Indexed {} tracts for county {}", centroids.len(), county_fips);
        Ok(TractCentroidIndex { centroids })
    }

    pub fn len(&self) -> usize {
        self.centroids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centroids.is_empty()
    }

    pub fn get(&self, tract_id: &str) -> Option<GeoPoint> {
        self.centroids.get(tract_id).cloned()
    }

    /// The tracts in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &GeoPoint)> {
        self.centroids.iter()
    }
}

/// The polygon parts of every ZIP code, in the order of the boundary feed.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct ZipPolygonIndex {
    zips: Vec<(String, Vec<Polygon>)>,
}

impl ZipPolygonIndex {
    /// Rings with fewer than 3 vertices are dropped. A ZIP code that appears several
    /// times in the feed accumulates all its parts under its first position.
    pub fn build(
        rows: &[ZipBoundaryRow],
        zip_prefixes: Option<&[String]>,
    ) -> InterpolationResult<ZipPolygonIndex> {
        ensure_not_empty(rows.is_empty(), ZIP_BOUNDARY_FEED, "the feed is empty")?;
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut zips: Vec<(String, Vec<Polygon>)> = Vec::new();
        for row in rows.iter() {
            let zip_code = row.zip_code.trim();
            if let Some(prefixes) = zip_prefixes {
                if !prefixes.iter().any(|p| zip_code.starts_with(p.as_str())) {
                    continue;
                }
            }
            let parts: Vec<Polygon> = row
                .rings
                .iter()
                .filter(|ring| ring.len() >= 3)
                .map(|ring| Polygon::from_pairs(ring))
                .collect();
            if parts.is_empty() {
                debug!("ZipPolygonIndex::build: {} has no usable ring", zip_code);
                continue;
            }
            match positions.get(zip_code) {
                Some(&idx) => zips[idx].1.extend(parts),
                None => {
                    positions.insert(zip_code.to_string(), zips.len());
                    zips.push((zip_code.to_string(), parts));
                }
            }
        }
        ensure_not_empty(zips.is_empty(), ZIP_BOUNDARY_FEED, "no ZIP code left after filtering")?;
        info!("Indexed {} ZIP codes", zips.len());
        Ok(ZipPolygonIndex { zips })
    }

    pub fn len(&self) -> usize {
        self.zips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zips.is_empty()
    }

    pub fn parts(&self, zip_code: &str) -> Option<&[Polygon]> {
        self.zips
            .iter()
            .find(|(z, _)| z == zip_code)
            .map(|(_, parts)| parts.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<Polygon>)> {
        self.zips.iter().map(|(z, parts)| (z, parts))
    }
}

fn ensure_not_empty(empty: bool, feed: &str, reason: &str) -> InterpolationResult<()> {
    if empty {
        return DataUnavailableSnafu { feed, reason }.fail();
    }
    Ok(())
}

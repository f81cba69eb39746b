use log::{debug, info, warn};
use std::collections::BTreeMap;

use crate::geometry::any_contains;
use crate::index::{TractCentroidIndex, ZipPolygonIndex};

/// The ZIP code that contains each resolved tract centroid.
///
/// Unresolved tracts are absent from the mapping. This is distinct from the unknown
/// ZIP bucket used by the weights.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct TractZipMap {
    zips: BTreeMap<String, String>,
    unresolved: Vec<String>,
}

impl TractZipMap {
    pub fn zip_for(&self, tract_id: &str) -> Option<&str> {
        self.zips.get(tract_id).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.zips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zips.is_empty()
    }

    /// The tracts whose centroid is not inside any ZIP code.
    pub fn unresolved(&self) -> &[String] {
        &self.unresolved
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.zips.iter()
    }
}

impl FromIterator<(String, String)> for TractZipMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        TractZipMap {
            zips: iter.into_iter().collect(),
            unresolved: Vec::new(),
        }
    }
}

/// Assigns every tract centroid to the first ZIP code (in index order) that contains it.
///
/// The scan is brute force over all the ZIP parts. With `use_bounding_boxes`, each
/// part is first tested against its bounding box; the outcome is the same.
pub fn map_tracts_to_zips(
    tracts: &TractCentroidIndex,
    zips: &ZipPolygonIndex,
    use_bounding_boxes: bool,
) -> TractZipMap {
    info!(
        "Mapping {} tracts onto {} ZIP codes",
        tracts.len(),
        zips.len()
    );
    let mut res = TractZipMap::default();
    for (tract_id, centroid) in tracts.iter() {
        let found = zips
            .iter()
            .find(|(_, parts)| any_contains(*centroid, parts, use_bounding_boxes))
            .map(|(zip, _)| zip.clone());
        match found {
            Some(zip) => {
                debug!("map_tracts_to_zips: {} -> {}", tract_id, zip);
                res.zips.insert(tract_id.clone(), zip);
            }
            None => {
                debug!("map_tracts_to_zips: {} is outside all ZIP codes", tract_id);
                res.unresolved.push(tract_id.clone());
            }
        }
    }
    info!("Mapped {} tracts to ZIP codes", res.zips.len());
    if !res.unresolved.is_empty() {
        warn!(
            "{} tracts are not inside any ZIP code, their share goes to {}",
            res.unresolved.len(),
            crate::config::UNKNOWN_ZIP
        );
    }
    res
}

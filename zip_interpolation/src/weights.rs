use log::{debug, info, warn};
use std::collections::{BTreeMap, HashMap};

use crate::config::*;
use crate::error::*;
use crate::mapper::TractZipMap;

pub const ALLOCATION_FEED: &str = "block to precinct allocation";

/// Width of the tract part of a full tract identifier.
const TRACT_SUFFIX_WIDTH: usize = 6;

/// The raw shares of a precinct are expected to add up to a whole precinct within this margin.
const SHARE_SUM_TOLERANCE: f64 = 0.01;

/// Distribution of one precinct over ZIP codes. The weights add up to 1.
pub type ZipWeights = BTreeMap<String, f64>;

/// The ZIP distribution of every precinct that has some positive share.
///
/// A precinct absent from this mapping has no weight information: its votes
/// belong entirely to the unknown ZIP bucket.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct PrecinctWeights {
    weights: HashMap<String, ZipWeights>,
}

impl PrecinctWeights {
    pub fn get(&self, precinct_id: &str) -> Option<&ZipWeights> {
        self.weights.get(precinct_id)
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ZipWeights)> {
        self.weights.iter()
    }
}

impl FromIterator<(String, ZipWeights)> for PrecinctWeights {
    fn from_iter<I: IntoIterator<Item = (String, ZipWeights)>>(iter: I) -> Self {
        PrecinctWeights {
            weights: iter.into_iter().collect(),
        }
    }
}

/// What happened to the allocation rows while building the weights.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct WeightBuildStats {
    /// The units that were applied. Never `Auto`.
    pub units: ShareUnits,
    pub malformed_rows: usize,
    pub non_positive_rows: usize,
    pub unresolved_rows: usize,
    pub share_sum_mismatches: usize,
}

/// Builds the full tract identifier from the tract number of the allocation table.
///
/// `20706` becomes `06073020706` for county `06073`. Identifiers that already carry
/// the county prefix are kept.
pub fn normalize_tract_suffix(suffix: &str, county_fips: &str) -> String {
    let t = suffix.trim();
    if t.len() == county_fips.len() + TRACT_SUFFIX_WIDTH && t.starts_with(county_fips) {
        return t.to_string();
    }
    format!("{}{:0>width$}", county_fips, t, width = TRACT_SUFFIX_WIDTH)
}

/// Parses a share cell. Blank, non-numeric and non-finite contents are malformed.
pub fn parse_share(raw: &str, lineno: usize) -> InterpolationResult<f64> {
    let t = raw.trim();
    match t.parse::<f64>() {
        Ok(x) if x.is_finite() => Ok(x),
        _ => MalformedRowSnafu {
            feed: ALLOCATION_FEED,
            lineno,
            reason: format!("cannot read share {:?}", raw),
        }
        .fail(),
    }
}

/// Resolves `Auto` by looking at the feed once: percentages if any share is above 1.
pub fn detect_units(rows: &[AllocationRow], requested: ShareUnits) -> ShareUnits {
    match requested {
        ShareUnits::Auto => {
            let max_share = rows
                .iter()
                .filter_map(|r| r.share.trim().parse::<f64>().ok())
                .filter(|x| x.is_finite())
                .fold(0.0_f64, f64::max);
            let units = if max_share > 1.0 {
                ShareUnits::Percent
            } else {
                ShareUnits::Fraction
            };
            info!(
                "Allocation shares read as {:?} (largest share: {})",
                units, max_share
            );
            units
        }
        x => x,
    }
}

/// Builds the normalized ZIP distribution of every precinct.
///
/// Positive shares are accumulated per (precinct, ZIP); shares of tracts without a ZIP
/// go to the unknown bucket so that no registered population is lost. Rows with a
/// non-positive or unreadable share are skipped. Each precinct is then normalized by
/// its accumulated share.
pub fn build_precinct_weights(
    rows: &[AllocationRow],
    tract_to_zip: &TractZipMap,
    county_fips: &str,
    units: ShareUnits,
) -> (PrecinctWeights, WeightBuildStats) {
    let units = detect_units(rows, units);
    let scale = match units {
        ShareUnits::Percent => 0.01,
        _ => 1.0,
    };
    let mut stats = WeightBuildStats {
        units,
        malformed_rows: 0,
        non_positive_rows: 0,
        unresolved_rows: 0,
        share_sum_mismatches: 0,
    };

    let mut shares: BTreeMap<String, ZipWeights> = BTreeMap::new();
    for (idx, row) in rows.iter().enumerate() {
        let lineno = idx + 1;
        let precinct_id = row.precinct_id.trim();
        if precinct_id.is_empty() || row.tract_suffix.trim().is_empty() {
            debug!("build_precinct_weights: row {}: missing precinct or tract", lineno);
            stats.malformed_rows += 1;
            continue;
        }
        let share = match parse_share(&row.share, lineno) {
            Ok(x) => x * scale,
            Err(e) => {
                debug!("build_precinct_weights: {}", e);
                stats.malformed_rows += 1;
                continue;
            }
        };
        if share <= 0.0 {
            stats.non_positive_rows += 1;
            continue;
        }
        let tract_id = normalize_tract_suffix(&row.tract_suffix, county_fips);
        let zip = match tract_to_zip.zip_for(&tract_id) {
            Some(z) => z,
            None => {
                stats.unresolved_rows += 1;
                UNKNOWN_ZIP
            }
        };
        *shares
            .entry(precinct_id.to_string())
            .or_default()
            .entry(zip.to_string())
            .or_insert(0.0) += share;
    }

    let mut weights: HashMap<String, ZipWeights> = HashMap::with_capacity(shares.len());
    for (precinct_id, zips) in shares.into_iter() {
        let total: f64 = zips.values().sum();
        if total <= 0.0 {
            continue;
        }
        if (total - 1.0).abs() > SHARE_SUM_TOLERANCE {
            debug!(
                "build_precinct_weights: precinct {} adds up to {} of a precinct",
                precinct_id, total
            );
            stats.share_sum_mismatches += 1;
        }
        let normalized: ZipWeights = zips.into_iter().map(|(z, p)| (z, p / total)).collect();
        weights.insert(precinct_id, normalized);
    }

    info!(
        "Built ZIP weights for {} precincts ({} unresolved rows, {} malformed rows)",
        weights.len(),
        stats.unresolved_rows,
        stats.malformed_rows
    );
    if stats.share_sum_mismatches > 0 {
        warn!(
            "{} precincts do not add up to a whole precinct, check the units of the share column",
            stats.share_sum_mismatches
        );
    }
    (PrecinctWeights { weights }, stats)
}

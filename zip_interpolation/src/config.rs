// ********* Input data structures ***********

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// A (longitude, latitude) pair.
pub type GeoPoint = geo::Coord<f64>;

/// The ZIP bucket that receives allocation share whose tract has no containing ZIP,
/// and the votes of precincts without any weight information.
pub const UNKNOWN_ZIP: &str = "Unknown";

/// The city used for aggregation when a precinct has no usable city name.
pub const UNINCORPORATED: &str = "Unincorporated";

/// The city reported in the precinct list for precincts missing from the city lookup.
pub const UNKNOWN_CITY: &str = "Unknown";

/// One row of the census gazetteer: a tract and its internal point.
#[derive(PartialEq, Debug, Clone)]
pub struct GazetteerRow {
    /// The full geographic identifier (state + county FIPS + 6-digit tract).
    pub tract_id: String,
    pub longitude: f64,
    pub latitude: f64,
}

/// One ZIP code and the outer rings of its polygon parts, as (longitude, latitude) pairs.
#[derive(PartialEq, Debug, Clone)]
pub struct ZipBoundaryRow {
    pub zip_code: String,
    pub rings: Vec<Vec<(f64, f64)>>,
}

/// One row of the block-to-precinct allocation table.
///
/// The share is kept as raw text: parsing failures are counted by the weight builder.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct AllocationRow {
    pub precinct_id: String,
    /// The tract number without the county prefix, e.g. `20706`.
    pub tract_suffix: String,
    pub share: String,
}

/// One row of the precinct to city lookup.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CityRow {
    pub precinct_id: String,
    pub city: String,
}

/// One row of a statement of votes: the precinct and the raw content of every column.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct SovRow {
    pub precinct_id: String,
    pub cells: HashMap<String, String>,
}

/// Maps a statement of votes column to the display name of a candidate.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CandidateColumn {
    pub column: String,
    pub name: String,
}

// ********* Configuration **********

/// The units of the share column of the allocation table.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum ShareUnits {
    /// Decided once per feed: percentages if any positive share is above 1.
    Auto,
    /// Shares are fractions in [0, 1].
    Fraction,
    /// Shares are percentages in [0, 100].
    Percent,
}

/// How the geography frame is built.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct GeographyRules {
    /// The state + county FIPS prefix, e.g. `06073`.
    pub county_fips: String,
    /// If set, only the ZIP codes starting with one of these prefixes are kept.
    pub zip_prefixes: Option<Vec<String>>,
    /// Test the bounding box of every ZIP part before running the full containment test.
    pub use_bounding_boxes: bool,
}

impl GeographyRules {
    pub fn for_county(county_fips: &str) -> GeographyRules {
        GeographyRules {
            county_fips: county_fips.to_string(),
            zip_prefixes: None,
            use_bounding_boxes: true,
        }
    }
}

/// The policy constants of the vote aggregation.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct AggregationRules {
    /// Cities and ZIP codes with fewer (weighted) votes are not reported.
    pub minimum_scope_votes: f64,
    pub share_units: ShareUnits,
}

impl AggregationRules {
    pub const DEFAULT_RULES: AggregationRules = AggregationRules {
        minimum_scope_votes: 10.0,
        share_units: ShareUnits::Auto,
    };
}

impl Default for AggregationRules {
    fn default() -> Self {
        AggregationRules::DEFAULT_RULES
    }
}

// ******** Output data structures *********

#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct CandidateStats {
    pub votes: i64,
    pub percentage: f64,
}

/// A precinct that reported at least one vote.
#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct PrecinctRecord {
    pub precinct: String,
    pub total: i64,
    pub city: String,
    #[serde(flatten)]
    pub votes: BTreeMap<String, i64>,
}

#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct CityResult {
    pub total_votes: i64,
    pub candidates: BTreeMap<String, CandidateStats>,
}

#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct ZipResult {
    pub total_votes: i64,
    pub candidates: BTreeMap<String, CandidateStats>,
    pub precinct_count: usize,
    pub precinct_ids: Vec<String>,
}

/// The result of one election year.
#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct YearResult {
    pub year: String,
    pub county: String,
    pub total_votes: i64,
    pub num_precincts: usize,
    pub candidates: BTreeMap<String, CandidateStats>,
    pub precincts: Vec<PrecinctRecord>,
    pub by_city: BTreeMap<String, CityResult>,
    pub by_zipcode: BTreeMap<String, ZipResult>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct DocumentMeta {
    pub source: String,
    pub county: String,
    pub granularity: String,
    /// RFC 3339 timestamp of the generation.
    pub generated: String,
}

/// The persisted document: all the years under `elections`.
#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct ElectionDocument {
    pub meta: DocumentMeta,
    pub elections: BTreeMap<String, YearResult>,
}

// ******** Diagnostics *********

/// Counts of the skipped and unresolved data for one election year.
#[derive(PartialEq, Debug, Clone, Default, Serialize)]
pub struct YearDiagnostics {
    pub malformed_allocation_rows: usize,
    pub non_positive_allocation_rows: usize,
    /// Allocation rows whose tract has no containing ZIP code.
    pub unresolved_allocation_rows: usize,
    pub weighted_precincts: usize,
    /// Precincts whose raw shares do not add up to a whole precinct.
    pub share_sum_mismatches: usize,
    pub city_lookup_unavailable: bool,
    pub malformed_sov_rows: usize,
    /// Configured candidate columns absent from the statement of votes.
    pub missing_candidate_columns: Vec<String>,
    pub zero_total_precincts: usize,
    /// Precincts with votes but without any weight information.
    pub precincts_without_weights: usize,
    /// Precincts with votes that are absent from the city lookup.
    pub precincts_without_city: usize,
    /// Weighted votes attributed to the unknown ZIP bucket.
    pub unknown_zip_votes: f64,
    pub cities_below_threshold: usize,
    pub zips_below_threshold: usize,
}

/// Summary of the whole run.
#[derive(PartialEq, Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    pub tracts_indexed: usize,
    pub zips_indexed: usize,
    /// Tracts whose centroid is not inside any ZIP code.
    pub tracts_unresolved: usize,
    pub years: BTreeMap<String, YearDiagnostics>,
    /// The years that were excluded, with the reason.
    pub failed_years: BTreeMap<String, String>,
}

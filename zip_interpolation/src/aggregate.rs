use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::config::*;
use crate::error::*;
use crate::weights::PrecinctWeights;

pub const SOV_FEED: &str = "statement of votes";
pub const CITY_LOOKUP_FEED: &str = "precinct to city lookup";

/// Accumulated (possibly fractional) votes of one scope.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct CandidateTally {
    pub votes: BTreeMap<String, f64>,
    pub total: f64,
}

impl CandidateTally {
    /// Adds `weight` times the votes of a precinct.
    fn add(&mut self, precinct_votes: &BTreeMap<String, f64>, precinct_total: f64, weight: f64) {
        for (cand, v) in precinct_votes.iter() {
            *self.votes.entry(cand.clone()).or_insert(0.0) += v * weight;
        }
        self.total += precinct_total * weight;
    }
}

/// Get-or-insert-zero access to the tally of a scope.
fn scope_tally<'a>(scopes: &'a mut BTreeMap<String, CandidateTally>, key: &str) -> &'a mut CandidateTally {
    scopes.entry(key.to_string()).or_default()
}

/// What the city lookup knows about a precinct.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum CityResolution<'a> {
    Named(&'a str),
    /// The precinct is in the lookup with a blank city.
    Empty,
    NotFound,
}

impl<'a> CityResolution<'a> {
    /// The city under which the precinct is aggregated.
    pub fn aggregation_city(&self) -> &'a str {
        match self {
            CityResolution::Named(c) => *c,
            _ => UNINCORPORATED,
        }
    }

    /// The city shown in the precinct list.
    pub fn listed_city(&self) -> &'a str {
        match self {
            CityResolution::Named(c) => *c,
            CityResolution::Empty => UNINCORPORATED,
            CityResolution::NotFound => UNKNOWN_CITY,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct CityLookup {
    cities: HashMap<String, String>,
}

impl CityLookup {
    /// Later rows override earlier rows for the same precinct. Rows without a precinct are ignored.
    pub fn from_rows(rows: &[CityRow]) -> CityLookup {
        let cities = rows
            .iter()
            .filter(|r| !r.precinct_id.trim().is_empty())
            .map(|r| (r.precinct_id.trim().to_string(), r.city.trim().to_string()))
            .collect();
        CityLookup { cities }
    }

    pub fn resolve(&self, precinct_id: &str) -> CityResolution<'_> {
        match self.cities.get(precinct_id) {
            Some(c) if c.is_empty() => CityResolution::Empty,
            Some(c) => CityResolution::Named(c.as_str()),
            None => CityResolution::NotFound,
        }
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }
}

/// The cell of a column. The exact column name is tried first, then the name ignoring case.
fn find_cell<'a>(row: &'a SovRow, column: &str) -> Option<&'a String> {
    row.cells.get(column).or_else(|| {
        row.cells
            .iter()
            .find(|(k, _)| k.trim().eq_ignore_ascii_case(column.trim()))
            .map(|(_, v)| v)
    })
}

/// The configured candidate columns that no row of the statement of votes carries.
pub fn missing_candidate_columns(sov_rows: &[SovRow], candidates: &[CandidateColumn]) -> Vec<String> {
    if sov_rows.is_empty() {
        return Vec::new();
    }
    let present: BTreeSet<String> = sov_rows
        .iter()
        .flat_map(|r| r.cells.keys())
        .map(|k| k.trim().to_lowercase())
        .collect();
    candidates
        .iter()
        .filter(|cc| !present.contains(&cc.column.trim().to_lowercase()))
        .map(|cc| cc.column.clone())
        .collect()
}

/// Reads the votes of every candidate of a precinct row.
///
/// Columns are matched ignoring case. Missing and blank cells count as zero, as do
/// non-positive values. A cell with other non-numeric content makes the whole row
/// malformed. Columns that map to the same candidate are added.
pub fn parse_precinct_votes(
    row: &SovRow,
    candidates: &[CandidateColumn],
    lineno: usize,
) -> InterpolationResult<BTreeMap<String, f64>> {
    let mut res: BTreeMap<String, f64> = BTreeMap::new();
    for cc in candidates.iter() {
        let cell = match find_cell(row, &cc.column) {
            Some(c) if !c.trim().is_empty() => c.trim(),
            _ => continue,
        };
        let v = match cell.parse::<f64>() {
            Ok(x) if x.is_finite() => x,
            _ => {
                return MalformedRowSnafu {
                    feed: SOV_FEED,
                    lineno,
                    reason: format!("column {}: cannot read votes {:?}", cc.column, cell),
                }
                .fail()
            }
        };
        if v > 0.0 {
            *res.entry(cc.name.clone()).or_insert(0.0) += v;
        }
    }
    Ok(res)
}

/// The unrounded accumulations of one election year.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct YearTallies {
    pub county: CandidateTally,
    pub cities: BTreeMap<String, CandidateTally>,
    /// Includes the unknown ZIP bucket.
    pub zips: BTreeMap<String, CandidateTally>,
    pub zip_precincts: BTreeMap<String, BTreeSet<String>>,
    pub precincts: Vec<PrecinctRecord>,
    pub diagnostics: YearDiagnostics,
}

/// Accumulates the votes of every precinct into the county, its city and its ZIP codes.
///
/// The ZIP tallies receive `weight x votes` for every ZIP of the precinct distribution;
/// a precinct without distribution goes entirely to the unknown ZIP. Nothing is rounded here.
pub fn accumulate_year(
    sov_rows: &[SovRow],
    candidates: &[CandidateColumn],
    city_lookup: &CityLookup,
    weights: &PrecinctWeights,
) -> YearTallies {
    let mut tallies = YearTallies::default();
    let missing = missing_candidate_columns(sov_rows, candidates);
    if !missing.is_empty() {
        warn!(
            "Candidate columns not found in the statement of votes, their votes count as zero: {}",
            missing.join(", ")
        );
    }
    tallies.diagnostics.missing_candidate_columns = missing;
    let unknown_only: BTreeMap<String, f64> = [(UNKNOWN_ZIP.to_string(), 1.0)].into_iter().collect();

    for (idx, row) in sov_rows.iter().enumerate() {
        let lineno = idx + 1;
        let precinct_id = row.precinct_id.trim();
        if precinct_id.is_empty() {
            debug!("accumulate_year: row {}: no precinct id", lineno);
            tallies.diagnostics.malformed_sov_rows += 1;
            continue;
        }
        let votes = match parse_precinct_votes(row, candidates, lineno) {
            Ok(v) => v,
            Err(e) => {
                warn!("Skipping row: {}", e);
                tallies.diagnostics.malformed_sov_rows += 1;
                continue;
            }
        };
        let total: f64 = votes.values().sum();
        if total <= 0.0 {
            tallies.diagnostics.zero_total_precincts += 1;
            continue;
        }

        tallies.county.add(&votes, total, 1.0);

        let city = city_lookup.resolve(precinct_id);
        if city == CityResolution::NotFound {
            tallies.diagnostics.precincts_without_city += 1;
        }
        scope_tally(&mut tallies.cities, city.aggregation_city()).add(&votes, total, 1.0);

        tallies.precincts.push(PrecinctRecord {
            precinct: precinct_id.to_string(),
            total: round_votes(total),
            city: city.listed_city().to_string(),
            votes: votes.iter().map(|(c, v)| (c.clone(), round_votes(*v))).collect(),
        });

        let distribution = match weights.get(precinct_id) {
            Some(w) => w,
            None => {
                debug!("accumulate_year: precinct {} has no ZIP weights", precinct_id);
                tallies.diagnostics.precincts_without_weights += 1;
                &unknown_only
            }
        };
        for (zip, w) in distribution.iter() {
            if *w <= 0.0 {
                continue;
            }
            scope_tally(&mut tallies.zips, zip).add(&votes, total, *w);
            tallies
                .zip_precincts
                .entry(zip.clone())
                .or_default()
                .insert(precinct_id.to_string());
        }
    }
    tallies.diagnostics.unknown_zip_votes = tallies.zips.get(UNKNOWN_ZIP).map_or(0.0, |t| t.total);
    tallies
}

/// Rounds to the nearest integer, ties to even.
pub fn round_votes(x: f64) -> i64 {
    x.round_ties_even() as i64
}

/// Rounds to 2 decimal places, ties to even.
pub fn round_percentage(x: f64) -> f64 {
    (x * 100.0).round_ties_even() / 100.0
}

/// The per-candidate counts and percentages of a scope. Candidates whose rounded
/// count is zero are left out.
pub fn candidate_stats(tally: &CandidateTally) -> BTreeMap<String, CandidateStats> {
    tally
        .votes
        .iter()
        .filter(|(_, v)| round_votes(**v) > 0)
        .map(|(cand, v)| {
            let percentage = if tally.total > 0.0 {
                round_percentage(v / tally.total * 100.0)
            } else {
                0.0
            };
            (
                cand.clone(),
                CandidateStats {
                    votes: round_votes(*v),
                    percentage,
                },
            )
        })
        .collect()
}

impl YearTallies {
    /// Rounds the tallies and drops the cities and ZIP codes under the reporting threshold.
    /// The unknown ZIP bucket is never reported.
    pub fn finalize(self, year: &str, county: &str, rules: &AggregationRules) -> (YearResult, YearDiagnostics) {
        let mut diagnostics = self.diagnostics;

        let mut by_city: BTreeMap<String, CityResult> = BTreeMap::new();
        for (city, tally) in self.cities.iter() {
            if tally.total < rules.minimum_scope_votes {
                debug!("finalize: city {} has only {} votes", city, tally.total);
                diagnostics.cities_below_threshold += 1;
                continue;
            }
            by_city.insert(
                city.clone(),
                CityResult {
                    total_votes: round_votes(tally.total),
                    candidates: candidate_stats(tally),
                },
            );
        }

        let mut by_zipcode: BTreeMap<String, ZipResult> = BTreeMap::new();
        for (zip, tally) in self.zips.iter() {
            if zip == UNKNOWN_ZIP {
                continue;
            }
            if tally.total < rules.minimum_scope_votes {
                debug!("finalize: ZIP {} has only {} votes", zip, tally.total);
                diagnostics.zips_below_threshold += 1;
                continue;
            }
            let precinct_ids: Vec<String> = self
                .zip_precincts
                .get(zip)
                .map(|s| s.iter().cloned().collect())
                .unwrap_or_default();
            by_zipcode.insert(
                zip.clone(),
                ZipResult {
                    total_votes: round_votes(tally.total),
                    candidates: candidate_stats(tally),
                    precinct_count: precinct_ids.len(),
                    precinct_ids,
                },
            );
        }

        info!(
            "{}: aggregated {} precincts into {} cities and {} ZIP codes",
            year,
            self.precincts.len(),
            by_city.len(),
            by_zipcode.len()
        );

        let result = YearResult {
            year: year.to_string(),
            county: county.to_string(),
            total_votes: round_votes(self.county.total),
            num_precincts: self.precincts.len(),
            candidates: candidate_stats(&self.county),
            precincts: self.precincts,
            by_city,
            by_zipcode,
        };
        (result, diagnostics)
    }
}

/// Accumulates and finalizes one election year.
pub fn aggregate_year(
    year: &str,
    county: &str,
    sov_rows: &[SovRow],
    candidates: &[CandidateColumn],
    city_lookup: &CityLookup,
    weights: &PrecinctWeights,
    rules: &AggregationRules,
) -> (YearResult, YearDiagnostics) {
    accumulate_year(sov_rows, candidates, city_lookup, weights).finalize(year, county, rules)
}

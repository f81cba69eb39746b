use log::{info, warn};
use rayon::prelude::*;
use std::collections::BTreeMap;

use crate::aggregate::{accumulate_year, CityLookup};
use crate::config::*;
use crate::error::*;
use crate::index::{TractCentroidIndex, ZipPolygonIndex};
use crate::mapper::{map_tracts_to_zips, TractZipMap};
use crate::weights::build_precinct_weights;

/// The feeds of one election year, as provided by the I/O layer.
///
/// A failure should be reported as [`InterpolationError::DataUnavailable`]: it
/// excludes this year only.
pub trait YearSource: Send + Sync {
    fn allocation_rows(&self) -> InterpolationResult<Vec<AllocationRow>>;
    fn city_rows(&self) -> InterpolationResult<Vec<CityRow>>;
    fn sov_rows(&self) -> InterpolationResult<Vec<SovRow>>;
}

/// One election year to process.
pub struct YearConfig {
    pub year: String,
    /// Statement of votes columns and the candidates they belong to. They change every year.
    pub candidates: Vec<CandidateColumn>,
    pub source: Box<dyn YearSource>,
}

/// The (possibly partial) output of a run.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct PipelineOutput {
    pub elections: BTreeMap<String, YearResult>,
    pub diagnostics: Diagnostics,
}

impl PipelineOutput {
    pub fn into_document(self, meta: DocumentMeta) -> (ElectionDocument, Diagnostics) {
        let doc = ElectionDocument {
            meta,
            elections: self.elections,
        };
        (doc, self.diagnostics)
    }
}

/// Runs the interpolation of several election years against a single geography frame.
///
/// The geography (tract centroids, ZIP polygons and the tract to ZIP mapping) is built
/// once in [`ElectionPipeline::new`] and shared read-only by all the years.
#[derive(Debug, Clone)]
pub struct ElectionPipeline {
    county_name: String,
    county_fips: String,
    rules: AggregationRules,
    tract_to_zip: TractZipMap,
    tracts_indexed: usize,
    zips_indexed: usize,
}

impl ElectionPipeline {
    /// Fails if either geography feed is empty or has nothing for the county:
    /// no year can be interpolated without it.
    pub fn new(
        gazetteer: &[GazetteerRow],
        zip_boundaries: &[ZipBoundaryRow],
        geography: &GeographyRules,
        county_name: &str,
        rules: AggregationRules,
    ) -> InterpolationResult<ElectionPipeline> {
        let tracts = TractCentroidIndex::build(gazetteer, &geography.county_fips)?;
        let zips = ZipPolygonIndex::build(zip_boundaries, geography.zip_prefixes.as_deref())?;
        let tract_to_zip = map_tracts_to_zips(&tracts, &zips, geography.use_bounding_boxes);
        Ok(ElectionPipeline {
            county_name: county_name.to_string(),
            county_fips: geography.county_fips.clone(),
            rules,
            tract_to_zip,
            tracts_indexed: tracts.len(),
            zips_indexed: zips.len(),
        })
    }

    pub fn tract_to_zip(&self) -> &TractZipMap {
        &self.tract_to_zip
    }

    /// Processes one year. The weights are rebuilt from this year's own allocation table.
    pub fn run_year(&self, year: &YearConfig) -> InterpolationResult<(YearResult, YearDiagnostics)> {
        info!("Processing {}", year.year);
        let allocation = year.source.allocation_rows()?;
        let (weights, weight_stats) = build_precinct_weights(
            &allocation,
            &self.tract_to_zip,
            &self.county_fips,
            self.rules.share_units,
        );

        let (city_lookup, city_lookup_unavailable) = match year.source.city_rows() {
            Ok(rows) => (CityLookup::from_rows(&rows), false),
            Err(e) => {
                warn!(
                    "{}: {}, all precincts will be {}",
                    year.year, e, UNINCORPORATED
                );
                (CityLookup::default(), true)
            }
        };

        let sov = year.source.sov_rows()?;
        let tallies = accumulate_year(&sov, &year.candidates, &city_lookup, &weights);
        let (result, mut diagnostics) = tallies.finalize(&year.year, &self.county_name, &self.rules);

        diagnostics.malformed_allocation_rows = weight_stats.malformed_rows;
        diagnostics.non_positive_allocation_rows = weight_stats.non_positive_rows;
        diagnostics.unresolved_allocation_rows = weight_stats.unresolved_rows;
        diagnostics.share_sum_mismatches = weight_stats.share_sum_mismatches;
        diagnostics.weighted_precincts = weights.len();
        diagnostics.city_lookup_unavailable = city_lookup_unavailable;
        Ok((result, diagnostics))
    }

    /// Processes all the years in parallel. A year whose feeds cannot be read is left out
    /// of the result and reported in the diagnostics; the other years are not affected.
    pub fn run(&self, years: &[YearConfig]) -> PipelineOutput {
        let outcomes: Vec<(String, InterpolationResult<(YearResult, YearDiagnostics)>)> = years
            .par_iter()
            .map(|y| (y.year.clone(), self.run_year(y)))
            .collect();

        let mut output = PipelineOutput::default();
        output.diagnostics.tracts_indexed = self.tracts_indexed;
        output.diagnostics.zips_indexed = self.zips_indexed;
        output.diagnostics.tracts_unresolved = self.tract_to_zip.unresolved().len();
        // The outcomes are in configuration order: the last occurrence of a year replaces
        // the earlier ones, whether it succeeded or not.
        for (year, outcome) in outcomes.into_iter() {
            let had_result = output.elections.remove(&year).is_some();
            let had_failure = output.diagnostics.failed_years.remove(&year).is_some();
            output.diagnostics.years.remove(&year);
            if had_result || had_failure {
                warn!("Year {} is configured more than once, keeping the last one", year);
            }
            match outcome {
                Ok((result, diagnostics)) => {
                    output.elections.insert(year.clone(), result);
                    output.diagnostics.years.insert(year, diagnostics);
                }
                Err(e) => {
                    warn!("Excluding {}: {}", year, e);
                    output.diagnostics.failed_years.insert(year, e.to_string());
                }
            }
        }
        info!(
            "Processed {} years ({} excluded)",
            output.elections.len(),
            output.diagnostics.failed_years.len()
        );
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MemorySource {
        allocation: Option<Vec<AllocationRow>>,
        cities: Option<Vec<CityRow>>,
        sov: Option<Vec<SovRow>>,
    }

    fn unavailable<T>(feed: &str) -> InterpolationResult<T> {
        DataUnavailableSnafu {
            feed,
            reason: "connection reset",
        }
        .fail()
    }

    impl YearSource for MemorySource {
        fn allocation_rows(&self) -> InterpolationResult<Vec<AllocationRow>> {
            self.allocation.clone().map_or_else(|| unavailable("allocation"), Ok)
        }
        fn city_rows(&self) -> InterpolationResult<Vec<CityRow>> {
            self.cities.clone().map_or_else(|| unavailable("cities"), Ok)
        }
        fn sov_rows(&self) -> InterpolationResult<Vec<SovRow>> {
            self.sov.clone().map_or_else(|| unavailable("sov"), Ok)
        }
    }

    fn square(zip: &str, x0: f64) -> ZipBoundaryRow {
        ZipBoundaryRow {
            zip_code: zip.to_string(),
            rings: vec![vec![(x0, 0.0), (x0 + 1.0, 0.0), (x0 + 1.0, 1.0), (x0, 1.0)]],
        }
    }

    fn pipeline() -> ElectionPipeline {
        let _ = env_logger::builder().is_test(true).try_init();
        let gazetteer = vec![
            GazetteerRow {
                tract_id: "06073000100".to_string(),
                longitude: 0.5,
                latitude: 0.5,
            },
            GazetteerRow {
                tract_id: "06073000200".to_string(),
                longitude: 2.5,
                latitude: 0.5,
            },
        ];
        let zips = vec![square("90001", 0.0), square("90002", 2.0)];
        ElectionPipeline::new(
            &gazetteer,
            &zips,
            &GeographyRules::for_county("06073"),
            "San Diego",
            AggregationRules::DEFAULT_RULES,
        )
        .unwrap()
    }

    fn alloc(precinct: &str, tract: &str, share: &str) -> AllocationRow {
        AllocationRow {
            precinct_id: precinct.to_string(),
            tract_suffix: tract.to_string(),
            share: share.to_string(),
        }
    }

    fn sov(precinct: &str, a: u32, b: u32) -> SovRow {
        let cells: HashMap<String, String> = vec![
            ("PRSDEM01".to_string(), a.to_string()),
            ("PRSREP01".to_string(), b.to_string()),
        ]
        .into_iter()
        .collect();
        SovRow {
            precinct_id: precinct.to_string(),
            cells,
        }
    }

    fn candidates(a: &str, b: &str) -> Vec<CandidateColumn> {
        vec![
            CandidateColumn {
                column: "PRSDEM01".to_string(),
                name: a.to_string(),
            },
            CandidateColumn {
                column: "PRSREP01".to_string(),
                name: b.to_string(),
            },
        ]
    }

    fn year(label: &str, source: MemorySource) -> YearConfig {
        YearConfig {
            year: label.to_string(),
            candidates: candidates("A", "B"),
            source: Box::new(source),
        }
    }

    fn good_source() -> MemorySource {
        MemorySource {
            allocation: Some(vec![alloc("P1", "100", "100"), alloc("P2", "200", "100")]),
            cities: Some(vec![
                CityRow {
                    precinct_id: "P1".to_string(),
                    city: "CityX".to_string(),
                },
                CityRow {
                    precinct_id: "P2".to_string(),
                    city: "CityX".to_string(),
                },
            ]),
            sov: Some(vec![sov("P1", 60, 40), sov("P2", 10, 40)]),
        }
    }

    #[test]
    fn end_to_end_two_precincts() {
        let p = pipeline();
        let out = p.run(&[year("2024", good_source())]);
        let res = &out.elections["2024"];
        assert_eq!(res.total_votes, 150);
        assert_eq!(res.candidates["A"].percentage, 46.67);
        assert_eq!(res.candidates["B"].percentage, 53.33);
        assert_eq!(res.by_zipcode["90001"].total_votes, 100);
        assert_eq!(res.by_zipcode["90002"].candidates["B"].votes, 40);
        assert_eq!(res.by_city["CityX"].total_votes, 150);
        assert_eq!(out.diagnostics.tracts_indexed, 2);
        assert_eq!(out.diagnostics.zips_indexed, 2);
        assert_eq!(out.diagnostics.years["2024"].weighted_precincts, 2);
    }

    #[test]
    fn failed_year_does_not_abort_others() {
        let p = pipeline();
        let broken = MemorySource {
            sov: None,
            ..good_source()
        };
        let no_blocks = MemorySource {
            allocation: None,
            ..good_source()
        };
        let out = p.run(&[
            year("2020", broken),
            year("2024", good_source()),
            year("2016", no_blocks),
        ]);
        assert_eq!(out.elections.len(), 1);
        assert!(out.elections.contains_key("2024"));
        assert_eq!(out.diagnostics.failed_years.len(), 2);
        assert!(out.diagnostics.failed_years["2020"].contains("sov"));
    }

    #[test]
    fn missing_city_lookup_is_not_fatal() {
        let p = pipeline();
        let source = MemorySource {
            cities: None,
            ..good_source()
        };
        let out = p.run(&[year("2024", source)]);
        let res = &out.elections["2024"];
        assert_eq!(res.by_city[UNINCORPORATED].total_votes, 150);
        assert!(out.diagnostics.years["2024"].city_lookup_unavailable);
    }

    #[test]
    fn weights_are_rebuilt_per_year() {
        let p = pipeline();
        // In 2020 precinct P1 sits in the second tract.
        let redistricted = MemorySource {
            allocation: Some(vec![alloc("P1", "200", "1")]),
            sov: Some(vec![sov("P1", 60, 40)]),
            ..good_source()
        };
        let out = p.run(&[year("2024", good_source()), year("2020", redistricted)]);
        assert_eq!(out.elections["2024"].by_zipcode["90001"].total_votes, 100);
        assert!(!out.elections["2020"].by_zipcode.contains_key("90001"));
        assert_eq!(out.elections["2020"].by_zipcode["90002"].total_votes, 100);
    }

    #[test]
    fn zero_share_precinct_lands_in_unknown() {
        let p = pipeline();
        let source = MemorySource {
            allocation: Some(vec![alloc("P1", "100", "0"), alloc("P2", "200", "1")]),
            ..good_source()
        };
        let out = p.run(&[year("2024", source)]);
        let res = &out.elections["2024"];
        let diag = &out.diagnostics.years["2024"];
        assert!(!res.by_zipcode.contains_key("90001"));
        assert!(!res.by_zipcode.contains_key(UNKNOWN_ZIP));
        assert_eq!(diag.precincts_without_weights, 1);
        assert_eq!(diag.unknown_zip_votes, 100.0);
        assert_eq!(res.total_votes, 150);
    }

    #[test]
    fn last_occurrence_of_a_year_wins() {
        let p = pipeline();
        let broken = MemorySource {
            sov: None,
            ..good_source()
        };
        let out = p.run(&[year("2024", good_source()), year("2024", broken)]);
        assert!(!out.elections.contains_key("2024"));
        assert!(!out.diagnostics.years.contains_key("2024"));
        assert!(out.diagnostics.failed_years.contains_key("2024"));

        let broken = MemorySource {
            sov: None,
            ..good_source()
        };
        let out = p.run(&[year("2024", broken), year("2024", good_source())]);
        assert_eq!(out.elections["2024"].total_votes, 150);
        assert!(out.diagnostics.failed_years.is_empty());
    }

    #[test]
    fn geography_failure_is_reported() {
        let err = ElectionPipeline::new(
            &[],
            &[square("90001", 0.0)],
            &GeographyRules::for_county("06073"),
            "San Diego",
            AggregationRules::DEFAULT_RULES,
        )
        .unwrap_err();
        assert!(matches!(err, InterpolationError::DataUnavailable { .. }));
    }

    #[test]
    fn document_wraps_years() {
        let p = pipeline();
        let out = p.run(&[year("2024", good_source())]);
        let meta = DocumentMeta {
            source: "test".to_string(),
            county: "San Diego".to_string(),
            granularity: "precinct".to_string(),
            generated: "2025-01-07T00:00:00Z".to_string(),
        };
        let (doc, diagnostics) = out.into_document(meta);
        assert_eq!(doc.elections.len(), 1);
        assert_eq!(diagnostics.failed_years.len(), 0);
    }
}

use log::{debug, info, warn};

use snafu::{prelude::*, Snafu};
use zip_interpolation::*;

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::voting::config_reader::*;
use crate::voting::file_source::FileYearSource;

pub mod config_reader;
mod file_source;
mod io_common;
mod io_csv;
mod io_gazetteer;
mod io_geojson;
mod io_xlsx;

#[derive(Debug, Snafu)]
pub enum ZipVoteError {
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON in {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error serializing the election document"))]
    WritingJson { source: serde_json::Error },
    #[snafu(display("Error writing file {path}"))]
    WritingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error opening delimited file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading the header of {path}"))]
    CsvHeader { source: csv::Error, path: String },
    #[snafu(display("Error opening Excel file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("Excel file {path} has no usable worksheet or no header row"))]
    EmptyExcel { path: String },
    #[snafu(display("Column {column} not found in {path}"))]
    MissingColumn { column: String, path: String },
    #[snafu(display("Cannot find the directory of {path}"))]
    MissingParentDir { path: String },
    #[snafu(display("{source}"))]
    Interpolation { source: InterpolationError },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type ZipVoteResult<T> = Result<T, ZipVoteError>;

/// Resolves a path of the configuration against the directory of the configuration file.
fn config_relative(root: &Path, p: &str) -> String {
    let pb: PathBuf = [root, Path::new(p)].iter().collect();
    pb.as_path().display().to_string()
}

pub fn read_config(config_path: &str) -> ZipVoteResult<ZipVoteConfig> {
    let config_str = fs::read_to_string(config_path).context(OpeningJsonSnafu { path: config_path })?;
    let config: ZipVoteConfig =
        serde_json::from_str(&config_str).context(ParsingJsonSnafu { path: config_path })?;
    debug!("config: {:?}", config);
    Ok(config)
}

fn build_years(config: &ZipVoteConfig, root: &Path) -> ZipVoteResult<Vec<YearConfig>> {
    let mut years: Vec<YearConfig> = Vec::new();
    for election in config.elections.iter() {
        if election.candidates.is_empty() {
            whatever!("Election {} has no candidate column", election.year);
        }
        let source = FileYearSource {
            year: election.year.clone(),
            provider: election.provider()?,
            block_map_path: config_relative(root, &election.block_map_path),
            sov_path: config_relative(root, &election.sov_path),
            city_map_path: election
                .city_map_path
                .as_ref()
                .map(|p| config_relative(root, p)),
            excel_worksheet_name: election.excel_worksheet_name.clone(),
            columns: election.columns.clone().unwrap_or_default(),
            candidates: election.candidates.clone(),
        };
        years.push(YearConfig {
            year: election.year.clone(),
            candidates: election.candidates.clone(),
            source: Box::new(source),
        });
    }
    Ok(years)
}

/// Reads the geography, runs every configured year and assembles the election document.
///
/// Only the geography and the configuration itself can make this fail: years whose
/// feeds are unavailable are left out and reported in the diagnostics.
pub fn build_document(
    config: &ZipVoteConfig,
    config_path: &str,
    rules: AggregationRules,
) -> ZipVoteResult<(ElectionDocument, Diagnostics)> {
    let root_p = Path::new(config_path)
        .parent()
        .context(MissingParentDirSnafu { path: config_path })?;

    let geo = &config.geography;
    let gazetteer = io_gazetteer::read_gazetteer(&config_relative(root_p, &geo.gazetteer_path))?;
    let zip_boundaries = io_geojson::read_zip_boundaries(
        &config_relative(root_p, &geo.zip_boundaries_path),
        geo.zip_code_property(),
    )?;

    let pipeline = ElectionPipeline::new(
        &gazetteer,
        &zip_boundaries,
        &geo.geography_rules(),
        &config.output_settings.county,
        rules,
    )
    .context(InterpolationSnafu {})?;

    let years = build_years(config, root_p)?;
    let output = pipeline.run(&years);

    let meta = DocumentMeta {
        source: config.output_settings.source(),
        county: config.output_settings.county.clone(),
        granularity: config.output_settings.granularity(),
        generated: chrono::Utc::now().to_rfc3339(),
    };
    Ok(output.into_document(meta))
}

fn log_coverage(diagnostics: &Diagnostics) {
    info!(
        "Geography: {} tracts, {} ZIP codes, {} tracts outside every ZIP code",
        diagnostics.tracts_indexed, diagnostics.zips_indexed, diagnostics.tracts_unresolved
    );
    for (year, d) in diagnostics.years.iter() {
        info!(
            "{}: {} weighted precincts, {} precincts without weights, {} weighted votes in unknown ZIP codes",
            year, d.weighted_precincts, d.precincts_without_weights, d.unknown_zip_votes
        );
        if d.malformed_allocation_rows + d.malformed_sov_rows > 0 {
            warn!(
                "{}: skipped {} malformed allocation rows and {} malformed statement of votes rows",
                year, d.malformed_allocation_rows, d.malformed_sov_rows
            );
        }
        if !d.missing_candidate_columns.is_empty() {
            warn!(
                "{}: candidate columns missing from the statement of votes: {}",
                year,
                d.missing_candidate_columns.join(", ")
            );
        }
        if d.precincts_without_city > 0 {
            warn!(
                "{}: {} precincts are missing from the city lookup",
                year, d.precincts_without_city
            );
        }
    }
    for (year, reason) in diagnostics.failed_years.iter() {
        warn!("{}: excluded ({})", year, reason);
    }
}

fn write_json(js: &JSValue, destination: &str) -> ZipVoteResult<()> {
    let pretty = serde_json::to_string_pretty(js).context(WritingJsonSnafu {})?;
    if destination == "stdout" {
        println!("{}", pretty);
    } else {
        fs::write(destination, pretty).context(WritingFileSnafu { path: destination })?;
        info!("Wrote {}", destination);
    }
    Ok(())
}

/// Reads a reference document. Only its elections are compared.
pub fn read_reference(path: &str) -> ZipVoteResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    Ok(match js.get("elections") {
        Some(elections) => elections.clone(),
        None => js,
    })
}

/// Compares the elections of a document with a reference and prints the differences.
pub fn check_reference(doc: &ElectionDocument, reference_path: &str) -> ZipVoteResult<()> {
    let computed = serde_json::to_value(&doc.elections).context(WritingJsonSnafu {})?;
    let reference = read_reference(reference_path)?;
    let pretty_computed = serde_json::to_string_pretty(&computed).context(WritingJsonSnafu {})?;
    let pretty_reference = serde_json::to_string_pretty(&reference).context(WritingJsonSnafu {})?;
    if pretty_reference != pretty_computed {
        warn!("Found differences with the reference document");
        print_diff(pretty_reference.as_str(), pretty_computed.as_str(), "\n");
        whatever!("Difference detected between the computed elections and the reference")
    }
    info!("The computed elections match {}", reference_path);
    Ok(())
}

pub fn run_elections(
    config_path: &str,
    out: Option<String>,
    reference: Option<String>,
    diagnostics_out: Option<String>,
    min_scope_votes: Option<f64>,
) -> ZipVoteResult<()> {
    let config = read_config(config_path)?;
    let mut rules = config.aggregation_rules()?;
    if let Some(x) = min_scope_votes {
        rules.minimum_scope_votes = check_minimum_scope_votes(x)?;
    }

    let (doc, diagnostics) = build_document(&config, config_path, rules)?;
    log_coverage(&diagnostics);

    let destination = match (out, config.output_settings.output_path.clone()) {
        (Some(o), _) => o,
        (None, Some(p)) => {
            let root_p = Path::new(config_path)
                .parent()
                .context(MissingParentDirSnafu { path: config_path })?;
            config_relative(root_p, &p)
        }
        (None, None) => "stdout".to_string(),
    };
    let js = serde_json::to_value(&doc).context(WritingJsonSnafu {})?;
    write_json(&js, &destination)?;

    if let Some(p) = diagnostics_out {
        let js = serde_json::to_value(&diagnostics).context(WritingJsonSnafu {})?;
        write_json(&js, &p)?;
    }

    if let Some(p) = reference {
        check_reference(&doc, &p)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_dir() -> String {
        format!("{}/tests/data", env!("CARGO_MANIFEST_DIR"))
    }

    fn run_fixture(test_name: &str) -> (ElectionDocument, Diagnostics) {
        let _ = env_logger::builder().is_test(true).try_init();
        let config_path = format!("{}/{}/{}_config.json", test_dir(), test_name, test_name);
        let config = read_config(&config_path).unwrap();
        let rules = config.aggregation_rules().unwrap();
        let (doc, diagnostics) = build_document(&config, &config_path, rules).unwrap();
        let summary_path = format!("{}/{}/{}_expected_summary.json", test_dir(), test_name, test_name);
        check_reference(&doc, &summary_path).unwrap();
        (doc, diagnostics)
    }

    #[test]
    fn sample_county() {
        let (doc, diagnostics) = run_fixture("sample_county");
        assert_eq!(doc.meta.county, "San Diego");
        assert_eq!(diagnostics.tracts_indexed, 4);
        assert_eq!(diagnostics.zips_indexed, 4);
        assert_eq!(diagnostics.tracts_unresolved, 1);

        let d = &diagnostics.years["2024"];
        assert_eq!(d.weighted_precincts, 3);
        assert_eq!(d.unresolved_allocation_rows, 1);
        assert_eq!(d.non_positive_allocation_rows, 1);
        assert_eq!(d.malformed_sov_rows, 1);
        assert_eq!(d.zero_total_precincts, 1);
        assert_eq!(d.precincts_without_weights, 2);
        assert_eq!(d.precincts_without_city, 1);
        assert_eq!(d.unknown_zip_votes, 50.0);
        assert_eq!(d.cities_below_threshold, 1);
        assert_eq!(d.zips_below_threshold, 1);
        assert!(d.missing_candidate_columns.is_empty());

        assert!(!doc.elections.contains_key("2020"));
        assert!(diagnostics.failed_years.contains_key("2020"));
    }

    #[test]
    fn reference_mismatch_is_an_error() {
        let _ = env_logger::builder().is_test(true).try_init();
        let config_path = format!("{}/sample_county/sample_county_config.json", test_dir());
        let config = read_config(&config_path).unwrap();
        let rules = AggregationRules {
            minimum_scope_votes: 5.0,
            ..config.aggregation_rules().unwrap()
        };
        let (doc, _) = build_document(&config, &config_path, rules).unwrap();
        // El Cajon is now reported.
        assert!(doc.elections["2024"].by_city.contains_key("El Cajon"));
        let summary_path = format!("{}/sample_county/sample_county_expected_summary.json", test_dir());
        assert!(check_reference(&doc, &summary_path).is_err());
    }

    #[test]
    fn invalid_threshold_override_is_rejected() {
        let config_path = format!("{}/sample_county/sample_county_config.json", test_dir());
        let res = run_elections(&config_path, Some("stdout".to_string()), None, None, Some(f64::NAN));
        assert!(res.is_err());
    }

    #[test]
    fn missing_geography_aborts() {
        let config_path = format!("{}/missing_geography/missing_geography_config.json", test_dir());
        let config = read_config(&config_path).unwrap();
        let res = build_document(&config, &config_path, AggregationRules::DEFAULT_RULES);
        assert!(res.is_err());
    }
}

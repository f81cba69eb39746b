use crate::voting::*;

use serde::{Deserialize, Serialize};

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "outputPath")]
    pub output_path: Option<String>,
    pub source: Option<String>,
    pub county: String,
    pub granularity: Option<String>,
}

impl OutputSettings {
    pub fn source(&self) -> String {
        self.source
            .clone()
            .unwrap_or_else(|| "Registrar of Voters".to_string())
    }

    pub fn granularity(&self) -> String {
        self.granularity
            .clone()
            .unwrap_or_else(|| "precinct".to_string())
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct GeographySettings {
    #[serde(rename = "countyFips")]
    pub county_fips: String,
    #[serde(rename = "gazetteerPath")]
    pub gazetteer_path: String,
    #[serde(rename = "zipBoundariesPath")]
    pub zip_boundaries_path: String,
    #[serde(rename = "zipCodeProperty")]
    pub zip_code_property: Option<String>,
    #[serde(rename = "zipPrefixes")]
    pub zip_prefixes: Option<Vec<String>>,
    #[serde(rename = "useBoundingBoxes")]
    pub use_bounding_boxes: Option<bool>,
}

impl GeographySettings {
    pub fn zip_code_property(&self) -> &str {
        self.zip_code_property.as_deref().unwrap_or("ZIPCODE")
    }

    pub fn geography_rules(&self) -> GeographyRules {
        GeographyRules {
            county_fips: self.county_fips.trim().to_string(),
            zip_prefixes: self.zip_prefixes.clone(),
            use_bounding_boxes: self.use_bounding_boxes.unwrap_or(true),
        }
    }
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RulesSettings {
    #[serde(rename = "minimumScopeVotes")]
    pub minimum_scope_votes: Option<f64>,
    #[serde(rename = "shareUnits")]
    pub share_units: Option<String>,
}

/// Names of the columns in the tables of one year. The defaults are the ones of the
/// statewide database.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSettings {
    #[serde(rename = "precinctColumn", default = "default_precinct_column")]
    pub precinct: String,
    #[serde(rename = "tractColumn", default = "default_tract_column")]
    pub tract: String,
    #[serde(rename = "shareColumn", default = "default_share_column")]
    pub share: String,
    #[serde(rename = "cityColumn", default = "default_city_column")]
    pub city: String,
}

fn default_precinct_column() -> String {
    "srprec".to_string()
}

fn default_tract_column() -> String {
    "tract".to_string()
}

fn default_share_column() -> String {
    "pctsrprec".to_string()
}

fn default_city_column() -> String {
    "city".to_string()
}

impl Default for ColumnSettings {
    fn default() -> Self {
        ColumnSettings {
            precinct: default_precinct_column(),
            tract: default_tract_column(),
            share: default_share_column(),
            city: default_city_column(),
        }
    }
}

/// The file format of the tables of a year.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Provider {
    /// Comma separated, or tab separated for `.tsv` and `.txt` files.
    Csv,
    /// The statement of votes is an Excel workbook. The other tables are delimited files.
    Xlsx,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ElectionSettings {
    pub year: String,
    #[serde(rename = "provider")]
    pub _provider: Option<String>,
    #[serde(rename = "blockMapPath")]
    pub block_map_path: String,
    #[serde(rename = "sovPath")]
    pub sov_path: String,
    #[serde(rename = "cityMapPath")]
    pub city_map_path: Option<String>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
    pub columns: Option<ColumnSettings>,
    pub candidates: Vec<CandidateColumn>,
}

impl ElectionSettings {
    pub fn provider(&self) -> ZipVoteResult<Provider> {
        match self._provider.as_deref() {
            None | Some("csv") => Ok(Provider::Csv),
            Some("xlsx") => Ok(Provider::Xlsx),
            Some(x) => whatever!("unknown provider for {}: {}", self.year, x),
        }
    }
}

/// The reporting threshold must be a finite, non-negative number of votes.
pub fn check_minimum_scope_votes(x: f64) -> ZipVoteResult<f64> {
    if !(x.is_finite() && x >= 0.0) {
        whatever!("the minimum scope votes must be a non-negative number, got {}", x);
    }
    Ok(x)
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ZipVoteConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: OutputSettings,
    pub geography: GeographySettings,
    pub rules: Option<RulesSettings>,
    pub elections: Vec<ElectionSettings>,
}

impl ZipVoteConfig {
    pub fn aggregation_rules(&self) -> ZipVoteResult<AggregationRules> {
        let mut rules = AggregationRules::DEFAULT_RULES;
        if let Some(r) = &self.rules {
            if let Some(x) = r.minimum_scope_votes {
                rules.minimum_scope_votes = check_minimum_scope_votes(x)?;
            }
            rules.share_units = match r.share_units.as_deref() {
                None | Some("auto") => ShareUnits::Auto,
                Some("fraction") => ShareUnits::Fraction,
                Some("percent") => ShareUnits::Percent,
                Some(x) => whatever!("unknown share units: {}", x),
            };
        }
        Ok(rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_minimal_config() {
        let js = r#"{
            "outputSettings": {"county": "San Diego"},
            "geography": {"countyFips": "06073", "gazetteerPath": "g.txt", "zipBoundariesPath": "z.geojson"},
            "elections": [
                {"year": "2024", "blockMapPath": "b.csv", "sovPath": "s.csv",
                 "candidates": [{"column": "PRSDEM01", "name": "Harris"}]}
            ]
        }"#;
        let config: ZipVoteConfig = serde_json::from_str(js).unwrap();
        assert_eq!(config.aggregation_rules().unwrap(), AggregationRules::DEFAULT_RULES);
        assert_eq!(config.geography.zip_code_property(), "ZIPCODE");
        assert!(config.geography.geography_rules().use_bounding_boxes);
        assert_eq!(config.output_settings.granularity(), "precinct");
        let election = &config.elections[0];
        assert_eq!(election.provider().unwrap(), Provider::Csv);
        assert!(election.columns.is_none());
    }

    #[test]
    fn reads_rules_and_columns() {
        let js = r#"{
            "outputSettings": {"county": "San Diego", "outputPath": "out.json"},
            "geography": {"countyFips": "06073", "gazetteerPath": "g.txt", "zipBoundariesPath": "z.geojson",
                          "zipPrefixes": ["919", "920"], "useBoundingBoxes": false},
            "rules": {"minimumScopeVotes": 25, "shareUnits": "percent"},
            "elections": [
                {"year": "2020", "provider": "xlsx", "blockMapPath": "b.csv", "sovPath": "s.xlsx",
                 "columns": {"precinctColumn": "SRPREC_KEY"},
                 "candidates": [{"column": "PRSDEM01", "name": "Biden"}]}
            ]
        }"#;
        let config: ZipVoteConfig = serde_json::from_str(js).unwrap();
        let rules = config.aggregation_rules().unwrap();
        assert_eq!(rules.minimum_scope_votes, 25.0);
        assert_eq!(rules.share_units, ShareUnits::Percent);
        let geo = config.geography.geography_rules();
        assert_eq!(geo.zip_prefixes, Some(vec!["919".to_string(), "920".to_string()]));
        assert!(!geo.use_bounding_boxes);
        let election = &config.elections[0];
        assert_eq!(election.provider().unwrap(), Provider::Xlsx);
        let columns = election.columns.clone().unwrap();
        assert_eq!(columns.precinct, "SRPREC_KEY");
        assert_eq!(columns.share, "pctsrprec");
    }

    #[test]
    fn rejects_unknown_settings() {
        let js = r#"{
            "outputSettings": {"county": "San Diego"},
            "geography": {"countyFips": "06073", "gazetteerPath": "g.txt", "zipBoundariesPath": "z.geojson"},
            "rules": {"shareUnits": "permille"},
            "elections": [
                {"year": "2024", "provider": "dbf", "blockMapPath": "b.csv", "sovPath": "s.csv", "candidates": []}
            ]
        }"#;
        let config: ZipVoteConfig = serde_json::from_str(js).unwrap();
        assert!(config.aggregation_rules().is_err());
        assert!(config.elections[0].provider().is_err());
    }

    #[test]
    fn checks_minimum_scope_votes() {
        assert_eq!(check_minimum_scope_votes(0.0).unwrap(), 0.0);
        assert_eq!(check_minimum_scope_votes(25.0).unwrap(), 25.0);
        assert!(check_minimum_scope_votes(f64::NAN).is_err());
        assert!(check_minimum_scope_votes(f64::INFINITY).is_err());
        assert!(check_minimum_scope_votes(-1.0).is_err());
    }
}

// Tables read from files, and their conversion to the rows of the interpolation.

use std::collections::HashMap;
use std::path::Path;

use crate::voting::config_reader::ColumnSettings;
use crate::voting::*;

/// A table with a header row. All the cells are kept as text.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Table {
    pub path: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Finds a column, ignoring the case and the surrounding whitespace of the header.
    pub fn find_column(&self, name: &str) -> Option<usize> {
        let target = name.trim().to_lowercase();
        self.header
            .iter()
            .position(|h| h.trim().to_lowercase() == target)
    }

    pub fn column(&self, name: &str) -> ZipVoteResult<usize> {
        self.find_column(name).context(MissingColumnSnafu {
            column: name,
            path: self.path.clone(),
        })
    }
}

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

fn cell(row: &[String], idx: usize) -> String {
    row.get(idx).map(|s| s.trim().to_string()).unwrap_or_default()
}

pub fn allocation_rows(table: &Table, columns: &ColumnSettings) -> ZipVoteResult<Vec<AllocationRow>> {
    let precinct_idx = table.column(&columns.precinct)?;
    let tract_idx = table.column(&columns.tract)?;
    let share_idx = table.column(&columns.share)?;
    let res: Vec<AllocationRow> = table
        .rows
        .iter()
        .map(|row| AllocationRow {
            precinct_id: cell(row, precinct_idx),
            tract_suffix: cell(row, tract_idx),
            share: cell(row, share_idx),
        })
        .collect();
    debug!(
        "allocation_rows: {}: {} rows",
        simplify_file_name(&table.path),
        res.len()
    );
    Ok(res)
}

pub fn city_rows(table: &Table, columns: &ColumnSettings) -> ZipVoteResult<Vec<CityRow>> {
    let precinct_idx = table.column(&columns.precinct)?;
    let city_idx = table.column(&columns.city)?;
    Ok(table
        .rows
        .iter()
        .map(|row| CityRow {
            precinct_id: cell(row, precinct_idx),
            city: cell(row, city_idx),
        })
        .collect())
}

/// Every row keeps all its cells, keyed by the header as written in the file. The
/// candidate columns found in the header are also keyed by their configured name.
pub fn sov_rows(
    table: &Table,
    columns: &ColumnSettings,
    candidates: &[CandidateColumn],
) -> ZipVoteResult<Vec<SovRow>> {
    let precinct_idx = table.column(&columns.precinct)?;
    let mut header: Vec<(String, usize)> = table
        .header
        .iter()
        .enumerate()
        .map(|(idx, h)| (h.trim().to_string(), idx))
        .collect();
    for cc in candidates.iter() {
        match table.find_column(&cc.column) {
            Some(idx) => header.push((cc.column.clone(), idx)),
            None => warn!(
                "{}: candidate column {} not found",
                simplify_file_name(&table.path),
                cc.column
            ),
        }
    }
    let res: Vec<SovRow> = table
        .rows
        .iter()
        .map(|row| {
            let cells: HashMap<String, String> = header
                .iter()
                .map(|(h, idx)| (h.clone(), cell(row, *idx)))
                .collect();
            SovRow {
                precinct_id: cell(row, precinct_idx),
                cells,
            }
        })
        .collect();
    debug!(
        "sov_rows: {}: {} rows",
        simplify_file_name(&table.path),
        res.len()
    );
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    fn table() -> Table {
        Table {
            path: "/data/2024/blocks.csv".to_string(),
            header: strings(&["SRPREC", " Tract ", "PCTSRPREC", "City"]),
            rows: vec![
                strings(&["P1", "100", "60", "San Diego"]),
                strings(&["P2", " 200"]),
            ],
        }
    }

    #[test]
    fn finds_columns_regardless_of_case() {
        let t = table();
        assert_eq!(t.find_column("srprec"), Some(0));
        assert_eq!(t.find_column("tract"), Some(1));
        assert_eq!(t.find_column("missing"), None);
        assert!(t.column("missing").is_err());
    }

    #[test]
    fn converts_short_rows() {
        let rows = allocation_rows(&table(), &ColumnSettings::default()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].tract_suffix, "200");
        assert_eq!(rows[1].share, "");
        let cities = city_rows(&table(), &ColumnSettings::default()).unwrap();
        assert_eq!(cities[0].city, "San Diego");
        assert_eq!(cities[1].city, "");
    }

    #[test]
    fn sov_rows_keep_all_cells() {
        let rows = sov_rows(&table(), &ColumnSettings::default(), &[]).unwrap();
        assert_eq!(rows[0].precinct_id, "P1");
        assert_eq!(rows[0].cells["PCTSRPREC"], "60");
        assert_eq!(rows[0].cells["Tract"], "100");
    }

    #[test]
    fn sov_rows_key_candidates_by_configured_name() {
        let t = Table {
            path: "sov.csv".to_string(),
            header: strings(&["SRPREC", "PRSDEM01", "PRSREP01"]),
            rows: vec![strings(&["P1", "60", "40"])],
        };
        let candidates = vec![
            CandidateColumn {
                column: "prsdem01".to_string(),
                name: "Harris".to_string(),
            },
            CandidateColumn {
                column: "PRSGRN01".to_string(),
                name: "Stein".to_string(),
            },
        ];
        let rows = sov_rows(&t, &ColumnSettings::default(), &candidates).unwrap();
        assert_eq!(rows[0].cells["prsdem01"], "60");
        assert_eq!(rows[0].cells["PRSDEM01"], "60");
        assert!(!rows[0].cells.contains_key("PRSGRN01"));
        assert_eq!(missing_candidate_columns(&rows, &candidates), vec!["PRSGRN01".to_string()]);
    }

    #[test]
    fn simplifies_file_names() {
        assert_eq!(simplify_file_name("/data/2024/blocks.csv"), "blocks.csv");
    }
}

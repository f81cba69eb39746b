// Census gazetteer of the tracts.

use crate::voting::io_common::{simplify_file_name, Table};
use crate::voting::io_csv::read_table;
use crate::voting::*;

/// Finds a header, ignoring the case and the padding. Some gazetteer releases pad the
/// last header (`INTPTLONG`) with spaces.
fn header_index(table: &Table, name: &str) -> ZipVoteResult<usize> {
    table
        .header
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
        .context(MissingColumnSnafu {
            column: name,
            path: table.path.clone(),
        })
}

pub fn gazetteer_rows(table: &Table) -> ZipVoteResult<Vec<GazetteerRow>> {
    let id_idx = header_index(table, "GEOID")?;
    let lat_idx = header_index(table, "INTPTLAT")?;
    let lon_idx = header_index(table, "INTPTLONG")?;

    let mut res: Vec<GazetteerRow> = Vec::with_capacity(table.rows.len());
    let mut skipped = 0;
    for (idx, row) in table.rows.iter().enumerate() {
        let get = |i: usize| row.get(i).map(|s| s.trim()).unwrap_or("");
        let tract_id = get(id_idx);
        match (get(lon_idx).parse::<f64>(), get(lat_idx).parse::<f64>()) {
            (Ok(longitude), Ok(latitude)) if !tract_id.is_empty() => res.push(GazetteerRow {
                tract_id: tract_id.to_string(),
                longitude,
                latitude,
            }),
            _ => {
                debug!("gazetteer_rows: skipping line {}: {:?}", idx + 2, row);
                skipped += 1;
            }
        }
    }
    if skipped > 0 {
        warn!(
            "{}: skipped {} tracts without a readable internal point",
            simplify_file_name(&table.path),
            skipped
        );
    }
    Ok(res)
}

/// Reads a tab separated gazetteer file.
pub fn read_gazetteer(path: &str) -> ZipVoteResult<Vec<GazetteerRow>> {
    let table = read_table(path, b'\t')?;
    gazetteer_rows(&table)
}

// Primitives for reading delimited files.

use std::path::Path;

use crate::voting::io_common::{simplify_file_name, Table};
use crate::voting::*;

/// Tab for `.tsv` and `.txt` files, comma otherwise.
pub fn delimiter_for(path: &str) -> u8 {
    match Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .as_deref()
    {
        Some("tsv") | Some("txt") => b'\t',
        _ => b',',
    }
}

/// Reads a delimited file with a header row.
///
/// Records that cannot be decoded are skipped with a warning. Short records are kept:
/// their missing cells read as empty.
pub fn read_table(path: &str, delimiter: u8) -> ZipVoteResult<Table> {
    debug!("read_table: path: {:?} delimiter: {:?}", path, delimiter as char);
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    let header: Vec<String> = rdr
        .headers()
        .context(CsvHeaderSnafu { path })?
        .iter()
        .map(|s| s.to_string())
        .collect();

    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut skipped = 0;
    for (idx, record_r) in rdr.records().enumerate() {
        // The header is line 1.
        let lineno = idx + 2;
        match record_r {
            Ok(record) => rows.push(record.iter().map(|s| s.to_string()).collect()),
            Err(e) => {
                debug!("read_table: {}: line {}: {}", path, lineno, e);
                skipped += 1;
            }
        }
    }
    if skipped > 0 {
        warn!(
            "{}: skipped {} records that could not be decoded",
            simplify_file_name(path),
            skipped
        );
    }
    info!(
        "Read {} rows from {}",
        rows.len(),
        simplify_file_name(path)
    );
    Ok(Table {
        path: path.to_string(),
        header,
        rows,
    })
}

use calamine::{open_workbook, DataType, Reader, Xlsx};

use crate::voting::io_common::{simplify_file_name, Table};
use crate::voting::*;

/// The text of a cell. Whole numbers are written without decimals so that precinct
/// ids stored as numbers keep their usual form.
fn cell_text(c: &DataType) -> String {
    match c {
        DataType::String(s) => s.trim().to_string(),
        DataType::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        DataType::Float(f) => f.to_string(),
        DataType::Int(i) => i.to_string(),
        DataType::Bool(b) => b.to_string(),
        DataType::Empty => String::new(),
        // Errors and dates are not votes.
        other => format!("{:?}", other),
    }
}

fn get_range(path: &str, worksheet_name_o: Option<&str>) -> ZipVoteResult<calamine::Range<DataType>> {
    debug!(
        "read_excel_table: path: {:?} worksheet: {:?}",
        path, worksheet_name_o
    );
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;

    if let Some(worksheet_name) = worksheet_name_o {
        workbook
            .worksheet_range(worksheet_name)
            .context(EmptyExcelSnafu { path })?
            .context(OpeningExcelSnafu { path })
    } else {
        // The statement of votes is the first worksheet.
        let (worksheet_name, wrange) = workbook
            .worksheets()
            .into_iter()
            .next()
            .context(EmptyExcelSnafu { path })?;
        debug!("read_excel_table: using worksheet {:?}", worksheet_name);
        Ok(wrange)
    }
}

/// Reads a worksheet whose first row is the header.
pub fn read_excel_table(path: &str, worksheet_name_o: Option<&str>) -> ZipVoteResult<Table> {
    let wrange = get_range(path, worksheet_name_o)?;
    let mut iter = wrange.rows();
    let header: Vec<String> = iter
        .next()
        .context(EmptyExcelSnafu { path })?
        .iter()
        .map(cell_text)
        .collect();
    debug!("read_excel_table: header: {:?}", header);
    let rows: Vec<Vec<String>> = iter
        .map(|row| row.iter().map(cell_text).collect())
        .filter(|row: &Vec<String>| row.iter().any(|c| !c.is_empty()))
        .collect();
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

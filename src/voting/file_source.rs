use crate::voting::config_reader::{ColumnSettings, Provider};
use crate::voting::io_common::{allocation_rows, city_rows, sov_rows, Table};
use crate::voting::io_csv::{delimiter_for, read_table};
use crate::voting::io_xlsx::read_excel_table;
use crate::voting::*;

/// The files of one election year, read when the pipeline asks for them.
#[derive(Debug, Clone)]
pub struct FileYearSource {
    pub year: String,
    pub provider: Provider,
    pub block_map_path: String,
    pub sov_path: String,
    pub city_map_path: Option<String>,
    pub excel_worksheet_name: Option<String>,
    pub columns: ColumnSettings,
    pub candidates: Vec<CandidateColumn>,
}

/// Any reading failure makes the feed unavailable for this year.
fn unavailable<T>(feed: &str, res: ZipVoteResult<T>) -> InterpolationResult<T> {
    res.map_err(|e| InterpolationError::DataUnavailable {
        feed: feed.to_string(),
        reason: e.to_string(),
    })
}

fn read_delimited(path: &str) -> ZipVoteResult<Table> {
    read_table(path, delimiter_for(path))
}

impl YearSource for FileYearSource {
    fn allocation_rows(&self) -> InterpolationResult<Vec<AllocationRow>> {
        let res = read_delimited(&self.block_map_path).and_then(|t| allocation_rows(&t, &self.columns));
        unavailable(ALLOCATION_FEED, res)
    }

    fn city_rows(&self) -> InterpolationResult<Vec<CityRow>> {
        match &self.city_map_path {
            Some(p) => unavailable(
                CITY_LOOKUP_FEED,
                read_delimited(p).and_then(|t| city_rows(&t, &self.columns)),
            ),
            None => DataUnavailableSnafu {
                feed: CITY_LOOKUP_FEED,
                reason: format!("no city lookup configured for {}", self.year),
            }
            .fail(),
        }
    }

    fn sov_rows(&self) -> InterpolationResult<Vec<SovRow>> {
        let table = match self.provider {
            Provider::Csv => read_delimited(&self.sov_path),
            Provider::Xlsx => read_excel_table(&self.sov_path, self.excel_worksheet_name.as_deref()),
        };
        unavailable(
            SOV_FEED,
            table.and_then(|t| sov_rows(&t, &self.columns, &self.candidates)),
        )
    }
}

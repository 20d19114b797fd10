// Primitives for reading CSV files.

use crate::tab::io_common::{cell_text, Sheet};
use crate::tab::*;

pub fn read_csv_sheet(path: &str) -> TabResult<Sheet> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    let header: Vec<String> = rdr
        .headers()
        .context(CsvOpenSnafu { path })?
        .iter()
        .map(|s| s.to_string())
        .collect();
    let mut rows: Vec<Vec<Option<String>>> = Vec::new();
    for (idx, line_r) in rdr.records().enumerate() {
        // The header is line 1.
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu { path, lineno })?;
        rows.push(line.iter().map(cell_text).collect());
    }
    debug!(
        "read_csv_sheet: {:?}: {} columns, {} rows",
        path,
        header.len(),
        rows.len()
    );
    Ok(Sheet { header, rows })
}

/// Reads the respondent table.
///
/// A column is numeric when all its non-empty cells are numbers.
pub fn read_dataset(path: &str) -> TabResult<SurveyTable> {
    let sheet = read_csv_sheet(path)?;
    let table = sheet_to_table(&sheet)?;
    info!(
        "read_dataset: {} respondents, {} columns from {:?}",
        table.row_count(),
        table.column_names().len(),
        path
    );
    Ok(table)
}

pub fn sheet_to_table(sheet: &Sheet) -> TabResult<SurveyTable> {
    let mut columns: Vec<(String, Column)> = Vec::new();
    for (cidx, name) in sheet.header.iter().enumerate() {
        let cells: Vec<Option<String>> = sheet
            .rows
            .iter()
            .map(|row| row.get(cidx).cloned().flatten())
            .collect();
        let numbers: Option<Vec<Option<f64>>> = cells
            .iter()
            .map(|c| match c {
                None => Some(None),
                Some(s) => s.parse::<f64>().ok().map(Some),
            })
            .collect();
        let col = match numbers {
            Some(v) => Column::Numeric(v),
            None => {
                debug!("sheet_to_table: column {:?} is text", name);
                Column::Text(cells)
            }
        };
        columns.push((name.clone(), col));
    }
    SurveyTable::from_columns(columns).context(StatsSnafu {})
}

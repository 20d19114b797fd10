// Population targets, from CSV files or Excel spreadsheets.

use calamine::{open_workbook, DataType, Reader, Xlsx};

use crate::tab::config_reader::{TargetFormat, WeightingSource};
use crate::tab::io_common::{cell_text, melt, Sheet};
use crate::tab::io_csv::read_csv_sheet;
use crate::tab::*;

pub fn read_targets(path: &str, source: &WeightingSource) -> TabResult<PopulationTargets> {
    info!("read_targets: reading population targets from {:?}", path);
    let sheet = match source.target_format()? {
        TargetFormat::Csv => read_csv_sheet(path)?,
        TargetFormat::Xlsx => read_excel_sheet(path, source.worksheet.as_deref())?,
    };
    let value_name = source.population_column();
    let sheet = match &source.melt {
        Some(settings) => melt(&sheet, settings, value_name)?,
        None => sheet,
    };
    sheet_to_targets(&sheet, value_name)
}

fn read_excel_sheet(path: &str, worksheet: Option<&str>) -> TabResult<Sheet> {
    debug!(
        "read_excel_sheet: path: {:?} worksheet: {:?}",
        path, worksheet
    );
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;
    let wrange = match worksheet {
        Some(name) => workbook
            .worksheet_range(name)
            .context(MissingWorksheetSnafu { path, name })?
            .context(OpeningExcelSnafu { path })?,
        None => workbook
            .worksheet_range_at(0)
            .context(EmptyExcelSnafu { path })?
            .context(OpeningExcelSnafu { path })?,
    };

    let mut iter = wrange.rows();
    let header: Vec<String> = match iter.next() {
        Some(row) => row
            .iter()
            .map(|c| read_cell(c).map(|s| s.unwrap_or_default()))
            .collect::<TabResult<Vec<String>>>()?,
        None => return EmptyExcelSnafu { path }.fail(),
    };
    debug!("read_excel_sheet: header: {:?}", header);
    let mut rows: Vec<Vec<Option<String>>> = Vec::new();
    for row in iter {
        rows.push(row.iter().map(read_cell).collect::<TabResult<_>>()?);
    }
    Ok(Sheet { header, rows })
}

fn read_cell(cell: &DataType) -> TabResult<Option<String>> {
    match cell {
        DataType::Empty => Ok(None),
        DataType::String(s) => Ok(cell_text(s)),
        DataType::Float(f) => Ok(Some(f.to_string())),
        DataType::Int(i) => Ok(Some(i.to_string())),
        DataType::Bool(b) => Ok(Some(b.to_string())),
        _ => whatever!("read_cell: could not understand cell {:?}", cell),
    }
}

/// Reads long-form targets: every column but `value_name` is a dimension.
///
/// Rows without a population or with a blank category are skipped.
pub fn sheet_to_targets(sheet: &Sheet, value_name: &str) -> TabResult<PopulationTargets> {
    let pidx = match sheet.position(value_name) {
        Some(idx) => idx,
        None => whatever!(
            "Population column {:?} not found in {:?}",
            value_name,
            sheet.header
        ),
    };
    let dims: Vec<(usize, String)> = sheet
        .header
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != pidx)
        .map(|(idx, name)| (idx, name.clone()))
        .collect();
    let names: Vec<String> = dims.iter().map(|(_, n)| n.clone()).collect();
    let mut targets = PopulationTargets::new(&names);
    for (ridx, row) in sheet.rows.iter().enumerate() {
        let lineno = ridx + 2;
        let population = match row.get(pidx).cloned().flatten() {
            Some(s) => s
                .parse::<f64>()
                .ok()
                .context(InvalidPopulationSnafu { lineno, content: s })?,
            None => {
                warn!("sheet_to_targets: line {}: no population, skipping", lineno);
                continue;
            }
        };
        let keys: Option<Vec<String>> = dims
            .iter()
            .map(|(idx, _)| row.get(*idx).cloned().flatten())
            .collect();
        match keys {
            Some(keys) => targets.push(keys, population).context(StatsSnafu {})?,
            None => warn!("sheet_to_targets: line {}: blank category, skipping", lineno),
        }
    }
    info!(
        "sheet_to_targets: dimensions {:?}, {} records, total population {}",
        targets.dimensions,
        targets.records.len(),
        targets.total()
    );
    Ok(targets)
}

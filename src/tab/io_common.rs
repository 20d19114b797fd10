use std::path::{Path, PathBuf};

use crate::tab::config_reader::MeltSettings;
use crate::tab::*;

/// Resolves a path from the configuration file against the directory of that file.
pub fn resolve_path(root: &Path, file_path: &str) -> String {
    let p: PathBuf = [root, Path::new(file_path)].iter().collect();
    p.as_path().display().to_string()
}

pub fn config_root(config_path: &str) -> TabResult<&Path> {
    Path::new(config_path)
        .parent()
        .context(MissingParentDirSnafu { path: config_path })
}

/// A rectangular sheet of text cells, with its header row.
/// Empty cells are None.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Sheet {
    pub header: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl Sheet {
    pub fn position(&self, column: &str) -> Option<usize> {
        self.header.iter().position(|h| h == column)
    }
}

/// Turns a wide sheet into a long one: every value column becomes a row,
/// with the column name under `variable_name` and the cell under `value_name`.
pub fn melt(sheet: &Sheet, settings: &MeltSettings, value_name: &str) -> TabResult<Sheet> {
    let mut id_idxs: Vec<usize> = Vec::new();
    for c in settings.id_columns.iter() {
        match sheet.position(c) {
            Some(idx) => id_idxs.push(idx),
            None => whatever!("melt: id column {:?} not found in {:?}", c, sheet.header),
        }
    }
    let value_idxs: Vec<usize> = match &settings.value_columns {
        Some(cols) => {
            let mut res: Vec<usize> = Vec::new();
            for c in cols.iter() {
                match sheet.position(c) {
                    Some(idx) => res.push(idx),
                    None => whatever!("melt: value column {:?} not found in {:?}", c, sheet.header),
                }
            }
            res
        }
        None => (0..sheet.header.len())
            .filter(|idx| !id_idxs.contains(idx))
            .collect(),
    };
    debug!(
        "melt: id columns {:?} value columns {:?}",
        id_idxs, value_idxs
    );

    let mut header: Vec<String> = id_idxs.iter().map(|i| sheet.header[*i].clone()).collect();
    header.push(settings.variable_name.clone());
    header.push(value_name.to_string());

    let mut rows: Vec<Vec<Option<String>>> = Vec::new();
    for row in sheet.rows.iter() {
        for vidx in value_idxs.iter() {
            let mut r: Vec<Option<String>> =
                id_idxs.iter().map(|i| row.get(*i).cloned().flatten()).collect();
            r.push(Some(sheet.header[*vidx].clone()));
            r.push(row.get(*vidx).cloned().flatten());
            rows.push(r);
        }
    }
    Ok(Sheet { header, rows })
}

pub fn cell_text(s: &str) -> Option<String> {
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(v: &[&str]) -> Vec<Option<String>> {
        v.iter().map(|s| cell_text(s)).collect()
    }

    fn wide() -> Sheet {
        Sheet {
            header: vec![
                "Område".to_string(),
                "Ålder".to_string(),
                "Kvinna".to_string(),
                "Man".to_string(),
            ],
            rows: vec![cells(&["Nord", "18-34", "120", "100"]), cells(&["Syd", "18-34", "80", ""])],
        }
    }

    #[test]
    fn melts_wide_targets() {
        let settings = MeltSettings {
            id_columns: vec!["Område".to_string(), "Ålder".to_string()],
            value_columns: None,
            variable_name: "Kön".to_string(),
        };
        let long = melt(&wide(), &settings, "population").unwrap();
        assert_eq!(long.header, vec!["Område", "Ålder", "Kön", "population"]);
        assert_eq!(long.rows.len(), 4);
        assert_eq!(long.rows[1], cells(&["Nord", "18-34", "Man", "100"]));
        assert_eq!(long.rows[3], cells(&["Syd", "18-34", "Man", ""]));
    }

    #[test]
    fn melt_selected_columns() {
        let settings = MeltSettings {
            id_columns: vec!["Område".to_string()],
            value_columns: Some(vec!["Man".to_string()]),
            variable_name: "Kön".to_string(),
        };
        let long = melt(&wide(), &settings, "population").unwrap();
        assert_eq!(long.rows, vec![cells(&["Nord", "Man", "100"]), cells(&["Syd", "Man", ""])]);

        let missing = MeltSettings {
            id_columns: vec!["Region".to_string()],
            ..settings
        };
        assert!(melt(&wide(), &missing, "population").is_err());
    }

    #[test]
    fn paths_relative_to_config() {
        let root = config_root("data/run/config.json").unwrap();
        assert_eq!(resolve_path(root, "responses.csv"), "data/run/responses.csv");
    }
}

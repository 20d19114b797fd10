//! Column-major respondent table.
//!
//! One row per respondent. Answer columns hold coded numeric values, category
//! columns hold 0/1 membership flags, and the optional weight column holds
//! positive reals. Null cells are `None`.

use std::collections::HashMap;

use log::warn;
use snafu::prelude::*;

use crate::config::*;

/// A typed column.
#[derive(PartialEq, Debug, Clone)]
pub enum Column {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Numeric(v) => v.len(),
            Column::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_numeric(&self) -> Option<&[Option<f64>]> {
        match self {
            Column::Numeric(v) => Some(v.as_slice()),
            Column::Text(_) => None,
        }
    }

    pub fn is_null(&self, row: usize) -> bool {
        match self {
            Column::Numeric(v) => v[row].is_none(),
            Column::Text(v) => v[row].is_none(),
        }
    }

    /// The cell as text. Numbers are rendered the way answer codes are.
    pub fn text_at(&self, row: usize) -> Option<String> {
        match self {
            Column::Numeric(v) => v[row].map(|x| Code(x).to_string()),
            Column::Text(v) => v[row].clone(),
        }
    }

    /// The cell as a number. Text cells are parsed.
    pub fn number_at(&self, row: usize) -> Option<f64> {
        match self {
            Column::Numeric(v) => v[row],
            Column::Text(v) => v[row].as_ref().and_then(|s| s.trim().parse::<f64>().ok()),
        }
    }

    fn filter(&self, mask: &[bool]) -> Column {
        fn keep<T: Clone>(v: &[T], mask: &[bool]) -> Vec<T> {
            v.iter()
                .zip(mask.iter())
                .filter_map(|(x, m)| if *m { Some(x.clone()) } else { None })
                .collect()
        }
        match self {
            Column::Numeric(v) => Column::Numeric(keep(v, mask)),
            Column::Text(v) => Column::Text(keep(v, mask)),
        }
    }
}

#[derive(PartialEq, Debug, Clone, Default)]
pub struct SurveyTable {
    names: Vec<String>,
    columns: Vec<Column>,
    index: HashMap<String, usize>,
    rows: usize,
}

impl SurveyTable {
    pub fn new() -> SurveyTable {
        SurveyTable::default()
    }

    pub fn from_columns(columns: Vec<(String, Column)>) -> StatsResult<SurveyTable> {
        let mut table = SurveyTable::new();
        for (name, col) in columns {
            ensure!(
                !table.has_column(&name),
                DuplicateColumnSnafu { column: name }
            );
            table.set_column(&name, col)?;
        }
        Ok(table)
    }

    /// Adds the column, or replaces it if a column with the same name exists.
    pub fn set_column(&mut self, name: &str, col: Column) -> StatsResult<()> {
        if !self.columns.is_empty() {
            ensure!(
                col.len() == self.rows,
                LengthMismatchSnafu {
                    column: name,
                    expected: self.rows,
                    actual: col.len()
                }
            );
        }
        if self.columns.is_empty() {
            self.rows = col.len();
        }
        if let Some(idx) = self.index.get(name) {
            self.columns[*idx] = col;
        } else {
            self.index.insert(name.to_string(), self.columns.len());
            self.names.push(name.to_string());
            self.columns.push(col);
        }
        Ok(())
    }

    pub fn with_column(mut self, name: &str, col: Column) -> StatsResult<SurveyTable> {
        self.set_column(name, col)?;
        Ok(self)
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.index.get(name).map(|idx| &self.columns[*idx])
    }

    pub fn numeric(&self, name: &str) -> Option<&[Option<f64>]> {
        self.column(name).and_then(|c| c.as_numeric())
    }

    /// Keeps the rows for which the mask is true.
    pub fn filter(&self, mask: &[bool]) -> StatsResult<SurveyTable> {
        ensure!(
            mask.len() == self.rows,
            LengthMismatchSnafu {
                column: "row filter",
                expected: self.rows,
                actual: mask.len()
            }
        );
        Ok(SurveyTable {
            names: self.names.clone(),
            columns: self.columns.iter().map(|c| c.filter(mask)).collect(),
            index: self.index.clone(),
            rows: mask.iter().filter(|m| **m).count(),
        })
    }

    /// Membership of each row in a category column: the flag is set when the
    /// cell holds 1 (or a truthy text). Returns None if there is no such column.
    pub fn category_mask(&self, name: &str) -> Option<Vec<bool>> {
        let col = self.column(name)?;
        let mask = match col {
            Column::Numeric(v) => v.iter().map(|x| *x == Some(1.0)).collect(),
            Column::Text(v) => v
                .iter()
                .map(|x| match x.as_deref().map(|s| s.trim().to_lowercase()) {
                    Some(s) => s == "1" || s == "true" || s == "1.0",
                    None => false,
                })
                .collect(),
        };
        Some(mask)
    }

    /// The row masks of the requested categories, in order.
    ///
    /// Categories without a column are skipped with a warning. Without any
    /// requested category, a single "Overall" group holds all the rows.
    pub fn category_groups(&self, categories: &[String], context: &str) -> Vec<(String, Vec<bool>)> {
        if categories.is_empty() {
            return vec![(OVERALL.to_string(), vec![true; self.rows])];
        }
        categories
            .iter()
            .filter_map(|cat| match self.category_mask(cat) {
                Some(mask) => Some((cat.clone(), mask)),
                None => {
                    warn!(
                        "{}: category column {:?} not found, skipping this category",
                        context, cat
                    );
                    None
                }
            })
            .collect()
    }
}

/// The name of the single group used when no category is requested.
pub const OVERALL: &str = "Overall";

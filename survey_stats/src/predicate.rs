//! Row predicates restricting which respondents count towards a question.
//!
//! A closed set of combinators over named columns. They are read from the
//! configuration as data and evaluated against the table.

use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::config::*;
use crate::table::{Column, SurveyTable};

/// A literal compared against a cell.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
}

impl CellValue {
    fn matches(&self, col: &Column, row: usize) -> bool {
        match (self, col) {
            (CellValue::Number(x), Column::Numeric(v)) => v[row] == Some(*x),
            (CellValue::Number(x), Column::Text(_)) => col.number_at(row) == Some(*x),
            (CellValue::Text(s), Column::Text(v)) => v[row].as_deref() == Some(s.as_str()),
            (CellValue::Text(s), Column::Numeric(v)) => match (v[row], s.trim().parse::<f64>()) {
                (Some(x), Ok(y)) => x == y,
                _ => false,
            },
        }
    }
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum RowPredicate {
    Equals { column: String, value: CellValue },
    InSet { column: String, values: Vec<CellValue> },
    NotNull { column: String },
    And { all: Vec<RowPredicate> },
    Or { any: Vec<RowPredicate> },
    Not { predicate: Box<RowPredicate> },
}

impl RowPredicate {
    pub fn equals(column: &str, value: CellValue) -> RowPredicate {
        RowPredicate::Equals {
            column: column.to_string(),
            value,
        }
    }

    pub fn in_set(column: &str, values: Vec<CellValue>) -> RowPredicate {
        RowPredicate::InSet {
            column: column.to_string(),
            values,
        }
    }

    pub fn not_null(column: &str) -> RowPredicate {
        RowPredicate::NotNull {
            column: column.to_string(),
        }
    }

    pub fn negate(self) -> RowPredicate {
        RowPredicate::Not {
            predicate: Box::new(self),
        }
    }

    /// Evaluates the predicate on every row. Null cells never match a literal.
    pub fn evaluate(&self, table: &SurveyTable) -> StatsResult<Vec<bool>> {
        let n = table.row_count();
        match self {
            RowPredicate::Equals { column, value } => {
                let col = get_column(table, column)?;
                Ok((0..n).map(|row| value.matches(col, row)).collect())
            }
            RowPredicate::InSet { column, values } => {
                let col = get_column(table, column)?;
                Ok((0..n)
                    .map(|row| values.iter().any(|v| v.matches(col, row)))
                    .collect())
            }
            RowPredicate::NotNull { column } => {
                let col = get_column(table, column)?;
                Ok((0..n).map(|row| !col.is_null(row)).collect())
            }
            RowPredicate::And { all } => {
                let mut res = vec![true; n];
                for p in all.iter() {
                    for (r, x) in res.iter_mut().zip(p.evaluate(table)?) {
                        *r = *r && x;
                    }
                }
                Ok(res)
            }
            RowPredicate::Or { any } => {
                let mut res = vec![false; n];
                for p in any.iter() {
                    for (r, x) in res.iter_mut().zip(p.evaluate(table)?) {
                        *r = *r || x;
                    }
                }
                Ok(res)
            }
            RowPredicate::Not { predicate } => {
                Ok(predicate.evaluate(table)?.into_iter().map(|x| !x).collect())
            }
        }
    }
}

fn get_column<'a>(table: &'a SurveyTable, column: &str) -> StatsResult<&'a Column> {
    table
        .column(column)
        .context(ColumnNotFoundSnafu { column })
}

//! Question and area indices.
//!
//! The index of a question is the (weighted) mean of its answers, once the
//! missing codes are removed. The index of an area pools the answers of all
//! its questions. Indices are computed per category, one row per category and
//! one column per (area, question) pair followed by the area itself.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::config::*;
use crate::correlation::{self, CorrelationRecord};
use crate::missing::{CleanedTable, MissingNormalizer};
use crate::stats::MeanAcc;
use crate::table::{SurveyTable, OVERALL};

#[derive(Eq, PartialEq, Debug, Clone, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum IndexColumn {
    Question { area: String, question: String },
    Area { area: String },
    /// The single column of the index computed without categories.
    Overall,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct IndexRow {
    pub category: String,
    /// One value per column of the table, None when suppressed or without data.
    pub values: Vec<Option<f64>>,
}

#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexTable {
    pub columns: Vec<IndexColumn>,
    pub rows: Vec<IndexRow>,
}

impl IndexTable {
    pub fn get(&self, category: &str, column: &IndexColumn) -> Option<f64> {
        let cidx = self.columns.iter().position(|c| c == column)?;
        self.rows
            .iter()
            .find(|r| r.category == category)
            .and_then(|r| r.values[cidx])
    }
}

#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexOptions {
    /// Rescales the answers linearly from their codebook range to `[min, max]`.
    pub scale: Option<(f64, f64)>,
    /// Also correlates the questions with the average of this area.
    pub correlate_area: Option<String>,
}

#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexOutput {
    pub table: IndexTable,
    pub correlations: Vec<CorrelationRecord>,
}

// Linear map from the codebook range of a question to the requested range.
#[derive(Debug, Clone, Copy)]
struct Rescale {
    from: (f64, f64),
    to: (f64, f64),
}

impl Rescale {
    fn apply(&self, x: f64) -> f64 {
        let (omin, omax) = self.from;
        let (tmin, tmax) = self.to;
        if omax > omin {
            (x - omin) * (tmax - tmin) / (omax - omin) + tmin
        } else {
            x
        }
    }
}

fn question_rescale(
    catalog: &QuestionCatalog,
    missing: &MissingNormalizer,
    question: &str,
    to: (f64, f64),
) -> Option<Rescale> {
    let codes: Vec<f64> = catalog
        .value_labels(question)
        .map(|labels| {
            labels
                .keys()
                .map(|c| c.value())
                .filter(|x| x.is_finite() && !missing.is_missing(*x))
                .collect()
        })
        .unwrap_or_default();
    if codes.is_empty() {
        warn!(
            "index: no numeric value labels for question {:?}, it is not rescaled",
            question
        );
        return None;
    }
    let min = codes.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = codes.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    Some(Rescale {
        from: (min, max),
        to,
    })
}

/// Computes the index table of the questions of the area map.
pub fn compute(
    table: &SurveyTable,
    catalog: &QuestionCatalog,
    config: &StatsConfig,
    categories: &[String],
    weights: Option<&[f64]>,
    options: &IndexOptions,
) -> StatsResult<IndexOutput> {
    ensure!(table.row_count() > 0, EmptyDatasetSnafu {});
    if let Some(w) = weights {
        ensure!(
            w.len() == table.row_count(),
            LengthMismatchSnafu {
                column: "weights",
                expected: table.row_count(),
                actual: w.len()
            }
        );
    }
    if let Some((min, max)) = options.scale {
        ensure!(
            min.is_finite() && max.is_finite() && min < max,
            InvalidScaleSnafu { min, max }
        );
    }
    let missing = MissingNormalizer::new(config);
    let cleaned = missing.normalize(table, catalog);

    let in_scope: Vec<String> = config
        .all_area_questions()
        .into_iter()
        .filter(|q| {
            let numeric = cleaned.table().numeric(q).is_some();
            if !numeric {
                warn!("index: question {:?} is not a numeric column of the table", q);
            }
            numeric
        })
        .collect();

    let correlations = match options.correlate_area.as_ref() {
        Some(area) => correlation::compute_for_area(cleaned.table(), config, area, categories),
        None => vec![],
    };

    if in_scope.is_empty() {
        warn!("index: no question of the area map found in the table");
        return Ok(IndexOutput {
            table: IndexTable::default(),
            correlations,
        });
    }
    info!(
        "index: {} questions, {} categories, weighted: {}",
        in_scope.len(),
        categories.len(),
        weights.is_some()
    );

    let table = if categories.is_empty() {
        overall_index(&cleaned, &in_scope, weights)
    } else {
        category_index(&cleaned, catalog, config, &missing, categories, &in_scope, weights, options)
    };
    Ok(IndexOutput {
        table,
        correlations,
    })
}

fn overall_index(cleaned: &CleanedTable, in_scope: &[String], weights: Option<&[f64]>) -> IndexTable {
    let mut acc = MeanAcc::default();
    for q in in_scope.iter() {
        if let Some(values) = cleaned.table().numeric(q) {
            for (row, x) in values.iter().enumerate() {
                if let Some(x) = x.filter(|x| x.is_finite()) {
                    acc.push(x, weights.map(|w| w[row]).unwrap_or(1.0));
                }
            }
        }
    }
    if acc.count == 0 {
        warn!("index: no valid answer for the overall index");
    }
    IndexTable {
        columns: vec![IndexColumn::Overall],
        rows: vec![IndexRow {
            category: OVERALL.to_string(),
            values: vec![acc.mean()],
        }],
    }
}

#[allow(clippy::too_many_arguments)]
fn category_index(
    cleaned: &CleanedTable,
    catalog: &QuestionCatalog,
    config: &StatsConfig,
    missing: &MissingNormalizer,
    categories: &[String],
    in_scope: &[String],
    weights: Option<&[f64]>,
    options: &IndexOptions,
) -> IndexTable {
    let data = cleaned.table();
    // The layout of the columns: every area with its questions in scope.
    let mut layout: Vec<(&str, Vec<&str>)> = Vec::new();
    for group in config.area_map.iter() {
        let questions: Vec<&str> = group
            .questions
            .iter()
            .filter(|q| in_scope.contains(q))
            .map(|q| q.as_str())
            .collect();
        if questions.is_empty() {
            warn!("index: no question of area {:?} in the table, skipping", group.area);
            continue;
        }
        layout.push((group.area.as_str(), questions));
    }
    let mut columns: Vec<IndexColumn> = Vec::new();
    for (area, questions) in layout.iter() {
        for q in questions.iter() {
            columns.push(IndexColumn::Question {
                area: area.to_string(),
                question: q.to_string(),
            });
        }
        columns.push(IndexColumn::Area {
            area: area.to_string(),
        });
    }

    // Column slice and rescale of every question, looked up once.
    let resolved: Vec<Vec<(&str, Option<&[Option<f64>]>, Option<Rescale>)>> = layout
        .iter()
        .map(|(_, questions)| {
            questions
                .iter()
                .map(|q| {
                    let rescale = options
                        .scale
                        .and_then(|to| question_rescale(catalog, missing, q, to));
                    (*q, data.numeric(q), rescale)
                })
                .collect()
        })
        .collect();

    let mut rows: Vec<IndexRow> = Vec::new();
    for (category, mask) in data.category_groups(categories, "index") {
        if !mask.iter().any(|m| *m) {
            warn!("index: no respondent in category {:?}, skipping", category);
            continue;
        }
        let mut values: Vec<Option<f64>> = Vec::with_capacity(columns.len());
        for ((area, _), questions) in layout.iter().zip(resolved.iter()) {
            let mut area_acc = MeanAcc::default();
            for (q, column, rescale) in questions.iter() {
                let mut acc = MeanAcc::default();
                if let Some(column) = column {
                    for row in (0..data.row_count()).filter(|r| mask[*r]) {
                        let x = match column[row].filter(|x| x.is_finite()) {
                            Some(x) => rescale.map(|r| r.apply(x)).unwrap_or(x),
                            None => continue,
                        };
                        let w = weights.map(|w| w[row]).unwrap_or(1.0);
                        acc.push(x, w);
                        area_acc.push(x, w);
                    }
                }
                let missing_count = cleaned.missing_count(q, &mask);
                let value = if acc.count + missing_count < config.minimum_count {
                    debug!(
                        "index: {:?}/{:?} in category {:?} suppressed ({} answers, {} missing)",
                        area, q, category, acc.count, missing_count
                    );
                    None
                } else {
                    acc.mean()
                };
                values.push(value);
            }
            values.push(area_acc.mean());
        }
        rows.push(IndexRow { category, values });
    }
    IndexTable { columns, rows }
}

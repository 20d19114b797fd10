//! Correlation of each question with the average of an area.
//!
//! The reference series is the mean of the area's questions for every
//! respondent. Each in-scope question is then correlated (Pearson) with that
//! series, on the rows where both are defined.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::*;
use crate::stats::{pearson, row_mean};
use crate::table::{SurveyTable, OVERALL};

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationRecord {
    pub category: String,
    pub area: String,
    pub question: String,
    pub correlation: f64,
}

/// Correlates the questions of the area map with the average of `area`.
///
/// Logs and returns nothing if the area is not in the area map.
pub fn compute_for_area(
    cleaned: &SurveyTable,
    config: &StatsConfig,
    area: &str,
    categories: &[String],
) -> Vec<CorrelationRecord> {
    let area_questions = match config.area_questions(area) {
        Some(qs) => qs,
        None => {
            warn!("correlation: area {:?} is not in the area map", area);
            return vec![];
        }
    };
    let in_scope: Vec<String> = config
        .all_area_questions()
        .into_iter()
        .filter(|q| cleaned.has_column(q))
        .collect();
    compute(
        cleaned,
        area,
        area_questions,
        &in_scope,
        categories,
        config.clamp_negative_correlations,
    )
}

/// Correlates every in-scope question with the row mean of `area_questions`.
///
/// Without any usable category the correlation is computed over all rows
/// and keeps its sign. Per category, negative or undefined correlations are
/// reported as 0 when `clamp_negative` is set.
pub fn compute(
    cleaned: &SurveyTable,
    area: &str,
    area_questions: &[String],
    in_scope: &[String],
    categories: &[String],
    clamp_negative: bool,
) -> Vec<CorrelationRecord> {
    let present: Vec<&[Option<f64>]> = area_questions
        .iter()
        .filter_map(|q| cleaned.numeric(q))
        .collect();
    if present.is_empty() {
        warn!(
            "correlation: none of the questions of area {:?} are numeric columns of the table",
            area
        );
        return vec![];
    }
    let reference: Vec<Option<f64>> = (0..cleaned.row_count())
        .map(|row| row_mean(present.iter().map(|col| col[row])))
        .collect();

    let groups: Vec<(String, Vec<bool>)> = categories
        .iter()
        .filter_map(|c| cleaned.category_mask(c).map(|m| (c.clone(), m)))
        .collect();
    info!(
        "correlation: area {:?}, {} questions, {} categories",
        area,
        in_scope.len(),
        groups.len()
    );

    let mut res: Vec<CorrelationRecord> = Vec::new();
    if groups.is_empty() {
        if !categories.is_empty() {
            warn!("correlation: no category column found, computing the overall correlation");
        }
        if in_scope.len() < 2 {
            warn!(
                "correlation: at least two questions are needed for the overall correlation of area {:?}",
                area
            );
            return res;
        }
        let all = vec![true; cleaned.row_count()];
        for q in in_scope.iter() {
            match question_correlation(cleaned, q, &reference, &all) {
                Some((_, Some(r))) => res.push(CorrelationRecord {
                    category: OVERALL.to_string(),
                    area: area.to_string(),
                    question: q.clone(),
                    correlation: r,
                }),
                _ => warn!(
                    "correlation: not enough data for the overall correlation of question {:?}",
                    q
                ),
            }
        }
        return res;
    }

    for (category, mask) in groups.iter() {
        for q in in_scope.iter() {
            let correlation = match question_correlation(cleaned, q, &reference, mask) {
                None => {
                    warn!(
                        "correlation: not enough data points for question {:?} in category {:?}, skipping",
                        q, category
                    );
                    continue;
                }
                Some((_, Some(r))) if clamp_negative && r < 0.0 => 0.0,
                Some((_, Some(r))) => r,
                Some((n, None)) => {
                    debug!(
                        "correlation: undefined correlation for question {:?} in category {:?} ({} points)",
                        q, category, n
                    );
                    if clamp_negative {
                        0.0
                    } else {
                        continue;
                    }
                }
            };
            res.push(CorrelationRecord {
                category: category.clone(),
                area: area.to_string(),
                question: q.clone(),
                correlation,
            });
        }
    }
    res
}

// The number of paired points and their correlation (None if a series is
// constant). None if there are fewer than 2 points.
fn question_correlation(
    cleaned: &SurveyTable,
    question: &str,
    reference: &[Option<f64>],
    mask: &[bool],
) -> Option<(usize, Option<f64>)> {
    let values = cleaned.numeric(question)?;
    let (xs, ys): (Vec<f64>, Vec<f64>) = (0..reference.len())
        .filter(|row| mask[*row])
        .filter_map(|row| match (reference[row], values[row]) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some((x, y)),
            _ => None,
        })
        .unzip();
    if xs.len() < 2 {
        None
    } else {
        Some((xs.len(), pearson(&xs, &ys)))
    }
}

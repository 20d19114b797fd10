//! Rank-position counts and reciprocal-rank scores for ranking questions.
//!
//! A ranking question has one answer column per rank slot: the column
//! `Q7M2` holds the item the respondent placed at position 2. Each placement
//! contributes `1 / rank` to the score of the item.

use std::collections::BTreeMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::config::*;
use crate::stats::ratio;
use crate::table::SurveyTable;

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedItem {
    pub item: Code,
    /// Filled in from the codebook by the caller, empty if unknown.
    pub label: String,
    /// Number of respondents who placed the item at each position (index 0 is rank 1).
    pub rank_counts: Vec<f64>,
    /// Same as `rank_counts`, with respondent weights. Only present for weighted runs.
    pub rank_weighted: Option<Vec<f64>>,
    pub rank_percentages: Vec<f64>,
    pub total_rank_count: f64,
    pub total_score: f64,
}

/// The ranking of one question within one category.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingTable {
    pub base_question: String,
    pub category: String,
    pub total_respondents: f64,
    /// The highest rank position found in the column names.
    pub rank_positions: usize,
    /// Sorted by item value.
    pub items: Vec<RankedItem>,
}

/// The rank position encoded at the end of a ranking column name.
///
/// The trailing digits after the base question prefix are used: `Q7M2` for
/// the base question `Q7` is rank 2.
pub fn rank_position(base_question: &str, column: &str) -> Option<usize> {
    let suffix = column.strip_prefix(base_question).unwrap_or(column);
    let digits: String = suffix
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect::<Vec<char>>()
        .into_iter()
        .rev()
        .collect();
    digits.parse::<usize>().ok().filter(|r| *r > 0)
}

// One placement of an item by a respondent.
struct Placement {
    row: usize,
    rank: usize,
    item: Code,
}

/// Computes the ranking metrics, one table per category.
///
/// The table and weights must already be restricted to the rows the question
/// applies to. Without categories, a single table over all rows is produced
/// with the category "Overall".
///
/// Rank positions run from 1 to the highest rank read from the column names.
/// This is the number of rank slots when the slots are numbered without gaps
/// (`Q7M1`, `Q7M2`, ...). With gaps, the missing positions get zero counts.
pub fn compute(
    table: &SurveyTable,
    base_question: &str,
    ranking_columns: &[String],
    possible_values: &[Code],
    categories: &[String],
    weights: Option<&[f64]>,
) -> StatsResult<Vec<RankingTable>> {
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
    if possible_values.is_empty() {
        warn!(
            "ranking: no possible values for question {:?}, skipping",
            base_question
        );
        return Ok(vec![]);
    }
    let mut slots: Vec<(&str, usize)> = Vec::new();
    for col in ranking_columns.iter() {
        if !table.has_column(col) {
            debug!("ranking: column {:?} not in the table", col);
            continue;
        }
        match rank_position(base_question, col) {
            Some(rank) => slots.push((col.as_str(), rank)),
            None => warn!(
                "ranking: cannot read a rank position from column {:?} of question {:?}, ignoring it",
                col, base_question
            ),
        }
    }
    if slots.is_empty() {
        warn!(
            "ranking: none of the ranking columns of {:?} are present, skipping",
            base_question
        );
        return Ok(vec![]);
    }
    let rank_positions = slots.iter().map(|(_, r)| *r).max().unwrap_or(0);

    let mut placements: Vec<Placement> = Vec::new();
    for (col_name, rank) in slots.iter() {
        // Checked above.
        let col = match table.column(col_name) {
            Some(c) => c,
            None => continue,
        };
        for row in 0..table.row_count() {
            let item = match col.number_at(row) {
                Some(x) => Code(x),
                None => continue,
            };
            if possible_values.contains(&item) {
                placements.push(Placement {
                    row,
                    rank: *rank,
                    item,
                });
            }
        }
    }

    let groups = table.category_groups(categories, "ranking");

    let weight_of = |row: usize| weights.map(|w| w[row]).unwrap_or(1.0);
    let mut res: Vec<RankingTable> = Vec::new();
    for (category, mask) in groups {
        let total_respondents: f64 = mask
            .iter()
            .enumerate()
            .filter(|(_, m)| **m)
            .map(|(row, _)| weight_of(row))
            .sum();
        if total_respondents <= 0.0 {
            warn!(
                "ranking: no respondents for question {:?} in category {:?}, skipping",
                base_question, category
            );
            continue;
        }
        let mut items: BTreeMap<Code, RankedItem> = possible_values
            .iter()
            .map(|item| {
                (
                    *item,
                    RankedItem {
                        item: *item,
                        label: String::new(),
                        rank_counts: vec![0.0; rank_positions],
                        rank_weighted: weights.map(|_| vec![0.0; rank_positions]),
                        rank_percentages: vec![0.0; rank_positions],
                        total_rank_count: 0.0,
                        total_score: 0.0,
                    },
                )
            })
            .collect();
        for p in placements.iter().filter(|p| mask[p.row]) {
            if let Some(it) = items.get_mut(&p.item) {
                let w = weight_of(p.row);
                it.rank_counts[p.rank - 1] += 1.0;
                if let Some(rw) = it.rank_weighted.as_mut() {
                    rw[p.rank - 1] += w;
                }
                it.total_rank_count += 1.0;
                it.total_score += w / (p.rank as f64);
            }
        }
        for it in items.values_mut() {
            let numerators = it.rank_weighted.as_ref().unwrap_or(&it.rank_counts);
            it.rank_percentages = numerators
                .iter()
                .map(|x| ratio(*x, total_respondents))
                .collect();
        }
        res.push(RankingTable {
            base_question: base_question.to_string(),
            category,
            total_respondents,
            rank_positions,
            items: items.into_values().collect(),
        });
    }
    Ok(res)
}

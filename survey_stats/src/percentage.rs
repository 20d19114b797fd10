//! Answer distributions of the choice questions.
//!
//! For every answer column and every category, the aggregator counts the
//! respondents per possible answer value (the codebook values that are not
//! missing codes). Percentages are taken over the non-missing answers, and the
//! share of missing codes is reported separately.
//!
//! The results come in two shapes: a long form with one record per
//! `(question, answer, metric, category)`, and a table pivoted with the
//! categories as columns, in catalog order, with the answers labelled.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Display;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::config::*;
use crate::missing::MissingNormalizer;
use crate::ranking::{self, RankingTable};
use crate::stats::ratio;
use crate::table::SurveyTable;

/// The answer a metric refers to. Per-column aggregates (totals and missing
/// answers) use the synthetic `Total` key, which sorts after every value.
#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnswerKey {
    Value(Code),
    Total,
}

impl Display for AnswerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnswerKey::Value(c) => write!(f, "{}", c),
            AnswerKey::Total => write!(f, "total"),
        }
    }
}

#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Count,
    Weighted,
    Percentage,
    TotalCount,
    TotalWeighted,
    MissingCount,
    MissingWeighted,
    MissingPercentage,
}

impl Metric {
    pub fn name(&self) -> &'static str {
        match self {
            Metric::Count => "count",
            Metric::Weighted => "weighted",
            Metric::Percentage => "percentage",
            Metric::TotalCount => "total_count",
            Metric::TotalWeighted => "total_weighted",
            Metric::MissingCount => "missing_count",
            Metric::MissingWeighted => "missing_weighted",
            Metric::MissingPercentage => "missing_percentage",
        }
    }
}

impl Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One value of the long form.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PercentageRecord {
    /// The answer column.
    pub question: String,
    pub answer: AnswerKey,
    pub metric: Metric,
    pub category: String,
    pub value: f64,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PercentageRow {
    pub question: String,
    pub base_question: String,
    pub display_question_label: String,
    pub answer_label: String,
    pub answer: AnswerKey,
    pub metric: Metric,
    /// One value per category of the table.
    pub values: Vec<f64>,
}

/// The pivoted form: one row per (question, answer, metric), one value per category.
#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PercentageTable {
    pub categories: Vec<String>,
    pub rows: Vec<PercentageRow>,
}

impl PercentageTable {
    pub fn get(&self, question: &str, answer: AnswerKey, metric: Metric, category: &str) -> Option<f64> {
        let cidx = self.categories.iter().position(|c| c == category)?;
        self.rows
            .iter()
            .find(|r| r.question == question && r.answer == answer && r.metric == metric)
            .map(|r| r.values[cidx])
    }
}

#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PercentageOutput {
    pub records: Vec<PercentageRecord>,
    pub table: PercentageTable,
    pub rankings: Vec<RankingTable>,
}

// The catalog entries sharing a base question and a type.
struct QuestionGroup<'a> {
    base_question: &'a str,
    question_type: QuestionType,
    entries: Vec<&'a QuestionMeta>,
}

impl<'a> QuestionGroup<'a> {
    fn columns(&self) -> impl Iterator<Item = (&'a QuestionMeta, &'a AnswerColumn)> + '_ {
        self.entries.iter().flat_map(|m| {
            let m: &'a QuestionMeta = *m;
            m.columns.iter().map(move |c| (m, c))
        })
    }

    // The codebook values, without the missing codes.
    fn possible_values(&self, missing: &MissingNormalizer) -> BTreeSet<Code> {
        self.entries
            .iter()
            .flat_map(|m| m.value_labels.keys())
            .filter(|c| !missing.is_missing(c.value()))
            .cloned()
            .collect()
    }
}

fn group_catalog(catalog: &QuestionCatalog) -> Vec<QuestionGroup<'_>> {
    let mut groups: Vec<QuestionGroup> = Vec::new();
    for meta in catalog.entries() {
        match groups
            .iter_mut()
            .find(|g| g.base_question == meta.base_question && g.question_type == meta.question_type)
        {
            Some(g) => g.entries.push(meta),
            None => groups.push(QuestionGroup {
                base_question: &meta.base_question,
                question_type: meta.question_type,
                entries: vec![meta],
            }),
        }
    }
    groups
}

// (answer column, stringified value) -> answer label, resolved once per key.
type LabelMap = HashMap<(String, String), String>;

fn build_label_map(catalog: &QuestionCatalog) -> LabelMap {
    let mut res: LabelMap = HashMap::new();
    for meta in catalog.entries() {
        for col in meta.columns.iter() {
            if meta.question_type == QuestionType::MultiResponse {
                // Only the selected state is reported, under the option text.
                res.insert((col.name.clone(), Code(1.0).to_string()), col.label.clone());
            } else {
                for (code, label) in meta.value_labels.iter() {
                    res.insert((col.name.clone(), code.to_string()), label.clone());
                }
            }
        }
    }
    res
}

#[derive(Default, Clone, Copy)]
struct Tally {
    count: usize,
    weighted: f64,
}

impl Tally {
    fn push(&mut self, w: f64) {
        self.count += 1;
        self.weighted += w;
    }

    // The measure used for percentages.
    fn mass(&self, weighted: bool) -> f64 {
        if weighted {
            self.weighted
        } else {
            self.count as f64
        }
    }
}

/// Computes the answer distributions of every choice question of the catalog.
///
/// Ranking questions are delegated to the ranking aggregator. Open text and
/// numeric questions are ignored.
pub fn compute(
    table: &SurveyTable,
    catalog: &QuestionCatalog,
    categories: &[String],
    config: &StatsConfig,
    weights: Option<&[f64]>,
) -> StatsResult<PercentageOutput> {
    ensure!(table.row_count() > 0, EmptyDatasetSnafu {});
    ensure!(!catalog.is_empty(), EmptyCatalogSnafu {});
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
    info!(
        "percentages: {} rows, {} categories, weighted: {}",
        table.row_count(),
        categories.len(),
        weights.is_some()
    );
    let missing = MissingNormalizer::new(config);
    let groups = table.category_groups(categories, "percentages");
    let mut records: Vec<PercentageRecord> = Vec::new();
    let mut rankings: Vec<RankingTable> = Vec::new();

    for group in group_catalog(catalog) {
        let filter_mask = match config.question_filters.get(group.base_question) {
            Some(pred) => match pred.evaluate(table) {
                Ok(mask) => Some(mask),
                Err(e) => {
                    warn!(
                        "percentages: the filter of question {:?} cannot be evaluated ({}), skipping",
                        group.base_question, e
                    );
                    continue;
                }
            },
            None => None,
        };
        match group.question_type {
            QuestionType::SingleChoice | QuestionType::MultiResponse | QuestionType::Grid => {
                let possible = group.possible_values(&missing);
                if possible.is_empty() {
                    warn!(
                        "percentages: no value labels for question {:?}, skipping",
                        group.base_question
                    );
                    continue;
                }
                debug!(
                    "percentages: question {:?} ({:?}), possible values: {:?}",
                    group.base_question, group.question_type, possible
                );
                for (_, col) in group.columns() {
                    if !table.has_column(&col.name) {
                        warn!(
                            "percentages: column {:?} of question {:?} not found, skipping",
                            col.name, group.base_question
                        );
                        continue;
                    }
                    for (category, cat_mask) in groups.iter() {
                        let mask: Vec<bool> = match filter_mask.as_ref() {
                            Some(f) => cat_mask.iter().zip(f.iter()).map(|(a, b)| *a && *b).collect(),
                            None => cat_mask.clone(),
                        };
                        column_records(
                            table, &col.name, category, &mask, &possible, &missing, weights,
                            &mut records,
                        );
                    }
                }
            }
            QuestionType::Ranking => {
                let (sub_table, sub_weights) = match filter_mask.as_ref() {
                    Some(f) => (
                        table.filter(f)?,
                        weights.map(|w| {
                            w.iter()
                                .zip(f.iter())
                                .filter_map(|(x, m)| if *m { Some(*x) } else { None })
                                .collect::<Vec<f64>>()
                        }),
                    ),
                    None => (table.clone(), weights.map(|w| w.to_vec())),
                };
                let columns: Vec<String> = group.columns().map(|(_, c)| c.name.clone()).collect();
                let possible: Vec<Code> = group.possible_values(&missing).into_iter().collect();
                let mut tables = ranking::compute(
                    &sub_table,
                    group.base_question,
                    &columns,
                    &possible,
                    categories,
                    sub_weights.as_deref(),
                )?;
                let labels: BTreeMap<Code, &String> = group
                    .entries
                    .iter()
                    .flat_map(|m| m.value_labels.iter().map(|(c, l)| (*c, l)))
                    .collect();
                for t in tables.iter_mut() {
                    for item in t.items.iter_mut() {
                        if let Some(l) = labels.get(&item.item) {
                            item.label = (*l).clone();
                        }
                    }
                }
                rankings.extend(tables);
            }
            QuestionType::OpenText | QuestionType::NumericOther | QuestionType::Unknown => {
                debug!(
                    "percentages: question {:?} has type {:?}, ignored",
                    group.base_question, group.question_type
                );
            }
        }
    }

    let category_names: Vec<String> = groups.into_iter().map(|(c, _)| c).collect();
    let pivoted = pivot(&records, catalog, &category_names);
    info!(
        "percentages: {} records, {} table rows, {} ranking tables",
        records.len(),
        pivoted.rows.len(),
        rankings.len()
    );
    Ok(PercentageOutput {
        records,
        table: pivoted,
        rankings,
    })
}

#[allow(clippy::too_many_arguments)]
fn column_records(
    table: &SurveyTable,
    column: &str,
    category: &str,
    mask: &[bool],
    possible: &BTreeSet<Code>,
    missing: &MissingNormalizer,
    weights: Option<&[f64]>,
    records: &mut Vec<PercentageRecord>,
) {
    let col = match table.column(column) {
        Some(c) => c,
        None => return,
    };
    let mut per_value: BTreeMap<Code, Tally> = possible.iter().map(|c| (*c, Tally::default())).collect();
    let mut answered = Tally::default();
    let mut missing_tally = Tally::default();
    for (row, _) in mask.iter().enumerate().filter(|(_, m)| **m) {
        let x = match col.number_at(row) {
            Some(x) => x,
            None => continue,
        };
        let w = weights.map(|w| w[row]).unwrap_or(1.0);
        if missing.is_missing(x) {
            missing_tally.push(w);
            continue;
        }
        answered.push(w);
        if let Some(t) = per_value.get_mut(&Code(x)) {
            t.push(w);
        }
    }
    let weighted = weights.is_some();
    let denominator = answered.mass(weighted);
    let mut push = |answer: AnswerKey, metric: Metric, value: f64| {
        records.push(PercentageRecord {
            question: column.to_string(),
            answer,
            metric,
            category: category.to_string(),
            value,
        })
    };
    for (code, t) in per_value.iter() {
        let answer = AnswerKey::Value(*code);
        push(answer, Metric::Count, t.count as f64);
        if weighted {
            push(answer, Metric::Weighted, t.weighted);
        }
        push(answer, Metric::Percentage, ratio(t.mass(weighted), denominator));
    }
    push(AnswerKey::Total, Metric::TotalCount, answered.count as f64);
    if weighted {
        push(AnswerKey::Total, Metric::TotalWeighted, answered.weighted);
    }
    push(AnswerKey::Total, Metric::MissingCount, missing_tally.count as f64);
    if weighted {
        push(AnswerKey::Total, Metric::MissingWeighted, missing_tally.weighted);
    }
    let missing_mass = missing_tally.mass(weighted);
    push(
        AnswerKey::Total,
        Metric::MissingPercentage,
        ratio(missing_mass, denominator + missing_mass),
    );
}

/// Pivots the long form with the categories as columns.
///
/// Rows follow the catalog column order, then the answer value and the metric.
/// Answers without a label are dropped, except for the totals.
pub fn pivot(records: &[PercentageRecord], catalog: &QuestionCatalog, categories: &[String]) -> PercentageTable {
    let labels = build_label_map(catalog);
    let cat_index: HashMap<&str, usize> = categories
        .iter()
        .enumerate()
        .map(|(i, c)| (c.as_str(), i))
        .collect();
    let mut cells: HashMap<(&str, AnswerKey, Metric), Vec<f64>> = HashMap::new();
    for r in records.iter() {
        let cidx = match cat_index.get(r.category.as_str()) {
            Some(i) => *i,
            None => continue,
        };
        let values = cells
            .entry((r.question.as_str(), r.answer, r.metric))
            .or_insert_with(|| vec![0.0; categories.len()]);
        values[cidx] = r.value;
    }

    let mut rows: Vec<PercentageRow> = Vec::new();
    for meta in catalog.entries() {
        for col in meta.columns.iter() {
            let mut keys: Vec<(AnswerKey, Metric)> = cells
                .keys()
                .filter(|(q, _, _)| *q == col.name)
                .map(|(_, a, m)| (*a, *m))
                .collect();
            keys.sort();
            for (answer, metric) in keys {
                let answer_label = match answer {
                    AnswerKey::Total => "Total".to_string(),
                    AnswerKey::Value(code) => match labels.get(&(col.name.clone(), code.to_string())) {
                        Some(l) => l.clone(),
                        None => continue,
                    },
                };
                let display_question_label = if meta.question_type == QuestionType::MultiResponse {
                    meta.base_label.clone()
                } else {
                    col.label.clone()
                };
                let values = cells
                    .get(&(col.name.as_str(), answer, metric))
                    .cloned()
                    .unwrap_or_default();
                rows.push(PercentageRow {
                    question: col.name.clone(),
                    base_question: meta.base_question.clone(),
                    display_question_label,
                    answer_label,
                    answer,
                    metric,
                    values,
                });
            }
        }
    }
    PercentageTable {
        categories: categories.to_vec(),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::{CellValue, RowPredicate};
    use crate::table::Column;

    fn labels(pairs: &[(f64, &str)]) -> ValueLabels {
        pairs.iter().map(|(c, l)| (Code(*c), l.to_string())).collect()
    }

    fn meta(base: &str, qt: QuestionType, cols: &[(&str, &str)], vl: ValueLabels) -> QuestionMeta {
        QuestionMeta {
            base_question: base.to_string(),
            question_type: qt,
            columns: cols
                .iter()
                .map(|(n, l)| AnswerColumn {
                    name: n.to_string(),
                    label: l.to_string(),
                })
                .collect(),
            value_labels: vl,
            base_label: format!("{} base", base),
        }
    }

    fn catalog() -> QuestionCatalog {
        QuestionCatalog::new(vec![
            meta(
                "Q1",
                QuestionType::SingleChoice,
                &[("Q1", "Satisfaction")],
                labels(&[(1.0, "Low"), (2.0, "Mid"), (3.0, "High"), (99.0, "Vet ikke")]),
            ),
            meta(
                "Q2",
                QuestionType::MultiResponse,
                &[("Q2_1", "Email"), ("Q2_2", "Phone")],
                labels(&[(0.0, "Not selected"), (1.0, "Selected")]),
            ),
            meta("Q3", QuestionType::OpenText, &[("Q3", "Comments")], ValueLabels::new()),
            meta(
                "Q4",
                QuestionType::SingleChoice,
                &[("Q4", "Unlabelled")],
                ValueLabels::new(),
            ),
        ])
        .unwrap()
    }

    fn table() -> SurveyTable {
        SurveyTable::from_columns(vec![
            (
                "Q1".to_string(),
                Column::Numeric(vec![Some(1.0), Some(2.0), Some(2.0), Some(99.0), None, Some(3.0)]),
            ),
            (
                "Q2_1".to_string(),
                Column::Numeric(vec![Some(1.0), Some(0.0), Some(1.0), Some(1.0), Some(0.0), Some(0.0)]),
            ),
            (
                "Q2_2".to_string(),
                Column::Numeric(vec![Some(0.0), Some(0.0), Some(1.0), None, Some(1.0), Some(1.0)]),
            ),
            (
                "Q3".to_string(),
                Column::Text(vec![Some("ok".to_string()), None, None, None, None, None]),
            ),
            (
                "All".to_string(),
                Column::Numeric(vec![Some(1.0); 6]),
            ),
            (
                "Young".to_string(),
                Column::Numeric(vec![Some(1.0), Some(1.0), Some(0.0), Some(1.0), Some(0.0), Some(0.0)]),
            ),
        ])
        .unwrap()
    }

    fn config() -> StatsConfig {
        let mut c = StatsConfig::default();
        c.missing_value_codes.insert(Code(99.0), "Vet ikke".to_string());
        c
    }

    fn cats() -> Vec<String> {
        vec!["All".to_string(), "Young".to_string()]
    }

    #[test]
    fn counts_and_percentages() {
        let out = compute(&table(), &catalog(), &cats(), &config(), None).unwrap();
        let t = &out.table;
        assert_eq!(t.categories, cats());
        let v2 = AnswerKey::Value(Code(2.0));
        assert_eq!(t.get("Q1", v2, Metric::Count, "All"), Some(2.0));
        assert_eq!(t.get("Q1", v2, Metric::Percentage, "All"), Some(0.5));
        assert_eq!(t.get("Q1", AnswerKey::Total, Metric::TotalCount, "All"), Some(4.0));
        assert_eq!(t.get("Q1", AnswerKey::Total, Metric::MissingCount, "All"), Some(1.0));
        assert_eq!(t.get("Q1", AnswerKey::Total, Metric::MissingPercentage, "All"), Some(0.2));
        assert_eq!(t.get("Q1", v2, Metric::Percentage, "Young"), Some(0.5));
        // The missing code is never a possible answer.
        assert_eq!(t.get("Q1", AnswerKey::Value(Code(99.0)), Metric::Count, "All"), None);
        // No weights, no weighted metrics.
        assert_eq!(t.get("Q1", v2, Metric::Weighted, "All"), None);
    }

    #[test]
    fn shares_add_up() {
        let weights = vec![1.5, 0.5, 2.0, 1.0, 1.0, 3.0];
        for w in [None, Some(weights.as_slice())] {
            let out = compute(&table(), &catalog(), &cats(), &config(), w).unwrap();
            for cat in cats() {
                let missing = out
                    .table
                    .get("Q1", AnswerKey::Total, Metric::MissingPercentage, &cat)
                    .unwrap();
                let answered: f64 = [1.0, 2.0, 3.0]
                    .iter()
                    .map(|c| {
                        out.table
                            .get("Q1", AnswerKey::Value(Code(*c)), Metric::Percentage, &cat)
                            .unwrap()
                    })
                    .sum();
                assert!((answered - 1.0).abs() < 1e-12);
                assert!((answered * (1.0 - missing) + missing - 1.0).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn weighted_metrics() {
        let weights = vec![1.5, 0.5, 2.0, 1.0, 1.0, 3.0];
        let out = compute(&table(), &catalog(), &cats(), &config(), Some(weights.as_slice())).unwrap();
        let t = &out.table;
        let v2 = AnswerKey::Value(Code(2.0));
        assert_eq!(t.get("Q1", v2, Metric::Weighted, "All"), Some(2.5));
        assert_eq!(t.get("Q1", AnswerKey::Total, Metric::TotalWeighted, "All"), Some(7.0));
        assert!((t.get("Q1", v2, Metric::Percentage, "All").unwrap() - 2.5 / 7.0).abs() < 1e-12);
        assert_eq!(t.get("Q1", AnswerKey::Total, Metric::MissingWeighted, "All"), Some(1.0));
        assert!(
            (t.get("Q1", AnswerKey::Total, Metric::MissingPercentage, "All").unwrap() - 1.0 / 8.0)
                .abs()
                < 1e-12
        );
        assert!(compute(&table(), &catalog(), &cats(), &config(), Some(&[1.0][..])).is_err());
    }

    #[test]
    fn multi_response_labels() {
        let out = compute(&table(), &catalog(), &cats(), &config(), None).unwrap();
        let rows: Vec<&PercentageRow> = out.table.rows.iter().filter(|r| r.question == "Q2_2").collect();
        assert!(rows.iter().all(|r| r.answer != AnswerKey::Value(Code(0.0))));
        let selected = rows
            .iter()
            .find(|r| r.answer == AnswerKey::Value(Code(1.0)) && r.metric == Metric::Percentage)
            .unwrap();
        assert_eq!(selected.answer_label, "Phone");
        assert_eq!(selected.display_question_label, "Q2 base");
        assert!((selected.values[0] - 0.6).abs() < 1e-12);
        // Value 0 is still in the long form.
        assert!(out
            .records
            .iter()
            .any(|r| r.question == "Q2_2" && r.answer == AnswerKey::Value(Code(0.0))));
    }

    #[test]
    fn row_order_and_skipped_groups() {
        let out = compute(&table(), &catalog(), &cats(), &config(), None).unwrap();
        let questions: Vec<&str> = out.table.rows.iter().map(|r| r.question.as_str()).collect();
        let first_q2 = questions.iter().position(|q| *q == "Q2_1").unwrap();
        assert!(questions[..first_q2].iter().all(|q| *q == "Q1"));
        assert!(!questions.contains(&"Q3"));
        assert!(!questions.contains(&"Q4"));
        let q1_rows: Vec<&PercentageRow> = out.table.rows.iter().filter(|r| r.question == "Q1").collect();
        assert_eq!(q1_rows[0].answer, AnswerKey::Value(Code(1.0)));
        assert_eq!(q1_rows[0].answer_label, "Low");
        assert_eq!(q1_rows.last().unwrap().answer_label, "Total");
    }

    #[test]
    fn question_filters() {
        let mut config = config();
        config.question_filters.insert(
            "Q1".to_string(),
            RowPredicate::equals("Q2_1", CellValue::Number(1.0)),
        );
        config
            .question_filters
            .insert("Q2".to_string(), RowPredicate::not_null("NoSuchColumn"));
        let out = compute(&table(), &catalog(), &cats(), &config, None).unwrap();
        // Rows 0, 2 and 3 answered Q2_1 = 1: Q1 values 1, 2 and the missing code.
        assert_eq!(
            out.table.get("Q1", AnswerKey::Total, Metric::TotalCount, "All"),
            Some(2.0)
        );
        assert!(out.table.rows.iter().all(|r| !r.question.starts_with("Q2")));
    }

    #[test]
    fn without_categories() {
        let out = compute(&table(), &catalog(), &[], &config(), None).unwrap();
        assert_eq!(out.table.categories, vec!["Overall".to_string()]);
        assert_eq!(
            out.table.get("Q1", AnswerKey::Total, Metric::TotalCount, "Overall"),
            Some(4.0)
        );
    }

    #[test]
    fn rejects_empty_inputs() {
        let empty = SurveyTable::new();
        assert!(matches!(
            compute(&empty, &catalog(), &cats(), &config(), None),
            Err(StatsError::EmptyDataset {})
        ));
        assert!(matches!(
            compute(&table(), &QuestionCatalog::default(), &cats(), &config(), None),
            Err(StatsError::EmptyCatalog {})
        ));
    }

    #[test]
    fn delegates_rankings() {
        let catalog = QuestionCatalog::new(vec![meta(
            "Q7",
            QuestionType::Ranking,
            &[("Q7M1", "First"), ("Q7M2", "Second")],
            labels(&[(1.0, "Price"), (2.0, "Quality")]),
        )])
        .unwrap();
        let table = SurveyTable::from_columns(vec![
            ("Q7M1".to_string(), Column::Numeric(vec![Some(1.0), Some(2.0)])),
            ("Q7M2".to_string(), Column::Numeric(vec![Some(2.0), Some(1.0)])),
        ])
        .unwrap();
        let out = compute(&table, &catalog, &[], &StatsConfig::default(), None).unwrap();
        assert_eq!(out.rankings.len(), 1);
        assert_eq!(out.rankings[0].items[0].label, "Price");
        assert!((out.rankings[0].items[1].total_score - 1.5).abs() < 1e-12);
        assert!(out.table.rows.is_empty());
    }
}

//! Engagement classification (ENI).
//!
//! Each respondent is put in one of three classes from the average of their
//! answers to the questions of an area. The same three-way split is also
//! applied to the answer values of the percentage table.

use std::collections::BTreeMap;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::config::*;
use crate::percentage::{AnswerKey, Metric, PercentageTable};
use crate::stats::{ratio, row_mean};
use crate::table::SurveyTable;

/// The three engagement classes, by increasing average.
#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum EniClass {
    #[serde(rename = "1")]
    Low,
    #[serde(rename = "2")]
    Middle,
    #[serde(rename = "3")]
    High,
}

impl EniClass {
    pub const ALL: [EniClass; 3] = [EniClass::Low, EniClass::Middle, EniClass::High];

    /// Below 3 is low, from 4.2 on is high.
    pub fn classify(average: f64) -> EniClass {
        if average >= 4.2 {
            EniClass::High
        } else if average >= 3.0 {
            EniClass::Middle
        } else {
            EniClass::Low
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EniClass::Low => "1",
            EniClass::Middle => "2",
            EniClass::High => "3",
        }
    }

    fn position(&self) -> usize {
        match self {
            EniClass::Low => 0,
            EniClass::Middle => 1,
            EniClass::High => 2,
        }
    }
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct EniRow {
    pub category: String,
    /// Share of the respondents in each class, in the order of `EniClass::ALL`.
    pub proportions: [f64; 3],
}

impl EniRow {
    pub fn proportion(&self, class: EniClass) -> f64 {
        self.proportions[class.position()]
    }
}

#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct EniTable {
    pub area: String,
    pub rows: Vec<EniRow>,
}

/// Classifies the respondents on the average of the questions of `area`.
///
/// The table must be cleaned of its missing codes. Respondents without any
/// valid answer in the area are not counted.
pub fn compute(
    cleaned: &SurveyTable,
    config: &StatsConfig,
    area: &str,
    categories: &[String],
    weights: Option<&[f64]>,
) -> StatsResult<EniTable> {
    if let Some(w) = weights {
        ensure!(
            w.len() == cleaned.row_count(),
            LengthMismatchSnafu {
                column: "weights",
                expected: cleaned.row_count(),
                actual: w.len()
            }
        );
    }
    let mut res = EniTable {
        area: area.to_string(),
        rows: vec![],
    };
    let questions: Vec<&[Option<f64>]> = match config.area_questions(area) {
        Some(qs) => qs.iter().filter_map(|q| cleaned.numeric(q)).collect(),
        None => {
            warn!("eni: area {:?} is not in the area map", area);
            return Ok(res);
        }
    };
    if questions.is_empty() {
        warn!("eni: no question of area {:?} found in the table", area);
        return Ok(res);
    }
    let classes: Vec<Option<EniClass>> = (0..cleaned.row_count())
        .map(|row| row_mean(questions.iter().map(|q| q[row])).map(EniClass::classify))
        .collect();
    info!(
        "eni: area {:?}, {} questions, {} classified respondents",
        area,
        questions.len(),
        classes.iter().filter(|c| c.is_some()).count()
    );

    for (category, mask) in cleaned.category_groups(categories, "eni") {
        let mut mass = [0.0; 3];
        for (row, class) in classes.iter().enumerate() {
            if let (true, Some(class)) = (mask[row], class) {
                mass[class.position()] += weights.map(|w| w[row]).unwrap_or(1.0);
            }
        }
        let total: f64 = mass.iter().sum();
        if total <= 0.0 {
            warn!("eni: no classified respondent in category {:?}, skipping", category);
            continue;
        }
        debug!("eni: category {:?}: {:?} of {}", category, mass, total);
        res.rows.push(EniRow {
            category,
            proportions: [
                ratio(mass[0], total),
                ratio(mass[1], total),
                ratio(mass[2], total),
            ],
        });
    }
    Ok(res)
}

/// The answer values of the percentage table regrouped in three buckets.
#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum EniBucket {
    #[serde(rename = "1-2")]
    Detractors,
    #[serde(rename = "3-4")]
    Neutral,
    #[serde(rename = "5")]
    Promoters,
    Other,
}

impl EniBucket {
    pub fn of(answer: &AnswerKey) -> EniBucket {
        match answer {
            AnswerKey::Value(c) if *c == Code(1.0) || *c == Code(2.0) => EniBucket::Detractors,
            AnswerKey::Value(c) if *c == Code(3.0) || *c == Code(4.0) => EniBucket::Neutral,
            AnswerKey::Value(c) if *c == Code(5.0) => EniBucket::Promoters,
            _ => EniBucket::Other,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EniBucket::Detractors => "1-2",
            EniBucket::Neutral => "3-4",
            EniBucket::Promoters => "5",
            EniBucket::Other => "Other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EniBucket::Detractors => "Motarbeidere",
            EniBucket::Neutral => "Nøytrale",
            EniBucket::Promoters => "Engasjerte",
            EniBucket::Other => "Ukjent",
        }
    }
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct EniRegroupRow {
    pub question: String,
    pub bucket: EniBucket,
    pub label: String,
    pub metric: Metric,
    /// One value per category of the regrouped table.
    pub values: Vec<f64>,
}

#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct EniRegroupTable {
    pub categories: Vec<String>,
    pub rows: Vec<EniRegroupRow>,
}

impl EniRegroupTable {
    pub fn get(&self, question: &str, bucket: EniBucket, metric: Metric, category: &str) -> Option<f64> {
        let cidx = self.categories.iter().position(|c| c == category)?;
        self.rows
            .iter()
            .find(|r| r.question == question && r.bucket == bucket && r.metric == metric)
            .map(|r| r.values[cidx])
    }
}

/// Sums the rows of the percentage table per (question, bucket, metric).
///
/// Rows are sorted by question, bucket and metric.
pub fn percentage_regroup(percentages: &PercentageTable, categories: &[String]) -> EniRegroupTable {
    let indices: Vec<(String, usize)> = categories
        .iter()
        .filter_map(|c| match percentages.categories.iter().position(|x| x == c) {
            Some(i) => Some((c.clone(), i)),
            None => {
                warn!("eni: category {:?} not in the percentage table, skipping", c);
                None
            }
        })
        .collect();
    let mut sums: BTreeMap<(&str, EniBucket, Metric), Vec<f64>> = BTreeMap::new();
    for row in percentages.rows.iter() {
        let values = sums
            .entry((row.question.as_str(), EniBucket::of(&row.answer), row.metric))
            .or_insert_with(|| vec![0.0; indices.len()]);
        for (v, (_, i)) in values.iter_mut().zip(indices.iter()) {
            *v += row.values[*i];
        }
    }
    EniRegroupTable {
        categories: indices.into_iter().map(|(c, _)| c).collect(),
        rows: sums
            .into_iter()
            .map(|((question, bucket, metric), values)| EniRegroupRow {
                question: question.to_string(),
                bucket,
                label: bucket.label().to_string(),
                metric,
                values,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::percentage::PercentageRow;
    use crate::table::Column;

    #[test]
    fn class_boundaries() {
        assert_eq!(EniClass::classify(3.0), EniClass::Middle);
        assert_eq!(EniClass::classify(4.2), EniClass::High);
        assert_eq!(EniClass::classify(2.9), EniClass::Low);
        assert_eq!(EniClass::classify(4.19), EniClass::Middle);
    }

    fn config() -> StatsConfig {
        StatsConfig {
            area_map: vec![AreaGroup {
                area: "Engasjement".to_string(),
                questions: vec!["E1".to_string(), "E2".to_string()],
            }],
            ..StatsConfig::default()
        }
    }

    fn table() -> SurveyTable {
        let num = |v: &[Option<f64>]| Column::Numeric(v.to_vec());
        SurveyTable::from_columns(vec![
            // Averages: 3.0, 4.2, 2.9, none.
            ("E1".to_string(), num(&[Some(3.0), Some(4.4), Some(2.8), None])),
            ("E2".to_string(), num(&[Some(3.0), Some(4.0), Some(3.0), None])),
            ("All".to_string(), num(&[Some(1.0); 4])),
            ("Some".to_string(), num(&[Some(0.0), Some(1.0), Some(1.0), Some(1.0)])),
        ])
        .unwrap()
    }

    #[test]
    fn proportions_per_category() {
        let cats = vec!["All".to_string(), "Some".to_string()];
        let t = compute(&table(), &config(), "Engasjement", &cats, None).unwrap();
        assert_eq!(t.rows.len(), 2);
        for row in t.rows.iter() {
            assert!((row.proportions.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        }
        let all = &t.rows[0];
        for class in EniClass::ALL {
            assert!((all.proportion(class) - 1.0 / 3.0).abs() < 1e-12);
        }
        let some = &t.rows[1];
        assert_eq!(some.proportion(EniClass::Middle), 0.0);
        assert_eq!(some.proportion(EniClass::High), 0.5);

        let w = vec![1.0, 2.0, 1.0, 5.0];
        let t = compute(&table(), &config(), "Engasjement", &cats, Some(w.as_slice())).unwrap();
        assert_eq!(t.rows[0].proportion(EniClass::High), 0.5);
    }

    #[test]
    fn weights_of_the_wrong_length() {
        let res = compute(&table(), &config(), "Engasjement", &["All".to_string()], Some(&[1.0]));
        assert!(matches!(
            res,
            Err(StatsError::LengthMismatch {
                expected: 4,
                actual: 1,
                ..
            })
        ));
    }

    #[test]
    fn overall_and_unknown_area() {
        let t = compute(&table(), &config(), "Engasjement", &[], None).unwrap();
        assert_eq!(t.rows.len(), 1);
        assert_eq!(t.rows[0].category, "Overall");
        assert!(compute(&table(), &config(), "Ledelse", &[], None)
            .unwrap()
            .rows
            .is_empty());
    }

    #[test]
    fn regroups_percentages() {
        let row = |answer: AnswerKey, metric: Metric, values: Vec<f64>| PercentageRow {
            question: "Q1".to_string(),
            base_question: "Q1".to_string(),
            display_question_label: "Q1".to_string(),
            answer_label: answer.to_string(),
            answer,
            metric,
            values,
        };
        let table = PercentageTable {
            categories: vec!["A".to_string(), "B".to_string()],
            rows: vec![
                row(AnswerKey::Value(Code(1.0)), Metric::Percentage, vec![0.1, 0.2]),
                row(AnswerKey::Value(Code(2.0)), Metric::Percentage, vec![0.2, 0.0]),
                row(AnswerKey::Value(Code(3.0)), Metric::Percentage, vec![0.3, 0.3]),
                row(AnswerKey::Value(Code(5.0)), Metric::Percentage, vec![0.4, 0.5]),
                row(AnswerKey::Total, Metric::TotalCount, vec![10.0, 4.0]),
            ],
        };
        let cats = vec!["B".to_string(), "C".to_string()];
        let r = percentage_regroup(&table, &cats);
        assert_eq!(r.categories, vec!["B".to_string()]);
        assert_eq!(r.get("Q1", EniBucket::Detractors, Metric::Percentage, "B"), Some(0.2));
        assert_eq!(r.get("Q1", EniBucket::Promoters, Metric::Percentage, "B"), Some(0.5));
        assert_eq!(r.get("Q1", EniBucket::Other, Metric::TotalCount, "B"), Some(4.0));
        let buckets: Vec<EniBucket> = r.rows.iter().map(|r| r.bucket).collect();
        assert_eq!(
            buckets,
            vec![
                EniBucket::Detractors,
                EniBucket::Neutral,
                EniBucket::Promoters,
                EniBucket::Other
            ]
        );
        assert_eq!(r.rows[1].label, "Nøytrale");
    }
}

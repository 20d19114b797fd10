use std::collections::HashMap;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::config::*;
use crate::eni::{self, EniRegroupTable, EniTable};
use crate::index::{self, IndexOptions, IndexOutput};
use crate::ipf::{self, CalibrationDimension, IpfOutcome};
use crate::missing::MissingNormalizer;
use crate::percentage::{self, PercentageOutput};
use crate::table::{Column, SurveyTable};

/// The weight column written by a calibration when none is configured.
pub const DEFAULT_WEIGHT_COLUMN: &str = "weight";

/// A non-blank answer to an open question.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenTextResponse {
    pub base_question: String,
    pub response: String,
}

/// A survey being tabulated.
///
/// The session owns the respondent table and the respondent weights, and keeps
/// the latest result of every aggregator so that they can be combined (the ENI
/// regrouping reuses the last percentage table).
///
/// ```
/// use survey_stats::*;
///
/// let table = SurveyTable::from_columns(vec![
///     ("Q1".to_string(), Column::Numeric(vec![Some(2.0), Some(3.0), Some(4.0), Some(5.0)])),
///     ("All".to_string(), Column::Numeric(vec![Some(1.0); 4])),
/// ])?;
/// let catalog = QuestionCatalog::new(vec![QuestionMeta {
///     base_question: "Q1".to_string(),
///     question_type: QuestionType::SingleChoice,
///     columns: vec![AnswerColumn { name: "Q1".to_string(), label: "Q1".to_string() }],
///     value_labels: ValueLabels::new(),
///     base_label: "Q1".to_string(),
/// }])?;
/// let config = StatsConfig {
///     area_map: vec![AreaGroup { area: "A".to_string(), questions: vec!["Q1".to_string()] }],
///     ..StatsConfig::default()
/// };
/// let mut session = SurveySession::new(table, catalog, config, &["All".to_string()])?;
/// let index = session.index(false, &IndexOptions::default())?;
/// let q1 = IndexColumn::Question { area: "A".to_string(), question: "Q1".to_string() };
/// assert_eq!(index.table.get("All", &q1), Some(3.5));
/// # Ok::<(), StatsError>(())
/// ```
#[derive(Debug, Clone)]
pub struct SurveySession {
    table: SurveyTable,
    catalog: QuestionCatalog,
    config: StatsConfig,
    categories: Vec<String>,
    weights: Option<Vec<f64>>,
    calibration: Option<IpfOutcome>,
    percentages: Option<PercentageOutput>,
    index: Option<IndexOutput>,
    eni: Option<EniTable>,
    eni_regroup: Option<EniRegroupTable>,
}

impl SurveySession {
    /// Starts a session. If the configuration names a weight column present
    /// in the table, its values become the respondent weights.
    pub fn new(
        table: SurveyTable,
        catalog: QuestionCatalog,
        config: StatsConfig,
        categories: &[String],
    ) -> StatsResult<SurveySession> {
        ensure!(table.row_count() > 0, EmptyDatasetSnafu {});
        ensure!(!catalog.is_empty(), EmptyCatalogSnafu {});
        let weights = match config.weight_column.as_deref() {
            Some(name) if table.has_column(name) => Some(read_weights(&table, name)?),
            Some(name) => {
                info!("session: weight column {:?} not in the table yet", name);
                None
            }
            None => None,
        };
        info!(
            "session: {} respondents, {} questions, categories: {:?}",
            table.row_count(),
            catalog.entries().len(),
            categories
        );
        Ok(SurveySession {
            table,
            catalog,
            config,
            categories: categories.to_vec(),
            weights,
            calibration: None,
            percentages: None,
            index: None,
            eni: None,
            eni_regroup: None,
        })
    }

    pub fn table(&self) -> &SurveyTable {
        &self.table
    }

    pub fn catalog(&self) -> &QuestionCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &StatsConfig {
        &self.config
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn weights(&self) -> Option<&[f64]> {
        self.weights.as_deref()
    }

    pub fn calibration(&self) -> Option<&IpfOutcome> {
        self.calibration.as_ref()
    }

    pub fn latest_percentages(&self) -> Option<&PercentageOutput> {
        self.percentages.as_ref()
    }

    pub fn latest_index(&self) -> Option<&IndexOutput> {
        self.index.as_ref()
    }

    pub fn latest_eni(&self) -> Option<&EniTable> {
        self.eni.as_ref()
    }

    pub fn latest_eni_regroup(&self) -> Option<&EniRegroupTable> {
        self.eni_regroup.as_ref()
    }

    /// Replaces the respondent weights, and the weight column of the table.
    pub fn set_weights(&mut self, weights: Vec<f64>) -> StatsResult<()> {
        for (row, w) in weights.iter().enumerate() {
            ensure!(*w > 0.0 && w.is_finite(), InvalidWeightSnafu { row, value: *w });
        }
        let name = self
            .config
            .weight_column
            .clone()
            .unwrap_or_else(|| DEFAULT_WEIGHT_COLUMN.to_string());
        self.table
            .set_column(&name, Column::Numeric(weights.iter().map(|w| Some(*w)).collect()))?;
        self.weights = Some(weights);
        Ok(())
    }

    /// Computes the weights by raking on the given dimensions.
    ///
    /// The weights are kept even when the fitting did not converge.
    pub fn calibrate(
        &mut self,
        dimensions: &[CalibrationDimension],
        targets: &[HashMap<String, f64>],
        settings: &IpfSettings,
    ) -> StatsResult<&IpfOutcome> {
        let outcome = ipf::solve(self.table.row_count(), dimensions, targets, settings)?;
        self.set_weights(outcome.weights.clone())?;
        Ok(self.calibration.insert(outcome))
    }

    fn weights_for(&self, use_weights: bool) -> Option<&[f64]> {
        if !use_weights {
            return None;
        }
        if self.weights.is_none() {
            warn!("session: weights requested but none are available, computing unweighted");
        }
        self.weights.as_deref()
    }

    pub fn percentages(&mut self, use_weights: bool) -> StatsResult<&PercentageOutput> {
        let out = percentage::compute(
            &self.table,
            &self.catalog,
            &self.categories,
            &self.config,
            self.weights_for(use_weights),
        )?;
        Ok(self.percentages.insert(out))
    }

    pub fn index(&mut self, use_weights: bool, options: &IndexOptions) -> StatsResult<&IndexOutput> {
        let out = index::compute(
            &self.table,
            &self.catalog,
            &self.config,
            &self.categories,
            self.weights_for(use_weights),
            options,
        )?;
        Ok(self.index.insert(out))
    }

    /// Classifies the respondents on `area`, and regroups the latest
    /// percentage table if there is one.
    pub fn eni(&mut self, area: &str, use_weights: bool) -> StatsResult<&EniTable> {
        let cleaned = MissingNormalizer::new(&self.config).normalize(&self.table, &self.catalog);
        let out = eni::compute(
            cleaned.table(),
            &self.config,
            area,
            &self.categories,
            self.weights_for(use_weights),
        )?;
        self.eni_regroup = self
            .percentages
            .as_ref()
            .map(|p| eni::percentage_regroup(&p.table, &p.table.categories));
        Ok(self.eni.insert(out))
    }

    /// The non-blank answers of the open text questions.
    pub fn open_text(&self) -> Vec<OpenTextResponse> {
        let mut res: Vec<OpenTextResponse> = Vec::new();
        for meta in self.catalog.entries() {
            if meta.question_type != QuestionType::OpenText {
                continue;
            }
            let before = res.len();
            for col in meta.columns.iter() {
                let column = match self.table.column(&col.name) {
                    Some(c) => c,
                    None => {
                        warn!("open_text: column {:?} not found", col.name);
                        continue;
                    }
                };
                for row in 0..self.table.row_count() {
                    if let Some(text) = column.text_at(row) {
                        if !text.trim().is_empty() {
                            res.push(OpenTextResponse {
                                base_question: meta.base_question.clone(),
                                response: text,
                            });
                        }
                    }
                }
            }
            info!(
                "open_text: {} responses to {:?}",
                res.len() - before,
                meta.base_question
            );
        }
        res
    }
}

fn read_weights(table: &SurveyTable, name: &str) -> StatsResult<Vec<f64>> {
    let col = table.column(name).context(ColumnNotFoundSnafu { column: name })?;
    let mut res: Vec<f64> = Vec::with_capacity(table.row_count());
    for row in 0..table.row_count() {
        let w = col.number_at(row).unwrap_or(f64::NAN);
        ensure!(w > 0.0 && w.is_finite(), InvalidWeightSnafu { row, value: w });
        res.push(w);
    }
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eni::{EniBucket, EniClass};
    use crate::index::IndexColumn;
    use crate::percentage::{AnswerKey, Metric};

    fn labels() -> ValueLabels {
        [1.0, 2.0, 3.0, 4.0, 5.0]
            .iter()
            .map(|c| (Code(*c), format!("{}", c)))
            .collect()
    }

    fn catalog() -> QuestionCatalog {
        QuestionCatalog::new(vec![
            QuestionMeta {
                base_question: "Q1".to_string(),
                question_type: QuestionType::SingleChoice,
                columns: vec![AnswerColumn {
                    name: "Q1".to_string(),
                    label: "Engaged".to_string(),
                }],
                value_labels: labels(),
                base_label: "Engaged".to_string(),
            },
            QuestionMeta {
                base_question: "Q2".to_string(),
                question_type: QuestionType::OpenText,
                columns: vec![AnswerColumn {
                    name: "Q2".to_string(),
                    label: "Comments".to_string(),
                }],
                value_labels: ValueLabels::new(),
                base_label: "Comments".to_string(),
            },
        ])
        .unwrap()
    }

    fn table() -> SurveyTable {
        SurveyTable::from_columns(vec![
            (
                "Q1".to_string(),
                Column::Numeric(vec![Some(2.0), Some(3.0), Some(4.0), Some(5.0)]),
            ),
            (
                "Q2".to_string(),
                Column::Text(vec![
                    Some("Good".to_string()),
                    Some("  ".to_string()),
                    None,
                    Some("More coffee".to_string()),
                ]),
            ),
            (
                "Gender".to_string(),
                Column::Text(vec![
                    Some("F".to_string()),
                    Some("M".to_string()),
                    Some("M".to_string()),
                    Some("M".to_string()),
                ]),
            ),
            ("All".to_string(), Column::Numeric(vec![Some(1.0); 4])),
        ])
        .unwrap()
    }

    fn config() -> StatsConfig {
        StatsConfig {
            area_map: vec![AreaGroup {
                area: "Engagement".to_string(),
                questions: vec!["Q1".to_string()],
            }],
            minimum_count: 2,
            ..StatsConfig::default()
        }
    }

    fn session() -> SurveySession {
        SurveySession::new(table(), catalog(), config(), &["All".to_string()]).unwrap()
    }

    #[test]
    fn end_to_end_index() {
        let mut s = session();
        let q1 = IndexColumn::Question {
            area: "Engagement".to_string(),
            question: "Q1".to_string(),
        };
        assert_eq!(s.index(false, &IndexOptions::default()).unwrap().table.get("All", &q1), Some(3.5));

        let mut config = config();
        config.minimum_count = 5;
        let mut s = SurveySession::new(table(), catalog(), config, &["All".to_string()]).unwrap();
        assert_eq!(s.index(false, &IndexOptions::default()).unwrap().table.get("All", &q1), None);
    }

    #[test]
    fn calibrated_weights_flow_into_aggregates() {
        let mut s = session();
        let gender = CalibrationDimension::from_column(s.table(), "Gender", None).unwrap();
        let targets: HashMap<String, f64> =
            [("F".to_string(), 3.0), ("M".to_string(), 3.0)].into_iter().collect();
        let outcome = s.calibrate(&[gender], &[targets], &IpfSettings::default()).unwrap();
        assert!(outcome.converged);
        assert_eq!(s.weights(), Some(&[3.0, 1.0, 1.0, 1.0][..]));
        assert_eq!(s.table().numeric("weight").unwrap()[0], Some(3.0));

        let p = s.percentages(true).unwrap();
        let share = p
            .table
            .get("Q1", AnswerKey::Value(Code(2.0)), Metric::Percentage, "All")
            .unwrap();
        assert!((share - 0.5).abs() < 1e-12);
        let p = s.percentages(false).unwrap();
        let share = p
            .table
            .get("Q1", AnswerKey::Value(Code(2.0)), Metric::Percentage, "All")
            .unwrap();
        assert!((share - 0.25).abs() < 1e-12);
    }

    #[test]
    fn eni_reuses_the_percentages() {
        let mut s = session();
        s.eni("Engagement", false).unwrap();
        assert!(s.latest_eni_regroup().is_none());
        s.percentages(false).unwrap();
        let eni = s.eni("Engagement", false).unwrap();
        assert_eq!(eni.rows[0].proportion(EniClass::Low), 0.25);
        assert_eq!(eni.rows[0].proportion(EniClass::Middle), 0.5);
        assert_eq!(eni.rows[0].proportion(EniClass::High), 0.25);
        let regroup = s.latest_eni_regroup().unwrap();
        assert_eq!(
            regroup.get("Q1", EniBucket::Neutral, Metric::Percentage, "All"),
            Some(0.5)
        );
    }

    #[test]
    fn weights_from_the_table() {
        let mut config = config();
        config.weight_column = Some("w".to_string());
        let t = table()
            .with_column("w", Column::Numeric(vec![Some(1.0), Some(2.0), Some(1.0), Some(1.0)]))
            .unwrap();
        let s = SurveySession::new(t.clone(), catalog(), config.clone(), &[]).unwrap();
        assert_eq!(s.weights(), Some(&[1.0, 2.0, 1.0, 1.0][..]));

        let bad = t
            .with_column("w", Column::Numeric(vec![Some(1.0), None, Some(1.0), Some(1.0)]))
            .unwrap();
        assert!(matches!(
            SurveySession::new(bad, catalog(), config, &[]),
            Err(StatsError::InvalidWeight { row: 1, .. })
        ));
    }

    #[test]
    fn open_text_answers() {
        let answers = session().open_text();
        assert_eq!(
            answers,
            vec![
                OpenTextResponse {
                    base_question: "Q2".to_string(),
                    response: "Good".to_string()
                },
                OpenTextResponse {
                    base_question: "Q2".to_string(),
                    response: "More coffee".to_string()
                },
            ]
        );
    }
}

//! Missing-value normalization.
//!
//! Codebooks reserve some codes for "no answer" (typically 98, 99). Before any
//! numeric aggregation these codes are turned into nulls, and a flag per cell
//! records that the respondent did answer with a missing code.

use std::collections::{BTreeSet, HashMap};

use log::debug;

use crate::config::*;
use crate::table::{Column, SurveyTable};

#[derive(Debug, Clone)]
pub struct MissingNormalizer {
    codes: BTreeSet<Code>,
}

impl MissingNormalizer {
    pub fn new(config: &StatsConfig) -> MissingNormalizer {
        MissingNormalizer {
            codes: config.missing_value_codes.keys().cloned().collect(),
        }
    }

    pub fn from_codes(codes: &[f64]) -> MissingNormalizer {
        MissingNormalizer {
            codes: codes.iter().map(|x| Code(*x)).collect(),
        }
    }

    pub fn is_missing(&self, x: f64) -> bool {
        self.codes.contains(&Code(x))
    }

    pub fn has_codes(&self) -> bool {
        !self.codes.is_empty()
    }

    /// True if the codebook declares at least one missing code.
    pub fn applies_to(&self, labels: &ValueLabels) -> bool {
        labels.keys().any(|c| self.codes.contains(c))
    }

    /// Nulls out the missing codes of every answer column whose codebook
    /// declares one, and records where they were.
    pub fn normalize(&self, table: &SurveyTable, catalog: &QuestionCatalog) -> CleanedTable {
        let mut cleaned = table.clone();
        let mut flags: HashMap<String, Vec<bool>> = HashMap::new();
        for name in table.column_names() {
            let labels = match catalog.value_labels(name) {
                Some(labels) if self.applies_to(labels) => labels,
                _ => continue,
            };
            let values = match table.numeric(name) {
                Some(v) => v,
                None => {
                    debug!("normalize: column {:?} is not numeric, skipping", name);
                    continue;
                }
            };
            let col_flags: Vec<bool> = values
                .iter()
                .map(|x| matches!(x, Some(x) if self.is_missing(*x)))
                .collect();
            let col_values: Vec<Option<f64>> = values
                .iter()
                .zip(col_flags.iter())
                .map(|(x, flag)| if *flag { None } else { *x })
                .collect();
            debug!(
                "normalize: column {:?} ({} codes in codebook): {} missing cells",
                name,
                labels.len(),
                col_flags.iter().filter(|f| **f).count()
            );
            // Same length as the source column, this cannot fail.
            if cleaned.set_column(name, Column::Numeric(col_values)).is_ok() {
                flags.insert(name.clone(), col_flags);
            }
        }
        CleanedTable {
            table: cleaned,
            flags,
        }
    }
}

/// A table snapshot where the missing codes have been replaced with nulls.
#[derive(Debug, Clone)]
pub struct CleanedTable {
    table: SurveyTable,
    flags: HashMap<String, Vec<bool>>,
}

impl CleanedTable {
    pub fn table(&self) -> &SurveyTable {
        &self.table
    }

    /// Per row: did this cell hold a missing code? None if the column was not normalized.
    pub fn missing_flags(&self, column: &str) -> Option<&[bool]> {
        self.flags.get(column).map(|v| v.as_slice())
    }

    /// Number of missing codes in the column among the rows of the mask.
    pub fn missing_count(&self, column: &str, mask: &[bool]) -> usize {
        match self.flags.get(column) {
            Some(flags) => flags
                .iter()
                .zip(mask.iter())
                .filter(|(f, m)| **f && **m)
                .count(),
            None => 0,
        }
    }
}

//! Weighted statistics for survey datasets.
//!
//! The crate computes calibration weights by iterative proportional fitting
//! and turns respondent-level answers into grouped tables: answer
//! distributions, rankings, question and area indices, correlations with an
//! area average, and an engagement classification.
//!
//! All computations are in memory. Reading the survey files is left to the
//! caller (see the `surveytab` program for a complete pipeline, and the
//! [manual] for the formats it reads).

mod config;
mod stats;

pub mod correlation;
pub mod eni;
pub mod index;
pub mod ipf;
pub mod manual;
pub mod missing;
pub mod percentage;
pub mod predicate;
pub mod ranking;
pub mod session;
pub mod table;

pub use crate::config::*;
pub use crate::correlation::CorrelationRecord;
pub use crate::eni::{EniBucket, EniClass, EniRegroupTable, EniTable};
pub use crate::index::{IndexColumn, IndexOptions, IndexOutput, IndexTable};
pub use crate::ipf::{CalibrationDimension, IpfOutcome, PopulationTargets};
pub use crate::missing::{CleanedTable, MissingNormalizer};
pub use crate::percentage::{AnswerKey, Metric, PercentageOutput, PercentageTable};
pub use crate::predicate::{CellValue, RowPredicate};
pub use crate::ranking::{RankedItem, RankingTable};
pub use crate::session::{OpenTextResponse, SurveySession};
pub use crate::table::{Column, SurveyTable};

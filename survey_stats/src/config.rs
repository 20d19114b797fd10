// ********* Input data structures ***********

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::Display;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use ordered_float::OrderedFloat;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use snafu::prelude::*;

use crate::predicate::RowPredicate;

/// A coded answer value, as found in the answer columns and in the codebook.
///
/// Survey codebooks store their codes as floating point numbers. Equality,
/// hashing and ordering follow `OrderedFloat` so that codes can be used as
/// keys: all NaNs are equal and sort last, and -0 equals 0.
#[derive(Debug, Clone, Copy)]
pub struct Code(pub f64);

impl Code {
    pub fn value(&self) -> f64 {
        self.0
    }

    /// True if the code is a whole number, which is the case for all the
    /// usual Likert and choice codes.
    pub fn is_integral(&self) -> bool {
        self.0.is_finite() && self.0.fract() == 0.0
    }

    fn key(&self) -> OrderedFloat<f64> {
        OrderedFloat(self.0)
    }
}

impl PartialEq for Code {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Code {}

impl Hash for Code {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for Code {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Code {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl From<f64> for Code {
    fn from(x: f64) -> Self {
        Code(x)
    }
}

impl Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_integral() && self.0.abs() < 1e15 {
            write!(f, "{}", self.0 as i64)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl FromStr for Code {
    type Err = std::num::ParseFloatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<f64>().map(Code)
    }
}

// Codes are written out as strings: they are mostly used as JSON object keys.
impl Serialize for Code {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct CodeVisitor;

impl<'de> Visitor<'de> for CodeVisitor {
    type Value = Code;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a numeric answer code, as a number or a string")
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Code, E> {
        Ok(Code(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Code, E> {
        Ok(Code(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Code, E> {
        Ok(Code(v as f64))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Code, E> {
        v.parse::<Code>()
            .map_err(|_| E::custom(format!("not a numeric code: {:?}", v)))
    }
}

impl<'de> Deserialize<'de> for Code {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(CodeVisitor)
    }
}

/// The codebook of a question: raw coded value -> human label.
pub type ValueLabels = BTreeMap<Code, String>;

/// The kind of a question, as extracted from the codebook.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    SingleChoice,
    /// One 0/1 column per option.
    MultiResponse,
    Grid,
    /// One column per rank slot, the column name ends with the rank position.
    Ranking,
    OpenText,
    NumericOther,
    Unknown,
}

/// A single answer column of a question.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct AnswerColumn {
    pub name: String,
    /// Display label of this column (the option text for multi-response questions).
    #[serde(default)]
    pub label: String,
}

/// A question metadata entry: a logical question and all the answer columns
/// that belong to it.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionMeta {
    pub base_question: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub columns: Vec<AnswerColumn>,
    #[serde(default)]
    pub value_labels: ValueLabels,
    #[serde(default)]
    pub base_label: String,
}

impl QuestionMeta {
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

/// All the questions of a survey.
///
/// Invariant: every answer column belongs to exactly one entry.
#[derive(PartialEq, Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct QuestionCatalog {
    entries: Vec<QuestionMeta>,
    #[serde(skip)]
    by_column: HashMap<String, (usize, usize)>,
}

impl QuestionCatalog {
    pub fn new(entries: Vec<QuestionMeta>) -> StatsResult<QuestionCatalog> {
        let mut by_column: HashMap<String, (usize, usize)> = HashMap::new();
        for (eidx, entry) in entries.iter().enumerate() {
            for (cidx, col) in entry.columns.iter().enumerate() {
                ensure!(
                    by_column.insert(col.name.clone(), (eidx, cidx)).is_none(),
                    DuplicateColumnSnafu {
                        column: col.name.clone()
                    }
                );
            }
        }
        Ok(QuestionCatalog { entries, by_column })
    }

    pub fn entries(&self) -> &[QuestionMeta] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entry owning the given answer column, and the column itself.
    pub fn lookup(&self, column: &str) -> Option<(&QuestionMeta, &AnswerColumn)> {
        self.by_column
            .get(column)
            .map(|(eidx, cidx)| (&self.entries[*eidx], &self.entries[*eidx].columns[*cidx]))
    }

    pub fn value_labels(&self, column: &str) -> Option<&ValueLabels> {
        self.lookup(column).map(|(meta, _)| &meta.value_labels)
    }
}

impl<'de> Deserialize<'de> for QuestionCatalog {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = Vec::<QuestionMeta>::deserialize(deserializer)?;
        QuestionCatalog::new(entries).map_err(de::Error::custom)
    }
}

// ********* Configuration **********

/// A named thematic area and its questions, in display order.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct AreaGroup {
    pub area: String,
    pub questions: Vec<String>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatsConfig {
    /// The column holding respondent weights, if any.
    pub weight_column: Option<String>,
    /// Raw codes that stand for "no answer", with their codebook label.
    pub missing_value_codes: BTreeMap<Code, String>,
    pub area_map: Vec<AreaGroup>,
    /// Index cells with fewer answers than this (missing codes included) are suppressed.
    pub minimum_count: usize,
    /// Restricts which rows count towards the statistics of a base question.
    pub question_filters: HashMap<String, RowPredicate>,
    /// Negative correlations are reported as 0 in the per-category path.
    /// The overall path always keeps the sign.
    pub clamp_negative_correlations: bool,
}

impl Default for StatsConfig {
    fn default() -> Self {
        StatsConfig {
            weight_column: None,
            missing_value_codes: BTreeMap::new(),
            area_map: Vec::new(),
            minimum_count: 0,
            question_filters: HashMap::new(),
            clamp_negative_correlations: true,
        }
    }
}

impl StatsConfig {
    pub fn is_missing_code(&self, x: f64) -> bool {
        self.missing_value_codes.contains_key(&Code(x))
    }

    pub fn area_questions(&self, area: &str) -> Option<&[String]> {
        self.area_map
            .iter()
            .find(|a| a.area == area)
            .map(|a| a.questions.as_slice())
    }

    /// All the questions of the area map, in order, without duplicates.
    pub fn all_area_questions(&self) -> Vec<String> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut res: Vec<String> = Vec::new();
        for q in self.area_map.iter().flat_map(|a| a.questions.iter()) {
            if seen.insert(q.as_str()) {
                res.push(q.clone());
            }
        }
        res
    }
}

/// Settings of the iterative proportional fitting.
#[derive(PartialEq, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IpfSettings {
    pub tolerance: f64,
    pub max_iterations: u32,
}

impl IpfSettings {
    pub const DEFAULT_SETTINGS: IpfSettings = IpfSettings {
        tolerance: 1e-6,
        max_iterations: 1000,
    };
}

impl Default for IpfSettings {
    fn default() -> Self {
        IpfSettings::DEFAULT_SETTINGS
    }
}

// ********* Errors **********

/// Errors that prevent a computation from completing.
///
/// Configuration gaps and numeric degeneracies are not errors: they are
/// logged and the offending group is skipped.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StatsError {
    #[snafu(display("The respondent table is empty"))]
    EmptyDataset {},
    #[snafu(display("The question catalog is empty"))]
    EmptyCatalog {},
    #[snafu(display("Column {column} not found"))]
    ColumnNotFound { column: String },
    #[snafu(display("Column {column} has {actual} rows, expected {expected}"))]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },
    #[snafu(display("Column {column} is declared twice"))]
    DuplicateColumn { column: String },
    #[snafu(display("No calibration dimension was provided"))]
    NoDimensions {},
    #[snafu(display(
        "Invalid population target for {dimension}={category}: {value} (must be positive)"
    ))]
    InvalidTarget {
        dimension: String,
        category: String,
        value: f64,
    },
    #[snafu(display("Invalid initial weight at row {row}: {value}"))]
    InvalidWeight { row: usize, value: f64 },
    #[snafu(display("Invalid tolerance {tolerance}"))]
    InvalidTolerance { tolerance: f64 },
    #[snafu(display("Invalid scale range [{min}, {max}]"))]
    InvalidScale { min: f64, max: f64 },
}

pub type StatsResult<T> = Result<T, StatsError>;

//! Calibration weights by iterative proportional fitting (raking).
//!
//! Every respondent starts with a weight of 1. One iteration rakes the weights
//! on each calibration dimension in turn: the weighted total of every category
//! is brought to its population target. The dimensions are visited in the
//! order given by the caller, each sweep sees the weights updated by the
//! previous one.

use std::collections::{BTreeMap, HashMap};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::config::*;
use crate::table::SurveyTable;

/// The category of every respondent along one calibration dimension.
#[derive(PartialEq, Debug, Clone)]
pub struct CalibrationDimension {
    pub name: String,
    /// None for the respondents that do not fall in any category.
    pub assignments: Vec<Option<String>>,
}

impl CalibrationDimension {
    pub fn new(name: &str, assignments: Vec<Option<String>>) -> CalibrationDimension {
        CalibrationDimension {
            name: name.to_string(),
            assignments,
        }
    }

    /// Reads the dimension from a survey column.
    ///
    /// The raw values are mapped through the codebook, so that they line up
    /// with the category names of the population targets. Unlabelled values
    /// keep their raw text.
    pub fn from_column(
        table: &SurveyTable,
        column: &str,
        value_labels: Option<&ValueLabels>,
    ) -> StatsResult<CalibrationDimension> {
        let col = table
            .column(column)
            .context(ColumnNotFoundSnafu { column })?;
        let assignments: Vec<Option<String>> = (0..table.row_count())
            .map(|row| {
                let labelled = value_labels
                    .zip(col.number_at(row))
                    .and_then(|(labels, x)| labels.get(&Code(x)).cloned());
                labelled.or_else(|| col.text_at(row))
            })
            .collect();
        Ok(CalibrationDimension::new(column, assignments))
    }
}

/// Population counts in long form: one record per combination of categories.
#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct PopulationTargets {
    pub dimensions: Vec<String>,
    pub records: Vec<(Vec<String>, f64)>,
}

impl PopulationTargets {
    pub fn new(dimensions: &[String]) -> PopulationTargets {
        PopulationTargets {
            dimensions: dimensions.to_vec(),
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, keys: Vec<String>, population: f64) -> StatsResult<()> {
        ensure!(
            keys.len() == self.dimensions.len(),
            LengthMismatchSnafu {
                column: "population targets",
                expected: self.dimensions.len(),
                actual: keys.len()
            }
        );
        self.records.push((keys, population));
        Ok(())
    }

    pub fn total(&self) -> f64 {
        self.records.iter().map(|(_, p)| *p).sum()
    }

    /// The population per category of one dimension.
    ///
    /// Every marginal must be strictly positive.
    pub fn marginal(&self, dimension: &str) -> StatsResult<HashMap<String, f64>> {
        let idx = self
            .dimensions
            .iter()
            .position(|d| d == dimension)
            .context(ColumnNotFoundSnafu { column: dimension })?;
        // Ordered to report errors deterministically.
        let mut res: BTreeMap<String, f64> = BTreeMap::new();
        for (keys, population) in self.records.iter() {
            *res.entry(keys[idx].clone()).or_insert(0.0) += population;
        }
        for (category, value) in res.iter() {
            ensure!(
                *value > 0.0 && value.is_finite(),
                InvalidTargetSnafu {
                    dimension,
                    category: category.clone(),
                    value: *value
                }
            );
        }
        Ok(res.into_iter().collect())
    }
}

/// The result of a calibration. Not converging is not an error: the weights
/// of the last iteration are still returned.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpfOutcome {
    pub weights: Vec<f64>,
    pub converged: bool,
    pub iterations: u32,
    pub max_difference: f64,
}

// A dimension with its categories interned.
struct InternalDimension {
    name: String,
    assignments: Vec<Option<usize>>,
    // Target per interned category, None when the population has no such category.
    targets: Vec<Option<f64>>,
}

fn intern(
    dimension: &CalibrationDimension,
    targets: &HashMap<String, f64>,
) -> StatsResult<InternalDimension> {
    for (category, value) in targets.iter() {
        ensure!(
            *value > 0.0 && value.is_finite(),
            InvalidTargetSnafu {
                dimension: dimension.name.clone(),
                category: category.clone(),
                value: *value
            }
        );
    }
    let mut ids: HashMap<&str, usize> = HashMap::new();
    let mut cat_targets: Vec<Option<f64>> = Vec::new();
    let mut assignments: Vec<Option<usize>> = Vec::with_capacity(dimension.assignments.len());
    for a in dimension.assignments.iter() {
        let id = a.as_deref().map(|cat| {
            *ids.entry(cat).or_insert_with(|| {
                cat_targets.push(targets.get(cat).cloned());
                cat_targets.len() - 1
            })
        });
        assignments.push(id);
    }
    for (cat, id) in ids.iter() {
        if cat_targets[*id].is_none() {
            warn!(
                "ipf: dimension {:?}: category {:?} has no population target, its weights are left unchanged",
                dimension.name, cat
            );
        }
    }
    Ok(InternalDimension {
        name: dimension.name.clone(),
        assignments,
        targets: cat_targets,
    })
}

/// Runs the fitting from unit weights.
///
/// Arguments:
/// * `rows` the number of respondents
/// * `dimensions` the category of each respondent, one entry per calibration dimension
/// * `targets` the population per category, in the same order as `dimensions`
pub fn solve(
    rows: usize,
    dimensions: &[CalibrationDimension],
    targets: &[HashMap<String, f64>],
    settings: &IpfSettings,
) -> StatsResult<IpfOutcome> {
    solve_from(&vec![1.0; rows], dimensions, targets, settings)
}

/// Runs the fitting starting from the given weights.
pub fn solve_from(
    initial_weights: &[f64],
    dimensions: &[CalibrationDimension],
    targets: &[HashMap<String, f64>],
    settings: &IpfSettings,
) -> StatsResult<IpfOutcome> {
    let rows = initial_weights.len();
    ensure!(rows > 0, EmptyDatasetSnafu {});
    ensure!(!dimensions.is_empty(), NoDimensionsSnafu {});
    ensure!(
        dimensions.len() == targets.len(),
        LengthMismatchSnafu {
            column: "population targets",
            expected: dimensions.len(),
            actual: targets.len()
        }
    );
    ensure!(
        settings.tolerance > 0.0 && settings.tolerance.is_finite(),
        InvalidToleranceSnafu {
            tolerance: settings.tolerance
        }
    );
    for (row, w) in initial_weights.iter().enumerate() {
        ensure!(
            *w > 0.0 && w.is_finite(),
            InvalidWeightSnafu { row, value: *w }
        );
    }
    let mut internal: Vec<InternalDimension> = Vec::with_capacity(dimensions.len());
    for (dim, tgts) in dimensions.iter().zip(targets.iter()) {
        ensure!(
            dim.assignments.len() == rows,
            LengthMismatchSnafu {
                column: dim.name.clone(),
                expected: rows,
                actual: dim.assignments.len()
            }
        );
        internal.push(intern(dim, tgts)?);
    }

    info!(
        "ipf: fitting {} rows on dimensions {:?}, settings: {:?}",
        rows,
        internal.iter().map(|d| d.name.as_str()).collect::<Vec<&str>>(),
        settings
    );

    let mut weights: Vec<f64> = initial_weights.to_vec();
    let mut max_difference = f64::INFINITY;
    let mut iterations: u32 = 0;
    while iterations < settings.max_iterations {
        iterations += 1;
        let previous = weights.clone();
        for dim in internal.iter() {
            rake_dimension(&mut weights, dim);
        }
        max_difference = weights
            .iter()
            .zip(previous.iter())
            .map(|(w, p)| (w - p).abs())
            .fold(0.0, f64::max);
        debug!(
            "ipf: iteration {}: max weight difference {:e}",
            iterations, max_difference
        );
        if max_difference < settings.tolerance {
            info!("ipf: converged after {} iterations", iterations);
            return Ok(IpfOutcome {
                weights,
                converged: true,
                iterations,
                max_difference,
            });
        }
    }
    warn!(
        "ipf: no convergence after {} iterations (max difference: {:e})",
        iterations, max_difference
    );
    Ok(IpfOutcome {
        weights,
        converged: false,
        iterations,
        max_difference,
    })
}

// One sweep: brings the weighted total of every category of the dimension to its target.
fn rake_dimension(weights: &mut [f64], dim: &InternalDimension) {
    let mut current: Vec<f64> = vec![0.0; dim.targets.len()];
    for (w, a) in weights.iter().zip(dim.assignments.iter()) {
        if let Some(cat) = a {
            current[*cat] += *w;
        }
    }
    // A category without mass or without target is left alone.
    let factors: Vec<f64> = current
        .iter()
        .zip(dim.targets.iter())
        .map(|(cur, target)| match target {
            Some(t) if *cur > 0.0 && cur.is_finite() => t / cur,
            _ => 1.0,
        })
        .collect();
    for (w, a) in weights.iter_mut().zip(dim.assignments.iter()) {
        if let Some(cat) = a {
            *w *= factors[*cat];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn dim(name: &str, cats: &[&str]) -> CalibrationDimension {
        CalibrationDimension::new(name, cats.iter().map(|c| Some(c.to_string())).collect())
    }

    fn targets(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn weighted_total(outcome: &IpfOutcome, d: &CalibrationDimension, cat: &str) -> f64 {
        outcome
            .weights
            .iter()
            .zip(d.assignments.iter())
            .filter(|(_, a)| a.as_deref() == Some(cat))
            .map(|(w, _)| *w)
            .sum()
    }

    #[test]
    fn matching_targets_converge_in_one_iteration() {
        init();
        let gender = dim("gender", &["F", "M", "F", "M", "F"]);
        let region = dim("region", &["N", "N", "S", "S", "S"]);
        let res = solve(
            5,
            &[gender, region],
            &[
                targets(&[("F", 3.0), ("M", 2.0)]),
                targets(&[("N", 2.0), ("S", 3.0)]),
            ],
            &IpfSettings::default(),
        )
        .unwrap();
        assert!(res.converged);
        assert_eq!(res.iterations, 1);
        assert!(res.weights.iter().all(|w| (*w - 1.0).abs() < 1e-12));
    }

    #[test]
    fn fits_two_margins() {
        init();
        let gender = dim("gender", &["F", "M", "F", "M", "F", "M"]);
        let age = dim("age", &["young", "young", "old", "old", "old", "young"]);
        let tg = vec![
            targets(&[("F", 600.0), ("M", 400.0)]),
            targets(&[("young", 300.0), ("old", 700.0)]),
        ];
        let res = solve(6, &[gender.clone(), age.clone()], &tg, &IpfSettings::default()).unwrap();
        assert!(res.converged);
        assert!(res.iterations > 1);
        assert!(res.weights.iter().all(|w| *w > 0.0 && w.is_finite()));
        assert!((weighted_total(&res, &gender, "F") - 600.0).abs() < 1e-3);
        assert!((weighted_total(&res, &gender, "M") - 400.0).abs() < 1e-3);
        assert!((weighted_total(&res, &age, "young") - 300.0).abs() < 1e-3);
        assert!((weighted_total(&res, &age, "old") - 700.0).abs() < 1e-3);

        // Starting again from the converged weights stops right away.
        let again = solve_from(&res.weights, &[gender, age], &tg, &IpfSettings::default()).unwrap();
        assert!(again.converged);
        assert_eq!(again.iterations, 1);
    }

    #[test]
    fn contraction_near_convergence() {
        let gender = dim("gender", &["F", "M", "F", "M", "F", "M", "F"]);
        let age = dim("age", &["y", "y", "o", "o", "o", "y", "y"]);
        let tg = vec![
            targets(&[("F", 55.0), ("M", 45.0)]),
            targets(&[("y", 40.0), ("o", 60.0)]),
        ];
        let dims = vec![gender, age];
        let mut diffs: Vec<f64> = Vec::new();
        for n in 5..12 {
            let settings = IpfSettings {
                tolerance: 1e-300,
                max_iterations: n,
            };
            let res = solve(7, &dims, &tg, &settings).unwrap();
            assert!(!res.converged);
            diffs.push(res.max_difference);
        }
        for pair in diffs.windows(2) {
            assert!(pair[1] <= pair[0] + 1e-12, "{:?}", diffs);
        }
    }

    #[test]
    fn unknown_categories_are_neutral() {
        // Nobody from region "X" in the survey, and "Z" has no target.
        let region = CalibrationDimension::new(
            "region",
            vec![Some("N".to_string()), Some("Z".to_string()), None, Some("N".to_string())],
        );
        let res = solve(
            4,
            &[region],
            &[targets(&[("N", 10.0), ("X", 5.0)])],
            &IpfSettings::default(),
        )
        .unwrap();
        assert!(res.converged);
        assert!((res.weights[0] - 5.0).abs() < 1e-9);
        assert!((res.weights[3] - 5.0).abs() < 1e-9);
        assert_eq!(res.weights[1], 1.0);
        assert_eq!(res.weights[2], 1.0);
    }

    #[test]
    fn reports_non_convergence() {
        let gender = dim("gender", &["F", "M", "F", "M"]);
        let age = dim("age", &["y", "y", "o", "o"]);
        let settings = IpfSettings {
            tolerance: 1e-12,
            max_iterations: 1,
        };
        let res = solve(
            4,
            &[gender, age],
            &[
                targets(&[("F", 70.0), ("M", 30.0)]),
                targets(&[("y", 20.0), ("o", 80.0)]),
            ],
            &settings,
        )
        .unwrap();
        assert!(!res.converged);
        assert_eq!(res.iterations, 1);
        assert!(res.max_difference > 1e-12);
        assert!(res.weights.iter().all(|w| *w > 0.0));
    }

    #[test]
    fn rejects_bad_inputs() {
        let d = dim("gender", &["F", "M"]);
        let s = IpfSettings::default();
        assert!(matches!(
            solve(2, &[], &[], &s),
            Err(StatsError::NoDimensions {})
        ));
        assert!(matches!(
            solve(0, &[d.clone()], &[targets(&[])], &s),
            Err(StatsError::EmptyDataset {})
        ));
        assert!(matches!(
            solve(2, &[d.clone()], &[targets(&[("F", 0.0)])], &s),
            Err(StatsError::InvalidTarget { .. })
        ));
        assert!(matches!(
            solve(3, &[d], &[targets(&[("F", 1.0)])], &s),
            Err(StatsError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn dimension_from_codebook() {
        let table = SurveyTable::from_columns(vec![(
            "Kön".to_string(),
            Column::Numeric(vec![Some(1.0), Some(2.0), Some(3.0), None]),
        )])
        .unwrap();
        let labels: ValueLabels = [(1.0, "Kvinna"), (2.0, "Man")]
            .iter()
            .map(|(c, l)| (Code(*c), l.to_string()))
            .collect();
        let d = CalibrationDimension::from_column(&table, "Kön", Some(&labels)).unwrap();
        assert_eq!(
            d.assignments,
            vec![
                Some("Kvinna".to_string()),
                Some("Man".to_string()),
                Some("3".to_string()),
                None
            ]
        );
    }

    #[test]
    fn population_marginals() {
        let mut p = PopulationTargets::new(&["region".to_string(), "gender".to_string()]);
        p.push(vec!["N".to_string(), "Kvinna".to_string()], 10.0).unwrap();
        p.push(vec!["N".to_string(), "Man".to_string()], 12.0).unwrap();
        p.push(vec!["S".to_string(), "Kvinna".to_string()], 20.0).unwrap();
        p.push(vec!["S".to_string(), "Man".to_string()], 18.0).unwrap();
        assert!(p.push(vec!["S".to_string()], 1.0).is_err());
        let g = p.marginal("gender").unwrap();
        assert_eq!(g.get("Kvinna"), Some(&30.0));
        assert_eq!(g.get("Man"), Some(&30.0));
        assert_eq!(p.total(), 60.0);
        assert!(p.marginal("age").is_err());
    }
}

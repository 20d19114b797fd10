use log::{debug, info, warn};

use snafu::{prelude::*, ErrorCompat, Snafu};
use std::fs;

use serde_json::Value as JSValue;
use std::collections::HashMap;
use std::path::Path;
use survey_stats::*;
use text_diff::print_diff;

use crate::tab::config_reader::*;
use crate::tab::io_common::{config_root, resolve_path};

mod config_reader;
mod io_common;
mod io_csv;
mod io_targets;
mod summary;

#[derive(Debug, Snafu)]
pub enum TabError {
    #[snafu(display("Error opening file {path}"))]
    OpeningFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON file {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error writing the summary"))]
    WritingJson { source: serde_json::Error },
    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading line {lineno} of {path}"))]
    CsvLineParse {
        source: csv::Error,
        path: String,
        lineno: usize,
    },
    #[snafu(display("Error opening Excel file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("Excel file {path} has no data"))]
    EmptyExcel { path: String },
    #[snafu(display("Worksheet {name} not found in {path}"))]
    MissingWorksheet { path: String, name: String },
    #[snafu(display("Config file {path} has no parent directory"))]
    MissingParentDir { path: String },
    #[snafu(display("Line {lineno}: population {content:?} is not a number"))]
    InvalidPopulation { lineno: usize, content: String },
    #[snafu(display("Tabulation failed"))]
    Stats { source: StatsError },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type TabResult<T> = Result<T, TabError>;

fn build_dimensions(
    session: &SurveySession,
    source: &WeightingSource,
    targets: &PopulationTargets,
) -> TabResult<(Vec<CalibrationDimension>, Vec<HashMap<String, f64>>)> {
    let mut dims: Vec<CalibrationDimension> = Vec::new();
    let mut margins: Vec<HashMap<String, f64>> = Vec::new();
    for d in source.dimensions.iter() {
        let labels = if d.use_value_labels() {
            session.catalog().value_labels(&d.column)
        } else {
            None
        };
        let dim = CalibrationDimension::from_column(session.table(), &d.column, labels)
            .context(StatsSnafu {})?;
        let margin = targets.marginal(d.target_name()).context(StatsSnafu {})?;
        debug!(
            "build_dimensions: {:?} -> {:?}: {:?}",
            d.column,
            d.target_name(),
            margin
        );
        dims.push(dim);
        margins.push(margin);
    }
    Ok((dims, margins))
}

fn calibrate(session: &mut SurveySession, root: &Path, source: &WeightingSource) -> TabResult<()> {
    let targets_path = resolve_path(root, &source.targets);
    let targets = io_targets::read_targets(&targets_path, source)?;
    let (dims, margins) = build_dimensions(session, source, &targets)?;
    let outcome = session
        .calibrate(&dims, &margins, &source.ipf_settings())
        .context(StatsSnafu {})?;
    if !outcome.converged {
        warn!(
            "calibrate: the weights did not converge after {} iterations (max difference {})",
            outcome.iterations, outcome.max_difference
        );
    }
    Ok(())
}

fn write_summary(pretty_js: &str, out: Option<&str>) -> TabResult<()> {
    match out {
        None | Some("stdout") => {
            println!("{}", pretty_js);
        }
        Some(path) => {
            info!("write_summary: writing summary to {:?}", path);
            fs::write(path, pretty_js).context(OpeningFileSnafu { path })?;
        }
    }
    Ok(())
}

/// Runs the tabulation described by the configuration file.
///
/// If a reference summary is given, the computed summary must match it.
pub fn run_tabulation(
    config_path: &str,
    out: Option<&str>,
    check_summary_path: Option<&str>,
) -> TabResult<()> {
    let config = read_config(config_path)?;
    let root = config_root(config_path)?;

    let table = io_csv::read_dataset(&resolve_path(root, &config.dataset))?;
    let catalog = read_catalog(&resolve_path(root, &config.catalog))?;
    let mut session = SurveySession::new(
        table,
        catalog,
        config.settings.clone(),
        &config.categories,
    )
    .context(StatsSnafu {})?;

    if let Some(source) = &config.weighting {
        calibrate(&mut session, root, source)?;
    }

    let outputs = &config.outputs;
    if outputs.percentages {
        session.percentages(outputs.use_weights).context(StatsSnafu {})?;
    }
    if let Some(options) = &outputs.index {
        session
            .index(outputs.use_weights, options)
            .context(StatsSnafu {})?;
    }
    if let Some(eni) = &outputs.eni {
        session
            .eni(&eni.area, outputs.use_weights)
            .context(StatsSnafu {})?;
    }

    let result_js = summary::build_summary_js(&config, &session);
    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(WritingJsonSnafu {})?;
    write_summary(&pretty_js_stats, out)?;

    // The reference summary, if provided for comparison
    if let Some(summary_p) = check_summary_path {
        let summary_ref: JSValue = read_summary(summary_p)?;
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(WritingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference summary");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            whatever!("Difference detected between calculated summary and reference summary")
        }
    }

    Ok(())
}

/// Prints the error and its chain of causes.
pub fn report_error(e: &TabError) {
    eprintln!("Error: {}", e);
    for cause in ErrorCompat::iter_chain(e).skip(1) {
        eprintln!("  caused by: {}", cause);
    }
}

use crate::tab::*;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabConfig {
    pub dataset: String,
    pub catalog: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub settings: StatsConfig,
    pub weighting: Option<WeightingSource>,
    #[serde(default)]
    pub outputs: OutputSettings,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeltSettings {
    pub id_columns: Vec<String>,
    /// All the other columns if not specified.
    pub value_columns: Option<Vec<String>>,
    pub variable_name: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionSource {
    /// The survey column.
    pub column: String,
    /// The dimension in the targets file. Defaults to the survey column.
    pub target: Option<String>,
    pub use_value_labels: Option<bool>,
}

impl DimensionSource {
    pub fn target_name(&self) -> &str {
        self.target.as_deref().unwrap_or(&self.column)
    }

    pub fn use_value_labels(&self) -> bool {
        self.use_value_labels.unwrap_or(true)
    }
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightingSource {
    pub targets: String,
    pub target_format: Option<String>,
    pub worksheet: Option<String>,
    pub melt: Option<MeltSettings>,
    pub population_column: Option<String>,
    pub dimensions: Vec<DimensionSource>,
    pub tolerance: Option<f64>,
    pub max_iterations: Option<u32>,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum TargetFormat {
    Csv,
    Xlsx,
}

impl WeightingSource {
    pub fn target_format(&self) -> TabResult<TargetFormat> {
        match self.target_format.as_deref() {
            None | Some("csv") => Ok(TargetFormat::Csv),
            Some("xlsx") | Some("excel") => Ok(TargetFormat::Xlsx),
            Some(x) => whatever!("Target format {:?} is not supported (csv or xlsx)", x),
        }
    }

    pub fn population_column(&self) -> &str {
        self.population_column
            .as_deref()
            .unwrap_or(DEFAULT_POPULATION_COLUMN)
    }

    pub fn ipf_settings(&self) -> IpfSettings {
        let default = IpfSettings::default();
        IpfSettings {
            tolerance: self.tolerance.unwrap_or(default.tolerance),
            max_iterations: self.max_iterations.unwrap_or(default.max_iterations),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct EniSettings {
    pub area: String,
}

#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutputSettings {
    pub percentages: bool,
    pub index: Option<IndexOptions>,
    pub eni: Option<EniSettings>,
    pub open_text: bool,
    pub use_weights: bool,
}

pub const DEFAULT_POPULATION_COLUMN: &str = "population";

pub fn read_config(path: &str) -> TabResult<TabConfig> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    let config: TabConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    debug!("read_config: {:?}", config);
    Ok(config)
}

pub fn read_catalog(path: &str) -> TabResult<QuestionCatalog> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    let catalog: QuestionCatalog =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    info!(
        "read_catalog: {} questions from {:?}",
        catalog.entries().len(),
        path
    );
    Ok(catalog)
}

pub fn read_summary(path: &str) -> TabResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    Ok(js)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config() {
        let js = r#"{"dataset": "d.csv", "catalog": "c.json"}"#;
        let config: TabConfig = serde_json::from_str(js).unwrap();
        assert!(config.categories.is_empty());
        assert!(config.weighting.is_none());
        assert_eq!(config.outputs, OutputSettings::default());
        assert!(config.settings.clamp_negative_correlations);
    }

    #[test]
    fn weighting_defaults() {
        let js = r#"{
            "targets": "pop.xlsx",
            "targetFormat": "xlsx",
            "melt": {"idColumns": ["Område"], "variableName": "Kön"},
            "dimensions": [{"column": "Kon", "target": "Kön"}, {"column": "Område"}],
            "maxIterations": 50
        }"#;
        let w: WeightingSource = serde_json::from_str(js).unwrap();
        assert_eq!(w.target_format().unwrap(), TargetFormat::Xlsx);
        assert_eq!(w.population_column(), "population");
        assert_eq!(w.dimensions[0].target_name(), "Kön");
        assert_eq!(w.dimensions[1].target_name(), "Område");
        assert!(w.dimensions[1].use_value_labels());
        let s = w.ipf_settings();
        assert_eq!(s.max_iterations, 50);
        assert_eq!(s.tolerance, 1e-6);
        let bad = WeightingSource {
            target_format: Some("parquet".to_string()),
            ..w
        };
        assert!(bad.target_format().is_err());
    }

    #[test]
    fn output_switches() {
        let js = r#"{
            "percentages": true,
            "index": {"scale": [0, 100], "correlateArea": "Engagement"},
            "eni": {"area": "Engagement"}
        }"#;
        let o: OutputSettings = serde_json::from_str(js).unwrap();
        assert!(o.percentages);
        assert!(!o.use_weights);
        let index = o.index.unwrap();
        assert_eq!(index.scale, Some((0.0, 100.0)));
        assert_eq!(index.correlate_area.as_deref(), Some("Engagement"));
        assert_eq!(o.eni.unwrap().area, "Engagement");
    }
}

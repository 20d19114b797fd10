// The JSON summary of a tabulation run.

use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;

use survey_stats::eni::EniRegroupTable;
use survey_stats::index::IndexTable;

use crate::tab::config_reader::TabConfig;
use crate::tab::*;

fn by_category(categories: &[String], values: &[f64]) -> JSMap<String, JSValue> {
    let mut res: JSMap<String, JSValue> = JSMap::new();
    for (c, v) in categories.iter().zip(values.iter()) {
        res.insert(c.clone(), json!(v));
    }
    res
}

pub fn percentages_to_json(out: &PercentageOutput) -> JSValue {
    let table = &out.table;
    let rows: Vec<JSValue> = table
        .rows
        .iter()
        .map(|r| {
            json!({
                "question": r.question,
                "label": r.display_question_label,
                "answer": r.answer.to_string(),
                "answerLabel": r.answer_label,
                "metric": r.metric.name(),
                "values": by_category(&table.categories, &r.values),
            })
        })
        .collect();
    let rankings: Vec<JSValue> = out
        .rankings
        .iter()
        .map(|t| {
            let items: Vec<JSValue> = t
                .items
                .iter()
                .map(|it| {
                    json!({
                        "item": it.item.to_string(),
                        "label": it.label,
                        "rankCounts": it.rank_counts,
                        "rankPercentages": it.rank_percentages,
                        "totalRankCount": it.total_rank_count,
                        "totalScore": it.total_score,
                    })
                })
                .collect();
            json!({
                "question": t.base_question,
                "category": t.category,
                "totalRespondents": t.total_respondents,
                "items": items,
            })
        })
        .collect();
    json!({ "rows": rows, "rankings": rankings })
}

// A question can belong to several areas, its key carries the area.
fn index_column_name(column: &IndexColumn) -> String {
    match column {
        IndexColumn::Question { area, question } => format!("{}/{}", area, question),
        IndexColumn::Area { area } => format!("{} (area)", area),
        IndexColumn::Overall => "Overall".to_string(),
    }
}

pub fn index_to_json(table: &IndexTable) -> JSValue {
    let names: Vec<String> = table.columns.iter().map(index_column_name).collect();
    let rows: Vec<JSValue> = table
        .rows
        .iter()
        .map(|r| {
            let mut values: JSMap<String, JSValue> = JSMap::new();
            for (name, v) in names.iter().zip(r.values.iter()) {
                values.insert(name.clone(), json!(v));
            }
            json!({ "category": r.category, "values": values })
        })
        .collect();
    json!({ "columns": names, "rows": rows })
}

pub fn eni_to_json(table: &EniTable, regroup: Option<&EniRegroupTable>) -> JSValue {
    let rows: Vec<JSValue> = table
        .rows
        .iter()
        .map(|r| {
            let mut classes: JSMap<String, JSValue> = JSMap::new();
            for class in EniClass::ALL {
                classes.insert(class.name().to_string(), json!(r.proportion(class)));
            }
            json!({ "category": r.category, "classes": classes })
        })
        .collect();
    let regrouped: Vec<JSValue> = regroup
        .map(|t| {
            t.rows
                .iter()
                .map(|r| {
                    json!({
                        "question": r.question,
                        "bucket": r.bucket.name(),
                        "label": r.label,
                        "metric": r.metric.name(),
                        "values": by_category(&t.categories, &r.values),
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    json!({ "area": table.area, "rows": rows, "regrouped": regrouped })
}

/// Assembles the summary of everything the session computed.
pub fn build_summary_js(config: &TabConfig, session: &SurveySession) -> JSValue {
    let mut js: JSMap<String, JSValue> = JSMap::new();
    js.insert(
        "config".to_string(),
        json!({
            "dataset": config.dataset,
            "respondents": session.table().row_count(),
            "categories": session.categories(),
            "useWeights": config.outputs.use_weights,
        }),
    );
    if let Some(outcome) = session.calibration() {
        js.insert(
            "weighting".to_string(),
            json!({
                "converged": outcome.converged,
                "iterations": outcome.iterations,
                "maxDifference": outcome.max_difference,
                "totalWeight": outcome.weights.iter().sum::<f64>(),
            }),
        );
    }
    if let Some(p) = session.latest_percentages() {
        js.insert("percentages".to_string(), percentages_to_json(p));
    }
    if let Some(index) = session.latest_index() {
        js.insert("index".to_string(), index_to_json(&index.table));
        let correlations: Vec<JSValue> = index
            .correlations
            .iter()
            .map(|c| {
                json!({
                    "category": c.category,
                    "area": c.area,
                    "question": c.question,
                    "correlation": c.correlation,
                })
            })
            .collect();
        js.insert("correlations".to_string(), JSValue::Array(correlations));
    }
    if let Some(eni) = session.latest_eni() {
        js.insert(
            "eni".to_string(),
            eni_to_json(eni, session.latest_eni_regroup()),
        );
    }
    if config.outputs.open_text {
        let responses: Vec<JSValue> = session
            .open_text()
            .into_iter()
            .map(|r| json!({ "question": r.base_question, "response": r.response }))
            .collect();
        js.insert("openText".to_string(), JSValue::Array(responses));
    }
    JSValue::Object(js)
}

#[cfg(test)]
mod tests {
    use super::*;
    use survey_stats::index::IndexRow;

    #[test]
    fn index_columns_are_named() {
        let table = IndexTable {
            columns: vec![
                IndexColumn::Question {
                    area: "Ledelse".to_string(),
                    question: "Q1".to_string(),
                },
                IndexColumn::Area {
                    area: "Ledelse".to_string(),
                },
                IndexColumn::Question {
                    area: "Trivsel".to_string(),
                    question: "Q1".to_string(),
                },
                IndexColumn::Area {
                    area: "Trivsel".to_string(),
                },
            ],
            rows: vec![IndexRow {
                category: "Staff".to_string(),
                values: vec![Some(3.5), None, Some(4.0), Some(4.0)],
            }],
        };
        let js = index_to_json(&table);
        assert_eq!(
            js["columns"],
            json!(["Ledelse/Q1", "Ledelse (area)", "Trivsel/Q1", "Trivsel (area)"])
        );
        let values = js["rows"][0]["values"].as_object().unwrap();
        assert_eq!(values.len(), 4);
        assert_eq!(values["Ledelse/Q1"], json!(3.5));
        assert_eq!(values["Trivsel/Q1"], json!(4.0));
        assert_eq!(values["Ledelse (area)"], JSValue::Null);
    }
}

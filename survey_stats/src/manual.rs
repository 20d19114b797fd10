/*!

This is the long-form manual for `survey_stats` and `surveytab`.

## Input formats

A tabulation run reads three kinds of files, all referenced from a run
configuration (see below):
* the respondent table, as CSV
* the question catalog, as JSON
* optionally, the population targets used for weighting, as CSV or as an Excel spreadsheet

### Respondent table

A CSV file with one header row and one row per respondent. A column is read as
numeric if all its non-empty cells parse as numbers, and as text otherwise.
Empty cells are missing values.

Category columns hold 0/1 flags: a respondent belongs to the category `Staff`
if the column `Staff` is 1 on its row.

### Question catalog

A JSON array with one entry per question:

```json
[
  {
    "baseQuestion": "Q1",
    "type": "single_choice",
    "baseLabel": "How satisfied are you?",
    "columns": [{"name": "Q1", "label": "How satisfied are you?"}],
    "valueLabels": {"1": "Not at all", "5": "Very", "99": "Don't know"}
  }
]
```

The question types are:
* `single_choice`, `grid`: one answer code per column.
* `multi_response`: one 0/1 column per option. Only the selected options (code 1)
  are reported, under the label of their column.
* `ranking`: one column per rank slot. The rank position is read from the
  trailing digits of the column name: `Q7M2` holds the item placed second.
* `open_text`: free text, only used by the open text extraction.
* `numeric_other`, `unknown`: not tabulated.

An answer column may only belong to one question.

### Population targets

Targets are given in long form: one column per calibration dimension and one
`population` column. The names in the dimension columns must match the labels
of the survey columns they are raked against (or their raw codes when
`useValueLabels` is false).

| Område | Ålder | Kön    | population |
|--------|-------|--------|------------|
| Nord   | 18-34 | Kvinna | 1200       |

Spreadsheets often come in wide form, with one column per category of a
dimension. The `melt` setting turns them into long form: the `idColumns` are
kept and every other column becomes a category of the dimension `variableName`.

With `targetFormat` set to `xlsx`, the sheet named by `worksheet` is read, or
the first sheet if none is given.

## Configuration

```json
{
  "dataset": "responses.csv",
  "catalog": "catalog.json",
  "categories": ["Staff", "Managers"],
  "settings": {
    "weightColumn": "weight",
    "missingValueCodes": {"99": "Don't know"},
    "areaMap": [{"area": "Engagement", "questions": ["Q1", "Q2"]}],
    "minimumCount": 5,
    "questionFilters": {"Q3": {"op": "equals", "column": "Q2", "value": 1}},
    "clampNegativeCorrelations": true
  },
  "weighting": {
    "targets": "population.csv",
    "targetFormat": "csv",
    "dimensions": [{"column": "Gender", "target": "Kön", "useValueLabels": true}],
    "tolerance": 1e-6,
    "maxIterations": 1000
  },
  "outputs": {
    "percentages": true,
    "index": {"scale": [0, 100], "correlateArea": "Engagement"},
    "eni": {"area": "Engagement"},
    "useWeights": true
  }
}
```

File paths are relative to the configuration file.

`settings` maps to [crate::StatsConfig]. Question filters are
[crate::RowPredicate] values, tagged by `op`: `equals`, `inSet`, `notNull`,
`and` (`all`), `or` (`any`) and `not` (`predicate`).

The `weighting` block is optional. When it is present, the weights are
computed before any output, and stored in the weight column. A run that did
not converge still uses the weights of the last iteration, and reports
`"converged": false` in the summary.

## Differences with common tabulation tools

* Percentages are computed over the valid answers. The share of missing codes
  is reported separately, over valid and missing answers together.
* Null answers are left out of the indices. They are not counted as zero.
* The minimum count of an index cell includes the answers that carry a missing
  code, even though those answers do not enter the average.
* Engagement classes are computed with the respondent weights when weights are
  used, and respondents without any answer in the area are not classified.

*/

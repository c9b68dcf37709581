use chrono::Utc;
use polars::prelude::*;
use rayon::prelude::*;
use smallvec::SmallVec;

use crate::error::PipelineError;

const SAMPLE_SIZE: usize = 3;

/// A finished profiling report, ready to be persisted as-is.
#[derive(Debug)]
pub struct ReportArtifact {
    pub html: String,
}

/// Capability interface for the statistical profiler.
///
/// The pipeline only ever talks to this trait; tests substitute stub
/// engines and never exercise the real statistics path.
pub trait ProfilingEngine: Send + Sync {
    fn generate(&self, dataset_name: &str, table: &DataFrame)
        -> Result<ReportArtifact, PipelineError>;
}

/// Production engine: descriptive statistics are delegated to polars and
/// rendered into one self-contained HTML document.
pub struct DataFrameProfiler;

struct ColumnSummary {
    name: String,
    dtype: String,
    null_count: usize,
    distinct: Option<usize>,
    mean: Option<f64>,
    std: Option<f64>,
    min: Option<f64>,
    max: Option<f64>,
    samples: SmallVec<[String; SAMPLE_SIZE]>,
}

impl ProfilingEngine for DataFrameProfiler {
    fn generate(
        &self,
        dataset_name: &str,
        table: &DataFrame,
    ) -> Result<ReportArtifact, PipelineError> {
        let start = std::time::Instant::now();
        tracing::info!(
            "profiling '{}': {} rows x {} columns",
            dataset_name,
            table.height(),
            table.width()
        );

        if table.width() == 0 {
            return Err(PipelineError::Profiling(
                "table has no columns".to_string(),
            ));
        }

        let summaries: Vec<ColumnSummary> = table
            .get_columns()
            .par_iter()
            .map(summarize_column)
            .collect();

        let html = render_report(dataset_name, table, &summaries);
        tracing::info!("profile for '{}' rendered in {:?}", dataset_name, start.elapsed());

        Ok(ReportArtifact { html })
    }
}

fn summarize_column(series: &Series) -> ColumnSummary {
    let numeric = series
        .cast(&DataType::Float64)
        .ok()
        .and_then(|cast| cast.f64().ok().cloned());

    let (mean, std, min, max) = match &numeric {
        Some(ca) if series.dtype().is_numeric() => {
            (ca.mean(), ca.std(1), ca.min(), ca.max())
        }
        _ => (None, None, None, None),
    };

    let mut samples = SmallVec::new();
    for idx in 0..series.len().min(SAMPLE_SIZE) {
        if let Ok(value) = series.get(idx) {
            samples.push(match value {
                AnyValue::Null => "".to_string(),
                AnyValue::String(s) => s.to_string(),
                other => other.to_string(),
            });
        }
    }

    ColumnSummary {
        name: series.name().to_string(),
        dtype: series.dtype().to_string(),
        null_count: series.null_count(),
        distinct: series.n_unique().ok(),
        mean,
        std,
        min,
        max,
        samples,
    }
}

fn render_report(dataset_name: &str, table: &DataFrame, summaries: &[ColumnSummary]) -> String {
    let rows = table.height();
    let cols = table.width();
    let cells = rows * cols;
    let missing: usize = summaries.iter().map(|s| s.null_count).sum();
    let missing_pct = if cells > 0 {
        missing as f64 * 100.0 / cells as f64
    } else {
        0.0
    };
    let numeric_cols = summaries.iter().filter(|s| s.mean.is_some()).count();

    let mut html = String::with_capacity(4096);
    html.push_str("<!doctype html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("  <meta charset=\"utf-8\" />\n");
    html.push_str(&format!(
        "  <title>Data Profile - {}</title>\n",
        escape(dataset_name)
    ));
    html.push_str(
        "  <style>\n\
         \x20   body { font-family: Arial, sans-serif; margin: 2rem; color: #1d1d1f; }\n\
         \x20   h1 { margin-bottom: 0.5rem; }\n\
         \x20   .meta { color: #6e6e73; margin-bottom: 1.5rem; }\n\
         \x20   .card { border: 1px solid #ddd; padding: 1rem; border-radius: 8px; margin-bottom: 1rem; }\n\
         \x20   table { border-collapse: collapse; width: 100%; }\n\
         \x20   th, td { border: 1px solid #ddd; padding: 0.4rem 0.6rem; text-align: left; }\n\
         \x20   th { background: #f6f8fa; }\n\
         \x20   .num { text-align: right; }\n\
         \x20 </style>\n</head>\n<body>\n",
    );

    html.push_str(&format!("  <h1>Data Profile - {}</h1>\n", escape(dataset_name)));
    html.push_str(&format!(
        "  <p class=\"meta\">Generated {}</p>\n",
        Utc::now().format("%Y-%m-%d %H:%M UTC")
    ));

    html.push_str("  <div class=\"card\">\n    <h2>Overview</h2>\n    <table>\n");
    push_overview_row(&mut html, "Rows", &rows.to_string());
    push_overview_row(&mut html, "Columns", &cols.to_string());
    push_overview_row(
        &mut html,
        "Missing cells",
        &format!("{} ({:.1}%)", missing, missing_pct),
    );
    push_overview_row(&mut html, "Numeric columns", &numeric_cols.to_string());
    push_overview_row(
        &mut html,
        "Other columns",
        &(cols - numeric_cols).to_string(),
    );
    html.push_str("    </table>\n  </div>\n");

    html.push_str("  <div class=\"card\">\n    <h2>Columns</h2>\n    <table>\n");
    html.push_str(
        "      <tr><th>Name</th><th>Type</th><th>Missing</th><th>Distinct</th>\
         <th>Mean</th><th>Std</th><th>Min</th><th>Max</th><th>Samples</th></tr>\n",
    );
    for summary in summaries {
        html.push_str(&format!(
            "      <tr><td>{}</td><td>{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td>\
             <td class=\"num\">{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td>\
             <td class=\"num\">{}</td><td>{}</td></tr>\n",
            escape(&summary.name),
            escape(&summary.dtype),
            summary.null_count,
            fmt_opt_usize(summary.distinct),
            fmt_opt_f64(summary.mean),
            fmt_opt_f64(summary.std),
            fmt_opt_f64(summary.min),
            fmt_opt_f64(summary.max),
            escape(&summary.samples.join(", ")),
        ));
    }
    html.push_str("    </table>\n  </div>\n</body>\n</html>\n");

    html
}

fn push_overview_row(html: &mut String, label: &str, value: &str) {
    html.push_str(&format!(
        "      <tr><th>{}</th><td class=\"num\">{}</td></tr>\n",
        label,
        escape(value)
    ));
}

fn fmt_opt_f64(value: Option<f64>) -> String {
    value.map(|v| format!("{:.3}", v)).unwrap_or_else(|| "-".to_string())
}

fn fmt_opt_usize(value: Option<usize>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people_table() -> DataFrame {
        DataFrame::new(vec![
            Series::new("age", vec![Some(36.0), Some(45.0), None]),
            Series::new(
                "name",
                vec![Some("Ada".to_string()), Some("Grace".to_string()), None],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn report_covers_every_column_and_the_shape() {
        let artifact = DataFrameProfiler
            .generate("people.csv", &people_table())
            .unwrap();

        assert!(artifact.html.contains("people.csv"));
        assert!(artifact.html.contains("age"));
        assert!(artifact.html.contains("name"));
        // 3 rows x 2 columns, one missing value per column.
        assert!(artifact.html.contains("<tr><th>Rows</th><td class=\"num\">3</td></tr>"));
        assert!(artifact.html.contains("<tr><th>Columns</th><td class=\"num\">2</td></tr>"));
    }

    #[test]
    fn numeric_statistics_come_from_the_data_library() {
        let artifact = DataFrameProfiler
            .generate("people.csv", &people_table())
            .unwrap();

        // mean of [36, 45] = 40.5
        assert!(artifact.html.contains("40.500"));
    }

    #[test]
    fn column_names_are_escaped() {
        let df = DataFrame::new(vec![Series::new(
            "<script>alert(1)</script>",
            vec![1.0, 2.0],
        )])
        .unwrap();

        let artifact = DataFrameProfiler.generate("x.csv", &df).unwrap();
        assert!(!artifact.html.contains("<script>alert"));
        assert!(artifact.html.contains("&lt;script&gt;"));
    }

    #[test]
    fn zero_column_table_fails_profiling() {
        let df = DataFrame::default();
        let err = DataFrameProfiler.generate("empty.csv", &df).unwrap_err();
        assert!(matches!(err, PipelineError::Profiling(_)));
    }
}

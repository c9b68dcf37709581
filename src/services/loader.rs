use calamine::{open_workbook_auto, Data, Reader};
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;

use crate::error::PipelineError;

/// Extensions accepted by the upload form.
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["csv", "xls", "xlsx"];

const TYPE_DETECTION_ROWS: usize = 50;

/// True iff the filename has a dot and its lowercased final suffix is an
/// accepted tabular format. Extension-only: no content sniffing.
pub fn is_allowed_extension(filename: &str) -> bool {
    extension(filename)
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Lowercased suffix after the last `.`, if any.
pub fn extension(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, suffix)| suffix.to_lowercase())
}

/// Loads a stored upload into a `DataFrame`, dispatching on its extension.
///
/// Parser-level failures of any kind (malformed CSV, corrupt workbook,
/// empty sheet) are normalized into [`PipelineError::Unreadable`].
pub fn load_table(path: &Path) -> Result<DataFrame, PipelineError> {
    let ext = path
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(extension);

    match ext.as_deref() {
        Some("csv") => load_csv(path),
        Some("xls") | Some("xlsx") => load_excel(path),
        other => Err(PipelineError::Unreadable(format!(
            "no reader for extension {:?}",
            other
        ))),
    }
}

fn load_csv(path: &Path) -> Result<DataFrame, PipelineError> {
    CsvReader::from_path(path)
        .map_err(|e| PipelineError::Unreadable(format!("failed to open CSV: {}", e)))?
        .has_header(true)
        .finish()
        .map_err(|e| PipelineError::Unreadable(format!("failed to parse CSV: {}", e)))
}

/// Reads the first sheet of a workbook, first row as header, and assembles
/// typed columns from the cell grid.
fn load_excel(path: &Path) -> Result<DataFrame, PipelineError> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| PipelineError::Unreadable(format!("failed to open workbook: {}", e)))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| PipelineError::Unreadable("workbook has no sheets".to_string()))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| PipelineError::Unreadable(format!("failed to read worksheet: {}", e)))?;

    let rows: Vec<Vec<Data>> = range.rows().map(|row| row.to_vec()).collect();
    if rows.is_empty() {
        return Err(PipelineError::Unreadable(format!(
            "sheet '{}' is empty",
            sheet_name
        )));
    }

    let mut existing_names = HashSet::new();
    let headers: Vec<String> = rows[0]
        .iter()
        .map(|cell| clean_column_name(&cell.to_string(), &mut existing_names))
        .collect();

    tracing::debug!(
        "sheet '{}': {} data rows, {} columns",
        sheet_name,
        rows.len() - 1,
        headers.len()
    );

    build_dataframe(&rows, &headers)
}

fn build_dataframe(rows: &[Vec<Data>], headers: &[String]) -> Result<DataFrame, PipelineError> {
    if headers.is_empty() {
        return Err(PipelineError::Unreadable("header row is empty".to_string()));
    }

    let mut columns = Vec::with_capacity(headers.len());
    for (col_idx, header) in headers.iter().enumerate() {
        let values: Vec<Data> = rows
            .iter()
            .skip(1) // Skip header row
            .map(|row| row.get(col_idx).cloned().unwrap_or(Data::Empty))
            .collect();

        let series = match detect_column_type(&values) {
            ColumnType::Numeric => {
                let nums: Vec<Option<f64>> = values
                    .iter()
                    .map(|v| match v {
                        Data::Float(f) => Some(*f),
                        Data::Int(i) => Some(*i as f64),
                        _ => None,
                    })
                    .collect();
                Series::new(header, nums)
            }
            ColumnType::Date => {
                let dates: Vec<Option<String>> = values
                    .iter()
                    .map(|v| match v {
                        Data::DateTime(d) => Some(excel_serial_to_iso(d.as_f64())),
                        Data::String(s) if is_date_string(s) => Some(s.clone()),
                        _ => None,
                    })
                    .collect();
                Series::new(header, dates)
            }
            _ => {
                let strings: Vec<Option<String>> = values
                    .iter()
                    .map(|v| match v {
                        Data::Empty => None,
                        _ => Some(v.to_string()),
                    })
                    .collect();
                Series::new(header, strings)
            }
        };

        columns.push(series);
    }

    DataFrame::new(columns)
        .map_err(|e| PipelineError::Unreadable(format!("failed to assemble table: {}", e)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnType {
    Numeric,
    Date,
    Boolean,
    Text,
    Empty,
}

/// Majority vote over a bounded sample of cells. A column counts as typed
/// when at least 80% of its non-empty sampled cells agree.
fn detect_column_type(values: &[Data]) -> ColumnType {
    let mut numeric = 0usize;
    let mut date = 0usize;
    let mut boolean = 0usize;
    let mut total = 0usize;

    for value in values.iter().take(TYPE_DETECTION_ROWS) {
        match value {
            Data::Empty => continue,
            Data::Float(_) | Data::Int(_) => numeric += 1,
            Data::DateTime(_) => date += 1,
            Data::String(s) if is_date_string(s) => date += 1,
            Data::Bool(_) => boolean += 1,
            _ => {}
        }
        total += 1;
    }

    if total == 0 {
        return ColumnType::Empty;
    }

    let threshold = total as f64 * 0.8;
    match () {
        _ if numeric as f64 >= threshold => ColumnType::Numeric,
        _ if date as f64 >= threshold => ColumnType::Date,
        _ if boolean as f64 >= threshold => ColumnType::Boolean,
        _ => ColumnType::Text,
    }
}

static DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^\d{4}-\d{2}-\d{2}$",
        r"^\d{2}/\d{2}/\d{4}$",
        r"^\d{4}/\d{2}/\d{2}$",
        r"^\d{2}-\d{2}-\d{4}$",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

fn is_date_string(s: &str) -> bool {
    DATE_PATTERNS.iter().any(|re| re.is_match(s))
}

/// Excel serial dates count days since 1899-12-30.
fn excel_serial_to_iso(serial: f64) -> String {
    let base = chrono::NaiveDate::from_ymd_opt(1899, 12, 30)
        .expect("valid epoch")
        .and_hms_opt(0, 0, 0)
        .expect("valid epoch time");
    let seconds = (serial * 86_400.0) as i64;
    (base + chrono::Duration::seconds(seconds))
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// Normalizes a header cell into a unique lowercase identifier, suffixing
/// duplicates with a counter.
fn clean_column_name(name: &str, existing_names: &mut HashSet<String>) -> String {
    let base_name = name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect::<String>()
        .to_lowercase();

    let mut cleaned = if base_name.chars().next().map_or(true, |c| !c.is_alphabetic()) {
        format!("col_{}", base_name)
    } else {
        base_name
    };

    let mut counter = 1;
    let original_name = cleaned.clone();
    while !existing_names.insert(cleaned.clone()) {
        cleaned = format!("{}_{}", original_name, counter);
        counter += 1;
    }

    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn tmp_file(name: &str, ext: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("tabular-profiler-{name}-{nanos}.{ext}"))
    }

    #[test]
    fn allowed_extension_truth_table() {
        assert!(is_allowed_extension("data.csv"));
        assert!(is_allowed_extension("data.CSV"));
        assert!(is_allowed_extension("a.b.xlsx"));
        assert!(is_allowed_extension("legacy.XLS"));
        assert!(!is_allowed_extension("report"));
        assert!(!is_allowed_extension("notes.txt"));
        assert!(!is_allowed_extension("archive.tar.gz"));
        assert!(!is_allowed_extension(""));
    }

    #[test]
    fn extension_takes_the_final_suffix() {
        assert_eq!(extension("a.b.xlsx").as_deref(), Some("xlsx"));
        assert_eq!(extension("DATA.CSV").as_deref(), Some("csv"));
        assert_eq!(extension("noext"), None);
    }

    #[test]
    fn load_csv_with_header_row() {
        let path = tmp_file("people", "csv");
        std::fs::write(&path, "name,age,score\nAda,36,98.5\nGrace,45,87.25\n").unwrap();

        let df = load_table(&path).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 3);
        assert!(df.get_column_names().contains(&"age"));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn load_header_only_csv_yields_empty_table() {
        let path = tmp_file("header-only", "csv");
        std::fs::write(&path, "a,b,c\n").unwrap();

        let df = load_table(&path).unwrap();
        assert_eq!(df.height(), 0);
        assert_eq!(df.width(), 3);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn corrupt_workbook_is_normalized_to_unreadable() {
        let path = tmp_file("corrupt", "xlsx");
        std::fs::write(&path, b"this is not a zip archive at all").unwrap();

        let err = load_table(&path).unwrap_err();
        assert!(matches!(err, PipelineError::Unreadable(_)));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn unknown_extension_yields_no_dataset() {
        let err = load_table(Path::new("whatever.parquet")).unwrap_err();
        assert!(matches!(err, PipelineError::Unreadable(_)));
    }

    #[test]
    fn detect_column_type_majority_vote() {
        let numeric = vec![Data::Int(1), Data::Float(2.5), Data::Empty, Data::Int(3)];
        assert_eq!(detect_column_type(&numeric), ColumnType::Numeric);

        let text = vec![
            Data::String("a".into()),
            Data::Int(1),
            Data::String("b".into()),
            Data::String("c".into()),
        ];
        assert_eq!(detect_column_type(&text), ColumnType::Text);

        let dates = vec![
            Data::String("2024-01-01".into()),
            Data::String("2024-02-01".into()),
        ];
        assert_eq!(detect_column_type(&dates), ColumnType::Date);

        assert_eq!(detect_column_type(&[Data::Empty]), ColumnType::Empty);
        assert_eq!(detect_column_type(&[]), ColumnType::Empty);
    }

    #[test]
    fn clean_column_name_uniquifies_and_normalizes() {
        let mut seen = HashSet::new();
        assert_eq!(clean_column_name("First Name", &mut seen), "first_name");
        assert_eq!(clean_column_name("First Name", &mut seen), "first_name_1");
        assert_eq!(clean_column_name("2024", &mut seen), "col_2024");
    }
}

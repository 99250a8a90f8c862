//! Record flattening and batch CSV export
//!
//! Records are arbitrary JSON objects. Flattening maps each one to a set of
//! `dotted.path -> text` cells:
//!
//! | Value | Cell |
//! |-------|------|
//! | nested object | one cell per leaf, keys joined with `.` |
//! | array of scalars | items joined with `"; "` |
//! | array holding objects or arrays | compact JSON text |
//! | null | empty |
//!
//! The JSON text for composite arrays is for reading only; the CSV is not
//! meant to be parsed back into the original records. Paths are not escaped
//! either: a literal dotted key (`"a.b"`) and a nested path (`a` → `b`) share
//! one column, and only one of the two values survives.

use crate::model::TabularRecord;
use crate::output::OutputResult;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Sorted set of dotted field paths forming the column order of a table
pub type FieldSchema = BTreeSet<String>;

/// One flattened record: field path to cell text
pub type FlatRecord = BTreeMap<String, String>;

/// Separator used when joining arrays of scalars into one cell
pub const ARRAY_SEPARATOR: &str = "; ";

/// Result of writing one table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableSummary {
    /// Data rows written (header excluded)
    pub rows: usize,
    /// Columns in the final header
    pub columns: usize,
    /// Rows narrower than the final header
    pub ragged_rows: usize,
}

/// Flattens a record into dotted-path cells
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use sumi_archive::output::flatten_record;
///
/// let record = json!({"id": 1, "status": {"name": "open"}, "tags": ["a", "b"]});
/// let flat = flatten_record(record.as_object().unwrap());
///
/// assert_eq!(flat["id"], "1");
/// assert_eq!(flat["status.name"], "open");
/// assert_eq!(flat["tags"], "a; b");
/// ```
pub fn flatten_record(record: &TabularRecord) -> FlatRecord {
    let mut flat = FlatRecord::new();
    for (key, value) in record {
        flatten_into(key, value, &mut flat);
    }
    flat
}

fn flatten_into(path: &str, value: &Value, out: &mut FlatRecord) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                flatten_into(&format!("{}.{}", path, key), nested, out);
            }
        }
        other => {
            if let Some(previous) = out.insert(path.to_string(), cell_text(other)) {
                tracing::debug!("Field path {} seen twice, dropping value {:?}", path, previous);
            }
        }
    }
}

/// Text of a single non-object value
fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(_) | Value::Number(_) => value.to_string(),
        Value::Array(items) if items.iter().all(is_scalar) => items
            .iter()
            .map(cell_text)
            .collect::<Vec<_>>()
            .join(ARRAY_SEPARATOR),
        composite => serde_json::to_string(composite).unwrap_or_default(),
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Object(_) | Value::Array(_))
}

/// Quotes a cell when it holds a separator, a quote or a line break
///
/// # Examples
///
/// ```
/// use sumi_archive::output::escape_csv;
///
/// assert_eq!(escape_csv("plain"), "plain");
/// assert_eq!(escape_csv("a,b"), "\"a,b\"");
/// assert_eq!(escape_csv("He said \"hi\""), "\"He said \"\"hi\"\"\"");
/// ```
pub fn escape_csv(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Formats the header line (without terminator)
pub fn format_header(schema: &FieldSchema) -> String {
    schema
        .iter()
        .map(|field| escape_csv(field))
        .collect::<Vec<_>>()
        .join(",")
}

/// Formats one data row against `schema`; absent fields are empty cells
pub fn format_row(schema: &FieldSchema, record: &FlatRecord) -> String {
    schema
        .iter()
        .map(|field| record.get(field).map(|v| escape_csv(v)).unwrap_or_default())
        .collect::<Vec<_>>()
        .join(",")
}

/// Computes the sorted union of every field path in `records`
pub fn collect_schema<'a>(records: impl IntoIterator<Item = &'a FlatRecord>) -> FieldSchema {
    records
        .into_iter()
        .flat_map(|record| record.keys().cloned())
        .collect()
}

/// Writes a whole collection as CSV with a fixed header
///
/// The header is the sorted union of all flattened field paths; every row has
/// exactly as many cells as the header.
pub fn export_batch<W: Write>(records: &[TabularRecord], mut out: W) -> OutputResult<TableSummary> {
    let flattened: Vec<FlatRecord> = records.iter().map(flatten_record).collect();
    let schema = collect_schema(&flattened);

    writeln!(out, "{}", format_header(&schema))?;
    for record in &flattened {
        writeln!(out, "{}", format_row(&schema, record))?;
    }
    out.flush()?;

    Ok(TableSummary {
        rows: flattened.len(),
        columns: schema.len(),
        ragged_rows: 0,
    })
}

/// Renders a batch export into a string
pub fn render_batch(records: &[TabularRecord]) -> String {
    let mut buffer = Vec::new();
    // Writing into a Vec cannot fail
    let _ = export_batch(records, &mut buffer);
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Writes a batch export to `path`, truncating any existing file
pub fn write_batch(path: &Path, records: &[TabularRecord]) -> OutputResult<TableSummary> {
    let file = File::create(path)?;
    export_batch(records, BufWriter::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> TabularRecord {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_dotted_key_shares_column_with_nested_path() {
        let flat = flatten_record(&record(json!({"a.b": 1, "a": {"b": 2}})));

        assert_eq!(flat.len(), 1);
        assert!(flat["a.b"] == "1" || flat["a.b"] == "2");
    }

    #[test]
    fn test_escape_csv() {
        assert_eq!(escape_csv("a,b"), "\"a,b\"");
        assert_eq!(escape_csv("He said \"hi\""), "\"He said \"\"hi\"\"\"");
        assert_eq!(escape_csv("line\nbreak"), "\"line\nbreak\"");
        assert_eq!(escape_csv("carriage\rreturn"), "\"carriage\rreturn\"");
        assert_eq!(escape_csv("plain text"), "plain text");
        assert_eq!(escape_csv(""), "");
    }

    #[test]
    fn test_flatten_nested_objects() {
        let flat = flatten_record(&record(json!({
            "id": "t1",
            "status": {"name": "open", "color": {"hex": "#fff"}},
            "archived": false,
            "points": 3.5,
            "due": null
        })));

        assert_eq!(flat["id"], "t1");
        assert_eq!(flat["status.name"], "open");
        assert_eq!(flat["status.color.hex"], "#fff");
        assert_eq!(flat["archived"], "false");
        assert_eq!(flat["points"], "3.5");
        assert_eq!(flat["due"], "");
    }

    #[test]
    fn test_flatten_arrays() {
        let flat = flatten_record(&record(json!({
            "tags": ["bug", "ui", 3, true, null],
            "empty": [],
            "assignees": [{"id": 1, "name": "Ana"}],
            "matrix": [[1, 2], [3]]
        })));

        assert_eq!(flat["tags"], "bug; ui; 3; true; ");
        assert_eq!(flat["empty"], "");
        assert_eq!(flat["assignees"], r#"[{"id":1,"name":"Ana"}]"#);
        assert_eq!(flat["matrix"], "[[1,2],[3]]");
    }

    #[test]
    fn test_empty_object_contributes_no_field() {
        let flat = flatten_record(&record(json!({"id": 1, "meta": {}})));
        assert_eq!(flat.keys().collect::<Vec<_>>(), vec!["id"]);
    }

    #[test]
    fn test_batch_line_and_width_counts() {
        let records = vec![
            record(json!({"id": 1, "name": "a"})),
            record(json!({"id": 2, "extra": {"x": "y"}})),
            record(json!({"name": "c, with comma"})),
        ];

        let csv = render_batch(&records);
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), records.len() + 1);
        assert_eq!(lines[0], "extra.x,id,name");
        assert_eq!(lines[1], ",1,a");
        assert_eq!(lines[2], "y,2,");
        assert_eq!(lines[3], ",,\"c, with comma\"");
    }

    #[test]
    fn test_batch_rows_match_header_width() {
        let records = vec![
            record(json!({"a": 1})),
            record(json!({"b": {"c": 2, "d": [1, 2]}})),
            record(json!({})),
            record(json!({"e": "x"})),
        ];

        let csv = render_batch(&records);
        let lines: Vec<&str> = csv.lines().collect();
        let width = lines[0].split(',').count();

        assert_eq!(lines.len(), 5);
        for line in &lines[1..] {
            assert_eq!(line.split(',').count(), width, "row {:?}", line);
        }
    }

    #[test]
    fn test_header_is_sorted_union_of_paths() {
        let records = vec![
            record(json!({"zeta": 1, "alpha": {"beta": 2}})),
            record(json!({"mid": [1], "alpha": {"gamma": {"delta": 3}}})),
        ];

        let expected: FieldSchema = ["alpha.beta", "alpha.gamma.delta", "mid", "zeta"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let flattened: Vec<FlatRecord> = records.iter().map(flatten_record).collect();
        assert_eq!(collect_schema(&flattened), expected);

        let csv = render_batch(&records);
        assert_eq!(csv.lines().next().unwrap(), "alpha.beta,alpha.gamma.delta,mid,zeta");
    }

    #[test]
    fn test_write_batch_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.csv");

        let summary = write_batch(&path, &[record(json!({"id": 1})), record(json!({"id": 2}))])
            .unwrap();

        assert_eq!(
            summary,
            TableSummary {
                rows: 2,
                columns: 1,
                ragged_rows: 0
            }
        );
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "id\n1\n2\n");
    }
}

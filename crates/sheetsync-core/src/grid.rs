use serde::Serialize;
use serde_json::Value;

use crate::types::Record;

/// Header cell written for a collection with no records.
pub const NO_DATA: &str = "No Data";

/// Rectangular header + rows payload for one spreadsheet tab.
///
/// Row 0 is always a non-empty header. Serializes as the bare
/// `[[...], [...]]` array the Sheets `values` field expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SheetGrid {
    rows: Vec<Vec<Value>>,
}

impl SheetGrid {
    /// Build the grid for a fetch result.
    ///
    /// The header is the first record's field names. Every record
    /// contributes its values in its own field order; a record whose fields
    /// differ from the first one lands misaligned under the header, which is
    /// accepted. No sorting, no dedup.
    ///
    /// Only an empty fetch collapses to `[["No Data"]]`. A first record with
    /// no fields gets `No Data` as its header and still one row per record.
    pub fn from_records(records: &[Record]) -> Self {
        let Some(first) = records.first() else {
            return Self::no_data();
        };

        let mut rows = Vec::with_capacity(records.len() + 1);
        if first.is_empty() {
            rows.push(vec![Value::String(NO_DATA.to_string())]);
        } else {
            rows.push(first.names().map(|n| Value::String(n.to_string())).collect());
        }
        for record in records {
            rows.push(record.values().map(cell).collect());
        }
        Self { rows }
    }

    /// The `[["No Data"]]` grid.
    pub fn no_data() -> Self {
        Self {
            rows: vec![vec![Value::String(NO_DATA.to_string())]],
        }
    }

    pub fn header(&self) -> &[Value] {
        &self.rows[0]
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Data rows, excluding the header.
    pub fn body(&self) -> &[Vec<Value>] {
        &self.rows[1..]
    }

    pub fn is_no_data(&self) -> bool {
        self.rows.len() == 1 && self.rows[0] == [Value::String(NO_DATA.to_string())]
    }
}

/// A1 range covering the origin of the tab named after `tab`.
///
/// Plain identifiers stay bare (`users!A1`). Anything else, including names
/// ending in a digit that Sheets could read as a cell reference, is quoted
/// with inner `'` doubled (`'Q1 sales'!A1`, `'A1'!A1`).
pub fn range_for(tab: &str) -> String {
    if is_plain_tab_name(tab) {
        format!("{tab}!A1")
    } else {
        format!("'{}'!A1", tab.replace('\'', "''"))
    }
}

fn is_plain_tab_name(tab: &str) -> bool {
    let (Some(first), Some(last)) = (tab.chars().next(), tab.chars().last()) else {
        return false;
    };
    !first.is_ascii_digit()
        && !last.is_ascii_digit()
        && tab.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Convert a record value into something RAW mode accepts as a single cell.
fn cell(value: &Value) -> Value {
    match value {
        Value::Null => Value::String(String::new()),
        Value::Array(_) | Value::Object(_) => Value::String(value.to_string()),
        scalar => scalar.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn users() -> Vec<Record> {
        vec![
            Record::new().with("id", 1).with("name", "A"),
            Record::new().with("id", 2).with("name", "B"),
        ]
    }

    #[test]
    fn header_comes_from_first_record() {
        let grid = SheetGrid::from_records(&users());
        assert_eq!(grid.header(), &[json!("id"), json!("name")]);
    }

    #[test]
    fn users_example_grid() {
        let grid = SheetGrid::from_records(&users());
        assert_eq!(
            serde_json::to_value(&grid).unwrap(),
            json!([["id", "name"], [1, "A"], [2, "B"]])
        );
    }

    #[test]
    fn empty_collection_is_no_data() {
        let grid = SheetGrid::from_records(&[]);
        assert_eq!(serde_json::to_value(&grid).unwrap(), json!([["No Data"]]));
        assert!(grid.is_no_data());
        assert!(grid.body().is_empty());
    }

    #[test]
    fn empty_first_record_keeps_every_row() {
        let records = vec![Record::new(), Record::new().with("a", 1)];
        let grid = SheetGrid::from_records(&records);
        assert_eq!(grid.rows().len(), records.len() + 1);
        assert_eq!(grid.header(), &[json!("No Data")]);
        assert!(grid.body()[0].is_empty());
        assert_eq!(grid.body()[1], vec![json!(1)]);
        assert!(!grid.is_no_data());
    }

    #[test]
    fn single_record_without_fields_keeps_its_row() {
        let grid = SheetGrid::from_records(&[Record::new()]);
        assert_eq!(
            serde_json::to_value(&grid).unwrap(),
            json!([["No Data"], []])
        );
    }

    #[test]
    fn rows_follow_fetch_order() {
        let records = vec![
            Record::new().with("n", 3),
            Record::new().with("n", 1),
            Record::new().with("n", 3),
        ];
        let grid = SheetGrid::from_records(&records);
        let body: Vec<_> = grid.body().iter().map(|r| r[0].clone()).collect();
        assert_eq!(body, vec![json!(3), json!(1), json!(3)]);
    }

    #[test]
    fn heterogeneous_records_are_positional() {
        let records = vec![
            Record::new().with("id", 1).with("name", "A"),
            Record::new().with("name", "B").with("id", 2).with("extra", true),
        ];
        let grid = SheetGrid::from_records(&records);
        assert_eq!(grid.header().len(), 2);
        assert_eq!(grid.body()[1], vec![json!("B"), json!(2), json!(true)]);
    }

    #[test]
    fn nested_values_become_json_text() {
        let records = vec![Record::new()
            .with("tags", json!(["a", "b"]))
            .with("meta", json!({"k": 1}))
            .with("gone", Value::Null)];
        let grid = SheetGrid::from_records(&records);
        assert_eq!(
            grid.body()[0],
            vec![json!(r#"["a","b"]"#), json!(r#"{"k":1}"#), json!("")]
        );
    }

    #[test]
    fn range_is_anchored_at_a1() {
        assert_eq!(range_for("users"), "users!A1");
        assert_eq!(range_for("audit_log"), "audit_log!A1");
    }

    #[test]
    fn ambiguous_tab_names_are_quoted() {
        assert_eq!(range_for("A1"), "'A1'!A1");
        assert_eq!(range_for("ab12"), "'ab12'!A1");
        assert_eq!(range_for("Q1 sales"), "'Q1 sales'!A1");
        assert_eq!(range_for("bob's"), "'bob''s'!A1");
        assert_eq!(range_for("wow!"), "'wow!'!A1");
        assert_eq!(range_for("2024"), "'2024'!A1");
    }
}

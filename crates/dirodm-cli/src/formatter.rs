//! Output formatters for records, filters and counts.

use clap::ValueEnum;
use comfy_table::{Cell, Table};
use dirodm_core::catalog::Record;
use dirodm_core::filter::Filter;
use dirodm_core::value::Value;

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format
    Table,
    /// JSON format
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Trait for formatting output.
pub trait Formatter {
    /// Format search results.
    fn format_records(&self, records: &[Record]) -> String;

    /// Format the pages of a paged search.
    fn format_pages(&self, pages: &[Vec<Record>]) -> String;

    /// Format an encoded filter.
    fn format_filter(&self, filter: &Filter) -> String;

    /// Format a match count.
    fn format_count(&self, count: u64) -> String;
}

/// Create a formatter for the given output format.
pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Table => Box::new(TableFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}

/// Table formatter using comfy-table.
pub struct TableFormatter;

impl Formatter for TableFormatter {
    fn format_records(&self, records: &[Record]) -> String {
        if records.is_empty() {
            return "No results".to_string();
        }
        format!("{}\n({} entries)", records_table(records), records.len())
    }

    fn format_pages(&self, pages: &[Vec<Record>]) -> String {
        if pages.iter().all(Vec::is_empty) {
            return "No results".to_string();
        }
        pages
            .iter()
            .enumerate()
            .map(|(i, page)| {
                format!(
                    "Page {} ({} entries)\n{}",
                    i + 1,
                    page.len(),
                    records_table(page)
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn format_filter(&self, filter: &Filter) -> String {
        filter.encode()
    }

    fn format_count(&self, count: u64) -> String {
        format!("{} matching entries", count)
    }
}

/// JSON formatter.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format_records(&self, records: &[Record]) -> String {
        let rows: Vec<serde_json::Value> = records.iter().map(record_to_json).collect();
        serde_json::to_string_pretty(&rows).unwrap_or_else(|_| "[]".to_string())
    }

    fn format_pages(&self, pages: &[Vec<Record>]) -> String {
        let pages: Vec<serde_json::Value> = pages
            .iter()
            .map(|page| serde_json::Value::Array(page.iter().map(record_to_json).collect()))
            .collect();
        serde_json::to_string_pretty(&pages).unwrap_or_else(|_| "[]".to_string())
    }

    fn format_filter(&self, filter: &Filter) -> String {
        serde_json::json!({ "filter": filter.encode() }).to_string()
    }

    fn format_count(&self, count: u64) -> String {
        serde_json::json!({ "count": count }).to_string()
    }
}

/// Columns are the DN followed by every property seen, in first-seen order.
fn records_table(records: &[Record]) -> String {
    let mut columns: Vec<&str> = Vec::new();
    for record in records {
        for (property, _) in record.properties.iter() {
            if !columns.contains(&property) {
                columns.push(property);
            }
        }
    }

    let mut table = Table::new();
    let mut header = vec![Cell::new("dn"), Cell::new("type")];
    header.extend(columns.iter().map(|c| Cell::new(c)));
    table.set_header(header);

    for record in records {
        let mut row = vec![
            Cell::new(record.dn.to_string()),
            Cell::new(&record.type_name),
        ];
        row.extend(columns.iter().map(|c| Cell::new(format_cell(record.get(c)))));
        table.add_row(row);
    }

    table.to_string()
}

fn format_cell(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        other => other.to_string(),
    }
}

fn record_to_json(record: &Record) -> serde_json::Value {
    let properties: serde_json::Map<String, serde_json::Value> = record
        .properties
        .iter()
        .map(|(name, value)| (name.to_string(), value_to_json(value)))
        .collect();
    serde_json::json!({
        "dn": record.dn.to_string(),
        "type": record.type_name,
        "properties": properties,
    })
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Integer(i) => serde_json::Value::from(*i),
        Value::Boolean(b) => serde_json::Value::Bool(*b),
        Value::Binary(bytes) => serde_json::Value::String(hex::encode(bytes)),
        Value::Timestamp(t) => serde_json::Value::String(t.to_rfc3339()),
        Value::Dn(dn) => serde_json::Value::String(dn.to_string()),
        Value::Reference(r) => serde_json::Value::String(r.dn.to_string()),
        Value::List(items) => serde_json::Value::Array(items.iter().map(value_to_json).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirodm_proto::Dn;

    fn records() -> Vec<Record> {
        vec![
            Record::new("Person", Dn::parse("cn=alex,dc=example").unwrap())
                .with("name", "alex")
                .with("phones", vec!["1".to_string(), "2".to_string()]),
            Record::new("Employee", Dn::parse("cn=bob,dc=example").unwrap())
                .with("name", "bob")
                .with("number", 42i64),
        ]
    }

    #[test]
    fn test_table_formatter() {
        let output = TableFormatter.format_records(&records());
        assert!(output.contains("cn=alex,dc=example"));
        assert!(output.contains("number"));
        assert!(output.contains("1, 2"));
        assert!(output.contains("NULL"));
        assert!(output.ends_with("(2 entries)"));

        assert_eq!(TableFormatter.format_records(&[]), "No results");
        assert_eq!(TableFormatter.format_count(3), "3 matching entries");
    }

    #[test]
    fn test_table_pages() {
        let records = records();
        let pages = vec![records[..1].to_vec(), records[1..].to_vec()];
        let output = TableFormatter.format_pages(&pages);
        assert!(output.starts_with("Page 1 (1 entries)"));
        assert!(output.contains("Page 2 (1 entries)"));
    }

    #[test]
    fn test_json_formatter() {
        let output = JsonFormatter.format_records(&records());
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed[0]["dn"], "cn=alex,dc=example");
        assert_eq!(parsed[0]["properties"]["phones"][1], "2");
        assert_eq!(parsed[1]["type"], "Employee");
        assert_eq!(parsed[1]["properties"]["number"], 42);

        let count: serde_json::Value =
            serde_json::from_str(&JsonFormatter.format_count(7)).unwrap();
        assert_eq!(count["count"], 7);
    }

    #[test]
    fn test_json_filter() {
        let filter = Filter::equals("cn", "a*b");
        let output: serde_json::Value =
            serde_json::from_str(&JsonFormatter.format_filter(&filter)).unwrap();
        assert_eq!(output["filter"], "(cn=a\\2ab)");
    }
}

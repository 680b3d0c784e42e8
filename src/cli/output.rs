use std::fmt::Write as FmtWrite;

use console::{measure_text_width, strip_ansi_codes, style};
use serde_json::{Map, Value};
use tracing::warn;

use crate::models::OutputFormat;
use crate::utils::text::{display_value, title_from_key};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub key: String,
    pub header: String,
}

impl Column {
    /// Column whose header is derived from the key.
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            header: title_from_key(key),
        }
    }

    pub fn titled(key: &str, header: &str) -> Self {
        Self {
            key: key.to_string(),
            header: header.to_string(),
        }
    }

    fn matches(&self, attribute: &str) -> bool {
        self.key.eq_ignore_ascii_case(attribute) || self.header.eq_ignore_ascii_case(attribute)
    }
}

/// Rows of cells under a fixed set of columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Pick `columns` out of each record; missing keys become empty cells.
    pub fn from_records(columns: Vec<Column>, records: &[Map<String, Value>]) -> Self {
        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|column| record.get(&column.key).map(display_value).unwrap_or_default())
                    .collect()
            })
            .collect();
        Self { columns, rows }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    /// Keep only the requested columns, in the requested order.
    pub fn project(&self, attributes: &[String]) -> Self {
        let picks: Vec<(Column, Option<usize>)> = attributes
            .iter()
            .map(|attribute| {
                match self.columns.iter().position(|c| c.matches(attribute)) {
                    Some(index) => (self.columns[index].clone(), Some(index)),
                    None => {
                        warn!("Unknown attribute '{}'", attribute);
                        (Column::titled(attribute, attribute), None)
                    }
                }
            })
            .collect();

        let rows = self
            .rows
            .iter()
            .map(|row| {
                picks
                    .iter()
                    .map(|(_, index)| index.and_then(|i| row.get(i).cloned()).unwrap_or_default())
                    .collect()
            })
            .collect();

        Self {
            columns: picks.into_iter().map(|(column, _)| column).collect(),
            rows,
        }
    }
}

/// Attribute/value view of a single object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    pub rows: Vec<(String, String)>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.rows.push((key.into(), value.into()));
    }

    pub fn from_map(map: &Map<String, Value>) -> Self {
        Self {
            rows: map
                .iter()
                .map(|(key, value)| (key.clone(), display_value(value)))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.rows
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Keep only the requested rows, in the requested order.
    pub fn project(&self, attributes: &[String]) -> Self {
        let rows = attributes
            .iter()
            .map(|attribute| {
                match self.rows.iter().find(|(k, _)| k.eq_ignore_ascii_case(attribute)) {
                    Some(row) => row.clone(),
                    None => {
                        warn!("Unknown attribute '{}'", attribute);
                        (attribute.clone(), String::new())
                    }
                }
            })
            .collect();
        Self { rows }
    }
}

/// Output of a listing command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing {
    Table(Table),
    Properties(Properties),
}

impl Listing {
    pub fn project(self, attributes: Option<&[String]>) -> Self {
        match (self, attributes) {
            (listing, None) => listing,
            (Listing::Table(table), Some(attributes)) => Listing::Table(table.project(attributes)),
            (Listing::Properties(properties), Some(attributes)) => {
                Listing::Properties(properties.project(attributes))
            }
        }
    }
}

impl From<Table> for Listing {
    fn from(table: Table) -> Self {
        Listing::Table(table)
    }
}

impl From<Properties> for Listing {
    fn from(properties: Properties) -> Self {
        Listing::Properties(properties)
    }
}

const ATTRIBUTE_HEADER: &str = "Attribute";
const VALUE_HEADER: &str = "Value";

pub trait Formatter {
    fn format_table(&self, table: &Table) -> String;
    fn format_properties(&self, properties: &Properties) -> String;
    fn format_message(&self, message: &str) -> String;
    fn format_success(&self, message: &str) -> String;
    fn format_error(&self, error: &str) -> String;

    fn format_listing(&self, listing: &Listing) -> String {
        match listing {
            Listing::Table(table) => self.format_table(table),
            Listing::Properties(properties) => self.format_properties(properties),
        }
    }
}

fn properties_table(properties: &Properties) -> Table {
    Table {
        columns: vec![
            Column::titled("attribute", ATTRIBUTE_HEADER),
            Column::titled("value", VALUE_HEADER),
        ],
        rows: properties
            .rows
            .iter()
            .map(|(k, v)| vec![k.clone(), v.clone()])
            .collect(),
    }
}

pub struct TextFormatter;

impl TextFormatter {
    fn separator(widths: &[usize]) -> String {
        let mut line = String::from("+");
        for width in widths {
            line.push_str(&"-".repeat(width + 2));
            line.push('+');
        }
        line.push('\n');
        line
    }

    fn row<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
        let mut line = String::from("|");
        for (cell, width) in cells.zip(widths) {
            let padding = width.saturating_sub(measure_text_width(cell));
            let _ = write!(line, " {}{} |", cell, " ".repeat(padding));
        }
        line.push('\n');
        line
    }
}

impl Formatter for TextFormatter {
    fn format_table(&self, table: &Table) -> String {
        let mut widths: Vec<usize> = table
            .columns
            .iter()
            .map(|c| measure_text_width(&c.header))
            .collect();
        for row in &table.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(measure_text_width(cell));
            }
        }

        let separator = Self::separator(&widths);
        let mut output = separator.clone();
        output.push_str(&Self::row(
            table.columns.iter().map(|c| c.header.as_str()),
            &widths,
        ));
        output.push_str(&separator);
        if !table.rows.is_empty() {
            for row in &table.rows {
                output.push_str(&Self::row(row.iter().map(String::as_str), &widths));
            }
            output.push_str(&separator);
        }
        output
    }

    fn format_properties(&self, properties: &Properties) -> String {
        self.format_table(&properties_table(properties))
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", message)
    }

    fn format_success(&self, message: &str) -> String {
        format!("{} {}\n", style("SUCCESS").green(), message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("Error: {}\n", error)
    }
}

pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn render(&self, value: &Value) -> String {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        let mut output = rendered.unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e));
        output.push('\n');
        output
    }
}

fn plain(text: &str) -> Value {
    Value::String(strip_ansi_codes(text).into_owned())
}

impl Formatter for JsonFormatter {
    fn format_table(&self, table: &Table) -> String {
        let rows: Vec<Value> = table
            .rows
            .iter()
            .map(|row| {
                let object: Map<String, Value> = table
                    .columns
                    .iter()
                    .zip(row)
                    .map(|(column, cell)| (column.header.clone(), plain(cell)))
                    .collect();
                Value::Object(object)
            })
            .collect();
        self.render(&Value::Array(rows))
    }

    fn format_properties(&self, properties: &Properties) -> String {
        let object: Map<String, Value> = properties
            .rows
            .iter()
            .map(|(key, value)| (key.clone(), plain(value)))
            .collect();
        self.render(&Value::Object(object))
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", serde_json::json!({"message": message}))
    }

    fn format_success(&self, message: &str) -> String {
        format!("{}\n", serde_json::json!({"success": message}))
    }

    fn format_error(&self, error: &str) -> String {
        format!("{}\n", serde_json::json!({"error": error}))
    }
}

pub struct MarkdownFormatter;

fn markdown_cell(text: &str) -> String {
    strip_ansi_codes(text).replace('|', "\\|")
}

impl Formatter for MarkdownFormatter {
    fn format_table(&self, table: &Table) -> String {
        let mut output = String::new();
        let headers: Vec<String> = table.columns.iter().map(|c| markdown_cell(&c.header)).collect();
        let _ = writeln!(output, "| {} |", headers.join(" | "));
        let rules: Vec<&str> = table.columns.iter().map(|_| "---").collect();
        let _ = writeln!(output, "|{}|", rules.join("|"));
        for row in &table.rows {
            let cells: Vec<String> = row.iter().map(|cell| markdown_cell(cell)).collect();
            let _ = writeln!(output, "| {} |", cells.join(" | "));
        }
        output
    }

    fn format_properties(&self, properties: &Properties) -> String {
        self.format_table(&properties_table(properties))
    }

    fn format_message(&self, message: &str) -> String {
        format!("> {}\n", message)
    }

    fn format_success(&self, message: &str) -> String {
        format!("> **SUCCESS** {}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("> ⚠️ **Error:** {}\n", error)
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
        OutputFormat::Markdown => Box::new(MarkdownFormatter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn indices() -> Table {
        let records = json!([
            {"index": "logs", "health": "green", "status": "open", "docs.count": "12"},
            {"index": "metrics", "health": "yellow", "status": "close"}
        ]);
        let records: Vec<Map<String, Value>> = serde_json::from_value(records).unwrap();
        Table::from_records(
            vec![
                Column::new("index"),
                Column::new("health"),
                Column::new("status"),
                Column::new("docs.count"),
            ],
            &records,
        )
    }

    #[test]
    fn test_from_records() {
        let table = indices();
        assert_eq!(table.columns[3].header, "Docs Count");
        assert_eq!(table.rows[0], vec!["logs", "green", "open", "12"]);
        assert_eq!(table.rows[1][3], "");
    }

    #[test]
    fn test_project_table_in_requested_order() {
        let attributes = vec!["status".to_string(), "index".to_string()];
        let table = indices().project(&attributes);

        let headers: Vec<&str> = table.columns.iter().map(|c| c.header.as_str()).collect();
        assert_eq!(headers, vec!["Status", "Index"]);
        assert_eq!(table.rows[0], vec!["open", "logs"]);
        assert_eq!(table.rows[1], vec!["close", "metrics"]);
    }

    #[test]
    fn test_project_matches_header_and_unknown() {
        let attributes = vec!["Docs Count".to_string(), "nope".to_string()];
        let table = indices().project(&attributes);

        assert_eq!(table.columns[0].key, "docs.count");
        assert_eq!(table.columns[1].header, "nope");
        assert_eq!(table.rows[0], vec!["12", ""]);
    }

    #[test]
    fn test_project_properties() {
        let mut properties = Properties::new();
        properties.push("cluster_name", "prod");
        properties.push("status", "green");
        properties.push("number_of_nodes", "3");

        let attributes = vec!["STATUS".to_string(), "cluster_name".to_string(), "x".to_string()];
        let projected = properties.project(&attributes);
        assert_eq!(
            projected.rows,
            vec![
                ("status".to_string(), "green".to_string()),
                ("cluster_name".to_string(), "prod".to_string()),
                ("x".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn test_text_table() {
        let mut table = Table::new(vec![Column::new("name"), Column::new("status")]);
        table.push_row(vec!["logs".to_string(), "open".to_string()]);

        let expected = "\
+------+--------+
| Name | Status |
+------+--------+
| logs | open   |
+------+--------+
";
        assert_eq!(TextFormatter.format_table(&table), expected);
    }

    #[test]
    fn test_text_table_ignores_ansi_width() {
        let mut table = Table::new(vec![Column::titled("disk.percent", "Disk %")]);
        table.push_row(vec![style("95").red().force_styling(true).to_string()]);

        let output = TextFormatter.format_table(&table);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(measure_text_width(lines[3]), lines[0].len());
    }

    #[test]
    fn test_json_properties_strip_colors() {
        let mut properties = Properties::new();
        properties.push("status", style("green").green().force_styling(true).to_string());

        let output = JsonFormatter::new(false).format_properties(&properties);
        assert_eq!(output, "{\"status\":\"green\"}\n");
    }

    #[test]
    fn test_json_table() {
        let output = JsonFormatter::new(false).format_table(&indices().project(&["index".to_string()]));
        assert_eq!(output, "[{\"Index\":\"logs\"},{\"Index\":\"metrics\"}]\n");
    }

    #[test]
    fn test_markdown_table() {
        let mut table = Table::new(vec![Column::new("name"), Column::new("user")]);
        table.push_row(vec!["prod".to_string(), "a|b".to_string()]);

        let output = MarkdownFormatter.format_table(&table);
        assert_eq!(output, "| Name | User |\n|---|---|\n| prod | a\\|b |\n");
    }

    #[test]
    fn test_listing_projection_passthrough() {
        let listing = Listing::from(indices());
        assert_eq!(listing.clone().project(None), listing);
    }
}

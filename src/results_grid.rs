//! Results Grid Module for dbdesk
//!
//! Renders a `QueryResult` as a plain-text table and exports it as CSV,
//! JSON or Markdown.
use crate::core::db::QueryResult;
use crate::core::{DbdeskError, Result};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// JSON export layout: the header once, then positional rows, so repeated
/// column names and column order survive.
#[derive(Serialize)]
struct JsonExport<'a> {
    columns: &'a [String],
    rows: &'a [Vec<String>],
}

/// A query result prepared for display and export.
#[derive(Debug, Clone, Default)]
pub struct ResultsGrid {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl From<QueryResult> for ResultsGrid {
    fn from(result: QueryResult) -> Self {
        ResultsGrid {
            headers: result.columns,
            rows: result.rows,
        }
    }
}

impl ResultsGrid {
    /// Creates a new, empty ResultsGrid.
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders the grid with columns padded to their widest cell.
    pub fn render(&self) -> String {
        if self.headers.is_empty() {
            return String::new();
        }
        let widths: Vec<usize> = self
            .headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                self.rows
                    .iter()
                    .filter_map(|row| row.get(i))
                    .map(|cell| cell.chars().count())
                    .chain(std::iter::once(header.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mut output = String::new();
        output.push_str(&pad_line(&self.headers, &widths));
        output.push('\n');
        let underline: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        output.push_str(&underline.join("-+-"));
        output.push('\n');
        for row in &self.rows {
            output.push_str(&pad_line(row, &widths));
            output.push('\n');
        }
        output
    }

    /// Exports the grid data to a specified format.
    /// Supported formats: CSV, JSON, Markdown.
    pub fn export(&self, format: &str) -> Result<String> {
        match format.to_lowercase().as_str() {
            "csv" => Ok(self.export_to_csv()),
            "json" => self.export_to_json(),
            "markdown" | "md" => Ok(self.export_to_markdown()),
            _ => Err(DbdeskError::Export(format!(
                "Unsupported export format: '{}'. Supported formats: csv, json, markdown",
                format
            ))),
        }
    }

    /// Every field quoted, internal quotes doubled, one line per row.
    fn export_to_csv(&self) -> String {
        let mut output = String::new();
        output.push_str(&csv_line(&self.headers));
        for row in &self.rows {
            output.push_str(&csv_line(row));
        }
        output
    }

    pub fn write_csv<W: Write>(&self, out: &mut W) -> Result<()> {
        out.write_all(self.export_to_csv().as_bytes())?;
        Ok(())
    }

    /// Writes the CSV export to `path`, replacing any existing file
    pub fn export_csv_to(&self, path: &Path) -> Result<()> {
        let mut file = std::fs::File::create(path).map_err(|e| {
            DbdeskError::Export(format!("Failed to save file {}: {}", path.display(), e))
        })?;
        self.write_csv(&mut file)
    }

    fn export_to_json(&self) -> Result<String> {
        let export = JsonExport {
            columns: &self.headers,
            rows: &self.rows,
        };
        Ok(serde_json::to_string(&export)?)
    }

    fn export_to_markdown(&self) -> String {
        let mut output = String::new();
        if !self.headers.is_empty() {
            output.push_str(&format!("| {} |\n", self.headers.join(" | ")));
            let underline: Vec<String> =
                self.headers.iter().map(|h| "-".repeat(h.len().max(3))).collect();
            output.push_str(&format!("| {} |\n", underline.join(" | ")));
        }
        for row in &self.rows {
            let cells: Vec<String> = row.iter().map(|c| c.replace('|', "\\|")).collect();
            output.push_str(&format!("| {} |\n", cells.join(" | ")));
        }
        output
    }
}

fn pad_line(cells: &[String], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect::<Vec<_>>()
        .join(" | ")
        .trim_end()
        .to_string()
}

fn csv_line(cells: &[String]) -> String {
    let quoted: Vec<String> = cells
        .iter()
        .map(|cell| format!("\"{}\"", cell.replace('"', "\"\"")))
        .collect();
    format!("{}\n", quoted.join(","))
}

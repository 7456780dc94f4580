//! Report files: text, JSON, tab-delimited, Weka ARFF and ACE XML

use super::text::{render_text, UNDEFINED};
use super::{AnalysisReport, NamedTable};
use crate::error::{AnalysisError, AnalysisResult};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Human-readable report
    Text,
    Json,
    /// Tab-delimited score table
    Tsv,
    /// Weka attribute-relation file
    Arff,
    /// ACE XML feature vector file
    AceXml,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Text => "txt",
            OutputFormat::Json => "json",
            OutputFormat::Tsv => "tsv",
            OutputFormat::Arff => "arff",
            OutputFormat::AceXml => "xml",
        }
    }

    /// Render `report` in this format; `name` labels ARFF relations
    pub fn render(&self, report: &AnalysisReport, name: &str) -> AnalysisResult<String> {
        match self {
            OutputFormat::Text => Ok(render_text(report)),
            OutputFormat::Json => report
                .to_json()
                .map_err(|e| AnalysisError::Scoring(format!("JSON serialization failed: {}", e))),
            OutputFormat::Tsv => Ok(render_tsv(&report.features)),
            OutputFormat::Arff => Ok(render_arff(&report.features, &report.column_labels, name)),
            OutputFormat::AceXml => Ok(render_ace_xml(&report.features)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
            OutputFormat::Tsv => "tsv",
            OutputFormat::Arff => "arff",
            OutputFormat::AceXml => "ace-xml",
        };
        write!(f, "{}", name)
    }
}

/// Write `report` to `dir/<stem>.<ext>` for each format
pub fn write_reports(
    report: &AnalysisReport,
    dir: &Path,
    stem: &str,
    formats: &[OutputFormat],
) -> AnalysisResult<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;

    let mut written = Vec::with_capacity(formats.len());
    for format in formats {
        let path = dir.join(format!("{}.{}", stem, format.extension()));
        let content = format.render(report, stem)?;
        std::fs::write(&path, content)?;
        tracing::info!(format = %format, path = %path.display(), "Report written");
        written.push(path);
    }
    Ok(written)
}

pub fn render_tsv(table: &NamedTable) -> String {
    let mut out = String::new();
    let header: Vec<&str> = std::iter::once("")
        .chain(table.column_labels.iter().map(String::as_str))
        .collect();
    out.push_str(&header.join("\t"));
    out.push('\n');

    for (label, row) in table.row_labels.iter().zip(&table.values) {
        out.push_str(label);
        for value in row {
            out.push('\t');
            match value {
                Some(v) => {
                    let _ = write!(out, "{}", v);
                }
                None => out.push_str(UNDEFINED),
            }
        }
        out.push('\n');
    }
    out
}

/// ARFF with one numeric attribute per column and a nominal `Class`
/// attribute over `classes`. Row labels are listed in leading comments.
pub fn render_arff(table: &NamedTable, classes: &[String], relation: &str) -> String {
    let mut out = String::new();
    out.push_str("% INSTANCES (DATA ROWS) BELOW CORRESPOND TO:\n%\n");
    for (i, label) in table.row_labels.iter().enumerate() {
        let _ = writeln!(out, "%    {}) {}", i + 1, label);
    }
    out.push_str("%\n");

    let _ = writeln!(out, "@relation {}", arff_quote(relation));
    out.push('\n');
    for label in &table.column_labels {
        let _ = writeln!(out, "@attribute {} numeric", arff_quote(label));
    }
    let classes: Vec<String> = classes.iter().map(|c| arff_quote(c)).collect();
    let _ = writeln!(out, "@attribute Class {{{}}}", classes.join(","));
    out.push_str("\n@data\n");

    for row in &table.values {
        let values: Vec<String> = row
            .iter()
            .map(|v| v.map_or_else(|| "?".to_string(), |v| v.to_string()))
            .chain(std::iter::once("?".to_string()))
            .collect();
        out.push_str(&values.join(","));
        out.push('\n');
    }
    out
}

fn arff_quote(name: &str) -> String {
    let plain = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.');
    if plain {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\\', "\\\\").replace('\'', "\\'"))
    }
}

const ACE_XML_HEADER: &str = r#"<?xml version="1.0"?>
<!DOCTYPE feature_vector_file [
   <!ELEMENT feature_vector_file (comments, data_set+)>
   <!ELEMENT comments (#PCDATA)>
   <!ELEMENT data_set (data_set_id, section*, feature*)>
   <!ELEMENT data_set_id (#PCDATA)>
   <!ELEMENT section (feature+)>
   <!ATTLIST section start CDATA ""
                     stop CDATA "">
   <!ELEMENT feature (name, v+)>
   <!ELEMENT name (#PCDATA)>
   <!ELEMENT v (#PCDATA)>
]>

<feature_vector_file>

"#;

/// ACE XML feature vectors: one data set per row, undefined cells omitted
pub fn render_ace_xml(table: &NamedTable) -> String {
    let mut out = String::from(ACE_XML_HEADER);
    out.push_str("   <comments>Features extracted with webminer</comments>\n\n");

    for (label, row) in table.row_labels.iter().zip(&table.values) {
        out.push_str("   <data_set>\n");
        let _ = writeln!(out, "      <data_set_id>{}</data_set_id>", xml_escape(label));
        for (name, value) in table.column_labels.iter().zip(row) {
            let Some(value) = value else {
                continue;
            };
            out.push_str("      <feature>\n");
            let _ = writeln!(out, "         <name>{}</name>", xml_escape(name));
            let _ = writeln!(out, "         <v>{}</v>", value);
            out.push_str("      </feature>\n");
        }
        out.push_str("   </data_set>\n\n");
    }

    out.push_str("</feature_vector_file>\n");
    out
}

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

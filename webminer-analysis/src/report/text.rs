//! Human-readable text report

use super::{AnalysisReport, NamedTable};
use std::fmt::Write;

/// Marker for undefined cells
pub const UNDEFINED: &str = "-";

pub fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.4}", v),
        None => UNDEFINED.to_string(),
    }
}

/// Render a table with aligned columns
pub fn render_table(table: &NamedTable) -> String {
    let cells: Vec<Vec<String>> = table
        .values
        .iter()
        .map(|row| row.iter().map(|v| format_value(*v)).collect())
        .collect();

    let label_width = table
        .row_labels
        .iter()
        .map(|l| l.chars().count())
        .max()
        .unwrap_or(0);
    let widths: Vec<usize> = table
        .column_labels
        .iter()
        .enumerate()
        .map(|(col, label)| {
            cells
                .iter()
                .filter_map(|row| row.get(col))
                .map(|c| c.chars().count())
                .chain(std::iter::once(label.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    let _ = write!(out, "{:label_width$}", "");
    for (label, width) in table.column_labels.iter().zip(&widths) {
        let _ = write!(out, "  {:>width$}", label);
    }
    out.push('\n');
    for (label, row) in table.row_labels.iter().zip(&cells) {
        let _ = write!(out, "{:label_width$}", label);
        for (cell, width) in row.iter().zip(&widths) {
            let _ = write!(out, "  {:>width$}", cell);
        }
        out.push('\n');
    }
    out
}

pub fn render_text(report: &AnalysisReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "WEBMINER ANALYSIS REPORT");
    let _ = writeln!(out, "Run: {}", report.run_id);
    let _ = writeln!(out, "Generated: {}", report.generated_at.to_rfc3339());
    let _ = writeln!(out);
    let _ = writeln!(out, "Analysis mode: {}", report.mode);
    let _ = writeln!(out, "Scoring function: {}", report.scoring_function);
    let _ = writeln!(out, "    {}", report.formula);
    let _ = writeln!(out);

    let settings = &report.settings;
    let _ = writeln!(
        out,
        "Normalize across backends: {}",
        yes_no(settings.normalize_across_backends)
    );
    let _ = writeln!(
        out,
        "Normalize across sites: {}",
        yes_no(settings.normalize_across_sites)
    );
    match &settings.post_normalization {
        Some(n) => {
            let _ = writeln!(out, "Post-normalization: {:?} ({:?})", n.rule, n.scope);
        }
        None => {
            let _ = writeln!(out, "Post-normalization: none");
        }
    }
    let _ = writeln!(out, "Zero denominators: {:?}", settings.zero_denominator);
    let _ = writeln!(out, "Attempts per query: {}", settings.max_attempts);
    if !settings.required_filters.is_empty() {
        let _ = writeln!(out, "Required filters:");
        for filter in &settings.required_filters {
            let _ = writeln!(out, "    {}", filter);
        }
    }
    if !settings.search_options.excluded.is_empty() {
        let _ = writeln!(out, "Excluded: {}", settings.search_options.excluded.join(", "));
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Backends:");
    for backend in &report.backends {
        let _ = writeln!(out, "    {} (multiplier {:.4})", backend.name, backend.multiplier);
    }
    let _ = writeln!(out, "Sites:");
    for site in &report.sites {
        let _ = writeln!(
            out,
            "    {} (weight {}, multiplier {:.4}, factor {:.4})",
            site.site, site.weight, site.multiplier, site.factor
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "SCORES");
    out.push_str(&render_table(&report.scores));

    for table in &report.tables {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", table.name.to_uppercase());
        out.push_str(&render_table(table));
    }

    if let Some(tags) = &report.tag_ranking {
        let _ = writeln!(out);
        let _ = writeln!(out, "{} TAG RANKS", tags.source.to_uppercase());
        for (label, ranks) in report.row_labels.iter().zip(&tags.ranks) {
            let ranks: Vec<String> = ranks
                .iter()
                .map(|r| r.map_or_else(|| UNDEFINED.to_string(), |r| r.to_string()))
                .collect();
            let _ = writeln!(out, "    {}: {}", label, ranks.join(" "));
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "QUERIES ({})", report.queries.len());
    for query in &report.queries {
        let _ = writeln!(
            out,
            "    [{}] {} @ {}: {} -> {}",
            query.kind,
            query.backend,
            query.site.as_deref().unwrap_or("whole network"),
            query.literal_query,
            query.count
        );
    }

    out
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

//! Report assembly and file output

mod helpers;

use helpers::{settings, MockBackend, MockTagSource, RecordingProgress};
use tempfile::TempDir;
use webminer_analysis::models::ScoringFunction;
use webminer_analysis::report::{write_reports, AnalysisReport, OutputFormat};
use webminer_analysis::{AnalysisOutcome, AnalysisProcessor};

async fn co_occurrence_outcome() -> AnalysisOutcome {
    let mut settings = settings(ScoringFunction::Cooc1, &["jazz", "hip hop <SYNONYM> rap", "rock"], None);
    settings.normalize_across_backends = true;
    let backend = MockBackend::new("mock")
        .with_count(&["jazz", "\"hip hop\" OR \"rap\""], 10)
        .with_count(&["jazz", "rock"], 2)
        .with_count(&["\"hip hop\" OR \"rap\"", "rock"], 1);

    AnalysisProcessor::new(settings, vec![backend.boxed()])
        .run(&RecordingProgress::new())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_report_labels_and_audit_trail() {
    let outcome = co_occurrence_outcome().await;
    let report = AnalysisReport::from_outcome(&outcome);

    assert_eq!(report.row_labels, vec!["jazz", "hip hop / rap", "rock"]);
    assert_eq!(report.column_labels, report.row_labels);
    assert_eq!(report.scoring_function, ScoringFunction::Cooc1);
    assert_eq!(report.backends.len(), 1);
    assert_eq!(report.backends[0].multiplier, 1.0);
    assert_eq!(report.sites[0].site, "whole network");
    assert_eq!(report.queries.len(), 3);
    assert_eq!(report.queries[0].literal_query, "\"hip hop\" OR \"rap\" \"jazz\"");
    assert_eq!(report.scores.values[0][0], None);
    assert!(report
        .tables
        .iter()
        .any(|t| t.name.contains("without normalization or weighting")));
}

#[tokio::test]
async fn test_write_all_formats() {
    let outcome = co_occurrence_outcome().await;
    let report = AnalysisReport::from_outcome(&outcome);
    let dir = TempDir::new().unwrap();
    let formats = [
        OutputFormat::Text,
        OutputFormat::Json,
        OutputFormat::Tsv,
        OutputFormat::Arff,
        OutputFormat::AceXml,
    ];

    let written = write_reports(&report, &dir.path().join("out"), "genres", &formats).unwrap();
    assert_eq!(written.len(), 5);
    assert!(written.iter().all(|p| p.exists()));

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("out/genres.json")).unwrap()).unwrap();
    assert_eq!(json["scoring_function"], "cooc-1");
    assert!(json["scores"]["values"][0][0].is_null());
    assert_eq!(json["row_labels"][1], "hip hop / rap");

    let text = std::fs::read_to_string(dir.path().join("out/genres.txt")).unwrap();
    assert!(text.contains("Scoring function: cooc-1"));
    assert!(text.contains("3.3333"));

    let tsv = std::fs::read_to_string(dir.path().join("out/genres.tsv")).unwrap();
    assert_eq!(tsv.lines().count(), 4);
    assert!(tsv.lines().nth(1).unwrap().starts_with("jazz\t-\t"));

    let arff = std::fs::read_to_string(dir.path().join("out/genres.arff")).unwrap();
    assert!(arff.contains("%    2) hip hop / rap"));
    assert!(arff.contains("@relation genres"));

    let xml = std::fs::read_to_string(dir.path().join("out/genres.xml")).unwrap();
    assert_eq!(xml.matches("<data_set>").count(), 3);
    assert_eq!(xml.matches("<feature>").count(), 6);
}

#[tokio::test]
async fn test_tag_fusion_features_side_by_side() {
    let settings = settings(
        ScoringFunction::CrossTab3,
        &["beethoven"],
        Some(&["classical", "jazz"]),
    );
    let backend = MockBackend::new("mock")
        .with_count(&["beethoven", "classical"], 80)
        .with_count(&["beethoven", "jazz"], 5);
    let tags = MockTagSource::new(&[("beethoven", &["classical"][..])]);

    let outcome = AnalysisProcessor::new(settings, vec![backend.boxed()])
        .with_tag_source(Box::new(tags))
        .run(&RecordingProgress::new())
        .await
        .unwrap();
    let report = AnalysisReport::from_outcome(&outcome);

    assert_eq!(
        report.features.column_labels,
        vec!["classical_WS", "jazz_WS", "classical_mocktags", "jazz_mocktags"]
    );
    assert_eq!(report.features.values[0][2], Some(1.0));
    assert_eq!(report.tag_ranking.as_ref().unwrap().ranks, vec![vec![Some(1), None]]);

    let arff = OutputFormat::Arff.render(&report, "fusion").unwrap();
    assert!(arff.contains("@attribute Class {classical,jazz}"));
}

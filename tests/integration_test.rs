use anyhow::Result;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::tempdir;

use lead_pipeline::app::qualify_use_case::QualifyUseCase;
use lead_pipeline::infra::json_output_adapter::JsonFileSink;
use lead_pipeline::infra::json_source_adapter::JsonFileSource;
use lead_pipeline::pipeline::processing::classify::CategoryAttributes;
use lead_pipeline::pipeline::processing::score::ScoredLead;
use lead_pipeline::{LeadCategory, LeadConfig, PipelineRun, RawRecord, RejectionReason, RunReport};

fn record(value: Value) -> RawRecord {
    serde_json::from_value(value).unwrap()
}

fn run_default(records: Vec<RawRecord>) -> RunReport {
    let mut run = PipelineRun::new(&LeadConfig::default()).unwrap();
    run.collect(records).unwrap();
    run.finish().unwrap()
}

fn all_scored(report: &RunReport) -> Vec<&ScoredLead> {
    report.qualified.iter().chain(report.below_threshold.iter()).collect()
}

#[test]
fn test_freelance_developer_end_to_end() {
    let report = run_default(vec![record(json!({
        "name": "Jane Doe Freelance Dev",
        "website": "HTTP://JaneDev.IO/",
        "industry": "software",
        "pain_points": "manual scheduling, repetitive data entry",
        "email": "jane@janedev.io",
        "data_source": "LinkedIn"
    }))]);

    assert_eq!(report.qualified.len(), 1);
    let jane = &report.qualified[0];
    assert_eq!(jane.classified.lead.identity_key, "janedev.io");
    assert_eq!(jane.classified.lead.website, "https://janedev.io");
    assert_eq!(jane.category(), LeadCategory::Developer);
    assert!(matches!(jane.classified.attributes, CategoryAttributes::Developer(_)));
    assert!(jane.fit_score >= 8.0);

    let breakdown = &jane.score_breakdown;
    assert_eq!(breakdown.company_size.subscore, 10.0);
    assert_eq!(breakdown.automation_indicators.subscore, 10.0);
    assert_eq!(breakdown.contact_availability.subscore, 10.0);
    assert!(jane.last_updated.is_some());
}

#[test]
fn test_scheme_variants_merge_into_one_lead() {
    let report = run_default(vec![
        record(json!({ "name": "Acme Corp", "website": "https://acme.com/", "data_source": "Clutch.co" })),
        record(json!({
            "name": "Acme",
            "website": "acme.com",
            "email": "hello@acme.com",
            "data_source": "LinkedIn"
        })),
    ]);

    let scored = all_scored(&report);
    assert_eq!(scored.len(), 1);
    assert_eq!(report.stats.deduplicated_away, 1);

    let acme = &scored[0].classified.lead;
    assert_eq!(acme.name, "Acme Corp");
    assert_eq!(acme.data_source, "Clutch.co");
    assert_eq!(acme.email.as_deref(), Some("hello@acme.com"));
    assert_eq!(acme.merged_sources, vec!["LinkedIn".to_string()]);
}

#[test]
fn test_invalid_website_only_in_rejected() {
    let report = run_default(vec![
        record(json!({ "name": "Nowhere Ltd", "website": "not a url", "data_source": "Clutch.co" })),
        record(json!({ "name": "", "website": "blank.com", "data_source": "Clutch.co" })),
    ]);

    assert!(report.qualified.is_empty());
    assert!(report.below_threshold.is_empty());
    assert_eq!(report.rejected.len(), 2);
    assert_eq!(report.rejected[0].reason, RejectionReason::InvalidWebsite);
    assert_eq!(report.rejected[1].reason, RejectionReason::MissingIdentity);
    assert_eq!(report.stats.rejected_invalid_website, 1);
    assert_eq!(report.stats.rejected_missing_identity, 1);
    assert_eq!(report.stats.scored, 0);
}

#[test]
fn test_min_score_splits_qualified_and_below_threshold() {
    let report = run_default(vec![
        record(json!({
            "name": "Bloom Flower Shop",
            "website": "bloom.com",
            "industry": "ecommerce",
            "company_size": "2-10",
            "pain_points": "inventory management, order processing",
            "email": "hi@bloom.com",
            "data_source": "Shopify"
        })),
        record(json!({ "name": "Bare Holdings", "website": "bare.com", "data_source": "Clutch.co" })),
    ]);

    assert_eq!(report.qualified.len(), 1);
    assert_eq!(report.qualified[0].name(), "Bloom Flower Shop");
    assert_eq!(report.below_threshold.len(), 1);
    assert!(report.below_threshold[0].fit_score < report.min_score);
    assert_eq!(report.stats.qualified + report.stats.below_threshold, report.stats.scored);
}

#[tokio::test]
async fn test_json_files_to_output_directory() -> Result<()> {
    let temp_dir = tempdir()?;
    let clutch = temp_dir.path().join("clutch.json");
    let linkedin = temp_dir.path().join("linkedin.jsonl");
    let output_dir = temp_dir.path().join("output");

    tokio::fs::write(
        &clutch,
        serde_json::to_string(&json!([
            {
                "name": "Bloom Flower Shop",
                "website": "https://www.bloom.com/",
                "industry": "ecommerce",
                "company_size": "2-10",
                "pain_points": "inventory management, order processing",
                "email": "hi@bloom.com",
                "data_source": "Clutch.co"
            },
            { "name": "Broken", "website": "not a url", "data_source": "Clutch.co" }
        ]))?,
    )
    .await?;
    tokio::fs::write(
        &linkedin,
        "{\"name\": \"Jane Doe Freelance Dev\", \"website\": \"janedev.io\", \"industry\": \"software\", \"pain_points\": \"manual scheduling, repetitive data entry\", \"email\": \"jane@janedev.io\", \"data_source\": \"LinkedIn\"}\n\
         {\"name\": \"Bloom\", \"website\": \"bloom.com\", \"linkedin\": \"https://www.linkedin.com/company/bloom\", \"data_source\": \"LinkedIn\"}\n",
    )
    .await?;

    let sink = Arc::new(JsonFileSink::new(&output_dir, "leads"));
    let use_case = QualifyUseCase::new(
        Arc::new(JsonFileSource::new(vec![clutch, linkedin])),
        sink.clone(),
        LeadConfig::default(),
    );
    let (report, summary) = use_case.run().await?;

    assert_eq!(summary.summary.total_records, 4);
    assert_eq!(summary.summary.unique_leads, 2);
    assert_eq!(summary.summary.rejected_records, 1);
    assert_eq!(report.qualified.len(), 2);

    let qualified: Value = serde_json::from_str(&tokio::fs::read_to_string(sink.path_for("qualified")).await?)?;
    let qualified = qualified.as_array().unwrap();
    assert_eq!(qualified.len(), 2);
    for lead in qualified {
        let score = lead["fit_score"].as_f64().unwrap();
        assert!((1.0..=10.0).contains(&score));
    }

    let business: Value = serde_json::from_str(&tokio::fs::read_to_string(sink.path_for("business")).await?)?;
    assert_eq!(business[0]["identity_key"], "bloom.com");
    assert_eq!(business[0]["data_source"], "Clutch.co");
    assert_eq!(business[0]["linkedin"], "https://www.linkedin.com/company/bloom");

    let report_file: Value = serde_json::from_str(&tokio::fs::read_to_string(sink.path_for("report")).await?)?;
    assert_eq!(report_file["summary"]["developer_leads"], 1);
    assert_eq!(report_file["data_source_distribution"]["LinkedIn"], 2);

    Ok(())
}
